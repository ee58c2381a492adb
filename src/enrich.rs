use scraper::{Html, Selector};

use crate::fetch::{FetchClient, FetchError};
use crate::record::PaperRecord;

/// Abstract containers observed across the venue detail pages, most specific
/// first.
const ABSTRACT_SELECTORS: [&str; 4] = [
    "div#abstract",
    "section.item.abstract",
    "div#articleAbstract",
    "div.abstract",
];

/// Fetch a record's own detail page and fill in what the listing page could
/// not provide: DOI, abstract, and a precise publication date when the page
/// carries one. Skipped entirely in fast mode.
///
/// Failures here are contained to the one record: the caller logs the error,
/// counts it, and keeps the draft with whatever fields were already known.
pub async fn enrich(fetch: &FetchClient, record: &mut PaperRecord) -> Result<(), FetchError> {
    let html = fetch.get(&record.url).await?;
    apply_detail(record, &html);
    Ok(())
}

/// Parse a detail page into the draft. Absent patterns leave fields untouched;
/// a missing DOI or abstract on a detail page is normal for several venues.
fn apply_detail(record: &mut PaperRecord, html: &str) {
    let doc = Html::parse_document(html);

    if record.doi.is_empty() {
        if let Ok(sel) = Selector::parse("a[href*='doi.org/']") {
            if let Some(link) = doc.select(&sel).next() {
                let text: String = link.text().collect::<Vec<_>>().join(" ");
                record.doi = text.split_whitespace().collect::<Vec<_>>().join(" ");
            }
        }
    }

    if record.abstract_text.is_empty() {
        for group in ABSTRACT_SELECTORS {
            let Ok(sel) = Selector::parse(group) else {
                continue;
            };
            if let Some(block) = doc.select(&sel).next() {
                let text: String = block.text().collect::<Vec<_>>().join(" ");
                record.abstract_text = text.split_whitespace().collect::<Vec<_>>().join(" ");
                break;
            }
        }
    }

    // OJS-style pages publish the exact date in a citation meta tag; prefer it
    // over the year-as-text fallback.
    if let Ok(sel) = Selector::parse(r#"meta[name="citation_publication_date"]"#) {
        if let Some(content) = doc
            .select(&sel)
            .next()
            .and_then(|el| el.value().attr("content"))
        {
            if !content.trim().is_empty() {
                record.pub_date_raw = content.trim().to_string();
            }
        }
    }
}
