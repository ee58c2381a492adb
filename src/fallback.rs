use scraper::{Html, Selector};

use crate::extract::dedupe_page;
use crate::fetch::{FetchClient, FetchError};
use crate::record::{PaperRecord, Venue};

const DBLP_BASE: &str = "https://dblp.org";

/// Secondary bibliographic source used when a venue's native site is
/// unreachable or empty for a year. DBLP is structural-metadata-only: rows
/// come back with title and publisher link but empty DOI/abstract, tagged
/// with the same venue so downstream consumers see one stream.
pub struct DblpFallback {
    pub(crate) base: String,
}

impl DblpFallback {
    pub fn new() -> Self {
        Self {
            base: DBLP_BASE.to_string(),
        }
    }

    /// DBLP shelves NeurIPS under its historical directory.
    fn venue_path(venue: Venue) -> (&'static str, &'static str) {
        match venue {
            Venue::Aaai => ("aaai", "aaai"),
            Venue::Cvpr => ("cvpr", "cvpr"),
            Venue::Emnlp => ("emnlp", "emnlp"),
            Venue::Icml => ("icml", "icml"),
            Venue::Neurips => ("nips", "neurips"),
        }
    }

    pub async fn fetch_year(
        &self,
        fetch: &FetchClient,
        venue: Venue,
        year: i32,
    ) -> Result<Vec<PaperRecord>, FetchError> {
        let (dir, prefix) = Self::venue_path(venue);
        let url = format!("{}/db/conf/{}/{}{}.html", self.base, dir, prefix, year);
        let html = fetch.get(&url).await?;
        Ok(parse_dblp(&html, venue, year))
    }
}

impl Default for DblpFallback {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_dblp(html: &str, venue: Venue, year: i32) -> Vec<PaperRecord> {
    let doc = Html::parse_document(html);
    let Ok(entry_sel) = Selector::parse("li.entry.inproceedings") else {
        return Vec::new();
    };
    let Ok(title_sel) = Selector::parse("span.title") else {
        return Vec::new();
    };
    let Ok(link_sel) = Selector::parse("nav.publ a[href]") else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    for entry in doc.select(&entry_sel) {
        let Some(title_el) = entry.select(&title_sel).next() else {
            continue;
        };
        let title: String = title_el.text().collect::<Vec<_>>().join(" ");
        let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
        if title.is_empty() {
            continue;
        }
        let url = entry
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .unwrap_or_default()
            .to_string();
        rows.push(PaperRecord::listed(venue, title, url, Some(year)));
    }
    dedupe_page(rows)
}
