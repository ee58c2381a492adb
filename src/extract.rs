use scraper::{Html, Selector};
use url::Url;

use crate::record::{normalize_title, PaperRecord};

/// A candidate listing-page entry before venue-specific filtering: display
/// title plus raw link target, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub title: String,
    pub href: String,
}

/// Try an ordered set of CSS selector groups against a listing page; the
/// first group yielding at least one valid anchor wins. Venue page structures
/// drift across years and mirrors, so later groups are the looser shapes.
///
/// A valid anchor needs both a non-empty title (the `title` attribute, else
/// the collapsed link text) and a non-empty `href`; anything else is expected
/// noise from navigation/author links and is skipped silently.
pub fn first_matching_anchors(html: &str, selector_groups: &[&str]) -> Vec<Anchor> {
    let doc = Html::parse_document(html);
    for group in selector_groups {
        let selector = match Selector::parse(group) {
            Ok(s) => s,
            Err(e) => {
                tracing::debug!(group = *group, error = ?e, "skipping unparsable selector group");
                continue;
            }
        };
        let anchors: Vec<Anchor> = doc
            .select(&selector)
            .filter_map(|el| {
                let href = el.value().attr("href")?.trim();
                let title = el
                    .value()
                    .attr("title")
                    .map(str::to_owned)
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| el.text().collect::<Vec<_>>().join(" "));
                let title = normalize_title(&title);
                if title.is_empty() || href.is_empty() {
                    return None;
                }
                Some(Anchor {
                    title,
                    href: href.to_string(),
                })
            })
            .collect();
        if !anchors.is_empty() {
            return anchors;
        }
    }
    Vec::new()
}

/// Rewrite a possibly-relative link against the venue's base origin.
/// Unparsable inputs are returned as-is; extraction treats them as noise.
pub fn absolutize(base: &str, href: &str) -> String {
    match Url::parse(href) {
        Ok(url) => url.to_string(),
        Err(_) => Url::parse(base)
            .and_then(|b| b.join(href))
            .map(|u| u.to_string())
            .unwrap_or_else(|_| href.to_string()),
    }
}

/// Per-page dedup by normalized title, first occurrence wins. A single page
/// may legitimately list a title twice when selector groups overlap.
pub fn dedupe_page(rows: Vec<PaperRecord>) -> Vec<PaperRecord> {
    let mut seen = std::collections::HashSet::new();
    rows.into_iter()
        .filter(|r| seen.insert(normalize_title(&r.title)))
        .collect()
}
