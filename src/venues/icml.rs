use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};

use super::{ListingLocator, VenueSource};
use crate::extract::{absolutize, dedupe_page, first_matching_anchors};
use crate::fetch::{FetchClient, FetchError};
use crate::record::{PaperRecord, Venue};

const INDEX_ORIGIN: &str = "https://proceedings.mlr.press";

/// ICML volumes live in the shared PMLR index alongside dozens of unrelated
/// venues, so a candidate volume only counts after its own page names the
/// conference. Volumes carry no year in their URL; the year is read off the
/// volume page during discovery and out-of-range volumes are dropped there.
pub struct IcmlSource {
    origin: String,
    marker_re: Regex,
    year_re: Regex,
    paper_re: Regex,
}

impl IcmlSource {
    pub fn new() -> Self {
        Self::with_origin(INDEX_ORIGIN)
    }

    fn with_origin(origin: &str) -> Self {
        Self {
            origin: origin.to_string(),
            marker_re: Regex::new(
                r"(?i)\bInternational Conference on Machine Learning\b|\bICML\b",
            )
            .unwrap(),
            year_re: Regex::new(r"\b(20\d{2})\b").unwrap(),
            paper_re: Regex::new(r"^/v\d+/.+\.html$").unwrap(),
        }
    }

    fn infer_volume_year(&self, html: &str) -> Option<i32> {
        let doc = Html::parse_document(html);
        let text: String = doc.root_element().text().collect::<Vec<_>>().join(" ");
        self.year_re
            .captures(&text)
            .and_then(|c| c[1].parse().ok())
    }
}

impl Default for IcmlSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VenueSource for IcmlSource {
    fn venue(&self) -> Venue {
        Venue::Icml
    }

    async fn discover(
        &self,
        fetch: &FetchClient,
        year_start: i32,
        year_end: i32,
    ) -> Result<Vec<ListingLocator>, FetchError> {
        let index_html = fetch.get(&format!("{}/", self.origin)).await?;
        let mut volume_urls: Vec<String> = {
            let doc = Html::parse_document(&index_html);
            let sel = Selector::parse(r#"a[href^="/v"]"#).unwrap();
            doc.select(&sel)
                .filter_map(|a| a.value().attr("href"))
                .map(|href| {
                    format!(
                        "{}/",
                        absolutize(&self.origin, href).trim_end_matches('/')
                    )
                })
                .collect()
        };
        volume_urls.sort();
        volume_urls.dedup();

        let mut locators = Vec::new();
        for url in volume_urls {
            let html = match fetch.get(&url).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::debug!(%url, error = %e, "volume page unreachable");
                    continue;
                }
            };
            if !self.marker_re.is_match(&html) {
                continue;
            }
            match self.infer_volume_year(&html) {
                Some(year) if (year_start..=year_end).contains(&year) => {
                    locators.push(ListingLocator {
                        year,
                        pages: vec![url],
                    });
                }
                other => tracing::debug!(%url, year = ?other, "volume outside requested range"),
            }
        }
        locators.sort_by_key(|l| l.year);
        Ok(locators)
    }

    fn extract(&self, html: &str, year: i32) -> Vec<PaperRecord> {
        let rows = first_matching_anchors(html, &[r#"a[href$=".html"]"#])
            .into_iter()
            .filter(|a| self.paper_re.is_match(&a.href))
            .filter(|a| a.title.len() >= 3)
            .map(|a| {
                PaperRecord::listed(
                    Venue::Icml,
                    a.title,
                    absolutize(&self.origin, &a.href),
                    Some(year),
                )
            })
            .collect();
        dedupe_page(rows)
    }
}
