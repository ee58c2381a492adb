use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};

use super::{ListingLocator, VenueSource};
use crate::extract::{absolutize, dedupe_page, first_matching_anchors};
use crate::fetch::{FetchClient, FetchError};
use crate::record::{PaperRecord, Venue};

const ORIGIN: &str = "https://openaccess.thecvf.com";

/// CVPR open-access proceedings on the CVF site. Year indexes come in two
/// flavors: a single `?day=all` listing, or day-split pages for conferences
/// where the combined view is broken.
pub struct CvprSource {
    origin: String,
    year_re: Regex,
}

impl CvprSource {
    pub fn new() -> Self {
        Self::with_origin(ORIGIN)
    }

    fn with_origin(origin: &str) -> Self {
        Self {
            origin: origin.to_string(),
            year_re: Regex::new(r"(?i)cvpr(20\d{2})").unwrap(),
        }
    }

    /// Years advertised on the CVF menu page, clipped to the range. When the
    /// menu itself is unreachable the raw range is probed instead.
    async fn menu_years(
        &self,
        fetch: &FetchClient,
        year_start: i32,
        year_end: i32,
    ) -> Vec<i32> {
        let menu_url = format!("{}/menu", self.origin);
        let html = match fetch.get(&menu_url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(error = %e, "CVF menu unreachable; probing the raw year range");
                return (year_start..=year_end).collect();
            }
        };
        let mut years: Vec<i32> = {
            let doc = Html::parse_document(&html);
            let sel = Selector::parse("a[href*='CVPR20'], a[href*='cvpr20']").unwrap();
            doc.select(&sel)
                .filter_map(|a| a.value().attr("href"))
                .filter_map(|href| self.year_re.captures(href))
                .filter_map(|c| c[1].parse().ok())
                .filter(|y| (year_start..=year_end).contains(y))
                .collect()
        };
        years.sort_unstable();
        years.dedup();
        years
    }
}

impl Default for CvprSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VenueSource for CvprSource {
    fn venue(&self) -> Venue {
        Venue::Cvpr
    }

    async fn discover(
        &self,
        fetch: &FetchClient,
        year_start: i32,
        year_end: i32,
    ) -> Result<Vec<ListingLocator>, FetchError> {
        let years = self.menu_years(fetch, year_start, year_end).await;
        let mut locators = Vec::new();
        for year in years {
            let base = format!("{}/CVPR{}", self.origin, year);
            if fetch.get(&format!("{base}?day=all")).await.is_ok() {
                locators.push(ListingLocator {
                    year,
                    pages: vec![format!("{base}?day=all")],
                });
                continue;
            }
            // Combined view broken for this year: collect the reachable day
            // pages and let the aggregator union them by title.
            let mut days = Vec::new();
            for day in 1..=7 {
                let url = format!("{base}?day={day}");
                if fetch.get(&url).await.is_ok() {
                    days.push(url);
                }
            }
            if days.is_empty() {
                tracing::warn!(year, "no reachable CVPR listing variant");
            } else {
                locators.push(ListingLocator { year, pages: days });
            }
        }
        Ok(locators)
    }

    fn extract(&self, html: &str, year: i32) -> Vec<PaperRecord> {
        // Standard structure first; the loose content-path match covers the
        // older lowercase mirrors (/content_cvpr_2017/...).
        let anchors = first_matching_anchors(
            html,
            &[
                "dt.ptitle a[href]",
                "a[href*='/content/CVPR'], a[href*='/content_cvpr']",
            ],
        );
        let rows = anchors
            .into_iter()
            .map(|a| {
                PaperRecord::listed(
                    Venue::Cvpr,
                    a.title,
                    absolutize(&self.origin, &a.href),
                    Some(year),
                )
            })
            .collect();
        dedupe_page(rows)
    }
}
