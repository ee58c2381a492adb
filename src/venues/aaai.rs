use std::collections::BTreeMap;

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{ListingLocator, VenueSource};
use crate::extract::{absolutize, dedupe_page, first_matching_anchors};
use crate::fetch::{FetchClient, FetchError};
use crate::record::{PaperRecord, Venue};

const ORIGIN: &str = "https://ojs.aaai.org";
const ARCHIVE_PATH: &str = "/index.php/AAAI/issue/archive";

/// AAAI publishes through an OJS instance; the issue archive page enumerates
/// every issue, several per volume year.
pub struct AaaiSource {
    origin: String,
    year_re: Regex,
}

impl AaaiSource {
    pub fn new() -> Self {
        Self::with_origin(ORIGIN)
    }

    fn with_origin(origin: &str) -> Self {
        Self {
            origin: origin.to_string(),
            year_re: Regex::new(r"(20\d{2})").unwrap(),
        }
    }

    fn year_near(&self, anchor: ElementRef<'_>) -> Option<i32> {
        let own: String = anchor.text().collect::<Vec<_>>().join(" ");
        if let Some(c) = self.year_re.captures(&own) {
            return c[1].parse().ok();
        }
        // Year is often on the surrounding issue-summary block, not the link
        let parent = anchor.parent().and_then(ElementRef::wrap)?;
        let text: String = parent.text().collect::<Vec<_>>().join(" ");
        self.year_re
            .captures(&text)
            .and_then(|c| c[1].parse().ok())
    }
}

impl Default for AaaiSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VenueSource for AaaiSource {
    fn venue(&self) -> Venue {
        Venue::Aaai
    }

    async fn discover(
        &self,
        fetch: &FetchClient,
        year_start: i32,
        year_end: i32,
    ) -> Result<Vec<ListingLocator>, FetchError> {
        let html = fetch
            .get(&format!("{}{}", self.origin, ARCHIVE_PATH))
            .await?;

        let mut by_year: BTreeMap<i32, Vec<String>> = BTreeMap::new();
        {
            let doc = Html::parse_document(&html);
            let sel = Selector::parse("a[href*='/issue/view/']").unwrap();
            for anchor in doc.select(&sel) {
                let Some(href) = anchor.value().attr("href") else {
                    continue;
                };
                let Some(year) = self.year_near(anchor) else {
                    continue;
                };
                if year < year_start || year > year_end {
                    continue;
                }
                by_year
                    .entry(year)
                    .or_default()
                    .push(absolutize(&self.origin, href));
            }
        }

        Ok(by_year
            .into_iter()
            .map(|(year, mut pages)| {
                pages.sort();
                pages.dedup();
                ListingLocator { year, pages }
            })
            .collect())
    }

    fn extract(&self, html: &str, year: i32) -> Vec<PaperRecord> {
        let anchors = first_matching_anchors(
            html,
            &[
                ".obj_article_summary a.title",
                "a[href*='/article/view/']",
            ],
        );
        let rows = anchors
            .into_iter()
            .map(|a| {
                PaperRecord::listed(
                    Venue::Aaai,
                    a.title,
                    absolutize(&self.origin, &a.href),
                    Some(year),
                )
            })
            .collect();
        dedupe_page(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchClient, FetchConfig};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ARCHIVE_PAGE: &str = r#"<html><body><ul class="issues_archive">
      <li><div class="obj_issue_summary">
        <a href="/index.php/AAAI/issue/view/600">Vol. 38 No. 1: AAAI-24</a>
        <div class="series">2024-02-26</div>
      </div></li>
      <li><div class="obj_issue_summary">
        <a href="/index.php/AAAI/issue/view/548">Vol. 37 No. 1</a>
        <div class="series">Published 2023</div>
      </div></li>
      <li><div class="obj_issue_summary">
        <a href="/index.php/AAAI/issue/view/549">Vol. 37 No. 2 (2023)</a>
      </div></li>
      <li><div class="obj_issue_summary">
        <a href="/index.php/AAAI/issue/view/501">Vol. 36 No. 1 (2022)</a>
      </div></li>
      <li><div class="obj_issue_summary">
        <a href="/index.php/AAAI/issue/view/430">Vol. 34 No. 1 (2020)</a>
      </div></li>
    </ul></body></html>"#;

    const ISSUE_PAGE: &str = r#"<html><body>
      <div class="obj_article_summary">
        <h3><a class="title" href="/index.php/AAAI/article/view/25075">Robust Planning</a></h3>
        <a class="obj_galley_link pdf" href="/index.php/AAAI/article/view/25075/24847">PDF</a>
      </div>
      <div class="obj_article_summary">
        <h3><a class="title" href="/index.php/AAAI/article/view/25099">Robust Planning</a></h3>
      </div>
      <div class="obj_article_summary">
        <h3><a class="title" href="/index.php/AAAI/article/view/25100">Neural Search</a></h3>
      </div>
    </body></html>"#;

    fn quick_fetch() -> FetchClient {
        FetchClient::with_config(FetchConfig {
            jitter_ms: (0, 0),
            backoff_ms: 1,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_discover_groups_issues_by_year_and_filters_range() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index.php/AAAI/issue/archive"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ARCHIVE_PAGE))
            .mount(&server)
            .await;

        let source = AaaiSource::with_origin(&server.uri());
        let locators = source.discover(&quick_fetch(), 2022, 2023).await.unwrap();

        assert_eq!(locators.len(), 2);
        assert_eq!(locators[0].year, 2022);
        assert_eq!(locators[0].pages.len(), 1);
        assert_eq!(locators[1].year, 2023);
        // both 2023 issues, one tagged in a sibling div rather than link text
        assert_eq!(locators[1].pages.len(), 2);
        assert!(locators[1].pages[0].ends_with("/issue/view/548"));
    }

    #[tokio::test]
    async fn test_discover_single_year_picks_only_that_issue() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index.php/AAAI/issue/archive"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ARCHIVE_PAGE))
            .mount(&server)
            .await;

        let source = AaaiSource::with_origin(&server.uri());
        let locators = source.discover(&quick_fetch(), 2022, 2022).await.unwrap();
        assert_eq!(locators.len(), 1);
        assert_eq!(locators[0].year, 2022);
        assert!(locators[0].pages[0].ends_with("/issue/view/501"));
    }

    #[test]
    fn test_extract_reads_titles_and_skips_duplicates() {
        let source = AaaiSource::new();
        let rows = source.extract(ISSUE_PAGE, 2023);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title, "Robust Planning");
        assert_eq!(
            rows[0].url,
            "https://ojs.aaai.org/index.php/AAAI/article/view/25075"
        );
        assert_eq!(rows[0].year, Some(2023));
        assert_eq!(rows[1].title, "Neural Search");
    }

    #[test]
    fn test_extract_falls_back_when_summary_blocks_are_gone() {
        let drifted = r#"<table><tr><td>
            <a href="/index.php/AAAI/article/view/111">Older Markup Paper</a>
        </td></tr></table>"#;
        let source = AaaiSource::new();
        let rows = source.extract(drifted, 2020);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Older Markup Paper");
    }
}
