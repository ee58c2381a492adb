use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};

use super::{ListingLocator, VenueSource};
use crate::extract::{absolutize, dedupe_page, first_matching_anchors};
use crate::fetch::{FetchClient, FetchError};
use crate::record::{PaperRecord, Venue};

const ORIGIN: &str = "https://aclanthology.org";

/// EMNLP main-track volumes on the ACL Anthology. Volume URLs are fully
/// predictable per year, so probing them directly beats scraping the event
/// page; the event page is only consulted when the direct probe fails.
pub struct EmnlpSource {
    origin: String,
}

impl EmnlpSource {
    pub fn new() -> Self {
        Self::with_origin(ORIGIN)
    }

    fn with_origin(origin: &str) -> Self {
        Self {
            origin: origin.to_string(),
        }
    }

    async fn volume_url_for_year(&self, fetch: &FetchClient, year: i32) -> Option<String> {
        let volume = format!("{}/volumes/{}.emnlp-main/", self.origin, year);
        if fetch.get(&volume).await.is_ok() {
            return Some(volume);
        }
        let events = format!("{}/events/emnlp-{}/", self.origin, year);
        let html = fetch.get(&events).await.ok()?;
        let pattern = Regex::new(&format!(r"/volumes/{}\.emnlp-main/?$", year)).ok()?;
        let doc = Html::parse_document(&html);
        let sel = Selector::parse("a[href]").unwrap();
        doc.select(&sel)
            .filter_map(|a| a.value().attr("href"))
            .find(|href| pattern.is_match(href))
            .map(|href| absolutize(&self.origin, href))
    }
}

impl Default for EmnlpSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VenueSource for EmnlpSource {
    fn venue(&self) -> Venue {
        Venue::Emnlp
    }

    async fn discover(
        &self,
        fetch: &FetchClient,
        year_start: i32,
        year_end: i32,
    ) -> Result<Vec<ListingLocator>, FetchError> {
        let mut locators = Vec::new();
        for year in year_start..=year_end {
            match self.volume_url_for_year(fetch, year).await {
                Some(url) => locators.push(ListingLocator {
                    year,
                    pages: vec![url],
                }),
                None => tracing::warn!(year, "EMNLP volume not found"),
            }
        }
        Ok(locators)
    }

    fn extract(&self, html: &str, year: i32) -> Vec<PaperRecord> {
        let selector = format!(r#"a[href^="/{}.emnlp-main."]"#, year);
        let rows = first_matching_anchors(html, &[selector.as_str()])
            .into_iter()
            // paper pages only; every entry also carries pdf/bib badge links
            .filter(|a| !a.href.ends_with(".pdf") && !a.href.ends_with(".bib"))
            .filter(|a| a.title.len() >= 3)
            .map(|a| {
                PaperRecord::listed(
                    Venue::Emnlp,
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

    const VOLUME_PAGE: &str = r#"<html><body>
      <p><a class="badge" href="/2022.emnlp-main.1.pdf">pdf</a>
         <a class="badge" href="/2022.emnlp-main.1.bib">bib</a>
         <strong><a href="/2022.emnlp-main.1/">Generating Natural Language Proofs</a></strong></p>
      <p><a href="/2022.emnlp-main.2/">Abstractive Summarization Reconsidered</a></p>
      <p><a href="/2021.emnlp-main.9/">Wrong Year Volume Link</a></p>
      <p><a href="/2022.emnlp-main.3/">ab</a></p>
    </body></html>"#;

    const EVENT_PAGE: &str = r#"<html><body>
      <a href="/volumes/2022.emnlp-demo/">Demo volume</a>
      <a href="/volumes/2022.emnlp-main/">Main volume</a>
    </body></html>"#;

    fn quick_fetch() -> FetchClient {
        FetchClient::with_config(FetchConfig {
            jitter_ms: (0, 0),
            backoff_ms: 1,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_discover_probes_the_volume_url_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/volumes/2022.emnlp-main/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(VOLUME_PAGE))
            .mount(&server)
            .await;

        let source = EmnlpSource::with_origin(&server.uri());
        let locators = source.discover(&quick_fetch(), 2022, 2022).await.unwrap();
        assert_eq!(locators.len(), 1);
        assert_eq!(locators[0].year, 2022);
        assert!(locators[0].pages[0].ends_with("/volumes/2022.emnlp-main/"));
    }

    #[tokio::test]
    async fn test_discover_falls_back_to_the_event_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/volumes/2022.emnlp-main/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/events/emnlp-2022/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(EVENT_PAGE))
            .mount(&server)
            .await;

        let source = EmnlpSource::with_origin(&server.uri());
        let locators = source.discover(&quick_fetch(), 2022, 2022).await.unwrap();
        assert_eq!(locators.len(), 1);
        assert!(locators[0].pages[0].ends_with("/volumes/2022.emnlp-main/"));
    }

    #[tokio::test]
    async fn test_discover_skips_years_with_no_volume() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = EmnlpSource::with_origin(&server.uri());
        let locators = source.discover(&quick_fetch(), 2022, 2022).await.unwrap();
        assert!(locators.is_empty());
    }

    #[test]
    fn test_extract_keeps_paper_links_only() {
        let source = EmnlpSource::new();
        let rows = source.extract(VOLUME_PAGE, 2022);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title, "Generating Natural Language Proofs");
        assert_eq!(rows[0].url, "https://aclanthology.org/2022.emnlp-main.1/");
        assert_eq!(rows[1].title, "Abstractive Summarization Reconsidered");
    }
}
