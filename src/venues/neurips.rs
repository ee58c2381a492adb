use async_trait::async_trait;
use regex::Regex;

use super::{ListingLocator, VenueSource};
use crate::extract::{absolutize, dedupe_page, first_matching_anchors};
use crate::fetch::{FetchClient, FetchError};
use crate::record::{PaperRecord, Venue};

const ORIGIN: &str = "https://proceedings.neurips.cc";

/// NeurIPS proceedings. The site has moved its year index once
/// (`/paper_files/paper/<year>` vs the older `/paper/<year>`), so both bases
/// are probed and a page only counts when it mentions the conference, since
/// the server happily serves soft error pages with status 200.
pub struct NeuripsSource {
    origin: String,
    paper_href_re: Regex,
}

impl NeuripsSource {
    pub fn new() -> Self {
        Self::with_origin(ORIGIN)
    }

    fn with_origin(origin: &str) -> Self {
        Self {
            origin: origin.to_string(),
            paper_href_re: Regex::new(r"/paper/\d{4}/|/file/|/hash/").unwrap(),
        }
    }
}

impl Default for NeuripsSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VenueSource for NeuripsSource {
    fn venue(&self) -> Venue {
        Venue::Neurips
    }

    async fn discover(
        &self,
        fetch: &FetchClient,
        year_start: i32,
        year_end: i32,
    ) -> Result<Vec<ListingLocator>, FetchError> {
        let mut locators = Vec::new();
        for year in year_start..=year_end {
            let candidates = [
                format!("{}/paper_files/paper/{}", self.origin, year),
                format!("{}/paper/{}", self.origin, year),
            ];
            for url in candidates {
                match fetch.get(&url).await {
                    Ok(html) if html.contains("NeurIPS") || html.contains("NIPS") => {
                        locators.push(ListingLocator {
                            year,
                            pages: vec![url],
                        });
                        break;
                    }
                    Ok(_) => tracing::debug!(%url, "index reachable but not a NeurIPS page"),
                    Err(e) => tracing::debug!(%url, error = %e, "index variant unreachable"),
                }
            }
        }
        Ok(locators)
    }

    fn extract(&self, html: &str, year: i32) -> Vec<PaperRecord> {
        // The year index is a flat link list with no stable classes; filter
        // by link shape instead.
        let rows = first_matching_anchors(html, &["a[href]"])
            .into_iter()
            .filter(|a| self.paper_href_re.is_match(&a.href))
            .filter(|a| a.title.len() >= 5)
            .map(|a| {
                PaperRecord::listed(
                    Venue::Neurips,
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

    const YEAR_INDEX: &str = r#"<html><body>
      <h4>NeurIPS 2022 Proceedings</h4>
      <ul>
        <li><a href="/paper_files/paper/2022/hash/abc123-Abstract-Conference.html">Flamingo: a Visual Language Model</a></li>
        <li><a href="/paper_files/paper/2022/hash/def456-Abstract-Conference.html">Chain-of-Thought Prompting</a></li>
        <li><a href="/static/help">help</a></li>
        <li><a href="/paper_files/paper/2022/hash/ghi789-Abstract-Conference.html">tiny</a></li>
      </ul>
    </body></html>"#;

    fn quick_fetch() -> FetchClient {
        FetchClient::with_config(FetchConfig {
            jitter_ms: (0, 0),
            backoff_ms: 1,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_discover_falls_back_to_the_older_base() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper_files/paper/2022"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/paper/2022"))
            .respond_with(ResponseTemplate::new(200).set_body_string(YEAR_INDEX))
            .mount(&server)
            .await;

        let source = NeuripsSource::with_origin(&server.uri());
        let locators = source.discover(&quick_fetch(), 2022, 2022).await.unwrap();
        assert_eq!(locators.len(), 1);
        assert!(locators[0].pages[0].ends_with("/paper/2022"));
    }

    #[tokio::test]
    async fn test_discover_rejects_soft_error_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html>nothing to see</html>"),
            )
            .mount(&server)
            .await;

        let source = NeuripsSource::with_origin(&server.uri());
        let locators = source.discover(&quick_fetch(), 2022, 2022).await.unwrap();
        assert!(locators.is_empty());
    }

    #[test]
    fn test_extract_filters_by_link_shape_and_title_length() {
        let source = NeuripsSource::new();
        let rows = source.extract(YEAR_INDEX, 2022);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title, "Flamingo: a Visual Language Model");
        assert!(rows[0].url.starts_with("https://proceedings.neurips.cc/"));
        assert_eq!(rows[1].title, "Chain-of-Thought Prompting");
    }
}
