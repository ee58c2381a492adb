pub mod aaai;
pub mod cvpr;
pub mod emnlp;
pub mod icml;
pub mod neurips;

use async_trait::async_trait;

use crate::fetch::{FetchClient, FetchError};
use crate::record::{PaperRecord, Venue};

/// One (venue, year-or-volume) unit of work: the inferred year plus every
/// page-URL variant representing it (day-split or multi-issue listings).
/// Transient: locators are recomputed from live pages on every run.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingLocator {
    pub year: i32,
    pub pages: Vec<String>,
}

/// A venue's native proceedings site: how to find its listing pages for a
/// year range, and how to read paper entries out of one.
///
/// Implementations are stateless beyond their URL configuration; the caller
/// owns the fetch client and drives the pipeline, so one driver run never
/// shares connections or accumulators with another.
#[async_trait]
pub trait VenueSource: Send + Sync {
    fn venue(&self) -> Venue;

    /// Enumerate listing locators for the requested range, ascending by year.
    /// Locators outside the range are discarded here, never downstream. An
    /// error means the venue's entry point itself was unreachable; individual
    /// unreachable years simply yield no locator.
    async fn discover(
        &self,
        fetch: &FetchClient,
        year_start: i32,
        year_end: i32,
    ) -> Result<Vec<ListingLocator>, FetchError>;

    /// Parse one listing page into draft rows for the unit's year. Markup
    /// drift shows up as an empty result, not an error.
    fn extract(&self, html: &str, year: i32) -> Vec<PaperRecord>;
}

/// Build the driver for a venue.
pub fn build_source(venue: Venue) -> Box<dyn VenueSource> {
    match venue {
        Venue::Aaai => Box::new(aaai::AaaiSource::new()),
        Venue::Cvpr => Box::new(cvpr::CvprSource::new()),
        Venue::Emnlp => Box::new(emnlp::EmnlpSource::new()),
        Venue::Icml => Box::new(icml::IcmlSource::new()),
        Venue::Neurips => Box::new(neurips::NeuripsSource::new()),
    }
}
