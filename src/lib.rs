//! Harvests bibliographic metadata (title, abstract, URL, DOI, year, venue,
//! publication date) for papers published at five conference venues, with a
//! DBLP fallback when a venue's native site is unreachable or has drifted.
//!
//! Each venue driver is an independently invocable unit: it owns its fetch
//! client and its accumulating record set, so drivers for different venues
//! can run as parallel processes without coordination. Within a driver,
//! years and pages are fetched strictly in order.
//!
//! ```no_run
//! use paper_harvest::harvest;
//! use paper_harvest::record::Venue;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let records = harvest::crawl(Venue::Emnlp, 2021, 2023, true).await?;
//! println!("{} papers", records.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod enrich;
pub mod extract;
pub mod fallback;
pub mod fetch;
pub mod harvest;
pub mod record;
pub mod sink;
pub mod venues;

pub use fetch::{FetchClient, FetchConfig, FetchError};
pub use harvest::{crawl, Harvester, HarvestError};
pub use record::{PaperRecord, Venue};
pub use sink::{JsonlSink, SaveMode, Sink};
