use std::collections::HashSet;

use thiserror::Error;

use crate::enrich::enrich;
use crate::extract::dedupe_page;
use crate::fallback::DblpFallback;
use crate::fetch::FetchClient;
use crate::record::{normalize_title, PaperRecord, Venue};
use crate::venues::{build_source, ListingLocator, VenueSource};

/// Terminal outcome of one (venue, year-or-volume) unit. Every unit resolves
/// to exactly one of these. The outcome, not an error trace, is what drives
/// escalation and the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Primary source produced rows, no fallback consulted.
    PrimarySuccess,
    /// Primary reachable but extracted nothing; fallback rows accepted.
    PrimaryEmptyFellBack,
    /// Primary fetch failed (or no locator existed); fallback rows accepted.
    PrimaryFailedFellBack,
    /// Neither source produced rows; the unit contributes nothing.
    BothFailed,
}

#[derive(Debug, Clone)]
pub struct SourceAttempt {
    pub venue: Venue,
    pub year: i32,
    pub outcome: AttemptOutcome,
    pub enriched: bool,
}

#[derive(Debug, Error)]
pub enum HarvestError {
    /// Nothing anywhere was reachable. Distinct from a legitimately sparse
    /// result, which is returned as a partial set instead.
    #[error("no source reachable for {venue} in {year_start}-{year_end}")]
    SourceExhausted {
        venue: Venue,
        year_start: i32,
        year_end: i32,
    },
}

/// Drives one venue's pipeline: discovery, per-unit extraction with variant
/// union, optional enrichment, fallback escalation, and final aggregation.
/// Owns its fetch client and accumulators: harvesters for different venues
/// share nothing and may run as independent processes.
pub struct Harvester {
    source: Box<dyn VenueSource>,
    fetch: FetchClient,
    fallback: DblpFallback,
}

impl Harvester {
    pub fn new(venue: Venue) -> Self {
        Self::with_fetch(venue, FetchClient::new())
    }

    pub fn with_fetch(venue: Venue, fetch: FetchClient) -> Self {
        Self {
            source: build_source(venue),
            fetch,
            fallback: DblpFallback::new(),
        }
    }

    /// Harvest the venue across `[year_start, year_end]`, years in ascending
    /// order, sequentially. `fast` skips detail enrichment, trading DOI and
    /// abstract completeness for request volume.
    ///
    /// Always returns a result set when any page anywhere was reachable;
    /// errors only on total source exhaustion.
    pub async fn crawl(
        &self,
        year_start: i32,
        year_end: i32,
        fast: bool,
    ) -> Result<Vec<PaperRecord>, HarvestError> {
        let venue = self.source.venue();
        let mut units = match self.source.discover(&self.fetch, year_start, year_end).await {
            Ok(locators) => locators,
            Err(e) => {
                tracing::warn!(%venue, error = %e, "discovery failed; escalating the full range");
                Vec::new()
            }
        };

        // Years discovery could not place still get a unit, so they route to
        // the fallback source instead of silently vanishing.
        let covered: HashSet<i32> = units.iter().map(|l| l.year).collect();
        for year in year_start..=year_end {
            if !covered.contains(&year) {
                units.push(ListingLocator {
                    year,
                    pages: Vec::new(),
                });
            }
        }
        units.sort_by_key(|l| l.year);

        let mut primary_sets: Vec<Vec<PaperRecord>> = Vec::new();
        let mut fallback_sets: Vec<Vec<PaperRecord>> = Vec::new();
        let mut attempts: Vec<SourceAttempt> = Vec::new();
        let mut enrich_failures = 0usize;

        for unit in &units {
            let (rows, fatal) = self.collect_primary(unit).await;
            let mut rows = dedupe_page(rows);

            let enriched = !fast && !rows.is_empty();
            if enriched {
                for record in &mut rows {
                    if let Err(e) = enrich(&self.fetch, record).await {
                        enrich_failures += 1;
                        tracing::warn!(%venue, url = %record.url, error = %e, "detail fetch failed");
                    }
                }
            }

            let outcome = if !fatal && !rows.is_empty() {
                AttemptOutcome::PrimarySuccess
            } else {
                let escalated_for_error = fatal || unit.pages.is_empty();
                match self.fallback.fetch_year(&self.fetch, venue, unit.year).await {
                    Ok(fb_rows) if !fb_rows.is_empty() => {
                        tracing::info!(%venue, year = unit.year, rows = fb_rows.len(), "fell back to dblp");
                        fallback_sets.push(fb_rows);
                        if escalated_for_error {
                            AttemptOutcome::PrimaryFailedFellBack
                        } else {
                            AttemptOutcome::PrimaryEmptyFellBack
                        }
                    }
                    Ok(_) => AttemptOutcome::BothFailed,
                    Err(e) => {
                        tracing::warn!(%venue, year = unit.year, error = %e, "fallback failed");
                        AttemptOutcome::BothFailed
                    }
                }
            };

            if !rows.is_empty() {
                primary_sets.push(rows);
            }
            attempts.push(SourceAttempt {
                venue,
                year: unit.year,
                outcome,
                enriched,
            });
        }

        let records = aggregate(primary_sets, fallback_sets);

        let succeeded = attempts
            .iter()
            .filter(|a| a.outcome == AttemptOutcome::PrimarySuccess)
            .count();
        let fell_back = attempts
            .iter()
            .filter(|a| {
                matches!(
                    a.outcome,
                    AttemptOutcome::PrimaryEmptyFellBack | AttemptOutcome::PrimaryFailedFellBack
                )
            })
            .count();
        let exhausted = attempts
            .iter()
            .filter(|a| a.outcome == AttemptOutcome::BothFailed)
            .count();
        tracing::info!(
            %venue,
            records = records.len(),
            primary = succeeded,
            fell_back,
            exhausted,
            enrich_failures,
            "venue run complete"
        );

        if records.is_empty() && attempts.iter().all(|a| a.outcome == AttemptOutcome::BothFailed)
        {
            return Err(HarvestError::SourceExhausted {
                venue,
                year_start,
                year_end,
            });
        }
        Ok(records)
    }

    /// Fetch and extract every page variant of a unit. A failed variant marks
    /// the unit fatal (it will escalate) without discarding rows the other
    /// variants already produced.
    async fn collect_primary(&self, unit: &ListingLocator) -> (Vec<PaperRecord>, bool) {
        let venue = self.source.venue();
        let mut rows = Vec::new();
        let mut fatal = false;
        for page in &unit.pages {
            match self.fetch.get(page).await {
                Ok(html) => rows.extend(self.source.extract(&html, unit.year)),
                Err(e) => {
                    tracing::warn!(%venue, year = unit.year, page = %page, error = %e, "listing page failed");
                    fatal = true;
                }
            }
        }
        (rows, fatal)
    }
}

/// Fold row sets into the final record set: primary rows first in encounter
/// order (page by page, year ascending), then fallback rows for escalated
/// units. First write wins: a duplicate title is dropped whole, never merged
/// field by field, so a fallback row cannot backfill a primary row or vice
/// versa.
fn aggregate(
    primary_sets: Vec<Vec<PaperRecord>>,
    fallback_sets: Vec<Vec<PaperRecord>>,
) -> Vec<PaperRecord> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for rows in primary_sets.into_iter().chain(fallback_sets) {
        for record in rows {
            if seen.insert(normalize_title(&record.title)) {
                out.push(record);
            }
        }
    }
    out
}

/// Venue driver entrypoint: harvest `venue` across the year range with a
/// fresh, independently owned pipeline.
pub async fn crawl(
    venue: Venue,
    year_start: i32,
    year_end: i32,
    fast: bool,
) -> Result<Vec<PaperRecord>, HarvestError> {
    Harvester::new(venue).crawl(year_start, year_end, fast).await
}
