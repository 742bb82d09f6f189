//! End-to-end orchestration: segment the range, fetch each segment through
//! the portal, normalize, merge.
//!
//! Segments run strictly sequentially; the portal is a stateful multi-step
//! form and does not tolerate concurrent queries. A segment failure is
//! recorded and the remaining segments proceed -- partial results are always
//! preferable to none.

use crate::config::Config;
use crate::portal::PortalError;
use crate::range::{QueryRange, Segment, segment};
use crate::records::{NormalizeRules, NormalizedRecord, RawShipRecord, merge_records, normalize};
use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};
use tracing::{debug, info, warn};

/// The seam between orchestration and browser automation: fetches the raw
/// records for one segment. Implemented by [`crate::portal::PortalClient`]
/// and by scripted mocks in tests.
#[async_trait]
pub trait SegmentFetcher {
    async fn fetch_segment(&self, segment: &Segment) -> Result<Vec<RawShipRecord>, PortalError>;
}

/// Pipeline-level failures. Segment-scoped errors never surface here; they
/// are folded into [`FetchReport::failures`].
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid query range: {0}")]
    InvalidRange(String),
    #[error("all {0} segments failed; no data retrieved")]
    AllSegmentsFailed(usize),
}

/// One segment that produced no data, with the error that stopped it.
#[derive(Debug)]
pub struct SegmentFailure {
    pub segment: Segment,
    pub error: PortalError,
}

/// The outcome of one end-to-end query: the merged result set plus the
/// per-segment failures it is missing data for. An empty record set with no
/// failures means the range genuinely held no qualifying vessel calls.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub records: Vec<NormalizedRecord>,
    pub failures: Vec<SegmentFailure>,
}

pub struct Pipeline<F> {
    fetcher: F,
    rules: NormalizeRules,
    max_window: Duration,
    guard: Duration,
}

impl<F: SegmentFetcher> Pipeline<F> {
    pub fn new(fetcher: F, config: &Config) -> Self {
        Self {
            fetcher,
            rules: config.rules.clone(),
            max_window: config.max_window(),
            guard: config.guard_offset(),
        }
    }

    /// Runs the full pipeline for `[start, end)`.
    ///
    /// Identical inputs produce identical output (modulo the portal's own
    /// data changing), which is what makes external memoization of this call
    /// sound.
    pub async fn fetch(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<FetchReport, PipelineError> {
        let range = QueryRange::new(start, end).map_err(PipelineError::InvalidRange)?;
        let segments = segment(&range, self.max_window, self.guard);
        let total = segments.len();
        info!(segments = total, start = %range.start, end = %range.end, "query range segmented");

        let mut records = Vec::new();
        let mut failures = Vec::new();
        for (index, seg) in segments.iter().enumerate() {
            info!(segment = %seg, progress = format!("{}/{total}", index + 1), "querying segment");
            match self.fetch_with_retry(seg).await {
                Ok(raw) => {
                    let fetched = raw.len();
                    let before = records.len();
                    records.extend(raw.into_iter().filter_map(|r| normalize(r, &self.rules)));
                    debug!(segment = %seg, fetched, kept = records.len() - before, "segment normalized");
                }
                Err(error) => {
                    warn!(segment = %seg, error = %error, "segment failed, continuing");
                    failures.push(SegmentFailure { segment: *seg, error });
                }
            }
        }

        if total > 0 && failures.len() == total {
            return Err(PipelineError::AllSegmentsFailed(total));
        }

        Ok(FetchReport {
            records: merge_records(records),
            failures,
        })
    }

    /// An export timeout gets one retry with a fresh session; every other
    /// failure mode is deterministic enough that replaying the identical
    /// query cannot help.
    async fn fetch_with_retry(&self, seg: &Segment) -> Result<Vec<RawShipRecord>, PortalError> {
        match self.fetcher.fetch_segment(seg).await {
            Err(PortalError::ExportTimeout { attempts }) => {
                warn!(segment = %seg, attempts, "export timed out, retrying once with a fresh session");
                self.fetcher.fetch_segment(seg).await
            }
            outcome => outcome,
        }
    }
}
