//! Query ranges and their decomposition into portal-sized segments.
//!
//! The portal rejects any query spanning more than seven days, so an
//! arbitrary range is walked greedily into bounded sub-ranges. Consecutive
//! segments are separated by a one-minute guard offset; without it the portal
//! returns boundary records in both adjacent segments.

use chrono::{Duration, NaiveDateTime, Timelike};
use std::fmt;

/// Timestamp layout the portal's date inputs expect.
const PORTAL_STAMP: &str = "%Y/%m/%d %H:%M";

/// A half-open query interval with the invariant that `start < end`.
///
/// Both endpoints are truncated to minute precision on construction; the
/// portal compares its seven-day window at minute granularity and stray
/// seconds produce false-negative window checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl QueryRange {
    /// Creates a new `QueryRange`, returning an error if `start` is not
    /// strictly before `end` after minute truncation.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, String> {
        let start = truncate_to_minute(start);
        let end = truncate_to_minute(end);
        if start >= end {
            return Err(format!(
                "invalid query range: start ({start}) is not before end ({end})"
            ));
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// One sub-range of a user query, guaranteed by [`segment`] to fit the
/// portal's maximum window. Consumed exactly once per portal session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Segment {
    /// Segment start formatted for the portal's date input.
    pub fn portal_start(&self) -> String {
        self.start.format(PORTAL_STAMP).to_string()
    }

    /// Segment end formatted for the portal's date input.
    pub fn portal_end(&self) -> String {
        self.end.format(PORTAL_STAMP).to_string()
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ~ {}", self.portal_start(), self.portal_end())
    }
}

/// Splits `range` into ordered segments no longer than `max_window`.
///
/// Walks greedily from the range start, emitting
/// `[cursor, min(cursor + max_window, end))` and advancing the cursor past
/// the emitted end by `guard`. The union of segments covers the input range
/// up to at most one `guard` of elapsed time per boundary.
pub fn segment(range: &QueryRange, max_window: Duration, guard: Duration) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut cursor = range.start;
    while cursor < range.end {
        let end = std::cmp::min(cursor + max_window, range.end);
        segments.push(Segment { start: cursor, end });
        cursor = end + guard;
    }
    segments
}

pub(crate) fn truncate_to_minute(t: NaiveDateTime) -> NaiveDateTime {
    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    fn window() -> Duration {
        Duration::days(7)
    }

    fn guard() -> Duration {
        Duration::minutes(1)
    }

    #[test]
    fn rejects_inverted_range() {
        assert!(QueryRange::new(at(2025, 1, 10, 0, 0), at(2025, 1, 5, 0, 0)).is_err());
        assert!(QueryRange::new(at(2025, 1, 10, 0, 0), at(2025, 1, 10, 0, 0)).is_err());
    }

    #[test]
    fn truncates_seconds_on_construction() {
        let start = at(2025, 1, 1, 8, 30).with_second(45).unwrap();
        let range = QueryRange::new(start, at(2025, 1, 2, 0, 0)).unwrap();
        assert_eq!(range.start.second(), 0);
    }

    #[test]
    fn short_range_yields_single_identical_segment() {
        let range = QueryRange::new(at(2025, 1, 1, 0, 0), at(2025, 1, 5, 12, 0)).unwrap();
        let segments = segment(&range, window(), guard());
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start, range.start);
        assert_eq!(segments[0].end, range.end);
    }

    #[test]
    fn exact_window_yields_single_segment() {
        let range = QueryRange::new(at(2025, 1, 1, 0, 0), at(2025, 1, 8, 0, 0)).unwrap();
        assert_eq!(segment(&range, window(), guard()).len(), 1);
    }

    #[test]
    fn long_range_is_covered_by_bounded_segments() {
        let range = QueryRange::new(at(2025, 1, 1, 6, 30), at(2025, 1, 21, 18, 45)).unwrap();
        let segments = segment(&range, window(), guard());
        assert_eq!(segments.len(), 3);

        assert_eq!(segments[0].start, range.start);
        assert_eq!(segments.last().unwrap().end, range.end);
        for seg in &segments {
            assert!(seg.end - seg.start <= window());
            assert!(seg.start < seg.end);
        }
        // Contiguous apart from the guard gap, strictly increasing.
        for pair in segments.windows(2) {
            assert_eq!(pair[1].start, pair[0].end + guard());
        }
    }

    #[test]
    fn ten_day_range_yields_two_segments() {
        let range = QueryRange::new(at(2025, 1, 1, 0, 0), at(2025, 1, 11, 0, 0)).unwrap();
        let segments = segment(&range, window(), guard());
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].end, at(2025, 1, 8, 0, 0));
        assert_eq!(segments[1].start, at(2025, 1, 8, 0, 1));
        assert_eq!(segments[1].end, range.end);
    }

    #[test]
    fn portal_stamp_format() {
        let seg = Segment {
            start: at(2025, 3, 7, 9, 5),
            end: at(2025, 3, 14, 9, 5),
        };
        assert_eq!(seg.portal_start(), "2025/03/07 09:05");
        assert_eq!(seg.portal_end(), "2025/03/14 09:05");
    }
}
