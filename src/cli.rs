//! Command-line arguments for the report binary.

use chrono::{Datelike, Duration, NaiveDateTime, Utc};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    Pretty,
    Json,
}

/// Shortcut ranges relative to Taiwan time, mirroring the quick-pick options
/// operators actually use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PresetRange {
    /// Now until 24 hours from now.
    Next24h,
    /// Now until 72 hours from now.
    Next3d,
    /// Midnight seven days ago until now.
    Past7d,
    /// First of the current month until now.
    CurrentMonth,
}

#[derive(Parser, Debug)]
#[command(
    name = "portcall",
    version,
    about = "Fetch scheduled vessel calls for Hualien port and render them as CSV"
)]
pub struct Args {
    /// Query start, `YYYY-MM-DD HH:MM`. Overrides --preset when both --start
    /// and --end are given.
    #[arg(long, value_parser = parse_minute)]
    pub start: Option<NaiveDateTime>,

    /// Query end, `YYYY-MM-DD HH:MM`.
    #[arg(long, value_parser = parse_minute)]
    pub end: Option<NaiveDateTime>,

    /// Shortcut range, used unless an explicit start/end pair is given.
    #[arg(long, value_enum, default_value_t = PresetRange::Next24h)]
    pub preset: PresetRange,

    /// Output CSV path. Defaults to `Report_MMDD.csv` from the range start.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = TracingFormat::Pretty)]
    pub tracing: TracingFormat,
}

impl Args {
    /// Resolves the effective query bounds: the explicit pair when given,
    /// otherwise the preset applied to `now`.
    pub fn resolve_range(&self, now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            return (start, end);
        }
        match self.preset {
            PresetRange::Next24h => (now, now + Duration::hours(24)),
            PresetRange::Next3d => (now, now + Duration::hours(72)),
            PresetRange::Past7d => {
                let start = (now - Duration::days(7))
                    .date()
                    .and_hms_opt(0, 0, 0)
                    .unwrap_or(now - Duration::days(7));
                (start, now)
            }
            PresetRange::CurrentMonth => {
                let start = now
                    .date()
                    .with_day(1)
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .unwrap_or(now);
                (start, now)
            }
        }
    }
}

/// Current Taiwan time (UTC+8) at minute precision; the portal keeps no
/// timezone of its own and all its timestamps are local.
pub fn taiwan_now() -> NaiveDateTime {
    crate::range::truncate_to_minute(Utc::now().naive_utc() + Duration::hours(8))
}

fn parse_minute(raw: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M")
        .map_err(|e| format!("expected `YYYY-MM-DD HH:MM`: {e}"))
}
