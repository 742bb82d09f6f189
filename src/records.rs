//! Vessel-call records and the normalization rules applied to them.
//!
//! A [`RawShipRecord`] is what the export parser hands over: every field
//! optional, every value a string. [`normalize`] turns one raw record into
//! zero-or-one [`NormalizedRecord`] by applying the tonnage filter and the
//! display derivations, and [`merge_records`] folds per-segment outputs into
//! the final deduplicated, time-ordered result set.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::warn;

/// Display text for vessel calls without a scheduled pilot time.
pub const UNSCHEDULED: &str = "未排定";

static WHARF_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)").expect("wharf digit pattern is valid"));

/// One vessel call as decoded from the portal's XML export.
///
/// Absence of a field is a valid state of the source data, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawShipRecord {
    pub vessel_cname: Option<String>,
    pub vessel_ename: Option<String>,
    pub gross_tonnage: Option<String>,
    pub loa: Option<String>,
    pub wharf_code: Option<String>,
    pub pilot_expected_time: Option<String>,
    pub status: Option<String>,
    pub prev_port: Option<String>,
    pub next_port: Option<String>,
    pub agent_name: Option<String>,
}

/// The canonical output row. All display fields are non-null strings; missing
/// source fields become empty strings or the [`UNSCHEDULED`] sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub date: String,
    pub time: String,
    pub status: String,
    pub wharf: String,
    pub vessel_cname: String,
    pub length_m: i64,
    pub vessel_ename: String,
    pub tonnage: i64,
    pub prev_port: String,
    pub next_port: String,
    pub agent: String,
}

impl NormalizedRecord {
    /// Cells in the fixed report column order.
    pub fn columns(&self) -> [String; 11] {
        [
            self.date.clone(),
            self.time.clone(),
            self.status.clone(),
            self.wharf.clone(),
            self.vessel_cname.clone(),
            self.length_m.to_string(),
            self.vessel_ename.clone(),
            self.tonnage.to_string(),
            self.prev_port.clone(),
            self.next_port.clone(),
            self.agent.clone(),
        ]
    }
}

/// Domain filtering and labelling rules.
///
/// The defaults reproduce the production report: 500-ton inclusive threshold,
/// a small allow-list of vessels that must appear regardless of reported
/// tonnage, and agent-name abbreviations for the two frequent callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeRules {
    pub tonnage_threshold: i64,
    pub exception_vessels: Vec<String>,
    pub agent_abbreviations: Vec<(String, String)>,
}

impl Default for NormalizeRules {
    fn default() -> Self {
        Self {
            tonnage_threshold: 500,
            exception_vessels: vec!["花蓮之星".to_owned(), "太平公主".to_owned()],
            agent_abbreviations: vec![
                ("陽明海運".to_owned(), "陽明".to_owned()),
                ("中華民國海軍".to_owned(), "海軍".to_owned()),
            ],
        }
    }
}

impl NormalizeRules {
    /// Whether a vessel bypasses the tonnage filter by name.
    fn is_exception(&self, cname: &str) -> bool {
        self.exception_vessels.iter().any(|v| v == cname)
    }

    /// Abbreviated display label for a handling agent.
    ///
    /// Known full names map via exact substring match; anything else is
    /// truncated to its first two characters.
    fn agent_label(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        for (full, short) in &self.agent_abbreviations {
            if trimmed.contains(full.as_str()) {
                return short.clone();
            }
        }
        trimmed.chars().take(2).collect()
    }
}

/// Applies the normalization rules to one raw record.
///
/// Returns `None` when the record is filtered out: reported tonnage below the
/// threshold and the vessel not on the exception list. The threshold is
/// inclusive -- a vessel at exactly the threshold is kept.
pub fn normalize(raw: RawShipRecord, rules: &NormalizeRules) -> Option<NormalizedRecord> {
    let tonnage = parse_rounded(raw.gross_tonnage.as_deref(), "gross_tonnage");
    let vessel_cname = raw.vessel_cname.unwrap_or_default();

    if tonnage < rules.tonnage_threshold && !rules.is_exception(&vessel_cname) {
        return None;
    }

    let (date, time) = pilot_time_labels(raw.pilot_expected_time.as_deref().unwrap_or(""));

    Some(NormalizedRecord {
        date,
        time,
        status: raw.status.unwrap_or_default(),
        wharf: wharf_label(raw.wharf_code.as_deref().unwrap_or("")),
        vessel_cname,
        length_m: parse_rounded(raw.loa.as_deref(), "loa"),
        vessel_ename: raw.vessel_ename.unwrap_or_default(),
        tonnage,
        prev_port: raw.prev_port.unwrap_or_default(),
        next_port: raw.next_port.unwrap_or_default(),
        agent: rules.agent_label(raw.agent_name.as_deref().unwrap_or("")),
    })
}

/// Merges per-segment outputs into one result set: unique by
/// (date, time, Chinese name, wharf), sorted ascending by (date, time).
///
/// Duplicates arise when the guard offset fails to keep a boundary record out
/// of two adjacent segments; the copies are identical, so the first wins.
pub fn merge_records(records: Vec<NormalizedRecord>) -> Vec<NormalizedRecord> {
    let mut seen = HashSet::new();
    let mut merged: Vec<NormalizedRecord> = records
        .into_iter()
        .filter(|r| {
            seen.insert((
                r.date.clone(),
                r.time.clone(),
                r.vessel_cname.clone(),
                r.wharf.clone(),
            ))
        })
        .collect();
    merged.sort_by(|a, b| (&a.date, &a.time).cmp(&(&b.date, &b.time)));
    merged
}

/// Display label for a wharf code: an embedded number becomes a zero-padded
/// two-digit berth label; codes without digits pass through unchanged.
fn wharf_label(raw: &str) -> String {
    WHARF_DIGITS
        .captures(raw)
        .and_then(|c| c[1].parse::<u32>().ok())
        .map(|n| format!("{n:02}號碼頭"))
        .unwrap_or_else(|| raw.to_owned())
}

/// Slices the fixed-width `YYYYMMDDHHmm...` expected-pilot-time string into
/// `MM/DD` and `HH:MM` display labels. Anything shorter than twelve digits
/// gets the unscheduled sentinel for both fields.
fn pilot_time_labels(raw: &str) -> (String, String) {
    let slices = (raw.get(4..6), raw.get(6..8), raw.get(8..10), raw.get(10..12));
    match slices {
        (Some(month), Some(day), Some(hour), Some(minute))
            if raw[..12].bytes().all(|b| b.is_ascii_digit()) =>
        {
            (format!("{month}/{day}"), format!("{hour}:{minute}"))
        }
        _ => (UNSCHEDULED.to_owned(), UNSCHEDULED.to_owned()),
    }
}

/// Rounds a possibly-absent numeric string to an integer, defaulting to 0.
fn parse_rounded(raw: Option<&str>, field: &'static str) -> i64 {
    let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return 0;
    };
    match value.parse::<f64>() {
        Ok(n) => n.round() as i64,
        Err(_) => {
            warn!(field, value, "unreadable numeric field, defaulting to 0");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(cname: &str, tonnage: &str) -> RawShipRecord {
        RawShipRecord {
            vessel_cname: Some(cname.to_owned()),
            gross_tonnage: Some(tonnage.to_owned()),
            ..RawShipRecord::default()
        }
    }

    #[test]
    fn tonnage_at_threshold_is_kept() {
        let rules = NormalizeRules::default();
        let record = normalize(raw("豐盛輪", "500"), &rules);
        assert!(record.is_some());
        assert_eq!(record.unwrap().tonnage, 500);
    }

    #[test]
    fn tonnage_below_threshold_is_dropped() {
        let rules = NormalizeRules::default();
        assert!(normalize(raw("小船", "499.4"), &rules).is_none());
        assert!(normalize(raw("小船", "300"), &rules).is_none());
    }

    #[test]
    fn tonnage_rounds_before_comparison() {
        // 499.6 rounds to 500, which meets the inclusive threshold.
        let rules = NormalizeRules::default();
        assert!(normalize(raw("邊界輪", "499.6"), &rules).is_some());
    }

    #[test]
    fn exception_vessel_bypasses_filter() {
        let rules = NormalizeRules::default();
        let record = normalize(raw("花蓮之星", "120"), &rules).expect("exception kept");
        assert_eq!(record.tonnage, 120);
    }

    #[test]
    fn unparsable_tonnage_defaults_to_zero_and_is_filtered() {
        let rules = NormalizeRules::default();
        assert!(normalize(raw("怪船", "n/a"), &rules).is_none());
    }

    #[test]
    fn wharf_label_pads_embedded_digits() {
        assert_eq!(wharf_label("007"), "07號碼頭");
        assert_eq!(wharf_label("W7"), "07號碼頭");
        assert_eq!(wharf_label("#25"), "25號碼頭");
    }

    #[test]
    fn wharf_label_without_digits_passes_through() {
        assert_eq!(wharf_label("外港錨地"), "外港錨地");
        assert_eq!(wharf_label(""), "");
    }

    #[test]
    fn wharf_label_is_deterministic() {
        assert_eq!(wharf_label("007"), wharf_label("007"));
    }

    #[test]
    fn pilot_time_slices_fixed_width_string() {
        let (date, time) = pilot_time_labels("202501151430xx");
        assert_eq!(date, "01/15");
        assert_eq!(time, "14:30");
    }

    #[test]
    fn short_pilot_time_yields_unscheduled_sentinel() {
        let (date, time) = pilot_time_labels("20250115");
        assert_eq!(date, UNSCHEDULED);
        assert_eq!(time, UNSCHEDULED);

        let (date, time) = pilot_time_labels("");
        assert_eq!(date, UNSCHEDULED);
        assert_eq!(time, UNSCHEDULED);
    }

    #[test]
    fn non_digit_pilot_time_yields_unscheduled_sentinel() {
        let (date, time) = pilot_time_labels("not-a-timestamp");
        assert_eq!(date, UNSCHEDULED);
        assert_eq!(time, UNSCHEDULED);
    }

    #[test]
    fn agent_known_names_map_to_abbreviations() {
        let rules = NormalizeRules::default();
        assert_eq!(rules.agent_label("陽明海運股份有限公司"), "陽明");
        assert_eq!(rules.agent_label(" 中華民國海軍 "), "海軍");
    }

    #[test]
    fn agent_unknown_names_truncate_to_two_chars() {
        let rules = NormalizeRules::default();
        assert_eq!(rules.agent_label("長榮海運股份有限公司"), "長榮");
        assert_eq!(rules.agent_label("裕"), "裕");
        assert_eq!(rules.agent_label(""), "");
    }

    #[test]
    fn missing_fields_become_defined_text() {
        let rules = NormalizeRules::default();
        let record = normalize(raw("大船", "12000"), &rules).unwrap();
        assert_eq!(record.date, UNSCHEDULED);
        assert_eq!(record.time, UNSCHEDULED);
        assert_eq!(record.status, "");
        assert_eq!(record.wharf, "");
        assert_eq!(record.vessel_ename, "");
        assert_eq!(record.length_m, 0);
        assert_eq!(record.prev_port, "");
        assert_eq!(record.next_port, "");
        assert_eq!(record.agent, "");
    }

    #[test]
    fn merge_deduplicates_and_sorts() {
        let rules = NormalizeRules::default();
        let mut a = normalize(raw("甲船", "800"), &rules).unwrap();
        a.date = "01/16".into();
        a.time = "08:00".into();
        a.wharf = "07號碼頭".into();

        let duplicate = a.clone();

        let mut b = normalize(raw("乙船", "900"), &rules).unwrap();
        b.date = "01/15".into();
        b.time = "14:30".into();
        b.wharf = "03號碼頭".into();

        let merged = merge_records(vec![a.clone(), duplicate, b.clone()]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], b);
        assert_eq!(merged[1], a);
    }

    #[test]
    fn merge_keeps_same_vessel_at_different_wharves() {
        let rules = NormalizeRules::default();
        let mut a = normalize(raw("甲船", "800"), &rules).unwrap();
        a.date = "01/16".into();
        a.time = "08:00".into();
        a.wharf = "07號碼頭".into();
        let mut b = a.clone();
        b.wharf = "09號碼頭".into();

        assert_eq!(merge_records(vec![a, b]).len(), 2);
    }
}
