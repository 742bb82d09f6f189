//! Tabular rendering of the final result set.
//!
//! Output is BOM-prefixed UTF-8 CSV; spreadsheet tools in the field expect
//! the marker or they fall back to a legacy codepage and mangle the Chinese
//! columns.

use crate::records::NormalizedRecord;
use std::io;
use std::path::Path;

/// Fixed report column order.
pub const COLUMNS: [&str; 11] = [
    "日期", "時間", "狀態", "碼頭", "中文船名", "長度(m)", "英文船名", "總噸位", "前一港",
    "次一港", "代理行",
];

/// Renders the result set as CSV text, header row included.
pub fn render_csv(records: &[NormalizedRecord]) -> String {
    let mut out = String::new();
    out.push('\u{feff}');
    push_row(&mut out, COLUMNS.iter().copied());
    for record in records {
        let cells = record.columns();
        push_row(&mut out, cells.iter().map(String::as_str));
    }
    out
}

/// Writes the rendered report to `path`.
pub fn write_csv(path: &Path, records: &[NormalizedRecord]) -> io::Result<()> {
    std::fs::write(path, render_csv(records))
}

fn push_row<'a, I: IntoIterator<Item = &'a str>>(out: &mut String, cells: I) {
    let mut first = true;
    for cell in cells {
        if !first {
            out.push(',');
        }
        first = false;
        if cell.contains([',', '"', '\n', '\r']) {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(cell);
        }
    }
    out.push_str("\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> NormalizedRecord {
        NormalizedRecord {
            date: "01/15".into(),
            time: "14:30".into(),
            status: "預報".into(),
            wharf: "07號碼頭".into(),
            vessel_cname: "豐盛輪".into(),
            length_m: 190,
            vessel_ename: "PROSPERITY".into(),
            tonnage: 12346,
            prev_port: "基隆".into(),
            next_port: "高雄".into(),
            agent: "陽明".into(),
        }
    }

    #[test]
    fn starts_with_bom_and_header() {
        let csv = render_csv(&[]);
        assert!(csv.starts_with('\u{feff}'));
        let header = csv.trim_start_matches('\u{feff}').lines().next().unwrap();
        assert_eq!(header.split(',').count(), 11);
        assert!(header.starts_with("日期,時間,狀態"));
    }

    #[test]
    fn renders_one_row_per_record() {
        let csv = render_csv(&[record()]);
        let rows: Vec<&str> = csv.trim_end().lines().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[1],
            "01/15,14:30,預報,07號碼頭,豐盛輪,190,PROSPERITY,12346,基隆,高雄,陽明"
        );
    }

    #[test]
    fn quotes_fields_containing_the_separator() {
        let mut r = record();
        r.vessel_ename = "EVER, GIVEN".into();
        r.agent = "代\"理".into();
        let csv = render_csv(&[r]);
        assert!(csv.contains("\"EVER, GIVEN\""));
        assert!(csv.contains("\"代\"\"理\""));
    }
}
