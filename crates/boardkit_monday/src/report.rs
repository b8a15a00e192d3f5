//! Export run report.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Counters and diagnostics for one `export_board` run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReportExport {
    /// Written workbook.
    pub path_file_out: PathBuf,
    /// Exported board name.
    pub board_name: String,
    /// Top-level item rows.
    pub cnt_items: u64,
    /// Subitem rows.
    pub cnt_subitems: u64,
    /// Body rows on the Items sheet.
    pub cnt_rows: u64,
    /// Cells kept as raw text after a parse failure.
    pub cnt_fallbacks: u64,
    /// Non-fatal notes collected during the run.
    pub warnings: Vec<String>,
}

impl ReportExport {
    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_items".to_string(), self.cnt_items);
        dict_counts.insert("cnt_subitems".to_string(), self.cnt_subitems);
        dict_counts.insert("cnt_rows".to_string(), self.cnt_rows);
        dict_counts.insert("cnt_fallbacks".to_string(), self.cnt_fallbacks);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} items={} subitems={} rows={} fallbacks={} warnings={} path={}",
            dict_counts["cnt_items"],
            dict_counts["cnt_subitems"],
            dict_counts["cnt_rows"],
            dict_counts["cnt_fallbacks"],
            dict_counts["cnt_warnings"],
            self.path_file_out.display()
        )
    }
}

impl fmt::Display for ReportExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[EXPORT]"))
    }
}

#[cfg(test)]
mod tests {
    use super::ReportExport;

    #[test]
    fn report_export_to_dict_and_format() {
        let report = ReportExport {
            path_file_out: "out/board.xlsx".into(),
            board_name: "Roadmap".to_string(),
            cnt_items: 3,
            cnt_subitems: 2,
            cnt_rows: 5,
            cnt_fallbacks: 1,
            warnings: vec!["w".to_string()],
        };

        let dict_counts = report.to_dict();
        assert_eq!(dict_counts["cnt_items"], 3);
        assert_eq!(dict_counts["cnt_rows"], 5);
        assert_eq!(dict_counts["cnt_warnings"], 1);

        let txt = report.format("[EXPORT]");
        assert_eq!(
            txt,
            "[EXPORT] items=3 subitems=2 rows=5 fallbacks=1 warnings=1 path=out/board.xlsx"
        );
        assert_eq!(report.to_string(), txt);
    }
}
