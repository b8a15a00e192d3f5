//! XLSX constants and default preset factories.

use std::collections::BTreeMap;

use crate::spec::{SpecAutofitCellsPolicy, SpecCellFormat};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Excel cell text maximum length, in characters.
pub const N_LEN_EXCEL_STRING_MAX: usize = 32_767;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Date+time display pattern applied to every date-bearing cell.
pub const C_NUM_FORMAT_DATETIME: &str = "yyyy-mm-dd hh:mm";
/// Header background fill.
pub const C_COLOR_HEADER_FILL: &str = "#2F5496";
/// Header font color.
pub const C_COLOR_HEADER_FONT: &str = "#FFFFFF";
/// Fill applied to every second body row.
pub const C_COLOR_ALTERNATE_FILL: &str = "#F2F6FC";
/// Thin border color.
pub const C_COLOR_BORDER: &str = "#D9D9D9";

/// Canonical format preset keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EnumFmtKey {
    /// Generic body cell format.
    Text,
    /// Header cell format.
    Header,
    /// Patch overlaid on date-time cells.
    DateTime,
    /// Patch overlaid on alternating body rows.
    Alternate,
    /// Patch overlaid on nested (subitem) rows.
    Nested,
}

/// Build default named format presets.
pub fn derive_default_xlsx_formats() -> BTreeMap<EnumFmtKey, SpecCellFormat> {
    let cfg_base_fmt_spec = SpecCellFormat {
        border: Some(1),
        border_color: Some(C_COLOR_BORDER.to_string()),
        align: Some("left".to_string()),
        valign: Some("vcenter".to_string()),
        text_wrap: Some(true),
        ..Default::default()
    };

    let mut dict_fmt = BTreeMap::new();
    dict_fmt.insert(EnumFmtKey::Text, cfg_base_fmt_spec.clone());
    dict_fmt.insert(
        EnumFmtKey::Header,
        cfg_base_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            align: Some("center".to_string()),
            bg_color: Some(C_COLOR_HEADER_FILL.to_string()),
            font_color: Some(C_COLOR_HEADER_FONT.to_string()),
            ..Default::default()
        }),
    );
    dict_fmt.insert(
        EnumFmtKey::DateTime,
        SpecCellFormat {
            num_format: Some(C_NUM_FORMAT_DATETIME.to_string()),
            ..Default::default()
        },
    );
    dict_fmt.insert(
        EnumFmtKey::Alternate,
        SpecCellFormat {
            bg_color: Some(C_COLOR_ALTERNATE_FILL.to_string()),
            ..Default::default()
        },
    );
    dict_fmt.insert(
        EnumFmtKey::Nested,
        SpecCellFormat {
            italic: Some(true),
            ..Default::default()
        },
    );

    dict_fmt
}

/// Build the default column autofit policy.
pub fn derive_default_autofit_policy() -> SpecAutofitCellsPolicy {
    SpecAutofitCellsPolicy::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_formats_cover_every_key() {
        let dict_fmt = derive_default_xlsx_formats();
        for key in [
            EnumFmtKey::Text,
            EnumFmtKey::Header,
            EnumFmtKey::DateTime,
            EnumFmtKey::Alternate,
            EnumFmtKey::Nested,
        ] {
            assert!(dict_fmt.contains_key(&key), "missing preset {key:?}");
        }

        let fmt_header = &dict_fmt[&EnumFmtKey::Header];
        assert_eq!(fmt_header.bold, Some(true));
        assert_eq!(fmt_header.border, Some(1));
        assert_eq!(fmt_header.bg_color.as_deref(), Some(C_COLOR_HEADER_FILL));
        assert_eq!(
            dict_fmt[&EnumFmtKey::DateTime].num_format.as_deref(),
            Some(C_NUM_FORMAT_DATETIME)
        );
    }
}
