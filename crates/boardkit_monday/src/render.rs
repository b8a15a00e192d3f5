//! Workbook renderer: row model + board metadata -> two-sheet workbook description.

use std::collections::BTreeMap;

use boardkit_io_xlsx::{
    EnumCellValue, EnumFmtKey, SpecAutofitCellsPolicy, SpecCellFormat, SpecSheet, SpecSheetRow,
    SpecWorkbook, derive_default_autofit_policy, derive_default_xlsx_formats, plan_column_widths,
};
use chrono::NaiveDateTime;

use crate::conf::{
    C_SHEET_ITEMS, C_SHEET_SUMMARY, N_IDX_COL_NAME, N_WIDTH_SUMMARY_LABEL, N_WIDTH_SUMMARY_VALUE,
    TUP_HEADER_IDENTITY,
};
use crate::model::SpecBoard;
use crate::rows::SpecRowModel;

/// Renderer options.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecRenderOptions {
    /// Subitem rows were requested; the summary reports both counts.
    pub if_include_subitems: bool,
    /// Completion timestamp shown on the summary sheet (UTC).
    pub exported_at: NaiveDateTime,
    /// Items sheet column sizing.
    pub policy_autofit: SpecAutofitCellsPolicy,
}

impl SpecRenderOptions {
    pub fn new(exported_at: NaiveDateTime) -> Self {
        Self {
            if_include_subitems: false,
            exported_at,
            policy_autofit: derive_default_autofit_policy(),
        }
    }
}

struct SpecFormatSet {
    fmt_text: SpecCellFormat,
    fmt_header: SpecCellFormat,
    fmt_datetime: SpecCellFormat,
    fmt_alternate: SpecCellFormat,
    fmt_nested: SpecCellFormat,
}

impl SpecFormatSet {
    fn from_defaults() -> Self {
        let mut dict_fmt = derive_default_xlsx_formats();
        let mut take = |key: EnumFmtKey| dict_fmt.remove(&key).unwrap_or_default();
        Self {
            fmt_text: take(EnumFmtKey::Text),
            fmt_header: take(EnumFmtKey::Header),
            fmt_datetime: take(EnumFmtKey::DateTime),
            fmt_alternate: take(EnumFmtKey::Alternate),
            fmt_nested: take(EnumFmtKey::Nested),
        }
    }
}

/// Render the Items and Summary sheets.
///
/// Pure transformation; the Items sheet is the active one.
pub fn render_workbook(
    model: &SpecRowModel,
    board: &SpecBoard,
    options: &SpecRenderOptions,
) -> SpecWorkbook {
    let fmts = SpecFormatSet::from_defaults();
    SpecWorkbook {
        sheets: vec![
            render_items_sheet(model, &fmts, &options.policy_autofit),
            render_summary_sheet(model, board, options, &fmts),
        ],
        idx_sheet_active: 0,
    }
}

fn render_items_sheet(
    model: &SpecRowModel,
    fmts: &SpecFormatSet,
    policy: &SpecAutofitCellsPolicy,
) -> SpecSheet {
    let header: Vec<String> = TUP_HEADER_IDENTITY
        .iter()
        .map(|label| label.to_string())
        .chain(model.columns.iter().map(|col| col.title.clone()))
        .collect();

    let rows: Vec<SpecSheetRow> = model
        .rows
        .iter()
        .enumerate()
        .map(|(n_idx_row, record)| {
            let mut fmt = fmts.fmt_text.clone();
            if n_idx_row % 2 == 0 {
                fmt = fmt.merge(&fmts.fmt_alternate);
            }
            let mut fmts_patch_by_col = BTreeMap::new();
            if record.is_subitem() {
                fmt = fmt.merge(&fmts.fmt_nested);
                fmts_patch_by_col.insert(
                    N_IDX_COL_NAME,
                    SpecCellFormat {
                        indent: Some(1),
                        ..Default::default()
                    },
                );
            }

            let mut cells = record.identity_cells();
            cells.extend(record.cells.iter().cloned());
            SpecSheetRow {
                cells,
                fmt,
                fmts_patch_by_col,
            }
        })
        .collect();

    let widths_by_col = plan_column_widths(&header, &rows, policy);
    SpecSheet {
        sheet_name: C_SHEET_ITEMS.to_string(),
        header,
        rows,
        fmt_header: fmts.fmt_header.clone(),
        fmt_datetime_patch: fmts.fmt_datetime.clone(),
        widths_by_col,
        row_freeze: 1,
        col_freeze: 0,
        if_autofilter: true,
    }
}

fn render_summary_sheet(
    model: &SpecRowModel,
    board: &SpecBoard,
    options: &SpecRenderOptions,
    fmts: &SpecFormatSet,
) -> SpecSheet {
    let c_groups = board
        .groups_ordered()
        .iter()
        .map(|group| group.title.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let mut l_pairs: Vec<(&str, EnumCellValue)> = vec![
        ("Board Name", EnumCellValue::String(board.name.clone())),
        ("Board ID", EnumCellValue::String(board.id.clone())),
        ("Group Count", EnumCellValue::Number(board.groups.len() as f64)),
        ("Groups", EnumCellValue::from_text(&c_groups)),
        (
            "Column Count (visible)",
            EnumCellValue::Number(model.columns.len() as f64),
        ),
        (
            "Item Count (top-level)",
            EnumCellValue::Number(model.n_items as f64),
        ),
    ];
    if options.if_include_subitems {
        l_pairs.push((
            "Subitem Count",
            EnumCellValue::Number(model.n_subitems as f64),
        ));
        l_pairs.push(("Total Rows", EnumCellValue::Number(model.n_rows() as f64)));
    }
    if let Some(c_desc) = board.description.as_deref()
        && !c_desc.trim().is_empty()
    {
        l_pairs.push(("Description", EnumCellValue::from_text(c_desc)));
    }
    l_pairs.push(("Exported At", EnumCellValue::DateTime(options.exported_at)));

    let rows = l_pairs
        .into_iter()
        .map(|(label, value)| SpecSheetRow {
            cells: vec![EnumCellValue::String(label.to_string()), value],
            fmt: fmts.fmt_text.clone(),
            fmts_patch_by_col: BTreeMap::new(),
        })
        .collect();

    SpecSheet {
        sheet_name: C_SHEET_SUMMARY.to_string(),
        header: vec!["Property".to_string(), "Value".to_string()],
        rows,
        fmt_header: fmts.fmt_header.clone(),
        fmt_datetime_patch: fmts.fmt_datetime.clone(),
        widths_by_col: vec![N_WIDTH_SUMMARY_LABEL, N_WIDTH_SUMMARY_VALUE],
        row_freeze: 0,
        col_freeze: 0,
        if_autofilter: false,
    }
}

#[cfg(test)]
mod tests {
    use boardkit_io_xlsx::{C_NUM_FORMAT_DATETIME, write_workbook_to_buffer};
    use chrono::NaiveDate;

    use super::*;
    use crate::rows::{SpecRowModelOptions, build_row_model};
    use crate::testing::fake_snapshot;

    fn exported_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .and_then(|date| date.and_hms_opt(12, 0, 0))
            .expect("valid date")
    }

    fn summary_value<'a>(sheet: &'a SpecSheet, label: &str) -> Option<&'a EnumCellValue> {
        sheet
            .rows
            .iter()
            .find(|row| row.cells[0] == EnumCellValue::String(label.to_string()))
            .map(|row| &row.cells[1])
    }

    fn text_cell(text: &str) -> EnumCellValue {
        EnumCellValue::String(text.to_string())
    }

    #[test]
    fn test_two_groups_three_items_scenario() {
        let snapshot = fake_snapshot(3, 0);
        let model = build_row_model(&snapshot, &SpecRowModelOptions::default());
        let options = SpecRenderOptions::new(exported_at());
        let workbook = render_workbook(&model, &snapshot.board, &options);

        let sheet_items = workbook.sheet("Items").expect("items sheet");
        assert_eq!(sheet_items.height_body(), 3);
        assert_eq!(sheet_items.header[..6], TUP_HEADER_IDENTITY.map(String::from));
        assert_eq!(
            sheet_items.header[6..],
            ["Name", "Status", "Due", "Estimate"].map(String::from)
        );
        assert_eq!(sheet_items.row_freeze, 1);
        assert!(sheet_items.if_autofilter);

        let l_groups: Vec<&EnumCellValue> =
            sheet_items.rows.iter().map(|row| &row.cells[2]).collect();
        assert_eq!(
            l_groups,
            vec![&text_cell("Now"), &text_cell("Later"), &text_cell("Now")]
        );
        assert!(matches!(sheet_items.rows[0].cells[8], EnumCellValue::DateTime(_)));
        assert_eq!(sheet_items.rows[0].cells[9], EnumCellValue::Number(2.0));
        assert_eq!(
            sheet_items.fmt_datetime_patch.num_format.as_deref(),
            Some(C_NUM_FORMAT_DATETIME)
        );

        let sheet_summary = workbook.sheet("Summary").expect("summary sheet");
        assert_eq!(
            summary_value(sheet_summary, "Item Count (top-level)"),
            Some(&EnumCellValue::Number(3.0))
        );
        assert_eq!(
            summary_value(sheet_summary, "Group Count"),
            Some(&EnumCellValue::Number(2.0))
        );
        assert!(summary_value(sheet_summary, "Subitem Count").is_none());
        assert_eq!(
            summary_value(sheet_summary, "Exported At"),
            Some(&EnumCellValue::DateTime(exported_at()))
        );

        let (v_bytes, report) = write_workbook_to_buffer(&workbook).expect("xlsx bytes");
        assert!(v_bytes.starts_with(b"PK"));
        assert_eq!(report.sheets[0].n_rows_body, 3);
    }

    #[test]
    fn test_body_rows_carry_thin_border() {
        let snapshot = fake_snapshot(3, 0);
        let model = build_row_model(&snapshot, &SpecRowModelOptions::default());
        let workbook =
            render_workbook(&model, &snapshot.board, &SpecRenderOptions::new(exported_at()));

        for sheet in &workbook.sheets {
            assert_eq!(sheet.fmt_header.border, Some(1));
            for row in &sheet.rows {
                assert_eq!(row.fmt.border, Some(1), "{}", sheet.sheet_name);
                assert_eq!(row.fmt.border_color.as_deref(), Some("#D9D9D9"));
            }
        }
    }

    #[test]
    fn test_summary_lists_board_identity_and_groups_in_position_order() {
        let snapshot = fake_snapshot(2, 0);
        let model = build_row_model(&snapshot, &SpecRowModelOptions::default());
        let workbook =
            render_workbook(&model, &snapshot.board, &SpecRenderOptions::new(exported_at()));

        let sheet_summary = &workbook.sheets[1];
        assert_eq!(sheet_summary.header, vec!["Property", "Value"]);
        assert_eq!(sheet_summary.rows[0].cells[0], text_cell("Board Name"));
        assert_eq!(
            summary_value(sheet_summary, "Board Name"),
            Some(&text_cell("Roadmap Q3"))
        );
        assert_eq!(summary_value(sheet_summary, "Board ID"), Some(&text_cell("7")));
        assert_eq!(
            summary_value(sheet_summary, "Groups"),
            Some(&text_cell("Now, Later"))
        );
        assert_eq!(
            summary_value(sheet_summary, "Description"),
            Some(&text_cell("Quarterly roadmap"))
        );
        assert_eq!(sheet_summary.widths_by_col, vec![18.0, 60.0]);

        let mut board_bare = snapshot.board.clone();
        board_bare.description = Some("   ".to_string());
        let workbook = render_workbook(&model, &board_bare, &SpecRenderOptions::new(exported_at()));
        assert!(summary_value(&workbook.sheets[1], "Description").is_none());
    }

    #[test]
    fn test_alternating_fill_and_subitem_styling() {
        let snapshot = fake_snapshot(2, 1);
        let model = build_row_model(
            &snapshot,
            &SpecRowModelOptions {
                if_include_subitems: true,
                ..Default::default()
            },
        );
        let mut options = SpecRenderOptions::new(exported_at());
        options.if_include_subitems = true;
        let workbook = render_workbook(&model, &snapshot.board, &options);

        let sheet_items = &workbook.sheets[0];
        assert_eq!(sheet_items.height_body(), 4);
        assert!(sheet_items.rows[0].fmt.bg_color.is_some());
        assert!(sheet_items.rows[1].fmt.bg_color.is_none());
        assert_eq!(sheet_items.rows[1].fmt.italic, Some(true));
        assert_eq!(
            sheet_items.rows[1].fmts_patch_by_col[&N_IDX_COL_NAME].indent,
            Some(1)
        );
        assert!(sheet_items.rows[0].fmts_patch_by_col.is_empty());

        let sheet_summary = &workbook.sheets[1];
        assert_eq!(
            summary_value(sheet_summary, "Subitem Count"),
            Some(&EnumCellValue::Number(2.0))
        );
        assert_eq!(
            summary_value(sheet_summary, "Total Rows"),
            Some(&EnumCellValue::Number(4.0))
        );
    }

    #[test]
    fn test_empty_board_renders_header_only() {
        let snapshot = fake_snapshot(0, 0);
        let model = build_row_model(&snapshot, &SpecRowModelOptions::default());
        let workbook =
            render_workbook(&model, &snapshot.board, &SpecRenderOptions::new(exported_at()));

        let sheet_items = &workbook.sheets[0];
        assert_eq!(sheet_items.height_body(), 0);
        assert_eq!(sheet_items.width(), 10);
        assert!(sheet_items.widths_by_col.iter().all(|n_width| *n_width >= 12.0));
        assert_eq!(
            summary_value(&workbook.sheets[1], "Item Count (top-level)"),
            Some(&EnumCellValue::Number(0.0))
        );
        assert!(write_workbook_to_buffer(&workbook).is_ok());
    }
}
