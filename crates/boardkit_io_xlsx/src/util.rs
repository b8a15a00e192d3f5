//! Stateless helper utilities used by the XLSX writer kernel.

use crate::conf::{
    C_NUM_FORMAT_DATETIME, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    TUP_EXCEL_ILLEGAL,
};
use crate::spec::{EnumCellValue, SpecAutofitCellsPolicy, SpecSheet, SpecSheetRow, XlsxWriteError};

/// Excel's hard column width ceiling.
const N_WIDTH_EXCEL_MAX: usize = 255;

////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Create suffixed sheet name (`base_2`, `base_3`, ...), respecting length cap.
pub fn create_sheet_identifier(base_name: &str, part_idx_1based: usize) -> String {
    let c_sheet_name_suffix = format!("_{part_idx_1based}");
    let n_len_base_name_max = N_LEN_EXCEL_SHEET_NAME_MAX.saturating_sub(c_sheet_name_suffix.len());

    let c_sheet_name_base: String = base_name
        .chars()
        .take(usize::max(1, n_len_base_name_max))
        .collect();

    format!("{c_sheet_name_base}{c_sheet_name_suffix}")
}

/// Check that every row matches the header width and the sheet fits Excel limits.
pub fn validate_sheet_shape(sheet: &SpecSheet) -> Result<(), XlsxWriteError> {
    let n_cols = sheet.width();
    let n_rows = sheet.height_body() + 1;
    if n_rows > N_NROWS_EXCEL_MAX || n_cols > N_NCOLS_EXCEL_MAX {
        return Err(XlsxWriteError::SheetTooLarge {
            sheet_name: sheet.sheet_name.clone(),
            n_rows,
            n_cols,
        });
    }

    for (row_idx, row) in sheet.rows.iter().enumerate() {
        if row.cells.len() != n_cols {
            return Err(XlsxWriteError::RaggedRow {
                sheet_name: sheet.sheet_name.clone(),
                row_idx,
                n_cells: row.cells.len(),
                n_cols,
            });
        }
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ColumnWidth

/// Estimate displayed width units for one cell value.
///
/// Multi-line text is measured by its longest line; date-times by the length of
/// the fixed display pattern.
pub fn estimate_width_len(value: &EnumCellValue) -> usize {
    match value {
        EnumCellValue::None => 0,
        EnumCellValue::String(s) => s
            .lines()
            .map(estimate_unicode_string_width)
            .max()
            .unwrap_or(0),
        EnumCellValue::Number(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                (*n as i64).to_string().len()
            } else {
                n.to_string().len()
            }
        }
        EnumCellValue::DateTime(_) => C_NUM_FORMAT_DATETIME.len(),
    }
}

fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

/// Plan per-column widths from header labels and body values.
///
/// The header (plus padding) sets a floor no lower than `width_cell_min`; body
/// content may widen a column up to `width_cell_max`.
pub fn plan_column_widths(
    header: &[String],
    rows: &[SpecSheetRow],
    policy: &SpecAutofitCellsPolicy,
) -> Vec<f64> {
    let n_pad = policy.width_cell_padding;
    let n_min = usize::max(1, policy.width_cell_min);
    let n_max = usize::min(N_WIDTH_EXCEL_MAX, usize::max(n_min, policy.width_cell_max));

    let mut l_width_by_col_body = vec![0usize; header.len()];
    let n_rows_inspected = policy
        .height_body_inferred_max
        .map_or(rows.len(), |n_max_rows| usize::min(n_max_rows, rows.len()));
    for row in rows.iter().take(n_rows_inspected) {
        for (n_idx_col, value) in row.cells.iter().enumerate().take(header.len()) {
            l_width_by_col_body[n_idx_col] =
                usize::max(l_width_by_col_body[n_idx_col], estimate_width_len(value));
        }
    }

    header
        .iter()
        .zip(l_width_by_col_body)
        .map(|(label, n_width_body)| {
            let n_width_header = estimate_width_len(&EnumCellValue::String(label.clone())) + n_pad;
            let n_floor = usize::min(N_WIDTH_EXCEL_MAX, usize::max(n_min, n_width_header));
            let n_body = if n_width_body == 0 {
                0
            } else {
                usize::min(n_max, n_width_body + n_pad)
            };
            usize::max(n_floor, n_body) as f64
        })
        .collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
