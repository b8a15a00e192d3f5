//! XLSX writer kernel that emits workbook descriptions through `rust_xlsxwriter`.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDateTime, Timelike};
use rust_xlsxwriter::{ExcelDateTime, Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use tracing::{debug, info, warn};

use crate::conf::N_LEN_EXCEL_STRING_MAX;
use crate::spec::{
    EnumCellValue, SpecCellFormat, SpecSheet, SpecSheetReport, SpecWorkbook, SpecXlsxReport,
    XlsxWriteError,
};
use crate::util::{create_sheet_identifier, sanitize_sheet_name, validate_sheet_shape};

/// Stateful workbook writer.
///
/// Sheets are buffered in memory until [`Self::close`] is called, so a failed
/// run leaves no partial file behind.
pub struct XlsxWriter {
    path_file_out: PathBuf,
    workbook: Workbook,
    dict_fmt_cache: HashMap<SpecCellFormat, Format>,
    set_sheet_names_existing: BTreeSet<String>,
    report: SpecXlsxReport,
    if_closed: bool,
}

impl XlsxWriter {
    /// Create writer bound to an output path.
    pub fn new(path_file_out: PathBuf) -> Self {
        Self {
            path_file_out,
            workbook: Workbook::new(),
            dict_fmt_cache: HashMap::new(),
            set_sheet_names_existing: BTreeSet::new(),
            report: SpecXlsxReport::default(),
            if_closed: false,
        }
    }

    /// Return snapshot of the write report.
    pub fn report(&self) -> SpecXlsxReport {
        self.report.clone()
    }

    /// Write every sheet of `spec_workbook` and mark the active sheet.
    pub fn write_workbook(&mut self, spec_workbook: &SpecWorkbook) -> Result<(), XlsxWriteError> {
        for (n_idx_sheet, sheet) in spec_workbook.sheets.iter().enumerate() {
            let worksheet = self.write_sheet(sheet)?;
            if n_idx_sheet == spec_workbook.idx_sheet_active {
                worksheet.set_active(true);
            }
        }
        Ok(())
    }

    /// Write one sheet description.
    pub fn write_sheet(&mut self, sheet: &SpecSheet) -> Result<&mut Worksheet, XlsxWriteError> {
        if self.if_closed {
            return Err(XlsxWriteError::Closed);
        }
        validate_sheet_shape(sheet)?;

        let sheet_name_unique =
            self.derive_unique_sheet_name(&sanitize_sheet_name(&sheet.sheet_name, "_"));
        let mut l_warnings = Vec::new();

        let worksheet = self.workbook.add_worksheet();
        worksheet.set_name(&sheet_name_unique)?;

        let fmt_header = derive_cached_format(&mut self.dict_fmt_cache, &sheet.fmt_header);
        for (n_idx_col, label) in sheet.header.iter().enumerate() {
            worksheet.write_string_with_format(0, cast_col_num(n_idx_col)?, label, &fmt_header)?;
        }

        for (n_idx_row, row) in sheet.rows.iter().enumerate() {
            let n_row = cast_row_num(n_idx_row + 1)?;
            for (n_idx_col, value) in row.cells.iter().enumerate() {
                let mut fmt_spec = match row.fmts_patch_by_col.get(&n_idx_col) {
                    Some(fmt_patch) => row.fmt.merge(fmt_patch),
                    None => row.fmt.clone(),
                };
                if matches!(value, EnumCellValue::DateTime(_)) {
                    fmt_spec = fmt_spec.merge(&sheet.fmt_datetime_patch);
                }
                let format = derive_cached_format(&mut self.dict_fmt_cache, &fmt_spec);
                let n_col = cast_col_num(n_idx_col)?;
                if let Some(msg) =
                    write_cell_with_format(worksheet, n_row, n_col, value, &format)?
                {
                    l_warnings.push(msg);
                }
            }
        }

        for (n_idx_col, n_width) in sheet.widths_by_col.iter().enumerate() {
            worksheet.set_column_width(cast_col_num(n_idx_col)?, *n_width)?;
        }

        if sheet.row_freeze > 0 || sheet.col_freeze > 0 {
            worksheet.set_freeze_panes(
                cast_row_num(sheet.row_freeze)?,
                cast_col_num(sheet.col_freeze)?,
            )?;
        }

        if sheet.if_autofilter && sheet.width() > 0 {
            worksheet.autofilter(
                0,
                0,
                cast_row_num(sheet.height_body())?,
                cast_col_num(sheet.width() - 1)?,
            )?;
        }

        debug!(
            sheet = %sheet_name_unique,
            rows = sheet.height_body(),
            cols = sheet.width(),
            "sheet written"
        );
        for msg in l_warnings {
            warn!(sheet = %sheet_name_unique, "{msg}");
            self.report.warn(msg);
        }
        self.report.sheets.push(SpecSheetReport {
            sheet_name: sheet_name_unique,
            n_rows_body: sheet.height_body(),
            n_cols: sheet.width(),
        });

        Ok(worksheet)
    }

    /// Flush workbook to disk, creating missing parent directories. Idempotent.
    pub fn close(&mut self) -> Result<(), XlsxWriteError> {
        if self.if_closed {
            return Ok(());
        }
        if let Some(path_dir) = self.path_file_out.parent()
            && !path_dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(path_dir).map_err(|source| XlsxWriteError::OutputDir {
                path: path_dir.to_path_buf(),
                source,
            })?;
        }
        self.workbook.save(&self.path_file_out)?;
        self.if_closed = true;
        info!(path = %self.path_file_out.display(), "workbook saved");
        Ok(())
    }

    /// Serialize the buffered workbook to bytes instead of a file.
    pub fn close_to_buffer(&mut self) -> Result<Vec<u8>, XlsxWriteError> {
        if self.if_closed {
            return Err(XlsxWriteError::Closed);
        }
        let v_bytes = self.workbook.save_to_buffer()?;
        self.if_closed = true;
        Ok(v_bytes)
    }

    fn derive_unique_sheet_name(&mut self, name: &str) -> String {
        if !self.set_sheet_names_existing.contains(name) {
            self.set_sheet_names_existing.insert(name.to_string());
            return name.to_string();
        }

        let mut n_idx = 2usize;
        loop {
            let candidate = create_sheet_identifier(name, n_idx);
            if !self.set_sheet_names_existing.contains(&candidate) {
                self.set_sheet_names_existing.insert(candidate.clone());
                return candidate;
            }
            n_idx += 1;
        }
    }
}

/// Write a complete workbook description to `path_file_out`.
pub fn write_workbook(
    spec_workbook: &SpecWorkbook,
    path_file_out: &Path,
) -> Result<SpecXlsxReport, XlsxWriteError> {
    let mut writer = XlsxWriter::new(path_file_out.to_path_buf());
    writer.write_workbook(spec_workbook)?;
    writer.close()?;
    Ok(writer.report())
}

/// Render a complete workbook description into XLSX bytes.
pub fn write_workbook_to_buffer(
    spec_workbook: &SpecWorkbook,
) -> Result<(Vec<u8>, SpecXlsxReport), XlsxWriteError> {
    let mut writer = XlsxWriter::new(PathBuf::new());
    writer.write_workbook(spec_workbook)?;
    let v_bytes = writer.close_to_buffer()?;
    Ok((v_bytes, writer.report()))
}

fn derive_cached_format(
    dict_fmt_cache: &mut HashMap<SpecCellFormat, Format>,
    spec: &SpecCellFormat,
) -> Format {
    dict_fmt_cache
        .entry(spec.clone())
        .or_insert_with(|| derive_rust_xlsx_format(spec))
        .clone()
}

/// Write one value; returns a warning when the value had to be degraded.
fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &EnumCellValue,
    format: &Format,
) -> Result<Option<String>, XlsxWriteError> {
    match value {
        EnumCellValue::None => {
            worksheet.write_blank(row, col, format)?;
        }
        EnumCellValue::String(val) => match val.char_indices().nth(N_LEN_EXCEL_STRING_MAX) {
            Some((n_idx_cut, _)) => {
                worksheet.write_string_with_format(row, col, &val[..n_idx_cut], format)?;
                return Ok(Some(format!(
                    "text at row {row} column {col} truncated to {N_LEN_EXCEL_STRING_MAX} chars"
                )));
            }
            None => {
                worksheet.write_string_with_format(row, col, val, format)?;
            }
        },
        EnumCellValue::Number(val) => {
            if val.is_finite() {
                worksheet.write_number_with_format(row, col, *val, format)?;
            } else {
                worksheet.write_string_with_format(row, col, val.to_string(), format)?;
            }
        }
        EnumCellValue::DateTime(val) => match derive_excel_datetime(val) {
            Some(dt_excel) => {
                worksheet.write_datetime_with_format(row, col, &dt_excel, format)?;
            }
            None => {
                let c_text = val.format("%Y-%m-%d %H:%M").to_string();
                worksheet.write_string_with_format(row, col, &c_text, format)?;
                return Ok(Some(format!(
                    "date {c_text} at row {row} column {col} outside Excel's range; kept as text"
                )));
            }
        },
    }
    Ok(None)
}

fn derive_excel_datetime(dt: &NaiveDateTime) -> Option<ExcelDateTime> {
    let n_year = u16::try_from(dt.year()).ok()?;
    let n_seconds = f64::from(dt.second()) + f64::from(dt.nanosecond()) / 1e9;
    ExcelDateTime::from_ymd(n_year, dt.month() as u8, dt.day() as u8)
        .and_then(|dt_excel| dt_excel.and_hms(dt.hour() as u16, dt.minute() as u8, n_seconds))
        .ok()
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if spec.italic.unwrap_or(false) {
        format = format.set_italic();
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = spec.indent {
        format = format.set_indent(val);
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = &spec.font_color {
        format = format.set_font_color(val.as_str());
    }

    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }
    if let Some(val) = &spec.border_color {
        format = format.set_border_color(val.as_str());
    }

    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    let value = align.trim().to_ascii_lowercase();
    match value.as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

fn cast_row_num(value: usize) -> Result<u32, XlsxWriteError> {
    u32::try_from(value).map_err(|_| XlsxWriteError::IndexOverflow { axis: "row", value })
}

fn cast_col_num(value: usize) -> Result<u16, XlsxWriteError> {
    u16::try_from(value).map_err(|_| XlsxWriteError::IndexOverflow {
        axis: "column",
        value,
    })
}
