//! Workbook description models, write errors and reports.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use rust_xlsxwriter::XlsxError;

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Declarative cell format; converted to a `rust_xlsxwriter::Format` at write time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Italic style.
    pub italic: Option<bool>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Indentation level.
    pub indent: Option<u8>,
    /// Border style for all sides.
    pub border: Option<i64>,
    /// Border color for all sides.
    pub border_color: Option<String>,
    /// Text wrap.
    pub text_wrap: Option<bool>,

    /// Number format code.
    pub num_format: Option<String>,
    /// Background fill color.
    pub bg_color: Option<String>,
    /// Font color.
    pub font_color: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            indent: other.indent.or(self.indent),
            border: other.border.or(self.border),
            border_color: other
                .border_color
                .clone()
                .or_else(|| self.border_color.clone()),
            text_wrap: other.text_wrap.or(self.text_wrap),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
        }
    }
}

/// Display-ready cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Missing/blank value.
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
    /// Naive (timezone-free) date-time value.
    DateTime(NaiveDateTime),
}

impl EnumCellValue {
    /// Whether the value is blank.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Build a text value, mapping empty/whitespace-only input to [`Self::None`].
    pub fn from_text(text: &str) -> Self {
        let c_text = text.trim();
        if c_text.is_empty() {
            Self::None
        } else {
            Self::String(c_text.to_string())
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region AutofitSpecification

/// Column width inference policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAutofitCellsPolicy {
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
    /// Max body rows inspected; `None` inspects all rows.
    pub height_body_inferred_max: Option<usize>,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            width_cell_min: 12,
            width_cell_max: 48,
            width_cell_padding: 2,
            height_body_inferred_max: Some(20_000),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetSpecification

/// One body row of a sheet description.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecSheetRow {
    /// Cell values in column order.
    pub cells: Vec<EnumCellValue>,
    /// Row-level format shared by every cell.
    pub fmt: SpecCellFormat,
    /// Per-column patches overlaid on `fmt`.
    pub fmts_patch_by_col: BTreeMap<usize, SpecCellFormat>,
}

/// Complete description of one worksheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecSheet {
    /// Requested sheet name; sanitized and de-duplicated on write.
    pub sheet_name: String,
    /// Header labels (single header row).
    pub header: Vec<String>,
    /// Body rows; each must have `header.len()` cells.
    pub rows: Vec<SpecSheetRow>,
    /// Header cell format.
    pub fmt_header: SpecCellFormat,
    /// Patch overlaid on date-time cells.
    pub fmt_datetime_patch: SpecCellFormat,
    /// Column widths in character units, by column index.
    pub widths_by_col: Vec<f64>,
    /// Number of frozen rows.
    pub row_freeze: usize,
    /// Number of frozen columns.
    pub col_freeze: usize,
    /// Add an autofilter over the populated range.
    pub if_autofilter: bool,
}

impl SpecSheet {
    /// Number of columns.
    pub fn width(&self) -> usize {
        self.header.len()
    }

    /// Number of body rows.
    pub fn height_body(&self) -> usize {
        self.rows.len()
    }
}

/// Ordered sheet descriptions making up one workbook.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecWorkbook {
    /// Sheets in tab order.
    pub sheets: Vec<SpecSheet>,
    /// Index of the sheet selected when the file is opened.
    pub idx_sheet_active: usize,
}

impl SpecWorkbook {
    /// Look up a sheet by its requested name.
    pub fn sheet(&self, sheet_name: &str) -> Option<&SpecSheet> {
        self.sheets
            .iter()
            .find(|sheet| sheet.sheet_name == sheet_name)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportAndErrors

/// Emitted sheet summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheetReport {
    /// Actual unique sheet name in workbook.
    pub sheet_name: String,
    /// Body rows written.
    pub n_rows_body: usize,
    /// Columns written.
    pub n_cols: usize,
}

/// Per-workbook write report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxReport {
    /// Sheets written, in tab order.
    pub sheets: Vec<SpecSheetReport>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecXlsxReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

/// Failures raised while validating or emitting a workbook.
#[derive(Debug, thiserror::Error)]
pub enum XlsxWriteError {
    /// Row has a different cell count than the header.
    #[error("sheet {sheet_name:?}: row {row_idx} has {n_cells} cells, expected {n_cols}")]
    RaggedRow {
        /// Sheet being written.
        sheet_name: String,
        /// Zero-based body row index.
        row_idx: usize,
        /// Cells found in the row.
        n_cells: usize,
        /// Header width.
        n_cols: usize,
    },
    /// Sheet exceeds Excel's row or column limits.
    #[error("sheet {sheet_name:?} exceeds Excel limits: {n_rows} rows x {n_cols} columns")]
    SheetTooLarge {
        /// Sheet being written.
        sheet_name: String,
        /// Total rows including the header.
        n_rows: usize,
        /// Total columns.
        n_cols: usize,
    },
    /// Row or column index does not fit Excel's index types.
    #[error("{axis} index overflow: {value}")]
    IndexOverflow {
        /// `row` or `column`.
        axis: &'static str,
        /// Offending index.
        value: usize,
    },
    /// Writer already flushed its workbook.
    #[error("cannot write after close()")]
    Closed,
    /// Output directory could not be prepared.
    #[error("failed to prepare output directory {path}: {source}")]
    OutputDir {
        /// Directory path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// Error reported by `rust_xlsxwriter`.
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] XlsxError),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
