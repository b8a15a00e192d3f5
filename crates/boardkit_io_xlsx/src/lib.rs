//! `boardkit_io_xlsx` v1:
//! Workbook description model and XLSX writer kernel.
//!
//! Architecture:
//! - `conf`   : constants and default presets
//! - `spec`   : workbook/sheet/format models, errors and reports
//! - `util`   : pure helper functions (naming, width planning, shape checks)
//! - `writer` : `rust_xlsxwriter` emission kernel
pub mod conf;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    C_NUM_FORMAT_DATETIME, EnumFmtKey, N_LEN_EXCEL_SHEET_NAME_MAX, N_LEN_EXCEL_STRING_MAX,
    N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL, derive_default_autofit_policy,
    derive_default_xlsx_formats,
};
pub use spec::{
    EnumCellValue, SpecAutofitCellsPolicy, SpecCellFormat, SpecSheet, SpecSheetReport,
    SpecSheetRow, SpecWorkbook, SpecXlsxReport, XlsxWriteError,
};
pub use util::{
    create_sheet_identifier, estimate_width_len, plan_column_widths, sanitize_sheet_name,
    validate_sheet_shape,
};
pub use writer::{XlsxWriter, write_workbook, write_workbook_to_buffer};
