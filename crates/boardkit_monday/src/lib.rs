//! `boardkit_monday` v1:
//! monday.com board export pipeline.
//!
//! Architecture:
//! - `conf`      : constants, GraphQL documents and default presets
//! - `spec`      : settings/options and the error taxonomy
//! - `model`     : board/group/column/item snapshots decoded from the API
//! - `normalize` : column value normalizer
//! - `client`    : paginated GraphQL client and HTTP transport
//! - `rows`      : row model builder
//! - `render`    : workbook renderer (row model -> workbook description)
//! - `report`    : run report model
//! - `export`    : end-to-end export orchestration
pub mod client;
pub mod conf;
pub mod export;
pub mod model;
pub mod normalize;
pub mod render;
pub mod report;
pub mod rows;
pub mod spec;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{
    GraphqlTransport, MondayClient, ReqwestTransport, SpecTransportResponse, TransportError,
};
pub use export::{derive_default_output_path, export_board, export_board_with_client};
pub use model::{
    EnumColumnType, SpecBoard, SpecBoardSnapshot, SpecColumn, SpecColumnValue, SpecGroup,
    SpecGroupRef, SpecItem, SpecPerson,
};
pub use normalize::{
    EnumNormalizeFallback, SpecNormalizedCell, normalize_column_value,
    normalize_column_value_traced, parse_timestamp,
};
pub use render::{SpecRenderOptions, render_workbook};
pub use report::ReportExport;
pub use rows::{EnumRowKind, SpecRowModel, SpecRowModelOptions, SpecRowRecord, build_row_model};
pub use spec::{
    EnumCredentialKind, ExportError, SpecClientSettings, SpecExportOptions, SpecRetryPolicy,
};
