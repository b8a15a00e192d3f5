//! End-to-end export run.

use std::path::PathBuf;

use boardkit_io_xlsx::write_workbook;
use chrono::Utc;
use tracing::{info, warn};

use crate::client::{GraphqlTransport, MondayClient};
use crate::conf::C_FILE_STEM_FALLBACK;
use crate::render::{SpecRenderOptions, render_workbook};
use crate::report::ReportExport;
use crate::rows::{SpecRowModelOptions, build_row_model};
use crate::spec::{ExportError, SpecClientSettings, SpecExportOptions};

/// Export one board to an XLSX workbook over HTTP.
///
/// Settings and options are validated before any request is made. The file is
/// written only after fetching, row building and rendering all succeeded.
pub fn export_board(
    settings: &SpecClientSettings,
    options: &SpecExportOptions,
) -> Result<ReportExport, ExportError> {
    options.validate()?;
    let client = MondayClient::connect(settings.clone())?;
    export_board_with_client(&client, options)
}

/// Same as [`export_board`], over an already built client.
pub fn export_board_with_client<T: GraphqlTransport>(
    client: &MondayClient<T>,
    options: &SpecExportOptions,
) -> Result<ReportExport, ExportError> {
    options.validate()?;

    let snapshot = client.fetch_board(options.board_id, options.if_include_subitems)?;
    let mut warnings = Vec::new();
    if snapshot.items.is_empty() {
        let msg = format!("No items retrieved for board {}.", options.board_id);
        warn!("{msg}");
        warnings.push(msg);
    }
    if let Some(n_reported) = snapshot.board.items_count
        && n_reported != snapshot.items.len() as u64
    {
        let msg = format!(
            "Board {} reports {} items but {} were retrieved.",
            options.board_id,
            n_reported,
            snapshot.items.len()
        );
        warn!("{msg}");
        warnings.push(msg);
    }

    let model = build_row_model(
        &snapshot,
        &SpecRowModelOptions {
            if_include_subitems: options.if_include_subitems,
            cols_excluded: options.cols_excluded.clone(),
        },
    );
    warnings.extend(model.warnings.iter().cloned());

    let mut options_render = SpecRenderOptions::new(Utc::now().naive_utc());
    options_render.if_include_subitems = options.if_include_subitems;
    let workbook = render_workbook(&model, &snapshot.board, &options_render);

    let path_file_out = options
        .path_file_out
        .clone()
        .unwrap_or_else(|| derive_default_output_path(&snapshot.board.name));
    let report_xlsx = write_workbook(&workbook, &path_file_out)?;
    warnings.extend(report_xlsx.warnings);
    info!(
        "Workbook saved to {} ({} rows)",
        path_file_out.display(),
        model.n_rows()
    );

    Ok(ReportExport {
        path_file_out,
        board_name: snapshot.board.name,
        cnt_items: model.n_items as u64,
        cnt_subitems: model.n_subitems as u64,
        cnt_rows: model.n_rows() as u64,
        cnt_fallbacks: model.n_fallbacks as u64,
        warnings,
    })
}

/// Default output file for a board: `<safe board name>.xlsx` in the working directory.
///
/// Characters other than alphanumerics, space, `-` and `_` become `_`, and
/// whitespace runs collapse to a single `_`.
pub fn derive_default_output_path(board_name: &str) -> PathBuf {
    let c_safe: String = board_name
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() || matches!(ch, ' ' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let c_stem = c_safe.split_whitespace().collect::<Vec<_>>().join("_");
    let c_stem = if c_stem.is_empty() {
        C_FILE_STEM_FALLBACK.to_string()
    } else {
        c_stem
    };
    PathBuf::from(format!("{c_stem}.xlsx"))
}
