//! boardkit CLI - export monday.com boards into formatted Excel workbooks

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use boardkit_monday::{
    ExportError, ReportExport, SpecClientSettings, SpecExportOptions, export_board,
};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "boardkit")]
#[command(
    author,
    version,
    about = "Export monday.com board data into formatted Excel workbooks"
)]
struct Cli {
    /// Numeric ID of the monday.com board
    #[arg(short, long)]
    board_id: u64,

    /// Destination XLSX file (default: '<board-name>.xlsx' in the current directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// monday.com API token
    #[arg(long, env = "MONDAY_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Include subitems (if present) after each item
    #[arg(long)]
    include_subitems: bool,

    /// Items requested per page (1-1000)
    #[arg(long)]
    page_size: Option<usize>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Column id to leave out of the Items sheet (repeatable)
    #[arg(long = "exclude-column", value_name = "COLUMN_ID")]
    cols_excluded: Vec<String>,

    /// Enable verbose logging output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(report) => {
            println!(
                "Successfully exported board {} ({} items) to {}",
                report.board_name,
                report.cnt_items,
                report.path_file_out.display()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(if_verbose: bool) {
    let level_default = if if_verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<ReportExport> {
    let settings = resolve_settings(cli, |key| std::env::var(key).ok())
        .context("Configuration error")?;
    let options = SpecExportOptions {
        board_id: cli.board_id,
        if_include_subitems: cli.include_subitems,
        path_file_out: cli.output.clone(),
        cols_excluded: cli.cols_excluded.clone(),
    };
    info!("Exporting board {} with {:?}", cli.board_id, settings);

    let report = export_board(&settings, &options).map_err(|err| {
        let c_prefix = describe_failure(&err);
        anyhow::Error::new(err).context(c_prefix)
    })?;
    info!("{report}");
    Ok(report)
}

fn resolve_settings<F>(cli: &Cli, lookup: F) -> Result<SpecClientSettings, ExportError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = SpecClientSettings::from_lookup(cli.api_token.clone(), lookup)?;
    if let Some(page_size) = cli.page_size {
        settings.page_size = page_size;
    }
    if let Some(timeout) = cli.timeout {
        settings.timeout_seconds = timeout;
    }
    settings.validate()?;
    Ok(settings)
}

fn describe_failure(err: &ExportError) -> &'static str {
    if err.is_config() {
        "Configuration error"
    } else if err.is_write() {
        "Failed to export to Excel"
    } else {
        "Failed to fetch board"
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_full_argument_set() {
        let cli = Cli::try_parse_from([
            "boardkit",
            "-b",
            "12345",
            "-o",
            "out/board.xlsx",
            "--api-token",
            "tok",
            "--include-subitems",
            "--page-size",
            "200",
            "--exclude-column",
            "status",
            "--exclude-column",
            "date4",
            "-v",
        ])
        .expect("parse");

        assert_eq!(cli.board_id, 12345);
        assert_eq!(cli.output, Some(PathBuf::from("out/board.xlsx")));
        assert!(cli.include_subitems);
        assert_eq!(cli.page_size, Some(200));
        assert_eq!(cli.cols_excluded, vec!["status", "date4"]);
        assert!(cli.verbose);
    }

    #[test]
    fn test_page_size_out_of_range_is_a_configuration_error() {
        let cli = Cli::try_parse_from([
            "boardkit",
            "-b",
            "1",
            "--api-token",
            "tok",
            "--page-size",
            "1500",
        ])
        .expect("parse");
        let err = resolve_settings(&cli, no_env).expect_err("page size");
        assert_eq!(describe_failure(&err), "Configuration error");
        assert!(err.to_string().contains("1500"));
    }

    #[test]
    fn test_resolve_settings_applies_overrides() {
        let cli = Cli::try_parse_from([
            "boardkit",
            "-b",
            "1",
            "--api-token",
            "tok",
            "--page-size",
            "50",
            "--timeout",
            "10",
        ])
        .expect("parse");

        let settings = resolve_settings(&cli, no_env).expect("settings");
        assert_eq!(settings.api_token, "tok");
        assert_eq!(settings.page_size, 50);
        assert_eq!(settings.timeout_seconds, 10);
    }

    #[test]
    fn test_resolve_settings_rejects_zero_timeout() {
        let cli = Cli::try_parse_from([
            "boardkit",
            "-b",
            "1",
            "--api-token",
            "tok",
            "--timeout",
            "0",
        ])
        .expect("parse");
        let err = resolve_settings(&cli, no_env).expect_err("timeout");
        assert_eq!(describe_failure(&err), "Configuration error");
    }

    #[test]
    fn test_failure_prefixes() {
        assert_eq!(
            describe_failure(&ExportError::Config("x".to_string())),
            "Configuration error"
        );
        assert_eq!(
            describe_failure(&ExportError::BoardNotFound(1)),
            "Failed to fetch board"
        );
    }
}
