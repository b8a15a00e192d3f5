//! Export settings, options and top-level error types.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use boardkit_io_xlsx::XlsxWriteError;
use reqwest::Url;

use crate::conf::{
    C_API_URL_DEFAULT, C_API_VERSION_DEFAULT, C_ENV_API_TOKEN, C_ENV_API_URL,
    C_ENV_TIMEOUT_SECONDS, N_ATTEMPTS_MAX_DEFAULT, N_BACKOFF_FACTOR_DEFAULT,
    N_DELAY_INITIAL_MS_DEFAULT, N_DELAY_MAX_MS_DEFAULT, N_PAGE_SIZE_DEFAULT, N_PAGE_SIZE_MAX,
    N_TIMEOUT_SECONDS_DEFAULT, TUP_STATUS_RETRY_DEFAULT,
};

////////////////////////////////////////////////////////////////////////////////
// #region RetryPolicy

/// Bounded exponential backoff for transient failures.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecRetryPolicy {
    /// Total attempts per request, first try included.
    pub n_attempts_max: u32,
    /// Delay before the second attempt.
    pub delay_initial_ms: u64,
    /// Upper bound for any single delay.
    pub delay_max_ms: u64,
    /// Multiplier applied after each failed attempt.
    pub backoff_factor: f64,
    /// HTTP statuses treated as transient.
    pub statuses_retry: Vec<u16>,
}

impl Default for SpecRetryPolicy {
    fn default() -> Self {
        Self {
            n_attempts_max: N_ATTEMPTS_MAX_DEFAULT,
            delay_initial_ms: N_DELAY_INITIAL_MS_DEFAULT,
            delay_max_ms: N_DELAY_MAX_MS_DEFAULT,
            backoff_factor: N_BACKOFF_FACTOR_DEFAULT,
            statuses_retry: TUP_STATUS_RETRY_DEFAULT.to_vec(),
        }
    }
}

impl SpecRetryPolicy {
    /// Delay to wait after `n_attempts_failed` failed attempts (1-based).
    pub fn delay_after(&self, n_attempts_failed: u32) -> Duration {
        let n_exp = n_attempts_failed.saturating_sub(1) as i32;
        let n_delay_ms = self.delay_initial_ms as f64 * self.backoff_factor.powi(n_exp);
        let n_delay_ms = n_delay_ms.min(self.delay_max_ms as f64);
        Duration::from_millis(n_delay_ms as u64)
    }

    /// Whether `status` is in the transient set.
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.statuses_retry.contains(&status)
    }

    fn validate(&self) -> Result<(), ExportError> {
        if self.n_attempts_max == 0 {
            return Err(ExportError::Config(
                "retry_policy.n_attempts_max must be >= 1.".to_string(),
            ));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(ExportError::Config(
                "retry_policy.backoff_factor must be a finite value >= 1.".to_string(),
            ));
        }
        if self.delay_max_ms < self.delay_initial_ms {
            return Err(ExportError::Config(
                "retry_policy.delay_max_ms must be >= retry_policy.delay_initial_ms.".to_string(),
            ));
        }
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ClientSettings

/// Immutable client configuration threaded through every request.
#[derive(Clone, PartialEq)]
pub struct SpecClientSettings {
    /// API token sent in the `Authorization` header.
    pub api_token: String,
    /// GraphQL endpoint.
    pub api_url: String,
    /// `API-Version` header value.
    pub api_version: String,
    /// Request-level timeout.
    pub timeout_seconds: u64,
    /// Items requested per page (1..=1000).
    pub page_size: usize,
    /// Transient failure policy.
    pub retry_policy: SpecRetryPolicy,
}

impl SpecClientSettings {
    /// Settings with defaults for everything but the token.
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            api_url: C_API_URL_DEFAULT.to_string(),
            api_version: C_API_VERSION_DEFAULT.to_string(),
            timeout_seconds: N_TIMEOUT_SECONDS_DEFAULT,
            page_size: N_PAGE_SIZE_DEFAULT,
            retry_policy: SpecRetryPolicy::default(),
        }
    }

    /// Resolve settings from an explicit token or `lookup` (usually the process environment).
    ///
    /// Explicit values win over looked-up ones. The result is validated.
    pub fn from_lookup<F>(api_token: Option<String>, lookup: F) -> Result<Self, ExportError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let c_token = api_token
            .filter(|val| !val.trim().is_empty())
            .or_else(|| lookup(C_ENV_API_TOKEN))
            .map(|val| val.trim().to_string())
            .unwrap_or_default();
        if c_token.is_empty() {
            return Err(ExportError::Config(format!(
                "Monday.com API token is required. Provide it via the --api-token option \
                 or the {C_ENV_API_TOKEN} environment variable."
            )));
        }

        let mut settings = Self::new(c_token);
        if let Some(val) = lookup(C_ENV_API_URL).filter(|val| !val.trim().is_empty()) {
            settings.api_url = val.trim().to_string();
        }
        if let Some(val) = lookup(C_ENV_TIMEOUT_SECONDS) {
            settings.timeout_seconds = val.trim().parse::<u64>().map_err(|_| {
                ExportError::Config(format!(
                    "{C_ENV_TIMEOUT_SECONDS} must be a whole number of seconds, got {val:?}."
                ))
            })?;
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Reject out-of-range values before any request is made.
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.api_token.trim().is_empty() {
            return Err(ExportError::Config(
                "Monday.com API token must not be empty.".to_string(),
            ));
        }
        let url = Url::parse(self.api_url.trim()).map_err(|e| {
            ExportError::Config(format!("api_url {:?} is not a valid URL: {e}.", self.api_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ExportError::Config(format!(
                "api_url must use http or https, got {:?}.",
                url.scheme()
            )));
        }
        if self.timeout_seconds == 0 {
            return Err(ExportError::Config(
                "timeout_seconds must be >= 1.".to_string(),
            ));
        }
        if self.page_size == 0 || self.page_size > N_PAGE_SIZE_MAX {
            return Err(ExportError::Config(format!(
                "page_size must be between 1 and {N_PAGE_SIZE_MAX}, got {}.",
                self.page_size
            )));
        }
        self.retry_policy.validate()
    }
}

impl fmt::Debug for SpecClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecClientSettings")
            .field("api_token", &"***")
            .field("api_url", &self.api_url)
            .field("api_version", &self.api_version)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("page_size", &self.page_size)
            .field("retry_policy", &self.retry_policy)
            .finish()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ExportOptions

/// Per-run export options.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecExportOptions {
    /// Board to export.
    pub board_id: u64,
    /// Fetch subitems and emit them after their parent row.
    pub if_include_subitems: bool,
    /// Destination file; derived from the board name when `None`.
    pub path_file_out: Option<PathBuf>,
    /// Column ids left out of the Items sheet.
    pub cols_excluded: Vec<String>,
}

impl SpecExportOptions {
    /// Options for `board_id` with every other value defaulted.
    pub fn new(board_id: u64) -> Self {
        Self {
            board_id,
            ..Default::default()
        }
    }

    /// Reject missing/invalid values before any request is made.
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.board_id == 0 {
            return Err(ExportError::Config(
                "board_id is required and must be a positive number.".to_string(),
            ));
        }
        if let Some(path) = &self.path_file_out
            && path.as_os_str().is_empty()
        {
            return Err(ExportError::Config(
                "output path must not be empty.".to_string(),
            ));
        }
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Which credential check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumCredentialKind {
    /// Token missing, malformed or revoked (HTTP 401).
    Unauthorized,
    /// Token valid but lacks access to the board (HTTP 403).
    Forbidden,
}

impl fmt::Display for EnumCredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "the API token is invalid, expired or missing"),
            Self::Forbidden => write!(f, "the API token does not grant access to this board"),
        }
    }
}

/// Errors that abort an export run.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Invalid settings/options; raised before any request.
    #[error("{0}")]
    Config(String),
    /// Authentication/authorization failure; never retried.
    #[error("credential error ({}): {kind}. {message}", status_label(.status))]
    Credential {
        /// HTTP status, when the failure came from the status line.
        status: Option<u16>,
        /// Failure kind.
        kind: EnumCredentialKind,
        /// Server-provided detail.
        message: String,
    },
    /// Transient failures persisted through every allowed attempt.
    #[error("could not retrieve board data after {n_attempts} attempt(s): {reason}")]
    Retrieval {
        /// Attempts made for the failing request.
        n_attempts: u32,
        /// Last failure reason.
        reason: String,
    },
    /// Non-retryable API error payload.
    #[error("Monday.com API request failed: {0}")]
    Api(String),
    /// Metadata query returned no board.
    #[error("no board found for id {0}")]
    BoardNotFound(u64),
    /// Response body could not be decoded.
    #[error("unexpected API payload: {0}")]
    Payload(String),
    /// Workbook emission failed.
    #[error(transparent)]
    Write(#[from] XlsxWriteError),
}

impl ExportError {
    /// Whether the run failed before contacting the API.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Whether the run failed while writing the workbook.
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Write(_))
    }
}

fn status_label(status: &Option<u16>) -> String {
    status.map_or_else(|| "GraphQL".to_string(), |val| format!("HTTP {val}"))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let dict_env: BTreeMap<String, String> = pairs
            .iter()
            .map(|(key, val)| (key.to_string(), val.to_string()))
            .collect();
        move |key| dict_env.get(key).cloned()
    }

    #[test]
    fn test_page_size_bounds() {
        let mut settings = SpecClientSettings::new("token");
        assert!(settings.validate().is_ok());

        settings.page_size = 1000;
        assert!(settings.validate().is_ok());

        settings.page_size = 1500;
        assert!(matches!(settings.validate(), Err(ExportError::Config(_))));

        settings.page_size = 0;
        assert!(matches!(settings.validate(), Err(ExportError::Config(_))));
    }

    #[test]
    fn test_from_lookup_prefers_explicit_token_and_reads_overrides() {
        let lookup = lookup_from(&[
            ("MONDAY_API_TOKEN", "env-token"),
            ("MONDAY_API_URL", "http://localhost:9999/v2"),
            ("MONDAY_TIMEOUT_SECONDS", "5"),
        ]);
        let c_token = Some("cli-token".to_string());
        let settings = SpecClientSettings::from_lookup(c_token, lookup).expect("settings");
        assert_eq!(settings.api_token, "cli-token");
        assert_eq!(settings.api_url, "http://localhost:9999/v2");
        assert_eq!(settings.timeout_seconds, 5);
        assert_eq!(settings.page_size, 500);
    }

    #[test]
    fn test_api_url_must_be_http_url() {
        let mut settings = SpecClientSettings::new("token");
        settings.api_url = "not a url".to_string();
        assert!(matches!(settings.validate(), Err(ExportError::Config(_))));

        settings.api_url = "ftp://api.example.com/v2".to_string();
        assert!(matches!(settings.validate(), Err(ExportError::Config(_))));

        settings.api_url = "http://127.0.0.1:8080/v2".to_string();
        assert!(settings.validate().is_ok());

        let lookup = lookup_from(&[("MONDAY_API_TOKEN", "t"), ("MONDAY_API_URL", "::bad::")]);
        let err = SpecClientSettings::from_lookup(None, lookup).expect_err("bad url");
        assert!(err.is_config());
    }

    #[test]
    fn test_from_lookup_requires_token() {
        let err = SpecClientSettings::from_lookup(None, lookup_from(&[])).expect_err("no token");
        assert!(err.is_config());
        assert!(err.to_string().contains("MONDAY_API_TOKEN"));
    }

    #[test]
    fn test_from_lookup_rejects_bad_timeout() {
        let lookup = lookup_from(&[("MONDAY_API_TOKEN", "t"), ("MONDAY_TIMEOUT_SECONDS", "soon")]);
        assert!(SpecClientSettings::from_lookup(None, lookup).is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let txt = format!("{:?}", SpecClientSettings::new("secret-value"));
        assert!(!txt.contains("secret-value"));
    }

    #[test]
    fn test_retry_delay_grows_and_caps() {
        let policy = SpecRetryPolicy {
            delay_initial_ms: 100,
            delay_max_ms: 350,
            backoff_factor: 2.0,
            ..SpecRetryPolicy::default()
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(350));
    }

    #[test]
    fn test_export_options_require_board_id() {
        assert!(SpecExportOptions::default().validate().is_err());
        assert!(SpecExportOptions::new(42).validate().is_ok());
    }

    #[test]
    fn test_credential_error_message_keeps_status() {
        let err = ExportError::Credential {
            status: Some(403),
            kind: EnumCredentialKind::Forbidden,
            message: "Forbidden".to_string(),
        };
        let txt = err.to_string();
        assert!(txt.contains("HTTP 403"));
        assert!(txt.contains("does not grant access"));
    }
}
