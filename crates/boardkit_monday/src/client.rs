//! Paginated GraphQL client.
//!
//! [`MondayClient`] owns the retry policy and pagination. The HTTP layer sits
//! behind [`GraphqlTransport`] so the client can run against a scripted fake.

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::conf::{C_QUERY_BOARD_METADATA, C_QUERY_ITEMS_PAGE, C_QUERY_SUBITEMS, C_USER_AGENT};
use crate::model::{SpecBoard, SpecBoardSnapshot, SpecItem};
use crate::spec::{EnumCredentialKind, ExportError, SpecClientSettings};

const N_BODY_EXCERPT_MAX: usize = 300;
const TUP_HINTS_TRANSIENT: [&str; 5] = [
    "ratelimit",
    "complexity",
    "maxconcurrency",
    "toomanyrequests",
    "budgetexhausted",
];
const TUP_HINTS_UNAUTHORIZED: [&str; 3] = ["unauthorized", "notauthenticated", "invalidtoken"];
const TUP_HINTS_FORBIDDEN: [&str; 3] = ["forbidden", "permissiondenied", "insufficientpermission"];

////////////////////////////////////////////////////////////////////////////////
// #region Transport

/// Raw HTTP response as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecTransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
    /// `Retry-After` header in seconds, when present.
    pub retry_after_secs: Option<u64>,
}

impl SpecTransportResponse {
    /// 200 response carrying `body`.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::with_status(200, body)
    }

    /// Response with an arbitrary status.
    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            retry_after_secs: None,
        }
    }
}

/// Network-level failure. Every variant but [`TransportError::Request`] is transient.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("transport failure: {0}")]
    Other(String),
    /// The request could not be built (bad URL, bad header); retrying cannot help.
    #[error("invalid request: {0}")]
    Request(String),
}

impl TransportError {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Request(_))
    }
}

/// Posts one GraphQL request body and returns the raw response.
pub trait GraphqlTransport {
    fn post_json(&self, body: &Value) -> Result<SpecTransportResponse, TransportError>;
}

/// Blocking `reqwest` transport with auth/version headers preset.
pub struct ReqwestTransport {
    client: Client,
    api_url: String,
}

impl ReqwestTransport {
    /// Build the HTTP client for `settings`.
    pub fn new(settings: &SpecClientSettings) -> Result<Self, ExportError> {
        let mut headers = HeaderMap::new();
        let mut val_auth = HeaderValue::from_str(settings.api_token.trim()).map_err(|_| {
            ExportError::Config(
                "API token contains characters not allowed in a header.".to_string(),
            )
        })?;
        val_auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, val_auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "API-Version",
            HeaderValue::from_str(&settings.api_version).map_err(|_| {
                ExportError::Config(format!("invalid API version {:?}.", settings.api_version))
            })?,
        );

        let client = Client::builder()
            .user_agent(C_USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| ExportError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: settings.api_url.clone(),
        })
    }
}

impl GraphqlTransport for ReqwestTransport {
    fn post_json(&self, body: &Value) -> Result<SpecTransportResponse, TransportError> {
        let response = self
            .client
            .post(&self.api_url)
            .json(body)
            .send()
            .map_err(classify_reqwest_error)?;

        let status = response.status().as_u16();
        let retry_after_secs = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.trim().parse::<u64>().ok());
        let body = response.text().map_err(classify_reqwest_error)?;

        Ok(SpecTransportResponse {
            status,
            body,
            retry_after_secs,
        })
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_builder() {
        TransportError::Request(err.to_string())
    } else if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Envelope

#[derive(Debug, Deserialize)]
struct GraphqlEnvelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphqlErrorEntry>>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorEntry {
    #[serde(default)]
    message: String,
    #[serde(default)]
    extensions: Option<Value>,
}

impl GraphqlErrorEntry {
    fn code(&self) -> Option<&str> {
        self.extensions.as_ref()?.get("code")?.as_str()
    }
}

#[derive(Debug, Deserialize)]
struct BoardsData<T> {
    #[serde(default = "Vec::new")]
    boards: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct BoardItemsPage {
    #[serde(default)]
    items_page: Option<ItemsPage>,
}

#[derive(Debug, Deserialize)]
struct ItemsPage {
    #[serde(default)]
    cursor: Option<String>,
    #[serde(default)]
    items: Option<Vec<SpecItem>>,
}

#[derive(Debug, Deserialize)]
struct ItemsData {
    #[serde(default)]
    items: Vec<ItemSubitems>,
}

#[derive(Debug, Deserialize)]
struct ItemSubitems {
    id: String,
    #[serde(default)]
    subitems: Option<Vec<SpecItem>>,
}

enum EnumAttemptError {
    Transient {
        reason: String,
        retry_after_secs: Option<u64>,
    },
    Fatal(ExportError),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Client

/// monday.com GraphQL client with bounded retries and cursor pagination.
pub struct MondayClient<T: GraphqlTransport = ReqwestTransport> {
    settings: SpecClientSettings,
    transport: T,
}

impl MondayClient<ReqwestTransport> {
    /// Validate `settings` and build a client over HTTP.
    pub fn connect(settings: SpecClientSettings) -> Result<Self, ExportError> {
        settings.validate()?;
        let transport = ReqwestTransport::new(&settings)?;
        Ok(Self {
            settings,
            transport,
        })
    }
}

impl<T: GraphqlTransport> MondayClient<T> {
    /// Validate `settings` and build a client over `transport`.
    pub fn with_transport(settings: SpecClientSettings, transport: T) -> Result<Self, ExportError> {
        settings.validate()?;
        Ok(Self {
            settings,
            transport,
        })
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run one GraphQL request and return its `data` object.
    ///
    /// Transient failures (network errors, retryable statuses, rate-limit and
    /// complexity errors) are retried until `retry_policy.n_attempts_max`
    /// attempts have been made, then surface as [`ExportError::Retrieval`].
    pub fn execute(&self, query: &str, variables: Value) -> Result<Value, ExportError> {
        let body = json!({"query": query, "variables": variables});
        let policy = &self.settings.retry_policy;
        let mut n_attempts: u32 = 0;

        loop {
            n_attempts += 1;
            debug!(
                "GraphQL request attempt {}/{}",
                n_attempts, policy.n_attempts_max
            );
            let attempt = match self.transport.post_json(&body) {
                Ok(response) => self.interpret_response(response),
                Err(e) if e.is_transient() => Err(EnumAttemptError::Transient {
                    reason: e.to_string(),
                    retry_after_secs: None,
                }),
                Err(e) => Err(EnumAttemptError::Fatal(ExportError::Config(e.to_string()))),
            };

            let (reason, retry_after_secs) = match attempt {
                Ok(data) => return Ok(data),
                Err(EnumAttemptError::Fatal(e)) => return Err(e),
                Err(EnumAttemptError::Transient {
                    reason,
                    retry_after_secs,
                }) => (reason, retry_after_secs),
            };

            if n_attempts >= policy.n_attempts_max {
                return Err(ExportError::Retrieval { n_attempts, reason });
            }

            let delay = match retry_after_secs {
                Some(n_secs) => {
                    Duration::from_secs(n_secs).min(Duration::from_millis(policy.delay_max_ms))
                }
                None => policy.delay_after(n_attempts),
            };
            warn!(
                "Request failed: {}, retrying in {}ms ({}/{})",
                reason,
                delay.as_millis(),
                n_attempts,
                policy.n_attempts_max
            );
            if !delay.is_zero() {
                thread::sleep(delay);
            }
        }
    }

    fn interpret_response(
        &self,
        response: SpecTransportResponse,
    ) -> Result<Value, EnumAttemptError> {
        let status = response.status;
        match status {
            401 => {
                return Err(EnumAttemptError::Fatal(ExportError::Credential {
                    status: Some(status),
                    kind: EnumCredentialKind::Unauthorized,
                    message: excerpt(&response.body),
                }));
            }
            403 => {
                return Err(EnumAttemptError::Fatal(ExportError::Credential {
                    status: Some(status),
                    kind: EnumCredentialKind::Forbidden,
                    message: excerpt(&response.body),
                }));
            }
            _ if self.settings.retry_policy.is_retryable_status(status) => {
                return Err(EnumAttemptError::Transient {
                    reason: format!("HTTP {status}"),
                    retry_after_secs: response.retry_after_secs,
                });
            }
            _ if !(200..300).contains(&status) => {
                return Err(EnumAttemptError::Fatal(ExportError::Api(format!(
                    "HTTP {status}: {}",
                    excerpt(&response.body)
                ))));
            }
            _ => {}
        }

        let envelope: GraphqlEnvelope = serde_json::from_str(&response.body).map_err(|e| {
            EnumAttemptError::Fatal(ExportError::Payload(format!("invalid JSON response: {e}")))
        })?;

        if let Some(err) = classify_graphql_errors(&envelope, response.retry_after_secs) {
            return Err(err);
        }

        match envelope.data {
            Some(data) if !data.is_null() => Ok(data),
            _ => Err(EnumAttemptError::Fatal(ExportError::Payload(
                "response carries no data".to_string(),
            ))),
        }
    }

    fn decode<D: DeserializeOwned>(&self, data: Value, what: &str) -> Result<D, ExportError> {
        serde_json::from_value(data)
            .map_err(|e| ExportError::Payload(format!("failed to decode {what}: {e}")))
    }

    /// Fetch board metadata (columns and groups).
    pub fn fetch_board_metadata(&self, board_id: u64) -> Result<SpecBoard, ExportError> {
        let data = self.execute(
            C_QUERY_BOARD_METADATA,
            json!({"board_ids": [board_id.to_string()]}),
        )?;
        let parsed: BoardsData<SpecBoard> = self.decode(data, "board metadata")?;
        parsed
            .boards
            .into_iter()
            .next()
            .ok_or(ExportError::BoardNotFound(board_id))
    }

    /// Fetch every top-level item, following the cursor until exhaustion.
    pub fn fetch_items(&self, board_id: u64) -> Result<Vec<SpecItem>, ExportError> {
        let mut l_items: Vec<SpecItem> = Vec::new();
        let mut cursor: Option<String> = None;
        let mut n_pages: usize = 0;

        loop {
            let data = self.execute(
                C_QUERY_ITEMS_PAGE,
                json!({
                    "board_ids": [board_id.to_string()],
                    "limit": self.settings.page_size,
                    "cursor": cursor,
                }),
            )?;
            let parsed: BoardsData<BoardItemsPage> = self.decode(data, "items page")?;
            let Some(page) = parsed.boards.into_iter().next().and_then(|b| b.items_page) else {
                break;
            };

            let l_page_items = page.items.unwrap_or_default();
            n_pages += 1;
            info!(
                "Fetched page {} of board {} ({} items)",
                n_pages,
                board_id,
                l_page_items.len()
            );
            if l_page_items.is_empty() {
                break;
            }
            l_items.extend(l_page_items);

            match page.cursor.filter(|val| !val.is_empty()) {
                Some(val) => cursor = Some(val),
                None => break,
            }
        }

        Ok(l_items)
    }

    /// Fetch the subitems of one item; absent subitems yield an empty list.
    pub fn fetch_subitems(&self, item_id: &str) -> Result<Vec<SpecItem>, ExportError> {
        let data = self.execute(C_QUERY_SUBITEMS, json!({"item_ids": [item_id]}))?;
        let parsed: ItemsData = self.decode(data, "subitems")?;
        Ok(parsed
            .items
            .into_iter()
            .find(|entry| entry.id == item_id)
            .and_then(|entry| entry.subitems)
            .unwrap_or_default())
    }

    /// Fetch a complete board snapshot.
    ///
    /// When `if_include_subitems` is set, subitems are fetched after all
    /// top-level pages, one parent at a time in item order.
    pub fn fetch_board(
        &self,
        board_id: u64,
        if_include_subitems: bool,
    ) -> Result<SpecBoardSnapshot, ExportError> {
        let board = self.fetch_board_metadata(board_id)?;
        debug!(
            "Board {} has {} columns and {} groups",
            board.name,
            board.columns.len(),
            board.groups.len()
        );

        let mut l_items = self.fetch_items(board_id)?;
        if if_include_subitems {
            for item in &mut l_items {
                item.subitems = Some(self.fetch_subitems(&item.id)?);
            }
        }

        let snapshot = SpecBoardSnapshot {
            board,
            items: l_items,
        };
        info!(
            "Fetched board {} ({} items, {} subitems)",
            board_id,
            snapshot.items.len(),
            snapshot.subitem_count()
        );
        Ok(snapshot)
    }
}

fn classify_graphql_errors(
    envelope: &GraphqlEnvelope,
    retry_after_secs: Option<u64>,
) -> Option<EnumAttemptError> {
    let mut l_hints: Vec<String> = Vec::new();
    let mut l_messages: Vec<String> = Vec::new();

    if let Some(code) = &envelope.error_code {
        l_hints.push(code.clone());
        l_messages.push(match &envelope.error_message {
            Some(msg) => format!("{code}: {msg}"),
            None => code.clone(),
        });
    }
    for entry in envelope.errors.iter().flatten() {
        if let Some(code) = entry.code() {
            l_hints.push(code.to_string());
        }
        l_hints.push(entry.message.clone());
        l_messages.push(entry.message.clone());
    }
    if l_messages.is_empty() {
        return None;
    }

    let c_hints: String = l_hints
        .iter()
        .flat_map(|val| val.chars())
        .filter(|ch| ch.is_ascii_alphanumeric())
        .map(|ch| ch.to_ascii_lowercase())
        .collect();
    let c_message = l_messages.join("; ");
    let has_hint = |tup: &[&str]| tup.iter().any(|hint| c_hints.contains(hint));

    let err = if has_hint(&TUP_HINTS_TRANSIENT[..]) {
        EnumAttemptError::Transient {
            reason: c_message,
            retry_after_secs,
        }
    } else if has_hint(&TUP_HINTS_FORBIDDEN[..]) {
        EnumAttemptError::Fatal(ExportError::Credential {
            status: None,
            kind: EnumCredentialKind::Forbidden,
            message: c_message,
        })
    } else if has_hint(&TUP_HINTS_UNAUTHORIZED[..]) {
        EnumAttemptError::Fatal(ExportError::Credential {
            status: None,
            kind: EnumCredentialKind::Unauthorized,
            message: c_message,
        })
    } else {
        EnumAttemptError::Fatal(ExportError::Api(c_message))
    };
    Some(err)
}

fn excerpt(body: &str) -> String {
    let c_body = body.trim();
    match c_body.char_indices().nth(N_BODY_EXCERPT_MAX) {
        Some((idx, _)) => format!("{}...", &c_body[..idx]),
        None => c_body.to_string(),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
