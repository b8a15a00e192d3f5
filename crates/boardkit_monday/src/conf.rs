//! Export constants, GraphQL documents and default presets.

/// Default GraphQL endpoint.
pub const C_API_URL_DEFAULT: &str = "https://api.monday.com/v2";
/// Default `API-Version` header value.
pub const C_API_VERSION_DEFAULT: &str = "2024-10";
/// `User-Agent` sent with every request.
pub const C_USER_AGENT: &str = concat!("boardkit/", env!("CARGO_PKG_VERSION"));

/// Environment variable holding the API token.
pub const C_ENV_API_TOKEN: &str = "MONDAY_API_TOKEN";
/// Environment variable overriding the endpoint.
pub const C_ENV_API_URL: &str = "MONDAY_API_URL";
/// Environment variable overriding the request timeout (seconds).
pub const C_ENV_TIMEOUT_SECONDS: &str = "MONDAY_TIMEOUT_SECONDS";

/// Default items per page.
pub const N_PAGE_SIZE_DEFAULT: usize = 500;
/// Hard page size ceiling.
pub const N_PAGE_SIZE_MAX: usize = 1000;
/// Default request timeout in seconds.
pub const N_TIMEOUT_SECONDS_DEFAULT: u64 = 30;

/// Default total attempts per request (first try included).
pub const N_ATTEMPTS_MAX_DEFAULT: u32 = 4;
/// Default first backoff delay.
pub const N_DELAY_INITIAL_MS_DEFAULT: u64 = 500;
/// Default backoff ceiling.
pub const N_DELAY_MAX_MS_DEFAULT: u64 = 8_000;
/// Default backoff multiplier.
pub const N_BACKOFF_FACTOR_DEFAULT: f64 = 2.0;
/// HTTP statuses treated as transient.
pub const TUP_STATUS_RETRY_DEFAULT: [u16; 5] = [429, 500, 502, 503, 504];

/// Group label used when an item references an unknown group.
pub const C_GROUP_UNKNOWN: &str = "Unknown";
/// Separator between people names.
pub const C_PEOPLE_SEPARATOR: &str = ", ";
/// Fallback file stem when the board name has no usable characters.
pub const C_FILE_STEM_FALLBACK: &str = "monday_board";

/// Items sheet name.
pub const C_SHEET_ITEMS: &str = "Items";
/// Summary sheet name.
pub const C_SHEET_SUMMARY: &str = "Summary";
/// Identity header labels, in sheet order, preceding the board columns.
pub const TUP_HEADER_IDENTITY: [&str; 6] = [
    "Item ID",
    "Item Name",
    "Group",
    "Creator",
    "Created At",
    "Updated At",
];
/// Index of the name column inside [`TUP_HEADER_IDENTITY`].
pub const N_IDX_COL_NAME: usize = 1;
/// Summary sheet label column width.
pub const N_WIDTH_SUMMARY_LABEL: f64 = 18.0;
/// Summary sheet value column width.
pub const N_WIDTH_SUMMARY_VALUE: f64 = 60.0;

/// Board metadata query.
pub const C_QUERY_BOARD_METADATA: &str = r#"
query ($board_ids: [ID!]) {
  boards(ids: $board_ids) {
    id
    name
    description
    items_count
    columns {
      id
      title
      type
      archived
    }
    groups {
      id
      title
      position
    }
  }
}
"#;

/// One page of top-level items.
pub const C_QUERY_ITEMS_PAGE: &str = r#"
query ($board_ids: [ID!], $limit: Int!, $cursor: String) {
  boards(ids: $board_ids) {
    items_page(limit: $limit, cursor: $cursor) {
      cursor
      items {
        id
        name
        created_at
        updated_at
        group {
          id
          title
        }
        creator {
          id
          name
        }
        column_values {
          id
          text
          type
          value
        }
      }
    }
  }
}
"#;

/// Subitems of one parent item.
pub const C_QUERY_SUBITEMS: &str = r#"
query ($item_ids: [ID!]) {
  items(ids: $item_ids) {
    id
    subitems {
      id
      name
      created_at
      updated_at
      group {
        id
        title
      }
      creator {
        id
        name
      }
      column_values {
        id
        text
        type
        value
      }
    }
  }
}
"#;
