//! Fake transports and fixtures shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};

use serde_json::{Value, json};

use crate::client::{GraphqlTransport, SpecTransportResponse, TransportError};
use crate::model::{SpecBoard, SpecBoardSnapshot, SpecItem};
use crate::spec::{SpecClientSettings, SpecRetryPolicy};

/// Settings with zero backoff so retry tests never sleep.
pub(crate) fn settings_for_tests() -> SpecClientSettings {
    let mut settings = SpecClientSettings::new("test-token");
    settings.api_url = "http://127.0.0.1:9/v2".to_string();
    settings.retry_policy = SpecRetryPolicy {
        delay_initial_ms: 0,
        delay_max_ms: 0,
        ..SpecRetryPolicy::default()
    };
    settings
}

////////////////////////////////////////////////////////////////////////////////
// #region ScriptedTransport

/// Replays a fixed list of outcomes and records every request body.
pub(crate) struct ScriptedTransport {
    l_outcomes: RefCell<VecDeque<Result<SpecTransportResponse, TransportError>>>,
    l_bodies: RefCell<Vec<Value>>,
}

impl ScriptedTransport {
    pub(crate) fn new(l_outcomes: Vec<Result<SpecTransportResponse, TransportError>>) -> Self {
        Self {
            l_outcomes: RefCell::new(l_outcomes.into()),
            l_bodies: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn repeat(response: SpecTransportResponse, n_times: usize) -> Self {
        Self::new((0..n_times).map(|_| Ok(response.clone())).collect())
    }

    pub(crate) fn n_calls(&self) -> usize {
        self.l_bodies.borrow().len()
    }
}

impl GraphqlTransport for ScriptedTransport {
    fn post_json(&self, body: &Value) -> Result<SpecTransportResponse, TransportError> {
        self.l_bodies.borrow_mut().push(body.clone());
        self.l_outcomes
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Other("script exhausted".to_string())))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FakeBoardTransport

/// In-memory board served through the three GraphQL documents.
#[derive(Debug, Clone)]
pub(crate) struct SpecFakeBoard {
    pub board: Value,
    pub items: Vec<Value>,
    pub dict_subitems: BTreeMap<String, Vec<Value>>,
}

/// Board with `n_items` items split over two groups and `n_subitems` per item.
///
/// Item ids are `1..=n_items`; subitems of item `k` are `k*1000+1..`.
pub(crate) fn fake_board(n_items: usize, n_subitems: usize) -> SpecFakeBoard {
    let board = json!({
        "id": "7",
        "name": "Roadmap Q3",
        "description": "Quarterly roadmap",
        "items_count": n_items,
        "columns": [
            {"id": "name", "title": "Name", "type": "name"},
            {"id": "status", "title": "Status", "type": "status"},
            {"id": "date4", "title": "Due", "type": "date"},
            {"id": "numbers", "title": "Estimate", "type": "numbers"},
            {"id": "legacy", "title": "Legacy", "type": "text", "archived": true}
        ],
        "groups": [
            {"id": "later", "title": "Later", "position": "131072"},
            {"id": "now", "title": "Now", "position": "65536"}
        ]
    });

    let mut items = Vec::with_capacity(n_items);
    let mut dict_subitems = BTreeMap::new();
    for idx in 1..=n_items {
        let (c_group_id, c_group_title) = if idx % 2 == 1 {
            ("now", "Now")
        } else {
            ("later", "Later")
        };
        items.push(fake_item(idx, c_group_id, c_group_title));

        let l_subs: Vec<Value> = (1..=n_subitems)
            .map(|n_sub| fake_item(idx * 1000 + n_sub, "subitems_of_7", "Subitems"))
            .collect();
        dict_subitems.insert(idx.to_string(), l_subs);
    }

    SpecFakeBoard {
        board,
        items,
        dict_subitems,
    }
}

/// Decoded snapshot of [`fake_board`]; subitems are attached when `n_subitems > 0`.
pub(crate) fn fake_snapshot(n_items: usize, n_subitems: usize) -> SpecBoardSnapshot {
    let dataset = fake_board(n_items, n_subitems);
    let board: SpecBoard = serde_json::from_value(dataset.board).expect("decode board");
    let items = dataset
        .items
        .into_iter()
        .map(|val| {
            let mut item: SpecItem = serde_json::from_value(val).expect("decode item");
            if n_subitems > 0 {
                let l_subs = dataset.dict_subitems.get(&item.id).cloned().unwrap_or_default();
                item.subitems = Some(
                    l_subs
                        .into_iter()
                        .map(|sub| serde_json::from_value(sub).expect("decode subitem"))
                        .collect(),
                );
            }
            item
        })
        .collect();
    SpecBoardSnapshot { board, items }
}

fn fake_item(id: usize, group_id: &str, group_title: &str) -> Value {
    json!({
        "id": id.to_string(),
        "name": format!("Task {id}"),
        "created_at": "2024-01-05T10:00:00Z",
        "updated_at": "2024-02-01T08:30:00Z",
        "group": {"id": group_id, "title": group_title},
        "creator": {"id": "11", "name": "Ada Lovelace"},
        "column_values": [
            {"id": "status", "text": "Working on it", "type": "status", "value": "{\"index\":0}"},
            {"id": "date4", "text": format!("2024-03-{:02}", (id % 28) + 1), "type": "date",
             "value": format!("{{\"date\":\"2024-03-{:02}\"}}", (id % 28) + 1)},
            {"id": "numbers", "text": format!("{}", id * 2), "type": "numbers", "value": null},
            {"id": "legacy", "text": "old", "type": "text", "value": null}
        ]
    })
}

/// Serves [`SpecFakeBoard`] honoring `limit` and an offset cursor.
pub(crate) struct FakeBoardTransport {
    dataset: SpecFakeBoard,
    n_calls: Cell<usize>,
}

impl FakeBoardTransport {
    pub(crate) fn new(dataset: SpecFakeBoard) -> Self {
        Self {
            dataset,
            n_calls: Cell::new(0),
        }
    }

    pub(crate) fn n_calls(&self) -> usize {
        self.n_calls.get()
    }

    fn serve_page(&self, variables: &Value) -> Value {
        let n_limit = variables["limit"].as_u64().unwrap_or(25) as usize;
        let n_offset = variables["cursor"]
            .as_str()
            .and_then(|val| val.strip_prefix("offset-"))
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(0);
        let n_end = (n_offset + n_limit).min(self.dataset.items.len());
        let l_page: Vec<Value> = self.dataset.items[n_offset.min(n_end)..n_end].to_vec();
        let cursor = if n_end < self.dataset.items.len() {
            json!(format!("offset-{n_end}"))
        } else {
            Value::Null
        };
        json!({"boards": [{"items_page": {"cursor": cursor, "items": l_page}}]})
    }

    fn serve_subitems(&self, variables: &Value) -> Value {
        let l_items: Vec<Value> = variables["item_ids"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .map(|id| {
                json!({
                    "id": id,
                    "subitems": self.dataset.dict_subitems.get(id).cloned().unwrap_or_default()
                })
            })
            .collect();
        json!({ "items": l_items })
    }
}

impl GraphqlTransport for FakeBoardTransport {
    fn post_json(&self, body: &Value) -> Result<SpecTransportResponse, TransportError> {
        self.n_calls.set(self.n_calls.get() + 1);
        let c_query = body["query"].as_str().unwrap_or_default();
        let variables = &body["variables"];

        let data = if c_query.contains("items_page") {
            self.serve_page(variables)
        } else if c_query.contains("subitems") {
            self.serve_subitems(variables)
        } else {
            json!({"boards": [self.dataset.board.clone()]})
        };
        Ok(SpecTransportResponse::ok(json!({ "data": data }).to_string()))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
