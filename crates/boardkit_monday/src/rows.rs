//! Row model builder.
//!
//! Joins board metadata, groups and items into a rectangular sequence of
//! [`SpecRowRecord`]s plus the visible-column schema.

use std::collections::{BTreeMap, HashMap, HashSet};

use boardkit_io_xlsx::EnumCellValue;
use tracing::warn;

use crate::conf::C_GROUP_UNKNOWN;
use crate::model::{SpecBoardSnapshot, SpecColumn, SpecItem};
use crate::normalize::{normalize_column_value_traced, parse_timestamp};

/// Marker distinguishing item rows from subitem rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumRowKind {
    /// Top-level item.
    Item,
    /// Subitem emitted right after its parent.
    Subitem {
        /// Id of the parent item.
        parent_id: String,
    },
}

/// One flattened item or subitem.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecRowRecord {
    pub kind: EnumRowKind,
    pub item_id: String,
    pub name: String,
    pub group_name: String,
    pub creator: Option<String>,
    /// Parsed timestamp, or the raw text when unparsable.
    pub created_at: EnumCellValue,
    pub updated_at: EnumCellValue,
    /// One cell per visible column, in schema order.
    pub cells: Vec<EnumCellValue>,
}

impl SpecRowRecord {
    /// Whether this row came from a subitem.
    pub fn is_subitem(&self) -> bool {
        matches!(self.kind, EnumRowKind::Subitem { .. })
    }

    /// Identity cells in header order (id, name, group, creator, created, updated).
    pub fn identity_cells(&self) -> Vec<EnumCellValue> {
        vec![
            EnumCellValue::String(self.item_id.clone()),
            EnumCellValue::from_text(&self.name),
            EnumCellValue::String(self.group_name.clone()),
            self.creator
                .as_deref()
                .map_or(EnumCellValue::None, EnumCellValue::from_text),
            self.created_at.clone(),
            self.updated_at.clone(),
        ]
    }
}

/// Row model options.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecRowModelOptions {
    /// Emit subitem rows after their parent.
    pub if_include_subitems: bool,
    /// Column ids left out of the schema.
    pub cols_excluded: Vec<String>,
}

/// Row records plus the visible-column schema.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecRowModel {
    /// Visible columns in display order.
    pub columns: Vec<SpecColumn>,
    /// Rows in emission order.
    pub rows: Vec<SpecRowRecord>,
    /// Rows carrying the item marker.
    pub n_items: usize,
    /// Rows carrying the subitem marker.
    pub n_subitems: usize,
    /// Cells that fell back to raw text.
    pub n_fallbacks: usize,
    /// Low-severity notes collected while building.
    pub warnings: Vec<String>,
}

impl SpecRowModel {
    /// Total body rows.
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }
}

struct RowBuilder<'a> {
    dict_group_title: HashMap<&'a str, &'a str>,
    dict_unknown_groups: BTreeMap<String, usize>,
    n_fallbacks: usize,
}

impl<'a> RowBuilder<'a> {
    fn resolve_group(&mut self, item: &SpecItem) -> String {
        let c_group_id = item.group.as_ref().map(|group| group.id.as_str());
        if let Some(c_id) = c_group_id
            && let Some(c_title) = self.dict_group_title.get(c_id)
        {
            return (*c_title).to_string();
        }
        *self
            .dict_unknown_groups
            .entry(c_group_id.unwrap_or_default().to_string())
            .or_insert(0) += 1;
        C_GROUP_UNKNOWN.to_string()
    }

    fn build(
        &mut self,
        columns: &[SpecColumn],
        item: &SpecItem,
        kind: EnumRowKind,
        group_name: String,
    ) -> SpecRowRecord {
        let cells = columns
            .iter()
            .map(|col| {
                let raw = item.column_value_by_id(&col.id);
                let cell = normalize_column_value_traced(&col.col_type, raw);
                if cell.fallback.is_some() {
                    self.n_fallbacks += 1;
                }
                cell.value
            })
            .collect();

        SpecRowRecord {
            kind,
            item_id: item.id.clone(),
            name: item.name.trim().to_string(),
            group_name,
            creator: item.creator_name().map(str::to_string),
            created_at: normalize_timestamp(item.created_at.as_deref()),
            updated_at: normalize_timestamp(item.updated_at.as_deref()),
            cells,
        }
    }
}

fn normalize_timestamp(raw: Option<&str>) -> EnumCellValue {
    let c_raw = raw.map(str::trim).unwrap_or_default();
    match parse_timestamp(c_raw) {
        Some(dt) => EnumCellValue::DateTime(dt),
        None => EnumCellValue::from_text(c_raw),
    }
}

/// Build the row model for `snapshot`.
///
/// Hidden columns are the board's archived columns plus `cols_excluded`.
/// Subitem rows inherit the parent's group and only fill parent-board columns
/// whose ids match theirs.
pub fn build_row_model(
    snapshot: &SpecBoardSnapshot,
    options: &SpecRowModelOptions,
) -> SpecRowModel {
    let set_excluded: HashSet<&str> = options.cols_excluded.iter().map(String::as_str).collect();
    let columns: Vec<SpecColumn> = snapshot
        .board
        .columns
        .iter()
        .filter(|col| !col.is_hidden() && !set_excluded.contains(col.id.as_str()))
        .cloned()
        .collect();

    let mut builder = RowBuilder {
        dict_group_title: snapshot
            .board
            .groups
            .iter()
            .map(|group| (group.id.as_str(), group.title.as_str()))
            .collect(),
        dict_unknown_groups: BTreeMap::new(),
        n_fallbacks: 0,
    };

    let mut rows = Vec::with_capacity(snapshot.items.len());
    let mut n_items = 0;
    let mut n_subitems = 0;
    for item in &snapshot.items {
        let c_group = builder.resolve_group(item);
        rows.push(builder.build(&columns, item, EnumRowKind::Item, c_group.clone()));
        n_items += 1;

        if !options.if_include_subitems {
            continue;
        }
        for sub in item.subitems.iter().flatten() {
            let kind = EnumRowKind::Subitem {
                parent_id: item.id.clone(),
            };
            rows.push(builder.build(&columns, sub, kind, c_group.clone()));
            n_subitems += 1;
        }
    }

    let mut warnings = Vec::new();
    for (c_group_id, n_count) in &builder.dict_unknown_groups {
        let msg = if c_group_id.is_empty() {
            format!("{n_count} item(s) have no group; labelled \"{C_GROUP_UNKNOWN}\".")
        } else {
            format!(
                "{n_count} item(s) reference unknown group id {c_group_id:?}; \
                 labelled \"{C_GROUP_UNKNOWN}\"."
            )
        };
        warn!("{msg}");
        warnings.push(msg);
    }
    let n_fallbacks = builder.n_fallbacks;
    if n_fallbacks > 0 {
        let msg = format!("{n_fallbacks} cell(s) could not be parsed and were kept as text.");
        warn!("{msg}");
        warnings.push(msg);
    }

    SpecRowModel {
        columns,
        rows,
        n_items,
        n_subitems,
        n_fallbacks,
        warnings,
    }
}
