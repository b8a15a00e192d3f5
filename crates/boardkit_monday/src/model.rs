//! Board snapshot models decoded from GraphQL responses.
//!
//! Every entity is a read-only snapshot taken once per run.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

/// Closed set of column type tags driving value normalization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum EnumColumnType {
    /// Short free text (also name/email/phone).
    Text,
    /// Numeric value.
    Numeric,
    /// Date with optional time.
    Date,
    /// Status/label/dropdown.
    Status,
    /// One or more people.
    Person,
    /// URL with optional label.
    Link,
    /// Multi-line text.
    LongText,
    /// Checked/unchecked flag.
    Checkbox,
    /// Any other API type; raw tag kept for diagnostics.
    Unknown(String),
}

impl EnumColumnType {
    /// Map an API type string to a tag.
    pub fn from_api(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "text" | "name" | "email" | "phone" => Self::Text,
            "numbers" | "numeric" => Self::Numeric,
            "date" => Self::Date,
            "status" | "color" | "dropdown" => Self::Status,
            "people" | "multiple-person" | "person" => Self::Person,
            "link" => Self::Link,
            "long_text" | "long-text" => Self::LongText,
            "checkbox" | "boolean" => Self::Checkbox,
            _ => Self::Unknown(tag.to_string()),
        }
    }
}

impl From<String> for EnumColumnType {
    fn from(value: String) -> Self {
        Self::from_api(&value)
    }
}

impl fmt::Display for EnumColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Numeric => write!(f, "numeric"),
            Self::Date => write!(f, "date"),
            Self::Status => write!(f, "status"),
            Self::Person => write!(f, "person"),
            Self::Link => write!(f, "link"),
            Self::LongText => write!(f, "long_text"),
            Self::Checkbox => write!(f, "checkbox"),
            Self::Unknown(tag) => write!(f, "{tag}"),
        }
    }
}

/// Column definition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpecColumn {
    /// Unique within the board.
    pub id: String,
    /// Header label.
    pub title: String,
    /// Normalization tag.
    #[serde(rename = "type")]
    pub col_type: EnumColumnType,
    /// Archived columns are hidden from exports.
    #[serde(default)]
    pub archived: Option<bool>,
}

impl SpecColumn {
    /// Whether the board hides this column.
    pub fn is_hidden(&self) -> bool {
        self.archived.unwrap_or(false)
    }
}

/// Group of items.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpecGroup {
    /// Group id referenced by items.
    pub id: String,
    /// Display name.
    pub title: String,
    /// Ordering position (numeric string in the API).
    #[serde(default)]
    pub position: Option<String>,
}

impl SpecGroup {
    /// Position as a sortable number; unknown positions sort last.
    pub fn position_key(&self) -> f64 {
        self.position
            .as_deref()
            .and_then(|val| val.trim().parse::<f64>().ok())
            .filter(|val| val.is_finite())
            .unwrap_or(f64::MAX)
    }
}

/// Group reference embedded in an item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpecGroupRef {
    /// Referenced group id.
    pub id: String,
    /// Title as seen by the item query.
    #[serde(default)]
    pub title: Option<String>,
}

/// User identity.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpecPerson {
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Raw column value payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpecColumnValue {
    /// Column id.
    pub id: String,
    /// Server-rendered text.
    #[serde(default)]
    pub text: Option<String>,
    /// JSON-encoded value (usually a string holding JSON).
    #[serde(default)]
    pub value: Option<Value>,
}

impl SpecColumnValue {
    /// Trimmed text, empty when absent.
    pub fn text_trimmed(&self) -> &str {
        self.text.as_deref().map(str::trim).unwrap_or_default()
    }

    /// Decode `value` into JSON. String payloads are parsed; objects pass through.
    ///
    /// Returns `Err` with the raw text when a string payload is not valid JSON.
    pub fn value_json(&self) -> Result<Option<Value>, String> {
        match &self.value {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(raw)) if raw.trim().is_empty() => Ok(None),
            Some(Value::String(raw)) => serde_json::from_str::<Value>(raw)
                .map(|val| if val.is_null() { None } else { Some(val) })
                .map_err(|_| raw.clone()),
            Some(val) => Ok(Some(val.clone())),
        }
    }
}

/// Item (or subitem) snapshot.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpecItem {
    /// Item id.
    pub id: String,
    /// Item name.
    pub name: String,
    /// Owning group.
    #[serde(default)]
    pub group: Option<SpecGroupRef>,
    /// Creator.
    #[serde(default)]
    pub creator: Option<SpecPerson>,
    /// Raw creation timestamp.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Raw update timestamp.
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Raw column values.
    #[serde(default)]
    pub column_values: Vec<SpecColumnValue>,
    /// Subitems, filled by the second fetch phase; `None` when not requested.
    #[serde(skip)]
    pub subitems: Option<Vec<SpecItem>>,
}

impl SpecItem {
    /// Return the column value for `column_id`, if present.
    pub fn column_value_by_id(&self, column_id: &str) -> Option<&SpecColumnValue> {
        self.column_values.iter().find(|val| val.id == column_id)
    }

    /// Creator display name, if any.
    pub fn creator_name(&self) -> Option<&str> {
        self.creator
            .as_ref()
            .and_then(|person| person.name.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Board metadata.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpecBoard {
    /// Board id.
    pub id: String,
    /// Board name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Item count reported by the API.
    #[serde(default)]
    pub items_count: Option<u64>,
    /// Columns in display order.
    #[serde(default)]
    pub columns: Vec<SpecColumn>,
    /// Groups.
    #[serde(default)]
    pub groups: Vec<SpecGroup>,
}

impl SpecBoard {
    /// Groups sorted by position; ties keep API order.
    pub fn groups_ordered(&self) -> Vec<&SpecGroup> {
        let mut l_groups: Vec<&SpecGroup> = self.groups.iter().collect();
        l_groups.sort_by(|a, b| a.position_key().total_cmp(&b.position_key()));
        l_groups
    }
}

/// Complete board snapshot for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecBoardSnapshot {
    /// Board metadata.
    pub board: SpecBoard,
    /// Top-level items in API order.
    pub items: Vec<SpecItem>,
}

impl SpecBoardSnapshot {
    /// Number of subitems across all items.
    pub fn subitem_count(&self) -> usize {
        self.items
            .iter()
            .map(|item| item.subitems.as_ref().map_or(0, Vec::len))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_column_type_mapping_is_total() {
        assert_eq!(EnumColumnType::from_api("numbers"), EnumColumnType::Numeric);
        assert_eq!(EnumColumnType::from_api("long_text"), EnumColumnType::LongText);
        assert_eq!(EnumColumnType::from_api("multiple-person"), EnumColumnType::Person);
        assert_eq!(
            EnumColumnType::from_api("timeline"),
            EnumColumnType::Unknown("timeline".to_string())
        );
    }

    #[test]
    fn test_board_decodes_with_missing_optional_fields() {
        let board: SpecBoard = serde_json::from_value(json!({
            "id": "7",
            "name": "Roadmap",
            "columns": [{"id": "date4", "title": "Due", "type": "date"}],
            "groups": [
                {"id": "b", "title": "Later", "position": "131072"},
                {"id": "a", "title": "Now", "position": "65536"}
            ]
        }))
        .expect("decode board");

        assert_eq!(board.columns[0].col_type, EnumColumnType::Date);
        assert!(!board.columns[0].is_hidden());
        let l_titles: Vec<&str> = board
            .groups_ordered()
            .iter()
            .map(|group| group.title.as_str())
            .collect();
        assert_eq!(l_titles, vec!["Now", "Later"]);
    }

    #[test]
    fn test_value_json_accepts_string_and_object_payloads() {
        let cv_string: SpecColumnValue = serde_json::from_value(json!({
            "id": "c", "text": "x", "value": "{\"checked\":\"true\"}"
        }))
        .expect("decode");
        assert_eq!(
            cv_string.value_json().expect("json"),
            Some(json!({"checked": "true"}))
        );

        let cv_object: SpecColumnValue =
            serde_json::from_value(json!({"id": "c", "value": {"url": "u"}})).expect("decode");
        assert_eq!(cv_object.value_json().expect("json"), Some(json!({"url": "u"})));

        let cv_broken: SpecColumnValue =
            serde_json::from_value(json!({"id": "c", "value": "{oops"})).expect("decode");
        assert_eq!(cv_broken.value_json(), Err("{oops".to_string()));
    }
}
