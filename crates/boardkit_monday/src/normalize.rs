//! Column value normalizer.
//!
//! Pure, total mapping from `(type tag, raw payload)` to a display-ready
//! [`EnumCellValue`]. Unparsable payloads degrade to their raw text, never to
//! an error.

use boardkit_io_xlsx::EnumCellValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;

use crate::conf::C_PEOPLE_SEPARATOR;
use crate::model::{EnumColumnType, SpecColumnValue};

const TUP_DATETIME_FORMATS: [&str; 3] =
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"];
const TUP_TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

/// Why a cell fell back to its raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumNormalizeFallback {
    /// Numeric column with non-numeric text.
    UnparsableNumber,
    /// Date column with text in no accepted format.
    UnparsableDate,
}

/// Normalized cell plus an optional fallback marker.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecNormalizedCell {
    /// Display value.
    pub value: EnumCellValue,
    /// Set when the value is a degraded rendition of the payload.
    pub fallback: Option<EnumNormalizeFallback>,
}

impl SpecNormalizedCell {
    fn clean(value: EnumCellValue) -> Self {
        Self {
            value,
            fallback: None,
        }
    }

    fn degraded(text: &str, fallback: EnumNormalizeFallback) -> Self {
        Self {
            value: EnumCellValue::from_text(text),
            fallback: Some(fallback),
        }
    }
}

/// Normalize one raw column value for a column of type `col_type`.
///
/// A missing payload yields [`EnumCellValue::None`].
pub fn normalize_column_value(
    col_type: &EnumColumnType,
    raw: Option<&SpecColumnValue>,
) -> EnumCellValue {
    normalize_column_value_traced(col_type, raw).value
}

/// Like [`normalize_column_value`], also reporting whether a fallback was taken.
pub fn normalize_column_value_traced(
    col_type: &EnumColumnType,
    raw: Option<&SpecColumnValue>,
) -> SpecNormalizedCell {
    let Some(raw) = raw else {
        return SpecNormalizedCell::clean(EnumCellValue::None);
    };
    let value_json = raw.value_json().ok().flatten();

    match col_type {
        EnumColumnType::Numeric => normalize_numeric(raw.text_trimmed(), value_json.as_ref()),
        EnumColumnType::Date => normalize_date(raw.text_trimmed(), value_json.as_ref()),
        EnumColumnType::Status => SpecNormalizedCell::clean(normalize_status(
            raw.text_trimmed(),
            value_json.as_ref(),
        )),
        EnumColumnType::Person => SpecNormalizedCell::clean(normalize_people(raw.text_trimmed())),
        EnumColumnType::Link => SpecNormalizedCell::clean(normalize_link(
            raw.text_trimmed(),
            value_json.as_ref(),
        )),
        EnumColumnType::Checkbox => {
            SpecNormalizedCell::clean(normalize_checkbox(value_json.as_ref()))
        }
        EnumColumnType::LongText => SpecNormalizedCell::clean(
            match EnumCellValue::from_text(raw.text_trimmed()) {
                EnumCellValue::None => json_str_field(value_json.as_ref(), "text")
                    .map_or(EnumCellValue::None, EnumCellValue::from_text),
                value => value,
            },
        ),
        EnumColumnType::Text | EnumColumnType::Unknown(_) => SpecNormalizedCell::clean(
            match EnumCellValue::from_text(raw.text_trimmed()) {
                EnumCellValue::None => match value_json.as_ref() {
                    Some(Value::String(val)) => EnumCellValue::from_text(val),
                    Some(Value::Number(val)) => EnumCellValue::String(val.to_string()),
                    _ => EnumCellValue::None,
                },
                value => value,
            },
        ),
    }
}

/// Parse an API timestamp (RFC 3339, or a naive date/date-time) into naive UTC.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let c_text = text.trim();
    if c_text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(c_text) {
        return Some(dt.naive_utc());
    }
    for c_fmt in TUP_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(c_text, c_fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(c_text, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN))
}

fn normalize_numeric(text: &str, value_json: Option<&Value>) -> SpecNormalizedCell {
    let c_text = if text.is_empty() {
        match value_json {
            Some(Value::String(val)) => val.trim().to_string(),
            Some(Value::Number(val)) => val.to_string(),
            _ => String::new(),
        }
    } else {
        text.to_string()
    };
    if c_text.is_empty() {
        return SpecNormalizedCell::clean(EnumCellValue::None);
    }

    match c_text.replace(',', "").parse::<f64>() {
        Ok(val) if val.is_finite() => SpecNormalizedCell::clean(EnumCellValue::Number(val)),
        _ => SpecNormalizedCell::degraded(&c_text, EnumNormalizeFallback::UnparsableNumber),
    }
}

fn normalize_date(text: &str, value_json: Option<&Value>) -> SpecNormalizedCell {
    let c_date = json_str_field(value_json, "date").map(str::trim).unwrap_or_default();
    if let Ok(date) = NaiveDate::parse_from_str(c_date, "%Y-%m-%d") {
        let time = json_str_field(value_json, "time")
            .and_then(parse_time)
            .unwrap_or(NaiveTime::MIN);
        return SpecNormalizedCell::clean(EnumCellValue::DateTime(date.and_time(time)));
    }

    if let Some(dt) = parse_timestamp(text) {
        return SpecNormalizedCell::clean(EnumCellValue::DateTime(dt));
    }
    // Raw text wins over the payload field for display.
    match (text.is_empty(), c_date.is_empty()) {
        (true, true) => SpecNormalizedCell::clean(EnumCellValue::None),
        (false, _) => SpecNormalizedCell::degraded(text, EnumNormalizeFallback::UnparsableDate),
        (true, false) => {
            SpecNormalizedCell::degraded(c_date, EnumNormalizeFallback::UnparsableDate)
        }
    }
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    TUP_TIME_FORMATS
        .iter()
        .find_map(|c_fmt| NaiveTime::parse_from_str(text.trim(), c_fmt).ok())
}

fn normalize_status(text: &str, value_json: Option<&Value>) -> EnumCellValue {
    match EnumCellValue::from_text(text) {
        EnumCellValue::None => json_str_field(value_json, "label")
            .map_or(EnumCellValue::None, EnumCellValue::from_text),
        value => value,
    }
}

fn normalize_people(text: &str) -> EnumCellValue {
    let l_names: Vec<&str> = text
        .split([',', '\n'])
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();
    if l_names.is_empty() {
        EnumCellValue::None
    } else {
        EnumCellValue::String(l_names.join(C_PEOPLE_SEPARATOR))
    }
}

fn normalize_link(text: &str, value_json: Option<&Value>) -> EnumCellValue {
    let c_url = json_str_field(value_json, "url").map(str::trim).unwrap_or_default();
    if c_url.is_empty() {
        return if value_json.is_some() {
            EnumCellValue::None
        } else {
            EnumCellValue::from_text(text)
        };
    }

    let c_label = json_str_field(value_json, "text").map(str::trim).unwrap_or_default();
    if c_label.is_empty() || c_label == c_url {
        EnumCellValue::String(c_url.to_string())
    } else {
        EnumCellValue::String(format!("{c_label} ({c_url})"))
    }
}

fn normalize_checkbox(value_json: Option<&Value>) -> EnumCellValue {
    let checked = match value_json {
        Some(Value::Object(obj)) => obj.get("checked"),
        Some(val) => Some(val),
        None => None,
    };
    let if_checked = match checked {
        Some(Value::Bool(val)) => Some(*val),
        Some(Value::String(val)) => match val.trim().to_ascii_lowercase().as_str() {
            "true" | "v" | "1" => Some(true),
            "false" | "0" | "" => Some(false),
            _ => None,
        },
        _ => None,
    };
    match if_checked {
        Some(true) => EnumCellValue::String("Yes".to_string()),
        Some(false) => EnumCellValue::String("No".to_string()),
        None => EnumCellValue::None,
    }
}

fn json_str_field<'a>(value_json: Option<&'a Value>, key: &str) -> Option<&'a str> {
    value_json?.get(key)?.as_str()
}
