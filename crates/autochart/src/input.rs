// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use crate::error::{ChartError, ChartResult};
use crate::series::ColorSpec;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

/// A single cell of an upstream record.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}
impl Scalar {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Scalar::Null,
            Value::Bool(b) => Scalar::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(Scalar::Null, Scalar::Number),
            Value::String(s) => Scalar::Text(s.clone()),
            other => Scalar::Text(other.to_string()),
        }
    }
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }
    pub fn is_text(&self) -> bool {
        matches!(self, Scalar::Text(_))
    }
    /// Textual form used for axis labels. Null renders as an empty label.
    pub fn to_label(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Number(n) => n.to_string(),
            Scalar::Text(s) => s.clone(),
        }
    }
}
impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}
impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

/// Field name to scalar. Insertion order follows the upstream document.
pub type Record = IndexMap<String, Scalar>;

/// A dataset exactly as the caller supplied it, before any normalisation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawDataset {
    pub label: Option<String>,
    pub data: Vec<Scalar>,
    pub background_color: Option<ColorSpec>,
    pub border_color: Option<ColorSpec>,
    pub fill: Option<bool>,
}
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawPayload {
    pub labels: Vec<String>,
    pub datasets: Vec<RawDataset>,
}
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetInput {
    Records(Vec<Record>),
    Payload(RawPayload),
}
impl DatasetInput {
    /// Accepts a record array, a `{"result": [...]}` wrapper, a pre-built
    /// `{labels, datasets}` payload, or any object whose first array member
    /// holds records.
    pub fn from_value(value: &Value) -> ChartResult<Self> {
        match value {
            Value::Array(items) => Ok(DatasetInput::Records(records_from_array(items))),
            Value::Object(map) => {
                if map.contains_key("labels") && map.contains_key("datasets") {
                    return raw_payload_from_object(map).map(DatasetInput::Payload);
                }
                if let Some(result) = map.get("result") {
                    return match result {
                        Value::Array(items) => Ok(DatasetInput::Records(records_from_array(items))),
                        Value::Null => Ok(DatasetInput::Records(Vec::new())),
                        other => Err(ChartError::InputShape {
                            reason: format!("'result' holds {} instead of a list", kind_of(other)),
                        }),
                    };
                }
                map.values()
                    .find_map(Value::as_array)
                    .map(|items| DatasetInput::Records(records_from_array(items)))
                    .ok_or_else(|| ChartError::InputShape {
                        reason: "object has no list of records".to_string(),
                    })
            }
            other => Err(ChartError::InputShape {
                reason: format!("expected a list or object, found {}", kind_of(other)),
            }),
        }
    }
    pub fn from_json_str(text: &str) -> ChartResult<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| ChartError::InputShape {
            reason: format!("invalid JSON: {e}"),
        })?;
        Self::from_value(&value)
    }
}
/// Converts a JSON array into records, dropping items that are not objects.
pub fn records_from_array(items: &[Value]) -> Vec<Record> {
    let records: Vec<Record> = items
        .iter()
        .filter_map(Value::as_object)
        .map(|obj| {
            obj.iter()
                .map(|(k, v)| (k.clone(), Scalar::from_value(v)))
                .collect()
        })
        .collect();
    if records.len() != items.len() {
        debug!(
            dropped = items.len() - records.len(),
            "Dropped non-object items from record list"
        );
    }
    records
}
fn raw_payload_from_object(map: &serde_json::Map<String, Value>) -> ChartResult<RawPayload> {
    let labels: Vec<String> = match map.get("labels") {
        Some(Value::Array(items)) => items.iter().map(|v| Scalar::from_value(v).to_label()).collect(),
        _ => {
            return Err(ChartError::InputShape {
                reason: "'labels' must be a list".to_string(),
            })
        }
    };
    let datasets: Vec<RawDataset> = match map.get("datasets") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_object)
            .map(raw_dataset_from_object)
            .collect(),
        _ => {
            return Err(ChartError::InputShape {
                reason: "'datasets' must be a list".to_string(),
            })
        }
    };
    Ok(RawPayload { labels, datasets })
}
fn raw_dataset_from_object(obj: &serde_json::Map<String, Value>) -> RawDataset {
    RawDataset {
        label: obj.get("label").map(|v| Scalar::from_value(v).to_label()),
        data: obj
            .get("data")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(Scalar::from_value).collect())
            .unwrap_or_default(),
        background_color: obj.get("backgroundColor").and_then(ColorSpec::from_value),
        border_color: obj.get("borderColor").and_then(ColorSpec::from_value),
        fill: obj.get("fill").and_then(Value::as_bool),
    }
}
fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_result_wrapper() {
        let input = DatasetInput::from_value(&json!({"result": [{"month": "Jan", "hours": 4}]}))
            .unwrap();
        match input {
            DatasetInput::Records(records) => {
                assert_eq!(records.len(), 1);
                assert_eq!(records[0]["hours"], Scalar::Number(4.0));
            }
            other => panic!("unexpected input {other:?}"),
        }
    }

    #[test]
    fn keeps_field_order_of_records() {
        let input =
            DatasetInput::from_json_str(r#"[{"zeta": 1, "alpha": "a", "mid": null}]"#).unwrap();
        let DatasetInput::Records(records) = input else {
            panic!("expected records");
        };
        let keys: Vec<&str> = records[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn detects_prebuilt_payload() {
        let input = DatasetInput::from_value(&json!({
            "labels": ["A", 2],
            "datasets": [{"label": "Share", "data": [1, "2"], "backgroundColor": ["#111", "#222"]}]
        }))
        .unwrap();
        let DatasetInput::Payload(raw) = input else {
            panic!("expected payload");
        };
        assert_eq!(raw.labels, vec!["A", "2"]);
        assert_eq!(raw.datasets[0].data[1], Scalar::from("2"));
        assert_eq!(
            raw.datasets[0].background_color,
            Some(ColorSpec::PerSegment(vec!["#111".into(), "#222".into()]))
        );
    }

    #[test]
    fn falls_back_to_first_list_member() {
        let input = DatasetInput::from_value(&json!({"meta": 1, "rows": [{"a": 1}, 5]})).unwrap();
        assert_eq!(
            input,
            DatasetInput::Records(vec![[("a".to_string(), Scalar::Number(1.0))]
                .into_iter()
                .collect()])
        );
    }

    #[test]
    fn rejects_scalars() {
        let err = DatasetInput::from_value(&json!("nope")).unwrap_err();
        assert_eq!(err.code(), "input_shape");
        let err = DatasetInput::from_value(&json!({"result": 3})).unwrap_err();
        assert!(err.to_string().contains("a number"));
    }

    #[test]
    fn number_labels_drop_trailing_zero() {
        assert_eq!(Scalar::Number(10.0).to_label(), "10");
        assert_eq!(Scalar::Number(2.5).to_label(), "2.5");
        assert_eq!(Scalar::Null.to_label(), "");
    }
}
