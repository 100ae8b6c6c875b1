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

use crate::error::{ConfigError, ConfigResult};
use crate::input::{Record, Scalar};
use crate::series::coerce_value;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

static NUMERIC_TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\d,.\-\s]+$").unwrap());

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProfilingConfig {
    /// Checked in order; the first token any field name contains wins.
    pub temporal_tokens: Vec<String>,
    pub name_tokens: Vec<String>,
    pub cumulative_tokens: Vec<String>,
}
impl Default for ProfilingConfig {
    fn default() -> Self {
        Self {
            temporal_tokens: ["month", "date", "week", "period", "time"]
                .map(String::from)
                .to_vec(),
            name_tokens: ["project", "name", "title", "category"]
                .map(String::from)
                .to_vec(),
            cumulative_tokens: ["cumul", "running_total", "total"]
                .map(String::from)
                .to_vec(),
        }
    }
}
impl ProfilingConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, tokens) in [
            ("profiling.temporal_tokens", &self.temporal_tokens),
            ("profiling.name_tokens", &self.name_tokens),
        ] {
            if tokens.is_empty() {
                return Err(ConfigError::InvalidField {
                    field: field.to_string(),
                    reason: "must list at least one token".to_string(),
                });
            }
        }
        let all = self
            .temporal_tokens
            .iter()
            .chain(&self.name_tokens)
            .chain(&self.cumulative_tokens);
        if let Some(blank) = all.into_iter().find(|t| t.trim().is_empty()) {
            return Err(ConfigError::InvalidField {
                field: "profiling".to_string(),
                reason: format!("contains a blank token {blank:?}"),
            });
        }
        Ok(())
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldRole {
    Label,
    Numeric,
    Categorical,
    Ignored,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelKind {
    Temporal,
    Named,
}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldProfile {
    pub name: String,
    pub role: FieldRole,
}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelField {
    pub name: String,
    pub kind: LabelKind,
}
/// Roles assigned to the fields of one record collection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchemaProfile {
    fields: Vec<FieldProfile>,
    label: Option<LabelField>,
    cumulative_fields: Vec<String>,
    cumulative_retained: bool,
}
impl SchemaProfile {
    pub fn empty() -> Self {
        Self::default()
    }
    /// An empty profile is the "no chart" condition, not an error.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
    pub fn fields(&self) -> &[FieldProfile] {
        &self.fields
    }
    pub fn label(&self) -> Option<&LabelField> {
        self.label.as_ref()
    }
    pub fn label_name(&self) -> Option<&str> {
        self.label.as_ref().map(|l| l.name.as_str())
    }
    pub fn role_of(&self, name: &str) -> Option<FieldRole> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.role)
    }
    pub fn numeric_candidates(&self) -> Vec<&str> {
        self.names_with_role(FieldRole::Numeric)
    }
    pub fn categorical_fields(&self) -> Vec<&str> {
        self.names_with_role(FieldRole::Categorical)
    }
    /// Cumulative-signalling fields seen in the sample, whether or not they
    /// were kept as numeric candidates.
    pub fn cumulative_fields(&self) -> &[String] {
        &self.cumulative_fields
    }
    pub fn cumulative_retained(&self) -> bool {
        self.cumulative_retained
    }
    /// The non-temporal axis usable for bar and pie charts: a name-like
    /// label, or the first categorical field when no label was detected.
    pub fn category_axis(&self) -> Option<&str> {
        match &self.label {
            Some(LabelField {
                name,
                kind: LabelKind::Named,
            }) => Some(name.as_str()),
            Some(_) => None,
            None => self.categorical_fields().into_iter().next(),
        }
    }
    fn names_with_role(&self, role: FieldRole) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.role == role)
            .map(|f| f.name.as_str())
            .collect()
    }
}
pub struct DataProfiler {
    config: ProfilingConfig,
}
impl Default for DataProfiler {
    fn default() -> Self {
        Self::new()
    }
}
impl DataProfiler {
    pub fn new() -> Self {
        Self {
            config: ProfilingConfig::default(),
        }
    }
    pub fn with_config(config: ProfilingConfig) -> Self {
        Self { config }
    }
    pub fn config(&self) -> &ProfilingConfig {
        &self.config
    }
    /// Profiles the collection from its first record. Later records are only
    /// consulted when the first one holds nothing numeric.
    pub fn profile_records(&self, records: &[Record], include_cumulative: bool) -> SchemaProfile {
        let Some(sample) = records.first() else {
            debug!("Empty record collection; nothing to profile");
            return SchemaProfile::empty();
        };
        let label = self.detect_label(sample);
        let mut fields: Vec<FieldProfile> = sample
            .iter()
            .map(|(name, value)| {
                let role = if label.as_ref().is_some_and(|l| &l.name == name) {
                    FieldRole::Label
                } else if is_numeric(value) {
                    FieldRole::Numeric
                } else if value.is_text() {
                    FieldRole::Categorical
                } else {
                    FieldRole::Ignored
                };
                FieldProfile {
                    name: name.clone(),
                    role,
                }
            })
            .collect();
        if !fields.iter().any(|f| f.role == FieldRole::Numeric) {
            promote_numeric_columns(records, &mut fields);
        }
        let cumulative_fields: Vec<String> = fields
            .iter()
            .filter(|f| f.role == FieldRole::Numeric && self.is_cumulative(&f.name))
            .map(|f| f.name.clone())
            .collect();
        let numeric_count = fields.iter().filter(|f| f.role == FieldRole::Numeric).count();
        let cumulative_retained = include_cumulative || numeric_count == cumulative_fields.len();
        if !cumulative_retained {
            for field in &mut fields {
                if cumulative_fields.contains(&field.name) {
                    field.role = FieldRole::Ignored;
                }
            }
        } else if !include_cumulative && !cumulative_fields.is_empty() {
            warn!(
                fields = ?cumulative_fields,
                "Excluding cumulative fields would leave nothing to chart; keeping them"
            );
        }
        debug!(
            label = ?label.as_ref().map(|l| &l.name),
            numeric = numeric_count,
            cumulative = cumulative_fields.len(),
            "Profiled record sample"
        );
        SchemaProfile {
            fields,
            label,
            cumulative_fields,
            cumulative_retained,
        }
    }
    fn detect_label(&self, sample: &Record) -> Option<LabelField> {
        for token in &self.config.temporal_tokens {
            let token = token.to_lowercase();
            if let Some(name) = sample.keys().find(|k| k.to_lowercase().contains(&token)) {
                return Some(LabelField {
                    name: name.clone(),
                    kind: LabelKind::Temporal,
                });
            }
        }
        sample
            .iter()
            .find(|(k, v)| v.is_text() && self.matches_any(k, &self.config.name_tokens))
            .map(|(k, _)| LabelField {
                name: k.clone(),
                kind: LabelKind::Named,
            })
    }
    fn is_cumulative(&self, name: &str) -> bool {
        self.matches_any(name, &self.config.cumulative_tokens)
    }
    fn matches_any(&self, name: &str, tokens: &[String]) -> bool {
        let lower = name.to_lowercase();
        tokens.iter().any(|t| lower.contains(&t.to_lowercase()))
    }
}

/// Numbers, and text made only of digits, separators, signs and spaces
/// that still parses as one (`"1,200"`, `" 12 "`).
fn is_numeric(value: &Scalar) -> bool {
    match value {
        Scalar::Number(_) => true,
        Scalar::Text(text) => NUMERIC_TEXT.is_match(text) && coerce_value(value).is_some(),
        Scalar::Null | Scalar::Bool(_) => false,
    }
}
/// Fallback when the sample holds nothing numeric: a field left null in the
/// sample becomes numeric when every value it has in the other records is
/// numeric and at least one is non-zero.
fn promote_numeric_columns(records: &[Record], fields: &mut [FieldProfile]) {
    for field in fields.iter_mut().filter(|f| f.role == FieldRole::Ignored) {
        let values: Vec<&Scalar> = records
            .iter()
            .filter_map(|r| r.get(&field.name))
            .filter(|v| !matches!(v, Scalar::Null))
            .collect();
        let numeric = !values.is_empty() && values.iter().all(|v| is_numeric(v));
        if numeric && values.iter().any(|v| coerce_value(v).is_some_and(|n| n != 0.0)) {
            debug!(field = %field.name, "Promoted field to numeric from later records");
            field.role = FieldRole::Numeric;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::records_from_array;
    use serde_json::json;

    fn records(value: serde_json::Value) -> Vec<Record> {
        records_from_array(value.as_array().unwrap())
    }

    #[test]
    fn temporal_tokens_follow_priority_order() {
        let rows = records(json!([{"start_date": "2025-01-01", "month": "Jan", "hours": 3}]));
        let profile = DataProfiler::new().profile_records(&rows, false);
        assert_eq!(
            profile.label(),
            Some(&LabelField {
                name: "month".to_string(),
                kind: LabelKind::Temporal
            })
        );
        assert_eq!(profile.role_of("start_date"), Some(FieldRole::Categorical));
        assert_eq!(profile.category_axis(), None);
    }

    #[test]
    fn name_like_label_requires_text_value() {
        let rows = records(json!([{"project_id": 7, "project_name": "Apollo", "cost": 5}]));
        let profile = DataProfiler::new().profile_records(&rows, false);
        assert_eq!(profile.label_name(), Some("project_name"));
        assert_eq!(profile.numeric_candidates(), vec!["project_id", "cost"]);
        assert_eq!(profile.category_axis(), Some("project_name"));
    }

    #[test]
    fn cumulative_fields_are_excluded_by_default() {
        let rows = records(json!([{"month": "Jan", "hours": 1, "hours_cumulative": 1}]));
        let profile = DataProfiler::new().profile_records(&rows, false);
        assert_eq!(profile.numeric_candidates(), vec!["hours"]);
        assert_eq!(profile.role_of("hours_cumulative"), Some(FieldRole::Ignored));
        assert!(!profile.cumulative_retained());

        let profile = DataProfiler::new().profile_records(&rows, true);
        assert_eq!(profile.numeric_candidates(), vec!["hours", "hours_cumulative"]);
    }

    #[test]
    fn cumulative_fields_are_kept_when_nothing_else_is_numeric() {
        let rows = records(json!([{"month": "Jan", "running_total": 10, "note": "x"}]));
        let profile = DataProfiler::new().profile_records(&rows, false);
        assert_eq!(profile.numeric_candidates(), vec!["running_total"]);
        assert!(profile.cumulative_retained());
    }

    #[test]
    fn first_categorical_field_is_the_fallback_category() {
        let rows = records(json!([{"segment": "A", "region": "EU", "amount": 40, "flag": true}]));
        let profile = DataProfiler::new().profile_records(&rows, false);
        assert!(profile.label().is_none());
        assert_eq!(profile.category_axis(), Some("segment"));
        assert_eq!(profile.role_of("flag"), Some(FieldRole::Ignored));
    }

    #[test]
    fn empty_input_has_no_roles() {
        let profile = DataProfiler::new().profile_records(&[], false);
        assert!(profile.is_empty());
        assert!(profile.numeric_candidates().is_empty());
    }

    #[test]
    fn blank_tokens_fail_validation() {
        let mut config = ProfilingConfig::default();
        config.name_tokens.push("  ".to_string());
        assert!(config.validate().is_err());
        assert!(ProfilingConfig::default().validate().is_ok());
    }

    #[test]
    fn numeric_text_counts_as_numeric() {
        let rows = records(json!([
            {"month": "Jan", "hours": "12", "cost": "1,200.50", "code": "A-12", "note": "12 h"},
            {"month": "Feb", "hours": "15", "cost": "900", "code": "B-7", "note": "3 h"}
        ]));
        let profile = DataProfiler::new().profile_records(&rows, false);
        assert_eq!(profile.numeric_candidates(), vec!["hours", "cost"]);
        assert_eq!(profile.categorical_fields(), vec!["code", "note"]);
    }

    #[test]
    fn separators_alone_are_not_numeric() {
        let rows = records(json!([{"month": "Jan", "dash": "-", "blank": "  ", "hours": 1}]));
        let profile = DataProfiler::new().profile_records(&rows, false);
        assert_eq!(profile.numeric_candidates(), vec!["hours"]);
        assert_eq!(profile.role_of("dash"), Some(FieldRole::Categorical));
    }

    #[test]
    fn null_sample_fields_are_promoted_from_later_records() {
        let rows = records(json!([
            {"month": "Jan", "hours": null, "flag": null, "zero": null},
            {"month": "Feb", "hours": "4", "flag": true, "zero": 0},
            {"month": "Mar", "hours": 6}
        ]));
        let profile = DataProfiler::new().profile_records(&rows, false);
        assert_eq!(profile.numeric_candidates(), vec!["hours"]);
        assert_eq!(profile.role_of("flag"), Some(FieldRole::Ignored));
        assert_eq!(profile.role_of("zero"), Some(FieldRole::Ignored));
    }
}
