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

//! Salvages chart data from generated documents that lost their payload or
//! chart initialisation, typically through truncation.

use crate::chart_matcher::ChartType;
use crate::error::{ChartError, ChartResult};
use crate::input::{records_from_array, RawDataset, RawPayload, Record, Scalar};
use crate::series::coerce_value;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

static CHART_PAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<html|<!doctype|<canvas|<svg|\b(?:const|var|let)\s+data\s*=").unwrap()
});
static DATA_ISLAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<script[^>]*\bid\s*=\s*["']chart-data["']"#).unwrap());
static CHART_INIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bChart\s*\(").unwrap());
static RECORD_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\b(?:const|var|let)\s+[A-Za-z_$][\w$]*\s*=\s*(\[\s*\{.*?\}\s*,?\s*\])\s*;").unwrap()
});
static BARE_RECORD_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)(\[\s*\{.*?\}\s*,?\s*\])").unwrap());
static STAT_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)<\w+[^>]*class\s*=\s*["'][^"']*\bstat-label\b[^"']*["'][^>]*>(.*?)</\w+>\s*<\w+[^>]*class\s*=\s*["'][^"']*\bstat-value\b[^"']*["'][^>]*>(.*?)</\w+>"#,
    )
    .unwrap()
});
static TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

pub const DEFAULT_REPAIR_TITLE: &str = "Repaired Chart";

/// Data recovered from a broken document, ready to be rebuilt.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    Records(Vec<Record>),
    Payload {
        payload: RawPayload,
        chart_type: ChartType,
    },
}
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, document: &str) -> Option<Extracted>;
}
/// `const|var|let <ident> = [{...}];`, or failing that any bare record
/// array literal. Parsed leniently so unquoted keys and trailing commas
/// survive.
pub struct RecordArrayAssignment;
impl ExtractionStrategy for RecordArrayAssignment {
    fn name(&self) -> &'static str {
        "record_array_assignment"
    }
    fn extract(&self, document: &str) -> Option<Extracted> {
        let candidates = RECORD_ASSIGNMENT
            .captures_iter(document)
            .chain(BARE_RECORD_ARRAY.captures_iter(document))
            .filter_map(|c| c.get(1));
        for candidate in candidates {
            match json5::from_str::<Value>(candidate.as_str()) {
                Ok(Value::Array(items)) => {
                    let records = records_from_array(&items);
                    if !records.is_empty() {
                        return Some(Extracted::Records(records));
                    }
                }
                Ok(_) => {}
                Err(e) => debug!(error = %e, "Record array literal did not parse"),
            }
        }
        None
    }
}
/// Paired `stat-label` / `stat-value` elements rendered as a single bar
/// series. Values that do not parse are skipped.
pub struct StatFragments;
impl ExtractionStrategy for StatFragments {
    fn name(&self) -> &'static str {
        "stat_fragments"
    }
    fn extract(&self, document: &str) -> Option<Extracted> {
        let mut labels = Vec::new();
        let mut data = Vec::new();
        for pair in STAT_PAIR.captures_iter(document) {
            let label = plain_text(&pair[1]);
            let raw_value = plain_text(&pair[2]);
            match coerce_value(&Scalar::Text(raw_value.clone())) {
                Some(value) => {
                    labels.push(if label.is_empty() {
                        "Value".to_string()
                    } else {
                        label
                    });
                    data.push(Scalar::Number(value));
                }
                None => debug!(label = %label, value = %raw_value, "Skipping unparsable stat value"),
            }
        }
        if labels.is_empty() {
            return None;
        }
        Some(Extracted::Payload {
            payload: RawPayload {
                labels,
                datasets: vec![RawDataset {
                    label: Some("Value".to_string()),
                    data,
                    ..Default::default()
                }],
            },
            chart_type: ChartType::Bar,
        })
    }
}
fn plain_text(fragment: &str) -> String {
    let stripped = TAG.replace_all(fragment, "");
    htmlize::unescape(&*stripped).trim().to_string()
}
/// Whether the document claims to be a chart page yet carries neither the
/// embedded payload nor a chart initialisation call.
pub fn needs_repair(document: &str) -> bool {
    CHART_PAGE.is_match(document)
        && !DATA_ISLAND.is_match(document)
        && !CHART_INIT.is_match(document)
}
pub fn document_title(document: &str) -> Option<String> {
    TITLE
        .captures(document)
        .map(|c| plain_text(&c[1]))
        .filter(|t| !t.is_empty())
}
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairOutcome {
    Intact(String),
    Repaired {
        document: String,
        strategy: &'static str,
    },
    /// The original document, returned unchanged for inspection.
    Unrecoverable { document: String, reason: String },
}
impl RepairOutcome {
    pub fn document(&self) -> &str {
        match self {
            RepairOutcome::Intact(document)
            | RepairOutcome::Repaired { document, .. }
            | RepairOutcome::Unrecoverable { document, .. } => document,
        }
    }
    pub fn into_document(self) -> String {
        match self {
            RepairOutcome::Intact(document)
            | RepairOutcome::Repaired { document, .. }
            | RepairOutcome::Unrecoverable { document, .. } => document,
        }
    }
    pub fn is_repaired(&self) -> bool {
        matches!(self, RepairOutcome::Repaired { .. })
    }
    pub fn into_result(self) -> ChartResult<String> {
        match self {
            RepairOutcome::Unrecoverable { reason, .. } => {
                Err(ChartError::RepairUnrecoverable { reason })
            }
            other => Ok(other.into_document()),
        }
    }
}
pub struct RepairChain {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}
impl Default for RepairChain {
    fn default() -> Self {
        Self::empty()
            .with_strategy(Box::new(RecordArrayAssignment))
            .with_strategy(Box::new(StatFragments))
    }
}
impl RepairChain {
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }
    /// Appends a strategy; strategies run in insertion order.
    pub fn with_strategy(mut self, strategy: Box<dyn ExtractionStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
    /// Runs each strategy in turn and hands its data to `rebuild` together
    /// with the document title. A strategy whose data cannot be rebuilt
    /// passes control to the next one.
    pub fn repair<F>(&self, document: &str, rebuild: F) -> RepairOutcome
    where
        F: Fn(Extracted, &str) -> ChartResult<String>,
    {
        if !needs_repair(document) {
            return RepairOutcome::Intact(document.to_string());
        }
        let title = document_title(document).unwrap_or_else(|| DEFAULT_REPAIR_TITLE.to_string());
        let mut failures = Vec::new();
        for strategy in &self.strategies {
            let Some(extracted) = strategy.extract(document) else {
                failures.push(format!("{}: nothing found", strategy.name()));
                continue;
            };
            match rebuild(extracted, &title) {
                Ok(repaired) => {
                    info!(strategy = strategy.name(), title = %title, "Repaired chart document");
                    return RepairOutcome::Repaired {
                        document: repaired,
                        strategy: strategy.name(),
                    };
                }
                Err(e) => failures.push(format!("{}: {e}", strategy.name())),
            }
        }
        let reason = if failures.is_empty() {
            "no extraction strategies configured".to_string()
        } else {
            failures.join("; ")
        };
        warn!(
            reason = %reason,
            bytes = document.len(),
            "Chart document could not be repaired; returning it unchanged"
        );
        RepairOutcome::Unrecoverable {
            document: document.to_string(),
            reason,
        }
    }
}
