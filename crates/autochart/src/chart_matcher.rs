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

use crate::data_profiler::SchemaProfile;
use crate::error::{ConfigError, ConfigResult};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Line,
    Bar,
    Pie,
    Doughnut,
}
impl ChartType {
    /// Normalises a directive token. Unknown tokens yield `None` so the
    /// caller falls back to heuristic selection.
    pub fn parse_directive(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "line" => Some(ChartType::Line),
            "bar" => Some(ChartType::Bar),
            "pie" => Some(ChartType::Pie),
            "doughnut" | "donut" => Some(ChartType::Doughnut),
            _ => None,
        }
    }
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Line => "line",
            ChartType::Bar => "bar",
            ChartType::Pie => "pie",
            ChartType::Doughnut => "doughnut",
        }
    }
    pub fn is_radial(&self) -> bool {
        matches!(self, ChartType::Pie | ChartType::Doughnut)
    }
    /// Line charts keep gaps for missing values; every other family sums.
    pub fn keeps_gaps(&self) -> bool {
        matches!(self, ChartType::Line)
    }
}
impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
impl FromStr for ChartType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_directive(s).ok_or_else(|| format!("unknown chart type '{s}'"))
    }
}
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SelectionConfig {
    /// Case-insensitive pattern for planned-like field names.
    pub planned_pattern: String,
    /// Case-insensitive pattern for actual-like field names.
    pub actual_pattern: String,
}
impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            planned_pattern: "plan|budget".to_string(),
            actual_pattern: "actual|spent|cost|expense".to_string(),
        }
    }
}
impl SelectionConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        compile("selection.planned_pattern", &self.planned_pattern)?;
        compile("selection.actual_pattern", &self.actual_pattern)?;
        Ok(())
    }
}
fn compile(field: &str, pattern: &str) -> ConfigResult<Regex> {
    if pattern.trim().is_empty() {
        return Err(ConfigError::InvalidField {
            field: field.to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| ConfigError::InvalidField {
            field: field.to_string(),
            reason: e.to_string(),
        })
}
/// How the builder should turn records into datasets. Field names are
/// resolved here once so the builder never re-inspects them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SeriesStrategy {
    /// Two datasets, `Planned` and `Actual`, each taking the first non-null
    /// value among its fields per record.
    Grouped {
        category: String,
        planned: Vec<String>,
        actual: Vec<String>,
    },
    /// One dataset of segments. Several value fields are collapsed.
    Segments {
        category: Option<String>,
        value_fields: Vec<String>,
    },
    /// One dataset per field over the label field, or the record index.
    Series {
        label: Option<String>,
        fields: Vec<String>,
    },
}
impl SeriesStrategy {
    pub fn axis_field(&self) -> Option<&str> {
        match self {
            SeriesStrategy::Grouped { category, .. } => Some(category),
            SeriesStrategy::Segments { category, .. } => category.as_deref(),
            SeriesStrategy::Series { label, .. } => label.as_deref(),
        }
    }
    pub fn is_empty(&self) -> bool {
        match self {
            SeriesStrategy::Grouped {
                planned, actual, ..
            } => planned.is_empty() && actual.is_empty(),
            SeriesStrategy::Segments { value_fields, .. } => value_fields.is_empty(),
            SeriesStrategy::Series { fields, .. } => fields.is_empty(),
        }
    }
}
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartPlan {
    pub chart_type: ChartType,
    pub strategy: SeriesStrategy,
    /// Whether the chart type came from a directive rather than heuristics.
    pub explicit: bool,
}
pub struct ChartMatcher {
    planned: Regex,
    actual: Regex,
}
impl ChartMatcher {
    pub fn new(config: &SelectionConfig) -> ConfigResult<Self> {
        Ok(Self {
            planned: compile("selection.planned_pattern", &config.planned_pattern)?,
            actual: compile("selection.actual_pattern", &config.actual_pattern)?,
        })
    }
    pub fn select(&self, profile: &SchemaProfile, directive: Option<ChartType>) -> ChartPlan {
        let plan = match directive {
            Some(chart_type) => self.plan_for_directive(profile, chart_type),
            None => self.plan_by_heuristics(profile),
        };
        debug!(
            chart_type = %plan.chart_type,
            explicit = plan.explicit,
            axis = ?plan.strategy.axis_field(),
            "Selected chart plan"
        );
        plan
    }
    fn plan_for_directive(&self, profile: &SchemaProfile, chart_type: ChartType) -> ChartPlan {
        let fields = owned(profile.numeric_candidates());
        let strategy = match chart_type {
            ChartType::Pie | ChartType::Doughnut => SeriesStrategy::Segments {
                category: profile
                    .category_axis()
                    .or_else(|| profile.label_name())
                    .map(str::to_string),
                value_fields: fields,
            },
            ChartType::Bar => self.grouped(profile).unwrap_or(SeriesStrategy::Series {
                label: profile.label_name().map(str::to_string),
                fields,
            }),
            ChartType::Line => SeriesStrategy::Series {
                label: profile.label_name().map(str::to_string),
                fields,
            },
        };
        ChartPlan {
            chart_type,
            strategy,
            explicit: true,
        }
    }
    fn plan_by_heuristics(&self, profile: &SchemaProfile) -> ChartPlan {
        if let Some(strategy) = self.grouped(profile) {
            return ChartPlan {
                chart_type: ChartType::Bar,
                strategy,
                explicit: false,
            };
        }
        let numeric = profile.numeric_candidates();
        if let (1, Some(category)) = (numeric.len(), profile.category_axis()) {
            return ChartPlan {
                chart_type: ChartType::Pie,
                strategy: SeriesStrategy::Segments {
                    category: Some(category.to_string()),
                    value_fields: owned(numeric),
                },
                explicit: false,
            };
        }
        if numeric.len() > 1 {
            if let Some(category) = profile.category_axis() {
                debug!(
                    category,
                    numeric = numeric.len(),
                    "Several numeric fields share a category axis; defaulting to line"
                );
            }
        }
        ChartPlan {
            chart_type: ChartType::Line,
            strategy: SeriesStrategy::Series {
                label: profile.label_name().map(str::to_string),
                fields: owned(numeric),
            },
            explicit: false,
        }
    }
    fn grouped(&self, profile: &SchemaProfile) -> Option<SeriesStrategy> {
        let category = profile.category_axis()?;
        let (planned, actual): (Vec<&str>, Vec<&str>) = profile
            .numeric_candidates()
            .into_iter()
            .filter(|f| self.planned.is_match(f) || self.actual.is_match(f))
            .partition(|f| self.planned.is_match(f));
        if planned.is_empty() || actual.is_empty() {
            return None;
        }
        Some(SeriesStrategy::Grouped {
            category: category.to_string(),
            planned: owned(planned),
            actual: owned(actual),
        })
    }
}
fn owned(names: Vec<&str>) -> Vec<String> {
    names.into_iter().map(str::to_string).collect()
}
