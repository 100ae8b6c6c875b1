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

use crate::chart_matcher::{ChartPlan, ChartType, SeriesStrategy};
use crate::error::{ChartError, ConfigError, ConfigResult};
use crate::input::{RawDataset, RawPayload, Record, Scalar};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

static NON_NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9.\-]").unwrap());
static PREFERRED_SEGMENT_SERIES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)planned|plan|total").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorSpec {
    Single(String),
    PerSegment(Vec<String>),
}
impl ColorSpec {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(ColorSpec::Single(s.clone())),
            Value::Array(items) => Some(ColorSpec::PerSegment(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            )),
            _ => None,
        }
    }
    /// Colour at a segment position, repeating a single colour.
    pub fn at(&self, index: usize) -> Option<&str> {
        match self {
            ColorSpec::Single(c) => Some(c),
            ColorSpec::PerSegment(cs) => cs.get(index).map(String::as_str),
        }
    }
}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    label: String,
    data: Vec<Option<f64>>,
    background_color: ColorSpec,
    border_color: ColorSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fill: Option<bool>,
}
impl Dataset {
    pub fn new(
        label: impl Into<String>,
        data: Vec<Option<f64>>,
        background_color: ColorSpec,
        border_color: ColorSpec,
        fill: Option<bool>,
    ) -> Self {
        Self {
            label: label.into(),
            data,
            background_color,
            border_color,
            fill,
        }
    }
    pub fn label(&self) -> &str {
        &self.label
    }
    pub fn data(&self) -> &[Option<f64>] {
        &self.data
    }
    pub fn background_color(&self) -> &ColorSpec {
        &self.background_color
    }
    pub fn border_color(&self) -> &ColorSpec {
        &self.border_color
    }
    pub fn fill(&self) -> Option<bool> {
        self.fill
    }
    pub fn total(&self) -> f64 {
        self.data.iter().flatten().sum()
    }
    pub fn has_values(&self) -> bool {
        self.data.iter().any(Option::is_some)
    }
}
/// The normalised `{labels, datasets}` structure handed to rendering.
/// Built once per request and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "UncheckedPayload")]
pub struct SeriesPayload {
    labels: Vec<String>,
    datasets: Vec<Dataset>,
}
#[derive(Deserialize)]
struct UncheckedPayload {
    labels: Vec<String>,
    datasets: Vec<Dataset>,
}
impl TryFrom<UncheckedPayload> for SeriesPayload {
    type Error = ChartError;

    fn try_from(unchecked: UncheckedPayload) -> Result<Self, Self::Error> {
        Self::new(unchecked.labels, unchecked.datasets)
    }
}
impl SeriesPayload {
    /// Rejects datasets whose length differs from the label axis.
    pub fn new(labels: Vec<String>, datasets: Vec<Dataset>) -> Result<Self, ChartError> {
        if let Some(bad) = datasets.iter().find(|d| d.data.len() != labels.len()) {
            return Err(ChartError::InputShape {
                reason: format!(
                    "dataset '{}' has {} values for {} labels",
                    bad.label,
                    bad.data.len(),
                    labels.len()
                ),
            });
        }
        Ok(Self { labels, datasets })
    }
    pub(crate) fn aligned(labels: Vec<String>, datasets: Vec<Dataset>) -> Self {
        debug_assert!(datasets.iter().all(|d| d.data.len() == labels.len()));
        Self { labels, datasets }
    }
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
    pub fn has_values(&self) -> bool {
        self.datasets.iter().any(Dataset::has_values)
    }
    /// Copy with every dataset label prefixed, used when several sources
    /// would otherwise contribute identically named series.
    pub fn with_dataset_prefix(&self, prefix: &str) -> Self {
        let datasets = self
            .datasets
            .iter()
            .map(|d| Dataset {
                label: format!("{prefix}: {}", d.label),
                ..d.clone()
            })
            .collect();
        Self {
            labels: self.labels.clone(),
            datasets,
        }
    }
}
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PaletteConfig {
    pub colors: Vec<String>,
    pub placeholder_border: String,
    pub placeholder_background: String,
}
impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            colors: [
                "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2",
                "#7f7f7f", "#bcbd22", "#17becf",
            ]
            .map(String::from)
            .to_vec(),
            placeholder_border: "#777".to_string(),
            placeholder_background: "#bbb".to_string(),
        }
    }
}
impl PaletteConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.colors.is_empty() {
            return Err(ConfigError::InvalidField {
                field: "palette.colors".to_string(),
                reason: "must list at least one colour".to_string(),
            });
        }
        if self.colors.iter().any(|c| c.trim().is_empty()) {
            return Err(ConfigError::InvalidField {
                field: "palette.colors".to_string(),
                reason: "contains a blank colour".to_string(),
            });
        }
        Ok(())
    }
}
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<String>,
    placeholder_border: String,
    placeholder_background: String,
}
impl Default for Palette {
    fn default() -> Self {
        Self::from_config(&PaletteConfig::default())
    }
}
impl Palette {
    /// An empty colour list falls back to the default palette.
    pub fn from_config(config: &PaletteConfig) -> Self {
        let colors = if config.colors.is_empty() {
            PaletteConfig::default().colors
        } else {
            config.colors.clone()
        };
        Self {
            colors,
            placeholder_border: config.placeholder_border.clone(),
            placeholder_background: config.placeholder_background.clone(),
        }
    }
    pub fn color(&self, index: usize) -> &str {
        &self.colors[index % self.colors.len()]
    }
    pub fn segment_colors(&self, count: usize) -> Vec<String> {
        (0..count).map(|i| self.color(i).to_string()).collect()
    }
}
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutcome {
    pub payload: SeriesPayload,
    pub chart_type: ChartType,
    /// Set when a placeholder was produced instead of real series.
    pub degradation: Option<ChartError>,
}
impl BuildOutcome {
    pub fn is_degraded(&self) -> bool {
        self.degradation.is_some()
    }
}
/// Strips everything but digits, dots and minus signs from text before
/// parsing. Nulls, booleans and unparsable text yield `None`.
pub fn coerce_value(value: &Scalar) -> Option<f64> {
    match value {
        Scalar::Number(n) => n.is_finite().then_some(*n),
        Scalar::Text(s) => NON_NUMERIC
            .replace_all(s, "")
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite()),
        Scalar::Null | Scalar::Bool(_) => None,
    }
}
fn resolve(value: Option<&Scalar>, chart_type: ChartType) -> Option<f64> {
    let coerced = value.and_then(coerce_value);
    if chart_type.keeps_gaps() {
        coerced
    } else {
        Some(coerced.unwrap_or(0.0))
    }
}
#[derive(Default)]
pub struct SeriesBuilder {
    palette: Palette,
}
impl SeriesBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_palette(palette: Palette) -> Self {
        Self { palette }
    }
    pub fn palette(&self) -> &Palette {
        &self.palette
    }
    pub fn build(&self, records: &[Record], plan: &ChartPlan) -> BuildOutcome {
        let chart_type = plan.chart_type;
        if records.is_empty() {
            return self.placeholder(
                Vec::new(),
                chart_type,
                ChartError::InputShape {
                    reason: "no records to chart".to_string(),
                },
            );
        }
        let labels = axis_labels(records, plan.strategy.axis_field());
        if plan.strategy.is_empty() {
            return self.placeholder(
                labels,
                chart_type,
                ChartError::FieldAmbiguity {
                    field_count: records[0].len(),
                },
            );
        }
        let datasets = match &plan.strategy {
            SeriesStrategy::Grouped {
                planned, actual, ..
            } => [("Planned", planned), ("Actual", actual)]
                .into_iter()
                .filter(|(_, fields)| !fields.is_empty())
                .enumerate()
                .map(|(idx, (name, fields))| {
                    let data = records
                        .iter()
                        .map(|r| resolve(first_present(r, fields), chart_type))
                        .collect();
                    self.series_dataset(name, data, idx, chart_type)
                })
                .collect(),
            SeriesStrategy::Segments { value_fields, .. } => {
                let candidates = self.field_datasets(records, value_fields, chart_type);
                vec![self.collapse_radial(labels.len(), candidates)]
            }
            SeriesStrategy::Series { fields, .. } => {
                self.field_datasets(records, fields, chart_type)
            }
        };
        debug!(
            chart_type = %chart_type,
            labels = labels.len(),
            datasets = datasets.len(),
            "Built series payload"
        );
        BuildOutcome {
            payload: SeriesPayload::aligned(labels, datasets),
            chart_type,
            degradation: None,
        }
    }
    /// Normalises a caller-built payload: values are coerced, each dataset is
    /// padded or truncated to the label count, missing colours come from the
    /// palette, and radial charts are collapsed to a single dataset.
    pub fn from_payload(&self, raw: &RawPayload, chart_type: ChartType) -> BuildOutcome {
        if raw.datasets.is_empty() {
            return self.placeholder(
                raw.labels.clone(),
                chart_type,
                ChartError::InputShape {
                    reason: "payload has no datasets".to_string(),
                },
            );
        }
        if raw.labels.is_empty() {
            return self.placeholder(
                Vec::new(),
                chart_type,
                ChartError::InputShape {
                    reason: format!("payload has {} datasets but no labels", raw.datasets.len()),
                },
            );
        }
        let label_count = raw.labels.len();
        let datasets: Vec<Dataset> = raw
            .datasets
            .iter()
            .enumerate()
            .map(|(idx, ds)| self.normalise_dataset(idx, ds, label_count, chart_type))
            .collect();
        let datasets = if chart_type.is_radial() {
            vec![self.collapse_radial(label_count, datasets)]
        } else {
            datasets
        };
        BuildOutcome {
            payload: SeriesPayload::aligned(raw.labels.clone(), datasets),
            chart_type,
            degradation: None,
        }
    }
    /// The defined "no data" output: one zero dataset named `value` over the
    /// given labels, or over `["x"]` when there are none.
    pub fn placeholder(
        &self,
        labels: Vec<String>,
        chart_type: ChartType,
        degradation: ChartError,
    ) -> BuildOutcome {
        info!(
            code = degradation.code(),
            reason = %degradation,
            "Rendering placeholder series"
        );
        let labels = if labels.is_empty() {
            vec!["x".to_string()]
        } else {
            labels
        };
        let (background, border) = if chart_type.is_radial() {
            (
                ColorSpec::PerSegment(vec![self.palette.placeholder_background.clone(); labels.len()]),
                ColorSpec::PerSegment(vec![self.palette.placeholder_border.clone(); labels.len()]),
            )
        } else {
            (
                ColorSpec::Single(self.palette.placeholder_background.clone()),
                ColorSpec::Single(self.palette.placeholder_border.clone()),
            )
        };
        let dataset = Dataset::new("value", vec![Some(0.0); labels.len()], background, border, None);
        BuildOutcome {
            payload: SeriesPayload::aligned(labels, vec![dataset]),
            chart_type,
            degradation: Some(degradation),
        }
    }
    fn field_datasets(
        &self,
        records: &[Record],
        fields: &[String],
        chart_type: ChartType,
    ) -> Vec<Dataset> {
        fields
            .iter()
            .enumerate()
            .map(|(idx, field)| {
                let data = records
                    .iter()
                    .map(|r| resolve(r.get(field), chart_type))
                    .collect();
                self.series_dataset(field, data, idx, chart_type)
            })
            .collect()
    }
    fn series_dataset(
        &self,
        label: &str,
        data: Vec<Option<f64>>,
        idx: usize,
        chart_type: ChartType,
    ) -> Dataset {
        let color = self.palette.color(idx).to_string();
        let fill = chart_type.keeps_gaps().then_some(false);
        Dataset::new(
            label,
            data,
            ColorSpec::Single(color.clone()),
            ColorSpec::Single(color),
            fill,
        )
    }
    fn normalise_dataset(
        &self,
        idx: usize,
        raw: &RawDataset,
        label_count: usize,
        chart_type: ChartType,
    ) -> Dataset {
        let mut data: Vec<Option<f64>> = raw
            .data
            .iter()
            .take(label_count)
            .map(|v| resolve(Some(v), chart_type))
            .collect();
        if data.len() < label_count {
            debug!(
                dataset = idx,
                missing = label_count - data.len(),
                "Padding short dataset to label count"
            );
            data.resize(label_count, resolve(None, chart_type));
        }
        let fallback = ColorSpec::Single(self.palette.color(idx).to_string());
        let background = raw.background_color.clone().unwrap_or_else(|| fallback.clone());
        let border = raw.border_color.clone().unwrap_or(fallback);
        Dataset::new(
            raw.label.clone().unwrap_or_else(|| format!("Series {}", idx + 1)),
            data,
            background,
            border,
            raw.fill,
        )
    }
    /// Reduces several candidate datasets to one segment dataset. A dataset
    /// labelled planned/plan/total is preferred; otherwise values are summed
    /// per label into `Total`.
    fn collapse_radial(&self, label_count: usize, mut datasets: Vec<Dataset>) -> Dataset {
        let chosen = match datasets.len() {
            1 => datasets.pop(),
            _ => datasets
                .iter()
                .position(|d| PREFERRED_SEGMENT_SERIES.is_match(&d.label))
                .map(|idx| datasets.swap_remove(idx)),
        };
        let (label, data, background) = match chosen {
            Some(dataset) => (dataset.label, dataset.data, Some(dataset.background_color)),
            None => {
                debug!(
                    datasets = datasets.len(),
                    "Summing datasets into a single segment total"
                );
                let sums: Vec<Option<f64>> = (0..label_count)
                    .map(|i| {
                        Some(
                            datasets
                                .iter()
                                .filter_map(|d| d.data.get(i).copied().flatten())
                                .sum::<f64>(),
                        )
                    })
                    .collect();
                ("Total".to_string(), sums, None)
            }
        };
        let colors = match background {
            Some(ColorSpec::PerSegment(colors)) if colors.len() == label_count => colors,
            _ => self.palette.segment_colors(label_count),
        };
        let data = data.into_iter().map(|v| Some(v.unwrap_or(0.0))).collect();
        Dataset::new(
            label,
            data,
            ColorSpec::PerSegment(colors.clone()),
            ColorSpec::PerSegment(colors),
            None,
        )
    }
}
fn axis_labels(records: &[Record], field: Option<&str>) -> Vec<String> {
    match field {
        Some(field) => records
            .iter()
            .map(|r| r.get(field).map(Scalar::to_label).unwrap_or_default())
            .collect(),
        None => (0..records.len()).map(|i| i.to_string()).collect(),
    }
}
fn first_present<'a>(record: &'a Record, fields: &[String]) -> Option<&'a Scalar> {
    fields
        .iter()
        .filter_map(|f| record.get(f))
        .find(|v| coerce_value(v).is_some())
}
