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

use crate::calendar::parse_calendar_label;
use crate::error::{ChartError, ChartResult};
use crate::series::{ColorSpec, Dataset, Palette, SeriesPayload};
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    Chronological,
    Lexicographic,
}
/// Union of every source's labels, sorted chronologically when all of them
/// parse as calendar labels and lexicographically otherwise.
pub fn unified_axis(sources: &[SeriesPayload]) -> (Vec<String>, AxisOrder) {
    let union: IndexSet<&str> = sources
        .iter()
        .flat_map(|s| s.labels().iter().map(String::as_str))
        .collect();
    let keyed: Option<Vec<_>> = union
        .iter()
        .map(|label| parse_calendar_label(label).map(|key| (key, *label)))
        .collect();
    match keyed {
        Some(mut keyed) if !keyed.is_empty() => {
            keyed.sort();
            let labels = keyed.into_iter().map(|(_, l)| l.to_string()).collect();
            (labels, AxisOrder::Chronological)
        }
        _ => {
            let mut labels: Vec<String> = union.into_iter().map(str::to_string).collect();
            labels.sort();
            (labels, AxisOrder::Lexicographic)
        }
    }
}
#[derive(Default)]
pub struct SeriesMerger {
    palette: Palette,
}
impl SeriesMerger {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_palette(palette: Palette) -> Self {
        Self { palette }
    }
    /// Aligns every source onto the unified axis. Returns `None` when no
    /// source contributes a single value.
    pub fn merge(&self, sources: &[SeriesPayload]) -> Option<SeriesPayload> {
        match self.try_merge(sources) {
            Ok(payload) => Some(payload),
            Err(err) => {
                info!(code = err.code(), "{err}");
                None
            }
        }
    }
    pub fn try_merge(&self, sources: &[SeriesPayload]) -> ChartResult<SeriesPayload> {
        if !sources.iter().any(SeriesPayload::has_values) {
            return Err(ChartError::MergeEmpty {
                source_count: sources.len(),
            });
        }
        let (labels, order) = unified_axis(sources);
        let mut datasets = Vec::new();
        for source in sources {
            let mut positions: IndexMap<&str, usize> = IndexMap::new();
            for (idx, label) in source.labels().iter().enumerate() {
                positions.entry(label.as_str()).or_insert(idx);
            }
            for dataset in source.datasets() {
                let data = labels
                    .iter()
                    .map(|label| match positions.get(label.as_str()) {
                        Some(&idx) => dataset.data().get(idx).copied().flatten(),
                        None => Some(0.0),
                    })
                    .collect();
                let color = self.palette.color(datasets.len()).to_string();
                datasets.push(Dataset::new(
                    dataset.label(),
                    data,
                    ColorSpec::Single(color.clone()),
                    ColorSpec::Single(color),
                    dataset.fill(),
                ));
            }
        }
        debug!(
            sources = sources.len(),
            labels = labels.len(),
            datasets = datasets.len(),
            order = ?order,
            "Merged series onto unified axis"
        );
        Ok(SeriesPayload::aligned(labels, datasets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(labels: &[&str], label: &str, data: &[f64]) -> SeriesPayload {
        let color = ColorSpec::Single("#000".into());
        SeriesPayload::new(
            labels.iter().map(|l| l.to_string()).collect(),
            vec![Dataset::new(
                label,
                data.iter().copied().map(Some).collect(),
                color.clone(),
                color,
                None,
            )],
        )
        .unwrap()
    }

    #[test]
    fn month_names_sort_chronologically() {
        let (labels, order) = unified_axis(&[
            source(&["Mar", "Jan"], "a", &[1.0, 2.0]),
            source(&["Feb"], "b", &[3.0]),
        ]);
        assert_eq!(labels, vec!["Jan", "Feb", "Mar"]);
        assert_eq!(order, AxisOrder::Chronological);
    }

    #[test]
    fn mixed_labels_sort_lexicographically() {
        let (labels, order) = unified_axis(&[source(&["beta", "2025-01", "Alpha"], "a", &[1.0, 2.0, 3.0])]);
        assert_eq!(labels, vec!["2025-01", "Alpha", "beta"]);
        assert_eq!(order, AxisOrder::Lexicographic);
    }

    #[test]
    fn duplicate_label_contributes_first_value() {
        let merged = SeriesMerger::new()
            .merge(&[source(&["A", "A", "B"], "s", &[1.0, 9.0, 2.0])])
            .unwrap();
        assert_eq!(merged.labels(), &["A", "B"]);
        assert_eq!(merged.datasets()[0].data(), &[Some(1.0), Some(2.0)]);
    }

    #[test]
    fn colors_follow_merged_position() {
        let merged = SeriesMerger::new()
            .merge(&[source(&["A"], "a", &[1.0]), source(&["B"], "b", &[2.0])])
            .unwrap();
        assert_eq!(merged.datasets()[0].border_color(), &ColorSpec::Single("#1f77b4".into()));
        assert_eq!(merged.datasets()[1].border_color(), &ColorSpec::Single("#ff7f0e".into()));
    }

    #[test]
    fn sources_without_values_yield_nothing() {
        let merger = SeriesMerger::new();
        assert!(merger.merge(&[]).is_none());
        let empty = SeriesPayload::new(vec!["A".into()], Vec::new()).unwrap();
        assert_eq!(
            merger.try_merge(&[empty]).unwrap_err(),
            ChartError::MergeEmpty { source_count: 1 }
        );
    }
}
