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

//! Domain positions of the label axis for the pointer-tracking tooltip.
//! The embedded script performs the same lookup over these positions.

use crate::calendar::parse_calendar_label;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TooltipAxis {
    /// Epoch milliseconds, strictly increasing.
    Time { positions: Vec<i64> },
    /// Ordinal positions `0..count`.
    Band { count: usize },
}
impl TooltipAxis {
    pub fn from_labels(labels: &[String]) -> Self {
        let positions: Option<Vec<i64>> = labels
            .iter()
            .map(|l| parse_calendar_label(l).and_then(|k| k.epoch_millis()))
            .collect();
        match positions {
            Some(positions)
                if !positions.is_empty() && positions.windows(2).all(|w| w[0] < w[1]) =>
            {
                TooltipAxis::Time { positions }
            }
            _ => TooltipAxis::Band {
                count: labels.len(),
            },
        }
    }
    pub fn len(&self) -> usize {
        match self {
            TooltipAxis::Time { positions } => positions.len(),
            TooltipAxis::Band { count } => *count,
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Domain positions in label order: epoch milliseconds or ordinals.
    pub fn positions(&self) -> Vec<f64> {
        match self {
            TooltipAxis::Time { positions } => positions.iter().map(|&p| p as f64).collect(),
            TooltipAxis::Band { count } => (0..*count).map(|i| i as f64).collect(),
        }
    }
    /// Index of the label nearest to a domain value. Only meaningful when the
    /// chart's x scale is laid out in the same domain; the category scale the
    /// document draws is searched by pixel offset instead, see
    /// [`nearest_position`].
    pub fn nearest_index(&self, value: f64) -> Option<usize> {
        nearest_position(&self.positions(), value)
    }
}
/// Binary search over increasing positions for the one nearest `value`.
/// Equidistant neighbours resolve to the left one. The embedded script's
/// `nearestIndex` is the same algorithm, run over the pixel offsets at
/// which the x scale draws each label.
pub fn nearest_position(positions: &[f64], value: f64) -> Option<usize> {
    let len = positions.len();
    if len == 0 || value.is_nan() {
        return None;
    }
    let idx = positions.partition_point(|&p| p < value);
    if idx == 0 {
        return Some(0);
    }
    if idx == len {
        return Some(len - 1);
    }
    let left = value - positions[idx - 1];
    let right = positions[idx] - value;
    Some(if left <= right { idx - 1 } else { idx })
}
