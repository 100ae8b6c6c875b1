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

use crate::chart_matcher::ChartType;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

static RADIAL_MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(pie|donut|doughnut)\b").unwrap());
static CUMULATIVE_MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bcumul(?:ative)?\b|\brunning[\s_-]?totals?\b").unwrap());

/// What the orchestrator hands over alongside a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartRequest {
    /// Chart-type token such as `bar` or `donut`.
    pub directive: Option<String>,
    /// The user's original wording.
    pub request_text: Option<String>,
}
impl ChartRequest {
    pub fn with_directive(directive: impl Into<String>) -> Self {
        Self {
            directive: Some(directive.into()),
            request_text: None,
        }
    }
    pub fn with_text(request_text: impl Into<String>) -> Self {
        Self {
            directive: None,
            request_text: Some(request_text.into()),
        }
    }
}
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestIntent {
    pub directive: Option<ChartType>,
    pub include_cumulative: bool,
}
impl RequestIntent {
    /// A recognised directive token wins. Otherwise a request mentioning
    /// pie, donut or doughnut as a word selects the matching radial chart.
    pub fn from_request(request: &ChartRequest) -> Self {
        let text = request.request_text.as_deref().unwrap_or_default();
        let explicit = request.directive.as_deref().and_then(ChartType::parse_directive);
        if explicit.is_none() {
            if let Some(token) = request.directive.as_deref() {
                debug!(token, "Ignoring unrecognised chart directive");
            }
        }
        let directive = explicit.or_else(|| {
            RADIAL_MENTION
                .find_iter(text)
                .map(|m| m.as_str().to_lowercase())
                .find(|m| m != "pie")
                .map(|_| ChartType::Doughnut)
                .or_else(|| RADIAL_MENTION.is_match(text).then_some(ChartType::Pie))
        });
        Self {
            directive,
            include_cumulative: CUMULATIVE_MENTION.is_match(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_directive_wins_over_text() {
        let intent = RequestIntent::from_request(&ChartRequest {
            directive: Some("bar".into()),
            request_text: Some("show a pie of hours".into()),
        });
        assert_eq!(intent.directive, Some(ChartType::Bar));
    }

    #[test]
    fn request_text_selects_radial_charts() {
        let pie = RequestIntent::from_request(&ChartRequest::with_text("A PIE chart please"));
        assert_eq!(pie.directive, Some(ChartType::Pie));
        let donut = RequestIntent::from_request(&ChartRequest::with_text("pie or donut?"));
        assert_eq!(donut.directive, Some(ChartType::Doughnut));
        let none = RequestIntent::from_request(&ChartRequest::with_text("spice levels"));
        assert_eq!(none.directive, None);
    }

    #[test]
    fn unknown_directive_falls_back_to_heuristics() {
        let intent = RequestIntent::from_request(&ChartRequest::with_directive("scatter"));
        assert_eq!(intent, RequestIntent::default());
    }

    #[test]
    fn cumulative_wording_is_detected() {
        for text in ["cumulative hours", "show the running total", "Cumul by month"] {
            assert!(RequestIntent::from_request(&ChartRequest::with_text(text)).include_cumulative);
        }
        assert!(!RequestIntent::from_request(&ChartRequest::with_text("hours by month")).include_cumulative);
    }
}
