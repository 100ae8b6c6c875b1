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

pub mod assets;
pub mod axis;

pub use axis::{nearest_position, TooltipAxis};

use crate::chart_matcher::ChartType;
use crate::error::{ConfigError, ConfigResult, Result};
use crate::series::SeriesPayload;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DATA_ISLAND_ID: &str = "chart-data";
pub const CONFIG_ISLAND_ID: &str = "chart-config";

static ISLAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<script[^>]*\bid\s*=\s*["']([\w-]+)["'][^>]*>(.*?)</script>"#).unwrap()
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub library_url: String,
    pub chart_height_px: u32,
    pub footer: Option<String>,
    /// Repeat the payload in a collapsible block under the chart.
    pub debug_block: bool,
}
impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            library_url: "https://cdn.jsdelivr.net/npm/chart.js@4.4.0/dist/chart.umd.min.js"
                .to_string(),
            chart_height_px: 520,
            footer: Some("Generated from upstream data".to_string()),
            debug_block: true,
        }
    }
}
impl RenderConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.library_url.trim().is_empty() {
            return Err(ConfigError::InvalidField {
                field: "render.library_url".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if !(120..=2000).contains(&self.chart_height_px) {
            return Err(ConfigError::InvalidField {
                field: "render.chart_height_px".to_string(),
                reason: format!("{} is outside 120..=2000", self.chart_height_px),
            });
        }
        Ok(())
    }
}
/// Everything a document is rendered from.
#[derive(Debug, Clone, Copy)]
pub struct RenderModel<'a> {
    pub title: &'a str,
    pub payload: &'a SeriesPayload,
    pub chart_type: ChartType,
}
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChartConfigIsland<'a> {
    chart_type: ChartType,
    title: &'a str,
    axis: TooltipAxis,
}
/// Serialises to JSON safe to place inside a `<script>` element.
pub fn embed_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    Ok(serde_json::to_string(value)?.replace('<', "\\u003c"))
}
/// Text content of the `<script>` element with the given id.
pub fn extract_island<'d>(document: &'d str, id: &str) -> Option<&'d str> {
    ISLAND
        .captures_iter(document)
        .find(|c| c.get(1).is_some_and(|m| m.as_str() == id))
        .and_then(|c| c.get(2))
        .map(|m| m.as_str().trim())
}
#[derive(Default)]
pub struct Renderer {
    config: RenderConfig,
}
impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_config(config: RenderConfig) -> Self {
        Self { config }
    }
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }
    pub fn render(&self, model: &RenderModel<'_>) -> Result<String> {
        let data_island = embed_json(model.payload)?;
        let config_island = embed_json(&ChartConfigIsland {
            chart_type: model.chart_type,
            title: model.title,
            axis: TooltipAxis::from_labels(model.payload.labels()),
        })?;
        let title = htmlize::escape_text(model.title);
        let library_url = htmlize::escape_attribute(self.config.library_url.as_str());
        let footer = self
            .config
            .footer
            .as_deref()
            .map(|f| format!("<div class=\"info\">{}</div>\n", htmlize::escape_text(f)))
            .unwrap_or_default();
        let debug_block = if self.config.debug_block {
            let pretty = serde_json::to_string_pretty(model.payload)?;
            format!(
                "<details><summary>Chart data</summary><pre>{}</pre></details>\n",
                htmlize::escape_text(pretty.as_str())
            )
        } else {
            String::new()
        };
        let document = format!(
            r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>{title}</title>
<script src="{library_url}"></script>
<style>{style}</style>
</head>
<body>
<div class="container">
<h2>{title}</h2>
<div class="chart-wrap" style="height:{height}px">
<canvas id="chart-canvas"></canvas>
</div>
<div class="legend-box"><div id="chart-legend" class="legend-custom"></div></div>
{footer}{debug_block}</div>
<script id="{data_id}" type="application/json">{data_island}</script>
<script id="{config_id}" type="application/json">{config_island}</script>
<script>{script}</script>
</body>
</html>
"#,
            style = assets::STYLE,
            script = assets::SCRIPT,
            height = self.config.chart_height_px,
            data_id = DATA_ISLAND_ID,
            config_id = CONFIG_ISLAND_ID,
        );
        debug!(
            chart_type = %model.chart_type,
            bytes = document.len(),
            "Rendered chart document"
        );
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{ColorSpec, Dataset};

    fn payload(labels: &[&str]) -> SeriesPayload {
        let color = ColorSpec::Single("#1f77b4".into());
        SeriesPayload::new(
            labels.iter().map(|l| l.to_string()).collect(),
            vec![Dataset::new(
                "hours",
                labels.iter().map(|_| Some(1.0)).collect(),
                color.clone(),
                color,
                Some(false),
            )],
        )
        .unwrap()
    }

    #[test]
    fn islands_round_trip_and_cannot_close_their_script() {
        let payload = payload(&["</script><b>", "Feb"]);
        let html = Renderer::new()
            .render(&RenderModel {
                title: "Hours",
                payload: &payload,
                chart_type: ChartType::Line,
            })
            .unwrap();
        assert!(!html.contains("</script><b>"));
        let island = extract_island(&html, DATA_ISLAND_ID).unwrap();
        let parsed: SeriesPayload = serde_json::from_str(island).unwrap();
        assert_eq!(parsed, payload);
    }

    #[test]
    fn title_is_escaped() {
        let payload = payload(&["a"]);
        let html = Renderer::new()
            .render(&RenderModel {
                title: "Q1 <Costs> & more",
                payload: &payload,
                chart_type: ChartType::Bar,
            })
            .unwrap();
        assert!(html.contains("<title>Q1 &lt;Costs&gt; &amp; more</title>"));
    }

    #[test]
    fn config_island_carries_type_and_axis() {
        let payload = payload(&["2025-01-01", "2025-02-01"]);
        let html = Renderer::new()
            .render(&RenderModel {
                title: "t",
                payload: &payload,
                chart_type: ChartType::Line,
            })
            .unwrap();
        let config: serde_json::Value =
            serde_json::from_str(extract_island(&html, CONFIG_ISLAND_ID).unwrap()).unwrap();
        assert_eq!(config["chartType"], "line");
        assert_eq!(config["axis"]["kind"], "time");
        assert_eq!(config["axis"]["positions"][0], 1_735_689_600_000_i64);
    }

    #[test]
    fn document_carries_error_banner_and_library() {
        let payload = payload(&["a"]);
        let html = Renderer::new()
            .render(&RenderModel {
                title: "t",
                payload: &payload,
                chart_type: ChartType::Doughnut,
            })
            .unwrap();
        assert!(html.contains("chart.js@4.4.0"));
        assert!(html.contains("chart-error"));
        assert!(html.contains("<details>"));
    }

    #[test]
    fn chart_height_is_bounded() {
        let config = RenderConfig {
            chart_height_px: 10,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
