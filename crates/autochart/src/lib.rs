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

pub mod calendar;
pub mod chart_matcher;
pub mod collaborators;
pub mod config;
pub mod data_profiler;
pub mod error;
pub mod input;
pub mod intent;
pub mod merger;
pub mod render;
pub mod repair;
pub mod series;

pub use chart_matcher::{ChartMatcher, ChartPlan, ChartType, SelectionConfig, SeriesStrategy};
pub use collaborators::{fetch_and_merge, generate_and_repair, DataFetcher, FetchQuery, TextGenerator};
pub use config::PipelineConfig;
pub use data_profiler::{DataProfiler, FieldProfile, FieldRole, ProfilingConfig, SchemaProfile};
pub use error::{AutochartError, ChartError, CollaboratorError, ConfigError, Result};
pub use input::{DatasetInput, RawPayload, Record, Scalar};
pub use intent::{ChartRequest, RequestIntent};
pub use merger::SeriesMerger;
pub use render::{RenderConfig, RenderModel, Renderer, TooltipAxis};
pub use repair::{ExtractionStrategy, RepairChain, RepairOutcome};
pub use series::{BuildOutcome, ColorSpec, Dataset, Palette, PaletteConfig, SeriesBuilder, SeriesPayload};

use repair::Extracted;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// A rendered document plus what the build decided along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedChart {
    pub document: String,
    pub chart_type: ChartType,
    pub degradation: Option<ChartError>,
}
/// Profiling, selection, building, merging, rendering and repair behind
/// one shared configuration. Every call reprocesses its inputs from scratch.
pub struct ChartPipeline {
    config: PipelineConfig,
    profiler: DataProfiler,
    matcher: ChartMatcher,
    builder: SeriesBuilder,
    merger: SeriesMerger,
    renderer: Renderer,
    repair_chain: RepairChain,
}
impl ChartPipeline {
    pub fn new() -> Result<Self> {
        Self::with_config(PipelineConfig::default())
    }
    pub fn with_config(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let palette = Palette::from_config(&config.palette);
        Ok(Self {
            profiler: DataProfiler::with_config(config.profiling.clone()),
            matcher: ChartMatcher::new(&config.selection)?,
            builder: SeriesBuilder::with_palette(palette.clone()),
            merger: SeriesMerger::with_palette(palette),
            renderer: Renderer::with_config(config.render.clone()),
            repair_chain: RepairChain::default(),
            config,
        })
    }
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_config(PipelineConfig::from_yaml_file(path)?)
    }
    pub fn with_repair_chain(mut self, repair_chain: RepairChain) -> Self {
        self.repair_chain = repair_chain;
        self
    }
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
    pub fn profile(&self, records: &[Record], request: &ChartRequest) -> SchemaProfile {
        let intent = RequestIntent::from_request(request);
        self.profiler.profile_records(records, intent.include_cumulative)
    }
    pub fn plan(&self, records: &[Record], request: &ChartRequest) -> ChartPlan {
        let intent = RequestIntent::from_request(request);
        let profile = self.profiler.profile_records(records, intent.include_cumulative);
        self.matcher.select(&profile, intent.directive)
    }
    pub fn build_records(&self, records: &[Record], request: &ChartRequest) -> BuildOutcome {
        self.builder.build(records, &self.plan(records, request))
    }
    /// Pre-built payloads skip profiling and selection; they render as a
    /// line chart unless a directive says otherwise.
    pub fn build(&self, input: &DatasetInput, request: &ChartRequest) -> BuildOutcome {
        match input {
            DatasetInput::Records(records) => self.build_records(records, request),
            DatasetInput::Payload(raw) => {
                let chart_type = RequestIntent::from_request(request)
                    .directive
                    .unwrap_or(ChartType::Line);
                self.builder.from_payload(raw, chart_type)
            }
        }
    }
    /// Unrecognised input shapes become a placeholder, never an error.
    pub fn build_value(&self, value: &Value, request: &ChartRequest) -> BuildOutcome {
        match DatasetInput::from_value(value) {
            Ok(input) => self.build(&input, request),
            Err(err) => {
                let chart_type = RequestIntent::from_request(request)
                    .directive
                    .unwrap_or(ChartType::Line);
                self.builder.placeholder(Vec::new(), chart_type, err)
            }
        }
    }
    pub fn render(&self, title: &str, outcome: &BuildOutcome) -> Result<String> {
        self.renderer.render(&RenderModel {
            title,
            payload: &outcome.payload,
            chart_type: outcome.chart_type,
        })
    }
    pub fn render_value(
        &self,
        value: &Value,
        request: &ChartRequest,
        title: &str,
    ) -> Result<RenderedChart> {
        let outcome = self.build_value(value, request);
        let document = self.render(title, &outcome)?;
        info!(
            chart_type = %outcome.chart_type,
            degraded = outcome.is_degraded(),
            "Rendered chart"
        );
        Ok(RenderedChart {
            document,
            chart_type: outcome.chart_type,
            degradation: outcome.degradation,
        })
    }
    pub fn merge(&self, sources: &[SeriesPayload]) -> Option<SeriesPayload> {
        self.merger.merge(sources)
    }
    /// Rebuilds a broken generated document from whatever data it still
    /// holds. Documents that cannot be repaired come back unchanged.
    pub fn repair(&self, document: &str) -> RepairOutcome {
        self.repair_chain.repair(document, |extracted, title| {
            let outcome = match extracted {
                Extracted::Records(records) => {
                    self.build_records(&records, &ChartRequest::default())
                }
                Extracted::Payload {
                    payload,
                    chart_type,
                } => self.builder.from_payload(&payload, chart_type),
            };
            if let Some(degradation) = &outcome.degradation {
                debug!(code = degradation.code(), "Extracted data is not chartable");
                return Err(degradation.clone());
            }
            self.render(title, &outcome)
                .map_err(|e| ChartError::RepairUnrecoverable {
                    reason: e.to_string(),
                })
        })
    }
}
