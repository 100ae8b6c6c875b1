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

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use autochart::{
    fetch_and_merge, ChartPipeline, ChartRequest, ChartType, CollaboratorError, DataFetcher,
    FetchQuery, PipelineConfig, RenderModel, Renderer, RepairOutcome, RequestIntent,
};
use clap::Parser;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug, Clone)]
#[command(name = "autochart-demo")]
#[command(
    about = "Render an interactive chart document from JSON records, or repair a truncated one."
)]
struct Cli {
    /// Input files. Reads stdin when none are given; several files are merged.
    inputs: Vec<PathBuf>,
    /// Chart type directive: line, bar, pie, doughnut or donut.
    #[arg(long)]
    chart_type: Option<String>,
    /// The original request wording, used for cumulative and pie hints.
    #[arg(long)]
    request: Option<String>,
    #[arg(long, default_value = "Chart")]
    title: String,
    /// Write the document here instead of stdout.
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// YAML pipeline configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Treat the input as a generated HTML document and repair it.
    #[arg(long, default_value_t = false)]
    repair: bool,
    #[arg(long, default_value_t = false)]
    debug: bool,
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {}", path.display())),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            Ok(buffer)
        }
    }
}

fn write_output(path: Option<&Path>, document: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, document)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), bytes = document.len(), "Wrote chart document");
        }
        None => print!("{document}"),
    }
    Ok(())
}

fn parse_json(text: &str, origin: &str) -> Result<Value> {
    serde_json::from_str(text).with_context(|| format!("{origin} is not valid JSON"))
}

fn run_repair(pipeline: &ChartPipeline, cli: &Cli) -> Result<()> {
    let document = read_input(cli.inputs.first().map(PathBuf::as_path))?;
    let outcome = pipeline.repair(&document);
    match &outcome {
        RepairOutcome::Intact(_) => info!("Document does not need repair"),
        RepairOutcome::Repaired { strategy, .. } => info!(strategy = %strategy, "Document repaired"),
        RepairOutcome::Unrecoverable { reason, .. } => {
            warn!(reason = %reason, "Document left unchanged");
        }
    }
    write_output(cli.output.as_deref(), outcome.document())?;
    outcome
        .into_result()
        .map(|_| ())
        .context("Repair did not recover any chart data")
}

/// Reads each query's `path` parameter as a JSON document.
struct FileFetcher;

#[async_trait]
impl DataFetcher for FileFetcher {
    async fn fetch(&self, query: &FetchQuery) -> Result<Value, CollaboratorError> {
        let failure = |reason: String| CollaboratorError::Fetch {
            query: query.entity.clone(),
            reason,
        };
        let path = query
            .parameters
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| failure("missing path parameter".to_string()))?;
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| failure(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| failure(e.to_string()))
    }
}

async fn run_render(pipeline: &ChartPipeline, cli: &Cli, request: &ChartRequest) -> Result<()> {
    if cli.inputs.len() <= 1 {
        let text = read_input(cli.inputs.first().map(PathBuf::as_path))?;
        let value = parse_json(&text, "Input")?;
        let chart = pipeline.render_value(&value, request, &cli.title)?;
        if let Some(degradation) = &chart.degradation {
            warn!(code = degradation.code(), "Rendered placeholder chart: {degradation}");
        }
        return write_output(cli.output.as_deref(), &chart.document);
    }
    let queries: Vec<FetchQuery> = cli
        .inputs
        .iter()
        .map(|path| {
            let entity = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            FetchQuery::new(entity)
                .with_parameter("path", Value::String(path.display().to_string()))
        })
        .collect();
    let Some(merged) = fetch_and_merge(pipeline, &FileFetcher, &queries, request).await else {
        bail!("None of the {} inputs produced chartable data", queries.len());
    };
    let chart_type = RequestIntent::from_request(request)
        .directive
        .filter(|t| !t.is_radial())
        .unwrap_or(ChartType::Line);
    let renderer = Renderer::with_config(pipeline.config().render.clone());
    let document = renderer.render(&RenderModel {
        title: &cli.title,
        payload: &merged,
        chart_type,
    })?;
    write_output(cli.output.as_deref(), &document)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => PipelineConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    let pipeline = ChartPipeline::with_config(config)?;
    let request = ChartRequest {
        directive: cli.chart_type.clone(),
        request_text: cli.request.clone(),
    };
    if cli.repair {
        run_repair(&pipeline, &cli)
    } else {
        run_render(&pipeline, &cli, &request).await
    }
}
