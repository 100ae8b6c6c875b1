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

//! Contracts for the services that feed the pipeline. Implementations live
//! with the orchestrator; timeouts and cancellation stay there too.

use crate::error::CollaboratorError;
use crate::intent::ChartRequest;
use crate::repair::RepairOutcome;
use crate::series::SeriesPayload;
use crate::ChartPipeline;
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchQuery {
    /// The entity the records belong to; also names its merged series.
    pub entity: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}
impl FetchQuery {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            parameters: Map::new(),
        }
    }
    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }
}
#[async_trait]
pub trait DataFetcher: Send + Sync {
    async fn fetch(&self, query: &FetchQuery) -> Result<Value, CollaboratorError>;
}
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// May return a complete or a truncated document.
    async fn generate(&self, prompt: &str) -> Result<String, CollaboratorError>;
}
/// Issues every fetch concurrently and merges what comes back once all of
/// them have settled. Failed fetches and unchartable results are skipped.
/// With more than one query, dataset labels are prefixed by entity.
pub async fn fetch_and_merge(
    pipeline: &ChartPipeline,
    fetcher: &dyn DataFetcher,
    queries: &[FetchQuery],
    request: &ChartRequest,
) -> Option<SeriesPayload> {
    let results = join_all(queries.iter().map(|q| fetcher.fetch(q))).await;
    let mut sources = Vec::with_capacity(results.len());
    for (query, result) in queries.iter().zip(results) {
        let value = match result {
            Ok(value) => value,
            Err(e) => {
                warn!(entity = %query.entity, error = %e, "Fetch failed; merging without it");
                continue;
            }
        };
        let outcome = pipeline.build_value(&value, request);
        if let Some(degradation) = &outcome.degradation {
            info!(
                entity = %query.entity,
                code = degradation.code(),
                "Skipping source without chartable data"
            );
            continue;
        }
        sources.push(if queries.len() > 1 {
            outcome.payload.with_dataset_prefix(&query.entity)
        } else {
            outcome.payload
        });
    }
    pipeline.merge(&sources)
}
/// Runs the generator and passes its document through the repair chain.
pub async fn generate_and_repair(
    pipeline: &ChartPipeline,
    generator: &dyn TextGenerator,
    prompt: &str,
) -> Result<RepairOutcome, CollaboratorError> {
    let document = generator.generate(prompt).await?;
    Ok(pipeline.repair(&document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Canned;

    #[async_trait]
    impl DataFetcher for Canned {
        async fn fetch(&self, query: &FetchQuery) -> Result<Value, CollaboratorError> {
            match query.entity.as_str() {
                "alpha" => Ok(json!([{"month": "Jan", "hours": 10}, {"month": "Feb", "hours": 20}])),
                "empty" => Ok(json!({"result": []})),
                other => Err(CollaboratorError::Fetch {
                    query: other.to_string(),
                    reason: "unavailable".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn failed_and_empty_sources_are_skipped() {
        let pipeline = ChartPipeline::new().unwrap();
        let queries = [FetchQuery::new("alpha"), FetchQuery::new("down"), FetchQuery::new("empty")];
        let merged = fetch_and_merge(&pipeline, &Canned, &queries, &ChartRequest::default())
            .await
            .unwrap();
        assert_eq!(merged.labels(), &["Jan", "Feb"]);
        assert_eq!(merged.datasets().len(), 1);
        assert_eq!(merged.datasets()[0].label(), "alpha: hours");
    }

    struct Truncating;

    #[async_trait]
    impl TextGenerator for Truncating {
        async fn generate(&self, prompt: &str) -> Result<String, CollaboratorError> {
            if prompt.is_empty() {
                return Err(CollaboratorError::Generation {
                    reason: "empty prompt".to_string(),
                });
            }
            Ok("<html><head><title>Spend</title></head><body><script>var rows = [{segment: 'Ops', amount: 5}, {segment: 'R&D', amount: 7}];".to_string())
        }
    }

    #[tokio::test]
    async fn generated_documents_are_repaired() {
        let pipeline = ChartPipeline::new().unwrap();
        let outcome = generate_and_repair(&pipeline, &Truncating, "chart spend")
            .await
            .unwrap();
        assert!(outcome.is_repaired());
        assert!(outcome.document().contains("<title>Spend</title>"));
        assert!(generate_and_repair(&pipeline, &Truncating, "").await.is_err());
    }

    #[tokio::test]
    async fn all_failures_merge_to_nothing() {
        let pipeline = ChartPipeline::new().unwrap();
        let queries = [FetchQuery::new("down")];
        assert!(fetch_and_merge(&pipeline, &Canned, &queries, &ChartRequest::default())
            .await
            .is_none());
    }
}
