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

use autochart::render::{extract_island, CONFIG_ISLAND_ID, DATA_ISLAND_ID};
use autochart::repair::{Extracted, ExtractionStrategy, RepairChain, RepairOutcome};
use autochart::{ChartPipeline, Record, Scalar, SeriesPayload};
use serde_json::Value;

fn payload_of(document: &str) -> SeriesPayload {
    serde_json::from_str(extract_island(document, DATA_ISLAND_ID).unwrap()).unwrap()
}

fn chart_type_of(document: &str) -> String {
    let island = extract_island(document, CONFIG_ISLAND_ID).unwrap();
    let config: Value = serde_json::from_str(island).unwrap();
    config["chartType"].as_str().unwrap().to_string()
}

#[test]
fn truncated_script_is_rebuilt_from_its_records() {
    let broken = r#"<!DOCTYPE html>
<html><head><title>Team &amp; Hours</title></head>
<body><canvas id="hours"></canvas>
<script>
  let rows = [
    {week: "2025-01-06", hours: 12,},
    {week: "2025-01-13", hours: "9.5"},
  ];
  const ctx = document.getElementById('hours').getCon"#;
    let pipeline = ChartPipeline::new().unwrap();
    let outcome = pipeline.repair(broken);
    let (document, strategy) = match outcome {
        RepairOutcome::Repaired { document, strategy } => (document, strategy),
        other => panic!("expected a repaired document, got {other:?}"),
    };
    assert_eq!(strategy, "record_array_assignment");
    assert!(document.contains("<title>Team &amp; Hours</title>"));
    let payload = payload_of(&document);
    assert_eq!(payload.labels(), &["2025-01-06", "2025-01-13"]);
    assert_eq!(payload.datasets()[0].data(), &[Some(12.0), Some(9.5)]);
    assert_eq!(chart_type_of(&document), "line");

    // A rebuilt document is complete and passes through untouched.
    assert_eq!(pipeline.repair(&document), RepairOutcome::Intact(document.clone()));
}

#[test]
fn unchartable_records_fall_through_to_stat_fragments() {
    let broken = r#"<html><body>
<div class="stat"><span class="stat-label">Planned &amp; spent</span><span class="stat-value">$1,234</span></div>
<div class="stat"><span class="stat-label">Open</span><span class="stat-value">n/a</span></div>
<div class="stat"><span class="stat-label">Closed</span><span class="stat-value">17</span></div>
<script>const notes = [{note: 'pending'}];"#;
    let outcome = ChartPipeline::new().unwrap().repair(broken);
    let (document, strategy) = match outcome {
        RepairOutcome::Repaired { document, strategy } => (document, strategy),
        other => panic!("expected a repaired document, got {other:?}"),
    };
    assert_eq!(strategy, "stat_fragments");
    assert!(document.contains("<title>Repaired Chart</title>"));
    assert_eq!(chart_type_of(&document), "bar");
    let payload = payload_of(&document);
    assert_eq!(payload.labels(), &["Planned & spent", "Closed"]);
    assert_eq!(payload.datasets()[0].label(), "Value");
    assert_eq!(payload.datasets()[0].data(), &[Some(1234.0), Some(17.0)]);
}

#[test]
fn documents_without_data_come_back_unchanged() {
    let broken = "<html><body><h1>Hours</h1><canvas id=\"c\"></canvas>";
    let outcome = ChartPipeline::new().unwrap().repair(broken);
    assert!(!outcome.is_repaired());
    assert_eq!(outcome.document(), broken);
    let err = outcome.into_result().unwrap_err();
    assert_eq!(err.code(), "repair_unrecoverable");
}

#[test]
fn prose_answers_are_not_chart_pages() {
    let answer = "Hours rose from 12 to 18 between January and March.";
    assert_eq!(
        ChartPipeline::new().unwrap().repair(answer),
        RepairOutcome::Intact(answer.to_string())
    );
}

struct FixedRecords;

impl ExtractionStrategy for FixedRecords {
    fn name(&self) -> &'static str {
        "fixed_records"
    }
    fn extract(&self, _document: &str) -> Option<Extracted> {
        let record: Record = [
            ("segment".to_string(), Scalar::from("A")),
            ("amount".to_string(), Scalar::Number(3.0)),
        ]
        .into_iter()
        .collect();
        Some(Extracted::Records(vec![record]))
    }
}

#[test]
fn custom_strategies_can_replace_the_default_chain() {
    let chain = RepairChain::empty().with_strategy(Box::new(FixedRecords));
    assert_eq!(chain.strategy_names(), vec!["fixed_records"]);
    let pipeline = ChartPipeline::new().unwrap().with_repair_chain(chain);
    let outcome = pipeline.repair("<html><body><svg></svg>");
    assert!(outcome.is_repaired());
    let document = outcome.into_document();
    assert_eq!(chart_type_of(&document), "pie");
    assert_eq!(payload_of(&document).labels(), &["A"]);
}
