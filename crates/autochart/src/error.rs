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

use thiserror::Error;
#[derive(Error, Debug)]
pub enum AutochartError {
    #[error("Chart pipeline error: {0}")]
    Chart(#[from] ChartError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),
}
/// Anomalies the core pipeline can hit. All but `RepairUnrecoverable` are
/// absorbed into a renderable placeholder before they reach a caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChartError {
    #[error("Dataset is not in a recognised shape: {reason}")]
    InputShape { reason: String },
    #[error("No numeric field survived profiling ({field_count} fields inspected)")]
    FieldAmbiguity { field_count: usize },
    #[error("All {source_count} contributing series were empty")]
    MergeEmpty { source_count: usize },
    #[error("Document could not be repaired: {reason}")]
    RepairUnrecoverable { reason: String },
}
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    ConfigFileError {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse YAML configuration: {source}")]
    YamlParseError {
        #[from]
        source: serde_yaml::Error,
    },
    #[error("Invalid configuration: {field} {reason}")]
    InvalidField { field: String, reason: String },
}
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("Data fetch for '{query}' failed: {reason}")]
    Fetch { query: String, reason: String },
    #[error("Text generation failed: {reason}")]
    Generation { reason: String },
}
pub type Result<T> = std::result::Result<T, AutochartError>;
pub type ChartResult<T> = std::result::Result<T, ChartError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
impl AutochartError {
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AutochartError::Chart(
                ChartError::InputShape { .. }
                    | ChartError::FieldAmbiguity { .. }
                    | ChartError::MergeEmpty { .. }
            ) | AutochartError::Collaborator(CollaboratorError::Fetch { .. })
        )
    }
    pub fn category(&self) -> &'static str {
        match self {
            AutochartError::Chart(_) => "Chart",
            AutochartError::Config(_) => "Configuration",
            AutochartError::Collaborator(_) => "Collaborator",
            AutochartError::Io(_) => "I/O",
            AutochartError::Serialisation(_) => "Serialisation",
        }
    }
    pub fn user_message(&self) -> String {
        match self {
            AutochartError::Chart(ChartError::MergeEmpty { .. }) => {
                "None of the requested sources returned chartable numbers.".to_string()
            }
            AutochartError::Chart(ChartError::RepairUnrecoverable { .. }) => {
                "The generated chart page was incomplete and could not be repaired. It has been kept unchanged for inspection.".to_string()
            }
            AutochartError::Config(ConfigError::ConfigFileError { .. }) => {
                "Unable to load chart configuration. Please check the configuration file."
                    .to_string()
            }
            _ => self.to_string(),
        }
    }
}
impl ChartError {
    /// Stable short code used in log fields and degradation markers.
    pub fn code(&self) -> &'static str {
        match self {
            ChartError::InputShape { .. } => "input_shape",
            ChartError::FieldAmbiguity { .. } => "field_ambiguity",
            ChartError::MergeEmpty { .. } => "merge_empty",
            ChartError::RepairUnrecoverable { .. } => "repair_unrecoverable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repair_failures_are_not_recoverable() {
        let err: AutochartError = ChartError::RepairUnrecoverable {
            reason: "no data".to_string(),
        }
        .into();
        assert!(!err.is_recoverable());
        assert_eq!(err.category(), "Chart");
        assert!(err.user_message().contains("kept unchanged"));
    }

    #[test]
    fn absorbed_errors_are_recoverable() {
        let err: AutochartError = ChartError::FieldAmbiguity { field_count: 3 }.into();
        assert!(err.is_recoverable());
        assert_eq!(
            err.to_string(),
            "Chart pipeline error: No numeric field survived profiling (3 fields inspected)"
        );
    }
}
