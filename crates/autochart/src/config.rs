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

use crate::chart_matcher::SelectionConfig;
use crate::data_profiler::ProfilingConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::render::RenderConfig;
use crate::series::PaletteConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Every tunable of the pipeline. Missing sections take their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub profiling: ProfilingConfig,
    pub selection: SelectionConfig,
    pub palette: PaletteConfig,
    pub render: RenderConfig,
}
impl PipelineConfig {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::ConfigFileError {
                path: path.as_ref().display().to_string(),
                source,
            })?;
        let config = Self::from_yaml_str(&content)?;
        info!(path = %path.as_ref().display(), "Loaded pipeline configuration");
        Ok(config)
    }
    pub fn from_yaml_str(yaml_content: &str) -> ConfigResult<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml_content)?;
        config.validate()?;
        Ok(config)
    }
    pub fn to_yaml_string(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
    pub fn validate(&self) -> ConfigResult<()> {
        self.profiling.validate()?;
        self.selection.validate()?;
        self.palette.validate()?;
        self.render.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = PipelineConfig::from_yaml_str("render:\n  chart_height_px: 300\n").unwrap();
        assert_eq!(config.render.chart_height_px, 300);
        assert_eq!(config.profiling, ProfilingConfig::default());
        assert_eq!(config.palette.colors.len(), 10);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = PipelineConfig::from_yaml_str("palette:\n  colors: []\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { ref field, .. } if field == "palette.colors"));
        let err = PipelineConfig::from_yaml_str("render: [1, 2]").unwrap_err();
        assert!(matches!(err, ConfigError::YamlParseError { .. }));
    }

    #[test]
    fn yaml_round_trips() {
        let config = PipelineConfig::default();
        let yaml = config.to_yaml_string().unwrap();
        assert_eq!(PipelineConfig::from_yaml_str(&yaml).unwrap(), config);
    }
}
