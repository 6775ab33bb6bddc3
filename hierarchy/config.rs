use crate::layer::LayerPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

// --- Public Data Structures ---
// The run configuration is read from and written to a small TOML file.

/// Settings for one hierarchical evaluation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyConfig {
    /// Number of ancestor layers to build, counted from the finest.
    pub max_layer: usize,
    /// Drop ancestors that do not branch below them and zero self-representing edges.
    #[serde(default = "default_true")]
    pub suppress_duplicates: bool,
    /// Put the leaf filter in front of the ancestor layers.
    #[serde(default = "default_true")]
    pub prepend_leaf_filter: bool,
    /// Index of the last stacked layer included in the combined matrices.
    /// Defaults to the last layer built.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_depth: Option<usize>,
}

fn default_true() -> bool {
    true
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            max_layer: 1,
            suppress_duplicates: true,
            prepend_leaf_filter: true,
            eval_depth: None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read or write config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML config file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("Evaluation depth {eval_depth} exceeds the {stacked} stacked layers of this config.")]
    DepthOutOfRange { eval_depth: usize, stacked: usize },
}

impl HierarchyConfig {
    pub fn policy(&self) -> LayerPolicy {
        LayerPolicy::new(self.max_layer, self.suppress_duplicates)
    }

    /// Number of layers the aggregator produces under this config.
    pub fn stacked_layers(&self) -> usize {
        self.max_layer + usize::from(self.prepend_leaf_filter)
    }

    /// The inclusive depth handed to the projector.
    pub fn resolved_eval_depth(&self) -> Result<usize, ConfigError> {
        let stacked = self.stacked_layers();
        match self.eval_depth {
            Some(eval_depth) if eval_depth < stacked => Ok(eval_depth),
            Some(eval_depth) => Err(ConfigError::DepthOutOfRange {
                eval_depth,
                stacked,
            }),
            None if stacked > 0 => Ok(stacked - 1),
            None => Err(ConfigError::DepthOutOfRange {
                eval_depth: 0,
                stacked,
            }),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self)?;
        let mut writer = BufWriter::new(fs::File::create(path)?);
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}
