//! Pipeline configuration files.
//!
//! A [`PipelineConfig`] describes the whole pipeline: key wiring, error
//! policy, the node list and optionally the data source. Files are read and
//! written as TOML or JSON, chosen by extension.
//!
//! # Example
//!
//! ```toml
//! input_key = "raw"
//! output_keys = ["raw_norm", "rms"]
//! error_policy = "continue"
//!
//! [source]
//! type = "sine"
//! frequency = 5.0
//! sample_rate = 200.0
//!
//! [[nodes]]
//! type = "normalize"
//! input = "raw"
//!
//! [[nodes]]
//! type = "chunk_rms"
//! input = "raw"
//! output = "rms"
//! chunk_seconds = 0.1
//! ```

use crate::error::{BlockflowError, Result, ResultExt};
use crate::pipeline::{ErrorPolicy, NodeSpec, PipelineBuilder, DEFAULT_INPUT_KEY};
use crate::source::{BlockSource, JsonLinesSource, SineConfig, SineSource, StreamDataLoader};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-disk format, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Ok(ConfigFormat::Toml),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(ConfigFormat::Json),
            _ => Err(BlockflowError::Config(format!(
                "Unsupported config file extension {:?} (expected .toml or .json)",
                path
            ))),
        }
    }
}

// ==================== Source ====================

/// Data source section of a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Synthetic sine wave
    Sine(SineConfig),
    /// One JSON raw sample per line
    JsonLines { path: PathBuf },
}

impl SourceConfig {
    /// Open the source behind the default collation.
    pub fn open(&self) -> Box<dyn BlockSource> {
        match self {
            SourceConfig::Sine(cfg) => Box::new(StreamDataLoader::new(SineSource::new(cfg.clone()))),
            SourceConfig::JsonLines { path } => {
                Box::new(StreamDataLoader::new(JsonLinesSource::new(path)))
            }
        }
    }
}

// ==================== Pipeline ====================

/// Complete pipeline description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Key each source block is seeded under
    pub input_key: String,

    /// Keys returned per block; `None` returns everything produced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_keys: Option<Vec<String>>,

    pub error_policy: ErrorPolicy,

    /// Upper bound on results for a run; `None` runs to end of stream
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_blocks: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceConfig>,

    pub nodes: Vec<NodeSpec>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_key: DEFAULT_INPUT_KEY.to_string(),
            output_keys: None,
            error_policy: ErrorPolicy::default(),
            max_blocks: None,
            source: None,
            nodes: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Load a config file, picking the format from its extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| {
            BlockflowError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config = match format {
            ConfigFormat::Toml => Self::from_toml_str(&content),
            ConfigFormat::Json => Self::from_json_str(&content),
        }
        .with_context(|| format!("Failed to parse config file {:?}", path))?;

        tracing::info!(
            "Loaded pipeline config from {:?} ({} nodes)",
            path,
            config.nodes.len()
        );
        Ok(config)
    }

    /// Save the config, picking the format from the extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => self.to_toml_string()?,
            ConfigFormat::Json => self.to_json_string()?,
        };

        std::fs::write(path, content).map_err(|e| {
            BlockflowError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| BlockflowError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| BlockflowError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| BlockflowError::Serialization(e.to_string()))
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| BlockflowError::Serialization(e.to_string()))
    }

    /// Checks that do not need the nodes built.
    pub fn validate(&self) -> Result<()> {
        if self.input_key.trim().is_empty() {
            return Err(BlockflowError::Config("input_key must not be empty".to_string()));
        }
        if let Some(SourceConfig::Sine(sine)) = &self.source {
            if !(sine.sample_rate.is_finite() && sine.sample_rate > 0.0) {
                return Err(BlockflowError::Config(format!(
                    "sine source sample_rate must be positive, got {}",
                    sine.sample_rate
                )));
            }
            if sine.block_size == 0 {
                return Err(BlockflowError::Config(
                    "sine source block_size must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Build every node and return a builder ready for a source.
    pub fn builder(&self) -> Result<PipelineBuilder> {
        let mut builder = PipelineBuilder::new()
            .input_key(self.input_key.clone())
            .error_policy(self.error_policy);
        if let Some(keys) = &self.output_keys {
            builder = builder.output_keys(keys.iter().cloned());
        }

        for (idx, spec) in self.nodes.iter().enumerate() {
            let node = spec
                .build()
                .with_context(|| format!("node #{} ({})", idx, spec.kind()))?;
            builder = builder.add_node(node);
        }
        Ok(builder)
    }
}
