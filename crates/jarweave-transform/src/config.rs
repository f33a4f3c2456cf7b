//! Pipeline configuration (jarweave.toml)

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// Packages the class loader must never intercept
///
/// These are the transformation machinery's own packages; loading them
/// through the transforming loader would let transformers rewrite the code
/// that runs them.
pub const BOOTSTRAP_LOAD_EXCLUSIONS: &[&str] = &[
    "org.spongepowered.asm.service.",
    "org.spongepowered.asm.launch.",
    "org.spongepowered.asm.logging.",
    "org.objectweb.asm.",
    "org.spongepowered.asm.lib.",
    "org.spongepowered.asm.mixin.",
    "org.spongepowered.asm.util.",
];

/// Pipeline configuration
///
/// ```toml
/// reentrance_depth = 1
/// compute_maxs = true
/// load_exclusions = ["org.objectweb.asm."]
/// transform_exclusions = ["com.example.generated."]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Nesting depth the re-entrance guard tolerates before flagging a transformer
    pub reentrance_depth: usize,

    /// Recompute method local-slot hints when re-encoding classes
    pub compute_maxs: bool,

    /// Class-name prefixes the class loader must not intercept
    pub load_exclusions: Vec<String>,

    /// Class-name and transformer-name prefixes exempt from transformation
    pub transform_exclusions: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reentrance_depth: 1,
            compute_maxs: true,
            load_exclusions: BOOTSTRAP_LOAD_EXCLUSIONS
                .iter()
                .map(|prefix| prefix.to_string())
                .collect(),
            transform_exclusions: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse a configuration from a string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reentrance_depth == 0 {
            return Err(ConfigError::ValidationError(
                "reentrance_depth must be at least 1".to_string(),
            ));
        }

        let prefixes = self.load_exclusions.iter().chain(&self.transform_exclusions);
        for prefix in prefixes {
            if prefix.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "Exclusion prefixes cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}
