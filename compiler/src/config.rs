//! Build configuration
//!
//! Loaded from a TOML file; every key is optional.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read build config {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse build config")]
    Parse(#[from] toml::de::Error),
}

/// Settings for one [`ShaderSetBuilder`](crate::ShaderSetBuilder) run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Container file to write
    /// Default: output.shadercache
    pub output: PathBuf,

    /// Store each shader's source text in the container.
    /// Default: false
    pub embed_source: bool,

    /// Compile shaders and variant groups on the rayon thread pool.
    /// Default: true
    pub parallel: bool,

    /// Add the generated GLSL as an info diagnostic when a stage fails to compile.
    /// Default: false
    pub output_generated_source_on_error: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("output.shadercache"),
            embed_source: false,
            parallel: true,
            output_generated_source_on_error: false,
        }
    }
}

impl BuildConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }
}
