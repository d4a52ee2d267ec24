//! Layered configuration.
//!
//! `defaults/pyrecover.default.toml` is embedded into the crate; callers
//! layer files and single-key overrides on top through [`Loader`] before
//! deserializing into [`Config`].

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/pyrecover.default.toml");

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    pub output: OutputConfig,
    pub limits: LimitsConfig,
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OutputConfig {
    /// One level of indentation.
    pub indent: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LimitsConfig {
    /// Deepest syntax tree parsed or generated, counted across nested scopes.
    pub max_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiagnosticsConfig {
    pub color: bool,
}

impl Config {
    /// The embedded defaults.
    pub fn load_defaults() -> Result<Self, ConfigError> {
        Loader::new().build()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: OutputConfig {
                indent: " ".repeat(4),
            },
            limits: LimitsConfig { max_depth: 100 },
            diagnostics: DiagnosticsConfig { color: true },
        }
    }
}

/// Layers user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    pub fn new() -> Self {
        let builder = config::Config::builder()
            .add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. A missing file is an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer a configuration file if it exists.
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Override a single key, e.g. from a command-line flag.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}
