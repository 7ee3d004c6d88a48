//! Configuration for the linter binary
//!
//! Reads configuration from:
//! - `.promqlinter.yaml` / `.promqlinter.yml` / `.promqlinter.json` (project-level)
//! - the same names in the home directory (user-level)
//!
//! Command-line flags are merged on top with [`Config::merge_cli`].

use crate::diagnostic::{ColorMode, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File names probed by [`Config::load_default`], in order
pub const CONFIG_FILE_NAMES: [&str; 3] = [
    ".promqlinter.yaml",
    ".promqlinter.yml",
    ".promqlinter.json",
];

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Color mode options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    /// Resolve to a concrete mode. `auto` colors only a terminal, and
    /// only when `NO_COLOR` is not set.
    pub fn resolve(self, is_terminal: bool, no_color: bool) -> ColorMode {
        match self {
            ColorChoice::Always => ColorMode::Enabled,
            ColorChoice::Never => ColorMode::Disabled,
            ColorChoice::Auto => ColorMode::from(is_terminal && !no_color),
        }
    }

    /// Resolve against the process's stdout and environment
    pub fn resolve_for_stdout(self) -> ColorMode {
        self.resolve(
            std::io::stdout().is_terminal(),
            std::env::var_os("NO_COLOR").is_some(),
        )
    }
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!("Unknown color mode: {}", s)),
        }
    }
}

/// Output settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Color mode
    pub color: ColorChoice,

    /// Debug logging
    pub verbose: bool,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Minimum severity that is reported and fails the run
    pub level_filter: Severity,

    /// Search manifest directories recursively
    pub recursive: bool,

    /// Manifest files or directories to lint instead of stdin
    pub manifests: Vec<PathBuf>,

    /// Label name -> regex pattern rejected by the `denied-labels` plugin
    pub denied_labels: BTreeMap<String, String>,

    /// Output settings
    pub output: OutputConfig,
}

impl Config {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let config: Self = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "Unknown config file format: {}",
                    ext
                )))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load_default() -> Result<Self, ConfigError> {
        // Check current directory
        for name in &CONFIG_FILE_NAMES {
            let path = PathBuf::from(name);
            if path.exists() {
                return Self::load(&path);
            }
        }

        // Check home directory
        if let Some(home) = dirs::home_dir() {
            for name in &CONFIG_FILE_NAMES {
                let path = home.join(name);
                if path.exists() {
                    return Self::load(&path);
                }
            }
        }

        Ok(Self::default())
    }

    /// Merge CLI arguments into configuration
    pub fn merge_cli(
        &mut self,
        level_filter: Option<Severity>,
        color: Option<ColorChoice>,
        verbose: Option<bool>,
        recursive: Option<bool>,
        denied_labels: Vec<(String, String)>,
        manifests: Vec<PathBuf>,
    ) {
        if let Some(filter) = level_filter {
            self.level_filter = filter;
        }
        if let Some(c) = color {
            self.output.color = c;
        }
        if let Some(v) = verbose {
            self.output.verbose = v;
        }
        if let Some(r) = recursive {
            self.recursive = r;
        }
        // Flags override file entries for the same label
        self.denied_labels.extend(denied_labels);
        if !manifests.is_empty() {
            self.manifests = manifests;
        }
    }

    /// Check values serde cannot reject on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.denied_labels.keys().any(|name| name.is_empty()) {
            return Err(ConfigError::Invalid(
                "denied label names must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Split a `name=pattern` flag at the first `=`
pub fn parse_denied_label(flag: &str) -> Result<(String, String), ConfigError> {
    match flag.split_once('=') {
        Some((name, pattern)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), pattern.to_string()))
        }
        _ => Err(ConfigError::Invalid(format!(
            "denied label must look like NAME=PATTERN, got `{}`",
            flag
        ))),
    }
}
