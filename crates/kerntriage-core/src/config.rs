//! Configuration management for kerntriage
//!
//! Handles loading and validation of `kerntriage.toml`. Every field has a
//! default, so an empty file (or no file at all) gives the builtin tables
//! with the standard suite layout.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::build::{CompilerFamily, CompilerSelection, DirectivePatterns, Directives};
use crate::error::ConfigError;
use crate::kernel::{self, BOOT_MARKER};
use crate::logging::{self, LogConfig};
use crate::signatures::{Signature, SignatureTable};

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-friendly output for interactive use
    #[default]
    Pretty,
    /// JSON lines for CI pipelines
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown log format: {s}. Expected one of: pretty, json")),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Kernel message parser settings
    #[serde(default)]
    pub kernel: KernelConfig,

    /// Build log parser settings
    #[serde(default)]
    pub build: BuildConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,

    /// Optional log file
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            log_file: None,
        }
    }
}

impl GeneralConfig {
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.log_level.clone(),
            format: self.log_format,
            file: self.log_file.clone(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_boot_marker() -> String {
    BOOT_MARKER.to_string()
}

/// Kernel message parser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Run the kernel parser
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Text separating boot output from test output
    #[serde(default = "default_boot_marker")]
    pub boot_marker: String,

    /// Also file every snippet under a `-<sha256>` test name
    #[serde(default = "default_true")]
    pub create_shas: bool,

    /// Signatures appended after the builtin kernel table
    #[serde(default)]
    pub extra_signatures: Vec<Signature>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            boot_marker: default_boot_marker(),
            create_shas: true,
            extra_signatures: Vec::new(),
        }
    }
}

/// Build log parser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Run the build parser when the run has a build suite
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Diagnostic tables to apply
    #[serde(default)]
    pub compiler: CompilerSelection,

    /// Also file every snippet under a `-<sha256>` test name
    #[serde(default)]
    pub create_shas: bool,

    /// Directive markers used to segment the log
    #[serde(default)]
    pub directives: DirectivePatterns,

    /// Signatures appended after each builtin compiler table
    #[serde(default)]
    pub extra_signatures: Vec<Signature>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            compiler: CompilerSelection::default(),
            create_shas: false,
            directives: DirectivePatterns::default(),
            extra_signatures: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()).into());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check everything that would otherwise fail when the parsers are built.
    pub fn validate(&self) -> Result<()> {
        if logging::parse_level(&self.general.log_level).is_err() {
            return Err(ConfigError::Invalid(format!(
                "general.log_level '{}' is not a log level",
                self.general.log_level
            ))
            .into());
        }

        if self.kernel.boot_marker.is_empty() {
            return Err(
                ConfigError::Invalid("kernel.boot_marker cannot be empty".to_string()).into(),
            );
        }

        validate_extra(
            "kernel",
            &kernel::builtin_signatures(),
            &self.kernel.extra_signatures,
        )?;
        for family in [CompilerFamily::Gcc, CompilerFamily::Clang] {
            validate_extra(
                "build",
                &family.builtin_signatures(),
                &self.build.extra_signatures,
            )?;
        }

        Directives::new(&self.build.directives)
            .map_err(|e| ConfigError::Invalid(format!("build.directives: {e}")))?;

        Ok(())
    }

    /// Render as TOML, e.g. to seed a config file.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Render(e.to_string()).into())
    }
}

fn validate_extra(section: &str, builtin: &[Signature], extra: &[Signature]) -> Result<()> {
    if extra.is_empty() {
        return Ok(());
    }
    SignatureTable::with_extra(builtin, extra).map_err(|e| {
        ConfigError::Invalid(format!("{section}.extra_signatures: {e}"))
    })?;
    Ok(())
}
