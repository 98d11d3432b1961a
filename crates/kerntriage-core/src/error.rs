//! Error types for kerntriage-core
//!
//! Parsing itself never fails: unexpected log text degrades to "no match".
//! Errors only surface while building signature tables or loading
//! configuration. Each error can describe how to fix it through
//! [`Error::remediation`].

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Result type alias using the library's Error type
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("signature table: {0}")]
    Pattern(#[from] PatternError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Problems with a signature or directive definition
#[derive(Error, Debug)]
pub enum PatternError {
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("invalid regex: {0}")]
    InvalidRegex(String),

    #[error("duplicate signature name: {0}")]
    DuplicateSignature(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("cannot read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(String),

    #[error("invalid value: {0}")]
    Invalid(String),

    #[error("cannot render config: {0}")]
    Render(String),
}

/// How to get past an error: a summary, shell commands worth running and
/// other ways out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Remediation {
    pub summary: String,
    pub commands: Vec<String>,
    pub alternatives: Vec<String>,
}

impl Remediation {
    #[must_use]
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            commands: Vec::new(),
            alternatives: Vec::new(),
        }
    }

    #[must_use]
    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.commands.push(command.into());
        self
    }

    #[must_use]
    pub fn or(mut self, alternative: impl Into<String>) -> Self {
        self.alternatives.push(alternative.into());
        self
    }
}

impl fmt::Display for Remediation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "To fix: {}", self.summary)?;
        for command in &self.commands {
            writeln!(f, "  $ {command}")?;
        }
        for alternative in &self.alternatives {
            writeln!(f, "  or: {alternative}")?;
        }
        Ok(())
    }
}

impl Error {
    #[must_use]
    pub fn remediation(&self) -> Option<Remediation> {
        match self {
            Self::Pattern(err) => Some(err.remediation()),
            Self::Config(err) => Some(err.remediation()),
            Self::Io(_) => Some(
                Remediation::new("Check that the log file exists and is readable.")
                    .or("Pass '-' to read the log from stdin."),
            ),
            Self::Json(_) => None,
        }
    }
}

impl PatternError {
    #[must_use]
    pub fn remediation(&self) -> Remediation {
        match self {
            Self::InvalidSignature(_) => {
                Remediation::new("Signature names are non-empty [a-z0-9_-] with a pattern.")
                    .command("kt signatures")
            }
            Self::InvalidRegex(_) => Remediation::new("Fix the regex so it compiles.")
                .or("Look-around and backreferences are not supported in match patterns."),
            Self::DuplicateSignature(_) => {
                Remediation::new("Rename the signature; every test name must stay unique.")
                    .command("kt signatures")
            }
        }
    }
}

impl ConfigError {
    #[must_use]
    pub fn remediation(&self) -> Remediation {
        match self {
            Self::NotFound(path) | Self::Read { path, .. } => {
                Remediation::new("Point --config (or KT_CONFIG) at a readable file.")
                    .command(format!("ls -l '{}'", path.display()))
                    .or("Drop --config to run with the builtin defaults.")
            }
            Self::Parse(_) => Remediation::new("Fix the TOML syntax.")
                .or("Start over from the defaults printed by `kt config`."),
            Self::Invalid(_) => Remediation::new("Fix the named field.")
                .or("Remove the field to fall back to its default."),
            Self::Render(_) => Remediation::new("Report this; the defaults always render."),
        }
    }
}
