//! kerntriage-core: turns kernel CI logs into named test results
//!
//! A CI run produces a console log (boot plus test output) and, for build
//! jobs, a compiler log. This crate classifies both into suites of tests
//! whose names are stable across runs, so a regression shows up as a new
//! failing test rather than as a diff in a multi-megabyte log.
//!
//! # Architecture
//!
//! ```text
//! log ──► Triage ──► KernelLogParser ──► log-parser-boot / log-parser-test
//!            │
//!            └─────► BuildLogParser ───► log-parser-build-gcc / -clang
//!                        (only when the run has a build suite)
//! ```
//!
//! # Modules
//!
//! - `signatures`: Signature records and compiled, ordered tables
//! - `kernel`: Kernel message parser
//! - `build`: Build log parser (directive splitting, context stack)
//! - `naming`: Test-name derivation, slugs and fingerprints
//! - `results`: Suite and test assembly
//! - `triage`: Parser trait and run orchestration
//! - `config`: Configuration management
//! - `logging`: Subscriber setup for binaries
//! - `error`: Error types with remediation hints
//!
//! The core never reads files or touches the network; callers pass text in
//! and store the returned records themselves.
//!
//! # Safety
//!
//! This crate forbids unsafe code.

#![forbid(unsafe_code)]

pub mod build;
pub mod config;
pub mod error;
pub mod kernel;
pub mod logging;
pub mod naming;
pub mod results;
pub mod signatures;
pub mod triage;

pub use build::{BuildLogParser, CompilerFamily, CompilerSelection, has_build_suite};
pub use config::Config;
pub use error::{ConfigError, Error, PatternError, Result};
pub use kernel::KernelLogParser;
pub use results::{SuiteResults, TestEntry, TestRecord};
pub use signatures::{Signature, SignatureTable};
pub use triage::{LogParser, Triage, TriageReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
