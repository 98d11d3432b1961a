//! Run orchestration
//!
//! A [`Triage`] holds the configured parsers and decides which of them see a
//! given log. The kernel parser runs on every log; the build parser only when
//! the caller says the run has a build suite.

use serde::Serialize;
use tracing::Span;

use crate::Result;
use crate::build::BuildLogParser;
use crate::config::Config;
use crate::kernel::KernelLogParser;
use crate::results::{SuiteResults, TestRecord};

/// A log classifier producing one or more suites of named tests.
///
/// Implementations never fail on input text: unrecognised content simply
/// produces passing tests.
pub trait LogParser {
    /// Short identifier used in logs and CLI output.
    fn name(&self) -> &'static str;

    /// Classify `log`. An empty log produces no suites.
    fn parse(&self, log: &str) -> Vec<SuiteResults>;
}

/// Combined output of every parser that ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TriageReport {
    pub suites: Vec<SuiteResults>,
}

impl TriageReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }

    #[must_use]
    pub fn suite(&self, name: &str) -> Option<&SuiteResults> {
        self.suites.iter().find(|suite| suite.suite == name)
    }

    #[must_use]
    pub fn test_count(&self) -> usize {
        self.suites.iter().map(|suite| suite.tests.len()).sum()
    }

    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.suites.iter().map(SuiteResults::failure_count).sum()
    }

    /// Every test of every suite, suite order first, then test name.
    #[must_use]
    pub fn records(&self) -> Vec<TestRecord> {
        self.suites.iter().flat_map(SuiteResults::records).collect()
    }
}

/// The set of parsers applied to one CI run.
#[derive(Debug, Clone)]
pub struct Triage {
    kernel: Option<KernelLogParser>,
    build: Option<BuildLogParser>,
    span: Span,
}

impl Default for Triage {
    fn default() -> Self {
        Self::new(Some(KernelLogParser::new()), Some(BuildLogParser::new()))
    }
}

impl Triage {
    /// Wire up the given parsers. `None` disables a parser entirely.
    #[must_use]
    pub fn new(kernel: Option<KernelLogParser>, build: Option<BuildLogParser>) -> Self {
        let span = tracing::info_span!("triage");
        Self {
            kernel: kernel
                .map(|p| p.with_span(tracing::info_span!(parent: &span, "kernel_log_parser"))),
            build: build
                .map(|p| p.with_span(tracing::info_span!(parent: &span, "build_log_parser"))),
            span,
        }
    }

    /// Build every enabled parser from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let kernel = if config.kernel.enabled {
            Some(KernelLogParser::from_config(&config.kernel)?)
        } else {
            None
        };
        let build = if config.build.enabled {
            Some(BuildLogParser::from_config(&config.build)?)
        } else {
            None
        };
        Ok(Self::new(kernel, build))
    }

    #[must_use]
    pub fn kernel(&self) -> Option<&KernelLogParser> {
        self.kernel.as_ref()
    }

    #[must_use]
    pub fn build(&self) -> Option<&BuildLogParser> {
        self.build.as_ref()
    }

    /// Classify one run's log.
    ///
    /// A missing log yields an empty report. The build parser runs only when
    /// `has_build_suite` is set (see [`crate::build::has_build_suite`]).
    #[must_use]
    pub fn run(&self, log: Option<&str>, has_build_suite: bool) -> TriageReport {
        let _guard = self.span.enter();
        let Some(log) = log else {
            tracing::debug!("No log attached, skipping");
            return TriageReport::default();
        };

        let mut parsers: Vec<&dyn LogParser> = Vec::with_capacity(2);
        if let Some(kernel) = &self.kernel {
            parsers.push(kernel);
        }
        if let Some(build) = self.build.as_ref().filter(|_| has_build_suite) {
            parsers.push(build);
        }

        let suites: Vec<SuiteResults> = parsers
            .into_iter()
            .flat_map(|parser| {
                let suites = parser.parse(log);
                tracing::debug!(parser = parser.name(), suites = suites.len(), "Parser done");
                suites
            })
            .collect();

        let report = TriageReport { suites };
        tracing::info!(
            suites = report.suites.len(),
            tests = report.test_count(),
            failures = report.failure_count(),
            "Triage complete"
        );
        report
    }
}
