//! Kernel console log parser
//!
//! Splits a boot/test console log at the first login prompt, keeps only
//! kernel-timestamped lines of each half, then runs the kernel signature
//! table over them. Multiline reports (`cut here` envelopes, sanitizer
//! reports, panics) come first in the table so they claim their whole span
//! before the single-line rules see it.

use std::sync::LazyLock;

use regex::Regex;
use tracing::Span;

use crate::Result;
use crate::config::KernelConfig;
use crate::naming::NameStyle;
use crate::results::SuiteResults;
use crate::signatures::{Signature, SignatureTable, compile_multiline};
use crate::triage::LogParser;

/// Marker separating boot output from test output.
pub const BOOT_MARKER: &str = " login:";

pub const BOOT_SUITE: &str = "log-parser-boot";
pub const TEST_SUITE: &str = "log-parser-test";

/// Reports spanning several lines.
pub const MULTILINERS: &[Signature] = &[
    Signature::builtin(
        "exception",
        r"-+\[? cut here \]?-+.*?\[[\s\.\d]+\]\s+-+\[? end trace \w* \]?-+",
        Some(r"\n\[[\s\.\d][^\+\n]*"),
    ),
    Signature::builtin(
        "kasan",
        r"\[[\s\.\d]+\]\s+=+\n\[[\s\.\d]+\]\s+BUG: KASAN:.*\n*?\[[\s\.\d]+\]\s+=+",
        Some(r"BUG: KASAN:[^\+\n]*"),
    ),
    Signature::builtin(
        "kcsan",
        r"=+\n\[[\s\.\d]+\].*?BUG: KCSAN:.*?=+",
        Some(r"BUG: KCSAN:[^\+\n]*"),
    ),
    Signature::builtin(
        "kfence",
        r"\[[\s\.\d]+\]\s+=+\n\[[\s\.\d]+\]\s+BUG: KFENCE:.*\[[\s\.\d]+\]\s+=+",
        Some(r"BUG: KFENCE:[^\+\n]*"),
    ),
    Signature::builtin(
        "panic-multiline",
        r"\[[\s\.\d]+\]\s+Kernel panic - [^\n]+\n.*?-+\[? end Kernel panic - [^\n]+ \]?-*",
        Some(r"Kernel [^\+\n]*"),
    ),
    Signature::builtin(
        "internal-error-oops",
        r"\[[\s\.\d]+\]\s+Internal error: Oops.*?-+\[? end trace \w+ \]?-+",
        Some(r"Oops[^\+\n]*"),
    ),
];

/// Single-line reports.
pub const ONELINERS: &[Signature] = &[
    Signature::builtin("oops", r"^[^\n]+Oops(?: -|:).*?$", Some(r"Oops[^\+\n]*")),
    Signature::builtin(
        "fault",
        r"^[^\n]+Unhandled fault.*?$",
        Some(r"Unhandled [^\+\n]*"),
    ),
    Signature::builtin("warning", r"^[^\n]+WARNING:.*?$", Some(r"WARNING:[^\+\n]*")),
    Signature::builtin(
        "bug",
        r"^[^\n]+(?: kernel BUG at|BUG:).*?$",
        Some(r"BUG[^\+\n]*"),
    ),
    Signature::builtin(
        "invalid-opcode",
        r"^[^\n]+invalid opcode:.*?$",
        Some(r"invalid opcode:[^\+\n]*"),
    ),
    Signature::builtin(
        "panic",
        r"Kernel panic - not syncing.*?$",
        Some(r"Kernel [^\+\n]*"),
    ),
];

static KERNEL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    compile_multiline(r"(\[[ \d]+\.[ \d]+\] .*?)$").expect("kernel line regex must compile")
});

static BUILTIN_TABLE: LazyLock<SignatureTable> = LazyLock::new(|| {
    SignatureTable::new(builtin_signatures()).expect("builtin kernel signatures must compile")
});

/// The builtin kernel table in precedence order.
#[must_use]
pub fn builtin_signatures() -> Vec<Signature> {
    MULTILINERS.iter().chain(ONELINERS).cloned().collect()
}

/// Split a console log into `(boot, test)` at the first `marker`.
///
/// Without a marker the whole log is test output and boot is empty.
#[must_use]
pub fn split_boot_log<'a>(log: &'a str, marker: &str) -> (&'a str, &'a str) {
    match log.split_once(marker) {
        Some((boot, test)) => (boot, test),
        None => ("", log),
    }
}

/// Keep only kernel-timestamped lines, joined with `\n`.
#[must_use]
pub fn kernel_msgs_only(log: &str) -> String {
    KERNEL_LINE
        .find_iter(log)
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Kernel message parser producing `log-parser-boot` and `log-parser-test`.
#[derive(Debug, Clone)]
pub struct KernelLogParser {
    table: SignatureTable,
    boot_marker: String,
    create_shas: bool,
    span: Span,
}

impl Default for KernelLogParser {
    fn default() -> Self {
        Self {
            table: BUILTIN_TABLE.clone(),
            boot_marker: BOOT_MARKER.to_string(),
            create_shas: true,
            span: tracing::info_span!("kernel_log_parser"),
        }
    }
}

impl KernelLogParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a parser from configuration, appending any extra signatures
    /// after the builtin table.
    pub fn from_config(config: &KernelConfig) -> Result<Self> {
        let table = if config.extra_signatures.is_empty() {
            BUILTIN_TABLE.clone()
        } else {
            SignatureTable::with_extra(&builtin_signatures(), &config.extra_signatures)?
        };

        Ok(Self {
            table,
            boot_marker: config.boot_marker.clone(),
            create_shas: config.create_shas,
            ..Self::default()
        })
    }

    /// Emit events under `span` instead of the parser's own.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    #[must_use]
    pub fn with_shas(mut self, create_shas: bool) -> Self {
        self.create_shas = create_shas;
        self
    }

    #[must_use]
    pub fn table(&self) -> &SignatureTable {
        &self.table
    }

    fn parse_segment(&self, suite: &str, segment: &str) -> SuiteResults {
        let kernel_text = kernel_msgs_only(segment);
        let buckets = self.table.find_all(&kernel_text);

        let mut results = SuiteResults::new(suite);
        for (index, (signature, snippets)) in
            self.table.signatures().iter().zip(&buckets).enumerate()
        {
            results.add_signature(
                &signature.name,
                snippets,
                self.table.extractor(index),
                NameStyle::Kernel,
                self.create_shas,
            );
        }

        tracing::debug!(
            suite,
            kernel_bytes = kernel_text.len(),
            failures = results.failure_count(),
            "Parsed kernel segment"
        );
        results
    }
}

impl LogParser for KernelLogParser {
    fn name(&self) -> &'static str {
        "kernel"
    }

    fn parse(&self, log: &str) -> Vec<SuiteResults> {
        let _guard = self.span.enter();
        if log.is_empty() {
            tracing::debug!("Empty log, nothing to parse");
            return Vec::new();
        }

        let (boot, test) = split_boot_log(log, &self.boot_marker);
        vec![
            self.parse_segment(BOOT_SUITE, boot),
            self.parse_segment(TEST_SUITE, test),
        ]
    }
}
