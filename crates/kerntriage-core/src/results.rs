//! Result assembly
//!
//! Parsers hand back per-signature snippet buckets; this module turns them
//! into named test entries grouped under a suite namespace. Nothing here is
//! persisted: callers walk [`SuiteResults::records`] and store what they need.

use std::collections::BTreeMap;

use regex::Regex;
use serde::Serialize;

use crate::naming::{NameStyle, create_name, create_shasum};

/// Separator placed between snippets when a test carries more than one.
pub const SNIPPET_SEPARATOR: &str = "\n---\n";

/// Captured snippets for a single test name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TestEntry {
    snippets: Vec<String>,
}

impl TestEntry {
    /// Append a snippet unless an identical one is already recorded.
    pub fn push(&mut self, snippet: &str) {
        if !self.snippets.iter().any(|existing| existing == snippet) {
            self.snippets.push(snippet.to_string());
        }
    }

    #[must_use]
    pub fn snippets(&self) -> &[String] {
        &self.snippets
    }

    /// A test passes when nothing was captured for it.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.snippets.is_empty()
    }

    /// All snippets joined with [`SNIPPET_SEPARATOR`].
    #[must_use]
    pub fn log(&self) -> String {
        self.snippets.join(SNIPPET_SEPARATOR)
    }
}

/// Flattened view of one test, ready to be stored by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestRecord {
    pub suite: String,
    pub name: String,
    pub passed: bool,
    pub log: String,
}

/// All tests produced under one namespace (e.g. `log-parser-boot`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteResults {
    pub suite: String,
    pub tests: BTreeMap<String, TestEntry>,
}

impl SuiteResults {
    #[must_use]
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            tests: BTreeMap::new(),
        }
    }

    /// Record the outcome of one signature.
    ///
    /// The signature's own test always exists and collects every snippet.
    /// When `extractor` yields a slug for a snippet, the snippet is also
    /// filed under `<name>-<slug>`; with `create_shas`, under
    /// `<name>[-<slug>]-<sha256>` as well. Snippets landing on the same name
    /// are appended, never overwritten.
    pub fn add_signature(
        &mut self,
        name: &str,
        snippets: &[String],
        extractor: Option<&Regex>,
        style: NameStyle,
        create_shas: bool,
    ) {
        self.tests.entry(name.to_string()).or_default();

        for snippet in snippets {
            self.record(name, snippet);

            let derived = match create_name(snippet, extractor, style) {
                Some(slug) => {
                    let derived = format!("{name}-{slug}");
                    self.record(&derived, snippet);
                    derived
                }
                None => name.to_string(),
            };

            if create_shas {
                let sha = create_shasum(snippet);
                self.record(&format!("{derived}-{sha}"), snippet);
            }
        }
    }

    /// File `snippet` under `name`, creating the test if needed.
    pub fn record(&mut self, name: &str, snippet: &str) {
        self.tests.entry(name.to_string()).or_default().push(snippet);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TestEntry> {
        self.tests.get(name)
    }

    /// Tests that captured at least one snippet.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &TestEntry)> {
        self.tests
            .iter()
            .filter(|(_, entry)| !entry.passed())
            .map(|(name, entry)| (name.as_str(), entry))
    }

    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    #[must_use]
    pub fn records(&self) -> Vec<TestRecord> {
        self.tests
            .iter()
            .map(|(name, entry)| TestRecord {
                suite: self.suite.clone(),
                name: name.clone(),
                passed: entry.passed(),
                log: entry.log(),
            })
            .collect()
    }
}
