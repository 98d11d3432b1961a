//! Signature tables
//!
//! A [`Signature`] is a named regex rule identifying one class of log event.
//! Signatures are plain data; a [`SignatureTable`] validates an ordered list
//! of them and compiles the whole list into a single alternation so that one
//! left-to-right scan decides precedence: at any position the earliest
//! signature in the table that matches claims the span.

use std::borrow::Cow;
use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::error::PatternError;

/// Upper bound for the compiled alternation. The kernel table mixes Unicode
/// classes with lazy multiline spans, which overflows the default limit.
const COMPILED_SIZE_LIMIT: usize = 64 * (1 << 20);

/// A named detection rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Stable identifier, also the base test name (e.g. "kasan", "gcc-compiler")
    pub name: Cow<'static, str>,
    /// Pattern searched in the log text
    pub pattern: Cow<'static, str>,
    /// Optional pattern whose first match is slugified into a sub-test name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract: Option<Cow<'static, str>>,
}

impl Signature {
    /// Declare a builtin signature.
    #[must_use]
    pub const fn builtin(
        name: &'static str,
        pattern: &'static str,
        extract: Option<&'static str>,
    ) -> Self {
        Self {
            name: Cow::Borrowed(name),
            pattern: Cow::Borrowed(pattern),
            extract: match extract {
                Some(extract) => Some(Cow::Borrowed(extract)),
                None => None,
            },
        }
    }

    /// Declare a signature from owned strings (config-provided rules).
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        pattern: impl Into<String>,
        extract: Option<String>,
    ) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            pattern: Cow::Owned(pattern.into()),
            extract: extract.map(Cow::Owned),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(
                PatternError::InvalidSignature("signature name cannot be empty".to_string()).into(),
            );
        }

        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        {
            return Err(PatternError::InvalidSignature(format!(
                "signature name '{}' must only contain [a-z0-9_-]",
                self.name
            ))
            .into());
        }

        if self.pattern.is_empty() {
            return Err(PatternError::InvalidSignature(format!(
                "signature '{}' has an empty pattern",
                self.name
            ))
            .into());
        }

        Ok(())
    }
}

/// Compile a pattern with the flags every signature is matched under:
/// `.` crosses newlines, `^`/`$` match at line boundaries.
pub fn compile_multiline(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .dot_matches_new_line(true)
        .multi_line(true)
        .size_limit(COMPILED_SIZE_LIMIT)
        .build()
}

/// An ordered, validated and compiled list of signatures.
#[derive(Debug, Clone)]
pub struct SignatureTable {
    signatures: Vec<Signature>,
    combined: Regex,
    /// Capture group index of each signature inside `combined`
    group_index: Vec<usize>,
    extractors: Vec<Option<Regex>>,
}

impl SignatureTable {
    /// Validate and compile an ordered signature list.
    pub fn new(signatures: Vec<Signature>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut group_index = Vec::with_capacity(signatures.len());
        let mut extractors = Vec::with_capacity(signatures.len());
        let mut alternatives = Vec::with_capacity(signatures.len());
        let mut next_group = 1;

        for signature in &signatures {
            signature.validate()?;
            if !seen.insert(signature.name.as_ref()) {
                return Err(PatternError::DuplicateSignature(signature.name.to_string()).into());
            }

            let single = compile_multiline(&signature.pattern).map_err(|e| {
                PatternError::InvalidRegex(format!(
                    "signature '{}' has invalid pattern: {e}",
                    signature.name
                ))
            })?;
            group_index.push(next_group);
            // The wrapping group plus whatever groups the pattern declares
            next_group += single.captures_len();
            alternatives.push(format!("({})", signature.pattern));

            let extractor = signature
                .extract
                .as_deref()
                .map(|extract| {
                    compile_multiline(extract).map_err(|e| {
                        PatternError::InvalidRegex(format!(
                            "signature '{}' has invalid name pattern: {e}",
                            signature.name
                        ))
                    })
                })
                .transpose()?;
            extractors.push(extractor);
        }

        let combined = compile_multiline(&alternatives.join("|"))
            .map_err(|e| PatternError::InvalidRegex(format!("combined table: {e}")))?;

        tracing::debug!(
            signatures = signatures.len(),
            groups = next_group - 1,
            "Compiled signature table"
        );

        Ok(Self {
            signatures,
            combined,
            group_index,
            extractors,
        })
    }

    /// Build a table from a builtin list followed by extra signatures.
    pub fn with_extra(builtin: &[Signature], extra: &[Signature]) -> Result<Self> {
        let mut signatures = builtin.to_vec();
        signatures.extend_from_slice(extra);
        Self::new(signatures)
    }

    /// Signatures in precedence order
    #[must_use]
    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    /// Compiled name-extraction pattern of the signature at `index`.
    #[must_use]
    pub fn extractor(&self, index: usize) -> Option<&Regex> {
        self.extractors.get(index).and_then(Option::as_ref)
    }

    /// Scan `text` once and bucket every non-empty match by signature.
    ///
    /// The returned vector is aligned with [`Self::signatures`]; signatures
    /// without matches get an empty list.
    #[must_use]
    pub fn find_all(&self, text: &str) -> Vec<Vec<String>> {
        let mut snippets = vec![Vec::new(); self.signatures.len()];
        if text.is_empty() {
            return snippets;
        }

        for caps in self.combined.captures_iter(text) {
            for (signature, &group) in self.group_index.iter().enumerate() {
                if let Some(m) = caps.get(group) {
                    if !m.is_empty() {
                        snippets[signature].push(m.as_str().to_string());
                    }
                    break;
                }
            }
        }

        snippets
    }
}
