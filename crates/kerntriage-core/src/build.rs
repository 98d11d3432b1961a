//! Build log parser
//!
//! Compiler output is interleaved with `make` chatter, and the lines that
//! say *where* a diagnostic comes from (make invocation, directory, include
//! chain, function) are printed once, far above the diagnostic itself. The
//! parser therefore works in three passes:
//!
//! 1. [`Directives::split`] cuts the log into directive and content blocks
//!    without losing a byte.
//! 2. [`process_blocks`] walks those blocks with a [`ContextStack`], applying
//!    the reset rules of [`DirectiveKind`], and prepends the still-open
//!    context to every diagnostic found in a content block.
//! 3. The per-signature snippets are turned into `gcc-compiler-<slug>` /
//!    `clang-compiler-<slug>` tests, one suite per compiler family.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::Span;

use crate::Result;
use crate::config::BuildConfig;
use crate::error::PatternError;
use crate::naming::NameStyle;
use crate::results::SuiteResults;
use crate::signatures::{Signature, SignatureTable, compile_multiline};
use crate::triage::LogParser;

pub const GCC_SUITE: &str = "log-parser-build-gcc";
pub const CLANG_SUITE: &str = "log-parser-build-clang";

/// Suite slug the caller must have for the build parser to run.
pub const BUILD_SUITE_SLUG: &str = "build";

/// `path:line:col:` or gcc's `<command-line>:`
const LOCATION: &str = r"(?:[^\s:][^\n:]*:\d+:\d+:|<command-line>:)";

/// A diagnostic line plus its source excerpt, `......` elisions and notes.
static GCC_DIAGNOSTIC: LazyLock<String> = LazyLock::new(|| {
    format!(
        r"^{LOCATION} (?:fatal error|error|warning): [^\n]*(?:\n(?:[ \t]*\d* \|[^\n]*|\.{{3,}}[^\n]*|{LOCATION} note: [^\n]*))*"
    )
});

static GCC_DIAGNOSTIC_LINE: LazyLock<String> =
    LazyLock::new(|| format!(r"^{LOCATION} (?:fatal error|error|warning): [^\n]*$"));

/// Clang prints either gcc-style numbered excerpts or a bare caret line.
static CLANG_DIAGNOSTIC: LazyLock<String> = LazyLock::new(|| {
    format!(
        r"^{LOCATION} (?:fatal error|error|warning): [^\n]*(?:\n(?:[ \t]*\d* \|[^\n]*|[ \t]*\^[~^ ]*|{LOCATION} note: [^\n]*))*"
    )
});

static GCC_TABLE: LazyLock<SignatureTable> = LazyLock::new(|| {
    SignatureTable::new(CompilerFamily::Gcc.builtin_signatures())
        .expect("builtin gcc signatures must compile")
});

static CLANG_TABLE: LazyLock<SignatureTable> = LazyLock::new(|| {
    SignatureTable::new(CompilerFamily::Clang.builtin_signatures())
        .expect("builtin clang signatures must compile")
});

static DEFAULT_DIRECTIVES: LazyLock<Directives> = LazyLock::new(|| {
    Directives::new(&DirectivePatterns::default()).expect("builtin directives must compile")
});

static CLANG_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    compile_multiline(
        r"^make [^\n]*?(?:\bCC=(?:sccache )?[^\s']*clang\b|\bLLVM=1\b)|^(?:[A-Za-z]+ )?clang version \d",
    )
    .expect("clang detection regex must compile")
});

/// True when the run carries a `build` suite, the precondition for running
/// the build parser at all.
pub fn has_build_suite<I, S>(suite_slugs: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    suite_slugs
        .into_iter()
        .any(|slug| slug.as_ref() == BUILD_SUITE_SLUG)
}

// ---------------------------------------------------------------------------
// Compiler families
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerFamily {
    Gcc,
    Clang,
}

impl CompilerFamily {
    /// Namespace the family's tests are filed under.
    #[must_use]
    pub const fn suite(self) -> &'static str {
        match self {
            Self::Gcc => GCC_SUITE,
            Self::Clang => CLANG_SUITE,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gcc => "gcc",
            Self::Clang => "clang",
        }
    }

    /// Signature name, and therefore test-name prefix, of the family.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Gcc => "gcc-compiler",
            Self::Clang => "clang-compiler",
        }
    }

    #[must_use]
    pub fn builtin_signatures(self) -> Vec<Signature> {
        let pattern = match self {
            Self::Gcc => GCC_DIAGNOSTIC.as_str(),
            Self::Clang => CLANG_DIAGNOSTIC.as_str(),
        };
        vec![Signature::new(
            self.prefix(),
            pattern,
            Some(GCC_DIAGNOSTIC_LINE.to_string()),
        )]
    }

    fn builtin_table(self) -> &'static SignatureTable {
        match self {
            Self::Gcc => &*GCC_TABLE,
            Self::Clang => &*CLANG_TABLE,
        }
    }
}

impl fmt::Display for CompilerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Guess the compiler from the make invocations (`CC=...clang`, `LLVM=1`) or a
/// `clang version` banner; anything else is gcc.
#[must_use]
pub fn detect_compiler(log: &str) -> CompilerFamily {
    if CLANG_MARKER.is_match(log) {
        CompilerFamily::Clang
    } else {
        CompilerFamily::Gcc
    }
}

/// Which diagnostic tables run over a build log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerSelection {
    /// Detect from the make lines
    #[default]
    Auto,
    Gcc,
    Clang,
    /// Run both tables over the same blocks
    Both,
}

impl CompilerSelection {
    #[must_use]
    pub fn families(self, log: &str) -> Vec<CompilerFamily> {
        match self {
            Self::Auto => vec![detect_compiler(log)],
            Self::Gcc => vec![CompilerFamily::Gcc],
            Self::Clang => vec![CompilerFamily::Clang],
            Self::Both => vec![CompilerFamily::Gcc, CompilerFamily::Clang],
        }
    }
}

impl fmt::Display for CompilerSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Gcc => write!(f, "gcc"),
            Self::Clang => write!(f, "clang"),
            Self::Both => write!(f, "both"),
        }
    }
}

impl FromStr for CompilerSelection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "gcc" => Ok(Self::Gcc),
            "clang" | "llvm" => Ok(Self::Clang),
            "both" | "all" => Ok(Self::Both),
            _ => Err(format!(
                "unknown compiler: {s}. Expected one of: auto, gcc, clang, both"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Directives and context reset rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    Make,
    Entering,
    Leaving,
    InFile,
    InFunction,
    Inlined,
}

/// A slot of the context stack, in the order slots are prepended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextSlot {
    Make = 0,
    Entering = 1,
    InFile = 2,
    InFunction = 3,
}

impl DirectiveKind {
    /// Classification order when a block could match several markers.
    pub const ALL: [Self; 6] = [
        Self::Make,
        Self::Entering,
        Self::Leaving,
        Self::InFile,
        Self::InFunction,
        Self::Inlined,
    ];

    /// Slots emptied when this directive is seen.
    #[must_use]
    pub const fn clears(self) -> &'static [ContextSlot] {
        match self {
            Self::Make | Self::Leaving => &[
                ContextSlot::Entering,
                ContextSlot::InFile,
                ContextSlot::InFunction,
            ],
            Self::Entering => &[ContextSlot::InFile, ContextSlot::InFunction],
            Self::InFile => &[ContextSlot::InFunction],
            Self::InFunction | Self::Inlined => &[],
        }
    }

    /// Slot that takes the directive line, applied after [`Self::clears`].
    #[must_use]
    pub const fn sets(self) -> Option<ContextSlot> {
        match self {
            Self::Make => Some(ContextSlot::Make),
            Self::Entering => Some(ContextSlot::Entering),
            Self::Leaving => None,
            Self::InFile => Some(ContextSlot::InFile),
            Self::InFunction | Self::Inlined => Some(ContextSlot::InFunction),
        }
    }
}

/// Raw regex fragments recognising each directive.
///
/// Fragments are used as-is, not escaped, and must not declare capture
/// groups (the splitter relies on its own two groups covering each match).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectivePatterns {
    pub make: String,
    pub entering: String,
    pub leaving: String,
    pub in_file: String,
    pub in_function: String,
    pub inlined: String,
}

impl Default for DirectivePatterns {
    fn default() -> Self {
        Self {
            make: r"^make [^\n]*".to_string(),
            entering: r"^make\[\d+\]: Entering directory[^\n]*".to_string(),
            leaving: r"^make\[\d+\]: Leaving directory[^\n]*".to_string(),
            in_file: r"^In file included from[^\n]*(?:\n[ \t]+from [^\n]*)*".to_string(),
            in_function: r"^[^\n]*In function [^\n]*(?:\n[ \t]+inlined from [^\n]*)*".to_string(),
            inlined: r"^[ \t]+inlined from [^\n]*".to_string(),
        }
    }
}

impl DirectivePatterns {
    #[must_use]
    pub fn pattern(&self, kind: DirectiveKind) -> &str {
        match kind {
            DirectiveKind::Make => &self.make,
            DirectiveKind::Entering => &self.entering,
            DirectiveKind::Leaving => &self.leaving,
            DirectiveKind::InFile => &self.in_file,
            DirectiveKind::InFunction => &self.in_function,
            DirectiveKind::Inlined => &self.inlined,
        }
    }

    /// The composite splitter: lazily consumed content, then the first
    /// directive in priority order.
    #[must_use]
    pub fn split_pattern(&self) -> String {
        let alternatives: Vec<String> = DirectiveKind::ALL
            .iter()
            .map(|kind| format!("(?:{})", self.pattern(*kind)))
            .collect();
        format!("(.*?)({})", alternatives.join("|"))
    }
}

/// Compiled directive markers.
#[derive(Debug, Clone)]
pub struct Directives {
    splitter: Regex,
    classifiers: Vec<(DirectiveKind, Regex)>,
}

impl Directives {
    pub fn new(patterns: &DirectivePatterns) -> Result<Self> {
        let mut classifiers = Vec::with_capacity(DirectiveKind::ALL.len());
        for kind in DirectiveKind::ALL {
            let fragment = patterns.pattern(kind);
            let single = compile_multiline(fragment).map_err(|e| {
                PatternError::InvalidRegex(format!("directive {kind:?} is invalid: {e}"))
            })?;
            if single.captures_len() > 1 {
                return Err(PatternError::InvalidRegex(format!(
                    "directive {kind:?} must not declare capture groups; use (?:...)"
                ))
                .into());
            }
            let anchored = compile_multiline(&format!(r"\A(?:{fragment})\z")).map_err(|e| {
                PatternError::InvalidRegex(format!("directive {kind:?} is invalid: {e}"))
            })?;
            classifiers.push((kind, anchored));
        }

        let splitter = compile_multiline(&patterns.split_pattern())
            .map_err(|e| PatternError::InvalidRegex(format!("directive splitter: {e}")))?;

        Ok(Self {
            splitter,
            classifiers,
        })
    }

    /// The builtin make/gcc directive set.
    #[must_use]
    pub fn builtin() -> &'static Self {
        &DEFAULT_DIRECTIVES
    }

    /// Which directive, if any, a whole block is.
    #[must_use]
    pub fn classify(&self, block: &str) -> Option<DirectiveKind> {
        self.classifiers
            .iter()
            .find(|(_, regex)| regex.is_match(block))
            .map(|(kind, _)| *kind)
    }

    /// Lossless split of `log` into directive and content blocks.
    #[must_use]
    pub fn split<'a>(&self, log: &'a str) -> Vec<&'a str> {
        split_by_regex(log, &self.splitter)
    }
}

/// Split `log` the way a group-aware regex split does: for every match the
/// text before it, then each participating capture group; finally the
/// trailing remainder. Empty pieces are dropped.
///
/// Concatenating the result reproduces `log` whenever the capture groups of
/// `regex` tile its matches, as they do for `(.*?)(directive)`.
#[must_use]
pub fn split_by_regex<'a>(log: &'a str, regex: &Regex) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut last = 0;

    for caps in regex.captures_iter(log) {
        let Some(whole) = caps.get(0) else { continue };
        pieces.push(&log[last..whole.start()]);
        pieces.extend(caps.iter().skip(1).flatten().map(|m| m.as_str()));
        last = whole.end();
    }
    pieces.push(&log[last..]);

    pieces.retain(|piece| !piece.is_empty());
    pieces
}

/// Directive lines still in effect while walking the blocks.
#[derive(Debug, Default, Clone)]
pub struct ContextStack<'a> {
    slots: [Option<&'a str>; 4],
}

impl<'a> ContextStack<'a> {
    pub fn apply(&mut self, kind: DirectiveKind, line: &'a str) {
        for slot in kind.clears() {
            self.slots[*slot as usize] = None;
        }
        if let Some(slot) = kind.sets() {
            self.slots[slot as usize] = Some(line);
        }
    }

    #[must_use]
    pub fn get(&self, slot: ContextSlot) -> Option<&'a str> {
        self.slots[slot as usize]
    }

    /// Set slots, each followed by a newline, in make/entering/file/function
    /// order.
    #[must_use]
    pub fn prefix(&self) -> String {
        let mut prefix = String::new();
        for line in self.slots.iter().flatten() {
            prefix.push_str(line);
            prefix.push('\n');
        }
        prefix
    }
}

/// Walk `blocks`, tracking context and collecting one snippet per match.
///
/// The result is aligned with `table`: entry `i` holds the snippets of
/// signature `i`, each being the open context followed by the match.
#[must_use]
pub fn process_blocks(
    blocks: &[&str],
    table: &SignatureTable,
    directives: &Directives,
) -> Vec<Vec<String>> {
    let mut snippets = vec![Vec::new(); table.len()];
    let mut context = ContextStack::default();

    for block in blocks {
        if let Some(kind) = directives.classify(block) {
            tracing::trace!(?kind, "Directive");
            context.apply(kind, block);
            continue;
        }

        let found = table.find_all(block);
        if found.iter().all(Vec::is_empty) {
            continue;
        }

        let prefix = context.prefix();
        for (bucket, matches) in snippets.iter_mut().zip(found) {
            bucket.extend(matches.into_iter().map(|m| format!("{prefix}{m}")));
        }
    }

    snippets
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Build log parser producing `log-parser-build-<compiler>` suites.
#[derive(Debug, Clone)]
pub struct BuildLogParser {
    directives: Directives,
    gcc: SignatureTable,
    clang: SignatureTable,
    compiler: CompilerSelection,
    create_shas: bool,
    span: Span,
}

impl Default for BuildLogParser {
    fn default() -> Self {
        Self {
            directives: Directives::builtin().clone(),
            gcc: GCC_TABLE.clone(),
            clang: CLANG_TABLE.clone(),
            compiler: CompilerSelection::Auto,
            create_shas: false,
            span: tracing::info_span!("build_log_parser"),
        }
    }
}

impl BuildLogParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a parser from configuration. Extra signatures are appended to
    /// both compiler tables.
    pub fn from_config(config: &BuildConfig) -> Result<Self> {
        let table_for = |family: CompilerFamily| -> Result<SignatureTable> {
            if config.extra_signatures.is_empty() {
                Ok(family.builtin_table().clone())
            } else {
                SignatureTable::with_extra(&family.builtin_signatures(), &config.extra_signatures)
            }
        };

        Ok(Self {
            directives: Directives::new(&config.directives)?,
            gcc: table_for(CompilerFamily::Gcc)?,
            clang: table_for(CompilerFamily::Clang)?,
            compiler: config.compiler,
            create_shas: config.create_shas,
            ..Self::default()
        })
    }

    #[must_use]
    pub fn with_compiler(mut self, compiler: CompilerSelection) -> Self {
        self.compiler = compiler;
        self
    }

    #[must_use]
    pub fn with_shas(mut self, create_shas: bool) -> Self {
        self.create_shas = create_shas;
        self
    }

    /// Emit events under `span` instead of the parser's own.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    #[must_use]
    pub fn table(&self, family: CompilerFamily) -> &SignatureTable {
        match family {
            CompilerFamily::Gcc => &self.gcc,
            CompilerFamily::Clang => &self.clang,
        }
    }

    /// Results for one compiler family over already split blocks.
    #[must_use]
    pub fn parse_blocks(&self, blocks: &[&str], family: CompilerFamily) -> SuiteResults {
        let table = self.table(family);
        let buckets = process_blocks(blocks, table, &self.directives);

        let mut results = SuiteResults::new(family.suite());
        for (index, (signature, snippets)) in
            table.signatures().iter().zip(&buckets).enumerate()
        {
            results.add_signature(
                &signature.name,
                snippets,
                table.extractor(index),
                NameStyle::Build,
                self.create_shas,
            );
        }

        tracing::debug!(
            %family,
            failures = results.failure_count(),
            "Parsed build log"
        );
        results
    }
}

impl LogParser for BuildLogParser {
    fn name(&self) -> &'static str {
        "build"
    }

    fn parse(&self, log: &str) -> Vec<SuiteResults> {
        let _guard = self.span.enter();
        if log.is_empty() {
            tracing::debug!("Empty log, nothing to parse");
            return Vec::new();
        }

        let blocks = self.directives.split(log);
        tracing::debug!(blocks = blocks.len(), compiler = %self.compiler, "Split build log");

        self.compiler
            .families(log)
            .into_iter()
            .map(|family| self.parse_blocks(&blocks, family))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal_directives() -> Directives {
        Directives::new(&DirectivePatterns {
            make: "make".to_string(),
            entering: "Entering".to_string(),
            leaving: "Leaving".to_string(),
            in_file: "In file".to_string(),
            in_function: "In function".to_string(),
            inlined: "inlined from".to_string(),
        })
        .unwrap()
    }

    fn error_table() -> SignatureTable {
        SignatureTable::new(vec![Signature::new("test", "error", None)]).unwrap()
    }

    fn walk(second_directive: &str) -> Vec<Vec<String>> {
        let blocks = [
            "make",
            "Entering",
            "In file",
            "In function",
            "error",
            second_directive,
            "error",
        ];
        process_blocks(&blocks, &error_table(), &literal_directives())
    }

    const FIRST: &str = "make\nEntering\nIn file\nIn function\nerror";

    #[test]
    fn process_blocks_reset_by_make() {
        assert_eq!(walk("make"), vec![vec![FIRST.to_string(), "make\nerror".to_string()]]);
    }

    #[test]
    fn process_blocks_reset_by_entering() {
        assert_eq!(
            walk("Entering"),
            vec![vec![FIRST.to_string(), "make\nEntering\nerror".to_string()]]
        );
    }

    #[test]
    fn process_blocks_reset_by_leaving() {
        assert_eq!(walk("Leaving"), vec![vec![FIRST.to_string(), "make\nerror".to_string()]]);
    }

    #[test]
    fn process_blocks_reset_by_in_file() {
        assert_eq!(
            walk("In file"),
            vec![vec![
                FIRST.to_string(),
                "make\nEntering\nIn file\nerror".to_string()
            ]]
        );
    }

    #[test]
    fn process_blocks_inlined_replaces_function() {
        let blocks = ["make", "In function", "inlined from", "error"];
        let found = process_blocks(&blocks, &error_table(), &literal_directives());
        assert_eq!(found, vec![vec!["make\ninlined from\nerror".to_string()]]);
    }

    #[test]
    fn process_blocks_without_context() {
        let found = process_blocks(&["error", "nothing"], &error_table(), &literal_directives());
        assert_eq!(found, vec![vec!["error".to_string()]]);
    }

    #[test]
    fn unterminated_entering_stays_open() {
        let blocks = ["Entering", "error", "more error"];
        let found = process_blocks(&blocks, &error_table(), &literal_directives());
        // Identical snippets only collapse at result assembly
        assert_eq!(
            found,
            vec![vec!["Entering\nerror".to_string(), "Entering\nerror".to_string()]]
        );
    }

    #[test]
    fn split_by_regex_basic() {
        let regex = Regex::new("(.*?)(a)").unwrap();
        let log = "ababaabccda";
        let split = split_by_regex(log, &regex);
        assert_eq!(split, vec!["a", "b", "a", "b", "a", "a", "bccd", "a"]);
        assert_eq!(split.concat(), log);
    }

    #[test]
    fn split_without_directives_is_whole_log() {
        let log = "just some\ncompiler output\n";
        assert_eq!(Directives::builtin().split(log), vec![log]);
    }

    #[test]
    fn split_keeps_directives_as_their_own_blocks() {
        let log = "make ARCH=arm\n  CC  foo.o\nIn file included from a.h:1,\n                 from b.c:2:\nc.h: In function 'f':\nc.h:3:4: error: boom\n";
        let split = Directives::builtin().split(log);
        assert_eq!(
            split,
            vec![
                "make ARCH=arm",
                "\n  CC  foo.o\n",
                "In file included from a.h:1,\n                 from b.c:2:",
                "\n",
                "c.h: In function 'f':",
                "\nc.h:3:4: error: boom\n",
            ]
        );
        assert_eq!(split.concat(), log);
    }

    #[test]
    fn classify_follows_priority() {
        let directives = Directives::builtin();
        assert_eq!(directives.classify("make -C tools"), Some(DirectiveKind::Make));
        assert_eq!(
            directives.classify("make[2]: Entering directory '/x'"),
            Some(DirectiveKind::Entering)
        );
        assert_eq!(
            directives.classify("make[2]: Leaving directory '/x'"),
            Some(DirectiveKind::Leaving)
        );
        assert_eq!(
            directives.classify("In function 'a',\n    inlined from 'b' at c.c:1:2:"),
            Some(DirectiveKind::InFunction)
        );
        assert_eq!(
            directives.classify("    inlined from 'b' at c.c:1:2:"),
            Some(DirectiveKind::Inlined)
        );
        assert_eq!(directives.classify("\nc.c:1:2: error: x\n"), None);
    }

    #[test]
    fn directives_with_capture_groups_are_rejected() {
        let patterns = DirectivePatterns {
            make: "(make)".to_string(),
            ..DirectivePatterns::default()
        };
        let err = Directives::new(&patterns).unwrap_err();
        assert!(err.to_string().contains("capture groups"));
    }

    #[test]
    fn reset_table_matches_directive_semantics() {
        let mut stack = ContextStack::default();
        stack.apply(DirectiveKind::Make, "m");
        stack.apply(DirectiveKind::Entering, "e");
        stack.apply(DirectiveKind::InFile, "i");
        stack.apply(DirectiveKind::InFunction, "f");
        assert_eq!(stack.prefix(), "m\ne\ni\nf\n");

        stack.apply(DirectiveKind::Leaving, "l");
        assert_eq!(stack.get(ContextSlot::Make), Some("m"));
        assert_eq!(stack.get(ContextSlot::Entering), None);
        assert_eq!(stack.get(ContextSlot::InFile), None);
        assert_eq!(stack.get(ContextSlot::InFunction), None);
    }

    #[test]
    fn gcc_diagnostic_stops_before_unrelated_lines() {
        let text = "\nfoo.c:1:2: warning: unused variable 'x' [-Wunused-variable]\n    1 | int x;\n      |     ^\ncc1: some warnings being treated as errors\n  CC      bar.o\n";
        let found = GCC_TABLE.find_all(text);
        assert_eq!(
            found[0],
            vec![
                "foo.c:1:2: warning: unused variable 'x' [-Wunused-variable]\n    1 | int x;\n      |     ^"
                    .to_string()
            ]
        );
    }

    #[test]
    fn detect_compiler_from_make_line() {
        assert_eq!(
            detect_compiler("make ARCH=arm64 'CC=sccache clang' 'HOSTCC=sccache clang'\n"),
            CompilerFamily::Clang
        );
        assert_eq!(detect_compiler("make LLVM=1 ARCH=x86_64\n"), CompilerFamily::Clang);
        assert_eq!(
            detect_compiler("make 'CC=sccache aarch64-linux-gnu-gcc' 'HOSTCC=sccache clang'\n"),
            CompilerFamily::Gcc
        );
        assert_eq!(detect_compiler("no make line at all"), CompilerFamily::Gcc);
    }

    #[test]
    fn detect_compiler_from_version_banner() {
        assert_eq!(
            detect_compiler("Ubuntu clang version 18.1.3 (1ubuntu1)\nTarget: x86_64-pc-linux-gnu\n"),
            CompilerFamily::Clang
        );
        assert_eq!(detect_compiler("  CC      clang_version.o\n"), CompilerFamily::Gcc);
    }

    #[test]
    fn family_name_prefix_and_suite_agree() {
        for family in [CompilerFamily::Gcc, CompilerFamily::Clang] {
            assert_eq!(family.to_string(), family.name());
            assert_eq!(family.prefix(), format!("{}-compiler", family.name()));
            assert_eq!(family.suite(), format!("log-parser-build-{}", family.name()));
        }
    }

    #[test]
    fn compiler_selection_parsing() {
        assert_eq!("auto".parse::<CompilerSelection>().unwrap(), CompilerSelection::Auto);
        assert_eq!("GCC".parse::<CompilerSelection>().unwrap(), CompilerSelection::Gcc);
        assert_eq!("llvm".parse::<CompilerSelection>().unwrap(), CompilerSelection::Clang);
        assert_eq!("both".parse::<CompilerSelection>().unwrap(), CompilerSelection::Both);
        assert!("icc".parse::<CompilerSelection>().is_err());
        assert_eq!(CompilerSelection::Both.to_string(), "both");
    }

    #[test]
    fn has_build_suite_checks_slugs() {
        assert!(has_build_suite(["boot", "build"]));
        assert!(!has_build_suite(vec!["boot".to_string(), "ltp".to_string()]));
        assert!(!has_build_suite(Vec::<String>::new()));
    }

    #[test]
    fn empty_log_produces_nothing() {
        assert!(BuildLogParser::new().parse("").is_empty());
    }

    #[test]
    fn clean_build_has_passing_base_test() {
        let results = BuildLogParser::new().parse("make ARCH=arm\n  CC  init/main.o\n");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].suite, GCC_SUITE);
        assert!(results[0].get("gcc-compiler").unwrap().passed());
        assert_eq!(results[0].tests.len(), 1);
    }
}
