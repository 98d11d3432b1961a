//! Test-name derivation
//!
//! Turns a matched log snippet into a stable, filesystem-safe slug so the
//! same failure gets the same test name on every run, regardless of
//! timestamps, addresses or line numbers embedded in the text.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

/// Longest slug we hand out. Leaves room for a `-<sha256>` suffix inside a
/// 256 character test name.
pub const MAX_NAME_LEN: usize = 191;

/// Addresses, bracketed hex and bare integers. Integers directly followed by
/// `(` are kept so call-like tokens such as `clone3(` survive.
static NUMBERS_AND_ADDRESSES: LazyLock<fancy_regex::Regex> = LazyLock::new(|| {
    fancy_regex::Regex::new(r"(0x[a-f0-9]+|[<\[][0-9a-f]+?[>\]]|\b\d+\b(?!\s*\())")
        .expect("number stripping regex must compile")
});

/// Leading `[timestamp]` plus an optional `[thread]` block.
static LEADING_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[[^\]]+\](\[[^\]]+\])?").expect("timestamp regex must compile")
});

static PATH_NUMBERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"0x[a-f0-9]+|\d+").expect("number regex must compile"));

static BRACED_GROUPS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{[^\n]+?\}|\[[^\n]+?\]").expect("braced group regex must compile")
});

static NON_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("slug filter regex must compile"));

static DASH_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-\s]+").expect("slug dash regex must compile"));

/// How the matched fragment is cleaned before slugification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameStyle {
    /// Kernel messages: drop numbers, addresses and the leading timestamp
    Kernel,
    /// Compiler diagnostics: flatten the source path, drop numbers and
    /// `{aka ...}` / `[-Wflag]` groups
    Build,
}

/// Derive a slug from the first match of `pattern` in `snippet`.
///
/// Returns `None` when no pattern is given, when it does not match, or when
/// nothing survives slugification. If the pattern declares a capture group,
/// the first group is used instead of the whole match.
#[must_use]
pub fn create_name(snippet: &str, pattern: Option<&Regex>, style: NameStyle) -> Option<String> {
    let pattern = pattern?;
    let caps = pattern.captures(snippet)?;
    let fragment = caps.get(1).or_else(|| caps.get(0))?.as_str();

    let cleaned = match style {
        NameStyle::Kernel => remove_numbers_and_time(fragment),
        NameStyle::Build => post_process_test_name(fragment),
    };

    let mut slug = slugify(&cleaned);
    truncate_chars(&mut slug, MAX_NAME_LEN);
    if slug.is_empty() { None } else { Some(slug) }
}

/// Strip volatile numbers and the leading timestamp from a kernel message.
///
/// `[ 1067.461794][  T132] BUG: KCSAN: data-race in do_page_fault`
/// becomes ` BUG: KCSAN: data-race in do_page_fault`.
#[must_use]
pub fn remove_numbers_and_time(snippet: &str) -> String {
    let without_numbers = strip_all(&NUMBERS_AND_ADDRESSES, snippet);
    LEADING_TIMESTAMP.replace(&without_numbers, "").into_owned()
}

/// Flatten a compiler diagnostic line before slugification.
///
/// Drops the `builds/linux` checkout prefix, turns path separators and dots
/// into `_`, removes numbers, then removes `{...}` and `[...]` groups.
#[must_use]
pub fn post_process_test_name(text: &str) -> String {
    let text = text.replace("builds/linux", "");
    let text = text.replace(['/', '.'], "_");
    let text = PATH_NUMBERS.replace_all(&text, "");
    BRACED_GROUPS.replace_all(&text, "").into_owned()
}

/// Lowercase ASCII slug: keeps `[a-z0-9_]`, turns whitespace/dash runs into
/// a single `-`, trims `-` and `_` from both ends.
#[must_use]
pub fn slugify(text: &str) -> String {
    let ascii: String = text.nfkd().filter(char::is_ascii).collect();
    let lowered = ascii.to_lowercase();
    let kept = NON_SLUG.replace_all(&lowered, "");
    let dashed = DASH_RUNS.replace_all(&kept, "-");
    dashed.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// SHA-256 hex digest of the snippet with volatile numbers removed.
#[must_use]
pub fn create_shasum(snippet: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(remove_numbers_and_time(snippet).as_bytes());
    format!("{:x}", hasher.finalize())
}

fn strip_all<'t>(regex: &fancy_regex::Regex, text: &'t str) -> Cow<'t, str> {
    let mut out = String::new();
    let mut last = 0;
    for found in regex.find_iter(text) {
        // A backtracking limit hit leaves the rest of the text untouched
        let Ok(found) = found else { break };
        out.push_str(&text[last..found.start()]);
        last = found.end();
    }
    if last == 0 && out.is_empty() {
        return Cow::Borrowed(text);
    }
    out.push_str(&text[last..]);
    Cow::Owned(out)
}

fn truncate_chars(text: &mut String, max_chars: usize) {
    if let Some((idx, _)) = text.char_indices().nth(max_chars) {
        text.truncate(idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signatures::compile_multiline;

    const MM_SNIPPET: &str = "make --silent --keep-going --jobs=8 O=/home/tuxbuild/.cache/tuxmake/builds/1/build ARCH=arm CROSS_COMPILE=arm-linux-gnueabihf- 'CC=sccache arm-linux-gnueabihf-gcc' 'HOSTCC=sccache gcc'
In file included from /builds/linux/mm/internal.h:22,
                 from /builds/linux/mm/filemap.c:52:
/builds/linux/mm/vma.h: In function 'init_vma_munmap':
/builds/linux/mm/vma.h:184:26: error: 'USER_PGTABLES_CEILING' undeclared (first use in this function)
  184 |         vms->unmap_end = USER_PGTABLES_CEILING;
      |                          ^~~~~~~~~~~~~~~~~~~~~
/builds/linux/mm/vma.h:184:26: note: each undeclared identifier is reported only once for each function it appears in";

    const NOISY_PATH: &str = "builds/linux/testa/testb///....c.. 23{test1}[test2]test.c";

    #[test]
    fn create_name_without_pattern_is_none() {
        assert_eq!(create_name(MM_SNIPPET, None, NameStyle::Build), None);
    }

    #[test]
    fn create_name_strips_everything_noisy() {
        let regex = compile_multiline(r"^.*$").unwrap();
        let name = create_name(NOISY_PATH, Some(&regex), NameStyle::Build);
        assert_eq!(name.as_deref(), Some("testa_testb_______c__-test_c"));
    }

    #[test]
    fn create_name_uses_first_diagnostic_line() {
        let regex = compile_multiline(r"^[^\n]*(?:error|warning)[^\n]*$").unwrap();
        let name = create_name(MM_SNIPPET, Some(&regex), NameStyle::Build);
        assert_eq!(
            name.as_deref(),
            Some("mm_vma_h-error-user_pgtables_ceiling-undeclared-first-use-in-this-function")
        );
    }

    #[test]
    fn create_name_no_match_is_none() {
        let regex = compile_multiline(r"oops.*").unwrap();
        assert_eq!(create_name(MM_SNIPPET, Some(&regex), NameStyle::Build), None);
    }

    #[test]
    fn create_name_is_idempotent() {
        let regex = compile_multiline(r"^[^\n]*error[^\n]*$").unwrap();
        let first = create_name(MM_SNIPPET, Some(&regex), NameStyle::Build);
        let second = create_name(MM_SNIPPET, Some(&regex), NameStyle::Build);
        assert_eq!(first, second);
    }

    #[test]
    fn create_name_prefers_first_capture_group() {
        let regex = compile_multiline(r"error: '(\w+)'").unwrap();
        let name = create_name(MM_SNIPPET, Some(&regex), NameStyle::Build);
        assert_eq!(name.as_deref(), Some("user_pgtables_ceiling"));
    }

    #[test]
    fn create_name_truncates_long_fragments() {
        let regex = compile_multiline(r"^.*$").unwrap();
        let long = "word ".repeat(100);
        let name = create_name(&long, Some(&regex), NameStyle::Build).unwrap();
        assert_eq!(name.len(), MAX_NAME_LEN);
    }

    #[test]
    fn create_name_empty_slug_is_none() {
        let regex = compile_multiline(r"^.*$").unwrap();
        assert_eq!(create_name("!!! ???", Some(&regex), NameStyle::Build), None);
    }

    #[test]
    fn kernel_style_name_drops_addresses() {
        let regex = compile_multiline(r"BUG: KASAN:[^\+\n]*").unwrap();
        let snippet = "[   12.345678] BUG: KASAN: slab-out-of-bounds in kmalloc_oob_right+0x190/0x3b8";
        let name = create_name(snippet, Some(&regex), NameStyle::Kernel);
        assert_eq!(
            name.as_deref(),
            Some("bug-kasan-slab-out-of-bounds-in-kmalloc_oob_right")
        );
    }

    #[test]
    fn post_process_test_name_literal() {
        assert_eq!(
            post_process_test_name(NOISY_PATH),
            "_testa_testb_______c__ test_c"
        );
    }

    #[test]
    fn post_process_removes_aka_and_flags() {
        let cleaned = post_process_test_name(
            "ipsec.c:40:24: warning: format '%ld' expects type 'ssize_t' {aka 'int'} [-Wformat=]",
        );
        assert_eq!(cleaned, "ipsec_c::: warning: format '%ld' expects type 'ssize_t'  ");
    }

    #[test]
    fn remove_numbers_and_time_strips_timestamp_and_thread() {
        let cleaned = remove_numbers_and_time(
            "[ 1067.461794][  T132] BUG: KCSAN: data-race in do_page_fault",
        );
        assert_eq!(cleaned, " BUG: KCSAN: data-race in do_page_fault");
    }

    #[test]
    fn remove_numbers_keeps_call_like_numbers() {
        let cleaned =
            remove_numbers_and_time("syscall 435 (clone3) at 0xffff0000 <deadbeef> line 42");
        assert_eq!(cleaned, "syscall 435 (clone3) at   line ");
    }

    #[test]
    fn slugify_matches_web_slug_rules() {
        assert_eq!(slugify("  Hello, World!  "), "hello-world");
        assert_eq!(slugify("__a--b  c__"), "a-b-c");
        assert_eq!(slugify("Café déjà"), "cafe-deja");
        assert_eq!(
            slugify("<command-line>: warning: \"_GNU_SOURCE\" redefined"),
            "command-line-warning-_gnu_source-redefined"
        );
    }

    #[test]
    fn shasum_ignores_timestamps() {
        let a = create_shasum("[    1.000000] Oops: 0000 [#1] SMP");
        let b = create_shasum("[  999.123456] Oops: 0000 [#1] SMP");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, create_shasum("[    1.000000] Oops: general protection"));
    }
}
