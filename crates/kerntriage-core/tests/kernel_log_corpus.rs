//! Golden tests for the kernel message parser over a qemu boot + LTP log.

use kerntriage_core::config::KernelConfig;
use kerntriage_core::kernel::{BOOT_SUITE, KernelLogParser, TEST_SUITE};
use kerntriage_core::results::SuiteResults;
use kerntriage_core::signatures::Signature;
use kerntriage_core::triage::{LogParser, Triage};

const QEMU_ARM64_LTP: &str = include_str!("corpus/kernel/qemu_arm64_ltp.log");

const KASAN: &str = "kasan-bug-kasan-slab-out-of-bounds-in-kmalloc_oob_right";
const EXCEPTION: &str = "exception-warning-cpu-pid-at-mmpage_allocc-__alloc_pages_noprof";
const SLEEPING_BUG: &str =
    "bug-bug-sleeping-function-called-from-invalid-context-at-kernellockingmutexc";

fn failures(suite: &SuiteResults) -> Vec<&str> {
    suite.failures().map(|(name, _)| name).collect()
}

fn is_sha_of(name: &str, base: &str) -> bool {
    name.strip_prefix(base)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|digest| digest.len() == 64 && digest.chars().all(|c| c.is_ascii_hexdigit()))
}

#[test]
fn boot_segment_reports_kasan() {
    let suites = KernelLogParser::new().parse(QEMU_ARM64_LTP);
    let boot = &suites[0];
    assert_eq!(boot.suite, BOOT_SUITE);

    let names = failures(boot);
    assert_eq!(names.len(), 3, "{names:#?}");
    assert!(names.contains(&"kasan"));
    assert!(names.contains(&KASAN));
    assert!(names.iter().any(|name| is_sha_of(name, KASAN)));

    let log = boot.get(KASAN).unwrap().log();
    assert!(log.starts_with("[    2.345678] ====="));
    assert!(log.contains("Write of size 1 at addr ffff00000c6b1f73"));
    assert!(log.ends_with(&format!("[    2.345720] {}", "=".repeat(66))));
    // Swallowed by the multiline report
    assert!(boot.get("bug").unwrap().passed());
}

#[test]
fn test_segment_reports_cut_here_and_bug() {
    let suites = KernelLogParser::new().parse(QEMU_ARM64_LTP);
    let test = &suites[1];
    assert_eq!(test.suite, TEST_SUITE);

    let names = failures(test);
    assert_eq!(names.len(), 6, "{names:#?}");
    for expected in ["exception", EXCEPTION, "bug", SLEEPING_BUG] {
        assert!(names.contains(&expected), "missing {expected}");
    }

    let exception = test.get(EXCEPTION).unwrap().log();
    assert!(exception.starts_with("------------[ cut here ]------------\n"));
    assert!(exception.ends_with("---[ end trace 0000000000000000 ]---"));
    assert!(test.get("warning").unwrap().passed());

    // User space lines carry no kernel timestamp and are dropped
    assert!(test.get("oops").unwrap().passed());
    assert!(!exception.contains("TPASS"));
}

#[test]
fn nothing_from_the_test_half_leaks_into_boot() {
    let suites = KernelLogParser::new().parse(QEMU_ARM64_LTP);
    assert!(suites[0].get("exception").unwrap().passed());
    assert!(suites[1].get("kasan").unwrap().passed());
}

#[test]
fn names_survive_timestamp_shifts() {
    let parser = KernelLogParser::new();
    let shifted = QEMU_ARM64_LTP
        .replace("[   45.", "[   47.")
        .replace("[    2.34", "[    2.97")
        .replace("[   70.000001]", "[   71.500000]");

    let before = parser.parse(QEMU_ARM64_LTP);
    let after = parser.parse(&shifted);
    for (a, b) in before.iter().zip(&after) {
        let a_names: Vec<_> = a.tests.keys().collect();
        let b_names: Vec<_> = b.tests.keys().collect();
        assert_eq!(a_names, b_names);
    }
}

#[test]
fn disabling_shas_keeps_named_tests() {
    let suites = KernelLogParser::new().with_shas(false).parse(QEMU_ARM64_LTP);
    assert_eq!(failures(&suites[0]), vec!["kasan", KASAN]);
    assert_eq!(failures(&suites[1]), vec!["bug", SLEEPING_BUG, "exception", EXCEPTION]);
}

#[test]
fn extra_signature_catches_lava_markers_only_when_timestamped() {
    let config = KernelConfig {
        extra_signatures: vec![Signature::new(
            "lava-signal",
            r"^[^\n]+LAVA_SIGNAL.*?$",
            None,
        )],
        ..KernelConfig::default()
    };
    let parser = KernelLogParser::from_config(&config).unwrap();
    let suites = parser.parse(QEMU_ARM64_LTP);
    assert!(suites[1].get("lava-signal").unwrap().passed());
    let builtin = KernelLogParser::new().parse(QEMU_ARM64_LTP);
    assert_eq!(suites[1].tests.len(), builtin[1].tests.len() + 1);
}

#[test]
fn triage_runs_kernel_parser_without_build_suite() {
    let report = Triage::default().run(Some(QEMU_ARM64_LTP), false);
    let names: Vec<_> = report.suites.iter().map(|s| s.suite.as_str()).collect();
    assert_eq!(names, vec![BOOT_SUITE, TEST_SUITE]);
    assert_eq!(report.failure_count(), 9);
}
