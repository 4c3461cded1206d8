//! End-to-end runs through the registry: section walking, tag handling,
//! outcome inversion, and the event stream a full run produces.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use common::{OwnedEvent, Recording};
use tattle::registry::{Registry, TestState};
use tattle::{capture, check, fail_check, require, section, skip, test_case};

fn run_ended(recording: &Recording) -> OwnedEvent {
    recording
        .events()
        .into_iter()
        .rev()
        .find(|event| matches!(event, OwnedEvent::RunEnded { .. }))
        .unwrap()
}

#[test]
fn a_failing_leaf_still_walks_every_sibling() {
    static PASSES: AtomicUsize = AtomicUsize::new(0);
    let recording = Recording::default();
    let mut registry = Registry::new(recording.reporter());

    test_case!(registry, "walks the tree", "", {
        PASSES.fetch_add(1, Ordering::Relaxed);
        section!("a", {
            section!("x", {
                fail_check!("forced");
            });
        });
        section!("b", {});
    });

    let summary = registry.run_all();
    assert_eq!(PASSES.load(Ordering::Relaxed), 2);
    assert!(!summary.success);
    assert_eq!(summary.run_count, 1);
    assert_eq!(summary.fail_count, 1);

    let events = recording.events();
    let starts = events
        .iter()
        .filter(|event| matches!(event, OwnedEvent::CaseStarted { .. }))
        .count();
    let ends = events
        .iter()
        .filter(|event| matches!(event, OwnedEvent::CaseEnded { .. }))
        .count();
    assert_eq!(starts, 1);
    assert_eq!(ends, 1);

    let failures = recording.failures();
    assert_eq!(failures.len(), 1);
    let OwnedEvent::AssertionFailed {
        sections, message, ..
    } = &failures[0]
    else {
        unreachable!();
    };
    assert_eq!(sections, &["a", "x"]);
    assert_eq!(message, "forced");
}

#[test]
fn same_named_cases_are_distinct_registrations() {
    let recording = Recording::default();
    let mut registry = Registry::new(recording.reporter());

    test_case!(registry, "duplicate name", "", {
        check!(1 == 1);
    });
    test_case!(registry, "duplicate name", "", {
        check!(2 == 2);
    });

    let summary = registry.run_all();
    assert_eq!(summary.run_count, 2);
    assert_eq!(summary.assertion_count, 2);
    assert!(summary.success);
}

#[test]
fn should_fail_inverts_the_case_outcome() {
    let recording = Recording::default();
    let mut registry = Registry::new(recording.reporter());

    test_case!(registry, "passes against its will", "[!shouldfail]", {
        check!(1 == 1);
    });
    test_case!(registry, "fails as promised", "[!shouldfail]", {
        check!(1 == 2);
    });

    let summary = registry.run_all();
    assert!(!summary.success);
    assert_eq!(summary.fail_count, 1);

    let states: Vec<(String, TestState)> = recording
        .events()
        .into_iter()
        .filter_map(|event| match event {
            OwnedEvent::CaseEnded { name, state, .. } => Some((name, state)),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        [
            ("passes against its will".to_string(), TestState::Failed),
            ("fails as promised".to_string(), TestState::Success),
        ]
    );
}

#[test]
fn may_fail_reports_but_tolerates_the_failure() {
    let recording = Recording::default();
    let mut registry = Registry::new(recording.reporter());

    test_case!(registry, "wobbly", "[!mayfail]", {
        check!(1 == 2);
    });

    let summary = registry.run_all();
    assert!(summary.success);
    assert_eq!(summary.fail_count, 0);

    let failures = recording.failures();
    assert_eq!(failures.len(), 1);
    let OwnedEvent::AssertionFailed {
        allowed, expected, ..
    } = &failures[0]
    else {
        unreachable!();
    };
    assert!(*allowed);
    assert!(!*expected);
}

#[test]
fn hidden_cases_only_run_under_explicit_selection() {
    let recording = Recording::default();
    let mut registry = Registry::new(recording.reporter());

    test_case!(registry, "visible", "", {
        check!(1 == 1);
    });
    test_case!(registry, "hidden probe", "[.]", {
        check!(2 == 2);
    });

    let all = registry.run_all();
    assert_eq!(all.run_count, 1);
    assert_eq!(recording.started_cases(), ["visible"]);

    let selected = registry.run_matching_name("hidden probe");
    assert_eq!(selected.run_count, 1);
    assert!(selected.success);
}

#[test]
fn tag_filters_select_by_membership() {
    let recording = Recording::default();
    let mut registry = Registry::new(recording.reporter());

    test_case!(registry, "fast one", "[fast]", {
        check!(1 == 1);
    });
    test_case!(registry, "slow one", "[slow]", {
        check!(2 == 2);
    });
    test_case!(registry, "both", "[fast][slow]", {
        check!(3 == 3);
    });

    let summary = registry.run_with_tag("[fast]").unwrap();
    assert_eq!(summary.run_count, 2);
    assert_eq!(recording.started_cases(), ["fast one", "both"]);

    assert!(registry.run_with_tag("fast").is_err());
}

#[test]
fn skipping_marks_the_case_without_counting_an_assertion() {
    let recording = Recording::default();
    let mut registry = Registry::new(recording.reporter());

    test_case!(registry, "offline", "", {
        skip!("no network");
        check!(1 == 2);
    });

    let summary = registry.run_all();
    assert!(summary.success);
    assert_eq!(summary.skip_count, 1);
    assert_eq!(summary.assertion_count, 0);

    let skipped: Vec<String> = recording
        .events()
        .into_iter()
        .filter_map(|event| match event {
            OwnedEvent::CaseSkipped { message, .. } => Some(message),
            _ => None,
        })
        .collect();
    assert_eq!(skipped, ["no network"]);
    assert!(recording.failures().is_empty());
}

#[test]
fn captures_report_in_declaration_order() {
    let recording = Recording::default();
    let mut registry = Registry::new(recording.reporter());

    test_case!(registry, "annotated", "", {
        let (i, j) = (1, 2);
        capture!(i, j);
        check!(i == j);
    });

    registry.run_all();
    let failures = recording.failures();
    assert_eq!(failures.len(), 1);
    let OwnedEvent::AssertionFailed { captures, .. } = &failures[0] else {
        unreachable!();
    };
    assert_eq!(captures, &["i := 1", "j := 2"]);
}

#[test]
fn require_aborts_the_pass_but_later_passes_still_run() {
    static REACHED: AtomicUsize = AtomicUsize::new(0);
    let recording = Recording::default();
    let mut registry = Registry::new(recording.reporter());

    test_case!(registry, "aborting", "", {
        section!("broken", {
            require!(1 == 2);
            REACHED.fetch_add(100, Ordering::Relaxed);
        });
        section!("intact", {
            REACHED.fetch_add(1, Ordering::Relaxed);
        });
    });

    let summary = registry.run_all();
    assert!(!summary.success);
    assert_eq!(REACHED.load(Ordering::Relaxed), 1);

    let ended = run_ended(&recording);
    let OwnedEvent::RunEnded {
        run_count,
        fail_count,
        assertion_count,
        ..
    } = ended
    else {
        unreachable!();
    };
    assert_eq!(run_count, 1);
    assert_eq!(fail_count, 1);
    assert_eq!(assertion_count, 1);
}
