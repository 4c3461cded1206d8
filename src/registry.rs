//! Test registration and run dispatch.
//!
//! The registry owns every registered case in a bounded collection and runs
//! filtered selections of them. Each case body is re-invoked as many times
//! as the section walker demands, bracketed by a started/ended event pair,
//! and a whole selection is bracketed by a run-level pair carrying the
//! aggregate counts.

use std::time::Instant;

use serde::Serialize;

use crate::error::EngineError;
use crate::event::{Location, TestEvent};
use crate::limits::{MAX_TEST_CASES, MAX_TEST_NAME_LENGTH, MAX_UNIQUE_TAGS};
use crate::report::SharedReporter;
use crate::runtime::{self, RunContext, RunGuard, TestReturn};
use crate::storage::{SmallString, SmallVec};

/// Registration-time identity of one test case.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TestId {
    pub name: &'static str,
    pub tags: &'static str,
    pub type_name: Option<&'static str>,
}

impl TestId {
    /// The display name, including the type argument when present.
    pub fn full_name(&self) -> SmallString<MAX_TEST_NAME_LENGTH> {
        let mut out = SmallString::new();
        out.append_or_truncate(self.name);
        if let Some(type_name) = self.type_name {
            out.append_or_truncate(" [");
            out.append_or_truncate(type_name);
            out.append_or_truncate("]");
        }
        out
    }
}

/// Outcome of one case run. Later outcomes override earlier ones, in this
/// order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestState {
    #[default]
    NotRun,
    Success,
    Skipped,
    Failed,
}

/// Zero-argument runnable registered for one case.
pub type TestBody = fn() -> TestReturn;

/// One registered case and its most recent outcome.
#[derive(Clone, Copy, Debug)]
pub struct TestCaseDescriptor {
    pub id: TestId,
    pub location: Location,
    pub body: TestBody,
    pub state: TestState,
}

impl Default for TestCaseDescriptor {
    fn default() -> Self {
        Self {
            id: TestId::default(),
            location: Location::default(),
            body: || Ok(()),
            state: TestState::NotRun,
        }
    }
}

// ============================================================================
// TAG PARSING
// ============================================================================

/// One parsed `[tag]` group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tag<'a> {
    /// `[.]` or a leading `.`: excluded from run-all.
    Ignored,
    /// `[!mayfail]`: assertion failures are reported but tolerated.
    MayFail,
    /// `[!shouldfail]`: the case outcome is inverted.
    ShouldFail,
    Named(&'a str),
}

/// Walks the `[tag]` groups of a tag string in declaration order.
///
/// A group with a leading `.` yields [`Tag::Ignored`] and then the named
/// remainder, so `[.slow]` both hides the case and keeps it selectable by
/// `[slow]`. Text outside bracketed groups is skipped.
pub fn for_each_tag<'t>(tags: &'t str, mut callback: impl FnMut(Tag<'t>)) {
    let mut rest = tags;
    while let Some(open) = rest.find('[') {
        let Some(close) = rest[open..].find(']') else {
            return;
        };
        let tag = &rest[open + 1..open + close];
        rest = &rest[open + close + 1..];
        match tag {
            "" => {}
            "." => callback(Tag::Ignored),
            "!mayfail" => callback(Tag::MayFail),
            "!shouldfail" => callback(Tag::ShouldFail),
            _ => {
                if let Some(stripped) = tag.strip_prefix('.') {
                    callback(Tag::Ignored);
                    callback(Tag::Named(stripped));
                } else {
                    callback(Tag::Named(tag));
                }
            }
        }
    }
}

fn is_hidden(id: &TestId) -> bool {
    let mut hidden = false;
    for_each_tag(id.tags, |tag| {
        if tag == Tag::Ignored {
            hidden = true;
        }
    });
    hidden
}

// ============================================================================
// RUN DISPATCH
// ============================================================================

/// Aggregate totals for one filtered run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub success: bool,
    pub run_count: usize,
    pub fail_count: usize,
    pub skip_count: usize,
    pub assertion_count: usize,
}

impl Default for RunSummary {
    fn default() -> Self {
        Self {
            success: true,
            run_count: 0,
            fail_count: 0,
            skip_count: 0,
            assertion_count: 0,
        }
    }
}

/// Owns every registered case and runs filtered selections of them.
pub struct Registry {
    cases: SmallVec<TestCaseDescriptor, MAX_TEST_CASES>,
    reporter: SharedReporter,
}

impl Registry {
    pub fn new(reporter: SharedReporter) -> Self {
        Self {
            cases: SmallVec::new(),
            reporter,
        }
    }

    /// Appends one case. Registration happens at startup; exceeding the
    /// case ceiling is a configuration error and terminates.
    pub fn add(
        &mut self,
        name: &'static str,
        tags: &'static str,
        location: Location,
        body: TestBody,
    ) {
        self.register(
            TestId {
                name,
                tags,
                type_name: None,
            },
            location,
            body,
        );
    }

    /// Appends one case parameterized by a type, recorded in the full name.
    pub fn add_with_type<T>(
        &mut self,
        name: &'static str,
        tags: &'static str,
        location: Location,
        body: TestBody,
    ) {
        self.register(
            TestId {
                name,
                tags,
                type_name: Some(std::any::type_name::<T>()),
            },
            location,
            body,
        );
    }

    fn register(&mut self, id: TestId, location: Location, body: TestBody) {
        assert!(
            self.cases.len() < MAX_TEST_CASES,
            "exceeded maximum number of test cases"
        );
        assert!(
            id.name.len() <= MAX_TEST_NAME_LENGTH,
            "test case name is too long"
        );
        self.cases.push(TestCaseDescriptor {
            id,
            location,
            body,
            state: TestState::NotRun,
        });
    }

    pub fn cases(&self) -> &[TestCaseDescriptor] {
        self.cases.as_slice()
    }

    /// Every distinct named tag, in first-appearance order.
    pub fn tags(&self) -> SmallVec<&'static str, MAX_UNIQUE_TAGS> {
        let mut out: SmallVec<&'static str, MAX_UNIQUE_TAGS> = SmallVec::new();
        for case in self.cases.iter() {
            for_each_tag(case.id.tags, |tag| {
                if let Tag::Named(name) = tag {
                    if !out.iter().any(|known| *known == name) {
                        assert!(
                            out.len() < MAX_UNIQUE_TAGS,
                            "exceeded maximum number of unique tags"
                        );
                        out.push(name);
                    }
                }
            });
        }
        out
    }

    /// Runs every case not hidden by an ignore tag.
    pub fn run_all(&mut self) -> RunSummary {
        self.run_selected("all tests", |descriptor| !is_hidden(&descriptor.id))
    }

    /// Runs every case whose full name contains `pattern`. Hidden cases are
    /// selectable this way.
    pub fn run_matching_name(&mut self, pattern: &str) -> RunSummary {
        self.run_selected(pattern, |descriptor| {
            descriptor.id.full_name().as_str().contains(pattern)
        })
    }

    /// Runs every case carrying the named tag. The filter must keep the
    /// bracketed `[tag]` form.
    pub fn run_with_tag(&mut self, filter: &str) -> Result<RunSummary, EngineError> {
        let name = filter
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .filter(|name| !name.is_empty())
            .ok_or_else(|| EngineError::InvalidTagFilter {
                filter: filter.to_string(),
            })?;
        Ok(self.run_selected(filter, |descriptor| {
            let mut selected = false;
            for_each_tag(descriptor.id.tags, |tag| {
                if tag == Tag::Named(name) {
                    selected = true;
                }
            });
            selected
        }))
    }

    fn run_selected(
        &mut self,
        name: &str,
        filter: impl Fn(&TestCaseDescriptor) -> bool,
    ) -> RunSummary {
        self.reporter.report(&TestEvent::RunStarted { name });

        let mut summary = RunSummary::default();
        for index in 0..self.cases.len() {
            if !filter(&self.cases[index]) {
                continue;
            }
            let (state, assertion_count) = self.run_case(index);
            summary.run_count += 1;
            summary.assertion_count += assertion_count;
            match state {
                TestState::Failed => {
                    summary.fail_count += 1;
                    summary.success = false;
                }
                TestState::Skipped => summary.skip_count += 1,
                TestState::Success | TestState::NotRun => {}
            }
        }

        self.reporter.report(&TestEvent::RunEnded {
            name,
            success: summary.success,
            run_count: summary.run_count,
            fail_count: summary.fail_count,
            skip_count: summary.skip_count,
            assertion_count: summary.assertion_count,
        });
        summary
    }

    /// Runs one case to completion, re-invoking the body once per section
    /// pass.
    fn run_case(&mut self, index: usize) -> (TestState, usize) {
        let descriptor = self.cases[index];
        let id = descriptor.id;
        self.reporter.report(&TestEvent::CaseStarted { id: &id });

        let mut context = RunContext::new(id, self.reporter.clone());
        for_each_tag(id.tags, |tag| match tag {
            Tag::MayFail => context.may_fail = true,
            Tag::ShouldFail => context.should_fail = true,
            _ => {}
        });
        let should_fail = context.should_fail;

        let guard = RunGuard::install(context);
        let start = Instant::now();

        loop {
            runtime::with_current(|context| context.sections.begin_pass());
            // Err(TestAbort) is the per-invocation abort; the outcome is
            // already recorded by the time it is raised.
            let _ = (descriptor.body)();
            if runtime::with_current(|context| context.sections.end_pass()) {
                break;
            }
        }

        if should_fail {
            invert_case_outcome();
        }

        let duration = start.elapsed().as_secs_f32();
        let context = guard.finish();
        self.cases[index].state = context.state;
        self.reporter.report(&TestEvent::CaseEnded {
            id: &id,
            state: context.state,
            assertion_count: context.assertion_count,
            duration,
        });
        (context.state, context.assertion_count)
    }
}

/// Applies `[!shouldfail]` once the walk is over: a clean pass becomes a
/// reported failure and a failed run counts as success.
fn invert_case_outcome() {
    match runtime::with_current(|context| context.state) {
        TestState::Success => {
            runtime::with_current(|context| context.should_fail = false);
            runtime::report_failure_message(
                Location {
                    file: file!(),
                    line: line!(),
                },
                "expected test to fail, but it passed",
            );
            runtime::with_current(|context| context.should_fail = true);
        }
        TestState::Failed => {
            runtime::with_current(|context| context.state = TestState::Success);
        }
        TestState::Skipped | TestState::NotRun => {}
    }
}
