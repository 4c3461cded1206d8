//! Ambient run state.
//!
//! Exactly one test is running at any time. Its transient state lives in a
//! thread-local cell, installed when the dispatcher starts a case and
//! restored when the run ends by any path. Assertion macros reach the state
//! through the accessors here; scope guards keep section and capture
//! bookkeeping balanced when a body unwinds early.

use std::cell::RefCell;

use crate::capture::{CaptureEntry, CaptureState};
use crate::event::{Location, TestEvent};
use crate::expr::Expression;
use crate::limits::MAX_MESSAGE_LENGTH;
use crate::registry::{TestId, TestState};
use crate::report::SharedReporter;
use crate::section::{SectionId, SectionState};
use crate::storage::SmallString;

/// Signal that aborts the remainder of the current body invocation.
///
/// Propagated with `?` up to the per-pass dispatch boundary, where it is
/// swallowed. The case outcome is already recorded by the time this is
/// raised, so the dispatcher never inspects it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TestAbort;

/// What every registered test body returns.
pub type TestReturn = Result<(), TestAbort>;

/// Transient state of the one currently-executing test.
pub struct RunContext {
    pub id: TestId,
    pub state: TestState,
    pub sections: SectionState,
    pub captures: CaptureState,
    pub assertion_count: usize,
    pub may_fail: bool,
    pub should_fail: bool,
    pub reporter: SharedReporter,
}

impl RunContext {
    pub fn new(id: TestId, reporter: SharedReporter) -> Self {
        Self {
            id,
            state: TestState::Success,
            sections: SectionState::new(),
            captures: CaptureState::new(),
            assertion_count: 0,
            may_fail: false,
            should_fail: false,
            reporter,
        }
    }
}

thread_local! {
    static CURRENT_RUN: RefCell<Option<RunContext>> = RefCell::new(None);
}

/// Runs `f` against the current run context. Fatal outside a test run.
pub fn with_current<R>(f: impl FnOnce(&mut RunContext) -> R) -> R {
    CURRENT_RUN.with(|cell| {
        let mut slot = cell.borrow_mut();
        let context = slot.as_mut().expect("no test is currently running");
        f(context)
    })
}

/// Runs `f` against the current run context, if one is installed.
pub fn try_with_current<R>(f: impl FnOnce(&mut RunContext) -> R) -> Option<R> {
    CURRENT_RUN.with(|cell| cell.borrow_mut().as_mut().map(f))
}

// ============================================================================
// RUN INSTALLATION
// ============================================================================

/// Makes a context current for the duration of one case run.
///
/// The previously current context, if any, is restored when the guard is
/// finished or dropped. A previous context only exists when the engine is
/// exercising itself from inside one of its own tests.
pub struct RunGuard {
    previous: Option<RunContext>,
    done: bool,
}

impl RunGuard {
    pub fn install(context: RunContext) -> Self {
        let previous = CURRENT_RUN.with(|cell| cell.borrow_mut().replace(context));
        Self {
            previous,
            done: false,
        }
    }

    /// Removes the installed context and hands it back for outcome reading.
    pub fn finish(mut self) -> RunContext {
        self.done = true;
        let previous = self.previous.take();
        CURRENT_RUN.with(|cell| {
            let mut slot = cell.borrow_mut();
            let context = slot.take().expect("no test is currently running");
            *slot = previous;
            context
        })
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.done {
            let previous = self.previous.take();
            CURRENT_RUN.with(|cell| {
                *cell.borrow_mut() = previous;
            });
        }
    }
}

// ============================================================================
// ASSERTION REPORTING
// ============================================================================

/// Counts one evaluated assertion, pass or fail.
pub fn bump_assertion_count() {
    with_current(|context| context.assertion_count += 1);
}

fn emit_failure(context: &mut RunContext, location: Location, message: &str) {
    let event = TestEvent::AssertionFailed {
        id: &context.id,
        sections: context.sections.current_path(),
        captures: context.captures.entries(),
        location,
        message,
        expected: context.should_fail,
        allowed: context.may_fail,
    };
    context.reporter.report(&event);
}

/// Records and reports a failed assertion with a plain message.
pub fn report_failure_message(location: Location, message: &str) {
    with_current(|context| {
        if !context.may_fail {
            context.state = context.state.max(TestState::Failed);
        }
        emit_failure(context, location, message);
    });
}

/// Records and reports a failed assertion from its decomposed expression.
pub fn report_assertion_failed(location: Location, expression: &Expression) {
    with_current(|context| {
        if !context.may_fail {
            context.state = context.state.max(TestState::Failed);
        }
        let mut message: SmallString<MAX_MESSAGE_LENGTH> = SmallString::new();
        message.append_or_truncate(expression.expected());
        if !expression.actual().is_empty() {
            message.append_or_truncate(", got ");
            message.append_or_truncate(expression.actual());
        }
        emit_failure(context, location, message.as_str());
    });
}

/// Records and reports a skip. Never downgrades an earlier failure.
pub fn report_skip(location: Location, message: &str) {
    with_current(|context| {
        context.state = context.state.max(TestState::Skipped);
        let event = TestEvent::CaseSkipped {
            id: &context.id,
            sections: context.sections.current_path(),
            captures: context.captures.entries(),
            location,
            message,
        };
        context.reporter.report(&event);
    });
}

// ============================================================================
// SCOPE GUARDS
// ============================================================================

/// Balances one section declaration, closing the scope however the body
/// leaves it.
pub struct SectionGuard {
    entered: bool,
}

impl SectionGuard {
    pub fn enter(id: SectionId) -> Self {
        let entered = with_current(|context| context.sections.enter(id));
        Self { entered }
    }

    pub fn entered(&self) -> bool {
        self.entered
    }
}

impl Drop for SectionGuard {
    fn drop(&mut self) {
        let entered = self.entered;
        // Tolerate a missing context so unwinding never panics twice.
        let _ = try_with_current(|context| context.sections.exit(entered));
    }
}

/// Pushes one rendered capture entry onto the current run.
pub fn push_capture(entry: CaptureEntry) {
    with_current(|context| context.captures.push(entry));
}

/// Releases a group of capture entries when its scope closes.
pub struct CaptureGuard {
    count: usize,
}

impl CaptureGuard {
    pub fn new(count: usize) -> Self {
        Self { count }
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        let count = self.count;
        let _ = try_with_current(|context| context.captures.pop(count));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Reporter;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct FailureLog {
        messages: Rc<RefCell<Vec<String>>>,
    }

    impl Reporter for FailureLog {
        fn report(&mut self, event: &TestEvent<'_>) {
            if let TestEvent::AssertionFailed {
                message,
                sections,
                captures,
                ..
            } = event
            {
                let path: Vec<&str> = sections.iter().map(|s| s.name).collect();
                let held: Vec<&str> = captures.iter().map(|c| c.as_str()).collect();
                self.messages.borrow_mut().push(format!(
                    "{} [{}] {{{}}}",
                    message,
                    path.join("/"),
                    held.join(", ")
                ));
            }
        }
    }

    fn install(log: &FailureLog) -> RunGuard {
        let context = RunContext::new(
            TestId {
                name: "probe",
                tags: "",
                type_name: None,
            },
            SharedReporter::new(log.clone()),
        );
        RunGuard::install(context)
    }

    fn here() -> Location {
        Location {
            file: file!(),
            line: line!(),
        }
    }

    #[test]
    #[should_panic(expected = "no test is currently running")]
    fn reading_outside_a_run_is_fatal() {
        with_current(|context| context.assertion_count);
    }

    #[test]
    fn guard_installs_and_finish_hands_the_context_back() {
        let log = FailureLog::default();
        let guard = install(&log);
        assert!(try_with_current(|_| ()).is_some());
        bump_assertion_count();
        let context = guard.finish();
        assert_eq!(context.assertion_count, 1);
        assert!(try_with_current(|_| ()).is_none());
    }

    #[test]
    fn failure_marks_the_case_and_reaches_the_reporter() {
        let log = FailureLog::default();
        let guard = install(&log);
        report_failure_message(here(), "forced failure");
        let context = guard.finish();
        assert_eq!(context.state, TestState::Failed);
        assert_eq!(log.messages.borrow().as_slice(), ["forced failure [] {}"]);
    }

    #[test]
    fn tolerated_failure_keeps_the_case_green() {
        let log = FailureLog::default();
        let mut context = RunContext::new(
            TestId {
                name: "probe",
                tags: "[!mayfail]",
                type_name: None,
            },
            SharedReporter::new(log.clone()),
        );
        context.may_fail = true;
        let guard = RunGuard::install(context);
        report_failure_message(here(), "tolerated");
        let context = guard.finish();
        assert_eq!(context.state, TestState::Success);
        assert_eq!(log.messages.borrow().len(), 1);
    }

    #[test]
    fn skip_never_downgrades_a_failure() {
        let log = FailureLog::default();
        let guard = install(&log);
        report_failure_message(here(), "first");
        report_skip(here(), "then skipped");
        let context = guard.finish();
        assert_eq!(context.state, TestState::Failed);
    }

    #[test]
    fn expression_failure_carries_the_decomposed_values() {
        let log = FailureLog::default();
        let guard = install(&log);
        let mut expression = Expression::new("a == b");
        assert!(expression.actual_writer().append_str("1 != 2"));
        report_assertion_failed(here(), &expression);
        drop(guard.finish());
        assert_eq!(
            log.messages.borrow().as_slice(),
            ["a == b, got 1 != 2 [] {}"]
        );
    }

    #[test]
    fn failure_sees_open_sections_and_captures() {
        let log = FailureLog::default();
        let guard = install(&log);
        let section = SectionGuard::enter(SectionId {
            name: "outer",
            description: "",
        });
        assert!(section.entered());
        push_capture(CaptureEntry::from("i := 4"));
        let capture = CaptureGuard::new(1);
        report_failure_message(here(), "inside");
        drop(capture);
        drop(section);
        report_failure_message(here(), "outside");
        drop(guard.finish());
        assert_eq!(
            log.messages.borrow().as_slice(),
            ["inside [outer] {i := 4}", "outside [] {}"]
        );
    }

    #[test]
    fn capture_guard_releases_only_its_own_group() {
        let log = FailureLog::default();
        let guard = install(&log);
        push_capture(CaptureEntry::from("kept"));
        {
            push_capture(CaptureEntry::from("i := 0"));
            push_capture(CaptureEntry::from("j := 1"));
            let _group = CaptureGuard::new(2);
        }
        let remaining = with_current(|context| context.captures.len());
        assert_eq!(remaining, 1);
        drop(guard.finish());
    }
}
