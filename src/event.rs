//! Run lifecycle events.
//!
//! The engine reports progress as a stream of [`TestEvent`] values handed to
//! the active [`Reporter`](crate::report::Reporter). Events borrow views into
//! the run's transient state and must not be retained past the callback.

use serde::Serialize;

use crate::capture::CaptureEntry;
use crate::registry::{TestId, TestState};
use crate::section::SectionId;

/// Source position of a registration or assertion site.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Location {
    pub file: &'static str,
    pub line: u32,
}

/// One step of a test run, reported synchronously as it happens.
#[derive(Debug)]
pub enum TestEvent<'a> {
    RunStarted {
        name: &'a str,
    },
    RunEnded {
        name: &'a str,
        success: bool,
        run_count: usize,
        fail_count: usize,
        skip_count: usize,
        assertion_count: usize,
    },
    CaseStarted {
        id: &'a TestId,
    },
    CaseEnded {
        id: &'a TestId,
        state: TestState,
        assertion_count: usize,
        duration: f32,
    },
    AssertionFailed {
        id: &'a TestId,
        sections: &'a [SectionId],
        captures: &'a [CaptureEntry],
        location: Location,
        message: &'a str,
        /// The enclosing case is marked `[!shouldfail]`.
        expected: bool,
        /// The enclosing case is marked `[!mayfail]`.
        allowed: bool,
    },
    CaseSkipped {
        id: &'a TestId,
        sections: &'a [SectionId],
        captures: &'a [CaptureEntry],
        location: Location,
        message: &'a str,
    },
}
