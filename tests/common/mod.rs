//! Shared harness for the integration suites.
//!
//! Events borrow into the run's transient state, so the recording reporter
//! deep-copies every event into an owned mirror that the tests inspect after
//! the run has finished.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use tattle::event::TestEvent;
use tattle::registry::TestState;
use tattle::report::{Reporter, SharedReporter};

/// Owned deep copy of one [`TestEvent`].
#[derive(Clone, Debug, PartialEq)]
pub enum OwnedEvent {
    RunStarted {
        name: String,
    },
    RunEnded {
        name: String,
        success: bool,
        run_count: usize,
        fail_count: usize,
        skip_count: usize,
        assertion_count: usize,
    },
    CaseStarted {
        name: String,
    },
    CaseEnded {
        name: String,
        state: TestState,
        assertion_count: usize,
    },
    AssertionFailed {
        name: String,
        sections: Vec<String>,
        captures: Vec<String>,
        message: String,
        expected: bool,
        allowed: bool,
    },
    CaseSkipped {
        name: String,
        sections: Vec<String>,
        message: String,
    },
}

struct RecordingReporter {
    events: Rc<RefCell<Vec<OwnedEvent>>>,
}

impl Reporter for RecordingReporter {
    fn report(&mut self, event: &TestEvent<'_>) {
        let owned = match event {
            TestEvent::RunStarted { name } => OwnedEvent::RunStarted {
                name: name.to_string(),
            },
            TestEvent::RunEnded {
                name,
                success,
                run_count,
                fail_count,
                skip_count,
                assertion_count,
            } => OwnedEvent::RunEnded {
                name: name.to_string(),
                success: *success,
                run_count: *run_count,
                fail_count: *fail_count,
                skip_count: *skip_count,
                assertion_count: *assertion_count,
            },
            TestEvent::CaseStarted { id } => OwnedEvent::CaseStarted {
                name: id.full_name().as_str().to_string(),
            },
            TestEvent::CaseEnded {
                id,
                state,
                assertion_count,
                ..
            } => OwnedEvent::CaseEnded {
                name: id.full_name().as_str().to_string(),
                state: *state,
                assertion_count: *assertion_count,
            },
            TestEvent::AssertionFailed {
                id,
                sections,
                captures,
                message,
                expected,
                allowed,
                ..
            } => OwnedEvent::AssertionFailed {
                name: id.full_name().as_str().to_string(),
                sections: sections.iter().map(|s| s.name.to_string()).collect(),
                captures: captures.iter().map(|c| c.as_str().to_string()).collect(),
                message: message.to_string(),
                expected: *expected,
                allowed: *allowed,
            },
            TestEvent::CaseSkipped {
                id,
                sections,
                message,
                ..
            } => OwnedEvent::CaseSkipped {
                name: id.full_name().as_str().to_string(),
                sections: sections.iter().map(|s| s.name.to_string()).collect(),
                message: message.to_string(),
            },
        };
        self.events.borrow_mut().push(owned);
    }
}

/// Handle onto the recorded event stream of one run.
#[derive(Clone, Default)]
pub struct Recording {
    events: Rc<RefCell<Vec<OwnedEvent>>>,
}

impl Recording {
    pub fn reporter(&self) -> SharedReporter {
        SharedReporter::new(RecordingReporter {
            events: self.events.clone(),
        })
    }

    pub fn events(&self) -> Vec<OwnedEvent> {
        self.events.borrow().clone()
    }

    pub fn failures(&self) -> Vec<OwnedEvent> {
        self.events()
            .into_iter()
            .filter(|event| matches!(event, OwnedEvent::AssertionFailed { .. }))
            .collect()
    }

    pub fn failure_messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                OwnedEvent::AssertionFailed { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn started_cases(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                OwnedEvent::CaseStarted { name } => Some(name),
                _ => None,
            })
            .collect()
    }
}

/// `io::Write` view onto a shared byte buffer, for reporters that own their
/// writer.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
