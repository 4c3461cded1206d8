//! Reporters.
//!
//! A reporter receives every [`TestEvent`] synchronously as the run
//! produces it. The console reporter renders a human-readable account, the
//! TeamCity reporter speaks the build-server service-message protocol, and
//! the JSON reporter emits one object per event for machine consumption.
//! Write errors on the output stream are ignored; reporting must never
//! disturb the run itself.

use std::cell::{RefCell, RefMut};
use std::io::{self, Write};
use std::rc::Rc;

use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::capture::CaptureEntry;
use crate::event::{Location, TestEvent};
use crate::limits::{MAX_MESSAGE_LENGTH, MAX_TEST_NAME_LENGTH};
use crate::registry::{TestId, TestState};
use crate::section::SectionId;
use crate::storage::SmallString;

/// Receives each run lifecycle event as it happens.
pub trait Reporter {
    fn report(&mut self, event: &TestEvent<'_>);
}

/// Swallows every event, for running without output.
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&mut self, _event: &TestEvent<'_>) {}
}

/// Ergonomic wrapper for a shared, mutable reporter handle.
#[derive(Clone)]
pub struct SharedReporter(pub Rc<RefCell<dyn Reporter>>);

impl std::fmt::Debug for SharedReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedReporter").finish_non_exhaustive()
    }
}

impl SharedReporter {
    /// Create a new SharedReporter from any Reporter.
    pub fn new<R: Reporter + 'static>(reporter: R) -> Self {
        SharedReporter(Rc::new(RefCell::new(reporter)))
    }

    /// Forward one event to the reporter.
    pub fn report(&self, event: &TestEvent<'_>) {
        self.0.borrow_mut().report(event);
    }

    /// Borrow the reporter mutably (for advanced use).
    pub fn borrow_mut(&self) -> RefMut<'_, dyn Reporter> {
        self.0.borrow_mut()
    }
}

// ============================================================================
// CONSOLE REPORTER
// ============================================================================

/// Human-readable reporter, colorized when the terminal allows.
pub struct ConsoleReporter {
    stream: StandardStream,
    verbose: bool,
}

impl ConsoleReporter {
    pub fn new(choice: ColorChoice, verbose: bool) -> Self {
        Self {
            stream: StandardStream::stdout(choice),
            verbose,
        }
    }

    fn colored(&mut self, text: &str, color: Color, bold: bool) {
        let _ = self
            .stream
            .set_color(ColorSpec::new().set_fg(Some(color)).set_bold(bold));
        let _ = write!(self.stream, "{text}");
        let _ = self.stream.reset();
    }

    fn plain(&mut self, text: &str) {
        let _ = write!(self.stream, "{text}");
    }

    fn location_block(
        &mut self,
        id: &TestId,
        sections: &[SectionId],
        captures: &[CaptureEntry],
        location: Location,
    ) {
        self.plain("running test case \"");
        self.colored(id.name, Color::Cyan, false);
        self.plain("\"\n");
        for section in sections {
            self.plain("          in section \"");
            self.colored(section.name, Color::Cyan, false);
            self.plain("\"\n");
        }
        let _ = writeln!(self.stream, "          at {}:{}", location.file, location.line);
        if let Some(type_name) = id.type_name {
            self.plain("          for type ");
            self.colored(type_name, Color::Cyan, false);
            self.plain("\n");
        }
        for capture in captures {
            self.plain("          with ");
            self.colored(capture.as_str(), Color::Cyan, false);
            self.plain("\n");
        }
    }
}

impl Reporter for ConsoleReporter {
    fn report(&mut self, event: &TestEvent<'_>) {
        match event {
            TestEvent::RunStarted { .. } => {
                self.plain("starting tests with ");
                self.colored(
                    concat!("tattle v", env!("CARGO_PKG_VERSION")),
                    Color::Cyan,
                    true,
                );
                self.plain("\n==========================================\n");
            }
            TestEvent::RunEnded {
                success,
                run_count,
                fail_count,
                skip_count,
                assertion_count,
                ..
            } => {
                self.plain("==========================================\n");
                if *success {
                    self.colored("success:", Color::Green, true);
                    let _ = write!(
                        self.stream,
                        " all tests passed ({run_count} test cases, {assertion_count} assertions"
                    );
                } else {
                    self.colored("error:", Color::Red, true);
                    let _ = write!(
                        self.stream,
                        " some tests failed ({fail_count} out of {run_count} test cases, \
                         {assertion_count} assertions"
                    );
                }
                if *skip_count > 0 {
                    let _ = write!(self.stream, ", {skip_count} test cases skipped");
                }
                self.plain(")\n");
            }
            TestEvent::CaseStarted { id } => {
                if self.verbose {
                    self.colored("starting:", Color::Blue, false);
                    let _ = writeln!(self.stream, " {}", id.full_name());
                }
            }
            TestEvent::CaseEnded { id, duration, .. } => {
                if self.verbose {
                    self.colored("finished:", Color::Blue, false);
                    let _ = writeln!(self.stream, " {} ({duration}s)", id.full_name());
                }
            }
            TestEvent::AssertionFailed {
                id,
                sections,
                captures,
                location,
                message,
                expected,
                ..
            } => {
                if *expected {
                    self.colored("expected failure: ", Color::Green, true);
                } else {
                    self.colored("failed: ", Color::Red, true);
                }
                self.location_block(id, sections, captures, *location);
                self.plain("          ");
                self.colored(message, Color::Yellow, false);
                self.plain("\n");
            }
            TestEvent::CaseSkipped {
                id,
                sections,
                captures,
                location,
                message,
            } => {
                self.colored("skipped: ", Color::Yellow, true);
                self.location_block(id, sections, captures, *location);
                self.plain("          ");
                self.colored(message, Color::Yellow, false);
                self.plain("\n");
            }
        }
    }
}

// ============================================================================
// TEAMCITY REPORTER
// ============================================================================

/// Escapes TeamCity service-message metacharacters in place. Truncates when
/// the escaped text no longer fits.
fn escape_in_place<const N: usize>(string: &mut SmallString<N>) {
    if !string.replace_all("|", "||")
        || !string.replace_all("'", "|'")
        || !string.replace_all("\n", "|n")
        || !string.replace_all("\r", "|r")
        || !string.replace_all("[", "|[")
        || !string.replace_all("]", "|]")
    {
        string.truncate_end();
    }
}

fn escaped(text: &str) -> SmallString<MAX_MESSAGE_LENGTH> {
    let mut out: SmallString<MAX_MESSAGE_LENGTH> = SmallString::new();
    out.append_or_truncate(text);
    escape_in_place(&mut out);
    out
}

fn teamcity_name(id: &TestId) -> SmallString<MAX_TEST_NAME_LENGTH> {
    let mut name: SmallString<MAX_TEST_NAME_LENGTH> = SmallString::new();
    name.append_or_truncate(id.name);
    if let Some(type_name) = id.type_name {
        name.append_or_truncate("(\"");
        name.append_or_truncate(type_name);
        name.append_or_truncate("\")");
    }
    escape_in_place(&mut name);
    name
}

fn teamcity_message(
    location: Location,
    sections: &[SectionId],
    captures: &[CaptureEntry],
    message: &str,
) -> SmallString<MAX_MESSAGE_LENGTH> {
    let mut full: SmallString<MAX_MESSAGE_LENGTH> = SmallString::new();
    full.append_or_truncate(location.file);
    full.append_or_truncate(":");
    full.append_or_truncate(location.line);
    full.append_or_truncate("\n");
    for section in sections {
        full.append_or_truncate(section.name);
        full.append_or_truncate("\n");
    }
    for capture in captures {
        full.append_or_truncate(capture);
        full.append_or_truncate("\n");
    }
    full.append_or_truncate("  ");
    full.append_or_truncate(message);
    escape_in_place(&mut full);
    full
}

/// Reporter speaking the TeamCity service-message protocol.
pub struct TeamCityReporter<W: Write> {
    writer: W,
}

impl TeamCityReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self {
            writer: io::stdout(),
        }
    }
}

impl<W: Write> TeamCityReporter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    fn send(&mut self, message: &str, args: &[(&str, &str)]) {
        let _ = write!(self.writer, "##teamCity[{message}");
        for (key, value) in args {
            let _ = write!(self.writer, " {key}='{value}'");
        }
        let _ = writeln!(self.writer, "]");
    }
}

impl<W: Write> Reporter for TeamCityReporter<W> {
    fn report(&mut self, event: &TestEvent<'_>) {
        match event {
            TestEvent::RunStarted { name } => {
                self.send("testSuiteStarted", &[("name", escaped(name).as_str())]);
            }
            TestEvent::RunEnded { name, .. } => {
                self.send("testSuiteFinished", &[("name", escaped(name).as_str())]);
            }
            TestEvent::CaseStarted { id } => {
                self.send("testStarted", &[("name", teamcity_name(id).as_str())]);
            }
            TestEvent::CaseEnded { id, duration, .. } => {
                let mut micros: SmallString<32> = SmallString::new();
                micros.append_or_truncate((duration * 1e6) as usize);
                self.send(
                    "testFinished",
                    &[
                        ("name", teamcity_name(id).as_str()),
                        ("duration", micros.as_str()),
                    ],
                );
            }
            TestEvent::AssertionFailed {
                id,
                sections,
                captures,
                location,
                message,
                ..
            } => {
                self.send(
                    "testFailed",
                    &[
                        ("name", teamcity_name(id).as_str()),
                        (
                            "message",
                            teamcity_message(*location, sections, captures, message).as_str(),
                        ),
                    ],
                );
            }
            TestEvent::CaseSkipped {
                id,
                sections,
                captures,
                location,
                message,
            } => {
                self.send(
                    "testIgnored",
                    &[
                        ("name", teamcity_name(id).as_str()),
                        (
                            "message",
                            teamcity_message(*location, sections, captures, message).as_str(),
                        ),
                    ],
                );
            }
        }
    }
}

// ============================================================================
// JSON REPORTER
// ============================================================================

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum JsonRow {
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
        duration: f32,
    },
    AssertionFailed {
        name: String,
        sections: Vec<String>,
        captures: Vec<String>,
        file: String,
        line: u32,
        message: String,
        expected: bool,
        allowed: bool,
    },
    CaseSkipped {
        name: String,
        sections: Vec<String>,
        captures: Vec<String>,
        file: String,
        line: u32,
        message: String,
    },
}

fn section_names(sections: &[SectionId]) -> Vec<String> {
    sections.iter().map(|s| s.name.to_string()).collect()
}

fn capture_texts(captures: &[CaptureEntry]) -> Vec<String> {
    captures.iter().map(|c| c.as_str().to_string()).collect()
}

/// Reporter emitting one JSON object per event, newline-delimited.
pub struct JsonReporter<W: Write> {
    writer: W,
}

impl JsonReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self {
            writer: io::stdout(),
        }
    }
}

impl<W: Write> JsonReporter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> Reporter for JsonReporter<W> {
    fn report(&mut self, event: &TestEvent<'_>) {
        let row = match event {
            TestEvent::RunStarted { name } => JsonRow::RunStarted {
                name: name.to_string(),
            },
            TestEvent::RunEnded {
                name,
                success,
                run_count,
                fail_count,
                skip_count,
                assertion_count,
            } => JsonRow::RunEnded {
                name: name.to_string(),
                success: *success,
                run_count: *run_count,
                fail_count: *fail_count,
                skip_count: *skip_count,
                assertion_count: *assertion_count,
            },
            TestEvent::CaseStarted { id } => JsonRow::CaseStarted {
                name: id.full_name().as_str().to_string(),
            },
            TestEvent::CaseEnded {
                id,
                state,
                assertion_count,
                duration,
            } => JsonRow::CaseEnded {
                name: id.full_name().as_str().to_string(),
                state: *state,
                assertion_count: *assertion_count,
                duration: *duration,
            },
            TestEvent::AssertionFailed {
                id,
                sections,
                captures,
                location,
                message,
                expected,
                allowed,
            } => JsonRow::AssertionFailed {
                name: id.full_name().as_str().to_string(),
                sections: section_names(sections),
                captures: capture_texts(captures),
                file: location.file.to_string(),
                line: location.line,
                message: message.to_string(),
                expected: *expected,
                allowed: *allowed,
            },
            TestEvent::CaseSkipped {
                id,
                sections,
                captures,
                location,
                message,
            } => JsonRow::CaseSkipped {
                name: id.full_name().as_str().to_string(),
                sections: section_names(sections),
                captures: capture_texts(captures),
                file: location.file.to_string(),
                line: location.line,
                message: message.to_string(),
            },
        };
        if serde_json::to_writer(&mut self.writer, &row).is_ok() {
            let _ = self.writer.write_all(b"\n");
        }
    }
}
