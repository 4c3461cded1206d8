//! Command-line front end.
//!
//! This module is the entry point for the runner binary and orchestrates the
//! core library: it resolves a reporter from the arguments, hands the caller
//! a registry to populate, then dispatches to the list commands or a
//! filtered run. Filtering-pattern semantics live here, not in the core
//! engine.

use std::process;

use clap::{Parser, ValueEnum};
use termcolor::ColorChoice;

use crate::error::EngineError;
use crate::registry::{for_each_tag, Registry, Tag};
use crate::report::{
    ConsoleReporter, JsonReporter, NullReporter, SharedReporter, TeamCityReporter,
};

// ============================================================================
// CLI ARGUMENTS
// ============================================================================

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "tattle",
    version,
    about = "A fixed-capacity test engine with sections, captures, and matchers."
)]
pub struct EngineArgs {
    /// Run only the test cases whose full name contains this pattern.
    pub pattern: Option<String>,

    /// Treat the positional pattern as a bracketed '[tag]' filter.
    #[arg(short, long)]
    pub tags: bool,

    /// List every registered test case and exit.
    #[arg(short = 'l', long)]
    pub list_tests: bool,

    /// List every named tag and exit.
    #[arg(long)]
    pub list_tags: bool,

    /// List the test cases carrying the given '[tag]' and exit.
    #[arg(long, value_name = "TAG")]
    pub list_tests_with_tag: Option<String>,

    /// How much progress the console reporter prints.
    #[arg(short, long, value_enum, default_value_t = Verbosity::Normal)]
    pub verbosity: Verbosity,

    /// When console output is colorized.
    #[arg(long, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    /// Which reporter receives the event stream: console, teamcity, or json.
    #[arg(short, long, default_value = "console")]
    pub reporter: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Verbosity {
    /// Only the exit code.
    Quiet,
    /// Failures, skips, and the run summary.
    Normal,
    /// Every case start and finish as well.
    High,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    Always,
    Never,
    Auto,
}

impl ColorMode {
    fn choice(self) -> ColorChoice {
        match self {
            ColorMode::Always => ColorChoice::Always,
            ColorMode::Never => ColorChoice::Never,
            ColorMode::Auto => ColorChoice::Auto,
        }
    }
}

/// Builds the reporter named on the command line.
pub fn resolve_reporter(
    name: &str,
    choice: ColorChoice,
    verbosity: Verbosity,
) -> Result<SharedReporter, EngineError> {
    match name {
        "console" => Ok(match verbosity {
            Verbosity::Quiet => SharedReporter::new(NullReporter),
            Verbosity::Normal => SharedReporter::new(ConsoleReporter::new(choice, false)),
            Verbosity::High => SharedReporter::new(ConsoleReporter::new(choice, true)),
        }),
        "teamcity" => Ok(SharedReporter::new(TeamCityReporter::stdout())),
        "json" => Ok(SharedReporter::new(JsonReporter::stdout())),
        _ => Err(EngineError::UnknownReporter {
            name: name.to_string(),
        }),
    }
}

// ============================================================================
// LIST COMMANDS
// ============================================================================

fn named_tag(filter: &str) -> Result<&str, EngineError> {
    filter
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .filter(|name| !name.is_empty())
        .ok_or_else(|| EngineError::InvalidTagFilter {
            filter: filter.to_string(),
        })
}

fn carries_tag(tags: &str, name: &str) -> bool {
    let mut selected = false;
    for_each_tag(tags, |tag| {
        if tag == Tag::Named(name) {
            selected = true;
        }
    });
    selected
}

fn list_tests(registry: &Registry) {
    for case in registry.cases() {
        println!("{}", case.id.full_name());
    }
}

fn list_tags(registry: &Registry) {
    let tags = registry.tags();
    let mut sorted: Vec<&str> = tags.as_slice().to_vec();
    sorted.sort_unstable();
    for tag in sorted {
        println!("[{tag}]");
    }
}

fn list_tests_with_tag(registry: &Registry, filter: &str) -> Result<(), EngineError> {
    let name = named_tag(filter)?;
    for case in registry.cases() {
        if carries_tag(case.id.tags, name) {
            println!("{}", case.id.full_name());
        }
    }
    Ok(())
}

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

/// The main entry point for the CLI.
///
/// Parses the arguments, builds the requested reporter, lets `register`
/// populate the registry, then dispatches. The process exits non-zero when
/// any selected case fails.
pub fn run(register: impl FnOnce(&mut Registry)) {
    let args = EngineArgs::parse();
    if let Err(error) = dispatch(args, register) {
        eprintln!("error: {error}");
        process::exit(1);
    }
}

fn dispatch(args: EngineArgs, register: impl FnOnce(&mut Registry)) -> Result<(), EngineError> {
    let reporter = resolve_reporter(&args.reporter, args.color.choice(), args.verbosity)?;
    let mut registry = Registry::new(reporter);
    register(&mut registry);

    if args.list_tests {
        list_tests(&registry);
        return Ok(());
    }
    if let Some(filter) = args.list_tests_with_tag {
        return list_tests_with_tag(&registry, &filter);
    }
    if args.list_tags {
        list_tags(&registry);
        return Ok(());
    }

    let summary = match (args.pattern, args.tags) {
        (Some(filter), true) => registry.run_with_tag(&filter)?,
        (Some(pattern), false) => registry.run_matching_name(&pattern),
        (None, _) => registry.run_all(),
    };
    if !summary.success {
        process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_run_everything_through_the_console() {
        let args = EngineArgs::try_parse_from(["tattle"]).unwrap();
        assert_eq!(args.pattern, None);
        assert!(!args.tags);
        assert_eq!(args.verbosity, Verbosity::Normal);
        assert_eq!(args.color, ColorMode::Auto);
        assert_eq!(args.reporter, "console");
    }

    #[test]
    fn positional_pattern_and_tag_switch_parse_together() {
        let args = EngineArgs::try_parse_from(["tattle", "[physics]", "--tags"]).unwrap();
        assert_eq!(args.pattern.as_deref(), Some("[physics]"));
        assert!(args.tags);
    }

    #[test]
    fn short_flags_match_their_long_forms() {
        let args = EngineArgs::try_parse_from(["tattle", "-l", "-v", "high"]).unwrap();
        assert!(args.list_tests);
        assert_eq!(args.verbosity, Verbosity::High);
    }

    #[test]
    fn unknown_reporter_names_are_recoverable_errors() {
        let error = resolve_reporter("xml", ColorChoice::Never, Verbosity::Normal).unwrap_err();
        assert_eq!(
            error.to_string(),
            "unknown reporter 'xml': expected console, teamcity, or json"
        );
    }

    #[test]
    fn tag_filters_must_keep_the_bracketed_form() {
        assert_eq!(named_tag("[physics]").unwrap(), "physics");
        assert!(named_tag("physics").is_err());
        assert!(named_tag("[]").is_err());
        let error = named_tag("slow]").unwrap_err();
        assert_eq!(
            error.to_string(),
            "invalid tag filter 'slow]': must be of the form '[tag]'"
        );
    }

    #[test]
    fn tag_membership_sees_hidden_and_plain_groups() {
        assert!(carries_tag("[fast][math]", "math"));
        assert!(carries_tag("[.slow]", "slow"));
        assert!(!carries_tag("[fast]", "math"));
        assert!(!carries_tag("[!mayfail]", "!mayfail"));
    }
}
