//! Compile-time capacity ceilings for every bounded structure in the
//! engine.
//!
//! Exceeding any of these limits is a configuration error, not a test
//! outcome: the offending operation terminates the process. Raise the
//! constant and rebuild if a limit is genuinely too low.

/// Maximum number of test cases a single registry can hold.
pub const MAX_TEST_CASES: usize = 256;

/// Maximum nesting depth of sections inside one test body.
pub const MAX_NESTED_SECTIONS: usize = 8;

/// Maximum number of simultaneously open captures in one test run.
pub const MAX_CAPTURES: usize = 8;

/// Maximum rendered length of a single captured value, in bytes.
pub const MAX_CAPTURE_LENGTH: usize = 256;

/// Maximum rendered length of a decomposed assertion expression, in bytes.
pub const MAX_EXPR_LENGTH: usize = 1024;

/// Maximum length of a fully composed diagnostic message, in bytes.
pub const MAX_MESSAGE_LENGTH: usize = 4096;

/// Maximum length of a full test name ("name [type]"), in bytes.
pub const MAX_TEST_NAME_LENGTH: usize = 1024;

/// Maximum number of distinct tags across all registered test cases.
pub const MAX_UNIQUE_TAGS: usize = 256;
