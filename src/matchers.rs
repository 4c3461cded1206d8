//! User-extensible match capability.
//!
//! Any type implementing [`Matcher`] may appear as a comparison operand in
//! an assertion; when the assertion fails, the matcher's own description
//! replaces the raw operand rendering.

use crate::limits::MAX_MESSAGE_LENGTH;
use crate::storage::{Append, SmallString};

/// Whether the described match succeeded or failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchStatus {
    Failed,
    Matched,
}

pub type MatchDescription = SmallString<MAX_MESSAGE_LENGTH>;

/// A match test plus a human-readable account of its outcome.
pub trait Matcher<T: ?Sized> {
    fn match_value(&self, value: &T) -> bool;
    fn describe_match(&self, value: &T, status: MatchStatus) -> MatchDescription;
}

// ============================================================================
// BUILT-IN MATCHERS
// ============================================================================

pub struct ContainsSubstring {
    substring: &'static str,
}

/// Matches any string-like value containing `substring`.
pub fn contains_substring(substring: &'static str) -> ContainsSubstring {
    ContainsSubstring { substring }
}

impl<T: AsRef<str> + ?Sized> Matcher<T> for ContainsSubstring {
    fn match_value(&self, value: &T) -> bool {
        value.as_ref().contains(self.substring)
    }

    fn describe_match(&self, value: &T, status: MatchStatus) -> MatchDescription {
        let mut out = MatchDescription::new();
        out.append_or_truncate(match status {
            MatchStatus::Matched => "found '",
            MatchStatus::Failed => "could not find '",
        });
        out.append_or_truncate(self.substring);
        out.append_or_truncate("' in '");
        out.append_or_truncate(value.as_ref());
        out.append_or_truncate("'");
        out
    }
}

pub struct IsAnyOf<T, const N: usize> {
    items: [T; N],
}

/// Matches any value equal to one of `items`.
pub fn is_any_of<T, const N: usize>(items: [T; N]) -> IsAnyOf<T, N> {
    IsAnyOf { items }
}

impl<T: PartialEq + Append, const N: usize> Matcher<T> for IsAnyOf<T, N> {
    fn match_value(&self, value: &T) -> bool {
        self.items.iter().any(|item| item == value)
    }

    fn describe_match(&self, value: &T, status: MatchStatus) -> MatchDescription {
        let mut out = MatchDescription::new();
        out.append_or_truncate("'");
        out.append_or_truncate(value);
        out.append_or_truncate(match status {
            MatchStatus::Matched => "' was found in {",
            MatchStatus::Failed => "' was not found in {",
        });
        let mut first = true;
        for item in &self.items {
            if !first {
                out.append_or_truncate(", ");
            }
            first = false;
            out.append_or_truncate("'");
            out.append_or_truncate(item);
            out.append_or_truncate("'");
        }
        out.append_or_truncate("}");
        out
    }
}

// ============================================================================
// COMPARISON SUGAR
// ============================================================================
// Lets the built-in matchers appear directly as assertion operands.

impl PartialEq<ContainsSubstring> for &str {
    fn eq(&self, matcher: &ContainsSubstring) -> bool {
        matcher.match_value(*self)
    }
}

impl PartialEq<ContainsSubstring> for String {
    fn eq(&self, matcher: &ContainsSubstring) -> bool {
        matcher.match_value(self.as_str())
    }
}

impl PartialEq<&str> for ContainsSubstring {
    fn eq(&self, value: &&str) -> bool {
        self.match_value(*value)
    }
}

impl PartialEq<String> for ContainsSubstring {
    fn eq(&self, value: &String) -> bool {
        self.match_value(value.as_str())
    }
}

impl<T: PartialEq + Append, const N: usize> PartialEq<T> for IsAnyOf<T, N> {
    fn eq(&self, value: &T) -> bool {
        self.match_value(value)
    }
}
