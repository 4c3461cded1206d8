//! Assertion expression decomposition.
//!
//! When a checked comparison fails, the already-computed operand values are
//! rendered into a diagnostic string without re-evaluating the condition.
//! Operand types need no textual representation: rendering falls back to a
//! placeholder token, selected by reference-depth method resolution so no
//! trait bound ever reaches user code. If either operand exposes the
//! [`Matcher`] capability, the matcher's own description replaces raw
//! operand rendering.

use crate::limits::MAX_EXPR_LENGTH;
use crate::matchers::{MatchStatus, Matcher};
use crate::storage::{Append, SmallString, StrSpan};

/// The six decomposable comparison operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComparisonKind {
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Eq,
    NotEq,
}

impl ComparisonKind {
    /// Operator text for the relation as written.
    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonKind::Less => " < ",
            ComparisonKind::LessEq => " <= ",
            ComparisonKind::Greater => " > ",
            ComparisonKind::GreaterEq => " >= ",
            ComparisonKind::Eq => " == ",
            ComparisonKind::NotEq => " != ",
        }
    }

    /// Operator text for the relation's negation.
    pub fn negation(self) -> &'static str {
        match self {
            ComparisonKind::Less => " >= ",
            ComparisonKind::LessEq => " > ",
            ComparisonKind::Greater => " <= ",
            ComparisonKind::GreaterEq => " < ",
            ComparisonKind::Eq => " != ",
            ComparisonKind::NotEq => " == ",
        }
    }
}

/// One assertion's rendering state: the condition's source text plus the
/// decomposed value diagnostic. Built on failure, consumed by the report.
pub struct Expression {
    expected: &'static str,
    actual: SmallString<MAX_EXPR_LENGTH>,
}

impl Expression {
    pub fn new(expected: &'static str) -> Self {
        Self {
            expected,
            actual: SmallString::new(),
        }
    }

    pub fn expected(&self) -> &'static str {
        self.expected
    }

    pub fn actual(&self) -> &str {
        self.actual.as_str()
    }

    /// Drops the value diagnostic entirely. A partially rendered diagnostic
    /// is never shown truncated.
    pub fn discard_actual(&mut self) {
        self.actual.clear();
    }

    pub fn actual_writer(&mut self) -> StrSpan<'_> {
        self.actual.span()
    }

    fn append_actual(&mut self, piece: &str) -> bool {
        self.actual.append(piece)
    }
}

fn matcher_status(kind: ComparisonKind, expected: bool) -> MatchStatus {
    if (kind == ComparisonKind::Eq) == expected {
        MatchStatus::Failed
    } else {
        MatchStatus::Matched
    }
}

// ============================================================================
// VALUE RENDERING
// ============================================================================
// Call as `(&ValueView(&value)).render_value(out)` with both traits in
// scope: types implementing `Append` resolve to the rendering impl, all
// others fall back to the placeholder one reference level further out.

pub struct ValueView<'a, T: ?Sized>(pub &'a T);

pub trait RenderValue {
    fn render_value(&self, out: &mut StrSpan<'_>) -> bool;
}

impl<T: Append + ?Sized> RenderValue for ValueView<'_, T> {
    fn render_value(&self, out: &mut StrSpan<'_>) -> bool {
        self.0.append_to(out)
    }
}

pub trait RenderOpaque {
    fn render_value(&self, out: &mut StrSpan<'_>) -> bool;
}

impl<T: ?Sized> RenderOpaque for &ValueView<'_, T> {
    fn render_value(&self, out: &mut StrSpan<'_>) -> bool {
        out.append_str("?")
    }
}

// ============================================================================
// PAIR RENDERING
// ============================================================================
// Call as `(&&PairView(&lhs, &rhs)).render_pair(...)`. A matcher on the
// left operand wins, then a matcher on the right, then the plain
// "lhs <op> rhs" rendering from the pre-rendered operand texts.

pub struct PairView<'a, L: ?Sized, R: ?Sized>(pub &'a L, pub &'a R);

pub trait RenderMatcherRhs {
    fn render_pair(
        &self,
        kind: ComparisonKind,
        expected: bool,
        lhs_text: Option<&str>,
        rhs_text: Option<&str>,
        expr: &mut Expression,
    );
}

impl<L: ?Sized, R: Matcher<L>> RenderMatcherRhs for &PairView<'_, L, R> {
    fn render_pair(
        &self,
        kind: ComparisonKind,
        expected: bool,
        _lhs_text: Option<&str>,
        _rhs_text: Option<&str>,
        expr: &mut Expression,
    ) {
        let described = self.1.describe_match(self.0, matcher_status(kind, expected));
        expr.discard_actual();
        if !expr.append_actual(described.as_str()) {
            expr.discard_actual();
        }
    }
}

pub trait RenderMatcherLhs {
    fn render_pair(
        &self,
        kind: ComparisonKind,
        expected: bool,
        lhs_text: Option<&str>,
        rhs_text: Option<&str>,
        expr: &mut Expression,
    );
}

impl<L: Matcher<R>, R: ?Sized> RenderMatcherLhs for &&PairView<'_, L, R> {
    fn render_pair(
        &self,
        kind: ComparisonKind,
        expected: bool,
        _lhs_text: Option<&str>,
        _rhs_text: Option<&str>,
        expr: &mut Expression,
    ) {
        let described = self.0.describe_match(self.1, matcher_status(kind, expected));
        expr.discard_actual();
        if !expr.append_actual(described.as_str()) {
            expr.discard_actual();
        }
    }
}

pub trait RenderPair {
    fn render_pair(
        &self,
        kind: ComparisonKind,
        expected: bool,
        lhs_text: Option<&str>,
        rhs_text: Option<&str>,
        expr: &mut Expression,
    );
}

impl<L: ?Sized, R: ?Sized> RenderPair for PairView<'_, L, R> {
    fn render_pair(
        &self,
        kind: ComparisonKind,
        expected: bool,
        lhs_text: Option<&str>,
        rhs_text: Option<&str>,
        expr: &mut Expression,
    ) {
        let op = if expected { kind.negation() } else { kind.symbol() };
        let ok = match (lhs_text, rhs_text) {
            (Some(lhs), Some(rhs)) => {
                expr.append_actual(lhs) && expr.append_actual(op) && expr.append_actual(rhs)
            }
            _ => false,
        };
        if !ok {
            expr.discard_actual();
        }
    }
}
