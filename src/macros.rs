//! Assertion, section, and capture macros.
//!
//! These are the entry points test bodies actually write. The checking
//! macros split their condition on the first top-level comparison operator
//! and hand both operands to the decomposition protocol in [`expr`], so a
//! failure shows the already-computed values instead of re-evaluating the
//! condition. Chaining comparison or logical operators inside one check is
//! rejected at expansion time; parenthesize the condition to opt out of
//! decomposition, and parenthesize any operand whose tokens contain a bare
//! `<` or `>` (turbofish, generic arguments).
//!
//! `require!`-class macros abort the current body invocation by returning
//! the abort signal, so they only expand inside functions returning
//! [`TestReturn`](crate::runtime::TestReturn). `check!`-class macros let the
//! body continue.
//!
//! [`expr`]: crate::expr

/// Condition splitter and failure rendering shared by the checking macros.
///
/// Not public API. The `@split` rules accumulate left-operand tokens until
/// they hit a comparison operator; `@guard` rejects a second operator on the
/// right-hand side; `@binary`/`@unary` expand the actual check.
#[doc(hidden)]
#[macro_export]
macro_rules! __tattle_check {
    // ------------------------------------------------------------------
    // condition splitting
    (@split $ctx:tt [$($lhs:tt)+] == $($rhs:tt)+) => {
        $crate::__tattle_check!(@binary $ctx [$($lhs)+] [$($rhs)+] Eq ==)
    };
    (@split $ctx:tt [$($lhs:tt)+] != $($rhs:tt)+) => {
        $crate::__tattle_check!(@binary $ctx [$($lhs)+] [$($rhs)+] NotEq !=)
    };
    (@split $ctx:tt [$($lhs:tt)+] <= $($rhs:tt)+) => {
        $crate::__tattle_check!(@binary $ctx [$($lhs)+] [$($rhs)+] LessEq <=)
    };
    (@split $ctx:tt [$($lhs:tt)+] >= $($rhs:tt)+) => {
        $crate::__tattle_check!(@binary $ctx [$($lhs)+] [$($rhs)+] GreaterEq >=)
    };
    (@split $ctx:tt [$($lhs:tt)+] < $($rhs:tt)+) => {
        $crate::__tattle_check!(@binary $ctx [$($lhs)+] [$($rhs)+] Less <)
    };
    (@split $ctx:tt [$($lhs:tt)+] > $($rhs:tt)+) => {
        $crate::__tattle_check!(@binary $ctx [$($lhs)+] [$($rhs)+] Greater >)
    };
    (@split $ctx:tt [$($lhs:tt)*] && $($rest:tt)*) => {
        compile_error!(
            "cannot decompose a condition containing `&&`; split the check or parenthesize the condition"
        )
    };
    (@split $ctx:tt [$($lhs:tt)*] || $($rest:tt)*) => {
        compile_error!(
            "cannot decompose a condition containing `||`; split the check or parenthesize the condition"
        )
    };
    (@split $ctx:tt [$($lhs:tt)*] $head:tt $($rest:tt)*) => {
        $crate::__tattle_check!(@split $ctx [$($lhs)* $head] $($rest)*)
    };
    (@split $ctx:tt [$($lhs:tt)+]) => {
        $crate::__tattle_check!(@unary $ctx [$($lhs)+])
    };

    // ------------------------------------------------------------------
    // right-operand guard
    (@guard) => {};
    (@guard == $($rest:tt)*) => {
        compile_error!("cannot chain comparisons in one check; split it into multiple checks");
    };
    (@guard != $($rest:tt)*) => {
        compile_error!("cannot chain comparisons in one check; split it into multiple checks");
    };
    (@guard <= $($rest:tt)*) => {
        compile_error!("cannot chain comparisons in one check; split it into multiple checks");
    };
    (@guard >= $($rest:tt)*) => {
        compile_error!("cannot chain comparisons in one check; split it into multiple checks");
    };
    (@guard < $($rest:tt)*) => {
        compile_error!("cannot chain comparisons in one check; split it into multiple checks");
    };
    (@guard > $($rest:tt)*) => {
        compile_error!("cannot chain comparisons in one check; split it into multiple checks");
    };
    (@guard && $($rest:tt)*) => {
        compile_error!("cannot chain comparisons in one check; split it into multiple checks");
    };
    (@guard || $($rest:tt)*) => {
        compile_error!("cannot chain comparisons in one check; split it into multiple checks");
    };
    (@guard $head:tt $($rest:tt)*) => {
        $crate::__tattle_check!(@guard $($rest)*);
    };

    // ------------------------------------------------------------------
    // expansion
    (@binary ($name:literal, $mode:ident, $expected:literal) [$($lhs:tt)+] [$($rhs:tt)+] $kind:ident $op:tt) => {{
        $crate::__tattle_check!(@guard $($rhs)+);
        use $crate::expr::{
            RenderMatcherLhs as _, RenderMatcherRhs as _, RenderOpaque as _, RenderPair as _,
            RenderValue as _,
        };
        $crate::runtime::bump_assertion_count();
        let lhs = &($($lhs)+);
        let rhs = &($($rhs)+);
        if (lhs $op rhs) != $expected {
            let location = $crate::event::Location {
                file: file!(),
                line: line!(),
            };
            let mut expression = $crate::expr::Expression::new(concat!(
                $name,
                "(",
                stringify!($($lhs)+ $op $($rhs)+),
                ")"
            ));
            let mut lhs_text: $crate::storage::SmallString<{ $crate::limits::MAX_EXPR_LENGTH }> =
                $crate::storage::SmallString::new();
            let mut rhs_text: $crate::storage::SmallString<{ $crate::limits::MAX_EXPR_LENGTH }> =
                $crate::storage::SmallString::new();
            let lhs_ok = (&$crate::expr::ValueView(lhs)).render_value(&mut lhs_text.span());
            let rhs_ok = (&$crate::expr::ValueView(rhs)).render_value(&mut rhs_text.span());
            (&&$crate::expr::PairView(lhs, rhs)).render_pair(
                $crate::expr::ComparisonKind::$kind,
                $expected,
                if lhs_ok {
                    ::core::option::Option::Some(lhs_text.as_str())
                } else {
                    ::core::option::Option::None
                },
                if rhs_ok {
                    ::core::option::Option::Some(rhs_text.as_str())
                } else {
                    ::core::option::Option::None
                },
                &mut expression,
            );
            $crate::runtime::report_assertion_failed(location, &expression);
            $crate::__tattle_check!(@finish $mode);
        }
    }};
    (@unary ($name:literal, $mode:ident, $expected:literal) [$($cond:tt)+]) => {{
        use $crate::expr::{RenderOpaque as _, RenderValue as _};
        $crate::runtime::bump_assertion_count();
        let value = &($($cond)+);
        if *value != $expected {
            let location = $crate::event::Location {
                file: file!(),
                line: line!(),
            };
            let mut expression = $crate::expr::Expression::new(concat!(
                $name,
                "(",
                stringify!($($cond)+),
                ")"
            ));
            if !(&$crate::expr::ValueView(value)).render_value(&mut expression.actual_writer()) {
                expression.discard_actual();
            }
            $crate::runtime::report_assertion_failed(location, &expression);
            $crate::__tattle_check!(@finish $mode);
        }
    }};
    (@finish keep) => {};
    (@finish abort) => {
        return ::core::result::Result::Err($crate::runtime::TestAbort);
    };
}

/// Checks a condition; on failure, reports the decomposed values and lets
/// the body continue.
#[macro_export]
macro_rules! check {
    ($($condition:tt)+) => {
        $crate::__tattle_check!(@split ("check!", keep, true) [] $($condition)+)
    };
}

/// Checks a condition; on failure, reports the decomposed values and aborts
/// the current body invocation.
#[macro_export]
macro_rules! require {
    ($($condition:tt)+) => {
        $crate::__tattle_check!(@split ("require!", abort, true) [] $($condition)+)
    };
}

/// Checks that a condition is false; the body continues on failure.
#[macro_export]
macro_rules! check_false {
    ($($condition:tt)+) => {
        $crate::__tattle_check!(@split ("check_false!", keep, false) [] $($condition)+)
    };
}

/// Checks that a condition is false; aborts the body invocation on failure.
#[macro_export]
macro_rules! require_false {
    ($($condition:tt)+) => {
        $crate::__tattle_check!(@split ("require_false!", abort, false) [] $($condition)+)
    };
}

/// Checks a value against an explicit [`Matcher`](crate::matchers::Matcher);
/// the body continues on failure.
#[macro_export]
macro_rules! check_that {
    ($value:expr, $matcher:expr) => {{
        $crate::runtime::bump_assertion_count();
        let value = &($value);
        let matcher = &($matcher);
        if !$crate::matchers::Matcher::match_value(matcher, value) {
            let location = $crate::event::Location {
                file: file!(),
                line: line!(),
            };
            let described = $crate::matchers::Matcher::describe_match(
                matcher,
                value,
                $crate::matchers::MatchStatus::Failed,
            );
            $crate::runtime::report_failure_message(location, described.as_str());
        }
    }};
}

/// Checks a value against an explicit matcher; aborts the body invocation
/// on failure.
#[macro_export]
macro_rules! require_that {
    ($value:expr, $matcher:expr) => {{
        $crate::runtime::bump_assertion_count();
        let value = &($value);
        let matcher = &($matcher);
        if !$crate::matchers::Matcher::match_value(matcher, value) {
            let location = $crate::event::Location {
                file: file!(),
                line: line!(),
            };
            let described = $crate::matchers::Matcher::describe_match(
                matcher,
                value,
                $crate::matchers::MatchStatus::Failed,
            );
            $crate::runtime::report_failure_message(location, described.as_str());
            return ::core::result::Result::Err($crate::runtime::TestAbort);
        }
    }};
}

/// Reports an unconditional failure and aborts the body invocation.
#[macro_export]
macro_rules! fail {
    ($message:expr) => {{
        $crate::runtime::bump_assertion_count();
        let location = $crate::event::Location {
            file: file!(),
            line: line!(),
        };
        let mut message: $crate::storage::SmallString<{ $crate::limits::MAX_MESSAGE_LENGTH }> =
            $crate::storage::SmallString::new();
        message.append_or_truncate(&($message));
        $crate::runtime::report_failure_message(location, message.as_str());
        return ::core::result::Result::Err($crate::runtime::TestAbort);
    }};
}

/// Reports an unconditional failure and lets the body continue.
#[macro_export]
macro_rules! fail_check {
    ($message:expr) => {{
        $crate::runtime::bump_assertion_count();
        let location = $crate::event::Location {
            file: file!(),
            line: line!(),
        };
        let mut message: $crate::storage::SmallString<{ $crate::limits::MAX_MESSAGE_LENGTH }> =
            $crate::storage::SmallString::new();
        message.append_or_truncate(&($message));
        $crate::runtime::report_failure_message(location, message.as_str());
    }};
}

/// Marks the case skipped and aborts the body invocation. Skips never count
/// as failures.
#[macro_export]
macro_rules! skip {
    ($message:expr) => {{
        let location = $crate::event::Location {
            file: file!(),
            line: line!(),
        };
        let mut message: $crate::storage::SmallString<{ $crate::limits::MAX_MESSAGE_LENGTH }> =
            $crate::storage::SmallString::new();
        message.append_or_truncate(&($message));
        $crate::runtime::report_skip(location, message.as_str());
        return ::core::result::Result::Err($crate::runtime::TestAbort);
    }};
}

/// Declares one section of a test body. The block runs only on the passes
/// the walker selects it; see [`section`](crate::section) for the protocol.
#[macro_export]
macro_rules! section {
    ($name:expr, $body:block) => {
        $crate::section!($name, "", $body)
    };
    ($name:expr, $description:expr, $body:block) => {{
        let section = $crate::runtime::SectionGuard::enter($crate::section::SectionId {
            name: $name,
            description: $description,
        });
        if section.entered() {
            $body
        }
    }};
}

/// Captures named values for the rest of the enclosing scope. Failures
/// reported while the scope is open carry one `name := value` entry per
/// argument, in declaration order.
#[macro_export]
macro_rules! capture {
    ($($value:expr),+ $(,)?) => {
        $(
            {
                use $crate::expr::{RenderOpaque as _, RenderValue as _};
                let mut entry = $crate::capture::CaptureEntry::new();
                entry.append_or_truncate(concat!(stringify!($value), " := "));
                let value = &($value);
                if !(&$crate::expr::ValueView(value)).render_value(&mut entry.span()) {
                    entry.truncate_end();
                }
                $crate::runtime::push_capture(entry);
            }
        )+
        let _captured = $crate::runtime::CaptureGuard::new([$(stringify!($value)),+].len());
    };
}

/// Captures one free-form message for the rest of the enclosing scope. All
/// arguments are rendered into a single entry, in order.
#[macro_export]
macro_rules! info {
    ($($piece:expr),+ $(,)?) => {
        {
            use $crate::expr::{RenderOpaque as _, RenderValue as _};
            let mut entry = $crate::capture::CaptureEntry::new();
            $(
                {
                    let piece = &($piece);
                    if !(&$crate::expr::ValueView(piece)).render_value(&mut entry.span()) {
                        entry.truncate_end();
                    }
                }
            )+
            $crate::runtime::push_capture(entry);
        }
        let _captured = $crate::runtime::CaptureGuard::new(1);
    };
}

/// Registers a test body, wrapping the block so authors never spell out the
/// `Ok(())` tail.
#[macro_export]
macro_rules! test_case {
    ($registry:expr, $name:expr, $tags:expr, $body:block) => {
        $registry.add(
            $name,
            $tags,
            $crate::event::Location {
                file: file!(),
                line: line!(),
            },
            || {
                $body
                ::core::result::Result::Ok(())
            },
        )
    };
    ($registry:expr, $name:expr, $tags:expr, <$ty:ty>, $body:block) => {
        $registry.add_with_type::<$ty>(
            $name,
            $tags,
            $crate::event::Location {
                file: file!(),
                line: line!(),
            },
            || {
                $body
                ::core::result::Result::Ok(())
            },
        )
    };
}
