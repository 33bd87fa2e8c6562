//! The error collection and rendering model. Parsing and evaluation never
//! panic or use Rust's `?`-propagated errors as control flow outward to the
//! driver; instead every failure is appended to an [ErrorCollector] alongside
//! the token that triggered it, and the driver inspects the collector once
//! the walk is done.

use crate::token::Token;
use itertools::Itertools;
use std::fmt;
use thiserror::Error;

/// The fixed set of error kinds the evaluator can report, grouped the way
/// they're grouped in the error-handling design: lexical, structural, name
/// resolution, call, and assignment failures.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EvalError {
    #[error("unsupported syntax")]
    UnsupportedSyntax,

    #[error("unterminated quoted string")]
    UnterminatedString,

    #[error("unbalanced parentheses")]
    UnbalancedParens,

    #[error("unexpected tokens after the end of the expression")]
    TrailingTokens,

    #[error("poorly terminated expression")]
    PoorlyTerminatedExpression,

    #[error("operator applied to an empty stack")]
    EmptyStack,

    #[error("unbalanced equation")]
    UnbalancedEquation,

    #[error("`{name}` is not a registered variable, reserved word, or function")]
    UndefinedName { name: String },

    #[error("`{name}` is not a registered function")]
    UndefinedFunction { name: String },

    #[error(
        "`{name}` does not accept {got} argument(s)"
    )]
    WrongArity { name: String, got: usize },

    #[error("`{name}`: {source}")]
    Call {
        name: String,
        #[source]
        source: CallError,
    },

    #[error("`{name}` is not a known variable and cannot be assigned to")]
    NotAssignable { name: String },

    #[error("division by zero")]
    DivisionByZero,
}

/// The error a function catalog entry raises when it fails at runtime (bad
/// argument value, host-side failure, etc). Kept distinct from [EvalError] so
/// catalog authors don't need to know the evaluator's internal error set.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("{0}")]
pub struct CallError(pub String);

impl CallError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// One collected diagnostic: a rendered message plus the token it points at,
/// when the error has a location at all (template-depth errors, for
/// instance, do not).
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub message: String,
    pub token: Option<Token>,
}

impl Diagnostic {
    fn new(error: impl fmt::Display, token: Option<Token>) -> Self {
        Self {
            message: error.to_string(),
            token,
        }
    }

    fn offset(&self) -> Option<usize> {
        self.token.as_ref().map(|t| t.offset)
    }
}

/// Accumulates diagnostics for a single `evaluate` call and can render them
/// back against the original source on request.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    diagnostics: Vec<Diagnostic>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: impl fmt::Display, token: Option<Token>) {
        self.diagnostics.push(Diagnostic::new(error, token));
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn clear(&mut self) {
        self.diagnostics.clear();
    }

    /// Render every collected diagnostic into one human-readable report: the
    /// original source with a marked span under each offending lexeme,
    /// sorted by offset, followed by a trailing bucket of position-less
    /// general errors.
    pub fn readable_report(&self, source: &str) -> String {
        let mut located: Vec<&Diagnostic> = self
            .diagnostics
            .iter()
            .filter(|d| d.token.is_some())
            .collect();
        located.sort_by_key(|d| d.offset().unwrap_or(0));
        let general: Vec<&Diagnostic> =
            self.diagnostics.iter().filter(|d| d.token.is_none()).collect();

        let mut report = String::new();
        for diagnostic in located {
            let token = diagnostic.token.as_ref().expect("filtered to Some above");
            report.push_str(source);
            report.push('\n');
            report.push_str(&" ".repeat(token.offset));
            let marker_len = token.lexeme.chars().count().max(1);
            report.push_str(&"^".repeat(marker_len));
            report.push(' ');
            report.push_str(&diagnostic.message);
            report.push('\n');
        }
        if !general.is_empty() {
            report.push_str("general errors:\n");
            let bucket = general
                .into_iter()
                .map(|diagnostic| format!("- {}", diagnostic.message))
                .join("\n");
            report.push_str(&bucket);
            report.push('\n');
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenCategory;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_no_errors_is_empty_report() {
        let collector = ErrorCollector::new();
        assert!(!collector.has_errors());
        assert_eq!(collector.readable_report("1 + 1"), "");
    }

    #[test]
    fn test_located_error_marks_span() {
        let mut collector = ErrorCollector::new();
        let token = Token::new("@", 4, TokenCategory::Other);
        collector.push(EvalError::UnsupportedSyntax, Some(token));
        let report = collector.readable_report("one @ two");
        assert!(report.contains("one @ two"));
        assert!(report.contains("unsupported syntax"));
        // 4 leading spaces then a single caret under the `@`
        assert!(report.contains("\n    ^ unsupported syntax"));
    }

    #[test]
    fn test_general_errors_bucketed_after_located() {
        let mut collector = ErrorCollector::new();
        collector.push(EvalError::UnbalancedEquation, None);
        let report = collector.readable_report("1, 2");
        assert!(report.starts_with("general errors:"));
        assert!(report.contains("unbalanced equation"));
    }

    #[test]
    fn test_call_error_is_reported_through_err() {
        let invoke: fn(&[crate::value::Payload]) -> Result<crate::value::Payload, CallError> =
            |_| Err(CallError::new("bad argument"));
        vellum_util::assert_err!(invoke(&[]), "bad argument");
    }

    #[test]
    fn test_wrong_arity_variant_matches() {
        let error = EvalError::WrongArity {
            name: "pi".to_owned(),
            got: 1,
        };
        vellum_util::assert_matches!(error, EvalError::WrongArity { got, .. } if got == 1);
    }

    #[test]
    fn test_located_errors_sorted_by_offset() {
        let mut collector = ErrorCollector::new();
        let later = Token::new("b", 5, TokenCategory::Other);
        let earlier = Token::new("a", 1, TokenCategory::Other);
        collector.push("second-reported, later-offset", Some(later));
        collector.push("first-reported, earlier-offset", Some(earlier));
        let report = collector.readable_report("x a b y");
        let earlier_pos = report.find("earlier-offset").unwrap();
        let later_pos = report.find("later-offset").unwrap();
        assert!(earlier_pos < later_pos);
    }
}
