//! The runtime value model. Every expression, once evaluated, resolves to a
//! single [Value]: a scalar payload plus the provenance needed to locate it
//! back in the source expression.

use derive_more::Display;
use std::fmt;

/// The category a token or value is tagged with. Note this is orthogonal to
/// [Payload]'s own variant: the tokenizer assigns a category up front, and a
/// function call result keeps whatever category the catalog entry declares
/// even if the payload underneath is something else (see
/// [Value::parse_only]).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValueCategory {
    Number,
    String,
}

/// The scalar payload carried by a [Value]. Booleans are represented as
/// `Number(0.0)`/`Number(1.0)`; there is no distinct boolean variant.
#[derive(Clone, Debug, Display, PartialEq)]
pub enum Payload {
    #[display("{}", format_number(*_0))]
    Number(f64),
    #[display("{_0}")]
    Text(String),
}

/// Format a number the way the evaluator's builtin functions and template
/// substitution expect: integral values print without a trailing `.0`.
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

impl Payload {
    /// Truthiness: a value is truthy iff its payload is neither zero nor an
    /// empty string
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Number(n) => *n != 0.0,
            Self::Text(s) => !s.is_empty(),
        }
    }

    /// Coerce to a number. Numeric text is parsed; non-numeric text becomes
    /// `0.0`, mirroring the host's loose numeric coercion.
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse().unwrap_or(0.0),
        }
    }

    pub fn is_numeric_text(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().parse::<f64>().is_ok())
    }

    pub fn boolean(b: bool) -> Self {
        Self::Number(if b { 1.0 } else { 0.0 })
    }
}

impl From<f64> for Payload {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for Payload {
    fn from(value: bool) -> Self {
        Self::boolean(value)
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

/// A single evaluated value: `{ payload, offset, category }` as described by
/// the data model. `offset` is the byte offset of the token that produced
/// this value, kept around purely for error placement; it plays no part in
/// equality or arithmetic.
#[derive(Clone, Debug)]
pub struct Value {
    pub payload: Payload,
    pub offset: usize,
    pub category: ValueCategory,
}

impl Value {
    pub fn number(value: f64, offset: usize) -> Self {
        Self {
            payload: Payload::Number(value),
            offset,
            category: ValueCategory::Number,
        }
    }

    pub fn text(value: impl Into<String>, offset: usize) -> Self {
        Self {
            payload: Payload::Text(value.into()),
            offset,
            category: ValueCategory::String,
        }
    }

    pub fn boolean(value: bool, offset: usize) -> Self {
        Self::number(if value { 1.0 } else { 0.0 }, offset)
    }

    /// Build a value from a registry payload, tagging its category to match
    pub fn from_payload(payload: Payload, offset: usize) -> Self {
        let category = match &payload {
            Payload::Number(_) => ValueCategory::Number,
            Payload::Text(_) => ValueCategory::String,
        };
        Self {
            payload,
            offset,
            category,
        }
    }

    /// Build a value from a function call's return payload. Always tagged
    /// `ValueCategory::Number` regardless of the payload's own variant: a
    /// successful call pushes the returned scalar as a NUMBER-categorized
    /// value, with any text payload preserved in the payload field
    /// irrespective of that category tag.
    pub fn from_call_result(payload: Payload, offset: usize) -> Self {
        Self {
            payload,
            offset,
            category: ValueCategory::Number,
        }
    }

    pub fn is_truthy(&self) -> bool {
        self.payload.is_truthy()
    }

    pub fn to_number(&self) -> f64 {
        self.payload.to_number()
    }

    /// Replace the payload with the literal number 1, preserving the
    /// category tag. Used by parse-only mode so the grammar and name
    /// resolution still run but no host call's result is trusted.
    pub fn into_parse_only(self) -> Self {
        Self {
            payload: Payload::Number(1.0),
            ..self
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.payload)
    }
}

/// Loose equality between two values, used by `==`/`!=`. If either side is
/// numeric (its payload is a number, or its payload is text that parses
/// cleanly as a number), both sides are compared as numbers. Otherwise the
/// comparison falls back to a string compare.
///
/// This is one of the Open Questions spec.md calls out explicitly (mixed
/// `'5' == 5`-style comparisons); see DESIGN.md for the decision record.
pub fn loose_eq(lhs: &Value, rhs: &Value) -> bool {
    let lhs_numeric = matches!(lhs.payload, Payload::Number(_))
        || lhs.payload.is_numeric_text();
    let rhs_numeric = matches!(rhs.payload, Payload::Number(_))
        || rhs.payload.is_numeric_text();
    if lhs_numeric && rhs_numeric {
        lhs.to_number() == rhs.to_number()
    } else {
        lhs.payload.to_string() == rhs.payload.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(Payload::Number(0.0), false)]
    #[case(Payload::Number(1.0), true)]
    #[case(Payload::Number(-1.0), true)]
    #[case(Payload::Text(String::new()), false)]
    #[case(Payload::Text("0".into()), true)]
    fn test_truthiness(#[case] payload: Payload, #[case] expected: bool) {
        assert_eq!(payload.is_truthy(), expected);
    }

    #[rstest]
    #[case(Payload::Number(50.0), "50")]
    #[case(Payload::Number(0.5), "0.5")]
    #[case(Payload::Text("there".into()), "there")]
    fn test_display(#[case] payload: Payload, #[case] expected: &str) {
        assert_eq!(payload.to_string(), expected);
    }

    #[rstest]
    #[case(Value::number(5.0, 0), Value::text("5", 0), true)]
    #[case(Value::text("5".into(), 0), Value::number(5.0, 0), true)]
    #[case(Value::text("hi".into(), 0), Value::text("hi".into(), 0), true)]
    #[case(Value::text("hi".into(), 0), Value::number(0.0, 0), false)]
    fn test_loose_eq(
        #[case] lhs: Value,
        #[case] rhs: Value,
        #[case] expected: bool,
    ) {
        assert_eq!(loose_eq(&lhs, &rhs), expected);
    }

    #[test]
    fn test_parse_only_preserves_category() {
        let value = Value::text("hello", 3).into_parse_only();
        assert_eq!(value.payload, Payload::Number(1.0));
        assert_eq!(value.category, ValueCategory::String);
    }
}
