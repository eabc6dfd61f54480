//! Value encoder: one literal to SQL text, or to a bound parameter.

use crate::sql::{Literal, LiteralKind, QueryError};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static NUMERIC_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").expect("valid regex"));

/// A literal after encoding for parameterized execution.
#[derive(Clone, Debug, PartialEq)]
pub enum Encoded {
    /// Goes into the statement text as-is.
    Inline(String),
    /// Goes into the parameter list; the statement gets a placeholder.
    Param(Value),
    /// A number outside the 64-bit integer range or with a fraction, kept as its exact decimal
    /// text. Bound as text and cast with `::numeric`.
    Numeric(String),
}

/// Quote a string literal, doubling embedded single quotes.
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' {
            out.push('\'');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

pub fn is_numeric_literal(s: &str) -> bool {
    NUMERIC_LITERAL.is_match(s)
}

/// Encode for direct inclusion in statement text. `field` only labels errors.
///
/// `Raw` literals are copied verbatim with no escaping at all. Never route untrusted input
/// through a raw literal.
pub fn encode_inline(lit: &Literal, field: &str) -> Result<String, QueryError> {
    match lit.kind {
        LiteralKind::String => Ok(quote_string(&lit.text)),
        LiteralKind::Number => {
            check_numeric(lit, field)?;
            Ok(lit.text.clone())
        }
        LiteralKind::Raw => Ok(lit.text.clone()),
    }
}

/// Encode for bound execution: strings and numbers become parameters, raw stays inline.
pub fn encode_bound(lit: &Literal, field: &str) -> Result<Encoded, QueryError> {
    match lit.kind {
        LiteralKind::String => Ok(Encoded::Param(Value::String(lit.text.clone()))),
        LiteralKind::Number => {
            check_numeric(lit, field)?;
            Ok(match integer_value(&lit.text) {
                Some(v) => Encoded::Param(v),
                None => Encoded::Numeric(lit.text.clone()),
            })
        }
        LiteralKind::Raw => Ok(Encoded::Inline(lit.text.clone())),
    }
}

fn check_numeric(lit: &Literal, field: &str) -> Result<(), QueryError> {
    if is_numeric_literal(&lit.text) {
        Ok(())
    } else {
        Err(invalid_number(lit, field))
    }
}

fn invalid_number(lit: &Literal, field: &str) -> QueryError {
    QueryError::InvalidNumericLiteral {
        field: field.to_string(),
        value: lit.text.clone(),
    }
}

/// JSON integer when the literal is one that fits in 64 bits. Anything else is never routed
/// through a float.
fn integer_value(text: &str) -> Option<Value> {
    let trimmed = text.strip_prefix('+').unwrap_or(text);
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    trimmed.parse::<u64>().ok().map(|u| Value::Number(u.into()))
}
