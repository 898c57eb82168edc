//! Inline scalar literals.
//!
//! [`literal`] keeps generated SQL readable by writing small, obviously safe constants
//! straight into the text. Anything it cannot prove safe becomes a bound value instead.

use crate::node::{Node, raw, value};

/// A scalar that [`literal`] knows how to inline.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl From<bool> for LiteralValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i16> for LiteralValue {
    fn from(v: i16) -> Self {
        Self::Int(v.into())
    }
}

impl From<i32> for LiteralValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<i64> for LiteralValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for LiteralValue {
    fn from(v: u32) -> Self {
        Self::UInt(v.into())
    }
}

impl From<u64> for LiteralValue {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<f64> for LiteralValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for LiteralValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for LiteralValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<LiteralValue>> From<Option<T>> for LiteralValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Whether `s` matches `^[-a-zA-Z0-9_@! ]*$`.
pub fn is_safe_literal_text(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '@' | '!' | ' '))
}

/// Inline a safe scalar as SQL text, or fall back to a bound value.
///
/// ```
/// use pgrelay_sql::{literal, sql};
///
/// let q = sql!("select ", literal("natural"), ", ", literal(3_i64), ", ", literal("it's"));
/// let compiled = q.compile()?;
/// assert_eq!(compiled.text, "select 'natural', 3, $1");
/// # Ok::<(), pgrelay_sql::SqlError>(())
/// ```
pub fn literal(v: impl Into<LiteralValue>) -> Node {
    match v.into() {
        LiteralValue::Null => raw("NULL"),
        LiteralValue::Bool(true) => raw("true"),
        LiteralValue::Bool(false) => raw("false"),
        LiteralValue::Int(n) => raw(n.to_string()),
        LiteralValue::UInt(n) => raw(n.to_string()),
        LiteralValue::Float(f) if f.is_finite() => raw(format!("'{f}'::float8")),
        LiteralValue::Float(f) => value(f),
        LiteralValue::Text(s) if is_safe_literal_text(&s) => raw(format!("'{s}'")),
        LiteralValue::Text(s) => value(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql;

    fn text_of(node: Node) -> (String, usize) {
        let compiled = sql!(node).compile().unwrap();
        (compiled.text, compiled.values.len())
    }

    #[test]
    fn inlines_safe_text() {
        assert_eq!(text_of(literal("primary_key_asc")), ("'primary_key_asc'".into(), 0));
        assert_eq!(text_of(literal("a-b @c!")), ("'a-b @c!'".into(), 0));
        assert_eq!(text_of(literal("")), ("''".into(), 0));
    }

    #[test]
    fn defers_unsafe_text() {
        for s in ["it's", "a\"b", "x; drop table t", "é", "a\\b", "$1"] {
            assert_eq!(text_of(literal(s)), ("$1".into(), 1), "{s}");
        }
    }

    #[test]
    fn inlines_numbers_and_bools() {
        assert_eq!(text_of(literal(-5_i32)).0, "-5");
        assert_eq!(text_of(literal(7_u64)).0, "7");
        assert_eq!(text_of(literal(1.5_f64)).0, "'1.5'::float8");
        assert_eq!(text_of(literal(true)).0, "true");
        assert_eq!(text_of(literal(None::<i32>)).0, "NULL");
    }

    #[test]
    fn defers_non_finite_floats() {
        assert_eq!(text_of(literal(f64::NAN)), ("$1".into(), 1));
        assert_eq!(text_of(literal(f64::INFINITY)), ("$1".into(), 1));
    }
}
