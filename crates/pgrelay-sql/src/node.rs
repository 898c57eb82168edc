//! Trusted SQL nodes.
//!
//! A [`Node`] is one of three things: raw SQL text, an identifier, or a bound value. Its
//! representation is private to this crate, so the constructor functions in this module are
//! the only way to obtain one. The compiler accepts nothing else.

use crate::alias::AliasToken;
use crate::fragment::Fragment;
use crate::param::{JsonParam, Param};
use std::borrow::Cow;
use tokio_postgres::types::ToSql;

/// One segment of a dotted identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentPart {
    /// A name, quoted and escaped at compile time.
    Name(String),
    /// An alias token, resolved to `__local_N__` at compile time.
    Alias(AliasToken),
}

impl From<&str> for IdentPart {
    fn from(name: &str) -> Self {
        IdentPart::Name(name.to_string())
    }
}

impl From<String> for IdentPart {
    fn from(name: String) -> Self {
        IdentPart::Name(name)
    }
}

impl From<&String> for IdentPart {
    fn from(name: &String) -> Self {
        IdentPart::Name(name.clone())
    }
}

impl From<AliasToken> for IdentPart {
    fn from(token: AliasToken) -> Self {
        IdentPart::Alias(token)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    Raw(Cow<'static, str>),
    Identifier(Vec<IdentPart>),
    Value(Param),
}

/// A trusted SQL node.
#[derive(Debug, Clone)]
pub struct Node(pub(crate) NodeKind);

impl Node {
    pub(crate) fn kind(&self) -> &NodeKind {
        &self.0
    }

    /// Whether this node is an identifier.
    pub fn is_identifier(&self) -> bool {
        matches!(self.0, NodeKind::Identifier(_))
    }

    /// Qualify a column name with this node: `<self>."name"`.
    ///
    /// When `self` is an identifier the result is a single dotted identifier; any other node
    /// is parenthesized first: `(<self>)."name"`.
    pub fn col(&self, name: impl Into<String>) -> Fragment {
        match &self.0 {
            NodeKind::Identifier(parts) => {
                let mut parts = parts.clone();
                parts.push(IdentPart::Name(name.into()));
                Fragment::from(Node(NodeKind::Identifier(parts)))
            }
            _ => {
                let mut out = Fragment::new();
                out.push_text("(")
                    .push(self)
                    .push_text(").")
                    .push(ident(name));
                out
            }
        }
    }

    /// Wrap this node in a fragment.
    pub fn into_fragment(self) -> Fragment {
        Fragment::from(self)
    }
}

/// Raw SQL text, emitted verbatim.
///
/// Never pass text derived from user input; use [`value`] for data and [`identifier`] for
/// names.
pub fn raw(text: impl Into<Cow<'static, str>>) -> Node {
    Node(NodeKind::Raw(text.into()))
}

/// A dotted identifier built from names and alias tokens.
///
/// ```
/// use pgrelay_sql::{AliasToken, IdentPart, identifier};
///
/// let t = AliasToken::new();
/// let node = identifier([IdentPart::from(t), IdentPart::from("id")]);
/// assert!(node.is_identifier());
/// ```
pub fn identifier<I, P>(parts: I) -> Node
where
    I: IntoIterator<Item = P>,
    P: Into<IdentPart>,
{
    Node(NodeKind::Identifier(
        parts.into_iter().map(Into::into).collect(),
    ))
}

/// A single-part identifier.
pub fn ident(name: impl Into<String>) -> Node {
    Node(NodeKind::Identifier(vec![IdentPart::Name(name.into())]))
}

/// An identifier made of one alias token.
pub fn alias(token: AliasToken) -> Node {
    Node(NodeKind::Identifier(vec![IdentPart::Alias(token)]))
}

/// A value sent as a bound parameter, never interpolated into the text.
pub fn value<T: ToSql + Send + Sync + 'static>(v: T) -> Node {
    Node(NodeKind::Value(Param::new(v)))
}

/// A pre-wrapped parameter.
pub fn param(p: Param) -> Node {
    Node(NodeKind::Value(p))
}

/// A JSON value bound in text format (see [`JsonParam`]).
pub fn json_value(v: serde_json::Value) -> Node {
    Node(NodeKind::Value(Param::new(JsonParam(v))))
}

/// Empty text, for optional positions in a template.
pub fn blank() -> Node {
    raw("")
}

/// `NULL`
pub fn null() -> Node {
    raw("NULL")
}

/// `true`
pub fn true_() -> Node {
    raw("true")
}

/// `false`
pub fn false_() -> Node {
    raw("false")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn col_extends_identifier() {
        let t = AliasToken::new();
        let c = alias(t).col("id");
        assert_eq!(c.nodes().len(), 1);
        match c.nodes()[0].kind() {
            NodeKind::Identifier(parts) => {
                assert_eq!(parts, &vec![IdentPart::Alias(t), IdentPart::Name("id".into())]);
            }
            other => panic!("expected identifier, got {other:?}"),
        }
    }

    #[test]
    fn raw_accepts_owned_text() {
        let n = raw(format!("limit {}", 3));
        assert!(matches!(n.kind(), NodeKind::Raw(t) if t == "limit 3"));
    }
}
