//! # pgrelay-sql
//!
//! Injection-safe SQL fragments for PostgreSQL.
//!
//! ## Model
//!
//! - A [`Node`] is raw text, an identifier, or a bound value. Nodes can only be created through
//!   the constructors in this crate ([`raw`], [`identifier`], [`ident`], [`alias`], [`value`],
//!   [`literal`], ...).
//! - A [`Fragment`] is an ordered list of nodes, built with [`sql!`], [`Fragment::template`] or
//!   [`join`].
//! - [`compile`] turns a fragment into `{ text, values }` with `$1, $2, ...` placeholders.
//!
//! Table aliases are opaque [`AliasToken`]s rather than strings. The compiler renders them as
//! `__local_0__`, `__local_1__`, ... in first-seen order, so independently built pieces of a
//! query never collide on alias names.
//!
//! ```
//! use pgrelay_sql::{AliasToken, alias, ident, join, sql, value};
//!
//! let t = AliasToken::new();
//! let cols = join([alias(t).col("id"), alias(t).col("pos")], ", ");
//! let q = sql!("select ", cols, " from ", ident("items"), " as ", alias(t),
//!              " where ", alias(t).col("id"), " = any(", value(vec![1_i32, 2]), ")");
//!
//! let compiled = q.compile()?;
//! assert_eq!(
//!     compiled.text,
//!     r#"select __local_0__."id", __local_0__."pos" from "items" as __local_0__ where __local_0__."id" = any($1)"#
//! );
//! assert_eq!(compiled.values.len(), 1);
//! # Ok::<(), pgrelay_sql::SqlError>(())
//! ```

pub mod alias;
pub mod compile;
pub mod error;
pub mod fragment;
pub mod literal;
pub mod node;
pub mod param;

pub use alias::AliasToken;
pub use compile::{CompiledQuery, compile};
pub use error::{SqlError, SqlResult};
pub use fragment::{Fragment, ToFragment, join};
pub use literal::{LiteralValue, is_safe_literal_text, literal};
pub use node::{
    IdentPart, Node, alias, blank, false_, ident, identifier, json_value, null, param, raw, true_,
    value,
};
pub use param::{JsonParam, Param};
