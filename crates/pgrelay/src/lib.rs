//! # pgrelay
//!
//! An incremental PostgreSQL `SELECT` builder with Relay-style cursor pagination.
//!
//! ## Features
//!
//! - **Injection-safe by construction**: every piece of SQL is a [`pgrelay_sql::Fragment`]
//! - **Many collaborators, one query**: select list, filters, ordering and pagination can be
//!   contributed independently; reading a part of the query locks it
//! - **Relay pagination**: `first`/`last`/`before`/`after`/`offset` with keyed or positional
//!   cursors and `has_next_page`/`has_previous_page`
//! - **Nested JSON**: named child builders compile into correlated JSON subqueries
//!
//! ## Connection query
//!
//! ```ignore
//! use pgrelay::{ConnectionArgs, ConnectionSetup, QueryBuilder};
//! use pgrelay_sql::ident;
//!
//! let mut qb = QueryBuilder::new();
//! qb.from(ident("items"), None)?;
//! let t = qb.get_table_alias()?;
//! qb.select(t.col("name"), "name")?
//!     .order_by(t.col("pos"), true, None)?;
//!
//! ConnectionSetup::new(["id"]).apply(&mut qb, &ConnectionArgs::new().first(10))?;
//! let page = qb.fetch_connection(&client).await?;
//! ```

pub mod client;
pub mod connection;
pub mod cursor;
pub mod deferred;
pub mod error;
pub mod lock;
pub mod options;
pub mod query_builder;

pub use client::GenericClient;
pub use connection::{
    Connection, ConnectionArgs, ConnectionSetup, Edge, PRIMARY_KEY_ASC_TAG, PageInfo,
};
pub use cursor::{
    decode_cursor, encode_cursor, natural_cursor_comparator, relay_cursor_comparator,
    row_cursor_comparator,
};
pub use deferred::Deferred;
pub use error::{RelayError, RelayResult};
pub use lock::{BeforeLockFn, Concern, LockState, Phase};
pub use options::{BuildOptions, BuilderOptions, NATURAL_CURSOR_TAG};
pub use query_builder::{
    BuilderId, CURSOR_ALIAS, CursorComparator, FinalLimitAndOffset, IDENTIFIERS_ALIAS, NullsOrder,
    OrderTerm, ParentRef, QueryBuilder,
};

pub use pgrelay_sql;

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config};
