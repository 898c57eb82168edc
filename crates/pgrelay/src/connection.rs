//! Relay connection arguments and results.

use crate::cursor::{decode_cursor, encode_cursor, relay_cursor_comparator};
use crate::error::{RelayError, RelayResult};
use crate::lock::Concern;
use crate::query_builder::{CURSOR_ALIAS, QueryBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cursor tag used by [`ConnectionSetup`] unless another is configured.
pub const PRIMARY_KEY_ASC_TAG: &str = "primary_key_asc";

/// Relay connection arguments as received from a client.
///
/// # Example
///
/// ```
/// use pgrelay::ConnectionArgs;
///
/// let args = ConnectionArgs::new().first(10).offset(5);
/// assert!(args.validate().is_ok());
/// assert!(ConnectionArgs::new().first(-1).validate().is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionArgs {
    pub first: Option<i64>,
    pub last: Option<i64>,
    pub before: Option<String>,
    pub after: Option<String>,
    pub offset: Option<i64>,
}

impl ConnectionArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn first(mut self, n: i64) -> Self {
        self.first = Some(n);
        self
    }

    pub fn last(mut self, n: i64) -> Self {
        self.last = Some(n);
        self
    }

    pub fn before(mut self, cursor: impl Into<String>) -> Self {
        self.before = Some(cursor.into());
        self
    }

    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.after = Some(cursor.into());
        self
    }

    pub fn offset(mut self, n: i64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Check the arguments without touching a builder.
    ///
    /// Rejects negative counts, `first` + `last` + a non-zero `offset`, and cursors that do not
    /// decode.
    pub fn validate(&self) -> RelayResult<()> {
        self.counts()?;
        self.cursors()?;
        Ok(())
    }

    fn counts(&self) -> RelayResult<(Option<u64>, Option<u64>, u64)> {
        fn non_negative(name: &str, n: Option<i64>) -> RelayResult<Option<u64>> {
            n.map(|n| {
                u64::try_from(n)
                    .map_err(|_| RelayError::validation(format!("`{name}` must not be negative")))
            })
            .transpose()
        }
        let first = non_negative("first", self.first)?;
        let last = non_negative("last", self.last)?;
        let offset = non_negative("offset", self.offset)?.unwrap_or(0);
        if first.is_some() && last.is_some() && offset > 0 {
            return Err(RelayError::ambiguous_pagination(
                "`first`, `last` and `offset` cannot be combined",
            ));
        }
        Ok((first, last, offset))
    }

    fn cursors(&self) -> RelayResult<(Option<Vec<Value>>, Option<Vec<Value>>)> {
        let after = self.after.as_deref().map(decode_cursor).transpose()?;
        let before = self.before.as_deref().map(decode_cursor).transpose()?;
        Ok((after, before))
    }
}

/// Wires [`ConnectionArgs`] into a [`QueryBuilder`].
///
/// - appends the primary key to the order when the order is not already unique;
/// - tags keyed cursors with `primary_key_asc` (or a configured tag);
/// - accepts both keyed and natural cursors;
/// - selects the cursor of every row as `__cursor`.
#[derive(Debug, Clone)]
pub struct ConnectionSetup {
    pub primary_key: Vec<String>,
    pub cursor_tag: String,
}

impl ConnectionSetup {
    pub fn new<I, S>(primary_key: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            primary_key: primary_key.into_iter().map(Into::into).collect(),
            cursor_tag: PRIMARY_KEY_ASC_TAG.to_string(),
        }
    }

    pub fn cursor_tag(mut self, tag: impl Into<String>) -> Self {
        self.cursor_tag = tag.into();
        self
    }

    /// Validate `args` and apply them to `qb`.
    pub fn apply(&self, qb: &mut QueryBuilder, args: &ConnectionArgs) -> RelayResult<()> {
        let (first, last, offset) = args.counts()?;
        let (after, before) = args.cursors()?;

        if !self.primary_key.is_empty() {
            let primary_key = self.primary_key.clone();
            qb.before_lock(Concern::OrderBy, move |qb| {
                if qb.is_order_unique(false)? {
                    return Ok(());
                }
                let table = qb.get_table_alias()?;
                for column in &primary_key {
                    qb.order_by(table.col(column.as_str()), true, None)?;
                }
                qb.set_order_is_unique()?;
                Ok(())
            })?;
        }

        qb.set_cursor_prefix(self.cursor_tag.clone())?
            .set_cursor_comparator(relay_cursor_comparator)?
            .select_cursor_lazy(QueryBuilder::build_cursor_expression)?;

        if let Some(n) = first {
            qb.first(n)?;
        }
        if let Some(n) = last {
            qb.last(n)?;
        }
        if offset > 0 {
            qb.offset(offset)?;
        }
        if let Some(cursor) = after {
            qb.add_cursor_condition(cursor, true)?;
        }
        if let Some(cursor) = before {
            qb.add_cursor_condition(cursor, false)?;
        }
        Ok(())
    }
}

/// Page info of a Relay connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub cursor: Option<String>,
    pub node: Value,
}

/// A page of rows with cursors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub edges: Vec<Edge>,
    pub page_info: PageInfo,
}

impl Connection {
    /// Assemble a connection from the JSON array a connection query returns.
    ///
    /// Each element is one row object; its `__cursor` field (if any) is removed and encoded
    /// as the edge cursor.
    pub fn from_json(
        data: Value,
        has_next_page: bool,
        has_previous_page: bool,
    ) -> RelayResult<Self> {
        let rows = match data {
            Value::Array(rows) => rows,
            Value::Null => Vec::new(),
            other => {
                return Err(RelayError::decode(
                    "data",
                    format!("expected a JSON array, got {other}"),
                ));
            }
        };

        let mut edges = Vec::with_capacity(rows.len());
        for mut node in rows {
            let cursor = match node.as_object_mut().and_then(|o| o.remove(CURSOR_ALIAS)) {
                None | Some(Value::Null) => None,
                Some(Value::Array(values)) => Some(encode_cursor(&values)),
                Some(other) => {
                    return Err(RelayError::decode(
                        CURSOR_ALIAS,
                        format!("expected a JSON array, got {other}"),
                    ));
                }
            };
            edges.push(Edge { cursor, node });
        }

        let page_info = PageInfo {
            has_next_page,
            has_previous_page,
            start_cursor: edges.first().and_then(|e| e.cursor.clone()),
            end_cursor: edges.last().and_then(|e| e.cursor.clone()),
        };
        Ok(Self { edges, page_info })
    }
}
