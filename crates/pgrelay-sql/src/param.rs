//! Bound parameter storage.

use bytes::BytesMut;
use serde_json::Value;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use tokio_postgres::types::{Format, IsNull, ToSql, Type, to_sql_checked};

/// A clone-friendly bound parameter.
///
/// Fragments are cloned freely while a query is assembled, so parameter values are shared
/// behind an `Arc` rather than copied.
#[derive(Clone)]
pub struct Param(Arc<dyn ToSql + Send + Sync>);

impl Param {
    /// Create a new parameter from any ToSql value.
    pub fn new<T: ToSql + Send + Sync + 'static>(value: T) -> Self {
        Param(Arc::new(value))
    }

    /// Get a reference to the inner value as a ToSql trait object.
    pub fn as_ref(&self) -> &(dyn ToSql + Sync) {
        &*self.0 as &(dyn ToSql + Sync)
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

/// A JSON scalar bound in Postgres text format.
///
/// The server infers the parameter type from the surrounding expression and parses the text,
/// so a value decoded from a cursor can be compared against a column of any type:
/// `42` binds against `int4`, `"2024-01-01T00:00:00Z"` against `timestamptz`, and so on.
/// JSON `null` binds as SQL `NULL`; arrays and objects bind as their JSON text.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonParam(pub Value);

impl ToSql for JsonParam {
    fn to_sql(
        &self,
        _ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match &self.0 {
            Value::Null => return Ok(IsNull::Yes),
            Value::String(s) => out.extend_from_slice(s.as_bytes()),
            other => out.extend_from_slice(other.to_string().as_bytes()),
        }
        Ok(IsNull::No)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    fn encode_format(&self, _ty: &Type) -> Format {
        Format::Text
    }

    to_sql_checked!();
}
