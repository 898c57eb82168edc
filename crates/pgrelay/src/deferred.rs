//! Values resolved when their concern locks.

use crate::error::RelayResult;
use crate::query_builder::QueryBuilder;
use std::fmt;

/// Boxed closure producing a value from the builder's state at lock time.
pub type LazyFn<T> = Box<dyn FnOnce(&mut QueryBuilder) -> RelayResult<T> + Send>;

/// Either a value known now, or one computed when the owning concern locks.
///
/// A lazy value may read anything the builder exposes (table alias, other locked concerns,
/// named children) and is evaluated exactly once.
pub enum Deferred<T> {
    Ready(T),
    Lazy(LazyFn<T>),
}

impl<T> Deferred<T> {
    /// Wrap a closure.
    pub fn lazy<F>(f: F) -> Self
    where
        F: FnOnce(&mut QueryBuilder) -> RelayResult<T> + Send + 'static,
    {
        Deferred::Lazy(Box::new(f))
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self, Deferred::Lazy(_))
    }

    pub(crate) fn resolve(self, qb: &mut QueryBuilder) -> RelayResult<T> {
        match self {
            Deferred::Ready(v) => Ok(v),
            Deferred::Lazy(f) => f(qb),
        }
    }
}

impl<T> From<T> for Deferred<T> {
    fn from(v: T) -> Self {
        Deferred::Ready(v)
    }
}

impl<T: fmt::Debug> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deferred::Ready(v) => f.debug_tuple("Ready").field(v).finish(),
            Deferred::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}
