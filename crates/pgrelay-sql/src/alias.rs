//! Opaque alias tokens.
//!
//! An [`AliasToken`] names a table or subquery without committing to any text. Tokens are
//! minted from a process-wide counter, so two independently created tokens never collide,
//! and there is no way to build one from an arbitrary integer. The compiler maps every token
//! it meets to `__local_N__`, numbering from zero on each call.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ALIAS: AtomicU64 = AtomicU64::new(0);

/// A unique, unforgeable alias for a row source.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AliasToken(u64);

impl AliasToken {
    /// Mint a fresh token.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(NEXT_ALIAS.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Debug for AliasToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AliasToken(#{})", self.0)
    }
}
