//! Incremental `SELECT` builder with a phased lock protocol.
//!
//! A [`QueryBuilder`] collects the pieces of one query (select list, row source, joins,
//! filters, cursor bounds, ordering, limit/offset and Relay `first`/`last`) from any number of
//! collaborators. Each piece belongs to a [`Concern`]; reading a concern locks it, and a
//! locked concern rejects further mutation with [`RelayError::LockedMutation`].
//!
//! Locking a concern first runs the callbacks registered with
//! [`QueryBuilder::before_lock`], then resolves every [`Deferred`] value of that concern.
//! Some dependencies are built in:
//!
//! - `where`, `offset`, `limit`, `first` and `last` lock `whereBound` first, so cursor
//!   conditions are applied before anything that depends on them;
//! - `select` locks `selectCursor` first and selects the cursor expression (if any) as
//!   `__cursor`;
//! - `orderBy` locks `orderIsUnique` once resolved.
//!
//! ```
//! use pgrelay::{BuildOptions, QueryBuilder};
//! use pgrelay_sql::{ident, sql, value};
//!
//! let mut qb = QueryBuilder::new();
//! qb.from(ident("items"), None)?;
//! let t = qb.get_table_alias()?;
//! qb.select(t.col("id"), "id")?
//!     .where_(sql!(t.col("pos"), " > ", value(1_i32)))?
//!     .order_by(t.col("pos"), true, None)?
//!     .limit(2)?;
//!
//! let compiled = qb.build(BuildOptions::default())?.compile()?;
//! assert_eq!(
//!     compiled.text,
//!     concat!(
//!         r#"select to_json(__local_0__."id") as "id" from "items" as __local_0__ "#,
//!         r#"where (__local_0__."pos" > $1) order by __local_0__."pos" ASC limit 2"#,
//!     )
//! );
//! # Ok::<(), pgrelay::RelayError>(())
//! ```

mod build;
mod exec;
mod named;
mod pagination;


pub use named::ParentRef;
pub use pagination::FinalLimitAndOffset;

use crate::cursor::row_cursor_comparator;
use crate::deferred::Deferred;
use crate::error::{RelayError, RelayResult};
use crate::lock::{BeforeLockFn, Concern, LockState, LockTable, Phase};
use crate::options::BuilderOptions;
use pgrelay_sql::{AliasToken, Fragment, Node, ToFragment, join, sql};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Output alias of the cursor expression in the select list.
pub const CURSOR_ALIAS: &str = "__cursor";

/// Output alias used by [`QueryBuilder::select_identifiers`].
pub const IDENTIFIERS_ALIAS: &str = "__identifiers";

const MAX_ALIAS_LENGTH: usize = 63;

static NEXT_BUILDER: AtomicU64 = AtomicU64::new(1);

/// Identity of a builder, used for parent links and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BuilderId(u64);

impl BuilderId {
    fn next() -> Self {
        Self(NEXT_BUILDER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Placement of nulls in an order-by term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

impl NullsOrder {
    pub fn flipped(self) -> Self {
        match self {
            NullsOrder::First => NullsOrder::Last,
            NullsOrder::Last => NullsOrder::First,
        }
    }
}

/// A resolved order-by term.
#[derive(Debug, Clone)]
pub struct OrderTerm {
    pub expr: Fragment,
    pub ascending: bool,
    pub nulls: Option<NullsOrder>,
}

impl OrderTerm {
    /// Render as `<expr> ASC|DESC [NULLS FIRST|LAST]`, reversed when `flip` is set.
    pub fn to_fragment(&self, flip: bool) -> Fragment {
        let mut out = self.expr.clone();
        out.push_text(if self.ascending != flip { " ASC" } else { " DESC" });
        let nulls = self.nulls.map(|n| if flip { n.flipped() } else { n });
        match nulls {
            Some(NullsOrder::First) => out.push_text(" NULLS FIRST"),
            Some(NullsOrder::Last) => out.push_text(" NULLS LAST"),
            None => &mut out,
        };
        out
    }
}

/// Turns a decoded cursor into boundary conditions.
///
/// Called with the builder, the decoded cursor (`[tag, v1, ..., vn]`) and whether the cursor
/// is an `after` cursor.
pub type CursorComparator =
    Arc<dyn Fn(&mut QueryBuilder, &[Value], bool) -> RelayResult<()> + Send + Sync>;

#[derive(Default)]
struct Pending {
    selects: Vec<(Deferred<Fragment>, String)>,
    wheres: Vec<Deferred<Fragment>>,
    order_bys: Vec<(Deferred<Fragment>, bool, Option<NullsOrder>)>,
    limit: Option<Deferred<u64>>,
    offsets: Vec<Deferred<u64>>,
    select_cursor: Option<Deferred<Fragment>>,
    cursor_comparator: Option<CursorComparator>,
}

#[derive(Default)]
struct Resolved {
    selects: Vec<(Fragment, String)>,
    wheres: Vec<Fragment>,
    order_bys: Vec<OrderTerm>,
    limit: Option<u64>,
    offset: u64,
    select_cursor: Option<Fragment>,
    cursor_comparator: Option<CursorComparator>,
}

#[derive(Debug, Default)]
struct WhereBounds {
    lower: Vec<Fragment>,
    upper: Vec<Fragment>,
}

/// Accumulates one `SELECT` statement (or one correlated subquery).
pub struct QueryBuilder {
    id: BuilderId,
    options: BuilderOptions,
    from: Option<(Fragment, Node)>,
    joins: Vec<Fragment>,
    where_bounds: WhereBounds,
    order_is_unique: bool,
    first: Option<u64>,
    last: Option<u64>,
    cursor_prefix: String,
    selected_identifiers: bool,
    pending: Pending,
    resolved: Resolved,
    locks: LockTable,
    named_children: BTreeMap<String, QueryBuilder>,
    parent: Option<ParentRef>,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("id", &self.id)
            .field("phase", &self.phase())
            .field("locks", &self.locks)
            .field("first", &self.first)
            .field("last", &self.last)
            .field("cursor_prefix", &self.cursor_prefix)
            .field("named_children", &self.named_children.keys().collect::<Vec<_>>())
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}

fn fragment_of(part: impl ToFragment) -> Fragment {
    let mut out = Fragment::new();
    out.push(part);
    out
}

fn validate_select_alias(alias: &str) -> RelayResult<()> {
    if alias.len() > MAX_ALIAS_LENGTH {
        return Err(RelayError::validation(format!(
            "select alias '{alias}' exceeds {MAX_ALIAS_LENGTH} characters"
        )));
    }
    let body = alias.strip_prefix('@').unwrap_or(alias);
    let valid =
        !body.is_empty() && body.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(RelayError::validation(format!(
            "select alias '{alias}' must match ^(?:[a-z0-9_]+|@[a-z0-9_]+)$"
        )));
    }
    Ok(())
}

impl QueryBuilder {
    /// Create a builder with default options.
    pub fn new() -> Self {
        Self::with_options(BuilderOptions::default())
    }

    pub fn with_options(options: BuilderOptions) -> Self {
        let mut qb = Self {
            id: BuilderId::next(),
            cursor_prefix: options.cursor_prefix.clone(),
            options,
            from: None,
            joins: Vec::new(),
            where_bounds: WhereBounds::default(),
            order_is_unique: false,
            first: None,
            last: None,
            selected_identifiers: false,
            pending: Pending::default(),
            resolved: Resolved::default(),
            locks: LockTable::new(),
            named_children: BTreeMap::new(),
            parent: None,
        };

        for concern in [
            Concern::Where,
            Concern::Offset,
            Concern::Limit,
            Concern::First,
            Concern::Last,
        ] {
            qb.locks.push_callback(
                concern,
                Box::new(|qb: &mut QueryBuilder| qb.lock(Concern::WhereBound)),
            );
        }
        qb.locks.push_callback(
            Concern::Select,
            Box::new(|qb: &mut QueryBuilder| {
                qb.lock(Concern::SelectCursor)?;
                if let Some(cursor) = qb.resolved.select_cursor.clone() {
                    qb.select(cursor, CURSOR_ALIAS)?;
                }
                Ok(())
            }),
        );
        qb
    }

    pub fn id(&self) -> BuilderId {
        self.id
    }

    pub fn options(&self) -> &BuilderOptions {
        &self.options
    }

    // ==================== Lock protocol ====================

    /// Fail with [`RelayError::LockedMutation`] if `concern` is locked.
    pub fn check_lock(&self, concern: Concern) -> RelayResult<()> {
        if self.locks.is_locked(concern) {
            return Err(RelayError::LockedMutation(concern));
        }
        Ok(())
    }

    pub fn lock_state(&self, concern: Concern) -> LockState {
        self.locks.state(concern)
    }

    pub fn phase(&self) -> Phase {
        self.locks.phase()
    }

    /// Whether every concern is locked.
    pub fn is_finalized(&self) -> bool {
        self.locks.all_locked()
    }

    /// Register a callback to run once, immediately before `concern` locks.
    ///
    /// Callbacks run in registration order and may mutate any concern that is still open,
    /// including `concern` itself. A callback registered while `concern` is locking runs after
    /// the ones already queued.
    pub fn before_lock<F>(&mut self, concern: Concern, f: F) -> RelayResult<&mut Self>
    where
        F: FnOnce(&mut QueryBuilder) -> RelayResult<()> + Send + 'static,
    {
        self.check_lock(concern)?;
        self.locks.push_callback(concern, Box::new(f) as BeforeLockFn);
        Ok(self)
    }

    /// Lock `concern`: run its before-lock callbacks, then resolve its deferred values.
    ///
    /// Locking an already locked concern is a no-op. If a callback fails the concern stays
    /// open and the callbacks after it stay queued.
    pub fn lock(&mut self, concern: Concern) -> RelayResult<()> {
        if self.locks.is_locked(concern) {
            return Ok(());
        }
        loop {
            let mut callbacks = self.locks.take_callbacks(concern).into_iter();
            if callbacks.as_slice().is_empty() {
                break;
            }
            while let Some(callback) = callbacks.next() {
                if let Err(err) = callback(self) {
                    self.locks.restore_callbacks(concern, callbacks.collect());
                    return Err(err);
                }
            }
        }
        if self.locks.is_locked(concern) {
            return Ok(());
        }
        self.locks.set_locked(concern);
        trace!(
            target: "pgrelay.builder",
            builder = self.id.0,
            concern = concern.as_str(),
            "lock"
        );
        self.resolve(concern)
    }

    /// Lock every concern, in [`Concern::LOCK_ORDER`].
    pub fn lock_everything(&mut self) -> RelayResult<()> {
        for concern in Concern::LOCK_ORDER {
            self.lock(concern)?;
        }
        Ok(())
    }

    fn resolve(&mut self, concern: Concern) -> RelayResult<()> {
        match concern {
            Concern::From
            | Concern::Join
            | Concern::OrderIsUnique
            | Concern::CursorPrefix
            | Concern::WhereBound
            | Concern::First
            | Concern::Last => {}
            Concern::OrderBy => {
                let pending = std::mem::take(&mut self.pending.order_bys);
                let mut terms = Vec::with_capacity(pending.len());
                for (expr, ascending, nulls) in pending {
                    terms.push(OrderTerm {
                        expr: expr.resolve(self)?,
                        ascending,
                        nulls,
                    });
                }
                self.resolved.order_bys = terms;
                self.lock(Concern::OrderIsUnique)?;
            }
            Concern::CursorComparator => {
                let comparator: CursorComparator = match self.pending.cursor_comparator.take() {
                    Some(comparator) => comparator,
                    None => Arc::new(row_cursor_comparator),
                };
                self.resolved.cursor_comparator = Some(comparator);
            }
            Concern::Where => {
                let pending = std::mem::take(&mut self.pending.wheres);
                let mut wheres = Vec::with_capacity(pending.len());
                for expr in pending {
                    wheres.push(expr.resolve(self)?);
                }
                self.resolved.wheres = wheres;
            }
            Concern::Offset => {
                let pending = std::mem::take(&mut self.pending.offsets);
                let mut total = 0u64;
                for offset in pending {
                    total = total.saturating_add(offset.resolve(self)?);
                }
                self.resolved.offset = total;
            }
            Concern::Limit => {
                self.resolved.limit = match self.pending.limit.take() {
                    Some(limit) => Some(limit.resolve(self)?),
                    None => None,
                };
            }
            Concern::SelectCursor => {
                self.resolved.select_cursor = match self.pending.select_cursor.take() {
                    Some(cursor) => Some(cursor.resolve(self)?),
                    None => None,
                };
            }
            Concern::Select => {
                let pending = std::mem::take(&mut self.pending.selects);
                let mut selects: Vec<(Fragment, String)> = Vec::with_capacity(pending.len());
                for (expr, alias) in pending {
                    let expr = expr.resolve(self)?;
                    selects.retain(|(_, existing)| *existing != alias);
                    selects.push((expr, alias));
                }
                self.resolved.selects = selects;
            }
        }
        Ok(())
    }

    // ==================== Mutators ====================

    /// Add `expr` to the select list under `alias`.
    ///
    /// Aliases are at most 63 characters and match `^(?:[a-z0-9_]+|@[a-z0-9_]+)$`
    /// (case-insensitive). Selecting the same alias twice keeps the later expression.
    pub fn select(
        &mut self,
        expr: impl ToFragment,
        alias: impl Into<String>,
    ) -> RelayResult<&mut Self> {
        self.push_select(Deferred::Ready(fragment_of(expr)), alias.into())
    }

    /// Like [`select`](Self::select), with the expression computed when `select` locks.
    pub fn select_lazy<F>(&mut self, f: F, alias: impl Into<String>) -> RelayResult<&mut Self>
    where
        F: FnOnce(&mut QueryBuilder) -> RelayResult<Fragment> + Send + 'static,
    {
        self.push_select(Deferred::lazy(f), alias.into())
    }

    fn push_select(&mut self, expr: Deferred<Fragment>, alias: String) -> RelayResult<&mut Self> {
        self.check_lock(Concern::Select)?;
        validate_select_alias(&alias)?;
        self.pending.selects.push((expr, alias));
        Ok(self)
    }

    /// Select the primary key columns as a JSON array under `__identifiers`.
    ///
    /// Does nothing when `primary_key` is empty or identifiers were already selected.
    pub fn select_identifiers<S: AsRef<str>>(
        &mut self,
        primary_key: &[S],
    ) -> RelayResult<&mut Self> {
        self.check_lock(Concern::Select)?;
        if self.selected_identifiers || primary_key.is_empty() {
            return Ok(self);
        }
        let table = self.get_table_alias()?;
        let columns = join(primary_key.iter().map(|k| table.col(k.as_ref())), ", ");
        self.select(sql!("json_build_array(", columns, ")"), IDENTIFIERS_ALIAS)?;
        self.selected_identifiers = true;
        Ok(self)
    }

    /// Set the expression selected as `__cursor` for every row.
    pub fn select_cursor(&mut self, expr: impl ToFragment) -> RelayResult<&mut Self> {
        self.check_lock(Concern::SelectCursor)?;
        self.pending.select_cursor = Some(Deferred::Ready(fragment_of(expr)));
        Ok(self)
    }

    pub fn select_cursor_lazy<F>(&mut self, f: F) -> RelayResult<&mut Self>
    where
        F: FnOnce(&mut QueryBuilder) -> RelayResult<Fragment> + Send + 'static,
    {
        self.check_lock(Concern::SelectCursor)?;
        self.pending.select_cursor = Some(Deferred::lazy(f));
        Ok(self)
    }

    /// Set the row source. `from` locks immediately.
    ///
    /// When `alias` is `None` a fresh alias token is minted.
    pub fn from(&mut self, table: impl ToFragment, alias: Option<Node>) -> RelayResult<&mut Self> {
        self.check_lock(Concern::From)?;
        let alias = alias.unwrap_or_else(|| pgrelay_sql::alias(AliasToken::new()));
        self.from = Some((fragment_of(table), alias));
        self.lock(Concern::From)?;
        Ok(self)
    }

    /// Append a join clause, e.g. `left join "tags" as t on ...`.
    pub fn join(&mut self, clause: impl ToFragment) -> RelayResult<&mut Self> {
        self.check_lock(Concern::Join)?;
        self.joins.push(fragment_of(clause));
        Ok(self)
    }

    /// Add a conjunct to the where clause.
    pub fn where_(&mut self, expr: impl ToFragment) -> RelayResult<&mut Self> {
        self.check_lock(Concern::Where)?;
        self.pending.wheres.push(Deferred::Ready(fragment_of(expr)));
        Ok(self)
    }

    pub fn where_lazy<F>(&mut self, f: F) -> RelayResult<&mut Self>
    where
        F: FnOnce(&mut QueryBuilder) -> RelayResult<Fragment> + Send + 'static,
    {
        self.check_lock(Concern::Where)?;
        self.pending.wheres.push(Deferred::lazy(f));
        Ok(self)
    }

    /// Add a cursor boundary conjunct.
    ///
    /// Lower bounds come from `after` cursors, upper bounds from `before` cursors. They are
    /// kept apart from ordinary wheres so page-info queries can drop one side.
    pub fn where_bound(&mut self, expr: impl ToFragment, is_lower: bool) -> RelayResult<&mut Self> {
        self.check_lock(Concern::WhereBound)?;
        let expr = fragment_of(expr);
        if is_lower {
            self.where_bounds.lower.push(expr);
        } else {
            self.where_bounds.upper.push(expr);
        }
        Ok(self)
    }

    pub fn order_by(
        &mut self,
        expr: impl ToFragment,
        ascending: bool,
        nulls: Option<NullsOrder>,
    ) -> RelayResult<&mut Self> {
        self.check_lock(Concern::OrderBy)?;
        self.pending
            .order_bys
            .push((Deferred::Ready(fragment_of(expr)), ascending, nulls));
        Ok(self)
    }

    pub fn order_by_lazy<F>(
        &mut self,
        f: F,
        ascending: bool,
        nulls: Option<NullsOrder>,
    ) -> RelayResult<&mut Self>
    where
        F: FnOnce(&mut QueryBuilder) -> RelayResult<Fragment> + Send + 'static,
    {
        self.check_lock(Concern::OrderBy)?;
        self.pending
            .order_bys
            .push((Deferred::lazy(f), ascending, nulls));
        Ok(self)
    }

    /// Declare that the order-by terms identify a row uniquely.
    pub fn set_order_is_unique(&mut self) -> RelayResult<&mut Self> {
        self.check_lock(Concern::OrderIsUnique)?;
        self.order_is_unique = true;
        Ok(self)
    }

    /// Set the explicit limit. May be called once.
    pub fn limit(&mut self, n: u64) -> RelayResult<&mut Self> {
        self.set_limit(Deferred::Ready(n))
    }

    pub fn limit_lazy<F>(&mut self, f: F) -> RelayResult<&mut Self>
    where
        F: FnOnce(&mut QueryBuilder) -> RelayResult<u64> + Send + 'static,
    {
        self.set_limit(Deferred::lazy(f))
    }

    fn set_limit(&mut self, limit: Deferred<u64>) -> RelayResult<&mut Self> {
        self.check_lock(Concern::Limit)?;
        if self.pending.limit.is_some() {
            return Err(RelayError::validation("limit has already been set"));
        }
        self.pending.limit = Some(limit);
        Ok(self)
    }

    /// Add to the offset. Offsets from several calls are summed.
    pub fn offset(&mut self, n: u64) -> RelayResult<&mut Self> {
        self.check_lock(Concern::Offset)?;
        self.pending.offsets.push(Deferred::Ready(n));
        Ok(self)
    }

    pub fn offset_lazy<F>(&mut self, f: F) -> RelayResult<&mut Self>
    where
        F: FnOnce(&mut QueryBuilder) -> RelayResult<u64> + Send + 'static,
    {
        self.check_lock(Concern::Offset)?;
        self.pending.offsets.push(Deferred::lazy(f));
        Ok(self)
    }

    /// Relay `first`. May be called once.
    pub fn first(&mut self, n: u64) -> RelayResult<&mut Self> {
        self.check_lock(Concern::First)?;
        if self.first.is_some() {
            return Err(RelayError::validation("first has already been set"));
        }
        self.first = Some(n);
        Ok(self)
    }

    /// Relay `last`. May be called once.
    pub fn last(&mut self, n: u64) -> RelayResult<&mut Self> {
        self.check_lock(Concern::Last)?;
        if self.last.is_some() {
            return Err(RelayError::validation("last has already been set"));
        }
        self.last = Some(n);
        Ok(self)
    }

    /// Replace the cursor comparator. `cursorComparator` locks immediately.
    pub fn set_cursor_comparator<F>(&mut self, f: F) -> RelayResult<&mut Self>
    where
        F: Fn(&mut QueryBuilder, &[Value], bool) -> RelayResult<()> + Send + Sync + 'static,
    {
        self.check_lock(Concern::CursorComparator)?;
        self.pending.cursor_comparator = Some(Arc::new(f));
        self.lock(Concern::CursorComparator)?;
        Ok(self)
    }

    /// Set the tag written into (and expected back from) keyed cursors.
    pub fn set_cursor_prefix(&mut self, tag: impl Into<String>) -> RelayResult<&mut Self> {
        self.check_lock(Concern::CursorPrefix)?;
        self.cursor_prefix = tag.into();
        Ok(self)
    }

    /// Apply a decoded cursor (`[tag, v1, ..., vn]`) when `whereBound` locks.
    pub fn add_cursor_condition(
        &mut self,
        cursor: Vec<Value>,
        is_after: bool,
    ) -> RelayResult<&mut Self> {
        self.before_lock(Concern::WhereBound, move |qb| {
            qb.lock(Concern::CursorComparator)?;
            let comparator = qb
                .resolved
                .cursor_comparator
                .clone()
                .ok_or_else(|| RelayError::validation("no cursor comparator was set"))?;
            comparator(qb, &cursor, is_after)
        })
    }

    // ==================== Readers ====================

    /// Whether `last` will be taken from the end of the rows: `last` is set and neither
    /// `first` nor a limit bounds a window. Reads values that may not be settled yet.
    pub(crate) fn takes_last_from_end(&self) -> bool {
        self.last.is_some()
            && self.first.is_none()
            && self.pending.limit.is_none()
            && self.resolved.limit.is_none()
    }

    pub fn get_table_alias(&self) -> RelayResult<Node> {
        self.from
            .as_ref()
            .map(|(_, alias)| alias.clone())
            .ok_or_else(|| RelayError::validation("from() has not been called"))
    }

    pub fn get_table_expression(&self) -> RelayResult<Fragment> {
        self.from
            .as_ref()
            .map(|(table, _)| table.clone())
            .ok_or_else(|| RelayError::validation("from() has not been called"))
    }

    /// Resolved order-by terms. Locks `orderBy`.
    pub fn get_order_by_expressions_and_directions(&mut self) -> RelayResult<Vec<OrderTerm>> {
        self.lock(Concern::OrderBy)?;
        Ok(self.resolved.order_bys.clone())
    }

    /// Whether the order is declared unique. With `lock`, locks `orderBy` and
    /// `orderIsUnique` first; without it, reports the current, possibly unsettled, value.
    pub fn is_order_unique(&mut self, lock: bool) -> RelayResult<bool> {
        if lock {
            self.lock(Concern::OrderBy)?;
            self.lock(Concern::OrderIsUnique)?;
        }
        Ok(self.order_is_unique)
    }

    pub fn get_cursor_prefix(&mut self) -> RelayResult<String> {
        self.lock(Concern::CursorPrefix)?;
        Ok(self.cursor_prefix.clone())
    }

    /// Sum of all offsets. Locks `offset`.
    pub fn get_offset(&mut self) -> RelayResult<u64> {
        self.lock(Concern::Offset)?;
        Ok(self.resolved.offset)
    }

    /// The cursor expression, if one was set. Locks `selectCursor`.
    pub fn get_select_cursor(&mut self) -> RelayResult<Option<Fragment>> {
        self.lock(Concern::SelectCursor)?;
        Ok(self.resolved.select_cursor.clone())
    }

    /// Number of selected fields, including `__cursor`. Locks everything.
    pub fn select_fields_count(&mut self) -> RelayResult<usize> {
        self.lock_everything()?;
        Ok(self.resolved.selects.len())
    }
}
