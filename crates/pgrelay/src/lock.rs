//! Lock protocol state.
//!
//! Every part of a [`QueryBuilder`](crate::QueryBuilder) that collaborators can configure is a
//! [`Concern`]. A concern starts [`LockState::Open`]; once it locks, its deferred values are
//! resolved and any further mutation fails with
//! [`RelayError::LockedMutation`](crate::RelayError::LockedMutation).

use crate::error::RelayResult;
use crate::query_builder::QueryBuilder;
use std::fmt;

/// A lockable part of a query builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Concern {
    From,
    Join,
    OrderBy,
    OrderIsUnique,
    CursorComparator,
    CursorPrefix,
    WhereBound,
    Where,
    Offset,
    Limit,
    First,
    Last,
    SelectCursor,
    Select,
}

impl Concern {
    pub const COUNT: usize = 14;

    /// Order in which [`QueryBuilder::lock_everything`] locks concerns.
    pub const LOCK_ORDER: [Concern; Concern::COUNT] = [
        Concern::From,
        Concern::Join,
        Concern::OrderBy,
        Concern::OrderIsUnique,
        Concern::CursorComparator,
        Concern::CursorPrefix,
        Concern::WhereBound,
        Concern::Where,
        Concern::Offset,
        Concern::Limit,
        Concern::First,
        Concern::Last,
        Concern::SelectCursor,
        Concern::Select,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Concern::From => "from",
            Concern::Join => "join",
            Concern::OrderBy => "orderBy",
            Concern::OrderIsUnique => "orderIsUnique",
            Concern::CursorComparator => "cursorComparator",
            Concern::CursorPrefix => "cursorPrefix",
            Concern::WhereBound => "whereBound",
            Concern::Where => "where",
            Concern::Offset => "offset",
            Concern::Limit => "limit",
            Concern::First => "first",
            Concern::Last => "last",
            Concern::SelectCursor => "selectCursor",
            Concern::Select => "select",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Concern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockState {
    #[default]
    Open,
    Locked,
}

/// Coarse view of how far a builder has progressed through locking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// Nothing that affects ordering or filtering has locked yet.
    Unlocked,
    /// Order is fixed; filters may still change.
    OrderLocked,
    /// Order and filters are fixed.
    WhereLocked,
    /// Every concern is locked.
    Built,
}

/// Callback run once, immediately before a concern locks.
pub type BeforeLockFn = Box<dyn FnOnce(&mut QueryBuilder) -> RelayResult<()> + Send>;

/// Per-concern lock state plus pending before-lock callbacks.
pub(crate) struct LockTable {
    states: [LockState; Concern::COUNT],
    callbacks: [Vec<BeforeLockFn>; Concern::COUNT],
}

impl LockTable {
    pub(crate) fn new() -> Self {
        Self {
            states: [LockState::Open; Concern::COUNT],
            callbacks: std::array::from_fn(|_| Vec::new()),
        }
    }

    pub(crate) fn state(&self, concern: Concern) -> LockState {
        self.states[concern.index()]
    }

    pub(crate) fn is_locked(&self, concern: Concern) -> bool {
        self.state(concern) == LockState::Locked
    }

    pub(crate) fn set_locked(&mut self, concern: Concern) {
        self.states[concern.index()] = LockState::Locked;
    }

    pub(crate) fn push_callback(&mut self, concern: Concern, f: BeforeLockFn) {
        self.callbacks[concern.index()].push(f);
    }

    pub(crate) fn take_callbacks(&mut self, concern: Concern) -> Vec<BeforeLockFn> {
        std::mem::take(&mut self.callbacks[concern.index()])
    }

    /// Put back callbacks that were taken but not run, ahead of any queued since.
    pub(crate) fn restore_callbacks(&mut self, concern: Concern, mut unrun: Vec<BeforeLockFn>) {
        let slot = &mut self.callbacks[concern.index()];
        unrun.append(slot);
        *slot = unrun;
    }

    pub(crate) fn all_locked(&self) -> bool {
        self.states.iter().all(|s| *s == LockState::Locked)
    }

    pub(crate) fn phase(&self) -> Phase {
        if self.all_locked() {
            Phase::Built
        } else if self.is_locked(Concern::Where) {
            Phase::WhereLocked
        } else if self.is_locked(Concern::OrderBy) {
            Phase::OrderLocked
        } else {
            Phase::Unlocked
        }
    }
}

impl fmt::Debug for LockTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let locked: Vec<Concern> = Concern::LOCK_ORDER
            .iter()
            .copied()
            .filter(|c| self.is_locked(*c))
            .collect();
        f.debug_struct("LockTable").field("locked", &locked).finish()
    }
}
