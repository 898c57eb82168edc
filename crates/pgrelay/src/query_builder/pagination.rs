//! Final limit/offset math and cursor expressions.

use super::QueryBuilder;
use crate::error::{RelayError, RelayResult};
use crate::lock::Concern;
use crate::options::{BuildOptions, NATURAL_CURSOR_TAG};
use pgrelay_sql::{Fragment, join, literal, sql};

/// Limit and offset to emit, and whether the order must be reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalLimitAndOffset {
    pub limit: Option<u64>,
    pub offset: u64,
    /// The statement selects the last rows by reversing the order; reverse the result to
    /// restore it.
    pub flip: bool,
    /// Set when `last` takes the final rows of a `first`/limit window of this size. The rows
    /// to skip, `max(0, min(<row count>, window) - last)`, are then computed in SQL.
    pub window: Option<u64>,
}

/// Combine an explicit limit/offset with Relay `first`/`last`.
///
/// - `first` caps the limit.
/// - `last` with a limit takes the final `last` rows of that window; the window may hold
///   fewer rows than the limit, so the skip is left to SQL (see [`FinalLimitAndOffset::window`]).
///   Combining this with a non-zero offset is rejected.
/// - `last` without a limit flips the order and limits to `last`; an offset then counts from
///   the end.
pub(crate) fn final_limit_and_offset(
    limit: Option<u64>,
    offset: u64,
    first: Option<u64>,
    last: Option<u64>,
) -> RelayResult<FinalLimitAndOffset> {
    let mut limit = limit;
    let mut flip = false;
    let mut window = None;

    if let Some(first) = first {
        limit = Some(limit.map_or(first, |l| l.min(first)));
    }
    if let Some(last) = last {
        match limit {
            Some(_) if offset > 0 => {
                return Err(RelayError::ambiguous_pagination(
                    "`last` cannot be combined with both an offset and `first` or a limit",
                ));
            }
            Some(size) => {
                if last < size {
                    window = Some(size);
                    limit = Some(last);
                }
            }
            None => {
                flip = true;
                limit = Some(last);
            }
        }
    }

    Ok(FinalLimitAndOffset {
        limit,
        offset,
        flip,
        window,
    })
}

impl QueryBuilder {
    /// Final `{limit, offset, flip}`. Locks everything.
    pub fn get_final_limit_and_offset(&mut self) -> RelayResult<FinalLimitAndOffset> {
        self.lock_everything()?;
        self.compute_final_limit_and_offset()
    }

    fn compute_final_limit_and_offset(&mut self) -> RelayResult<FinalLimitAndOffset> {
        for concern in [
            Concern::Offset,
            Concern::Limit,
            Concern::First,
            Concern::Last,
        ] {
            self.lock(concern)?;
        }
        final_limit_and_offset(
            self.resolved.limit,
            self.resolved.offset,
            self.first,
            self.last,
        )
    }

    /// Cursor expression for each row of this query.
    ///
    /// For a unique, non-empty order: `json_build_array('<prefix>'::text, e1, ..., en)`.
    /// Otherwise a positional cursor,
    /// `json_build_array('natural', (row_number() over (partition by 1)) + <offset>)`,
    /// counted from the end of the filtered rows when the order is flipped.
    pub fn build_cursor_expression(&mut self) -> RelayResult<Fragment> {
        let orders = self.get_order_by_expressions_and_directions()?;
        if !orders.is_empty() && self.is_order_unique(true)? {
            let prefix = self.get_cursor_prefix()?;
            let values = join(orders.iter().map(|t| &t.expr), ", ");
            return Ok(sql!(
                "json_build_array(", literal(prefix), "::text, ", values, ")"
            ));
        }

        let final_limit = self.compute_final_limit_and_offset()?;
        let row_number = sql!("(row_number() over (partition by 1))");
        let position = if final_limit.flip {
            let total = self.row_source("count(*)")?;
            let where_clause = self.build_where_clause(true, true, BuildOptions::default())?;
            sql!(
                "(", total, " where ", where_clause, ") - ", literal(final_limit.offset),
                " - ", row_number, " + 1"
            )
        } else {
            let skipped = self
                .offset_expression(final_limit, BuildOptions::default())?
                .unwrap_or_else(|| sql!(literal(0u64)));
            sql!(row_number, " + ", skipped)
        };
        Ok(sql!(
            "json_build_array(", literal(NATURAL_CURSOR_TAG), ", ", position, ")"
        ))
    }
}
