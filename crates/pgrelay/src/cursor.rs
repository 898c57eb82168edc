//! Cursor encoding and cursor comparators.
//!
//! A cursor is `base64(JSON [tag, v1, ..., vn])`. For keyed cursors `tag` is the builder's
//! cursor prefix and `v1..vn` are the values of the order-by expressions for the row. Natural
//! cursors are `["natural", position]`, where `position` is the 1-based row position.

use crate::error::{RelayError, RelayResult};
use crate::lock::Concern;
use crate::options::NATURAL_CURSOR_TAG;
use crate::query_builder::{OrderTerm, QueryBuilder};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use pgrelay_sql::{Fragment, false_, join, json_value, raw, sql};
use serde_json::Value;
use tracing::debug;

/// Encode cursor values as an opaque string.
pub fn encode_cursor(values: &[Value]) -> String {
    STANDARD.encode(Value::Array(values.to_vec()).to_string())
}

/// Decode a cursor produced by [`encode_cursor`].
///
/// The payload must be a non-empty JSON array whose first element is a string tag.
pub fn decode_cursor(cursor: &str) -> RelayResult<Vec<Value>> {
    let bytes = STANDARD
        .decode(cursor.trim())
        .map_err(|e| RelayError::invalid_cursor(format!("not base64: {e}")))?;
    let value: Value = serde_json::from_slice(&bytes)
        .map_err(|e| RelayError::invalid_cursor(format!("not JSON: {e}")))?;
    match value {
        Value::Array(items) if matches!(items.first(), Some(Value::String(_))) => Ok(items),
        _ => Err(RelayError::invalid_cursor(
            "expected a JSON array starting with a string tag",
        )),
    }
}

fn cursor_tag(cursor: &[Value]) -> Option<&str> {
    match cursor.first() {
        Some(Value::String(tag)) => Some(tag.as_str()),
        _ => None,
    }
}

fn reject_cursor(qb: &mut QueryBuilder, is_after: bool, reason: &str) -> RelayResult<()> {
    debug!(
        target: "pgrelay.builder",
        builder = qb.id().get(),
        is_after,
        reason,
        "cursor rejected"
    );
    qb.where_bound(false_(), is_after)?;
    Ok(())
}

/// Comparison operator that moves past the cursor in the given direction.
fn seek_op(ascending: bool, is_after: bool) -> &'static str {
    match (ascending, is_after) {
        (true, true) => " > ",
        (true, false) => " < ",
        (false, true) => " < ",
        (false, false) => " > ",
    }
}

/// Parenthesize anything but a lone identifier.
fn operand(expr: &Fragment) -> Fragment {
    match expr.nodes() {
        [node] if node.is_identifier() => expr.clone(),
        _ => expr.parenthesized(),
    }
}

fn mixed_comparison(terms: &[OrderTerm], values: &[Value], is_after: bool) -> Fragment {
    let (term, rest_terms) = match terms.split_first() {
        Some(split) => split,
        None => return sql!("true"),
    };
    let expr = operand(&term.expr);
    let value = json_value(values[0].clone());
    let mut out = sql!(expr, raw(seek_op(term.ascending, is_after)), value);
    if !rest_terms.is_empty() {
        let rest = mixed_comparison(rest_terms, &values[1..], is_after);
        out = sql!("((", out, ") or (", expr, " = ", value, " and ", rest, "))");
    }
    out
}

/// Default comparator for keyed cursors.
///
/// Requires a unique, non-empty order. A cursor from another ordering (different tag or value
/// count) matches no rows. When every term sorts the same way the bound is a row comparison
/// `(e1, ..., en) > ($1, ..., $n)`; otherwise it expands term by term.
pub fn row_cursor_comparator(
    qb: &mut QueryBuilder,
    cursor: &[Value],
    is_after: bool,
) -> RelayResult<()> {
    let orders = qb.get_order_by_expressions_and_directions()?;
    if orders.is_empty() || !qb.is_order_unique(true)? {
        return Err(RelayError::validation(
            "order is not unique, cursors cannot be used",
        ));
    }
    let prefix = qb.get_cursor_prefix()?;
    if cursor_tag(cursor) != Some(prefix.as_str()) {
        return reject_cursor(qb, is_after, "cursor tag does not match");
    }
    let values = &cursor[1..];
    if values.len() != orders.len() {
        return reject_cursor(qb, is_after, "cursor value count does not match");
    }

    let ascending = orders[0].ascending;
    let bound = if orders.iter().all(|t| t.ascending == ascending) {
        let op = seek_op(ascending, is_after);
        if orders.len() == 1 {
            sql!(operand(&orders[0].expr), raw(op), json_value(values[0].clone()))
        } else {
            let exprs = join(orders.iter().map(|t| &t.expr), ", ");
            let params = join(values.iter().cloned().map(json_value), ", ");
            sql!("(", exprs, ")", raw(op), "(", params, ")")
        }
    } else {
        mixed_comparison(&orders, values, is_after)
    };
    qb.where_bound(bound, is_after)?;
    Ok(())
}

/// Comparator for positional cursors (`["natural", position]`).
///
/// `after p` skips the first `p` rows; `before p` limits the page to the rows before position
/// `p`. Positions count from the start of the filtered rows, so an `after` cursor combined
/// with `last` but no `first` or limit is rejected with
/// [`RelayError::AmbiguousPagination`].
pub fn natural_cursor_comparator(
    qb: &mut QueryBuilder,
    cursor: &[Value],
    is_after: bool,
) -> RelayResult<()> {
    let position = match cursor {
        [Value::String(tag), Value::Number(n)] if tag == NATURAL_CURSOR_TAG => n.as_u64(),
        _ => None,
    };
    let Some(position) = position else {
        return reject_cursor(qb, is_after, "not a natural cursor");
    };
    if qb.is_order_unique(true)? {
        return reject_cursor(qb, is_after, "natural cursor on a keyed ordering");
    }
    if is_after {
        qb.offset(position)?;
        qb.before_lock(Concern::Last, |qb| {
            if qb.takes_last_from_end() {
                return Err(RelayError::ambiguous_pagination(
                    "a natural `after` cursor cannot be combined with `last` without `first`",
                ));
            }
            Ok(())
        })?;
    } else {
        qb.limit_lazy(move |qb| {
            let offset = qb.get_offset()?;
            Ok(position.saturating_sub(offset).saturating_sub(1))
        })?;
    }
    Ok(())
}

/// Dispatch natural cursors to [`natural_cursor_comparator`] and keyed cursors to
/// [`row_cursor_comparator`].
pub fn relay_cursor_comparator(
    qb: &mut QueryBuilder,
    cursor: &[Value],
    is_after: bool,
) -> RelayResult<()> {
    if cursor_tag(cursor) == Some(NATURAL_CURSOR_TAG) && !qb.is_order_unique(true)? {
        natural_cursor_comparator(qb, cursor, is_after)
    } else {
        row_cursor_comparator(qb, cursor, is_after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::BuildOptions;
    use pgrelay_sql::ident;
    use serde_json::json;

    #[test]
    fn cursor_round_trip() {
        let values = vec![json!("primary_key_asc"), json!(3), json!("b")];
        let encoded = encode_cursor(&values);
        assert_eq!(decode_cursor(&encoded).unwrap(), values);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_cursor("%%%").unwrap_err().is_invalid_cursor());
        let not_json = STANDARD.encode("nope");
        assert!(decode_cursor(&not_json).unwrap_err().is_invalid_cursor());
        let no_tag = STANDARD.encode("[1, 2]");
        assert!(decode_cursor(&no_tag).unwrap_err().is_invalid_cursor());
        let empty = STANDARD.encode("[]");
        assert!(decode_cursor(&empty).unwrap_err().is_invalid_cursor());
    }

    fn items_builder() -> QueryBuilder {
        let mut qb = QueryBuilder::new();
        qb.from(ident("items"), None).unwrap();
        qb
    }

    fn where_text(qb: &mut QueryBuilder) -> String {
        let clause = qb
            .build_where_clause(true, true, BuildOptions::default())
            .unwrap();
        clause.compile().unwrap().text
    }

    #[test]
    fn single_column_after() {
        let mut qb = items_builder();
        let t = qb.get_table_alias().unwrap();
        qb.order_by(t.col("id"), true, None).unwrap();
        qb.set_order_is_unique().unwrap();
        row_cursor_comparator(&mut qb, &[json!("natural"), json!(2)], true).unwrap();
        assert_eq!(where_text(&mut qb), r#"((__local_0__."id" > $1))"#);
    }

    #[test]
    fn uniform_directions_use_row_comparison() {
        let mut qb = items_builder();
        let t = qb.get_table_alias().unwrap();
        qb.order_by(t.col("pos"), false, None).unwrap();
        qb.order_by(t.col("id"), false, None).unwrap();
        qb.set_order_is_unique().unwrap();
        row_cursor_comparator(&mut qb, &[json!("natural"), json!(2), json!(7)], false).unwrap();
        assert_eq!(
            where_text(&mut qb),
            r#"(((__local_0__."pos", __local_0__."id") > ($1, $2)))"#
        );
    }

    #[test]
    fn mixed_directions_expand() {
        let mut qb = items_builder();
        let t = qb.get_table_alias().unwrap();
        qb.order_by(t.col("pos"), true, None).unwrap();
        qb.order_by(t.col("id"), false, None).unwrap();
        qb.set_order_is_unique().unwrap();
        row_cursor_comparator(&mut qb, &[json!("natural"), json!(2), json!(7)], true).unwrap();
        assert_eq!(
            where_text(&mut qb),
            concat!(
                r#"((((__local_0__."pos" > $1) or (__local_0__."pos" = $2 and "#,
                r#"__local_0__."id" < $3))))"#
            )
        );
    }

    #[test]
    fn mismatched_cursor_matches_nothing() {
        let mut qb = items_builder();
        let t = qb.get_table_alias().unwrap();
        qb.order_by(t.col("id"), true, None).unwrap();
        qb.set_order_is_unique().unwrap();
        row_cursor_comparator(&mut qb, &[json!("other"), json!(2)], true).unwrap();
        assert_eq!(where_text(&mut qb), "((false))");

        let mut qb = items_builder();
        let t = qb.get_table_alias().unwrap();
        qb.order_by(t.col("id"), true, None).unwrap();
        qb.set_order_is_unique().unwrap();
        row_cursor_comparator(&mut qb, &[json!("natural"), json!(2), json!(3)], false).unwrap();
        assert_eq!(where_text(&mut qb), "((false))");
    }

    #[test]
    fn non_unique_order_is_rejected() {
        let mut qb = items_builder();
        let t = qb.get_table_alias().unwrap();
        qb.order_by(t.col("pos"), true, None).unwrap();
        let err = row_cursor_comparator(&mut qb, &[json!("natural"), json!(2)], true).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn expression_operands_are_parenthesized() {
        let mut qb = items_builder();
        let t = qb.get_table_alias().unwrap();
        qb.order_by(sql!("lower(", t.col("name"), ")"), true, None)
            .unwrap();
        qb.set_order_is_unique().unwrap();
        row_cursor_comparator(&mut qb, &[json!("natural"), json!("x")], true).unwrap();
        assert_eq!(
            where_text(&mut qb),
            r#"(((lower(__local_0__."name")) > $1))"#
        );
    }

    #[test]
    fn natural_after_adds_offset() {
        let mut qb = items_builder();
        natural_cursor_comparator(&mut qb, &[json!("natural"), json!(3)], true).unwrap();
        assert_eq!(qb.get_offset().unwrap(), 3);
    }

    #[test]
    fn natural_before_limits() {
        let mut qb = items_builder();
        qb.offset(1).unwrap();
        natural_cursor_comparator(&mut qb, &[json!("natural"), json!(5)], false).unwrap();
        let final_limit = qb.get_final_limit_and_offset().unwrap();
        assert_eq!(final_limit.limit, Some(3));
        assert_eq!(final_limit.offset, 1);
    }

    #[test]
    fn natural_rejects_keyed_cursor() {
        let mut qb = items_builder();
        natural_cursor_comparator(&mut qb, &[json!("natural"), json!("x")], true).unwrap();
        assert_eq!(where_text(&mut qb), "((false))");
    }
}
