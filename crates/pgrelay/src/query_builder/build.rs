//! Statement assembly.

use super::{CURSOR_ALIAS, FinalLimitAndOffset, QueryBuilder};
use crate::error::RelayResult;
use crate::lock::Concern;
use crate::options::BuildOptions;
use pgrelay_sql::{AliasToken, Fragment, alias, false_, ident, join, literal, sql, true_};

/// `json_build_object` takes at most 100 arguments, i.e. 50 key/value pairs.
const JSON_OBJECT_CHUNK: usize = 50;

const FLIP_INDEX_ALIAS: &str = "__flip_index";

impl QueryBuilder {
    /// `to_json(<expr>) as "<alias>", ...` for every selected field. Locks everything.
    pub fn build_select_fields(&mut self) -> RelayResult<Fragment> {
        self.lock_everything()?;
        Ok(join(
            self.resolved
                .selects
                .iter()
                .map(|(expr, name)| sql!("to_json(", expr, ") as ", ident(name.as_str()))),
            ", ",
        ))
    }

    /// One JSON object per row built from the selected fields. Locks everything.
    ///
    /// With no selected fields the whole row is converted with `to_json(<alias>)`.
    pub fn build_select_json(&mut self, options: BuildOptions) -> RelayResult<Fragment> {
        self.lock_everything()?;
        let selects = &self.resolved.selects;
        let object = if selects.is_empty() {
            sql!("to_json(", self.get_table_alias()?, ")")
        } else if selects.len() == 1 && selects[0].1 == CURSOR_ALIAS {
            sql!(
                "(to_jsonb(", self.get_table_alias()?, ") || jsonb_build_object(",
                literal(CURSOR_ALIAS), "::text, ", selects[0].0, "))::json"
            )
        } else {
            self.json_build_object(selects)
        };

        Ok(if options.add_not_distinct_from_null_case {
            sql!(
                "(case when (", self.get_table_alias()?,
                " is not distinct from null) then null else ", object, " end)"
            )
        } else if options.add_null_case {
            sql!(
                "(case when (", self.get_table_alias()?, " is null) then null else ",
                object, " end)"
            )
        } else {
            object
        })
    }

    fn json_build_object(&self, fields: &[(Fragment, String)]) -> Fragment {
        let pair =
            |(expr, name): &(Fragment, String)| sql!(literal(name.as_str()), "::text, ", expr);
        if self.options.supports_jsonb && fields.len() > JSON_OBJECT_CHUNK {
            let chunks = fields
                .chunks(JSON_OBJECT_CHUNK)
                .map(|chunk| sql!("jsonb_build_object(", join(chunk.iter().map(pair), ", "), ")"));
            sql!("(", join(chunks, " || "), ")::json")
        } else {
            sql!("json_build_object(", join(fields.iter().map(pair), ", "), ")")
        }
    }

    /// `(<b1>) and (<b2>) ...` for one side of the cursor bounds, or `true`. Locks
    /// `whereBound`.
    pub fn build_where_bound_clause(&mut self, is_lower: bool) -> RelayResult<Fragment> {
        self.lock(Concern::WhereBound)?;
        let clauses = if is_lower {
            &self.where_bounds.lower
        } else {
            &self.where_bounds.upper
        };
        Ok(if clauses.is_empty() {
            sql!(true_())
        } else {
            sql!("(", join(clauses.iter(), ") and ("), ")")
        })
    }

    /// The full where clause: null guards, wheres, then the requested bound sides.
    ///
    /// Returns `1 = 1` when there is nothing to filter on. Locks `where`.
    pub fn build_where_clause(
        &mut self,
        include_lower: bool,
        include_upper: bool,
        options: BuildOptions,
    ) -> RelayResult<Fragment> {
        self.lock(Concern::Where)?;
        let mut clauses = Vec::new();
        if options.add_null_case {
            clauses.push(sql!("not (", self.get_table_alias()?, " is null)"));
        }
        if options.add_not_distinct_from_null_case {
            clauses.push(sql!(
                "not (", self.get_table_alias()?, " is not distinct from null)"
            ));
        }
        clauses.extend(self.resolved.wheres.iter().cloned());
        if include_lower && !self.where_bounds.lower.is_empty() {
            clauses.push(self.build_where_bound_clause(true)?);
        }
        if include_upper && !self.where_bounds.upper.is_empty() {
            clauses.push(self.build_where_bound_clause(false)?);
        }
        Ok(if clauses.is_empty() {
            sql!("1 = 1")
        } else {
            sql!("(", join(clauses, ") and ("), ")")
        })
    }

    fn order_by_terms(&self, flip: bool) -> Option<Fragment> {
        if self.resolved.order_bys.is_empty() {
            return None;
        }
        Some(join(
            self.resolved.order_bys.iter().map(|t| t.to_fragment(flip)),
            ", ",
        ))
    }

    /// `select <projection> from <table> as <alias> <joins>`
    pub(super) fn row_source(&self, projection: &'static str) -> RelayResult<Fragment> {
        let mut out = sql!("select ");
        out.push_text(projection)
            .push_text(" from ")
            .push(self.get_table_expression()?)
            .push_text(" as ")
            .push(self.get_table_alias()?);
        for clause in &self.joins {
            out.push_text(" ").push(clause);
        }
        Ok(out)
    }

    /// Assemble the statement. Locks everything.
    ///
    /// When the final pagination is flipped (`last` without a limit) the order is reversed.
    /// A plain build leaves re-reversing the rows to the caller; a JSON-aggregate build
    /// restores the requested order inside the aggregate.
    pub fn build(&mut self, options: BuildOptions) -> RelayResult<Fragment> {
        self.lock_everything()?;
        if options.only_json_field {
            return self.build_select_json(options);
        }
        let final_limit = self.get_final_limit_and_offset()?;
        let FinalLimitAndOffset { limit, flip, .. } = final_limit;
        let flip_order = if flip && options.as_json_aggregate {
            self.order_by_terms(true)
        } else {
            None
        };

        let fields = if options.use_asterisk {
            sql!(self.get_table_alias()?, ".*")
        } else if options.as_json || options.as_json_aggregate {
            let mut fields = sql!(self.build_select_json(options)?, " as object");
            if let Some(order) = &flip_order {
                fields.push(sql!(
                    ", row_number() over (order by ", order, ") as ",
                    ident(FLIP_INDEX_ALIAS)
                ));
            }
            fields
        } else {
            self.build_select_fields()?
        };

        let mut q = sql!("select ", fields);
        if let Some((table, table_alias)) = &self.from {
            q.push(sql!(" from ", table, " as ", table_alias));
        }
        for clause in &self.joins {
            q.push_text(" ").push(clause);
        }
        q.push_text(" where ")
            .push(self.build_where_clause(true, true, options)?);
        if let Some(order) = self.order_by_terms(flip) {
            q.push_text(" order by ").push(order);
        }
        if let Some(limit) = limit {
            q.push(sql!(" limit ", literal(limit)));
        }
        if let Some(offset) = self.offset_expression(final_limit, options)? {
            q.push(sql!(" offset ", offset));
        }

        if options.as_json_aggregate {
            let agg = AliasToken::new();
            let aggregate = if flip_order.is_some() {
                sql!(
                    "json_agg(", alias(agg).col("object"), " order by ",
                    alias(agg).col(FLIP_INDEX_ALIAS), " desc)"
                )
            } else {
                sql!("json_agg(", alias(agg).col("object"), ")")
            };
            q = sql!(
                "select coalesce((select ", aggregate, " from (", q, ") as ", alias(agg),
                "), '[]'::json)"
            );
        }
        Ok(q)
    }

    /// Rows to skip before the page, or `None` when nothing is skipped.
    ///
    /// A window trimmed by `last` skips `greatest(0, least(<row count>, window) - last)` rows,
    /// so a window holding fewer rows than its size still yields its final rows.
    pub(super) fn offset_expression(
        &mut self,
        final_limit: FinalLimitAndOffset,
        options: BuildOptions,
    ) -> RelayResult<Option<Fragment>> {
        if let (Some(window), Some(last)) = (final_limit.window, final_limit.limit) {
            let count = self.row_source("count(*)")?;
            let where_clause = self.build_where_clause(true, true, options)?;
            return Ok(Some(sql!(
                "greatest(0, least((", count, " where ", where_clause, "), ", literal(window),
                ") - ", literal(last), ")"
            )));
        }
        Ok((final_limit.offset > 0).then(|| sql!(literal(final_limit.offset))))
    }

    /// Page query plus `has_next_page` / `has_previous_page`, as one row:
    /// `select (<json aggregate>) as data, <bool> as has_next_page, <bool> as has_previous_page`.
    pub fn build_connection(&mut self, options: BuildOptions) -> RelayResult<Fragment> {
        let page = self.build(BuildOptions {
            as_json: false,
            as_json_aggregate: true,
            only_json_field: false,
            ..options
        })?;
        let final_limit = self.get_final_limit_and_offset()?;
        let base_offset = self.get_offset()?;
        let has_next_page = self.has_next_page_sql(final_limit, options)?;
        let has_previous_page = self.has_previous_page_sql(final_limit, base_offset, options)?;
        Ok(sql!(
            "select (", page, ") as data, ", has_next_page, " as has_next_page, ",
            has_previous_page, " as has_previous_page"
        ))
    }

    fn has_next_page_sql(
        &mut self,
        final_limit: FinalLimitAndOffset,
        options: BuildOptions,
    ) -> RelayResult<Fragment> {
        if final_limit.limit == Some(0) {
            return Ok(sql!(false_()));
        }
        if self.first.is_some() {
            if let Some(window) = final_limit.window {
                return self.exists_beyond(final_limit.offset.saturating_add(window), options);
            }
            if let Some(limit) = final_limit.limit {
                return self.exists_beyond(final_limit.offset.saturating_add(limit), options);
            }
        }
        // A flipped offset skipped rows at the end, after the page.
        if final_limit.flip && final_limit.offset > 0 {
            return self.exists_beyond(0, options);
        }
        if !self.where_bounds.upper.is_empty() {
            return self.exists_outside_bound(false, options);
        }
        Ok(sql!(false_()))
    }

    fn has_previous_page_sql(
        &mut self,
        final_limit: FinalLimitAndOffset,
        base_offset: u64,
        options: BuildOptions,
    ) -> RelayResult<Fragment> {
        if final_limit.limit == Some(0) {
            return Ok(sql!(false_()));
        }
        if let Some(last) = self.last {
            if final_limit.flip
                && let Some(limit) = final_limit.limit
            {
                return self.exists_beyond(final_limit.offset.saturating_add(limit), options);
            }
            // `last` trimmed the window `first`/`limit` selected.
            if final_limit.window.is_some() {
                return self.exists_beyond(base_offset.saturating_add(last), options);
            }
            return Ok(sql!(false_()));
        }
        // Rows were skipped by an offset (user offset or a natural `after` cursor).
        if final_limit.offset > 0 {
            return self.exists_beyond(0, options);
        }
        if !self.where_bounds.lower.is_empty() {
            return self.exists_outside_bound(true, options);
        }
        Ok(sql!(false_()))
    }

    /// Whether more than `skip` rows satisfy the where clause with both bounds.
    fn exists_beyond(&mut self, skip: u64, options: BuildOptions) -> RelayResult<Fragment> {
        let source = self.row_source("1")?;
        let where_clause = self.build_where_clause(true, true, options)?;
        Ok(sql!(
            "exists(", source, " where ", where_clause, " offset ", literal(skip), ")"
        ))
    }

    /// Whether any row satisfies the where clause but not the given bound side.
    fn exists_outside_bound(
        &mut self,
        is_lower: bool,
        options: BuildOptions,
    ) -> RelayResult<Fragment> {
        let source = self.row_source("1")?;
        let where_clause = self.build_where_clause(false, false, options)?;
        let bound = self.build_where_bound_clause(is_lower)?;
        Ok(sql!(
            "exists(", source, " where ", where_clause, " and not (", bound, "))"
        ))
    }
}
