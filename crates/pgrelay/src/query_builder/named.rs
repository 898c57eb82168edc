//! Named child builders for correlated subqueries.

use super::{BuilderId, QueryBuilder};
use crate::error::{RelayError, RelayResult};
use pgrelay_sql::{Node, ToFragment};
use tracing::trace;

/// Link from a named child back to the builder that created it.
#[derive(Debug, Clone)]
pub struct ParentRef {
    pub id: BuilderId,
    /// The parent's table alias, for correlating the child with the outer row.
    pub table_alias: Node,
}

impl QueryBuilder {
    /// Create a child builder registered under `name`, reading from `table`.
    ///
    /// The child shares this builder's options but has its own locks and its own table alias.
    /// It can see the parent's alias through [`parent`](Self::parent).
    pub fn build_named_child_from(
        &mut self,
        name: impl Into<String>,
        table: impl ToFragment,
        alias: Option<Node>,
    ) -> RelayResult<&mut QueryBuilder> {
        let name = name.into();
        if self.named_children.contains_key(&name) {
            return Err(RelayError::DuplicateNamedChild(name));
        }
        let parent = ParentRef {
            id: self.id,
            table_alias: self.get_table_alias()?,
        };
        let mut child = QueryBuilder::with_options(self.options.clone());
        child.parent = Some(parent);
        child.from(table, alias)?;
        trace!(
            target: "pgrelay.builder",
            builder = self.id.get(),
            child = child.id.get(),
            name = name.as_str(),
            "named child"
        );
        Ok(self.named_children.entry(name).or_insert(child))
    }

    /// [`build_named_child_from`](Self::build_named_child_from), then select `select_expr`
    /// as `select_alias` on the child.
    pub fn build_named_child_selecting(
        &mut self,
        name: impl Into<String>,
        table: impl ToFragment,
        alias: Option<Node>,
        select_expr: impl ToFragment,
        select_alias: impl Into<String>,
    ) -> RelayResult<&mut QueryBuilder> {
        let child = self.build_named_child_from(name, table, alias)?;
        child.select(select_expr, select_alias)?;
        Ok(child)
    }

    pub fn get_named_child(&self, name: &str) -> RelayResult<&QueryBuilder> {
        self.named_children
            .get(name)
            .ok_or_else(|| RelayError::UnknownNamedChild(name.to_string()))
    }

    pub fn get_named_child_mut(&mut self, name: &str) -> RelayResult<&mut QueryBuilder> {
        self.named_children
            .get_mut(name)
            .ok_or_else(|| RelayError::UnknownNamedChild(name.to_string()))
    }

    pub fn parent(&self) -> Option<&ParentRef> {
        self.parent.as_ref()
    }

    /// Names of the registered children, sorted.
    pub fn named_child_names(&self) -> impl Iterator<Item = &str> {
        self.named_children.keys().map(String::as_str)
    }
}
