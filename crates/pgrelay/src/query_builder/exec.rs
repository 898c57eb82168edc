//! Compiling and running built queries.

use super::QueryBuilder;
use crate::client::GenericClient;
use crate::connection::Connection;
use crate::error::{RelayError, RelayResult};
use crate::options::BuildOptions;
use pgrelay_sql::{CompiledQuery, Fragment};
use serde_json::Value;
use tokio_postgres::Row;
use tracing::debug;

impl QueryBuilder {
    /// [`build`](Self::build) and compile.
    pub fn compile(&mut self, options: BuildOptions) -> RelayResult<CompiledQuery> {
        let fragment = self.build(options)?;
        self.compile_fragment(&fragment)
    }

    /// Compile a fragment built from this builder, logging the statement.
    pub fn compile_fragment(&self, fragment: &Fragment) -> RelayResult<CompiledQuery> {
        let compiled = fragment.compile()?;
        debug!(
            target: "pgrelay.sql",
            builder = self.id.get(),
            param_count = compiled.values.len(),
            sql = %self.options.truncate_sql(&compiled.text),
            "compiled"
        );
        Ok(compiled)
    }

    /// Build, run and return the rows in the requested order.
    ///
    /// A flipped plain build comes back in reverse; the rows are reversed here. JSON-aggregate
    /// builds are already in order.
    pub async fn fetch_rows<C: GenericClient>(
        &mut self,
        conn: &C,
        options: BuildOptions,
    ) -> RelayResult<Vec<Row>> {
        let compiled = self.compile(options)?;
        let reverse = self.get_final_limit_and_offset()?.flip
            && !options.as_json_aggregate
            && !options.only_json_field;

        let mut rows = conn.query(compiled.sql(), &compiled.params_ref()).await?;
        if reverse {
            rows.reverse();
        }
        Ok(rows)
    }

    /// Run [`build_connection`](Self::build_connection) and assemble the Relay connection.
    pub async fn fetch_connection<C: GenericClient>(
        &mut self,
        conn: &C,
    ) -> RelayResult<Connection> {
        let fragment = self.build_connection(BuildOptions::default())?;
        let compiled = self.compile_fragment(&fragment)?;

        let row = conn
            .query_opt(compiled.sql(), &compiled.params_ref())
            .await?
            .ok_or_else(|| RelayError::decode("data", "connection query returned no rows"))?;
        let data: Value = row
            .try_get("data")
            .map_err(|e| RelayError::decode("data", e.to_string()))?;
        let has_next_page: bool = row
            .try_get("has_next_page")
            .map_err(|e| RelayError::decode("has_next_page", e.to_string()))?;
        let has_previous_page: bool = row
            .try_get("has_previous_page")
            .map_err(|e| RelayError::decode("has_previous_page", e.to_string()))?;

        Connection::from_json(data, has_next_page, has_previous_page)
    }
}
