//! Builder and build configuration.

/// Cursor tag used when no other prefix is configured.
pub const NATURAL_CURSOR_TAG: &str = "natural";

/// Settings shared by a builder and every named child created from it.
///
/// # Example
///
/// ```
/// use pgrelay::BuilderOptions;
///
/// let opts = BuilderOptions::new()
///     .supports_jsonb(false)
///     .max_logged_sql_length(500)
///     .cursor_prefix("created_at_desc");
/// assert_eq!(opts.cursor_prefix, "created_at_desc");
/// ```
#[derive(Debug, Clone)]
pub struct BuilderOptions {
    /// Allow `jsonb_build_object` chunking when a JSON object has more than 50 keys.
    /// (`json_build_object` accepts at most 100 arguments.)
    pub supports_jsonb: bool,
    /// Truncate logged SQL (in bytes). `None` means no truncation.
    pub max_logged_sql_length: Option<usize>,
    /// Initial cursor tag for new builders.
    pub cursor_prefix: String,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            supports_jsonb: true,
            max_logged_sql_length: Some(200),
            cursor_prefix: NATURAL_CURSOR_TAG.to_string(),
        }
    }
}

impl BuilderOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn supports_jsonb(mut self, enabled: bool) -> Self {
        self.supports_jsonb = enabled;
        self
    }

    /// Set maximum SQL length to log.
    pub fn max_logged_sql_length(mut self, len: usize) -> Self {
        self.max_logged_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation in logs.
    pub fn no_truncate(mut self) -> Self {
        self.max_logged_sql_length = None;
        self
    }

    pub fn cursor_prefix(mut self, tag: impl Into<String>) -> Self {
        self.cursor_prefix = tag.into();
        self
    }

    pub(crate) fn truncate_sql<'a>(&self, sql: &'a str) -> std::borrow::Cow<'a, str> {
        match self.max_logged_sql_length {
            Some(max) if sql.len() > max => {
                format!("{}...", truncate_sql_bytes(sql, max)).into()
            }
            _ => sql.into(),
        }
    }
}

fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// Shape of the statement produced by [`QueryBuilder::build`](crate::QueryBuilder::build).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Select one JSON object per row, as column `object`.
    pub as_json: bool,
    /// Aggregate the rows into a single JSON array (`'[]'` when empty).
    pub as_json_aggregate: bool,
    /// Return only the JSON object expression, not a statement.
    pub only_json_field: bool,
    /// Yield SQL `NULL` instead of an object when the row is null.
    pub add_null_case: bool,
    /// Like `add_null_case`, using `is not distinct from null`.
    pub add_not_distinct_from_null_case: bool,
    /// Select `<alias>.*` instead of the registered fields.
    pub use_asterisk: bool,
}

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json() -> Self {
        Self {
            as_json: true,
            ..Self::default()
        }
    }

    pub fn json_aggregate() -> Self {
        Self {
            as_json_aggregate: true,
            ..Self::default()
        }
    }

    pub fn only_json_field(mut self) -> Self {
        self.only_json_field = true;
        self
    }

    pub fn add_null_case(mut self) -> Self {
        self.add_null_case = true;
        self
    }

    pub fn add_not_distinct_from_null_case(mut self) -> Self {
        self.add_not_distinct_from_null_case = true;
        self
    }

    pub fn use_asterisk(mut self) -> Self {
        self.use_asterisk = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundary() {
        let opts = BuilderOptions::new().max_logged_sql_length(4);
        assert_eq!(opts.truncate_sql("selé 1"), "sel...");
        assert_eq!(opts.truncate_sql("sel"), "sel");
        let opts = opts.no_truncate();
        assert_eq!(opts.truncate_sql("select 1"), "select 1");
    }

    #[test]
    fn build_option_presets() {
        assert!(BuildOptions::json().as_json);
        assert!(BuildOptions::json_aggregate().as_json_aggregate);
        let opts = BuildOptions::new().add_null_case().use_asterisk();
        assert!(opts.add_null_case && opts.use_asterisk && !opts.as_json);
    }
}
