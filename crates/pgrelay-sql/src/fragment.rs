//! Fragment composition.
//!
//! A [`Fragment`] is an ordered list of trusted [`Node`]s. Fragments are assembled from static
//! text and other trusted pieces only:
//!
//! - [`sql!`](crate::sql) interleaves string literals with anything implementing
//!   [`ToFragment`];
//! - [`Fragment::template`] does the same at runtime from a segment slice and a hole slice;
//! - [`join`] concatenates trusted items with a static separator.
//!
//! [`ToFragment`] is sealed: a `String`, `&str` or number cannot be interpolated, so text that
//! did not come from a literal or a node constructor never reaches the compiler.
//!
//! ```compile_fail
//! let user_input = String::from("1; drop table users");
//! let q = pgrelay_sql::sql!("select * from users where id = ", user_input);
//! ```

use crate::compile::{CompiledQuery, compile};
use crate::error::{SqlError, SqlResult};
use crate::node::{Node, raw};

mod private {
    pub trait Sealed {}
}

/// Anything that can be spliced into a [`Fragment`].
///
/// Implemented for [`Node`], [`Fragment`], sequences of those, options of those, and
/// references. It cannot be implemented outside this crate.
pub trait ToFragment: private::Sealed {
    /// Append this value's nodes to `out`.
    fn append_to(&self, out: &mut Vec<Node>);
}

impl private::Sealed for Node {}
impl ToFragment for Node {
    fn append_to(&self, out: &mut Vec<Node>) {
        out.push(self.clone());
    }
}

impl private::Sealed for Fragment {}
impl ToFragment for Fragment {
    fn append_to(&self, out: &mut Vec<Node>) {
        out.extend(self.nodes.iter().cloned());
    }
}

impl<T: ToFragment + ?Sized> private::Sealed for &T {}
impl<T: ToFragment + ?Sized> ToFragment for &T {
    fn append_to(&self, out: &mut Vec<Node>) {
        (**self).append_to(out);
    }
}

impl<T: ToFragment> private::Sealed for [T] {}
impl<T: ToFragment> ToFragment for [T] {
    fn append_to(&self, out: &mut Vec<Node>) {
        for item in self {
            item.append_to(out);
        }
    }
}

impl<T: ToFragment> private::Sealed for Vec<T> {}
impl<T: ToFragment> ToFragment for Vec<T> {
    fn append_to(&self, out: &mut Vec<Node>) {
        self.as_slice().append_to(out);
    }
}

impl<T: ToFragment> private::Sealed for Option<T> {}
impl<T: ToFragment> ToFragment for Option<T> {
    fn append_to(&self, out: &mut Vec<Node>) {
        if let Some(inner) = self {
            inner.append_to(out);
        }
    }
}

/// An ordered sequence of trusted nodes.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct Fragment {
    nodes: Vec<Node>,
}

impl Fragment {
    /// Create an empty fragment.
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// The nodes of this fragment, in order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append trusted nodes.
    pub fn push(&mut self, part: impl ToFragment) -> &mut Self {
        part.append_to(&mut self.nodes);
        self
    }

    /// Append static SQL text.
    pub fn push_text(&mut self, text: &'static str) -> &mut Self {
        if !text.is_empty() {
            self.nodes.push(raw(text));
        }
        self
    }

    /// Append another fragment, consuming it.
    pub fn append(&mut self, mut other: Fragment) -> &mut Self {
        self.nodes.append(&mut other.nodes);
        self
    }

    /// Build a fragment from text segments interleaved with trusted holes.
    ///
    /// `segments` must have exactly one more element than `holes`, the way a template literal
    /// splits around its interpolations. A hole position with no trusted fragment behind it,
    /// or a trusted fragment with no hole to go into, is rejected.
    ///
    /// ```
    /// use pgrelay_sql::{Fragment, ident, value};
    ///
    /// let q = Fragment::template(
    ///     &["select * from ", " where id = ", ""],
    ///     &[&ident("users"), &value(1_i32)],
    /// )?;
    /// assert_eq!(q.compile()?.text, r#"select * from "users" where id = $1"#);
    /// # Ok::<(), pgrelay_sql::SqlError>(())
    /// ```
    pub fn template(segments: &[&'static str], holes: &[&dyn ToFragment]) -> SqlResult<Fragment> {
        if segments.is_empty() {
            return Err(SqlError::untrusted(0, "template has no text segments"));
        }
        let expected_holes = segments.len() - 1;
        if holes.len() > expected_holes {
            return Err(SqlError::untrusted(
                expected_holes,
                "interpolated value has no hole in the template",
            ));
        }
        if holes.len() < expected_holes {
            return Err(SqlError::untrusted(
                holes.len(),
                "hole is not backed by a trusted fragment",
            ));
        }

        let mut out = Fragment::new();
        for (i, &segment) in segments.iter().enumerate() {
            out.push_text(segment);
            if let Some(hole) = holes.get(i) {
                hole.append_to(&mut out.nodes);
            }
        }
        Ok(out)
    }

    /// Wrap this fragment in parentheses.
    pub fn parenthesized(&self) -> Fragment {
        let mut out = Fragment::new();
        out.push_text("(").push(self).push_text(")");
        out
    }

    /// Compile to query text plus bound values.
    pub fn compile(&self) -> SqlResult<CompiledQuery> {
        compile(self)
    }
}

impl From<Node> for Fragment {
    fn from(node: Node) -> Self {
        Self { nodes: vec![node] }
    }
}

impl FromIterator<Node> for Fragment {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

/// Concatenate trusted items with a static separator.
///
/// ```
/// use pgrelay_sql::{ident, join};
///
/// let cols = join([ident("a"), ident("b")], ", ");
/// assert_eq!(cols.compile()?.text, r#""a", "b""#);
/// # Ok::<(), pgrelay_sql::SqlError>(())
/// ```
pub fn join<I, T>(items: I, separator: &'static str) -> Fragment
where
    I: IntoIterator<Item = T>,
    T: ToFragment,
{
    let mut out = Fragment::new();
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            out.push_text(separator);
        }
        out.push(item);
    }
    out
}

/// Build a [`Fragment`] from string literals interleaved with trusted values.
///
/// String literals become raw text; every other argument must implement
/// [`ToFragment`](crate::ToFragment).
///
/// ```
/// use pgrelay_sql::{AliasToken, alias, ident, sql, value};
///
/// let t = AliasToken::new();
/// let q = sql!("select ", alias(t).col("id"), " from ", ident("items"), " as ", alias(t),
///              " where ", alias(t).col("pos"), " > ", value(3_i32));
/// let compiled = q.compile()?;
/// assert_eq!(
///     compiled.text,
///     r#"select __local_0__."id" from "items" as __local_0__ where __local_0__."pos" > $1"#
/// );
/// # Ok::<(), pgrelay_sql::SqlError>(())
/// ```
#[macro_export]
macro_rules! sql {
    (@acc $f:ident;) => {};
    (@acc $f:ident; $text:literal $(, $($rest:tt)*)?) => {
        $f.push_text($text);
        $crate::sql!(@acc $f; $($($rest)*)?);
    };
    (@acc $f:ident; $part:expr $(, $($rest:tt)*)?) => {
        $f.push(&($part));
        $crate::sql!(@acc $f; $($($rest)*)?);
    };
    ($($t:tt)*) => {{
        #[allow(unused_mut)]
        let mut __fragment = $crate::Fragment::new();
        $crate::sql!(@acc __fragment; $($t)*);
        __fragment
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ident, value};

    #[test]
    fn template_rejects_missing_hole() {
        let err = Fragment::template(&["a = ", " and b = ", ""], &[&value(1_i32)]).unwrap_err();
        assert_eq!(
            err,
            SqlError::untrusted(1, "hole is not backed by a trusted fragment")
        );
    }

    #[test]
    fn template_rejects_extra_value() {
        let err = Fragment::template(&["a = ", ""], &[&value(1_i32), &value(2_i32)]).unwrap_err();
        assert!(err.is_untrusted_interpolation());
    }

    #[test]
    fn template_rejects_empty_segments() {
        assert!(Fragment::template(&[], &[]).is_err());
    }

    #[test]
    fn template_splices_arrays() {
        let cols = vec![ident("a"), ident("b")];
        let q = Fragment::template(&["(", ")"], &[&cols]).unwrap();
        assert_eq!(q.compile().unwrap().text, r#"("a""b")"#);
    }

    #[test]
    fn macro_handles_options_and_empty() {
        let none: Option<Fragment> = None;
        let q = sql!("select 1", none, Some(sql!(" where true")));
        assert_eq!(q.compile().unwrap().text, "select 1 where true");
        assert!(sql!().is_empty());
    }

    #[test]
    fn join_empty_is_empty() {
        let q = join(Vec::<Node>::new(), ", ");
        assert!(q.is_empty());
    }

    #[test]
    fn parenthesized_wraps() {
        let q = sql!("a = ", value(1_i32)).parenthesized();
        assert_eq!(q.compile().unwrap().text, "(a = $1)");
    }
}
