//! Fragment compiler.
//!
//! A single forward pass over the nodes of a fragment:
//!
//! - raw text is appended verbatim;
//! - identifier names are wrapped in `"` with embedded `"` doubled, alias tokens are replaced
//!   by `__local_N__` (first-seen order, per call), and parts are joined with `.`;
//! - values are pushed onto the parameter list and replaced by `$n`.

use crate::alias::AliasToken;
use crate::error::{SqlError, SqlResult};
use crate::fragment::Fragment;
use crate::node::{IdentPart, NodeKind};
use crate::param::Param;
use std::collections::HashMap;
use tokio_postgres::types::ToSql;

/// Query text with `$1, $2, ...` placeholders plus the values they refer to.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    pub text: String,
    pub values: Vec<Param>,
}

impl CompiledQuery {
    /// Access the SQL string.
    pub fn sql(&self) -> &str {
        &self.text
    }

    /// Parameter refs compatible with `tokio-postgres`.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.values.iter().map(Param::as_ref).collect()
    }
}

#[derive(Default)]
struct Compiler {
    text: String,
    values: Vec<Param>,
    locals: HashMap<AliasToken, usize>,
}

impl Compiler {
    fn write_identifier(&mut self, parts: &[IdentPart]) -> SqlResult<()> {
        if parts.is_empty() {
            return Err(SqlError::invalid_node("identifier has no parts"));
        }
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                self.text.push('.');
            }
            match part {
                IdentPart::Name(name) => {
                    if name.is_empty() {
                        return Err(SqlError::invalid_node("empty identifier part"));
                    }
                    if name.contains('\0') {
                        return Err(SqlError::invalid_node(
                            "identifier cannot contain NUL character",
                        ));
                    }
                    self.text.push('"');
                    for ch in name.chars() {
                        if ch == '"' {
                            self.text.push_str("\"\"");
                        } else {
                            self.text.push(ch);
                        }
                    }
                    self.text.push('"');
                }
                IdentPart::Alias(token) => {
                    let next = self.locals.len();
                    let n = *self.locals.entry(*token).or_insert(next);
                    self.text.push_str("__local_");
                    push_usize(&mut self.text, n);
                    self.text.push_str("__");
                }
            }
        }
        Ok(())
    }
}

// Write a usize as decimal digits into `out` without going through fmt.
fn push_usize(out: &mut String, mut n: usize) {
    let mut buf = [0u8; 20];
    let mut pos = buf.len();
    loop {
        pos -= 1;
        buf[pos] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    out.extend(buf[pos..].iter().map(|&b| char::from(b)));
}

/// Compile a fragment to text plus values.
///
/// Alias numbering starts at `__local_0__` on every call; the mapping is never shared between
/// calls.
pub fn compile(fragment: &Fragment) -> SqlResult<CompiledQuery> {
    let mut c = Compiler::default();
    for node in fragment.nodes() {
        match node.kind() {
            NodeKind::Raw(text) => {
                if text.contains('\0') {
                    return Err(SqlError::invalid_node(
                        "raw SQL cannot contain NUL character",
                    ));
                }
                c.text.push_str(text);
            }
            NodeKind::Identifier(parts) => c.write_identifier(parts)?,
            NodeKind::Value(param) => {
                c.values.push(param.clone());
                c.text.push('$');
                push_usize(&mut c.text, c.values.len());
            }
        }
    }
    Ok(CompiledQuery {
        text: c.text,
        values: c.values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{IdentPart, alias, ident, identifier, raw, value};
    use crate::sql;

    #[test]
    fn placeholders_follow_value_order() {
        let q = sql!("select ", value(1_i32), ", ", value("x"), ", ", value(2.5_f64));
        let c = compile(&q).unwrap();
        assert_eq!(c.text, "select $1, $2, $3");
        assert_eq!(format!("{:?}", c.values), r#"[1, "x", 2.5]"#);
        assert_eq!(c.params_ref().len(), 3);
    }

    #[test]
    fn many_placeholders() {
        let mut q = Fragment::new();
        for i in 0..12_i32 {
            q.push(value(i));
        }
        let c = compile(&q).unwrap();
        assert!(c.text.ends_with("$10$11$12"));
    }

    #[test]
    fn identifiers_are_quoted_and_escaped() {
        let c = compile(&sql!(identifier(["public", "my \"table\""]))).unwrap();
        assert_eq!(c.text, r#""public"."my ""table""""#);
    }

    #[test]
    fn same_token_same_local_name() {
        let t = AliasToken::new();
        let q = sql!(alias(t), " ", alias(t).col("id"));
        assert_eq!(compile(&q).unwrap().text, r#"__local_0__ __local_0__."id""#);
    }

    #[test]
    fn distinct_tokens_get_sequential_names() {
        let a = AliasToken::new();
        let b = AliasToken::new();
        let q = sql!(alias(b), ", ", alias(a), ", ", alias(b));
        assert_eq!(compile(&q).unwrap().text, "__local_0__, __local_1__, __local_0__");
    }

    #[test]
    fn numbering_restarts_per_call() {
        let a = AliasToken::new();
        let b = AliasToken::new();
        let first = sql!(alias(a), ", ", alias(b));
        let second = sql!(alias(b));
        assert_eq!(compile(&first).unwrap().text, "__local_0__, __local_1__");
        assert_eq!(compile(&second).unwrap().text, "__local_0__");
        // Compiling the same fragment twice gives identical output.
        assert_eq!(compile(&first).unwrap().text, compile(&first).unwrap().text);
    }

    #[test]
    fn rejects_empty_identifier() {
        let err = compile(&sql!(identifier(Vec::<IdentPart>::new()))).unwrap_err();
        assert!(err.is_invalid_node());
        assert!(compile(&sql!(ident(""))).unwrap_err().is_invalid_node());
        assert!(compile(&sql!(ident("a\0b"))).unwrap_err().is_invalid_node());
    }

    #[test]
    fn rejects_nul_in_raw() {
        let err = compile(&sql!(raw("select \0"))).unwrap_err();
        assert!(err.is_invalid_node());
    }

    #[test]
    fn push_usize_writes_digits() {
        let mut s = String::new();
        push_usize(&mut s, 0);
        push_usize(&mut s, 9);
        push_usize(&mut s, 1234567);
        assert_eq!(s, "091234567");
    }
}
