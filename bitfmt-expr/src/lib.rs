mod ast;
mod eval;
mod lexer;
mod parser;

pub use eval::{Env, Value};

use bitfmt_base::{ErrorKind, Result};

/// A compiled, sandboxed arithmetic/boolean expression, as written inside
/// braces in schema text (`{x + 1}`). Compilation parses the string into an
/// AST restricted to the whitelisted node kinds; nothing resembling `eval`
/// is involved.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    code_str: String,
    ast: ast::Expr,
}

impl Expression {
    /// Parse an expression from its bare code (without the surrounding
    /// braces); braces, if present, are stripped first.
    pub fn from_string(s: &str) -> Result<Self> {
        let inner = s.trim();
        let inner = inner.strip_prefix('{').and_then(|s| s.strip_suffix('}')).unwrap_or(inner);
        let ast = parser::parse(inner)?;
        Ok(Expression { code_str: inner.to_string(), ast })
    }

    pub fn from_int(n: i128) -> Self {
        Expression { code_str: n.to_string(), ast: ast::Expr::Int(n) }
    }

    pub fn code_str(&self) -> &str {
        &self.code_str
    }

    pub fn evaluate(&self, env: &Env) -> Result<Value> {
        eval::eval(&self.ast, env)
    }

    /// Evaluate against an empty environment, treating an unbound-name
    /// failure as "not a compile-time constant" rather than an error. Used
    /// by `If`/`Repeat` to detect expressions whose value doesn't depend on
    /// the parse/pack environment.
    pub fn try_const_value(&self) -> Option<Value> {
        match self.evaluate(&Env::new()) {
            Ok(v) => Some(v),
            Err(e) if e.kind() == ErrorKind::Expression => None,
            Err(_) => None,
        }
    }

    pub fn has_const_value(&self) -> bool {
        self.try_const_value().is_some()
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}}}", self.code_str)
    }
}

// Serialized as its source text rather than the parsed AST, so the wire
// form is exactly what schema text already shows for an expression field.
impl serde::Serialize for Expression {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.code_str)
    }
}

impl<'de> serde::Deserialize<'de> for Expression {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s: String = serde::Deserialize::deserialize(deserializer)?;
        Expression::from_string(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn from_string_strips_braces() {
        let e = Expression::from_string("{x + 1}").unwrap();
        assert_eq!(e.code_str(), "x + 1");
    }

    #[test]
    fn const_vs_dynamic() {
        let constant = Expression::from_string("{2 + 2}").unwrap();
        assert_eq!(constant.try_const_value(), Some(Value::Int(4)));

        let dynamic = Expression::from_string("{x + 2}").unwrap();
        assert_eq!(dynamic.try_const_value(), None);
    }

    #[test]
    fn display_round_trips_braces() {
        let e = Expression::from_string("{x}").unwrap();
        assert_eq!(e.to_string(), "{x}");
    }
}
