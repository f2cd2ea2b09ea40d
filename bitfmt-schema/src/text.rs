//! Hand-written recursive descent over the schema text grammar. The grammar
//! is small and unambiguous once trailing commas are required on Formats,
//! so a direct hand-written parser is preferable to pulling in a
//! parser-generator dependency for it.

use bitfmt_base::{value_err, Result};
use bitfmt_bits::{Kind, Value as BValue};
use bitfmt_dtype::{Dtype, Value as DValue};
use bitfmt_expr::Expression;
use ordered_float::OrderedFloat;

use crate::fieldtype::{Field, FieldType, Format, If, Let, Repeat, While};

pub fn parse(s: &str) -> Result<FieldType> {
    let (node, rest) = parse_node(s)?;
    if !rest.trim().is_empty() {
        return Err(value_err(format!("unexpected trailing text: '{}'", rest.trim())));
    }
    Ok(node)
}

fn skip_ws(s: &str) -> &str {
    s.trim_start()
}

fn starts_with_keyword<'a>(s: &'a str, kw: &str) -> Option<&'a str> {
    let rest = s.strip_prefix(kw)?;
    if rest.chars().next().is_none_or(|c| !c.is_alphanumeric() && c != '_') {
        Some(rest)
    } else {
        None
    }
}

fn parse_ident(s: &str) -> Option<(&str, &str)> {
    let end = s.find(|c: char| !(c.is_alphanumeric() || c == '_')).unwrap_or(s.len());
    if end == 0 {
        None
    } else {
        Some((&s[..end], &s[end..]))
    }
}

/// Scans `s` tracking `()`/`[]` nesting depth, stopping at the first
/// depth-0 occurrence of a character in `stop`. Returns the consumed token
/// (trimmed) and whatever follows (the stop character still at its front).
fn take_balanced(s: &str, stop: &[char]) -> Result<(&str, &str)> {
    let mut depth = 0i32;
    for (i, c) in s.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            c if depth == 0 && stop.contains(&c) => return Ok((s[..i].trim(), &s[i..])),
            _ => {}
        }
        if depth < 0 {
            return Ok((s[..i].trim(), &s[i..]));
        }
    }
    Ok((s.trim(), ""))
}

fn take_brace_expr(s: &str) -> Result<(Expression, &str)> {
    let s = skip_ws(s);
    if !s.starts_with('{') {
        return Err(value_err(format!("expected '{{', found '{}'", s.chars().take(10).collect::<String>())));
    }
    let end = s.find('}').ok_or_else(|| value_err("unterminated '{' expression"))?;
    let expr = Expression::from_string(&s[..=end])?;
    Ok((expr, &s[end + 1..]))
}

fn expect<'a>(s: &'a str, ch: char) -> Result<&'a str> {
    let s = skip_ws(s);
    s.strip_prefix(ch).ok_or_else(|| value_err(format!("expected '{ch}', found '{}'", s.chars().take(10).collect::<String>())))
}

fn parse_node(s: &str) -> Result<(FieldType, &str)> {
    let s = skip_ws(s);

    if let Some(rest) = starts_with_keyword(s, "pass") {
        return Ok((FieldType::Pass, rest));
    }
    if let Some(rest) = starts_with_keyword(s, "if") {
        return parse_if(rest);
    }
    if let Some(rest) = starts_with_keyword(s, "repeat") {
        return parse_repeat(rest);
    }
    if let Some(rest) = starts_with_keyword(s, "while") {
        return parse_while(rest);
    }
    if let Some(rest) = starts_with_keyword(s, "let") {
        return parse_let(rest);
    }

    // Optional `name:` (Field) or `name =` (Format) prefix.
    if let Some((ident, after_ident)) = parse_ident(s) {
        let after_ident = skip_ws(after_ident);
        if let Some(rest) = after_ident.strip_prefix(':') {
            return parse_field(rest, Some(ident.to_string()));
        }
        if let Some(rest) = after_ident.strip_prefix('=') {
            let rest = skip_ws(rest);
            if rest.starts_with('(') {
                return parse_format(rest, Some(ident.to_string()));
            }
        }
    }

    if s.starts_with('(') {
        return parse_format(s, None);
    }
    parse_field(s, None)
}

fn parse_field(s: &str, name: Option<String>) -> Result<(FieldType, &str)> {
    let mut s = skip_ws(s);
    let mut is_const = false;
    if let Some(rest) = starts_with_keyword(s, "const") {
        is_const = true;
        s = skip_ws(rest);
    }
    let (dtype_tok, rest) = take_balanced(s, &[',', ')', '=', ':', ' '])?;
    if dtype_tok.is_empty() {
        return Err(value_err("expected a dtype"));
    }
    let dtype = Dtype::from_string(dtype_tok)?;
    let rest_ws = skip_ws(rest);
    let (const_value, rest) = if let Some(after_eq) = rest_ws.strip_prefix('=') {
        let (value_tok, rest) = take_balanced(after_eq, &[',', ')', ' '])?;
        (Some(parse_literal(&dtype, value_tok)?), rest)
    } else {
        (None, rest)
    };
    let const_value = if is_const && const_value.is_none() {
        return Err(value_err("a 'const' field requires a literal value"));
    } else {
        const_value
    };
    Ok((FieldType::Field(Field::new(name, dtype, const_value)), rest))
}

fn parse_literal(dtype: &Dtype, token: &str) -> Result<DValue> {
    let Dtype::Single(spec) = dtype else {
        return Err(value_err("only Single dtypes accept a literal value in schema text"));
    };
    let value = match spec.kind {
        Kind::Bool => match token {
            "True" => BValue::Bool(true),
            "False" => BValue::Bool(false),
            other => return Err(value_err(format!("expected True/False, found '{other}'"))),
        },
        Kind::Uint => BValue::UInt(token.parse().map_err(|_| value_err(format!("invalid uint literal '{token}'")))?),
        Kind::Int => BValue::Int(token.parse().map_err(|_| value_err(format!("invalid int literal '{token}'")))?),
        Kind::Float => {
            BValue::Float(OrderedFloat(token.parse().map_err(|_| value_err(format!("invalid float literal '{token}'")))?))
        }
        Kind::Hex => BValue::Str(token.strip_prefix("0x").unwrap_or(token).to_string()),
        Kind::Bin => BValue::Str(token.strip_prefix("0b").unwrap_or(token).to_string()),
        Kind::Oct => BValue::Str(token.strip_prefix("0o").unwrap_or(token).to_string()),
        other => return Err(value_err(format!("kind {other:?} does not support a schema-text literal"))),
    };
    Ok(DValue::Scalar(value))
}

fn parse_format(s: &str, name: Option<String>) -> Result<(FieldType, &str)> {
    let mut s = expect(s, '(')?;
    let mut children = Vec::new();
    loop {
        s = skip_ws(s);
        if s.starts_with(')') {
            break;
        }
        let (child, rest) = parse_node(s)?;
        children.push(child);
        let rest = skip_ws(rest);
        let rest = rest
            .strip_prefix(',')
            .ok_or_else(|| value_err("expected ',' after a format child (trailing comma is required)"))?;
        s = rest;
        if skip_ws(s).starts_with(')') {
            s = skip_ws(s);
            break;
        }
    }
    let rest = expect(s, ')')?;
    Ok((FieldType::Format(Format { name, children }), rest))
}

fn parse_if(s: &str) -> Result<(FieldType, &str)> {
    let (condition, rest) = take_brace_expr(s)?;
    let rest = expect(rest, ':')?;
    let (then_branch, rest) = parse_node(rest)?;
    let rest_ws = skip_ws(rest);
    let (else_branch, rest) = if let Some(after_else) = starts_with_keyword(rest_ws, "else") {
        let after_else = expect(after_else, ':')?;
        let (else_branch, rest) = parse_node(after_else)?;
        (Some(else_branch), rest)
    } else {
        (None, rest)
    };
    Ok((FieldType::If(Box::new(If::new(condition, then_branch, else_branch))), rest))
}

fn parse_repeat(s: &str) -> Result<(FieldType, &str)> {
    let (count, rest) = take_brace_expr(s)?;
    let rest = expect(rest, ':')?;
    let (body, rest) = parse_node(rest)?;
    Ok((FieldType::Repeat(Box::new(Repeat::new(count, body))), rest))
}

fn parse_while(s: &str) -> Result<(FieldType, &str)> {
    let (condition, rest) = take_brace_expr(s)?;
    let rest = expect(rest, ':')?;
    let (body, rest) = parse_node(rest)?;
    Ok((FieldType::While(Box::new(While::new(condition, body))), rest))
}

fn parse_let(s: &str) -> Result<(FieldType, &str)> {
    let s = skip_ws(s);
    let (name, rest) = parse_ident(s).ok_or_else(|| value_err("expected a name after 'let'"))?;
    let rest = expect(rest, '=')?;
    let (expr, rest) = take_brace_expr(rest)?;
    Ok((FieldType::Let(Let { name: name.to_string(), expr }), rest))
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Field(field) => {
                if let Some(name) = &field.name {
                    write!(f, "{name}: ")?;
                }
                write!(f, "{}", field.dtype)?;
                if let Some(value) = &field.const_value {
                    write!(f, " = {}", display_literal(&field.dtype, value))?;
                }
                Ok(())
            }
            FieldType::Format(format) => {
                if let Some(name) = &format.name {
                    write!(f, "{name} = ")?;
                }
                write!(f, "(")?;
                for child in &format.children {
                    write!(f, "{child}, ")?;
                }
                write!(f, ")")
            }
            FieldType::If(node) => {
                write!(f, "if {}: {}", node.condition, node.then_branch)?;
                if let Some(e) = &node.else_branch {
                    write!(f, " else: {e}")?;
                }
                Ok(())
            }
            FieldType::Repeat(node) => write!(f, "repeat {}: {}", node.count, node.body),
            FieldType::While(node) => write!(f, "while {}: {}", node.condition, node.body),
            FieldType::Let(node) => write!(f, "let {} = {}", node.name, node.expr),
            FieldType::Pass => write!(f, "pass"),
        }
    }
}

fn display_literal(dtype: &Dtype, value: &DValue) -> String {
    let DValue::Scalar(v) = value else { return String::new() };
    match v {
        BValue::Bool(b) => if *b { "True" } else { "False" }.to_string(),
        BValue::UInt(n) => n.to_string(),
        BValue::Int(n) => n.to_string(),
        BValue::Float(f) => f.0.to_string(),
        BValue::Str(digits) => {
            let Dtype::Single(spec) = dtype else { return digits.clone() };
            match spec.kind {
                Kind::Hex => format!("0x{digits}"),
                Kind::Bin => format!("0b{digits}"),
                Kind::Oct => format!("0o{digits}"),
                _ => digits.clone(),
            }
        }
        _ => String::new(),
    }
}

// Serialized as schema text rather than the parsed tree, consistent with
// how `Expression` and `Dtype` serialize as their own textual forms.
impl serde::Serialize for FieldType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for FieldType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s: String = serde::Deserialize::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::env::Env;
    use bitfmt_bits::BitSeq;
    use test_log::test;

    #[test]
    fn pass_round_trips() {
        let f = parse("pass").unwrap();
        assert_eq!(f.to_string(), "pass");
    }

    #[test]
    fn field_with_const_round_trips() {
        let f = parse("header: hex2 = 0x47").unwrap();
        assert_eq!(f.to_string(), "header: hex2 = 0x47");
    }

    #[test]
    fn full_schema_parses_and_runs() {
        let mut schema =
            parse("(header: hex2 = 0x47, flag: bool, if {flag}: data: bits48 else: data: bool, value: float32,)")
                .unwrap();
        let mut bits = BitSeq::from_hex("47").unwrap();
        bits = bits.concat(&BitSeq::from_bin("1").unwrap());
        bits = bits.concat(&BitSeq::from_hex("050403020100").unwrap());
        bits = bits.concat(&BitSeq::from_bytes((6.5f32).to_be_bytes().to_vec()));
        let mut env = Env::new();
        let consumed = schema.parse(&bits, &mut env).unwrap();
        assert_eq!(consumed, bits.len());
        if let crate::fieldtype::TreeValue::List(items) = schema.unpack() {
            assert_eq!(items.len(), 4);
        } else {
            panic!("expected a list");
        }
    }

    #[test]
    fn repeat_round_trips() {
        let f = parse("repeat {3}: item: uint8").unwrap();
        assert_eq!(f.to_string(), "repeat {3}: item: uint8");
    }

    #[test]
    fn let_round_trips() {
        let f = parse("let n = {2 + 2}").unwrap();
        assert_eq!(f.to_string(), "let n = {2 + 2}");
    }

    #[test]
    fn format_requires_trailing_comma() {
        assert!(parse("(a: uint8)").is_err());
        assert!(parse("(a: uint8,)").is_ok());
    }
}
