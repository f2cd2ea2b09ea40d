//! The composite bit-literal grammar: wherever a `BitSeq` is accepted from a
//! string, it may be written as a comma-separated list of tokens, each one
//! `0x...`, `0b...`, `0o...`, or `kind[size][_endianness]=value`, concatenated
//! in listed order.

use ordered_float::OrderedFloat;

use bitfmt_base::{value_err, Result};
use bitfmt_bits::{pack, BitSeq, Value};

use crate::dtype::Dtype;
use crate::parse::split_top_level;

/// Parses the composite bit-literal grammar into a single concatenated
/// `BitSeq`. Each comma-separated token is either a bare `0x`/`0b`/`0o`
/// run or a `dtype=value` pair.
pub fn parse_bit_literal(s: &str) -> Result<BitSeq> {
    let tokens = split_top_level(s, ',')?;
    let mut parts = Vec::with_capacity(tokens.len());
    for token in tokens {
        parts.push(parse_token(token.trim())?);
    }
    Ok(BitSeq::from_joined(parts.iter()))
}

fn parse_token(token: &str) -> Result<BitSeq> {
    if token.starts_with("0x") {
        return BitSeq::from_hex(token);
    }
    if token.starts_with("0b") {
        return BitSeq::from_bin(token);
    }
    if token.starts_with("0o") {
        return BitSeq::from_oct(token);
    }
    let (dtype_str, value_str) = token
        .split_once('=')
        .ok_or_else(|| value_err(format!("'{token}' is neither a 0x/0b/0o run nor a dtype=value pair")))?;
    let Dtype::Single(spec) = Dtype::from_string(dtype_str.trim())? else {
        return Err(value_err(format!("'{dtype_str}' in bit literal '{token}' must be a single dtype")));
    };
    let value = parse_value(spec.kind, value_str.trim(), token)?;
    pack(spec, &value)
}

fn parse_value(kind: bitfmt_bits::Kind, value_str: &str, token: &str) -> Result<Value> {
    use bitfmt_bits::Kind;
    let invalid = || value_err(format!("invalid literal value '{value_str}' in bit literal '{token}'"));
    Ok(match kind {
        Kind::Bool => match value_str {
            "True" => Value::Bool(true),
            "False" => Value::Bool(false),
            _ => return Err(invalid()),
        },
        Kind::Uint => Value::UInt(value_str.parse().map_err(|_| invalid())?),
        Kind::Int => Value::Int(value_str.parse().map_err(|_| invalid())?),
        Kind::Float => Value::Float(OrderedFloat(value_str.parse().map_err(|_| invalid())?)),
        Kind::Hex => Value::Str(value_str.strip_prefix("0x").unwrap_or(value_str).to_string()),
        Kind::Bin => Value::Str(value_str.strip_prefix("0b").unwrap_or(value_str).to_string()),
        Kind::Oct => Value::Str(value_str.strip_prefix("0o").unwrap_or(value_str).to_string()),
        Kind::Bytes => Value::Str(value_str.strip_prefix("0x").unwrap_or(value_str).to_string()),
        other => return Err(value_err(format!("kind {other:?} does not support a bit-literal value"))),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn bare_hex_bin_oct_concatenate() {
        let bits = parse_bit_literal("0xff, 0b101, 0o7").unwrap();
        assert_eq!(bits.bin(), "111111111101111");
    }

    #[test]
    fn dtype_value_token_packs_through_the_registry() {
        let bits = parse_bit_literal("uint8=3").unwrap();
        assert_eq!(bits.bin(), "00000011");
    }

    #[test]
    fn mixed_tokens_concatenate_in_listed_order() {
        let bits = parse_bit_literal("0xf, bool=True, uint4=5").unwrap();
        assert_eq!(bits.len(), 4 + 1 + 4);
        assert_eq!(bits.bin(), "111110101");
    }

    #[test]
    fn rejects_a_malformed_token() {
        assert!(parse_bit_literal("not_a_token").is_err());
    }
}
