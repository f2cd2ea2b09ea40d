//! Textual dtype grammar: `name[size][_endianness]` for Single,
//! `[element; items]` for Array, `(d1, d2, ...)` for Tuple.

use bitfmt_base::{value_err, Result};
use bitfmt_bits::{Endianness, Kind, SingleSpec};

use crate::dtype::Dtype;
use crate::registry;

impl Dtype {
    pub fn from_string(s: &str) -> Result<Self> {
        parse_dtype(s.trim())
    }
}

fn parse_dtype(s: &str) -> Result<Dtype> {
    if s.starts_with('(') && s.ends_with(')') {
        return parse_tuple(&s[1..s.len() - 1]);
    }
    if s.starts_with('[') && s.ends_with(']') {
        return parse_array(&s[1..s.len() - 1]);
    }
    Dtype::single(parse_single(s)?)
}

fn parse_tuple(inner: &str) -> Result<Dtype> {
    let members = split_top_level(inner, ',')?
        .into_iter()
        .map(|tok| parse_dtype(tok.trim()))
        .collect::<Result<Vec<_>>>()?;
    if members.is_empty() {
        return Err(value_err("a tuple dtype must have at least one member"));
    }
    Ok(Dtype::tuple(members))
}

fn parse_array(inner: &str) -> Result<Dtype> {
    let parts = split_top_level(inner, ';')?;
    let (element_str, items) = match parts.as_slice() {
        [element] => (element.trim(), None),
        [element, items] => {
            let items = items.trim();
            let n: usize = items
                .parse()
                .map_err(|_| value_err(format!("invalid array item count '{items}'")))?;
            (element.trim(), Some(n))
        }
        _ => return Err(value_err(format!("malformed array dtype '[{inner}]'"))),
    };
    Dtype::array(parse_single(element_str)?, items)
}

/// Splits on `sep` at nesting depth 0, respecting `()`/`[]` nesting so
/// member dtypes can themselves be arrays or tuples.
pub(crate) fn split_top_level(s: &str, sep: char) -> Result<Vec<&str>> {
    let mut depth = 0i32;
    let mut out = Vec::new();
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => {
                depth -= 1;
                if depth < 0 {
                    return Err(value_err(format!("unbalanced delimiters in '{s}'")));
                }
            }
            c if c == sep && depth == 0 => {
                out.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(value_err(format!("unbalanced delimiters in '{s}'")));
    }
    out.push(&s[start..]);
    Ok(out)
}

fn parse_single(token: &str) -> Result<SingleSpec> {
    let mut name_end = token.len();
    for (i, c) in token.char_indices() {
        if c.is_ascii_digit() {
            name_end = i;
            break;
        }
    }
    let head = &token[..name_end];
    let size_str = &token[name_end..];

    let (kind_token, endianness) = match head.split_once('_') {
        Some((kind_token, suffix)) => {
            let e = match suffix {
                "le" => Endianness::Little,
                "be" => Endianness::Big,
                "ne" => Endianness::Native,
                other => return Err(value_err(format!("unknown endianness suffix '_{other}'"))),
            };
            (kind_token, e)
        }
        None => (head, Endianness::Unspecified),
    };

    let def = registry::lookup(kind_token)?;
    let size: usize = if size_str.is_empty() {
        0
    } else {
        size_str
            .parse()
            .map_err(|_| value_err(format!("invalid size '{size_str}' in dtype token '{token}'")))?
    };
    registry::validate_size(def, size).or_else(|e| if size == 0 { Ok(()) } else { Err(e) })?;
    SingleSpec::new(def.kind, size, endianness)
}

impl std::fmt::Display for Dtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dtype::Single(spec) => write!(f, "{}", display_single(spec)),
            Dtype::Array { element, items } => match items {
                Some(n) => write!(f, "[{}; {n}]", display_single(element)),
                None => write!(f, "[{}]", display_single(element)),
            },
            Dtype::Tuple(members) => {
                write!(f, "(")?;
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{m}")?;
                }
                write!(f, ")")
            }
        }
    }
}

fn display_single(spec: &SingleSpec) -> String {
    let token = match spec.kind {
        Kind::Uint => "uint",
        Kind::Int => "int",
        Kind::Float => "float",
        Kind::Bin => "bin",
        Kind::Oct => "oct",
        Kind::Hex => "hex",
        Kind::Bytes => "bytes",
        Kind::Bits => "bits",
        Kind::Bool => "bool",
        Kind::Pad => "pad",
    };
    let endianness_suffix = match spec.endianness {
        Endianness::Little => "_le",
        Endianness::Big => "_be",
        Endianness::Native => "_ne",
        Endianness::Unspecified => "",
    };
    if spec.size == 0 {
        format!("{token}{endianness_suffix}")
    } else {
        format!("{token}{endianness_suffix}{}", spec.size)
    }
}

// Serialized as its textual form rather than the parsed descriptor, so the
// wire form is exactly what schema text already shows for a dtype.
impl serde::Serialize for Dtype {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Dtype {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s: String = serde::Deserialize::deserialize(deserializer)?;
        Dtype::from_string(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn single_round_trips() {
        for token in ["uint8", "int16", "float32", "bool", "hex4", "bits"] {
            let d = Dtype::from_string(token).unwrap();
            let back = d.to_string();
            let reparsed = Dtype::from_string(&back).unwrap();
            assert_eq!(d, reparsed, "{token} -> {back}");
        }
    }

    #[test]
    fn endianness_suffix_round_trips() {
        let d = Dtype::from_string("uint_le16").unwrap();
        assert_eq!(d.to_string(), "uint_le16");
    }

    #[test]
    fn array_round_trips() {
        let d = Dtype::from_string("[uint8; 4]").unwrap();
        assert_eq!(d.to_string(), "[uint8; 4]");
        assert_eq!(d.bit_length(), Some(32));
    }

    #[test]
    fn tuple_round_trips() {
        let d = Dtype::from_string("(uint8, bool)").unwrap();
        assert_eq!(d.to_string(), "(uint8, bool)");
        assert_eq!(d.bit_length(), Some(9));
    }

    #[test]
    fn nested_tuple_of_arrays() {
        let d = Dtype::from_string("([uint4; 2], bool)").unwrap();
        assert_eq!(d.bit_length(), Some(9));
    }

    #[test]
    fn unknown_kind_is_an_error() {
        assert!(Dtype::from_string("nope8").is_err());
    }

    #[test]
    fn bad_bool_size_is_an_error() {
        assert!(Dtype::from_string("bool2").is_err());
    }
}
