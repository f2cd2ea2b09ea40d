//! The process-wide table of kind definitions. Populated once with the
//! built-in kinds; there is no mid-flight registration API.

use std::sync::OnceLock;

use bitfmt_base::{value_err, Result};
use bitfmt_bits::Kind;

/// The set of sizes a kind accepts, expressed the way the Python reference's
/// `AllowedLengths` does: either unconstrained, a single fixed value, or an
/// equally-spaced range with no upper bound (`start, start+step, ...`).
#[derive(Debug, Clone, Copy)]
pub enum AllowedSizes {
    Any,
    Exactly(usize),
    OneOf(&'static [usize]),
    SteppedFrom { start: usize, step: usize },
    /// Like `SteppedFrom`, but bounded above by `max` (inclusive). Used for
    /// `uint`/`int`, whose scalar representation is a fixed-width `u128`/
    /// `i128` rather than a true arbitrary-precision integer.
    SteppedUpTo { start: usize, step: usize, max: usize },
}

impl AllowedSizes {
    pub fn contains(&self, n: usize) -> bool {
        match self {
            AllowedSizes::Any => true,
            AllowedSizes::Exactly(v) => n == *v,
            AllowedSizes::OneOf(vs) => vs.contains(&n),
            AllowedSizes::SteppedFrom { start, step } => n >= *start && (n - start) % step == 0,
            AllowedSizes::SteppedUpTo { start, step, max } => {
                n >= *start && n <= *max && (n - start) % step == 0
            }
        }
    }

    pub fn only_one_value(&self) -> Option<usize> {
        match self {
            AllowedSizes::Exactly(v) => Some(*v),
            _ => None,
        }
    }
}

pub struct KindDefinition {
    pub kind: Kind,
    pub token: &'static str,
    pub description: &'static str,
    pub allowed_sizes: AllowedSizes,
    pub allows_endianness: bool,
}

pub fn definitions() -> &'static [KindDefinition] {
    static TABLE: OnceLock<Vec<KindDefinition>> = OnceLock::new();
    TABLE.get_or_init(|| {
        vec![
            KindDefinition {
                kind: Kind::Uint,
                token: "uint",
                description: "an unsigned two's-complement integer, up to 128 bits wide",
                allowed_sizes: AllowedSizes::SteppedUpTo { start: 1, step: 1, max: 128 },
                allows_endianness: true,
            },
            KindDefinition {
                kind: Kind::Int,
                token: "int",
                description: "a signed two's-complement integer, up to 128 bits wide",
                allowed_sizes: AllowedSizes::SteppedUpTo { start: 1, step: 1, max: 128 },
                allows_endianness: true,
            },
            KindDefinition {
                kind: Kind::Float,
                token: "float",
                description: "an IEEE 754 floating point number",
                allowed_sizes: AllowedSizes::OneOf(&[16, 32, 64]),
                allows_endianness: true,
            },
            KindDefinition {
                kind: Kind::Bin,
                token: "bin",
                description: "a sequence of binary digit characters",
                allowed_sizes: AllowedSizes::SteppedFrom { start: 0, step: 1 },
                allows_endianness: false,
            },
            KindDefinition {
                kind: Kind::Oct,
                token: "oct",
                description: "a sequence of octal digit characters",
                allowed_sizes: AllowedSizes::SteppedFrom { start: 0, step: 1 },
                allows_endianness: false,
            },
            KindDefinition {
                kind: Kind::Hex,
                token: "hex",
                description: "a sequence of hexadecimal digit characters",
                allowed_sizes: AllowedSizes::SteppedFrom { start: 0, step: 1 },
                allows_endianness: false,
            },
            KindDefinition {
                kind: Kind::Bytes,
                token: "bytes",
                description: "a byte string",
                allowed_sizes: AllowedSizes::SteppedFrom { start: 0, step: 1 },
                allows_endianness: false,
            },
            KindDefinition {
                kind: Kind::Bits,
                token: "bits",
                description: "a raw bit sequence",
                allowed_sizes: AllowedSizes::SteppedFrom { start: 0, step: 1 },
                allows_endianness: false,
            },
            KindDefinition {
                kind: Kind::Bool,
                token: "bool",
                description: "a single boolean bit",
                allowed_sizes: AllowedSizes::Exactly(1),
                allows_endianness: false,
            },
            KindDefinition {
                kind: Kind::Pad,
                token: "pad",
                description: "padding bits with no associated value",
                allowed_sizes: AllowedSizes::SteppedFrom { start: 0, step: 1 },
                allows_endianness: false,
            },
        ]
    })
}

pub fn lookup(token: &str) -> Result<&'static KindDefinition> {
    definitions()
        .iter()
        .find(|d| d.token == token)
        .ok_or_else(|| value_err(format!("unknown dtype name '{token}'. Names available: {:?}", known_tokens())))
}

fn known_tokens() -> Vec<&'static str> {
    definitions().iter().map(|d| d.token).collect()
}

pub fn validate_size(def: &KindDefinition, size: usize) -> Result<()> {
    if !def.allowed_sizes.contains(size) {
        return Err(value_err(format!(
            "a size of {size} was supplied for the '{}' dtype, which is not one of its allowed sizes",
            def.token
        )));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn uint_and_int_are_capped_at_128_bits() {
        let uint = lookup("uint").unwrap();
        assert!(validate_size(uint, 128).is_ok());
        assert!(validate_size(uint, 129).is_err());
        let int = lookup("int").unwrap();
        assert!(validate_size(int, 128).is_ok());
        assert!(validate_size(int, 129).is_err());
    }
}
