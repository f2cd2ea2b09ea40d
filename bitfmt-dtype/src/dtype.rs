//! `Single`/`Array`/`Tuple` descriptors, built on top of the scalar codec
//! in `bitfmt-bits`. A `Dtype` is the registry-validated, composable unit a
//! `Field` wraps; `Value` is its runtime counterpart.

use bitfmt_base::{value_err, Result};
use bitfmt_bits::{pack as pack_single, unpack as unpack_single, BitSeq, SingleSpec};

use crate::registry::{self, validate_size};

#[derive(Debug, Clone, PartialEq)]
pub enum Dtype {
    Single(SingleSpec),
    Array { element: SingleSpec, items: Option<usize> },
    Tuple(Vec<Dtype>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(bitfmt_bits::Value),
    Array(Vec<Value>),
    Tuple(Vec<Value>),
}

impl Dtype {
    pub fn single(spec: SingleSpec) -> Result<Self> {
        let def = registry::lookup(token_for(spec.kind))?;
        if spec.size != 0 {
            validate_size(def, spec.size)?;
        }
        Ok(Dtype::Single(spec))
    }

    pub fn array(element: SingleSpec, items: Option<usize>) -> Result<Self> {
        let def = registry::lookup(token_for(element.kind))?;
        if element.size != 0 {
            validate_size(def, element.size)?;
        }
        Ok(Dtype::Array { element, items })
    }

    pub fn tuple(members: Vec<Dtype>) -> Self {
        Dtype::Tuple(members)
    }

    pub fn bit_length(&self) -> Option<usize> {
        match self {
            Dtype::Single(spec) => spec.bit_length(),
            Dtype::Array { element, items } => {
                let per_item = element.bit_length()?;
                let n = (*items)?;
                Some(per_item * n)
            }
            Dtype::Tuple(members) => {
                let mut total = 0;
                for m in members {
                    total += m.bit_length()?;
                }
                Some(total)
            }
        }
    }

    pub fn is_stretchy(&self) -> bool {
        self.bit_length().is_none()
    }

    pub fn pack(&self, value: &Value) -> Result<BitSeq> {
        match (self, value) {
            (Dtype::Single(spec), Value::Scalar(v)) => pack_single(*spec, v),
            (Dtype::Array { element, items }, Value::Array(vs)) => {
                if let Some(n) = items {
                    if vs.len() != *n {
                        return Err(value_err(format!(
                            "array dtype expects {n} items, but {} were given",
                            vs.len()
                        )));
                    }
                }
                let mut out = BitSeq::empty();
                for v in vs {
                    let Value::Scalar(scalar) = v else {
                        return Err(value_err("array element value must be a scalar"));
                    };
                    out = out.concat(&pack_single(*element, scalar)?);
                }
                Ok(out)
            }
            (Dtype::Tuple(members), Value::Tuple(vs)) => {
                if members.len() != vs.len() {
                    return Err(value_err(format!(
                        "tuple dtype has {} members, but {} values were given",
                        members.len(),
                        vs.len()
                    )));
                }
                let mut out = BitSeq::empty();
                for (m, v) in members.iter().zip(vs) {
                    out = out.concat(&m.pack(v)?);
                }
                Ok(out)
            }
            _ => Err(value_err("value shape does not match dtype shape")),
        }
    }

    pub fn unpack(&self, bits: &BitSeq) -> Result<Value> {
        match self {
            Dtype::Single(spec) => Ok(Value::Scalar(unpack_single(*spec, bits)?)),
            Dtype::Array { element, items } => {
                let per_item = element
                    .bit_length()
                    .ok_or_else(|| value_err("array element dtype must have a known size"))?;
                let n = match items {
                    Some(n) => *n,
                    None => {
                        if per_item == 0 || bits.len() % per_item != 0 {
                            return Err(value_err("cannot infer array item count from bit length"));
                        }
                        bits.len() / per_item
                    }
                };
                if bits.len() != per_item * n {
                    return Err(value_err(format!(
                        "array dtype expects {} bits, but {} were given",
                        per_item * n,
                        bits.len()
                    )));
                }
                let mut out = Vec::with_capacity(n);
                for i in 0..n {
                    let chunk = bits.slice((i * per_item) as isize, ((i + 1) * per_item) as isize)?;
                    out.push(Value::Scalar(unpack_single(*element, &chunk)?));
                }
                Ok(Value::Array(out))
            }
            Dtype::Tuple(members) => {
                let mut out = Vec::with_capacity(members.len());
                let mut pos = 0isize;
                for m in members {
                    let len = m
                        .bit_length()
                        .ok_or_else(|| value_err("tuple members must each have a known size"))? as isize;
                    let chunk = bits.slice(pos, pos + len)?;
                    out.push(m.unpack(&chunk)?);
                    pos += len;
                }
                if pos as usize != bits.len() {
                    return Err(value_err(format!(
                        "tuple dtype expects {pos} bits, but {} were given",
                        bits.len()
                    )));
                }
                Ok(Value::Tuple(out))
            }
        }
    }
}

fn token_for(kind: bitfmt_bits::Kind) -> &'static str {
    use bitfmt_bits::Kind::*;
    match kind {
        Uint => "uint",
        Int => "int",
        Float => "float",
        Bin => "bin",
        Oct => "oct",
        Hex => "hex",
        Bytes => "bytes",
        Bits => "bits",
        Bool => "bool",
        Pad => "pad",
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bitfmt_bits::{Endianness, Kind};
    use test_log::test;

    #[test]
    fn array_round_trip() {
        let element = SingleSpec::new(Kind::Uint, 8, Endianness::Unspecified).unwrap();
        let dtype = Dtype::array(element, Some(3)).unwrap();
        let value = Value::Array(vec![
            Value::Scalar(bitfmt_bits::Value::UInt(1)),
            Value::Scalar(bitfmt_bits::Value::UInt(2)),
            Value::Scalar(bitfmt_bits::Value::UInt(3)),
        ]);
        let bits = dtype.pack(&value).unwrap();
        assert_eq!(bits.len(), 24);
        assert_eq!(dtype.unpack(&bits).unwrap(), value);
    }

    #[test]
    fn tuple_round_trip() {
        let u8_spec = SingleSpec::new(Kind::Uint, 8, Endianness::Unspecified).unwrap();
        let bool_spec = SingleSpec::new(Kind::Bool, 1, Endianness::Unspecified).unwrap();
        let dtype = Dtype::tuple(vec![Dtype::single(u8_spec).unwrap(), Dtype::single(bool_spec).unwrap()]);
        let value = Value::Tuple(vec![
            Value::Scalar(bitfmt_bits::Value::UInt(200)),
            Value::Scalar(bitfmt_bits::Value::Bool(true)),
        ]);
        let bits = dtype.pack(&value).unwrap();
        assert_eq!(bits.len(), 9);
        assert_eq!(dtype.unpack(&bits).unwrap(), value);
    }

    #[test]
    fn array_infers_item_count_from_bit_length() {
        let element = SingleSpec::new(Kind::Uint, 4, Endianness::Unspecified).unwrap();
        let dtype = Dtype::array(element, None).unwrap();
        let bits = BitSeq::from_zeros(12);
        let Value::Array(items) = dtype.unpack(&bits).unwrap() else { panic!() };
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn rejects_bad_size_for_kind() {
        assert!(SingleSpec::new(Kind::Bool, 1, Endianness::Unspecified)
            .and_then(Dtype::single)
            .is_ok());
        let bad = SingleSpec { kind: Kind::Bool, size: 2, endianness: Endianness::Unspecified };
        assert!(Dtype::single(bad).is_err());
    }
}
