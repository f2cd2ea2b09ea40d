//! Bit-level binary format definition, parsing and generation: the public
//! facade over the `bitfmt-*` crates. See each crate's own docs for the
//! scalar codec, the dtype registry, the sandboxed expression language, and
//! the FieldType/schema-text layer respectively.

pub use bitfmt_base::{Error, ErrorKind, Result};

pub use bitfmt_bits::{pack, unpack, BitSeq, Endianness, Kind, MutBitSeq, SingleSpec, Value as ScalarValue};

pub use bitfmt_dtype::{parse_bit_literal, BitArray, Dtype, Value as DtypeValue};

pub use bitfmt_expr::{Env as ExprEnv, Expression, Value as ExprValue};

pub use bitfmt_schema::{parse_schema, Env, Field, FieldType, Format, If, Let, Options, Reader, Repeat, TreeValue, While};

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn find_byte_aligned() {
        let a = BitSeq::from_bin("00000110001110").unwrap();
        let sub = BitSeq::from_bin("11").unwrap();
        assert_eq!(a.find(&sub, false).unwrap(), Some(5));
        assert_eq!(a.find(&sub, true).unwrap(), None);
    }

    #[test]
    fn expression_arithmetic() {
        let e = Expression::from_string("{x + y*2}").unwrap();
        let mut env = ExprEnv::new();
        env.insert("x".to_string(), ExprValue::Int(3));
        env.insert("y".to_string(), ExprValue::Int(4));
        assert_eq!(e.evaluate(&env).unwrap(), ExprValue::Int(11));
        env.remove("y");
        assert!(e.evaluate(&env).is_err());
    }

    #[test]
    fn composite_bit_literal_concatenates_in_order() {
        let bits = parse_bit_literal("0xf, uint4=5").unwrap();
        assert_eq!(bits.bin(), "11110101");
    }

    #[test]
    fn bit_array_append_reverse_and_byteswap() {
        let spec = SingleSpec::new(Kind::Uint, 16, Endianness::Unspecified).unwrap();
        let mut arr = BitArray::new(spec).unwrap();
        arr.append(&ScalarValue::UInt(1)).unwrap();
        arr.append(&ScalarValue::UInt(2)).unwrap();
        arr.append(&ScalarValue::UInt(3)).unwrap();
        arr.reverse().unwrap();
        assert_eq!(
            arr.unpack().unwrap(),
            vec![ScalarValue::UInt(3), ScalarValue::UInt(2), ScalarValue::UInt(1)]
        );
        arr.byteswap(None).unwrap();
        assert_eq!(arr.get(0).unwrap(), ScalarValue::UInt(0x0300));
    }

    #[test]
    fn end_to_end_schema() {
        let mut schema = parse_schema("(magic: uint8 = 42, payload: uint16,)").unwrap();
        let bits = BitSeq::from_bytes(vec![42, 1, 0]);
        let mut env = Env::new();
        let consumed = schema.parse(&bits, &mut env).unwrap();
        assert_eq!(consumed, 24);
    }
}
