//! Wraps a [`BitSeq`] and a bit cursor. `peek` is the supplemented
//! non-advancing counterpart to `read`.

use bitfmt_base::{read_err, Result};
use bitfmt_bits::BitSeq;
use bitfmt_dtype::{Dtype, Value};

use crate::env::Env;
use crate::fieldtype::FieldType;

pub struct Reader {
    bits: BitSeq,
    pos: usize,
}

impl Reader {
    pub fn new(bits: BitSeq) -> Self {
        Reader { bits, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bits.len() - self.pos
    }

    fn take(&self, n: usize) -> Result<BitSeq> {
        if n > self.remaining() {
            return Err(read_err(format!(
                "attempted to read {n} bits with only {} remaining",
                self.remaining()
            )));
        }
        self.bits.slice(self.pos as isize, (self.pos + n) as isize)
    }

    /// Reads `n` bits and advances the cursor.
    pub fn read_bits(&mut self, n: usize) -> Result<BitSeq> {
        let chunk = self.take(n)?;
        self.pos += n;
        Ok(chunk)
    }

    /// Same as [`Self::read_bits`] but leaves the cursor untouched.
    pub fn peek_bits(&self, n: usize) -> Result<BitSeq> {
        self.take(n)
    }

    pub fn read_dtype(&mut self, dtype: &Dtype) -> Result<Value> {
        let n = dtype
            .bit_length()
            .ok_or_else(|| read_err("cannot read a stretchy dtype without an explicit length"))?;
        let bits = self.read_bits(n)?;
        dtype.unpack(&bits)
    }

    pub fn peek_dtype(&self, dtype: &Dtype) -> Result<Value> {
        let n = dtype
            .bit_length()
            .ok_or_else(|| read_err("cannot peek a stretchy dtype without an explicit length"))?;
        let bits = self.peek_bits(n)?;
        dtype.unpack(&bits)
    }

    /// Parses `field` at the current position, advancing by however many
    /// bits it consumed.
    pub fn parse(&mut self, field: &mut FieldType, env: &mut Env) -> Result<usize> {
        let remaining = self.take(self.remaining())?;
        let consumed = field.parse(&remaining, env)?;
        self.pos += consumed;
        Ok(consumed)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bitfmt_bits::{Endianness, Kind, SingleSpec};
    use test_log::test;

    #[test]
    fn read_and_peek_dont_interfere() {
        let mut r = Reader::new(BitSeq::from_bytes(vec![0xff, 0x00]));
        let dtype = Dtype::single(SingleSpec::new(Kind::Uint, 8, Endianness::Unspecified).unwrap()).unwrap();
        let peeked = r.peek_dtype(&dtype).unwrap();
        assert_eq!(r.pos(), 0);
        let read = r.read_dtype(&dtype).unwrap();
        assert_eq!(peeked, read);
        assert_eq!(r.pos(), 8);
    }

    #[test]
    fn read_past_end_is_an_error() {
        let mut r = Reader::new(BitSeq::from_zeros(4));
        assert!(r.read_bits(8).is_err());
    }
}
