//! A mutable, list-like container over a single fixed-width element dtype,
//! backed by one contiguous [`BitSeq`]. Grounded on `_array.py`'s `Array`:
//! each item is packed/unpacked through the scalar codec, and bits left
//! over past a whole number of items are exposed as `trailing_bits` rather
//! than silently discarded.

use bitfmt_base::{byte_align_err, index_err, value_err, Result};
use bitfmt_bits::{pack, unpack, BitSeq, SingleSpec, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct BitArray {
    element: SingleSpec,
    item_size: usize,
    bits: BitSeq,
}

impl BitArray {
    pub fn new(element: SingleSpec) -> Result<Self> {
        let item_size = element
            .bit_length()
            .ok_or_else(|| value_err("an Array needs a fixed-length element dtype"))?;
        if item_size == 0 {
            return Err(value_err("an Array element dtype cannot be zero bits wide"));
        }
        Ok(BitArray { element, item_size, bits: BitSeq::empty() })
    }

    /// Binds `bits` as the array's backing storage verbatim, trailing bits
    /// and all — mirrors `Array.__init__`'s `trailing_bits` parameter.
    pub fn from_bits(element: SingleSpec, bits: BitSeq) -> Result<Self> {
        let mut a = Self::new(element)?;
        a.bits = bits;
        Ok(a)
    }

    pub fn from_values(element: SingleSpec, values: &[Value]) -> Result<Self> {
        let mut a = Self::new(element)?;
        a.extend(values)?;
        Ok(a)
    }

    pub fn element(&self) -> SingleSpec {
        self.element
    }

    pub fn item_size(&self) -> usize {
        self.item_size
    }

    pub fn len(&self) -> usize {
        self.bits.len() / self.item_size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn trailing_bits(&self) -> BitSeq {
        let rem = self.bits.len() % self.item_size;
        if rem == 0 {
            BitSeq::empty()
        } else {
            self.bits.slice(-(rem as isize), self.bits.len() as isize).unwrap()
        }
    }

    fn norm_index(&self, i: isize) -> Result<usize> {
        let len = self.len() as isize;
        let n = if i < 0 { i + len } else { i };
        if n < 0 || n >= len {
            return Err(index_err(format!("index {i} out of range for an Array of length {len}")));
        }
        Ok(n as usize)
    }

    pub fn get(&self, i: isize) -> Result<Value> {
        let n = self.norm_index(i)?;
        let start = (n * self.item_size) as isize;
        let chunk = self.bits.slice(start, start + self.item_size as isize)?;
        unpack(self.element, &chunk)
    }

    pub fn set(&mut self, i: isize, value: &Value) -> Result<()> {
        let n = self.norm_index(i)?;
        let packed = self.pack_element(value)?;
        let start = n * self.item_size;
        let mut m = self.bits.to_mut();
        m.overwrite(start, &packed)?;
        self.bits = m.freeze();
        Ok(())
    }

    fn pack_element(&self, value: &Value) -> Result<BitSeq> {
        let packed = pack(self.element, value)?;
        if packed.len() != self.item_size {
            return Err(value_err("packed value has the wrong length for this Array's element dtype"));
        }
        Ok(packed)
    }

    /// Appends one element; errors if `trailing_bits` is non-empty, since
    /// there is then no whole-item boundary to append after.
    pub fn append(&mut self, value: &Value) -> Result<()> {
        if self.bits.len() % self.item_size != 0 {
            return Err(value_err("cannot append to an Array whose length is not a multiple of the item size"));
        }
        let packed = self.pack_element(value)?;
        self.bits = self.bits.concat(&packed);
        Ok(())
    }

    pub fn extend(&mut self, values: &[Value]) -> Result<()> {
        if self.bits.len() % self.item_size != 0 {
            return Err(value_err("cannot extend an Array whose length is not a multiple of the item size"));
        }
        let mut out = self.bits.clone();
        for v in values {
            out = out.concat(&self.pack_element(v)?);
        }
        self.bits = out;
        Ok(())
    }

    /// Appends raw bits without going through the element codec, mirroring
    /// `Array.extend`'s fast path for `bytes`/`Bits` arguments.
    pub fn extend_bits(&mut self, bits: &BitSeq) {
        self.bits = self.bits.concat(bits);
    }

    pub fn insert(&mut self, pos: isize, value: &Value) -> Result<()> {
        let len = self.len() as isize;
        let pos = if pos < 0 { (pos + len).max(0) } else { pos }.min(len) as usize;
        let packed = self.pack_element(value)?;
        let mut m = self.bits.to_mut();
        m.insert(pos * self.item_size, &packed)?;
        self.bits = m.freeze();
        Ok(())
    }

    pub fn remove(&mut self, i: isize) -> Result<()> {
        let n = self.norm_index(i)?;
        let start = (n * self.item_size) as isize;
        let head = self.bits.slice(0, start)?;
        let tail = self.bits.slice(start + self.item_size as isize, self.bits.len() as isize)?;
        self.bits = head.concat(&tail);
        Ok(())
    }

    pub fn pop(&mut self, pos: isize) -> Result<Value> {
        if self.is_empty() {
            return Err(index_err("cannot pop from an empty Array"));
        }
        let value = self.get(pos)?;
        self.remove(pos)?;
        Ok(value)
    }

    pub fn byteswap(&mut self, width: Option<usize>) -> Result<()> {
        if self.item_size % 8 != 0 {
            return Err(byte_align_err(format!(
                "byteswap can only be used for whole-byte elements, but this element is {} bits",
                self.item_size
            )));
        }
        let mut m = self.bits.to_mut();
        m.byte_swap(width.or(Some(self.item_size / 8)))?;
        self.bits = m.freeze();
        Ok(())
    }

    pub fn count(&self, value: &Value) -> usize {
        let is_nan = matches!(value, Value::Float(f) if f.is_nan());
        (0..self.len())
            .filter(|&i| {
                let item = self.get(i as isize).unwrap();
                if is_nan {
                    matches!(item, Value::Float(f) if f.is_nan())
                } else {
                    item == *value
                }
            })
            .count()
    }

    pub fn to_bits(&self) -> BitSeq {
        self.bits.clone()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.bits.to_bytes()
    }

    pub fn reverse(&mut self) -> Result<()> {
        if self.bits.len() % self.item_size != 0 {
            return Err(value_err("cannot reverse an Array whose length is not a multiple of the item size"));
        }
        let n = self.len();
        let mut out = BitSeq::empty();
        for i in (0..n).rev() {
            let start = (i * self.item_size) as isize;
            out = out.concat(&self.bits.slice(start, start + self.item_size as isize)?);
        }
        self.bits = out;
        Ok(())
    }

    pub fn unpack(&self) -> Result<Vec<Value>> {
        (0..self.len()).map(|i| self.get(i as isize)).collect()
    }

    /// Builds a new array of a different element dtype from this one's
    /// unpacked values, mirroring `Array.astype`.
    pub fn astype(&self, element: SingleSpec) -> Result<Self> {
        Self::from_values(element, &self.unpack()?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bitfmt_bits::{Endianness, Kind};
    use test_log::test;

    fn u8_spec() -> SingleSpec {
        SingleSpec::new(Kind::Uint, 8, Endianness::Unspecified).unwrap()
    }

    #[test]
    fn append_and_unpack() {
        let mut a = BitArray::new(u8_spec()).unwrap();
        a.append(&Value::UInt(1)).unwrap();
        a.append(&Value::UInt(2)).unwrap();
        a.append(&Value::UInt(3)).unwrap();
        assert_eq!(a.len(), 3);
        assert_eq!(a.unpack().unwrap(), vec![Value::UInt(1), Value::UInt(2), Value::UInt(3)]);
    }

    #[test]
    fn insert_and_pop() {
        let mut a = BitArray::from_values(u8_spec(), &[Value::UInt(1), Value::UInt(2), Value::UInt(3)]).unwrap();
        a.insert(1, &Value::UInt(99)).unwrap();
        assert_eq!(a.unpack().unwrap(), vec![Value::UInt(1), Value::UInt(99), Value::UInt(2), Value::UInt(3)]);
        let popped = a.pop(-1).unwrap();
        assert_eq!(popped, Value::UInt(3));
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn reverse_and_byteswap() {
        let mut a = BitArray::from_values(u8_spec(), &[Value::UInt(1), Value::UInt(2), Value::UInt(3)]).unwrap();
        a.reverse().unwrap();
        assert_eq!(a.unpack().unwrap(), vec![Value::UInt(3), Value::UInt(2), Value::UInt(1)]);

        let u16_spec = SingleSpec::new(Kind::Uint, 16, Endianness::Unspecified).unwrap();
        let mut b = BitArray::from_values(u16_spec, &[Value::UInt(0x0102)]).unwrap();
        b.byteswap(None).unwrap();
        assert_eq!(b.unpack().unwrap(), vec![Value::UInt(0x0201)]);
    }

    #[test]
    fn count_matches_equal_elements() {
        let a = BitArray::from_values(u8_spec(), &[Value::UInt(1), Value::UInt(2), Value::UInt(1)]).unwrap();
        assert_eq!(a.count(&Value::UInt(1)), 2);
        assert_eq!(a.count(&Value::UInt(5)), 0);
    }

    #[test]
    fn append_rejects_when_trailing_bits_present() {
        let mut a = BitArray::from_bits(u8_spec(), BitSeq::from_zeros(4)).unwrap();
        assert!(!a.trailing_bits().is_empty());
        assert!(a.append(&Value::UInt(1)).is_err());
        a.extend_bits(&BitSeq::from_zeros(4));
        assert!(a.trailing_bits().is_empty());
        assert!(a.append(&Value::UInt(1)).is_ok());
    }

    #[test]
    fn astype_reinterprets_elements() {
        let a = BitArray::from_values(u8_spec(), &[Value::UInt(1), Value::UInt(2)]).unwrap();
        let wide = SingleSpec::new(Kind::Uint, 16, Endianness::Unspecified).unwrap();
        let b = a.astype(wide).unwrap();
        assert_eq!(b.len(), 2);
        assert_eq!(b.unpack().unwrap(), vec![Value::UInt(1), Value::UInt(2)]);
    }
}
