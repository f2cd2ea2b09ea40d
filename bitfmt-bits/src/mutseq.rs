use bitfmt_base::{value_err, Result};

use crate::raw;
use crate::seq::BitSeq;

/// An exclusively-owned, mutable bit sequence. Converting to/from
/// [`BitSeq`] (via [`BitSeq::to_mut`] and [`MutBitSeq::freeze`]) always
/// copies, which is a deliberately simple rendering of "mutation that
/// aliases an immutable view must copy-on-write": there is no aliasing to
/// begin with, because the conversion boundary copies unconditionally.
pub struct MutBitSeq {
    buf: Vec<u8>,
    start: usize,
    end: usize,
}

impl MutBitSeq {
    pub(crate) fn from_bytes_vec(buf: Vec<u8>, len: usize) -> Self {
        MutBitSeq { buf, start: 0, end: len }
    }

    pub fn from_zeros(n: usize) -> Self {
        MutBitSeq::from_bytes_vec(raw::zeroed_bytes(n), n)
    }

    pub fn from_ones(n: usize) -> Self {
        MutBitSeq::from_bytes_vec(raw::ones_bytes(n), n)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn freeze(&self) -> BitSeq {
        BitSeq::from_bytes(raw::to_bytes(&self.buf, self.start, self.len()))
    }

    pub fn get(&self, i: usize) -> bool {
        raw::get_bit(&self.buf, self.start + i)
    }

    pub fn set_bit(&mut self, i: usize, v: bool) {
        raw::set_bit(&mut self.buf, self.start + i, v);
    }

    fn checked_equal_len(&self, other: &BitSeq) -> Result<()> {
        if self.len() != other.len() {
            return Err(value_err(format!(
                "in-place op requires equal lengths ({} vs {})",
                self.len(),
                other.len()
            )));
        }
        Ok(())
    }

    pub fn iand(&mut self, other: &BitSeq) -> Result<&mut Self> {
        self.checked_equal_len(other)?;
        for i in 0..self.len() {
            let v = self.get(i) && other.get(i as isize).unwrap();
            self.set_bit(i, v);
        }
        Ok(self)
    }

    pub fn ior(&mut self, other: &BitSeq) -> Result<&mut Self> {
        self.checked_equal_len(other)?;
        for i in 0..self.len() {
            let v = self.get(i) || other.get(i as isize).unwrap();
            self.set_bit(i, v);
        }
        Ok(self)
    }

    pub fn ixor(&mut self, other: &BitSeq) -> Result<&mut Self> {
        self.checked_equal_len(other)?;
        for i in 0..self.len() {
            let v = self.get(i) != other.get(i as isize).unwrap();
            self.set_bit(i, v);
        }
        Ok(self)
    }

    pub fn append(&mut self, other: &BitSeq) -> &mut Self {
        let joined = self.freeze().concat(other);
        self.buf = joined.to_bytes();
        self.start = 0;
        self.end = joined.len();
        self
    }

    pub fn prepend(&mut self, other: &BitSeq) -> &mut Self {
        let joined = other.concat(&self.freeze());
        self.buf = joined.to_bytes();
        self.start = 0;
        self.end = joined.len();
        self
    }

    pub fn insert(&mut self, pos: usize, bits: &BitSeq) -> Result<&mut Self> {
        if pos > self.len() {
            return Err(value_err(format!("insert position {pos} is beyond the end ({})", self.len())));
        }
        let cur = self.freeze();
        let head = cur.slice(0, pos as isize).unwrap();
        let tail = cur.slice(pos as isize, cur.len() as isize).unwrap();
        let joined = BitSeq::from_joined([&head, bits, &tail]);
        self.buf = joined.to_bytes();
        self.start = 0;
        self.end = joined.len();
        Ok(self)
    }

    pub fn overwrite(&mut self, pos: usize, bits: &BitSeq) -> Result<&mut Self> {
        if pos + bits.len() > self.len() {
            return Err(value_err(format!(
                "overwrite at {pos} of {} bits runs past the end ({})",
                bits.len(),
                self.len()
            )));
        }
        let src = bits.to_bools();
        for (i, b) in src.into_iter().enumerate() {
            self.set_bit(pos + i, b);
        }
        Ok(self)
    }

    /// Scan left-to-right for non-overlapping matches of `old`, replacing
    /// each with `new`; `count` bounds the number of substitutions
    /// (`Some(0)` is a no-op), `start`/`end` bound the search region.
    pub fn replace(
        &mut self,
        old: &BitSeq,
        new: &BitSeq,
        start: Option<usize>,
        end: Option<usize>,
        count: Option<usize>,
        byte_aligned: bool,
    ) -> Result<&mut Self> {
        if old.is_empty() {
            return Err(value_err("cannot replace an empty sequence"));
        }
        if let Some(0) = count {
            return Ok(self);
        }
        let cur = self.freeze();
        let region_start = start.unwrap_or(0);
        let region_end = end.unwrap_or(cur.len());
        let region = cur.slice(region_start as isize, region_end as isize)?;
        let positions = region.find_all(old, count, byte_aligned)?;

        let mut out_bits: Vec<&BitSeq> = Vec::new();
        let head = cur.slice(0, region_start as isize)?;
        out_bits.push(&head);
        let mut cursor = 0usize;
        let mut pieces: Vec<BitSeq> = Vec::new();
        for &p in &positions {
            if p < cursor {
                continue; // would overlap a prior replacement
            }
            pieces.push(region.slice(cursor as isize, p as isize)?);
            pieces.push(new.clone());
            cursor = p + old.len();
        }
        pieces.push(region.slice(cursor as isize, region.len() as isize)?);
        let tail = cur.slice(region_end as isize, cur.len() as isize)?;

        let mut all: Vec<&BitSeq> = vec![&head];
        for p in &pieces {
            all.push(p);
        }
        all.push(&tail);
        let joined = BitSeq::from_joined(all);
        self.buf = joined.to_bytes();
        self.start = 0;
        self.end = joined.len();
        Ok(self)
    }

    pub fn reverse(&mut self) -> &mut Self {
        let bools: Vec<bool> = (0..self.len()).rev().map(|i| self.get(i)).collect();
        for (i, b) in bools.into_iter().enumerate() {
            self.set_bit(i, b);
        }
        self
    }

    /// `new[i] = old[(i + len - n) % len]`, i.e. a rotate-right by `n`
    /// when `n` is positive.
    fn rotate_region(&mut self, n: i64, start: usize, end: usize) {
        let len = end - start;
        if len == 0 {
            return;
        }
        let n = n.rem_euclid(len as i64) as usize;
        if n == 0 {
            return;
        }
        let bools: Vec<bool> = (0..len).map(|i| self.get(start + i)).collect();
        for i in 0..len {
            let src = (i + len - n) % len;
            self.set_bit(start + i, bools[src]);
        }
    }

    pub fn rol(&mut self, n: i64, start: Option<usize>, end: Option<usize>) -> &mut Self {
        let s = start.unwrap_or(0);
        let e = end.unwrap_or(self.len());
        self.rotate_region(-n, s, e);
        self
    }

    pub fn ror(&mut self, n: i64, start: Option<usize>, end: Option<usize>) -> &mut Self {
        let s = start.unwrap_or(0);
        let e = end.unwrap_or(self.len());
        self.rotate_region(n, s, e);
        self
    }

    pub fn byte_swap(&mut self, width: Option<usize>) -> Result<&mut Self> {
        if self.len() % 8 != 0 {
            return Err(bitfmt_base::byte_align_err("byte_swap requires a whole number of bytes"));
        }
        let byte_len = self.len() / 8;
        let width = width.unwrap_or(byte_len);
        if width == 0 || byte_len % width != 0 {
            return Err(value_err(format!("byte_swap width {width} does not evenly divide {byte_len} bytes")));
        }
        let mut bytes = raw::to_bytes(&self.buf, self.start, self.len());
        for chunk in bytes.chunks_mut(width) {
            chunk.reverse();
        }
        let joined = BitSeq::from_bytes(bytes);
        self.buf = joined.to_bytes();
        self.start = 0;
        self.end = joined.len();
        Ok(self)
    }

    pub fn set(&mut self, value: bool, positions: impl IntoIterator<Item = usize>) -> &mut Self {
        for p in positions {
            self.set_bit(p, value);
        }
        self
    }

    pub fn invert_positions(&mut self, positions: impl IntoIterator<Item = usize>) -> &mut Self {
        for p in positions {
            let cur = self.get(p);
            self.set_bit(p, !cur);
        }
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn append_prepend() {
        let mut m = MutBitSeq::from_zeros(4);
        m.append(&BitSeq::from_ones(4));
        assert_eq!(m.freeze().bin(), "00001111");
        m.prepend(&BitSeq::from_ones(2));
        assert_eq!(m.freeze().bin(), "1100001111");
    }

    #[test]
    fn overwrite_and_insert() {
        let mut m = MutBitSeq::from_zeros(8);
        m.overwrite(2, &BitSeq::from_ones(3)).unwrap();
        assert_eq!(m.freeze().bin(), "00111000");
        m.insert(0, &BitSeq::from_ones(1)).unwrap();
        assert_eq!(m.freeze().bin(), "100111000");
    }

    #[test]
    fn replace_noninterference() {
        let mut m = MutBitSeq::from_bytes_vec(BitSeq::from_bin("1010").unwrap().to_bytes(), 4);
        let x = BitSeq::from_bin("10").unwrap();
        m.replace(&x, &x, None, None, None, false).unwrap();
        assert_eq!(m.freeze().bin(), "1010");

        let mut m2 = MutBitSeq::from_bytes_vec(BitSeq::from_bin("1010").unwrap().to_bytes(), 4);
        let y = BitSeq::from_bin("11").unwrap();
        m2.replace(&x, &y, None, None, Some(0), false).unwrap();
        assert_eq!(m2.freeze().bin(), "1010");
    }

    #[test]
    fn reverse_of_join() {
        let mut m = MutBitSeq::from_zeros(4);
        m.append(&BitSeq::from_ones(4));
        m.reverse();
        assert_eq!(m.freeze().bin(), "11110000");
    }

    #[test]
    fn rotate_left() {
        let mut m = MutBitSeq::from_bytes_vec(BitSeq::from_bin("11000000").unwrap().to_bytes(), 8);
        m.rol(2, None, None);
        assert_eq!(m.freeze().bin(), "00000011");
    }

    #[test]
    fn rotate_right() {
        let mut m = MutBitSeq::from_bytes_vec(BitSeq::from_bin("00000011").unwrap().to_bytes(), 8);
        m.ror(2, None, None);
        assert_eq!(m.freeze().bin(), "11000000");
    }
}
