use std::hash::{Hash, Hasher};
use std::sync::Arc;

use bitfmt_base::{index_err, value_err, Result};

use crate::mutseq::MutBitSeq;
use crate::raw;

/// Bit sequences longer than this many bits hash only a bounded prefix and
/// suffix rather than every bit. The threshold applies uniformly to all
/// BitSeq values so equal sequences always take the same code path and
/// therefore always agree on their hash.
const HASH_SAMPLE_THRESHOLD_BITS: usize = 4096;
const HASH_SAMPLE_BITS: usize = 512;

/// An immutable, logically ordered sequence of bits, numbered from 0 at the
/// most significant end. Cheaply cloneable: clones share the same backing
/// buffer via [`Arc`] and merely copy the `(start, end)` window.
#[derive(Clone)]
pub struct BitSeq {
    pub(crate) buf: Arc<[u8]>,
    pub(crate) start: usize,
    pub(crate) end: usize,
}

impl BitSeq {
    pub(crate) fn from_raw(buf: Arc<[u8]>, start: usize, end: usize) -> Self {
        debug_assert!(start <= end && end <= buf.len() * 8);
        BitSeq { buf, start, end }
    }

    pub fn empty() -> Self {
        BitSeq::from_raw(Arc::from(Vec::new().into_boxed_slice()), 0, 0)
    }

    pub fn from_zeros(n: usize) -> Self {
        BitSeq::from_raw(Arc::from(raw::zeroed_bytes(n).into_boxed_slice()), 0, n)
    }

    pub fn from_ones(n: usize) -> Self {
        BitSeq::from_raw(Arc::from(raw::ones_bytes(n).into_boxed_slice()), 0, n)
    }

    pub fn from_bytes(b: impl Into<Vec<u8>>) -> Self {
        let v = b.into();
        let bits = v.len() * 8;
        BitSeq::from_raw(Arc::from(v.into_boxed_slice()), 0, bits)
    }

    pub fn from_bools(bits: &[bool]) -> Self {
        let mut buf = raw::zeroed_bytes(bits.len());
        for (i, &b) in bits.iter().enumerate() {
            raw::set_bit(&mut buf, i, b);
        }
        BitSeq::from_raw(Arc::from(buf.into_boxed_slice()), 0, bits.len())
    }

    /// Parse a string of binary digits, tolerant of a leading `0b` and
    /// internal whitespace/underscores.
    pub fn from_bin(s: &str) -> Result<Self> {
        let digits = strip_prefix_and_filler(s, "0b");
        let mut bits = Vec::with_capacity(digits.len());
        for c in digits.chars() {
            match c {
                '0' => bits.push(false),
                '1' => bits.push(true),
                _ => return Err(value_err(format!("invalid binary digit '{c}' in '{s}'"))),
            }
        }
        Ok(BitSeq::from_bools(&bits))
    }

    /// Parse a string of octal digits (3 bits each), tolerant of a leading
    /// `0o` and internal whitespace/underscores.
    pub fn from_oct(s: &str) -> Result<Self> {
        let digits = strip_prefix_and_filler(s, "0o");
        let mut bits = Vec::with_capacity(digits.len() * 3);
        for c in digits.chars() {
            let d = c
                .to_digit(8)
                .ok_or_else(|| value_err(format!("invalid octal digit '{c}' in '{s}'")))?;
            for shift in (0..3).rev() {
                bits.push((d >> shift) & 1 == 1);
            }
        }
        Ok(BitSeq::from_bools(&bits))
    }

    /// Parse a string of hex digits (4 bits each), tolerant of a leading
    /// `0x` and internal whitespace/underscores.
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits = strip_prefix_and_filler(s, "0x");
        let mut bits = Vec::with_capacity(digits.len() * 4);
        for c in digits.chars() {
            let d = c
                .to_digit(16)
                .ok_or_else(|| value_err(format!("invalid hex digit '{c}' in '{s}'")))?;
            for shift in (0..4).rev() {
                bits.push((d >> shift) & 1 == 1);
            }
        }
        Ok(BitSeq::from_bools(&bits))
    }

    pub fn from_joined<'a>(parts: impl IntoIterator<Item = &'a BitSeq>) -> Self {
        let parts: Vec<&BitSeq> = parts.into_iter().collect();
        let total: usize = parts.iter().map(|p| p.len()).sum();
        let mut buf = raw::zeroed_bytes(total);
        let mut pos = 0;
        for p in parts {
            raw::copy_bits(&mut buf, pos, &p.buf, p.start, p.len());
            pos += p.len();
        }
        BitSeq::from_raw(Arc::from(buf.into_boxed_slice()), 0, total)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    fn norm_index(&self, i: isize) -> Result<usize> {
        let len = self.len() as isize;
        let n = if i < 0 { i + len } else { i };
        if n < 0 || n >= len {
            return Err(index_err(format!(
                "bit index {i} out of range for a sequence of length {len}"
            )));
        }
        Ok(n as usize)
    }

    pub fn get(&self, i: isize) -> Result<bool> {
        let n = self.norm_index(i)?;
        Ok(raw::get_bit(&self.buf, self.start + n))
    }

    /// A contiguous, step-1 slice: `start..end`, each clamped into
    /// `[0, len]` after negative-index normalization; always a zero-copy
    /// view (shares the buffer).
    pub fn slice(&self, start: isize, end: isize) -> Result<Self> {
        let len = self.len() as isize;
        let clamp = |v: isize| -> isize { v.max(0).min(len) };
        let s = if start < 0 { clamp(start + len) } else { clamp(start) };
        let e = if end < 0 { clamp(end + len) } else { clamp(end) };
        let (s, e) = if s > e { (s, s) } else { (s, e) };
        Ok(BitSeq::from_raw(
            self.buf.clone(),
            self.start + s as usize,
            self.start + e as usize,
        ))
    }

    /// A strided slice; any step other than 1 materializes a fresh buffer
    /// since the result is no longer a contiguous window.
    pub fn slice_step(&self, start: isize, end: isize, step: isize) -> Result<Self> {
        if step == 0 {
            return Err(value_err("slice step cannot be zero"));
        }
        if step == 1 {
            return self.slice(start, end);
        }
        let len = self.len() as isize;
        let clamp = |v: isize| -> isize { v.max(-1).min(len) };
        let s = if start < 0 { (start + len).max(0).min(len) } else { start.max(0).min(len) };
        let e = if end < 0 { clamp(end + len) } else { clamp(end) };
        let mut bits = Vec::new();
        if step > 0 {
            let mut i = s;
            while i < e {
                bits.push(self.get(i)?);
                i += step;
            }
        } else {
            let mut i = s;
            while i > e {
                bits.push(self.get(i)?);
                i += step;
            }
        }
        Ok(BitSeq::from_bools(&bits))
    }

    pub fn concat(&self, other: &BitSeq) -> BitSeq {
        BitSeq::from_joined([self, other])
    }

    pub fn repeat(&self, n: i64) -> Result<Self> {
        if n < 0 {
            return Err(value_err(format!("cannot repeat a sequence a negative number of times ({n})")));
        }
        let n = n as usize;
        let total = self.len() * n;
        let mut buf = raw::zeroed_bytes(total);
        for i in 0..n {
            raw::copy_bits(&mut buf, i * self.len(), &self.buf, self.start, self.len());
        }
        Ok(BitSeq::from_raw(Arc::from(buf.into_boxed_slice()), 0, total))
    }

    pub fn shift_left(&self, n: usize) -> Result<Self> {
        if self.is_empty() {
            return Err(value_err("cannot shift an empty sequence"));
        }
        let len = self.len();
        let n = n.min(len);
        let mut buf = raw::zeroed_bytes(len);
        if n < len {
            raw::copy_bits(&mut buf, 0, &self.buf, self.start + n, len - n);
        }
        Ok(BitSeq::from_raw(Arc::from(buf.into_boxed_slice()), 0, len))
    }

    pub fn shift_right(&self, n: usize) -> Result<Self> {
        if self.is_empty() {
            return Err(value_err("cannot shift an empty sequence"));
        }
        let len = self.len();
        let n = n.min(len);
        let mut buf = raw::zeroed_bytes(len);
        if n < len {
            raw::copy_bits(&mut buf, n, &self.buf, self.start, len - n);
        }
        Ok(BitSeq::from_raw(Arc::from(buf.into_boxed_slice()), 0, len))
    }

    fn binop(&self, other: &BitSeq, f: impl Fn(bool, bool) -> bool) -> Result<Self> {
        if self.len() != other.len() {
            return Err(value_err(format!(
                "cannot combine sequences of different lengths ({} vs {})",
                self.len(),
                other.len()
            )));
        }
        let len = self.len();
        let mut buf = raw::zeroed_bytes(len);
        for i in 0..len {
            let v = f(raw::get_bit(&self.buf, self.start + i), raw::get_bit(&other.buf, other.start + i));
            raw::set_bit(&mut buf, i, v);
        }
        Ok(BitSeq::from_raw(Arc::from(buf.into_boxed_slice()), 0, len))
    }

    pub fn and(&self, other: &BitSeq) -> Result<Self> {
        self.binop(other, |a, b| a && b)
    }

    pub fn or(&self, other: &BitSeq) -> Result<Self> {
        self.binop(other, |a, b| a || b)
    }

    pub fn xor(&self, other: &BitSeq) -> Result<Self> {
        self.binop(other, |a, b| a != b)
    }

    pub fn invert(&self) -> Self {
        let len = self.len();
        let mut buf = raw::zeroed_bytes(len);
        for i in 0..len {
            raw::set_bit(&mut buf, i, !raw::get_bit(&self.buf, self.start + i));
        }
        BitSeq::from_raw(Arc::from(buf.into_boxed_slice()), 0, len)
    }

    fn check_nonempty_needle(sub: &BitSeq) -> Result<()> {
        if sub.is_empty() {
            return Err(value_err("cannot search for an empty sequence"));
        }
        Ok(())
    }

    fn matches_at(&self, pos: usize, sub: &BitSeq) -> bool {
        raw::bits_eq(&self.buf, self.start + pos, &sub.buf, sub.start, sub.len())
    }

    pub fn find(&self, sub: &BitSeq, byte_aligned: bool) -> Result<Option<usize>> {
        Self::check_nonempty_needle(sub)?;
        if sub.len() > self.len() {
            return Ok(None);
        }
        if byte_aligned && self.start % 8 == 0 && sub.start % 8 == 0 && sub.len() % 8 == 0 {
            let haystack = self.to_bytes();
            let needle = sub.to_bytes();
            return Ok(memchr::memmem::find(&haystack, &needle).map(|byte_pos| byte_pos * 8));
        }
        let step = if byte_aligned { 8 } else { 1 };
        let mut pos = 0;
        let last = self.len() - sub.len();
        while pos <= last {
            if self.matches_at(pos, sub) {
                return Ok(Some(pos));
            }
            pos += step;
        }
        Ok(None)
    }

    /// A genuine right-to-left scan, independent of [`Self::find_all`]'s
    /// forward scan.
    pub fn rfind(&self, sub: &BitSeq, byte_aligned: bool) -> Result<Option<usize>> {
        Self::check_nonempty_needle(sub)?;
        if sub.len() > self.len() {
            return Ok(None);
        }
        let step = if byte_aligned { 8 } else { 1 };
        let last = self.len() - sub.len();
        let mut pos = last;
        loop {
            if pos % step == 0 && self.matches_at(pos, sub) {
                return Ok(Some(pos));
            }
            if pos == 0 {
                return Ok(None);
            }
            pos -= 1;
        }
    }

    pub fn find_all(&self, sub: &BitSeq, count: Option<usize>, byte_aligned: bool) -> Result<Vec<usize>> {
        Self::check_nonempty_needle(sub)?;
        if let Some(0) = count {
            return Ok(Vec::new());
        }
        let step = if byte_aligned { 8 } else { 1 };
        let mut out = Vec::new();
        if sub.len() > self.len() {
            return Ok(out);
        }
        let last = self.len() - sub.len();
        let mut pos = 0;
        while pos <= last {
            if self.matches_at(pos, sub) {
                out.push(pos);
                if let Some(c) = count {
                    if out.len() >= c {
                        break;
                    }
                }
            }
            pos += step;
        }
        Ok(out)
    }

    pub fn starts_with(&self, prefix: &BitSeq) -> bool {
        prefix.len() <= self.len() && self.matches_at(0, prefix)
    }

    pub fn ends_with(&self, suffix: &BitSeq) -> bool {
        suffix.len() <= self.len() && self.matches_at(self.len() - suffix.len(), suffix)
    }

    pub fn count(&self, value: bool) -> usize {
        let set = raw::count_set(&self.buf, self.start, self.len());
        if value {
            set
        } else {
            self.len() - set
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        raw::to_bytes(&self.buf, self.start, self.len())
    }

    pub fn to_bools(&self) -> Vec<bool> {
        (0..self.len()).map(|i| raw::get_bit(&self.buf, self.start + i)).collect()
    }

    pub fn bin(&self) -> String {
        self.to_bools().iter().map(|&b| if b { '1' } else { '0' }).collect()
    }

    pub fn hex(&self) -> Result<String> {
        if self.len() % 4 != 0 {
            return Err(bitfmt_base::byte_align_err(format!(
                "hex requires a multiple of 4 bits, got {}",
                self.len()
            )));
        }
        let mut s = String::with_capacity(self.len() / 4);
        for chunk_start in (0..self.len()).step_by(4) {
            let mut nibble = 0u8;
            for i in 0..4 {
                nibble = (nibble << 1) | raw::get_bit(&self.buf, self.start + chunk_start + i) as u8;
            }
            s.push(std::char::from_digit(nibble as u32, 16).unwrap());
        }
        Ok(s)
    }

    pub fn oct(&self) -> Result<String> {
        if self.len() % 3 != 0 {
            return Err(bitfmt_base::byte_align_err(format!(
                "oct requires a multiple of 3 bits, got {}",
                self.len()
            )));
        }
        let mut s = String::with_capacity(self.len() / 3);
        for chunk_start in (0..self.len()).step_by(3) {
            let mut v = 0u8;
            for i in 0..3 {
                v = (v << 1) | raw::get_bit(&self.buf, self.start + chunk_start + i) as u8;
            }
            s.push(std::char::from_digit(v as u32, 8).unwrap());
        }
        Ok(s)
    }

    pub fn to_mut(&self) -> MutBitSeq {
        MutBitSeq::from_bytes_vec(self.to_bytes(), self.len())
    }
}

impl std::ops::Add for &BitSeq {
    type Output = BitSeq;
    fn add(self, rhs: &BitSeq) -> BitSeq {
        self.concat(rhs)
    }
}

impl std::ops::Add for BitSeq {
    type Output = BitSeq;
    fn add(self, rhs: BitSeq) -> BitSeq {
        self.concat(&rhs)
    }
}

impl PartialEq for BitSeq {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.matches_at(0, other)
    }
}
impl Eq for BitSeq {}

impl Hash for BitSeq {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        if self.len() <= HASH_SAMPLE_THRESHOLD_BITS {
            self.to_bools().hash(state);
        } else {
            // Bounded prefix + suffix, uniformly for every sequence over the
            // threshold: equal sequences always take this branch together
            // and always sample the same bits, so equal values still hash
            // equal. rapidhash is used to compress the two sampled spans.
            let prefix = self.slice(0, HASH_SAMPLE_BITS as isize).unwrap();
            let suffix = self.slice((self.len() - HASH_SAMPLE_BITS) as isize, self.len() as isize).unwrap();
            let mut sample = prefix.to_bytes();
            sample.extend(suffix.to_bytes());
            let h = rapidhash::rapidhash(&sample);
            h.hash(state);
        }
    }
}

impl std::fmt::Debug for BitSeq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BitSeq(0b{})", self.bin())
    }
}

// Serialized as (bit length, packed bytes) rather than deriving through
// `Arc<[u8]>` directly, so the wire form doesn't leak the sharing of the
// backing buffer or require serde's "rc" feature.
impl serde::Serialize for BitSeq {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeTuple;
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&self.len())?;
        tup.serialize_element(&self.to_bytes())?;
        tup.end()
    }
}

impl<'de> serde::Deserialize<'de> for BitSeq {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let (len, bytes): (usize, Vec<u8>) = serde::Deserialize::deserialize(deserializer)?;
        let full = BitSeq::from_bytes(bytes);
        full.slice(0, len as isize).map_err(serde::de::Error::custom)
    }
}

fn strip_prefix_and_filler<'a>(s: &'a str, prefix: &str) -> std::borrow::Cow<'a, str> {
    let s = s.strip_prefix(prefix).unwrap_or(s);
    if s.contains(' ') || s.contains('_') {
        std::borrow::Cow::Owned(s.chars().filter(|c| *c != ' ' && *c != '_').collect())
    } else {
        std::borrow::Cow::Borrowed(s)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn zeros_and_ones() {
        assert_eq!(BitSeq::from_zeros(10).bin(), "0000000000");
        assert_eq!(BitSeq::from_ones(8).hex().unwrap(), "ff");
    }

    #[test]
    fn bytes_and_slice() {
        let b = BitSeq::from_bytes(*b"hello");
        assert_eq!(b.hex().unwrap(), "68656c6c6f");
        assert_eq!(b.slice(8, 40).unwrap().to_bytes(), b"ello");
    }

    #[test]
    fn join_reverse_and() {
        let zeros = BitSeq::from_zeros(4);
        let ones = BitSeq::from_ones(4);
        let j = BitSeq::from_joined([&zeros, &ones]);
        assert_eq!(j.bin(), "00001111");
        let rev: Vec<bool> = j.to_bools().into_iter().rev().collect();
        assert_eq!(BitSeq::from_bools(&rev).bin(), "11110000");
        assert_eq!(zeros.and(&ones).unwrap(), BitSeq::from_zeros(4));
    }

    #[test]
    fn find_byte_aligned() {
        let a = BitSeq::from_bin("00000110001110").unwrap();
        let sub = BitSeq::from_bin("11").unwrap();
        assert_eq!(a.find(&sub, false).unwrap(), Some(5));
        assert_eq!(a.find(&sub, true).unwrap(), None);
    }

    #[test]
    fn oct_digits() {
        assert_eq!(BitSeq::from_oct("776").unwrap().bin(), "111111110");
        assert!(BitSeq::from_oct("abc").is_err());
    }

    #[test]
    fn to_bytes_slice() {
        assert_eq!(BitSeq::from_ones(16).to_bytes(), b"\xff\xff");
        let s = BitSeq::from_ones(16).slice(7, 16).unwrap();
        assert_eq!(s.to_bytes(), b"\xff\x80");
    }

    #[test]
    fn prop_concat_length() {
        let a = BitSeq::from_zeros(3);
        let b = BitSeq::from_ones(5);
        assert_eq!((&a + &b).len(), a.len() + b.len());
    }

    #[test]
    fn prop_bytes_round_trip() {
        let data = b"round trip";
        let bs = BitSeq::from_bytes(data.to_vec());
        assert_eq!(bs.to_bytes(), data);
        assert_eq!(bs.len(), data.len() * 8);
    }

    #[test]
    fn prop_slicing_identity() {
        let a = BitSeq::from_bin("1011001").unwrap();
        assert_eq!(a.slice(0, a.len() as isize).unwrap(), a);
        assert!(a.slice(0, 0).unwrap().is_empty());
        assert_eq!(a.slice(-(a.len() as isize), a.len() as isize).unwrap(), a);
    }

    #[test]
    fn prop_find_consistency() {
        let a = BitSeq::from_bin("00000110001110").unwrap();
        let sub = BitSeq::from_bin("11").unwrap();
        if let Some(p) = a.find(&sub, false).unwrap() {
            assert_eq!(a.slice(p as isize, (p + sub.len()) as isize).unwrap(), sub);
        }
    }

    #[test]
    fn prop_hash_compatibility() {
        use std::collections::hash_map::DefaultHasher;
        let a = BitSeq::from_bin("101").unwrap();
        let b = BitSeq::from_bin("101").unwrap();
        assert_eq!(a, b);
        let mut ha = DefaultHasher::new();
        let mut hb = DefaultHasher::new();
        a.hash(&mut ha);
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
    }

    #[test]
    fn negative_index() {
        let a = BitSeq::from_bin("1010").unwrap();
        assert_eq!(a.get(-1).unwrap(), false);
        assert_eq!(a.get(-4).unwrap(), true);
        assert!(a.get(-5).is_err());
    }
}
