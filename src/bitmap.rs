//! # Bitmap — Packed Bit Array with Stepped Clearing
//!
//! The one primitive every sieve in this crate is built on. Bits are packed
//! LSB-first into bytes; the dominant operation is [`Bitmap::clear_steps`],
//! which clears a fixed-stride progression of bits — exactly the access
//! pattern of marking the multiples of a prime.
//!
//! Integrity is tracked with a SHA-256 checksum over the byte buffer,
//! computed on demand and verified when a bitmap is read back from a binary
//! stream. The on-disk layout is `size_bits: u64 LE | payload | digest[32]`.
//!
//! ## Performance Characteristics
//!
//! - Single-bit operations: O(1)
//! - Bulk fill / clear: O(⌈n/8⌉)
//! - Stepped clear: O(n / step)
//! - Checksum: O(⌈n/8⌉)

use sha2::{Digest, Sha256};
use std::io::{Read, Write};

use crate::SieveError;

/// Length in bytes of the SHA-256 checksum attached to containers.
pub const DIGEST_LEN: usize = 32;

/// Packed bit array with a cached SHA-256 checksum.
///
/// `size` is measured in bits. Unused high bits in the final byte are kept in
/// their initial fill state and are never consulted above index `size − 1`.
#[derive(Clone, Debug)]
pub struct Bitmap {
    size: u64,
    data: Vec<u8>,
    digest: [u8; DIGEST_LEN],
}

impl Bitmap {
    /// Allocate a bitmap of `size` bits, all ones when `set` is true,
    /// otherwise all zeros. A zero-length bitmap is rejected.
    pub fn new(size: u64, set: bool) -> Result<Self, SieveError> {
        if size == 0 {
            return Err(SieveError::InputOutOfDomain(
                "bitmap size must be positive".into(),
            ));
        }
        let byte_size = (size as usize + 7) / 8;
        let fill = if set { 0xFF } else { 0x00 };
        Ok(Bitmap {
            size,
            data: vec![fill; byte_size],
            digest: [0; DIGEST_LEN],
        })
    }

    /// Number of addressable bits.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Read the bit at `idx`. Callers must keep `idx < size`.
    #[inline]
    pub fn get(&self, idx: u64) -> bool {
        self.data[(idx / 8) as usize] & (1 << (idx % 8)) != 0
    }

    /// Set the bit at `idx` to 1.
    #[inline]
    pub fn set(&mut self, idx: u64) {
        self.data[(idx / 8) as usize] |= 1 << (idx % 8);
    }

    /// Clear the bit at `idx` to 0.
    #[inline]
    pub fn clear(&mut self, idx: u64) {
        self.data[(idx / 8) as usize] &= !(1 << (idx % 8));
    }

    /// Toggle the bit at `idx`.
    #[inline]
    pub fn flip(&mut self, idx: u64) {
        self.data[(idx / 8) as usize] ^= 1 << (idx % 8);
    }

    /// Set every bit to 1.
    pub fn set_all(&mut self) {
        self.data.fill(0xFF);
    }

    /// Clear every bit to 0.
    pub fn clear_all(&mut self) {
        self.data.fill(0x00);
    }

    /// Overwrite this bitmap's bits with those of `src`.
    ///
    /// Both bitmaps must have the same size; this is the segment-reset path,
    /// a straight byte copy instead of a fresh allocation.
    pub fn copy_bits_from(&mut self, src: &Bitmap) {
        debug_assert_eq!(self.size, src.size);
        self.data.copy_from_slice(&src.data);
    }

    /// Clear the bits at `start, start + step, start + 2·step, …` while the
    /// position stays within `min(limit, size − 1)` (inclusive).
    ///
    /// `step` must be at least 1. This is the composite-marking primitive:
    /// `step` is the prime, `start` the first hit from a solver.
    pub fn clear_steps(&mut self, step: u64, start: u64, limit: u64) {
        debug_assert!(step > 0, "step must be positive");
        let limit = limit.min(self.size - 1);
        let mut idx = start;
        while idx <= limit {
            self.data[(idx / 8) as usize] &= !(1 << (idx % 8));
            idx += step;
        }
    }

    /// Four-lane unrolled variant of [`Bitmap::clear_steps`] with identical
    /// semantics.
    ///
    /// The four position counters advance as one vector of 64-bit lanes (the
    /// index arithmetic vectorizes; the byte stores remain a scalar scatter),
    /// with a scalar loop for the tail. Step size and alignment are arbitrary.
    pub fn clear_steps_simd(&mut self, step: u64, start: u64, limit: u64) {
        debug_assert!(step > 0, "step must be positive");
        let limit = limit.min(self.size - 1);
        let mut idx = start;

        if limit >= 3 * step && idx <= limit - 3 * step {
            let mut lanes = [idx, idx + step, idx + 2 * step, idx + 3 * step];
            let advance = 4 * step;
            while idx <= limit - 3 * step {
                for i in lanes {
                    self.data[(i / 8) as usize] &= !(1 << (i % 8));
                }
                for lane in &mut lanes {
                    *lane += advance;
                }
                idx += advance;
            }
        }

        while idx <= limit {
            self.data[(idx / 8) as usize] &= !(1 << (idx % 8));
            idx += step;
        }
    }

    /// Count the set bits in the inclusive index range `[start, end]`.
    pub fn count_ones_in(&self, start: u64, end: u64) -> u64 {
        let end = end.min(self.size - 1);
        if start > end {
            return 0;
        }
        let mut count = 0u64;
        let first_byte = (start / 8) as usize;
        let last_byte = (end / 8) as usize;
        if first_byte == last_byte {
            let mask = (!0u8 << (start % 8)) & (!0u8 >> (7 - end % 8));
            return (self.data[first_byte] & mask).count_ones() as u64;
        }
        count += (self.data[first_byte] & (!0u8 << (start % 8))).count_ones() as u64;
        for &byte in &self.data[first_byte + 1..last_byte] {
            count += byte.count_ones() as u64;
        }
        count += (self.data[last_byte] & (!0u8 >> (7 - end % 8))).count_ones() as u64;
        count
    }

    /// Compute the SHA-256 checksum over the byte buffer and cache it.
    pub fn compute_hash(&mut self) {
        let mut hasher = Sha256::new();
        hasher.update(&self.data);
        self.digest.copy_from_slice(&hasher.finalize());
    }

    /// Verify the cached checksum against the current contents.
    pub fn validate_hash(&self) -> bool {
        let mut hasher = Sha256::new();
        hasher.update(&self.data);
        hasher.finalize().as_slice() == self.digest
    }

    /// Cached checksum bytes (all zeros until [`Bitmap::compute_hash`] runs).
    pub fn digest(&self) -> &[u8; DIGEST_LEN] {
        &self.digest
    }

    /// Serialize as `size_bits: u64 LE | payload | digest[32]`, refreshing
    /// the checksum first.
    pub fn write_to<W: Write>(&mut self, out: &mut W) -> Result<(), SieveError> {
        self.compute_hash();
        out.write_all(&self.size.to_le_bytes())?;
        out.write_all(&self.data)?;
        out.write_all(&self.digest)?;
        Ok(())
    }

    /// Deserialize a bitmap written by [`Bitmap::write_to`], verifying the
    /// checksum. A mismatch destroys the partial object and reports
    /// [`SieveError::Integrity`].
    pub fn read_from<R: Read>(input: &mut R) -> Result<Self, SieveError> {
        let mut size_buf = [0u8; 8];
        input.read_exact(&mut size_buf)?;
        let size = u64::from_le_bytes(size_buf);
        let mut bitmap = Bitmap::new(size, false)?;
        input.read_exact(&mut bitmap.data)?;
        input.read_exact(&mut bitmap.digest)?;
        if !bitmap.validate_hash() {
            tracing::warn!(size, "bitmap checksum validation failed");
            return Err(SieveError::Integrity("bitmap checksum mismatch".into()));
        }
        Ok(bitmap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_zero_size() {
        assert!(Bitmap::new(0, false).is_err());
    }

    #[test]
    fn set_get_clear_flip() {
        let mut b = Bitmap::new(100, false).unwrap();
        assert!(!b.get(42));
        b.set(42);
        assert!(b.get(42));
        b.flip(42);
        assert!(!b.get(42));
        b.flip(42);
        b.clear(42);
        assert!(!b.get(42));
    }

    #[test]
    fn bulk_fill() {
        let mut b = Bitmap::new(77, true).unwrap();
        assert!(b.get(0) && b.get(76));
        b.clear_all();
        assert!(!b.get(0) && !b.get(76));
        b.set_all();
        assert!(b.get(38));
    }

    #[test]
    fn clear_steps_pattern() {
        // Multiples of 3 starting at 9, as in an Eratosthenes inner loop.
        let mut b = Bitmap::new(1000, true).unwrap();
        b.clear_steps(3, 9, 999);
        for i in 0..1000 {
            let expect = !(i >= 9 && (i - 9) % 3 == 0);
            assert_eq!(b.get(i), expect, "bit {}", i);
        }
    }

    #[test]
    fn clear_steps_caps_at_size() {
        let mut b = Bitmap::new(50, true).unwrap();
        b.clear_steps(7, 0, u64::MAX);
        for i in 0..50 {
            assert_eq!(b.get(i), i % 7 != 0);
        }
    }

    #[test]
    fn simd_variant_matches_scalar() {
        for &(step, start) in &[(1u64, 0u64), (2, 5), (3, 9), (17, 1), (97, 40), (1021, 3)] {
            let mut a = Bitmap::new(4096, true).unwrap();
            let mut b = Bitmap::new(4096, true).unwrap();
            a.clear_steps(step, start, 4095);
            b.clear_steps_simd(step, start, 4095);
            for i in 0..4096 {
                assert_eq!(a.get(i), b.get(i), "step {} start {} bit {}", step, start, i);
            }
        }
    }

    #[test]
    fn count_ones_ranges() {
        let mut b = Bitmap::new(64, false).unwrap();
        for i in (0..64).step_by(2) {
            b.set(i);
        }
        assert_eq!(b.count_ones_in(0, 63), 32);
        assert_eq!(b.count_ones_in(0, 0), 1);
        assert_eq!(b.count_ones_in(1, 1), 0);
        assert_eq!(b.count_ones_in(3, 9), 3); // 4, 6, 8
        assert_eq!(b.count_ones_in(10, 9), 0);
    }

    #[test]
    fn clone_is_deep() {
        let mut a = Bitmap::new(32, false).unwrap();
        a.set(7);
        let mut b = a.clone();
        b.clear(7);
        assert!(a.get(7));
        assert!(!b.get(7));
    }

    #[test]
    fn hash_detects_change() {
        let mut b = Bitmap::new(256, false).unwrap();
        b.set(100);
        b.compute_hash();
        assert!(b.validate_hash());
        b.flip(101);
        assert!(!b.validate_hash());
    }

    #[test]
    fn serialization_round_trip() {
        let mut b = Bitmap::new(300, false).unwrap();
        b.set(0);
        b.set(299);
        b.set(150);
        let mut buf = Vec::new();
        b.write_to(&mut buf).unwrap();
        let restored = Bitmap::read_from(&mut buf.as_slice()).unwrap();
        assert_eq!(restored.size(), 300);
        assert!(restored.get(0) && restored.get(150) && restored.get(299));
        assert!(!restored.get(1));
        assert_eq!(restored.digest(), b.digest());
    }

    #[test]
    fn corrupted_payload_is_rejected() {
        let mut b = Bitmap::new(128, true).unwrap();
        let mut buf = Vec::new();
        b.write_to(&mut buf).unwrap();
        // Flip one payload bit between write and read.
        buf[9] ^= 0x01;
        match Bitmap::read_from(&mut buf.as_slice()) {
            Err(SieveError::Integrity(_)) => {}
            other => panic!("expected integrity failure, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn truncated_stream_is_rejected() {
        let mut b = Bitmap::new(128, true).unwrap();
        let mut buf = Vec::new();
        b.write_to(&mut buf).unwrap();
        buf.truncate(buf.len() - 5);
        assert!(Bitmap::read_from(&mut buf.as_slice()).is_err());
    }
}
