//! # Integer Arrays — Growable Fixed-Width Containers
//!
//! Ordered, growable sequences of unsigned integers at widths 16, 32, and 64,
//! used for prime lists, gap encodings, and root-prime tables. A single
//! `IntArray<T>` is monomorphized over the [`Element`] trait; all three
//! widths share the same observable contracts:
//!
//! - amortized O(1) append with ≥2× growth,
//! - an `ordered` flag maintained on append and forced true by `sort`,
//! - SHA-256 checksum over the active payload only,
//! - binary serialization as `count: u32 LE | payload LE | digest[32]`.

use sha2::{Digest, Sha256};
use std::io::{Read, Write};

use crate::bitmap::DIGEST_LEN;
use crate::SieveError;

/// Fixed-width unsigned element storable in an [`IntArray`].
pub trait Element: Copy + Ord + Default {
    /// Serialized width in bytes.
    const BYTES: usize;
    /// Append the little-endian encoding of `self` to `buf`.
    fn extend_le(self, buf: &mut Vec<u8>);
    /// Decode from exactly `Self::BYTES` little-endian bytes.
    fn from_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($($ty:ty),*) => {$(
        impl Element for $ty {
            const BYTES: usize = std::mem::size_of::<$ty>();
            fn extend_le(self, buf: &mut Vec<u8>) {
                buf.extend_from_slice(&self.to_le_bytes());
            }
            fn from_le(bytes: &[u8]) -> Self {
                <$ty>::from_le_bytes(bytes.try_into().expect("element width"))
            }
        }
    )*};
}

impl_element!(u16, u32, u64);

/// Growable array of fixed-width unsigned integers.
#[derive(Clone, Debug)]
pub struct IntArray<T: Element> {
    items: Vec<T>,
    ordered: bool,
    digest: [u8; DIGEST_LEN],
}

/// Dynamic array of `u16` values (prime-gap encodings).
pub type U16Array = IntArray<u16>;
/// Dynamic array of `u32` values.
pub type U32Array = IntArray<u32>;
/// Dynamic array of `u64` values (prime lists, root-prime tables).
pub type U64Array = IntArray<u64>;

impl<T: Element> IntArray<T> {
    /// Create an empty array with room for `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        IntArray {
            items: Vec::with_capacity(capacity),
            ordered: true,
            digest: [0; DIGEST_LEN],
        }
    }

    /// Number of stored elements.
    #[inline]
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Current element capacity.
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    /// Whether the contents are known to be in non-decreasing order.
    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    /// Element at `idx`.
    #[inline]
    pub fn get(&self, idx: usize) -> T {
        self.items[idx]
    }

    /// Last element, if any.
    pub fn last(&self) -> Option<T> {
        self.items.last().copied()
    }

    /// View of the active elements.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Append `element`, doubling capacity on overflow. The ordered flag
    /// survives only if `element` is ≥ the previous tail.
    #[inline]
    pub fn push(&mut self, element: T) {
        if self.items.len() == self.items.capacity() {
            let grow = self.items.capacity().max(4);
            self.items.reserve(grow);
        }
        if let Some(&tail) = self.items.last() {
            if element < tail {
                self.ordered = false;
            }
        }
        self.items.push(element);
    }

    /// Remove the last element if the array is non-empty.
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    /// Sort ascending; the ordered flag becomes true.
    pub fn sort(&mut self) {
        self.items.sort_unstable();
        self.ordered = true;
    }

    /// Grow storage to `new_capacity` elements (must be ≥ the current count).
    pub fn resize_to(&mut self, new_capacity: usize) -> Result<(), SieveError> {
        if new_capacity < self.items.len() {
            return Err(SieveError::InputOutOfDomain(
                "resize_to below element count".into(),
            ));
        }
        self.items.reserve_exact(new_capacity - self.items.len());
        Ok(())
    }

    /// Trim capacity to the element count after the final push.
    pub fn resize_to_fit(&mut self) {
        self.items.shrink_to_fit();
    }

    fn payload_le(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.items.len() * T::BYTES);
        for &item in &self.items {
            item.extend_le(&mut buf);
        }
        buf
    }

    /// Compute the SHA-256 checksum over the active payload and cache it.
    pub fn compute_hash(&mut self) {
        let mut hasher = Sha256::new();
        hasher.update(self.payload_le());
        self.digest.copy_from_slice(&hasher.finalize());
    }

    /// Verify the cached checksum against the current payload.
    pub fn verify_hash(&self) -> bool {
        let mut hasher = Sha256::new();
        hasher.update(self.payload_le());
        hasher.finalize().as_slice() == self.digest
    }

    /// Cached checksum bytes (all zeros until [`IntArray::compute_hash`]).
    pub fn digest(&self) -> &[u8; DIGEST_LEN] {
        &self.digest
    }

    /// Serialize as `count: u32 LE | payload LE | digest[32]`, refreshing the
    /// checksum first.
    pub fn write_to<W: Write>(&mut self, out: &mut W) -> Result<(), SieveError> {
        let count = u32::try_from(self.items.len())
            .map_err(|_| SieveError::InputOutOfDomain("array count exceeds u32".into()))?;
        self.compute_hash();
        out.write_all(&count.to_le_bytes())?;
        out.write_all(&self.payload_le())?;
        out.write_all(&self.digest)?;
        Ok(())
    }

    /// Deserialize an array written by [`IntArray::write_to`], verifying the
    /// checksum. The restored ordered flag reflects the actual contents.
    pub fn read_from<R: Read>(input: &mut R) -> Result<Self, SieveError> {
        let mut count_buf = [0u8; 4];
        input.read_exact(&mut count_buf)?;
        let count = u32::from_le_bytes(count_buf) as usize;

        let mut payload = vec![0u8; count * T::BYTES];
        input.read_exact(&mut payload)?;

        let mut array = IntArray::with_capacity(count);
        for chunk in payload.chunks_exact(T::BYTES) {
            array.push(T::from_le(chunk));
        }
        input.read_exact(&mut array.digest)?;
        if !array.verify_hash() {
            tracing::warn!(count, "integer array checksum validation failed");
            return Err(SieveError::Integrity(
                "integer array checksum mismatch".into(),
            ));
        }
        Ok(array)
    }
}

impl<T: Element> Default for IntArray<T> {
    fn default() -> Self {
        IntArray::with_capacity(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_growth() {
        let mut a: U32Array = IntArray::with_capacity(2);
        for i in 0..100 {
            a.push(i);
        }
        assert_eq!(a.count(), 100);
        assert!(a.capacity() >= 100);
        assert!(a.is_ordered());
        assert_eq!(a.get(57), 57);
    }

    #[test]
    fn ordered_flag_tracks_appends() {
        let mut a: U64Array = IntArray::with_capacity(4);
        a.push(10);
        a.push(20);
        assert!(a.is_ordered());
        a.push(5);
        assert!(!a.is_ordered());
        a.sort();
        assert!(a.is_ordered());
        assert_eq!(a.as_slice(), &[5, 10, 20]);
    }

    #[test]
    fn pop_and_fit() {
        let mut a: U16Array = IntArray::with_capacity(64);
        a.push(1);
        a.push(2);
        assert_eq!(a.pop(), Some(2));
        assert_eq!(a.pop(), Some(1));
        assert_eq!(a.pop(), None);
        a.push(9);
        a.resize_to_fit();
        assert_eq!(a.capacity(), 1);
    }

    #[test]
    fn resize_to_below_count_fails() {
        let mut a: U32Array = IntArray::with_capacity(0);
        a.push(1);
        a.push(2);
        assert!(a.resize_to(1).is_err());
        assert!(a.resize_to(16).is_ok());
        assert!(a.capacity() >= 16);
    }

    #[test]
    fn hash_covers_active_prefix_only() {
        let mut a: U64Array = IntArray::with_capacity(100);
        a.push(7);
        a.push(11);
        a.compute_hash();
        let digest_small = *a.digest();

        // Same contents, different capacity: identical digest.
        let mut b: U64Array = IntArray::with_capacity(2);
        b.push(7);
        b.push(11);
        b.compute_hash();
        assert_eq!(&digest_small, b.digest());

        a.push(13);
        assert!(!a.verify_hash());
    }

    #[test]
    fn serialization_round_trip() {
        let mut a: U16Array = IntArray::with_capacity(8);
        for g in [4u16, 2, 4, 6, 2, 6, 4, 2] {
            a.push(g);
        }
        let mut buf = Vec::new();
        a.write_to(&mut buf).unwrap();
        let restored = U16Array::read_from(&mut buf.as_slice()).unwrap();
        assert_eq!(restored.as_slice(), a.as_slice());
        assert_eq!(restored.digest(), a.digest());
    }

    #[test]
    fn corrupted_payload_is_rejected() {
        let mut a: U64Array = IntArray::with_capacity(4);
        a.push(1_000_003);
        a.push(1_000_033);
        let mut buf = Vec::new();
        a.write_to(&mut buf).unwrap();
        buf[6] ^= 0x10;
        match U64Array::read_from(&mut buf.as_slice()) {
            Err(SieveError::Integrity(_)) => {}
            other => panic!("expected integrity failure, got {:?}", other.map(|_| ())),
        }
    }
}
