//! # izprime — Core Library
//!
//! Wheel-6 prime sieves operating in the *iZ* index space: the integers
//! `6x − 1` and `6x + 1`, which together contain every prime greater than 3.
//! Re-exports the sieve engine, the segment machinery, and the range/search
//! drivers built on top of them.
//!
//! ## Module Organization
//!
//! **Primitives**:
//! - [`bitmap`] — packed bit array with stepped clearing (the sieve hot loop),
//!   SHA-256 checksums, and binary serialization.
//! - [`int_array`] — growable fixed-width integer arrays (u16/u32/u64) with
//!   ordering metadata, checksums, and binary serialization.
//! - [`iz`] — the `iZ(x, i) = 6x + i` maps, the horizontal/vertical first-hit
//!   solvers, and VX window sizing.
//!
//! **Engine modules**:
//! - [`izm`] — pre-sieved VX window template (`IzmContext`), cloned per worker.
//! - [`segment`] — per-segment runtime (`VxSegment`): deterministic marking,
//!   probabilistic cleanup above the sqrt threshold, gap encoding, streaming.
//! - [`siz`] — the iZ-space sieves `SiZ`, `SiZm` (horizontal, ordered) and
//!   `SiZm_vy` (vertical, unordered).
//! - [`classic`] — baseline sieves (Eratosthenes, segmented Eratosthenes,
//!   Euler, Sundaram, Atkin) kept for cross-checking.
//!
//! **Drivers**:
//! - [`range`] — `siz_stream` / `siz_count` over an inclusive interval, with
//!   multi-worker partitioning for counting.
//! - [`search`] — random-prime searches over arbitrary-precision candidates
//!   and the `next_prime` walker.
//!
//! **Support**:
//! - [`expr`] — numeric-expression and range parsing for the CLI layer.
//! - [`platform`] — core count, L2 cache size, entropy seeding.
//!
//! ## Design Philosophy
//!
//! Everything is built from two primitives: a packed bitmap whose only fast
//! path is *stepped clearing*, and closed-form solvers that place the first
//! composite of a prime inside a window without scanning. Segments own their
//! state; parallel drivers hand each worker a deep [`izm::IzmContext`] clone
//! and aggregate by simple summation, so no synchronization is needed beyond
//! a stop flag and a result channel.

pub mod bitmap;
pub mod classic;
pub mod expr;
pub mod int_array;
pub mod iz;
pub mod izm;
pub mod platform;
pub mod range;
pub mod search;
pub mod segment;
pub mod siz;

pub use bitmap::Bitmap;
pub use int_array::{IntArray, U16Array, U32Array, U64Array};
pub use izm::IzmContext;
pub use range::{siz_count, siz_stream, SieveRange};
pub use search::{next_prime, vx_random_prime, vy_random_prime};
pub use segment::VxSegment;

use std::fmt;

/// Errors surfaced by the sieve engine and its drivers.
///
/// The vertical solver's "no modular solution" case is not represented here:
/// it is returned as `Option::None`, and sieve drivers never invoke the
/// solver with a prime sharing a factor with the window width.
#[derive(Debug)]
pub enum SieveError {
    /// Input outside the supported domain: sieve limit outside (10, 10^12],
    /// a range wider than 64 bits, a window width below 35, or mismatched
    /// range bounds.
    InputOutOfDomain(String),
    /// Checksum mismatch while deserializing a bitmap or integer array.
    Integrity(String),
    /// A counting worker failed; the driver reports the total as 0.
    Worker(String),
    /// Short or failed exchange between a search worker and its parent.
    Channel(String),
    /// Malformed numeric or range expression.
    Parse(String),
    /// Underlying I/O failure during serialization or streaming.
    Io(std::io::Error),
}

impl fmt::Display for SieveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SieveError::InputOutOfDomain(msg) => write!(f, "input out of domain: {msg}"),
            SieveError::Integrity(msg) => write!(f, "integrity failure: {msg}"),
            SieveError::Worker(msg) => write!(f, "worker failure: {msg}"),
            SieveError::Channel(msg) => write!(f, "channel failure: {msg}"),
            SieveError::Parse(msg) => write!(f, "parse failure: {msg}"),
            SieveError::Io(err) => write!(f, "i/o failure: {err}"),
        }
    }
}

impl std::error::Error for SieveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SieveError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SieveError {
    fn from(err: std::io::Error) -> Self {
        SieveError::Io(err)
    }
}

/// Estimate the number of primes up to `n`, with headroom, for preallocation.
pub(crate) fn estimate_prime_count(n: u64) -> usize {
    if n < 10 {
        return 8;
    }
    let nf = n as f64;
    (1.2 * nf / nf.ln()) as usize
}
