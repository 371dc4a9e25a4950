//! # Classic Sieves — Reference Implementations
//!
//! Baseline prime sieves kept for cross-checking the iZ family: optimized
//! Eratosthenes (`soe`), segmented Eratosthenes (`ssoe`), the linear Euler
//! sieve (`soeu`), Sundaram (`sos`), and Atkin (`soa`). All take an upper
//! bound `n ∈ (10, 10^12]` and return the primes up to `n` in ascending
//! order; they exist to agree with each other, not to be fast.

use crate::bitmap::Bitmap;
use crate::int_array::U64Array;
use crate::{estimate_prime_count, SieveError};

/// Largest supported sieve bound, 10^12.
pub const SIEVE_LIMIT_MAX: u64 = 1_000_000_000_000;

pub(crate) fn validate_sieve_limit(n: u64) -> Result<(), SieveError> {
    if n <= 10 || n > SIEVE_LIMIT_MAX {
        return Err(SieveError::InputOutOfDomain(format!(
            "sieve limit must be in (10, 10^12] (got {n})"
        )));
    }
    Ok(())
}

/// Optimized Sieve of Eratosthenes: odd numbers only, one bit each.
pub fn soe(n: u64) -> Result<U64Array, SieveError> {
    validate_sieve_limit(n)?;
    let mut primes = U64Array::with_capacity(estimate_prime_count(n));
    primes.push(2);

    // Bit i represents the odd number 2i + 1; index 0 (the unit) unused.
    let half = (n + 1) / 2;
    let mut odds = Bitmap::new(half, true)?;
    odds.clear(0);

    let root = n.isqrt();
    let mut p = 3u64;
    while p <= root {
        if odds.get(p / 2) {
            odds.clear_steps_simd(p, p * p / 2, half - 1);
        }
        p += 2;
    }
    for i in 1..half {
        if odds.get(i) {
            primes.push(2 * i + 1);
        }
    }
    Ok(primes)
}

/// Segmented Sieve of Eratosthenes: a base sieve to √n, then fixed-size
/// windows marked from the base primes.
pub fn ssoe(n: u64) -> Result<U64Array, SieveError> {
    validate_sieve_limit(n)?;
    const SEGMENT: u64 = 1 << 18;

    let root = n.isqrt().max(11);
    let base = soe(root)?;
    let mut primes = U64Array::with_capacity(estimate_prime_count(n));
    for &p in base.as_slice() {
        if p <= n {
            primes.push(p);
        }
    }

    let mut window = Bitmap::new(SEGMENT, true)?;
    let mut low = root + 1;
    while low <= n {
        let high = (low + SEGMENT - 1).min(n);
        window.set_all();
        for &p in base.as_slice() {
            if p * p > high {
                break;
            }
            let first = p * low.div_ceil(p).max(p);
            if first <= high {
                window.clear_steps_simd(p, first - low, high - low);
            }
        }
        for offset in 0..=(high - low) {
            if window.get(offset) {
                primes.push(low + offset);
            }
        }
        low = high + 1;
    }
    Ok(primes)
}

/// Euler (linear) sieve: each composite is cleared exactly once, by its
/// smallest prime factor.
pub fn soeu(n: u64) -> Result<U64Array, SieveError> {
    validate_sieve_limit(n)?;
    let mut primes = U64Array::with_capacity(estimate_prime_count(n));
    let mut composite = Bitmap::new(n + 1, false)?;

    for i in 2..=n {
        if !composite.get(i) {
            primes.push(i);
        }
        for &p in primes.as_slice() {
            match i.checked_mul(p) {
                Some(ip) if ip <= n => composite.set(ip),
                _ => break,
            }
            if i % p == 0 {
                break;
            }
        }
    }
    Ok(primes)
}

/// Sieve of Sundaram: removes `i + j + 2ij`, leaving `2k + 1` prime for
/// every surviving `k`.
pub fn sos(n: u64) -> Result<U64Array, SieveError> {
    validate_sieve_limit(n)?;
    let mut primes = U64Array::with_capacity(estimate_prime_count(n));
    primes.push(2);

    let m = (n - 1) / 2;
    let mut marks = Bitmap::new(m + 1, true)?;
    let mut i = 1u64;
    while i + i + 2 * i * i <= m {
        let mut j = i;
        loop {
            let idx = i + j + 2 * i * j;
            if idx > m {
                break;
            }
            marks.clear(idx);
            j += 1;
        }
        i += 1;
    }
    for k in 1..=m {
        if marks.get(k) {
            primes.push(2 * k + 1);
        }
    }
    Ok(primes)
}

/// Sieve of Atkin: quadratic-form candidate toggling followed by
/// square-free filtering.
pub fn soa(n: u64) -> Result<U64Array, SieveError> {
    validate_sieve_limit(n)?;
    let mut primes = U64Array::with_capacity(estimate_prime_count(n));
    primes.push(2);
    primes.push(3);

    let mut flags = Bitmap::new(n + 1, false)?;
    let root = n.isqrt();

    for x in 1..=root {
        for y in 1..=root {
            let x2 = x * x;
            let y2 = y * y;

            let c = 4 * x2 + y2;
            if c <= n && (c % 12 == 1 || c % 12 == 5) {
                flags.flip(c);
            }
            let c = 3 * x2 + y2;
            if c <= n && c % 12 == 7 {
                flags.flip(c);
            }
            if x > y {
                let c = 3 * x2 - y2;
                if c <= n && c % 12 == 11 {
                    flags.flip(c);
                }
            }
        }
    }

    let mut p = 5u64;
    while p * p <= n {
        if flags.get(p) {
            flags.clear_steps_simd(p * p, p * p, n);
        }
        p += 2;
    }
    for c in 5..=n {
        if flags.get(c) {
            primes.push(c);
        }
    }
    Ok(primes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIMES_TO_100: [u64; 25] = [
        2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83,
        89, 97,
    ];

    #[test]
    fn all_agree_to_100() {
        for (name, sieve) in [
            ("SoE", soe as fn(u64) -> Result<U64Array, SieveError>),
            ("SSoE", ssoe),
            ("SoEu", soeu),
            ("SoS", sos),
            ("SoA", soa),
        ] {
            let primes = sieve(100).unwrap();
            assert_eq!(primes.as_slice(), &PRIMES_TO_100, "{} mismatch", name);
            assert!(primes.is_ordered(), "{} unordered", name);
        }
    }

    #[test]
    fn known_counts_at_ten_thousand() {
        for (name, sieve) in [
            ("SoE", soe as fn(u64) -> Result<U64Array, SieveError>),
            ("SSoE", ssoe),
            ("SoEu", soeu),
            ("SoS", sos),
            ("SoA", soa),
        ] {
            let primes = sieve(10_000).unwrap();
            assert_eq!(primes.count(), 1229, "{} count", name);
            assert_eq!(primes.last(), Some(9973), "{} last", name);
        }
    }

    #[test]
    fn rejects_out_of_domain_limits() {
        assert!(soe(10).is_err());
        assert!(soe(SIEVE_LIMIT_MAX + 1).is_err());
        assert!(ssoe(5).is_err());
    }

    #[test]
    fn digests_agree_across_variants() {
        let mut a = soe(50_000).unwrap();
        let mut b = soa(50_000).unwrap();
        a.compute_hash();
        b.compute_hash();
        assert_eq!(a.digest(), b.digest());
    }
}
