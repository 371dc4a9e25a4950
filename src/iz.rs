//! # iZ Algebra — Index Maps, First-Hit Solvers, VX Sizing
//!
//! Every integer `n > 3` with `gcd(n, 6) = 1` has a unique representation
//! `n = 6x + i` with `i ∈ {−1, +1}`; this module provides that map, its
//! arbitrary-precision twin, and the closed-form solvers that locate the
//! first composite contributed by a prime inside a VX window — horizontally
//! (fixed segment `y`, solve for `x`) and vertically (fixed column `x`,
//! solve for `y`).
//!
//! ## Solver Identity
//!
//! For a prime `p > 3`, write `p = 6·xp + ip` with `xp = (p + 1) / 6` and
//! `ip = ±1`. On line `m_id`, the residue that `y·vx + x` must reach for
//! `iZ(y·vx + x, m_id)` to be divisible by `p` is `xp` when `m_id = ip`
//! and `p − xp` otherwise. Both solvers reduce to that single congruence;
//! the vertical one additionally needs `vx` invertible mod `p`.
//!
//! Also here: the tabulated VX widths (products of consecutive primes from
//! 5 up), the L2-cache-aware width heuristic, and the primorial ceiling used
//! by the vertical random-prime search.

use rug::integer::IsPrime;
use rug::Integer;

/// Small primes used to build wheel structures and count pre-sieved factors.
pub const SMALL_PRIMES: [u64; 25] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
];

/// Default Miller–Rabin rounds for probabilistic primality checks.
pub const MR_ROUNDS: u32 = 25;

/// Standard VX widths: primorial products excluding 2 and 3.
pub const VX2: u64 = 5 * 7; // 35
/// VX2 × 11.
pub const VX3: u64 = VX2 * 11; // 385
/// VX3 × 13.
pub const VX4: u64 = VX3 * 13; // 5005
/// VX4 × 17.
pub const VX5: u64 = VX4 * 17; // 85085
/// VX5 × 19.
pub const VX6: u64 = VX5 * 19; // 1616615
/// VX6 × 23.
pub const VX7: u64 = VX6 * 23; // 37182145
/// VX7 × 29.
pub const VX8: u64 = VX7 * 29; // 1078282205

/// Map iZ coordinates to an integer: `6x + i` with `i ∈ {−1, +1}`.
#[inline]
pub fn iz(x: u64, m_id: i32) -> u64 {
    if m_id > 0 {
        6 * x + 1
    } else {
        6 * x - 1
    }
}

/// Arbitrary-precision variant of [`iz`]; produces the same integer value.
pub fn iz_mpz(x: &Integer, m_id: i32) -> Integer {
    let z = Integer::from(x * 6u32);
    if m_id > 0 {
        z + 1u32
    } else {
        z - 1u32
    }
}

/// Probabilistic primality check: true unless `n` is definitely composite.
///
/// Single source of truth for primality in this crate, wrapping GMP's
/// Miller–Rabin based test so the underlying method can change without
/// touching callers.
pub fn check_primality(n: &Integer, rounds: u32) -> bool {
    n.is_probably_prime(rounds) != IsPrime::No
}

/// Greatest common divisor.
pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// Modular inverse of `a` modulo `m` via the extended Euclidean algorithm.
///
/// Callers must ensure `gcd(a, m) = 1`; the result is meaningless otherwise.
pub fn modular_inverse(a: u64, m: u64) -> u64 {
    if m == 1 {
        return 0;
    }
    let m0 = m as i128;
    let mut a = a as i128;
    let mut m = m as i128;
    let (mut x0, mut x1) = (0i128, 1i128);
    while a > 1 {
        let q = a / m;
        let t = m;
        m = a % m;
        a = t;
        let t = x0;
        x0 = x1 - q * x0;
        x1 = t;
    }
    if x1 < 0 {
        x1 += m0;
    }
    x1 as u64
}

/// The line carrying prime `p`: +1 if `p ≡ 1 (mod 6)`, else −1.
#[inline]
pub fn line_of(p: u64) -> i32 {
    if p % 6 == 1 {
        1
    } else {
        -1
    }
}

#[inline]
fn normalized_xp(m_id: i32, p: u64) -> u64 {
    let xp = (p + 1) / 6;
    if m_id == line_of(p) {
        xp
    } else {
        p - xp
    }
}

/// Smallest `x ∈ [0, vx]` (shifted into `[1, p]` for window-interior primes)
/// such that `iZ(y·vx + x, m_id) ≡ 0 (mod p)`.
///
/// At `y = 0` the first *composite* is returned instead of the first hit,
/// since the first hit would be `p` itself.
pub fn solve_x0(m_id: i32, p: u64, vx: u64, y: u64) -> u64 {
    let xp = (p + 1) / 6;
    let ip = line_of(p);
    if y == 0 {
        // xp·(p ± 1): the nearer of p's two composite progressions.
        return if m_id == ip { p * xp + xp } else { p * xp - xp };
    }
    let nxp = normalized_xp(m_id, p);
    let yvx_mod = ((y % p) as u128 * (vx % p) as u128 % p as u128) as u64;
    let r = (nxp % p + p - yvx_mod) % p;
    if p < vx {
        // Keep the hit in [1, p] so local index 0 is never targeted.
        if r == 0 {
            p
        } else {
            r
        }
    } else {
        r
    }
}

/// Variant of [`solve_x0`] accepting an arbitrary-precision `y`.
pub fn solve_x0_mpz(m_id: i32, p: u64, vx: u64, y: &Integer) -> u64 {
    debug_assert!(*y >= 0u32);
    if let Some(y64) = y.to_u64() {
        if y64 <= u64::MAX / vx.max(1) {
            return solve_x0(m_id, p, vx, y64);
        }
    }
    let nxp = normalized_xp(m_id, p);
    let yvx_mod = Integer::from(y * vx) % p;
    let m = yvx_mod.to_u64().expect("residue fits u64");
    let r = (nxp % p + p - m) % p;
    if p < vx && r == 0 {
        p
    } else {
        r
    }
}

/// Smallest `y ≥ 0` such that `iZ(x + vx·y, m_id) ≡ 0 (mod p)`, or `None`
/// when `gcd(vx, p) ≠ 1` and no modular solution exists.
pub fn solve_y0(m_id: i32, p: u64, vx: u64, x: u64) -> Option<u64> {
    if gcd(vx, p) != 1 {
        return None;
    }
    let nxp = normalized_xp(m_id, p);
    let xm = x % p;
    if xm == nxp % p {
        return Some(0);
    }
    let delta = (nxp % p + p - xm) % p;
    let inv = modular_inverse(vx % p, p);
    Some(((delta as u128 * inv as u128) % p as u128) as u64)
}

/// Product of the first `k` primes in {5, 7, 11, 13, …}, truncated before
/// 64-bit overflow.
pub fn compute_vx_k(k: usize) -> u64 {
    let mut vx = 1u64;
    for &p in SMALL_PRIMES.iter().skip(2).take(k) {
        match vx.checked_mul(p) {
            Some(next) => vx = next,
            None => break,
        }
    }
    vx
}

/// Choose a VX width that keeps the pair of window bitmaps resident in L2:
/// start at 35 and multiply by the next prime while the product stays below
/// `min(L2 bits, n / 6)`.
pub fn compute_l2_vx(n: u64) -> u64 {
    let cap = platform_l2_bits().min(n / 6);
    let mut vx = VX2;
    let mut k = 4; // SMALL_PRIMES[4] == 11
    while k < SMALL_PRIMES.len() && vx * SMALL_PRIMES[k] < cap {
        vx *= SMALL_PRIMES[k];
        k += 1;
    }
    vx
}

fn platform_l2_bits() -> u64 {
    crate::platform::l2_cache_size_bits()
}

/// Largest primorial product of primes from 5 up that stays below
/// `2^bit_size`: accumulate until the bit length reaches the ceiling, then
/// divide off the factor that crossed it.
pub fn compute_max_vx(bit_size: u32) -> Integer {
    let mut vx = Integer::from(5);
    let mut p = Integer::from(5);
    while vx.significant_bits() < bit_size {
        p.next_prime_mut();
        vx *= &p;
    }
    vx / p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iz_maps_both_lines() {
        assert_eq!(iz(1, -1), 5);
        assert_eq!(iz(1, 1), 7);
        assert_eq!(iz(4, -1), 23);
        assert_eq!(iz(4, 1), 25);
    }

    #[test]
    fn iz_mpz_matches_u64() {
        for x in [1u64, 17, 1_000_000_007] {
            for m_id in [-1, 1] {
                let big = iz_mpz(&Integer::from(x), m_id);
                assert_eq!(big, iz(x, m_id));
            }
        }
    }

    #[test]
    fn vx_table_is_consistent() {
        assert_eq!(VX2, 35);
        assert_eq!(VX3, 385);
        assert_eq!(VX4, 5005);
        assert_eq!(VX5, 85085);
        assert_eq!(VX6, 1_616_615);
        assert_eq!(compute_vx_k(2), VX2);
        assert_eq!(compute_vx_k(6), VX6);
        // Truncates instead of overflowing.
        assert!(compute_vx_k(100) > 0);
    }

    #[test]
    fn solver_targets_composites_horizontally() {
        let vx = VX4;
        for &p in &[29u64, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79] {
            for m_id in [-1, 1] {
                for y in [1u64, 2, 10, 1_000, 123_456] {
                    let x0 = solve_x0(m_id, p, vx, y);
                    let z = iz(y * vx + x0, m_id);
                    assert_eq!(z % p, 0, "p={} m_id={} y={} x0={}", p, m_id, y, x0);
                    // No earlier hit inside the window (besides local 0).
                    for x in 1..x0 {
                        assert_ne!(iz(y * vx + x, m_id) % p, 0, "early hit at x={}", x);
                    }
                }
            }
        }
    }

    #[test]
    fn solver_first_composites_at_y0() {
        // p = 5: composites 25 = iZ(4, +1) and 35 = iZ(6, −1).
        assert_eq!(solve_x0(1, 5, VX2, 0), 4);
        assert_eq!(solve_x0(-1, 5, VX2, 0), 6);
        // p = 7: composites 49 = iZ(8, +1) and 35 = iZ(6, −1).
        assert_eq!(solve_x0(1, 7, VX2, 0), 8);
        assert_eq!(solve_x0(-1, 7, VX2, 0), 6);
    }

    #[test]
    fn mpz_solver_matches_plain_solver() {
        let vx = VX4;
        for &p in &[29u64, 37, 1009, 4999] {
            for m_id in [-1, 1] {
                for y in [0u64, 1, 77, 1_000_000_000] {
                    assert_eq!(
                        solve_x0_mpz(m_id, p, vx, &Integer::from(y)),
                        solve_x0(m_id, p, vx, y),
                        "p={} m_id={} y={}",
                        p,
                        m_id,
                        y
                    );
                }
            }
        }
    }

    #[test]
    fn mpz_solver_handles_huge_y() {
        let vx = VX4;
        let y = Integer::from(Integer::u_pow_u(10, 50)) + 12345u32;
        for &p in &[29u64, 31, 37, 101, 4999] {
            for m_id in [-1, 1] {
                let x0 = solve_x0_mpz(m_id, p, vx, &y);
                assert!(x0 <= p.max(vx));
                let coord = Integer::from(&y * vx) + x0;
                let z = iz_mpz(&coord, m_id);
                assert_eq!(z % Integer::from(p), 0, "p={} m_id={}", p, m_id);
            }
        }
    }

    #[test]
    fn vertical_solver_targets_composites() {
        let vx = VX4;
        let x = 17u64;
        for &p in &[29u64, 31, 37, 41, 43, 47, 53, 59] {
            for m_id in [-1, 1] {
                let y0 = solve_y0(m_id, p, vx, x).expect("coprime to vx");
                let z = iz(x + vx * y0, m_id);
                assert_eq!(z % p, 0, "p={} m_id={} y0={}", p, m_id, y0);
            }
        }
    }

    #[test]
    fn vertical_solver_rejects_shared_factor() {
        assert_eq!(solve_y0(-1, 7, VX2, 3), None);
        assert_eq!(solve_y0(1, 5, VX4, 3), None);
    }

    #[test]
    fn modular_inverse_round_trip() {
        for &p in &[5u64, 7, 101, 4999, 1_000_003] {
            for a in [1u64, 2, 17, 4998] {
                let a = a % p;
                if a == 0 {
                    continue;
                }
                let inv = modular_inverse(a, p);
                assert_eq!((a as u128 * inv as u128) % p as u128, 1, "a={} p={}", a, p);
            }
        }
    }

    #[test]
    fn l2_vx_stays_in_table_and_under_n() {
        let vx = compute_l2_vx(1_000_000_000_000);
        assert!(vx >= VX2);
        assert!([VX2, VX3, VX4, VX5, VX6, VX7, VX8].contains(&vx));
        // Tiny n pins the width at the floor.
        assert_eq!(compute_l2_vx(100), VX2);
    }

    #[test]
    fn max_vx_respects_bit_ceiling() {
        for bits in [16u32, 64, 256] {
            let vx = compute_max_vx(bits);
            assert!(vx.significant_bits() < bits, "bits={}", bits);
            // One more factor would cross the ceiling: the next prime after
            // the largest factor of vx multiplies past 2^bits.
            assert!(vx > 1u32);
        }
    }
}
