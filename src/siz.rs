//! # SiZ Family — Sieves in the iZ Index Space
//!
//! Three sieves over the candidate set `{6x − 1, 6x + 1}`:
//!
//! - [`siz`] — the solid sieve: two bitmaps spanning the whole x range,
//!   cleared in one pass. Simple and exact; memory grows with n/6.
//! - [`sizm`] — the segmented sieve: one VX window pair kept L2-resident,
//!   reset per segment by byte copy and re-marked with the horizontal
//!   solver. Ordered output.
//! - [`sizm_vy`] — the vertical traversal: one narrow column bitmap per
//!   (x, line) pair, swept over all segments at once. The fastest variant
//!   for bulk enumeration, but output is *unordered* (column-major).
//!
//! All three produce identical prime sets for the same bound; the consensus
//! is exercised against the classic sieves in the test suite.

use crate::bitmap::Bitmap;
use crate::int_array::U64Array;
use crate::iz::{self, gcd, iz, SMALL_PRIMES, VX3, VX4};
use crate::izm;
use crate::{classic, estimate_prime_count, SieveError};

/// Emit primes from a pair of iZ bitmaps while marking root-prime
/// composites, for `x ∈ [1, x_max]` inclusive.
///
/// The clearing offsets come from the y = 0 solver identity: a prime
/// `p = 6x ∓ 1` first lands on its own line at `p·x + x` and on the other
/// line at `p·x − x`.
pub(crate) fn process_iz_bitmaps(
    primes: &mut U64Array,
    x5: &mut Bitmap,
    x7: &mut Bitmap,
    x_max: u64,
) {
    let root_limit = (6 * x_max + 1).isqrt();
    for x in 1..=x_max {
        if x5.get(x) {
            let p = iz(x, -1);
            primes.push(p);
            if p <= root_limit {
                x5.clear_steps_simd(p, p * x + x, x_max);
                x7.clear_steps_simd(p, p * x - x, x_max);
            }
        }
        if x7.get(x) {
            let p = iz(x, 1);
            primes.push(p);
            if p <= root_limit {
                x5.clear_steps_simd(p, p * x - x, x_max);
                x7.clear_steps_simd(p, p * x + x, x_max);
            }
        }
    }
}

/// Solid Sieve-iZ: all primes up to `n ∈ (10, 10^12]`, ascending.
pub fn siz(n: u64) -> Result<U64Array, SieveError> {
    classic::validate_sieve_limit(n)?;
    let x_max = (n + 1) / 6;

    let mut primes = U64Array::with_capacity(estimate_prime_count(n));
    primes.push(2);
    primes.push(3);

    let mut x5 = Bitmap::new(x_max + 1, true)?;
    let mut x7 = Bitmap::new(x_max + 1, true)?;
    x5.clear(0);
    x7.clear(0);

    process_iz_bitmaps(&mut primes, &mut x5, &mut x7, x_max);

    // Only the +1 line can overshoot, by at most one value.
    if primes.last().is_some_and(|p| p > n) {
        primes.pop();
    }
    Ok(primes)
}

/// Segmented Sieve-iZm, horizontal traversal: all primes up to
/// `n ∈ (10, 10^12]`, ascending.
///
/// The window width comes from the L2 heuristic; segment 0 runs the solid
/// inner loop confined to the window and its survivors become the root
/// primes that mark every later segment.
pub fn sizm(n: u64) -> Result<U64Array, SieveError> {
    classic::validate_sieve_limit(n)?;
    let mut vx = iz::compute_l2_vx(n);
    // Segment 0 must reach the root span: every later segment is marked
    // with primes up to iZ(vx, +1), which has to cover sqrt(n).
    let root_span = n.isqrt();
    let presieved = SMALL_PRIMES
        .iter()
        .skip(2)
        .take_while(|&&p| vx % p == 0)
        .count();
    let mut growth = SMALL_PRIMES.iter().skip(2 + presieved);
    while 6 * vx + 1 < root_span {
        match growth.next() {
            Some(&p) => vx *= p,
            None => break,
        }
    }
    let x_n = (n + 1) / 6;

    let mut primes = U64Array::with_capacity(estimate_prime_count(n));
    primes.push(2);
    primes.push(3);
    let mut k_vx = 0;
    for &p in SMALL_PRIMES.iter().skip(2) {
        if vx % p != 0 {
            break;
        }
        primes.push(p);
        k_vx += 1;
    }

    let (base_x5, base_x7) = izm::construct_vx_base(vx)?;
    let mut x5 = base_x5.clone();
    let mut x7 = base_x7.clone();

    // Segment 0: the solid inner loop confined to [1, min(vx, x_n)].
    process_iz_bitmaps(&mut primes, &mut x5, &mut x7, vx.min(x_n));

    // Root primes for later segments: everything found so far beyond 2, 3,
    // and the pre-sieved divisors of vx.
    let roots: Vec<u64> = primes.as_slice()[2 + k_vx..].to_vec();

    let y_last = x_n.saturating_sub(1) / vx;
    for y in 1..=y_last {
        let x_limit = vx.min(x_n - y * vx);
        x5.copy_bits_from(&base_x5);
        x7.copy_bits_from(&base_x7);

        let root_limit = (6 * (y * vx + x_limit) + 1).isqrt();
        for &p in &roots {
            if p > root_limit {
                break;
            }
            x5.clear_steps_simd(p, iz::solve_x0(-1, p, vx, y), x_limit);
            x7.clear_steps_simd(p, iz::solve_x0(1, p, vx, y), x_limit);
        }

        for x in 1..=x_limit {
            if x5.get(x) {
                primes.push(iz(y * vx + x, -1));
            }
            if x7.get(x) {
                primes.push(iz(y * vx + x, 1));
            }
        }
    }

    while primes.last().is_some_and(|p| p > n) {
        primes.pop();
    }
    Ok(primes)
}

/// Segmented Sieve-iZm, vertical traversal: all primes up to
/// `n ∈ (10, 10^12]`, **unordered** (column-major emission).
///
/// One column bitmap of length `vy` covers a fixed local x across every
/// segment at once; the vertical solver places each root prime's first hit
/// in the column. Throughput-oriented: sort the result if order matters.
pub fn sizm_vy(n: u64) -> Result<U64Array, SieveError> {
    classic::validate_sieve_limit(n)?;
    let vx = if n >= 100_000_000_000 {
        VX4
    } else if n >= 1_000_000_000 {
        VX3
    } else {
        35
    };
    let x_n = (n + 1) / 6;
    let vy = x_n / vx + 1;

    let roots = siz(n.isqrt().max(11))?;

    let mut primes = U64Array::with_capacity(estimate_prime_count(n));
    primes.push(2);
    primes.push(3);
    for &p in SMALL_PRIMES.iter().skip(2) {
        if vx % p != 0 {
            break;
        }
        primes.push(p);
    }

    let mut column = Bitmap::new(vy, true)?;
    for x in 2..=vx.min(x_n) {
        for m_id in [-1, 1] {
            let z = iz(x, m_id);
            if gcd(z, vx) != 1 {
                continue;
            }
            column.set_all();

            for &p in &roots.as_slice()[2..] {
                if vx % p == 0 {
                    continue;
                }
                let Some(mut y0) = iz::solve_y0(m_id, p, vx, x) else {
                    continue;
                };
                // The first hit may be p itself; step past it.
                if iz(x + vx * y0, m_id) == p {
                    y0 += p;
                }
                column.clear_steps_simd(p, y0, vy - 1);
            }

            for y in 0..vy {
                if column.get(y) {
                    let gx = x + vx * y;
                    if gx > x_n {
                        break;
                    }
                    let value = iz(gx, m_id);
                    if value <= n {
                        primes.push(value);
                    }
                }
            }
        }
    }
    Ok(primes)
}
