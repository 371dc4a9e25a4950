//! # Prime Search — Random Generation and the Next-Prime Walker
//!
//! Probabilistic prime generation over arbitrary-precision candidates,
//! using the VX machinery to discard candidates with small factors before
//! any Miller–Rabin round runs:
//!
//! - **Horizontal** ([`vx_search_prime`]): pick a random segment `y` of the
//!   requested magnitude, sieve one window with every root prime via the
//!   horizontal solver, then test survivors from a random offset. Advances
//!   `y` until a prime is found.
//! - **Vertical** ([`vy_search_prime`]): pick a random column of a huge
//!   primorial window (every candidate in a coprime column already avoids
//!   all factors of `vx`), then walk the column upward testing candidates.
//!
//! The parallel drivers spawn independent workers, each with its own
//! entropy-seeded random state and deep context, and take the first
//! candidate delivered over a channel — the decimal string is parsed by
//! the parent and remaining workers are stopped via a shared flag. With a
//! single core the search runs in-process.
//!
//! [`next_prime`] walks iZ candidates from a base value in either
//! direction, filtering through the pre-sieved window bases and testing
//! the survivors.

use rug::rand::RandState;
use rug::Integer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use crate::bitmap::Bitmap;
use crate::iz::{self, MR_ROUNDS, VX5, VX6};
use crate::izm::IzmContext;
use crate::{platform, siz, SieveError};

/// How often search loops poll the stop flag.
const STOP_POLL_MASK: u64 = 0xFF;

/// Bits of the random multiple used to de-correlate the vertical search
/// start from the column draw.
const VY_JUMP_BITS: u32 = 16;

fn resolve_m_id(m_id: Option<i32>, rng: &mut RandState) -> i32 {
    match m_id {
        Some(m) if m == -1 || m == 1 => m,
        _ => {
            if Integer::from(Integer::random_bits(1, rng)) == 1u32 {
                1
            } else {
                -1
            }
        }
    }
}

/// Horizontal random-prime search over windows of width `vx`.
///
/// Draws a random `y` of the requested magnitude, then repeatedly sieves
/// the window at `y` with every root prime and tests survivors starting
/// from a random offset in the lower half. Returns `None` only when a stop
/// is requested.
pub fn vx_search_prime(
    m_id: Option<i32>,
    vx: u64,
    bit_size: u32,
    rng: &mut RandState,
    stop: Option<&AtomicBool>,
) -> Result<Option<Integer>, SieveError> {
    let m_id = resolve_m_id(m_id, rng);
    let roots = siz::sizm(vx)?;

    // Lock the candidate magnitude: iZ(y·vx + x) ≈ 6·vx·y.
    let mut y = Integer::from(Integer::random_bits(bit_size, rng));
    y /= 6 * vx;

    let should_stop = || stop.is_some_and(|flag| flag.load(Ordering::Relaxed));
    loop {
        if should_stop() {
            return Ok(None);
        }
        let mut window = Bitmap::new(vx + 1, true)?;
        for &p in &roots.as_slice()[2..] {
            window.clear_steps_simd(p, iz::solve_x0_mpz(m_id, p, vx, &y), vx);
        }

        let start = Integer::from(vx / 2)
            .random_below(rng)
            .to_u64()
            .unwrap_or(1)
            .max(1);
        let y_vx = Integer::from(&y * vx);
        for x in start..=vx {
            if x & STOP_POLL_MASK == 0 && should_stop() {
                return Ok(None);
            }
            if !window.get(x) {
                continue;
            }
            let candidate = iz::iz_mpz(&Integer::from(&y_vx + x), m_id);
            if iz::check_primality(&candidate, MR_ROUNDS) {
                return Ok(Some(candidate));
            }
        }
        y += 1;
    }
}

/// Vertical random-prime search over a primorial window `vx`.
///
/// Draws a random coprime column, jumps to a random height, then walks the
/// column upward: every step adds `6·vx`, so no candidate is ever divisible
/// by a factor of `vx`. Returns `None` only when a stop is requested.
pub fn vy_search_prime(
    m_id: Option<i32>,
    vx: &Integer,
    rng: &mut RandState,
    stop: Option<&AtomicBool>,
) -> Result<Option<Integer>, SieveError> {
    let m_id = resolve_m_id(m_id, rng);

    let mut z = Integer::from(vx.random_below_ref(rng));
    z *= 6u32;
    if m_id > 0 {
        z += 1u32;
    } else {
        z -= 1u32;
    }
    // Move to a column that can host primes.
    while Integer::from(z.gcd_ref(vx)) != 1u32 {
        z += 6u32;
    }

    let step = Integer::from(vx * 6u32);
    let jump = Integer::from(Integer::random_bits(VY_JUMP_BITS, rng));
    z += Integer::from(&step * &jump);

    let mut iterations = 0u64;
    loop {
        if iterations & STOP_POLL_MASK == 0 && stop.is_some_and(|f| f.load(Ordering::Relaxed)) {
            return Ok(None);
        }
        iterations += 1;
        z += &step;
        if iz::check_primality(&z, MR_ROUNDS) {
            return Ok(Some(z));
        }
    }
}

#[derive(Clone, Copy)]
enum SearchKind {
    Horizontal,
    Vertical,
}

/// Run a search on `workers` independent threads and take the first result.
///
/// Each worker owns its own entropy-seeded random state; the parent blocks
/// on the channel, parses the first delivered decimal string, raises the
/// stop flag, and joins the rest. A broken channel falls back to an
/// in-process search.
fn parallel_search(kind: SearchKind, bit_size: u32, cores: usize) -> Result<Integer, SieveError> {
    let in_process = |rng: &mut RandState| -> Result<Option<Integer>, SieveError> {
        match kind {
            SearchKind::Horizontal => vx_search_prime(None, VX6, bit_size, rng, None),
            SearchKind::Vertical => {
                let vx = vy_window(bit_size);
                vy_search_prime(None, &vx, rng, None)
            }
        }
    };

    let workers = cores.max(1).min(platform::cpu_cores());
    if workers <= 1 {
        tracing::debug!("running prime search in-process");
        let mut rng = platform::new_randstate();
        return in_process(&mut rng)?
            .ok_or_else(|| SieveError::Channel("search stopped without result".into()));
    }

    let stop = AtomicBool::new(false);
    let (tx, rx) = mpsc::channel::<String>();
    let vy_vx = match kind {
        SearchKind::Vertical => Some(vy_window(bit_size)),
        SearchKind::Horizontal => None,
    };
    let kind_is_vertical = vy_vx.is_some();

    let delivered: Option<String> = std::thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let stop = &stop;
            let vy_vx = vy_vx.clone();
            scope.spawn(move || {
                let mut rng = platform::new_randstate();
                let found = if kind_is_vertical {
                    vy_search_prime(None, vy_vx.as_ref().unwrap(), &mut rng, Some(stop))
                } else {
                    vx_search_prime(None, VX6, bit_size, &mut rng, Some(stop))
                };
                if let Ok(Some(prime)) = found {
                    // Receiver may be gone if another worker won; ignore.
                    let _ = tx.send(prime.to_string_radix(10));
                }
            });
        }
        drop(tx);
        let first = rx.recv().ok();
        stop.store(true, Ordering::Relaxed);
        first
    });

    match delivered {
        Some(text) => Integer::parse_radix(&text, 10)
            .map(Integer::from)
            .map_err(|_| SieveError::Channel("worker delivered malformed candidate".into())),
        None => {
            tracing::warn!("search channel closed without result; retrying in-process");
            let mut rng = platform::new_randstate();
            in_process(&mut rng)?
                .ok_or_else(|| SieveError::Channel("search stopped without result".into()))
        }
    }
}

/// Window for the vertical search: the largest primorial below the target
/// magnitude, leaving room for the line offset and the random jump.
fn vy_window(bit_size: u32) -> Integer {
    iz::compute_max_vx(bit_size.saturating_sub(VY_JUMP_BITS + 3).max(8))
}

/// Generate a random probable prime of roughly `bit_size` bits using the
/// horizontal search across up to `cores` workers.
pub fn vx_random_prime(bit_size: u32, cores: usize) -> Result<Integer, SieveError> {
    if bit_size < 16 {
        return Err(SieveError::InputOutOfDomain(
            "bit size must be at least 16".into(),
        ));
    }
    parallel_search(SearchKind::Horizontal, bit_size, cores)
}

/// Generate a random probable prime of roughly `bit_size` bits using the
/// vertical search across up to `cores` workers.
pub fn vy_random_prime(bit_size: u32, cores: usize) -> Result<Integer, SieveError> {
    if bit_size < 32 {
        return Err(SieveError::InputOutOfDomain(
            "bit size must be at least 32".into(),
        ));
    }
    parallel_search(SearchKind::Vertical, bit_size, cores)
}

/// Nearest prime strictly beyond `base` in the chosen direction, walking iZ
/// candidates through the pre-sieved window bases and testing survivors.
///
/// Backward searches exhaust at 2: `next_prime(2, backward)` is `None`.
pub fn next_prime(base: &Integer, forward: bool) -> Result<Option<Integer>, SieveError> {
    // The window bases pre-clear the primes dividing vx, so the walker is
    // blind below 23; settle those cases from a table.
    const SMALL: [u32; 9] = [2, 3, 5, 7, 11, 13, 17, 19, 23];
    if forward && *base < SMALL[SMALL.len() - 1] {
        let next = SMALL.iter().find(|&&p| *base < p).expect("bounded above");
        return Ok(Some(Integer::from(*next)));
    }
    if !forward && *base <= SMALL[SMALL.len() - 1] {
        let prev = SMALL.iter().rev().find(|&&p| *base > p);
        return Ok(prev.map(|&p| Integer::from(p)));
    }

    // Fast path: hop to the opposite line two away.
    let residue = Integer::from(base % 6u32).to_u32().unwrap_or(0);
    if forward && residue == 5 {
        let candidate = Integer::from(base + 2u32);
        if iz::check_primality(&candidate, MR_ROUNDS) {
            return Ok(Some(candidate));
        }
    } else if !forward && residue == 1 {
        let candidate = Integer::from(base - 2u32);
        if iz::check_primality(&candidate, MR_ROUNDS) {
            return Ok(Some(candidate));
        }
    }

    let vx = if base.significant_bits() <= 2048 {
        VX5
    } else {
        VX6
    };
    let izm = IzmContext::new(vx)?;

    let x_base = Integer::from(base / 6u32);
    let mut y = Integer::from(&x_base / vx);
    let local = Integer::from(&x_base % vx).to_u64().expect("local fits");

    let mut yvx = Integer::from(&y * vx);
    // The scan starts in the base column; the strict direction filter
    // keeps the base itself (and anything behind it) out of the result.
    let mut x = local;
    loop {
        let mut ascending;
        let mut descending;
        let candidates: &mut dyn Iterator<Item = u64> = if forward {
            ascending = x..=vx;
            &mut ascending
        } else {
            descending = (1..=x).rev();
            &mut descending
        };
        for cx in candidates {
            let lines: [i32; 2] = if forward { [-1, 1] } else { [1, -1] };
            for line in lines {
                let bit = if line < 0 {
                    izm.base_x5().get(cx)
                } else {
                    izm.base_x7().get(cx)
                };
                if !bit {
                    continue;
                }
                let candidate = iz::iz_mpz(&Integer::from(&yvx + cx), line);
                let in_direction = if forward {
                    candidate > *base
                } else {
                    candidate < *base
                };
                if in_direction && iz::check_primality(&candidate, MR_ROUNDS) {
                    return Ok(Some(candidate));
                }
            }
        }
        if forward {
            y += 1;
            yvx += vx;
            x = 1;
        } else {
            if y == 0u32 {
                // Exhausted below 5; handled by the small cases above.
                return Ok(None);
            }
            y -= 1;
            yvx -= vx;
            x = vx;
        }
    }
}
