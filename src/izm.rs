//! # IZM Context — Pre-Sieved VX Window Template
//!
//! A VX window is `vx` consecutive x-units of the iZ space, where `vx` is a
//! product of consecutive small primes starting at 5. Because every such
//! prime divides `vx`, its composites land at the *same local offsets in
//! every window* — so they are cleared once into a pair of base bitmaps and
//! reused for each segment by a byte copy instead of being re-marked.
//!
//! [`IzmContext`] bundles the window width, the two base bitmaps, the count
//! of pre-sieved small primes, and the root-prime table (every prime ≤ vx)
//! used for deterministic per-segment marking. The context is deep-cloned
//! for per-worker ownership; nothing in it is shared after a clone.

use crate::bitmap::Bitmap;
use crate::int_array::U64Array;
use crate::iz::{self, SMALL_PRIMES};
use crate::{siz, SieveError};

/// Pre-computed assets for repeated VX-segment sieving.
#[derive(Clone, Debug)]
pub struct IzmContext {
    vx: u64,
    k_vx: usize,
    base_x5: Bitmap,
    base_x7: Bitmap,
    root_primes: U64Array,
}

impl IzmContext {
    /// Build the context for a window of width `vx`.
    ///
    /// `vx` must be odd, coprime to 3, at least 35, and a product of
    /// consecutive small primes starting at 5 (the tabulated widths in
    /// [`crate::iz`] all qualify).
    pub fn new(vx: u64) -> Result<Self, SieveError> {
        validate_vx(vx)?;
        let (base_x5, base_x7) = construct_vx_base(vx)?;
        let root_primes = siz::siz(vx)?;
        tracing::debug!(vx, roots = root_primes.count(), "izm context built");
        Ok(IzmContext {
            vx,
            k_vx: count_vx_factors(vx),
            base_x5,
            base_x7,
            root_primes,
        })
    }

    /// Window width in x-units.
    pub fn vx(&self) -> u64 {
        self.vx
    }

    /// Count of small primes dividing `vx` (those are pre-sieved; iteration
    /// over the root-prime table later skips them, together with 2 and 3).
    pub fn k_vx(&self) -> usize {
        self.k_vx
    }

    /// Pre-sieved base for the `6x − 1` line.
    pub fn base_x5(&self) -> &Bitmap {
        &self.base_x5
    }

    /// Pre-sieved base for the `6x + 1` line.
    pub fn base_x7(&self) -> &Bitmap {
        &self.base_x7
    }

    /// Every prime ≤ vx, ascending.
    pub fn root_primes(&self) -> &[u64] {
        self.root_primes.as_slice()
    }

    /// Root primes with 2, 3, and the pre-sieved divisors of vx skipped —
    /// the ones a segment still has to mark deterministically.
    pub fn marking_primes(&self) -> &[u64] {
        &self.root_primes.as_slice()[2 + self.k_vx..]
    }
}

fn validate_vx(vx: u64) -> Result<(), SieveError> {
    if vx < 35 || vx % 2 == 0 || vx % 3 == 0 {
        return Err(SieveError::InputOutOfDomain(format!(
            "vx must be odd, coprime to 3, and >= 35 (got {vx})"
        )));
    }
    Ok(())
}

/// Number of consecutive small primes from 5 up that divide `vx`.
fn count_vx_factors(vx: u64) -> usize {
    SMALL_PRIMES
        .iter()
        .skip(2)
        .take_while(|&&p| vx % p == 0)
        .count()
}

/// Build the pre-sieved base bitmaps for a VX window.
///
/// Both bitmaps span local indices `[0, vx]`. Afterwards a bit is set at
/// index `x` in the `6x − 1` base iff `gcd(6x − 1, vx) = 1`, and likewise
/// for the `6x + 1` base.
pub fn construct_vx_base(vx: u64) -> Result<(Bitmap, Bitmap), SieveError> {
    validate_vx(vx)?;
    let mut base_x5 = Bitmap::new(vx + 1, true)?;
    let mut base_x7 = Bitmap::new(vx + 1, true)?;
    // Local 0 maps to ±1 at window origin; never a candidate.
    base_x5.clear(0);
    base_x7.clear(0);

    for &p in SMALL_PRIMES.iter().skip(2) {
        if vx % p != 0 {
            break;
        }
        let xp = (p + 1) / 6;
        // The prime itself sits inside the window on its own line.
        if iz::line_of(p) > 0 {
            base_x7.clear(xp);
        } else {
            base_x5.clear(xp);
        }
        base_x5.clear_steps_simd(p, iz::solve_x0(-1, p, vx, 0), vx);
        base_x7.clear_steps_simd(p, iz::solve_x0(1, p, vx, 0), vx);
    }
    Ok((base_x5, base_x7))
}
