//! # VX Segment — Two-Stage Sieve over One Window
//!
//! Runtime state for the window at coordinate `y`: the candidate values
//! `iZ(y·vx + x, ±1)` for local `x ∈ [start_x, end_x]`. Construction clones
//! the pre-sieved bases from an [`IzmContext`] and immediately runs the
//! deterministic stage — marking composites of every root prime up to the
//! segment's square-root limit with the horizontal solver.
//!
//! When the limit exceeds `vx` (`is_large_limit`), root primes above the
//! window width cannot be enumerated deterministically: the survivors are
//! settled by a probabilistic stage that Miller–Rabin-tests each remaining
//! candidate and clears the composites.
//!
//! Survivors can then be drained three ways: counted (`p_count`), encoded as
//! 16-bit gaps for compact streaming, or written as decimal text.

use rug::Integer;
use std::io::Write;

use crate::bitmap::Bitmap;
use crate::int_array::U16Array;
use crate::iz::{self, MR_ROUNDS};
use crate::izm::IzmContext;
use crate::SieveError;

/// One VX window at segment coordinate `y`, mid-sieve.
#[derive(Debug)]
pub struct VxSegment {
    vx: u64,
    y: Integer,
    yvx: Integer,
    root_limit: Integer,
    is_large_limit: bool,
    mr_rounds: u32,
    start_x: u64,
    end_x: u64,
    x5: Bitmap,
    x7: Bitmap,
    p_count: u64,
    p_gaps: Option<U16Array>,
}

impl VxSegment {
    /// Initialize the segment over local `[start_x, end_x]` at coordinate
    /// `y`, and run the deterministic stage.
    ///
    /// `mr_rounds = 0` selects the default of 25 rounds. When the segment's
    /// root limit fits inside the window, the deterministic stage is
    /// exhaustive and `p_count` is final on return.
    pub fn new(
        izm: &IzmContext,
        start_x: u64,
        end_x: u64,
        y: Integer,
        mr_rounds: u32,
    ) -> Result<Self, SieveError> {
        let vx = izm.vx();
        if start_x < 1 || start_x > end_x || end_x > vx {
            return Err(SieveError::InputOutOfDomain(format!(
                "segment bounds [{start_x}, {end_x}] outside [1, {vx}]"
            )));
        }
        if y < 0u32 {
            return Err(SieveError::InputOutOfDomain(
                "segment coordinate y must be non-negative".into(),
            ));
        }

        let yvx = Integer::from(&y * vx);
        // Largest candidate in the window is iZ(yvx + vx, +1).
        let root_limit = (Integer::from(&yvx + vx) * 6u32 + 1u32).sqrt();
        let is_large_limit = root_limit > vx;

        let mut seg = VxSegment {
            vx,
            y,
            yvx,
            root_limit,
            is_large_limit,
            mr_rounds: if mr_rounds == 0 { MR_ROUNDS } else { mr_rounds },
            start_x,
            end_x,
            x5: izm.base_x5().clone(),
            x7: izm.base_x7().clone(),
            p_count: 0,
            p_gaps: None,
        };
        seg.det_sieve(izm);
        if !seg.is_large_limit {
            seg.p_count = seg.x5.count_ones_in(start_x, end_x) + seg.x7.count_ones_in(start_x, end_x);
        }
        Ok(seg)
    }

    /// Deterministic stage: mark composites of every root prime within the
    /// root limit, on both lines.
    fn det_sieve(&mut self, izm: &IzmContext) {
        let limit = self.root_limit.to_u64().unwrap_or(u64::MAX);
        // A y that keeps y·vx inside u64 takes the plain solver.
        let small_y = self.yvx.to_u64().map(|_| self.y.to_u64().unwrap());

        for &p in izm.marking_primes() {
            if p > limit {
                break;
            }
            let (x05, x07) = match small_y {
                Some(y64) => (
                    iz::solve_x0(-1, p, self.vx, y64),
                    iz::solve_x0(1, p, self.vx, y64),
                ),
                None => (
                    iz::solve_x0_mpz(-1, p, self.vx, &self.y),
                    iz::solve_x0_mpz(1, p, self.vx, &self.y),
                ),
            };
            self.x5.clear_steps_simd(p, x05, self.end_x);
            self.x7.clear_steps_simd(p, x07, self.end_x);
        }
    }

    /// Probabilistic stage: test every surviving candidate, clearing the
    /// composites and counting the rest. A no-op unless the segment
    /// straddles the square-root threshold.
    pub fn prob_sieve(&mut self) {
        if !self.is_large_limit {
            return;
        }
        for x in self.start_x.max(1)..=self.end_x {
            if self.x5.get(x) {
                let c = iz::iz_mpz(&Integer::from(&self.yvx + x), -1);
                if iz::check_primality(&c, self.mr_rounds) {
                    self.p_count += 1;
                } else {
                    self.x5.clear(x);
                }
            }
            if self.x7.get(x) {
                let c = iz::iz_mpz(&Integer::from(&self.yvx + x), 1);
                if iz::check_primality(&c, self.mr_rounds) {
                    self.p_count += 1;
                } else {
                    self.x7.clear(x);
                }
            }
        }
        self.is_large_limit = false;
    }

    /// Complete segment processing: the probabilistic stage when required,
    /// then optional gap collection.
    pub fn full_sieve(&mut self, collect_gaps: bool) {
        self.prob_sieve();
        if collect_gaps {
            self.collect_gaps();
        }
    }

    /// Encode the survivors as 16-bit gaps from a notional predecessor: the
    /// `+1`-line position at `start_x − 1`. Within each x the `−1` line
    /// precedes the `+1` line by 2; consecutive x positions are 6 apart.
    /// The trailing accumulated gap is appended so consumers can chain
    /// segments.
    ///
    /// The first segment of a run (y = 0) must not be gap-encoded; callers
    /// handle it separately.
    pub fn collect_gaps(&mut self) {
        let mut gaps = U16Array::with_capacity((self.end_x - self.start_x + 1) as usize / 4);
        let mut gap = 0u16;
        for x in self.start_x..=self.end_x {
            gap += 4;
            if self.x5.get(x) {
                gaps.push(gap);
                gap = 0;
            }
            gap += 2;
            if self.x7.get(x) {
                gaps.push(gap);
                gap = 0;
            }
        }
        gaps.push(gap);
        gaps.resize_to_fit();
        self.p_gaps = Some(gaps);
    }

    /// Stream surviving primes as decimal text separated by single spaces,
    /// testing candidates on the fly when the segment is large-limit.
    ///
    /// `clip` optionally restricts emission to an inclusive value interval
    /// (used by the range driver on boundary segments). Returns the number
    /// of primes written.
    pub fn stream<W: Write>(
        &mut self,
        out: &mut W,
        clip: Option<(&Integer, &Integer)>,
    ) -> Result<u64, SieveError> {
        let mut written = 0u64;
        for x in self.start_x.max(1)..=self.end_x {
            for (line, bitmap) in [(-1, &mut self.x5), (1, &mut self.x7)] {
                if !bitmap.get(x) {
                    continue;
                }
                let c = iz::iz_mpz(&Integer::from(&self.yvx + x), line);
                if self.is_large_limit {
                    if iz::check_primality(&c, self.mr_rounds) {
                        self.p_count += 1;
                    } else {
                        bitmap.clear(x);
                        continue;
                    }
                }
                if let Some((lo, hi)) = clip {
                    if c < *lo || c > *hi {
                        continue;
                    }
                }
                write!(out, "{} ", c)?;
                written += 1;
            }
        }
        self.is_large_limit = false;
        Ok(written)
    }

    /// Segment coordinate y.
    pub fn y(&self) -> &Integer {
        &self.y
    }

    /// Primes found in `[start_x, end_x]` so far (final once the segment is
    /// no longer large-limit).
    pub fn p_count(&self) -> u64 {
        self.p_count
    }

    /// Whether surviving candidates still require probabilistic checks.
    pub fn is_large_limit(&self) -> bool {
        self.is_large_limit
    }

    /// Gap encoding collected by [`VxSegment::collect_gaps`], if any.
    pub fn p_gaps(&self) -> Option<&U16Array> {
        self.p_gaps.as_ref()
    }

    /// Candidate bitmap for the `6x − 1` line.
    pub fn x5(&self) -> &Bitmap {
        &self.x5
    }

    /// Candidate bitmap for the `6x + 1` line.
    pub fn x7(&self) -> &Bitmap {
        &self.x7
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iz::{iz, VX2, VX4};
    use crate::siz;

    fn segment(vx: u64, y: u64, mr: u32) -> (IzmContext, VxSegment) {
        let izm = IzmContext::new(vx).unwrap();
        let seg = VxSegment::new(&izm, 1, vx, Integer::from(y), mr).unwrap();
        (izm, seg)
    }

    #[test]
    fn rejects_bad_bounds() {
        let izm = IzmContext::new(VX2).unwrap();
        assert!(VxSegment::new(&izm, 0, VX2, Integer::from(1), 0).is_err());
        assert!(VxSegment::new(&izm, 1, VX2 + 1, Integer::from(1), 0).is_err());
        assert!(VxSegment::new(&izm, 9, 3, Integer::from(1), 0).is_err());
    }

    #[test]
    fn deterministic_segment_matches_reference_sieve() {
        // y = 1 at VX4: root_limit < vx, so the deterministic stage is
        // exhaustive. Compare against SiZm over the covering range.
        let (_, seg) = segment(VX4, 1, 0);
        assert!(!seg.is_large_limit());

        // The y = 1 segment covers values [iZ(vx + 1, −1), iZ(2·vx, +1)].
        let reference = siz::sizm(iz(2 * VX4, 1)).unwrap();
        let expected = reference
            .as_slice()
            .iter()
            .filter(|&&p| p >= iz(VX4 + 1, -1))
            .count() as u64;
        assert_eq!(seg.p_count(), expected);
    }

    #[test]
    fn survivors_have_no_root_factor() {
        let (izm, seg) = segment(VX2, 3, 0);
        for x in 1..=VX2 {
            let limit = seg.root_limit.to_u64().unwrap();
            if seg.x5().get(x) {
                let z = iz(3 * VX2 + x, -1);
                for &p in izm.root_primes() {
                    if p <= limit.min(VX2) {
                        assert_ne!(z % p, 0, "x5 survivor {} divisible by {}", z, p);
                    }
                }
            }
            if seg.x7().get(x) {
                let z = iz(3 * VX2 + x, 1);
                for &p in izm.root_primes() {
                    if p <= limit.min(VX2) {
                        assert_ne!(z % p, 0, "x7 survivor {} divisible by {}", z, p);
                    }
                }
            }
        }
    }

    #[test]
    fn large_limit_segment_completes_probabilistically() {
        // y = 10^15 / VX2 keeps things fast at width 35 while forcing the
        // probabilistic stage (root_limit ≫ vx).
        let izm = IzmContext::new(VX2).unwrap();
        let y = Integer::from(1_000_000_000_000_000u64) / VX2;
        let mut seg = VxSegment::new(&izm, 1, VX2, y, 5).unwrap();
        assert!(seg.is_large_limit());
        assert_eq!(seg.p_count(), 0);

        seg.full_sieve(false);
        assert!(!seg.is_large_limit());

        // Every survivor passes an independent primality check.
        for x in 1..=VX2 {
            for (line, bm) in [(-1, seg.x5()), (1, seg.x7())] {
                if bm.get(x) {
                    let c = iz::iz_mpz(&Integer::from(&seg.yvx + x), line);
                    assert!(iz::check_primality(&c, 25), "false survivor {}", c);
                }
            }
        }
    }

    #[test]
    fn gap_encoding_reconstructs_survivors() {
        let (_, mut seg) = segment(VX4, 2, 0);
        seg.full_sieve(true);
        let gaps = seg.p_gaps().expect("gaps collected");

        // Walk the gaps from the notional predecessor and collect values.
        let base = iz(2 * VX4 + seg.start_x - 1, 1);
        let mut cursor = base;
        let mut rebuilt = Vec::new();
        for i in 0..gaps.count() - 1 {
            cursor += gaps.get(i) as u64;
            rebuilt.push(cursor);
        }
        assert_eq!(rebuilt.len() as u64, seg.p_count());

        let mut expected = Vec::new();
        for x in 1..=VX4 {
            if seg.x5().get(x) {
                expected.push(iz(2 * VX4 + x, -1));
            }
            if seg.x7().get(x) {
                expected.push(iz(2 * VX4 + x, 1));
            }
        }
        assert_eq!(rebuilt, expected);
    }

    #[test]
    fn stream_emits_space_separated_decimals() {
        let (_, mut seg) = segment(VX2, 1, 0);
        let mut buf = Vec::new();
        let written = seg.stream(&mut buf, None).unwrap();
        assert_eq!(written, seg.p_count());

        let text = String::from_utf8(buf).unwrap();
        let values: Vec<u64> = text
            .split_ascii_whitespace()
            .map(|s| s.parse().unwrap())
            .collect();
        assert_eq!(values.len() as u64, written);
        // Ascending, all within the window, all prime by trial division.
        for pair in values.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        for &v in &values {
            assert!(v > iz(VX2, 1) && v <= iz(2 * VX2, 1));
            let mut d = 2;
            while d * d <= v {
                assert_ne!(v % d, 0, "{} not prime", v);
                d += 1;
            }
        }
    }

    #[test]
    fn stream_clip_restricts_output() {
        let (_, mut seg) = segment(VX2, 1, 0);
        let lo = Integer::from(iz(VX2 + 10, -1));
        let hi = Integer::from(iz(VX2 + 25, 1));
        let mut buf = Vec::new();
        let written = seg.stream(&mut buf, Some((&lo, &hi))).unwrap();
        let text = String::from_utf8(buf).unwrap();
        for v in text.split_ascii_whitespace() {
            let v: u64 = v.parse().unwrap();
            assert!(Integer::from(v) >= lo && Integer::from(v) <= hi);
        }
        assert!(written < seg.p_count());
    }
}
