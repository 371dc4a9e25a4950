//! # Range Driver — Stream and Count over an Inclusive Interval
//!
//! Maps a numeric interval `[Zs, Ze]` (with `Ze = Zs + range − 1`) into
//! iZ/VX coordinates and drives segment iteration:
//!
//! - values up to `iZ(vx, +1)` live in segment 0, which is handled by a
//!   [`crate::siz::sizm`] run filtered to the interval (exact, no endpoint
//!   corrections);
//! - every later value belongs to the segment `(x − 1) / vx` at a local
//!   offset in `[1, vx]`, processed as a [`VxSegment`].
//!
//! Because `Xs = ⌊Zs/6⌋` covers both lines of its x-column, a boundary
//! column can carry a candidate just outside the interval. Counting applies
//! endpoint corrections once, in the parent, before dispatch:
//! a probable-prime boundary candidate below `Zs` (or above `Ze`) is
//! subtracted from the total. Streaming instead clips emission on the two
//! boundary segments.
//!
//! `siz_count` partitions segments across workers — scoped threads, each
//! owning a deep [`IzmContext`] clone — and aggregates by summation, so the
//! result is independent of worker count. Any worker failure coerces the
//! total to 0 after logging.

use rug::Integer;
use std::io::Write;
use std::path::PathBuf;

use crate::iz::{self, VX6};
use crate::izm::IzmContext;
use crate::segment::VxSegment;
use crate::{siz, SieveError};

/// Bounds for Miller–Rabin rounds in range mode.
const MR_ROUNDS_MIN: u32 = 5;
const MR_ROUNDS_MAX: u32 = 50;

/// Input parameters for range sieving and counting.
///
/// The interval is `[start, start + range − 1]`, inclusive on both ends.
#[derive(Clone, Debug)]
pub struct SieveRange {
    /// Inclusive lower bound.
    pub start: Integer,
    /// Number of integers covered (must be positive).
    pub range: u64,
    /// Miller–Rabin rounds for large candidates; clamped to [5, 50].
    pub mr_rounds: u32,
    /// Output path for streamed primes (`None` disables file output).
    pub output: Option<PathBuf>,
}

impl SieveRange {
    /// Convenience constructor with the default round count.
    pub fn new(start: Integer, range: u64) -> Self {
        SieveRange {
            start,
            range,
            mr_rounds: iz::MR_ROUNDS,
            output: None,
        }
    }
}

/// Precomputed iZ/VX coordinates for an inclusive interval.
///
/// `xs`/`xe` are snapped inward so that every covered x-column holds at
/// least one candidate inside the interval; at most one candidate per
/// boundary column (the `−1` line at `xs`, the `+1` line at `xe`) can then
/// fall outside it.
#[derive(Debug)]
pub struct RangeInfo {
    pub vx: u64,
    pub zs: Integer,
    pub ze: Integer,
    pub xs: Integer,
    pub xe: Integer,
    pub ys: Integer,
    pub ye: Integer,
    /// `ye − ys`; the span must fit a signed 32-bit integer.
    pub y_range: i32,
}

impl RangeInfo {
    /// Map an interval onto window coordinates for width `vx`.
    pub fn new(start: &Integer, range: u64, vx: u64) -> Result<Self, SieveError> {
        if range == 0 {
            return Err(SieveError::InputOutOfDomain("range must be positive".into()));
        }
        if *start < 0u32 {
            return Err(SieveError::InputOutOfDomain(
                "range start must be non-negative".into(),
            ));
        }
        let zs = start.clone();
        let ze = Integer::from(&zs + range) - 1u32;

        let mut xs = Integer::from(&zs / 6u32);
        if Integer::from(&zs % 6u32) > 1u32 {
            xs += 1;
        }
        let mut xe = Integer::from(&ze / 6u32);
        if Integer::from(&ze % 6u32) == 5u32 {
            xe += 1;
        }

        let ys = Integer::from(&xs / vx);
        let ye = Integer::from(&xe / vx);
        let y_range = Integer::from(&ye - &ys)
            .to_i32()
            .ok_or_else(|| SieveError::InputOutOfDomain("y span exceeds 32 bits".into()))?;

        Ok(RangeInfo {
            vx,
            zs,
            ze,
            xs,
            xe,
            ys,
            ye,
            y_range,
        })
    }

    /// Largest value belonging to segment 0 for this width.
    fn horizon(&self) -> u64 {
        6 * self.vx + 1
    }
}

/// Inclusive segment/local bounds for one VxSegment worth of work.
#[derive(Clone, Debug)]
struct SegmentJob {
    y: Integer,
    start_x: u64,
    end_x: u64,
    first: bool,
    last: bool,
}

/// Lay out the VxSegment jobs for the part of the interval above segment 0.
///
/// A global coordinate x ≥ 1 belongs to segment `(x − 1) / vx` at local
/// offset `x − y·vx ∈ [1, vx]`.
fn segment_jobs(info: &RangeInfo) -> Vec<SegmentJob> {
    let vx = info.vx;
    let xs_eff = if info.xs <= vx {
        Integer::from(vx + 1)
    } else {
        info.xs.clone()
    };
    if info.xe < xs_eff {
        return Vec::new();
    }

    let y_lo = Integer::from(&xs_eff - 1u32) / vx;
    let y_hi = Integer::from(&info.xe - 1u32) / vx;
    let span = Integer::from(&y_hi - &y_lo).to_u64().expect("span bounded") + 1;

    let mut jobs = Vec::with_capacity(span as usize);
    let mut y = y_lo.clone();
    for i in 0..span {
        let y_vx = Integer::from(&y * vx);
        let start_x = if i == 0 {
            Integer::from(&xs_eff - &y_vx).to_u64().expect("local fits")
        } else {
            1
        };
        let end_x = if i + 1 == span {
            Integer::from(&info.xe - &y_vx).to_u64().expect("local fits")
        } else {
            vx
        };
        jobs.push(SegmentJob {
            y: y.clone(),
            start_x,
            end_x,
            first: i == 0,
            last: i + 1 == span,
        });
        y += 1;
    }
    jobs
}

/// Primes of segment 0 that fall inside the interval, via a filtered
/// `SiZm` run. Returns the primes so stream/count can each consume them.
fn segment_zero_primes(info: &RangeInfo) -> Result<Vec<u64>, SieveError> {
    let n0 = if info.ze > info.horizon() {
        info.horizon()
    } else {
        info.ze.to_u64().expect("bounded by horizon")
    };
    let primes = siz::sizm(n0.max(11))?;
    let zs = &info.zs;
    let ze = &info.ze;
    Ok(primes
        .as_slice()
        .iter()
        .copied()
        .filter(|&p| *zs <= p && *ze >= p)
        .collect())
}

/// Stream every prime in the interval to `out` as space-separated decimal
/// text, returning the count. The window width is fixed at the largest
/// tabulated product.
pub fn siz_stream_to<W: Write>(input: &SieveRange, out: &mut W) -> Result<u64, SieveError> {
    let mr_rounds = input.mr_rounds.clamp(MR_ROUNDS_MIN, MR_ROUNDS_MAX);
    let info = RangeInfo::new(&input.start, input.range, VX6)?;
    let mut total = 0u64;

    if info.zs <= info.horizon() {
        for p in segment_zero_primes(&info)? {
            write!(out, "{} ", p)?;
            total += 1;
        }
    }

    let jobs = segment_jobs(&info);
    if jobs.is_empty() {
        return Ok(total);
    }
    let izm = IzmContext::new(info.vx)?;
    for job in jobs {
        let mut seg = VxSegment::new(&izm, job.start_x, job.end_x, job.y, mr_rounds)?;
        let clip = if job.first || job.last {
            Some((&info.zs, &info.ze))
        } else {
            None
        };
        total += seg.stream(out, clip)?;
    }
    Ok(total)
}

/// Stream primes to the configured output file (or count silently when no
/// path is set). See [`siz_stream_to`].
pub fn siz_stream(input: &SieveRange) -> Result<u64, SieveError> {
    match &input.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::File::create(path)?;
            let mut out = std::io::BufWriter::new(file);
            let total = siz_stream_to(input, &mut out)?;
            out.flush().map_err(SieveError::from)?;
            Ok(total)
        }
        None => siz_stream_to(input, &mut std::io::sink()),
    }
}

/// Endpoint corrections for boundary columns processed as VxSegments: a
/// probable-prime candidate on the `−1` line below `Zs`, or on the `+1`
/// line above `Ze`, will be counted by its segment and must be subtracted
/// once by the parent.
fn endpoint_corrections(info: &RangeInfo, mr_rounds: u32) -> u64 {
    let mut correction = 0u64;
    if info.zs > info.horizon() {
        let low = iz::iz_mpz(&info.xs, -1);
        if low < info.zs && iz::check_primality(&low, mr_rounds) {
            correction += 1;
        }
    }
    if info.ze > info.horizon() {
        let high = iz::iz_mpz(&info.xe, 1);
        if high > info.ze && iz::check_primality(&high, mr_rounds) {
            correction += 1;
        }
    }
    correction
}

fn run_jobs(izm: &IzmContext, jobs: &[SegmentJob], mr_rounds: u32) -> Result<u64, SieveError> {
    let mut sum = 0u64;
    for job in jobs {
        let mut seg = VxSegment::new(izm, job.start_x, job.end_x, job.y.clone(), mr_rounds)?;
        seg.full_sieve(false);
        sum += seg.p_count();
    }
    Ok(sum)
}

/// Count the primes in the interval, partitioning segments across up to
/// `cores` workers. The result is independent of the worker count; any
/// worker failure is logged and the total reported as 0.
pub fn siz_count(input: &SieveRange, cores: usize) -> Result<u64, SieveError> {
    let mr_rounds = input.mr_rounds.clamp(MR_ROUNDS_MIN, MR_ROUNDS_MAX);
    let vx = iz::compute_l2_vx(1_000_000_000);
    let info = RangeInfo::new(&input.start, input.range, vx)?;

    let mut total = 0u64;
    if info.zs <= info.horizon() {
        total += segment_zero_primes(&info)?.len() as u64;
    }

    let jobs = segment_jobs(&info);
    if jobs.is_empty() {
        return Ok(total);
    }
    let correction = endpoint_corrections(&info, mr_rounds);
    let izm = IzmContext::new(vx)?;

    let workers = cores.max(1).min(jobs.len());
    if workers <= 1 {
        if cores > 1 {
            tracing::info!(segments = jobs.len(), "single worker covers all segments");
        }
        total += run_jobs(&izm, &jobs, mr_rounds)?;
        return Ok(total - correction);
    }

    // Contiguous blocks: ⌊total/workers⌋ each, the remainder spread over
    // the first workers.
    let base = jobs.len() / workers;
    let remainder = jobs.len() % workers;
    let mut blocks = Vec::with_capacity(workers);
    let mut offset = 0;
    for w in 0..workers {
        let local = base + usize::from(w < remainder);
        blocks.push(&jobs[offset..offset + local]);
        offset += local;
    }

    let results: Vec<Result<u64, SieveError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = blocks
            .into_iter()
            .map(|block| {
                let worker_izm = izm.clone();
                scope.spawn(move || run_jobs(&worker_izm, block, mr_rounds))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(result) => result,
                Err(_) => Err(SieveError::Worker("counting worker panicked".into())),
            })
            .collect()
    });

    let mut sum = 0u64;
    for result in results {
        match result {
            Ok(count) => sum += count,
            Err(err) => {
                tracing::warn!(error = %err, "worker failed; reporting count as 0");
                return Ok(0);
            }
        }
    }
    Ok(total + sum - correction)
}
