//! # Platform — Core Count, Cache Size, Entropy
//!
//! Best-effort system queries behind a stable interface: logical core count,
//! L2 cache size in bits (sysfs on Linux, conservative fallback elsewhere),
//! and entropy-backed seeding for the GMP random state.

use rand::RngCore;
use rug::rand::RandState;
use rug::Integer;
use std::time::{SystemTime, UNIX_EPOCH};

/// Default L2 size when detection fails: 256 KiB expressed in bits.
pub const L2_FALLBACK_BITS: u64 = 256 * 1024 * 8;

/// Number of online logical CPU cores (at least 1).
pub fn cpu_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// L2 cache size in bits, best effort.
///
/// Linux exposes the size under sysfs as a string like `"512K"` or `"1M"`;
/// anything unreadable falls back to [`L2_FALLBACK_BITS`].
pub fn l2_cache_size_bits() -> u64 {
    #[cfg(target_os = "linux")]
    {
        if let Ok(raw) = std::fs::read_to_string("/sys/devices/system/cpu/cpu0/cache/index2/size") {
            if let Some(bytes) = parse_cache_size(raw.trim()) {
                return bytes * 8;
            }
        }
    }
    L2_FALLBACK_BITS
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_cache_size(raw: &str) -> Option<u64> {
    let (digits, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(pos) => raw.split_at(pos),
        None => (raw, ""),
    };
    let value: u64 = digits.parse().ok()?;
    match unit.trim() {
        "" => Some(value),
        "K" | "k" | "KB" => Some(value * 1024),
        "M" | "MB" => Some(value * 1024 * 1024),
        _ => None,
    }
}

/// Whether isolated parallel workers are available on this platform.
///
/// Workers run as scoped native threads, each owning a deep context clone;
/// the bigint, digest, and entropy providers are all safe for that model,
/// so isolation is available everywhere threads are.
pub fn has_worker_isolation() -> bool {
    true
}

/// Seed a GMP random state from OS entropy, falling back to the wall clock
/// when the entropy source fails.
pub fn seed_randstate(state: &mut RandState) {
    let mut seed_bytes = [0u8; 32];
    if rand::rngs::OsRng.try_fill_bytes(&mut seed_bytes).is_ok() {
        let seed = Integer::from_digits(&seed_bytes, rug::integer::Order::Lsf);
        state.seed(&seed);
        return;
    }
    tracing::warn!("OS entropy unavailable; seeding random state from clock");
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    state.seed(&Integer::from(nanos));
}

/// Create a fresh, entropy-seeded GMP random state.
pub fn new_randstate() -> RandState<'static> {
    let mut state = RandState::new();
    seed_randstate(&mut state);
    state
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cores_at_least_one() {
        assert!(cpu_cores() >= 1);
    }

    #[test]
    fn l2_bits_positive() {
        assert!(l2_cache_size_bits() >= L2_FALLBACK_BITS / 8);
    }

    #[test]
    fn cache_size_strings() {
        assert_eq!(parse_cache_size("512K"), Some(512 * 1024));
        assert_eq!(parse_cache_size("1M"), Some(1024 * 1024));
        assert_eq!(parse_cache_size("4096"), Some(4096));
        assert_eq!(parse_cache_size("weird"), None);
    }

    #[test]
    fn seeded_states_diverge() {
        let mut a = new_randstate();
        let mut b = new_randstate();
        let x = Integer::from(Integer::random_bits(128, &mut a));
        let y = Integer::from(Integer::random_bits(128, &mut b));
        // Overwhelmingly likely distinct seeds.
        assert_ne!(x, y);
    }
}
