//! Cross-sieve consensus tests.
//!
//! Every sieve variant — the five classic baselines and the three iZ-space
//! sieves — must produce the identical prime set for the same bound, byte
//! for byte: the SHA-256 digest over the (sorted) result array is compared
//! across all variants.
//!
//! # How to run
//!
//! ```bash
//! cargo test --test sieve_consensus
//!
//! # Include the large (10^9-scale) scenarios:
//! cargo test --release --test sieve_consensus -- --ignored
//! ```

use izprime::int_array::U64Array;
use izprime::{classic, siz, SieveError};

type SieveFn = fn(u64) -> Result<U64Array, SieveError>;

const ALL_SIEVES: [(&str, SieveFn); 8] = [
    ("SoE", classic::soe),
    ("SSoE", classic::ssoe),
    ("SoEu", classic::soeu),
    ("SoS", classic::sos),
    ("SoA", classic::soa),
    ("SiZ", siz::siz),
    ("SiZm", siz::sizm),
    ("SiZm_vy", siz::sizm_vy),
];

fn digest_of(name: &str, sieve: SieveFn, n: u64) -> [u8; 32] {
    let mut primes = sieve(n).unwrap_or_else(|e| panic!("{name} failed at {n}: {e}"));
    if !primes.is_ordered() {
        primes.sort();
    }
    primes.compute_hash();
    *primes.digest()
}

fn assert_consensus(n: u64) {
    let reference = digest_of("SiZ", siz::siz, n);
    for (name, sieve) in ALL_SIEVES {
        assert_eq!(
            digest_of(name, sieve, n),
            reference,
            "{name} disagrees with SiZ at n={n}"
        );
    }
}

#[test]
fn consensus_at_thousand() {
    assert_consensus(1_000);
}

#[test]
fn consensus_at_million() {
    assert_consensus(1_000_000);
}

#[test]
fn consensus_at_awkward_bounds() {
    // Residues 0..5 mod 6 around a prime-rich area, exercising the
    // trailing-trim paths of the iZ sieves.
    for n in 999_995..=1_000_004 {
        let a = siz::siz(n).unwrap();
        let b = siz::sizm(n).unwrap();
        let mut c = siz::sizm_vy(n).unwrap();
        c.sort();
        assert_eq!(a.as_slice(), b.as_slice(), "SiZm at n={n}");
        assert_eq!(a.as_slice(), c.as_slice(), "SiZm_vy at n={n}");
    }
}

#[test]
fn sizm_ten_million_known_count() {
    let primes = siz::sizm(10_000_000).unwrap();
    assert_eq!(primes.count(), 664_579);
    assert_eq!(primes.last(), Some(9_999_991));

    let mut vertical = siz::sizm_vy(10_000_000).unwrap();
    vertical.sort();
    assert_eq!(primes.as_slice(), vertical.as_slice());
}

#[test]
#[ignore = "large: run with --release"]
fn consensus_at_billion() {
    let a = digest_of("SiZm", siz::sizm, 1_000_000_000);
    let b = digest_of("SiZm_vy", siz::sizm_vy, 1_000_000_000);
    let c = digest_of("SSoE", classic::ssoe, 1_000_000_000);
    assert_eq!(a, b);
    assert_eq!(a, c);
}
