//! # CLI — Command Dispatch and Execution
//!
//! Subcommands over the library entry points: range streaming/counting,
//! next-prime and primality queries, random-prime generation, the built-in
//! self-test and benchmark runners, and a platform report. Numeric options
//! accept every form understood by [`izprime::expr`].

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rug::Integer;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use izprime::int_array::U64Array;
use izprime::iz::{self, MR_ROUNDS};
use izprime::izm;
use izprime::{classic, expr, platform, search, siz, SieveError, SieveRange};

#[derive(Parser)]
#[command(
    name = "izprime",
    about = "Wheel-6 segmented prime sieves in the iZ index space",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stream every prime in a range as space-separated decimals
    #[command(name = "stream_primes", visible_alias = "sieve")]
    StreamPrimes {
        /// Inclusive range, e.g. "[0, 1e6]" or "10^12..10^12+1e6"
        #[arg(long)]
        range: String,
        /// Write primes to this file instead of stdout
        #[arg(long)]
        stream_to: Option<PathBuf>,
        /// Miller-Rabin rounds for large candidates (clamped to [5, 50])
        #[arg(long, default_value_t = MR_ROUNDS)]
        mr_rounds: u32,
        /// Print primes to stdout even when only counting
        #[arg(long)]
        print: bool,
    },
    /// Count the primes in a range across worker threads
    #[command(name = "count_primes", visible_alias = "count")]
    CountPrimes {
        /// Inclusive range, e.g. "[0, 1e9]"
        #[arg(long)]
        range: String,
        /// Worker count (0 = all cores)
        #[arg(long, default_value_t = 0)]
        cores_number: usize,
        /// Miller-Rabin rounds for large candidates (clamped to [5, 50])
        #[arg(long, default_value_t = MR_ROUNDS)]
        mr_rounds: u32,
    },
    /// Find the nearest prime beyond a base value
    #[command(name = "next_prime")]
    NextPrime {
        /// Base value (any numeric expression)
        #[arg(long)]
        n: String,
        /// Search backward instead of forward
        #[arg(long)]
        backward: bool,
    },
    /// Probabilistically test a single value for primality
    #[command(name = "is_prime")]
    IsPrime {
        /// Value to test (any numeric expression)
        #[arg(long)]
        n: String,
        /// Miller-Rabin rounds
        #[arg(long, default_value_t = MR_ROUNDS)]
        rounds: u32,
    },
    /// Generate a random probable prime of a given bit size
    #[command(name = "random_prime")]
    RandomPrime {
        /// Target size in bits
        #[arg(long)]
        bit_size: u32,
        /// Use the vertical search strategy instead of horizontal
        #[arg(long)]
        vy: bool,
        /// Worker count (0 = all cores)
        #[arg(long, default_value_t = 0)]
        cores_number: usize,
    },
    /// Run the built-in self checks
    #[command(name = "test")]
    Test {
        /// Upper bound for the cross-sieve consensus check
        #[arg(long, default_value_t = 1_000_000)]
        limit: u64,
    },
    /// Time the sieve algorithms
    #[command(name = "benchmark")]
    Benchmark {
        /// Algorithm name (SoE, SSoE, SoEu, SoS, SoA, SiZ, SiZm, SiZm_vy) or "all"
        #[arg(long, default_value = "all")]
        algo: String,
        /// Sieve upper bound
        #[arg(long, default_value_t = 10_000_000)]
        limit: u64,
        /// Repetitions per algorithm
        #[arg(long, default_value_t = 1)]
        repeat: u32,
        /// Append the report to this file
        #[arg(long)]
        save_results: Option<PathBuf>,
    },
    /// Report platform characteristics relevant to sieving
    #[command(name = "doctor")]
    Doctor,
    #[command(external_subcommand)]
    External(Vec<String>),
}

type SieveFn = fn(u64) -> Result<U64Array, SieveError>;

const ALGORITHMS: [(&str, SieveFn); 8] = [
    ("SoE", classic::soe),
    ("SSoE", classic::ssoe),
    ("SoEu", classic::soeu),
    ("SoS", classic::sos),
    ("SoA", classic::soa),
    ("SiZ", siz::siz),
    ("SiZm", siz::sizm),
    ("SiZm_vy", siz::sizm_vy),
];

/// Execute a parsed command; returns the process exit code.
pub fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::StreamPrimes {
            range,
            stream_to,
            mr_rounds,
            print,
        } => run_stream(&range, stream_to, mr_rounds, print),
        Commands::CountPrimes {
            range,
            cores_number,
            mr_rounds,
        } => run_count(&range, cores_number, mr_rounds),
        Commands::NextPrime { n, backward } => run_next_prime(&n, backward),
        Commands::IsPrime { n, rounds } => run_is_prime(&n, rounds),
        Commands::RandomPrime {
            bit_size,
            vy,
            cores_number,
        } => run_random_prime(bit_size, vy, cores_number),
        Commands::Test { limit } => run_self_test(limit),
        Commands::Benchmark {
            algo,
            limit,
            repeat,
            save_results,
        } => run_benchmark(&algo, limit, repeat, save_results),
        Commands::Doctor => run_doctor(),
        Commands::External(args) => {
            eprintln!("unknown command: {}", args.first().map_or("", |s| s));
            let mut help = <Cli as clap::CommandFactory>::command();
            help.print_help()?;
            Ok(1)
        }
    }
}

fn parse_range_input(range: &str, mr_rounds: u32) -> Result<SieveRange> {
    let (lower, upper) = expr::parse_range(range)?;
    let width = Integer::from(&upper - &lower) + 1u32;
    let width = width
        .to_u64()
        .ok_or_else(|| SieveError::InputOutOfDomain("range wider than 64 bits".into()))?;
    let mut input = SieveRange::new(lower, width);
    input.mr_rounds = mr_rounds;
    Ok(input)
}

fn run_stream(range: &str, stream_to: Option<PathBuf>, mr_rounds: u32, print: bool) -> Result<i32> {
    let mut input = parse_range_input(range, mr_rounds)?;
    input.output = stream_to;

    let started = Instant::now();
    let count = if input.output.is_some() {
        izprime::siz_stream(&input)?
    } else if print {
        let stdout = std::io::stdout();
        let mut out = std::io::BufWriter::new(stdout.lock());
        let count = izprime::range::siz_stream_to(&input, &mut out)?;
        out.flush()?;
        println!();
        count
    } else {
        izprime::siz_stream(&input)?
    };
    let elapsed = started.elapsed().as_secs_f64();

    eprintln!("Start:              {}", input.start);
    eprintln!("Range:              {}", input.range);
    eprintln!("Primes in range:    {count}");
    if let Some(path) = &input.output {
        eprintln!("Output file:        {}", path.display());
    }
    eprintln!("Execution time (s): {elapsed:.6}");
    Ok(0)
}

fn run_count(range: &str, cores_number: usize, mr_rounds: u32) -> Result<i32> {
    let input = parse_range_input(range, mr_rounds)?;
    let cores = if cores_number == 0 {
        platform::cpu_cores()
    } else {
        cores_number
    };

    let started = Instant::now();
    let count = izprime::siz_count(&input, cores)?;
    let elapsed = started.elapsed().as_secs_f64();

    println!("{count}");
    eprintln!("Start:              {}", input.start);
    eprintln!("Range:              {}", input.range);
    eprintln!("Cores:              {cores}");
    eprintln!("Execution time (s): {elapsed:.6}");
    Ok(0)
}

fn run_next_prime(n: &str, backward: bool) -> Result<i32> {
    let base = expr::parse_numeric(n)?;
    let found = search::next_prime(&base, !backward)?;
    match found {
        Some(prime) => {
            println!("{prime}");
            Ok(0)
        }
        None => {
            eprintln!("no prime {} {}", if backward { "below" } else { "above" }, base);
            Ok(1)
        }
    }
}

fn run_is_prime(n: &str, rounds: u32) -> Result<i32> {
    let value = expr::parse_numeric(n)?;
    let verdict = match value.is_probably_prime(rounds) {
        rug::integer::IsPrime::Yes => "prime",
        rug::integer::IsPrime::Probably => "probably prime",
        rug::integer::IsPrime::No => "composite",
    };
    println!("{value} is {verdict}");
    Ok(0)
}

fn run_random_prime(bit_size: u32, vy: bool, cores_number: usize) -> Result<i32> {
    let cores = if cores_number == 0 {
        platform::cpu_cores()
    } else {
        cores_number
    };
    let started = Instant::now();
    let prime = if vy {
        search::vy_random_prime(bit_size, cores)?
    } else {
        search::vx_random_prime(bit_size, cores)?
    };
    let elapsed = started.elapsed().as_secs_f64();
    println!("{prime}");
    eprintln!(
        "Strategy:           {}",
        if vy { "vertical (vy)" } else { "horizontal (vx)" }
    );
    eprintln!("Bits:               {}", prime.significant_bits());
    eprintln!("Execution time (s): {elapsed:.6}");
    Ok(0)
}

fn run_self_test(limit: u64) -> Result<i32> {
    let mut failures = 0u32;
    let mut check = |name: &str, ok: bool| {
        println!("[{}] {}", if ok { "PASS" } else { "FAIL" }, name);
        if !ok {
            failures += 1;
        }
    };

    // Base construction: bits must match coprimality with the window width.
    let base_ok = izm::construct_vx_base(iz::VX4).map(|(x5, x7)| {
        (1..=iz::VX4).all(|x| {
            x5.get(x) == (iz::gcd(iz::iz(x, -1), iz::VX4) == 1)
                && x7.get(x) == (iz::gcd(iz::iz(x, 1), iz::VX4) == 1)
        })
    });
    check("vx base coprimality", base_ok.unwrap_or(false));

    // Solver targeting: every solved hit must be divisible by its prime.
    let solver_ok = [29u64, 31, 37, 41, 53, 101, 4999].iter().all(|&p| {
        [-1, 1].iter().all(|&m_id| {
            let x0 = iz::solve_x0(m_id, p, iz::VX4, 10);
            iz::iz(10 * iz::VX4 + x0, m_id) % p == 0
        })
    });
    check("horizontal solver targeting", solver_ok);

    // Cross-sieve consensus: identical digests across every variant.
    let limit = limit.clamp(1_000, 10_000_000);
    let mut reference = siz::siz(limit)?;
    reference.compute_hash();
    let reference_digest = *reference.digest();
    for (name, sieve) in ALGORITHMS {
        let mut primes = sieve(limit).with_context(|| format!("{name} failed"))?;
        if !primes.is_ordered() {
            primes.sort();
        }
        primes.compute_hash();
        check(
            &format!("{name} consensus at {limit}"),
            *primes.digest() == reference_digest,
        );
    }

    if failures > 0 {
        bail!("{failures} self test(s) failed");
    }
    println!("All self tests passed.");
    Ok(0)
}

fn run_benchmark(algo: &str, limit: u64, repeat: u32, save_results: Option<PathBuf>) -> Result<i32> {
    let selected: Vec<(&str, SieveFn)> = if algo.eq_ignore_ascii_case("all") {
        ALGORITHMS.to_vec()
    } else {
        let found = ALGORITHMS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(algo))
            .copied();
        match found {
            Some(entry) => vec![entry],
            None => {
                return Err(SieveError::InputOutOfDomain(format!(
                    "unknown algorithm {algo:?}"
                ))
                .into())
            }
        }
    };

    let mut report = String::new();
    report.push_str(&format!("limit={limit} repeat={repeat}\n"));
    println!("{:<10} {:>12} {:>12}", "algo", "primes", "best (s)");
    for (name, sieve) in selected {
        let mut best = f64::INFINITY;
        let mut count = 0;
        for _ in 0..repeat.max(1) {
            let started = Instant::now();
            let primes = sieve(limit).with_context(|| format!("{name} failed"))?;
            best = best.min(started.elapsed().as_secs_f64());
            count = primes.count();
        }
        println!("{name:<10} {count:>12} {best:>12.6}");
        report.push_str(&format!("{name} {count} {best:.6}\n"));
    }

    if let Some(path) = save_results {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        file.write_all(report.as_bytes())?;
        eprintln!("Results appended to {}", path.display());
    }
    Ok(0)
}

fn run_doctor() -> Result<i32> {
    println!("Logical cores:      {}", platform::cpu_cores());
    println!("L2 cache (bits):    {}", platform::l2_cache_size_bits());
    println!(
        "Worker isolation:   {}",
        if platform::has_worker_isolation() {
            "threads (per-worker context clones)"
        } else {
            "unavailable (single worker)"
        }
    );
    println!("L2-chosen vx:       {}", iz::compute_l2_vx(1_000_000_000));
    println!(
        "VX table:           {} {} {} {} {} {} {}",
        iz::VX2,
        iz::VX3,
        iz::VX4,
        iz::VX5,
        iz::VX6,
        iz::VX7,
        iz::VX8
    );
    Ok(0)
}
