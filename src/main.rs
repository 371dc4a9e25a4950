//! # Main — CLI Entry Point
//!
//! Thin process entrypoint: installs the allocator and the tracing
//! subscriber, parses arguments, and delegates to the execution functions
//! in [`cli`]. Exit codes: 0 on success, 2 for invalid arguments or
//! malformed expressions, 1 for runtime failures.

mod cli;

use clap::Parser;
use izprime::SieveError;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Cli::parse();
    match cli::run(args) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            let invalid_input = err.downcast_ref::<SieveError>().is_some_and(|e| {
                matches!(
                    e,
                    SieveError::Parse(_) | SieveError::InputOutOfDomain(_)
                )
            });
            std::process::exit(if invalid_input { 2 } else { 1 });
        }
    }
}
