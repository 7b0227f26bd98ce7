// src/main.rs

use clap::Parser;
use std::io;
use std::process;
use thinshim::{Config, bootstrap};
use tracing::error;

fn main() {
    // Diagnostics go to stderr: stdout is a protocol channel and every
    // byte on it must be either framing or payload output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let config = Config::parse();

    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let code = match bootstrap::run(&config, &mut stdout, &mut stderr) {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => {
            error!("{err}");
            err.exit_code()
        }
    };
    process::exit(code);
}
