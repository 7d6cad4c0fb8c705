use std::io::{self, Read, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use constxml::{DEFAULT_MAX_DEPTH, EvalOptions, render_with_options};
use tracing::debug;

/// Reads a constxml program from standard input and writes the evaluated
/// configuration to standard output as XML.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Log filter directive, e.g. `debug` or `constxml=trace`. Logs go to stderr.
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Reject values whose arrays and dicts nest deeper than this.
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(&args.log_level)
        .with_writer(io::stderr)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let mut source = String::new();
    io::stdin()
        .read_to_string(&mut source)
        .context("failed to read standard input")?;
    debug!(bytes = source.len(), "read input");

    let options = EvalOptions::new().max_depth(args.max_depth);

    let xml = match render_with_options(&source, options) {
        Ok(xml) => xml,
        Err(e) => {
            debug!(%e, "render failed");
            anyhow::bail!(e.format_with_source(&source, Some("<stdin>")));
        }
    };

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(xml.as_bytes())
        .and_then(|()| stdout.flush())
        .context("failed to write standard output")?;
    Ok(())
}
