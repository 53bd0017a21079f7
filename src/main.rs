//! CLI entry point for the CEEPUR voter registry scraper.

use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, info, warn};

use ceepur_scraper::{ConfigError, RunOutcome, ScrapeError, Scraper, SinkError, columns};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (warn)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let debug_mode = args.debug;
    let save_descriptions = args.save_descriptions;
    let config = match args.into_config() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("\nERROR: {error}\n");
            return ExitCode::from(1);
        }
    };
    let output = config.output.clone();

    let scraper = match Scraper::new(config) {
        Ok(scraper) => scraper,
        Err(error) => {
            print_startup_guidance(&error, &output.display().to_string(), save_descriptions);
            return ExitCode::from(1);
        }
    };

    // Ctrl-C is the operator interrupt; registering the handler replaces the
    // default terminate-on-SIGINT behavior for the rest of the process.
    let interrupt = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {}
            Err(error) => {
                warn!(%error, "failed to listen for Ctrl-C; interrupt disabled");
                std::future::pending::<()>().await;
            }
        }
    };

    match scraper.run(interrupt).await {
        Ok(report) => {
            info!(
                attempted = report.attempted,
                completed = report.completed,
                persisted = report.persisted,
                "scrape finished"
            );
            if report.outcome == RunOutcome::Interrupted {
                eprintln!(
                    "\nWARNING: The scrape was interrupted before it finished.\n\n\
                     TIPS:\n  \
                     * Re-run the scraper with -c/--continue-previous-scrape to attempt to resume the scrape.\n"
                );
            }
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!(
                "\nWARNING: The scrape encountered an error before it finished.\n\n\
                 TIPS:\n  \
                 * Re-run the scraper with -c/--continue-previous-scrape to attempt to resume the scrape.\n  \
                 * Re-run the scraper with -d/--debug to see the full error message.\n"
            );
            if debug_mode {
                // anyhow renders the full source chain in its Debug output.
                eprintln!("{:?}", anyhow::Error::from(error));
            }
            ExitCode::from(1)
        }
    }
}

/// Prints remediation guidance for startup failures, mirroring the exact
/// operator workflow for each case.
fn print_startup_guidance(error: &ScrapeError, output: &str, save_descriptions: bool) {
    match error {
        ScrapeError::Config(ConfigError::OutputExists { .. }) => {
            eprintln!(
                "\nERROR: There already exists a file named {output:?}.\n\n\
                 If you intend to continue a previous scrape that was interrupted, use the -c/--continue-previous-scrape flag.\n\
                 Otherwise, either delete the existing file or use the -o/--output flag to specify a new output file.\n"
            );
        }
        ScrapeError::Sink(SinkError::SchemaMismatch { .. }) => {
            eprintln!(
                "\nERROR: Cannot continue the scrape because the output file {output:?} has different columns than expected.\n\
                 Expected columns: {:?}\n\
                 Please delete the file and try again.\n",
                columns(save_descriptions)
            );
        }
        other => {
            eprintln!("\nERROR: {other}\n");
        }
    }
}
