use apogee_optimizer::{ApogeeOptimizer, OptimizeError, Settings, SolidRocket};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;
use tracing_subscriber::filter::EnvFilter;

#[derive(Parser)]
#[command(name = "apogee")]
#[command(about = "Search solid rocket designs for the highest simulated apogee")]
struct Args {
    /// JSON settings file; missing fields use the standard run
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Disable per-iteration progress and the summary table
    #[arg(short, long)]
    quiet: bool,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Optimize(#[from] OptimizeError),

    #[error("Failed to serialize outcome: {0}")]
    Output(#[from] serde_json::Error),
}

/// `RUST_LOG` when it parses, info otherwise
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn run(args: &Args) -> Result<(), CliError> {
    let mut settings = match &args.settings {
        Some(path) => Settings::load(path).map_err(OptimizeError::from)?,
        None => Settings::default(),
    };
    if args.quiet || args.json {
        settings.options.disp = false;
    }

    let optimizer = ApogeeOptimizer::from_settings(SolidRocket::new(), settings)?;
    let outcome = optimizer.optimize()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("Optimized parameters: {}", outcome.parameters);
        println!("Maximum height: {:.2} m", outcome.h_max);
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
