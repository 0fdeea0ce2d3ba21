use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use packshot::{collage, config, individual};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "packshot")]
#[command(about = "Batch product-photo normalizer and grid collage builder")]
#[command(long_about = "\
Batch product-photo normalizer and grid collage builder

Point it at a directory of product shots and it runs every image through a
fixed pipeline: downscale, whiten against the darkest border pixel, strip the
white background, crop to content, pad, adjust tone, and shape the output
canvas. Each step is switched on and off from a JSON settings file.

Two run modes share that pipeline:

  individual   one output file per input, optionally renamed to an article
               number (ART.jpg, ART_1.jpg, ...)
  collage      every image placed on a single near-square grid sheet

Run 'packshot gen-config' to print a stock settings.json with every option
at its default.")]
#[command(version)]
struct Cli {
    /// Settings file; missing file means all defaults
    #[arg(long, default_value = "settings.json", global = true)]
    settings: PathBuf,

    /// Input directory, overriding the settings file
    #[arg(long, global = true)]
    input_dir: Option<PathBuf>,

    /// Output directory, overriding the settings file (individual mode)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// More log detail (-v info is the default, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process every image into one output file per input
    Individual,
    /// Assemble every image into a single grid collage
    Collage,
    /// Print a stock settings.json with all options at their defaults
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if matches!(cli.command, Command::GenConfig) {
        println!("{}", config::stock_config_json());
        return Ok(());
    }

    let mut config = config::Config::load(&cli.settings)?;
    if let Some(dir) = cli.input_dir {
        config.paths.input_dir = dir;
    }
    if let Some(dir) = cli.output_dir {
        config.paths.output_dir = dir;
    }

    let started = Instant::now();
    match cli.command {
        Command::Individual => {
            let summary = individual::run(&config)?;
            println!(
                "==> {} processed, {} skipped, {} errored in {:.1?}",
                summary.processed,
                summary.skipped,
                summary.errored,
                started.elapsed()
            );
            if summary.rename.renamed > 0 || summary.rename.failed > 0 {
                println!(
                    "==> renamed {} outputs to article '{}' ({} failed)",
                    summary.rename.renamed,
                    config.individual_mode.article,
                    summary.rename.failed
                );
            }
        }
        Command::Collage => {
            let summary = collage::run(&config)?;
            println!(
                "==> {} images on a {}x{} grid -> {} ({} bytes) in {:.1?}",
                summary.used,
                summary.cols,
                summary.rows,
                summary.output.display(),
                summary.bytes,
                started.elapsed()
            );
            if summary.skipped > 0 {
                println!("==> {} unreadable sources excluded", summary.skipped);
            }
        }
        Command::GenConfig => unreachable!("handled above"),
    }

    Ok(())
}

/// RUST_LOG wins when set; otherwise verbosity flags pick the level.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
