//! CLI binary for merging germline and somatic VCFs ahead of phasing

use clap::Parser;
use env_logger::Env;
use neoscan_rs::{
    merge::{adjust_tumor_column, combine_vcfs},
    utils::{validate_file_readable, Timer},
    NeoError, NeoResult,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "merge_vcf")]
#[command(about = "merge_vcf - Merge germline and somatic VCFs for phasing")]
#[command(long_about = "
Combines a germline and a somatic VCF into one sorted file suitable for
phasing with HapCUT2. Germline records are marked with a trailing '*' so
their origin survives the round trip through the phaser; the somatic header
is kept and every record is truncated to a single sample.

If the somatic caller put the tumor sample second (as some tumor/normal
pipelines do), pass --swap-tumor to swap the sample columns before merging.
")]
struct Args {
    /// Path to the germline VCF file
    #[arg(long, value_name = "FILE")]
    germline: PathBuf,

    /// Path to the somatic VCF file
    #[arg(long, value_name = "FILE")]
    somatic: PathBuf,

    /// Path to the merged output VCF file
    #[arg(long, value_name = "FILE")]
    output: PathBuf,

    /// Swap the somatic VCF's two sample columns so the tumor comes first
    #[arg(long)]
    swap_tumor: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Force overwrite of output file if it exists
    #[arg(short, long)]
    force: bool,
}

fn run() -> NeoResult<()> {
    let args = Args::parse();

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_secs()
        .init();

    log::info!("Germline VCF: {:?}", args.germline);
    log::info!("Somatic VCF: {:?}", args.somatic);
    log::info!("Output: {:?}", args.output);

    validate_file_readable(&args.germline)?;
    validate_file_readable(&args.somatic)?;

    if args.output.exists() && !args.force {
        return Err(NeoError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!(
                "Output file {:?} already exists. Use --force to overwrite.",
                args.output
            ),
        )));
    }

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let _timer = Timer::new("Merging VCFs");

    let somatic = if args.swap_tumor {
        let swapped = args.output.with_extension("swapped.vcf");
        log::info!("Swapping somatic sample columns into {:?}", swapped);
        adjust_tumor_column(&args.somatic, &swapped)?;
        swapped
    } else {
        args.somatic.clone()
    };

    combine_vcfs(&args.germline, &somatic, &args.output)?;

    if args.swap_tumor {
        if let Err(e) = std::fs::remove_file(&somatic) {
            log::warn!("Could not remove intermediate file {:?}: {}", somatic, e);
        }
    }

    log::info!("Merged VCF written to {:?}", args.output);
    Ok(())
}

/// Handle application errors and provide user-friendly messages
fn handle_error(error: NeoError) -> ! {
    match error {
        NeoError::FileNotFound(path) => {
            eprintln!("Error: File not found: {}", path);
            eprintln!("Please check that the file exists and is readable.");
        }
        NeoError::InvalidAnnotation(msg) => {
            eprintln!("Error: Malformed VCF record: {}", msg);
            eprintln!("Please check that both VCF files are properly formatted.");
        }
        NeoError::InvalidMutation(msg) => {
            eprintln!("Error: Invalid VCF record: {}", msg);
            eprintln!("Please check the position columns of both VCF files.");
        }
        NeoError::Io(ref e) => {
            eprintln!("Error: I/O error: {}", e);
            eprintln!("Please check file permissions and disk space.");
        }
        other => {
            eprintln!("Error: {}", other);
        }
    }
    std::process::exit(1);
}

fn main() {
    if let Err(e) = run() {
        handle_error(e);
    }
}
