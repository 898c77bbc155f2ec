//! CLI binary for augmenting HapCUT2 output with unphased VCF variants

use clap::Parser;
use env_logger::Env;
use neoscan_rs::{
    merge::prep_hapcut_output,
    utils::{validate_file_readable, Timer},
    NeoError, NeoResult,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "prep_hapcut")]
#[command(about = "prep_hapcut - Add unphased VCF variants to HapCUT2 output")]
#[command(long_about = "
HapCUT2 only emits variants it managed to phase. prep_hapcut compares the
phasing output against the merged VCF it was produced from and appends every
variant HapCUT2 left out as its own single-variant block, so downstream
neoepitope calling sees all calls.

The result is the haplotype file neoscan expects via --haplotypes.
")]
struct Args {
    /// Path to the HapCUT2 output file
    #[arg(long, value_name = "FILE")]
    hapcut2_output: PathBuf,

    /// Path to the merged VCF the phasing was run on
    #[arg(long, value_name = "FILE")]
    vcf: PathBuf,

    /// Path to the augmented output file
    #[arg(long, value_name = "FILE")]
    output: PathBuf,

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

    log::info!("HapCUT2 output: {:?}", args.hapcut2_output);
    log::info!("Merged VCF: {:?}", args.vcf);
    log::info!("Output: {:?}", args.output);

    validate_file_readable(&args.hapcut2_output)?;
    validate_file_readable(&args.vcf)?;

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

    let _timer = Timer::new("Augmenting HapCUT2 output");
    prep_hapcut_output(&args.hapcut2_output, &args.vcf, &args.output)?;

    log::info!("Augmented haplotypes written to {:?}", args.output);
    Ok(())
}

/// Handle application errors and provide user-friendly messages
fn handle_error(error: NeoError) -> ! {
    match error {
        NeoError::FileNotFound(path) => {
            eprintln!("Error: File not found: {}", path);
            eprintln!("Please check that the file exists and is readable.");
        }
        NeoError::InvalidMutation(msg) => {
            eprintln!("Error: Invalid mutation record: {}", msg);
            eprintln!("Please check that the HapCUT2 output is unmodified.");
        }
        NeoError::InvalidAnnotation(msg) => {
            eprintln!("Error: Malformed VCF record: {}", msg);
            eprintln!("Please check that the merged VCF has a sample column.");
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
