//! Main CLI binary for neoscan - enumerates neoepitopes from phased mutations

use clap::Parser;
use env_logger::Env;
use neoscan_rs::{
    fasta::read_fasta,
    gtf::gtf_to_cds,
    hapcut::{get_vaf_pos, process_haplotypes},
    interval::TranscriptIndex,
    peptides::{call_neoepitopes, write_neoepitopes},
    utils::{get_num_cpus, validate_file_readable, Timer},
    CallConfig, NeoError, NeoResult, StartPolicy,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "neoscan")]
#[command(about = "neoscan - Neoepitope enumeration from phased tumor mutations")]
#[command(long_about = "
neoscan enumerates candidate tumor-specific peptides (neoepitopes) by applying
phased germline and somatic mutations to transcript coding sequences,
translating both copies of each affected transcript and k-merizing the
results.

The tool expects:
1. A GTF annotation with CDS and stop_codon features
2. The reference genome as FASTA (plain or gzipped)
3. HapCUT2 output augmented with unphased variants (see prep_hapcut)

Each emitted peptide window contains at least one somatic mutation and is
reported with the mutations that explain it, one row per peptide and
mutation, as tab-separated text.

To build the haplotype input from a germline and a somatic VCF, run
merge_vcf, phase with HapCUT2, then run prep_hapcut on the result.
")]
struct Args {
    /// Path to the GTF annotation file
    #[arg(long, value_name = "FILE")]
    gtf: PathBuf,

    /// Path to the reference genome FASTA file
    #[arg(long, value_name = "FILE")]
    genome: PathBuf,

    /// Path to the augmented HapCUT2 haplotype file
    #[arg(long, value_name = "FILE")]
    haplotypes: PathBuf,

    /// Merged VCF used for phasing, for VAF extraction
    #[arg(long, value_name = "FILE")]
    vcf: Option<PathBuf>,

    /// Path to the output TSV file
    #[arg(long, value_name = "FILE")]
    output: PathBuf,

    /// Comma-separated peptide size or size range, e.g. 9 or 8,11
    #[arg(long, default_value = "8,11")]
    kmer_size: String,

    /// Start codon handling: novel, all, none, or reference
    #[arg(long, default_value = "novel")]
    upstream_atgs: String,

    /// Report co-occurring germline mutations in peptide metadata
    #[arg(long)]
    germline_metadata: bool,

    /// Reject haplotypes containing overlapping edits
    #[arg(long)]
    strict_haplotypes: bool,

    /// Number of processes to use for parallel processing
    #[arg(long, default_value_t = get_num_cpus())]
    num_processes: usize,

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

/// Parse a peptide size argument: a single size or a min,max pair.
fn parse_kmer_sizes(arg: &str) -> NeoResult<(usize, usize)> {
    let sizes: Result<Vec<usize>, _> = arg.split(',').map(|s| s.trim().parse()).collect();
    let mut sizes = sizes
        .map_err(|_| NeoError::InvalidConfig(format!("invalid kmer-size argument: {}", arg)))?;
    sizes.sort_unstable();

    match sizes.as_slice() {
        [size] => Ok((*size, *size)),
        [min, .., max] => Ok((*min, *max)),
        [] => Err(NeoError::InvalidConfig(
            "kmer-size argument is empty".to_string(),
        )),
    }
}

fn run() -> NeoResult<()> {
    let args = Args::parse();

    // Initialize logging
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

    log::info!("Starting neoscan neoepitope enumeration");
    log::info!("GTF annotation: {:?}", args.gtf);
    log::info!("Reference genome: {:?}", args.genome);
    log::info!("Haplotypes: {:?}", args.haplotypes);
    log::info!("Output: {:?}", args.output);
    log::info!("Number of processes: {}", args.num_processes);

    // Validate input files
    validate_file_readable(&args.gtf)?;
    validate_file_readable(&args.genome)?;
    validate_file_readable(&args.haplotypes)?;
    if let Some(vcf) = &args.vcf {
        validate_file_readable(vcf)?;
    }

    // Check if output file exists and handle accordingly
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

    let (min_size, max_size) = parse_kmer_sizes(&args.kmer_size)?;
    let policy: StartPolicy = args.upstream_atgs.parse()?;
    let config = CallConfig {
        min_size,
        max_size,
        policy,
        include_somatic: true,
        include_germline: args.germline_metadata,
        strict_haplotypes: args.strict_haplotypes,
    };
    log::info!(
        "Configuration: sizes {}..={}, start policy {}, germline metadata {}",
        config.min_size,
        config.max_size,
        config.policy,
        config.include_germline
    );

    // Step 1: Read annotation and build the transcript index
    let cds = {
        let _timer = Timer::new("Reading GTF annotation");
        gtf_to_cds(&args.gtf)?
    };
    log::info!("Read CDS segments for {} transcripts", cds.len());

    let index = TranscriptIndex::build(&cds);
    log::info!("Indexed {} chromosomes", index.num_chromosomes());

    // Step 2: Load the reference genome
    let genome = {
        let _timer = Timer::new("Reading reference genome");
        read_fasta(&args.genome)?
    };
    log::info!("Read {} reference sequences", genome.len());

    // Step 3: Stream haplotype blocks and attribute mutations
    let vaf_pos = match &args.vcf {
        Some(vcf) => get_vaf_pos(vcf)?,
        None => None,
    };
    if vaf_pos.is_none() {
        log::info!("No FREQ field available; VAFs will be reported as NA");
    }

    let relevant = {
        let _timer = Timer::new("Processing haplotypes");
        process_haplotypes(&args.haplotypes, &index, vaf_pos)?
    };

    if relevant.is_empty() {
        log::warn!("No mutations overlap any annotated coding sequence");
        write_neoepitopes(&args.output, &Default::default())?;
        log::info!("Wrote empty report to {:?}", args.output);
        return Ok(());
    }

    // Step 4: Enumerate neoepitopes
    let neoepitopes = {
        let _timer = Timer::new("Enumerating neoepitopes");
        call_neoepitopes(relevant, &cds, &genome, &config, args.num_processes)?
    };

    // Log statistics
    let evidence_rows: usize = neoepitopes.values().map(|e| e.len()).sum();
    log::info!("Neoepitope summary:");
    log::info!("  Distinct peptides: {}", neoepitopes.len());
    log::info!("  Peptide-mutation associations: {}", evidence_rows);

    // Step 5: Write the report
    write_neoepitopes(&args.output, &neoepitopes)?;
    log::info!("Report written to {:?}", args.output);
    log::info!("Enumeration completed successfully");

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
            eprintln!("Please check that your haplotype file came from prep_hapcut.");
        }
        NeoError::InvalidHaplotype(msg) => {
            eprintln!("Error: Inconsistent haplotype: {}", msg);
            eprintln!("Re-run without --strict-haplotypes to trust the phaser output.");
        }
        NeoError::InvalidAnnotation(msg) => {
            eprintln!("Error: Malformed annotation: {}", msg);
            eprintln!("Please check that your GTF and FASTA files match.");
        }
        NeoError::InvalidConfig(msg) => {
            eprintln!("Error: Invalid configuration: {}", msg);
            eprintln!("Please check the kmer-size and upstream-atgs arguments.");
        }
        NeoError::Io(ref e) => {
            eprintln!("Error: I/O error: {}", e);
            eprintln!("Please check file permissions and disk space.");
        }
        NeoError::Csv(ref e) => {
            eprintln!("Error: Report writing error: {}", e);
            eprintln!("Please check the output path and disk space.");
        }
    }
    std::process::exit(1);
}

fn main() {
    if let Err(e) = run() {
        handle_error(e);
    }
}
