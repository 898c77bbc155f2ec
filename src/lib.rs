//! # neoscan - Neoepitope Enumeration Tool
//!
//! Identifies candidate tumor-specific peptides ("neoepitopes") by applying
//! phased and unphased genomic mutations to transcript coding sequences,
//! translating the edited copies and k-merizing the results.

pub mod fasta;
pub mod gtf;
pub mod hapcut;
pub mod interval;
pub mod merge;
pub mod peptides;
pub mod transcript;
pub mod translate;
pub mod utils;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Whether a mutation was inherited or acquired by the tumor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    Germline,
    Somatic,
}

/// The sequence change carried by a mutation.
///
/// Each class carries only the fields meaningful to it: a substitution
/// replaces bases one-for-one, an insertion adds new bases after its anchor,
/// a deletion removes a run of reference bases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationEdit {
    Substitution { alt: String },
    Insertion { seq: String },
    Deletion { len: usize },
}

impl MutationEdit {
    /// Single-letter mutation type code used in reports.
    pub fn code(&self) -> char {
        match self {
            MutationEdit::Substitution { .. } => 'V',
            MutationEdit::Insertion { .. } => 'I',
            MutationEdit::Deletion { .. } => 'D',
        }
    }

    /// The alternate allele as it appears in reports: the replacement or
    /// inserted bases, or the deletion length rendered as an integer.
    pub fn alt_string(&self) -> String {
        match self {
            MutationEdit::Substitution { alt } => alt.clone(),
            MutationEdit::Insertion { seq } => seq.clone(),
            MutationEdit::Deletion { len } => len.to_string(),
        }
    }
}

/// A single mutation record, immutable once extracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    pub chrom: String,
    /// 1-based anchor position. Substitution: first replaced base.
    /// Deletion: first deleted base. Insertion: the base the new
    /// sequence follows.
    pub pos: u64,
    /// Reference bases covered by the genomic span; empty for insertions.
    pub reference: String,
    pub edit: MutationEdit,
    /// Presence on each transcript copy (zygosity).
    pub on_copy_a: bool,
    pub on_copy_b: bool,
    pub origin: Origin,
    /// Variant allele fraction as a percentage, when the caller reported one.
    pub vaf: Option<f64>,
}

impl Mutation {
    /// Half-open genomic span `[start, end)` affected by this mutation.
    ///
    /// An insertion occupies a single-base span anchored on the base it
    /// follows; the inserted sequence itself has no reference footprint.
    pub fn span(&self) -> (u64, u64) {
        match &self.edit {
            MutationEdit::Substitution { .. } => {
                (self.pos, self.pos + self.reference.len() as u64)
            }
            MutationEdit::Insertion { .. } => (self.pos, self.pos + 1),
            MutationEdit::Deletion { len } => (self.pos, self.pos + *len as u64),
        }
    }

    pub fn is_somatic(&self) -> bool {
        self.origin == Origin::Somatic
    }
}

/// An ordered run of mutations sharing a phase block, attributed to one
/// transcript. Positions are non-decreasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Haplotype {
    pub mutations: Vec<Mutation>,
}

impl Haplotype {
    /// Build a haplotype from block-accumulated mutations, sorting by
    /// ascending genomic position.
    pub fn new(mut mutations: Vec<Mutation>) -> Self {
        mutations.sort_by_key(|m| m.pos);
        Haplotype { mutations }
    }

    pub fn contains_somatic(&self) -> bool {
        self.mutations.iter().any(|m| m.is_somatic())
    }

    /// Check that no two mutations on the same copy have overlapping spans.
    ///
    /// Overlapping edits within one haplotype invalidate the coordinate
    /// arithmetic of later edits; strict callers reject the haplotype rather
    /// than apply it partially.
    pub fn validate(&self) -> NeoResult<()> {
        for (copy_name, on_copy) in [
            ("A", (|m: &&Mutation| m.on_copy_a) as fn(&&Mutation) -> bool),
            ("B", |m: &&Mutation| m.on_copy_b),
        ] {
            let mut prev_end = 0u64;
            for mutation in self.mutations.iter().filter(on_copy) {
                let (start, end) = mutation.span();
                if start < prev_end {
                    return Err(NeoError::InvalidHaplotype(format!(
                        "overlapping edits on copy {} at {}:{}",
                        copy_name, mutation.chrom, mutation.pos
                    )));
                }
                prev_end = prev_end.max(end);
            }
        }
        Ok(())
    }
}

/// Start-codon selection policy for translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartPolicy {
    /// Prefer the most upstream in-frame ATG created by edits, falling back
    /// to the canonical start.
    NovelUpstream,
    /// Ignore upstream context; if the canonical start is disrupted, resume
    /// from the first downstream ATG of the edited sequence.
    DownstreamOnly,
    /// Treat every ATG, upstream or downstream, as an independent start.
    All,
    /// Translate only from the canonical start, frameshifts and all.
    Reference,
}

impl FromStr for StartPolicy {
    type Err = NeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "novel" => Ok(StartPolicy::NovelUpstream),
            "none" => Ok(StartPolicy::DownstreamOnly),
            "all" => Ok(StartPolicy::All),
            "reference" => Ok(StartPolicy::Reference),
            other => Err(NeoError::InvalidConfig(format!(
                "upstream-atgs must be one of novel, all, none, reference (got {})",
                other
            ))),
        }
    }
}

impl fmt::Display for StartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StartPolicy::NovelUpstream => "novel",
            StartPolicy::DownstreamOnly => "none",
            StartPolicy::All => "all",
            StartPolicy::Reference => "reference",
        };
        write!(f, "{}", s)
    }
}

/// Configuration parameters for neoepitope calling.
#[derive(Debug, Clone)]
pub struct CallConfig {
    /// Smallest peptide window, in residues.
    pub min_size: usize,
    /// Largest peptide window, in residues.
    pub max_size: usize,
    pub policy: StartPolicy,
    /// Report somatic mutations in peptide metadata.
    pub include_somatic: bool,
    /// Report co-occurring germline mutations in peptide metadata.
    pub include_germline: bool,
    /// Reject haplotypes containing overlapping edits instead of trusting
    /// the upstream phaser.
    pub strict_haplotypes: bool,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            min_size: 8,
            max_size: 11,
            policy: StartPolicy::NovelUpstream,
            include_somatic: true,
            include_germline: false,
            strict_haplotypes: false,
        }
    }
}

/// Validate calling configuration parameters.
pub fn validate_call_config(config: &CallConfig) -> NeoResult<()> {
    if config.min_size == 0 {
        return Err(NeoError::InvalidConfig(
            "peptide sizes must be positive".to_string(),
        ));
    }
    if config.min_size > config.max_size {
        return Err(NeoError::InvalidConfig(format!(
            "min peptide size {} exceeds max {}",
            config.min_size, config.max_size
        )));
    }
    if !config.include_somatic && !config.include_germline {
        return Err(NeoError::InvalidConfig(
            "at least one mutation class must be reported".to_string(),
        ));
    }
    Ok(())
}

/// Metadata tying an emitted peptide back to one contributing mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeptideEvidence {
    pub chrom: String,
    pub pos: u64,
    /// Reference allele, empty for insertions.
    pub reference: String,
    /// Alternate allele, or the deletion length for deletions.
    pub alt: String,
    /// Mutation type code: 'V' substitution, 'I' insertion, 'D' deletion.
    pub kind: char,
    pub vaf: Option<f64>,
    pub transcript: String,
}

impl PeptideEvidence {
    pub fn from_mutation(mutation: &Mutation, transcript: &str) -> Self {
        Self {
            chrom: mutation.chrom.clone(),
            pos: mutation.pos,
            reference: mutation.reference.clone(),
            alt: mutation.edit.alt_string(),
            kind: mutation.edit.code(),
            vaf: mutation.vaf,
            transcript: transcript.to_string(),
        }
    }
}

/// Peptide string mapped to the distinct mutations explaining it.
pub type Neoepitopes = BTreeMap<String, Vec<PeptideEvidence>>;

/// Error types for the neoscan library.
#[derive(Debug, thiserror::Error)]
pub enum NeoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid mutation record: {0}")]
    InvalidMutation(String),

    #[error("Inconsistent haplotype: {0}")]
    InvalidHaplotype(String),

    #[error("Malformed annotation: {0}")]
    InvalidAnnotation(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type NeoResult<T> = Result<T, NeoError>;
