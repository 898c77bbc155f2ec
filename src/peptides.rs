//! Neoepitope enumeration: haplotype application, peptide windowing, and
//! report writing.

use crate::fasta::Genome;
use crate::transcript::{CdsSegment, DiploidTranscript, EditedSequence, Transcript, TranscriptCopy};
use crate::translate::{resolve_starts, translate_orf};
use crate::{
    validate_call_config, CallConfig, Haplotype, Neoepitopes, NeoResult, Origin, PeptideEvidence,
};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Enumerate neoepitopes across all transcripts touched by haplotypes.
///
/// Work is split into `num_chunks` pieces processed in parallel; each chunk
/// produces its own peptide map and the maps are merged with evidence
/// deduplication, so chunking never changes the result.
pub fn call_neoepitopes(
    relevant: HashMap<String, Vec<Haplotype>>,
    cds: &HashMap<String, Vec<CdsSegment>>,
    genome: &Genome,
    config: &CallConfig,
    num_chunks: usize,
) -> NeoResult<Neoepitopes> {
    validate_call_config(config)?;

    let entries: Vec<(String, Vec<Haplotype>)> = relevant.into_iter().collect();
    let chunks = chunkify(entries, num_chunks);

    let partials: Vec<NeoResult<Neoepitopes>> = chunks
        .into_par_iter()
        .map(|chunk| {
            let mut out = Neoepitopes::new();
            for (transcript_id, haplotypes) in chunk {
                process_transcript(&transcript_id, haplotypes, cds, genome, config, &mut out)?;
            }
            Ok(out)
        })
        .collect();

    let mut merged = Neoepitopes::new();
    for partial in partials {
        merge_neoepitopes(&mut merged, partial?);
    }

    log::info!("Enumerated {} distinct neoepitopes", merged.len());
    Ok(merged)
}

/// Split items into at most `num_chunks` similarly sized chunks.
fn chunkify<T>(items: Vec<T>, num_chunks: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }
    let num_chunks = num_chunks.max(1);
    let chunk_size = (items.len() + num_chunks - 1) / num_chunks;

    let mut chunks = Vec::new();
    let mut iter = items.into_iter();
    loop {
        let chunk: Vec<T> = iter.by_ref().take(chunk_size).collect();
        if chunk.is_empty() {
            break;
        }
        chunks.push(chunk);
    }
    chunks
}

/// Merge one peptide map into another, keeping evidence lists duplicate-free.
pub fn merge_neoepitopes(acc: &mut Neoepitopes, other: Neoepitopes) {
    for (peptide, evidence) in other {
        let entry = acc.entry(peptide).or_default();
        for item in evidence {
            if !entry.contains(&item) {
                entry.push(item);
            }
        }
    }
}

fn process_transcript(
    transcript_id: &str,
    haplotypes: Vec<Haplotype>,
    cds: &HashMap<String, Vec<CdsSegment>>,
    genome: &Genome,
    config: &CallConfig,
    out: &mut Neoepitopes,
) -> NeoResult<()> {
    let Some(segments) = cds.get(transcript_id) else {
        log::warn!("Transcript {} missing from annotation, skipped", transcript_id);
        return Ok(());
    };

    let transcript = Transcript::from_segments(transcript_id, segments.clone(), genome)?;
    let mut diploid = DiploidTranscript::new(transcript);

    for haplotype in &haplotypes {
        if config.strict_haplotypes {
            haplotype.validate()?;
        }

        // Haplotypes without a somatic mutation cannot yield tumor-specific
        // peptides; skip the editing work entirely
        if haplotype.contains_somatic() {
            for mutation in &haplotype.mutations {
                diploid.apply(mutation);
            }
            for copy in TranscriptCopy::BOTH {
                let edited = diploid.edited_sequence(copy);
                enumerate_copy(&edited, transcript_id, config, out);
            }
        }

        diploid.reset();
    }

    Ok(())
}

/// K-merize every resolved reading frame of one edited copy, emitting the
/// windows whose evidence includes a somatic mutation.
fn enumerate_copy(
    edited: &EditedSequence,
    transcript_id: &str,
    config: &CallConfig,
    out: &mut Neoepitopes,
) {
    for start in resolve_starts(edited, config.policy) {
        let residues = translate_orf(edited, start);

        for size in config.min_size..=config.max_size {
            if residues.len() < size {
                break;
            }
            for window in residues.windows(size) {
                let mut evidence: BTreeSet<u32> = BTreeSet::new();
                for residue in window {
                    evidence.extend(residue.evidence.iter().copied());
                }
                let somatic = evidence
                    .iter()
                    .any(|&idx| edited.edits[idx as usize].is_somatic());
                if !somatic {
                    continue;
                }
                if window.iter().any(|r| r.aa == b'X') {
                    continue;
                }

                let rows: Vec<PeptideEvidence> = evidence
                    .iter()
                    .filter(|&&idx| {
                        let reported = match edited.edits[idx as usize].origin {
                            Origin::Somatic => config.include_somatic,
                            Origin::Germline => config.include_germline,
                        };
                        reported
                    })
                    .map(|&idx| {
                        PeptideEvidence::from_mutation(&edited.edits[idx as usize], transcript_id)
                    })
                    .collect();
                if rows.is_empty() {
                    continue;
                }

                let peptide: String = window.iter().map(|r| r.aa as char).collect();
                let entry = out.entry(peptide).or_default();
                for row in rows {
                    if !entry.contains(&row) {
                        entry.push(row);
                    }
                }
            }
        }
    }
}

/// Write neoepitopes as a tab-separated report, one row per peptide and
/// contributing mutation.
pub fn write_neoepitopes<P: AsRef<Path>>(path: P, neoepitopes: &Neoepitopes) -> NeoResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path.as_ref())?;

    writer.write_record([
        "Neoepitope",
        "Chromosome",
        "Pos",
        "Ref",
        "Alt",
        "Mutation_type",
        "VAF",
        "Transcript_ID",
    ])?;

    for (peptide, evidence) in neoepitopes {
        for item in evidence {
            let vaf = match item.vaf {
                Some(v) => v.to_string(),
                None => "NA".to_string(),
            };
            writer.write_record([
                peptide.clone(),
                item.chrom.clone(),
                item.pos.to_string(),
                render_allele(&item.reference),
                render_allele(&item.alt),
                item.kind.to_string(),
                vaf,
                item.transcript.clone(),
            ])?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Empty alleles (insertion reference sides) print as '' so the column is
/// never blank.
fn render_allele(allele: &str) -> String {
    if allele.is_empty() {
        "''".to_string()
    } else {
        allele.to_string()
    }
}
