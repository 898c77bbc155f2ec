//! HapCUT2 haplotype block parsing and mutation ingestion.
//!
//! Input is the augmented HapCUT2 output: `BLOCK` headers, one mutation per
//! line, blocks terminated by `********`. Germline records carry a trailing
//! `*` on the genotype field.

use crate::interval::TranscriptIndex;
use crate::utils::open_text;
use crate::{Haplotype, Mutation, MutationEdit, NeoError, NeoResult, Origin};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

/// Locate the FREQ entry in a VCF's FORMAT column, for VAF extraction.
///
/// Returns `None` when the VCF never declares FREQ; mutation parsing then
/// leaves VAFs unset instead of failing.
pub fn get_vaf_pos<P: AsRef<Path>>(path: P) -> NeoResult<Option<usize>> {
    let reader = open_text(&path)?;
    let mut declared = false;

    for line in reader.lines() {
        let line = line?;
        if line.starts_with('#') {
            if line.contains("FREQ") {
                declared = true;
            }
            continue;
        }
        if !declared {
            return Ok(None);
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 9 {
            return Ok(None);
        }
        return Ok(fields[8].split(':').position(|key| key == "FREQ"));
    }

    Ok(None)
}

/// Parse one mutation line from an augmented HapCUT2 block.
///
/// Fields: variant counter, copy A flag, copy B flag, chromosome, position,
/// reference allele, alternate allele, genotype. Indels are normalized to
/// their anchored form here, so downstream code never re-derives spans.
pub fn parse_mutation_line(line: &str, vaf_pos: Option<usize>) -> NeoResult<Mutation> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 8 {
        return Err(NeoError::InvalidMutation(format!(
            "haplotype line with {} fields: {}",
            tokens.len(),
            line
        )));
    }

    let on_copy_a = tokens[1] == "1";
    let on_copy_b = tokens[2] == "1";
    let chrom = tokens[3].to_string();
    let pos = tokens[4]
        .parse::<u64>()
        .map_err(|_| NeoError::InvalidMutation(format!("invalid position: {}", tokens[4])))?;
    let ref_allele = tokens[5];
    let alt_allele = tokens[6];
    let genotype = tokens[7];

    if ref_allele.is_empty() || alt_allele.is_empty() {
        return Err(NeoError::InvalidMutation(format!(
            "empty allele in haplotype line: {}",
            line
        )));
    }

    // Classification by allele length; shared leading bases are the anchor
    let (pos, reference, edit) = if ref_allele.len() == alt_allele.len() {
        (
            pos,
            ref_allele.to_string(),
            MutationEdit::Substitution {
                alt: alt_allele.to_string(),
            },
        )
    } else if ref_allele.len() > alt_allele.len() {
        let deleted = &ref_allele[alt_allele.len()..];
        (
            pos + alt_allele.len() as u64,
            deleted.to_string(),
            MutationEdit::Deletion {
                len: deleted.len(),
            },
        )
    } else {
        (
            pos,
            String::new(),
            MutationEdit::Insertion {
                seq: alt_allele[ref_allele.len()..].to_string(),
            },
        )
    };

    let origin = if genotype.ends_with('*') {
        Origin::Germline
    } else {
        Origin::Somatic
    };

    // VAF extraction is lenient: absent or non-numeric fields yield None
    let vaf = vaf_pos.and_then(|p| {
        genotype
            .trim_end_matches('*')
            .split(':')
            .nth(p)
            .and_then(|field| field.trim_end_matches('%').parse::<f64>().ok())
    });

    Ok(Mutation {
        chrom,
        pos,
        reference,
        edit,
        on_copy_a,
        on_copy_b,
        origin,
        vaf,
    })
}

/// Stream haplotype blocks from an augmented HapCUT2 file and attribute
/// each block's mutations to the transcripts they touch.
///
/// Each block yields at most one [`Haplotype`] per affected transcript,
/// holding only the mutations whose span overlaps that transcript's CDS
/// footprint. Blocks touching no transcript are dropped.
pub fn process_haplotypes<P: AsRef<Path>>(
    path: P,
    index: &TranscriptIndex,
    vaf_pos: Option<usize>,
) -> NeoResult<HashMap<String, Vec<Haplotype>>> {
    let reader = open_text(&path)?;

    let mut affected: HashMap<String, Vec<Haplotype>> = HashMap::new();
    let mut block: HashMap<String, Vec<Mutation>> = HashMap::new();
    let mut total_mutations = 0usize;

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with("BLOCK") {
            continue;
        }
        if trimmed.starts_with('*') {
            flush_block(&mut block, &mut affected);
            continue;
        }

        let mutation = parse_mutation_line(trimmed, vaf_pos)?;
        total_mutations += 1;

        let (start, end) = mutation.span();
        for transcript_id in index.query(&mutation.chrom, start, end) {
            block
                .entry(transcript_id)
                .or_default()
                .push(mutation.clone());
        }
    }
    // Missing final terminator still flushes the last block
    flush_block(&mut block, &mut affected);

    log::info!(
        "Read {} phased mutations affecting {} transcripts",
        total_mutations,
        affected.len()
    );

    Ok(affected)
}

fn flush_block(
    block: &mut HashMap<String, Vec<Mutation>>,
    affected: &mut HashMap<String, Vec<Haplotype>>,
) {
    for (transcript_id, mutations) in block.drain() {
        affected
            .entry(transcript_id)
            .or_default()
            .push(Haplotype::new(mutations));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{CdsSegment, SegmentKind, Strand};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn index_with(chrom: &str, start: u64, end: u64, id: &str) -> TranscriptIndex {
        let mut cds = HashMap::new();
        cds.insert(
            id.to_string(),
            vec![CdsSegment {
                chrom: chrom.to_string(),
                start,
                end,
                strand: Strand::Forward,
                kind: SegmentKind::Coding,
            }],
        );
        TranscriptIndex::build(&cds)
    }

    #[test]
    fn test_parse_substitution() {
        let m = parse_mutation_line("1\t1\t0\tchr1\t100\tA\tG\t0/1", None).unwrap();
        assert_eq!(m.pos, 100);
        assert_eq!(m.reference, "A");
        assert_eq!(m.edit.code(), 'V');
        assert!(m.on_copy_a);
        assert!(!m.on_copy_b);
        assert_eq!(m.origin, Origin::Somatic);
        assert_eq!(m.span(), (100, 101));
    }

    #[test]
    fn test_parse_deletion_rebases_to_anchor() {
        // AGG -> A deletes GG anchored after the shared base
        let m = parse_mutation_line("2\t0\t1\tchr1\t100\tAGG\tA\t0/1", None).unwrap();
        assert_eq!(m.pos, 101);
        assert_eq!(m.reference, "GG");
        assert_eq!(m.edit.code(), 'D');
        assert_eq!(m.span(), (101, 103));
    }

    #[test]
    fn test_parse_insertion_strips_shared_prefix() {
        let m = parse_mutation_line("3\t1\t1\tchr1\t100\tA\tATT\t1/1", None).unwrap();
        assert_eq!(m.pos, 100);
        assert_eq!(m.reference, "");
        match &m.edit {
            MutationEdit::Insertion { seq } => assert_eq!(seq, "TT"),
            other => panic!("expected insertion, got {:?}", other),
        }
        assert_eq!(m.span(), (100, 101));
    }

    #[test]
    fn test_parse_germline_marker_and_vaf() {
        let m =
            parse_mutation_line("4\t1\t0\tchr1\t100\tA\tG\t0/1:12:34.5%*", Some(2)).unwrap();
        assert_eq!(m.origin, Origin::Germline);
        assert_eq!(m.vaf, Some(34.5));

        // Non-numeric VAF field degrades to None instead of failing
        let m = parse_mutation_line("4\t1\t0\tchr1\t100\tA\tG\t0/1:12:.", Some(2)).unwrap();
        assert_eq!(m.origin, Origin::Somatic);
        assert_eq!(m.vaf, None);
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        assert!(parse_mutation_line("1\t1\t0\tchr1", None).is_err());
        assert!(parse_mutation_line("1\t1\t0\tchr1\toops\tA\tG\t0/1", None).is_err());
    }

    #[test]
    fn test_process_haplotypes_blocks_and_attribution() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "BLOCK: offset: 1 len: 2 phased: 2").unwrap();
        writeln!(temp_file, "1\t1\t0\tchr1\t100\tA\tG\t0/1").unwrap();
        writeln!(temp_file, "2\t0\t1\tchr1\t110\tC\tT\t0/1").unwrap();
        writeln!(temp_file, "********").unwrap();
        writeln!(temp_file, "BLOCK: offset: 3 len: 1 phased: 1").unwrap();
        writeln!(temp_file, "3\t1\t0\tchr1\t120\tG\tA\t0/1").unwrap();
        writeln!(temp_file, "********").unwrap();
        // Outside the transcript entirely
        writeln!(temp_file, "BLOCK: offset: 4 len: 1 phased: 1").unwrap();
        writeln!(temp_file, "4\t1\t0\tchr2\t100\tG\tA\t0/1").unwrap();
        writeln!(temp_file, "********").unwrap();

        let index = index_with("chr1", 50, 200, "TX1");
        let affected = process_haplotypes(temp_file.path(), &index, None).unwrap();

        assert_eq!(affected.len(), 1);
        let haplotypes = &affected["TX1"];
        assert_eq!(haplotypes.len(), 2);
        assert_eq!(haplotypes[0].mutations.len(), 2);
        assert_eq!(haplotypes[1].mutations.len(), 1);
    }

    #[test]
    fn test_process_haplotypes_flushes_unterminated_block() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "BLOCK: offset: 1 len: 1 phased: 1").unwrap();
        writeln!(temp_file, "1\t1\t0\tchr1\t100\tA\tG\t0/1").unwrap();

        let index = index_with("chr1", 50, 200, "TX1");
        let affected = process_haplotypes(temp_file.path(), &index, None).unwrap();
        assert_eq!(affected["TX1"].len(), 1);
    }

    #[test]
    fn test_get_vaf_pos() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "##fileformat=VCFv4.2").unwrap();
        writeln!(
            temp_file,
            "##FORMAT=<ID=FREQ,Number=1,Type=String,Description=\"Frequency\">"
        )
        .unwrap();
        writeln!(
            temp_file,
            "chr1\t100\t.\tA\tG\t.\tPASS\t.\tGT:AD:FREQ\t0/1:12:34.5%"
        )
        .unwrap();
        assert_eq!(get_vaf_pos(temp_file.path()).unwrap(), Some(2));

        let mut plain = NamedTempFile::new().unwrap();
        writeln!(plain, "##fileformat=VCFv4.2").unwrap();
        writeln!(plain, "chr1\t100\t.\tA\tG\t.\tPASS\t.\tGT\t0/1").unwrap();
        assert_eq!(get_vaf_pos(plain.path()).unwrap(), None);
    }
}
