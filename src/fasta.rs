//! Reference genome FASTA reading and strand helpers.

use crate::utils::open_text;
use crate::{NeoError, NeoResult};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

/// Chromosome name mapped to its full nucleotide sequence, uppercased.
pub type Genome = HashMap<String, Vec<u8>>;

/// Read a reference genome FASTA (plain or gzipped) into memory.
///
/// Record names are truncated at the first whitespace, matching how
/// chromosome names appear in VCF and GTF files.
pub fn read_fasta<P: AsRef<Path>>(path: P) -> NeoResult<Genome> {
    let reader = open_text(&path)?;

    let mut genome = Genome::new();
    let mut current: Option<String> = None;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end();

        if line.is_empty() {
            continue;
        }

        if let Some(header) = line.strip_prefix('>') {
            let name = header
                .split_whitespace()
                .next()
                .ok_or_else(|| {
                    NeoError::InvalidAnnotation("FASTA header with no name".to_string())
                })?
                .to_string();
            genome.entry(name.clone()).or_default();
            current = Some(name);
        } else {
            let name = current.as_ref().ok_or_else(|| {
                NeoError::InvalidAnnotation(format!(
                    "FASTA sequence data before any header: {}",
                    line
                ))
            })?;
            let record = genome.get_mut(name).ok_or_else(|| {
                NeoError::InvalidAnnotation(format!("unknown FASTA record {}", name))
            })?;
            record.extend(line.bytes().map(|b| b.to_ascii_uppercase()));
        }
    }

    if genome.is_empty() {
        return Err(NeoError::InvalidAnnotation(format!(
            "no FASTA records in {}",
            path.as_ref().to_string_lossy()
        )));
    }

    Ok(genome)
}

/// Watson-Crick complement of a single base. Ambiguous bases map to N.
pub fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        _ => b'N',
    }
}

/// Reverse complement of a nucleotide sequence.
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_fasta_multiline() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, ">chr1 assembled").unwrap();
        writeln!(temp_file, "acgt").unwrap();
        writeln!(temp_file, "ACGT").unwrap();
        writeln!(temp_file, ">chr2").unwrap();
        writeln!(temp_file, "TTTT").unwrap();

        let genome = read_fasta(temp_file.path()).unwrap();
        assert_eq!(genome.len(), 2);
        assert_eq!(genome["chr1"], b"ACGTACGT");
        assert_eq!(genome["chr2"], b"TTTT");
    }

    #[test]
    fn test_read_fasta_gzipped() {
        let mut gz = NamedTempFile::new().unwrap();
        {
            let mut encoder = flate2::write::GzEncoder::new(
                gz.as_file_mut(),
                flate2::Compression::default(),
            );
            writeln!(encoder, ">chr1").unwrap();
            writeln!(encoder, "ACGTACGT").unwrap();
            encoder.finish().unwrap();
        }

        let genome = read_fasta(gz.path()).unwrap();
        assert_eq!(genome["chr1"], b"ACGTACGT");
    }

    #[test]
    fn test_read_fasta_rejects_headerless_data() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "ACGT").unwrap();
        assert!(read_fasta(temp_file.path()).is_err());
    }

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement(b"ATGC"), b"GCAT");
        assert_eq!(reverse_complement(b"AAAN"), b"NTTT");
        assert_eq!(reverse_complement(b""), b"");
    }
}
