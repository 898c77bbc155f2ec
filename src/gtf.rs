//! GTF annotation parsing: transcript id to CDS/stop-codon segment table.

use crate::transcript::{CdsSegment, SegmentKind, Strand};
use crate::utils::open_text;
use crate::{NeoError, NeoResult};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

/// Extract a quoted attribute value from a GTF attribute field.
fn parse_attribute(attributes: &str, key: &str) -> Option<String> {
    for entry in attributes.split(';') {
        let entry = entry.trim();
        if let Some(rest) = entry.strip_prefix(key) {
            let value = rest.trim().trim_matches('"');
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Read a GTF file (plain or gzipped) into a per-transcript list of coding
/// and stop-codon segments, ordered by genomic start.
///
/// Only `CDS` and `stop_codon` features are kept; everything else in the
/// annotation is irrelevant to transcript editing.
pub fn gtf_to_cds<P: AsRef<Path>>(path: P) -> NeoResult<HashMap<String, Vec<CdsSegment>>> {
    let reader = open_text(&path)?;
    let mut cds: HashMap<String, Vec<CdsSegment>> = HashMap::new();

    for line in reader.lines() {
        let line = line?;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 9 {
            return Err(NeoError::InvalidAnnotation(format!(
                "GTF line with {} columns: {}",
                fields.len(),
                line
            )));
        }

        let kind = match fields[2] {
            "CDS" => SegmentKind::Coding,
            "stop_codon" => SegmentKind::StopCodon,
            _ => continue,
        };

        let start = fields[3].parse::<u64>().map_err(|_| {
            NeoError::InvalidAnnotation(format!("invalid GTF start: {}", fields[3]))
        })?;
        let end = fields[4].parse::<u64>().map_err(|_| {
            NeoError::InvalidAnnotation(format!("invalid GTF end: {}", fields[4]))
        })?;
        let strand = match fields[6] {
            "+" => Strand::Forward,
            "-" => Strand::Reverse,
            other => {
                return Err(NeoError::InvalidAnnotation(format!(
                    "invalid GTF strand: {}",
                    other
                )))
            }
        };

        let transcript_id = parse_attribute(fields[8], "transcript_id").ok_or_else(|| {
            NeoError::InvalidAnnotation(format!("GTF line without transcript_id: {}", line))
        })?;

        cds.entry(transcript_id).or_default().push(CdsSegment {
            chrom: fields[0].to_string(),
            start,
            end,
            strand,
            kind,
        });
    }

    for segments in cds.values_mut() {
        segments.sort_by_key(|s| s.start);
    }

    Ok(cds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ATTRS: &str = "gene_id \"G1\"; transcript_id \"TX1\";";

    #[test]
    fn test_gtf_to_cds_keeps_coding_features() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "# comment").unwrap();
        writeln!(temp_file, "chr1\thavana\texon\t50\t220\t.\t+\t.\t{}", ATTRS).unwrap();
        writeln!(temp_file, "chr1\thavana\tCDS\t200\t250\t.\t+\t0\t{}", ATTRS).unwrap();
        writeln!(temp_file, "chr1\thavana\tCDS\t100\t150\t.\t+\t0\t{}", ATTRS).unwrap();
        writeln!(
            temp_file,
            "chr1\thavana\tstop_codon\t251\t253\t.\t+\t0\t{}",
            ATTRS
        )
        .unwrap();

        let cds = gtf_to_cds(temp_file.path()).unwrap();
        assert_eq!(cds.len(), 1);

        let segments = &cds["TX1"];
        assert_eq!(segments.len(), 3);
        // Ordered by genomic start, exon dropped
        assert_eq!(segments[0].start, 100);
        assert_eq!(segments[1].start, 200);
        assert_eq!(segments[2].kind, SegmentKind::StopCodon);
    }

    #[test]
    fn test_gtf_to_cds_rejects_bad_coordinates() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "chr1\thavana\tCDS\toops\t150\t.\t+\t0\t{}", ATTRS).unwrap();
        assert!(gtf_to_cds(temp_file.path()).is_err());
    }

    #[test]
    fn test_parse_attribute() {
        assert_eq!(
            parse_attribute(ATTRS, "transcript_id"),
            Some("TX1".to_string())
        );
        assert_eq!(parse_attribute(ATTRS, "gene_id"), Some("G1".to_string()));
        assert_eq!(parse_attribute(ATTRS, "exon_number"), None);
    }
}
