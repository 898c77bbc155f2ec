//! VCF preparation: germline/somatic merging, tumor column normalization,
//! and augmenting HapCUT2 output with unphased variants.

use crate::utils::open_text;
use crate::{NeoError, NeoResult};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

/// Merge a germline and a somatic VCF into one file for phasing.
///
/// Germline records are marked with a trailing `*` so their origin survives
/// the round trip through HapCUT2. The somatic header is kept, records are
/// sorted by chromosome and position, and every record is truncated to the
/// first ten columns so both files present a single sample.
pub fn combine_vcfs<P: AsRef<Path>>(germline: P, somatic: P, output: P) -> NeoResult<()> {
    let mut records: Vec<(String, u64, String)> = Vec::new();

    let reader = open_text(&germline)?;
    for line in reader.lines() {
        let line = line?;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let (chrom, pos) = record_key(&line)?;
        records.push((chrom, pos, format!("{}*", truncate_record(&line))));
    }

    let mut header: Vec<String> = Vec::new();
    let reader = open_text(&somatic)?;
    for line in reader.lines() {
        let line = line?;
        if line.starts_with('#') {
            header.push(line);
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        let (chrom, pos) = record_key(&line)?;
        records.push((chrom, pos, truncate_record(&line)));
    }

    records.sort_by(|a, b| (&a.0, a.1).cmp(&(&b.0, b.1)));

    let mut writer = BufWriter::new(File::create(&output)?);
    for line in &header {
        writeln!(writer, "{}", line)?;
    }
    for (_, _, line) in &records {
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;

    log::info!(
        "Combined {} records into {}",
        records.len(),
        output.as_ref().to_string_lossy()
    );
    Ok(())
}

/// Swap the two sample columns of a VCF so the tumor sample comes first,
/// the order HapCUT2 expects.
pub fn adjust_tumor_column<P: AsRef<Path>>(input: P, output: P) -> NeoResult<()> {
    let reader = open_text(&input)?;
    let mut writer = BufWriter::new(File::create(&output)?);

    for line in reader.lines() {
        let line = line?;
        if line.starts_with("##") || line.trim().is_empty() {
            writeln!(writer, "{}", line)?;
            continue;
        }

        let mut fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 11 {
            return Err(NeoError::InvalidAnnotation(format!(
                "VCF record without two sample columns: {}",
                line
            )));
        }
        fields.swap(9, 10);
        writeln!(writer, "{}", fields.join("\t"))?;
    }

    writer.flush()?;
    Ok(())
}

/// Augment HapCUT2 output with the VCF variants it left unphased.
///
/// Phased lines are copied through verbatim. Every (chromosome, position,
/// ref, alt) the VCF carries but the HapCUT2 output lacks is appended as a
/// single-variant pseudo-block, one per alternate allele, so downstream
/// haplotype processing sees every call.
pub fn prep_hapcut_output<P: AsRef<Path>>(hapcut: P, vcf: P, output: P) -> NeoResult<()> {
    // (chrom, pos) -> phased (ref, alt) pairs
    let mut phased: HashMap<(String, u64), HashSet<(String, String)>> = HashMap::new();

    let mut writer = BufWriter::new(File::create(&output)?);

    let reader = open_text(&hapcut)?;
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() && !trimmed.starts_with("BLOCK") && !trimmed.starts_with('*') {
            let tokens: Vec<&str> = trimmed.split_whitespace().collect();
            if tokens.len() < 8 {
                return Err(NeoError::InvalidMutation(format!(
                    "haplotype line with {} fields: {}",
                    tokens.len(),
                    trimmed
                )));
            }
            let pos = tokens[4].parse::<u64>().map_err(|_| {
                NeoError::InvalidMutation(format!("invalid position: {}", tokens[4]))
            })?;
            phased
                .entry((tokens[3].to_string(), pos))
                .or_default()
                .insert((tokens[5].to_string(), tokens[6].to_string()));
        }
        writeln!(writer, "{}", line)?;
    }
    writeln!(writer, "********")?;

    let mut counter = 0usize;
    let mut appended = 0usize;
    let reader = open_text(&vcf)?;
    for line in reader.lines() {
        let line = line?;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 10 {
            return Err(NeoError::InvalidAnnotation(format!(
                "VCF record without a sample column: {}",
                line
            )));
        }
        let pos = fields[1].parse::<u64>().map_err(|_| {
            NeoError::InvalidMutation(format!("invalid VCF position: {}", fields[1]))
        })?;
        counter += 1;

        let seen = phased.get(&(fields[0].to_string(), pos));
        for alt in fields[4].split(',') {
            let pair = (fields[3].to_string(), alt.to_string());
            if seen.map_or(false, |set| set.contains(&pair)) {
                continue;
            }
            writeln!(writer, "BLOCK: unphased")?;
            writeln!(
                writer,
                "{}\t1\t0\t{}\t{}\t{}\t{}\t{}\tNA\tNA",
                counter, fields[0], pos, fields[3], alt, fields[9]
            )?;
            writeln!(writer, "********")?;
            appended += 1;
        }
    }

    writer.flush()?;
    log::info!("Appended {} unphased variants as pseudo-blocks", appended);
    Ok(())
}

fn record_key(line: &str) -> NeoResult<(String, u64)> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 8 {
        return Err(NeoError::InvalidAnnotation(format!(
            "VCF record with {} columns: {}",
            fields.len(),
            line
        )));
    }
    let pos = fields[1]
        .parse::<u64>()
        .map_err(|_| NeoError::InvalidMutation(format!("invalid VCF position: {}", fields[1])))?;
    Ok((fields[0].to_string(), pos))
}

fn truncate_record(line: &str) -> String {
    line.split('\t').take(10).collect::<Vec<_>>().join("\t")
}
