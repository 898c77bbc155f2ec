//! Transcript model and diploid coding-sequence editor.
//!
//! A [`Transcript`] owns the reference CDS layout; a [`DiploidTranscript`]
//! holds two independently editable copies of it. Edits are non-destructive
//! overlays resolved when a copy's sequence is materialized, so resetting a
//! copy back to the reference is just discarding its edit list.

use crate::fasta::{reverse_complement, Genome};
use crate::{Mutation, MutationEdit, NeoError, NeoResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Genomic strand of a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strand {
    Forward,
    Reverse,
}

/// What a CDS segment contributes to the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentKind {
    Coding,
    StopCodon,
}

/// One genomic segment of a transcript's coding sequence.
///
/// Coordinates are 1-based inclusive, the GTF convention. Segments of one
/// transcript never overlap genomically, and concatenate contiguously in
/// spliced coordinates regardless of intron gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdsSegment {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub strand: Strand,
    pub kind: SegmentKind,
}

impl CdsSegment {
    pub fn len(&self) -> usize {
        (self.end - self.start + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// A transcript's reference CDS layout and derived reference sequence.
#[derive(Debug, Clone)]
pub struct Transcript {
    pub id: String,
    pub chrom: String,
    pub strand: Strand,
    segments: Vec<CdsSegment>,
    /// Spliced reference bases in ascending genomic order (plus
    /// orientation; reverse-complemented only at materialization).
    reference: Vec<u8>,
}

impl Transcript {
    /// Assemble a transcript from its CDS segments and the reference genome.
    pub fn from_segments(
        id: &str,
        mut segments: Vec<CdsSegment>,
        genome: &Genome,
    ) -> NeoResult<Self> {
        if segments.is_empty() {
            return Err(NeoError::InvalidAnnotation(format!(
                "transcript {} has no CDS segments",
                id
            )));
        }
        segments.sort_by_key(|s| s.start);

        let chrom = segments[0].chrom.clone();
        let strand = segments[0].strand;
        let mut prev_end = 0u64;
        for segment in &segments {
            if segment.chrom != chrom || segment.strand != strand {
                return Err(NeoError::InvalidAnnotation(format!(
                    "transcript {} mixes chromosomes or strands",
                    id
                )));
            }
            if segment.start == 0 || segment.end < segment.start {
                return Err(NeoError::InvalidAnnotation(format!(
                    "transcript {} has an invalid segment [{}, {}]",
                    id, segment.start, segment.end
                )));
            }
            if segment.start <= prev_end {
                return Err(NeoError::InvalidAnnotation(format!(
                    "transcript {} has overlapping segments at {}",
                    id, segment.start
                )));
            }
            prev_end = segment.end;
        }

        let chrom_seq = genome.get(&chrom).ok_or_else(|| {
            NeoError::InvalidAnnotation(format!(
                "chromosome {} absent from the reference genome",
                chrom
            ))
        })?;

        let mut reference = Vec::new();
        for segment in &segments {
            let lo = (segment.start - 1) as usize;
            let hi = segment.end as usize;
            if hi > chrom_seq.len() {
                return Err(NeoError::InvalidAnnotation(format!(
                    "transcript {} segment [{}, {}] exceeds {} length {}",
                    id, segment.start, segment.end, chrom, chrom_seq.len()
                )));
            }
            reference.extend_from_slice(&chrom_seq[lo..hi]);
        }

        Ok(Transcript {
            id: id.to_string(),
            chrom,
            strand,
            segments,
            reference,
        })
    }

    /// Spliced offset (ascending genomic order) of a 1-based genomic
    /// position, or `None` when the position falls outside every segment.
    pub fn spliced_offset(&self, pos: u64) -> Option<usize> {
        let mut acc = 0usize;
        for segment in &self.segments {
            if pos >= segment.start && pos <= segment.end {
                return Some(acc + (pos - segment.start) as usize);
            }
            acc += segment.len();
        }
        None
    }

    /// Spliced offset of the first base of the canonical start codon,
    /// still in ascending genomic order.
    fn canonical_reference_offset(&self) -> usize {
        let coding = self.segments.iter().filter(|s| s.kind == SegmentKind::Coding);
        match self.strand {
            Strand::Forward => coding
                .map(|s| s.start)
                .min()
                .and_then(|pos| self.spliced_offset(pos))
                .unwrap_or(0),
            Strand::Reverse => coding
                .map(|s| s.end)
                .max()
                .and_then(|pos| self.spliced_offset(pos))
                .unwrap_or_else(|| self.reference.len().saturating_sub(1)),
        }
    }

    /// The unedited spliced sequence in transcript orientation.
    pub fn reference_sequence(&self) -> Vec<u8> {
        match self.strand {
            Strand::Forward => self.reference.clone(),
            Strand::Reverse => reverse_complement(&self.reference),
        }
    }

    pub fn reference_len(&self) -> usize {
        self.reference.len()
    }
}

/// Which of the two copies of a transcript an edit lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptCopy {
    A,
    B,
}

impl TranscriptCopy {
    pub const BOTH: [TranscriptCopy; 2] = [TranscriptCopy::A, TranscriptCopy::B];

    fn index(self) -> usize {
        match self {
            TranscriptCopy::A => 0,
            TranscriptCopy::B => 1,
        }
    }
}

/// An edited copy's materialized sequence with per-base mutation provenance.
///
/// Everything is in transcript orientation: for reverse-strand transcripts
/// the bases are complemented and the provenance follows them.
#[derive(Debug)]
pub struct EditedSequence {
    pub seq: Vec<u8>,
    /// Per base: indices into `edits` of the mutations that produced it.
    /// Bases flanking a deletion junction carry the deletion's index.
    pub provenance: Vec<Vec<u32>>,
    /// Frame-disrupting indels as (first affected offset, edit index).
    pub frameshifts: Vec<(usize, u32)>,
    /// Offset of the original start codon's first base in `seq`.
    pub canonical_start: usize,
    /// The unedited sequence, same orientation, for novelty checks.
    pub reference: Vec<u8>,
    /// The edits applied to this copy, in application order.
    pub edits: Vec<Mutation>,
}

impl EditedSequence {
    /// Whether the triplet at `offset` owes its existence to an edit,
    /// either directly or through a frame-disrupting indel upstream.
    pub fn is_novel_triplet(&self, offset: usize) -> bool {
        if offset + 3 > self.seq.len() {
            return false;
        }
        (offset..offset + 3).any(|i| !self.provenance[i].is_empty())
            || self.frameshifts.iter().any(|&(o, _)| o <= offset + 2)
    }

    /// Offsets of every ATG triplet in the edited sequence.
    pub fn atg_offsets(&self) -> Vec<usize> {
        if self.seq.len() < 3 {
            return Vec::new();
        }
        (0..=self.seq.len() - 3)
            .filter(|&i| &self.seq[i..i + 3] == b"ATG")
            .collect()
    }
}

/// Two independently editable copies of one transcript's coding sequence.
pub struct DiploidTranscript {
    transcript: Transcript,
    copies: [Vec<Mutation>; 2],
}

impl DiploidTranscript {
    pub fn new(transcript: Transcript) -> Self {
        Self {
            transcript,
            copies: [Vec::new(), Vec::new()],
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Record an edit on one copy. Edits are applied in call order when the
    /// copy is materialized; callers supply non-conflicting haplotypes.
    pub fn edit_copy(&mut self, copy: TranscriptCopy, mutation: &Mutation) {
        self.copies[copy.index()].push(mutation.clone());
    }

    /// Record a mutation on each copy its zygosity flags name.
    pub fn apply(&mut self, mutation: &Mutation) {
        if mutation.on_copy_a {
            self.edit_copy(TranscriptCopy::A, mutation);
        }
        if mutation.on_copy_b {
            self.edit_copy(TranscriptCopy::B, mutation);
        }
    }

    /// Discard all edits on both copies, restoring the unedited reference.
    /// Mandatory between haplotypes.
    pub fn reset(&mut self) {
        self.copies[0].clear();
        self.copies[1].clear();
    }

    pub fn edits_on(&self, copy: TranscriptCopy) -> &[Mutation] {
        &self.copies[copy.index()]
    }

    /// Materialize one copy's edited sequence with provenance.
    ///
    /// Edits whose genomic span falls entirely outside the transcript's CDS
    /// footprint are no-ops for that copy.
    pub fn edited_sequence(&self, copy: TranscriptCopy) -> EditedSequence {
        let edits = &self.copies[copy.index()];
        let transcript = &self.transcript;
        let ref_len = transcript.reference.len();

        // Resolve each edit to spliced plus-orientation offsets
        let mut substituted: HashMap<usize, (u8, u32)> = HashMap::new();
        let mut deleted: HashMap<usize, u32> = HashMap::new();
        let mut inserted: HashMap<usize, Vec<(Vec<u8>, u32)>> = HashMap::new();

        for (idx, mutation) in edits.iter().enumerate() {
            let idx = idx as u32;
            match &mutation.edit {
                MutationEdit::Substitution { alt } => {
                    for (i, &base) in alt.as_bytes().iter().enumerate() {
                        if let Some(off) = transcript.spliced_offset(mutation.pos + i as u64) {
                            substituted.insert(off, (base, idx));
                        }
                    }
                }
                MutationEdit::Deletion { len } => {
                    for i in 0..*len as u64 {
                        if let Some(off) = transcript.spliced_offset(mutation.pos + i) {
                            deleted.insert(off, idx);
                        }
                    }
                }
                MutationEdit::Insertion { seq } => {
                    if let Some(off) = transcript.spliced_offset(mutation.pos) {
                        inserted
                            .entry(off)
                            .or_default()
                            .push((seq.as_bytes().to_vec(), idx));
                    }
                }
            }
        }

        let canonical_ref = transcript.canonical_reference_offset();

        let mut seq: Vec<u8> = Vec::with_capacity(ref_len);
        let mut provenance: Vec<Vec<u32>> = Vec::with_capacity(ref_len);
        let mut events: Vec<(usize, u32)> = Vec::new();
        let mut canonical_plus = 0usize;
        // Deletion index -> (junction offset in output, bases skipped)
        let mut junctions: HashMap<u32, (usize, usize)> = HashMap::new();

        for off in 0..ref_len {
            if off == canonical_ref {
                canonical_plus = seq.len();
            }
            if let Some(&idx) = deleted.get(&off) {
                let junction = junctions.entry(idx).or_insert((seq.len(), 0));
                junction.1 += 1;
            } else if let Some(&(base, idx)) = substituted.get(&off) {
                seq.push(base);
                provenance.push(vec![idx]);
            } else {
                seq.push(transcript.reference[off]);
                provenance.push(Vec::new());
            }
            if let Some(blocks) = inserted.get(&off) {
                for (bases, idx) in blocks {
                    let at = seq.len();
                    for &base in bases {
                        seq.push(base);
                        provenance.push(vec![*idx]);
                    }
                    if bases.len() % 3 != 0 {
                        events.push((at, *idx));
                    }
                }
            }
        }

        // Tag the bases flanking each deletion junction, and record
        // frame-disrupting deletions
        for (idx, (junction, skipped)) in junctions {
            if junction > 0 {
                provenance[junction - 1].push(idx);
            }
            if junction < seq.len() {
                provenance[junction].push(idx);
            }
            if skipped % 3 != 0 {
                events.push((junction, idx));
            }
        }

        let (seq, provenance, frameshifts, canonical_start, reference) = match transcript.strand {
            Strand::Forward => (
                seq,
                provenance,
                events,
                canonical_plus,
                transcript.reference.clone(),
            ),
            Strand::Reverse => {
                let len = seq.len();
                let rc_seq = reverse_complement(&seq);
                let mut rc_prov = provenance;
                rc_prov.reverse();
                let rc_events = events
                    .into_iter()
                    .map(|(off, idx)| (len - off, idx))
                    .collect();
                let canonical = len.saturating_sub(canonical_plus + 1);
                (
                    rc_seq,
                    rc_prov,
                    rc_events,
                    canonical,
                    reverse_complement(&transcript.reference),
                )
            }
        };

        EditedSequence {
            seq,
            provenance,
            frameshifts,
            canonical_start,
            reference,
            edits: edits.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Origin;

    fn genome_with(chrom: &str, seq: &[u8]) -> Genome {
        let mut genome = Genome::new();
        genome.insert(chrom.to_string(), seq.to_vec());
        genome
    }

    fn coding(chrom: &str, start: u64, end: u64, strand: Strand) -> CdsSegment {
        CdsSegment {
            chrom: chrom.to_string(),
            start,
            end,
            strand,
            kind: SegmentKind::Coding,
        }
    }

    fn somatic_sub(pos: u64, reference: &str, alt: &str) -> Mutation {
        Mutation {
            chrom: "chr1".to_string(),
            pos,
            reference: reference.to_string(),
            edit: MutationEdit::Substitution {
                alt: alt.to_string(),
            },
            on_copy_a: true,
            on_copy_b: false,
            origin: Origin::Somatic,
            vaf: None,
        }
    }

    // Genomic positions 1..=12 carry ATGGCATGCTAA ("MAC*")
    fn forward_transcript() -> Transcript {
        let genome = genome_with("chr1", b"ATGGCATGCTAA");
        Transcript::from_segments(
            "TX1",
            vec![coding("chr1", 1, 12, Strand::Forward)],
            &genome,
        )
        .unwrap()
    }

    #[test]
    fn test_spliced_offsets_across_gaps() {
        let genome = genome_with("chr1", b"ATGGCATGCTAAGGGCCC");
        let transcript = Transcript::from_segments(
            "TX1",
            vec![
                coding("chr1", 1, 6, Strand::Forward),
                coding("chr1", 13, 18, Strand::Forward),
            ],
            &genome,
        )
        .unwrap();

        assert_eq!(transcript.reference_len(), 12);
        assert_eq!(transcript.spliced_offset(1), Some(0));
        assert_eq!(transcript.spliced_offset(6), Some(5));
        // Intronic position maps nowhere
        assert_eq!(transcript.spliced_offset(7), None);
        // Second segment continues contiguously in spliced space
        assert_eq!(transcript.spliced_offset(13), Some(6));
        assert_eq!(transcript.spliced_offset(18), Some(11));
    }

    #[test]
    fn test_substitution_edits_one_copy_only() {
        let mut diploid = DiploidTranscript::new(forward_transcript());
        diploid.apply(&somatic_sub(4, "G", "T"));

        let copy_a = diploid.edited_sequence(TranscriptCopy::A);
        let copy_b = diploid.edited_sequence(TranscriptCopy::B);
        assert_eq!(copy_a.seq, b"ATGTCATGCTAA");
        assert_eq!(copy_b.seq, b"ATGGCATGCTAA");
        assert_eq!(copy_a.provenance[3], vec![0]);
        assert!(copy_a.provenance[2].is_empty());
    }

    #[test]
    fn test_homozygous_edit_hits_both_copies() {
        let mut diploid = DiploidTranscript::new(forward_transcript());
        let mut mutation = somatic_sub(4, "G", "T");
        mutation.on_copy_b = true;
        diploid.apply(&mutation);

        assert_eq!(diploid.edited_sequence(TranscriptCopy::A).seq, b"ATGTCATGCTAA");
        assert_eq!(diploid.edited_sequence(TranscriptCopy::B).seq, b"ATGTCATGCTAA");
    }

    #[test]
    fn test_reset_restores_reference() {
        let mut diploid = DiploidTranscript::new(forward_transcript());
        diploid.apply(&somatic_sub(4, "G", "T"));
        let mut deletion = somatic_sub(7, "", "");
        deletion.reference = "TG".to_string();
        deletion.edit = MutationEdit::Deletion { len: 2 };
        diploid.apply(&deletion);

        diploid.reset();
        let copy_a = diploid.edited_sequence(TranscriptCopy::A);
        assert_eq!(copy_a.seq, diploid.transcript().reference_sequence());
        assert!(copy_a.provenance.iter().all(|p| p.is_empty()));
        assert!(copy_a.frameshifts.is_empty());
    }

    #[test]
    fn test_deletion_tags_junction_and_frameshift() {
        let mut diploid = DiploidTranscript::new(forward_transcript());
        let mut deletion = somatic_sub(5, "", "");
        deletion.reference = "C".to_string();
        deletion.edit = MutationEdit::Deletion { len: 1 };
        diploid.apply(&deletion);

        let edited = diploid.edited_sequence(TranscriptCopy::A);
        assert_eq!(edited.seq, b"ATGGATGCTAA");
        // Junction flanks carry the deletion
        assert_eq!(edited.provenance[3], vec![0]);
        assert_eq!(edited.provenance[4], vec![0]);
        // One base removed disrupts the frame
        assert_eq!(edited.frameshifts, vec![(4, 0)]);
    }

    #[test]
    fn test_insertion_splices_after_anchor() {
        let mut diploid = DiploidTranscript::new(forward_transcript());
        let mut insertion = somatic_sub(3, "", "");
        insertion.reference = String::new();
        insertion.edit = MutationEdit::Insertion {
            seq: "TTT".to_string(),
        };
        diploid.apply(&insertion);

        let edited = diploid.edited_sequence(TranscriptCopy::A);
        assert_eq!(edited.seq, b"ATGTTTGCATGCTAA");
        assert_eq!(edited.provenance[3], vec![0]);
        assert_eq!(edited.provenance[5], vec![0]);
        // In-frame insertion: no frameshift event
        assert!(edited.frameshifts.is_empty());
    }

    #[test]
    fn test_edit_outside_cds_is_noop() {
        let mut diploid = DiploidTranscript::new(forward_transcript());
        diploid.apply(&somatic_sub(500, "G", "T"));

        let edited = diploid.edited_sequence(TranscriptCopy::A);
        assert_eq!(edited.seq, b"ATGGCATGCTAA");
        assert!(edited.provenance.iter().all(|p| p.is_empty()));
    }

    #[test]
    fn test_reverse_strand_materialization() {
        // Plus strand TTACATGCCAT reverse-complements to ATGGCATGTAA
        let genome = genome_with("chr1", b"TTACATGCCAT");
        let transcript = Transcript::from_segments(
            "TXR",
            vec![coding("chr1", 1, 11, Strand::Reverse)],
            &genome,
        )
        .unwrap();
        assert_eq!(transcript.reference_sequence(), b"ATGGCATGTAA");

        let mut diploid = DiploidTranscript::new(transcript);
        // Substituting plus-strand base at position 7 (G) with A changes the
        // transcript base at offset 4 from C to T
        diploid.apply(&somatic_sub(7, "G", "A"));
        let edited = diploid.edited_sequence(TranscriptCopy::A);
        assert_eq!(edited.seq, b"ATGGTATGTAA");
        assert_eq!(edited.provenance[4], vec![0]);
        assert_eq!(edited.canonical_start, 0);
    }

    #[test]
    fn test_canonical_start_shifts_are_tracked() {
        let transcript = forward_transcript();
        let diploid = DiploidTranscript::new(transcript);
        let edited = diploid.edited_sequence(TranscriptCopy::A);
        assert_eq!(edited.canonical_start, 0);
        assert_eq!(&edited.seq[..3], b"ATG");
    }
}
