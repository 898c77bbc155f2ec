//! Codon translation and ORF start resolution over edited sequences.

use crate::transcript::EditedSequence;
use crate::StartPolicy;
use std::collections::BTreeSet;

/// Standard genetic code indexed by `a * 16 + b * 4 + c` with the bases
/// ordered A, C, G, T. Stops are `*`.
const CODON_TABLE: &[u8; 64] =
    b"KNKNTTTTRSRSIIMIQHQHPPPPRRRRLLLLEDEDAAAAGGGGVVVV*Y*YSSSS*CWCLFLF";

fn base_index(base: u8) -> Option<usize> {
    match base {
        b'A' => Some(0),
        b'C' => Some(1),
        b'G' => Some(2),
        b'T' => Some(3),
        _ => None,
    }
}

/// Translate one codon. Codons with ambiguous bases yield `X`.
pub fn translate_codon(codon: &[u8]) -> u8 {
    match (
        base_index(codon[0]),
        base_index(codon[1]),
        base_index(codon[2]),
    ) {
        (Some(a), Some(b), Some(c)) => CODON_TABLE[a * 16 + b * 4 + c],
        _ => b'X',
    }
}

/// One translated residue with the indices of the edits that shaped it.
#[derive(Debug, Clone)]
pub struct Residue {
    pub aa: u8,
    pub evidence: BTreeSet<u32>,
}

/// Translate an open reading frame starting at `start`, stopping at the
/// first stop codon (excluded) or when fewer than three bases remain.
///
/// A residue's evidence is the union of the per-base provenance of its
/// codon plus every frame-disrupting indel at or upstream of the codon's
/// last base, so frameshifted tails stay attributed to their cause.
pub fn translate_orf(edited: &EditedSequence, start: usize) -> Vec<Residue> {
    let mut residues = Vec::new();
    let mut i = start;

    while i + 3 <= edited.seq.len() {
        let aa = translate_codon(&edited.seq[i..i + 3]);
        if aa == b'*' {
            break;
        }

        let mut evidence = BTreeSet::new();
        for provenance in &edited.provenance[i..i + 3] {
            evidence.extend(provenance.iter().copied());
        }
        for &(offset, idx) in &edited.frameshifts {
            if offset <= i + 2 {
                evidence.insert(idx);
            }
        }

        residues.push(Residue { aa, evidence });
        i += 3;
    }

    residues
}

/// Resolve which start offsets to translate from under a start policy.
///
/// The canonical start is always a valid fallback; an empty result means
/// the copy has no usable reading frame under the policy.
pub fn resolve_starts(edited: &EditedSequence, policy: StartPolicy) -> Vec<usize> {
    let canonical = edited.canonical_start;

    match policy {
        StartPolicy::Reference => vec![canonical],
        StartPolicy::All => edited.atg_offsets(),
        StartPolicy::NovelUpstream => {
            let upstream = edited
                .atg_offsets()
                .into_iter()
                .filter(|&offset| {
                    offset < canonical
                        && (canonical - offset) % 3 == 0
                        && edited.is_novel_triplet(offset)
                })
                .min();
            vec![upstream.unwrap_or(canonical)]
        }
        StartPolicy::DownstreamOnly => {
            if canonical_start_intact(edited) {
                vec![canonical]
            } else {
                edited
                    .atg_offsets()
                    .into_iter()
                    .find(|&offset| offset > canonical)
                    .map(|offset| vec![offset])
                    .unwrap_or_default()
            }
        }
    }
}

/// Whether the canonical start codon survived editing as an untouched ATG.
fn canonical_start_intact(edited: &EditedSequence) -> bool {
    let start = edited.canonical_start;
    if start + 3 > edited.seq.len() {
        return false;
    }
    &edited.seq[start..start + 3] == b"ATG"
        && edited.provenance[start..start + 3]
            .iter()
            .all(|p| p.is_empty())
}
