//! Genomic interval index mapping coordinate ranges to transcripts.
//!
//! One augmented interval tree per chromosome, built once from all
//! transcripts' CDS spans and read-only afterwards. Overlap queries use
//! half-open `[start, end)` semantics; concurrent reads are safe.

use crate::transcript::CdsSegment;
use std::collections::{BTreeSet, HashMap};

/// A coordinate range with an associated payload.
#[derive(Debug, Clone)]
pub struct Interval<T> {
    /// Start coordinate (inclusive).
    pub start: u64,
    /// End coordinate (exclusive).
    pub end: u64,
    pub data: T,
}

impl<T> Interval<T> {
    pub fn new(start: u64, end: u64, data: T) -> Self {
        Self { start, end, data }
    }

    fn overlaps(&self, start: u64, end: u64) -> bool {
        self.start < end && self.end > start
    }
}

#[derive(Debug)]
struct Node<T> {
    interval: Interval<T>,
    /// Maximum end coordinate in this subtree, for pruning.
    max_end: u64,
    left: Option<Box<Node<T>>>,
    right: Option<Box<Node<T>>>,
}

/// A static augmented interval tree. Built once, queried many times.
#[derive(Debug)]
pub struct IntervalTree<T> {
    root: Option<Box<Node<T>>>,
    len: usize,
}

impl<T> IntervalTree<T> {
    /// Build a balanced tree from unsorted intervals. O(n log n).
    pub fn build(mut intervals: Vec<Interval<T>>) -> Self {
        intervals.sort_by_key(|iv| iv.start);
        let len = intervals.len();
        let root = build_balanced(intervals);
        Self { root, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All intervals overlapping the half-open range `[start, end)`.
    pub fn query(&self, start: u64, end: u64) -> Vec<&Interval<T>> {
        let mut results = Vec::new();
        if let Some(root) = &self.root {
            collect_overlaps(root, start, end, &mut results);
        }
        results
    }
}

fn build_balanced<T>(mut sorted: Vec<Interval<T>>) -> Option<Box<Node<T>>> {
    if sorted.is_empty() {
        return None;
    }
    let mid = sorted.len() / 2;
    let right_half = sorted.split_off(mid + 1);
    let interval = sorted.pop()?;
    let left = build_balanced(sorted);
    let right = build_balanced(right_half);

    let mut max_end = interval.end;
    if let Some(l) = &left {
        max_end = max_end.max(l.max_end);
    }
    if let Some(r) = &right {
        max_end = max_end.max(r.max_end);
    }

    Some(Box::new(Node {
        interval,
        max_end,
        left,
        right,
    }))
}

fn collect_overlaps<'a, T>(
    node: &'a Node<T>,
    start: u64,
    end: u64,
    results: &mut Vec<&'a Interval<T>>,
) {
    // No interval in this subtree ends after the query start
    if node.max_end <= start {
        return;
    }

    if let Some(left) = &node.left {
        collect_overlaps(left, start, end, results);
    }

    if node.interval.overlaps(start, end) {
        results.push(&node.interval);
    }

    // Right subtree only holds larger starts
    if node.interval.start < end {
        if let Some(right) = &node.right {
            collect_overlaps(right, start, end, results);
        }
    }
}

/// Read-only index from (chromosome, position range) to transcript ids.
#[derive(Debug)]
pub struct TranscriptIndex {
    trees: HashMap<String, IntervalTree<String>>,
}

impl TranscriptIndex {
    /// Build one interval tree per chromosome from per-transcript CDS lists.
    ///
    /// Segment coordinates are 1-based inclusive; the index stores them as
    /// half-open intervals.
    pub fn build(cds: &HashMap<String, Vec<CdsSegment>>) -> Self {
        let mut per_chrom: HashMap<String, Vec<Interval<String>>> = HashMap::new();

        for (transcript_id, segments) in cds {
            for segment in segments {
                per_chrom
                    .entry(segment.chrom.clone())
                    .or_default()
                    .push(Interval::new(
                        segment.start,
                        segment.end + 1,
                        transcript_id.clone(),
                    ));
            }
        }

        let trees = per_chrom
            .into_iter()
            .map(|(chrom, intervals)| (chrom, IntervalTree::build(intervals)))
            .collect();

        TranscriptIndex { trees }
    }

    /// All transcripts whose CDS footprint intersects `[start, end)` on the
    /// given chromosome. Empty when nothing overlaps; never an error.
    pub fn query(&self, chrom: &str, start: u64, end: u64) -> BTreeSet<String> {
        match self.trees.get(chrom) {
            Some(tree) => tree
                .query(start, end)
                .into_iter()
                .map(|iv| iv.data.clone())
                .collect(),
            None => BTreeSet::new(),
        }
    }

    /// Number of indexed chromosomes.
    pub fn num_chromosomes(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{SegmentKind, Strand};

    fn iv(start: u64, end: u64) -> Interval<()> {
        Interval::new(start, end, ())
    }

    fn segment(chrom: &str, start: u64, end: u64) -> CdsSegment {
        CdsSegment {
            chrom: chrom.to_string(),
            start,
            end,
            strand: Strand::Forward,
            kind: SegmentKind::Coding,
        }
    }

    #[test]
    fn test_empty_tree() {
        let tree: IntervalTree<()> = IntervalTree::build(vec![]);
        assert!(tree.is_empty());
        assert!(tree.query(0, 100).is_empty());
    }

    #[test]
    fn test_half_open_semantics() {
        let tree = IntervalTree::build(vec![iv(10, 20)]);
        assert_eq!(tree.query(5, 15).len(), 1);
        assert_eq!(tree.query(19, 25).len(), 1);
        assert_eq!(tree.query(0, 10).len(), 0); // abutting left
        assert_eq!(tree.query(20, 30).len(), 0); // abutting right
    }

    #[test]
    fn test_query_matches_linear_scan() {
        let intervals = vec![
            iv(5, 15),
            iv(10, 25),
            iv(20, 35),
            iv(30, 45),
            iv(0, 100),
            iv(50, 60),
            iv(70, 80),
        ];
        let tree = IntervalTree::build(intervals.clone());

        for start in (0..100).step_by(7) {
            for end in (start + 1..110).step_by(11) {
                let tree_count = tree.query(start, end).len();
                let linear_count = intervals
                    .iter()
                    .filter(|iv| iv.start < end && iv.end > start)
                    .count();
                assert_eq!(tree_count, linear_count, "query [{}, {})", start, end);
            }
        }
    }

    #[test]
    fn test_transcript_attribution() {
        let mut cds = HashMap::new();
        cds.insert("TX1".to_string(), vec![segment("chr1", 90, 119)]);
        cds.insert("TX2".to_string(), vec![segment("chr1", 200, 209)]);
        let index = TranscriptIndex::build(&cds);

        // Mutation span [100, 105) hits TX1 only
        let hits = index.query("chr1", 100, 105);
        assert_eq!(hits.len(), 1);
        assert!(hits.contains("TX1"));

        // Non-overlapping span hits nothing
        assert!(index.query("chr1", 150, 160).is_empty());

        // Unknown chromosome is empty, not an error
        assert!(index.query("chrX", 100, 105).is_empty());
    }

    #[test]
    fn test_multi_segment_transcript_deduplicated() {
        let mut cds = HashMap::new();
        cds.insert(
            "TX1".to_string(),
            vec![segment("chr1", 100, 150), segment("chr1", 160, 200)],
        );
        let index = TranscriptIndex::build(&cds);

        // A span crossing both segments reports the transcript once
        let hits = index.query("chr1", 140, 170);
        assert_eq!(hits.len(), 1);
    }
}
