//! Crediting reads to annotated features.
//!
//! The [`MappingAdder`] takes every candidate alignment of one read, decides
//! which of them (if any) are credited to transcripts under the configured
//! [`AssignmentPolicy`], and forwards each credited alignment to a
//! [`DedupFilter`]. The filter decides whether the alignment's molecular
//! signature was seen before, which the adder tallies per barcode.
//!
//! The decision proceeds as follows:
//!
//! 1. A multi-read is _vetoed_ when one of its alignments falls within a
//!    repeat while one of its alignments is not exonic. Nothing is forwarded
//!    for a vetoed read.
//! 2. Every alignment is matched against the annotation. Under the "all
//!    exons" policies, every transcript-matching alignment is forwarded.
//!    Under the "most 5'" policies, only the single alignment whose match
//!    lies closest to a transcript 5' end (across all alignments) is.
//! 3. When shared genes are tracked, the loci touched by any exonic
//!    alignment of the read travel with the forwarded alignments.
//! 4. A read without any transcript match is forwarded once, as a
//!    non-annotated alignment, using its first candidate.

use std::collections::BTreeSet;

use tracing::debug;

use crate::annotation::Interval;
use crate::annotation::LocusId;
use crate::mapping::AssignmentPolicy;
use crate::mapping::MultiReadMapping;
use crate::mapping::MultiReadMappings;
use crate::matching::Matcher;
use crate::matching::Matches;

////////////////////////////////////////////////////////////////////////////////////////
// Assignments
////////////////////////////////////////////////////////////////////////////////////////

/// An alignment forwarded to a [`DedupFilter`].
#[derive(Clone, Copy, Debug)]
pub struct Assignment<'a> {
    /// The credited alignment.
    mapping: &'a MultiReadMapping,

    /// The exons the alignment is credited to (empty when non-annotated).
    hits: &'a [&'a Interval],

    /// Whether the alignment position was ambiguous among several exons.
    has_variants: bool,

    /// The loci touched by the read, if tracked.
    shared_loci: Option<&'a BTreeSet<LocusId>>,
}

impl<'a> Assignment<'a> {
    /// Gets the credited alignment.
    pub fn mapping(&self) -> &'a MultiReadMapping {
        self.mapping
    }

    /// Gets the exons the alignment is credited to.
    pub fn hits(&self) -> &'a [&'a Interval] {
        self.hits
    }

    /// Whether the alignment is credited to any exon.
    pub fn is_annotated(&self) -> bool {
        !self.hits.is_empty()
    }

    /// Whether the alignment position was ambiguous among several exons.
    pub fn has_variants(&self) -> bool {
        self.has_variants
    }

    /// Gets the loci touched by any exonic alignment of the read, when the
    /// policy tracks them.
    pub fn shared_loci(&self) -> Option<&'a BTreeSet<LocusId>> {
        self.shared_loci
    }
}

/// A molecule deduplication filter.
pub trait DedupFilter {
    /// Records an assignment.
    ///
    /// Returns `true` if the molecular signature of the assignment (position,
    /// strand, barcode and UMI) was not observed before.
    fn add(&mut self, assignment: &Assignment<'_>) -> bool;
}

////////////////////////////////////////////////////////////////////////////////////////
// Counters
////////////////////////////////////////////////////////////////////////////////////////

/// Per-barcode read tallies.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ReadCounters {
    /// Reads with at least one newly observed signature.
    unique: Vec<u64>,

    /// Reads whose every signature was already observed.
    duplicate: Vec<u64>,

    /// Reads vetoed because of a repeat alignment.
    vetoed: Vec<u64>,
}

/// Increments `counts[barcode]`, growing `counts` as needed.
fn bump(counts: &mut Vec<u64>, barcode: usize) {
    if counts.len() <= barcode {
        counts.resize(barcode + 1, 0);
    }

    counts[barcode] += 1;
}

/// Adds `other` onto `counts` element-wise.
fn add_all(counts: &mut Vec<u64>, other: &[u64]) {
    if counts.len() < other.len() {
        counts.resize(other.len(), 0);
    }

    for (count, value) in counts.iter_mut().zip(other) {
        *count += value;
    }
}

impl ReadCounters {
    /// Records the outcome of a forwarded read.
    fn record(&mut self, barcode: usize, is_new: bool) {
        match is_new {
            true => bump(&mut self.unique, barcode),
            false => bump(&mut self.duplicate, barcode),
        }
    }

    /// Records a vetoed read.
    fn record_vetoed(&mut self, barcode: usize) {
        bump(&mut self.vetoed, barcode);
    }

    /// Gets the number of reads with a newly observed signature.
    pub fn unique(&self, barcode: usize) -> u64 {
        self.unique.get(barcode).copied().unwrap_or_default()
    }

    /// Gets the number of reads that duplicate an earlier signature.
    pub fn duplicate(&self, barcode: usize) -> u64 {
        self.duplicate.get(barcode).copied().unwrap_or_default()
    }

    /// Gets the number of reads vetoed because of a repeat alignment.
    pub fn vetoed(&self, barcode: usize) -> u64 {
        self.vetoed.get(barcode).copied().unwrap_or_default()
    }

    /// Gets one past the highest barcode index seen.
    pub fn num_barcodes(&self) -> usize {
        self.unique
            .len()
            .max(self.duplicate.len())
            .max(self.vetoed.len())
    }

    /// Gets the total number of reads seen.
    pub fn total(&self) -> u64 {
        [&self.unique, &self.duplicate, &self.vetoed]
            .into_iter()
            .flatten()
            .sum()
    }

    /// Adds the tallies of `other` to these.
    pub fn merge(&mut self, other: &ReadCounters) {
        add_all(&mut self.unique, &other.unique);
        add_all(&mut self.duplicate, &other.duplicate);
        add_all(&mut self.vetoed, &other.vetoed);
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Adder
////////////////////////////////////////////////////////////////////////////////////////

/// Credits reads to annotated features and forwards them to a
/// [`DedupFilter`].
///
/// An adder holds the only mutable state of read processing. Workers sharing
/// one index should each own an adder and [merge](ReadCounters::merge) their
/// counters afterwards.
#[derive(Debug)]
pub struct MappingAdder<'a, F> {
    /// The annotation matcher.
    matcher: Matcher<'a>,

    /// The assignment policy.
    policy: AssignmentPolicy,

    /// The deduplication filter.
    filter: F,

    /// The per-barcode tallies.
    counters: ReadCounters,
}

impl<'a, F> MappingAdder<'a, F>
where
    F: DedupFilter,
{
    /// Creates a new [`MappingAdder`].
    pub fn new(matcher: Matcher<'a>, policy: AssignmentPolicy, filter: F) -> Self {
        Self {
            matcher,
            policy,
            filter,
            counters: ReadCounters::default(),
        }
    }

    /// Credits one read.
    ///
    /// Returns whether any alignment of the read was credited to a
    /// transcript.
    pub fn add(&mut self, mappings: &MultiReadMappings) -> bool {
        let barcode = mappings.barcode();

        if mappings.is_multi() && self.is_vetoed(mappings) {
            debug!(
                "vetoed multi-read with {} mappings at {}:{}: repeat alignment",
                mappings.n_mappings(),
                mappings.first().chromosome(),
                mappings.first().position()
            );
            self.counters.record_vetoed(barcode);
            return false;
        }

        let strategy = self.policy.strategy();
        let tracks_shared = self.policy.tracks_shared_genes();

        let mut shared = BTreeSet::new();
        let mut matched: Vec<(&MultiReadMapping, Matches<'a>)> = Vec::new();

        for mapping in mappings.iter() {
            let (chromosome, strand, position) =
                (mapping.chromosome(), mapping.strand(), mapping.position());

            let matches = strategy.transcript_matches(&self.matcher, chromosome, strand, position);
            if matches.is_empty() {
                continue;
            }

            if tracks_shared {
                let index = self.matcher.index();
                shared.extend(
                    self.matcher
                        .sense_transcripts(chromosome, strand, position)
                        .map(|interval| index.locus_of(interval.owner())),
                );
            }

            matched.push((mapping, matches));
        }

        if matched.is_empty() {
            let assignment = Assignment {
                mapping: mappings.first(),
                hits: &[],
                has_variants: false,
                shared_loci: None,
            };

            let is_new = self.filter.add(&assignment);
            self.counters.record(barcode, is_new);
            return false;
        }

        if self.policy.uses_most_5prime() {
            let mut best: Option<(u32, usize)> = None;

            for (i, (mapping, matches)) in matched.iter().enumerate() {
                let Some(offset) = matches.best_transcript_pos(mapping.position()) else {
                    continue;
                };

                match best {
                    Some((best_offset, _)) if offset >= best_offset => {}
                    _ => best = Some((offset, i)),
                }
            }

            let winner = best.map(|(_, i)| i).unwrap_or_default();
            matched.swap(0, winner);
            matched.truncate(1);
        }

        let shared_loci = tracks_shared.then_some(&shared);
        let mut any_new = false;

        for (mapping, matches) in &matched {
            let assignment = Assignment {
                mapping: *mapping,
                hits: matches.intervals(),
                has_variants: matches.has_variants(),
                shared_loci,
            };

            any_new |= self.filter.add(&assignment);
        }

        self.counters.record(barcode, any_new);
        true
    }

    /// Whether a multi-read must not be credited to any transcript: some
    /// alignment falls within a repeat and some alignment is not exonic.
    fn is_vetoed(&self, mappings: &MultiReadMappings) -> bool {
        let mut in_repeat = false;
        let mut off_transcript = false;

        for mapping in mappings.iter() {
            let (chromosome, strand, position) =
                (mapping.chromosome(), mapping.strand(), mapping.position());

            in_repeat |= self.matcher.has_repeat_match(chromosome, position);
            off_transcript |= !self.matcher.is_transcript(chromosome, strand, position);

            if in_repeat && off_transcript {
                return true;
            }
        }

        false
    }

    /// Gets the matcher.
    pub fn matcher(&self) -> &Matcher<'a> {
        &self.matcher
    }

    /// Gets the assignment policy.
    pub fn policy(&self) -> AssignmentPolicy {
        self.policy
    }

    /// Gets the deduplication filter.
    pub fn filter(&self) -> &F {
        &self.filter
    }

    /// Gets the per-barcode tallies.
    pub fn counters(&self) -> &ReadCounters {
        &self.counters
    }

    /// Consumes `self` to return the deduplication filter and the tallies.
    pub fn into_parts(self) -> (F, ReadCounters) {
        (self.filter, self.counters)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::annotation::feature;
    use crate::annotation::feature::Exon;
    use crate::annotation::feature::FeatureKind;
    use crate::annotation::Feature;
    use crate::core::Strand;
    use crate::index;
    use crate::index::AnnotationIndex;

    #[derive(Debug, PartialEq)]
    struct Call {
        position: u32,
        owners: Vec<String>,
        has_variants: bool,
        shared: Option<usize>,
    }

    /// Records every assignment and deduplicates on position, strand,
    /// barcode and UMI.
    #[derive(Debug, Default)]
    struct Recorder<'i> {
        index: Option<&'i AnnotationIndex>,
        seen: HashSet<(String, u32, Strand, usize, u32)>,
        calls: Vec<Call>,
    }

    impl DedupFilter for Recorder<'_> {
        fn add(&mut self, assignment: &Assignment<'_>) -> bool {
            let mapping = assignment.mapping();
            let mut owners = assignment
                .hits()
                .iter()
                .filter_map(|i| self.index.map(|index| index.feature(i.owner()).name().to_string()))
                .collect::<Vec<_>>();
            owners.sort();

            self.calls.push(Call {
                position: mapping.position(),
                owners,
                has_variants: assignment.has_variants(),
                shared: assignment.shared_loci().map(BTreeSet::len),
            });

            self.seen.insert((
                mapping.chromosome().to_string(),
                mapping.position(),
                mapping.strand(),
                mapping.barcode(),
                mapping.umi(),
            ))
        }
    }

    fn transcript(name: &str, locus: &str, exons: &[(u32, u32)]) -> Feature {
        let mut builder = feature::Builder::default()
            .name(name)
            .unwrap()
            .locus(locus)
            .chromosome("1")
            .unwrap()
            .strand(Strand::Positive);

        for &(start, end) in exons {
            builder = builder.push_exon(Exon::try_new(start, end).unwrap());
        }

        builder.try_build().unwrap()
    }

    fn repeat(start: u32, end: u32) -> Feature {
        feature::Builder::default()
            .name("r_L1")
            .unwrap()
            .chromosome("1")
            .unwrap()
            .kind(FeatureKind::Repeat)
            .push_exon(Exon::try_new(start, end).unwrap())
            .try_build()
            .unwrap()
    }

    fn build(features: Vec<Feature>) -> AnnotationIndex {
        index::Builder::default()
            .upstream_flank(0)
            .downstream_flank(0)
            .try_build_from(features)
            .unwrap()
    }

    fn new_adder<'i>(
        index: &'i AnnotationIndex,
        policy: AssignmentPolicy,
    ) -> MappingAdder<'i, Recorder<'i>> {
        let filter = Recorder {
            index: Some(index),
            ..Default::default()
        };

        MappingAdder::new(Matcher::new(index, true), policy, filter)
    }

    fn at(position: u32) -> MultiReadMapping {
        MultiReadMapping::new("1", Strand::Positive, position, 50, 0, 42)
    }

    fn multi(positions: &[u32]) -> MultiReadMappings {
        MultiReadMappings::try_new(
            positions.iter().map(|&p| at(p)).collect(),
            positions.len(),
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_reference_layout() {
        let index = build(vec![transcript("G1", "G1", &[(100, 200)]), repeat(150, 160)]);

        for policy in [AssignmentPolicy::AllExons, AssignmentPolicy::Most5PrimeExon] {
            let mut adder = new_adder(&index, policy);

            // The veto only applies to multi-reads.
            assert!(adder.add(&MultiReadMappings::single(at(150))));
            assert_eq!(adder.filter().calls.len(), 1);
            assert_eq!(adder.filter().calls[0].owners, vec!["G1"]);

            assert!(!adder.add(&multi(&[150, 5_000])));
            assert_eq!(adder.filter().calls.len(), 1);

            assert_eq!(adder.counters().unique(0), 1);
            assert_eq!(adder.counters().vetoed(0), 1);
        }
    }

    #[test]
    fn test_repeat_veto_forwards_nothing() {
        let index = build(vec![
            transcript("G1", "G1", &[(100, 200)]),
            repeat(1_000, 1_100),
        ]);
        let mut adder = new_adder(&index, AssignmentPolicy::AllExons);

        assert!(!adder.add(&multi(&[1_050, 150])));
        assert!(!adder.add(&multi(&[150, 1_050])));
        assert!(adder.filter().calls.is_empty());
        assert_eq!(adder.counters().vetoed(0), 2);
    }

    #[test]
    fn test_truncated_alignments_count_as_multi_reads() {
        let index = build(vec![repeat(1_000, 1_100)]);
        let mut adder = new_adder(&index, AssignmentPolicy::AllExons);

        let mappings = MultiReadMappings::try_new(vec![at(1_050)], 1, true).unwrap();
        assert!(!adder.add(&mappings));
        assert!(adder.filter().calls.is_empty());
    }

    #[test]
    fn test_repeats_within_exons_of_every_alignment_are_not_vetoed() {
        let index = build(vec![
            transcript("G1", "G1", &[(100, 200)]),
            transcript("G2", "G2", &[(5_000, 6_000)]),
            repeat(150, 160),
        ]);
        let mut adder = new_adder(&index, AssignmentPolicy::AllExons);

        assert!(adder.add(&multi(&[150, 5_500])));
        assert_eq!(adder.filter().calls.len(), 2);
    }

    #[test]
    fn test_all_exons_forwards_every_matching_alignment() {
        let index = build(vec![
            transcript("G1", "G1", &[(100, 200)]),
            transcript("G2", "G2", &[(5_000, 6_000)]),
        ]);
        let mut adder = new_adder(&index, AssignmentPolicy::AllExons);

        assert!(adder.add(&multi(&[150, 5_500, 9_000])));

        let positions = adder
            .filter()
            .calls
            .iter()
            .map(|c| c.position)
            .collect::<Vec<_>>();
        assert_eq!(positions, vec![150, 5_500]);
        assert!(adder.filter().calls.iter().all(|c| c.shared.is_none()));
    }

    #[test]
    fn test_most_5_prime_picks_the_global_best() {
        let index = build(vec![
            transcript("G1", "G1", &[(100, 1_000)]),
            transcript("G2", "G2", &[(5_000, 6_000)]),
        ]);

        for positions in [[110, 5_200], [5_200, 110]] {
            let mut adder = new_adder(&index, AssignmentPolicy::Most5PrimeExon);

            assert!(adder.add(&multi(&positions)));
            assert_eq!(
                adder.filter().calls,
                vec![Call {
                    position: 110,
                    owners: vec![String::from("G1")],
                    has_variants: false,
                    shared: None,
                }]
            );
        }
    }

    #[test]
    fn test_shared_genes_are_tracked_by_locus() {
        let index = build(vec![
            transcript("G1", "G1", &[(100, 200)]),
            transcript("G1_v2", "G1", &[(120, 220)]),
            transcript("G2", "G2", &[(5_000, 6_000)]),
        ]);

        let mut adder = new_adder(&index, AssignmentPolicy::AllExonsTrackingSharedGenes);
        assert!(adder.add(&multi(&[150, 5_500])));
        assert!(adder.filter().calls.iter().all(|c| c.shared == Some(2)));

        let mut adder = new_adder(&index, AssignmentPolicy::AllExonsTrackingSharedGenes);
        assert!(adder.add(&MultiReadMappings::single(at(150))));
        assert_eq!(adder.filter().calls[0].shared, Some(1));
        assert_eq!(adder.filter().calls[0].owners, vec!["G1", "G1_v2"]);
        assert!(adder.filter().calls[0].has_variants);

        // Every touched locus is tracked even when a single alignment wins.
        let mut adder = new_adder(&index, AssignmentPolicy::Most5PrimeExonTrackingSharedGenes);
        assert!(adder.add(&multi(&[150, 5_500])));
        assert_eq!(adder.filter().calls.len(), 1);
        assert_eq!(adder.filter().calls[0].shared, Some(2));
    }

    #[test]
    fn test_unmatched_reads_are_forwarded_once() {
        let index = build(vec![transcript("G1", "G1", &[(100, 200)])]);
        let mut adder = new_adder(&index, AssignmentPolicy::Most5PrimeExon);

        assert!(!adder.add(&multi(&[7_000, 8_000])));
        assert_eq!(
            adder.filter().calls,
            vec![Call {
                position: 7_000,
                owners: Vec::new(),
                has_variants: false,
                shared: None,
            }]
        );
    }

    #[test]
    fn test_duplicates_are_counted() {
        let index = build(vec![transcript("G1", "G1", &[(100, 200)])]);
        let mut adder = new_adder(&index, AssignmentPolicy::AllExons);

        assert!(adder.add(&MultiReadMappings::single(at(150))));
        assert!(adder.add(&MultiReadMappings::single(at(150))));

        let (filter, counters) = adder.into_parts();
        assert_eq!(filter.calls.len(), 2);
        assert_eq!(counters.unique(0), 1);
        assert_eq!(counters.duplicate(0), 1);
        assert_eq!(counters.total(), 2);
    }

    #[test]
    fn test_counters_merge() {
        let mut a = ReadCounters::default();
        a.record(0, true);
        a.record(2, false);

        let mut b = ReadCounters::default();
        b.record(0, true);
        b.record_vetoed(5);

        a.merge(&b);
        assert_eq!(a.unique(0), 2);
        assert_eq!(a.duplicate(2), 1);
        assert_eq!(a.vetoed(5), 1);
        assert_eq!(a.num_barcodes(), 6);
        assert_eq!(a.total(), 4);
    }
}
