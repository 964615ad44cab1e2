//! A spatial index over annotated intervals.
//!
//! The [`AnnotationIndex`] answers the question "which annotated intervals
//! cover position X of chromosome Y?" for every read the pipeline sees, so
//! queries are cheap: every chromosome holds two sets of fixed-size
//! [`Bins`](bins::Bins), one for exons (the _transcript_ index) and one for
//! everything else (introns, flanks and repeats), and a query only scans the
//! bin its position falls in.
//!
//! The index is built once with a [`Builder`] and is immutable afterwards. It
//! owns every feature and interval; bins refer to intervals by id. Queries
//! borrow from the index and never allocate, which makes a single index safe
//! to share between any number of threads.

use std::collections::HashMap;
use std::slice;

use crate::annotation::Feature;
use crate::annotation::FeatureId;
use crate::annotation::Interval;
use crate::annotation::LocusId;

pub mod bins;
pub mod builder;
mod markup;

pub use bins::Bins;
pub use builder::Builder;

/// The transcript and non-transcript bins of a single chromosome.
#[derive(Clone, Debug)]
pub struct ChromosomeIndex {
    /// The bins holding exon intervals.
    transcript: Bins,

    /// The bins holding every other interval.
    non_transcript: Bins,
}

impl ChromosomeIndex {
    /// Creates an empty chromosome index.
    pub(crate) fn new(bin_size: u32) -> Self {
        Self {
            transcript: Bins::new(bin_size),
            non_transcript: Bins::new(bin_size),
        }
    }

    /// Registers `interval` under `id` in the bins matching its kind.
    pub(crate) fn insert(&mut self, id: u32, interval: &Interval) {
        let bins = match interval.kind().is_transcript() {
            true => &mut self.transcript,
            false => &mut self.non_transcript,
        };

        bins.insert(id, interval.start(), interval.end());
    }

    /// Gets the bins holding exon intervals.
    pub fn transcript(&self) -> &Bins {
        &self.transcript
    }

    /// Gets the bins holding every other interval.
    pub fn non_transcript(&self) -> &Bins {
        &self.non_transcript
    }
}

/// An iterator over the intervals covering a position.
///
/// No particular order is guaranteed.
#[derive(Clone, Debug)]
pub struct Overlaps<'a> {
    /// The candidate ids from the scanned bin.
    candidates: slice::Iter<'a, u32>,

    /// The interval arena.
    intervals: &'a [Interval],

    /// The queried position.
    position: u32,
}

impl<'a> Iterator for Overlaps<'a> {
    type Item = &'a Interval;

    fn next(&mut self) -> Option<Self::Item> {
        for &id in self.candidates.by_ref() {
            let interval = &self.intervals[id as usize];

            if interval.contains(self.position) {
                return Some(interval);
            }
        }

        None
    }
}

/// An index over the annotated intervals of a genome.
///
/// Generally, you will want to use a [`builder::Builder`] to construct one of
/// these.
#[derive(Debug)]
pub struct AnnotationIndex {
    /// The size of each bin.
    pub(crate) bin_size: u32,

    /// The features, addressed by [`FeatureId`].
    pub(crate) features: Vec<Feature>,

    /// The locus of each feature, parallel to `features`.
    pub(crate) feature_loci: Vec<LocusId>,

    /// The locus names, addressed by [`LocusId`].
    pub(crate) loci: Vec<String>,

    /// The interval arena.
    pub(crate) intervals: Vec<Interval>,

    /// The per-chromosome bins.
    pub(crate) chromosomes: HashMap<String, ChromosomeIndex>,
}

impl AnnotationIndex {
    /// Returns every exon interval on `chromosome` covering `position`,
    /// regardless of strand. An unknown chromosome yields nothing.
    pub fn query_transcript(&self, chromosome: &str, position: u32) -> Overlaps<'_> {
        let bins = self.chromosomes.get(chromosome).map(|c| &c.transcript);
        self.overlaps(bins, position)
    }

    /// Returns every non-exon interval (introns, flanks and repeats) on
    /// `chromosome` covering `position`, regardless of strand. An unknown
    /// chromosome yields nothing.
    pub fn query_nontranscript(&self, chromosome: &str, position: u32) -> Overlaps<'_> {
        let bins = self.chromosomes.get(chromosome).map(|c| &c.non_transcript);
        self.overlaps(bins, position)
    }

    /// Creates an [`Overlaps`] scanning `bins` (if any) at `position`.
    fn overlaps<'a>(&'a self, bins: Option<&'a Bins>, position: u32) -> Overlaps<'a> {
        let candidates = bins.map(|bins| bins.candidates(position)).unwrap_or(&[]);

        Overlaps {
            candidates: candidates.iter(),
            intervals: &self.intervals,
            position,
        }
    }

    /// Gets a feature by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not handed out by this index.
    pub fn feature(&self, id: FeatureId) -> &Feature {
        &self.features[id.get()]
    }

    /// Gets all features.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Gets the locus of a feature.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not handed out by this index.
    pub fn locus_of(&self, id: FeatureId) -> LocusId {
        self.feature_loci[id.get()]
    }

    /// Gets the name of a locus.
    ///
    /// # Panics
    ///
    /// Panics if `locus` was not handed out by this index.
    pub fn locus_name(&self, locus: LocusId) -> &str {
        &self.loci[locus.get()]
    }

    /// Gets the number of distinct loci.
    pub fn num_loci(&self) -> usize {
        self.loci.len()
    }

    /// Gets all intervals.
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Gets the index of a single chromosome.
    pub fn chromosome(&self, name: &str) -> Option<&ChromosomeIndex> {
        self.chromosomes.get(name)
    }

    /// Gets the names of the indexed chromosomes.
    pub fn chromosomes(&self) -> impl Iterator<Item = &str> {
        self.chromosomes.keys().map(String::as_str)
    }

    /// Gets the bin size.
    pub fn bin_size(&self) -> u32 {
        self.bin_size
    }
}

impl std::fmt::Display for AnnotationIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "annotation index: {} features, {} loci, {} intervals, {} chromosomes, bin size {} bp",
            self.features.len(),
            self.loci.len(),
            self.intervals.len(),
            self.chromosomes.len(),
            self.bin_size
        )
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use rand::rngs::StdRng;
    use rand::Rng as _;
    use rand::SeedableRng as _;

    use super::*;
    use crate::annotation::feature;
    use crate::annotation::feature::Exon;
    use crate::annotation::feature::FeatureKind;
    use crate::annotation::AnnotationKind;
    use crate::core::Strand;

    fn transcript(name: &str, strand: Strand, exons: &[(u32, u32)]) -> Feature {
        let mut builder = feature::Builder::default()
            .name(name)
            .unwrap()
            .chromosome("1")
            .unwrap()
            .strand(strand);

        for &(start, end) in exons {
            builder = builder.push_exon(Exon::try_new(start, end).unwrap());
        }

        builder.try_build().unwrap()
    }

    fn repeat(name: &str, start: u32, end: u32) -> Feature {
        feature::Builder::default()
            .name(name)
            .unwrap()
            .chromosome("1")
            .unwrap()
            .kind(FeatureKind::Repeat)
            .push_exon(Exon::try_new(start, end).unwrap())
            .try_build()
            .unwrap()
    }

    fn sorted(overlaps: Overlaps<'_>) -> Vec<(AnnotationKind, u32, u32)> {
        let mut result = overlaps
            .map(|i| (i.kind(), i.start(), i.end()))
            .collect::<Vec<_>>();
        result.sort();
        result
    }

    #[test]
    fn test_single_exon_queries() -> Result<(), Box<dyn std::error::Error>> {
        let index = Builder::default()
            .upstream_flank(0)
            .downstream_flank(0)
            .try_build_from([transcript("G1", Strand::Positive, &[(100, 200)])])?;

        for position in 101..200 {
            let hits = index.query_transcript("1", position).collect::<Vec<_>>();
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].start(), 100);
            assert_eq!(hits[0].end(), 200);
        }

        for position in [0, 99, 201, 5_000, 1_000_000] {
            assert_eq!(index.query_transcript("1", position).count(), 0);
            assert_eq!(index.query_nontranscript("1", position).count(), 0);
        }

        Ok(())
    }

    #[test]
    fn test_every_interval_lands_in_exactly_one_index() -> Result<(), Box<dyn std::error::Error>> {
        let index = Builder::default().try_build_from([
            transcript("G1", Strand::Positive, &[(100, 200), (300, 400)]),
            transcript("G2", Strand::Negative, &[(10_000, 12_000)]),
            repeat("r_L1", 150, 160),
        ])?;

        let chromosome = index.chromosome("1").unwrap();
        let exons = index
            .intervals()
            .iter()
            .filter(|i| i.kind() == AnnotationKind::Exon)
            .count();

        assert_eq!(chromosome.transcript().len(), exons);
        assert_eq!(
            chromosome.transcript().len() + chromosome.non_transcript().len(),
            index.intervals().len()
        );

        assert_eq!(
            sorted(index.query_nontranscript("1", 155)),
            vec![(AnnotationKind::Repeat, 150, 160)]
        );
        assert_eq!(
            sorted(index.query_nontranscript("1", 250)),
            vec![(AnnotationKind::Intron, 201, 299)]
        );

        Ok(())
    }

    #[test]
    fn test_intervals_spanning_bins() -> Result<(), Box<dyn std::error::Error>> {
        let index = Builder::default()
            .bin_size(100)
            .upstream_flank(0)
            .downstream_flank(0)
            .try_build_from([transcript("G1", Strand::Positive, &[(50, 1_050)])])?;

        for position in [50, 99, 100, 555, 1_000, 1_050] {
            assert_eq!(index.query_transcript("1", position).count(), 1);
        }
        assert_eq!(index.query_transcript("1", 1_051).count(), 0);

        Ok(())
    }

    #[test]
    fn test_queries_match_a_linear_scan() -> Result<(), Box<dyn std::error::Error>> {
        let mut rng = StdRng::seed_from_u64(0x5747);
        let mut features = Vec::new();

        for i in 0..200 {
            let start = rng.gen_range(0..1_000_000);
            let len = rng.gen_range(1..50_000);
            let strand = match rng.gen_bool(0.5) {
                true => Strand::Positive,
                false => Strand::Negative,
            };

            features.push(transcript(&format!("G{i}"), strand, &[(start, start + len)]));
        }

        let index = Builder::default().bin_size(10_000).try_build_from(features)?;

        for _ in 0..2_000 {
            let position = rng.gen_range(0..1_100_000);

            let mut expected = index
                .intervals()
                .iter()
                .filter(|i| i.kind().is_transcript() && i.contains(position))
                .map(|i| i.owner())
                .collect::<Vec<_>>();
            expected.sort();

            let mut found = index
                .query_transcript("1", position)
                .map(|i| i.owner())
                .collect::<Vec<_>>();
            found.sort();

            assert_eq!(found, expected);
        }

        Ok(())
    }

    #[test]
    fn test_concurrent_queries_agree() -> Result<(), Box<dyn std::error::Error>> {
        let index = Builder::default().try_build_from([
            transcript("G1", Strand::Positive, &[(100, 200), (300, 400)]),
            transcript("G2", Strand::Negative, &[(150, 350)]),
            repeat("r_L1", 150, 160),
        ])?;

        let positions = (0..2_000).collect::<Vec<u32>>();
        let reference = positions
            .iter()
            .map(|&p| {
                (
                    sorted(index.query_transcript("1", p)),
                    sorted(index.query_nontranscript("1", p)),
                )
            })
            .collect::<Vec<_>>();

        thread::scope(|scope| {
            let handles = (0..4)
                .map(|worker| {
                    let index = &index;
                    let positions = &positions;
                    scope.spawn(move || {
                        positions
                            .iter()
                            .rev()
                            .skip(worker)
                            .map(|&p| {
                                (
                                    p,
                                    sorted(index.query_transcript("1", p)),
                                    sorted(index.query_nontranscript("1", p)),
                                )
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect::<Vec<_>>();

            for handle in handles {
                for (p, transcript, non_transcript) in handle.join().unwrap() {
                    assert_eq!(reference[p as usize].0, transcript);
                    assert_eq!(reference[p as usize].1, non_transcript);
                }
            }
        });

        Ok(())
    }

    #[test]
    fn test_display() -> Result<(), Box<dyn std::error::Error>> {
        let index = Builder::default()
            .upstream_flank(0)
            .downstream_flank(0)
            .try_build_from([transcript("G1", Strand::Positive, &[(100, 200)])])?;

        assert_eq!(
            index.to_string(),
            "annotation index: 1 features, 1 loci, 1 intervals, 1 chromosomes, bin size 30000 bp"
        );
        Ok(())
    }
}
