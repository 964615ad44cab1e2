//! Build-time markup of features against neighbouring loci.
//!
//! Transcript spans are loaded into one [`lapper::Lapper`] per chromosome.
//! Each transcript then records which other loci overlap it, and its flanks
//! are shortened so that they stop short of any other locus.

use std::collections::HashMap;

use rust_lapper as lapper;

use crate::annotation::Feature;
use crate::annotation::LocusId;
use crate::core::Strand;

/// The inner value of the span lookup data structure.
type Iv = lapper::Interval<u32, LocusId>;

/// The flank and extension lengths requested for every transcript.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Settings {
    /// The requested upstream flank length.
    pub upstream_flank: u32,

    /// The requested downstream flank length.
    pub downstream_flank: u32,

    /// The 5' extension of the first exon.
    pub five_prime_extension: u32,
}

/// Attaches flank lengths, 5' extensions and overlapping loci to every
/// transcript in `features`. `feature_loci` is parallel to `features`.
pub(crate) fn mark_up(
    features: &mut [Feature],
    feature_loci: &[LocusId],
    loci: &[String],
    settings: Settings,
) {
    let mut spans = HashMap::<String, Vec<Iv>>::new();

    for (feature, &locus) in features.iter().zip(feature_loci) {
        if feature.is_repeat() {
            continue;
        }

        spans
            .entry(feature.chromosome().to_string())
            .or_default()
            .push(lapper::Interval {
                start: feature.start(),
                stop: feature.end().saturating_add(1),
                val: locus,
            });
    }

    let lappers = spans
        .into_iter()
        .map(|(chromosome, ivs)| (chromosome, lapper::Lapper::new(ivs)))
        .collect::<HashMap<_, _>>();

    for (feature, &locus) in features.iter_mut().zip(feature_loci) {
        if feature.is_repeat() {
            continue;
        }

        let Some(spans) = lappers.get(feature.chromosome()) else {
            continue;
        };

        let mut overlapping = spans
            .find(feature.start(), feature.end().saturating_add(1))
            .filter(|iv| iv.val != locus)
            .map(|iv| loci[iv.val.get()].clone())
            .collect::<Vec<_>>();
        overlapping.sort();
        overlapping.dedup();

        let extension = settings.five_prime_extension;
        let strand = feature.strand().unwrap_or(Strand::Positive);

        let (upstream, downstream) = match strand {
            Strand::Positive => {
                let low = feature.start().saturating_sub(extension);
                (
                    room_below(spans, locus, low, settings.upstream_flank),
                    room_above(spans, locus, feature.end(), settings.downstream_flank),
                )
            }
            Strand::Negative => {
                let high = feature.end().saturating_add(extension);
                (
                    room_above(spans, locus, high, settings.upstream_flank),
                    room_below(spans, locus, feature.start(), settings.downstream_flank),
                )
            }
        };

        feature.set_flanks(upstream, downstream);
        feature.set_five_prime_extension(extension);
        feature.set_overlapping_loci(overlapping);
    }
}

/// Gets how many positions (at most `length`) a flank ending just below `low`
/// can cover without entering a locus other than `locus`.
fn room_below(spans: &lapper::Lapper<u32, LocusId>, locus: LocusId, low: u32, length: u32) -> u32 {
    if length == 0 || low == 0 {
        return 0;
    }

    let first = low.saturating_sub(length);

    let boundary = spans
        .find(first, low)
        .filter(|iv| iv.val != locus)
        .map(|iv| iv.stop.min(low))
        .fold(first, u32::max);

    low - boundary
}

/// Gets how many positions (at most `length`) a flank starting just above
/// `high` can cover without entering a locus other than `locus`.
fn room_above(spans: &lapper::Lapper<u32, LocusId>, locus: LocusId, high: u32, length: u32) -> u32 {
    if length == 0 || high == u32::MAX {
        return 0;
    }

    let last = high.saturating_add(length);

    let boundary = spans
        .find(high + 1, last.saturating_add(1))
        .filter(|iv| iv.val != locus)
        .map(|iv| iv.start.max(high + 1) - 1)
        .fold(last, u32::min);

    boundary - high
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::feature::Builder;
    use crate::annotation::feature::Exon;
    use crate::annotation::feature::FeatureKind;

    fn feature(name: &str, strand: Strand, start: u32, end: u32) -> Feature {
        Builder::default()
            .name(name)
            .unwrap()
            .chromosome("chr1")
            .unwrap()
            .strand(strand)
            .push_exon(Exon::try_new(start, end).unwrap())
            .try_build()
            .unwrap()
    }

    fn settings(flank: u32) -> Settings {
        Settings {
            upstream_flank: flank,
            downstream_flank: flank,
            five_prime_extension: 0,
        }
    }

    fn loci(n: usize) -> (Vec<LocusId>, Vec<String>) {
        (
            (0..n).map(LocusId::new).collect(),
            (0..n).map(|i| format!("L{i}")).collect(),
        )
    }

    #[test]
    fn test_unobstructed_flanks() {
        let mut features = vec![feature("A", Strand::Positive, 1_000, 2_000)];
        let (ids, names) = loci(1);

        mark_up(&mut features, &ids, &names, settings(500));

        assert_eq!(features[0].upstream_flank(), 500);
        assert_eq!(features[0].downstream_flank(), 500);
        assert!(features[0].overlapping_loci().is_empty());
    }

    #[test]
    fn test_flanks_stop_at_neighbours() {
        let mut features = vec![
            feature("A", Strand::Positive, 1_000, 2_000),
            feature("B", Strand::Negative, 2_100, 3_000),
            feature("C", Strand::Positive, 0, 899),
        ];
        let (ids, names) = loci(3);

        mark_up(&mut features, &ids, &names, settings(500));

        // A: upstream is bounded by C (ends at 899), downstream by B (starts at 2100).
        assert_eq!(features[0].upstream_flank(), 100);
        assert_eq!(features[0].downstream_flank(), 99);

        // B is on the negative strand: its downstream flank faces A.
        assert_eq!(features[1].downstream_flank(), 99);
        assert_eq!(features[1].upstream_flank(), 500);

        // C starts at 0 and has no room upstream.
        assert_eq!(features[2].upstream_flank(), 0);
    }

    #[test]
    fn test_overlapping_loci() {
        let mut features = vec![
            feature("A", Strand::Positive, 1_000, 2_000),
            feature("A_v2", Strand::Positive, 1_500, 2_500),
            feature("B", Strand::Negative, 1_900, 3_000),
        ];
        let ids = vec![LocusId::new(0), LocusId::new(0), LocusId::new(1)];
        let names = vec![String::from("A"), String::from("B")];

        mark_up(&mut features, &ids, &names, settings(100));

        assert_eq!(features[0].overlapping_loci(), &[String::from("B")]);
        assert_eq!(features[1].overlapping_loci(), &[String::from("B")]);
        assert_eq!(features[2].overlapping_loci(), &[String::from("A")]);

        // Variants of the same locus never clip each other.
        assert_eq!(features[0].upstream_flank(), 100);
        // B overlaps A_v2's 3' end, so there is no room downstream.
        assert_eq!(features[1].downstream_flank(), 0);
    }

    #[test]
    fn test_repeats_are_left_alone() {
        let mut features = vec![
            feature("A", Strand::Positive, 1_000, 2_000),
            Builder::default()
                .name("r_L1")
                .unwrap()
                .chromosome("chr1")
                .unwrap()
                .kind(FeatureKind::Repeat)
                .push_exon(Exon::try_new(900, 950).unwrap())
                .try_build()
                .unwrap(),
        ];
        let (ids, names) = loci(2);

        mark_up(&mut features, &ids, &names, settings(500));

        assert_eq!(features[0].upstream_flank(), 500);
        assert_eq!(features[1].upstream_flank(), 0);
    }

    #[test]
    fn test_extension_is_recorded_and_moves_the_flank() {
        let mut features = vec![
            feature("A", Strand::Positive, 1_000, 2_000),
            feature("C", Strand::Positive, 0, 899),
        ];
        let (ids, names) = loci(2);

        let settings = Settings {
            upstream_flank: 500,
            downstream_flank: 0,
            five_prime_extension: 50,
        };
        mark_up(&mut features, &ids, &names, settings);

        assert_eq!(features[0].five_prime_extension(), 50);
        assert_eq!(features[0].upstream_flank(), 50);
        assert_eq!(features[0].downstream_flank(), 0);
    }
}
