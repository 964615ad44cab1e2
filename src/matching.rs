//! Matching read positions against an [`AnnotationIndex`].
//!
//! A [`Matcher`] wraps an index together with the directionality of the
//! reads being processed and answers the questions the assignment logic asks
//! about a single alignment position:
//!
//! - Is this position exonic on the read's strand ([`Matcher::is_transcript`])?
//! - Does it fall within a repeat ([`Matcher::has_repeat_match`])?
//! - Which introns, flanks, repeats and antisense exons does it hit
//!   ([`Matcher::non_transcript_matches`])?
//!
//! Which exons a position is credited to is decided by a [`MatchStrategy`]:
//! either every strand-matching exon ([`AllTranscriptMatches`]) or only the
//! one closest to its transcript's 5' end ([`Most5PrimeTranscriptMatch`]).
//!
//! When reads are non-directional, strand is ignored for every transcript
//! check and no hit is ever reported as antisense.

use crate::annotation::AnnotationKind;
use crate::annotation::Interval;
use crate::core::Strand;
use crate::index::AnnotationIndex;

////////////////////////////////////////////////////////////////////////////////////////
// Matcher
////////////////////////////////////////////////////////////////////////////////////////

/// A non-transcript hit along with the kind it represents for the read.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Hit<'a> {
    /// The interval that was hit.
    interval: &'a Interval,

    /// The effective kind of the hit.
    kind: AnnotationKind,
}

impl<'a> Hit<'a> {
    /// Gets the interval that was hit.
    pub fn interval(&self) -> &'a Interval {
        self.interval
    }

    /// Gets the effective kind of the hit.
    ///
    /// For directional reads, this is the antisense counterpart of the
    /// interval's kind when the read lies on the opposite strand.
    pub fn kind(&self) -> AnnotationKind {
        self.kind
    }
}

/// Strand-aware predicates over an [`AnnotationIndex`].
#[derive(Clone, Copy, Debug)]
pub struct Matcher<'a> {
    /// The index.
    index: &'a AnnotationIndex,

    /// Whether reads preserve the strand of the original molecule.
    directional: bool,
}

impl<'a> Matcher<'a> {
    /// Creates a new [`Matcher`].
    pub fn new(index: &'a AnnotationIndex, directional: bool) -> Self {
        Self { index, directional }
    }

    /// Gets the index.
    pub fn index(&self) -> &'a AnnotationIndex {
        self.index
    }

    /// Whether reads are treated as directional.
    pub fn is_directional(&self) -> bool {
        self.directional
    }

    /// Returns every exon interval covering `position` that a read on
    /// `strand` can be credited to.
    pub fn sense_transcripts(
        &self,
        chromosome: &str,
        strand: Strand,
        position: u32,
    ) -> impl Iterator<Item = &'a Interval> {
        let directional = self.directional;

        self.index
            .query_transcript(chromosome, position)
            .filter(move |interval| !directional || interval.is_on(strand))
    }

    /// Whether any exon a read on `strand` can be credited to covers
    /// `position`.
    pub fn is_transcript(&self, chromosome: &str, strand: Strand, position: u32) -> bool {
        self.sense_transcripts(chromosome, strand, position)
            .next()
            .is_some()
    }

    /// Whether any repeat covers `position`, regardless of strand.
    pub fn has_repeat_match(&self, chromosome: &str, position: u32) -> bool {
        self.index
            .query_nontranscript(chromosome, position)
            .any(|interval| interval.kind() == AnnotationKind::Repeat)
    }

    /// Whether `position` is exonic for a read on `strand` or falls within a
    /// repeat.
    pub fn has_transcript_or_repeat_match(
        &self,
        chromosome: &str,
        strand: Strand,
        position: u32,
    ) -> bool {
        self.is_transcript(chromosome, strand, position)
            || self.has_repeat_match(chromosome, position)
    }

    /// Returns every non-transcript hit at `position` for a read on `strand`.
    ///
    /// This is the full set of introns, flanks and repeats covering the
    /// position and, for directional reads, the exons on the opposite strand
    /// (reported as [`AnnotationKind::AntisenseExon`]).
    pub fn non_transcript_matches(
        &self,
        chromosome: &str,
        strand: Strand,
        position: u32,
    ) -> Vec<Hit<'a>> {
        let mut hits = self
            .index
            .query_nontranscript(chromosome, position)
            .map(|interval| self.hit(interval, strand))
            .collect::<Vec<_>>();

        if self.directional {
            hits.extend(
                self.index
                    .query_transcript(chromosome, position)
                    .filter(|interval| interval.is_on(strand.complement()))
                    .map(|interval| self.hit(interval, strand)),
            );
        }

        hits
    }

    /// Creates the [`Hit`] a read on `strand` makes on `interval`.
    fn hit(&self, interval: &'a Interval, strand: Strand) -> Hit<'a> {
        let kind = match interval.strand() {
            Some(s) if self.directional && s != strand => interval.kind().make_antisense(),
            _ => interval.kind(),
        };

        Hit { interval, kind }
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Strategies
////////////////////////////////////////////////////////////////////////////////////////

/// The exons a single alignment position is credited to.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Matches<'a> {
    /// The credited exon intervals.
    intervals: Vec<&'a Interval>,

    /// Whether more than one strand-matching exon covered the position.
    has_variants: bool,
}

impl<'a> Matches<'a> {
    /// Gets the credited exon intervals.
    pub fn intervals(&self) -> &[&'a Interval] {
        &self.intervals
    }

    /// Whether more than one strand-matching exon covered the position, even
    /// if fewer were credited.
    pub fn has_variants(&self) -> bool {
        self.has_variants
    }

    /// Whether no exon was credited.
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Gets the smallest transcript position of `position` among the credited
    /// exons.
    pub fn best_transcript_pos(&self, position: u32) -> Option<u32> {
        self.intervals
            .iter()
            .filter_map(|interval| interval.transcript_pos(position))
            .min()
    }
}

/// A policy for choosing the exons an alignment position is credited to.
pub trait MatchStrategy: std::fmt::Debug + Send + Sync {
    /// Gets the exons a read on `strand` at `position` is credited to.
    fn transcript_matches<'a>(
        &self,
        matcher: &Matcher<'a>,
        chromosome: &str,
        strand: Strand,
        position: u32,
    ) -> Matches<'a>;
}

/// Credits every strand-matching exon.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllTranscriptMatches;

impl MatchStrategy for AllTranscriptMatches {
    fn transcript_matches<'a>(
        &self,
        matcher: &Matcher<'a>,
        chromosome: &str,
        strand: Strand,
        position: u32,
    ) -> Matches<'a> {
        let intervals = matcher
            .sense_transcripts(chromosome, strand, position)
            .collect::<Vec<_>>();
        let has_variants = intervals.len() > 1;

        Matches {
            intervals,
            has_variants,
        }
    }
}

/// Credits only the strand-matching exon whose transcript position is
/// smallest, i.e., the one closest to its transcript's 5' end.
///
/// Ties are won by the first interval encountered while scanning the index.
/// That order is stable for a given index but carries no further meaning.
#[derive(Clone, Copy, Debug, Default)]
pub struct Most5PrimeTranscriptMatch;

impl MatchStrategy for Most5PrimeTranscriptMatch {
    fn transcript_matches<'a>(
        &self,
        matcher: &Matcher<'a>,
        chromosome: &str,
        strand: Strand,
        position: u32,
    ) -> Matches<'a> {
        let mut best: Option<(u32, &'a Interval)> = None;
        let mut seen = 0usize;

        for interval in matcher.sense_transcripts(chromosome, strand, position) {
            seen += 1;

            let Some(offset) = interval.transcript_pos(position) else {
                continue;
            };

            match best {
                Some((best_offset, _)) if offset >= best_offset => {}
                _ => best = Some((offset, interval)),
            }
        }

        Matches {
            intervals: best.map(|(_, interval)| interval).into_iter().collect(),
            has_variants: seen > 1,
        }
    }
}
