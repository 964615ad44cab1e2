//! Annotated features: transcripts and repeat elements.
//!
//! A [`Feature`] is the model a sequencing read gets credited to. Transcript
//! features are made of one or more [`Exon`]s on a single strand, and every
//! splice variant of a gene shares the same _locus_ (the "real feature"), which
//! is what lets reads that are ambiguous between isoforms of one gene be told
//! apart from reads that are ambiguous between genes. Repeat features are
//! plain blocks that may be unstranded.
//!
//! Features are created with a [`Builder`] and then handed to the
//! [index builder](crate::index::Builder), which attaches computed metadata
//! (flank lengths, 5' extension and overlapping loci) before the features
//! become read-only for the remainder of the run.

pub mod builder;

pub use builder::Builder;
use nonempty::NonEmpty;

use crate::annotation::interval;
use crate::annotation::AnnotationKind;
use crate::annotation::Interval;
use crate::core::Strand;

/// A [`Result`](std::result::Result) with an [`interval::Error`].
type Result<T> = std::result::Result<T, interval::Error>;

/// The identifier of a [`Feature`] within an index.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct FeatureId(usize);

impl FeatureId {
    /// Creates a new feature id.
    pub fn new(value: usize) -> Self {
        Self(value)
    }

    /// Gets the inner value.
    pub fn get(&self) -> usize {
        self.0
    }
}

/// The identifier of a locus (the "real feature" shared by all splice
/// variants of a gene) within an index.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct LocusId(usize);

impl LocusId {
    /// Creates a new locus id.
    pub fn new(value: usize) -> Self {
        Self(value)
    }

    /// Gets the inner value.
    pub fn get(&self) -> usize {
        self.0
    }
}

/// An exon (or, for repeats, a block) of a feature.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Exon {
    /// The first position (0-based, inclusive).
    start: u32,

    /// The last position (0-based, inclusive).
    end: u32,
}

impl Exon {
    /// Attempts to create a new [`Exon`].
    ///
    /// # Examples
    ///
    /// ```
    /// use strtquant::annotation::feature::Exon;
    ///
    /// let exon = Exon::try_new(100, 200)?;
    /// assert_eq!(exon.len(), 101);
    ///
    /// assert!(Exon::try_new(200, 100).is_err());
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_new(start: u32, end: u32) -> Result<Self> {
        if start > end {
            return Err(interval::Error::StartGreaterThanEnd(start, end));
        }

        Ok(Self { start, end })
    }

    /// Gets the start position.
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Gets the end position (inclusive).
    pub fn end(&self) -> u32 {
        self.end
    }

    /// Gets the number of positions covered.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }
}

/// What a feature models.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FeatureKind {
    /// A transcript made of exons.
    #[default]
    Transcript,
    /// A repeat element.
    Repeat,
}

/// Whether a transcript is the main variant of its locus.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Variant {
    /// The main variant.
    #[default]
    Main,
    /// A secondary splice variant.
    Secondary,
}

/// Where the molecule a feature models comes from.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Origin {
    /// An endogenous gene or element.
    #[default]
    Endogenous,
    /// A spike-in control.
    SpikeIn,
}

/// Metadata computed while building an index.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
struct Metadata {
    /// The length of the flank beyond the 5' end.
    upstream_flank: u32,

    /// The length of the flank beyond the 3' end.
    downstream_flank: u32,

    /// The number of bases the 5'-most exon is extended by.
    five_prime_extension: u32,

    /// The names of other loci whose spans overlap this feature.
    overlapping_loci: Vec<String>,
}

/// A transcript or repeat feature.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Feature {
    /// The name.
    name: String,

    /// The locus ("real feature") name shared by all variants of a gene.
    locus: String,

    /// The chromosome.
    chromosome: String,

    /// The strand, if any.
    strand: Option<Strand>,

    /// The exons, sorted ascending and non-overlapping.
    exons: NonEmpty<Exon>,

    /// The kind.
    kind: FeatureKind,

    /// The variant classification.
    variant: Variant,

    /// The origin classification.
    origin: Origin,

    /// Build-time metadata.
    metadata: Metadata,
}

impl Feature {
    /// Gets the name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the locus name.
    pub fn locus(&self) -> &str {
        &self.locus
    }

    /// Gets the chromosome.
    pub fn chromosome(&self) -> &str {
        &self.chromosome
    }

    /// Gets the strand.
    pub fn strand(&self) -> Option<Strand> {
        self.strand
    }

    /// Gets the exons, sorted ascending.
    pub fn exons(&self) -> &NonEmpty<Exon> {
        &self.exons
    }

    /// Gets the kind.
    pub fn kind(&self) -> FeatureKind {
        self.kind
    }

    /// Gets the variant classification.
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Gets the origin classification.
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Whether this is a repeat.
    pub fn is_repeat(&self) -> bool {
        self.kind == FeatureKind::Repeat
    }

    /// Whether this is the main variant of its locus.
    pub fn is_main_variant(&self) -> bool {
        self.variant == Variant::Main
    }

    /// Whether this is a spike-in control.
    pub fn is_spike_in(&self) -> bool {
        self.origin == Origin::SpikeIn
    }

    /// Gets the lowest position covered by an exon.
    pub fn start(&self) -> u32 {
        self.exons.first().start()
    }

    /// Gets the highest position covered by an exon.
    pub fn end(&self) -> u32 {
        self.exons.last().end()
    }

    /// Gets the spliced length (the sum of the exon lengths).
    pub fn transcript_length(&self) -> u32 {
        self.exons.iter().map(Exon::len).sum()
    }

    /// Gets the 5' end position, if the feature is stranded.
    pub fn five_prime_end(&self) -> Option<u32> {
        match self.strand? {
            Strand::Positive => Some(self.start()),
            Strand::Negative => Some(self.end()),
        }
    }

    /// Gets the upstream flank length.
    pub fn upstream_flank(&self) -> u32 {
        self.metadata.upstream_flank
    }

    /// Gets the downstream flank length.
    pub fn downstream_flank(&self) -> u32 {
        self.metadata.downstream_flank
    }

    /// Gets the number of bases the 5'-most exon is extended by.
    pub fn five_prime_extension(&self) -> u32 {
        self.metadata.five_prime_extension
    }

    /// Gets the names of other loci whose spans overlap this feature.
    pub fn overlapping_loci(&self) -> &[String] {
        &self.metadata.overlapping_loci
    }

    /// Sets the flank lengths.
    pub(crate) fn set_flanks(&mut self, upstream: u32, downstream: u32) {
        self.metadata.upstream_flank = upstream;
        self.metadata.downstream_flank = downstream;
    }

    /// Sets the 5' extension.
    pub(crate) fn set_five_prime_extension(&mut self, extension: u32) {
        self.metadata.five_prime_extension = extension;
    }

    /// Sets the overlapping loci.
    pub(crate) fn set_overlapping_loci(&mut self, loci: Vec<String>) {
        self.metadata.overlapping_loci = loci;
    }

    /// Generates the intervals this feature contributes to an index.
    ///
    /// Positions beyond the chromosome end (when the size is known) and below
    /// zero are clipped away.
    pub(crate) fn intervals(
        &self,
        id: FeatureId,
        chromosome_size: Option<u32>,
    ) -> Result<Vec<Interval>> {
        if self.is_repeat() {
            return self
                .exons
                .iter()
                .map(|exon| {
                    Interval::try_new(
                        exon.start(),
                        exon.end(),
                        self.strand,
                        AnnotationKind::Repeat,
                        id,
                    )
                })
                .collect();
        }

        // Builders reject unstranded transcripts.
        let strand = self.strand.unwrap_or(Strand::Positive);
        let last = chromosome_size
            .map(|size| size.saturating_sub(1))
            .unwrap_or(u32::MAX);

        let mut blocks = self
            .exons
            .iter()
            .map(|exon| (exon.start(), exon.end()))
            .collect::<Vec<_>>();
        let n = blocks.len();
        let extension = self.metadata.five_prime_extension;

        match strand {
            Strand::Positive => blocks[0].0 = blocks[0].0.saturating_sub(extension),
            Strand::Negative => blocks[n - 1].1 = blocks[n - 1].1.saturating_add(extension).min(last),
        }

        let mut offsets = vec![0; n];
        let mut spliced = 0;
        let order: Vec<usize> = match strand {
            Strand::Positive => (0..n).collect(),
            Strand::Negative => (0..n).rev().collect(),
        };
        for i in order {
            offsets[i] = spliced;
            spliced += blocks[i].1 - blocks[i].0 + 1;
        }

        let mut result = Vec::with_capacity(2 * n + 1);

        for (&(start, end), &offset) in blocks.iter().zip(offsets.iter()) {
            result.push(
                Interval::try_new(start, end, Some(strand), AnnotationKind::Exon, id)?
                    .with_transcript_offset(offset),
            );
        }

        for pair in blocks.windows(2) {
            let (left, right) = (pair[0].1, pair[1].0);
            if left + 1 < right {
                result.push(Interval::try_new(
                    left + 1,
                    right - 1,
                    Some(strand),
                    AnnotationKind::Intron,
                    id,
                )?);
            }
        }

        let (low, high) = (blocks[0].0, blocks[n - 1].1);
        let (low_flank, high_flank) = match strand {
            Strand::Positive => (
                (self.metadata.upstream_flank, AnnotationKind::Upstream),
                (self.metadata.downstream_flank, AnnotationKind::Downstream),
            ),
            Strand::Negative => (
                (self.metadata.downstream_flank, AnnotationKind::Downstream),
                (self.metadata.upstream_flank, AnnotationKind::Upstream),
            ),
        };

        if low_flank.0 > 0 && low > 0 {
            result.push(Interval::try_new(
                low.saturating_sub(low_flank.0),
                low - 1,
                Some(strand),
                low_flank.1,
                id,
            )?);
        }

        if high_flank.0 > 0 && high < last {
            result.push(Interval::try_new(
                high + 1,
                high.saturating_add(high_flank.0).min(last),
                Some(strand),
                high_flank.1,
                id,
            )?);
        }

        Ok(result)
    }
}
