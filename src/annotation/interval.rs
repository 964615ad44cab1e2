//! An annotated, closed genomic interval.
//!
//! Intervals are the unit stored in the [`AnnotationIndex`](crate::index::AnnotationIndex).
//! Each one covers the 0-based positions `start..=end` of a single chromosome,
//! carries the [`AnnotationKind`] of the region, and refers back to the
//! [`Feature`](super::Feature) that owns it.
//!
//! ```text
//! ================ chr1 (+) ====================
//!
//!   100        200      300        400
//!    |==========|--------|==========|
//!       EXON       INTR      EXON
//!    0 ...... 100       101 ..... 201   <= transcript positions
//! ```
//!
//! Exon intervals additionally know how many spliced bases of their transcript
//! precede them when reading 5' to 3', which lets an absolute position be
//! translated into a transcript position without looking at the feature.

use crate::annotation::feature::FeatureId;
use crate::annotation::AnnotationKind;
use crate::core::Strand;

/// An error related to an interval.
#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    /// The start position is greater than the end position.
    StartGreaterThanEnd(u32, u32),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::StartGreaterThanEnd(start, end) => write!(
                f,
                "start position ({start}) cannot be greater than the end position ({end})"
            ),
        }
    }
}

impl std::error::Error for Error {}

/// An annotated interval.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Interval {
    /// The first position covered (0-based, inclusive).
    start: u32,

    /// The last position covered (0-based, inclusive).
    end: u32,

    /// The strand, if the region is stranded.
    strand: Option<Strand>,

    /// The kind of region.
    kind: AnnotationKind,

    /// The feature owning this interval.
    owner: FeatureId,

    /// The number of spliced transcript bases 5' of this interval.
    transcript_offset: u32,
}

impl Interval {
    /// Attempts to create a new [`Interval`].
    ///
    /// # Examples
    ///
    /// ```
    /// use strtquant::annotation::AnnotationKind;
    /// use strtquant::annotation::FeatureId;
    /// use strtquant::annotation::Interval;
    /// use strtquant::core::Strand;
    ///
    /// let interval = Interval::try_new(
    ///     100,
    ///     200,
    ///     Some(Strand::Positive),
    ///     AnnotationKind::Exon,
    ///     FeatureId::new(0),
    /// )?;
    ///
    /// assert_eq!(interval.len(), 101);
    /// assert!(interval.contains(200));
    /// assert!(!interval.contains(201));
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_new(
        start: u32,
        end: u32,
        strand: Option<Strand>,
        kind: AnnotationKind,
        owner: FeatureId,
    ) -> Result<Self, Error> {
        if start > end {
            return Err(Error::StartGreaterThanEnd(start, end));
        }

        Ok(Self {
            start,
            end,
            strand,
            kind,
            owner,
            transcript_offset: 0,
        })
    }

    /// Sets the number of spliced transcript bases preceding this interval.
    pub(crate) fn with_transcript_offset(mut self, offset: u32) -> Self {
        self.transcript_offset = offset;
        self
    }

    /// Gets the start position.
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Gets the end position (inclusive).
    pub fn end(&self) -> u32 {
        self.end
    }

    /// Gets the strand.
    pub fn strand(&self) -> Option<Strand> {
        self.strand
    }

    /// Gets the kind.
    pub fn kind(&self) -> AnnotationKind {
        self.kind
    }

    /// Gets the id of the owning feature.
    pub fn owner(&self) -> FeatureId {
        self.owner
    }

    /// Gets the number of positions covered.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    /// Whether `position` falls within the interval.
    pub fn contains(&self, position: u32) -> bool {
        self.start <= position && position <= self.end
    }

    /// Whether the interval lies on `strand`. Unstranded intervals lie on
    /// neither strand.
    pub fn is_on(&self, strand: Strand) -> bool {
        self.strand == Some(strand)
    }

    /// Translates an absolute `position` into a 0-based offset from the 5' end
    /// of the owning transcript, counting spliced bases only.
    ///
    /// Returns [`None`] when `position` is outside this interval. Unstranded
    /// intervals are read as positive-stranded.
    ///
    /// # Examples
    ///
    /// ```
    /// use strtquant::annotation::AnnotationKind;
    /// use strtquant::annotation::FeatureId;
    /// use strtquant::annotation::Interval;
    /// use strtquant::core::Strand;
    ///
    /// let id = FeatureId::new(0);
    ///
    /// let forward = Interval::try_new(100, 200, Some(Strand::Positive), AnnotationKind::Exon, id)?;
    /// assert_eq!(forward.transcript_pos(110), Some(10));
    ///
    /// let reverse = Interval::try_new(100, 200, Some(Strand::Negative), AnnotationKind::Exon, id)?;
    /// assert_eq!(reverse.transcript_pos(110), Some(90));
    /// assert_eq!(reverse.transcript_pos(99), None);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn transcript_pos(&self, position: u32) -> Option<u32> {
        if !self.contains(position) {
            return None;
        }

        let within = match self.strand {
            Some(Strand::Negative) => self.end - position,
            _ => position - self.start,
        };

        Some(self.transcript_offset + within)
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let strand = match self.strand {
            Some(strand) => strand.to_string(),
            None => String::from("."),
        };

        write!(f, "{}:{}:{}-{}", self.kind, strand, self.start, self.end)
    }
}
