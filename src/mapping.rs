//! Candidate alignments of sequencing reads.
//!
//! The aligner may report several candidate positions for a single read. All
//! of them are collected into one [`MultiReadMappings`], which is the unit of
//! work handed to the [`MappingAdder`](adder::MappingAdder).

use nonempty::NonEmpty;

use crate::core::Strand;

pub mod adder;
pub mod policy;

pub use adder::MappingAdder;
pub use policy::AssignmentPolicy;

/// An error related to a [`MultiReadMappings`].
#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    /// No candidate alignments were provided.
    Empty,

    /// The reported number of mappings is smaller than the number of
    /// candidates provided.
    ///
    /// The values are the reported count and the number of candidates.
    InconsistentCount(usize, usize),

    /// The candidates do not share a single barcode.
    MixedBarcodes(usize, usize),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Empty => write!(f, "a read must have at least one candidate alignment"),
            Error::InconsistentCount(reported, actual) => write!(
                f,
                "reported number of mappings ({reported}) is smaller than the number of \
                 candidates ({actual})"
            ),
            Error::MixedBarcodes(a, b) => {
                write!(f, "candidate alignments carry different barcodes: {a} and {b}")
            }
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

/// One candidate alignment of a read.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MultiReadMapping {
    /// The chromosome.
    chromosome: String,

    /// The strand the read aligned to.
    strand: Strand,

    /// The position the read is attributed to.
    position: u32,

    /// The aligned length.
    length: u32,

    /// The barcode index of the read.
    barcode: usize,

    /// The molecular tag (UMI) of the read.
    umi: u32,
}

impl MultiReadMapping {
    /// Creates a new [`MultiReadMapping`].
    pub fn new(
        chromosome: impl Into<String>,
        strand: Strand,
        position: u32,
        length: u32,
        barcode: usize,
        umi: u32,
    ) -> Self {
        Self {
            chromosome: chromosome.into(),
            strand,
            position,
            length,
            barcode,
            umi,
        }
    }

    /// Gets the chromosome.
    pub fn chromosome(&self) -> &str {
        &self.chromosome
    }

    /// Gets the strand.
    pub fn strand(&self) -> Strand {
        self.strand
    }

    /// Gets the position the read is attributed to.
    pub fn position(&self) -> u32 {
        self.position
    }

    /// Gets the aligned length.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Gets the barcode index.
    pub fn barcode(&self) -> usize {
        self.barcode
    }

    /// Gets the molecular tag.
    pub fn umi(&self) -> u32 {
        self.umi
    }
}

/// Every candidate alignment of a single read.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MultiReadMappings {
    /// The candidate alignments, in the order they were reported.
    mappings: NonEmpty<MultiReadMapping>,

    /// The number of alignments the aligner found.
    n_mappings: usize,

    /// Whether the aligner found more alignments than it reported.
    has_alt_mappings: bool,
}

impl MultiReadMappings {
    /// Attempts to create a new [`MultiReadMappings`].
    ///
    /// # Examples
    ///
    /// ```
    /// use strtquant::core::Strand;
    /// use strtquant::mapping::MultiReadMapping;
    /// use strtquant::mapping::MultiReadMappings;
    ///
    /// let mappings = MultiReadMappings::try_new(
    ///     vec![
    ///         MultiReadMapping::new("1", Strand::Positive, 150, 50, 0, 7),
    ///         MultiReadMapping::new("2", Strand::Negative, 900, 50, 0, 7),
    ///     ],
    ///     2,
    ///     false,
    /// )?;
    ///
    /// assert!(mappings.is_multi());
    /// assert_eq!(mappings.first().chromosome(), "1");
    ///
    /// assert!(MultiReadMappings::try_new(Vec::new(), 0, false).is_err());
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_new(
        mappings: Vec<MultiReadMapping>,
        n_mappings: usize,
        has_alt_mappings: bool,
    ) -> Result<Self> {
        let mappings = NonEmpty::from_vec(mappings).ok_or(Error::Empty)?;

        if n_mappings < mappings.len() {
            return Err(Error::InconsistentCount(n_mappings, mappings.len()));
        }

        let barcode = mappings.first().barcode();
        if let Some(other) = mappings.iter().find(|m| m.barcode() != barcode) {
            return Err(Error::MixedBarcodes(barcode, other.barcode()));
        }

        Ok(Self {
            mappings,
            n_mappings,
            has_alt_mappings,
        })
    }

    /// Creates a [`MultiReadMappings`] for a uniquely aligned read.
    pub fn single(mapping: MultiReadMapping) -> Self {
        Self {
            mappings: NonEmpty::new(mapping),
            n_mappings: 1,
            has_alt_mappings: false,
        }
    }

    /// Gets the first candidate alignment.
    pub fn first(&self) -> &MultiReadMapping {
        self.mappings.first()
    }

    /// Iterates over the candidate alignments.
    pub fn iter(&self) -> impl Iterator<Item = &MultiReadMapping> {
        self.mappings.iter()
    }

    /// Gets the number of candidate alignments provided.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Gets the number of alignments the aligner found.
    pub fn n_mappings(&self) -> usize {
        self.n_mappings
    }

    /// Whether the aligner found more alignments than it reported.
    pub fn has_alt_mappings(&self) -> bool {
        self.has_alt_mappings
    }

    /// Whether the read aligned to more than one position.
    pub fn is_multi(&self) -> bool {
        self.n_mappings > 1 || self.has_alt_mappings
    }

    /// Gets the barcode index shared by all candidates.
    pub fn barcode(&self) -> usize {
        self.mappings.first().barcode()
    }
}
