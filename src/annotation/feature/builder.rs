//! A builder for a [`Feature`].

use nonempty::NonEmpty;

use crate::annotation::feature::Exon;
use crate::annotation::feature::Feature;
use crate::annotation::feature::FeatureKind;
use crate::annotation::feature::Metadata;
use crate::annotation::feature::Origin;
use crate::annotation::feature::Variant;
use crate::core::Strand;

/// An error that occurs when a required field was never provided to the
/// [`Builder`].
#[derive(Debug, Eq, PartialEq)]
pub enum MissingError {
    /// No name was provided to the [`Builder`].
    Name,

    /// No chromosome was provided to the [`Builder`].
    Chromosome,

    /// No exons were provided to the [`Builder`].
    Exons,
}

impl std::fmt::Display for MissingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissingError::Name => write!(f, "name"),
            MissingError::Chromosome => write!(f, "chromosome"),
            MissingError::Exons => write!(f, "exons"),
        }
    }
}

impl std::error::Error for MissingError {}

/// An error that occurs when a singular field was provided multiple times to
/// the [`Builder`].
#[derive(Debug, Eq, PartialEq)]
pub enum MultipleError {
    /// The name was provided multiple times to the [`Builder`].
    Name,

    /// The chromosome was provided multiple times to the [`Builder`].
    Chromosome,
}

impl std::fmt::Display for MultipleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MultipleError::Name => write!(f, "name"),
            MultipleError::Chromosome => write!(f, "chromosome"),
        }
    }
}

impl std::error::Error for MultipleError {}

/// An error related to a [`Builder`].
#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    /// A required field was never provided to the [`Builder`].
    Missing(MissingError),

    /// A singular field was provided to the [`Builder`] more than once.
    Multiple(MultipleError),

    /// Two exons of the feature overlap.
    OverlappingExons(Exon, Exon),

    /// A transcript was built without a strand.
    UnstrandedTranscript(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Missing(err) => write!(f, "missing required field: {err}"),
            Error::Multiple(err) => write!(f, "singular field set multiple times: {err}"),
            Error::OverlappingExons(a, b) => write!(
                f,
                "overlapping exons: {}-{} and {}-{}",
                a.start(),
                a.end(),
                b.start(),
                b.end()
            ),
            Error::UnstrandedTranscript(name) => {
                write!(f, "transcript `{name}` must have a strand")
            }
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

/// A builder for a [`Feature`].
#[derive(Debug, Default)]
pub struct Builder {
    /// The name.
    name: Option<String>,

    /// The locus name.
    locus: Option<String>,

    /// The chromosome.
    chromosome: Option<String>,

    /// The strand.
    strand: Option<Strand>,

    /// The exons, in insertion order.
    exons: Vec<Exon>,

    /// The kind.
    kind: FeatureKind,

    /// The variant classification.
    variant: Variant,

    /// The origin classification.
    origin: Origin,
}

impl Builder {
    /// Sets the name for the [`Builder`].
    ///
    /// # Examples
    ///
    /// ```
    /// use strtquant::annotation::feature::Builder;
    ///
    /// let builder = Builder::default().name("Actb")?;
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn name(mut self, name: impl Into<String>) -> Result<Self> {
        if self.name.is_some() {
            return Err(Error::Multiple(MultipleError::Name));
        }

        self.name = Some(name.into());
        Ok(self)
    }

    /// Sets the chromosome for the [`Builder`].
    pub fn chromosome(mut self, chromosome: impl Into<String>) -> Result<Self> {
        if self.chromosome.is_some() {
            return Err(Error::Multiple(MultipleError::Chromosome));
        }

        self.chromosome = Some(chromosome.into());
        Ok(self)
    }

    /// Sets the locus ("real feature") name for the [`Builder`]. When unset,
    /// the name of the feature is used.
    pub fn locus(mut self, locus: impl Into<String>) -> Self {
        self.locus = Some(locus.into());
        self
    }

    /// Sets the strand for the [`Builder`].
    pub fn strand(mut self, strand: Strand) -> Self {
        self.strand = Some(strand);
        self
    }

    /// Sets the kind for the [`Builder`].
    pub fn kind(mut self, kind: FeatureKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the variant classification for the [`Builder`].
    pub fn variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    /// Sets the origin classification for the [`Builder`].
    pub fn origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Pushes an [`Exon`] into the [`Builder`]. Exons may be pushed in any
    /// order.
    ///
    /// # Examples
    ///
    /// ```
    /// use strtquant::annotation::feature::Builder;
    /// use strtquant::annotation::feature::Exon;
    /// use strtquant::core::Strand;
    ///
    /// let feature = Builder::default()
    ///     .name("Actb")?
    ///     .chromosome("chr5")?
    ///     .strand(Strand::Negative)
    ///     .push_exon(Exon::try_new(300, 400)?)
    ///     .push_exon(Exon::try_new(100, 200)?)
    ///     .try_build()?;
    ///
    /// assert_eq!(feature.start(), 100);
    /// assert_eq!(feature.end(), 400);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn push_exon(mut self, exon: Exon) -> Self {
        self.exons.push(exon);
        self
    }

    /// Consumes `self` and attempts to build a [`Feature`].
    pub fn try_build(self) -> Result<Feature> {
        let name = self.name.ok_or(Error::Missing(MissingError::Name))?;
        let chromosome = self
            .chromosome
            .ok_or(Error::Missing(MissingError::Chromosome))?;

        if self.kind == FeatureKind::Transcript && self.strand.is_none() {
            return Err(Error::UnstrandedTranscript(name));
        }

        let mut exons = self.exons;
        exons.sort();

        for pair in exons.windows(2) {
            if pair[0].end() >= pair[1].start() {
                return Err(Error::OverlappingExons(pair[0], pair[1]));
            }
        }

        let exons = NonEmpty::from_vec(exons).ok_or(Error::Missing(MissingError::Exons))?;
        let locus = self.locus.unwrap_or_else(|| name.clone());

        Ok(Feature {
            name,
            locus,
            chromosome,
            strand: self.strand,
            exons,
            kind: self.kind,
            variant: self.variant,
            origin: self.origin,
            metadata: Metadata::default(),
        })
    }
}
