//! A builder for an [`AnnotationIndex`].

use std::collections::HashMap;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::annotation::interval;
use crate::annotation::Feature;
use crate::annotation::FeatureId;
use crate::annotation::LocusId;
use crate::index::markup;
use crate::index::AnnotationIndex;
use crate::index::ChromosomeIndex;

/// The default size of an index bin.
pub const DEFAULT_BIN_SIZE: u32 = 30_000;

/// The default length of the flanks on either side of a transcript.
pub const DEFAULT_FLANK: u32 = 1_000;

/// An error related to building an [`AnnotationIndex`].
#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    /// The bin size was zero.
    InvalidBinSize,

    /// A feature generated an invalid interval.
    InvalidInterval(String, interval::Error),

    /// More intervals were generated than can be addressed.
    TooManyIntervals,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidBinSize => write!(f, "bin size must be greater than zero"),
            Error::InvalidInterval(name, err) => {
                write!(f, "invalid interval for feature `{name}`: {err}")
            }
            Error::TooManyIntervals => write!(f, "too many intervals to index"),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

/// A builder for an [`AnnotationIndex`].
#[derive(Clone, Debug)]
pub struct Builder {
    /// The size of each bin.
    bin_size: u32,

    /// The requested upstream flank length.
    upstream_flank: u32,

    /// The requested downstream flank length.
    downstream_flank: u32,

    /// The 5' extension of the first exon.
    five_prime_extension: u32,

    /// The known chromosome sizes, if any.
    chromosome_sizes: Option<HashMap<String, u32>>,
}

impl Builder {
    /// Sets the bin size.
    pub fn bin_size(mut self, bin_size: u32) -> Self {
        self.bin_size = bin_size;
        self
    }

    /// Sets the requested upstream flank length.
    pub fn upstream_flank(mut self, length: u32) -> Self {
        self.upstream_flank = length;
        self
    }

    /// Sets the requested downstream flank length.
    pub fn downstream_flank(mut self, length: u32) -> Self {
        self.downstream_flank = length;
        self
    }

    /// Sets the number of bases the 5'-most exon of every transcript is
    /// extended by.
    pub fn five_prime_extension(mut self, length: u32) -> Self {
        self.five_prime_extension = length;
        self
    }

    /// Sets the known chromosome sizes.
    ///
    /// Once set, features on chromosomes that are not listed, or that extend
    /// past the end of their chromosome, are skipped with a warning.
    pub fn chromosome_sizes<I, S>(mut self, sizes: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        self.chromosome_sizes = Some(
            sizes
                .into_iter()
                .map(|(name, size)| (name.into(), size))
                .collect(),
        );
        self
    }

    /// Builds an [`AnnotationIndex`] from `features`.
    ///
    /// # Examples
    ///
    /// ```
    /// use strtquant::annotation::feature;
    /// use strtquant::annotation::feature::Exon;
    /// use strtquant::core::Strand;
    /// use strtquant::index;
    ///
    /// let feature = feature::Builder::default()
    ///     .name("G1")?
    ///     .chromosome("1")?
    ///     .strand(Strand::Positive)
    ///     .push_exon(Exon::try_new(100, 200)?)
    ///     .try_build()?;
    ///
    /// let index = index::Builder::default().try_build_from([feature])?;
    ///
    /// assert_eq!(index.query_transcript("1", 150).count(), 1);
    /// assert_eq!(index.query_transcript("2", 150).count(), 0);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_build_from<I>(&self, features: I) -> Result<AnnotationIndex>
    where
        I: IntoIterator<Item = Feature>,
    {
        if self.bin_size == 0 {
            return Err(Error::InvalidBinSize);
        }

        let mut kept = Vec::new();
        let mut skipped = 0usize;

        for feature in features {
            if let Some(sizes) = &self.chromosome_sizes {
                match sizes.get(feature.chromosome()) {
                    None => {
                        warn!(
                            "skipping feature `{}`: unknown chromosome `{}`",
                            feature.name(),
                            feature.chromosome()
                        );
                        skipped += 1;
                        continue;
                    }
                    Some(&size) if feature.end() >= size => {
                        warn!(
                            "skipping feature `{}`: end ({}) exceeds the size of chromosome `{}` \
                             ({})",
                            feature.name(),
                            feature.end(),
                            feature.chromosome(),
                            size
                        );
                        skipped += 1;
                        continue;
                    }
                    Some(_) => {}
                }
            }

            kept.push(feature);
        }

        let mut features = kept;

        let mut locus_ids = HashMap::<String, LocusId>::new();
        let mut loci = Vec::new();
        let mut feature_loci = Vec::with_capacity(features.len());

        for feature in &features {
            let id = *locus_ids
                .entry(feature.locus().to_string())
                .or_insert_with(|| {
                    loci.push(feature.locus().to_string());
                    LocusId::new(loci.len() - 1)
                });
            feature_loci.push(id);
        }

        markup::mark_up(
            &mut features,
            &feature_loci,
            &loci,
            markup::Settings {
                upstream_flank: self.upstream_flank,
                downstream_flank: self.downstream_flank,
                five_prime_extension: self.five_prime_extension,
            },
        );

        let mut intervals = Vec::new();
        let mut chromosomes = HashMap::<String, ChromosomeIndex>::new();

        for (i, feature) in features.iter().enumerate() {
            let size = self
                .chromosome_sizes
                .as_ref()
                .and_then(|sizes| sizes.get(feature.chromosome()))
                .copied();

            let chromosome = chromosomes
                .entry(feature.chromosome().to_string())
                .or_insert_with(|| ChromosomeIndex::new(self.bin_size));

            let generated = feature
                .intervals(FeatureId::new(i), size)
                .map_err(|err| Error::InvalidInterval(feature.name().to_string(), err))?;

            for interval in generated {
                let id = u32::try_from(intervals.len()).map_err(|_| Error::TooManyIntervals)?;
                chromosome.insert(id, &interval);
                intervals.push(interval);
            }

            debug!(
                "indexed feature `{}` ({} overlapping loci)",
                feature.name(),
                feature.overlapping_loci().len()
            );
        }

        let index = AnnotationIndex {
            bin_size: self.bin_size,
            features,
            feature_loci,
            loci,
            intervals,
            chromosomes,
        };

        info!("built {index} ({skipped} features skipped)");

        Ok(index)
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            bin_size: DEFAULT_BIN_SIZE,
            upstream_flank: DEFAULT_FLANK,
            downstream_flank: DEFAULT_FLANK,
            five_prime_extension: 0,
            chromosome_sizes: None,
        }
    }
}
