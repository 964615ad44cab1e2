//! An annotation record in refFlat layout.
//!
//! Each line describes one transcript (or one repeat) with eleven
//! tab-delimited fields:
//!
//! ```text
//! locus  name  chrom  strand  txStart  txEnd  cdsStart  cdsEnd  exonCount  exonStarts  exonEnds
//! ```
//!
//! Exon starts are 0-based and exon ends are exclusive, both given as
//! comma-separated lists (a trailing comma is allowed). A few naming
//! conventions carry classification:
//!
//! - a locus starting with `r_` is a repeat, and may have strand `.`;
//! - a locus starting with `RNA_SPIKE_`, or chromosome `CTRL`, is a spike-in;
//! - a name ending in `_v<N>` with `N > 1` is a secondary splice variant.

use std::num::ParseIntError;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::annotation::feature;
use crate::annotation::feature::Exon;
use crate::annotation::feature::Feature;
use crate::annotation::feature::FeatureKind;
use crate::annotation::feature::Origin;
use crate::annotation::feature::Variant;
use crate::core::strand::ParseStrandError;
use crate::core::Strand;

/// The delimiter between fields.
pub const DELIMITER: char = '\t';

/// The delimiter within the exon start and end lists.
pub const LIST_DELIMITER: char = ',';

/// The number of expected fields in a record.
pub const NUM_FIELDS: usize = 11;

/// The prefix marking a repeat locus.
pub const REPEAT_PREFIX: &str = "r_";

/// The prefix marking a spike-in locus.
pub const SPIKE_PREFIX: &str = "RNA_SPIKE_";

/// The chromosome holding spike-in controls.
pub const SPIKE_CHROMOSOME: &str = "CTRL";

/// Matches the splice variant suffix of a transcript name.
static VARIANT_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_v(\d+)$").unwrap());

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error associated with parsing a record.
#[derive(Debug)]
pub enum ParseError {
    /// An incorrect number of fields.
    IncorrectNumberOfFields(usize),

    /// An invalid strand.
    InvalidStrand(ParseStrandError),

    /// An invalid position.
    InvalidPosition(ParseIntError),

    /// An invalid exon count.
    InvalidExonCount(ParseIntError),

    /// The exon count does not match the number of exon starts or ends.
    ExonCountMismatch(usize, usize, usize),

    /// An exon whose exclusive end is not past its start.
    EmptyExon(u32, u32),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::IncorrectNumberOfFields(fields) => write!(
                f,
                "invalid number of fields in record: expected {} fields, found {} fields",
                NUM_FIELDS, fields
            ),
            ParseError::InvalidStrand(err) => write!(f, "invalid strand: {err}"),
            ParseError::InvalidPosition(err) => write!(f, "invalid position: {err}"),
            ParseError::InvalidExonCount(err) => write!(f, "invalid exon count: {err}"),
            ParseError::ExonCountMismatch(count, starts, ends) => write!(
                f,
                "exon count ({count}) does not match the number of exon starts ({starts}) and \
                 ends ({ends})"
            ),
            ParseError::EmptyExon(start, end) => {
                write!(f, "empty exon: end ({end}) must be greater than start ({start})")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// An error related to a [`Record`].
#[derive(Debug)]
pub enum Error {
    /// A parse error.
    Parse(ParseError),

    /// The record does not describe a valid feature.
    Feature(feature::builder::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Parse(err) => write!(f, "parse error: {err}"),
            Error::Feature(err) => write!(f, "feature error: {err}"),
        }
    }
}

impl std::error::Error for Error {}

////////////////////////////////////////////////////////////////////////////////////////
// Record
////////////////////////////////////////////////////////////////////////////////////////

/// An annotation record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    /// The locus name.
    locus: String,

    /// The transcript name.
    name: String,

    /// The chromosome.
    chromosome: String,

    /// The strand, if any.
    strand: Option<Strand>,

    /// The exons.
    exons: Vec<Exon>,
}

impl Record {
    /// Gets the locus name.
    pub fn locus(&self) -> &str {
        &self.locus
    }

    /// Gets the transcript name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the chromosome.
    pub fn chromosome(&self) -> &str {
        &self.chromosome
    }

    /// Gets the strand.
    pub fn strand(&self) -> Option<Strand> {
        self.strand
    }

    /// Gets the exons.
    pub fn exons(&self) -> &[Exon] {
        &self.exons
    }

    /// Whether the record describes a repeat.
    pub fn is_repeat(&self) -> bool {
        self.locus.starts_with(REPEAT_PREFIX)
    }

    /// Whether the record describes a spike-in control.
    pub fn is_spike_in(&self) -> bool {
        self.locus.starts_with(SPIKE_PREFIX) || self.chromosome == SPIKE_CHROMOSOME
    }

    /// Gets the splice variant classification derived from the name.
    ///
    /// # Examples
    ///
    /// ```
    /// use strtquant::annotation::feature::Variant;
    /// use strtquant::annotation::record::Record;
    ///
    /// let line = "Actb\tActb_v2\tchr5\t-\t100\t400\t100\t400\t1\t100,\t400,";
    /// let record = line.parse::<Record>()?;
    ///
    /// assert_eq!(record.variant(), Variant::Secondary);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn variant(&self) -> Variant {
        let number = VARIANT_SUFFIX
            .captures(&self.name)
            .and_then(|captures| captures.get(1))
            .and_then(|number| number.as_str().parse::<u32>().ok());

        match number {
            Some(n) if n > 1 => Variant::Secondary,
            _ => Variant::Main,
        }
    }
}

/// Parses a comma-separated list of positions.
fn parse_positions(s: &str) -> std::result::Result<Vec<u32>, ParseError> {
    s.split(LIST_DELIMITER)
        .filter(|value| !value.is_empty())
        .map(|value| value.parse::<u32>().map_err(ParseError::InvalidPosition))
        .collect()
}

impl FromStr for Record {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields = s.split(DELIMITER).collect::<Vec<_>>();

        if fields.len() != NUM_FIELDS {
            return Err(ParseError::IncorrectNumberOfFields(fields.len()));
        }

        let locus = fields[0].to_string();
        let name = fields[1].to_string();
        let chromosome = fields[2].to_string();

        let strand = match fields[3] {
            "." => None,
            value => Some(value.parse::<Strand>().map_err(ParseError::InvalidStrand)?),
        };

        let count = fields[8]
            .parse::<usize>()
            .map_err(ParseError::InvalidExonCount)?;
        let starts = parse_positions(fields[9])?;
        let ends = parse_positions(fields[10])?;

        if starts.len() != count || ends.len() != count {
            return Err(ParseError::ExonCountMismatch(count, starts.len(), ends.len()));
        }

        let exons = starts
            .into_iter()
            .zip(ends)
            .map(|(start, end)| {
                if end <= start {
                    return Err(ParseError::EmptyExon(start, end));
                }

                Exon::try_new(start, end - 1).map_err(|_| ParseError::EmptyExon(start, end))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            locus,
            name,
            chromosome,
            strand,
            exons,
        })
    }
}

impl TryFrom<Record> for Feature {
    type Error = Error;

    fn try_from(record: Record) -> Result<Self, Self::Error> {
        let kind = match record.is_repeat() {
            true => FeatureKind::Repeat,
            false => FeatureKind::Transcript,
        };

        let origin = match record.is_spike_in() {
            true => Origin::SpikeIn,
            false => Origin::Endogenous,
        };

        let variant = record.variant();

        let mut builder = feature::Builder::default()
            .name(record.name)
            .map_err(Error::Feature)?
            .chromosome(record.chromosome)
            .map_err(Error::Feature)?
            .locus(record.locus)
            .kind(kind)
            .variant(variant)
            .origin(origin);

        if let Some(strand) = record.strand {
            builder = builder.strand(strand);
        }

        for exon in record.exons {
            builder = builder.push_exon(exon);
        }

        builder.try_build().map_err(Error::Feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_record() -> Result<(), Box<dyn std::error::Error>> {
        let record = "Actb\tActb\tchr5\t-\t100\t400\t100\t400\t2\t100,300,\t201,401,"
            .parse::<Record>()?;

        assert_eq!(record.locus(), "Actb");
        assert_eq!(record.chromosome(), "chr5");
        assert_eq!(record.strand(), Some(Strand::Negative));
        assert_eq!(
            record.exons(),
            &[Exon::try_new(100, 200)?, Exon::try_new(300, 400)?]
        );
        assert_eq!(record.variant(), Variant::Main);

        let feature = Feature::try_from(record)?;
        assert_eq!(feature.transcript_length(), 202);
        assert!(!feature.is_repeat());
        assert!(!feature.is_spike_in());

        Ok(())
    }

    #[test]
    fn test_repeat_record() -> Result<(), Box<dyn std::error::Error>> {
        let record = "r_L1\tr_L1\tchr1\t.\t150\t161\t150\t161\t1\t150\t161".parse::<Record>()?;
        assert!(record.is_repeat());
        assert_eq!(record.strand(), None);

        let feature = Feature::try_from(record)?;
        assert!(feature.is_repeat());
        assert_eq!(feature.start(), 150);
        assert_eq!(feature.end(), 160);

        Ok(())
    }

    #[test]
    fn test_spike_and_variants() -> Result<(), Box<dyn std::error::Error>> {
        let spike = "RNA_SPIKE_1\tRNA_SPIKE_1\tCTRL\t+\t0\t10\t0\t10\t1\t0\t10".parse::<Record>()?;
        assert!(spike.is_spike_in());

        let main = "Gene\tGene_v1\tchr1\t+\t0\t10\t0\t10\t1\t0\t10".parse::<Record>()?;
        assert_eq!(main.variant(), Variant::Main);

        let secondary = "Gene\tGene_v12\tchr1\t+\t0\t10\t0\t10\t1\t0\t10".parse::<Record>()?;
        assert_eq!(secondary.variant(), Variant::Secondary);

        Ok(())
    }

    #[test]
    fn test_invalid_records() {
        let err = "Gene\tGene\tchr1".parse::<Record>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid number of fields in record: expected 11 fields, found 3 fields"
        );

        let err = "Gene\tGene\tchr1\t+\t0\t10\t0\t10\t2\t0\t10"
            .parse::<Record>()
            .unwrap_err();
        assert!(matches!(err, ParseError::ExonCountMismatch(2, 1, 1)));

        let err = "Gene\tGene\tchr1\t+\t0\t10\t0\t10\t1\t10\t10"
            .parse::<Record>()
            .unwrap_err();
        assert!(matches!(err, ParseError::EmptyExon(10, 10)));

        let err = "Gene\tGene\tchr1\t?\t0\t10\t0\t10\t1\t0\t10"
            .parse::<Record>()
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidStrand(_)));
    }

    #[test]
    fn test_unstranded_transcript_record() -> Result<(), Box<dyn std::error::Error>> {
        let record = "Gene\tGene\tchr1\t.\t0\t10\t0\t10\t1\t0\t10".parse::<Record>()?;
        let err = Feature::try_from(record).unwrap_err();
        assert_eq!(
            err.to_string(),
            "feature error: transcript `Gene` must have a strand"
        );
        Ok(())
    }
}
