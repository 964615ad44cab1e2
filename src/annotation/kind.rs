//! The kinds of annotated regions an interval can represent.

use std::str::FromStr;

/// An error related to the parsing of an [`AnnotationKind`].
#[derive(Debug, Eq, PartialEq)]
pub struct ParseKindError(String);

impl std::fmt::Display for ParseKindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} is not a valid annotation kind", self.0)
    }
}

impl std::error::Error for ParseKindError {}

/// The kind of region an [`Interval`](super::Interval) annotates.
///
/// Every sense kind has an antisense counterpart that describes a hit by a
/// directional read on the opposite strand of the annotated feature. Repeats
/// are strand-agnostic and are their own counterpart.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum AnnotationKind {
    /// An exon of a transcript.
    Exon,
    /// An intron of a transcript.
    Intron,
    /// The flank beyond the 5' end of a transcript.
    Upstream,
    /// The flank beyond the 3' end of a transcript.
    Downstream,
    /// A repeat element.
    Repeat,
    /// An exon hit from the opposite strand.
    AntisenseExon,
    /// An intron hit from the opposite strand.
    AntisenseIntron,
    /// An upstream flank hit from the opposite strand.
    AntisenseUpstream,
    /// A downstream flank hit from the opposite strand.
    AntisenseDownstream,
}

impl AnnotationKind {
    /// All kinds, sense kinds first.
    pub const ALL: [AnnotationKind; 9] = [
        AnnotationKind::Exon,
        AnnotationKind::Intron,
        AnnotationKind::Upstream,
        AnnotationKind::Downstream,
        AnnotationKind::Repeat,
        AnnotationKind::AntisenseExon,
        AnnotationKind::AntisenseIntron,
        AnnotationKind::AntisenseUpstream,
        AnnotationKind::AntisenseDownstream,
    ];

    /// Whether intervals of this kind belong in the transcript index.
    ///
    /// # Examples
    ///
    /// ```
    /// use strtquant::annotation::AnnotationKind;
    ///
    /// assert!(AnnotationKind::Exon.is_transcript());
    /// assert!(!AnnotationKind::Intron.is_transcript());
    /// assert!(!AnnotationKind::AntisenseExon.is_transcript());
    /// ```
    pub fn is_transcript(&self) -> bool {
        matches!(self, AnnotationKind::Exon)
    }

    /// Whether this is an antisense kind.
    pub fn is_antisense(&self) -> bool {
        matches!(
            self,
            AnnotationKind::AntisenseExon
                | AnnotationKind::AntisenseIntron
                | AnnotationKind::AntisenseUpstream
                | AnnotationKind::AntisenseDownstream
        )
    }

    /// Gets the antisense counterpart of this kind.
    ///
    /// Antisense kinds and [`AnnotationKind::Repeat`] map onto themselves.
    ///
    /// # Examples
    ///
    /// ```
    /// use strtquant::annotation::AnnotationKind;
    ///
    /// assert_eq!(
    ///     AnnotationKind::Exon.make_antisense(),
    ///     AnnotationKind::AntisenseExon
    /// );
    /// assert_eq!(
    ///     AnnotationKind::Repeat.make_antisense(),
    ///     AnnotationKind::Repeat
    /// );
    /// ```
    pub fn make_antisense(self) -> Self {
        match self {
            AnnotationKind::Exon => AnnotationKind::AntisenseExon,
            AnnotationKind::Intron => AnnotationKind::AntisenseIntron,
            AnnotationKind::Upstream => AnnotationKind::AntisenseUpstream,
            AnnotationKind::Downstream => AnnotationKind::AntisenseDownstream,
            other => other,
        }
    }

    /// Gets the sense counterpart of this kind.
    pub fn sense(self) -> Self {
        match self {
            AnnotationKind::AntisenseExon => AnnotationKind::Exon,
            AnnotationKind::AntisenseIntron => AnnotationKind::Intron,
            AnnotationKind::AntisenseUpstream => AnnotationKind::Upstream,
            AnnotationKind::AntisenseDownstream => AnnotationKind::Downstream,
            other => other,
        }
    }

    /// Gets the short code used when reporting this kind.
    pub fn code(&self) -> &'static str {
        match self {
            AnnotationKind::Exon => "EXON",
            AnnotationKind::Intron => "INTR",
            AnnotationKind::Upstream => "USTR",
            AnnotationKind::Downstream => "DSTR",
            AnnotationKind::Repeat => "REPT",
            AnnotationKind::AntisenseExon => "AEXON",
            AnnotationKind::AntisenseIntron => "AINTR",
            AnnotationKind::AntisenseUpstream => "AUSTR",
            AnnotationKind::AntisenseDownstream => "ADSTR",
        }
    }
}

impl FromStr for AnnotationKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnnotationKind::ALL
            .into_iter()
            .find(|kind| kind.code() == s)
            .ok_or_else(|| ParseKindError(s.to_string()))
    }
}

impl std::fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_antisense_pairing() {
        for kind in AnnotationKind::ALL {
            let antisense = kind.make_antisense();
            assert_eq!(antisense.sense(), kind.sense());
            assert_eq!(antisense.make_antisense(), antisense);

            if kind == AnnotationKind::Repeat {
                assert!(!antisense.is_antisense());
            } else {
                assert!(antisense.is_antisense());
            }
        }
    }

    #[test]
    fn test_only_exons_are_transcript_bearing() {
        let transcript = AnnotationKind::ALL
            .into_iter()
            .filter(|kind| kind.is_transcript())
            .collect::<Vec<_>>();

        assert_eq!(transcript, vec![AnnotationKind::Exon]);
    }

    #[test]
    fn test_kind_codes() -> Result<(), Box<dyn std::error::Error>> {
        for kind in AnnotationKind::ALL {
            assert_eq!(kind.to_string().parse::<AnnotationKind>()?, kind);
        }

        let err = "CDS".parse::<AnnotationKind>().unwrap_err();
        assert_eq!(err.to_string(), "CDS is not a valid annotation kind");

        Ok(())
    }
}
