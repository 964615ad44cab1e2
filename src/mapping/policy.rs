//! Read assignment policies.

use std::str::FromStr;

use crate::matching::AllTranscriptMatches;
use crate::matching::MatchStrategy;
use crate::matching::Most5PrimeTranscriptMatch;

/// An error related to the parsing of an [`AssignmentPolicy`].
#[derive(Debug, Eq, PartialEq)]
pub struct ParsePolicyError(String);

impl std::fmt::Display for ParsePolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} is not a valid assignment policy (expected one of `all`, `all-shared`, \
             `most5prime` or `most5prime-shared`)",
            self.0
        )
    }
}

impl std::error::Error for ParsePolicyError {}

/// How the transcript-matching alignments of a read are credited.
///
/// The policy combines two independent choices: whether every matching
/// alignment is credited or only the one closest to a 5' end, and whether
/// the set of gene loci touched by the read is tracked alongside.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum AssignmentPolicy {
    /// Credit every transcript-matching alignment.
    AllExons,

    /// Credit every transcript-matching alignment and track shared loci.
    AllExonsTrackingSharedGenes,

    /// Credit only the alignment closest to a transcript 5' end.
    #[default]
    Most5PrimeExon,

    /// Credit only the alignment closest to a transcript 5' end and track
    /// shared loci.
    Most5PrimeExonTrackingSharedGenes,
}

impl AssignmentPolicy {
    /// Creates the policy described by the two flags.
    ///
    /// # Examples
    ///
    /// ```
    /// use strtquant::mapping::AssignmentPolicy;
    ///
    /// let policy = AssignmentPolicy::from_flags(true, false);
    /// assert_eq!(policy, AssignmentPolicy::Most5PrimeExon);
    /// assert!(policy.uses_most_5prime());
    /// assert!(!policy.tracks_shared_genes());
    /// ```
    pub fn from_flags(most_5prime: bool, track_shared_genes: bool) -> Self {
        match (most_5prime, track_shared_genes) {
            (false, false) => AssignmentPolicy::AllExons,
            (false, true) => AssignmentPolicy::AllExonsTrackingSharedGenes,
            (true, false) => AssignmentPolicy::Most5PrimeExon,
            (true, true) => AssignmentPolicy::Most5PrimeExonTrackingSharedGenes,
        }
    }

    /// Whether only the alignment closest to a 5' end is credited.
    pub fn uses_most_5prime(&self) -> bool {
        matches!(
            self,
            AssignmentPolicy::Most5PrimeExon | AssignmentPolicy::Most5PrimeExonTrackingSharedGenes
        )
    }

    /// Whether the loci touched by a read are tracked.
    pub fn tracks_shared_genes(&self) -> bool {
        matches!(
            self,
            AssignmentPolicy::AllExonsTrackingSharedGenes
                | AssignmentPolicy::Most5PrimeExonTrackingSharedGenes
        )
    }

    /// Gets the [`MatchStrategy`] used to match single alignment positions.
    pub fn strategy(&self) -> &'static dyn MatchStrategy {
        match self.uses_most_5prime() {
            true => &Most5PrimeTranscriptMatch,
            false => &AllTranscriptMatches,
        }
    }
}

impl FromStr for AssignmentPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(AssignmentPolicy::AllExons),
            "all-shared" => Ok(AssignmentPolicy::AllExonsTrackingSharedGenes),
            "most5prime" => Ok(AssignmentPolicy::Most5PrimeExon),
            "most5prime-shared" => Ok(AssignmentPolicy::Most5PrimeExonTrackingSharedGenes),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

impl std::fmt::Display for AssignmentPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssignmentPolicy::AllExons => write!(f, "all"),
            AssignmentPolicy::AllExonsTrackingSharedGenes => write!(f, "all-shared"),
            AssignmentPolicy::Most5PrimeExon => write!(f, "most5prime"),
            AssignmentPolicy::Most5PrimeExonTrackingSharedGenes => write!(f, "most5prime-shared"),
        }
    }
}
