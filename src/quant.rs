//! In-memory molecule counting.
//!
//! [`MoleculeCounter`] is a [`DedupFilter`] that keeps every molecular
//! signature it has seen and tallies, per feature and barcode, how many reads
//! and how many distinct molecules were credited. It is meant for runs whose
//! signatures fit in memory; larger pipelines plug in their own filter.

use std::collections::BTreeMap;
use std::collections::HashSet;

use crate::annotation::FeatureId;
use crate::annotation::LocusId;
use crate::core::Strand;
use crate::mapping::adder::Assignment;
use crate::mapping::adder::DedupFilter;

/// The molecular signature of a credited alignment: chromosome, position,
/// strand, barcode and UMI.
type Signature = (String, u32, Strand, usize, u32);

/// Read and molecule tallies.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Counts {
    /// The number of reads.
    reads: u64,

    /// The number of distinct molecules.
    molecules: u64,
}

impl Counts {
    /// Gets the number of reads.
    pub fn reads(&self) -> u64 {
        self.reads
    }

    /// Gets the number of distinct molecules.
    pub fn molecules(&self) -> u64 {
        self.molecules
    }

    /// Records one read.
    fn record(&mut self, is_new: bool) {
        self.reads += 1;

        if is_new {
            self.molecules += 1;
        }
    }
}

/// A [`DedupFilter`] that counts reads and molecules per feature and barcode.
#[derive(Debug, Default)]
pub struct MoleculeCounter {
    /// Every signature seen so far.
    seen: HashSet<Signature>,

    /// Tallies per feature and barcode.
    features: BTreeMap<(FeatureId, usize), Counts>,

    /// Tallies of non-annotated assignments per barcode.
    random: BTreeMap<usize, Counts>,

    /// Molecules per set of loci shared by a read.
    shared: BTreeMap<Vec<LocusId>, u64>,
}

impl MoleculeCounter {
    /// Gets the tallies of a feature in a barcode.
    pub fn get(&self, feature: FeatureId, barcode: usize) -> Counts {
        self.features
            .get(&(feature, barcode))
            .copied()
            .unwrap_or_default()
    }

    /// Iterates over the tallies of every feature and barcode with at least
    /// one read, ordered by feature then barcode.
    pub fn features(&self) -> impl Iterator<Item = (FeatureId, usize, Counts)> + '_ {
        self.features
            .iter()
            .map(|(&(feature, barcode), &counts)| (feature, barcode, counts))
    }

    /// Gets the tallies of non-annotated assignments in a barcode.
    pub fn random(&self, barcode: usize) -> Counts {
        self.random.get(&barcode).copied().unwrap_or_default()
    }

    /// Iterates over the molecules credited to reads shared between more
    /// than one locus, keyed by the (sorted) set of loci.
    pub fn shared_loci(&self) -> impl Iterator<Item = (&[LocusId], u64)> + '_ {
        self.shared
            .iter()
            .map(|(loci, &count)| (loci.as_slice(), count))
    }

    /// Gets the number of distinct signatures seen.
    pub fn num_molecules(&self) -> usize {
        self.seen.len()
    }
}

impl DedupFilter for MoleculeCounter {
    fn add(&mut self, assignment: &Assignment<'_>) -> bool {
        let mapping = assignment.mapping();
        let barcode = mapping.barcode();

        let is_new = self.seen.insert((
            mapping.chromosome().to_string(),
            mapping.position(),
            mapping.strand(),
            barcode,
            mapping.umi(),
        ));

        if !assignment.is_annotated() {
            self.random.entry(barcode).or_default().record(is_new);
            return is_new;
        }

        let mut owners = assignment
            .hits()
            .iter()
            .map(|interval| interval.owner())
            .collect::<Vec<_>>();
        owners.sort();
        owners.dedup();

        for owner in owners {
            self.features
                .entry((owner, barcode))
                .or_default()
                .record(is_new);
        }

        if is_new {
            if let Some(loci) = assignment.shared_loci() {
                if loci.len() > 1 {
                    *self
                        .shared
                        .entry(loci.iter().copied().collect())
                        .or_default() += 1;
                }
            }
        }

        is_new
    }
}
