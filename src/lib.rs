//! `strtquant` is a crate for attributing STRT-seq reads to annotated genome
//! features.
//!
//! Given the candidate alignment positions of a sequencing read, the crate
//! decides which annotated features (exons, introns, flanks and repeats) the
//! read overlaps and which feature(s) it is credited to. Credited alignments
//! are then handed to a molecule deduplication filter that counts reads and
//! distinct molecules (UMIs) per barcode.
//!
//! The crate provides three main points of entry:
//!
//! - Reading an annotation file into [`annotation::Feature`]s with the
//!   [`annotation::Reader`] facility.
//! - Building an immutable [`index::AnnotationIndex`] over those features with
//!   [`index::Builder`], which answers point-overlap queries.
//! - Crediting reads with a [`mapping::MappingAdder`], configured with an
//!   [`mapping::AssignmentPolicy`] and a [`mapping::adder::DedupFilter`] (for
//!   example, [`quant::MoleculeCounter`]).
//!
//! ## Annotation index
//!
//! Every transcript contributes one interval per exon and intron as well as an
//! upstream and a downstream flank. Repeats contribute one interval per block.
//! Intervals are kept in fixed-size bins per chromosome, separately for exons
//! and everything else, so that a query only scans one bin.
//!
//! ```
//! use strtquant::annotation;
//! use strtquant::index;
//!
//! let data = b"G1\tG1\t1\t+\t100\t201\t100\t201\t1\t100,\t201,\n";
//! let mut reader = annotation::Reader::new(&data[..]);
//! let features = reader.features().collect::<Result<Vec<_>, _>>()?;
//!
//! let index = index::Builder::default().try_build_from(features)?;
//! assert_eq!(index.query_transcript("1", 150).count(), 1);
//! assert_eq!(index.query_nontranscript("1", 50).count(), 1);
//!
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Crediting reads
//!
//! A [`mapping::MultiReadMappings`] holds every candidate alignment of one
//! read. The [`mapping::MappingAdder`] vetoes multi-reads that may stem from
//! repeats, chooses the credited alignment(s) according to its policy, and
//! forwards them to its deduplication filter.
//!
//! ```
//! use strtquant::annotation::feature;
//! use strtquant::annotation::feature::Exon;
//! use strtquant::annotation::FeatureId;
//! use strtquant::core::Strand;
//! use strtquant::index;
//! use strtquant::mapping::AssignmentPolicy;
//! use strtquant::mapping::MappingAdder;
//! use strtquant::mapping::MultiReadMapping;
//! use strtquant::mapping::MultiReadMappings;
//! use strtquant::matching::Matcher;
//! use strtquant::quant::MoleculeCounter;
//!
//! let feature = feature::Builder::default()
//!     .name("G1")?
//!     .chromosome("1")?
//!     .strand(Strand::Positive)
//!     .push_exon(Exon::try_new(100, 200)?)
//!     .try_build()?;
//! let index = index::Builder::default().try_build_from([feature])?;
//!
//! let mut adder = MappingAdder::new(
//!     Matcher::new(&index, true),
//!     AssignmentPolicy::Most5PrimeExon,
//!     MoleculeCounter::default(),
//! );
//!
//! let read = MultiReadMapping::new("1", Strand::Positive, 150, 50, 0, 7);
//! assert!(adder.add(&MultiReadMappings::single(read)));
//!
//! let (counter, _) = adder.into_parts();
//! assert_eq!(counter.get(FeatureId::new(0), 0).molecules(), 1);
//!
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(clippy::missing_docs_in_private_items)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod annotation;
pub mod core;
pub mod index;
pub mod mapping;
pub mod matching;
pub mod quant;
