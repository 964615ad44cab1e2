//! Genome annotation: features, the intervals they contribute, and the kinds
//! of region those intervals represent.

pub mod feature;
pub mod interval;
pub mod kind;
pub mod reader;
pub mod record;

pub use feature::Feature;
pub use feature::FeatureId;
pub use feature::LocusId;
pub use interval::Interval;
pub use kind::AnnotationKind;
pub use reader::Reader;
