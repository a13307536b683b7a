
/// Contains the AlignmentRecord type that reads are converted into
pub mod alignment_record;
/// Reference genome wrappers and the ReferenceAccessor trait
pub mod reference_genome;
/// Simple genomic interval type used for regions and windows
pub mod region;
/// Ordered, region-wide collection of variants with overlap lookups
pub mod variant_list;
/// Contains Variant type as well as supporting definitions
pub mod variants;
