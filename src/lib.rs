
/// Best-mapping table and per-allele support aggregation
pub mod adjudicator;
/// CLI functionality and checks
pub mod cli;
/// Contains multiple wrappers for useful data types in graphite
pub mod data_types;
/// Affine-gap local alignment of reads against a sequence graph
pub mod graph_aligner;
/// Variant and read sources, both file-backed and in-memory
pub mod readers;
/// Variant-aware sequence graph construction
pub mod sequence_graph;
/// Splits regions into overlapping windows and drives them through build, align, and aggregate
pub mod window_coordinator;
/// Contains all the various output writer functionality
pub mod writers;
