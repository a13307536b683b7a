/// Contains the writer for per-allele support counts
pub mod support_writer;
