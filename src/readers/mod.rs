
/// Indexed BAM/CRAM read source
pub mod bam_source;
/// In-memory variant and read sources
pub mod memory;
/// Indexed VCF/BCF variant source
pub mod vcf_source;

use crate::data_types::alignment_record::AlignmentRecord;
use crate::data_types::region::Region;
use crate::data_types::variant_list::VariantList;
use crate::data_types::variants::Variant;

use log::{debug, warn};

/// Yields variants in position order with fully resolved allele sequences.
pub trait VariantSource {
    /// Returns the next variant, or None once the source is exhausted
    fn next_variant(&mut self) -> Option<Result<Variant, Box<dyn std::error::Error>>>;
}

/// Yields reads for a single window; None signals exhaustion.
pub trait AlignmentReader {
    fn next_alignment(&mut self) -> Option<Result<AlignmentRecord, Box<dyn std::error::Error>>>;
}

/// Opens a fresh `AlignmentReader` over a window.
/// The provider is shared by every window worker, each of which opens its own reader.
pub trait ReadProvider: Send + Sync {
    /// # Errors
    /// * if the underlying files cannot be opened or fetched
    fn open(&self, region: &Region) -> Result<Box<dyn AlignmentReader>, Box<dyn std::error::Error>>;
}

/// Drains a variant source into a `VariantList`, checking that positions never go backwards on a contig.
/// # Arguments
/// * `source` - the variant source to drain
/// # Errors
/// * if the source returns an error
pub fn load_variants(source: &mut dyn VariantSource) -> Result<VariantList, Box<dyn std::error::Error>> {
    let mut variant_list = VariantList::new();
    let mut previous: Option<(String, u64)> = None;
    let mut out_of_order: usize = 0;
    while let Some(variant_result) = source.next_variant() {
        let variant: Variant = variant_result?;
        if let Some((chrom, position)) = previous.as_ref() {
            if chrom == variant.chrom() && variant.position() < *position {
                out_of_order += 1;
            }
        }
        previous = Some((variant.chrom().to_string(), variant.position()));
        variant_list.add_or_update(variant);
    }

    if out_of_order > 0 {
        // windows sort their own variants, so this is survivable
        warn!("Variant source returned {} out-of-order variants", out_of_order);
    }
    debug!("Loaded {} variants", variant_list.len());
    Ok(variant_list)
}
