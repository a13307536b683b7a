
use crate::data_types::region::Region;
use crate::data_types::variants::Variant;
use crate::readers::VariantSource;

use log::{debug, trace};
use rust_htslib::bcf;
use rust_htslib::bcf::record::Numeric;
use std::path::Path;

/// Why a VCF record was not turned into a variant
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
pub enum SkipReason {
    #[strum(serialize = "no ALT allele")]
    NoAlt,
    #[strum(serialize = "symbolic allele")]
    Symbolic,
    #[strum(serialize = "allele too long")]
    TooLong
}

/// Checks the raw alleles of a record, REF first, returning the reason it should be skipped (if any).
/// # Arguments
/// * `alleles` - REF followed by the ALT alleles
/// * `max_allele_size` - any allele longer than this gets skipped
pub fn check_alleles(alleles: &[&[u8]], max_allele_size: usize) -> Option<SkipReason> {
    if alleles.len() < 2 || alleles[1..].iter().all(|a| *a == b".") {
        return Some(SkipReason::NoAlt);
    }
    for allele in alleles.iter() {
        // <DEL>, *, and breakend notation all need upstream resolution
        if allele.starts_with(b"<") || *allele == b"*" || *allele == b"." ||
            allele.contains(&b'[') || allele.contains(&b']') {
            return Some(SkipReason::Symbolic);
        }
        if allele.len() > max_allele_size {
            return Some(SkipReason::TooLong);
        }
    }
    None
}

/// Pulls variants for a single region out of an indexed VCF/BCF file.
pub struct VcfVariantSource {
    /// the open, fetched reader
    reader: bcf::IndexedReader,
    /// reused record buffer
    record: bcf::Record,
    /// the region we are loading
    region: Region,
    /// set if the contig had no entries in the index
    is_empty: bool,
    /// alleles longer than this are skipped
    max_allele_size: usize,
    /// number of records skipped so far
    skipped: usize
}

impl VcfVariantSource {
    /// Opens the VCF and fetches the region.
    /// # Arguments
    /// * `filename` - the VCF file, must be indexed
    /// * `region` - the region to load variants from
    /// * `max_allele_size` - maximum length for any allele
    /// # Errors
    /// * if the VCF fails to open
    /// * if the region contig is not in the VCF header
    pub fn new(filename: &Path, region: &Region, max_allele_size: usize) -> Result<VcfVariantSource, Box<dyn std::error::Error>> {
        use rust_htslib::bcf::Read;
        let mut reader: bcf::IndexedReader = bcf::IndexedReader::from_path(filename)?;
        let chrom_index: u32 = reader.header().name2rid(region.chrom().as_bytes())?;
        let record = reader.empty_record();

        // this usually fails when there are no entries for the chromosome
        let is_empty = match reader.fetch(chrom_index, region.start(), Some(region.end())) {
            Ok(()) => false,
            Err(e) => {
                debug!("No VCF entries fetched for {}: {}", region, e);
                true
            }
        };

        Ok(VcfVariantSource {
            reader,
            record,
            region: region.clone(),
            is_empty,
            max_allele_size,
            skipped: 0
        })
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Converts the current record, or returns None if it should be skipped
    fn convert_record(&self) -> Result<Option<Variant>, Box<dyn std::error::Error>> {
        let record: &bcf::Record = &self.record;
        let position: i64 = record.pos();
        if position < self.region.start() as i64 {
            // long events that start before the region but overlap it
            trace!("Ignoring variant at {} before region start {}", position, self.region.start());
            return Ok(None);
        }

        let alleles: Vec<&[u8]> = record.alleles();
        if let Some(reason) = check_alleles(&alleles, self.max_allele_size) {
            debug!("Skipping VCF record at {}:{}, {}", self.region.chrom(), position + 1, reason);
            return Ok(None);
        }

        let ref_allele: Vec<u8> = alleles[0].to_vec();
        let alt_alleles: Vec<Vec<u8>> = alleles[1..].iter().map(|a| a.to_vec()).collect();
        let mut variant = Variant::new(self.region.chrom().to_string(), position as u64, ref_allele, alt_alleles)?;

        let id: String = String::from_utf8_lossy(&record.id()).to_string();
        variant.add_metadata("ID", id);

        let qual: f32 = record.qual();
        let qual_string: String = if qual.is_missing() { ".".to_string() } else { format!("{qual}") };
        variant.add_metadata("QUAL", qual_string);

        let header = record.header();
        let filters: Vec<String> = record.filters()
            .map(|filter_id| String::from_utf8_lossy(&header.id_to_name(filter_id)).to_string())
            .collect();
        let filter_string: String = if filters.is_empty() { ".".to_string() } else { filters.join(";") };
        variant.add_metadata("FILTER", filter_string);

        Ok(Some(variant))
    }
}

impl VariantSource for VcfVariantSource {
    fn next_variant(&mut self) -> Option<Result<Variant, Box<dyn std::error::Error>>> {
        use rust_htslib::bcf::Read;
        if self.is_empty {
            return None;
        }

        loop {
            match self.reader.read(&mut self.record) {
                Some(Ok(())) => {},
                Some(Err(e)) => return Some(Err(Box::new(e))),
                None => return None
            };

            match self.convert_record() {
                Ok(Some(variant)) => return Some(Ok(variant)),
                Ok(None) => {
                    self.skipped += 1;
                },
                Err(e) => return Some(Err(e))
            };
        }
    }
}
