
use serde::Serialize;
use std::fs::File;
use std::path::Path;

use crate::data_types::variant_list::VariantList;

/// Writes the per-allele support table for an adjudicated variant list
pub struct SupportWriter {
    /// Handle for the CSV writer
    csv_writer: csv::Writer<File>
}

/// Contains all the data written to each row of the support file
#[derive(Serialize)]
struct SupportRow {
    /// the chromosome of the variant
    chrom: String,
    /// 1-based position, matching VCF convention
    pos: u64,
    /// the VCF ID, "." if missing
    id: String,
    /// 0 for REF, 1+ for the ALT alleles
    allele_index: usize,
    /// "ref" or "alt"
    role: String,
    /// the allele sequence
    allele: String,
    /// number of reads whose best mapping supports the allele
    support: u32
}

impl SupportWriter {
    /// Creates a new writer for a given filename
    /// # Arguments
    /// * `filename` - the path to write all rows to, ".csv" selects comma delimiting, anything else is tab-delimited
    pub fn new(filename: &Path) -> csv::Result<SupportWriter> {
        // modify the delimiter to "," if it ends with .csv
        let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
        let delimiter: u8 = if is_csv { b',' } else { b'\t' };
        let csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(filename)?;
        Ok(SupportWriter {
            csv_writer
        })
    }

    /// Writes one row per allele for every variant in the list, in list order.
    /// # Arguments
    /// * `variant_list` - the finalized variants with support counts populated
    /// # Errors
    /// * if the csv_writer has any errors
    pub fn write_variants(&mut self, variant_list: &VariantList) -> Result<(), Box<dyn std::error::Error>> {
        for variant in variant_list.variants().iter() {
            let id: String = variant.get_metadata("ID").unwrap_or(".").to_string();
            for (allele_index, allele) in variant.alleles().enumerate() {
                let row: SupportRow = SupportRow {
                    chrom: variant.chrom().to_string(),
                    pos: variant.position() + 1,
                    id: id.clone(),
                    allele_index,
                    role: allele.role().to_string(),
                    allele: String::from_utf8_lossy(allele.sequence()).to_string(),
                    support: variant.support(allele_index)
                };
                self.csv_writer.serialize(&row)?;
            }
        }
        self.csv_writer.flush()?;
        Ok(())
    }
}
