
use crate::data_types::alignment_record::AlignmentRecord;
use crate::data_types::region::Region;
use crate::readers::{AlignmentReader, ReadProvider};

use log::trace;
use rust_htslib::{bam, htslib};
use std::path::PathBuf;

/// Returns true if the alignment record should be ignored for adjudication.
/// Filters out unmapped, secondary, QC-fail, and duplicate records, as well as anything below the MAPQ cutoff.
/// # Arguments
/// * `flags` - the SAM flags for the record
/// * `mapq` - the record mapping quality
/// * `min_mapq` - the minimum MAPQ to keep
pub fn filter_out_alignment(flags: u16, mapq: u8, min_mapq: u8) -> bool {
    static FLAG_FILTER: u32 =
        htslib::BAM_FUNMAP | htslib::BAM_FSECONDARY | htslib::BAM_FQCFAIL | htslib::BAM_FDUP;

    ((flags as u32) & FLAG_FILTER) != 0 || mapq < min_mapq
}

/// Builds the alignment identity key; mates of a pair get distinct keys.
/// # Arguments
/// * `qname` - the read name
/// * `flags` - the SAM flags for the record
pub fn alignment_key(qname: &[u8], flags: u16) -> String {
    let name = String::from_utf8_lossy(qname);
    let flags = flags as u32;
    if flags & htslib::BAM_FPAIRED == 0 {
        name.to_string()
    } else if flags & htslib::BAM_FREAD1 != 0 {
        format!("{name}/1")
    } else if flags & htslib::BAM_FREAD2 != 0 {
        format!("{name}/2")
    } else {
        name.to_string()
    }
}

/// Shared description of the BAM inputs; each window opens its own readers through it.
pub struct BamReadProvider {
    /// the indexed BAM/CRAM files
    bam_paths: Vec<PathBuf>,
    /// reference, required for CRAM decoding
    reference_filename: Option<PathBuf>,
    /// minimum MAPQ to keep a read
    min_mapq: u8
}

impl BamReadProvider {
    pub fn new(bam_paths: Vec<PathBuf>, reference_filename: Option<PathBuf>, min_mapq: u8) -> BamReadProvider {
        BamReadProvider {
            bam_paths,
            reference_filename,
            min_mapq
        }
    }
}

impl ReadProvider for BamReadProvider {
    fn open(&self, region: &Region) -> Result<Box<dyn AlignmentReader>, Box<dyn std::error::Error>> {
        use rust_htslib::bam::Read;
        let mut readers: Vec<bam::IndexedReader> = Vec::with_capacity(self.bam_paths.len());
        for bam_fn in self.bam_paths.iter() {
            let mut bam_reader = bam::IndexedReader::from_path(bam_fn)?;
            if let Some(reference_filename) = self.reference_filename.as_ref() {
                bam_reader.set_reference(reference_filename)?;
            }
            bam_reader.fetch((region.chrom(), region.start(), region.end()))?;
            readers.push(bam_reader);
        }

        Ok(Box::new(BamReadSource {
            readers,
            current_reader: 0,
            record: bam::Record::new(),
            min_mapq: self.min_mapq,
            filtered: 0
        }))
    }
}

/// Reference coordinate of read base 0, None for records without a position.
/// The stored sequence keeps its soft clips, so they are walked back from the alignment start.
fn position_hint(record: &bam::Record) -> Option<u64> {
    if record.pos() < 0 {
        return None;
    }
    let leading_clips: i64 = record.cigar().leading_softclips();
    Some(record.pos().saturating_sub(leading_clips).max(0) as u64)
}

/// Streams filtered records from one or more fetched BAM readers, one file after the other.
pub struct BamReadSource {
    readers: Vec<bam::IndexedReader>,
    current_reader: usize,
    record: bam::Record,
    min_mapq: u8,
    filtered: usize
}

impl BamReadSource {
    pub fn filtered(&self) -> usize {
        self.filtered
    }
}

impl AlignmentReader for BamReadSource {
    fn next_alignment(&mut self) -> Option<Result<AlignmentRecord, Box<dyn std::error::Error>>> {
        use rust_htslib::bam::Read;
        while self.current_reader < self.readers.len() {
            match self.readers[self.current_reader].read(&mut self.record) {
                Some(Ok(())) => {},
                Some(Err(e)) => return Some(Err(Box::new(e))),
                None => {
                    self.current_reader += 1;
                    continue;
                }
            };

            //make sure we care about the alignment
            if filter_out_alignment(self.record.flags(), self.record.mapq(), self.min_mapq) {
                self.filtered += 1;
                continue;
            }

            let read_key: String = alignment_key(self.record.qname(), self.record.flags());
            let sequence: Vec<u8> = self.record.seq().as_bytes();
            if sequence.is_empty() {
                // secondary-style records with SEQ = "*"
                trace!("Skipping {} with no stored sequence", read_key);
                self.filtered += 1;
                continue;
            }
            let position_hint: Option<u64> = position_hint(&self.record);
            return Some(Ok(AlignmentRecord::new(read_key, sequence, position_hint)));
        }
        None
    }
}
