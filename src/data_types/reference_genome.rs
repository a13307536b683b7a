
use bio::io::fasta;
use flate2::bufread::MultiGzDecoder;
use log::{debug, info, warn};
use rustc_hash::FxHashMap as HashMap;
use simple_error::bail;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Anything that can hand out reference bases for an interval.
/// Implementations are shared read-only across window workers, hence the `Send + Sync` bound.
pub trait ReferenceAccessor: Send + Sync {
    /// Retrieves the reference bases for `[start, end)` on `chrom`.
    /// Implementations truncate at the contig end, so the returned slice may be shorter than requested.
    /// # Errors
    /// * if `chrom` is unknown to the accessor
    /// * if `start > end`
    fn get_sequence(&self, chrom: &str, start: u64, end: u64) -> Result<Vec<u8>, Box<dyn std::error::Error>>;

    /// Returns the full length of a contig, if known
    fn contig_len(&self, chrom: &str) -> Option<u64>;
}

/// Wrapper structure for a reference genome
pub struct ReferenceGenome {
    /// The filename we loaded
    filename: PathBuf,
    /// Contains the keys in order of the reference load
    contig_keys: Vec<String>,
    /// Map where keys are contig names and value is ASCII formatted sequence
    contig_map: HashMap<String, Vec<u8>>
}

impl ReferenceGenome {
    /// Loads a reference genome from a given FASTA file
    /// # Arguments
    /// * `fasta_fn` - the FASTA filename, gzip is allowed
    /// # Errors
    /// This will pass through any error detected from loading the provided FASTA file.
    /// This includes file reading and/or record reading errors.
    pub fn from_fasta(fasta_fn: &Path) -> Result<ReferenceGenome, Box<dyn std::error::Error>> {
        info!("Loading {:?}...", fasta_fn);
        let mut contig_keys: Vec<String> = Default::default();
        let mut contig_map: HashMap<String, Vec<u8>> = Default::default();

        let fasta_file: std::fs::File = std::fs::File::open(fasta_fn)?;
        let file_reader = BufReader::new(fasta_file);
        let fasta_reader: fasta::Reader<Box<dyn BufRead>> = if fasta_fn.extension().unwrap_or_default() == "gz" {
            debug!("Detected gzip extension, loading reference with MultiGzDecoder...");
            let gz_decoder = MultiGzDecoder::new(file_reader);
            let bufreader = BufReader::new(gz_decoder);
            fasta::Reader::from_bufread(Box::new(bufreader))
        } else {
            debug!("Loading reference as plain-text file...");
            fasta::Reader::from_bufread(Box::new(file_reader))
        };

        for entry in fasta_reader.records() {
            let record: fasta::Record = entry?;
            let seq_id: String = record.id().to_string();
            let sequence: Vec<u8> = record.seq().to_ascii_uppercase();

            if contig_map.contains_key(&seq_id) {
                bail!("Duplicate contig {:?} in {:?}", seq_id, fasta_fn);
            }
            contig_keys.push(seq_id.clone());
            contig_map.insert(seq_id, sequence);
        }
        info!("Finished loading {} contigs.", contig_map.len());

        Ok(ReferenceGenome {
            filename: fasta_fn.to_path_buf(),
            contig_keys,
            contig_map
        })
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    pub fn contig_keys(&self) -> &[String] {
        &self.contig_keys
    }

    /// Retrieves a reference slice from a given 0-based coordinates.
    /// If `start` or `end` goes past the full contig length, it will be truncated to the full contig length.
    /// # Arguments
    /// * `chromosome` - the chromosome to slice from
    /// * `start` - the 0-based start index (included)
    /// * `end` - the 0-based end index (excluded)
    /// # Errors
    /// * if `chromosome` was not in the FASTA file
    /// * if `start` > `end`
    pub fn get_slice(&self, chromosome: &str, start: usize, end: usize) -> Result<&[u8], Box<dyn std::error::Error>> {
        let full_contig = match self.contig_map.get(chromosome) {
            Some(fc) => fc,
            None => bail!("Contig {:?} was not found in {:?}", chromosome, self.filename)
        };
        truncated_slice(full_contig, chromosome, start, end)
    }
}

impl ReferenceAccessor for ReferenceGenome {
    fn get_sequence(&self, chrom: &str, start: u64, end: u64) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        Ok(self.get_slice(chrom, start as usize, end as usize)?.to_vec())
    }

    fn contig_len(&self, chrom: &str) -> Option<u64> {
        self.contig_map.get(chrom).map(|c| c.len() as u64)
    }
}

/// A reference held entirely in memory, mostly useful for tests and small targeted runs.
#[derive(Default)]
pub struct InMemoryReference {
    contig_map: HashMap<String, Vec<u8>>
}

impl InMemoryReference {
    pub fn new() -> InMemoryReference {
        Default::default()
    }

    /// Adds (or replaces) a contig, upper-casing the sequence
    pub fn add_contig(&mut self, chrom: &str, sequence: &[u8]) {
        self.contig_map.insert(chrom.to_string(), sequence.to_ascii_uppercase());
    }
}

impl ReferenceAccessor for InMemoryReference {
    fn get_sequence(&self, chrom: &str, start: u64, end: u64) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let full_contig = match self.contig_map.get(chrom) {
            Some(fc) => fc,
            None => bail!("Contig {:?} is not loaded", chrom)
        };
        Ok(truncated_slice(full_contig, chrom, start as usize, end as usize)?.to_vec())
    }

    fn contig_len(&self, chrom: &str) -> Option<u64> {
        self.contig_map.get(chrom).map(|c| c.len() as u64)
    }
}

/// Shared slicing logic, truncates both ends to the contig length
fn truncated_slice<'a>(full_contig: &'a [u8], chromosome: &str, start: usize, end: usize) -> Result<&'a [u8], Box<dyn std::error::Error>> {
    if start > end {
        bail!("Invalid slice request {}:{}-{}, start > end", chromosome, start, end);
    }
    let truncated_start = if start <= full_contig.len() { start } else {
        warn!("Received get_slice({:?}, {}, {}), truncated start to {}", chromosome, start, end, full_contig.len());
        full_contig.len()
    };
    let truncated_end = if end <= full_contig.len() { end } else {
        warn!("Received get_slice({:?}, {}, {}), truncated end to {}", chromosome, start, end, full_contig.len());
        full_contig.len()
    };
    Ok(&full_contig[truncated_start..truncated_end])
}
