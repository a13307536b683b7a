
use clap::Parser;
use chrono::Datelike;
use flate2::bufread::MultiGzDecoder;
use lazy_static::lazy_static;
use log::{error, info, trace, warn};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::graph_aligner::ScoringConfig;
use crate::window_coordinator::WindowConfig;

lazy_static! {
    /// Stores the full version string we plan to use.
    /// # Examples
    /// * `0.3.0-6bb9635-dirty` - while on a dirty branch
    /// * `0.3.0-6bb9635` - with a fresh commit
    pub static ref FULL_VERSION: String = format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("VERGEN_GIT_DESCRIBE"));
}

#[derive(Clone, Parser)]
#[clap(author,
    version = &**FULL_VERSION,
    about,
    after_help = format!("Copyright (C) {}     Graphite developers
Distributed under the MIT license. This program comes with ABSOLUTELY NO WARRANTY.", chrono::Utc::now().year()))]
pub struct Settings {
    /// Input alignment file in BAM/CRAM format
    #[clap(required = true)]
    #[clap(short = 'b')]
    #[clap(long = "bam")]
    #[clap(value_name = "BAM")]
    #[clap(help_heading = Some("Input/Output"))]
    pub bam_filenames: Vec<PathBuf>,

    /// Input variant file in VCF/BCF format
    #[clap(short = 'c')]
    #[clap(long = "vcf")]
    #[clap(value_name = "VCF")]
    #[clap(help_heading = Some("Input/Output"))]
    pub vcf_filename: PathBuf,

    /// Reference FASTA file
    #[clap(short = 'r')]
    #[clap(long = "reference")]
    #[clap(value_name = "FASTA")]
    #[clap(help_heading = Some("Input/Output"))]
    pub reference_filename: PathBuf,

    /// Output per-allele support file (csv/tsv)
    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(value_name = "FILE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_filename: PathBuf,

    /// Restrict processing to a region, "chrom" or "chrom:start-end" (default: every reference contig)
    #[clap(long = "region")]
    #[clap(value_name = "REGION")]
    #[clap(help_heading = Some("Input/Output"))]
    pub regions: Vec<String>,

    /// Number of threads to use for window processing
    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    pub threads: usize,

    /// Enable verbose output
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Reference span of each graph window
    #[clap(long = "graph-size")]
    #[clap(value_name = "LENGTH")]
    #[clap(default_value = "3000")]
    #[clap(help_heading = Some("Windowing"))]
    pub graph_size: u64,

    /// Number of bases shared by adjacent windows
    #[clap(long = "overlap")]
    #[clap(value_name = "LENGTH")]
    #[clap(default_value = "300")]
    #[clap(help_heading = Some("Windowing"))]
    pub overlap: u64,

    /// Extra reference context added on both sides of each window
    #[clap(long = "alignment-padding")]
    #[clap(value_name = "LENGTH")]
    #[clap(default_value = "150")]
    #[clap(help_heading = Some("Windowing"))]
    pub alignment_padding: u64,

    /// Score for each matching base
    #[clap(long = "match")]
    #[clap(value_name = "SCORE")]
    #[clap(default_value = "2")]
    #[clap(help_heading = Some("Alignment scoring"))]
    pub match_score: i32,

    /// Penalty for each mismatched base
    #[clap(long = "mismatch")]
    #[clap(value_name = "PENALTY")]
    #[clap(default_value = "2")]
    #[clap(help_heading = Some("Alignment scoring"))]
    pub mismatch_penalty: i32,

    /// Penalty for opening a gap
    #[clap(long = "gap-open")]
    #[clap(value_name = "PENALTY")]
    #[clap(default_value = "3")]
    #[clap(help_heading = Some("Alignment scoring"))]
    pub gap_open: i32,

    /// Penalty for each additional gap base
    #[clap(long = "gap-extension")]
    #[clap(value_name = "PENALTY")]
    #[clap(default_value = "1")]
    #[clap(help_heading = Some("Alignment scoring"))]
    pub gap_extension: i32,

    /// Reads shorter than this are not aligned
    #[clap(long = "min-seed-length")]
    #[clap(value_name = "LENGTH")]
    #[clap(default_value = "15")]
    #[clap(help_heading = Some("Alignment scoring"))]
    pub min_seed_length: usize,

    /// Maximum distance from the mapped diagonal, set to 0 to disable banding
    #[clap(long = "band-width")]
    #[clap(value_name = "LENGTH")]
    #[clap(default_value = "500")]
    #[clap(help_heading = Some("Alignment scoring"))]
    pub band_width: usize,

    /// Alignments scoring below this are discarded
    #[clap(long = "min-alignment-score")]
    #[clap(value_name = "SCORE")]
    #[clap(default_value = "20")]
    #[clap(help_heading = Some("Alignment scoring"))]
    pub min_alignment_score: i32,

    /// Sets a minimum MAPQ to include a read in the adjudication
    #[clap(long = "min-mapq")]
    #[clap(value_name = "MAPQ")]
    #[clap(default_value = "5")]
    #[clap(help_heading = Some("Read filtering"))]
    pub min_mapping_quality: u8,

    /// Skips any variant with an allele longer than this
    #[clap(long = "max-allele-size")]
    #[clap(value_name = "LENGTH")]
    #[clap(default_value = "3000")]
    #[clap(help_heading = Some("Read filtering"))]
    pub max_allele_size: usize,
}

/// Checks if a file exists and will otherwise exit
/// # Arguments
/// * `filename` - the file path to check for
/// * `label` - the label to use for error messages
fn check_required_filename(filename: &Path, label: &str) {
    if !filename.exists() {
        error!("{} does not exist: \"{}\"", label, filename.display());
        std::process::exit(exitcode::NOINPUT);
    } else {
        info!("{}: \"{}\"", label, filename.display());
    }
}

/// Checks if the VCF file exists, is bgzipped, and has an index. If it fails any of those, this will exit.
/// # Argument
/// * `filename` - the VCF file path to check
/// * `label` - the label to use for error messages
fn check_required_vcf(filename: &Path, label: &str) {
    check_required_filename(filename, label);

    // BCF and bgzipped VCF both decode as gzip, plain text does not
    let vcf_file: File = match File::open(filename) {
        Ok(f) => f,
        Err(e) => {
            error!("Error while opening {filename:?}: {e}");
            std::process::exit(exitcode::IOERR);
        }
    };
    let file_reader = BufReader::new(vcf_file);
    let mut gz_decoder = MultiGzDecoder::new(file_reader);
    let mut small_buffer: [u8; 10] = [0; 10];
    match gz_decoder.read(&mut small_buffer) {
        Ok(bytes_read) => {
            trace!("Successfully read {bytes_read} bytes from VCF.")
        },
        Err(e) => {
            if e.to_string() == "invalid gzip header" {
                error!("Error while checking {filename:?}: {e}; is the VCF bgzipped?");
            } else {
                error!("Error while checking {filename:?}: {e}");
            }
            std::process::exit(exitcode::IOERR);
        }
    };

    // region fetches need an index, tbi or csi
    let known_indices = ["tbi", "csi"];
    let mut index_found: bool = false;
    for &ki in known_indices.iter() {
        let mut extension_path = filename.to_owned()
            .into_os_string();
        extension_path.push(format!(".{ki}"));
        let extension_path: PathBuf = PathBuf::from(extension_path);
        index_found |= extension_path.exists();
    }
    if !index_found {
        error!("Error while checking {filename:?}: no index found (.tbi or .csi)");
        std::process::exit(exitcode::NOINPUT);
    }
}

impl Settings {
    /// Builds the alignment scoring configuration from our CLI settings
    pub fn scoring_config(&self) -> ScoringConfig {
        ScoringConfig {
            match_score: self.match_score,
            mismatch_penalty: self.mismatch_penalty,
            gap_open: self.gap_open,
            gap_extension: self.gap_extension,
            min_seed_length: self.min_seed_length,
            band_width: self.band_width,
            min_score: self.min_alignment_score
        }
    }

    /// Builds the window layout configuration from our CLI settings
    pub fn window_config(&self) -> WindowConfig {
        WindowConfig {
            graph_size: self.graph_size,
            overlap: self.overlap,
            alignment_padding: self.alignment_padding,
            concurrency_limit: self.threads
        }
    }
}

pub fn get_raw_settings() -> Settings {
    Settings::parse()
}

/// Do some additional checks here, we may increase these as we go.
/// Also can modify settings if needed since we're passing it around.
/// # Arguments
/// * `settings` - the raw settings, nothing has been checked other than what clap does for us.
pub fn check_settings(mut settings: Settings) -> Settings {
    //check for any of our required files
    for filename in settings.bam_filenames.iter() {
        check_required_filename(filename, "Alignment file");
    }
    check_required_vcf(&settings.vcf_filename, "Variant file");
    check_required_filename(&settings.reference_filename, "Reference file");
    info!("Output file: \"{}\"", settings.output_filename.display());

    // 0 doesn't make sense, so lets just error proof it up to 1
    if settings.threads == 0 {
        settings.threads = 1;
    }

    if let Err(e) = settings.window_config().validate() {
        error!("Invalid window configuration: {}", e);
        std::process::exit(exitcode::USAGE);
    }
    if let Err(e) = settings.scoring_config().validate() {
        error!("Invalid scoring configuration: {}", e);
        std::process::exit(exitcode::USAGE);
    }

    // dump stuff to the logger
    info!("Windowing:");
    info!("\tGraph size: {} bp", settings.graph_size);
    info!("\tOverlap: {} bp", settings.overlap);
    info!("\tAlignment padding: +-{} bp", settings.alignment_padding);
    if settings.overlap < settings.alignment_padding {
        warn!("\tOverlap is smaller than the alignment padding, reads near window edges may be clipped.");
    }

    info!("Alignment scoring:");
    info!("\tMatch / mismatch: {} / -{}", settings.match_score, settings.mismatch_penalty);
    info!("\tGap open / extension: -{} / -{}", settings.gap_open, settings.gap_extension);
    info!("\tMinimum seed length: {}", settings.min_seed_length);
    if settings.band_width == 0 {
        info!("\tBanding: DISABLED");
    } else {
        info!("\tBand width: {}", settings.band_width);
    }
    info!("\tMinimum alignment score: {}", settings.min_alignment_score);

    info!("Read filtering:");
    info!("\tMinimum mapping quality: {}", settings.min_mapping_quality);
    info!("\tMaximum allele size: {}", settings.max_allele_size);

    info!("Processing threads: {}", settings.threads);

    //send the settings back
    settings
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_help_footer() {
        let footer: String = Settings::command().get_after_help()
            .map(|f| f.to_string())
            .unwrap_or_default();
        assert!(footer.contains("Graphite developers"));
        assert!(footer.contains("MIT license"));
        assert!(!footer.contains("Pacific Biosciences"));
        assert!(!footer.contains("Research Use Only"));
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::try_parse_from([
            "graphite", "-b", "reads.bam", "-c", "variants.vcf.gz", "-r", "ref.fa", "-o", "support.tsv"
        ]).unwrap();
        assert_eq!(settings.band_width, 500);
        assert_eq!(settings.scoring_config(), ScoringConfig::default());
        assert_eq!(settings.window_config(), WindowConfig::default());
    }
}
