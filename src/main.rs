
use graphite::adjudicator::AggregationContext;
use graphite::cli::{Settings, check_settings, get_raw_settings};
use graphite::data_types::reference_genome::{ReferenceAccessor, ReferenceGenome};
use graphite::data_types::region::Region;
use graphite::data_types::variant_list::VariantList;
use graphite::graph_aligner::AffineGraphAligner;
use graphite::readers::bam_source::BamReadProvider;
use graphite::readers::load_variants;
use graphite::readers::vcf_source::VcfVariantSource;
use graphite::window_coordinator::{AdjudicationReport, WindowCoordinator, WindowFailure};
use graphite::writers::support_writer::SupportWriter;

use log::{LevelFilter, debug, error, info, warn};
use std::sync::Arc;
use std::time::Instant;

/// Resolves a user region string against the reference, a bare contig name covers the whole contig
/// # Arguments
/// * `region_str` - the user provided region
/// * `reference_genome` - the loaded reference, used for contig lengths
/// # Errors
/// * if the contig is not in the reference or the coordinates do not parse
fn resolve_region(region_str: &str, reference_genome: &ReferenceGenome) -> Result<Region, Box<dyn std::error::Error>> {
    if let Some(contig_len) = reference_genome.contig_len(region_str) {
        return Ok(Region::new(region_str.to_string(), 0, contig_len));
    }
    let chrom: &str = region_str.rsplit_once(':').map(|(c, _coords)| c).unwrap_or(region_str);
    match reference_genome.contig_len(chrom) {
        Some(contig_len) => Region::parse(region_str, Some(contig_len)),
        None => Err(format!("Contig {chrom:?} was not found in the reference").into())
    }
}

fn main() {
    // get the settings
    let settings: Settings = get_raw_settings();
    let filter_level: LevelFilter = match settings.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };

    // immediately setup logging first
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();

    // okay, now we can check all the other settings
    let cli_settings: Settings = check_settings(settings);

    // get our reference genome
    let reference_genome: ReferenceGenome = match ReferenceGenome::from_fasta(&cli_settings.reference_filename) {
        Ok(rg) => rg,
        Err(e) => {
            error!("Error during reference loading: {}", e);
            std::process::exit(exitcode::IOERR);
        }
    };

    // figure out what we are processing
    let regions: Vec<Region> = if cli_settings.regions.is_empty() {
        reference_genome.contig_keys().iter()
            .filter_map(|k| reference_genome.contig_len(k).map(|cl| Region::new(k.clone(), 0, cl)))
            .collect()
    } else {
        let mut regions = vec![];
        for region_str in cli_settings.regions.iter() {
            match resolve_region(region_str, &reference_genome) {
                Ok(r) => regions.push(r),
                Err(e) => {
                    error!("Error while parsing region {:?}: {}", region_str, e);
                    std::process::exit(exitcode::USAGE);
                }
            };
        }
        regions
    };
    info!("Regions to process: {}", regions.len());

    let mut support_writer: SupportWriter = match SupportWriter::new(&cli_settings.output_filename) {
        Ok(sw) => sw,
        Err(e) => {
            error!("Error during support writer creation: {}", e);
            std::process::exit(exitcode::CANTCREAT);
        }
    };

    // shared, read-only collaborators for every window
    let arc_reference_genome: Arc<ReferenceGenome> = Arc::new(reference_genome);
    let read_provider = Arc::new(BamReadProvider::new(
        cli_settings.bam_filenames.clone(),
        Some(cli_settings.reference_filename.clone()),
        cli_settings.min_mapping_quality
    ));
    let aligner = Arc::new(AffineGraphAligner::new(cli_settings.scoring_config()));

    let start_time: Instant = Instant::now();
    let mut full_report: AdjudicationReport = Default::default();
    let mut total_variants: usize = 0;
    for region in regions.iter() {
        let mut variant_source = match VcfVariantSource::new(&cli_settings.vcf_filename, region, cli_settings.max_allele_size) {
            Ok(vs) => vs,
            Err(e) => {
                // contigs missing from the VCF header land here
                warn!("Skipping {}, no variants could be loaded: {}", region, e);
                continue;
            }
        };
        let variant_list: VariantList = match load_variants(&mut variant_source) {
            Ok(vl) => vl,
            Err(e) => {
                error!("Error while parsing VCF file: {}", e);
                std::process::exit(exitcode::IOERR);
            }
        };
        debug!("{}: {} variants loaded, {} skipped", region, variant_list.len(), variant_source.skipped());
        if variant_list.is_empty() {
            debug!("No variants in {}, skipping", region);
            continue;
        }
        total_variants += variant_list.len();

        let arc_variant_list: Arc<VariantList> = Arc::new(variant_list);
        let coordinator: WindowCoordinator = match WindowCoordinator::new(
            arc_reference_genome.clone(),
            arc_variant_list.clone(),
            read_provider.clone(),
            aligner.clone(),
            cli_settings.window_config()
        ) {
            Ok(c) => c,
            Err(e) => {
                error!("Error during window coordinator creation: {}", e);
                std::process::exit(exitcode::USAGE);
            }
        };

        let context: AggregationContext = AggregationContext::new();
        let report: AdjudicationReport = coordinator.process(region, &context);
        let final_list: VariantList = context.finalize(&arc_variant_list);
        match support_writer.write_variants(&final_list) {
            Ok(()) => {},
            Err(e) => {
                error!("Error while writing support file: {}", e);
                std::process::exit(exitcode::IOERR);
            }
        };
        full_report.merge(report);
    }

    // final report
    info!("Windows processed: {} / {}", full_report.windows_processed(), full_report.windows_total());
    if !full_report.failed_windows().is_empty() {
        warn!("Windows skipped: {}", full_report.failed_windows().len());
        for (window, failure) in full_report.failed_windows().iter() {
            match failure {
                WindowFailure::Cancelled => debug!("\t{}: {}", window, failure),
                _ => warn!("\t{}: {}", window, failure)
            };
        }
    }
    info!("Variants adjudicated: {}", total_variants);
    info!("Reads aligned: {}", full_report.reads_aligned());
    info!("Reads without alignment: {}", full_report.reads_unaligned());
    info!("All regions finished successfully after {} seconds.", start_time.elapsed().as_secs_f64());
}
