
use crate::adjudicator::{AggregationContext, WindowAdjudication};
use crate::data_types::reference_genome::ReferenceAccessor;
use crate::data_types::region::Region;
use crate::data_types::variant_list::VariantList;
use crate::data_types::variants::Variant;
use crate::graph_aligner::{ConfigError, GraphAligner};
use crate::readers::ReadProvider;
use crate::sequence_graph::{ConstructionError, SequenceGraph};

use log::{debug, info, trace, warn};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Instant;
use threadpool::ThreadPool;

/// How often to print a progress line, in windows
const UPDATE_SPEED: usize = 100;

/// Window layout and parallelism options
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WindowConfig {
    /// reference span of each window
    pub graph_size: u64,
    /// shared bases between adjacent windows
    pub overlap: u64,
    /// extra reference on both sides of a window for graph context
    pub alignment_padding: u64,
    /// maximum number of windows in flight
    pub concurrency_limit: usize
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            graph_size: 3000,
            overlap: 300,
            alignment_padding: 150,
            concurrency_limit: 1
        }
    }
}

impl WindowConfig {
    /// # Errors
    /// * if `graph_size` or `concurrency_limit` is 0
    /// * if `overlap >= graph_size`, which would never advance
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.graph_size == 0 {
            return Err(ConfigError::ZeroValue { name: "graph size" });
        }
        if self.concurrency_limit == 0 {
            return Err(ConfigError::ZeroValue { name: "concurrency limit" });
        }
        if self.overlap >= self.graph_size {
            return Err(ConfigError::OverlapTooLarge {
                overlap: self.overlap,
                graph_size: self.graph_size
            });
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum WindowFailure {
    #[error("graph construction failed: {0}")]
    Construction(#[from] ConstructionError),
    #[error("reference lookup failed: {0}")]
    Reference(String),
    #[error("read loading failed: {0}")]
    Reads(String),
    #[error("window worker panicked: {0}")]
    Panicked(String),
    #[error("window was cancelled")]
    Cancelled
}

/// Summary of a region-wide run
#[derive(Debug, Default)]
pub struct AdjudicationReport {
    /// number of windows the region was split into
    windows_total: usize,
    /// windows that completed and were committed
    windows_processed: usize,
    /// windows that were skipped, with the reason
    failed_windows: Vec<(Region, WindowFailure)>,
    /// reads that produced a trace, summed over windows
    reads_aligned: usize,
    /// reads without a usable alignment, summed over windows
    reads_unaligned: usize
}

impl AdjudicationReport {
    pub fn windows_total(&self) -> usize {
        self.windows_total
    }

    pub fn windows_processed(&self) -> usize {
        self.windows_processed
    }

    pub fn failed_windows(&self) -> &[(Region, WindowFailure)] {
        &self.failed_windows
    }

    pub fn reads_aligned(&self) -> usize {
        self.reads_aligned
    }

    pub fn reads_unaligned(&self) -> usize {
        self.reads_unaligned
    }

    /// Folds another report into this one, used when several regions are processed
    pub fn merge(&mut self, other: AdjudicationReport) {
        self.windows_total += other.windows_total;
        self.windows_processed += other.windows_processed;
        self.failed_windows.extend(other.failed_windows);
        self.reads_aligned += other.reads_aligned;
        self.reads_unaligned += other.reads_unaligned;
    }
}

/// Splits a region into windows of `graph_size` bases that advance by `graph_size - overlap`; the last window is clipped to the region end.
/// # Arguments
/// * `region` - the region to split
/// * `config` - window layout, assumed to be validated
pub fn partition_windows(region: &Region, config: &WindowConfig) -> Vec<Region> {
    let mut windows: Vec<Region> = vec![];
    if region.is_empty() {
        return windows;
    }

    let step: u64 = config.graph_size - config.overlap;
    let mut start: u64 = region.start();
    loop {
        let end: u64 = (start + config.graph_size).min(region.end());
        windows.push(Region::new(region.chrom().to_string(), start, end));
        if end >= region.end() {
            break;
        }
        start += step;
    }
    windows
}

/// Runs build, align, and aggregate for a single window, returning the local buffer.
/// Nothing shared is touched here; the caller decides whether to commit the result.
/// # Arguments
/// * `window` - the window to adjudicate
/// * `reference` - reference accessor for the graph context
/// * `variants` - the region-wide variant list
/// * `reads` - provider for the window's reads
/// * `aligner` - the alignment strategy
/// * `config` - window layout options
/// * `cancel` - cooperative cancellation flag
/// # Errors
/// * if the flag is raised, the reference cannot be fetched, the graph cannot be built, or the reads cannot be loaded
#[allow(clippy::too_many_arguments)]
pub fn adjudicate_window(
    window: &Region, reference: &dyn ReferenceAccessor, variants: &VariantList, reads: &dyn ReadProvider,
    aligner: &dyn GraphAligner, config: &WindowConfig, cancel: &AtomicBool
) -> Result<WindowAdjudication, WindowFailure> {
    if cancel.load(Ordering::Relaxed) {
        return Err(WindowFailure::Cancelled);
    }
    debug!("Window {} starting", window);

    // padded context for the graph; the accessor may truncate at the contig end
    let context_start: u64 = window.start().saturating_sub(config.alignment_padding);
    let mut context_end: u64 = window.end() + config.alignment_padding;
    if let Some(contig_len) = reference.contig_len(window.chrom()) {
        context_end = context_end.min(contig_len);
    }
    let context_sequence: Vec<u8> = reference.get_sequence(window.chrom(), context_start, context_end)
        .map_err(|e| WindowFailure::Reference(e.to_string()))?;
    let context = Region::new(window.chrom().to_string(), context_start, context_start + context_sequence.len() as u64);

    // every variant the padded context fully holds, so a read sees the same alleles in each window that contains it
    let mut window_variants: Vec<&Variant> = vec![];
    for variant in variants.overlapping(&context).into_iter() {
        if context.contains(variant.position(), variant.end()) {
            window_variants.push(variant);
        } else {
            trace!("Variant at {}:{} does not fit in context {}, skipping", variant.chrom(), variant.position() + 1, context);
        }
    }

    let (graph, node_to_alleles) = SequenceGraph::build(&context_sequence, &context, &window_variants)?;
    trace!("Window {} graph: {} nodes, {} variants", window, graph.num_nodes(), window_variants.len());

    let mut buffer = WindowAdjudication::new();
    let mut reader = reads.open(window)
        .map_err(|e| WindowFailure::Reads(e.to_string()))?;
    while let Some(record_result) = reader.next_alignment() {
        if cancel.load(Ordering::Relaxed) {
            return Err(WindowFailure::Cancelled);
        }
        let record = record_result.map_err(|e| WindowFailure::Reads(e.to_string()))?;
        match aligner.align(&graph, &record) {
            Ok(trace_result) => {
                buffer.apply(Arc::new(record), &trace_result, &node_to_alleles);
            },
            Err(no_alignment) => {
                trace!("No alignment for {}: {}", record.read_key(), no_alignment);
                buffer.record_unaligned();
            }
        };
    }

    debug!("Window {} finished: {} aligned, {} unaligned", window, buffer.reads_aligned(), buffer.reads_unaligned());
    Ok(buffer)
}

/// Converts a panic payload into something printable
fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Partitions a region into overlapping windows and drives each through build, align, and aggregate.
/// Window results are committed to the shared context only from the calling thread, and only when the window fully succeeds.
pub struct WindowCoordinator {
    reference: Arc<dyn ReferenceAccessor>,
    variants: Arc<VariantList>,
    reads: Arc<dyn ReadProvider>,
    aligner: Arc<dyn GraphAligner>,
    config: WindowConfig,
    cancel: Arc<AtomicBool>
}

impl WindowCoordinator {
    /// # Errors
    /// * if the window configuration is invalid
    pub fn new(
        reference: Arc<dyn ReferenceAccessor>, variants: Arc<VariantList>, reads: Arc<dyn ReadProvider>,
        aligner: Arc<dyn GraphAligner>, config: WindowConfig
    ) -> Result<WindowCoordinator, ConfigError> {
        config.validate()?;
        Ok(WindowCoordinator {
            reference,
            variants,
            reads,
            aligner,
            config,
            cancel: Arc::new(AtomicBool::new(false))
        })
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Shared flag; setting it makes windows that have not finished return `WindowFailure::Cancelled`
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// Adjudicates every window in the region and merges the results into `context`.
    /// # Arguments
    /// * `region` - the region to process
    /// * `context` - the shared aggregation context
    pub fn process(&self, region: &Region, context: &AggregationContext) -> AdjudicationReport {
        let windows: Vec<Region> = partition_windows(region, &self.config);
        info!("Processing {} in {} windows...", region, windows.len());

        let mut report = AdjudicationReport {
            windows_total: windows.len(),
            ..Default::default()
        };
        let start_time: Instant = Instant::now();
        let mut results_received: usize = 0;

        if self.config.concurrency_limit <= 1 {
            for window in windows.into_iter() {
                let result = catch_unwind(AssertUnwindSafe(|| adjudicate_window(
                    &window, self.reference.as_ref(), &self.variants, self.reads.as_ref(),
                    self.aligner.as_ref(), &self.config, &self.cancel
                ))).unwrap_or_else(|payload| Err(WindowFailure::Panicked(panic_message(payload))));

                results_received += 1;
                self.handle_result(window, result, context, &mut report);
                log_progress(results_received, report.windows_total, start_time);
            }
        } else {
            let pool = ThreadPool::new(self.config.concurrency_limit);
            let (tx, rx) = mpsc::channel();
            for window in windows.into_iter() {
                let tx = tx.clone();
                let reference = self.reference.clone();
                let variants = self.variants.clone();
                let reads = self.reads.clone();
                let aligner = self.aligner.clone();
                let config = self.config.clone();
                let cancel = self.cancel.clone();

                pool.execute(move|| {
                    let result = catch_unwind(AssertUnwindSafe(|| adjudicate_window(
                        &window, reference.as_ref(), &variants, reads.as_ref(),
                        aligner.as_ref(), &config, &cancel
                    ))).unwrap_or_else(|payload| Err(WindowFailure::Panicked(panic_message(payload))));
                    tx.send((window, result)).expect("channel will be there waiting for the pool");
                });
            }
            drop(tx);

            // finishes once every worker has dropped its sender
            for (window, result) in rx.iter() {
                results_received += 1;
                self.handle_result(window, result, context, &mut report);
                log_progress(results_received, report.windows_total, start_time);
            }
        }

        info!(
            "Finished {}: {} / {} windows committed, {} failed",
            region, report.windows_processed, report.windows_total, report.failed_windows.len()
        );
        report
    }

    /// Commits a successful window or records the failure
    fn handle_result(&self, window: Region, result: Result<WindowAdjudication, WindowFailure>, context: &AggregationContext, report: &mut AdjudicationReport) {
        match result {
            Ok(buffer) => {
                report.reads_aligned += buffer.reads_aligned();
                report.reads_unaligned += buffer.reads_unaligned();
                report.windows_processed += 1;
                context.commit(buffer);
            },
            Err(failure) => {
                match failure {
                    WindowFailure::Cancelled => debug!("Window {} cancelled", window),
                    _ => warn!("Skipping window {}: {}", window, failure)
                };
                report.failed_windows.push((window, failure));
            }
        };
    }
}

fn log_progress(results_received: usize, total: usize, start_time: Instant) {
    if results_received % UPDATE_SPEED == 0 {
        let time_so_far: f64 = start_time.elapsed().as_secs_f64();
        let windows_per_sec: f64 = results_received as f64 / time_so_far;
        info!("Received results for {} / {} windows: {:.4} windows/sec", results_received, total, windows_per_sec);
    }
}
