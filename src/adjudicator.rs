
use crate::data_types::alignment_record::AlignmentRecord;
use crate::data_types::variant_list::VariantList;
use crate::data_types::variants::AlleleRef;
use crate::graph_aligner::TraceResult;
use crate::sequence_graph::NodeAlleleMap;

use log::{debug, trace};
use rustc_hash::FxHashMap as HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The mapping kept for one alignment identity, along with the alleles it credits
#[derive(Clone, Debug)]
pub struct RetainedMapping {
    /// the read that produced this mapping
    record: Arc<AlignmentRecord>,
    /// alignment score, used for the best-mapping comparison
    score: i32,
    /// distinct alleles on the traced path, sorted
    alleles: Vec<AlleleRef>
}

impl RetainedMapping {
    pub fn record(&self) -> &AlignmentRecord {
        &self.record
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn alleles(&self) -> &[AlleleRef] {
        &self.alleles
    }
}

/// Local result buffer for one window.
/// Nothing in here is visible to other windows until it is committed to an `AggregationContext`.
#[derive(Debug, Default)]
pub struct WindowAdjudication {
    /// best mapping per read key within this window
    mappings: HashMap<String, RetainedMapping>,
    /// number of reads that produced a trace
    reads_aligned: usize,
    /// number of reads that had no usable alignment
    reads_unaligned: usize
}

impl WindowAdjudication {
    pub fn new() -> WindowAdjudication {
        Default::default()
    }

    /// Converts one traced path into a candidate mapping for the read.
    /// An allele is credited only when the path runs over the bases that tell it apart from the other alleles, so a read that stops inside
    /// the shared flank of a compound group credits nothing there. Each allele is credited at most once, no matter how many segments land on
    /// its node(s).
    /// # Arguments
    /// * `record` - the aligned read
    /// * `trace_result` - the traced best path for the read
    /// * `node_to_alleles` - the allele index produced alongside the graph
    pub fn apply(&mut self, record: Arc<AlignmentRecord>, trace_result: &TraceResult, node_to_alleles: &NodeAlleleMap) {
        let mut alleles: Vec<AlleleRef> = vec![];
        for coverage in trace_result.node_coverage().iter() {
            if let Some(spans) = node_to_alleles.get(&coverage.node_id) {
                alleles.extend(spans.iter()
                    .filter(|span| span.is_covered(coverage))
                    .map(|span| span.allele()));
            }
        }
        alleles.sort();
        alleles.dedup();

        self.reads_aligned += 1;
        let mapping = RetainedMapping {
            record,
            score: trace_result.score(),
            alleles
        };

        // the same key can show up twice in one window, same rule as the cross-window merge
        match self.mappings.entry(mapping.record.read_key().to_string()) {
            Entry::Occupied(mut entry) => {
                if mapping.score > entry.get().score {
                    entry.insert(mapping);
                }
            },
            Entry::Vacant(entry) => {
                entry.insert(mapping);
            }
        };
    }

    /// Marks a read that did not produce an alignment
    pub fn record_unaligned(&mut self) {
        self.reads_unaligned += 1;
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn reads_aligned(&self) -> usize {
        self.reads_aligned
    }

    pub fn reads_unaligned(&self) -> usize {
        self.reads_unaligned
    }
}

/// Counts for a single commit, mostly for logging
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CommitSummary {
    /// alignment identities seen for the first time
    pub inserted: usize,
    /// identities whose retained mapping was superseded
    pub replaced: usize,
    /// candidates that lost to an existing mapping
    pub kept: usize
}

/// Shared tables; only ever touched while holding the lock
#[derive(Default)]
struct AggregationState {
    /// best mapping per alignment identity, region-wide
    best_mappings: HashMap<String, RetainedMapping>,
    /// per-allele support derived from `best_mappings`
    support: HashMap<AlleleRef, u32>
}

impl AggregationState {
    fn credit(&mut self, alleles: &[AlleleRef]) {
        for allele in alleles.iter() {
            *self.support.entry(*allele).or_insert(0) += 1;
        }
    }

    fn retract(&mut self, alleles: &[AlleleRef]) {
        for allele in alleles.iter() {
            if let Some(count) = self.support.get_mut(allele) {
                *count -= 1;
            }
        }
    }
}

/// Region-wide aggregation context.
/// Counters are only changed through `commit`, which applies the best-mapping rule: a mapping is replaced only by a strictly higher
/// score, and the old mapping's credits are retracted before the new ones are applied.
#[derive(Default)]
pub struct AggregationContext {
    state: Mutex<AggregationState>
}

impl AggregationContext {
    pub fn new() -> AggregationContext {
        Default::default()
    }

    /// the state is only mutated under the lock with no fallible steps, so a poisoned lock still holds consistent data
    fn lock(&self) -> MutexGuard<'_, AggregationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes a finished window's buffer into the shared tables.
    /// # Arguments
    /// * `buffer` - the complete local results for one window
    pub fn commit(&self, buffer: WindowAdjudication) -> CommitSummary {
        let mut summary: CommitSummary = Default::default();
        let mut state = self.lock();
        for (read_key, mapping) in buffer.mappings.into_iter() {
            // take the previous mapping out so the state can be mutated freely
            let previous: Option<RetainedMapping> = state.best_mappings.remove(&read_key);
            let retained: RetainedMapping = match previous {
                None => {
                    state.credit(&mapping.alleles);
                    summary.inserted += 1;
                    mapping
                },
                Some(previous) if mapping.score > previous.score => {
                    trace!("Replacing mapping for {}: {} -> {}", read_key, previous.score, mapping.score);
                    state.retract(&previous.alleles);
                    state.credit(&mapping.alleles);
                    summary.replaced += 1;
                    mapping
                },
                Some(previous) => {
                    summary.kept += 1;
                    previous
                }
            };
            state.best_mappings.insert(read_key, retained);
        }
        debug!("Committed window buffer: {:?}", summary);
        summary
    }

    /// Current support for a single allele
    pub fn support(&self, allele: AlleleRef) -> u32 {
        self.lock().support.get(&allele).copied().unwrap_or(0)
    }

    /// Number of distinct alignment identities retained
    pub fn num_mappings(&self) -> usize {
        self.lock().best_mappings.len()
    }

    /// Returns the retained mapping for a read key, if any
    pub fn mapping(&self, read_key: &str) -> Option<RetainedMapping> {
        self.lock().best_mappings.get(read_key).cloned()
    }

    /// Lists the alignment records currently credited to an allele, sorted by read key
    pub fn supporting_reads(&self, allele: AlleleRef) -> Vec<Arc<AlignmentRecord>> {
        let state = self.lock();
        let mut ret: Vec<Arc<AlignmentRecord>> = state.best_mappings.values()
            .filter(|m| m.alleles.binary_search(&allele).is_ok())
            .map(|m| m.record.clone())
            .collect();
        ret.sort_by(|a, b| a.read_key().cmp(b.read_key()));
        ret
    }

    /// Copies the final counters onto the variants and returns the updated list for the writer.
    /// # Arguments
    /// * `variants` - the region-wide variants the allele references point into
    pub fn finalize(&self, variants: &VariantList) -> VariantList {
        let state = self.lock();
        let mut ret = VariantList::new();
        for variant in variants.variants().iter() {
            let mut updated = variant.clone();
            for allele_index in 0..updated.num_alleles() {
                let count: u32 = state.support.get(&variant.allele_ref(allele_index)).copied().unwrap_or(0);
                updated.set_support(allele_index, count);
            }
            ret.add_or_update(updated);
        }
        ret
    }
}
