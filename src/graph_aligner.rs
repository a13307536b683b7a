
use crate::data_types::alignment_record::AlignmentRecord;
use crate::sequence_graph::SequenceGraph;

use log::trace;

/// Floor for unreachable cells, far enough from i32::MIN that a few subtractions never wrap
pub const NEG_INF: i32 = i32::MIN / 2;

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be > 0")]
    ZeroValue { name: &'static str },
    #[error("{name} must be >= 0, got {value}")]
    NegativeValue { name: &'static str, value: i32 },
    #[error("overlap ({overlap}) must be smaller than graph size ({graph_size})")]
    OverlapTooLarge { overlap: u64, graph_size: u64 }
}

/// Reasons a read does not produce a usable alignment; none of these are fatal.
#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum NoAlignment {
    #[error("graph has no nodes")]
    EmptyGraph,
    #[error("read length {length} is below the minimum seed length {min_seed_length}")]
    ReadTooShort { length: usize, min_seed_length: usize },
    #[error("no positive-scoring path through the graph")]
    NoPath,
    #[error("best score {score} is below the floor {floor}")]
    BelowScoreFloor { score: i32, floor: i32 }
}

/// Scoring and filtering options for the affine-gap aligner
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScoringConfig {
    /// reward per identical base
    pub match_score: i32,
    /// penalty per substitution
    pub mismatch_penalty: i32,
    /// penalty for the first base of an insertion or deletion
    pub gap_open: i32,
    /// penalty for every additional gap base
    pub gap_extension: i32,
    /// reads shorter than this are not aligned
    pub min_seed_length: usize,
    /// maximum distance from the hinted diagonal, 0 disables banding
    pub band_width: usize,
    /// best scores below this are reported as NoAlignment
    pub min_score: i32
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            match_score: 2,
            mismatch_penalty: 2,
            gap_open: 3,
            gap_extension: 1,
            min_seed_length: 15,
            band_width: 500,
            min_score: 20
        }
    }
}

impl ScoringConfig {
    /// Checks the scoring scheme for values that would break the recurrences.
    /// # Errors
    /// * if `match_score` is not positive
    /// * if any penalty is negative
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.match_score <= 0 {
            return Err(ConfigError::ZeroValue { name: "match score" });
        }
        for (name, value) in [
            ("mismatch penalty", self.mismatch_penalty),
            ("gap open penalty", self.gap_open),
            ("gap extension penalty", self.gap_extension),
            ("minimum alignment score", self.min_score)
        ] {
            if value < 0 {
                return Err(ConfigError::NegativeValue { name, value });
            }
        }
        Ok(())
    }
}

/// Operation for a single traced cell
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, strum::Display)]
pub enum AlignmentOperation {
    #[strum(serialize = "=")]
    Match,
    #[strum(serialize = "X")]
    Mismatch,
    #[strum(serialize = "I")]
    Insertion,
    #[strum(serialize = "D")]
    Deletion
}

/// A run of one operation on one node
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TraceSegment {
    node_id: usize,
    /// offset of the first node base used by the run; for insertions, the number of node bases before the inserted read bases
    node_start: usize,
    operation: AlignmentOperation,
    length: usize
}

impl TraceSegment {
    pub fn new(node_id: usize, node_start: usize, operation: AlignmentOperation, length: usize) -> TraceSegment {
        TraceSegment {
            node_id,
            node_start,
            operation,
            length
        }
    }

    pub fn node_id(&self) -> usize {
        self.node_id
    }

    pub fn node_start(&self) -> usize {
        self.node_start
    }

    pub fn operation(&self) -> AlignmentOperation {
        self.operation
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Node bases used by this run as a half-open range; insertions use none
    pub fn node_range(&self) -> (usize, usize) {
        match self.operation {
            AlignmentOperation::Insertion => (self.node_start, self.node_start),
            _ => (self.node_start, self.node_start + self.length)
        }
    }
}

/// The part of one node that a traced path runs over
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NodeCoverage {
    /// the node id
    pub node_id: usize,
    /// first node base on the path
    pub first: usize,
    /// one past the last node base on the path
    pub end: usize,
    /// the path arrives from a parent node
    pub entered: bool,
    /// the path continues into a child node
    pub exited: bool
}

/// The optimal local path of one read through a graph
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TraceResult {
    /// path segments in graph order
    segments: Vec<TraceSegment>,
    /// total alignment score
    score: i32,
    /// first aligned read base, 0-based
    read_start: usize,
    /// one past the last aligned read base
    read_end: usize
}

impl TraceResult {
    /// Creates a trace from already collapsed segments.
    /// # Arguments
    /// * `segments` - the path in graph order
    /// * `score` - the total alignment score
    /// * `read_start` - first aligned read base, 0-based
    /// * `read_end` - one past the last aligned read base
    pub fn new(segments: Vec<TraceSegment>, score: i32, read_start: usize, read_end: usize) -> TraceResult {
        TraceResult {
            segments,
            score,
            read_start,
            read_end
        }
    }

    pub fn segments(&self) -> &[TraceSegment] {
        &self.segments
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn read_start(&self) -> usize {
        self.read_start
    }

    pub fn read_end(&self) -> usize {
        self.read_end
    }

    /// The distinct nodes on the path, in path order
    pub fn traversed_nodes(&self) -> Vec<usize> {
        self.node_coverage().iter()
            .map(|c| c.node_id)
            .collect()
    }

    /// Per-node extent of the path, in path order
    pub fn node_coverage(&self) -> Vec<NodeCoverage> {
        let mut ret: Vec<NodeCoverage> = vec![];
        for segment in self.segments.iter() {
            let (first, end) = segment.node_range();
            match ret.last_mut() {
                Some(last) if last.node_id == segment.node_id => {
                    last.first = last.first.min(first);
                    last.end = last.end.max(end);
                },
                _ => ret.push(NodeCoverage {
                    node_id: segment.node_id,
                    first,
                    end,
                    entered: false,
                    exited: false
                })
            };
        }

        let num_nodes = ret.len();
        for (i, coverage) in ret.iter_mut().enumerate() {
            coverage.entered = i > 0;
            coverage.exited = i + 1 < num_nodes;
        }
        ret
    }

    /// Compact text form, e.g. `0:3= 1:1X 3:4=`
    pub fn cigar_string(&self) -> String {
        self.segments.iter()
            .map(|s| format!("{}:{}{}", s.node_id, s.length, s.operation))
            .collect::<Vec<String>>()
            .join(" ")
    }
}

/// Strategy for aligning a read onto a built graph.
/// Implementations must not mutate the graph, many reads are aligned against one graph concurrently.
pub trait GraphAligner: Send + Sync {
    /// Aligns a single read, returning the traced best path.
    /// # Errors
    /// * NoAlignment if the read is too short, the graph is empty, or nothing scores above the floor
    fn align(&self, graph: &SequenceGraph, read: &AlignmentRecord) -> Result<TraceResult, NoAlignment>;
}

/// Dynamic programming matrices for one node, column-major.
/// Column 0 holds the state imported from the parents and is stored for every row. Base columns only store the rows inside
/// the band; anything outside reads as unreachable, except row 0 where H is the local-alignment baseline of 0.
struct NodeMatrix {
    cols: usize,
    /// first stored row of each column
    row_starts: Vec<usize>,
    /// offset of each column into the flat buffers, plus one trailing entry
    col_offsets: Vec<usize>,
    h: Vec<i32>,
    e: Vec<i32>,
    f: Vec<i32>
}

impl NodeMatrix {
    /// # Arguments
    /// * `rows` - read length + 1
    /// * `bands` - the stored rows `[start, end)` of each base column, column 0 is always stored in full
    fn new(rows: usize, bands: &[(usize, usize)]) -> NodeMatrix {
        let cols = bands.len() + 1;
        let mut row_starts: Vec<usize> = Vec::with_capacity(cols);
        let mut col_offsets: Vec<usize> = Vec::with_capacity(cols + 1);
        row_starts.push(0);
        col_offsets.push(0);
        col_offsets.push(rows);
        for &(start, end) in bands.iter() {
            row_starts.push(start);
            let previous = col_offsets[col_offsets.len() - 1];
            col_offsets.push(previous + end.saturating_sub(start));
        }

        let total = col_offsets[cols];
        NodeMatrix {
            cols,
            row_starts,
            col_offsets,
            h: vec![NEG_INF; total],
            e: vec![NEG_INF; total],
            f: vec![NEG_INF; total]
        }
    }

    /// Flat index of a stored cell, None if the cell is outside the band
    #[inline]
    fn slot(&self, col: usize, row: usize) -> Option<usize> {
        let start = self.row_starts[col];
        let height = self.col_offsets[col + 1] - self.col_offsets[col];
        if row >= start && row < start + height {
            Some(self.col_offsets[col] + row - start)
        } else {
            None
        }
    }

    /// Stored rows of a base column as a range
    fn stored_rows(&self, col: usize) -> std::ops::Range<usize> {
        let start = self.row_starts[col];
        start..(start + self.col_offsets[col + 1] - self.col_offsets[col])
    }

    fn h(&self, col: usize, row: usize) -> i32 {
        match self.slot(col, row) {
            Some(i) => self.h[i],
            None => if row == 0 { 0 } else { NEG_INF }
        }
    }

    fn e(&self, col: usize, row: usize) -> i32 {
        self.slot(col, row).map(|i| self.e[i]).unwrap_or(NEG_INF)
    }

    fn f(&self, col: usize, row: usize) -> i32 {
        self.slot(col, row).map(|i| self.f[i]).unwrap_or(NEG_INF)
    }

    fn last_col(&self) -> usize {
        self.cols - 1
    }

    /// Number of cells held in memory
    fn stored_cells(&self) -> usize {
        self.h.len()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum TraceState {
    Best,
    Deletion,
    Insertion
}

/// Local Gotoh alignment over the graph topology.
/// Graph columns are node bases, rows are read bases. H is the best score ending in a cell, E ends in a deletion (graph base skipped),
/// F ends in an insertion (read base skipped). Gaps cost `gap_open` for the first base and `gap_extension` after that.
/// When the read has a position hint and `band_width > 0`, only cells near the hinted diagonal are computed and stored.
pub struct AffineGraphAligner {
    config: ScoringConfig
}

impl AffineGraphAligner {
    pub fn new(config: ScoringConfig) -> AffineGraphAligner {
        AffineGraphAligner {
            config
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    fn substitution(&self, graph_base: u8, read_base: u8) -> i32 {
        if graph_base == read_base {
            self.config.match_score
        } else {
            -self.config.mismatch_penalty
        }
    }

    /// Rows `[start, end)` to fill for every base column of a node.
    /// Without banding this is every read row; with it, rows within `band_width` of the row the hint puts on each reference coordinate.
    fn node_bands(&self, node_ref_start: u64, node_len: usize, rows: usize, position_hint: Option<u64>) -> Vec<(usize, usize)> {
        match position_hint {
            Some(hint) if self.config.band_width > 0 => {
                let band_width = self.config.band_width as i64;
                (1..=node_len).map(|col| {
                    // reference coordinate of this column, minus the hint, gives the expected 1-based read row
                    let expected_row: i64 = node_ref_start as i64 + col as i64 - hint as i64;
                    let start = (expected_row - band_width).max(1);
                    let end = (expected_row + band_width + 1).min(rows as i64);
                    if start < end {
                        (start as usize, end as usize)
                    } else {
                        (1, 1)
                    }
                }).collect()
            },
            _ => vec![(1, rows); node_len]
        }
    }

    /// Fills the matrices for every node in id order, returning them with the best cell as (score, node, col, row)
    fn fill(&self, graph: &SequenceGraph, read: &AlignmentRecord) -> (Vec<NodeMatrix>, (i32, usize, usize, usize)) {
        let read_sequence: &[u8] = read.sequence();
        let rows: usize = read_sequence.len() + 1;
        let gap_open = self.config.gap_open;
        let gap_ext = self.config.gap_extension;

        let mut matrices: Vec<NodeMatrix> = Vec::with_capacity(graph.num_nodes());
        let mut best: (i32, usize, usize, usize) = (0, 0, 0, 0);

        for node in graph.nodes().iter() {
            let node_id = node.node_id();
            let node_sequence: &[u8] = node.sequence();
            let bands = self.node_bands(node.ref_start(), node_sequence.len(), rows, read.position_hint());
            let mut matrix = NodeMatrix::new(rows, &bands);

            // column 0 is the row-wise best of all parents' final columns, or the local baseline for entry nodes
            let parents: Vec<usize> = graph.predecessors(node_id).collect();
            if parents.is_empty() {
                matrix.h[..rows].fill(0);
            } else {
                for row in 0..rows {
                    let mut h_import: i32 = NEG_INF;
                    let mut e_import: i32 = NEG_INF;
                    for &parent in parents.iter() {
                        let parent_matrix: &NodeMatrix = &matrices[parent];
                        let last = parent_matrix.last_col();
                        h_import = h_import.max(parent_matrix.h(last, row));
                        e_import = e_import.max(parent_matrix.e(last, row));
                    }
                    matrix.h[row] = h_import;
                    matrix.e[row] = e_import;
                }
            }

            for col in 1..matrix.cols {
                let graph_base: u8 = node_sequence[col - 1];
                for row in matrix.stored_rows(col) {
                    let e_value = matrix.h(col - 1, row).saturating_sub(gap_open)
                        .max(matrix.e(col - 1, row).saturating_sub(gap_ext));
                    let f_value = matrix.h(col, row - 1).saturating_sub(gap_open)
                        .max(matrix.f(col, row - 1).saturating_sub(gap_ext));
                    let diag_value = matrix.h(col - 1, row - 1).saturating_add(self.substitution(graph_base, read_sequence[row - 1]));
                    let h_value = diag_value.max(e_value).max(f_value).max(0);

                    if let Some(current) = matrix.slot(col, row) {
                        matrix.e[current] = e_value;
                        matrix.f[current] = f_value;
                        matrix.h[current] = h_value;
                    }

                    // strict so the earliest cell wins ties
                    if h_value > best.0 {
                        best = (h_value, node_id, col, row);
                    }
                }
            }

            matrices.push(matrix);
        }

        (matrices, best)
    }

    /// Walks back from the best cell, returning the per-cell (node, node offset, operation) in path order and the first read row used.
    fn traceback(&self, graph: &SequenceGraph, read: &AlignmentRecord, matrices: &[NodeMatrix], best: (i32, usize, usize, usize)) -> (Vec<(usize, usize, AlignmentOperation)>, usize) {
        let read_sequence: &[u8] = read.sequence();
        let gap_open = self.config.gap_open;
        let (_score, mut node_id, mut col, mut row) = best;
        let mut state = TraceState::Best;
        let mut operations: Vec<(usize, usize, AlignmentOperation)> = vec![];

        loop {
            let matrix: &NodeMatrix = &matrices[node_id];
            if col == 0 {
                // crossing a node boundary, find the parent whose final column produced the imported value
                let imported = match state {
                    TraceState::Best => matrix.h(0, row),
                    TraceState::Deletion => matrix.e(0, row),
                    TraceState::Insertion => break
                };
                if state == TraceState::Best && imported == 0 {
                    break;
                }
                let parent = graph.predecessors(node_id)
                    .filter(|&p| {
                        let parent_matrix: &NodeMatrix = &matrices[p];
                        let last = parent_matrix.last_col();
                        match state {
                            TraceState::Deletion => parent_matrix.e(last, row) == imported,
                            _ => parent_matrix.h(last, row) == imported
                        }
                    })
                    .min();
                match parent {
                    Some(p) => {
                        node_id = p;
                        col = matrices[p].last_col();
                    },
                    None => break
                };
                continue;
            }

            match state {
                TraceState::Best => {
                    let h_value = matrix.h(col, row);
                    if h_value == 0 || row == 0 {
                        break;
                    }
                    let graph_base: u8 = graph.node(node_id).sequence()[col - 1];
                    let read_base: u8 = read_sequence[row - 1];
                    if h_value == matrix.h(col - 1, row - 1).saturating_add(self.substitution(graph_base, read_base)) {
                        let operation = if graph_base == read_base { AlignmentOperation::Match } else { AlignmentOperation::Mismatch };
                        operations.push((node_id, col - 1, operation));
                        col -= 1;
                        row -= 1;
                    } else if h_value == matrix.e(col, row) {
                        state = TraceState::Deletion;
                    } else if h_value == matrix.f(col, row) {
                        state = TraceState::Insertion;
                    } else {
                        break;
                    }
                },
                TraceState::Deletion => {
                    operations.push((node_id, col - 1, AlignmentOperation::Deletion));
                    if matrix.e(col, row) == matrix.h(col - 1, row).saturating_sub(gap_open) {
                        state = TraceState::Best;
                    }
                    col -= 1;
                },
                TraceState::Insertion => {
                    operations.push((node_id, col, AlignmentOperation::Insertion));
                    if matrix.f(col, row) == matrix.h(col, row - 1).saturating_sub(gap_open) {
                        state = TraceState::Best;
                    }
                    row -= 1;
                }
            };
        }

        operations.reverse();
        (operations, row)
    }
}

impl GraphAligner for AffineGraphAligner {
    fn align(&self, graph: &SequenceGraph, read: &AlignmentRecord) -> Result<TraceResult, NoAlignment> {
        if graph.is_empty() {
            return Err(NoAlignment::EmptyGraph);
        }
        if read.len() < self.config.min_seed_length || read.is_empty() {
            return Err(NoAlignment::ReadTooShort {
                length: read.len(),
                min_seed_length: self.config.min_seed_length
            });
        }

        let (matrices, best) = self.fill(graph, read);
        trace!("{} filled {} cells", read.read_key(), matrices.iter().map(|m| m.stored_cells()).sum::<usize>());
        let best_score = best.0;
        if best_score <= 0 {
            return Err(NoAlignment::NoPath);
        }
        if best_score < self.config.min_score {
            return Err(NoAlignment::BelowScoreFloor {
                score: best_score,
                floor: self.config.min_score
            });
        }

        let (operations, read_start) = self.traceback(graph, read, &matrices, best);

        // collapse into runs
        let mut segments: Vec<TraceSegment> = vec![];
        for (node_id, node_offset, operation) in operations.into_iter() {
            match segments.last_mut() {
                Some(s) if s.node_id == node_id && s.operation == operation => s.length += 1,
                _ => segments.push(TraceSegment::new(node_id, node_offset, operation, 1))
            };
        }

        let result = TraceResult::new(segments, best_score, read_start, best.3);
        trace!("{} aligned with score {}: {}", read.read_key(), result.score(), result.cigar_string());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::region::Region;
    use crate::data_types::variant_list::VariantList;
    use crate::data_types::variants::Variant;
    use crate::sequence_graph::NodeKind;

    fn test_config() -> ScoringConfig {
        ScoringConfig {
            min_seed_length: 1,
            min_score: 0,
            ..Default::default()
        }
    }

    fn read(sequence: &[u8]) -> AlignmentRecord {
        AlignmentRecord::new("read".to_string(), sequence.to_vec(), None)
    }

    fn linear_graph(sequence: &[u8]) -> SequenceGraph {
        let interval = Region::new("chr1".to_string(), 0, sequence.len() as u64);
        let (graph, _node_to_alleles) = SequenceGraph::build(sequence, &interval, &[]).unwrap();
        graph
    }

    #[test]
    fn test_validate() {
        assert_eq!(ScoringConfig::default().validate(), Ok(()));
        let config = ScoringConfig { match_score: 0, ..Default::default() };
        assert_eq!(config.validate(), Err(ConfigError::ZeroValue { name: "match score" }));
        let config = ScoringConfig { gap_open: -1, ..Default::default() };
        assert_eq!(config.validate(), Err(ConfigError::NegativeValue { name: "gap open penalty", value: -1 }));
    }

    #[test]
    fn test_exact_reference() {
        let reference = b"ACGTTGCAAGCTTACG";
        let graph = linear_graph(reference);
        let aligner = AffineGraphAligner::new(test_config());
        let result = aligner.align(&graph, &read(reference)).unwrap();
        assert_eq!(result.score(), 2 * reference.len() as i32);
        assert_eq!(result.segments(), &[TraceSegment::new(0, 0, AlignmentOperation::Match, reference.len())]);
        assert_eq!(result.read_start(), 0);
        assert_eq!(result.read_end(), reference.len());
        assert_eq!(result.cigar_string(), "0:16=");
    }

    #[test]
    fn test_local_substring() {
        // read is a substring of the node, local alignment should not pay for the unaligned flanks
        let graph = linear_graph(b"TTTTTACGTTGCAAGTTTTT");
        let aligner = AffineGraphAligner::new(test_config());
        let result = aligner.align(&graph, &read(b"ACGTTGCAAG")).unwrap();
        assert_eq!(result.score(), 20);
        assert_eq!(result.segments(), &[TraceSegment::new(0, 5, AlignmentOperation::Match, 10)]);
    }

    #[test]
    fn test_affine_deletion() {
        let graph = linear_graph(b"AAAACCCCGGGGTTTT");
        let aligner = AffineGraphAligner::new(test_config());
        let result = aligner.align(&graph, &read(b"AAAACCCCTTTT")).unwrap();

        // 12 matches, one gap of 4 = 24 - 3 - 3
        assert_eq!(result.score(), 18);
        assert_eq!(result.segments(), &[
            TraceSegment::new(0, 0, AlignmentOperation::Match, 8),
            TraceSegment::new(0, 8, AlignmentOperation::Deletion, 4),
            TraceSegment::new(0, 12, AlignmentOperation::Match, 4)
        ]);
        assert_eq!(result.cigar_string(), "0:8= 0:4D 0:4=");
    }

    #[test]
    fn test_mismatch_inside() {
        let graph = linear_graph(b"ACGTTGCAAGCTTACG");
        let aligner = AffineGraphAligner::new(test_config());
        let result = aligner.align(&graph, &read(b"ACGTTGCTAGCTTACG")).unwrap();
        // 15 matches and a single mismatch
        assert_eq!(result.score(), 30 - 2);
        assert_eq!(result.segments(), &[
            TraceSegment::new(0, 0, AlignmentOperation::Match, 7),
            TraceSegment::new(0, 7, AlignmentOperation::Mismatch, 1),
            TraceSegment::new(0, 8, AlignmentOperation::Match, 8)
        ]);
    }

    #[test]
    fn test_snv_branches() {
        let reference = b"ACGTTGCAAGCTTACG";
        let interval = Region::new("chr1".to_string(), 0, reference.len() as u64);
        let mut variant_list = VariantList::new();
        variant_list.add_or_update(Variant::new("chr1".to_string(), 7, b"A".to_vec(), vec![b"T".to_vec()]).unwrap());
        let variants: Vec<&Variant> = variant_list.variants().iter().collect();
        let (graph, _node_to_alleles) = SequenceGraph::build(reference, &interval, &variants).unwrap();
        assert_eq!(graph.node(1).kind(), NodeKind::Reference);
        assert_eq!(graph.node(2).kind(), NodeKind::Allele);

        let aligner = AffineGraphAligner::new(test_config());

        // reference read goes through the reference branch
        let result = aligner.align(&graph, &read(reference)).unwrap();
        assert_eq!(result.score(), 32);
        assert_eq!(result.traversed_nodes(), vec![0, 1, 3]);

        // ALT read goes through the allele node with no penalty
        let result = aligner.align(&graph, &read(b"ACGTTGCTAGCTTACG")).unwrap();
        assert_eq!(result.score(), 32);
        assert_eq!(result.traversed_nodes(), vec![0, 2, 3]);
        assert_eq!(result.cigar_string(), "0:7= 2:1= 3:8=");
    }

    #[test]
    fn test_deletion_branch() {
        // the ALT drops GGGG, so the deletion read should take the allele node with no gap
        let reference = b"AAAACCCCGGGGTTTT";
        let interval = Region::new("chr1".to_string(), 0, reference.len() as u64);
        let mut variant_list = VariantList::new();
        variant_list.add_or_update(Variant::new("chr1".to_string(), 7, b"CGGGG".to_vec(), vec![b"C".to_vec()]).unwrap());
        let variants: Vec<&Variant> = variant_list.variants().iter().collect();
        let (graph, _node_to_alleles) = SequenceGraph::build(reference, &interval, &variants).unwrap();

        let aligner = AffineGraphAligner::new(test_config());
        let result = aligner.align(&graph, &read(b"AAAACCCCTTTT")).unwrap();
        assert_eq!(result.score(), 24);
        assert_eq!(result.traversed_nodes(), vec![0, 2, 3]);
    }

    #[test]
    fn test_no_alignment() {
        let graph = linear_graph(b"ACGTTGCAAGCTTACG");
        let aligner = AffineGraphAligner::new(ScoringConfig {
            min_seed_length: 5,
            min_score: 10,
            ..Default::default()
        });

        assert_eq!(
            aligner.align(&SequenceGraph::new(), &read(b"ACGTTGCA")),
            Err(NoAlignment::EmptyGraph)
        );
        assert_eq!(
            aligner.align(&graph, &read(b"ACGT")),
            Err(NoAlignment::ReadTooShort { length: 4, min_seed_length: 5 })
        );
        assert_eq!(
            aligner.align(&graph, &read(b"NNNNNNNN")),
            Err(NoAlignment::NoPath)
        );
        // best local hit is a single ACGT = 8
        assert_eq!(
            aligner.align(&graph, &read(b"ACGTNNNNN")),
            Err(NoAlignment::BelowScoreFloor { score: 8, floor: 10 })
        );
    }

    #[test]
    fn test_banding() {
        let reference = b"ACGTTGCAAGCTTACG";
        let graph = linear_graph(reference);
        let aligner = AffineGraphAligner::new(ScoringConfig {
            band_width: 3,
            ..test_config()
        });

        // correct hint keeps the full diagonal inside the band
        let hinted = AlignmentRecord::new("read".to_string(), reference.to_vec(), Some(0));
        assert_eq!(aligner.align(&graph, &hinted).unwrap().score(), 32);

        // a hint far away leaves nothing inside the band
        let misplaced = AlignmentRecord::new("read".to_string(), reference.to_vec(), Some(500));
        assert_eq!(aligner.align(&graph, &misplaced), Err(NoAlignment::NoPath));

        // no hint means no banding
        assert_eq!(aligner.align(&graph, &read(reference)).unwrap().score(), 32);
    }

    /// Deterministic sequence without short repeats
    fn pseudo_random_reference(length: usize) -> Vec<u8> {
        let mut state: u64 = 12345;
        (0..length).map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            b"ACGT"[(state >> 33) as usize % 4]
        }).collect()
    }

    #[test]
    fn test_banded_storage() {
        let reference = pseudo_random_reference(3000);
        let graph = linear_graph(&reference);
        let band_width: usize = 20;
        let aligner = AffineGraphAligner::new(ScoringConfig {
            band_width,
            ..test_config()
        });
        let hinted = AlignmentRecord::new("read".to_string(), reference[1000..2000].to_vec(), Some(1000));

        let result = aligner.align(&graph, &hinted).unwrap();
        assert_eq!(result.score(), 2000);
        assert_eq!(result.segments(), &[TraceSegment::new(0, 1000, AlignmentOperation::Match, 1000)]);

        // only the band is held in memory, not the full node x read matrix
        let rows = hinted.len() + 1;
        let (matrices, _best) = aligner.fill(&graph, &hinted);
        let stored: usize = matrices.iter().map(|m| m.stored_cells()).sum();
        assert!(stored <= reference.len() * (2 * band_width + 1) + rows);
        assert!(stored * 10 < reference.len() * rows);

        // without a hint every cell is kept
        let (matrices, _best) = aligner.fill(&graph, &read(&reference[1000..2000]));
        let stored: usize = matrices.iter().map(|m| m.stored_cells()).sum();
        assert_eq!(stored, (reference.len() + 1) * rows);
    }
}
