
use crate::data_types::region::Region;
use crate::data_types::variants::{AlleleRef, Variant};
use crate::graph_aligner::NodeCoverage;

use log::trace;
use rustc_hash::FxHashMap as HashMap;

/// Maps a node id to the alleles that get credited when a read passes through it.
/// Allele nodes map to exactly one ALT; the rejoining reference node of a group maps to the REF allele of every variant in that group.
pub type NodeAlleleMap = HashMap<usize, Vec<AlleleSpan>>;

/// An allele and the node bases that tell it apart from the other alleles of its variant.
/// Bases shared with the other alleles, including the padding of a compound group, are not part of the span.
/// An empty span marks a junction, e.g. the point where a deletion removes bases.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AlleleSpan {
    /// the credited allele
    allele: AlleleRef,
    /// first distinguishing base, as an offset into the node sequence
    start: usize,
    /// one past the last distinguishing base
    end: usize
}

impl AlleleSpan {
    pub fn new(allele: AlleleRef, start: usize, end: usize) -> AlleleSpan {
        AlleleSpan {
            allele,
            start,
            end
        }
    }

    pub fn allele(&self) -> AlleleRef {
        self.allele
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// True if a traced path runs over the distinguishing bases.
    /// A path that enters from a parent reaches back before base 0, and one that leaves for a child reaches past the node end;
    /// an empty span is covered when the path has bases on both sides of the junction.
    pub fn is_covered(&self, coverage: &NodeCoverage) -> bool {
        let path_start: i64 = if coverage.entered { -1 } else { coverage.first as i64 };
        let path_end: i64 = if coverage.exited { i64::MAX } else { coverage.end as i64 };
        path_start < self.end as i64 && path_end > self.start as i64
    }
}

/// Length of the shared prefix and shared suffix of two alleles; the suffix never reuses prefix bases
fn shared_flanks(first: &[u8], second: &[u8]) -> (usize, usize) {
    let prefix: usize = first.iter().zip(second.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let max_suffix: usize = first.len().min(second.len()) - prefix;
    let suffix: usize = first.iter().rev().zip(second.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();
    (prefix, suffix)
}

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum ConstructionError {
    #[error("variant on {found} does not match the graph interval on {expected}")]
    ChromosomeMismatch { expected: String, found: String },
    #[error("variant at {position}-{end} lies outside the graph interval {interval}")]
    VariantOutsideInterval { position: u64, end: u64, interval: String },
    #[error("variant at {position} has an empty allele sequence")]
    EmptyAllele { position: u64 },
    #[error("variant at {position} is out of order, variants must be sorted by position")]
    UnsortedVariants { position: u64 },
    #[error("variant at {position} has a REF allele that does not match the reference")]
    ReferenceMismatch { position: u64 },
    #[error("reference sequence has length {found}, but the interval expects {expected}")]
    ReferenceLength { expected: u64, found: usize },
    #[error("node {node_id} has parent {parent}, all parents must come before the node")]
    InvalidParent { node_id: usize, parent: usize }
}

/// What a node represents in the graph
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NodeKind {
    Reference,
    Allele
}

/// A single node in the sequence graph; immutable once the graph is built.
#[derive(Debug)]
pub struct Node {
    /// this node's id, also its topological rank
    node_id: usize,
    /// reference backbone or variant branch
    kind: NodeKind,
    /// the bases spelled by this node
    sequence: Vec<u8>,
    /// the 0-based reference coordinate this node starts at
    ref_start: u64,
    /// for Allele nodes, the allele this node spells
    allele: Option<AlleleRef>,
    /// ids of edges coming into this node
    in_edges: Vec<usize>,
    /// ids of edges leaving this node
    out_edges: Vec<usize>
}

impl Node {
    pub fn node_id(&self) -> usize {
        self.node_id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn ref_start(&self) -> u64 {
        self.ref_start
    }

    pub fn allele(&self) -> Option<AlleleRef> {
        self.allele
    }

    pub fn in_edges(&self) -> &[usize] {
        &self.in_edges
    }

    pub fn out_edges(&self) -> &[usize] {
        &self.out_edges
    }
}

/// A directed edge, topology only
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Edge {
    source: usize,
    dest: usize
}

impl Edge {
    pub fn source(&self) -> usize {
        self.source
    }

    pub fn dest(&self) -> usize {
        self.dest
    }
}

/// Directed acyclic graph of reference and allele nodes.
/// Nodes are appended with every parent id smaller than the new id, so id order is always a valid topological order.
#[derive(Debug, Default)]
pub struct SequenceGraph {
    /// all the nodes in the graph so far
    nodes: Vec<Node>,
    /// all the edges, addressed by id from the nodes
    edges: Vec<Edge>
}

impl SequenceGraph {
    /// Creates a new empty graph
    pub fn new() -> SequenceGraph {
        Default::default()
    }

    /// Builds a graph from a reference interval and the variants inside it.
    /// Overlapping variants are grouped and each group becomes one diamond: one rejoining reference node plus one node per ALT allele, all
    /// hanging off the current frontier. Gaps between groups become plain reference nodes.
    /// The rejoining node always gets the lowest id of its group, so the reference wins when a read scores equally on a shared flank.
    /// # Arguments
    /// * `reference` - the reference bases for exactly `interval`
    /// * `interval` - the reference coordinates covered by the graph
    /// * `variants` - variants sorted by position, each fully contained in `interval`
    /// # Errors
    /// * if the reference length does not match the interval
    /// * if a variant is on another contig, out of order, outside the interval, or has an empty allele
    /// * if a variant REF allele does not match the reference
    pub fn build(reference: &[u8], interval: &Region, variants: &[&Variant]) -> Result<(SequenceGraph, NodeAlleleMap), ConstructionError> {
        if reference.len() as u64 != interval.len() {
            return Err(ConstructionError::ReferenceLength {
                expected: interval.len(),
                found: reference.len()
            });
        }

        // validate everything up front so we never return a partial graph
        let mut previous_position: u64 = 0;
        for variant in variants.iter() {
            check_variant(reference, interval, variant, previous_position)?;
            previous_position = variant.position();
        }

        let mut graph: SequenceGraph = SequenceGraph::new();
        let mut node_to_alleles: NodeAlleleMap = Default::default();

        // coordinates below are offsets into `reference`
        let offset = |pos: u64| -> usize { (pos - interval.start()) as usize };
        let mut previous_end: usize = 0;
        let mut frontier: Vec<usize> = vec![];

        let mut group_index: usize = 0;
        while group_index < variants.len() {
            // collect everything that transitively overlaps the first variant of the group
            let group_start: usize = offset(variants[group_index].position());
            let mut group_end: usize = offset(variants[group_index].end());
            let mut next_index: usize = group_index + 1;
            while next_index < variants.len() && offset(variants[next_index].position()) < group_end {
                group_end = group_end.max(offset(variants[next_index].end()));
                next_index += 1;
            }
            let group: &[&Variant] = &variants[group_index..next_index];
            trace!("Compound group of {} variant(s) at {}..{}", group.len(), group_start, group_end);

            // catch the reference up to this group
            if previous_end < group_start {
                let ref_sequence: Vec<u8> = reference[previous_end..group_start].to_vec();
                let ref_id = graph.add_node(NodeKind::Reference, ref_sequence, interval.start() + previous_end as u64, None, &frontier)?;
                frontier = vec![ref_id];
            }

            // the shared reference branch credits REF for the whole group, each over the bases its ALTs change
            let ref_sequence: Vec<u8> = reference[group_start..group_end].to_vec();
            let rejoin_id = graph.add_node(NodeKind::Reference, ref_sequence, interval.start() + group_start as u64, None, &frontier)?;
            let ref_spans: Vec<AlleleSpan> = group.iter()
                .map(|variant| {
                    let pad: usize = offset(variant.position()) - group_start;
                    let ref_len: usize = variant.ref_allele().len();
                    let (prefix, suffix) = variant.alt_alleles().iter()
                        .map(|alt| shared_flanks(variant.ref_allele(), alt))
                        .fold((ref_len, ref_len), |(p, s), (ap, asuf)| (p.min(ap), s.min(asuf)));
                    AlleleSpan::new(variant.allele_ref(0), pad + prefix, pad + ref_len - suffix)
                })
                .collect();
            node_to_alleles.insert(rejoin_id, ref_spans);
            let mut new_frontier: Vec<usize> = vec![rejoin_id];

            // one node per ALT allele, padded out to the group span
            for variant in group.iter() {
                let var_start: usize = offset(variant.position());
                let var_end: usize = offset(variant.end());
                let pad: usize = var_start - group_start;
                for allele_index in 1..variant.num_alleles() {
                    let allele_ref = variant.allele_ref(allele_index);
                    let alt_allele: &[u8] = &variant.alt_alleles()[allele_index - 1];
                    let mut alt_sequence: Vec<u8> = reference[group_start..var_start].to_vec();
                    alt_sequence.extend_from_slice(alt_allele);
                    alt_sequence.extend_from_slice(&reference[var_end..group_end]);

                    let alt_id = graph.add_node(NodeKind::Allele, alt_sequence, interval.start() + group_start as u64, Some(allele_ref), &frontier)?;
                    let (prefix, suffix) = shared_flanks(variant.ref_allele(), alt_allele);
                    node_to_alleles.insert(alt_id, vec![AlleleSpan::new(allele_ref, pad + prefix, pad + alt_allele.len() - suffix)]);
                    new_frontier.push(alt_id);
                }
            }

            frontier = new_frontier;
            previous_end = group_end;
            group_index = next_index;
        }

        // tail of the reference
        if previous_end < reference.len() {
            let ref_sequence: Vec<u8> = reference[previous_end..].to_vec();
            graph.add_node(NodeKind::Reference, ref_sequence, interval.start() + previous_end as u64, None, &frontier)?;
        }

        Ok((graph, node_to_alleles))
    }

    /// Adds a node to the graph and returns its id as a Result.
    /// # Arguments
    /// * `kind` - reference or allele node
    /// * `sequence` - the bases for this node
    /// * `ref_start` - the reference coordinate this node is anchored at
    /// * `allele` - the allele this node spells, if any
    /// * `parent_nodes` - the ids of any upstream nodes in the graph
    /// # Errors
    /// * if any parent node has an id >= this node's id; this is a DAG only
    pub fn add_node(&mut self, kind: NodeKind, sequence: Vec<u8>, ref_start: u64, allele: Option<AlleleRef>, parent_nodes: &[usize]) -> Result<usize, ConstructionError> {
        let new_id: usize = self.nodes.len();
        for &parent in parent_nodes.iter() {
            if parent >= new_id {
                return Err(ConstructionError::InvalidParent { node_id: new_id, parent });
            }
        }

        let mut in_edges: Vec<usize> = Vec::with_capacity(parent_nodes.len());
        for &parent in parent_nodes.iter() {
            let edge_id: usize = self.edges.len();
            self.edges.push(Edge { source: parent, dest: new_id });
            self.nodes[parent].out_edges.push(edge_id);
            in_edges.push(edge_id);
        }

        self.nodes.push(Node {
            node_id: new_id,
            kind,
            sequence,
            ref_start,
            allele,
            in_edges,
            out_edges: vec![]
        });
        Ok(new_id)
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, node_id: usize) -> &Node {
        &self.nodes[node_id]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edge(&self, edge_id: usize) -> &Edge {
        &self.edges[edge_id]
    }

    /// Iterates the parent ids of a node, in edge insertion order
    pub fn predecessors(&self, node_id: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes[node_id].in_edges.iter().map(|&e| self.edges[e].source)
    }

    /// Iterates the child ids of a node, in edge insertion order
    pub fn successors(&self, node_id: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes[node_id].out_edges.iter().map(|&e| self.edges[e].dest)
    }

    /// Nodes with no incoming edges
    pub fn entry_nodes(&self) -> Vec<usize> {
        self.nodes.iter()
            .filter(|n| n.in_edges.is_empty())
            .map(|n| n.node_id)
            .collect()
    }

    /// Nodes with no outgoing edges
    pub fn sink_nodes(&self) -> Vec<usize> {
        self.nodes.iter()
            .filter(|n| n.out_edges.is_empty())
            .map(|n| n.node_id)
            .collect()
    }

    /// Kahn's algorithm over the edge lists; returns None if a cycle is found.
    pub fn topological_order(&self) -> Option<Vec<usize>> {
        let mut in_degree: Vec<usize> = self.nodes.iter().map(|n| n.in_edges.len()).collect();
        let mut ready: Vec<usize> = self.entry_nodes();
        ready.reverse();
        let mut order: Vec<usize> = Vec::with_capacity(self.nodes.len());
        while let Some(node_id) = ready.pop() {
            order.push(node_id);
            for child in self.successors(node_id) {
                in_degree[child] -= 1;
                if in_degree[child] == 0 {
                    ready.push(child);
                }
            }
        }

        if order.len() == self.nodes.len() {
            Some(order)
        } else {
            None
        }
    }
}

/// Sanity checks for a single variant against the interval and reference
fn check_variant(reference: &[u8], interval: &Region, variant: &Variant, previous_position: u64) -> Result<(), ConstructionError> {
    if variant.chrom() != interval.chrom() {
        return Err(ConstructionError::ChromosomeMismatch {
            expected: interval.chrom().to_string(),
            found: variant.chrom().to_string()
        });
    }
    if !interval.contains(variant.position(), variant.end()) {
        return Err(ConstructionError::VariantOutsideInterval {
            position: variant.position(),
            end: variant.end(),
            interval: interval.to_string()
        });
    }
    if variant.position() < previous_position {
        return Err(ConstructionError::UnsortedVariants { position: variant.position() });
    }
    if variant.alleles().any(|a| a.is_empty()) {
        return Err(ConstructionError::EmptyAllele { position: variant.position() });
    }

    let var_start = (variant.position() - interval.start()) as usize;
    let var_end = (variant.end() - interval.start()) as usize;
    if !reference[var_start..var_end].eq_ignore_ascii_case(variant.ref_allele()) {
        return Err(ConstructionError::ReferenceMismatch { position: variant.position() });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::variant_list::VariantList;

    /// loads the variants into a list so they get real indices
    fn load_variants(variants: Vec<Variant>) -> VariantList {
        let mut variant_list = VariantList::new();
        for variant in variants.into_iter() {
            variant_list.add_or_update(variant);
        }
        variant_list
    }

    fn new_variant(position: u64, ref_allele: &str, alts: &[&str]) -> Variant {
        Variant::new(
            "chr1".to_string(), position,
            ref_allele.as_bytes().to_vec(),
            alts.iter().map(|a| a.as_bytes().to_vec()).collect()
        ).unwrap()
    }

    fn parents(graph: &SequenceGraph, node_id: usize) -> Vec<usize> {
        graph.predecessors(node_id).collect()
    }

    fn children(graph: &SequenceGraph, node_id: usize) -> Vec<usize> {
        graph.successors(node_id).collect()
    }

    #[test]
    fn test_reference_only() {
        let reference = b"ACGTACGT";
        let interval = Region::new("chr1".to_string(), 100, 108);
        let (graph, node_to_alleles) = SequenceGraph::build(reference, &interval, &[]).unwrap();
        assert_eq!(graph.num_nodes(), 1);
        assert_eq!(graph.node(0).sequence(), reference);
        assert_eq!(graph.node(0).kind(), NodeKind::Reference);
        assert_eq!(graph.node(0).ref_start(), 100);
        assert_eq!(graph.entry_nodes(), vec![0]);
        assert_eq!(graph.sink_nodes(), vec![0]);
        assert!(node_to_alleles.is_empty());
    }

    #[test]
    fn test_simple_snv() {
        let reference = b"ACGTACGT";
        let interval = Region::new("chr1".to_string(), 0, 8);
        let variant_list = load_variants(vec![new_variant(3, "T", &["C"])]);
        let variants: Vec<&Variant> = variant_list.variants().iter().collect();
        let (graph, node_to_alleles) = SequenceGraph::build(reference, &interval, &variants).unwrap();

        /*
        REF: 0 -> 1 -> 3
        ALT:   -> 2 -^
         */
        assert_eq!(graph.num_nodes(), 4);
        assert_eq!(graph.node(0).sequence(), b"ACG");
        assert_eq!(graph.node(1).sequence(), b"T");
        assert_eq!(graph.node(1).kind(), NodeKind::Reference);
        assert_eq!(graph.node(2).sequence(), b"C");
        assert_eq!(graph.node(2).kind(), NodeKind::Allele);
        assert_eq!(graph.node(2).allele(), Some(AlleleRef::new(0, 1)));
        assert_eq!(graph.node(3).sequence(), b"ACGT");
        assert_eq!(graph.node(3).ref_start(), 4);

        // two parallel nodes with a shared parent and shared child
        assert_eq!(parents(&graph, 1), vec![0]);
        assert_eq!(parents(&graph, 2), vec![0]);
        assert_eq!(children(&graph, 1), vec![3]);
        assert_eq!(children(&graph, 2), vec![3]);
        assert_eq!(parents(&graph, 3), vec![1, 2]);
        assert_eq!(graph.num_edges(), 4);

        assert_eq!(node_to_alleles.get(&1), Some(&vec![AlleleSpan::new(AlleleRef::new(0, 0), 0, 1)]));
        assert_eq!(node_to_alleles.get(&2), Some(&vec![AlleleSpan::new(AlleleRef::new(0, 1), 0, 1)]));
        assert_eq!(node_to_alleles.get(&0), None);
        assert_eq!(node_to_alleles.get(&3), None);
        assert_eq!(graph.topological_order(), Some(vec![0, 1, 2, 3]));
    }

    #[test]
    fn test_multiple_variants() {
        // two A>C SNVs with reference in between
        let reference = b"AAAAA";
        let interval = Region::new("chr1".to_string(), 0, 5);
        let variant_list = load_variants(vec![
            new_variant(1, "A", &["C"]),
            new_variant(3, "A", &["C", "G"])
        ]);
        let variants: Vec<&Variant> = variant_list.variants().iter().collect();
        let (graph, node_to_alleles) = SequenceGraph::build(reference, &interval, &variants).unwrap();

        /*
        REF: 0 -> 1 -> 3 -> 4 -> 7
        ALT:   -> 2 -^   -> 5 -^
                         -> 6 -^
         */
        assert_eq!(graph.num_nodes(), 8);
        assert_eq!(parents(&graph, 3), vec![1, 2]);
        assert_eq!(parents(&graph, 4), vec![3]);
        assert_eq!(parents(&graph, 5), vec![3]);
        assert_eq!(parents(&graph, 6), vec![3]);
        assert_eq!(parents(&graph, 7), vec![4, 5, 6]);
        assert_eq!(graph.node(6).sequence(), b"G");
        assert_eq!(node_to_alleles.get(&6), Some(&vec![AlleleSpan::new(AlleleRef::new(1, 2), 0, 1)]));
        assert_eq!(node_to_alleles.get(&4), Some(&vec![AlleleSpan::new(AlleleRef::new(1, 0), 0, 1)]));
        assert_eq!(graph.entry_nodes(), vec![0]);
        assert_eq!(graph.sink_nodes(), vec![7]);
    }

    #[test]
    fn test_overlapping_variants() {
        let reference = b"ACGTA";
        let interval = Region::new("chr1".to_string(), 0, 5);
        let variant_list = load_variants(vec![
            new_variant(1, "CG", &["C"]),
            new_variant(2, "GT", &["G"])
        ]);
        let variants: Vec<&Variant> = variant_list.variants().iter().collect();
        let (graph, node_to_alleles) = SequenceGraph::build(reference, &interval, &variants).unwrap();

        /*
        one compound group spanning CGT, each ALT is padded out to the full span
        REF: 0 -> 1 -> 4
        ALT:   -> 2 -^
               -> 3 -^
         */
        assert_eq!(graph.num_nodes(), 5);
        assert_eq!(graph.node(1).sequence(), b"CGT");
        assert_eq!(graph.node(2).sequence(), b"CT");
        assert_eq!(graph.node(3).sequence(), b"CG");
        assert_eq!(graph.node(4).sequence(), b"A");
        for branch in 1..4 {
            assert_eq!(parents(&graph, branch), vec![0]);
            assert_eq!(graph.node(branch).ref_start(), 1);
        }
        assert_eq!(parents(&graph, 4), vec![1, 2, 3]);

        // the shared reference node credits REF for both variants, each over the base its deletion removes
        assert_eq!(node_to_alleles.get(&1), Some(&vec![
            AlleleSpan::new(AlleleRef::new(0, 0), 1, 2),
            AlleleSpan::new(AlleleRef::new(1, 0), 2, 3)
        ]));
        // deletions are the junction right after the anchor base
        assert_eq!(node_to_alleles.get(&2), Some(&vec![AlleleSpan::new(AlleleRef::new(0, 1), 1, 1)]));
        assert_eq!(node_to_alleles.get(&3), Some(&vec![AlleleSpan::new(AlleleRef::new(1, 1), 2, 2)]));
    }

    #[test]
    fn test_transitive_group() {
        // first and third do not overlap, but the middle one chains them together
        let reference = b"AACCGGTT";
        let interval = Region::new("chr1".to_string(), 0, 8);
        let variant_list = load_variants(vec![
            new_variant(1, "AC", &["A"]),
            new_variant(2, "CCG", &["C"]),
            new_variant(4, "GG", &["G"])
        ]);
        let variants: Vec<&Variant> = variant_list.variants().iter().collect();
        let (graph, node_to_alleles) = SequenceGraph::build(reference, &interval, &variants).unwrap();

        // 0 = A, 1 = rejoin (ACCGG), 2-4 = alts, 5 = TT
        assert_eq!(graph.num_nodes(), 6);
        assert_eq!(graph.node(1).sequence(), b"ACCGG");
        assert_eq!(graph.node(2).sequence(), b"ACGG");
        assert_eq!(graph.node(3).sequence(), b"ACG");
        assert_eq!(graph.node(4).sequence(), b"ACCG");
        assert_eq!(node_to_alleles.get(&1).map(|v| v.len()), Some(3));
        assert_eq!(parents(&graph, 5), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_variant_at_start() {
        let reference = b"ACGT";
        let interval = Region::new("chr1".to_string(), 10, 14);
        let variant_list = load_variants(vec![new_variant(10, "A", &["G"])]);
        let variants: Vec<&Variant> = variant_list.variants().iter().collect();
        let (graph, _node_to_alleles) = SequenceGraph::build(reference, &interval, &variants).unwrap();
        assert_eq!(graph.num_nodes(), 3);
        assert_eq!(graph.entry_nodes(), vec![0, 1]);
        assert_eq!(graph.sink_nodes(), vec![2]);
        assert_eq!(graph.node(2).sequence(), b"CGT");
    }

    #[test]
    fn test_variant_at_end() {
        let reference = b"ACGT";
        let interval = Region::new("chr1".to_string(), 0, 4);
        let variant_list = load_variants(vec![new_variant(3, "T", &["C"])]);
        let variants: Vec<&Variant> = variant_list.variants().iter().collect();
        let (graph, _node_to_alleles) = SequenceGraph::build(reference, &interval, &variants).unwrap();
        assert_eq!(graph.num_nodes(), 3);
        assert_eq!(graph.entry_nodes(), vec![0]);
        assert_eq!(graph.sink_nodes(), vec![1, 2]);
    }

    #[test]
    fn test_acyclic() {
        let reference = b"ACGTACGTACGTACGT";
        let interval = Region::new("chr1".to_string(), 0, 16);
        let variant_list = load_variants(vec![
            new_variant(0, "A", &["T"]),
            new_variant(2, "GTA", &["G", "GTAA"]),
            new_variant(3, "T", &["A"]),
            new_variant(9, "C", &["CAAA"]),
            new_variant(15, "T", &["G"])
        ]);
        let variants: Vec<&Variant> = variant_list.variants().iter().collect();
        let (graph, _node_to_alleles) = SequenceGraph::build(reference, &interval, &variants).unwrap();

        let order = graph.topological_order().unwrap();
        assert_eq!(order.len(), graph.num_nodes());
        let mut rank: Vec<usize> = vec![0; order.len()];
        for (i, &node_id) in order.iter().enumerate() {
            rank[node_id] = i;
        }
        for node in graph.nodes().iter() {
            for child in graph.successors(node.node_id()) {
                assert!(rank[node.node_id()] < rank[child]);
                assert!(node.node_id() < child);
            }
        }
    }

    #[test]
    fn test_construction_errors() {
        let reference = b"ACGTACGT";
        let interval = Region::new("chr1".to_string(), 0, 8);

        let outside = new_variant(10, "A", &["C"]);
        assert!(matches!(
            SequenceGraph::build(reference, &interval, &[&outside]),
            Err(ConstructionError::VariantOutsideInterval { position: 10, .. })
        ));

        let spanning = new_variant(6, "GTA", &["G"]);
        assert!(matches!(
            SequenceGraph::build(reference, &interval, &[&spanning]),
            Err(ConstructionError::VariantOutsideInterval { .. })
        ));

        let mismatch = new_variant(1, "A", &["T"]);
        assert_eq!(
            SequenceGraph::build(reference, &interval, &[&mismatch]).unwrap_err(),
            ConstructionError::ReferenceMismatch { position: 1 }
        );

        let first = new_variant(5, "C", &["T"]);
        let second = new_variant(1, "C", &["T"]);
        assert_eq!(
            SequenceGraph::build(reference, &interval, &[&first, &second]).unwrap_err(),
            ConstructionError::UnsortedVariants { position: 1 }
        );

        let other_chrom = Variant::new("chr2".to_string(), 1, b"C".to_vec(), vec![b"T".to_vec()]).unwrap();
        assert!(matches!(
            SequenceGraph::build(reference, &interval, &[&other_chrom]),
            Err(ConstructionError::ChromosomeMismatch { .. })
        ));

        assert_eq!(
            SequenceGraph::build(b"ACG", &interval, &[]).unwrap_err(),
            ConstructionError::ReferenceLength { expected: 8, found: 3 }
        );
    }

    #[test]
    fn test_shared_flanks() {
        assert_eq!(shared_flanks(b"A", b"T"), (0, 0));
        assert_eq!(shared_flanks(b"CGGGG", b"C"), (1, 0));
        assert_eq!(shared_flanks(b"A", b"AT"), (1, 0));
        assert_eq!(shared_flanks(b"ACGT", b"AGGT"), (1, 2));
        // a repeat can not be counted on both ends
        assert_eq!(shared_flanks(b"AA", b"AAA"), (2, 0));
    }

    #[test]
    fn test_padded_spans() {
        // a long deletion and an SNV inside it share one group
        let reference = b"AACGTACGTTT";
        let interval = Region::new("chr1".to_string(), 0, 11);
        let variant_list = load_variants(vec![
            new_variant(1, "ACGTACG", &["A"]),
            new_variant(5, "A", &["G"])
        ]);
        let variants: Vec<&Variant> = variant_list.variants().iter().collect();
        let (graph, node_to_alleles) = SequenceGraph::build(reference, &interval, &variants).unwrap();

        // 0 = A, 1 = rejoin, 2 = deletion, 3 = padded SNV, 4 = TTT
        assert_eq!(graph.node(1).sequence(), b"ACGTACG");
        assert_eq!(graph.node(2).sequence(), b"A");
        assert_eq!(graph.node(3).sequence(), b"ACGTGCG");
        assert_eq!(node_to_alleles.get(&1), Some(&vec![
            AlleleSpan::new(AlleleRef::new(0, 0), 1, 7),
            AlleleSpan::new(AlleleRef::new(1, 0), 4, 5)
        ]));
        assert_eq!(node_to_alleles.get(&2), Some(&vec![AlleleSpan::new(AlleleRef::new(0, 1), 1, 1)]));
        // padding is shared with the reference, only the changed base counts
        assert_eq!(node_to_alleles.get(&3), Some(&vec![AlleleSpan::new(AlleleRef::new(1, 1), 4, 5)]));
    }

    #[test]
    fn test_span_coverage() {
        let coverage = |first: usize, end: usize, entered: bool, exited: bool| NodeCoverage {
            node_id: 1, first, end, entered, exited
        };
        let snv = AlleleSpan::new(AlleleRef::new(0, 1), 4, 5);
        assert!(snv.is_covered(&coverage(0, 7, true, true)));
        assert!(snv.is_covered(&coverage(0, 5, true, false)));
        assert!(!snv.is_covered(&coverage(0, 4, true, false)));
        assert!(!snv.is_covered(&coverage(5, 7, false, true)));

        // a junction needs bases on both sides
        let junction = AlleleSpan::new(AlleleRef::new(0, 1), 1, 1);
        assert!(junction.is_covered(&coverage(0, 1, true, true)));
        assert!(!junction.is_covered(&coverage(0, 1, true, false)));
        assert!(!junction.is_covered(&coverage(1, 1, false, true)));
    }

    #[test]
    fn test_add_node() {
        let mut graph = SequenceGraph::new();
        assert!(graph.is_empty());
        let root = graph.add_node(NodeKind::Reference, b"AC".to_vec(), 0, None, &[]).unwrap();
        let child = graph.add_node(NodeKind::Reference, b"GT".to_vec(), 2, None, &[root]).unwrap();
        assert_eq!(
            graph.add_node(NodeKind::Reference, b"A".to_vec(), 4, None, &[child, 5]).unwrap_err(),
            ConstructionError::InvalidParent { node_id: 2, parent: 5 }
        );
        assert_eq!(graph.num_nodes(), 2);
        assert_eq!(graph.edge(0).source(), root);
        assert_eq!(graph.edge(0).dest(), child);
        assert_eq!(graph.node(root).out_edges(), &[0]);
        assert_eq!(graph.node(child).in_edges(), &[0]);
    }
}
