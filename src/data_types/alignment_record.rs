
/// A single read to be adjudicated against a graph.
/// Only the pieces the aligner needs are kept; everything else stays in the source file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AlignmentRecord {
    /// identifying key; records sharing a key are the same alignment identity for best-mapping purposes
    read_key: String,
    /// the read bases, upper-case ASCII
    sequence: Vec<u8>,
    /// optional 0-based reference coordinate where the read was originally placed
    position_hint: Option<u64>
}

impl AlignmentRecord {
    /// Creates a new record, upper-casing the sequence.
    /// # Arguments
    /// * `read_key` - the identity used to merge mappings across windows
    /// * `sequence` - the read bases
    /// * `position_hint` - optional 0-based alignment start from the upstream aligner
    pub fn new(read_key: String, mut sequence: Vec<u8>, position_hint: Option<u64>) -> AlignmentRecord {
        sequence.make_ascii_uppercase();
        AlignmentRecord {
            read_key,
            sequence,
            position_hint
        }
    }

    pub fn read_key(&self) -> &str {
        &self.read_key
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

    pub fn position_hint(&self) -> Option<u64> {
        self.position_hint
    }
}
