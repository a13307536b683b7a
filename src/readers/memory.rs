
use crate::data_types::alignment_record::AlignmentRecord;
use crate::data_types::region::Region;
use crate::data_types::variants::Variant;
use crate::readers::{AlignmentReader, ReadProvider, VariantSource};

/// Variant source over an in-memory list
pub struct VecVariantSource {
    variants: std::vec::IntoIter<Variant>
}

impl VecVariantSource {
    pub fn new(variants: Vec<Variant>) -> VecVariantSource {
        VecVariantSource {
            variants: variants.into_iter()
        }
    }
}

impl VariantSource for VecVariantSource {
    fn next_variant(&mut self) -> Option<Result<Variant, Box<dyn std::error::Error>>> {
        self.variants.next().map(Ok)
    }
}

/// Reader over an owned list of records
pub struct VecAlignmentReader {
    records: std::vec::IntoIter<AlignmentRecord>
}

impl VecAlignmentReader {
    pub fn new(records: Vec<AlignmentRecord>) -> VecAlignmentReader {
        VecAlignmentReader {
            records: records.into_iter()
        }
    }
}

impl AlignmentReader for VecAlignmentReader {
    fn next_alignment(&mut self) -> Option<Result<AlignmentRecord, Box<dyn std::error::Error>>> {
        self.records.next().map(Ok)
    }
}

/// Read provider that keeps every record in memory.
/// Reads with a position hint are handed to windows they overlap; reads without one go to every window.
#[derive(Default)]
pub struct InMemoryReadSource {
    records: Vec<(String, AlignmentRecord)>
}

impl InMemoryReadSource {
    pub fn new() -> InMemoryReadSource {
        Default::default()
    }

    /// Adds a read placed on the given contig
    pub fn add_record(&mut self, chrom: &str, record: AlignmentRecord) {
        self.records.push((chrom.to_string(), record));
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ReadProvider for InMemoryReadSource {
    fn open(&self, region: &Region) -> Result<Box<dyn AlignmentReader>, Box<dyn std::error::Error>> {
        let selected: Vec<AlignmentRecord> = self.records.iter()
            .filter(|(chrom, record)| {
                chrom == region.chrom() && match record.position_hint() {
                    Some(hint) => region.is_overlapping(hint, hint + record.len() as u64),
                    None => true
                }
            })
            .map(|(_chrom, record)| record.clone())
            .collect();
        Ok(Box::new(VecAlignmentReader::new(selected)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(reader: &mut dyn AlignmentReader) -> Vec<String> {
        let mut ret = vec![];
        while let Some(record) = reader.next_alignment() {
            ret.push(record.unwrap().read_key().to_string());
        }
        ret
    }

    #[test]
    fn test_in_memory_reads() {
        let mut source = InMemoryReadSource::new();
        source.add_record("chr1", AlignmentRecord::new("a".to_string(), b"ACGTACGT".to_vec(), Some(0)));
        source.add_record("chr1", AlignmentRecord::new("b".to_string(), b"ACGTACGT".to_vec(), Some(95)));
        source.add_record("chr1", AlignmentRecord::new("c".to_string(), b"ACGTACGT".to_vec(), None));
        source.add_record("chr2", AlignmentRecord::new("d".to_string(), b"ACGTACGT".to_vec(), Some(100)));
        assert_eq!(source.len(), 4);

        let mut reader = source.open(&Region::new("chr1".to_string(), 100, 200)).unwrap();
        assert_eq!(drain(reader.as_mut()), vec!["b".to_string(), "c".to_string()]);

        let mut reader = source.open(&Region::new("chr1".to_string(), 0, 50)).unwrap();
        assert_eq!(drain(reader.as_mut()), vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_vec_variant_source() {
        let mut source = VecVariantSource::new(vec![
            Variant::new("chr1".to_string(), 5, b"A".to_vec(), vec![b"C".to_vec()]).unwrap()
        ]);
        assert_eq!(source.next_variant().unwrap().unwrap().position(), 5);
        assert!(source.next_variant().is_none());
    }
}
