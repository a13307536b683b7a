
use bio::data_structures::interval_tree::IntervalTree;
use log::trace;
use rustc_hash::FxHashMap as HashMap;

use crate::data_types::region::Region;
use crate::data_types::variants::Variant;

/// (chrom, position, REF, ALTs) - two records with the same key are the same event
type VariantKey = (String, u64, Vec<u8>, Vec<Vec<u8>>);

/// Region-wide, ordered collection of variants.
/// Indices are stable once assigned, and they are what `AlleleRef` points back to.
#[derive(Default)]
pub struct VariantList {
    /// the variants, in insertion order
    variants: Vec<Variant>,
    /// lookup from event identity to index
    index_map: HashMap<VariantKey, usize>,
    /// per-contig overlap lookup, data is the index into `variants`
    interval_trees: HashMap<String, IntervalTree<u64, usize>>
}

impl VariantList {
    pub fn new() -> VariantList {
        Default::default()
    }

    /// Adds a new variant, or updates the existing record for the same event.
    /// On update, the support counters are replaced by the incoming ones and metadata is merged.
    /// Returns the stable index of the variant.
    /// # Arguments
    /// * `variant` - the variant to add or merge
    pub fn add_or_update(&mut self, mut variant: Variant) -> usize {
        let key = variant.identity_key();
        if let Some(&index) = self.index_map.get(&key) {
            trace!("Updating variant {} at {}:{}", index, variant.chrom(), variant.position());
            let existing: &mut Variant = &mut self.variants[index];
            for (allele_index, &count) in variant.support_counts().iter().enumerate() {
                existing.set_support(allele_index, count);
            }
            for (k, v) in variant.metadata().iter() {
                existing.add_metadata(k, v.clone());
            }
            index
        } else {
            let index = self.variants.len();
            variant.set_variant_index(index);
            self.interval_trees.entry(variant.chrom().to_string())
                .or_default()
                .insert(variant.position()..variant.end(), index);
            self.index_map.insert(key, index);
            self.variants.push(variant);
            index
        }
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Variant> {
        self.variants.get(index)
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// Returns all variants whose REF span overlaps the region, sorted by position (ties by index).
    /// # Arguments
    /// * `region` - the query interval
    pub fn overlapping(&self, region: &Region) -> Vec<&Variant> {
        let tree = match self.interval_trees.get(region.chrom()) {
            Some(t) => t,
            None => return vec![]
        };
        if region.is_empty() {
            return vec![];
        }

        let mut ret: Vec<&Variant> = tree.find(region.start()..region.end())
            .map(|entry| &self.variants[*entry.data()])
            .collect();
        ret.sort_by_key(|v| (v.position(), v.variant_index()));
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snv(chrom: &str, position: u64, alt: &[u8]) -> Variant {
        Variant::new(chrom.to_string(), position, b"A".to_vec(), vec![alt.to_vec()]).unwrap()
    }

    #[test]
    fn test_add_or_update() {
        let mut variant_list = VariantList::new();
        assert!(variant_list.is_empty());
        assert_eq!(variant_list.add_or_update(snv("chr1", 10, b"C")), 0);
        assert_eq!(variant_list.add_or_update(snv("chr1", 5, b"G")), 1);
        // same position, different alt is a different event
        assert_eq!(variant_list.add_or_update(snv("chr1", 10, b"T")), 2);
        assert_eq!(variant_list.len(), 3);

        let mut update = snv("chr1", 10, b"C");
        update.set_support(1, 4);
        update.add_metadata("ID", "rs10".to_string());
        assert_eq!(variant_list.add_or_update(update), 0);
        assert_eq!(variant_list.len(), 3);

        let stored = variant_list.get(0).unwrap();
        assert_eq!(stored.variant_index(), 0);
        assert_eq!(stored.support_counts(), &[0, 4]);
        assert_eq!(stored.get_metadata("ID"), Some("rs10"));
        assert_eq!(variant_list.get(2).unwrap().variant_index(), 2);
    }

    #[test]
    fn test_overlapping() {
        let mut variant_list = VariantList::new();
        variant_list.add_or_update(snv("chr1", 10, b"C"));
        variant_list.add_or_update(snv("chr1", 5, b"G"));
        variant_list.add_or_update(Variant::new("chr1".to_string(), 18, b"ACGT".to_vec(), vec![b"A".to_vec()]).unwrap());
        variant_list.add_or_update(snv("chr2", 10, b"C"));

        let found: Vec<u64> = variant_list.overlapping(&Region::new("chr1".to_string(), 0, 20))
            .iter().map(|v| v.position()).collect();
        assert_eq!(found, vec![5, 10, 18]);

        // deletion spanning into the query
        let found: Vec<u64> = variant_list.overlapping(&Region::new("chr1".to_string(), 20, 30))
            .iter().map(|v| v.position()).collect();
        assert_eq!(found, vec![18]);

        assert!(variant_list.overlapping(&Region::new("chr1".to_string(), 11, 18)).is_empty());
        assert!(variant_list.overlapping(&Region::new("chr3".to_string(), 0, 100)).is_empty());
        assert_eq!(variant_list.overlapping(&Region::new("chr2".to_string(), 0, 100)).len(), 1);
    }
}
