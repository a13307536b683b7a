
use std::collections::BTreeMap;

/// The role an allele plays within its variant
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum AlleleRole {
    Ref=0,
    Alt
}

/// Lightweight back-reference from a graph node (or a read mapping) to one allele of one variant.
/// `variant_index` is the index assigned by the owning `VariantList`, `allele_index` is 0 for REF and 1.. for the ALTs.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct AlleleRef {
    variant_index: usize,
    allele_index: usize
}

impl AlleleRef {
    pub fn new(variant_index: usize, allele_index: usize) -> AlleleRef {
        AlleleRef {
            variant_index,
            allele_index
        }
    }

    pub fn variant_index(&self) -> usize {
        self.variant_index
    }

    pub fn allele_index(&self) -> usize {
        self.allele_index
    }

    pub fn role(&self) -> AlleleRole {
        if self.allele_index == 0 { AlleleRole::Ref } else { AlleleRole::Alt }
    }
}

/// A borrowed view of a single allele within a `Variant`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Allele<'a> {
    sequence: &'a [u8],
    role: AlleleRole,
    owner: AlleleRef
}

impl<'a> Allele<'a> {
    pub fn sequence(&self) -> &'a [u8] {
        self.sequence
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn role(&self) -> AlleleRole {
        self.role
    }

    pub fn owner(&self) -> AlleleRef {
        self.owner
    }
}

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum VariantError {
    #[error("allele{index} is empty (length = 0)")]
    EmptyAllele{ index: usize },
    #[error("variant must have at least one ALT allele")]
    NoAltAlleles,
    #[error("allele{index} is symbolic or contains non-sequence characters")]
    SymbolicAllele{ index: usize }
}

/// A candidate variant with fully resolved allele sequences.
/// Support counters are carried here for the downstream writer, but they are only ever written by the adjudication context.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Variant {
    /// index in the owning VariantList, 0 until it gets added to one
    variant_index: usize,
    /// the contig of the event
    chrom: String,
    /// the coordinate of the event, 0-based
    position: u64,
    /// the REF allele sequence
    ref_allele: Vec<u8>,
    /// the ALT allele sequences, in file order
    alt_alleles: Vec<Vec<u8>>,
    /// one counter per allele; index 0 is REF
    support: Vec<u32>,
    /// any other fields we want to carry through to the output (ID, QUAL, FILTER, ...)
    metadata: BTreeMap<String, String>
}

impl Variant {
    /// Creates a new variant and performs sanity checks on the alleles.
    /// # Arguments
    /// * `chrom` - the contig of the variant
    /// * `position` - the 0-based coordinate of the first REF base
    /// * `ref_allele` - the REF sequence
    /// * `alt_alleles` - one or more ALT sequences
    /// # Errors
    /// * if there are no ALT alleles
    /// * if any allele is empty
    /// * if any allele is symbolic (e.g. `<DEL>`) or otherwise contains non-IUPAC characters
    pub fn new(chrom: String, position: u64, mut ref_allele: Vec<u8>, mut alt_alleles: Vec<Vec<u8>>) -> Result<Variant, VariantError> {
        if alt_alleles.is_empty() {
            return Err(VariantError::NoAltAlleles);
        }

        ref_allele.make_ascii_uppercase();
        check_allele(&ref_allele, 0)?;
        for (alt_index, alt) in alt_alleles.iter_mut().enumerate() {
            alt.make_ascii_uppercase();
            check_allele(alt, alt_index + 1)?;
        }

        let num_alleles = alt_alleles.len() + 1;
        Ok(Variant {
            variant_index: 0,
            chrom,
            position,
            ref_allele,
            alt_alleles,
            support: vec![0; num_alleles],
            metadata: Default::default()
        })
    }

    /// Attaches an arbitrary metadata field, replacing any previous value for that key
    pub fn add_metadata(&mut self, key: &str, value: String) {
        self.metadata.insert(key.to_string(), value);
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn get_metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(|s| s.as_str())
    }

    pub fn variant_index(&self) -> usize {
        self.variant_index
    }

    pub(crate) fn set_variant_index(&mut self, variant_index: usize) {
        self.variant_index = variant_index;
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// 0-based exclusive end of the REF allele
    pub fn end(&self) -> u64 {
        self.position + self.ref_allele.len() as u64
    }

    pub fn get_ref_len(&self) -> usize {
        self.ref_allele.len()
    }

    pub fn ref_allele(&self) -> &[u8] {
        &self.ref_allele
    }

    pub fn alt_alleles(&self) -> &[Vec<u8>] {
        &self.alt_alleles
    }

    /// Total allele count including REF
    pub fn num_alleles(&self) -> usize {
        self.alt_alleles.len() + 1
    }

    /// Returns the allele at the given index, where 0 is REF.
    pub fn allele(&self, allele_index: usize) -> Option<Allele<'_>> {
        let sequence: &[u8] = if allele_index == 0 {
            &self.ref_allele
        } else {
            self.alt_alleles.get(allele_index - 1)?
        };
        let owner = AlleleRef::new(self.variant_index, allele_index);
        Some(Allele {
            sequence,
            role: owner.role(),
            owner
        })
    }

    /// Iterates over all alleles, REF first
    pub fn alleles(&self) -> impl Iterator<Item = Allele<'_>> {
        (0..self.num_alleles()).filter_map(|i| self.allele(i))
    }

    pub fn allele_ref(&self, allele_index: usize) -> AlleleRef {
        AlleleRef::new(self.variant_index, allele_index)
    }

    pub fn max_allele_len(&self) -> usize {
        self.alt_alleles.iter()
            .map(|a| a.len())
            .max()
            .unwrap_or(0)
            .max(self.ref_allele.len())
    }

    /// Returns true if the REF spans of the two variants share at least one base.
    pub fn is_overlapping(&self, other: &Variant) -> bool {
        self.chrom == other.chrom && self.position < other.end() && other.position < self.end()
    }

    pub fn support(&self, allele_index: usize) -> u32 {
        self.support.get(allele_index).copied().unwrap_or(0)
    }

    pub fn support_counts(&self) -> &[u32] {
        &self.support
    }

    pub(crate) fn set_support(&mut self, allele_index: usize, count: u32) {
        self.support[allele_index] = count;
    }

    /// Key that identifies the same event across sources, used by `VariantList` for updates
    pub fn identity_key(&self) -> (String, u64, Vec<u8>, Vec<Vec<u8>>) {
        (self.chrom.clone(), self.position, self.ref_allele.clone(), self.alt_alleles.clone())
    }
}

/// Checks a single allele sequence for emptiness and symbolic content
fn check_allele(allele: &[u8], index: usize) -> Result<(), VariantError> {
    if allele.is_empty() {
        return Err(VariantError::EmptyAllele { index });
    }
    if !allele.iter().all(|b| b"ACGTNRYSWKMBDHV".contains(b)) {
        return Err(VariantError::SymbolicAllele { index });
    }
    Ok(())
}
