
use simple_error::bail;
use std::fmt;

/// A 0-based, half-open genomic interval on a single contig.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Region {
    /// the contig name
    chrom: String,
    /// 0-based start, inclusive
    start: u64,
    /// 0-based end, exclusive
    end: u64
}

impl Region {
    /// Creates a new region.
    /// # Arguments
    /// * `chrom` - the contig name
    /// * `start` - 0-based start coordinate (inclusive)
    /// * `end` - 0-based end coordinate (exclusive)
    /// # Panics
    /// * if `start > end`
    pub fn new(chrom: String, start: u64, end: u64) -> Region {
        assert!(start <= end, "start > end: {start} > {end}");
        Region {
            chrom,
            start,
            end
        }
    }

    /// Parses a samtools-style region string, e.g. `chr1:1001-2000` (1-based, inclusive).
    /// A bare contig name is also accepted if the contig length is provided.
    /// # Arguments
    /// * `region_str` - the region to parse
    /// * `contig_len` - the length of the contig, used when no coordinates are given and to clip the end
    /// # Errors
    /// * if the coordinates fail to parse or are reversed
    pub fn parse(region_str: &str, contig_len: Option<u64>) -> Result<Region, Box<dyn std::error::Error>> {
        let (chrom, coordinates) = match region_str.rsplit_once(':') {
            Some((c, coords)) => (c.to_string(), Some(coords)),
            None => (region_str.to_string(), None)
        };

        let (start, end) = match coordinates {
            Some(coords) => {
                let cleaned: String = coords.replace(',', "");
                let (s, e) = match cleaned.split_once('-') {
                    Some(se) => se,
                    None => bail!("Region {:?} must have the form chrom:start-end", region_str)
                };
                let start_1: u64 = s.parse()?;
                let end_1: u64 = e.parse()?;
                if start_1 == 0 || start_1 > end_1 {
                    bail!("Region {:?} has invalid coordinates", region_str);
                }
                (start_1 - 1, end_1)
            },
            None => {
                match contig_len {
                    Some(cl) => (0, cl),
                    None => bail!("Region {:?} has no coordinates and no known contig length", region_str)
                }
            }
        };

        let end = match contig_len {
            Some(cl) => end.min(cl),
            None => end
        };
        if start > end {
            bail!("Region {:?} starts past the end of the contig", region_str);
        }
        Ok(Region::new(chrom, start, end))
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns true if `[other_start, other_end)` overlaps this region.
    /// Zero-length intervals (e.g. insertion points) count as overlapping when they sit inside the region.
    pub fn is_overlapping(&self, other_start: u64, other_end: u64) -> bool {
        if other_start == other_end {
            self.start <= other_start && other_start < self.end
        } else {
            other_start < self.end && self.start < other_end
        }
    }

    /// Returns true if `[other_start, other_end)` is fully contained in this region.
    pub fn contains(&self, other_start: u64, other_end: u64) -> bool {
        self.start <= other_start && other_end <= self.end
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // display in the same 1-based form we parse
        write!(f, "{}:{}-{}", self.chrom, self.start + 1, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_region() {
        let region = Region::parse("chr1:1001-2000", None).unwrap();
        assert_eq!(region, Region::new("chr1".to_string(), 1000, 2000));
        assert_eq!(region.len(), 1000);
        assert_eq!(region.to_string(), "chr1:1001-2000");

        // commas are allowed and the end gets clipped
        let region = Region::parse("chr2:1,001-2,000", Some(1500)).unwrap();
        assert_eq!(region, Region::new("chr2".to_string(), 1000, 1500));

        // whole contig
        let region = Region::parse("chrM", Some(16569)).unwrap();
        assert_eq!(region, Region::new("chrM".to_string(), 0, 16569));

        assert!(Region::parse("chrM", None).is_err());
        assert!(Region::parse("chr1:0-10", None).is_err());
        assert!(Region::parse("chr1:20-10", None).is_err());
        assert!(Region::parse("chr1:abc", None).is_err());
    }

    #[test]
    fn test_overlaps() {
        let region = Region::new("chr1".to_string(), 10, 20);
        assert!(region.is_overlapping(5, 11));
        assert!(region.is_overlapping(19, 30));
        assert!(!region.is_overlapping(20, 30));
        assert!(!region.is_overlapping(0, 10));
        assert!(region.is_overlapping(15, 15));
        assert!(!region.is_overlapping(20, 20));

        assert!(region.contains(10, 20));
        assert!(!region.contains(9, 20));
        assert!(!region.contains(10, 21));
    }
}
