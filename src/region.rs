use std::fmt;

use crate::error::SgeError;

/// Genomic interval, 1-based with both ends inclusive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    chrom: Box<str>,
    start: usize,
    stop: usize,
}

impl Region {
    pub fn new(chrom: &str, start: usize, stop: usize) -> anyhow::Result<Self> {
        if start == 0 {
            return Err(SgeError::parse("region", format!("{chrom}:{start}-{stop}: coordinates are 1-based")).into());
        }
        if stop < start {
            return Err(SgeError::parse("region", format!("{chrom}:{start}-{stop}: stop < start")).into());
        }
        Ok(Self {
            chrom: Box::from(chrom),
            start,
            stop,
        })
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    /// Contig name with any `chr` prefix removed
    pub fn query_name(&self) -> &str {
        strip_chr(&self.chrom)
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn stop(&self) -> usize {
        self.stop
    }

    pub fn len(&self) -> usize {
        self.stop + 1 - self.start
    }

    pub fn contains(&self, pos: usize) -> bool {
        pos >= self.start && pos <= self.stop
    }

    pub fn contains_region(&self, other: &Region) -> bool {
        self.query_name() == other.query_name() && self.start <= other.start && self.stop >= other.stop
    }

    pub fn positions(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.stop
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chrom, self.start, self.stop)
    }
}

pub fn strip_chr(s: &str) -> &str {
    s.strip_prefix("chr").unwrap_or(s)
}

/// True if the two chromosome names refer to the same contig, ignoring a `chr` prefix
pub fn same_chrom(a: &str, b: &str) -> bool {
    strip_chr(a) == strip_chr(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_region() {
        let r = Region::new("chr17", 43045678, 43045802).unwrap();
        assert_eq!(r.chrom(), "chr17");
        assert_eq!(r.query_name(), "17");
        assert_eq!(r.len(), 125);
        assert_eq!(r.positions().count(), 125);
        assert_eq!(r.to_string(), "chr17:43045678-43045802");
    }

    #[test]
    fn bad_regions() {
        assert!(Region::new("chr1", 20, 10).is_err());
        assert!(Region::new("chr1", 0, 10).is_err());
        assert!(Region::new("chr1", 10, 10).is_ok());
    }

    #[test]
    fn containment() {
        let amp = Region::new("chr2", 100, 300).unwrap();
        let edit = Region::new("2", 150, 250).unwrap();
        assert!(amp.contains_region(&edit));
        assert!(!edit.contains_region(&amp));
        assert!(edit.contains(150) && edit.contains(250) && !edit.contains(251));
        assert!(same_chrom("chrX", "X"));
    }
}
