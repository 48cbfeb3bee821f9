use std::{io::BufRead, path::Path, rc::Rc};

use anyhow::Context;
use compress_io::compress::CompressIo;

use crate::{error::SgeError, sample::SampleName};

pub const ALLELES: [u8; 4] = [b'A', b'C', b'G', b'T'];

/// Observed count for one allele at one position of one sample
#[derive(Debug, Clone, PartialEq)]
pub struct CountRow {
    chrom: Option<Rc<str>>,
    pos: usize,
    allele: u8,
    count: f64,
}

impl CountRow {
    pub fn new(pos: usize, allele: u8, count: f64) -> Self {
        Self {
            chrom: None,
            pos,
            allele: allele.to_ascii_uppercase(),
            count,
        }
    }

    pub fn with_chrom(mut self, chrom: Rc<str>) -> Self {
        self.chrom = Some(chrom);
        self
    }

    pub fn chrom(&self) -> Option<&str> {
        self.chrom.as_deref()
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn allele(&self) -> u8 {
        self.allele
    }

    pub fn count(&self) -> f64 {
        self.count
    }
}

/// Per-position, per-allele counts for one sample
#[derive(Debug, Clone, Default)]
pub struct SampleCounts {
    name: Option<SampleName>,
    source: Box<str>,
    rows: Vec<CountRow>,
}

impl SampleCounts {
    pub fn new(source: &str, rows: Vec<CountRow>) -> Self {
        Self {
            name: None,
            source: Box::from(source),
            rows,
        }
    }

    pub fn name(&self) -> Option<&SampleName> {
        self.name.as_ref()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn rows(&self) -> &[CountRow] {
        &self.rows
    }

    /// Read an SNV counts file. Each line gives the counts of all four bases
    /// at one position; these are split into one row per allele. If
    /// `pseudocount` is > 0, zero counts are replaced by it.
    pub fn read_snvs<P: AsRef<Path>>(file: P, pseudocount: f64) -> anyhow::Result<Self> {
        let file = file.as_ref();
        let rdr = CompressIo::new()
            .path(file)
            .bufreader()
            .with_context(|| format!("Could not open counts file {}", file.display()))?;
        debug!("Reading in SNV counts from {}", file.display());
        let mut counts = Self::snvs_from_reader(rdr, &file.display().to_string(), pseudocount)?;
        if counts.name.is_none() {
            counts.name = SampleName::from_path(file)
        }
        Ok(counts)
    }

    pub fn snvs_from_reader<R: BufRead>(mut rdr: R, source: &str, pseudocount: f64) -> anyhow::Result<Self> {
        let mut buf = String::new();
        if rdr.read_line(&mut buf)? == 0 {
            return Err(SgeError::parse(source, "empty counts file").into());
        }
        let hdr = Header::new(&buf);
        let pos_ix = hdr.require("pos", source)?;
        let allele_ix = ALLELES
            .iter()
            .map(|&a| {
                let c = a as char;
                hdr.find(&format!("n_{c}"))
                    .or_else(|| hdr.find(&c.to_string()))
                    .ok_or_else(|| SgeError::parse(source, format!("missing count column for allele {c}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let chrom_ix = hdr.find("chrom");
        let sample_ix = hdr.find("sampleid");

        let mut name = None;
        let mut rows = Vec::new();
        let mut chrom: Option<Rc<str>> = None;
        let mut line = 1;
        loop {
            buf.clear();
            if rdr.read_line(&mut buf)? == 0 {
                break;
            }
            line += 1;
            let fields: Vec<_> = buf.trim_end_matches(['\n', '\r']).split('\t').collect();
            if fields.len() == 1 && fields[0].trim().is_empty() {
                continue;
            }
            let field = |ix: usize| {
                fields
                    .get(ix)
                    .map(|s| s.trim())
                    .ok_or_else(|| SgeError::parse(source, format!("short line {line}")))
            };
            if name.is_none() {
                if let Some(ix) = sample_ix {
                    name = SampleName::from_str(field(ix)?);
                }
            }
            if let Some(ix) = chrom_ix {
                let c = field(ix)?;
                if chrom.as_deref() != Some(c) {
                    chrom = Some(Rc::from(c))
                }
            }
            let pos = field(pos_ix)?
                .parse::<usize>()
                .map_err(|e| SgeError::parse(source, format!("bad position at line {line}: {e}")))?;
            for (&allele, &ix) in ALLELES.iter().zip(allele_ix.iter()) {
                let mut count = parse_count(field(ix)?)
                    .ok_or_else(|| SgeError::parse(source, format!("bad count at line {line}, column {}", ix + 1)))?;
                if pseudocount > 0.0 && count == 0.0 {
                    count = pseudocount
                }
                let row = CountRow::new(pos, allele, count);
                rows.push(match &chrom {
                    Some(c) => row.with_chrom(c.clone()),
                    None => row,
                })
            }
        }
        debug!("{}: {} count rows read", source, rows.len());
        let mut counts = Self::new(source, rows);
        counts.name = name;
        Ok(counts)
    }
}

/// Columns holding the read count of a deletion, in order of preference
const DEL_COUNT_COLUMNS: [&str; 3] = ["count", "counts", "n"];

/// Deletion counts for one sample. Each data line describes one deletion;
/// its read count comes from a `count` (or `counts`, `n`) column when the
/// file has one, otherwise every line counts once.
#[derive(Debug, Clone)]
pub struct DelCounts {
    name: Option<SampleName>,
    source: Box<str>,
    counts: Vec<f64>,
}

impl DelCounts {
    pub fn name(&self) -> Option<&SampleName> {
        self.name.as_ref()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of distinct deletions
    pub fn n_deletions(&self) -> usize {
        self.counts.len()
    }

    /// Reads supporting any deletion
    pub fn total_count(&self) -> f64 {
        self.counts.iter().sum()
    }

    pub fn read_dels<P: AsRef<Path>>(file: P) -> anyhow::Result<Self> {
        let file = file.as_ref();
        let rdr = CompressIo::new()
            .path(file)
            .bufreader()
            .with_context(|| format!("Could not open deletion counts file {}", file.display()))?;
        debug!("Reading in deletion counts from {}", file.display());
        let mut dels = Self::from_reader(rdr, &file.display().to_string())?;
        if dels.name.is_none() {
            dels.name = SampleName::from_path(file)
        }
        Ok(dels)
    }

    pub fn from_reader<R: BufRead>(mut rdr: R, source: &str) -> anyhow::Result<Self> {
        let mut buf = String::new();
        if rdr.read_line(&mut buf)? == 0 {
            return Err(SgeError::parse(source, "empty deletion counts file").into());
        }
        let hdr = Header::new(&buf);
        let sample_ix = hdr.find("sampleid");
        let count_ix = DEL_COUNT_COLUMNS.iter().find_map(|c| hdr.find(c));

        let mut name = None;
        let mut counts = Vec::new();
        let mut line = 1;
        loop {
            buf.clear();
            if rdr.read_line(&mut buf)? == 0 {
                break;
            }
            line += 1;
            let fields: Vec<_> = buf.trim_end_matches(['\n', '\r']).split('\t').map(|s| s.trim()).collect();
            if fields.len() == 1 && fields[0].is_empty() {
                continue;
            }
            if name.is_none() {
                name = sample_ix.and_then(|ix| fields.get(ix)).and_then(|s| SampleName::from_str(s));
            }
            let count = match count_ix {
                Some(ix) => fields
                    .get(ix)
                    .and_then(|s| parse_count(s))
                    .ok_or_else(|| SgeError::parse(source, format!("bad count at line {line}, column {}", ix + 1)))?,
                None => 1.0,
            };
            counts.push(count)
        }
        debug!("{}: {} deletions read", source, counts.len());
        Ok(Self {
            name,
            source: Box::from(source),
            counts,
        })
    }
}

fn parse_count(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|x| x.is_finite() && *x >= 0.0)
}

/// Column lookup for a tab separated header line
struct Header {
    cols: Vec<Box<str>>,
}

impl Header {
    fn new(line: &str) -> Self {
        Self {
            cols: line.trim_end_matches(['\n', '\r']).split('\t').map(|s| Box::from(s.trim())).collect(),
        }
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.cols.iter().position(|c| &**c == name)
    }

    fn require(&self, name: &str, source: &str) -> anyhow::Result<usize> {
        self.find(name)
            .ok_or_else(|| SgeError::parse(source, format!("missing column '{name}'")).into())
    }
}

/// Read categories reported in a read stats file, in output order
pub const READ_CATEGORIES: [&str; 8] = [
    "bad_cigar",
    "wild_type",
    "missing_req_edit",
    "too_many_snvs",
    "del_plus_errors",
    "no_snv_edit",
    "snv_reads",
    "deletion_reads",
];

/// Read totals for one sample
#[derive(Debug, Clone)]
pub struct ReadStats {
    sample: Box<str>,
    name: Option<SampleName>,
    total_reads: u64,
    categories: [Option<u64>; READ_CATEGORIES.len()],
}

impl ReadStats {
    pub fn sample(&self) -> &str {
        &self.sample
    }

    pub fn name(&self) -> Option<&SampleName> {
        self.name.as_ref()
    }

    pub fn total_reads(&self) -> u64 {
        self.total_reads
    }

    /// Count for category `ix` of [READ_CATEGORIES], if present in the file
    pub fn count(&self, ix: usize) -> Option<u64> {
        self.categories.get(ix).copied().flatten()
    }

    /// Count for category `ix` as a percentage of all reads
    pub fn pct(&self, ix: usize) -> Option<f64> {
        match (self.count(ix), self.total_reads) {
            (Some(_), 0) | (None, _) => None,
            (Some(x), t) => Some(x as f64 / t as f64 * 100.0),
        }
    }

    pub fn read<P: AsRef<Path>>(file: P) -> anyhow::Result<Vec<Self>> {
        let file = file.as_ref();
        let rdr = CompressIo::new()
            .path(file)
            .bufreader()
            .with_context(|| format!("Could not open read stats file {}", file.display()))?;
        debug!("Reading in read stats from {}", file.display());
        Self::from_reader(rdr, &file.display().to_string())
    }

    pub fn from_reader<R: BufRead>(mut rdr: R, source: &str) -> anyhow::Result<Vec<Self>> {
        let mut buf = String::new();
        if rdr.read_line(&mut buf)? == 0 {
            return Err(SgeError::parse(source, "empty read stats file").into());
        }
        let hdr = Header::new(&buf);
        let sample_ix = hdr.require("sampleid", source)?;
        let total_ix = hdr.require("total_reads", source)?;
        let cat_ix: Vec<_> = READ_CATEGORIES.iter().map(|c| hdr.find(c)).collect();

        let mut v = Vec::new();
        let mut line = 1;
        loop {
            buf.clear();
            if rdr.read_line(&mut buf)? == 0 {
                break;
            }
            line += 1;
            let fields: Vec<_> = buf.trim_end_matches(['\n', '\r']).split('\t').map(|s| s.trim()).collect();
            if fields.len() == 1 && fields[0].is_empty() {
                continue;
            }
            let get_u64 = |ix: usize| {
                fields
                    .get(ix)
                    .and_then(|s| s.parse::<u64>().ok())
                    .ok_or_else(|| SgeError::parse(source, format!("bad value at line {line}, column {}", ix + 1)))
            };
            let sample = fields
                .get(sample_ix)
                .ok_or_else(|| SgeError::parse(source, format!("short line {line}")))?;
            let total_reads = get_u64(total_ix)?;
            let mut categories = [None; READ_CATEGORIES.len()];
            for (c, ix) in categories.iter_mut().zip(cat_ix.iter()) {
                if let Some(ix) = ix {
                    *c = Some(get_u64(*ix)?)
                }
            }
            v.push(Self {
                sample: Box::from(*sample),
                name: SampleName::from_str(sample),
                total_reads,
                categories,
            })
        }
        debug!("{}: read stats for {} samples", source, v.len());
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNVS: &str = "sampleid\tchrom\tpos\tn_A\tn_C\tn_G\tn_T\n\
        BRCA1_3_R1_D7\tchr17\t100\t0\t12\t3\t1\n\
        BRCA1_3_R1_D7\tchr17\t101\t7\t0\t0\t250\n";

    #[test]
    fn read_snv_counts() {
        let sc = SampleCounts::snvs_from_reader(SNVS.as_bytes(), "test", 0.0).unwrap();
        assert_eq!(sc.name().unwrap().replicate(), "R1");
        assert_eq!(sc.name().unwrap().day(), "D7");
        let rows = sc.rows();
        assert_eq!(rows.len(), 8);
        assert_eq!((rows[1].pos(), rows[1].allele(), rows[1].count()), (100, b'C', 12.0));
        assert_eq!((rows[7].pos(), rows[7].allele(), rows[7].count()), (101, b'T', 250.0));
        assert_eq!(rows[0].chrom(), Some("chr17"));
    }

    #[test]
    fn pseudocount_and_renamed_columns() {
        let s = "pos\tA\tC\tG\tT\n5\t0\t2\t0\t1\n";
        let sc = SampleCounts::snvs_from_reader(s.as_bytes(), "test", 0.5).unwrap();
        let cts: Vec<_> = sc.rows().iter().map(|r| r.count()).collect();
        assert_eq!(cts, vec![0.5, 2.0, 0.5, 1.0]);
        assert!(sc.name().is_none());
        assert!(sc.rows()[0].chrom().is_none());
    }

    #[test]
    fn bad_counts() {
        let e = SampleCounts::snvs_from_reader("pos\tn_A\tn_C\tn_G\n".as_bytes(), "t", 0.0).unwrap_err();
        assert!(crate::error::kind_of(&e).unwrap().is_parse());
        let e = SampleCounts::snvs_from_reader("pos\tA\tC\tG\tT\nx\t1\t1\t1\t1\n".as_bytes(), "t", 0.0).unwrap_err();
        assert!(crate::error::kind_of(&e).unwrap().is_parse());
        let e = SampleCounts::snvs_from_reader("pos\tA\tC\tG\tT\n3\t1\t-1\t1\t1\n".as_bytes(), "t", 0.0).unwrap_err();
        assert!(crate::error::kind_of(&e).unwrap().is_parse());
    }

    #[test]
    fn read_deletions() {
        let s = "sampleid\tchrom\tstart\tend\tcount\n\
            BRCA1_3_R2_D14\tchr17\t100\t104\t12\n\
            BRCA1_3_R2_D14\tchr17\t110\t111\t3\n";
        let d = DelCounts::from_reader(s.as_bytes(), "test").unwrap();
        assert_eq!(d.n_deletions(), 2);
        assert_eq!(d.total_count(), 15.0);
        let name = d.name().unwrap();
        assert_eq!((name.gene(), name.replicate(), name.day()), ("BRCA1", "R2", "D14"));

        // Without a count column every line is one deletion
        let d = DelCounts::from_reader("start\tend\n1\t3\n5\t9\n\n".as_bytes(), "test").unwrap();
        assert_eq!((d.n_deletions(), d.total_count()), (2, 2.0));
        assert!(d.name().is_none());

        let e = DelCounts::from_reader("start\tn\n1\tx\n".as_bytes(), "test").unwrap_err();
        assert!(crate::error::kind_of(&e).unwrap().is_parse());
        assert!(DelCounts::from_reader("".as_bytes(), "test").is_err());
    }

    #[test]
    fn deletion_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("RAD51C_2_R1_D7.dels.tsv");
        std::fs::write(&p, "start\tend\tcount\n4\t6\t2\n").unwrap();
        let d = DelCounts::read_dels(&p).unwrap();
        assert_eq!(d.name().unwrap().to_string(), "RAD51C_2_R1_D7");
        assert_eq!(d.total_count(), 2.0);
    }

    #[test]
    fn read_stats() {
        let s = "sampleid\ttotal_reads\tbad_cigar\twild_type\tsnv_reads\n\
            BRCA1_3_R1_D7\t200\t10\t50\t140\n\
            BRCA1_3_NC_D7\t0\t0\t0\t0\n";
        let v = ReadStats::from_reader(s.as_bytes(), "test").unwrap();
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].total_reads(), 200);
        assert_eq!(v[0].pct(0), Some(5.0));
        assert_eq!(v[0].pct(1), Some(25.0));
        assert_eq!(v[0].count(2), None);
        assert_eq!(v[0].pct(6), Some(70.0));
        assert!(v[1].name().unwrap().is_negative_control());
        assert_eq!(v[1].pct(0), None);
    }
}
