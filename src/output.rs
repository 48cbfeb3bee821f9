use std::{
    collections::BTreeMap,
    fmt,
    io::{self, BufWriter, Write},
    path::Path,
};

use compress_io::compress::{CompressIo, Writer};

use crate::{
    correlation::DayCorrelation,
    counts::{DelCounts, ReadStats, READ_CATEGORIES},
    sample::{cmp_days, SampleFile, SampleName},
};

/// Optional value written as `NA` when missing
struct Na<T>(Option<T>);

impl fmt::Display for Na<f64> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(x) => write!(f, "{:.6}", x),
            None => write!(f, "NA"),
        }
    }
}

impl fmt::Display for Na<u64> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(x) => write!(f, "{}", x),
            None => write!(f, "NA"),
        }
    }
}

/// Gene, exon, replicate and day columns of a sample name
struct NameFields<'a>(Option<&'a SampleName>);

impl fmt::Display for NameFields<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(n) => write!(f, "{}\t{}\t{}\t{}", n.gene(), n.exon(), n.replicate(), n.day()),
            None => write!(f, "NA\tNA\tNA\tNA"),
        }
    }
}

fn sorted_days(res: &BTreeMap<String, DayCorrelation>) -> Vec<(&str, &DayCorrelation)> {
    let mut v: Vec<_> = res.iter().map(|(d, c)| (d.as_str(), c)).collect();
    v.sort_by(|a, b| cmp_days(a.0, b.0));
    v
}

fn sample_label(p: &Path) -> String {
    SampleName::from_path(p)
        .map(|s| s.to_string())
        .unwrap_or_else(|| p.display().to_string())
}

pub fn open_output(prefix: &str, suffix: &str) -> io::Result<BufWriter<Writer>> {
    let name = format!("{}_{}", prefix, suffix);
    debug!("Opening {} for output", name);
    CompressIo::new().path(name).bufwriter()
}

pub fn write_correlations<W: Write>(
    wrt: &mut W,
    target: &str,
    res: &BTreeMap<String, DayCorrelation>,
) -> io::Result<()> {
    writeln!(wrt, "target\tday\tn_replicates\tn_pairs\tn_defined\tmean_r")?;
    for (day, c) in sorted_days(res) {
        writeln!(
            wrt,
            "{}\t{}\t{}\t{}\t{}\t{}",
            target,
            day,
            c.samples().len(),
            c.pairs().len(),
            c.n_defined(),
            Na(c.mean())
        )?;
    }
    Ok(())
}

pub fn write_pairwise<W: Write>(wrt: &mut W, target: &str, res: &BTreeMap<String, DayCorrelation>) -> io::Result<()> {
    writeln!(wrt, "target\tday\tsample_1\tsample_2\tn_points\tr")?;
    for (day, c) in sorted_days(res) {
        let samples = c.samples();
        for p in c.pairs() {
            let (a, b) = p.samples();
            writeln!(
                wrt,
                "{}\t{}\t{}\t{}\t{}\t{}",
                target,
                day,
                sample_label(&samples[a]),
                sample_label(&samples[b]),
                p.corr().n_points(),
                Na(p.corr().r())
            )?;
        }
    }
    Ok(())
}

pub fn write_readstats<W: Write>(wrt: &mut W, stats: &[ReadStats]) -> io::Result<()> {
    write!(wrt, "sampleid\tgene\texon\trepl\tday\ttotal_reads")?;
    for c in READ_CATEGORIES.iter() {
        write!(wrt, "\t{c}\tpct_{c}")?;
    }
    writeln!(wrt)?;
    for s in stats {
        write!(wrt, "{}\t{}\t{}", s.sample(), NameFields(s.name()), s.total_reads())?;
        for ix in 0..READ_CATEGORIES.len() {
            match s.pct(ix) {
                Some(p) => write!(wrt, "\t{}\t{:.2}", Na(s.count(ix)), p)?,
                None => write!(wrt, "\t{}\tNA", Na(s.count(ix)))?,
            }
        }
        writeln!(wrt)?;
    }
    Ok(())
}

pub fn write_deletions<W: Write>(wrt: &mut W, dels: &[DelCounts]) -> io::Result<()> {
    writeln!(wrt, "sampleid\tgene\texon\trepl\tday\tn_deletions\ttotal_count")?;
    for d in dels {
        let label = d.name().map(|n| n.to_string()).unwrap_or_else(|| d.source().to_owned());
        writeln!(
            wrt,
            "{}\t{}\t{}\t{}",
            label,
            NameFields(d.name()),
            d.n_deletions(),
            d.total_count()
        )?;
    }
    Ok(())
}

pub fn write_inventory<W: Write>(wrt: &mut W, files: &[SampleFile]) -> io::Result<()> {
    writeln!(wrt, "kind\tday\treplicate\tnegative_control\tpath")?;
    let mut v: Vec<_> = files.iter().collect();
    v.sort_by(|a, b| {
        a.kind()
            .suffix()
            .cmp(b.kind().suffix())
            .then_with(|| cmp_days(a.name().day(), b.name().day()))
            .then_with(|| a.path().cmp(b.path()))
    });
    for f in v {
        writeln!(
            wrt,
            "{}\t{}\t{}\t{}\t{}",
            f.kind(),
            f.name().day(),
            f.name().replicate(),
            f.name().is_negative_control(),
            f.path().display()
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        counts::{CountRow, SampleCounts},
        correlation::mean_pairwise_correlation,
        reference::FastaReference,
        sample::{find_sample_files, SamplesByDay},
        target::{Target, TargetTable},
    };
    use std::{collections::HashMap, path::PathBuf};

    fn results() -> BTreeMap<String, DayCorrelation> {
        let tbl = TargetTable::from_reader(
            "target\tchrom\teditstart\teditstop\tampstart\tampstop\nT_1\tchr1\t1\t4\t1\t4\n".as_bytes(),
            "test",
        )
        .unwrap();
        let rf = FastaReference::from_reader(">1\nAAAA\n".as_bytes()).unwrap();
        let t = Target::new("T_1", &tbl, &rf, 4).unwrap();
        let mut h = HashMap::new();
        let mk = |v: [f64; 3]| SampleCounts::new("x", (1..=3).map(|p| CountRow::new(p, b'C', v[p - 1])).collect());
        h.insert(PathBuf::from("T_1_R1_D14.snvs.tsv"), mk([1.0, 2.0, 3.0]));
        h.insert(PathBuf::from("T_1_R2_D14.snvs.tsv"), mk([2.0, 4.0, 7.0]));
        h.insert(PathBuf::from("T_1_R1_D7.snvs.tsv"), mk([1.0, 1.0, 1.0]));
        h.insert(PathBuf::from("T_1_R2_D7.snvs.tsv"), mk([2.0, 4.0, 7.0]));
        let mut samples = SamplesByDay::new();
        for k in h.keys() {
            let day = SampleName::from_path(k).unwrap().day().to_owned();
            samples.entry(day).or_default().push(k.clone());
        }
        mean_pairwise_correlation(&t, &samples, |p| Ok(h[p].clone())).unwrap()
    }

    #[test]
    fn correlation_table() {
        let mut v = Vec::new();
        write_correlations(&mut v, "T_1", &results()).unwrap();
        let s = String::from_utf8(v).unwrap();
        let lines: Vec<_> = s.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "T_1\tD7\t2\t1\t0\tNA");
        assert!(lines[2].starts_with("T_1\tD14\t2\t1\t1\t0.99"));
    }

    #[test]
    fn pairwise_table() {
        let mut v = Vec::new();
        write_pairwise(&mut v, "T_1", &results()).unwrap();
        let s = String::from_utf8(v).unwrap();
        let lines: Vec<_> = s.lines().collect();
        assert_eq!(lines[1], "T_1\tD7\tT_1_R1_D7\tT_1_R2_D7\t3\tNA");
    }

    #[test]
    fn readstats_table() {
        let s = "sampleid\ttotal_reads\tbad_cigar\nG_1_R1_D7\t40\t10\n";
        let rs = ReadStats::from_reader(s.as_bytes(), "t").unwrap();
        let mut v = Vec::new();
        write_readstats(&mut v, &rs).unwrap();
        let s = String::from_utf8(v).unwrap();
        let row: Vec<_> = s.lines().nth(1).unwrap().split('\t').collect();
        assert_eq!(&row[..8], &["G_1_R1_D7", "G", "1", "R1", "D7", "40", "10", "25.00"]);
        assert_eq!(&row[8..10], &["NA", "NA"]);
    }

    #[test]
    fn deletions_table() {
        let a = DelCounts::from_reader("sampleid\tcount\nG_1_R1_D7\t4\nG_1_R1_D7\t2.5\n".as_bytes(), "a").unwrap();
        let b = DelCounts::from_reader("start\tend\n3\t5\n".as_bytes(), "b.dels.tsv").unwrap();
        let mut v = Vec::new();
        write_deletions(&mut v, &[a, b]).unwrap();
        let s = String::from_utf8(v).unwrap();
        let lines: Vec<_> = s.lines().collect();
        assert_eq!(lines[1], "G_1_R1_D7\tG\t1\tR1\tD7\t2\t6.5");
        assert_eq!(lines[2], "b.dels.tsv\tNA\tNA\tNA\tNA\t1\t1");
    }

    #[test]
    fn inventory_table() {
        let dir = tempfile::tempdir().unwrap();
        for f in ["G_1_R1_D14.snvs.tsv", "G_1_NC_D7.snvs.tsv", "G_1_R1_D7.snvs.tsv"] {
            std::fs::write(dir.path().join(f), "").unwrap();
        }
        let files = find_sample_files(dir.path(), "G_1", crate::sample::SampleKind::Snvs, None).unwrap();
        let mut v = Vec::new();
        write_inventory(&mut v, &files).unwrap();
        let s = String::from_utf8(v).unwrap();
        let lines: Vec<_> = s.lines().skip(1).map(|l| l.split('\t').take(4).collect::<Vec<_>>().join(" ")).collect();
        assert_eq!(lines, vec!["snvs D7 NC true", "snvs D7 R1 false", "snvs D14 R1 false"]);
    }
}
