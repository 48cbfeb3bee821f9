use std::{
    cmp::Ordering,
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

use anyhow::Context;
use regex::Regex;
use walkdir::WalkDir;

/// Replicate identifier used for the negative control
pub const NEGATIVE_CONTROL: &str = "NC";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SampleKind {
    Snvs,
    Dels,
    ReadStats,
}

impl SampleKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Snvs => "snvs",
            Self::Dels => "dels",
            Self::ReadStats => "readstats",
        }
    }

    pub fn all() -> [Self; 3] {
        [Self::Snvs, Self::Dels, Self::ReadStats]
    }
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

/// Sample identity `<gene>_<exon>_<replicate>_<day>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleName {
    gene: Box<str>,
    exon: Box<str>,
    replicate: Box<str>,
    day: Box<str>,
}

impl SampleName {
    /// Parse from a sample id or a file stem. Anything after the fourth
    /// underscore separated field is ignored.
    pub fn from_str(s: &str) -> Option<Self> {
        let fd: Vec<_> = s.trim().split('_').collect();
        if fd.len() < 4 || fd[..4].iter().any(|x| x.is_empty()) {
            return None;
        }
        Some(Self {
            gene: Box::from(fd[0]),
            exon: Box::from(fd[1]),
            replicate: Box::from(fd[2]),
            day: Box::from(fd[3]),
        })
    }

    /// Parse from a count file name (`<gene>_<exon>_<replicate>_<day>.<kind>.tsv`)
    pub fn from_path(p: &Path) -> Option<Self> {
        p.file_name()
            .and_then(|s| s.to_str())
            .and_then(|s| s.split('.').next())
            .and_then(Self::from_str)
    }

    pub fn gene(&self) -> &str {
        &self.gene
    }

    pub fn exon(&self) -> &str {
        &self.exon
    }

    pub fn replicate(&self) -> &str {
        &self.replicate
    }

    pub fn day(&self) -> &str {
        &self.day
    }

    pub fn is_negative_control(&self) -> bool {
        &*self.replicate == NEGATIVE_CONTROL
    }
}

impl fmt::Display for SampleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}_{}", self.gene, self.exon, self.replicate, self.day)
    }
}

#[derive(Debug, Clone)]
pub struct SampleFile {
    path: PathBuf,
    name: SampleName,
    kind: SampleKind,
}

impl SampleFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &SampleName {
        &self.name
    }

    pub fn kind(&self) -> SampleKind {
        self.kind
    }
}

/// Day -> sample files, lists sorted by path
pub type SamplesByDay = BTreeMap<String, Vec<PathBuf>>;

/// List the files of type `kind` for `target` in `dir` (not recursive).
///
/// Matches `<target>_*.<kind>.tsv`; matching files whose names do not
/// follow the sample naming convention are skipped, as are files with
/// `exclude` anywhere in their name.
pub fn find_sample_files<P: AsRef<Path>>(
    dir: P,
    target: &str,
    kind: SampleKind,
    exclude: Option<&str>,
) -> anyhow::Result<Vec<SampleFile>> {
    let dir = dir.as_ref();
    let re = Regex::new(&format!(r"^({}_[^.]+)\.{}\.tsv$", regex::escape(target), kind.suffix()))?;
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Error reading counts directory {}", dir.display()))?;
        if entry.file_type().is_dir() {
            continue;
        }
        let stem = match entry.file_name().to_str().and_then(|s| re.captures(s)) {
            Some(cap) => cap.get(1).map(|m| m.as_str()).unwrap_or_default(),
            None => continue,
        };
        if let Some(x) = exclude.filter(|x| !x.is_empty()) {
            if entry.file_name().to_string_lossy().contains(x) {
                debug!("Excluding {}", entry.path().display());
                continue;
            }
        }
        match SampleName::from_str(stem) {
            Some(name) => files.push(SampleFile {
                path: entry.path().to_path_buf(),
                name,
                kind,
            }),
            None => debug!("Skipping {}: name does not follow sample convention", stem),
        }
    }
    debug!("Found {} {} files for {} in {}", files.len(), kind, target, dir.display());
    Ok(files)
}

/// Group sample files by day, leaving out negative controls unless `include_nc` is set
pub fn group_by_day(files: &[SampleFile], include_nc: bool) -> SamplesByDay {
    let mut samples = SamplesByDay::new();
    for f in files {
        if f.name.is_negative_control() && !include_nc {
            trace!("Leaving out negative control {}", f.path.display());
            continue;
        }
        samples.entry(f.name.day().to_owned()).or_default().push(f.path.clone())
    }
    for v in samples.values_mut() {
        v.sort()
    }
    samples
}

/// Ordering for day labels: by alphabetic prefix, then by numeric value of
/// the digits that follow (so `D7` < `D14`), then by the full label.
pub fn cmp_days(a: &str, b: &str) -> Ordering {
    fn split(s: &str) -> (&str, Option<u64>) {
        let i = s.find(|c: char| c.is_ascii_digit()).unwrap_or(s.len());
        let digits: String = s[i..].chars().take_while(|c| c.is_ascii_digit()).collect();
        (&s[..i], digits.parse().ok())
    }
    let (pa, na) = split(a);
    let (pb, nb) = split(b);
    pa.cmp(pb).then(na.cmp(&nb)).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn sample_names() {
        let s = SampleName::from_str("BRCA1_3_R1_D7").unwrap();
        assert_eq!((s.gene(), s.exon(), s.replicate(), s.day()), ("BRCA1", "3", "R1", "D7"));
        assert!(!s.is_negative_control());
        assert!(SampleName::from_str("BRCA1_3_NC_D0").unwrap().is_negative_control());
        assert!(SampleName::from_str("BRCA1_3_R1").is_none());
        assert!(SampleName::from_str("BRCA1__R1_D7").is_none());

        let s = SampleName::from_path(Path::new("/x/y/RAD51C_2a_R2_D14.snvs.tsv")).unwrap();
        assert_eq!(s.to_string(), "RAD51C_2a_R2_D14");
    }

    #[test]
    fn day_order() {
        let mut days = vec!["D14", "D7", "D0", "D21", "lib"];
        days.sort_by(|a, b| cmp_days(a, b));
        assert_eq!(days, vec!["D0", "D7", "D14", "D21", "lib"]);
    }

    #[test]
    fn discover_and_group() {
        let dir = tempfile::tempdir().unwrap();
        for f in [
            "BRCA1_3_R2_D7.snvs.tsv",
            "BRCA1_3_R1_D7.snvs.tsv",
            "BRCA1_3_R1_D14.snvs.tsv",
            "BRCA1_3_NC_D7.snvs.tsv",
            "BRCA1_3_R1_D7.dels.tsv",
            "BRCA1_3_R1_D7.readstats.tsv",
            "BRCA1_3a_R1_D7.snvs.tsv",
            "BRCA1_3_bad.snvs.tsv",
            "notes.txt",
        ] {
            fs::write(dir.path().join(f), "").unwrap();
        }

        let files = find_sample_files(dir.path(), "BRCA1_3", SampleKind::Snvs, None).unwrap();
        assert_eq!(files.len(), 4);
        assert!(files.iter().all(|f| f.kind() == SampleKind::Snvs));

        let by_day = group_by_day(&files, false);
        assert_eq!(by_day.len(), 2);
        let d7: Vec<_> = by_day["D7"].iter().map(|p| p.file_name().unwrap().to_str().unwrap()).collect();
        assert_eq!(d7, vec!["BRCA1_3_R1_D7.snvs.tsv", "BRCA1_3_R2_D7.snvs.tsv"]);
        assert_eq!(by_day["D14"].len(), 1);

        let with_nc = group_by_day(&files, true);
        assert_eq!(with_nc["D7"].len(), 3);

        let dels = find_sample_files(dir.path(), "BRCA1_3", SampleKind::Dels, None).unwrap();
        assert_eq!(dels.len(), 1);
    }

    #[test]
    fn exclude_filter() {
        let dir = tempfile::tempdir().unwrap();
        for f in ["G.1_2_R1_D7.snvs.tsv", "G.1_2_R2_D7.snvs.tsv", "Gx1_2_R3_D7.snvs.tsv", "G.1_2_R1_D7.snvs.tsv.gz"] {
            fs::write(dir.path().join(f), "").unwrap();
        }
        // Target names are matched literally
        let files = find_sample_files(dir.path(), "G.1_2", SampleKind::Snvs, None).unwrap();
        assert_eq!(files.len(), 2);

        let files = find_sample_files(dir.path(), "G.1_2", SampleKind::Snvs, Some("R2")).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name().replicate(), "R1");
        assert_eq!(files[0].name().exon(), "2");

        let files = find_sample_files(dir.path(), "G.1_2", SampleKind::Snvs, Some("")).unwrap();
        assert_eq!(files.len(), 2);
    }
}
