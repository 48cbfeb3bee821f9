use std::{
    collections::{HashMap, HashSet},
    io::BufRead,
    path::Path,
    rc::Rc,
};

use anyhow::Context;
use compress_io::compress::CompressIo;

use crate::{
    error::SgeError,
    reference::{homopolymer_offsets, ReferenceLookup},
    region::Region,
    sample::{find_sample_files, group_by_day, SampleKind, SamplesByDay},
};

/// Values treated as a missing entry in the target table
const MISSING: [&str; 9] = ["", "NA", "NaN", "nan", "N/A", "NULL", "null", "None", "."];

const REQUIRED_COLUMNS: [&str; 5] = ["chrom", "editstart", "editstop", "ampstart", "ampstop"];

/// Target definition table: one row of text fields per target name
pub struct TargetTable {
    columns: HashMap<Box<str>, usize>,
    rows: HashMap<Rc<str>, Vec<Box<str>>>,
    source: Box<str>,
}

impl TargetTable {
    pub fn from_path<P: AsRef<Path>>(file: P) -> anyhow::Result<Self> {
        let file = file.as_ref();
        let rdr = CompressIo::new()
            .path(file)
            .bufreader()
            .with_context(|| format!("Could not open target file {}", file.display()))?;
        debug!("Reading in target definitions from {}", file.display());
        Self::from_reader(rdr, &file.display().to_string())
    }

    pub fn from_reader<R: BufRead>(mut rdr: R, source: &str) -> anyhow::Result<Self> {
        let mut buf = String::new();
        if rdr.read_line(&mut buf).with_context(|| "Error reading from target file")? == 0 {
            return Err(SgeError::parse(source, "empty target file").into());
        }
        let columns: HashMap<Box<str>, usize> = split_line(&buf)
            .enumerate()
            .map(|(i, s)| (Box::from(s), i))
            .collect();
        let key_ix = ["target", "exonname"]
            .iter()
            .find_map(|c| columns.get(*c).copied())
            .ok_or_else(|| SgeError::parse(source, "no 'target' or 'exonname' column"))?;
        if let Some(c) = REQUIRED_COLUMNS.iter().find(|c| !columns.contains_key(**c)) {
            return Err(SgeError::parse(source, format!("missing column '{c}'")).into());
        }

        let mut rows = HashMap::new();
        loop {
            buf.clear();
            if rdr.read_line(&mut buf).with_context(|| "Error reading from target file")? == 0 {
                break;
            }
            let fields: Vec<Box<str>> = split_line(&buf).map(Box::from).collect();
            let name: Rc<str> = match fields.get(key_ix) {
                Some(s) if !s.is_empty() => Rc::from(&**s),
                _ => continue,
            };
            if rows.contains_key(&name) {
                warn!("Duplicate entry for target {name} in {source}; using first entry");
                continue;
            }
            rows.insert(name, fields);
        }
        debug!("{} target definitions read in", rows.len());
        Ok(Self {
            columns,
            rows,
            source: Box::from(source),
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    fn row<'a>(&'a self, target: &'a str) -> anyhow::Result<TargetRow<'a>> {
        self.rows
            .get(target)
            .map(|fields| TargetRow {
                table: self,
                target,
                fields: fields.as_slice(),
            })
            .ok_or_else(|| SgeError::lookup_in("target", target, &*self.source).into())
    }
}

struct TargetRow<'a> {
    table: &'a TargetTable,
    target: &'a str,
    fields: &'a [Box<str>],
}

impl<'a> TargetRow<'a> {
    /// Field text, None if the column is absent or the value is missing
    fn get(&self, col: &str) -> Option<&'a str> {
        self.table
            .columns
            .get(col)
            .and_then(|ix| self.fields.get(*ix))
            .map(|s| &**s)
            .filter(|s| !MISSING.contains(s))
    }

    fn coord(&self, col: &str) -> anyhow::Result<usize> {
        let s = self
            .get(col)
            .ok_or_else(|| SgeError::parse(format!("{} of {}", col, self.target), "missing value"))?;
        s.parse::<usize>()
            .map_err(|_| SgeError::parse(format!("{} of {}", col, self.target), format!("non-numeric coordinate '{s}'")).into())
    }
}

/// Parse `<pos><base>,<pos><base>,...` into position -> base
pub fn parse_required_edits(s: Option<&str>) -> anyhow::Result<HashMap<usize, u8>> {
    let mut edits = HashMap::new();
    for tok in tokens(s) {
        let err = || SgeError::parse("required_edits", format!("illegal token '{tok}' (expected <position><base>)"));
        let base = match tok.chars().last() {
            Some(c) if c.is_ascii_alphabetic() && tok.len() > 1 => c as u8,
            _ => return Err(err().into()),
        };
        let pos = tok[..tok.len() - 1].parse::<usize>().map_err(|_| err())?;
        edits.insert(pos, base.to_ascii_uppercase());
    }
    Ok(edits)
}

/// Parse a comma separated list of positions
pub fn parse_skip_pos(s: Option<&str>) -> anyhow::Result<HashSet<usize>> {
    tokens(s)
        .map(|tok| {
            tok.parse::<usize>()
                .map_err(|_| anyhow::Error::from(SgeError::parse("skip_pos", format!("illegal position '{tok}'"))))
        })
        .collect()
}

fn tokens(s: Option<&str>) -> impl Iterator<Item = &str> {
    s.map(|s| s.trim())
        .filter(|s| !MISSING.contains(s))
        .into_iter()
        .flat_map(|s| s.split(','))
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
}

fn split_line(s: &str) -> impl Iterator<Item = &str> {
    s.trim_end_matches(['\n', '\r']).split('\t').map(|f| f.trim())
}

/// One editing target with its reference sequence and position filters
#[derive(Debug)]
pub struct Target {
    name: Box<str>,
    gene: Box<str>,
    exon: Box<str>,
    edit_region: Region,
    amp_region: Region,
    required_edits: HashMap<usize, u8>,
    skip_pos: HashSet<usize>,
    cigar: Option<Box<str>>,
    ref_seq: Vec<u8>,
    homopolymer_pos: Vec<usize>,
}

impl Target {
    /// Build the definition of `name` from the target table, fetching the
    /// amplicon reference sequence through `reference`
    pub fn new(
        name: &str,
        table: &TargetTable,
        reference: &dyn ReferenceLookup,
        homopolymer_limit: usize,
    ) -> anyhow::Result<Self> {
        let row = table.row(name)?;
        let (gene, exon) = split_target_name(name)?;

        let chrom = row
            .get("chrom")
            .ok_or_else(|| SgeError::parse(format!("chrom of {name}"), "missing value"))?;
        let edit_region = Region::new(chrom, row.coord("editstart")?, row.coord("editstop")?)?;
        let amp_region = Region::new(chrom, row.coord("ampstart")?, row.coord("ampstop")?)?;
        if !amp_region.contains_region(&edit_region) {
            return Err(SgeError::parse(
                name,
                format!("edit region {edit_region} not within amplicon {amp_region}"),
            )
            .into());
        }

        let required_edits = parse_required_edits(row.get("required_edits"))
            .with_context(|| format!("Bad required edits for target {name}"))?;
        let skip_pos = parse_skip_pos(row.get("skip_pos")).with_context(|| format!("Bad skip positions for target {name}"))?;
        let cigar = row.get("cigar").map(Box::from);

        let ref_seq = reference.fetch(&amp_region)?;
        if ref_seq.len() != amp_region.len() {
            return Err(SgeError::lookup_in(
                "region",
                amp_region.to_string(),
                format!("reference (got {} bases, expected {})", ref_seq.len(), amp_region.len()),
            )
            .into());
        }
        let homopolymer_pos = homopolymer_offsets(&ref_seq, homopolymer_limit)
            .into_iter()
            .map(|i| i + amp_region.start())
            .collect::<Vec<_>>();

        debug!(
            "Target {}: edit region {}, amplicon {}, {} required edits, {} skip positions, {} homopolymer positions",
            name,
            edit_region,
            amp_region,
            required_edits.len(),
            skip_pos.len(),
            homopolymer_pos.len()
        );
        if let Some(c) = cigar.as_deref() {
            trace!("Target {} expected cigar {}", name, c);
        }

        Ok(Self {
            name: Box::from(name),
            gene: Box::from(gene),
            exon: Box::from(exon),
            edit_region,
            amp_region,
            required_edits,
            skip_pos,
            cigar,
            ref_seq,
            homopolymer_pos,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gene(&self) -> &str {
        &self.gene
    }

    pub fn exon(&self) -> &str {
        &self.exon
    }

    pub fn chrom(&self) -> &str {
        self.edit_region.chrom()
    }

    pub fn edit_region(&self) -> &Region {
        &self.edit_region
    }

    pub fn amp_region(&self) -> &Region {
        &self.amp_region
    }

    pub fn required_edits(&self) -> &HashMap<usize, u8> {
        &self.required_edits
    }

    pub fn is_required_edit(&self, pos: usize) -> bool {
        self.required_edits.contains_key(&pos)
    }

    pub fn skip_pos(&self) -> &HashSet<usize> {
        &self.skip_pos
    }

    pub fn is_skipped(&self, pos: usize) -> bool {
        self.skip_pos.contains(&pos)
    }

    pub fn cigar(&self) -> Option<&str> {
        self.cigar.as_deref()
    }

    /// (position, base) for every position of the amplicon
    pub fn reference_bases(&self) -> impl Iterator<Item = (usize, u8)> + '_ {
        self.amp_region.positions().zip(self.ref_seq.iter().copied())
    }

    pub fn homopolymer_pos(&self) -> &[usize] {
        &self.homopolymer_pos
    }

    /// Sample files of type `kind` for this target, grouped by day. Files
    /// with `exclude` anywhere in their name are left out.
    pub fn sample_files_for_timepoints<P: AsRef<Path>>(
        &self,
        counts_dir: P,
        kind: SampleKind,
        include_nc: bool,
        exclude: Option<&str>,
    ) -> anyhow::Result<SamplesByDay> {
        let files = find_sample_files(counts_dir, &self.name, kind, exclude)?;
        Ok(group_by_day(&files, include_nc))
    }
}

/// Split `<gene>_<exon>[letter]` into gene and exon; a trailing letter on
/// the exon part marks a sub-target and is not part of the exon identifier
fn split_target_name(name: &str) -> anyhow::Result<(&str, &str)> {
    let mut it = name.split('_');
    match (it.next(), it.next()) {
        (Some(g), Some(e)) if !g.is_empty() && !e.is_empty() => {
            let exon = match e.as_bytes()[e.len() - 1] {
                c if c.is_ascii_alphabetic() && e.len() > 1 => &e[..e.len() - 1],
                _ => e,
            };
            Ok((g, exon))
        }
        _ => Err(SgeError::parse("target name", format!("'{name}' is not of the form <gene>_<exon>")).into()),
    }
}
