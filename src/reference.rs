use std::{
    collections::HashMap,
    io::BufRead,
    path::{Path, PathBuf},
    rc::Rc,
};

use anyhow::Context;
use bio::io::fasta::IndexedReader;
use compress_io::compress::CompressIo;

use crate::{error::SgeError, region::Region};

/// Source of reference bases for a genomic interval.
///
/// Implementations return exactly one upper-case base per position of the
/// region, or fail with a lookup error if the contig or interval is unknown.
pub trait ReferenceLookup {
    fn fetch(&self, region: &Region) -> anyhow::Result<Vec<u8>>;
}

/// Indexed FASTA file (requires a `.fai` index alongside).
///
/// The file is opened for each lookup and closed when the lookup returns.
pub struct IndexedFasta {
    path: PathBuf,
}

impl IndexedFasta {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ReferenceLookup for IndexedFasta {
    fn fetch(&self, region: &Region) -> anyhow::Result<Vec<u8>> {
        let mut rdr = IndexedReader::from_file(&self.path)
            .map_err(|e| anyhow!("Could not open indexed reference {}: {}", self.path.display(), e))?;
        debug!("Opened indexed reference {}", self.path.display());

        let seqs = rdr.index.sequences();
        let ctg = [region.query_name(), region.chrom()]
            .into_iter()
            .find_map(|name| seqs.iter().find(|s| s.name == name))
            .ok_or_else(|| SgeError::lookup_in("contig", region.chrom(), self.path.display().to_string()))?;

        if region.stop() as u64 > ctg.len {
            return Err(SgeError::lookup_in(
                "region",
                region.to_string(),
                format!("{} (contig length {})", self.path.display(), ctg.len),
            )
            .into());
        }
        let name = ctg.name.clone();
        rdr.fetch(&name, (region.start() - 1) as u64, region.stop() as u64)
            .with_context(|| format!("Error fetching {} from {}", region, self.path.display()))?;
        let mut seq = Vec::with_capacity(region.len());
        rdr.read(&mut seq)
            .with_context(|| format!("Error reading {} from {}", region, self.path.display()))?;
        trace!("Fetched {} bases for {}", seq.len(), region);
        normalize_bases(&mut seq, region)?;
        Ok(seq)
    }
}

/// Reference held in memory, read in full from a (possibly compressed) FASTA file
#[derive(Default)]
pub struct FastaReference {
    contigs: HashMap<Rc<str>, Vec<u8>>,
}

impl FastaReference {
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let rdr = CompressIo::new()
            .path(path)
            .bufreader()
            .with_context(|| format!("Could not open reference file {}", path.display()))?;
        debug!("Opened {} for input", path.display());
        let reference = Self::from_reader(rdr)?;
        if reference.n_contigs() == 0 {
            return Err(anyhow!("No contigs read in from reference file {}", path.display()));
        }
        debug!("Reference read in successfully with {} contigs", reference.n_contigs());
        Ok(reference)
    }

    pub fn from_reader<R: BufRead>(rdr: R) -> anyhow::Result<Self> {
        let mut contigs = HashMap::new();
        let mut fasta_rdr = FastaReader::new(rdr);
        while let Some((name, seq)) = fasta_rdr.next_record()? {
            debug!("Read in contig {} ({} bases)", name, seq.len());
            if contigs.insert(name.clone(), seq).is_some() {
                warn!("Duplicate contig {} in reference; keeping last entry", name)
            }
        }
        Ok(Self { contigs })
    }

    pub fn n_contigs(&self) -> usize {
        self.contigs.len()
    }

    fn contig(&self, region: &Region) -> Option<&[u8]> {
        self.contigs
            .get(region.query_name())
            .or_else(|| self.contigs.get(region.chrom()))
            .map(|v| v.as_slice())
    }
}

impl ReferenceLookup for FastaReference {
    fn fetch(&self, region: &Region) -> anyhow::Result<Vec<u8>> {
        let seq = self
            .contig(region)
            .ok_or_else(|| SgeError::lookup("contig", region.chrom()))?;
        if region.stop() > seq.len() {
            return Err(SgeError::lookup_in(
                "region",
                region.to_string(),
                format!("reference (contig length {})", seq.len()),
            )
            .into());
        }
        Ok(seq[region.start() - 1..region.stop()].to_vec())
    }
}

/// Open a reference: indexed access if a `.fai` index exists, otherwise read in full
pub fn open_reference<P: AsRef<Path>>(path: P) -> anyhow::Result<Box<dyn ReferenceLookup>> {
    let path = path.as_ref();
    let fai = PathBuf::from(format!("{}.fai", path.display()));
    if fai.exists() {
        debug!("Using FASTA index {}", fai.display());
        Ok(Box::new(IndexedFasta::new(path)))
    } else {
        Ok(Box::new(FastaReference::from_path(path)?))
    }
}

struct FastaReader<R: BufRead> {
    rdr: R,
    buffer: String,
    line: usize,
}

impl<R: BufRead> FastaReader<R> {
    fn new(rdr: R) -> FastaReader<R> {
        Self {
            rdr,
            buffer: String::new(),
            line: 0,
        }
    }

    fn next_record(&mut self) -> anyhow::Result<Option<(Rc<str>, Vec<u8>)>> {
        if self.buffer.is_empty() {
            if self.rdr.read_line(&mut self.buffer)? == 0 {
                return Ok(None);
            }
            self.line += 1;
        }
        // Contig name is the first word of the header line
        let name: Rc<str> = self
            .buffer
            .strip_prefix('>')
            .and_then(|s| s.split_whitespace().next())
            .map(Rc::from)
            .ok_or_else(|| anyhow!("Expected '>' followed by a name at start of line {}", self.line))?;
        trace!("Found contig {}", name);
        let mut seq = Vec::new();
        loop {
            self.buffer.clear();
            if self.rdr.read_line(&mut self.buffer)? == 0 {
                break;
            }
            self.line += 1;
            if self.buffer.starts_with('>') {
                break;
            }
            for c in self.buffer.trim_end().bytes() {
                if c.is_ascii_alphabetic() {
                    seq.push(c.to_ascii_uppercase())
                } else {
                    return Err(anyhow!("Illegal base at line {}", self.line));
                }
            }
        }
        Ok(Some((name, seq)))
    }
}

fn normalize_bases(seq: &mut [u8], region: &Region) -> anyhow::Result<()> {
    for c in seq.iter_mut() {
        if !c.is_ascii_alphabetic() {
            return Err(anyhow!("Illegal base in reference sequence for {}", region));
        }
        c.make_ascii_uppercase();
    }
    Ok(())
}

/// Offsets into `seq` of bases that lie in runs of a single base (A, C, G or T)
/// at least `min_len` long. Offsets are returned in increasing order.
pub fn homopolymer_offsets(seq: &[u8], min_len: usize) -> Vec<usize> {
    struct State {
        cbase: u8,
        start: usize,
    }
    let min_len = min_len.max(1);
    let mut offsets = Vec::new();
    let mut state: Option<State> = None;

    let close = |s: &State, end: usize, offsets: &mut Vec<usize>| {
        if end - s.start >= min_len && matches!(s.cbase, b'A' | b'C' | b'G' | b'T') {
            offsets.extend(s.start..end)
        }
    };

    for (i, &c) in seq.iter().enumerate() {
        state = match state {
            Some(s) if s.cbase == c => Some(s),
            Some(s) => {
                close(&s, i, &mut offsets);
                Some(State { cbase: c, start: i })
            }
            None => Some(State { cbase: c, start: i }),
        }
    }
    if let Some(s) = state {
        close(&s, seq.len(), &mut offsets)
    }
    offsets
}
