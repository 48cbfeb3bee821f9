use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
};

use crate::{
    counts::SampleCounts,
    error::SgeError,
    region::same_chrom,
    sample::SamplesByDay,
    target::Target,
};

/// Correlation between two samples over the informative positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairCorrelation {
    n_points: usize,
    r: Option<f64>,
}

impl PairCorrelation {
    pub fn n_points(&self) -> usize {
        self.n_points
    }

    /// Pearson r, None if fewer than 2 points or a column has no variance
    pub fn r(&self) -> Option<f64> {
        self.r
    }
}

/// Informative (position, allele) with the counts from both samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinedCount {
    pub pos: usize,
    pub allele: u8,
    pub count_a: f64,
    pub count_b: f64,
}

// (position, allele) -> count, rows on other chromosomes left out
fn index_counts(target: &Target, s: &SampleCounts) -> anyhow::Result<HashMap<(usize, u8), f64>> {
    let mut h = HashMap::with_capacity(s.rows().len());
    for row in s.rows() {
        if let Some(c) = row.chrom() {
            if !same_chrom(c, target.chrom()) {
                continue;
            }
        }
        if h.insert((row.pos(), row.allele()), row.count()).is_some() {
            return Err(SgeError::value(format!(
                "duplicate entry for position {} allele {} in sample {}",
                row.pos(),
                row.allele() as char,
                s.source()
            ))
            .into());
        }
    }
    Ok(h)
}

/// Join two samples on (position, allele) and keep the rows that carry
/// variant signal: inside the edit region, allele differs from the
/// reference, not a required edit, not a skip position.
///
/// Combinations present in only one sample are dropped. The result is
/// ordered by position then allele.
pub fn informative_counts(target: &Target, a: &SampleCounts, b: &SampleCounts) -> anyhow::Result<Vec<JoinedCount>> {
    let ha = index_counts(target, a)?;
    let hb = index_counts(target, b)?;
    let edit = target.edit_region();
    // Reference base at each position of the edit region
    let ref_bases: HashMap<usize, u8> = target.reference_bases().filter(|(p, _)| edit.contains(*p)).collect();

    let mut v: Vec<_> = ha
        .iter()
        .filter_map(|(&(pos, allele), &count_a)| {
            hb.get(&(pos, allele)).map(|&count_b| JoinedCount {
                pos,
                allele,
                count_a,
                count_b,
            })
        })
        .filter(|j| ref_bases.get(&j.pos).is_some_and(|&r| r != j.allele))
        .filter(|j| !target.is_required_edit(j.pos))
        .filter(|j| !target.is_skipped(j.pos))
        .collect();
    v.sort_unstable_by_key(|j| (j.pos, j.allele));
    trace!(
        "{} vs {}: {} joined rows, {} informative",
        a.source(),
        b.source(),
        ha.keys().filter(|k| hb.contains_key(k)).count(),
        v.len()
    );
    Ok(v)
}

/// Pearson correlation of the non-reference allele counts of two samples
pub fn pairwise_correlation(target: &Target, a: &SampleCounts, b: &SampleCounts) -> anyhow::Result<PairCorrelation> {
    let v = informative_counts(target, a, b)?;
    let r = pearson(v.iter().map(|j| (j.count_a, j.count_b)));
    Ok(PairCorrelation { n_points: v.len(), r })
}

/// Pearson r of the pairs from `it`. None if there are fewer than two pairs or
/// either coordinate has zero variance.
pub fn pearson<I: IntoIterator<Item = (f64, f64)>>(it: I) -> Option<f64> {
    let v: Vec<_> = it.into_iter().collect();
    if v.len() < 2 {
        return None;
    }
    let (x0, y0) = v[0];
    if v.iter().all(|(x, _)| *x == x0) || v.iter().all(|(_, y)| *y == y0) {
        return None;
    }
    let n = v.len() as f64;
    let mean = |f: fn(&(f64, f64)) -> f64| {
        let s: f64 = v.iter().map(f).sum();
        if s.is_finite() {
            s / n
        } else {
            v.iter().map(|p| f(p) / n).sum()
        }
    };
    let (mx, my) = (mean(|p| p.0), mean(|p| p.1));
    // Deviations are scaled to [-1, 1] so the sums of squares cannot overflow
    let (kx, ky) = v.iter().fold((0.0f64, 0.0f64), |(kx, ky), (x, y)| {
        (kx.max((x - mx).abs()), ky.max((y - my).abs()))
    });
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in v.iter() {
        let (dx, dy) = ((x - mx) / kx, (y - my) / ky);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if !(sxx > 0.0 && syy > 0.0) {
        return None;
    }
    let r = sxy / (sxx.sqrt() * syy.sqrt());
    if r.is_finite() {
        Some(r.clamp(-1.0, 1.0))
    } else {
        None
    }
}

/// Correlation of one pair of replicates within a day
#[derive(Debug, Clone)]
pub struct SamplePair {
    a: usize,
    b: usize,
    corr: PairCorrelation,
}

impl SamplePair {
    /// Indices of the two samples in [DayCorrelation::samples]
    pub fn samples(&self) -> (usize, usize) {
        (self.a, self.b)
    }

    pub fn corr(&self) -> &PairCorrelation {
        &self.corr
    }
}

/// All pairwise correlations between the replicates of one day
#[derive(Debug, Clone)]
pub struct DayCorrelation {
    samples: Vec<PathBuf>,
    pairs: Vec<SamplePair>,
    mean: Option<f64>,
}

impl DayCorrelation {
    pub fn samples(&self) -> &[PathBuf] {
        &self.samples
    }

    pub fn pairs(&self) -> &[SamplePair] {
        &self.pairs
    }

    pub fn n_defined(&self) -> usize {
        self.pairs.iter().filter(|p| p.corr.r.is_some()).count()
    }

    /// Mean of the defined pairwise correlations; None if no pair is defined
    pub fn mean(&self) -> Option<f64> {
        self.mean
    }
}

/// For each day with at least two replicates, correlate every unordered pair
/// of replicates and average the defined results. Days with a single
/// replicate are left out. Samples are loaded once each through `load`.
///
/// Sample lists are sorted before pairing, so the result does not depend on
/// the order in which files are listed.
pub fn mean_pairwise_correlation<F>(
    target: &Target,
    samples: &SamplesByDay,
    mut load: F,
) -> anyhow::Result<BTreeMap<String, DayCorrelation>>
where
    F: FnMut(&Path) -> anyhow::Result<SampleCounts>,
{
    let mut res = BTreeMap::new();
    for (day, paths) in samples.iter() {
        if paths.len() < 2 {
            debug!("{} {}: only {} replicate(s), skipping", target.name(), day, paths.len());
            continue;
        }
        let mut paths = paths.clone();
        paths.sort();
        paths.dedup();
        if paths.len() < 2 {
            continue;
        }
        let counts = paths.iter().map(|p| load(p)).collect::<anyhow::Result<Vec<_>>>()?;

        let mut pairs = Vec::with_capacity(counts.len() * (counts.len() - 1) / 2);
        for (a, ca) in counts.iter().enumerate() {
            for (b, cb) in counts.iter().enumerate().skip(a + 1) {
                let corr = pairwise_correlation(target, ca, cb)?;
                trace!(
                    "{} {} vs {}: n = {}, r = {:?}",
                    day,
                    paths[a].display(),
                    paths[b].display(),
                    corr.n_points,
                    corr.r
                );
                pairs.push(SamplePair { a, b, corr })
            }
        }
        let defined: Vec<f64> = pairs.iter().filter_map(|p| p.corr.r).collect();
        let mean = if defined.is_empty() {
            None
        } else {
            Some(defined.iter().sum::<f64>() / defined.len() as f64)
        };
        debug!(
            "{} {}: {} replicates, {} of {} pairs defined, mean r = {:?}",
            target.name(),
            day,
            paths.len(),
            defined.len(),
            pairs.len(),
            mean
        );
        res.insert(
            day.clone(),
            DayCorrelation {
                samples: paths,
                pairs,
                mean,
            },
        );
    }
    Ok(res)
}
