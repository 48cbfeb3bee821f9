use std::{io::Write, path::Path};

use anyhow::Context;

use crate::{
    cli::Config,
    correlation::mean_pairwise_correlation,
    counts::{DelCounts, ReadStats, SampleCounts},
    output::*,
    sample::{cmp_days, find_sample_files, SampleKind, SampleName},
};

// SNV counts for one replicate, checking the sample id in the file against the file name
fn load_snvs(p: &Path, pseudocount: f64) -> anyhow::Result<SampleCounts> {
    let counts = SampleCounts::read_snvs(p, pseudocount)?;
    if let (Some(id), Some(fname)) = (counts.name(), SampleName::from_path(p)) {
        if id.replicate() != fname.replicate() || id.day() != fname.day() {
            warn!("Sample id {} in {} does not match the file name", id, p.display())
        }
    }
    Ok(counts)
}

pub fn process_data(cfg: Config) -> anyhow::Result<()> {
    let target = cfg.target();
    let prefix = cfg.output_prefix();

    let exclude = cfg.exclude();
    let samples = target.sample_files_for_timepoints(cfg.counts_dir(), SampleKind::Snvs, cfg.include_nc(), exclude)?;
    if samples.is_empty() {
        warn!(
            "No SNV count files found for {} in {}",
            target.name(),
            cfg.counts_dir().display()
        );
    }
    let pseudocount = cfg.pseudocount();
    let res = mean_pairwise_correlation(target, &samples, |p| load_snvs(p, pseudocount))?;

    let mut days: Vec<_> = samples.iter().collect();
    days.sort_by(|a, b| cmp_days(a.0, b.0));
    for (day, paths) in days {
        match res.get(day) {
            Some(c) => match c.mean() {
                Some(r) => info!("{} {}: {} replicates, mean r = {:.4}", target.name(), day, paths.len(), r),
                None => warn!(
                    "{} {}: {} replicates, correlation undefined for all pairs",
                    target.name(),
                    day,
                    paths.len()
                ),
            },
            None => info!("{} {}: single replicate, no correlation", target.name(), day),
        }
    }

    let mut wrt = open_output(prefix, "correlation.txt").with_context(|| "Could not open correlation output")?;
    write_correlations(&mut wrt, target.name(), &res)?;
    wrt.flush()?;

    if cfg.pairwise() {
        let mut wrt = open_output(prefix, "pairwise.txt").with_context(|| "Could not open pairwise output")?;
        write_pairwise(&mut wrt, target.name(), &res)?;
        wrt.flush()?;
    }

    if cfg.readstats() {
        let files = find_sample_files(cfg.counts_dir(), target.name(), SampleKind::ReadStats, exclude)?;
        let mut stats = Vec::new();
        for f in files.iter() {
            stats.extend(ReadStats::read(f.path())?)
        }
        debug!("Read stats for {} samples", stats.len());
        let mut wrt = open_output(prefix, "readstats.txt").with_context(|| "Could not open read stats output")?;
        write_readstats(&mut wrt, &stats)?;
        wrt.flush()?;

        let dels = find_sample_files(cfg.counts_dir(), target.name(), SampleKind::Dels, exclude)?
            .iter()
            .map(|f| DelCounts::read_dels(f.path()))
            .collect::<anyhow::Result<Vec<_>>>()?;
        debug!("Read deletion counts for {} samples", dels.len());
        let mut wrt = open_output(prefix, "deletions.txt").with_context(|| "Could not open deletion summary output")?;
        write_deletions(&mut wrt, &dels)?;
        wrt.flush()?;
    }

    if cfg.inventory() {
        let mut files = Vec::new();
        for kind in SampleKind::all() {
            files.extend(find_sample_files(cfg.counts_dir(), target.name(), kind, exclude)?)
        }
        let mut wrt = open_output(prefix, "samples.txt").with_context(|| "Could not open sample list output")?;
        write_inventory(&mut wrt, &files)?;
        wrt.flush()?;
    }

    Ok(())
}
