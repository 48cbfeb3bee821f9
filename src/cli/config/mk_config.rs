use std::path::PathBuf;

use clap::ArgMatches;

use crate::{
    reference::open_reference,
    target::{Target, TargetTable},
};

use super::Config;

impl Config {
    pub fn from_matches(m: &ArgMatches) -> anyhow::Result<Self> {
        let pseudocount = *m.try_get_one::<f64>("pseudocount")?.unwrap();
        if !(pseudocount.is_finite() && pseudocount >= 0.0) {
            return Err(anyhow!("Pseudocount must be a non-negative number"));
        }
        let homopolymer_limit = *m.try_get_one::<u8>("homopolymer_limit")?.unwrap();
        let include_nc = m.get_flag("include_nc");
        let pairwise = m.get_flag("pairwise");
        let readstats = m.get_flag("readstats");
        let inventory = m.get_flag("inventory");

        let exclude = m
            .get_one::<String>("exclude")
            .filter(|s| !s.is_empty())
            .map(|s| Box::from(s.as_str()));

        let output_prefix = m
            .get_one::<String>("output_prefix")
            .map(|s| Box::from(s.as_str()))
            .unwrap();

        let counts_dir = m
            .get_one::<PathBuf>("counts_dir")
            .expect("Missing counts directory") // Should be enforced by clap
            .clone();
        if !counts_dir.is_dir() {
            return Err(anyhow!("Counts directory {} not found", counts_dir.display()));
        }

        let target_file = m
            .get_one::<PathBuf>("targets")
            .expect("Missing target file"); // Should be enforced by clap
        let table = TargetTable::from_path(target_file)?;
        if table.len() == 0 {
            return Err(anyhow!("No targets read in from target file {}", target_file.display()));
        }

        let ref_file = m
            .get_one::<PathBuf>("reference")
            .expect("Missing reference"); // Should be enforced by clap

        let name = m.get_one::<String>("target").expect("Missing target");

        // Reference is only needed while the target is set up
        let target = {
            let reference = open_reference(ref_file)?;
            Target::new(name, &table, &*reference, homopolymer_limit as usize)?
        };
        info!(
            "Target {} (gene {}, exon {}): edit region {}, {} required edits, {} skip positions",
            target.name(),
            target.gene(),
            target.exon(),
            target.edit_region(),
            target.required_edits().len(),
            target.skip_pos().len()
        );
        debug!(
            "Amplicon {} ({} homopolymer positions), expected cigar {}",
            target.amp_region(),
            target.homopolymer_pos().len(),
            target.cigar().unwrap_or("NA")
        );

        Ok(Config {
            target,
            counts_dir,
            exclude,
            output_prefix,
            pseudocount,
            include_nc,
            pairwise,
            readstats,
            inventory,
        })
    }
}
