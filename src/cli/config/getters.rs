use std::path::Path;

use crate::target::Target;

use super::Config;

impl Config {
    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn counts_dir(&self) -> &Path {
        &self.counts_dir
    }

    pub fn exclude(&self) -> Option<&str> {
        self.exclude.as_deref()
    }

    pub fn output_prefix(&self) -> &str {
        &self.output_prefix
    }

    pub fn pseudocount(&self) -> f64 {
        self.pseudocount
    }

    pub fn include_nc(&self) -> bool {
        self.include_nc
    }

    pub fn pairwise(&self) -> bool {
        self.pairwise
    }

    pub fn readstats(&self) -> bool {
        self.readstats
    }

    pub fn inventory(&self) -> bool {
        self.inventory
    }
}
