use std::path::PathBuf;

use crate::target::Target;

mod getters;
mod mk_config;

pub struct Config {
    target: Target,
    counts_dir: PathBuf,
    exclude: Option<Box<str>>,
    output_prefix: Box<str>,
    pseudocount: f64,
    include_nc: bool,
    pairwise: bool,
    readstats: bool,
    inventory: bool,
}
