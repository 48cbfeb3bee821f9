use std::path::PathBuf;

use clap::{Arg, ArgAction, Command, command, value_parser};

use crate::log_utils::LogLevel;

pub(super) fn cli_model() -> Command {
    command!()
    .arg(
        Arg::new("include_nc")
            .long("include-nc")
            .action(ArgAction::SetTrue)
            .help("Include negative control replicates"),
    )
    .arg(
        Arg::new("pseudocount")
            .long("pseudocount")
            .default_value("0")
            .value_parser(value_parser!(f64))
            .value_name("X")
            .help("Replace zero counts by X (no replacement if X is 0)"),
    )
    .arg(
        Arg::new("homopolymer_limit")
            .short('P')
            .long("homopolymer-limit")
            .default_value("4")
            .value_parser(value_parser!(u8).range(1..))
            .value_name("INT")
            .help("Minimum size of homopolymer runs flagged in the amplicon"),
    )
    .next_help_heading("Target")
    .arg(
        Arg::new("target")
            .short('n')
            .long("target")
            .value_parser(value_parser!(String))
            .required(true)
            .value_name("NAME")
            .help("Target name (<gene>_<exon>)"),
    )
    .arg(
        Arg::new("targets")
            .short('t')
            .long("targets")
            .value_parser(value_parser!(PathBuf))
            .required(true)
            .value_name("Target File")
            .help("Target definition file"),
    )
    .next_help_heading("Input/Output")
    .arg(
        Arg::new("reference")
            .short('T')
            .long("reference")
            .value_parser(value_parser!(PathBuf))
            .required(true)
            .value_name("FASTA File")
            .help("Reference FASTA file (indexed access if a .fai index is present)"),
    )
    .arg(
        Arg::new("counts_dir")
            .short('c')
            .long("counts-dir")
            .value_parser(value_parser!(PathBuf))
            .required(true)
            .value_name("DIR")
            .help("Directory with sample count files"),
    )
    .arg(
        Arg::new("exclude")
            .short('x')
            .long("exclude")
            .value_parser(value_parser!(String))
            .value_name("STRING")
            .help("Ignore sample files with STRING in their name"),
    )
    .arg(
        Arg::new("output_prefix")
            .short('o')
            .long("output-prefix")
            .default_value("sgeqc")
            .value_parser(value_parser!(String))
            .value_name("PREFIX")
            .help("Output prefix"),
    )
    .arg(
        Arg::new("pairwise")
            .long("pairwise")
            .action(ArgAction::SetTrue)
            .help("Output correlations for each replicate pair"),
    )
    .arg(
        Arg::new("readstats")
            .long("readstats")
            .action(ArgAction::SetTrue)
            .help("Output read statistics and deletion count summaries"),
    )
    .arg(
        Arg::new("inventory")
            .long("inventory")
            .action(ArgAction::SetTrue)
            .help("Output list of sample files found"),
    )
    .arg(
        Arg::new("loglevel")
            .short('l')
            .long("loglevel")
            .value_name("LOGLEVEL")
            .value_parser(value_parser!(LogLevel))
            .ignore_case(true)
            .default_value("info")
            .help("Set log level"),
    )
    .arg(
        Arg::new("timestamp")
            .long("timestamp")
            .action(ArgAction::SetTrue)
            .help("Prepend timestamp to log messages"),
    )
}
