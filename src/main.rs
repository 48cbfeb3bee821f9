#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;

mod cli;
mod correlation;
mod counts;
mod error;
mod log_utils;
mod output;
mod process;
mod reference;
mod region;
mod sample;
mod target;

fn main() -> anyhow::Result<()> {
    let cfg = cli::handle_cli()?;
    process::process_data(cfg)
}
