use crate::log_utils::{init_log, LogLevel};

mod cli_model;
mod config;

pub use config::Config;

pub fn handle_cli() -> anyhow::Result<Config> {
    let m = cli_model::cli_model().get_matches();

    let level = m
        .get_one::<LogLevel>("loglevel")
        .copied()
        .expect("Missing default log level");
    init_log(level, m.get_flag("timestamp"))?;

    Config::from_matches(&m)
}
