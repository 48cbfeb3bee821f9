use std::fmt;

use clap::{builder::PossibleValue, ValueEnum};

/// LogLevel
///
/// Minimum level of messages that will be logged; `None` switches logging off
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
    None,
}

const LEVEL_STR: [&str; 6] = ["error", "warn", "info", "debug", "trace", "none"];

impl LogLevel {
    fn idx(&self) -> usize {
        *self as usize
    }

    /// stderrlog verbosity (0 = errors only)
    pub fn verbosity(&self) -> usize {
        self.idx().min(4)
    }
}

impl ValueEnum for LogLevel {
    fn value_variants<'a>() -> &'a [Self] {
        &[
            Self::Error,
            Self::Warn,
            Self::Info,
            Self::Debug,
            Self::Trace,
            Self::None,
        ]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(PossibleValue::new(LEVEL_STR[self.idx()]))
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", LEVEL_STR[self.idx()])
    }
}

/// Initialize logging to stderr
pub fn init_log(level: LogLevel, timestamp: bool) -> anyhow::Result<()> {
    let ts = if timestamp {
        stderrlog::Timestamp::Second
    } else {
        stderrlog::Timestamp::Off
    };

    stderrlog::new()
        .quiet(level == LogLevel::None)
        .verbosity(level.verbosity())
        .timestamp(ts)
        .init()
        .map_err(|e| anyhow!("Could not initialize logging: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_levels() {
        assert_eq!(LogLevel::from_str("DEBUG", true).unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::Trace.verbosity(), 4);
        assert_eq!(LogLevel::Error.verbosity(), 0);
        assert_eq!(LogLevel::Warn.to_string(), "warn");
        assert!(LogLevel::from_str("loud", true).is_err());
    }
}
