use clap::Parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Operational flags only; all configuration lives in `GPSC_*` environment
/// variables (see the `config` module).
#[derive(Parser, Debug)]
#[command(
    name = "photocardd",
    about = "Sync Google Photos albums into a spool and drain it through the postcards tool"
)]
pub struct Cli {
    /// Log level when RUST_LOG is unset
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Refresh the access token and exit
    #[arg(long)]
    pub auth_only: bool,

    /// List remote album titles and exit
    #[arg(long)]
    pub list_albums: bool,

    /// Run a single sync pass (no dispatch loop) and exit
    #[arg(long)]
    pub once: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["photocardd"]).unwrap();
        assert_eq!(cli.log_level, LogLevel::Info);
        assert!(!cli.auth_only);
        assert!(!cli.once);
    }

    #[test]
    fn flags_parse() {
        let cli = Cli::try_parse_from(["photocardd", "--log-level", "debug", "--once"]).unwrap();
        assert_eq!(cli.log_level, LogLevel::Debug);
        assert!(cli.once);
    }
}
