//! Clap derive structures for the `jablonet` binary.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// jablonet -- mirror a Jablonet cloud account as a stream of JSON lines
#[derive(Debug, Parser)]
#[command(
    name = "jablonet",
    version,
    about = "Poll the Jablonet cloud and mirror it as JSON lines on stdout",
    long_about = "Logs in to the Jablotron Jablonet cloud, polls services, alarm sections,\n\
        programmable gates and thermo devices, and writes every declaration and\n\
        value update as one JSON object per line."
)]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, short = 'c', env = "JABLONET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log line format on stderr
    #[arg(long, default_value = "text")]
    pub log_format: LogFormat,

    /// Run a single cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Print the effective configuration and exit
    #[arg(long, conflicts_with = "once")]
    pub print_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn verbosity_is_counted() {
        let cli = Cli::try_parse_from(["jablonet", "-vv", "--once"]).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(cli.verbose, 2);
        assert!(cli.once);
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn print_config_conflicts_with_once() {
        assert!(Cli::try_parse_from(["jablonet", "--once", "--print-config"]).is_err());
    }
}
