//! Command-line arguments

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use lostik_protocol::TxPower;

#[derive(Debug, Parser)]
#[command(name = "lostik", version, about = "TDMA channel access for the Ronoth LoStik")]
pub struct Cli {
    /// Settings file (default: $XDG_CONFIG_HOME/lostik/settings.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Message database, overriding the settings file
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the channel access service until interrupted
    Run {
        /// Transmit power preset
        #[arg(short, long, visible_alias = "pwr", value_enum)]
        power: Option<PowerArg>,

        /// Claim the first window that carries a successful transmission
        #[arg(long)]
        self_learning: bool,

        /// Serial port to use instead of searching by USB ID
        #[arg(long)]
        port: Option<String>,
    },

    /// Queue a message for transmission
    Send {
        /// Message text; words are joined with single spaces
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Delete every outbound message
    Purge,

    /// Show queue and traffic totals
    Status,

    /// Manage the node directory
    Node {
        #[command(subcommand)]
        command: NodeCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum NodeCommand {
    /// Register a node or rename an existing one
    Add { node_id: u32, name: String },
    /// List registered nodes
    List,
    /// Mark a registered node as this station
    Local { node_id: u32 },
}

/// Transmit power on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PowerArg {
    Low,
    Medium,
    High,
}

impl From<PowerArg> for TxPower {
    fn from(arg: PowerArg) -> Self {
        match arg {
            PowerArg::Low => TxPower::Low,
            PowerArg::Medium => TxPower::Medium,
            PowerArg::High => TxPower::High,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_flags() {
        let cli =
            Cli::try_parse_from(["lostik", "run", "--pwr", "high", "--self-learning"]).unwrap();
        match cli.command {
            Command::Run {
                power,
                self_learning,
                port,
            } => {
                assert_eq!(power, Some(PowerArg::High));
                assert!(self_learning);
                assert_eq!(port, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_send_joins_words() {
        let cli = Cli::try_parse_from(["lostik", "send", "HELLO", "from", "K7CTC"]).unwrap();
        match cli.command {
            Command::Send { text } => assert_eq!(text.join(" "), "HELLO from K7CTC"),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_send_requires_text() {
        assert!(Cli::try_parse_from(["lostik", "send"]).is_err());
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from(["lostik", "status", "--database", "/tmp/chat.db"]).unwrap();
        assert_eq!(cli.database, Some(PathBuf::from("/tmp/chat.db")));
    }

    #[test]
    fn test_unknown_power_rejected() {
        assert!(Cli::try_parse_from(["lostik", "run", "-p", "max"]).is_err());
    }
}
