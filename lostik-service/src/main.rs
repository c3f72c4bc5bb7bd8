//! LoStik TDMA service
//!
//! Command-line front end: runs the channel access service against an
//! attached LoStik and manages the message queue and node directory it
//! shares with other tools.

mod cli;
mod commands;
mod error;
mod settings;

use std::process::ExitCode;

use clap::Parser;
use lostik_store::MessageStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Command, NodeCommand};
use error::CliError;
use settings::{Overrides, ServiceSettings};

fn main() -> ExitCode {
    // Logs go to stderr so event lines on stdout stay clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "lostik=info,lostik_tdma=info,lostik_store=info,lostik_detect=info,lostik_protocol=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            if let Some(help) = e.remedy() {
                eprintln!("HELP: {}", help);
            }
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli) -> Result<(), CliError> {
    let mut settings = ServiceSettings::load(cli.config.as_deref())?;
    settings.apply(Overrides {
        database: cli.database,
        ..Overrides::default()
    });

    let mut out = std::io::stdout().lock();
    match cli.command {
        Command::Run {
            power,
            self_learning,
            port,
        } => {
            settings.apply(Overrides {
                port,
                power: power.map(Into::into),
                self_learning,
                ..Overrides::default()
            });
            drop(out);
            tracing::info!("Starting LoStik TDMA service");
            commands::run(&settings)
        }
        Command::Send { text } => commands::send(&open_store(&settings)?, &text, &mut out),
        Command::Purge => commands::purge(&open_store(&settings)?, &mut out),
        Command::Status => commands::status(&open_store(&settings)?, &mut out),
        Command::Node { command } => {
            let store = open_store(&settings)?;
            match command {
                NodeCommand::Add { node_id, name } => {
                    commands::node_add(&store, node_id, &name, &mut out)
                }
                NodeCommand::List => commands::node_list(&store, &mut out),
                NodeCommand::Local { node_id } => commands::node_local(&store, node_id, &mut out),
            }
        }
    }
}

fn open_store(settings: &ServiceSettings) -> Result<MessageStore, CliError> {
    Ok(MessageStore::open(&settings.database)?)
}
