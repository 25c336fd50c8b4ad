//! Command-line interface for binlog-cdc
//!
//! # Usage Examples
//!
//! ```bash
//! # Follow two tables from the current position
//! binlog-cdc tail --config cdc.toml --table orders --table customers
//!
//! # Resume from a known position on MariaDB
//! binlog-cdc tail --config cdc.toml --flavor mariadb \
//!   --start-position mysql-bin.000003:1234
//!
//! # Print the current position
//! binlog-cdc position --host db.internal --user repl
//! ```

use std::io;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use binlog_cdc::{tail, CdcConfig, SourceArgs};
use clap::{Parser, Subcommand};
use mysql_binlog_source::{Cdc, MySqlBinlogClient, ReplicationClient};
use tracing::info;

#[derive(Parser)]
#[command(name = "binlog-cdc")]
#[command(about = "Stream MySQL/MariaDB row changes from the binary log")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print each row change of the tracked tables as a JSON line
    Tail {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print the source's current binlog position (file:pos)
    Position {
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Tail { source } => {
            let config = CdcConfig::resolve(source.config.as_deref(), &source)?;
            info!(tables = ?config.tables, "Starting tail");

            let options = tail::options(config, Arc::new(Mutex::new(io::stdout())));
            let mut cdc = Cdc::start(options)
                .await
                .context("Failed to start binlog listener")?;
            let stopped = cdc.listen().await;
            Err(anyhow::Error::new(stopped).context("Binlog listener stopped"))
        }
        Commands::Position { source } => {
            let config = CdcConfig::resolve(source.config.as_deref(), &source)?;
            let source = config.source.normalize();
            let mut client = MySqlBinlogClient::connect(&source, &[])
                .await
                .context("Failed to connect to source")?;
            let position = client
                .current_position()
                .await
                .context("Failed to read binlog position")?;
            println!("{position}");
            Ok(())
        }
    }
}
