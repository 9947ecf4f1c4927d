//! iris CLI tool

#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use iris_cli_lib::{InitCommand, SendCommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "iris")]
#[command(version)]
#[command(about = "CLI tool for sending templated bulk emails", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send emails using the working files in a directory
    Send {
        /// Working directory
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Print rendered emails without sending them
        #[arg(short, long)]
        dry_run: bool,
        /// Send without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Create working files in a directory
    Init {
        /// Working directory
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    iris::observability::init()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Send { dir, dry_run, yes } => {
            SendCommand::new(dir, dry_run, yes).execute().await?;
        }
        Commands::Init { dir } => {
            InitCommand::new(dir).execute()?;
        }
    }

    Ok(())
}
