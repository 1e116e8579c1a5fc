// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! skylark - Markdown agent runtime

mod commands;
mod logging;
mod stack;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{init, run, watch};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "skylark",
    version,
    disable_version_flag = true,
    about = "Skylark - assistants that live in your Markdown files"
)]
struct Cli {
    /// Change to <dir> before doing anything
    #[arg(short = 'C', global = true, value_name = "DIR")]
    directory: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold a .skai project directory
    Init(init::InitArgs),
    /// Watch the project and answer commands as files change
    Watch(watch::WatchArgs),
    /// Process every watched file once and exit
    Run(run::RunArgs),
    /// Print the version
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Some(dir) = &cli.directory {
        std::env::set_current_dir(dir)
            .map_err(|e| anyhow::anyhow!("cannot change to {}: {}", dir.display(), e))?;
    }

    match cli.command {
        Commands::Init(args) => init::execute(args),
        Commands::Watch(args) => watch::execute(args).await,
        Commands::Run(args) => run::execute(args).await,
        Commands::Version => {
            println!("skylark {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
