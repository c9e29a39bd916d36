//! Command-line interface for the `forkledger` binary.

use clap::{Parser, Subcommand};
use forkledger::ForkPolicy;
use std::path::PathBuf;

/// Persistent, fork-aware block ledger.
#[derive(Parser, Debug)]
#[command(name = "forkledger", about = "Fork-aware block ledger", version, propagate_version = true)]
pub struct Cli {
    /// Database directory
    #[arg(long, short = 'd', global = true, env = "LEDGER_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// How blocks extending a non-tip are handled
    #[arg(long, global = true, env = "LEDGER_FORK_POLICY")]
    pub fork_policy: Option<ForkPolicy>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Append a block holding the given items
    Append(AppendArgs),
    /// Walk the chain backward to genesis
    Show(ShowArgs),
    /// List branch tips, marking the best one
    Tips,
    /// Print one block
    Get(GetArgs),
}

#[derive(Parser, Debug)]
pub struct AppendArgs {
    /// Hex-encoded extra bytes for the header
    #[arg(long)]
    pub extra: Option<String>,

    /// Parent block hash (defaults to the best tip)
    #[arg(long)]
    pub parent: Option<String>,

    /// Data items, stored as UTF-8 bytes
    pub items: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Start from this block instead of the best tip
    #[arg(long)]
    pub from: Option<String>,

    /// Print JSON lines instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct GetArgs {
    /// Block hash
    pub hash: String,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}
