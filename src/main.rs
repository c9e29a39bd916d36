//! forkledger - command-line host for the block ledger.
//!
//! Opens the ledger described by the `LEDGER_*` environment (overridable by
//! flags), runs one subcommand and exits.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{AppendArgs, Cli, Commands, GetArgs, ShowArgs};
use forkledger::utils::{format_hash_short, format_item, format_timestamp, init_logging, parse_hex};
use forkledger::{Block, Config, Hash256, Ledger};
use serde::Serialize;

/// JSON view of a block, with hashes and bytes hex-encoded
#[derive(Serialize)]
struct BlockView {
    hash: String,
    index: u64,
    time: i64,
    prev_hash: String,
    merkle_root: String,
    extra: String,
    data: Vec<String>,
}

impl From<&Block> for BlockView {
    fn from(block: &Block) -> Self {
        Self {
            hash: block.hash().to_hex(),
            index: block.header.index,
            time: block.header.time,
            prev_hash: block.header.prev_hash.to_hex(),
            merkle_root: block.header.merkle_root.to_hex(),
            extra: hex::encode(&block.header.extra),
            data: block.data.iter().map(hex::encode).collect(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env().context("invalid configuration")?;
    if let Some(db_path) = cli.db_path {
        config.storage.db_path = db_path;
    }
    if let Some(fork_policy) = cli.fork_policy {
        config.ledger.fork_policy = fork_policy;
    }
    init_logging(&config.logging);

    let ledger = Ledger::open(&config).with_context(|| {
        format!("failed to open ledger at {}", config.storage.db_path.display())
    })?;

    let result = match cli.command {
        Commands::Append(args) => append(&ledger, args),
        Commands::Show(args) => show(&ledger, args),
        Commands::Tips => tips(&ledger),
        Commands::Get(args) => get(&ledger, args),
    };

    ledger.flush().context("failed to flush ledger")?;
    result
}

fn parse_hash(s: &str) -> Result<Hash256> {
    s.parse::<Hash256>()
        .with_context(|| format!("invalid block hash: {}", s))
}

fn append(ledger: &Ledger, args: AppendArgs) -> Result<()> {
    let parent = match args.parent {
        Some(parent) => {
            let hash = parse_hash(&parent)?;
            match ledger.tip(&hash) {
                Some(header) => header,
                None => ledger.get_block(&hash)?.header,
            }
        }
        None => ledger.best_tip(),
    };
    let extra = match args.extra {
        Some(extra) => parse_hex(&extra)?,
        None => Vec::new(),
    };
    let data = args.items.into_iter().map(String::into_bytes).collect();

    // Clock skew must not make a fresh block older than its parent.
    let time = chrono::Utc::now().timestamp().max(parent.time);
    let block = Block::with_time(&parent, time, extra, data);
    let index = block.index();

    let hash = ledger.add_block(block, None)?;
    tracing::info!(index, hash = %hash, "block appended");
    println!("{}", hash);
    Ok(())
}

fn show(ledger: &Ledger, args: ShowArgs) -> Result<()> {
    let iter = match args.from {
        Some(from) => ledger.iter_from(parse_hash(&from)?),
        None => ledger.iter(),
    };

    for block in iter {
        print_block(&block?, args.json)?;
    }
    Ok(())
}

fn tips(ledger: &Ledger) -> Result<()> {
    let best = ledger.best_hash();
    for header in ledger.tips() {
        let hash = header.hash();
        let marker = if hash == best { "*" } else { " " };
        println!(
            "{} {} index={} time={}",
            marker,
            hash,
            header.index,
            format_timestamp(header.time)
        );
    }
    Ok(())
}

fn get(ledger: &Ledger, args: GetArgs) -> Result<()> {
    let block = ledger.get_block(&parse_hash(&args.hash)?)?;
    print_block(&block, args.json)
}

fn print_block(block: &Block, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(&BlockView::from(block))?);
        return Ok(());
    }

    let header = &block.header;
    println!("block {} ({})", header.index, block.hash());
    println!("  time:        {}", format_timestamp(header.time));
    println!("  prev:        {}", format_hash_short(&header.prev_hash));
    println!("  merkle root: {}", format_hash_short(&header.merkle_root));
    if !header.extra.is_empty() {
        println!("  extra:       0x{}", hex::encode(&header.extra));
    }
    for item in &block.data {
        println!("  - {}", format_item(item));
    }
    Ok(())
}
