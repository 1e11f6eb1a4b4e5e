//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了CLI命令行接口。

mod stats;

use crate::backend::l2::RedisBackend;
use crate::client::TwoLevelCache;
use crate::config::CacheConfig;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "duocache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true, help = "Path to a TOML config file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(name = "ping", about = "Check connectivity to the L2 store")]
    Ping,

    #[command(name = "stats", about = "Show combined cache statistics")]
    Stats(StatsArgs),

    #[command(name = "get", about = "Read a key through the cache")]
    Get { key: String },

    #[command(name = "del", about = "Delete a key from both tiers")]
    Del { key: String },

    #[command(name = "del-pattern", about = "Delete keys matching a pattern ('*' is the only wildcard)")]
    DelPattern { pattern: String },

    #[command(name = "flush", about = "Flush every key in L2")]
    Flush(FlushArgs),
}

#[derive(Parser, Debug)]
pub struct StatsArgs {
    #[arg(short, long, help = "Output in Prometheus format")]
    pub prometheus: bool,

    #[arg(short, long, help = "Output in JSON format")]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct FlushArgs {
    #[arg(long, help = "Confirm the destructive flush")]
    pub yes: bool,
}

fn load_config(path: Option<&PathBuf>) -> Result<CacheConfig> {
    match path {
        Some(path) => CacheConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(CacheConfig::default()),
    }
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    crate::telemetry::init_tracing("duocache", "warn");
    let config = load_config(cli.config.as_ref())?;

    if let Commands::Ping = cli.command {
        RedisBackend::new(&config.l2)?
            .ping()
            .await
            .context("L2 is unreachable")?;
        println!("PONG");
        return Ok(());
    }

    let cache = TwoLevelCache::connect(config).await?;
    let outcome = execute(&cache, &cli.command).await;
    cache.shutdown().await;
    outcome
}

async fn execute(cache: &TwoLevelCache, command: &Commands) -> Result<()> {
    match command {
        Commands::Ping => Ok(()),
        Commands::Stats(args) => stats::execute(cache, args).await,
        Commands::Get { key } => {
            match cache.get::<serde_json::Value>(key).await {
                Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                None => println!("(nil)"),
            }
            Ok(())
        }
        Commands::Del { key } => {
            if !cache.del(key).await {
                bail!("Failed to delete '{}' from L2", key);
            }
            println!("OK");
            Ok(())
        }
        Commands::DelPattern { pattern } => {
            let removed = cache.del_pattern(pattern).await;
            println!("{} keys removed", removed);
            Ok(())
        }
        Commands::Flush(args) => {
            if !args.yes {
                bail!("Refusing to flush without --yes");
            }
            if !cache.flush_all().await {
                bail!("L2 flush failed");
            }
            println!("OK");
            Ok(())
        }
    }
}
