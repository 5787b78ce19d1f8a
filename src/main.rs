// src/main.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use modis::{config, SledStore, Store};

/// 查看 modis 在 sled 中保存的记录
#[derive(Parser, Debug)]
#[command(name = "modis", version)]
struct Cli {
    /// 配置文件路径，不存在时会生成默认配置
    #[arg(short, long, default_value = "modis.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 打印一条记录，例如 `modis get modis:user:1`
    Get { key: String },
    /// 列出某个前缀下的所有 key，例如 `modis keys modis:user`
    Keys { prefix: String },
}

fn main() -> Result<()> {
    modis::setup_logging();
    let cli = Cli::parse();

    let cfg = config::load(&cli.config)?;
    let store = SledStore::open(&cfg.db_path)?;

    match cli.command {
        Command::Get { key } => match store.read(&key)? {
            Some(bytes) => {
                let value: serde_json::Value = serde_json::from_slice(&bytes)
                    .with_context(|| format!("'{}' does not hold a record", key))?;
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            None => println!("(nil)"),
        },
        Command::Keys { prefix } => {
            for key in store.keys_with_prefix(&prefix)? {
                println!("{}", key);
            }
        }
    }
    Ok(())
}
