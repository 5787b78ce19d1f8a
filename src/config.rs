// src/config.rs

use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use anyhow::{Context, Result};
use tracing::info;

/// 全局配置：命名空间前缀 + sled 存储位置
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// 所有 key 的公共前缀，absolute_namespace = "{prefix}:{namespace}"
    pub prefix: String,
    /// sled 数据库目录
    pub db_path: PathBuf,
    /// 每次写入后是否立即 flush 到磁盘
    pub flush_on_write: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            prefix: "modis".into(),
            db_path: PathBuf::from("modis.db"),
            flush_on_write: false,
        }
    }
}

/// 从指定路径读取并反序列化 JSON 配置
pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();

    // 如果配置文件不存在，创建默认配置
    if !path_ref.exists() {
        let default_cfg = Config::default();
        let default_json = serde_json::to_string_pretty(&default_cfg)?;
        fs::write(path_ref, default_json)
            .with_context(|| format!("Failed to write default config {:?}", path_ref))?;
        info!(path = ?path_ref, "default config created");
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path_ref)
        .with_context(|| format!("Failed to read config file {:?}", path_ref))?;
    let cfg: Config = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse config file {:?}", path_ref))?;
    Ok(cfg)
}
