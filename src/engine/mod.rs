// src/engine/mod.rs

//! # 存储引擎模块
//!
//! 持久化引擎只通过 [`Store`] 与后端交互：
//! - `next_id` 原子地分配记录 ID
//! - `write` / `read` / `delete` 按计算好的 key 存取序列化后的属性
//!
//! 提供两个实现：基于 sled 的 [`SledStore`] 和基于 DashMap 的 [`MemoryStore`]。
pub mod kv;
pub mod memory;

pub use kv::{id_seq_key, SledStore, Store};
pub use memory::MemoryStore;

use anyhow::Result;
use std::sync::Arc;

use crate::config::Config;

/// 按配置打开 sled 存储
pub fn open_store(cfg: &Config) -> Result<Arc<dyn Store>> {
    let store = SledStore::open(&cfg.db_path)?.with_flush_on_write(cfg.flush_on_write);
    Ok(Arc::new(store))
}
