// src/context.rs

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::engine::{self, MemoryStore, Store};
use crate::registry::{Model, ModelHandle, Registry};

/// 一个配置 + 一个存储 + 模型注册表
///
/// ```ignore
/// let modis = Modis::open(config::load("modis.json")?)?;
/// let users = modis.model::<User>();
/// let mut user = users.try_create([("name", "Ian")])?;
/// ```
pub struct Modis {
    config: Config,
    store: Arc<dyn Store>,
    registry: Registry,
}

impl Modis {
    /// 按配置打开 sled 存储
    pub fn open(config: Config) -> Result<Self> {
        let store = engine::open_store(&config)?;
        info!(db_path = ?config.db_path, prefix = %config.prefix, "modis opened");
        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: Config, store: Arc<dyn Store>) -> Self {
        let registry = Registry::new(config.prefix.clone());
        Modis { config, store, registry }
    }

    /// 默认配置 + 内存存储
    pub fn in_memory() -> Self {
        Self::with_store(Config::default(), Arc::new(MemoryStore::new()))
    }

    pub fn model<M: Model>(&self) -> ModelHandle<M> {
        ModelHandle::new(self.registry.entry::<M>(), Arc::clone(&self.store))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn flush(&self) -> Result<()> {
        self.store.flush()
    }
}
