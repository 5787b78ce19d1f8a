// src/engine/memory.rs
use anyhow::{bail, Result};
use dashmap::DashMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use super::kv::{id_seq_key, Store};

/// 进程内存储，测试和嵌入式场景使用
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<DashMap<String, Vec<u8>>>,
    // namespace 计数器 key -> 当前最大 ID
    sequences: Arc<DashMap<String, u64>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 打开后所有 write/delete 都返回错误，用来模拟后端写入失败
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }
}

impl Store for MemoryStore {
    fn next_id(&self, namespace: &str) -> Result<u64> {
        // entry 持有分片写锁，读-改-写是原子的
        let mut seq = self.sequences.entry(id_seq_key(namespace)).or_insert(0);
        *seq += 1;
        Ok(*seq)
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("write to '{}' rejected", key);
        }
        self.data.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.data.get(key).map(|v| v.value().clone()))
    }

    fn delete(&self, key: &str) -> Result<bool> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("delete of '{}' rejected", key);
        }
        Ok(self.data.remove(key).is_some())
    }
}
