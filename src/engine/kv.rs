// src/engine/kv.rs

use anyhow::{anyhow, Context, Result};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::Db;
use tracing::debug;

/// 模型层需要的存储操作
///
/// 只包含持久化引擎真正用到的几个原语：原子自增 ID、按 key 读写删。
pub trait Store: Send + Sync {
    /// 原子地把 `{namespace}:id_seq` 加一，返回新值（从 1 开始）
    fn next_id(&self, namespace: &str) -> Result<u64>;

    /// 覆盖写入 key
    fn write(&self, key: &str, value: &[u8]) -> Result<()>;

    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// 删除 key，返回 key 之前是否存在
    fn delete(&self, key: &str) -> Result<bool>;

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// ID 计数器所在的 key
pub fn id_seq_key(namespace: &str) -> String {
    format!("{}:id_seq", namespace)
}

/// 基于 sled::Db 的持久化存储
#[derive(Clone)]
pub struct SledStore {
    db: Db,
    flush_on_write: bool,
}

impl SledStore {
    pub fn new(db: Db) -> Self {
        SledStore { db, flush_on_write: false }
    }

    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path)
            .with_context(|| format!("Failed to open sled database {:?}", path))?;
        Ok(Self::new(db))
    }

    /// 每次写入后强制落盘
    pub fn with_flush_on_write(mut self, flush: bool) -> Self {
        self.flush_on_write = flush;
        self
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    /// 列出以 prefix 开头的所有 key（CLI 使用）
    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for item in self.db.scan_prefix(prefix.as_bytes()) {
            let (k, _v) = item?;
            keys.push(String::from_utf8(k.to_vec())?);
        }
        Ok(keys)
    }
}

impl Store for SledStore {
    fn next_id(&self, namespace: &str) -> Result<u64> {
        let seq_key = id_seq_key(namespace);

        // 读取-加一-写回放在一个 sled 事务里，保证并发下不会分配出重复 ID
        let res = self.db.transaction(|tx| {
            let old = match tx.get(seq_key.as_bytes())? {
                Some(iv) => {
                    let s = std::str::from_utf8(&iv)
                        .map_err(|_| ConflictableTransactionError::Abort("id sequence is not valid UTF-8"))?;
                    s.parse::<u64>()
                        .map_err(|_| ConflictableTransactionError::Abort("id sequence is not an integer"))?
                }
                None => 0,
            };

            let new = old
                .checked_add(1)
                .ok_or(ConflictableTransactionError::Abort("id sequence would overflow"))?;
            tx.insert(seq_key.as_bytes(), new.to_string().as_bytes())?;
            Ok(new)
        });

        let id = match res {
            Ok(id) => id,
            Err(TransactionError::Abort(reason)) => {
                return Err(anyhow!("{} ({})", reason, seq_key));
            }
            Err(TransactionError::Storage(e)) => {
                return Err(e).with_context(|| format!("Failed to increment {}", seq_key));
            }
        };
        debug!(namespace, id, "allocated id");
        Ok(id)
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<()> {
        self.db
            .insert(key.as_bytes(), value)
            .with_context(|| format!("Failed to write key '{}'", key))?;
        if self.flush_on_write {
            self.db.flush().context("Failed to flush sled")?;
        }
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let val = self
            .db
            .get(key.as_bytes())
            .with_context(|| format!("Failed to read key '{}'", key))?;
        Ok(val.map(|iv| iv.to_vec()))
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let prev = self
            .db
            .remove(key.as_bytes())
            .with_context(|| format!("Failed to delete key '{}'", key))?;
        if self.flush_on_write {
            self.db.flush().context("Failed to flush sled")?;
        }
        Ok(prev.is_some())
    }

    fn flush(&self) -> Result<()> {
        self.db.flush().context("Failed to flush sled")?;
        Ok(())
    }
}
