// src/persistence.rs

//! 持久化引擎：save 生命周期状态机
//!
//! ```text
//! new → validating → before_save → before_create | before_update
//!     → writing → after_create | after_update → after_save → saved
//! ```
//!
//! 校验失败、before_* 回调中止、写入失败都会进入 failed：
//! 不写存储（或写入未成功），不分配 ID，脏状态保持不变。
//!
//! 回调中止规则：
//! - before_* 链中任一回调返回 `Flow::Halt`：整个 save 失败。
//! - after_* 链中回调返回 `Flow::Halt`：只跳过同一条链里剩下的回调，
//!   数据已经写入，save 仍然成功，后续钩子照常执行。

use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{ModisError, Result};
use crate::registry::{Flow, Hook, Model, ModelHandle};
use crate::record::Record;

/// save 失败的内部原因，只用于日志；对外统一成 RecordNotSaved / false
#[derive(Debug)]
enum SaveFailure {
    Destroyed,
    Invalid(Vec<String>),
    Halted(Hook),
    Store(ModisError),
}

impl fmt::Display for SaveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveFailure::Destroyed => write!(f, "record was destroyed"),
            SaveFailure::Invalid(msgs) => write!(f, "validation failed: {}", msgs.join(", ")),
            SaveFailure::Halted(hook) => write!(f, "halted by {} callback", hook),
            SaveFailure::Store(e) => write!(f, "{}", e),
        }
    }
}

impl<M: Model> Record<M> {
    /// 保存；失败时返回 false，ID 和脏状态不变
    pub fn save(&mut self) -> bool {
        self.run_save(true).is_ok()
    }

    /// 保存；失败时返回 `RecordNotSaved`
    pub fn try_save(&mut self) -> Result<()> {
        self.run_save(true).map_err(|_| ModisError::RecordNotSaved)
    }

    /// 赋值一个属性并保存，跳过校验
    pub fn update_attribute(&mut self, name: &str, value: impl Into<Value>) -> Result<bool> {
        self.set(name, value)?;
        Ok(self.run_save(false).is_ok())
    }

    /// 批量赋值后 save；赋值本身出错（未知属性 / 类型不符）时返回 Err
    pub fn update_attributes<I, K, V>(&mut self, attrs: I) -> Result<bool>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.assign_attributes(attrs)?;
        Ok(self.save())
    }

    pub fn try_update_attributes<I, K, V>(&mut self, attrs: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.assign_attributes(attrs)?;
        self.try_save()
    }

    /// 从存储重新读取属性，丢弃未保存的修改
    pub fn reload(&mut self) -> Result<()> {
        let key = self.key().ok_or(ModisError::NotPersisted)?;
        let stored = read_attributes(self.store.as_ref(), &key)?;
        self.load_stored(stored);
        self.errors.clear();
        Ok(())
    }

    /// 删除存储中的 key；之后这个实例不能再保存
    pub fn destroy(&mut self) -> Result<()> {
        let key = self.key().ok_or(ModisError::NotPersisted)?;
        let existed = self.store.delete(&key)?;
        if !existed {
            warn!(%key, "destroyed a record whose key was already gone");
        }
        self.destroyed = true;
        info!(%key, "record destroyed");
        Ok(())
    }

    fn run_save(&mut self, validate: bool) -> Result<(), SaveFailure> {
        let outcome = self.save_lifecycle(validate);
        match &outcome {
            Ok(()) => debug!(model = M::TYPE_NAME, key = ?self.key(), "record saved"),
            Err(reason) => warn!(model = M::TYPE_NAME, %reason, "record not saved"),
        }
        outcome
    }

    fn save_lifecycle(&mut self, validate: bool) -> Result<(), SaveFailure> {
        if self.destroyed {
            return Err(SaveFailure::Destroyed);
        }
        if validate && !self.valid() {
            return Err(SaveFailure::Invalid(self.errors.full_messages()));
        }

        let creating = self.new_record();
        let (before, after) = if creating {
            (Hook::BeforeCreate, Hook::AfterCreate)
        } else {
            (Hook::BeforeUpdate, Hook::AfterUpdate)
        };

        self.run_callbacks(Hook::BeforeSave)?;
        self.run_callbacks(before)?;

        let id = self.write().map_err(SaveFailure::Store)?;
        // 写入成功后才记录 ID，写失败的新记录仍然没有 key
        self.id = Some(id);

        self.run_callbacks(after)?;
        self.run_callbacks(Hook::AfterSave)?;

        // 回调全部跑完之后才重置脏状态，回调里能看到本次的修改
        self.clear_changes();
        Ok(())
    }

    fn write(&self) -> Result<u64> {
        let namespace = self.absolute_namespace();
        let id = match self.id {
            Some(id) => id,
            None => self.store.next_id(&namespace)?,
        };
        let key = crate::namespace::key(&namespace, id);
        let payload = self.serialize_attributes()?;
        self.store.write(&key, &payload)?;
        Ok(id)
    }

    fn run_callbacks(&mut self, hook: Hook) -> Result<(), SaveFailure> {
        let entry = Arc::clone(&self.entry);
        for cb in entry.callbacks(hook) {
            if cb(&mut *self) == Flow::Halt {
                if hook.is_before() {
                    return Err(SaveFailure::Halted(hook));
                }
                debug!(model = M::TYPE_NAME, %hook, "after callback chain halted");
                break;
            }
        }
        Ok(())
    }
}

/// 读出 key 对应的属性表
fn read_attributes(store: &dyn crate::engine::Store, key: &str) -> Result<Map<String, Value>> {
    let bytes = store
        .read(key)?
        .ok_or_else(|| ModisError::RecordNotFound(key.to_string()))?;
    Ok(serde_json::from_slice(&bytes)?)
}

impl<M: Model> ModelHandle<M> {
    /// 默认值之上叠加给定属性构造新实例（不保存）
    pub fn build<I, K, V>(&self, attrs: I) -> Result<Record<M>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut record = self.new_record();
        record.assign_attributes(attrs)?;
        Ok(record)
    }

    /// 构造并 save；是否保存成功看 `persisted()`
    pub fn create<I, K, V>(&self, attrs: I) -> Result<Record<M>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut record = self.build(attrs)?;
        record.save();
        Ok(record)
    }

    /// 构造并 save，保存失败返回 `RecordNotSaved`
    pub fn try_create<I, K, V>(&self, attrs: I) -> Result<Record<M>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut record = self.build(attrs)?;
        record.try_save()?;
        Ok(record)
    }

    pub fn key_for(&self, id: u64) -> String {
        self.entry.key_for(id)
    }

    pub fn find(&self, id: u64) -> Result<Record<M>> {
        let key = self.key_for(id);
        let stored = read_attributes(self.store.as_ref(), &key)?;
        Ok(Record::from_stored(
            Arc::clone(&self.entry),
            Arc::clone(&self.store),
            id,
            stored,
        ))
    }

    pub fn exists(&self, id: u64) -> Result<bool> {
        Ok(self.store.read(&self.key_for(id))?.is_some())
    }
}
