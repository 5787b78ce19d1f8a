// src/registry.rs

//! 模型注册表
//!
//! 每个模型类型在第一次使用时执行一次 `Model::define`，
//! 得到的属性、校验器、回调和命名空间覆盖都保存在 `ModelEntry` 中。
//! 命名空间覆盖是 entry 上的显式字段，不是全局变量。

use dashmap::DashMap;
use serde_json::Value;
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use crate::engine::Store;
use crate::namespace;
use crate::record::Record;
use crate::types::{AttributeDef, AttributeType, Errors, Validator};

/// 可持久化的模型类型
///
/// `Self` 本身是实例上不落盘的临时状态（通过 `Record::model()` 访问），
/// 需要持久化的字段都在 `define` 中用 `attribute` 声明。
pub trait Model: Default + 'static {
    /// `::` 分隔的类型全名，默认命名空间由它推导
    const TYPE_NAME: &'static str;

    fn define(def: &mut ModelDefinition<Self>);
}

/// 生命周期钩子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    BeforeSave,
    AfterSave,
    BeforeCreate,
    AfterCreate,
    BeforeUpdate,
    AfterUpdate,
}

impl Hook {
    pub fn name(self) -> &'static str {
        match self {
            Hook::BeforeSave => "before_save",
            Hook::AfterSave => "after_save",
            Hook::BeforeCreate => "before_create",
            Hook::AfterCreate => "after_create",
            Hook::BeforeUpdate => "before_update",
            Hook::AfterUpdate => "after_update",
        }
    }

    pub fn is_before(self) -> bool {
        matches!(self, Hook::BeforeSave | Hook::BeforeCreate | Hook::BeforeUpdate)
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 回调返回值
///
/// `()` 视为 `Continue`；`false` 视为 `Halt`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Halt,
}

impl From<()> for Flow {
    fn from(_: ()) -> Self {
        Flow::Continue
    }
}

impl From<bool> for Flow {
    fn from(keep_going: bool) -> Self {
        if keep_going { Flow::Continue } else { Flow::Halt }
    }
}

pub type Callback<M> = Arc<dyn Fn(&mut Record<M>) -> Flow + Send + Sync>;

/// `Model::define` 的构建器
pub struct ModelDefinition<M> {
    attributes: Vec<AttributeDef>,
    validators: Vec<Validator<M>>,
    callbacks: HashMap<Hook, Vec<Callback<M>>>,
}

impl<M> Default for ModelDefinition<M> {
    fn default() -> Self {
        ModelDefinition {
            attributes: Vec::new(),
            validators: Vec::new(),
            callbacks: HashMap::new(),
        }
    }
}

impl<M: Model> ModelDefinition<M> {
    /// 声明一个属性；同名属性重复声明时覆盖旧定义
    pub fn attribute(&mut self, name: &str, kind: AttributeType) -> &mut AttributeDef {
        let idx = match self.attributes.iter().position(|a| a.name() == name) {
            Some(i) => {
                self.attributes[i] = AttributeDef::new(name, kind);
                i
            }
            None => {
                self.attributes.push(AttributeDef::new(name, kind));
                self.attributes.len() - 1
            }
        };
        &mut self.attributes[idx]
    }

    pub fn validates_presence_of(&mut self, name: &str) -> &mut Self {
        self.validators.push(Validator::Presence(name.to_string()));
        self
    }

    pub fn validate_with<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&Record<M>, &mut Errors) + Send + Sync + 'static,
    {
        self.validators.push(Validator::Custom(Arc::new(f)));
        self
    }

    /// 在 hook 上追加一个回调，按注册顺序执行
    pub fn on<F, R>(&mut self, hook: Hook, f: F) -> &mut Self
    where
        F: Fn(&mut Record<M>) -> R + Send + Sync + 'static,
        R: Into<Flow>,
    {
        let cb: Callback<M> = Arc::new(move |record: &mut Record<M>| f(record).into());
        self.callbacks.entry(hook).or_default().push(cb);
        self
    }

    pub fn before_save<F, R>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut Record<M>) -> R + Send + Sync + 'static,
        R: Into<Flow>,
    {
        self.on(Hook::BeforeSave, f)
    }

    pub fn after_save<F, R>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut Record<M>) -> R + Send + Sync + 'static,
        R: Into<Flow>,
    {
        self.on(Hook::AfterSave, f)
    }

    pub fn before_create<F, R>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut Record<M>) -> R + Send + Sync + 'static,
        R: Into<Flow>,
    {
        self.on(Hook::BeforeCreate, f)
    }

    pub fn after_create<F, R>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut Record<M>) -> R + Send + Sync + 'static,
        R: Into<Flow>,
    {
        self.on(Hook::AfterCreate, f)
    }

    pub fn before_update<F, R>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut Record<M>) -> R + Send + Sync + 'static,
        R: Into<Flow>,
    {
        self.on(Hook::BeforeUpdate, f)
    }

    pub fn after_update<F, R>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut Record<M>) -> R + Send + Sync + 'static,
        R: Into<Flow>,
    {
        self.on(Hook::AfterUpdate, f)
    }
}

/// 某个模型类型在注册表里的条目
pub struct ModelEntry<M> {
    type_name: &'static str,
    prefix: String,
    default_namespace: String,
    namespace_override: RwLock<Option<String>>,
    definition: ModelDefinition<M>,
}

impl<M: Model> ModelEntry<M> {
    fn build(prefix: &str) -> Self {
        let mut definition = ModelDefinition::default();
        M::define(&mut definition);
        ModelEntry {
            type_name: M::TYPE_NAME,
            prefix: prefix.to_string(),
            default_namespace: namespace::namespace_for(M::TYPE_NAME),
            namespace_override: RwLock::new(None),
            definition,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// 当前生效的命名空间（覆盖优先，否则用推导出的默认值）
    pub fn namespace(&self) -> String {
        let guard = self
            .namespace_override
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        guard.clone().unwrap_or_else(|| self.default_namespace.clone())
    }

    pub fn absolute_namespace(&self) -> String {
        namespace::absolute_namespace(&self.prefix, &self.namespace())
    }

    pub fn key_for(&self, id: u64) -> String {
        namespace::key(&self.absolute_namespace(), id)
    }

    /// 设置 / 清除（None）命名空间覆盖，返回之前的覆盖值
    pub fn set_namespace(&self, namespace: Option<String>) -> Option<String> {
        let mut guard = self
            .namespace_override
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, namespace)
    }

    pub fn attributes(&self) -> &[AttributeDef] {
        &self.definition.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.definition.attributes.iter().find(|a| a.name() == name)
    }

    pub fn validators(&self) -> &[Validator<M>] {
        &self.definition.validators
    }

    pub fn callbacks(&self, hook: Hook) -> &[Callback<M>] {
        self.definition
            .callbacks
            .get(&hook)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 按声明顺序生成默认属性表
    pub(crate) fn default_attributes(&self) -> Vec<(String, Value)> {
        self.definition
            .attributes
            .iter()
            .map(|a| (a.name().to_string(), a.default_value().clone()))
            .collect()
    }
}

/// 所有模型类型的注册表，按 TypeId 索引
pub struct Registry {
    prefix: String,
    entries: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Registry {
    pub fn new(prefix: impl Into<String>) -> Self {
        Registry {
            prefix: prefix.into(),
            entries: DashMap::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// 取出（必要时先构建）模型的注册条目
    pub fn entry<M: Model>(&self) -> Arc<ModelEntry<M>> {
        let any = self
            .entries
            .entry(TypeId::of::<M>())
            .or_insert_with(|| -> Arc<dyn Any + Send + Sync> {
                Arc::new(ModelEntry::<M>::build(&self.prefix))
            })
            .clone();
        match any.downcast::<ModelEntry<M>>() {
            Ok(entry) => entry,
            // key 就是 TypeId::of::<M>()，类型不可能对不上
            Err(_) => unreachable!("registry entry for {} has wrong type", M::TYPE_NAME),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 模型类型的句柄：注册条目 + 存储
pub struct ModelHandle<M> {
    pub(crate) entry: Arc<ModelEntry<M>>,
    pub(crate) store: Arc<dyn Store>,
}

impl<M> Clone for ModelHandle<M> {
    fn clone(&self) -> Self {
        ModelHandle {
            entry: Arc::clone(&self.entry),
            store: Arc::clone(&self.store),
        }
    }
}

impl<M: Model> ModelHandle<M> {
    pub fn new(entry: Arc<ModelEntry<M>>, store: Arc<dyn Store>) -> Self {
        ModelHandle { entry, store }
    }

    pub fn entry(&self) -> &Arc<ModelEntry<M>> {
        &self.entry
    }

    pub fn namespace(&self) -> String {
        self.entry.namespace()
    }

    pub fn absolute_namespace(&self) -> String {
        self.entry.absolute_namespace()
    }

    /// 传 None 恢复默认命名空间
    pub fn set_namespace<S: Into<String>>(&self, namespace: Option<S>) {
        self.entry.set_namespace(namespace.map(Into::into));
    }

    /// 临时覆盖命名空间，guard 析构时恢复原值
    pub fn override_namespace(&self, namespace: impl Into<String>) -> NamespaceGuard<M> {
        let previous = self.entry.set_namespace(Some(namespace.into()));
        NamespaceGuard {
            entry: Arc::clone(&self.entry),
            previous,
        }
    }

    /// 只有默认值的新实例
    pub fn new_record(&self) -> Record<M> {
        Record::new(Arc::clone(&self.entry), Arc::clone(&self.store))
    }
}

#[must_use = "the override is reverted as soon as the guard is dropped"]
pub struct NamespaceGuard<M: Model> {
    entry: Arc<ModelEntry<M>>,
    previous: Option<String>,
}

impl<M: Model> Drop for NamespaceGuard<M> {
    fn drop(&mut self) {
        self.entry.set_namespace(self.previous.take());
    }
}
