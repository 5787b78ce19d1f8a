// src/record.rs

//! 模型实例：属性值、ID、脏状态、校验错误
//!
//! 脏状态不靠拦截赋值，而是保存一份“原始快照”，
//! 按声明的属性列表和当前值逐个比较得出。

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::engine::Store;
use crate::error::{ModisError, Result};
use crate::registry::{Model, ModelEntry};
use crate::types::attribute::value_kind;
use crate::types::validation::{is_blank, BLANK_MESSAGE};
use crate::types::{Errors, Validator};

pub struct Record<M> {
    pub(crate) entry: Arc<ModelEntry<M>>,
    pub(crate) store: Arc<dyn Store>,
    pub(crate) id: Option<u64>,
    pub(crate) attributes: BTreeMap<String, Value>,
    // 上次保存 / 加载时的属性值
    pub(crate) original: BTreeMap<String, Value>,
    pub(crate) errors: Errors,
    pub(crate) destroyed: bool,
    model: M,
}

impl<M: Model> Record<M> {
    /// 默认值构造，新实例没有脏属性
    pub(crate) fn new(entry: Arc<ModelEntry<M>>, store: Arc<dyn Store>) -> Self {
        let attributes: BTreeMap<String, Value> = entry.default_attributes().into_iter().collect();
        Record {
            original: attributes.clone(),
            attributes,
            entry,
            store,
            id: None,
            errors: Errors::new(),
            destroyed: false,
            model: M::default(),
        }
    }

    /// 由存储中读出的属性构造；未知字段忽略，缺失字段取默认值
    pub(crate) fn from_stored(
        entry: Arc<ModelEntry<M>>,
        store: Arc<dyn Store>,
        id: u64,
        stored: Map<String, Value>,
    ) -> Self {
        let mut record = Self::new(entry, store);
        record.load_stored(stored);
        record.id = Some(id);
        record
    }

    pub(crate) fn load_stored(&mut self, mut stored: Map<String, Value>) {
        for (name, value) in self.entry.default_attributes() {
            let value = stored.remove(&name).unwrap_or(value);
            self.attributes.insert(name, value);
        }
        self.clear_changes();
    }

    pub fn id(&self) -> Option<u64> {
        self.id
    }

    /// `{absolute_namespace}:{id}`，未保存时为 None
    pub fn key(&self) -> Option<String> {
        self.id.map(|id| self.entry.key_for(id))
    }

    pub fn namespace(&self) -> String {
        self.entry.namespace()
    }

    pub fn absolute_namespace(&self) -> String {
        self.entry.absolute_namespace()
    }

    pub fn new_record(&self) -> bool {
        self.id.is_none()
    }

    pub fn persisted(&self) -> bool {
        self.id.is_some() && !self.destroyed
    }

    pub fn destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// 给属性赋值；属性必须已声明，值的形态必须与声明类型一致
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let def = self
            .entry
            .attribute(name)
            .ok_or_else(|| ModisError::UnknownAttribute {
                model: self.entry.type_name().to_string(),
                attribute: name.to_string(),
            })?;
        if !def.kind().accepts(&value) {
            return Err(ModisError::TypeMismatch {
                attribute: name.to_string(),
                expected: def.kind().name(),
                actual: value_kind(&value).to_string(),
            });
        }
        self.attributes.insert(name.to_string(), value);
        Ok(())
    }

    /// 批量赋值，遇到第一个错误即停止
    pub fn assign_attributes<I, K, V>(&mut self, attrs: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (name, value) in attrs {
            self.set(name.as_ref(), value)?;
        }
        Ok(())
    }

    /// 按声明顺序列出与原始快照不同的属性名
    pub fn changed(&self) -> Vec<String> {
        self.entry
            .attributes()
            .iter()
            .map(|a| a.name())
            .filter(|name| self.attribute_changed(name))
            .map(str::to_string)
            .collect()
    }

    pub fn is_changed(&self) -> bool {
        self.entry
            .attributes()
            .iter()
            .any(|a| self.attribute_changed(a.name()))
    }

    pub fn attribute_changed(&self, name: &str) -> bool {
        self.attributes.get(name) != self.original.get(name)
    }

    /// 属性在上次保存 / 加载时的值
    pub fn attribute_was(&self, name: &str) -> Option<&Value> {
        self.original.get(name)
    }

    /// 属性名 -> (旧值, 新值)
    pub fn changes(&self) -> BTreeMap<String, (Value, Value)> {
        self.changed()
            .into_iter()
            .map(|name| {
                let old = self.original.get(&name).cloned().unwrap_or(Value::Null);
                let new = self.attributes.get(&name).cloned().unwrap_or(Value::Null);
                (name, (old, new))
            })
            .collect()
    }

    /// 丢弃未保存的修改
    pub fn restore_attributes(&mut self) {
        self.attributes = self.original.clone();
    }

    pub(crate) fn clear_changes(&mut self) {
        self.original = self.attributes.clone();
    }

    /// 运行全部校验器，刷新 errors
    pub fn valid(&mut self) -> bool {
        let entry = Arc::clone(&self.entry);
        let mut errors = Errors::new();
        for validator in entry.validators() {
            match validator {
                Validator::Presence(attr) => {
                    if self.attributes.get(attr).is_none_or(is_blank) {
                        errors.add(attr.as_str(), BLANK_MESSAGE);
                    }
                }
                Validator::Custom(f) => f(&*self, &mut errors),
            }
        }
        self.errors = errors;
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &Errors {
        &self.errors
    }

    /// 实例上的临时（不落盘）状态
    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub(crate) fn serialize_attributes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.attributes)?)
    }
}

impl<M: Model> fmt::Debug for Record<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(M::TYPE_NAME)
            .field("id", &self.id)
            .field("attributes", &self.attributes)
            .field("changed", &self.changed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MemoryStore;
    use crate::registry::{ModelDefinition, ModelHandle, Registry};
    use crate::types::AttributeType;
    use serde_json::json;

    #[derive(Default)]
    struct Person;

    impl Model for Person {
        const TYPE_NAME: &'static str = "Person";

        fn define(def: &mut ModelDefinition<Self>) {
            def.attribute("name", AttributeType::String).default("Ian");
            def.attribute("age", AttributeType::Integer);
            def.validates_presence_of("name");
            def.validate_with(|r: &Record<Person>, errors: &mut Errors| {
                if r.get("age").and_then(Value::as_i64).is_some_and(|age| age < 0) {
                    errors.add("age", "must be positive");
                }
            });
        }
    }

    fn person() -> Record<Person> {
        let registry = Registry::new("modis");
        ModelHandle::new(registry.entry::<Person>(), Arc::new(MemoryStore::new())).new_record()
    }

    #[test]
    fn test_defaults_are_clean() {
        let p = person();
        assert_eq!(p.get("name"), Some(&json!("Ian")));
        assert_eq!(p.get("age"), Some(&Value::Null));
        assert!(p.changed().is_empty());
        assert!(p.key().is_none());
        assert!(p.new_record());
        assert!(!p.persisted());
    }

    #[test]
    fn test_dirty_tracking() -> Result<()> {
        let mut p = person();
        p.set("name", "Kyle")?;
        assert_eq!(p.changed(), vec!["name"]);
        assert!(p.attribute_changed("name"));
        assert_eq!(p.attribute_was("name"), Some(&json!("Ian")));
        assert_eq!(
            p.changes().get("name"),
            Some(&(json!("Ian"), json!("Kyle")))
        );

        // 改回原值后不再是脏属性
        p.set("name", "Ian")?;
        assert!(!p.is_changed());

        p.set("age", 3)?;
        p.restore_attributes();
        assert!(p.changed().is_empty());
        Ok(())
    }

    #[test]
    fn test_set_rejects_unknown_and_mismatched() {
        let mut p = person();
        assert!(matches!(
            p.set("email", "a@b.c"),
            Err(ModisError::UnknownAttribute { .. })
        ));
        let err = p.set("age", "old").unwrap_err();
        assert_eq!(err.to_string(), "attribute 'age' expects integer, got string");
        // 失败的赋值不改变状态
        assert!(p.changed().is_empty());
    }

    #[test]
    fn test_validation() -> Result<()> {
        let mut p = person();
        assert!(p.valid());

        p.set("name", Value::Null)?;
        p.set("age", -1)?;
        assert!(!p.valid());
        assert_eq!(p.errors().get("name"), ["can't be blank"]);
        assert_eq!(p.errors().get("age"), ["must be positive"]);

        // 修正后重新校验会清空旧错误
        p.set("name", "Kyle")?;
        p.set("age", 30)?;
        assert!(p.valid());
        assert!(p.errors().is_empty());
        Ok(())
    }

    #[test]
    fn test_load_stored_ignores_unknown_fields() {
        let registry = Registry::new("modis");
        let entry = registry.entry::<Person>();
        let mut stored = Map::new();
        stored.insert("age".into(), json!(41));
        stored.insert("legacy".into(), json!("x"));

        let p = Record::from_stored(entry, Arc::new(MemoryStore::new()), 9, stored);
        assert_eq!(p.get("age"), Some(&json!(41)));
        // 缺失字段回落到默认值
        assert_eq!(p.get("name"), Some(&json!("Ian")));
        assert!(p.get("legacy").is_none());
        assert_eq!(p.key().as_deref(), Some("modis:person:9"));
        assert!(p.changed().is_empty());
    }
}
