// src/types/validation.rs

//! 校验：presence 校验器 + 自定义闭包，错误收集到 `Errors`

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::record::Record;

pub const BLANK_MESSAGE: &str = "can't be blank";

/// 属性名 -> 错误信息列表
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Errors {
    messages: BTreeMap<String, Vec<String>>,
}

impl Errors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, attribute: impl Into<String>, message: impl Into<String>) {
        self.messages
            .entry(attribute.into())
            .or_default()
            .push(message.into());
    }

    /// 某个属性上的错误，没有时返回空切片
    pub fn get(&self, attribute: &str) -> &[String] {
        self.messages.get(attribute).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// 错误条数（不是属性个数）
    pub fn len(&self) -> usize {
        self.messages.values().map(Vec::len).sum()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.messages
            .iter()
            .flat_map(|(attr, msgs)| msgs.iter().map(move |m| (attr.as_str(), m.as_str())))
    }

    /// "Name can't be blank" 这种可读形式
    pub fn full_messages(&self) -> Vec<String> {
        self.iter()
            .map(|(attr, msg)| format!("{} {}", humanize(attr), msg))
            .collect()
    }
}

/// `first_name` → `First name`
fn humanize(attribute: &str) -> String {
    let spaced = attribute.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// null、空白字符串、空数组、空对象都算 blank
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

pub type ValidateFn<M> = Arc<dyn Fn(&Record<M>, &mut Errors) + Send + Sync>;

pub enum Validator<M> {
    Presence(String),
    Custom(ValidateFn<M>),
}

impl<M> Clone for Validator<M> {
    fn clone(&self) -> Self {
        match self {
            Validator::Presence(attr) => Validator::Presence(attr.clone()),
            Validator::Custom(f) => Validator::Custom(Arc::clone(f)),
        }
    }
}
