// src/types/attribute.rs

//! 属性声明：名字 + 声明类型 + 默认值
//!
//! 声明类型只用来做检查，不做任何转换：
//! 赋值时 JSON 值的形态必须和声明类型一致，`null` 永远允许。

use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    String,
    Integer,
    Float,
    Boolean,
    /// 秒级时间戳（整数）或 RFC 3339 字符串
    Timestamp,
    Array,
    Hash,
}

impl AttributeType {
    pub fn name(self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Integer => "integer",
            AttributeType::Float => "float",
            AttributeType::Boolean => "boolean",
            AttributeType::Timestamp => "timestamp",
            AttributeType::Array => "array",
            AttributeType::Hash => "hash",
        }
    }

    pub fn accepts(self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        match self {
            AttributeType::String => value.is_string(),
            AttributeType::Integer => value.is_i64() || value.is_u64(),
            AttributeType::Float => value.is_number(),
            AttributeType::Boolean => value.is_boolean(),
            AttributeType::Timestamp => value.is_i64() || value.is_u64() || value.is_string(),
            AttributeType::Array => value.is_array(),
            AttributeType::Hash => value.is_object(),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// JSON 值的形态名，用于错误信息
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "hash",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDef {
    name: String,
    kind: AttributeType,
    default: Value,
}

impl AttributeDef {
    pub fn new(name: impl Into<String>, kind: AttributeType) -> Self {
        AttributeDef {
            name: name.into(),
            kind,
            default: Value::Null,
        }
    }

    /// 设置默认值（构造新实例时使用）
    pub fn default(&mut self, value: impl Into<Value>) -> &mut Self {
        self.default = value.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AttributeType {
        self.kind
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }
}
