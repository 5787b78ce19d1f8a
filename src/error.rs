// src/error.rs

//! 模型层对外暴露的错误类型
//!
//! 存储层 / 配置层内部仍然使用 `anyhow::Result`，
//! 到了模型 API 边界统一转换成 `ModisError`。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModisError {
    /// save! / create! 失败（校验失败、回调中止或写入失败）
    #[error("record not saved")]
    RecordNotSaved,

    /// 按 key 读取时记录不存在
    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("unknown attribute '{attribute}' for {model}")]
    UnknownAttribute { model: String, attribute: String },

    #[error("attribute '{attribute}' expects {expected}, got {actual}")]
    TypeMismatch {
        attribute: String,
        expected: &'static str,
        actual: String,
    },

    /// 需要 key 的操作作用在了未保存的记录上
    #[error("record has not been persisted")]
    NotPersisted,

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),

    #[error("failed to (de)serialize attributes: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = ModisError> = std::result::Result<T, E>;
