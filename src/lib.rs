// src/lib.rs
//! modis 库：registry / record / persistence / namespace / engine / types / config

pub mod config;       // JSON 配置
pub mod context;      // Modis：配置 + 存储 + 注册表
pub mod engine;       // 存储后端（sled / 内存）
pub mod error;        // ModisError
pub mod namespace;    // 命名空间与 key 推导
pub mod persistence;  // save 生命周期
pub mod record;       // 模型实例与脏状态
pub mod registry;     // 模型注册表、回调
pub mod types;        // 属性声明与校验

pub use context::Modis;
pub use engine::{MemoryStore, SledStore, Store};
pub use error::{ModisError, Result};
pub use record::Record;
pub use registry::{Flow, Hook, Model, ModelDefinition, ModelHandle, NamespaceGuard};
pub use types::{AttributeType, Errors};

/// 安装全局 tracing subscriber，日志级别由 RUST_LOG 控制（默认 info）
///
/// 重复调用不会 panic。
pub fn setup_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
