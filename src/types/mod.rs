// src/types/mod.rs
//! 属性与校验的声明类型

pub mod attribute;
pub mod validation;

pub use attribute::{AttributeDef, AttributeType};
pub use validation::{Errors, Validator};
