// src/namespace.rs

//! key / 命名空间推导
//!
//! - namespace:          `Outer::InnerModel` → `outer:inner_model`
//! - absolute_namespace: `{prefix}:{namespace}`，prefix 默认 `modis`
//! - key:                `{absolute_namespace}:{id}`

/// 库级默认前缀
pub const DEFAULT_PREFIX: &str = "modis";

/// CamelCase → snake_case
///
/// 规则：小写/数字后面紧跟大写时断开；连续大写的最后一个字母
/// 如果后面是小写，也在它前面断开（`HTTPServer` → `http_server`）。
pub fn underscore(word: &str) -> String {
    let chars: Vec<char> = word.chars().collect();
    let mut out = String::with_capacity(word.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower)
            {
                out.push('_');
            }
        }
        if c == '-' {
            out.push('_');
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// 由类型全名（`::` 分隔）推导默认命名空间
pub fn namespace_for(type_name: &str) -> String {
    type_name
        .split("::")
        .filter(|seg| !seg.is_empty())
        .map(underscore)
        .collect::<Vec<_>>()
        .join(":")
}

pub fn absolute_namespace(prefix: &str, namespace: &str) -> String {
    if prefix.is_empty() {
        namespace.to_string()
    } else {
        format!("{}:{}", prefix, namespace)
    }
}

pub fn key(absolute_namespace: &str, id: u64) -> String {
    format!("{}:{}", absolute_namespace, id)
}
