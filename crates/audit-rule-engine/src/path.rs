//! 字段路径解析
//!
//! 将点号分隔的路径（如 `VendorRef.name` 或 `Line.0.Amount`）解析到 JSON 树上。
//! 纯数字的路径段作为数组下标，其他路径段作为对象键。

use serde_json::Value;

/// 路径解析器
pub struct PathResolver;

impl PathResolver {
    /// 解析字段路径
    ///
    /// 任一步遇到缺失值、标量或 `null` 时返回 None（缺失不是错误）。
    pub fn resolve<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
        let mut current = root;

        for segment in path.split('.') {
            current = Self::step(current, segment)?;
        }

        if current.is_null() { None } else { Some(current) }
    }

    fn step<'a>(current: &'a Value, segment: &str) -> Option<&'a Value> {
        match current {
            Value::Object(map) => map.get(segment),
            Value::Array(arr) if Self::is_index(segment) => arr.get(segment.parse::<usize>().ok()?),
            _ => None,
        }
    }

    fn is_index(segment: &str) -> bool {
        !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
    }

    /// 拆分为父路径和叶子字段名（顶层字段的父路径为 None）
    pub fn split_parent(path: &str) -> (Option<&str>, &str) {
        match path.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, path),
        }
    }
}
