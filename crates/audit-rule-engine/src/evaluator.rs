//! 操作符评估器
//!
//! 实现封闭的比较操作符集合。比较是全函数：类型不匹配、解析失败、
//! 未知操作符都返回 false，而不是错误。
//!
//! 相等语义：两个操作数都能解析为数字时按数值比较，否则比较字符串表示。

use crate::operators::Operator;
use serde_json::Value;
use std::borrow::Cow;

/// 操作符评估器
pub struct OperatorEvaluator;

impl OperatorEvaluator {
    /// 比较实际值与规则期望值
    ///
    /// # Arguments
    /// * `actual` - 从交易中解析出的值，None 表示缺失
    /// * `operator` - 操作符
    /// * `target` - 规则中定义的期望值
    pub fn compare(actual: Option<&Value>, operator: &Operator, target: &Value) -> bool {
        // 字段缺失时任何操作符都返回 false
        let Some(actual) = actual else {
            return false;
        };

        match operator {
            Operator::Eq => Self::loose_eq(actual, target),
            Operator::Ne => !Self::loose_eq(actual, target),
            Operator::Gt => Self::numeric(actual, target, |a, b| a > b),
            Operator::Lt => Self::numeric(actual, target, |a, b| a < b),
            Operator::Contains => Self::contains_ci(actual, target),
            Operator::NotContains => !Self::contains_ci(actual, target),
            // 期望值不是数组时 in 与 not_in 都为 false
            Operator::In => target
                .as_array()
                .is_some_and(|items| items.iter().any(|item| Self::loose_eq(actual, item))),
            Operator::NotIn => target
                .as_array()
                .is_some_and(|items| !items.iter().any(|item| Self::loose_eq(actual, item))),
            Operator::Unknown(_) => false,
        }
    }

    /// 宽松相等
    pub fn loose_eq(left: &Value, right: &Value) -> bool {
        if let (Some(a), Some(b)) = (Self::as_f64(left), Self::as_f64(right)) {
            return a == b;
        }

        Self::to_text(left) == Self::to_text(right)
    }

    fn numeric<F>(left: &Value, right: &Value, cmp: F) -> bool
    where
        F: Fn(f64, f64) -> bool,
    {
        match (Self::as_f64(left), Self::as_f64(right)) {
            (Some(a), Some(b)) => cmp(a, b),
            _ => false,
        }
    }

    fn contains_ci(haystack: &Value, needle: &Value) -> bool {
        Self::to_text(haystack)
            .to_lowercase()
            .contains(&Self::to_text(needle).to_lowercase())
    }

    /// 尝试将 Value 转换为 f64（空字符串、NaN 和无穷大不算数字）
    pub fn as_f64(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
            }
            _ => None,
        }
    }

    /// 值的字符串表示
    ///
    /// 字符串原样返回；数字、布尔、null、数组和对象使用紧凑 JSON 文本。
    pub fn to_text(value: &Value) -> Cow<'_, str> {
        match value {
            Value::String(s) => Cow::Borrowed(s.as_str()),
            other => Cow::Owned(other.to_string()),
        }
    }
}
