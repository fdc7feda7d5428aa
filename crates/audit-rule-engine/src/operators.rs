//! 规则操作符定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 条件操作符
///
/// 封闭的比较操作符集合。无法识别的操作符原样保留为 `Unknown`，
/// 评估时恒为 false，并在证据中按原文回显。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    // 通用比较
    Eq,
    Ne,

    // 数值比较
    Gt,
    Lt,

    // 包含检查
    Contains,
    NotContains,
    In,
    NotIn,

    Unknown(String),
}

impl Operator {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Unknown(s) => s,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<&str> for Operator {
    fn from(s: &str) -> Self {
        match s {
            "eq" => Self::Eq,
            "ne" => Self::Ne,
            "gt" => Self::Gt,
            "lt" => Self::Lt,
            "contains" => Self::Contains,
            "not_contains" => Self::NotContains,
            "in" => Self::In,
            "not_in" => Self::NotIn,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<String> for Operator {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        match op {
            Operator::Unknown(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 逻辑操作符
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    #[default]
    #[serde(alias = "and")]
    And,
    #[serde(alias = "or")]
    Or,
}

impl LogicalOperator {
    /// 将当前条件结果合并到累加值
    pub fn apply(self, acc: bool, value: bool) -> bool {
        match self {
            Self::And => acc && value,
            Self::Or => acc || value,
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_parse_known() {
        let op: Operator = serde_json::from_str(r#""not_contains""#).unwrap();
        assert_eq!(op, Operator::NotContains);
        assert_eq!(serde_json::to_string(&Operator::NotIn).unwrap(), r#""not_in""#);
    }

    #[test]
    fn test_operator_unknown_preserved() {
        let op: Operator = serde_json::from_str(r#""gte""#).unwrap();
        assert_eq!(op, Operator::Unknown("gte".to_string()));
        assert!(!op.is_known());
        assert_eq!(serde_json::to_string(&op).unwrap(), r#""gte""#);
        assert_eq!(op.to_string(), "gte");
    }

    #[test]
    fn test_logical_operator() {
        let op: LogicalOperator = serde_json::from_str(r#""OR""#).unwrap();
        assert_eq!(op, LogicalOperator::Or);
        let op: LogicalOperator = serde_json::from_str(r#""and""#).unwrap();
        assert_eq!(op, LogicalOperator::And);
        assert_eq!(LogicalOperator::default(), LogicalOperator::And);

        assert!(LogicalOperator::Or.apply(false, true));
        assert!(!LogicalOperator::And.apply(true, false));
    }
}
