//! 规则引擎错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("规则解析失败: {0}")]
    ParseError(String),

    #[error("规则结构无效: {rule_id} - {message}")]
    InvalidShape { rule_id: String, message: String },

    #[error("交易记录必须是 JSON 对象: 第 {index} 条为 {actual}")]
    InvalidTransaction { index: usize, actual: String },

    #[error("规则未找到: {0}")]
    RuleNotFound(String),

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl RuleError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::ParseError(_) => "RULE_PARSE_FAILED",
            Self::InvalidShape { .. } => "RULE_SHAPE_INVALID",
            Self::InvalidTransaction { .. } => "INVALID_TRANSACTION",
            Self::RuleNotFound(_) => "RULE_NOT_FOUND",
            Self::JsonError(_) => "JSON_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;

/// 交易数据源错误
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("数据源传输失败: {0}")]
    Transport(String),

    #[error("实体类型不存在: {0}")]
    UnknownEntity(String),

    #[error("数据源响应格式无效: {0}")]
    InvalidPayload(String),
}

impl SourceError {
    /// 是否为可重试错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = RuleError::InvalidShape {
            rule_id: "r-1".to_string(),
            message: "条件字段不能为空".to_string(),
        };
        assert_eq!(err.code(), "RULE_SHAPE_INVALID");
        assert!(err.to_string().contains("r-1"));
    }

    #[test]
    fn test_invalid_transaction_message() {
        let err = RuleError::InvalidTransaction {
            index: 2,
            actual: "null".to_string(),
        };
        assert_eq!(err.code(), "INVALID_TRANSACTION");
        assert!(err.to_string().contains("第 2 条"));
    }
}
