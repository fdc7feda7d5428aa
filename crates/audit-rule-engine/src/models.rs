//! 规则引擎领域模型

use crate::operators::{LogicalOperator, Operator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// 明细行集合的字段名
pub const LINE_FIELD: &str = "Line";

/// 明细行路径前缀（`Line.`）
pub const LINE_PREFIX: &str = "Line.";

/// 交易记录：不透明的 JSON 对象
pub type TransactionRecord = Value;

/// 规则动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Flag,
    Approve,
    Review,
    Reject,
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Flag => "flag",
            Self::Approve => "approve",
            Self::Review => "review",
            Self::Reject => "reject",
        };
        write!(f, "{}", s)
    }
}

/// 规则来源信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    /// 生成规则的原始指令文本
    #[serde(default)]
    pub original_instruction: String,
    #[serde(default)]
    pub created_by: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Default for Provenance {
    fn default() -> Self {
        Self {
            original_instruction: String::new(),
            created_by: String::new(),
            created_at: Utc::now(),
        }
    }
}

fn default_version() -> u32 {
    1
}

fn default_confidence() -> f64 {
    1.0
}

fn default_active() -> bool {
    true
}

/// 审计规则定义
///
/// 创建后不可变，仅 `is_active` 和 `updated_at` 允许修改。
/// 新版本是一条新规则（新 ID、版本号加一、相同的 `rule_type`）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    #[serde(default = "default_version")]
    pub version: u32,
    pub rule_type: String,
    /// 条件顺序有语义：按从左到右折叠
    pub conditions: Vec<Condition>,
    pub action: RuleAction,
    pub reason: String,
    #[serde(default = "default_confidence")]
    pub confidence_score: f64,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub provenance: Provenance,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Rule {
    pub fn new(
        rule_type: impl Into<String>,
        conditions: Vec<Condition>,
        action: RuleAction,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            version: 1,
            rule_type: rule_type.into(),
            conditions,
            action,
            reason: reason.into(),
            confidence_score: 1.0,
            is_active: true,
            provenance: Provenance::default(),
            updated_at: Utc::now(),
        }
    }

    /// 生成同一谱系的下一个版本
    pub fn next_version(&self, conditions: Vec<Condition>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            version: self.version + 1,
            rule_type: self.rule_type.clone(),
            conditions,
            action: self.action,
            reason: self.reason.clone(),
            confidence_score: self.confidence_score,
            is_active: true,
            provenance: Provenance {
                created_at: now,
                ..self.provenance.clone()
            },
            updated_at: now,
        }
    }
}

/// 条件节点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
    /// 从第二个条件起生效，缺省按 AND 处理
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_operator: Option<LogicalOperator>,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: impl Into<Operator>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
            logical_operator: None,
        }
    }

    pub fn with_logical_operator(mut self, op: LogicalOperator) -> Self {
        self.logical_operator = Some(op);
        self
    }

    pub fn and(self) -> Self {
        self.with_logical_operator(LogicalOperator::And)
    }

    pub fn or(self) -> Self {
        self.with_logical_operator(LogicalOperator::Or)
    }

    /// 明细行字段的子路径（去掉 `Line.` 前缀），非明细行字段返回 None
    pub fn line_sub_path(&self) -> Option<&str> {
        self.field.strip_prefix(LINE_PREFIX)
    }

    pub fn logical(&self) -> LogicalOperator {
        self.logical_operator.unwrap_or_default()
    }
}

/// 命中字段的上下文
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlaggedFieldData {
    /// 明细行字段：首个命中的行号及整行数据
    Line {
        line_index: Option<usize>,
        line_data: Option<Value>,
        line_field: String,
    },
    /// 普通字段：父对象、叶子字段名和叶子值
    Field {
        parent_object: Value,
        field_name: String,
        field_value: Value,
    },
}

/// 匹配证据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchEvidence {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
    pub actual_value: Value,
    pub flagged_field_data: FlaggedFieldData,
}

/// 被标记的交易
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlaggedTransaction {
    pub id: Value,
    pub transaction_data: Value,
    pub matched_conditions: Vec<MatchEvidence>,
    pub action: RuleAction,
    pub reason: String,
    pub flagged_at: DateTime<Utc>,
}

/// 执行统计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub total_checked: usize,
    pub flagged_count: usize,
    pub execution_time: String,
    pub flag_rate: String,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl ExecutionSummary {
    pub fn new(total_checked: usize, flagged_count: usize, elapsed: Duration) -> Self {
        Self {
            total_checked,
            flagged_count,
            execution_time: format_duration(elapsed),
            flag_rate: format_flag_rate(flagged_count, total_checked),
            elapsed,
        }
    }

    pub fn empty() -> Self {
        Self::new(0, 0, Duration::ZERO)
    }
}

/// 标记率：保留两位小数的百分比，无交易时为 "0%"
pub fn format_flag_rate(flagged: usize, total: usize) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    format!("{:.2}%", flagged as f64 / total as f64 * 100.0)
}

pub fn format_duration(elapsed: Duration) -> String {
    format!("{}ms", elapsed.as_millis())
}

/// 单条规则的执行数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleExecutionData {
    pub rule_id: String,
    pub rule_type: String,
    pub entity: String,
    pub total_transactions: usize,
    pub flagged_transactions: Vec<FlaggedTransaction>,
    pub execution_summary: ExecutionSummary,
}

/// 单条规则的执行结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleExecutionResult {
    pub success: bool,
    pub data: Option<RuleExecutionData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RuleExecutionResult {
    pub fn ok(data: RuleExecutionData) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// 批量执行汇总
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_rules: usize,
    pub successful_rules: usize,
    pub failed_rules: usize,
    pub total_transactions_checked: usize,
    pub total_flagged: usize,
    pub total_execution_time: String,
}

/// 批量执行结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchExecutionResult {
    pub success: bool,
    #[serde(default)]
    pub results: Vec<RuleExecutionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<BatchSummary>,
    pub executed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchExecutionResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            results: Vec::new(),
            summary: None,
            executed_at: Utc::now(),
            error: Some(error.into()),
        }
    }
}
