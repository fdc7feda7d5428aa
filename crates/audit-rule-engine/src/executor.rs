//! 规则执行器
//!
//! 对一批交易执行单条规则，生成被标记交易及其匹配证据和执行统计。
//! 执行过程中的任何错误都在此处转换为失败结果，不会向上传播。

use crate::combiner::LogicalCombiner;
use crate::error::{Result, RuleError};
use crate::evidence::EvidenceExtractor;
use crate::models::{
    ExecutionSummary, FlaggedTransaction, Rule, RuleExecutionData, RuleExecutionResult,
};
use crate::path::PathResolver;
use crate::validator::RuleValidator;
use chrono::Utc;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// 默认的交易标识字段
pub const DEFAULT_ID_FIELD: &str = "Id";

/// 规则执行器
#[derive(Debug, Clone)]
pub struct RuleEngine {
    /// 交易标识字段路径
    id_field: String,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self {
            id_field: DEFAULT_ID_FIELD.to_string(),
        }
    }

    /// 设置交易标识字段
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    /// 对交易批次执行规则
    #[instrument(
        skip(self, rule, transactions),
        fields(rule_id = %rule.id, rule_type = %rule.rule_type, transactions = transactions.len())
    )]
    pub fn execute_rule(
        &self,
        rule: &Rule,
        entity: &str,
        transactions: &[Value],
    ) -> RuleExecutionResult {
        match self.try_execute(rule, entity, transactions) {
            Ok(data) => {
                let summary = &data.execution_summary;
                metrics::counter!("audit_rule_executions_total", "status" => "success").increment(1);
                metrics::counter!("audit_transactions_checked_total")
                    .increment(summary.total_checked as u64);
                metrics::counter!("audit_transactions_flagged_total")
                    .increment(summary.flagged_count as u64);
                metrics::histogram!("audit_rule_execution_duration_seconds")
                    .record(summary.elapsed.as_secs_f64());

                info!(
                    total_checked = summary.total_checked,
                    flagged_count = summary.flagged_count,
                    flag_rate = %summary.flag_rate,
                    execution_time = %summary.execution_time,
                    "规则执行完成"
                );
                RuleExecutionResult::ok(data)
            }
            Err(e) => {
                metrics::counter!("audit_rule_executions_total", "status" => "failure").increment(1);
                warn!(error = %e, code = e.code(), "规则执行失败");
                RuleExecutionResult::failed(e.to_string())
            }
        }
    }

    fn try_execute(
        &self,
        rule: &Rule,
        entity: &str,
        transactions: &[Value],
    ) -> Result<RuleExecutionData> {
        RuleValidator::validate(rule)?;

        if transactions.is_empty() {
            return Ok(Self::build_data(rule, entity, 0, Vec::new(), ExecutionSummary::empty()));
        }

        let start = Instant::now();
        let mut flagged = Vec::new();

        for (index, transaction) in transactions.iter().enumerate() {
            if !transaction.is_object() {
                return Err(RuleError::InvalidTransaction {
                    index,
                    actual: type_name(transaction).to_string(),
                });
            }

            if LogicalCombiner::evaluate(transaction, &rule.conditions) {
                let entry = self.flag(rule, transaction);
                debug!(transaction_id = %entry.id, "交易已标记");
                flagged.push(entry);
            }
        }

        let summary = ExecutionSummary::new(transactions.len(), flagged.len(), start.elapsed());
        Ok(Self::build_data(rule, entity, transactions.len(), flagged, summary))
    }

    /// 生成被标记交易
    fn flag(&self, rule: &Rule, transaction: &Value) -> FlaggedTransaction {
        FlaggedTransaction {
            id: PathResolver::resolve(transaction, &self.id_field)
                .cloned()
                .unwrap_or(Value::Null),
            transaction_data: transaction.clone(),
            matched_conditions: EvidenceExtractor::extract_all(transaction, &rule.conditions),
            action: rule.action,
            reason: rule.reason.clone(),
            flagged_at: Utc::now(),
        }
    }

    fn build_data(
        rule: &Rule,
        entity: &str,
        total: usize,
        flagged_transactions: Vec<FlaggedTransaction>,
        execution_summary: ExecutionSummary,
    ) -> RuleExecutionData {
        RuleExecutionData {
            rule_id: rule.id.clone(),
            rule_type: rule.rule_type.clone(),
            entity: entity.to_string(),
            total_transactions: total,
            flagged_transactions,
            execution_summary,
        }
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// 获取值的类型名称
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
