//! 多规则批量执行
//!
//! 按数组顺序逐条执行规则，所有规则共用同一批交易。
//! 单条规则失败只体现在该规则自己的结果中，不影响其他规则；
//! 无法载入的规则文档同样以失败结果出现，不会从批量结果中消失。

use crate::error::{Result, RuleError};
use crate::executor::{RuleEngine, type_name};
use crate::models::{
    BatchExecutionResult, BatchSummary, Rule, RuleExecutionResult, format_duration,
};
use crate::store::{InMemoryRuleRepository, RuleRepository};
use chrono::Utc;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// 批量执行器
#[derive(Debug, Clone, Default)]
pub struct BatchOrchestrator {
    engine: RuleEngine,
}

impl BatchOrchestrator {
    pub fn new(engine: RuleEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    /// 顺序执行多条规则
    #[instrument(skip(self, rules, transactions), fields(rules = rules.len(), transactions = transactions.len()))]
    pub fn execute_multiple_rules(
        &self,
        rules: &[Rule],
        entity: &str,
        transactions: &[Value],
    ) -> BatchExecutionResult {
        let results: Vec<RuleExecutionResult> = rules
            .iter()
            .map(|rule| self.engine.execute_rule(rule, entity, transactions))
            .collect();

        Self::finish(results)
    }

    /// 执行 JSON 形式的规则列表
    ///
    /// 规则列表本身不是数组时返回顶层失败结果；
    /// 单个元素无法解析为规则时，该元素对应一条失败结果。
    #[instrument(skip(self, rules, transactions), fields(transactions = transactions.len()))]
    pub fn execute_rule_documents(
        &self,
        rules: &Value,
        entity: &str,
        transactions: &[Value],
    ) -> BatchExecutionResult {
        let documents = match Self::rule_list(rules) {
            Ok(documents) => documents,
            Err(e) => {
                warn!(error = %e, "规则列表无效，批量执行终止");
                return BatchExecutionResult::failed(e.to_string());
            }
        };

        let results = documents
            .iter()
            .enumerate()
            .map(|(i, document)| match serde_json::from_value::<Rule>(document.clone()) {
                Ok(rule) => self.engine.execute_rule(&rule, entity, transactions),
                Err(e) => {
                    warn!(index = i, error = %e, "规则解析失败");
                    RuleExecutionResult::failed(
                        RuleError::ParseError(format!("rules[{}]: {}", i, e)).to_string(),
                    )
                }
            })
            .collect();

        Self::finish(results)
    }

    /// 将规则文档载入仓库后执行各谱系的启用版本
    ///
    /// 解析或校验失败的文档不会进入仓库，它们各自以失败结果追加在启用规则的结果之后，
    /// 并计入 `failed_rules`。规则列表本身不是数组时返回顶层失败结果。
    #[instrument(skip(self, repository, rules, transactions), fields(transactions = transactions.len()))]
    pub fn execute_active_documents(
        &self,
        repository: &InMemoryRuleRepository,
        rules: &Value,
        entity: &str,
        transactions: &[Value],
    ) -> BatchExecutionResult {
        let documents = match Self::rule_list(rules) {
            Ok(documents) => documents,
            Err(e) => {
                warn!(error = %e, "规则列表无效，批量执行终止");
                return BatchExecutionResult::failed(e.to_string());
            }
        };

        let outcome = repository.load_documents(documents);

        let mut results: Vec<RuleExecutionResult> = repository
            .active_rules()
            .iter()
            .map(|rule| self.engine.execute_rule(rule, entity, transactions))
            .collect();

        results.extend(outcome.rejected.into_iter().map(|rejected| {
            warn!(index = rejected.index, error = %rejected.error, "规则文档被拒绝");
            RuleExecutionResult::failed(rejected.error.to_string())
        }));

        Self::finish(results)
    }

    fn rule_list(rules: &Value) -> Result<&Vec<Value>> {
        rules.as_array().ok_or_else(|| {
            RuleError::ParseError(format!("规则列表必须是数组，当前为 {}", type_name(rules)))
        })
    }

    /// 汇总各规则结果
    fn finish(results: Vec<RuleExecutionResult>) -> BatchExecutionResult {
        let mut summary = BatchSummary {
            total_rules: results.len(),
            ..Default::default()
        };
        let mut total_elapsed = Duration::ZERO;

        for result in &results {
            match &result.data {
                Some(data) if result.success => {
                    summary.successful_rules += 1;
                    summary.total_transactions_checked += data.execution_summary.total_checked;
                    summary.total_flagged += data.execution_summary.flagged_count;
                    total_elapsed += data.execution_summary.elapsed;
                }
                _ => summary.failed_rules += 1,
            }
        }
        summary.total_execution_time = format_duration(total_elapsed);

        info!(
            total_rules = summary.total_rules,
            successful_rules = summary.successful_rules,
            failed_rules = summary.failed_rules,
            total_flagged = summary.total_flagged,
            "批量执行完成"
        );

        BatchExecutionResult {
            success: true,
            results,
            summary: Some(summary),
            executed_at: Utc::now(),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Condition, RuleAction};
    use serde_json::json;

    fn transactions() -> Vec<Value> {
        vec![
            json!({"Id": "1", "TotalAmt": "600", "PaymentType": "Cash"}),
            json!({"Id": "2", "TotalAmt": "100", "PaymentType": "CreditCard"}),
            json!({"Id": "3", "TotalAmt": "50", "PaymentType": "Cash"}),
        ]
    }

    #[test]
    fn test_sequential_rules_share_batch() {
        let rules = vec![
            Rule::new("high", vec![Condition::new("TotalAmt", "gt", 500)], RuleAction::Flag, "大额"),
            Rule::new("cash", vec![Condition::new("PaymentType", "eq", "Cash")], RuleAction::Review, "现金"),
        ];

        let result = BatchOrchestrator::default().execute_multiple_rules(&rules, "Purchase", &transactions());
        assert!(result.success);
        assert_eq!(result.results.len(), 2);
        assert_eq!(result.results[0].data.as_ref().unwrap().rule_id, rules[0].id);
        assert_eq!(result.results[1].data.as_ref().unwrap().rule_id, rules[1].id);

        let summary = result.summary.unwrap();
        assert_eq!(summary.total_rules, 2);
        assert_eq!(summary.successful_rules, 2);
        assert_eq!(summary.failed_rules, 0);
        assert_eq!(summary.total_transactions_checked, 6);
        assert_eq!(summary.total_flagged, 3);
        assert!(summary.total_execution_time.ends_with("ms"));
    }

    #[test]
    fn test_failed_rule_is_isolated() {
        let mut broken = Rule::new("broken", vec![Condition::new("TotalAmt", "gt", 0)], RuleAction::Flag, "");
        broken.conditions[0].field = "TotalAmt..x".to_string();
        let rules = vec![
            Rule::new("high", vec![Condition::new("TotalAmt", "gt", 500)], RuleAction::Flag, "大额"),
            broken,
            Rule::new("cash", vec![Condition::new("PaymentType", "eq", "Cash")], RuleAction::Review, "现金"),
        ];

        let result = BatchOrchestrator::default().execute_multiple_rules(&rules, "Purchase", &transactions());
        assert!(result.success);
        assert_eq!(result.results.len(), 3);
        assert!(result.results[0].success);
        assert!(!result.results[1].success);
        assert!(result.results[1].data.is_none());
        assert!(result.results[2].success);

        let summary = result.summary.unwrap();
        assert_eq!(summary.successful_rules, 2);
        assert_eq!(summary.failed_rules, 1);
        assert_eq!(summary.total_flagged, 3);
    }

    #[test]
    fn test_empty_rule_list() {
        let result = BatchOrchestrator::default().execute_multiple_rules(&[], "Purchase", &transactions());
        assert!(result.success);
        let summary = result.summary.unwrap();
        assert_eq!(summary.total_rules, 0);
        assert_eq!(summary.total_execution_time, "0ms");
    }

    #[test]
    fn test_rule_documents_not_an_array() {
        let result = BatchOrchestrator::default().execute_rule_documents(
            &json!({"id": "r"}),
            "Purchase",
            &transactions(),
        );
        assert!(!result.success);
        assert!(result.results.is_empty());
        assert!(result.summary.is_none());
        assert!(result.error.unwrap().contains("object"));
    }

    #[test]
    fn test_rule_documents_with_malformed_entry() {
        let rules = json!([
            {"id": "r1", "rule_type": "high", "conditions": [{"field": "TotalAmt", "operator": "gt", "value": 500}], "action": "flag", "reason": "大额"},
            {"id": "r2", "conditions": "oops"},
            {"id": "r3", "rule_type": "all", "conditions": [], "action": "review", "reason": "全部"}
        ]);

        let result = BatchOrchestrator::default().execute_rule_documents(&rules, "Purchase", &transactions());
        assert!(result.success);
        assert_eq!(result.results.len(), 3);
        assert!(result.results[0].success);
        assert!(!result.results[1].success);
        assert!(result.results[1].error.as_ref().unwrap().contains("rules[1]"));
        assert!(result.results[2].success);

        let summary = result.summary.unwrap();
        assert_eq!(summary.failed_rules, 1);
        assert_eq!(summary.total_flagged, 4);
    }

    #[test]
    fn test_active_documents_keep_rejected_entries() {
        let rules = json!([
            {"id": "high-v2", "version": 2, "rule_type": "high", "conditions": [{"field": "TotalAmt", "operator": "gt", "value": 500}], "action": "flag", "reason": "大额"},
            {"id": "high-v1", "version": 1, "rule_type": "high", "conditions": [{"field": "TotalAmt", "operator": "gt", "value": 10}], "action": "flag", "reason": "旧版本"},
            {"id": "bad-shape", "rule_type": "x", "conditions": [{"field": "", "operator": "eq", "value": 1}], "action": "flag", "reason": ""},
            {"id": "bad-json", "conditions": "oops"}
        ]);

        let repo = InMemoryRuleRepository::new();
        let result = BatchOrchestrator::default().execute_active_documents(
            &repo,
            &rules,
            "Purchase",
            &transactions(),
        );

        assert!(result.success);
        assert_eq!(result.results.len(), 3);
        assert_eq!(result.results[0].data.as_ref().unwrap().rule_id, "high-v2");
        assert!(result.results[1].error.as_ref().unwrap().contains("bad-shape"));
        assert!(result.results[2].error.as_ref().unwrap().contains("rules[3]"));

        let summary = result.summary.unwrap();
        assert_eq!(summary.total_rules, 3);
        assert_eq!(summary.successful_rules, 1);
        assert_eq!(summary.failed_rules, 2);
        assert_eq!(summary.total_flagged, 1);
    }

    #[test]
    fn test_active_documents_not_an_array() {
        let result = BatchOrchestrator::default().execute_active_documents(
            &InMemoryRuleRepository::new(),
            &json!("rules"),
            "Purchase",
            &transactions(),
        );
        assert!(!result.success);
        assert!(result.summary.is_none());
    }
}
