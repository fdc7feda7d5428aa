//! 规则存储管理
//!
//! 规则仓库抽象及基于 DashMap 的线程安全内存实现。
//! 执行引擎本身不访问仓库，只接收调用方传入的规则对象。

use crate::error::{Result, RuleError};
use crate::models::Rule;
use crate::validator::RuleValidator;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// 规则仓库
pub trait RuleRepository: Send + Sync {
    /// 所有规则，按 rule_type、版本号、ID 排序
    fn list(&self) -> Vec<Rule>;

    fn get(&self, rule_id: &str) -> Option<Rule>;

    /// 写入规则（同 ID 覆盖）
    fn put(&self, rule: Rule) -> Result<()>;

    fn delete(&self, rule_id: &str) -> Result<()>;

    /// 所有启用的规则
    fn active_rules(&self) -> Vec<Rule> {
        self.list().into_iter().filter(|r| r.is_active).collect()
    }
}

/// 被拒绝的规则文档
#[derive(Debug)]
pub struct RejectedRule {
    /// 文档在输入数组中的下标
    pub index: usize,
    pub rule_id: Option<String>,
    pub error: RuleError,
}

/// 批量加载结果
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub loaded: Vec<String>,
    pub rejected: Vec<RejectedRule>,
}

/// 内存规则仓库
///
/// 写入启用的规则时，同一 rule_type 谱系下版本号不高于它的启用规则会被停用；
/// 若谱系中已有更高版本启用，新写入的规则按停用状态存入。
/// 每个谱系最多只有一个启用版本，且总是已启用版本中最新的那个。
#[derive(Clone, Default)]
pub struct InMemoryRuleRepository {
    rules: Arc<DashMap<String, Rule>>,
    /// 串行化写入，保证谱系停用与插入的原子性
    write_lock: Arc<Mutex<()>>,
}

impl InMemoryRuleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取当前存储的规则数量
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// 检查存储是否为空
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 从 JSON 数组批量加载规则
    ///
    /// 单条规则解析或校验失败不会中断加载，只记录警告。
    #[instrument(skip(self, json))]
    pub fn load_from_json(&self, json: &str) -> Result<Vec<String>> {
        let documents: Vec<Value> = serde_json::from_str(json)?;
        Ok(self.load_documents(&documents).loaded)
    }

    /// 逐条加载规则文档
    ///
    /// 返回成功写入的规则 ID，以及每条被拒绝文档的下标和原因。
    pub fn load_documents(&self, documents: &[Value]) -> LoadOutcome {
        let mut outcome = LoadOutcome::default();

        for (index, document) in documents.iter().enumerate() {
            let rule_id = document.get("id").and_then(Value::as_str).map(str::to_string);

            let result = serde_json::from_value::<Rule>(document.clone())
                .map_err(|e| RuleError::ParseError(format!("rules[{}]: {}", index, e)))
                .and_then(|rule| {
                    let id = rule.id.clone();
                    self.put(rule).map(|()| id)
                });

            match result {
                Ok(id) => outcome.loaded.push(id),
                Err(error) => outcome.rejected.push(RejectedRule {
                    index,
                    rule_id,
                    error,
                }),
            }
        }

        if !outcome.rejected.is_empty() {
            warn!("批量加载部分失败: {:?}", outcome.rejected);
        }

        info!(
            "批量加载完成: {} 成功, {} 失败",
            outcome.loaded.len(),
            outcome.rejected.len()
        );
        outcome
    }

    /// 某个谱系的所有版本，按版本号升序
    pub fn lineage(&self, rule_type: &str) -> Vec<Rule> {
        let mut versions: Vec<Rule> = self
            .rules
            .iter()
            .filter(|r| r.rule_type == rule_type)
            .map(|r| r.value().clone())
            .collect();
        versions.sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.id.cmp(&b.id)));
        versions
    }

    /// 某个谱系的最新版本号
    pub fn latest_version(&self, rule_type: &str) -> Option<u32> {
        self.rules
            .iter()
            .filter(|r| r.rule_type == rule_type)
            .map(|r| r.version)
            .max()
    }

    /// 停用规则
    #[instrument(skip(self))]
    pub fn deactivate(&self, rule_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock();
        match self.rules.get_mut(rule_id) {
            Some(mut rule) => {
                rule.is_active = false;
                rule.updated_at = Utc::now();
                info!("规则已停用: {}", rule_id);
                Ok(())
            }
            None => {
                warn!("停用不存在的规则: {}", rule_id);
                Err(RuleError::RuleNotFound(rule_id.to_string()))
            }
        }
    }
}

impl RuleRepository for InMemoryRuleRepository {
    fn list(&self) -> Vec<Rule> {
        let mut rules: Vec<Rule> = self.rules.iter().map(|r| r.value().clone()).collect();
        rules.sort_by(|a, b| {
            a.rule_type
                .cmp(&b.rule_type)
                .then_with(|| a.version.cmp(&b.version))
                .then_with(|| a.id.cmp(&b.id))
        });
        rules
    }

    fn get(&self, rule_id: &str) -> Option<Rule> {
        self.rules.get(rule_id).map(|r| r.clone())
    }

    #[instrument(skip(self, rule), fields(rule_id = %rule.id, rule_type = %rule.rule_type, version = rule.version))]
    fn put(&self, mut rule: Rule) -> Result<()> {
        RuleValidator::validate(&rule)?;

        let _guard = self.write_lock.lock();

        if rule.is_active {
            let newer_active = self.rules.iter().any(|entry| {
                entry.rule_type == rule.rule_type
                    && entry.id != rule.id
                    && entry.is_active
                    && entry.version > rule.version
            });

            if newer_active {
                // 谱系中已有更高版本启用，旧版本按停用状态存入
                rule.is_active = false;
                rule.updated_at = Utc::now();
                warn!("谱系 {} 已有更高版本启用，规则按停用状态写入", rule.rule_type);
            } else {
                let now = Utc::now();
                for mut entry in self.rules.iter_mut() {
                    if entry.rule_type == rule.rule_type && entry.id != rule.id && entry.is_active {
                        entry.is_active = false;
                        entry.updated_at = now;
                        info!(superseded = %entry.id, "旧版本规则已停用");
                    }
                }
            }
        }

        let rule_id = rule.id.clone();
        self.rules.insert(rule_id.clone(), rule);

        info!("规则已写入: {}", rule_id);
        Ok(())
    }

    #[instrument(skip(self))]
    fn delete(&self, rule_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock();
        if self.rules.remove(rule_id).is_some() {
            info!("规则已删除: {}", rule_id);
            Ok(())
        } else {
            warn!("删除不存在的规则: {}", rule_id);
            Err(RuleError::RuleNotFound(rule_id.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Condition, RuleAction};

    fn sample_rule(id: &str, rule_type: &str) -> Rule {
        Rule {
            id: id.to_string(),
            ..Rule::new(
                rule_type,
                vec![Condition::new("TotalAmt", "gt", 500)],
                RuleAction::Flag,
                "大额交易",
            )
        }
    }

    #[test]
    fn test_put_and_get() {
        let repo = InMemoryRuleRepository::new();
        repo.put(sample_rule("rule-001", "high_value")).unwrap();

        assert_eq!(repo.len(), 1);
        let rule = repo.get("rule-001").unwrap();
        assert_eq!(rule.rule_type, "high_value");
        assert!(repo.get("missing").is_none());
    }

    #[test]
    fn test_put_rejects_invalid_shape() {
        let repo = InMemoryRuleRepository::new();
        let mut rule = sample_rule("rule-001", "high_value");
        rule.conditions[0].field = String::new();

        assert!(repo.put(rule).is_err());
        assert!(repo.is_empty());
    }

    #[test]
    fn test_delete() {
        let repo = InMemoryRuleRepository::new();
        repo.put(sample_rule("rule-001", "high_value")).unwrap();

        repo.delete("rule-001").unwrap();
        assert!(repo.is_empty());
        assert!(matches!(
            repo.delete("rule-001").unwrap_err(),
            RuleError::RuleNotFound(_)
        ));
    }

    #[test]
    fn test_new_version_supersedes_active() {
        let repo = InMemoryRuleRepository::new();
        let v1 = sample_rule("rule-001", "high_value");
        let v2 = v1.next_version(vec![Condition::new("TotalAmt", "gt", 1000)]);
        let v2_id = v2.id.clone();

        repo.put(v1).unwrap();
        repo.put(v2).unwrap();
        repo.put(sample_rule("rule-100", "cash_payment")).unwrap();

        assert!(!repo.get("rule-001").unwrap().is_active);
        assert!(repo.get(&v2_id).unwrap().is_active);
        assert_eq!(repo.latest_version("high_value"), Some(2));
        assert_eq!(repo.latest_version("unknown"), None);

        let lineage = repo.lineage("high_value");
        assert_eq!(lineage.len(), 2);
        assert_eq!(lineage[0].version, 1);
        assert_eq!(lineage[1].version, 2);

        let active: Vec<String> = repo.active_rules().into_iter().map(|r| r.id).collect();
        assert_eq!(active, vec!["rule-100".to_string(), v2_id]);
    }

    #[test]
    fn test_older_version_does_not_supersede_newer() {
        let repo = InMemoryRuleRepository::new();
        let v1 = sample_rule("rule-001", "high_value");
        let v2 = v1.next_version(vec![Condition::new("TotalAmt", "gt", 1000)]);
        let v2_id = v2.id.clone();

        // 版本倒序写入
        repo.put(v2).unwrap();
        repo.put(v1).unwrap();

        let active = repo.active_rules();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, v2_id);
        assert_eq!(active[0].version, 2);

        let stored_v1 = repo.get("rule-001").unwrap();
        assert!(!stored_v1.is_active);
        assert_eq!(repo.lineage("high_value").len(), 2);
    }

    #[test]
    fn test_same_version_later_put_wins() {
        let repo = InMemoryRuleRepository::new();
        repo.put(sample_rule("rule-001", "high_value")).unwrap();
        repo.put(sample_rule("rule-002", "high_value")).unwrap();

        let active: Vec<String> = repo.active_rules().into_iter().map(|r| r.id).collect();
        assert_eq!(active, vec!["rule-002".to_string()]);
    }

    #[test]
    fn test_inactive_put_keeps_current_version() {
        let repo = InMemoryRuleRepository::new();
        repo.put(sample_rule("rule-001", "high_value")).unwrap();

        let mut archived = sample_rule("rule-000", "high_value");
        archived.is_active = false;
        repo.put(archived).unwrap();

        assert!(repo.get("rule-001").unwrap().is_active);
        assert_eq!(repo.active_rules().len(), 1);
    }

    #[test]
    fn test_deactivate() {
        let repo = InMemoryRuleRepository::new();
        repo.put(sample_rule("rule-001", "high_value")).unwrap();

        repo.deactivate("rule-001").unwrap();
        assert!(repo.active_rules().is_empty());
        assert!(repo.deactivate("missing").is_err());
    }

    #[test]
    fn test_load_from_json() {
        let repo = InMemoryRuleRepository::new();
        let json = r#"
        [
            {"id": "r1", "rule_type": "a", "conditions": [], "action": "flag", "reason": "x"},
            {"id": "", "rule_type": "b", "conditions": [], "action": "flag", "reason": "bad"},
            {"id": "r3", "rule_type": "c", "conditions": [], "action": "approve", "reason": "y"}
        ]
        "#;

        let loaded = repo.load_from_json(json).unwrap();
        assert_eq!(loaded, vec!["r1".to_string(), "r3".to_string()]);
        assert_eq!(repo.len(), 2);
    }

    #[test]
    fn test_load_documents_reports_rejections() {
        let repo = InMemoryRuleRepository::new();
        let documents = vec![
            serde_json::json!({"id": "r1", "rule_type": "a", "conditions": [], "action": "flag", "reason": ""}),
            serde_json::json!({"id": "r2", "conditions": "nope"}),
            serde_json::json!({"id": "r3", "rule_type": "c", "conditions": [{"field": "", "operator": "eq", "value": 1}], "action": "flag", "reason": ""}),
        ];

        let outcome = repo.load_documents(&documents);
        assert_eq!(outcome.loaded, vec!["r1".to_string()]);
        assert_eq!(outcome.rejected.len(), 2);

        assert_eq!(outcome.rejected[0].index, 1);
        assert_eq!(outcome.rejected[0].rule_id.as_deref(), Some("r2"));
        assert!(matches!(outcome.rejected[0].error, RuleError::ParseError(_)));

        assert_eq!(outcome.rejected[1].index, 2);
        assert!(matches!(outcome.rejected[1].error, RuleError::InvalidShape { .. }));
        assert_eq!(repo.len(), 1);
    }
}
