//! 规则结构校验
//!
//! 只校验规则对象的结构是否有效，不校验业务语义（如字段名是否存在于领域模型）。
//! 未知操作符和非数组的 in/not_in 期望值可以通过校验，评估时为 false。

use crate::error::{Result, RuleError};
use crate::models::{Condition, Rule};
use std::collections::BTreeSet;

/// 规则校验器
pub struct RuleValidator;

impl RuleValidator {
    /// 从 JSON 字符串解析并校验规则
    pub fn parse(json: &str) -> Result<Rule> {
        let rule: Rule = serde_json::from_str(json)?;
        Self::validate(&rule)?;
        Ok(rule)
    }

    /// 从 JSON 字符串解析并校验规则列表
    pub fn parse_list(json: &str) -> Result<Vec<Rule>> {
        let rules: Vec<Rule> = serde_json::from_str(json)?;
        for rule in &rules {
            Self::validate(rule)?;
        }
        Ok(rules)
    }

    /// 校验规则结构
    pub fn validate(rule: &Rule) -> Result<()> {
        if rule.id.trim().is_empty() {
            return Err(Self::invalid(rule, "规则 ID 不能为空"));
        }

        if rule.rule_type.trim().is_empty() {
            return Err(Self::invalid(rule, "rule_type 不能为空"));
        }

        if rule.version == 0 {
            return Err(Self::invalid(rule, "版本号必须为正整数"));
        }

        if !rule.confidence_score.is_finite() || !(0.0..=1.0).contains(&rule.confidence_score) {
            return Err(Self::invalid(
                rule,
                format!("confidence_score 必须在 [0, 1] 范围内，当前为 {}", rule.confidence_score),
            ));
        }

        for (i, cond) in rule.conditions.iter().enumerate() {
            Self::validate_condition(rule, cond, i)?;
        }

        Ok(())
    }

    /// 校验条件
    fn validate_condition(rule: &Rule, cond: &Condition, index: usize) -> Result<()> {
        if cond.field.is_empty() {
            return Err(Self::invalid(
                rule,
                format!("条件 conditions[{}] 的字段不能为空", index),
            ));
        }

        if cond.field.split('.').any(str::is_empty) {
            return Err(Self::invalid(
                rule,
                format!(
                    "条件 conditions[{}] 的字段路径 '{}' 包含空路径段",
                    index, cond.field
                ),
            ));
        }

        Ok(())
    }

    /// 规则引用的所有字段路径
    pub fn referenced_fields(rule: &Rule) -> BTreeSet<String> {
        rule.conditions.iter().map(|c| c.field.clone()).collect()
    }

    fn invalid(rule: &Rule, message: impl Into<String>) -> RuleError {
        RuleError::InvalidShape {
            rule_id: rule.id.clone(),
            message: message.into(),
        }
    }
}
