//! 匹配证据提取
//!
//! 对已命中的交易，为规则中的每个条件（无论该条件自身是否为 true）
//! 重建实际值及其上下文，形成完整的审计轨迹。

use crate::fanout::LineFanOutEvaluator;
use crate::models::{Condition, FlaggedFieldData, MatchEvidence};
use crate::path::PathResolver;
use serde_json::Value;

/// 证据提取器
pub struct EvidenceExtractor;

impl EvidenceExtractor {
    /// 为所有条件提取证据
    pub fn extract_all(transaction: &Value, conditions: &[Condition]) -> Vec<MatchEvidence> {
        conditions
            .iter()
            .map(|condition| Self::extract(transaction, condition))
            .collect()
    }

    /// 为单个条件提取证据
    pub fn extract(transaction: &Value, condition: &Condition) -> MatchEvidence {
        let (actual_value, flagged_field_data) = match condition.line_sub_path() {
            Some(sub_path) => Self::line_evidence(transaction, condition, sub_path),
            None => Self::field_evidence(transaction, &condition.field),
        };

        MatchEvidence {
            field: condition.field.clone(),
            operator: condition.operator.clone(),
            value: condition.value.clone(),
            actual_value,
            flagged_field_data,
        }
    }

    /// 明细行字段：重新扫描找到首个命中的行
    fn line_evidence(
        transaction: &Value,
        condition: &Condition,
        sub_path: &str,
    ) -> (Value, FlaggedFieldData) {
        let matched = LineFanOutEvaluator::first_match(transaction, condition).and_then(|index| {
            LineFanOutEvaluator::lines(transaction)
                .and_then(|lines| lines.get(index))
                .map(|line| (index, line))
        });

        match matched {
            Some((index, line)) => (
                Self::owned(PathResolver::resolve(line, sub_path)),
                FlaggedFieldData::Line {
                    line_index: Some(index),
                    line_data: Some(line.clone()),
                    line_field: sub_path.to_string(),
                },
            ),
            None => (
                Value::Null,
                FlaggedFieldData::Line {
                    line_index: None,
                    line_data: None,
                    line_field: sub_path.to_string(),
                },
            ),
        }
    }

    /// 普通字段：父对象、叶子字段名和叶子值
    fn field_evidence(transaction: &Value, field: &str) -> (Value, FlaggedFieldData) {
        let actual_value = Self::owned(PathResolver::resolve(transaction, field));
        let (parent_path, field_name) = PathResolver::split_parent(field);

        let parent_object = match parent_path {
            Some(path) => Self::owned(PathResolver::resolve(transaction, path)),
            None => transaction.clone(),
        };

        (
            actual_value.clone(),
            FlaggedFieldData::Field {
                parent_object,
                field_name: field_name.to_string(),
                field_value: actual_value,
            },
        )
    }

    fn owned(value: Option<&Value>) -> Value {
        value.cloned().unwrap_or(Value::Null)
    }
}
