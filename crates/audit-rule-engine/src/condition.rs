//! 单条件评估

use crate::evaluator::OperatorEvaluator;
use crate::fanout::LineFanOutEvaluator;
use crate::models::Condition;
use crate::path::PathResolver;
use serde_json::Value;

/// 条件评估器
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 评估单个条件
    ///
    /// `Line.` 前缀的字段走明细行展开，其他字段从交易根节点解析。
    pub fn evaluate(transaction: &Value, condition: &Condition) -> bool {
        if condition.line_sub_path().is_some() {
            return LineFanOutEvaluator::evaluate(transaction, condition);
        }

        OperatorEvaluator::compare(
            PathResolver::resolve(transaction, &condition.field),
            &condition.operator,
            &condition.value,
        )
    }
}
