//! 明细行展开评估
//!
//! `Line.` 前缀的字段针对交易的 `Line` 数组做存在量化：任一明细行满足即为 true。
//! 不提供"全部明细行满足"的模式。

use crate::evaluator::OperatorEvaluator;
use crate::models::{Condition, LINE_FIELD};
use crate::path::PathResolver;
use serde_json::Value;

/// 明细行展开评估器
pub struct LineFanOutEvaluator;

impl LineFanOutEvaluator {
    /// 交易的明细行数组，`Line` 缺失或不是数组时返回 None
    pub fn lines(transaction: &Value) -> Option<&Vec<Value>> {
        transaction.get(LINE_FIELD)?.as_array()
    }

    /// 单个明细行是否满足条件
    pub fn line_matches(line: &Value, sub_path: &str, condition: &Condition) -> bool {
        OperatorEvaluator::compare(
            PathResolver::resolve(line, sub_path),
            &condition.operator,
            &condition.value,
        )
    }

    /// 首个满足条件的明细行下标
    ///
    /// 条件不是明细行字段，或 `Line` 不是数组时返回 None。
    pub fn first_match(transaction: &Value, condition: &Condition) -> Option<usize> {
        let sub_path = condition.line_sub_path()?;
        Self::lines(transaction)?
            .iter()
            .position(|line| Self::line_matches(line, sub_path, condition))
    }

    /// 任一明细行满足条件
    pub fn evaluate(transaction: &Value, condition: &Condition) -> bool {
        Self::first_match(transaction, condition).is_some()
    }
}
