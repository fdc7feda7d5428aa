//! 条件折叠
//!
//! 按顺序从左到右折叠条件结果，每个条件使用自身的逻辑操作符与累加值合并。
//! 没有优先级和分组：`A AND B OR C` 即 `(A AND B) OR C`。
//! 不做短路，每个条件都会被评估。

use crate::condition::ConditionEvaluator;
use crate::models::Condition;
use serde_json::Value;

/// 逻辑合并器
pub struct LogicalCombiner;

impl LogicalCombiner {
    /// 评估条件列表，空列表恒为 true
    pub fn evaluate(transaction: &Value, conditions: &[Condition]) -> bool {
        let Some((first, rest)) = conditions.split_first() else {
            return true;
        };

        let seed = ConditionEvaluator::evaluate(transaction, first);
        rest.iter().fold(seed, |acc, condition| {
            let matched = ConditionEvaluator::evaluate(transaction, condition);
            condition.logical().apply(acc, matched)
        })
    }
}
