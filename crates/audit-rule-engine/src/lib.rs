//! 审计规则引擎
//!
//! 针对嵌套的业务交易记录批量评估审计规则，支持：
//! - 点号路径字段解析（数字路径段作为数组下标）
//! - `Line.` 明细行的存在量化展开
//! - 按条件顺序从左到右的逻辑折叠（无优先级）
//! - 每个条件的匹配证据重建
//! - 单规则执行与多规则顺序批量执行

pub mod batch;
pub mod cli;
pub mod combiner;
pub mod condition;
pub mod error;
pub mod evaluator;
pub mod evidence;
pub mod executor;
pub mod fanout;
pub mod models;
pub mod operators;
pub mod path;
pub mod source;
pub mod store;
pub mod validator;

pub use batch::BatchOrchestrator;
pub use combiner::LogicalCombiner;
pub use condition::ConditionEvaluator;
pub use error::{Result, RuleError, SourceError};
pub use evaluator::OperatorEvaluator;
pub use evidence::EvidenceExtractor;
pub use executor::RuleEngine;
pub use fanout::LineFanOutEvaluator;
pub use models::{
    BatchExecutionResult, BatchSummary, Condition, ExecutionSummary, FlaggedFieldData,
    FlaggedTransaction, MatchEvidence, Provenance, Rule, RuleAction, RuleExecutionData,
    RuleExecutionResult, TransactionRecord,
};
pub use operators::{LogicalOperator, Operator};
pub use path::PathResolver;
pub use source::{JsonFileSource, StaticSource, TransactionSource};
pub use store::{InMemoryRuleRepository, RuleRepository};
pub use validator::RuleValidator;
