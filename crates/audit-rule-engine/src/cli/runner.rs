//! 命令执行器
//!
//! 负责执行各 CLI 子命令的具体逻辑：加载规则、拉取交易、调用批量执行器。

use std::path::Path;

use anyhow::{Context, Result};
use audit_shared::config::AppConfig;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::batch::BatchOrchestrator;
use crate::executor::RuleEngine;
use crate::models::{BatchExecutionResult, Rule};
use crate::source::{JsonFileSource, TransactionSource};
use crate::store::InMemoryRuleRepository;
use crate::validator::RuleValidator;

/// 单条规则的校验结果
#[derive(Debug, Clone, Serialize)]
pub struct RuleReport {
    pub index: usize,
    pub rule_id: Option<String>,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 命令执行器
pub struct CommandRunner {
    config: AppConfig,
}

impl CommandRunner {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    fn orchestrator(&self) -> BatchOrchestrator {
        BatchOrchestrator::new(RuleEngine::new().with_id_field(&self.config.engine.id_field))
    }

    /// 执行 run 命令
    pub async fn run_rules(
        &self,
        rules_path: &Path,
        entity: Option<String>,
        transactions_path: Option<&Path>,
        all: bool,
    ) -> Result<BatchExecutionResult> {
        let entity = entity.unwrap_or_else(|| self.config.engine.default_entity.clone());

        let rules_json = tokio::fs::read_to_string(rules_path)
            .await
            .with_context(|| format!("读取规则文件失败: {}", rules_path.display()))?;

        let transactions = match transactions_path {
            Some(path) => JsonFileSource::load_file(path, &entity).await,
            None => JsonFileSource::new(&self.config.source.data_dir).fetch(&entity).await,
        }
        .with_context(|| format!("拉取 {} 交易失败", entity))?;

        info!(entity = %entity, transactions = transactions.len(), all, "开始执行规则");

        let documents: Value =
            serde_json::from_str(&rules_json).context("规则文件不是有效的 JSON")?;

        let orchestrator = self.orchestrator();
        if all {
            return Ok(orchestrator.execute_rule_documents(&documents, &entity, &transactions));
        }

        let repository = InMemoryRuleRepository::new();
        Ok(orchestrator.execute_active_documents(&repository, &documents, &entity, &transactions))
    }

    /// 执行 validate 命令
    pub async fn run_validate(&self, rules_path: &Path) -> Result<Vec<RuleReport>> {
        let content = tokio::fs::read_to_string(rules_path)
            .await
            .with_context(|| format!("读取规则文件失败: {}", rules_path.display()))?;
        let documents: Vec<Value> =
            serde_json::from_str(&content).context("规则文件必须是 JSON 数组")?;

        Ok(documents.into_iter().enumerate().map(|(i, doc)| validate_document(i, doc)).collect())
    }
}

fn validate_document(index: usize, document: Value) -> RuleReport {
    let rule_id = document.get("id").and_then(Value::as_str).map(str::to_string);

    let outcome = serde_json::from_value::<Rule>(document)
        .map_err(|e| e.to_string())
        .and_then(|rule| RuleValidator::validate(&rule).map_err(|e| e.to_string()));

    RuleReport {
        index,
        rule_id,
        valid: outcome.is_ok(),
        error: outcome.err(),
    }
}
