//! 交易数据源
//!
//! 为给定实体类型提供有序的交易记录序列。评估开始前一次性拉取，
//! 批量执行中的所有规则共用同一批数据。

use crate::error::SourceError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// 查询响应的外层包装字段
const QUERY_RESPONSE: &str = "QueryResponse";

/// 交易数据源
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// 拉取某个实体类型的全部交易
    async fn fetch(&self, entity: &str) -> Result<Vec<Value>, SourceError>;
}

/// 基于 JSON 文件的数据源
///
/// 读取 `<dir>/<entity>.json`，内容可以是交易数组，
/// 也可以是 `{ "QueryResponse": { "<entity>": [...] } }` 形式的查询响应。
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    dir: PathBuf,
}

impl JsonFileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 直接读取指定文件
    pub async fn load_file(path: &Path, entity: &str) -> Result<Vec<Value>, SourceError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => SourceError::UnknownEntity(entity.to_string()),
            _ => SourceError::Transport(format!("{}: {}", path.display(), e)),
        })?;

        let payload: Value = serde_json::from_str(&content)
            .map_err(|e| SourceError::InvalidPayload(format!("{}: {}", path.display(), e)))?;

        extract_records(entity, payload)
    }
}

#[async_trait]
impl TransactionSource for JsonFileSource {
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    async fn fetch(&self, entity: &str) -> Result<Vec<Value>, SourceError> {
        let path = self.dir.join(format!("{}.json", entity));
        let records = Self::load_file(&path, entity).await?;
        debug!(count = records.len(), "交易数据已加载");
        Ok(records)
    }
}

/// 内存数据源
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    batches: HashMap<String, Vec<Value>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, entity: impl Into<String>, records: Vec<Value>) -> Self {
        self.batches.insert(entity.into(), records);
        self
    }
}

#[async_trait]
impl TransactionSource for StaticSource {
    async fn fetch(&self, entity: &str) -> Result<Vec<Value>, SourceError> {
        self.batches
            .get(entity)
            .cloned()
            .ok_or_else(|| SourceError::UnknownEntity(entity.to_string()))
    }
}

/// 从响应中取出交易数组
fn extract_records(entity: &str, payload: Value) -> Result<Vec<Value>, SourceError> {
    match payload {
        Value::Array(records) => Ok(records),
        Value::Object(mut map) => match map.remove(QUERY_RESPONSE) {
            Some(Value::Object(mut response)) => match response.remove(entity) {
                Some(Value::Array(records)) => Ok(records),
                // 查询无结果时响应中不包含实体字段
                None => Ok(Vec::new()),
                Some(_) => Err(SourceError::InvalidPayload(format!(
                    "{}.{} 不是数组",
                    QUERY_RESPONSE, entity
                ))),
            },
            _ => Err(SourceError::InvalidPayload(format!(
                "缺少 {} 对象",
                QUERY_RESPONSE
            ))),
        },
        _ => Err(SourceError::InvalidPayload(
            "响应必须是数组或对象".to_string(),
        )),
    }
}
