//! 审计规则引擎命令行入口
//!
//! 加载配置、初始化日志，然后分派子命令。结果以 JSON 输出到 stdout，日志写入 stderr。

use anyhow::{Result, bail};
use audit_shared::config::AppConfig;
use audit_shared::observability;
use clap::Parser;
use rule_engine::cli::{Cli, CommandRunner, Commands};
use tracing::{info, warn};

const SERVICE_NAME: &str = "audit-engine";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 统一加载配置：从 config/{service_name}.toml 加载，包含可观测性配置
    let config = AppConfig::load(SERVICE_NAME).unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    let mut obs_config = config.observability.clone();
    if let Some(level) = &cli.log_level {
        obs_config = obs_config.with_log_level(level);
    }
    observability::init(&config.service_name, &obs_config)?;

    let runner = CommandRunner::new(config);

    match cli.command {
        Commands::Run {
            rules,
            entity,
            transactions,
            all,
        } => {
            let result = runner
                .run_rules(&rules, entity, transactions.as_deref(), all)
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);

            if !result.success {
                bail!(
                    "批量执行失败: {}",
                    result.error.unwrap_or_else(|| "未知错误".to_string())
                );
            }
        }
        Commands::Validate { rules } => {
            let reports = runner.run_validate(&rules).await?;
            println!("{}", serde_json::to_string_pretty(&reports)?);

            let invalid = reports.iter().filter(|r| !r.valid).count();
            if invalid > 0 {
                warn!(invalid, total = reports.len(), "规则校验未通过");
                bail!("{} 条规则无效", invalid);
            }
            info!(total = reports.len(), "规则校验通过");
        }
    }

    Ok(())
}
