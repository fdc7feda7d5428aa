//! CLI 命令定义
//!
//! 使用 clap derive 宏定义命令行接口结构。

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// 审计规则引擎命令行工具
#[derive(Parser, Debug)]
#[command(name = "audit-engine")]
#[command(version, about = "交易审计规则执行工具")]
#[command(propagate_version = true)]
pub struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)，覆盖配置文件
    #[arg(short, long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// 子命令枚举
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 对交易批次执行规则
    ///
    /// 默认只执行每个谱系中启用的版本；`--all` 时按文件顺序原样执行全部规则文档，
    /// 无法解析的规则会作为失败结果出现在输出中。
    Run {
        /// 规则文件（JSON 数组）
        #[arg(short, long)]
        rules: PathBuf,

        /// 实体类型（如 Purchase、Bill、Invoice），缺省使用配置中的默认值
        #[arg(short, long)]
        entity: Option<String>,

        /// 交易文件，缺省从数据目录读取 `<entity>.json`
        #[arg(short, long)]
        transactions: Option<PathBuf>,

        /// 原样执行全部规则文档
        #[arg(long)]
        all: bool,
    },

    /// 校验规则文件
    Validate {
        /// 规则文件（JSON 数组）
        #[arg(short, long)]
        rules: PathBuf,
    },
}
