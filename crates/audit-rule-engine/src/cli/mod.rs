//! CLI 模块
//!
//! 提供命令行接口，支持以下功能：
//!
//! - `run` - 对交易批次执行规则并输出 JSON 结果
//! - `validate` - 校验规则文件的结构
//!
//! # 使用示例
//!
//! ```bash
//! # 执行启用的规则（交易从 data/Purchase.json 读取）
//! audit-engine run -r rules.json -e Purchase
//!
//! # 指定交易文件，并原样执行所有规则文档
//! audit-engine run -r rules.json -t purchases.json --all
//!
//! # 校验规则
//! audit-engine validate -r rules.json
//! ```

pub mod commands;
pub mod runner;

pub use commands::{Cli, Commands};
pub use runner::{CommandRunner, RuleReport};
