//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。配置按以下顺序叠加，最后统一校验：
//! 默认值 → `--config` 文件 → 命令行选项 → `--set` 覆盖。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `config.rs`, `bands/`, `utils/`
//! - 子模块: list, extract, elements

pub mod elements;
pub mod extract;
pub mod list;

use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::error::Result;

use std::path::Path;

/// 执行命令
pub fn run(cli: Cli) -> Result<()> {
    let config = base_config(cli.config.as_deref())?;
    match cli.command {
        Commands::List(args) => list::execute(args, config),
        Commands::Extract(args) => extract::execute(args, config),
        Commands::Elements(args) => elements::execute(args, config),
    }
}

/// 默认值叠加配置文件
fn base_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Ok(Config::default()),
    }
}

/// 依次应用 `--set` 覆盖并校验
fn finish_config(mut config: Config, overrides: &[String]) -> Result<Config> {
    for assignment in overrides {
        config.apply_override(assignment)?;
    }
    config.validate()?;
    Ok(config)
}
