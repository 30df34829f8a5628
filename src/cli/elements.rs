//! # elements 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/elements.rs`

use crate::config::BackendKind;
use clap::Args;
use std::path::PathBuf;

/// elements 子命令参数
#[derive(Args, Debug)]
pub struct ElementsArgs {
    /// Directory containing .gpw files
    pub dir: PathBuf,

    /// Index of the file in the listing (see `list`)
    #[arg(short, long)]
    pub index: usize,

    /// Checkpoint reader
    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,

    /// Override a configuration value (repeatable), e.g. --set python=python3.11
    #[arg(long, value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}
