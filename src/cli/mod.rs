//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `list`: 列出目录下的 `.gpw` 文件
//! - `extract`: 提取能带与态密度，可导出 JSON/CSV/图像
//! - `elements`: 列出可做分波态密度的重复元素
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: list, extract, elements

pub mod elements;
pub mod extract;
pub mod list;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// gpwbands - GPAW 能带与态密度提取工具
#[derive(Parser)]
#[command(name = "gpwbands")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Extract band structures and DOS from GPAW checkpoint files", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// TOML configuration file (defaults < file < flags < --set)
    #[arg(long, global = true, env = "GPWBANDS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// List the .gpw checkpoint files in a directory
    List(list::ListArgs),

    /// Extract band structure and DOS from one checkpoint
    Extract(extract::ExtractArgs),

    /// List elements that occur more than once (PDOS candidates)
    Elements(elements::ElementsArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendKind;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_extract() {
        let cli = Cli::try_parse_from([
            "gpwbands", "--config", "bands.toml", "extract", "calcs", "--index", "2", "--fixed",
            "--path", "GXL", "--npts", "501", "--json", "--backend", "gpaw", "--set",
            "width=0.2", "--set", "timeout=0",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("bands.toml")));
        match cli.command {
            Commands::Extract(args) => {
                assert_eq!(args.dir, PathBuf::from("calcs"));
                assert_eq!(args.index, 2);
                assert!(args.fixed);
                assert_eq!(args.path.as_deref(), Some("GXL"));
                assert_eq!(args.npts, Some(501));
                assert!(args.json);
                assert!(!args.csv);
                assert_eq!(args.backend, Some(BackendKind::Gpaw));
                assert_eq!(args.set, vec!["width=0.2", "timeout=0"]);
            }
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn test_extract_requires_index() {
        assert!(Cli::try_parse_from(["gpwbands", "extract", "calcs"]).is_err());
    }
}
