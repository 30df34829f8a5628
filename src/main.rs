//! # gpwbands - GPAW 能带与态密度提取工具
//!
//! 读取 GPAW `.gpw` 检查点，提取沿 k 路径的能带与态密度，
//! 整理成绘图用数组并可导出为 JSON / CSV / 图像。
//!
//! ## 子命令
//! - `list` - 列出目录下的检查点文件
//! - `extract` - 提取能带与态密度
//! - `elements` - 列出可做分波态密度的元素
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── bands/     (提取、态密度、标签、导出)
//!   │     ├── backend/   (求解器边界: native / gpaw)
//!   │     ├── parsers/   (ULM / .gpw 读取)
//!   │     └── models/    (数据模型)
//!   ├── config.rs   (配置叠加与校验)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod backend;
mod bands;
mod cli;
mod commands;
mod config;
mod error;
mod models;
mod parsers;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
