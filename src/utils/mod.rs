//! # 工具函数模块
//!
//! 提供美化输出与进度提示。
//!
//! ## 依赖关系
//! - 被 `commands/` 与 `bands/extractor.rs` 使用
//! - 子模块: output, progress

pub mod output;
pub mod progress;
