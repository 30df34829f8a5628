//! # 能带提取模块
//!
//! 从计算句柄到可绘图数组的全部步骤。
//!
//! ## 功能
//! - 高对称点表与 k 路径坐标轴 (`kpath`)
//! - 高斯展宽态密度 (`dos`)
//! - 标签 LaTeX 格式化 (`labels`)
//! - 提取与导出 (`extractor`, `export`, `plot`)
//!
//! ## 依赖关系
//! - 被 `commands/` 和 `backend/` 使用
//! - 使用 `models/`, `config.rs`, `utils/`

pub mod dos;
pub mod export;
pub mod extractor;
pub mod kpath;
pub mod labels;
pub mod plot;

pub use extractor::{extract, Extractor};
