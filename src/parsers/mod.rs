//! # 解析器模块
//!
//! 检查点文件格式解析。
//!
//! ## 依赖关系
//! - 被 `backend/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: ulm (容器格式), gpw (GPAW 检查点字段)

pub mod gpw;
pub mod ulm;
