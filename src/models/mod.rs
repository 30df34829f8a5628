//! # 数据模型模块
//!
//! 定义文件列表、结构、求解器输出与提取结果的数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `backend/`, `bands/` 和 `commands/` 使用
//! - 子模块: listing, structure, calculation, snapshot, results, elements

pub mod calculation;
pub mod elements;
pub mod listing;
pub mod results;
pub mod snapshot;
pub mod structure;

pub use calculation::{BandStructure, DosCurve};
pub use listing::{FileListing, SelectedFile};
pub use results::BandsResults;
pub use snapshot::Snapshot;
pub use structure::{BravaisKind, Lattice, Structure};
