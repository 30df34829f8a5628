//! # 求解器输出数据模型
//!
//! 后端返回的原始能带与态密度，能量均未减去费米能级。
//!
//! ## 依赖关系
//! - 被 `backend/` 产生
//! - 被 `bands/extractor.rs` 消费

use serde::{Deserialize, Serialize};

/// 沿 k 路径的能带
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandStructure {
    /// 本征值 (eV)，索引为 [spin][k][band]
    pub energies: Vec<Vec<Vec<f64>>>,

    /// 每个 k 点的路径坐标
    pub xcoords: Vec<f64>,

    /// 高对称点的路径坐标
    pub label_xcoords: Vec<f64>,

    /// 高对称点标签（原始形式，如 "G", "X1", "Kpt0"）
    pub labels: Vec<String>,
}

impl BandStructure {
    pub fn spin_count(&self) -> usize {
        self.energies.len()
    }

    pub fn kpoint_count(&self) -> usize {
        self.xcoords.len()
    }
}

/// 单个自旋通道的态密度曲线
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DosCurve {
    /// 能量采样点 (eV)
    pub energies: Vec<f64>,

    /// 态密度 (states/eV)
    pub densities: Vec<f64>,
}

impl DosCurve {
    pub fn len(&self) -> usize {
        self.energies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energies.is_empty()
    }

    /// 态密度最大值，空曲线返回 0
    pub fn max_density(&self) -> f64 {
        if self.densities.is_empty() {
            return 0.0;
        }
        self.densities
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }
}
