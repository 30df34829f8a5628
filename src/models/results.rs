//! # 提取结果
//!
//! 绘图用的能带/态密度数组及标签，JSON 导出时字段名即键名。
//!
//! ## 依赖关系
//! - 由 `bands/extractor.rs` 生成
//! - 被 `bands/export.rs`, `bands/plot.rs` 使用

use serde::{Deserialize, Serialize};

/// 一次提取的全部结果
///
/// `energies` 形状为 (S, K, B)：第 0 列为 k 路径坐标，第 j 列为第 j 条能带
/// 减去费米能级后的能量。`dos` 形状为 (2, M, 2)：每个采样点为
/// `[E - E_F, 态密度]`，自旋向下的态密度取负。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandsResults {
    pub name: String,
    pub energies: Vec<Vec<Vec<f64>>>,
    pub xcoords: Vec<f64>,
    pub label_xcoords: Vec<f64>,
    pub x_labels: Vec<String>,
    pub energies_dim: [usize; 3],
    pub dos: Vec<Vec<[f64; 2]>>,
    pub dos_max: [f64; 2],
}

impl BandsResults {
    pub fn spin_count(&self) -> usize {
        self.energies_dim[0]
    }

    pub fn kpoint_count(&self) -> usize {
        self.energies_dim[1]
    }

    pub fn band_count(&self) -> usize {
        self.energies_dim[2]
    }

    /// 所有能带能量的范围（不含第 0 列）
    pub fn energy_range(&self) -> Option<(f64, f64)> {
        let mut values = self
            .energies
            .iter()
            .flat_map(|spin| spin.iter())
            .flat_map(|row| row.iter().skip(1))
            .copied()
            .peekable();
        values.peek()?;
        Some(values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), e| {
            (lo.min(e), hi.max(e))
        }))
    }
}
