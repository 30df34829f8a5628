//! # 态密度展宽
//!
//! 将带权重的本征值用高斯函数展宽到等间距能量网格上。
//!
//! ## 依赖关系
//! - 被 `backend/snapshot.rs` 使用
//! - 使用 `models/calculation.rs` 的 DosCurve

use crate::models::DosCurve;

use std::f64::consts::PI;

/// 默认采样点数
pub const DEFAULT_NPTS: usize = 2001;

/// 未指定宽度时的高斯宽度 (eV)
pub const DEFAULT_WIDTH: f64 = 0.1;

/// 指数截断，避免下溢
const EXP_CLIP: f64 = 100.0;

/// 高斯展宽
///
/// 网格范围为 `[min(e) - 5w, max(e) + 5w]`，每个本征值贡献
/// `w_k · exp(-((E - e)/w)²) / (√π · w)`。
pub fn fold(energies: &[f64], weights: &[f64], npts: usize, width: f64) -> DosCurve {
    if energies.is_empty() || npts == 0 {
        return DosCurve {
            energies: Vec::new(),
            densities: Vec::new(),
        };
    }

    let emin = energies.iter().copied().fold(f64::INFINITY, f64::min) - 5.0 * width;
    let emax = energies.iter().copied().fold(f64::NEG_INFINITY, f64::max) + 5.0 * width;
    let grid = linspace(emin, emax, npts);

    let norm = 1.0 / (PI.sqrt() * width);
    let densities = grid
        .iter()
        .map(|&e| {
            energies
                .iter()
                .zip(weights)
                .map(|(&e0, &w)| {
                    let x = (e - e0) / width;
                    w * (-(x * x)).max(-EXP_CLIP).exp()
                })
                .sum::<f64>()
                * norm
        })
        .collect();

    DosCurve {
        energies: grid,
        densities,
    }
}

/// 等间距网格，包含两端点
fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}
