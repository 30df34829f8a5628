//! # 计算快照
//!
//! 后端从检查点（或 GPAW 子进程）取得的全部原始数据：费米能级、晶胞、
//! 元素、IBZ k 点及权重、本征值，以及可选的高对称点表。
//!
//! ## 依赖关系
//! - 由 `parsers/gpw.rs` 和 `backend/gpaw.rs` 生成
//! - `backend/snapshot.rs` 为其实现 `Calculation`

use crate::error::{BandsError, Result};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// 计算快照，能量单位 eV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub fermi_level: f64,

    /// 晶格向量（行向量, Å）
    pub cell: [[f64; 3]; 3],

    pub symbols: Vec<String>,

    /// k 点（分数坐标）
    pub kpts: Vec<[f64; 3]>,

    /// k 点权重，总和为 1
    pub weights: Vec<f64>,

    /// 本征值，索引为 [spin][k][band]
    pub eigenvalues: Vec<Vec<Vec<f64>>>,

    /// 高对称点（分数坐标），为空时按晶格类型推断
    #[serde(default)]
    pub special_points: BTreeMap<String, [f64; 3]>,
}

impl Snapshot {
    /// 检查各数组维度是否一致
    pub fn validate(&self, source: &Path) -> Result<()> {
        let fail = |reason: String| BandsError::Checkpoint {
            path: source.display().to_string(),
            reason,
        };

        if !self.fermi_level.is_finite() {
            return Err(fail("Fermi level is not a finite number".to_string()));
        }
        let nspins = self.eigenvalues.len();
        if nspins == 0 || nspins > 2 {
            return Err(fail(format!("expected 1 or 2 spin channels, found {}", nspins)));
        }
        let nkpts = self.kpts.len();
        if nkpts == 0 {
            return Err(fail("no k-points".to_string()));
        }
        if self.weights.len() != nkpts {
            return Err(fail(format!(
                "{} k-point weights for {} k-points",
                self.weights.len(),
                nkpts
            )));
        }
        let nbands = self.eigenvalues[0].first().map(|b| b.len()).unwrap_or(0);
        if nbands == 0 {
            return Err(fail("no bands".to_string()));
        }
        for (s, spin) in self.eigenvalues.iter().enumerate() {
            if spin.len() != nkpts {
                return Err(fail(format!(
                    "spin {} has eigenvalues for {} k-points, expected {}",
                    s,
                    spin.len(),
                    nkpts
                )));
            }
            if let Some(k) = spin.iter().position(|bands| bands.len() != nbands) {
                return Err(fail(format!(
                    "spin {} k-point {} has {} bands, expected {}",
                    s,
                    k,
                    spin[k].len(),
                    nbands
                )));
            }
        }
        Ok(())
    }

    pub fn spin_count(&self) -> usize {
        self.eigenvalues.len()
    }

    pub fn band_count(&self) -> usize {
        self.eigenvalues
            .first()
            .and_then(|spin| spin.first())
            .map(|bands| bands.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 双自旋、三 k 点、两条能带的小快照
    pub(crate) fn sample() -> Snapshot {
        Snapshot {
            fermi_level: 1.5,
            cell: [[2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 2.0]],
            symbols: vec!["Ga".to_string(), "As".to_string(), "Ga".to_string()],
            kpts: vec![[0.0, 0.0, 0.0], [0.0, 0.25, 0.0], [0.0, 0.5, 0.0]],
            weights: vec![1.0 / 3.0; 3],
            eigenvalues: vec![
                vec![vec![-1.0, 2.0], vec![-0.5, 2.5], vec![0.0, 3.0]],
                vec![vec![-0.8, 2.2], vec![-0.3, 2.7], vec![0.2, 3.2]],
            ],
            special_points: BTreeMap::new(),
        }
    }

    #[test]
    fn test_validate_ok() {
        let snap = sample();
        assert!(snap.validate(Path::new("sample.gpw")).is_ok());
        assert_eq!(snap.spin_count(), 2);
        assert_eq!(snap.band_count(), 2);
    }

    #[test]
    fn test_validate_mismatched_weights() {
        let mut snap = sample();
        snap.weights.pop();
        let err = snap.validate(Path::new("bad.gpw")).unwrap_err();
        assert!(matches!(err, BandsError::Checkpoint { .. }));
    }

    #[test]
    fn test_validate_ragged_bands() {
        let mut snap = sample();
        snap.eigenvalues[1][2].push(4.0);
        assert!(snap.validate(Path::new("bad.gpw")).is_err());
    }

    #[test]
    fn test_deserialize_without_special_points() {
        let json = r#"{
            "fermi_level": 0.0,
            "cell": [[1,0,0],[0,1,0],[0,0,1]],
            "symbols": ["Si"],
            "kpts": [[0,0,0]],
            "weights": [1.0],
            "eigenvalues": [[[-1.0, 1.0]]]
        }"#;
        let snap: Snapshot = serde_json::from_str(json).unwrap();
        assert!(snap.special_points.is_empty());
        assert_eq!(snap.band_count(), 2);
    }
}
