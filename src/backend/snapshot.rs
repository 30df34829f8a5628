//! # 快照计算
//!
//! 为内存快照实现 `Calculation`：能带坐标轴由 k 点序列推得，
//! 态密度由 IBZ 本征值高斯展宽得到。
//!
//! ## 依赖关系
//! - 被 `backend/native.rs`, `backend/gpaw.rs` 使用
//! - 使用 `bands/kpath.rs`, `bands/dos.rs`

use crate::backend::Calculation;
use crate::bands::{dos, kpath};
use crate::error::Result;
use crate::models::{BandStructure, DosCurve, Lattice, Snapshot, Structure};

impl Snapshot {
    /// 快照中的高对称点；为空时按晶格类型取标准表
    fn special_point_list(&self) -> Vec<kpath::SpecialPoint> {
        if self.special_points.is_empty() {
            kpath::special_points(Lattice::from_vectors(self.cell).bravais())
        } else {
            self.special_points
                .iter()
                .map(|(n, k)| (n.clone(), *k))
                .collect()
        }
    }
}

impl Calculation for Snapshot {
    fn fermi_level(&self) -> f64 {
        self.fermi_level
    }

    fn spin_count(&self) -> usize {
        Snapshot::spin_count(self)
    }

    fn band_count(&self) -> usize {
        Snapshot::band_count(self)
    }

    fn band_structure(&self) -> Result<BandStructure> {
        let lattice = Lattice::from_vectors(self.cell);
        let axis = kpath::linear_axis(&self.kpts, &lattice, &self.special_point_list())?;

        Ok(BandStructure {
            energies: self.eigenvalues.clone(),
            xcoords: axis.xcoords,
            label_xcoords: axis.label_xcoords,
            labels: axis.labels,
        })
    }

    fn dos(&self, spin: usize, npts: usize, width: Option<f64>) -> Result<DosCurve> {
        // 非自旋极化时两个通道相同
        let spin = spin.min(self.eigenvalues.len().saturating_sub(1));
        let channel = match self.eigenvalues.get(spin) {
            Some(channel) => channel,
            None => return Ok(dos::fold(&[], &[], npts, dos::DEFAULT_WIDTH)),
        };

        let mut energies = Vec::new();
        let mut weights = Vec::new();
        for (bands, &w) in channel.iter().zip(&self.weights) {
            energies.extend_from_slice(bands);
            weights.extend(std::iter::repeat(w).take(bands.len()));
        }

        Ok(dos::fold(
            &energies,
            &weights,
            npts,
            width.unwrap_or(dos::DEFAULT_WIDTH),
        ))
    }

    fn structure(&self) -> Structure {
        Structure::new(Lattice::from_vectors(self.cell), self.symbols.clone())
    }
}
