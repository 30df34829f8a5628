//! # 原生后端
//!
//! 直接解析 `.gpw` 文件，不依赖 Python。定带计算需要真正运行 DFT，
//! 原生后端不支持。
//!
//! ## 依赖关系
//! - 使用 `parsers/gpw.rs`, `bands/kpath.rs`

use crate::backend::{Backend, Calculation};
use crate::bands::kpath::{self, SpecialPoint};
use crate::config::BandPathRequest;
use crate::error::{BandsError, Result};
use crate::models::Lattice;
use crate::parsers::gpw;

use std::path::Path;

/// 原生 `.gpw` 读取后端
#[derive(Debug, Clone, Default)]
pub struct NativeBackend {
    extra_special_points: Vec<SpecialPoint>,
}

impl NativeBackend {
    /// `extra_special_points` 补充或覆盖按晶格类型推断的高对称点
    pub fn new(extra_special_points: Vec<SpecialPoint>) -> Self {
        NativeBackend {
            extra_special_points,
        }
    }
}

impl Backend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn load(&self, path: &Path) -> Result<Box<dyn Calculation>> {
        let mut snapshot = gpw::parse_gpw_file(path)?;

        let mut points = kpath::special_points(Lattice::from_vectors(snapshot.cell).bravais());
        kpath::merge_special_points(&mut points, &self.extra_special_points);
        snapshot.special_points = points.into_iter().collect();

        Ok(Box::new(snapshot))
    }

    fn fixed_density(
        &self,
        _path: &Path,
        request: &BandPathRequest,
    ) -> Result<Box<dyn Calculation>> {
        Err(BandsError::Unsupported {
            backend: self.name().to_string(),
            what: format!(
                "fixed-density band path '{}' ({} points); use --backend gpaw",
                request.pattern, request.npoints
            ),
        })
    }
}
