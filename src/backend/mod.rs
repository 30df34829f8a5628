//! # 求解器后端模块
//!
//! 电子结构求解器的抽象边界：
//! - `Calculation`: 已加载的计算句柄，可查询费米能级、能带与态密度
//! - `Backend`: 将检查点文件加载为计算句柄，或沿指定路径做定带计算
//!
//! ## 子模块
//! - `snapshot`: 基于内存快照的 `Calculation` 实现
//! - `native`: 直接读取 `.gpw` 文件
//! - `gpaw`: 通过 Python 子进程调用 GPAW
//!
//! ## 依赖关系
//! - 被 `bands/extractor.rs` 和 `commands/` 使用
//! - 使用 `parsers/`, `models/`, `config.rs`

pub mod gpaw;
pub mod native;
pub mod snapshot;

use crate::config::{BackendKind, BandPathRequest, Config};
use crate::error::Result;
use crate::models::{BandStructure, DosCurve, Structure};

use std::path::Path;

pub use gpaw::GpawBackend;
pub use native::NativeBackend;

/// 已加载的计算
pub trait Calculation {
    /// 费米能级 (eV)
    fn fermi_level(&self) -> f64;

    /// 自旋通道数（1 或 2）
    fn spin_count(&self) -> usize;

    /// 能带数
    fn band_count(&self) -> usize;

    /// 沿计算所用 k 点路径的能带
    fn band_structure(&self) -> Result<BandStructure>;

    /// 单个自旋通道的态密度；`width` 为 `None` 时使用后端默认宽度
    fn dos(&self, spin: usize, npts: usize, width: Option<f64>) -> Result<DosCurve>;

    /// 晶胞与元素
    fn structure(&self) -> Structure;
}

/// 检查点加载器
pub trait Backend {
    fn name(&self) -> &'static str;

    /// 加载检查点
    fn load(&self, path: &Path) -> Result<Box<dyn Calculation>>;

    /// 固定检查点中的电荷密度，沿 `request` 指定的路径重新计算能带
    fn fixed_density(&self, path: &Path, request: &BandPathRequest)
        -> Result<Box<dyn Calculation>>;
}

/// 按配置创建后端
pub fn from_config(config: &Config) -> Box<dyn Backend> {
    match config.backend {
        BackendKind::Native => Box::new(NativeBackend::new(config.extra_special_points())),
        BackendKind::Gpaw => Box::new(GpawBackend::new(
            config.gpaw.python.clone(),
            config.gpaw.timeout_secs,
            config.extra_special_points(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_selects_backend() {
        let mut config = Config::default();
        assert_eq!(from_config(&config).name(), "native");
        config.backend = BackendKind::Gpaw;
        assert_eq!(from_config(&config).name(), "gpaw");
    }
}
