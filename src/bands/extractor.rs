//! # 能带与态密度提取
//!
//! `extract` 是纯函数：输入计算句柄与态密度参数，输出不可变的
//! `BandsResults`。`Extractor` 负责文件列表、加载与可选导出。
//!
//! ## 依赖关系
//! - 被 `commands/extract.rs`, `commands/elements.rs` 使用
//! - 使用 `backend/` 加载计算，`bands/labels.rs` 格式化标签
//! - 使用 `bands/export.rs`, `bands/plot.rs` 导出

use crate::backend::{Backend, Calculation};
use crate::bands::{export, labels, plot};
use crate::config::{Config, DosOptions};
use crate::error::{BandsError, Result};
use crate::models::{BandsResults, FileListing, SelectedFile};
use crate::utils::{output, progress};

use std::io::Write;
use std::path::Path;

/// 自旋向上通道
const SPIN_UP: usize = 0;

/// 自旋向下通道
const SPIN_DOWN: usize = 1;

/// 从计算句柄提取能带与态密度
///
/// 能带数组形状 (S, K, B)：第 0 列为 k 路径坐标，第 j 列为第 j 条能带
/// 减去费米能级。态密度固定两个自旋通道，自旋向下取负。
pub fn extract(calc: &dyn Calculation, name: &str, dos: &DosOptions) -> Result<BandsResults> {
    let bs = calc.band_structure()?;
    let fermi_level = calc.fermi_level();
    let nspins = calc.spin_count();
    let nbands = calc.band_count();
    let nkpts = bs.kpoint_count();

    if bs.spin_count() != nspins {
        return Err(inconsistent(format!(
            "band structure has {} spin channels, calculation reports {}",
            bs.spin_count(),
            nspins
        )));
    }

    let mut energies = vec![vec![vec![0.0; nbands]; nkpts]; nspins];
    for (spin, e_kn) in bs.energies.iter().enumerate() {
        if e_kn.len() != nkpts {
            return Err(inconsistent(format!(
                "spin {} has {} k-points, path has {}",
                spin,
                e_kn.len(),
                nkpts
            )));
        }
        for (k, e_n) in e_kn.iter().enumerate() {
            if e_n.len() != nbands {
                return Err(inconsistent(format!(
                    "spin {} k-point {} has {} bands, expected {}",
                    spin,
                    k,
                    e_n.len(),
                    nbands
                )));
            }
            let row = &mut energies[spin][k];
            if let Some(first) = row.first_mut() {
                *first = bs.xcoords[k];
            }
            for (slot, &e) in row.iter_mut().zip(e_n).skip(1) {
                *slot = e - fermi_level;
            }
        }
    }

    let up = calc.dos(SPIN_UP, dos.npts, dos.width)?;
    let down = calc.dos(SPIN_DOWN, dos.npts, dos.width)?;
    if up.is_empty() {
        return Err(inconsistent("no DOS samples".to_string()));
    }
    if up.len() != down.len() {
        return Err(inconsistent(format!(
            "spin channels have {} and {} DOS samples",
            up.len(),
            down.len()
        )));
    }

    let up_array = up
        .energies
        .iter()
        .zip(&up.densities)
        .map(|(&e, &d)| [e - fermi_level, d])
        .collect();
    let down_array = down
        .energies
        .iter()
        .zip(&down.densities)
        .map(|(&e, &d)| [e - fermi_level, -d])
        .collect();

    Ok(BandsResults {
        name: name.to_string(),
        energies,
        xcoords: bs.xcoords,
        label_xcoords: bs.label_xcoords,
        x_labels: labels::axis_labels(&bs.labels),
        energies_dim: [nspins, nkpts, nbands],
        dos: vec![up_array, down_array],
        dos_max: [up.max_density(), down.max_density()],
    })
}

fn inconsistent(reason: String) -> BandsError {
    BandsError::Checkpoint {
        path: "<calculation>".to_string(),
        reason,
    }
}

/// 检查点目录上的提取器
pub struct Extractor {
    listing: FileListing,
    backend: Box<dyn Backend>,
}

impl Extractor {
    /// 扫描目录；目录不存在时报错
    pub fn new(dir: &Path, backend: Box<dyn Backend>) -> Result<Self> {
        let listing = FileListing::scan(dir)?;
        Ok(Extractor { listing, backend })
    }

    pub fn listing(&self) -> &FileListing {
        &self.listing
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// 输出文件表格
    pub fn show_files<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "{}", self.listing.table()).map_err(|e| BandsError::FileWriteError {
            path: "<stdout>".to_string(),
            source: e,
        })
    }

    /// 按序号选择文件
    pub fn select(&self, index: usize) -> Result<SelectedFile> {
        self.listing.select(index)
    }

    /// 加载选中的检查点
    pub fn get_calc(&self, index: usize) -> Result<(Box<dyn Calculation>, SelectedFile)> {
        let selected = self.select(index)?;
        let spinner = progress::create_spinner(&format!("Loading {}", selected.file_name));
        let calc = self.backend.load(&selected.path);
        spinner.finish_and_clear();
        Ok((calc?, selected))
    }

    /// 提取能带与态密度；`fixed` 时沿配置的路径做定带计算
    ///
    /// 导出失败只打印警告，结果仍然返回。
    pub fn get_bands(&self, index: usize, fixed: bool, config: &Config) -> Result<BandsResults> {
        let selected = self.select(index)?;

        let calc = if fixed {
            config.bandpath.segments()?;
            let spinner = progress::create_spinner(&format!(
                "Fixed-density bands along {} ({} points) for {}",
                config.bandpath.pattern, config.bandpath.npoints, selected.file_name
            ));
            let calc = self.backend.fixed_density(&selected.path, &config.bandpath);
            spinner.finish_and_clear();
            calc?
        } else {
            let (calc, _) = self.get_calc(index)?;
            calc
        };

        let results = extract(calc.as_ref(), &selected.display_name, &config.dos)?;

        let stem = selected.output_stem(fixed);
        let mut exported = false;

        if config.export.json {
            match export::to_json(&results, &stem, &config.export.dir) {
                Ok(path) => {
                    output::print_saved("JSON", &path);
                    exported = true;
                }
                Err(e) => output::print_export_failure("JSON", &selected.path, &e),
            }
        }

        if config.export.csv {
            match export::to_csv(&results, &stem, &config.export.dir) {
                Ok((bands, dos)) => {
                    output::print_saved("CSV", &bands);
                    output::print_saved("CSV", &dos);
                    exported = true;
                }
                Err(e) => output::print_export_failure("CSV", &selected.path, &e),
            }
        }

        if let Some(ref plot_path) = config.export.plot {
            match plot::generate_bands_plot(&results, plot_path) {
                Ok(()) => {
                    output::print_saved("Plot", plot_path);
                    exported = true;
                }
                Err(e) => output::print_export_failure("plot", &selected.path, &e),
            }
        }

        if !exported {
            output::print_done("Extraction finished, nothing exported");
        }

        Ok(results)
    }

    /// 结构中出现不止一次的元素（分波态密度的前置步骤）
    pub fn pdos_elements(&self, index: usize) -> Result<Vec<String>> {
        let (calc, _) = self.get_calc(index)?;
        Ok(calc.structure().repeated_elements())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BandPathRequest;
    use crate::models::snapshot::tests::sample;
    use crate::models::Snapshot;
    use std::fs;
    use tempfile::TempDir;

    /// 测试替身：任何路径都返回同一个快照
    struct FakeBackend {
        snapshot: Snapshot,
    }

    impl Backend for FakeBackend {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn load(&self, _path: &Path) -> Result<Box<dyn Calculation>> {
            Ok(Box::new(self.snapshot.clone()))
        }

        fn fixed_density(
            &self,
            _path: &Path,
            request: &BandPathRequest,
        ) -> Result<Box<dyn Calculation>> {
            let mut snap = self.snapshot.clone();
            snap.fermi_level += request.npoints as f64;
            Ok(Box::new(snap))
        }
    }

    /// 目录随返回的 `TempDir` 一起删除
    fn extractor(files: &[&str]) -> (Extractor, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        for f in files {
            fs::write(dir.path().join(f), b"").unwrap();
        }
        let backend = Box::new(FakeBackend { snapshot: sample() });
        (Extractor::new(dir.path(), backend).unwrap(), dir)
    }

    #[test]
    fn test_extract_shapes_and_shift() {
        let snap = sample();
        let dos = DosOptions {
            npts: 501,
            width: None,
        };
        let results = extract(&snap, "GaAs\\%", &dos).unwrap();

        assert_eq!(results.energies_dim, [2, 3, 2]);
        assert_eq!(results.energies.len(), 2);
        assert_eq!(results.energies[0].len(), 3);
        assert_eq!(results.energies[0][0].len(), 2);

        // 第 0 列为 k 路径坐标，所有自旋相同
        for spin in 0..2 {
            for k in 0..3 {
                assert_eq!(results.energies[spin][k][0], results.xcoords[k]);
            }
        }
        // 第 1 列为第 1 条能带减去费米能级
        for spin in 0..2 {
            for k in 0..3 {
                assert_eq!(
                    results.energies[spin][k][1],
                    snap.eigenvalues[spin][k][1] - snap.fermi_level
                );
            }
        }
        assert_eq!(results.x_labels, vec![r"$\Gamma$", "X"]);
        assert_eq!(results.name, "GaAs\\%");
    }

    #[test]
    fn test_extract_dos_layout() {
        let snap = sample();
        let opts = DosOptions {
            npts: 2001,
            width: Some(0.1),
        };
        let results = extract(&snap, "s", &opts).unwrap();
        let raw_up = snap.dos(0, 2001, Some(0.1)).unwrap();
        let raw_down = snap.dos(1, 2001, Some(0.1)).unwrap();

        assert_eq!(results.dos.len(), 2);
        assert_eq!(results.dos[0].len(), 2001);
        assert_eq!(results.dos[1].len(), 2001);
        for i in 0..2001 {
            assert_eq!(results.dos[0][i][0], raw_up.energies[i] - snap.fermi_level);
            assert_eq!(results.dos[0][i][1], raw_up.densities[i]);
            assert_eq!(results.dos[1][i][0], raw_down.energies[i] - snap.fermi_level);
            assert_eq!(results.dos[1][i][1], -raw_down.densities[i]);
        }
        assert_eq!(results.dos_max, [raw_up.max_density(), raw_down.max_density()]);
        assert!(results.dos_max[1] > 0.0);
    }

    #[test]
    fn test_get_bands_without_export() {
        let (ex, _dir) = extractor(&["GaAs_bulk_test.gpw"]);
        let config = Config::default();
        let results = ex.get_bands(0, false, &config).unwrap();
        assert_eq!(results.name, "GaAs bulk test\\%");
        assert_eq!(results.dos[0].len(), 2001);
    }

    #[test]
    fn test_get_bands_fixed_uses_fixed_density() {
        let (ex, _dir) = extractor(&["Si.gpw"]);
        let mut config = Config::default();
        config.bandpath.npoints = 10;
        config.dos.npts = 11;
        let results = ex.get_bands(0, true, &config).unwrap();
        let expected_ef = sample().fermi_level + 10.0;
        assert_eq!(
            results.energies[0][0][1],
            sample().eigenvalues[0][0][1] - expected_ef
        );
    }

    #[test]
    fn test_get_bands_exports_json() {
        let (ex, dir) = extractor(&["Si_bulk.gpw"]);
        let mut config = Config::default();
        config.dos.npts = 51;
        config.export.json = true;
        config.export.dir = dir.path().join("json");
        let results = ex.get_bands(0, false, &config).unwrap();

        let written = fs::read_to_string(dir.path().join("json").join("Si_bulk.json")).unwrap();
        let back: BandsResults = serde_json::from_str(&written).unwrap();
        assert_eq!(back, results);
    }

    #[test]
    fn test_export_failure_still_returns_results() {
        let (ex, dir) = extractor(&["Si.gpw"]);
        // 输出目录位置被普通文件占用
        let blocker = dir.path().join("blocked");
        fs::write(&blocker, b"not a directory").unwrap();

        let mut config = Config::default();
        config.dos.npts = 21;
        config.export.json = true;
        config.export.dir = blocker.clone();
        let results = ex.get_bands(0, false, &config).unwrap();
        assert_eq!(results.energies_dim, [2, 3, 2]);
        assert!(!blocker.join("Si.json").exists());
    }

    #[test]
    fn test_index_out_of_range() {
        let (ex, _dir) = extractor(&["a.gpw"]);
        let err = ex.get_bands(1, false, &Config::default()).unwrap_err();
        assert!(matches!(err, BandsError::IndexOutOfRange { index: 1, len: 1 }));
    }

    #[test]
    fn test_pdos_elements() {
        let (ex, _dir) = extractor(&["a.gpw"]);
        assert_eq!(ex.pdos_elements(0).unwrap(), vec!["Ga"]);
        assert_eq!(ex.backend_name(), "fake");
    }
}
