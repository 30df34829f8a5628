//! # 提取结果导出
//!
//! ## 支持格式
//! - JSON: `<dir>/<stem>.json`，字段名即 `BandsResults` 字段名
//! - CSV: `<dir>/<stem>_bands.csv` (spin, k_index, xcoord, band, energy)
//!   与 `<dir>/<stem>_dos.csv` (spin, energy, density)
//!
//! 输出目录不存在时自动创建。
//!
//! ## 依赖关系
//! - 被 `bands/extractor.rs` 调用
//! - 使用 `serde_json`, `csv`

use crate::error::{BandsError, Result};
use crate::models::BandsResults;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| BandsError::FileWriteError {
        path: dir.display().to_string(),
        source: e,
    })
}

/// 导出为 JSON，返回写入的路径
pub fn to_json(results: &BandsResults, stem: &str, dir: &Path) -> Result<PathBuf> {
    ensure_dir(dir)?;
    let path = dir.join(format!("{}.json", stem));

    let write_err = |e| BandsError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    };
    let file = File::create(&path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, results)?;
    writer.flush().map_err(write_err)?;

    Ok(path)
}

/// 导出能带与态密度 CSV，返回 (能带文件, 态密度文件)
pub fn to_csv(results: &BandsResults, stem: &str, dir: &Path) -> Result<(PathBuf, PathBuf)> {
    ensure_dir(dir)?;
    let bands_path = dir.join(format!("{}_bands.csv", stem));
    let dos_path = dir.join(format!("{}_dos.csv", stem));

    bands_to_csv(results, &bands_path)?;
    dos_to_csv(results, &dos_path)?;

    Ok((bands_path, dos_path))
}

/// 长表格式：每行一个 (自旋, k 点, 能带) 能量，第 0 列坐标不重复输出
fn bands_to_csv(results: &BandsResults, output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path).map_err(BandsError::CsvError)?;

    wtr.write_record(["spin", "k_index", "xcoord", "band", "energy"])
        .map_err(BandsError::CsvError)?;

    for (spin, e_kn) in results.energies.iter().enumerate() {
        for (k, row) in e_kn.iter().enumerate() {
            let xcoord = row.first().copied().unwrap_or_default();
            for (band, energy) in row.iter().enumerate().skip(1) {
                wtr.write_record(&[
                    spin.to_string(),
                    k.to_string(),
                    format!("{:.6}", xcoord),
                    band.to_string(),
                    format!("{:.6}", energy),
                ])
                .map_err(BandsError::CsvError)?;
            }
        }
    }

    wtr.flush().map_err(|e| BandsError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

fn dos_to_csv(results: &BandsResults, output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path).map_err(BandsError::CsvError)?;

    wtr.write_record(["spin", "energy", "density"])
        .map_err(BandsError::CsvError)?;

    for (spin, channel) in results.dos.iter().enumerate() {
        for [energy, density] in channel {
            wtr.write_record(&[
                spin.to_string(),
                format!("{:.6}", energy),
                format!("{:.6}", density),
            ])
            .map_err(BandsError::CsvError)?;
        }
    }

    wtr.flush().map_err(|e| BandsError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;

    Ok(())
}
