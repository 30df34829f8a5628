//! # GPAW `.gpw` 检查点解析器
//!
//! 从 ULM 容器中读取能带提取所需的字段：
//! - `atoms.cell`, `atoms.numbers`
//! - `occupations.fermilevel`（或 `occupations.fermilevels` 的平均值）
//! - `wave_functions.eigenvalues` (eV, 形状 S × K × B)
//! - `wave_functions.kpts.ibzkpts`, `wave_functions.kpts.weights`
//!
//! ## 依赖关系
//! - 被 `backend/native.rs` 使用
//! - 使用 `parsers/ulm.rs`, `models/snapshot.rs`, `models/elements.rs`

use crate::error::{BandsError, Result};
use crate::models::elements;
use crate::models::Snapshot;
use crate::parsers::ulm::{lookup, UlmFile};

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// GPAW 写入 ULM 文件头的标签
const GPAW_TAG: &str = "GPAW";

/// 解析 `.gpw` 文件
pub fn parse_gpw_file(path: &Path) -> Result<Snapshot> {
    let mut ulm = UlmFile::open(path)?;
    if ulm.tag() != GPAW_TAG {
        return Err(corrupt(
            path,
            &format!(
                "not a GPAW checkpoint (tag '{}', version {})",
                ulm.tag(),
                ulm.version()
            ),
        ));
    }
    if ulm.item_count() == 0 {
        return Err(corrupt(path, "checkpoint contains no items"));
    }
    let root = ulm.read_item(0)?;

    let field = |keys: &[&str]| -> Result<Value> {
        lookup(&root, keys)
            .cloned()
            .ok_or_else(|| corrupt(path, &format!("missing field '{}'", keys.join("."))))
    };

    // 晶胞
    let cell = ulm.read_array(&field(&["atoms", "cell"])?)?;
    let cell_rows = cell
        .rows3()
        .filter(|rows| rows.len() == 3)
        .ok_or_else(|| corrupt(path, &format!("cell has shape {:?}", cell.shape)))?;
    let cell = [cell_rows[0], cell_rows[1], cell_rows[2]];

    // 元素
    let numbers = ulm.read_array(&field(&["atoms", "numbers"])?)?;
    let symbols = numbers
        .data
        .iter()
        .map(|&z| {
            elements::symbol(z as i64)
                .map(str::to_string)
                .ok_or_else(|| corrupt(path, &format!("unknown atomic number {}", z)))
        })
        .collect::<Result<Vec<_>>>()?;

    // 费米能级
    let fermi_level = match lookup(&root, &["occupations", "fermilevel"]).and_then(Value::as_f64) {
        Some(ef) => ef,
        None => {
            let levels = ulm.read_array(&field(&["occupations", "fermilevels"])?)?;
            if levels.data.is_empty() {
                return Err(corrupt(path, "empty 'occupations.fermilevels'"));
            }
            levels.data.iter().sum::<f64>() / levels.data.len() as f64
        }
    };

    // 本征值与 k 点
    let eigenvalues = ulm.read_array(&field(&["wave_functions", "eigenvalues"])?)?;
    let eigenvalues = eigenvalues.nested3().ok_or_else(|| {
        corrupt(
            path,
            &format!("eigenvalues have shape {:?}", eigenvalues.shape),
        )
    })?;

    let kpts = ulm.read_array(&field(&["wave_functions", "kpts", "ibzkpts"])?)?;
    let kpts = kpts
        .rows3()
        .ok_or_else(|| corrupt(path, &format!("k-points have shape {:?}", kpts.shape)))?;

    let weights = ulm
        .read_array(&field(&["wave_functions", "kpts", "weights"])?)?
        .data;

    let snapshot = Snapshot {
        fermi_level,
        cell,
        symbols,
        kpts,
        weights,
        eigenvalues,
        special_points: BTreeMap::new(),
    };
    snapshot.validate(path)?;
    Ok(snapshot)
}

fn corrupt(path: &Path, reason: &str) -> BandsError {
    BandsError::Checkpoint {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}
