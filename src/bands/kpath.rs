//! # k 路径工具
//!
//! 高对称点表、能带路径字符串解析，以及沿路径的线性坐标轴。
//!
//! ## 功能
//! - 立方/面心/体心/六方晶格的高对称点（分数坐标）
//! - 路径字符串解析：`"GX1X"` → `G`, `X1`, `X`，逗号分隔不连续的段
//! - 由 k 点序列找出拐点，计算累计距离与标签位置
//!
//! ## 依赖关系
//! - 被 `backend/snapshot.rs`, `config.rs` 使用
//! - 使用 `models/structure.rs` 的 Lattice
//! - 使用 `regex` 解析路径字符串

use crate::error::{BandsError, Result};
use crate::models::{BravaisKind, Lattice};
use crate::models::structure::norm;

use regex::Regex;
use std::sync::LazyLock;

/// 拐点与标签匹配容差（分数坐标）
const KINK_EPS: f64 = 1e-5;

/// 命名的高对称点（分数坐标）
pub type SpecialPoint = (String, [f64; 3]);

/// 指定晶格类型的高对称点
pub fn special_points(kind: BravaisKind) -> Vec<SpecialPoint> {
    let table: &[(&str, [f64; 3])] = match kind {
        BravaisKind::Cubic => &[
            ("G", [0.0, 0.0, 0.0]),
            ("M", [0.5, 0.5, 0.0]),
            ("R", [0.5, 0.5, 0.5]),
            ("X", [0.0, 0.5, 0.0]),
        ],
        BravaisKind::FaceCentredCubic => &[
            ("G", [0.0, 0.0, 0.0]),
            ("K", [0.375, 0.375, 0.75]),
            ("L", [0.5, 0.5, 0.5]),
            ("U", [0.625, 0.25, 0.625]),
            ("W", [0.5, 0.25, 0.75]),
            ("X", [0.5, 0.0, 0.5]),
        ],
        BravaisKind::BodyCentredCubic => &[
            ("G", [0.0, 0.0, 0.0]),
            ("H", [0.5, -0.5, 0.5]),
            ("P", [0.25, 0.25, 0.25]),
            ("N", [0.0, 0.0, 0.5]),
        ],
        BravaisKind::Hexagonal => &[
            ("G", [0.0, 0.0, 0.0]),
            ("A", [0.0, 0.0, 0.5]),
            ("H", [1.0 / 3.0, 1.0 / 3.0, 0.5]),
            ("K", [1.0 / 3.0, 1.0 / 3.0, 0.0]),
            ("L", [0.5, 0.0, 0.5]),
            ("M", [0.5, 0.0, 0.0]),
        ],
        BravaisKind::Other => &[("G", [0.0, 0.0, 0.0])],
    };
    table.iter().map(|(n, k)| (n.to_string(), *k)).collect()
}

/// 合并用户提供的高对称点，同名覆盖
pub fn merge_special_points(base: &mut Vec<SpecialPoint>, extra: &[SpecialPoint]) {
    for (name, kpt) in extra {
        match base.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = *kpt,
            None => base.push((name.clone(), *kpt)),
        }
    }
}

/// 一段连续路径：一个或多个点名
static SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[A-Z][a-z0-9]*)+$").unwrap());

/// 单个点名
static POINT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Z][a-z0-9]*").unwrap());

/// 解析能带路径字符串
///
/// 每个点名为一个大写字母后接小写字母或数字，逗号分隔不连续的段。
pub fn parse_path(pattern: &str) -> Result<Vec<Vec<String>>> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return Err(BandsError::InvalidBandPath(pattern.to_string()));
    }

    pattern
        .split(',')
        .map(|segment| {
            if !SEGMENT_RE.is_match(segment) {
                return Err(BandsError::InvalidBandPath(pattern.to_string()));
            }
            Ok(POINT_RE
                .find_iter(segment)
                .map(|m| m.as_str().to_string())
                .collect())
        })
        .collect()
}

/// 沿路径的线性坐标轴
#[derive(Debug, Clone, PartialEq)]
pub struct KPathAxis {
    pub xcoords: Vec<f64>,
    pub label_xcoords: Vec<f64>,
    pub labels: Vec<String>,
}

/// 由 k 点序列（分数坐标）计算线性坐标轴与标签
///
/// 拐点处匹配高对称点；未匹配的拐点命名为 `Kpt{n}`。两个拐点之间只有
/// 一步时视为路径跳跃，长度记为 0，且不会连续出现两次跳跃。
pub fn linear_axis(
    kpts: &[[f64; 3]],
    lattice: &Lattice,
    special: &[SpecialPoint],
) -> Result<KPathAxis> {
    let n = kpts.len();
    if n == 0 {
        return Ok(KPathAxis {
            xcoords: Vec::new(),
            label_xcoords: Vec::new(),
            labels: Vec::new(),
        });
    }

    let indices = kink_indices(kpts);

    let mut known: Vec<SpecialPoint> = special.to_vec();
    let labels: Vec<String> = indices
        .iter()
        .map(|&i| label_for(&kpts[i], &mut known))
        .collect();

    let mut xcoords = vec![0.0];
    let mut jump = false;
    for pair in indices.windows(2) {
        let (i1, i2) = (pair[0], pair[1]);
        let length = if !jump && i1 + 1 == i2 {
            jump = true;
            0.0
        } else {
            jump = false;
            let diff = [
                kpts[i2][0] - kpts[i1][0],
                kpts[i2][1] - kpts[i1][1],
                kpts[i2][2] - kpts[i1][2],
            ];
            let cart = lattice.kpoint_to_cartesian(&diff).ok_or_else(|| {
                BandsError::InvalidValue {
                    option: "cell".to_string(),
                    value: format!("{:?}", lattice.matrix),
                    reason: "singular unit cell".to_string(),
                }
            })?;
            norm(&cart)
        };

        let start = *xcoords.last().unwrap_or(&0.0);
        let steps = i2 - i1;
        for j in 1..=steps {
            xcoords.push(start + length * j as f64 / steps as f64);
        }
    }

    let label_xcoords = indices.iter().map(|&i| xcoords[i]).collect();

    Ok(KPathAxis {
        xcoords,
        label_xcoords,
        labels,
    })
}

/// 拐点序号，含首尾
fn kink_indices(kpts: &[[f64; 3]]) -> Vec<usize> {
    let n = kpts.len();
    let mut indices = vec![0];
    if n < 2 {
        return indices;
    }

    let diffs: Vec<[f64; 3]> = kpts
        .windows(2)
        .map(|w| [w[1][0] - w[0][0], w[1][1] - w[0][1], w[1][2] - w[0][2]])
        .collect();

    for i in 1..n - 1 {
        let change: f64 = (0..3).map(|c| (diffs[i][c] - diffs[i - 1][c]).abs()).sum();
        if change > KINK_EPS {
            indices.push(i);
        }
    }
    indices.push(n - 1);
    indices
}

/// 匹配高对称点：先精确匹配，再按倒格矢周期匹配，否则新建 `Kpt{n}`
fn label_for(kpt: &[f64; 3], known: &mut Vec<SpecialPoint>) -> String {
    let exact = |k: &[f64; 3]| -> f64 { (0..3).map(|c| (kpt[c] - k[c]).abs()).sum() };
    let periodic = |k: &[f64; 3]| -> f64 {
        (0..3)
            .map(|c| {
                let d = kpt[c] - k[c];
                (d - d.round()).abs()
            })
            .sum()
    };

    if let Some((name, _)) = known.iter().find(|(_, k)| exact(k) < KINK_EPS) {
        return name.clone();
    }
    if let Some((name, _)) = known.iter().find(|(_, k)| periodic(k) < KINK_EPS) {
        return name.clone();
    }

    let name = format!("Kpt{}", known.len());
    known.push((name.clone(), *kpt));
    name
}

/// 在两点之间线性插值，生成测试和示例用的路径
#[cfg(test)]
pub(crate) fn interpolate(points: &[[f64; 3]], per_segment: usize) -> Vec<[f64; 3]> {
    let mut out = Vec::new();
    for pair in points.windows(2) {
        for j in 0..per_segment {
            let t = j as f64 / per_segment as f64;
            out.push([
                pair[0][0] + t * (pair[1][0] - pair[0][0]),
                pair[0][1] + t * (pair[1][1] - pair[0][1]),
                pair[0][2] + t * (pair[1][2] - pair[0][2]),
            ]);
        }
    }
    if let Some(last) = points.last() {
        out.push(*last);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn cubic(a: f64) -> Lattice {
        Lattice::from_vectors([[a, 0.0, 0.0], [0.0, a, 0.0], [0.0, 0.0, a]])
    }

    #[test]
    fn test_parse_path() {
        let path = parse_path("GX1X").unwrap();
        assert_eq!(path, vec![vec!["G", "X1", "X"]]);

        let path = parse_path("GXWK,LG").unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[1], vec!["L", "G"]);
    }

    #[test]
    fn test_parse_path_rejects_malformed() {
        for bad in ["", "gX", "G-X", "GX,", ",GX", "G X"] {
            assert!(
                matches!(parse_path(bad), Err(BandsError::InvalidBandPath(_))),
                "pattern {:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_parse_path_shared_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                std::thread::spawn(|| {
                    (0..200)
                        .map(|_| parse_path("GXWK,LG").unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        for handle in handles {
            for path in handle.join().unwrap() {
                assert_eq!(path, vec![vec!["G", "X", "W", "K"], vec!["L", "G"]]);
            }
        }
        assert!(parse_path("G-X").is_err());
    }

    #[test]
    fn test_linear_axis_straight_segment() {
        // G -> X，立方晶格，长度 = π/a
        let a = 2.0;
        let kpts = interpolate(&[[0.0, 0.0, 0.0], [0.0, 0.5, 0.0]], 4);
        let special = special_points(BravaisKind::Cubic);
        let axis = linear_axis(&kpts, &cubic(a), &special).unwrap();

        assert_eq!(axis.xcoords.len(), 5);
        assert_eq!(axis.labels, vec!["G", "X"]);
        assert!((axis.xcoords[4] - PI / a).abs() < 1e-12);
        assert!((axis.xcoords[2] - PI / a / 2.0).abs() < 1e-12);
        assert_eq!(axis.label_xcoords, vec![0.0, axis.xcoords[4]]);
    }

    #[test]
    fn test_linear_axis_kink_and_unknown_label() {
        let a = 1.0;
        let kpts = interpolate(&[[0.0, 0.5, 0.0], [0.0, 0.0, 0.0], [0.2, 0.3, 0.1]], 5);
        let special = special_points(BravaisKind::Cubic);
        let axis = linear_axis(&kpts, &cubic(a), &special).unwrap();

        assert_eq!(axis.labels, vec!["X", "G", "Kpt4"]);
        assert_eq!(axis.label_xcoords.len(), 3);
        assert!((axis.label_xcoords[1] - PI).abs() < 1e-12);
    }

    #[test]
    fn test_linear_axis_periodic_match() {
        let a = 1.0;
        let kpts = interpolate(&[[0.0, 0.0, 0.0], [1.0, 0.5, 0.0]], 2);
        let special = special_points(BravaisKind::Cubic);
        let axis = linear_axis(&kpts, &cubic(a), &special).unwrap();
        // [1, 1/2, 0] 与 X [0, 1/2, 0] 相差一个倒格矢
        assert_eq!(axis.labels, vec!["G", "X"]);
    }

    #[test]
    fn test_linear_axis_jump_has_zero_length() {
        // X -> G | R -> M：G 与 R 之间只有一步，视为跳跃
        let mut kpts = interpolate(&[[0.0, 0.5, 0.0], [0.0, 0.0, 0.0]], 3);
        kpts.extend(interpolate(&[[0.5, 0.5, 0.5], [0.5, 0.5, 0.0]], 3));
        let special = special_points(BravaisKind::Cubic);
        let axis = linear_axis(&kpts, &cubic(1.0), &special).unwrap();

        assert_eq!(axis.labels, vec!["X", "G", "R", "M"]);
        assert_eq!(axis.xcoords.len(), kpts.len());
        assert!((axis.label_xcoords[1] - axis.label_xcoords[2]).abs() < 1e-12);
        assert!((axis.label_xcoords[3] - 2.0 * PI).abs() < 1e-12);
    }

    #[test]
    fn test_linear_axis_single_point() {
        let axis = linear_axis(&[[0.0, 0.0, 0.0]], &cubic(1.0), &[]).unwrap();
        assert_eq!(axis.xcoords, vec![0.0]);
        assert_eq!(axis.labels, vec!["Kpt0"]);
    }

    #[test]
    fn test_merge_special_points() {
        let mut points = special_points(BravaisKind::Other);
        merge_special_points(
            &mut points,
            &[
                ("X1".to_string(), [0.5, 0.0, 0.0]),
                ("G".to_string(), [0.0, 0.0, 0.0]),
            ],
        );
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].0, "X1");
    }
}
