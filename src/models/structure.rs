//! # 晶体结构数据模型
//!
//! 检查点中保存的晶胞与元素信息，以及倒空间换算所需的晶格工具。
//!
//! ## 依赖关系
//! - 被 `parsers/gpw.rs`, `backend/snapshot.rs`, `bands/kpath.rs` 使用
//! - 无外部模块依赖

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// 角度比较容差（度）
const ANGLE_TOL: f64 = 1e-3;

/// 长度比较的相对容差
const LENGTH_TOL: f64 = 1e-6;

/// 晶格参数表示
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    /// 晶格向量矩阵 (3x3)，行向量表示 a, b, c
    /// [[a1, a2, a3], [b1, b2, b3], [c1, c2, c3]]
    pub matrix: [[f64; 3]; 3],
}

/// 可识别的 Bravais 晶格类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BravaisKind {
    /// 简单立方
    Cubic,
    /// 面心立方（原胞）
    FaceCentredCubic,
    /// 体心立方（原胞）
    BodyCentredCubic,
    /// 六方
    Hexagonal,
    /// 其他晶格，仅 Γ 点可用
    Other,
}

impl Lattice {
    /// 从晶格向量矩阵创建
    pub fn from_vectors(matrix: [[f64; 3]; 3]) -> Self {
        Lattice { matrix }
    }

    /// 获取晶格参数 (a, b, c, alpha, beta, gamma)
    pub fn parameters(&self) -> (f64, f64, f64, f64, f64, f64) {
        let a_vec = self.matrix[0];
        let b_vec = self.matrix[1];
        let c_vec = self.matrix[2];

        let a = norm(&a_vec);
        let b = norm(&b_vec);
        let c = norm(&c_vec);

        let alpha = (dot(&b_vec, &c_vec) / (b * c)).acos().to_degrees();
        let beta = (dot(&a_vec, &c_vec) / (a * c)).acos().to_degrees();
        let gamma = (dot(&a_vec, &b_vec) / (a * b)).acos().to_degrees();

        (a, b, c, alpha, beta, gamma)
    }

    /// 计算晶格体积
    pub fn volume(&self) -> f64 {
        let a = self.matrix[0];
        let b = self.matrix[1];
        let c = self.matrix[2];

        // 行列式计算
        a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0])
            + a[2] * (b[0] * c[1] - b[1] * c[0])
    }

    /// 倒格矢（含 2π），行向量 b1, b2, b3
    ///
    /// 等价于 `2π · inv(cell)ᵀ`。晶胞退化时返回 `None`。
    pub fn reciprocal(&self) -> Option<[[f64; 3]; 3]> {
        let vol = self.volume();
        if vol.abs() < 1e-12 {
            return None;
        }
        let [a, b, c] = self.matrix;
        let scale = 2.0 * PI / vol;
        let b1 = cross(&b, &c);
        let b2 = cross(&c, &a);
        let b3 = cross(&a, &b);
        Some([
            [b1[0] * scale, b1[1] * scale, b1[2] * scale],
            [b2[0] * scale, b2[1] * scale, b2[2] * scale],
            [b3[0] * scale, b3[1] * scale, b3[2] * scale],
        ])
    }

    /// 分数 k 坐标转笛卡尔坐标 (1/Å)
    pub fn kpoint_to_cartesian(&self, scaled: &[f64; 3]) -> Option<[f64; 3]> {
        let rec = self.reciprocal()?;
        Some([
            scaled[0] * rec[0][0] + scaled[1] * rec[1][0] + scaled[2] * rec[2][0],
            scaled[0] * rec[0][1] + scaled[1] * rec[1][1] + scaled[2] * rec[2][1],
            scaled[0] * rec[0][2] + scaled[1] * rec[1][2] + scaled[2] * rec[2][2],
        ])
    }

    /// 根据晶格常数和夹角识别 Bravais 晶格
    pub fn bravais(&self) -> BravaisKind {
        let (a, b, c, alpha, beta, gamma) = self.parameters();
        let same = |x: f64, y: f64| (x - y).abs() <= LENGTH_TOL * x.abs().max(y.abs());
        let angle = |x: f64, y: f64| (x - y).abs() < ANGLE_TOL;

        if same(a, b) && same(b, c) {
            if angle(alpha, 90.0) && angle(beta, 90.0) && angle(gamma, 90.0) {
                return BravaisKind::Cubic;
            }
            if angle(alpha, 60.0) && angle(beta, 60.0) && angle(gamma, 60.0) {
                return BravaisKind::FaceCentredCubic;
            }
            let tetrahedral = (-1.0f64 / 3.0).acos().to_degrees();
            if angle(alpha, tetrahedral) && angle(beta, tetrahedral) && angle(gamma, tetrahedral)
            {
                return BravaisKind::BodyCentredCubic;
            }
        }
        if same(a, b) && angle(alpha, 90.0) && angle(beta, 90.0) && angle(gamma, 120.0) {
            return BravaisKind::Hexagonal;
        }
        BravaisKind::Other
    }
}

/// 检查点中的结构：晶胞 + 元素符号
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Structure {
    pub lattice: Lattice,
    pub symbols: Vec<String>,
}

impl Structure {
    pub fn new(lattice: Lattice, symbols: Vec<String>) -> Self {
        Structure { lattice, symbols }
    }

    /// 出现不止一次的元素，按首次出现顺序
    pub fn repeated_elements(&self) -> Vec<String> {
        let mut order: Vec<&str> = Vec::new();
        let mut counts: Vec<usize> = Vec::new();

        for symbol in &self.symbols {
            match order.iter().position(|s| *s == symbol.as_str()) {
                Some(i) => counts[i] += 1,
                None => {
                    order.push(symbol);
                    counts.push(1);
                }
            }
        }

        order
            .into_iter()
            .zip(counts)
            .filter(|(_, n)| *n > 1)
            .map(|(s, _)| s.to_string())
            .collect()
    }
}

/// 向量叉积
fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// 向量点积
fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// 向量模长
pub fn norm(a: &[f64; 3]) -> f64 {
    dot(a, a).sqrt()
}
