//! # 晶体结构数据模型
//!
//! 定义统一的晶体结构表示（晶格 + 原子基元）。构造时校验晶格非简并，
//! 之后作为不可变值对象在 parsers、builder、qe 之间传递。
//!
//! ## 约定
//! - 晶格矩阵按行存储 a, b, c（单位 Å）
//! - 原子坐标为分数坐标，笛卡尔坐标 r = f · M
//! - 倒格矢 b_i 满足 a_i · b_j = δ_ij（不含 2π）
//!
//! ## 依赖关系
//! - 被 `parsers/`、`builder/`、`qe/`、`session.rs` 使用
//! - 使用 `nalgebra` 做矩阵求逆

use crate::error::{QslabError, Result};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 晶格体积下限（Å³），低于此值视为简并
pub const DEGENERACY_TOLERANCE: f64 = 1e-6;

/// 序列化用的原始晶格表示
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LatticeData {
    matrix: [[f64; 3]; 3],
}

/// 晶格参数表示
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LatticeData", into = "LatticeData")]
pub struct Lattice {
    /// 晶格向量矩阵 (3x3)，行向量表示 a, b, c
    matrix: [[f64; 3]; 3],
    /// 矩阵的逆，用于笛卡尔 -> 分数坐标
    inverse: [[f64; 3]; 3],
}

impl TryFrom<LatticeData> for Lattice {
    type Error = QslabError;

    fn try_from(data: LatticeData) -> Result<Self> {
        Lattice::new(data.matrix)
    }
}

impl From<Lattice> for LatticeData {
    fn from(lattice: Lattice) -> Self {
        LatticeData {
            matrix: lattice.matrix,
        }
    }
}

impl Lattice {
    /// 从晶格向量矩阵创建，拒绝简并晶格
    pub fn new(matrix: [[f64; 3]; 3]) -> Result<Self> {
        let m = to_matrix3(&matrix);
        let determinant = m.determinant();
        if !determinant.is_finite() || determinant.abs() <= DEGENERACY_TOLERANCE {
            return Err(QslabError::DegenerateLattice { determinant });
        }
        let inverse = m
            .try_inverse()
            .ok_or(QslabError::DegenerateLattice { determinant })?;

        Ok(Lattice {
            matrix,
            inverse: from_matrix3(&inverse),
        })
    }

    /// 从晶格参数 (a, b, c, alpha, beta, gamma) 创建晶格
    /// 角度单位：度；a 沿 x，b 位于 xy 平面
    pub fn from_parameters(
        a: f64,
        b: f64,
        c: f64,
        alpha: f64,
        beta: f64,
        gamma: f64,
    ) -> Result<Self> {
        let cos_alpha = alpha.to_radians().cos();
        let cos_beta = beta.to_radians().cos();
        let (sin_gamma, cos_gamma) = gamma.to_radians().sin_cos();

        if sin_gamma.abs() < 1e-12 {
            return Err(QslabError::DegenerateLattice { determinant: 0.0 });
        }

        let c1 = c * cos_beta;
        let c2 = c * (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
        let c3_sq = c * c - c1 * c1 - c2 * c2;
        if c3_sq <= 0.0 {
            return Err(QslabError::DegenerateLattice { determinant: 0.0 });
        }

        Lattice::new([
            [a, 0.0, 0.0],
            [b * cos_gamma, b * sin_gamma, 0.0],
            [c1, c2, c3_sq.sqrt()],
        ])
    }

    /// 晶格向量矩阵（行向量 a, b, c）
    pub fn matrix(&self) -> [[f64; 3]; 3] {
        self.matrix
    }

    /// 第 i 个晶格向量
    pub fn vector(&self, i: usize) -> [f64; 3] {
        self.matrix[i]
    }

    /// 获取晶格参数 (a, b, c, alpha, beta, gamma)
    pub fn parameters(&self) -> (f64, f64, f64, f64, f64, f64) {
        let [a_vec, b_vec, c_vec] = self.matrix.map(|row| Vector3::from(row));

        let a = a_vec.norm();
        let b = b_vec.norm();
        let c = c_vec.norm();

        let alpha = (b_vec.dot(&c_vec) / (b * c)).clamp(-1.0, 1.0).acos().to_degrees();
        let beta = (a_vec.dot(&c_vec) / (a * c)).clamp(-1.0, 1.0).acos().to_degrees();
        let gamma = (a_vec.dot(&b_vec) / (a * b)).clamp(-1.0, 1.0).acos().to_degrees();

        (a, b, c, alpha, beta, gamma)
    }

    /// 晶格行列式（带符号体积）
    pub fn determinant(&self) -> f64 {
        to_matrix3(&self.matrix).determinant()
    }

    /// 计算晶格体积
    pub fn volume(&self) -> f64 {
        self.determinant().abs()
    }

    /// 倒格矢矩阵，行向量 b1, b2, b3
    pub fn reciprocal(&self) -> [[f64; 3]; 3] {
        // B = (M^-1)^T，其行即 M^-1 的列
        let inv = self.inverse;
        [
            [inv[0][0], inv[1][0], inv[2][0]],
            [inv[0][1], inv[1][1], inv[2][1]],
            [inv[0][2], inv[1][2], inv[2][2]],
        ]
    }

    /// 分数坐标转笛卡尔坐标
    pub fn to_cartesian(&self, frac: [f64; 3]) -> [f64; 3] {
        let m = &self.matrix;
        [
            frac[0] * m[0][0] + frac[1] * m[1][0] + frac[2] * m[2][0],
            frac[0] * m[0][1] + frac[1] * m[1][1] + frac[2] * m[2][1],
            frac[0] * m[0][2] + frac[1] * m[1][2] + frac[2] * m[2][2],
        ]
    }

    /// 笛卡尔坐标转分数坐标
    pub fn to_fractional(&self, cart: [f64; 3]) -> [f64; 3] {
        let inv = &self.inverse;
        [
            cart[0] * inv[0][0] + cart[1] * inv[1][0] + cart[2] * inv[2][0],
            cart[0] * inv[0][1] + cart[1] * inv[1][1] + cart[2] * inv[2][1],
            cart[0] * inv[0][2] + cart[1] * inv[1][2] + cart[2] * inv[2][2],
        ]
    }
}

/// 行存储数组 -> nalgebra 矩阵
pub fn to_matrix3(m: &[[f64; 3]; 3]) -> Matrix3<f64> {
    Matrix3::new(
        m[0][0], m[0][1], m[0][2], m[1][0], m[1][1], m[1][2], m[2][0], m[2][1], m[2][2],
    )
}

/// nalgebra 矩阵 -> 行存储数组
pub fn from_matrix3(m: &Matrix3<f64>) -> [[f64; 3]; 3] {
    [
        [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
        [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
        [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
    ]
}

/// 原子信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    /// 物种标签（元素符号或 QE 物种名，如 "Fe1"）
    pub element: String,

    /// 分数坐标 [x, y, z]
    pub position: [f64; 3],

    /// 可选：原子标签（用于区分同种元素的不同位置）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Atom {
    pub fn new(element: impl Into<String>, position: [f64; 3]) -> Self {
        Atom {
            element: element.into(),
            position,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// 晶体结构
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crystal {
    /// 结构名称
    pub name: String,

    /// 晶格
    pub lattice: Lattice,

    /// 原子列表（顺序有意义，导出时保持）
    pub atoms: Vec<Atom>,

    /// 来源文件格式
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_format: Option<String>,
}

impl Crystal {
    pub fn new(name: impl Into<String>, lattice: Lattice, atoms: Vec<Atom>) -> Self {
        Crystal {
            name: name.into(),
            lattice,
            atoms,
            source_format: None,
        }
    }

    /// 从结构化元组 (晶格矩阵, [(物种, 分数坐标)]) 创建
    pub fn from_parts(
        name: impl Into<String>,
        matrix: [[f64; 3]; 3],
        sites: Vec<(String, [f64; 3])>,
    ) -> Result<Self> {
        let lattice = Lattice::new(matrix)?;
        let atoms = sites
            .into_iter()
            .map(|(element, position)| Atom::new(element, position))
            .collect();
        Ok(Crystal::new(name, lattice, atoms))
    }

    /// 导出为结构化元组
    pub fn to_parts(&self) -> ([[f64; 3]; 3], Vec<(String, [f64; 3])>) {
        let sites = self
            .atoms
            .iter()
            .map(|a| (a.element.clone(), a.position))
            .collect();
        (self.lattice.matrix(), sites)
    }

    /// 原子数
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// 晶胞体积 (Å³)
    pub fn volume(&self) -> f64 {
        self.lattice.volume()
    }

    /// 所有原子的笛卡尔坐标
    pub fn cartesian_positions(&self) -> Vec<[f64; 3]> {
        self.atoms
            .iter()
            .map(|a| self.lattice.to_cartesian(a.position))
            .collect()
    }

    /// 物种列表（按首次出现顺序去重）
    pub fn species(&self) -> Vec<String> {
        let mut species: Vec<String> = Vec::new();
        for atom in &self.atoms {
            if !species.contains(&atom.element) {
                species.push(atom.element.clone());
            }
        }
        species
    }

    /// 各物种原子数
    pub fn composition(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for atom in &self.atoms {
            *counts.entry(atom.element.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// 计算化学式
    pub fn formula(&self) -> String {
        self.composition()
            .into_iter()
            .map(|(el, count)| {
                if count == 1 {
                    el
                } else {
                    format!("{}{}", el, count)
                }
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lattice_from_parameters_cubic() {
        let lattice = Lattice::from_parameters(5.0, 5.0, 5.0, 90.0, 90.0, 90.0).unwrap();
        let (a, b, c, alpha, beta, gamma) = lattice.parameters();

        assert!((a - 5.0).abs() < 1e-6);
        assert!((b - 5.0).abs() < 1e-6);
        assert!((c - 5.0).abs() < 1e-6);
        assert!((alpha - 90.0).abs() < 1e-6);
        assert!((beta - 90.0).abs() < 1e-6);
        assert!((gamma - 90.0).abs() < 1e-6);
        assert!((lattice.volume() - 125.0).abs() < 1e-6);
    }

    #[test]
    fn test_lattice_hexagonal() {
        let lattice = Lattice::from_parameters(3.0, 3.0, 5.0, 90.0, 90.0, 120.0).unwrap();
        let (a, b, c, _, _, gamma) = lattice.parameters();

        assert!((a - 3.0).abs() < 1e-9);
        assert!((b - 3.0).abs() < 1e-9);
        assert!((c - 5.0).abs() < 1e-9);
        assert!((gamma - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_lattice_rejected() {
        let err = Lattice::new([[1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 0.0, 1.0]]).unwrap_err();
        assert!(matches!(err, QslabError::DegenerateLattice { .. }));

        let err = Crystal::from_parts("flat", [[0.0; 3]; 3], vec![]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
    }

    #[test]
    fn test_fractional_cartesian_round_trip() {
        let lattice = Lattice::from_parameters(3.1, 4.2, 5.3, 80.0, 95.0, 110.0).unwrap();
        let frac = [0.12, 0.57, 0.91];
        let back = lattice.to_fractional(lattice.to_cartesian(frac));
        for i in 0..3 {
            assert!((back[i] - frac[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_reciprocal_is_dual_basis() {
        let lattice = Lattice::from_parameters(3.0, 3.0, 5.0, 90.0, 90.0, 120.0).unwrap();
        let a = lattice.matrix();
        let b = lattice.reciprocal();
        for i in 0..3 {
            for j in 0..3 {
                let dot: f64 = (0..3).map(|x| a[i][x] * b[j][x]).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_crystal_formula_and_species_order() {
        let lattice = Lattice::from_parameters(5.0, 5.0, 5.0, 90.0, 90.0, 90.0).unwrap();
        let atoms = vec![
            Atom::new("Ti", [0.0, 0.0, 0.0]),
            Atom::new("O", [0.5, 0.5, 0.0]),
            Atom::new("O", [0.5, 0.0, 0.5]),
        ];
        let crystal = Crystal::new("TiO2", lattice, atoms);

        assert_eq!(crystal.formula(), "O2Ti");
        assert_eq!(crystal.species(), vec!["Ti".to_string(), "O".to_string()]);
        assert_eq!(crystal.composition()["O"], 2);
    }

    #[test]
    fn test_parts_round_trip() {
        let matrix = [[4.0, 0.0, 0.0], [1.0, 3.5, 0.0], [0.3, 0.2, 6.0]];
        let sites = vec![
            ("Pt".to_string(), [0.0, 0.0, 0.0]),
            ("O".to_string(), [0.25, 0.5, 0.75]),
        ];
        let crystal = Crystal::from_parts("x", matrix, sites.clone()).unwrap();
        let (m, s) = crystal.to_parts();
        assert_eq!(m, matrix);
        assert_eq!(s, sites);
    }

    #[test]
    fn test_lattice_deserialize_validates() {
        let ok: Lattice =
            serde_json::from_str(r#"{"matrix":[[2.0,0.0,0.0],[0.0,2.0,0.0],[0.0,0.0,2.0]]}"#)
                .unwrap();
        assert!((ok.volume() - 8.0).abs() < 1e-12);

        let bad = serde_json::from_str::<Lattice>(
            r#"{"matrix":[[1.0,0.0,0.0],[1.0,0.0,0.0],[0.0,0.0,1.0]]}"#,
        );
        assert!(bad.is_err());
    }
}
