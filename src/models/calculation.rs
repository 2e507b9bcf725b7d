//! # 计算结果数据模型
//!
//! 存储从 QE 输出中提取的能量记录以及表面能计算结果。
//!
//! ## 依赖关系
//! - 被 `qe/output.rs` 生成
//! - 被 `analysis/surface_energy.rs`、`session.rs`、`commands/` 使用

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 1 Ry 对应的 eV
pub const RY_TO_EV: f64 = 13.605693009;

/// 1 eV/Å² 对应的 J/m²
pub const EV_PER_A2_TO_J_PER_M2: f64 = 16.021766339999;

/// 体系类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemTag {
    Bulk,
    Slab,
}

impl std::fmt::Display for SystemTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SystemTag::Bulk => write!(f, "bulk"),
            SystemTag::Slab => write!(f, "slab"),
        }
    }
}

/// 单次 QE 计算的能量记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyRecord {
    /// 总能量 (Ry)
    pub energy_ry: f64,

    /// 原子数
    pub atom_count: Option<usize>,

    /// 体系类型
    pub system: SystemTag,

    /// 各物种原子数（若输出中可得）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition: Option<BTreeMap<String, usize>>,

    /// 计算是否完成
    #[serde(default)]
    pub converged: bool,
}

impl EnergyRecord {
    pub fn new(system: SystemTag, energy_ry: f64, atom_count: Option<usize>) -> Self {
        EnergyRecord {
            energy_ry,
            atom_count,
            system,
            composition: None,
            converged: false,
        }
    }

    /// 从 eV 能量创建
    pub fn from_ev(system: SystemTag, energy_ev: f64, atom_count: Option<usize>) -> Self {
        Self::new(system, energy_ev / RY_TO_EV, atom_count)
    }

    pub fn with_composition(mut self, composition: BTreeMap<String, usize>) -> Self {
        self.composition = Some(composition);
        self
    }

    /// 总能量 (eV)
    pub fn energy_ev(&self) -> f64 {
        self.energy_ry * RY_TO_EV
    }

    /// 计算每原子能量 (eV)
    pub fn energy_per_atom_ev(&self) -> Option<f64> {
        match self.atom_count {
            Some(n) if n > 0 => Some(self.energy_ev() / n as f64),
            _ => None,
        }
    }
}

/// 体相与切片组分不成比例时的非致命警告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyWarning {
    pub bulk_composition: BTreeMap<String, usize>,
    pub slab_composition: BTreeMap<String, usize>,
    pub message: String,
}

impl std::fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// 表面能计算结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceEnergyResult {
    /// 表面能 (eV/Å²)
    pub value: f64,

    pub bulk: EnergyRecord,
    pub slab: EnergyRecord,

    /// 换算后的总能量 (eV)
    pub bulk_energy_ev: f64,
    pub slab_energy_ev: f64,

    /// 体相每原子能量 (eV)
    pub bulk_energy_per_atom_ev: f64,

    pub bulk_atoms: usize,
    pub slab_atoms: usize,

    /// 侧向面积 (Å²)
    pub area: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<ConsistencyWarning>,
}

impl SurfaceEnergyResult {
    /// 表面能 (J/m²)
    pub fn j_per_m2(&self) -> f64 {
        self.value * EV_PER_A2_TO_J_PER_M2
    }

    pub fn is_consistent(&self) -> bool {
        self.warning.is_none()
    }
}
