//! # 表面能计算
//!
//! E_surf = (E_slab − (N_slab / N_bulk) · E_bulk) / (2 · A)
//!
//! 能量以 Ry 输入，各自乘一次 Ry→eV 系数；结果单位 eV/Å²。
//! 切片两侧各暴露一个表面，故除以 2A。
//!
//! ## 依赖关系
//! - 被 `commands/energy.rs` 调用
//! - 使用 `models/calculation.rs`

use crate::error::{QslabError, Result};
use crate::models::{ConsistencyWarning, Crystal, EnergyRecord, SurfaceEnergyResult, SystemTag};
use nalgebra::Vector3;
use std::collections::BTreeMap;

/// 组分比例容差
pub const RATIO_TOLERANCE: f64 = 1e-6;

/// 计算表面能
///
/// 原子数缺失或为零时返回错误，从不使用默认值。
/// 组分不成比例时结果附带 [`ConsistencyWarning`]，数值仍照常计算。
pub fn calculate_surface_energy(
    bulk: &EnergyRecord,
    slab: &EnergyRecord,
    area: f64,
) -> Result<SurfaceEnergyResult> {
    if bulk.system != SystemTag::Bulk || slab.system != SystemTag::Slab {
        return Err(QslabError::InvalidArgument(format!(
            "expected (bulk, slab) records, got ({}, {})",
            bulk.system, slab.system
        )));
    }
    if !area.is_finite() || area <= 0.0 {
        return Err(QslabError::InvalidArgument(format!(
            "surface area must be positive, got {}",
            area
        )));
    }

    let bulk_atoms = match bulk.atom_count {
        Some(n) if n > 0 => n,
        _ => {
            return Err(QslabError::MissingAtomCount {
                system: SystemTag::Bulk.to_string(),
            })
        }
    };
    let slab_atoms = match slab.atom_count {
        Some(n) if n > 0 => n,
        _ => {
            return Err(QslabError::MissingAtomCount {
                system: SystemTag::Slab.to_string(),
            })
        }
    };

    let bulk_energy_ev = bulk.energy_ev();
    let slab_energy_ev = slab.energy_ev();
    let bulk_energy_per_atom_ev = bulk_energy_ev / bulk_atoms as f64;

    let value = (slab_energy_ev - slab_atoms as f64 * bulk_energy_per_atom_ev) / (2.0 * area);

    let warning = match (&bulk.composition, &slab.composition) {
        (Some(b), Some(s)) => check_composition(b, s),
        _ => None,
    };

    Ok(SurfaceEnergyResult {
        value,
        bulk: bulk.clone(),
        slab: slab.clone(),
        bulk_energy_ev,
        slab_energy_ev,
        bulk_energy_per_atom_ev,
        bulk_atoms,
        slab_atoms,
        area,
        warning,
    })
}

/// 切片晶胞的侧向面积 |a × b| (Å²)
pub fn lateral_area(slab: &Crystal) -> f64 {
    let a = Vector3::from(slab.lattice.vector(0));
    let b = Vector3::from(slab.lattice.vector(1));
    a.cross(&b).norm()
}

/// 检查切片组分是否为体相组分的整体倍数
pub fn check_composition(
    bulk: &BTreeMap<String, usize>,
    slab: &BTreeMap<String, usize>,
) -> Option<ConsistencyWarning> {
    let warn = |message: String| {
        Some(ConsistencyWarning {
            bulk_composition: bulk.clone(),
            slab_composition: slab.clone(),
            message,
        })
    };

    let bulk_species: Vec<&String> = bulk.iter().filter(|(_, &n)| n > 0).map(|(k, _)| k).collect();
    let slab_species: Vec<&String> = slab.iter().filter(|(_, &n)| n > 0).map(|(k, _)| k).collect();
    if bulk_species != slab_species {
        return warn(format!(
            "species differ between bulk {:?} and slab {:?}",
            bulk_species, slab_species
        ));
    }

    let mut reference: Option<f64> = None;
    for species in bulk_species {
        let ratio = slab[species] as f64 / bulk[species] as f64;
        match reference {
            None => reference = Some(ratio),
            Some(r) if ((ratio - r) / r).abs() > RATIO_TOLERANCE => {
                return warn(format!(
                    "slab is not a whole multiple of bulk: {} ratio {:.6} vs {:.6}",
                    species, ratio, r
                ));
            }
            Some(_) => {}
        }
    }
    None
}
