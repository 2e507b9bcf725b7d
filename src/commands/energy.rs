//! # energy 命令实现
//!
//! 由体相与切片的 pw.x 输出计算表面能。
//!
//! ## 功能
//! - 提取两份输出的最终总能量与原子数
//! - 原子数缺失时从对应结构补齐（打印警告）
//! - 面积取 `--area` 或切片结构的 |a × b|
//! - 打印能量汇总表 (tabled) 与表面能 (eV/Å², J/m²)
//! - 可选记录到会话文件
//!
//! ## 依赖关系
//! - 使用 `cli/energy.rs` 定义的参数
//! - 使用 `qe/output.rs`, `analysis/`, `parsers/`, `session.rs`
//! - 使用 `utils/output.rs`

use crate::analysis::{calculate_surface_energy, lateral_area};
use crate::cli::energy::EnergyArgs;
use crate::error::Result;
use crate::models::{Crystal, EnergyRecord, SurfaceEnergyResult, SystemTag};
use crate::parsers;
use crate::qe::parse_pw_output_file;
use crate::session::Session;
use crate::utils::output;

use tabled::{Table, Tabled};

/// 能量汇总行
#[derive(Debug, Clone, Tabled)]
struct EnergyRow {
    #[tabled(rename = "System")]
    system: String,
    #[tabled(rename = "E (Ry)")]
    energy_ry: String,
    #[tabled(rename = "E (eV)")]
    energy_ev: String,
    #[tabled(rename = "Atoms")]
    atoms: usize,
    #[tabled(rename = "E/atom (eV)")]
    per_atom: String,
    #[tabled(rename = "Converged")]
    converged: String,
}

impl EnergyRow {
    fn new(record: &EnergyRecord, atoms: usize) -> Self {
        EnergyRow {
            system: record.system.to_string(),
            energy_ry: format!("{:.8}", record.energy_ry),
            energy_ev: format!("{:.6}", record.energy_ev()),
            atoms,
            per_atom: record
                .energy_per_atom_ev()
                .map(|e| format!("{:.6}", e))
                .unwrap_or_else(|| "-".to_string()),
            converged: if record.converged { "yes" } else { "no" }.to_string(),
        }
    }
}

/// 执行 energy 命令
pub fn execute(args: EnergyArgs) -> Result<()> {
    output::print_header("Surface Energy");

    let mut session = match args.session {
        Some(ref path) => Some(Session::load_or_default(path)?),
        None => None,
    };

    let mut bulk = parse_pw_output_file(&args.bulk, SystemTag::Bulk)?;
    let mut slab = parse_pw_output_file(&args.slab, SystemTag::Slab)?;
    output::print_info(&format!(
        "Parsed '{}' and '{}'",
        args.bulk.display(),
        args.slab.display()
    ));

    // 结构来源：命令行优先，其次会话
    let bulk_structure = match args.bulk_structure {
        Some(ref path) => Some(parsers::parse_structure_file(path)?),
        None => session.as_ref().and_then(|s| s.structures.bulk.clone()),
    };
    let slab_structure = match args.slab_structure {
        Some(ref path) => Some(parsers::parse_structure_file(path)?),
        None => session.as_ref().and_then(|s| s.structures.slab.clone()),
    };

    for (record, structure) in [
        (&mut bulk, bulk_structure.as_ref()),
        (&mut slab, slab_structure.as_ref()),
    ] {
        if fill_atom_count(record, structure) {
            output::print_warning(&format!(
                "No atom count in the {} output; using {} atoms from the {} structure",
                record.system,
                record.atom_count.unwrap_or(0),
                record.system
            ));
        }
    }

    let area = match (args.area, slab_structure.as_ref()) {
        (Some(area), _) => area,
        (None, Some(structure)) => lateral_area(structure),
        // clap 保证 --area 与 --slab-structure 二选一
        (None, None) => 0.0,
    };

    let result = calculate_surface_energy(&bulk, &slab, area)?;
    print_result(&result);

    if let (Some(path), Some(session)) = (&args.session, session.as_mut()) {
        session.results.bulk = Some(bulk);
        session.results.slab = Some(slab);
        session.results.surface_energy = Some(result);
        session.save(path)?;
        output::print_success(&format!("Session updated: '{}'", path.display()));
    }

    Ok(())
}

/// 原子数缺失时从结构补齐，返回是否补齐
fn fill_atom_count(record: &mut EnergyRecord, structure: Option<&Crystal>) -> bool {
    let missing = matches!(record.atom_count, None | Some(0));
    match structure {
        Some(crystal) if missing && !crystal.is_empty() => {
            record.atom_count = Some(crystal.len());
            if record.composition.is_none() {
                record.composition = Some(crystal.composition());
            }
            true
        }
        _ => false,
    }
}

fn print_result(result: &SurfaceEnergyResult) {
    let rows = vec![
        EnergyRow::new(&result.bulk, result.bulk_atoms),
        EnergyRow::new(&result.slab, result.slab_atoms),
    ];
    println!("{}", Table::new(&rows));

    output::print_kv("Area (Å²)", &format!("{:.4}", result.area));
    output::print_kv(
        "N_slab / N_bulk",
        &format!(
            "{:.6}",
            result.slab_atoms as f64 / result.bulk_atoms as f64
        ),
    );
    if let Some(ref warning) = result.warning {
        output::print_warning(&format!("Composition mismatch: {}", warning));
    }
    output::print_done(&format!(
        "Surface energy = {:.6} eV/Å² = {:.4} J/m²",
        result.value,
        result.j_per_m2()
    ));
}
