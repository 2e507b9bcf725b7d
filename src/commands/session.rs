//! # session 命令实现
//!
//! 打印会话文件摘要。
//!
//! ## 依赖关系
//! - 使用 `cli/session.rs` 定义的参数
//! - 使用 `session.rs`
//! - 使用 `utils/output.rs`

use crate::cli::session::{SessionArgs, SessionCommands};
use crate::error::Result;
use crate::models::{Crystal, EnergyRecord};
use crate::session::Session;
use crate::utils::output;

use std::path::Path;

/// 执行 session 命令
pub fn execute(args: SessionArgs) -> Result<()> {
    match args.command {
        SessionCommands::Show { path } => show(&path),
    }
}

fn show(path: &Path) -> Result<()> {
    let session = Session::load(path)?;
    output::print_header(&format!("Session '{}'", path.display()));

    output::print_info("Structures");
    print_structure("Bulk", session.structures.bulk.as_ref());
    print_structure("Slab", session.structures.slab.as_ref());
    match session.slab_spec {
        Some(spec) => output::print_kv(
            "Slab spec",
            &format!(
                "{} x {} layers, {:.2} Å vacuum",
                spec.miller, spec.layers, spec.vacuum
            ),
        ),
        None => output::print_kv("Slab spec", "-"),
    }
    let [nx, ny, nz] = session.supercell;
    output::print_kv("Display supercell", &format!("{}x{}x{}", nx, ny, nz));

    output::print_separator();
    output::print_info("Parameters");
    let p = &session.parameters;
    output::print_kv("calculation", &p.calculation.to_string());
    output::print_kv(
        "ecutwfc / ecutrho",
        &format!("{} / {} Ry", p.ecutwfc, p.ecutrho),
    );
    output::print_kv(
        "kpoints",
        &format!("{} {} {}", p.kpoints[0], p.kpoints[1], p.kpoints[2]),
    );
    output::print_kv("occupations", &p.occupations.to_string());
    output::print_kv("nspin", &p.nspin.to_string());

    output::print_separator();
    output::print_info("Results");
    print_record("Bulk energy", session.results.bulk.as_ref());
    print_record("Slab energy", session.results.slab.as_ref());
    match session.results.surface_energy {
        Some(ref result) => {
            output::print_kv(
                "Surface energy",
                &format!("{:.6} eV/Å² ({:.4} J/m²)", result.value, result.j_per_m2()),
            );
            if let Some(ref warning) = result.warning {
                output::print_warning(&warning.to_string());
            }
        }
        None => output::print_kv("Surface energy", "-"),
    }
    Ok(())
}

fn print_structure(key: &str, crystal: Option<&Crystal>) {
    let value = match crystal {
        Some(c) => format!("{} ({}, {} atoms, {:.3} Å³)", c.name, c.formula(), c.len(), c.volume()),
        None => "-".to_string(),
    };
    output::print_kv(key, &value);
}

fn print_record(key: &str, record: Option<&EnergyRecord>) {
    let value = match record {
        Some(r) => format!(
            "{:.8} Ry, {} atoms",
            r.energy_ry,
            r.atom_count
                .map(|n| n.to_string())
                .unwrap_or_else(|| "?".to_string())
        ),
        None => "-".to_string(),
    };
    output::print_kv(key, &value);
}
