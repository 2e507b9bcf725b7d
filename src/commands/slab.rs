//! # slab 命令实现
//!
//! 由体相结构构建单个表面切片。
//!
//! ## 功能
//! - 读取体相结构 (CIF/POSCAR)
//! - 构建切片并打印几何报告
//! - 写出切片（CIF/POSCAR/XYZ）
//! - 可选写出超胞显示文件 (`--view`)
//! - 可选记录到会话文件
//!
//! ## 依赖关系
//! - 使用 `cli/slab.rs` 定义的参数
//! - 使用 `builder/`, `parsers/`, `session.rs`
//! - 使用 `utils/output.rs`

use crate::builder::{SlabGenerator, SupercellExpander};
use crate::cli::slab::SlabArgs;
use crate::error::Result;
use crate::models::{MillerIndex, Slab, SlabSpec};
use crate::parsers::{self, StructureFormat};
use crate::session::Session;
use crate::utils::output;

use std::path::{Path, PathBuf};

/// 执行 slab 命令
pub fn execute(args: SlabArgs) -> Result<()> {
    output::print_header("Building Surface Slab");

    // 参数在读文件之前校验
    let spec = SlabSpec::new(MillerIndex::new(args.h, args.k, args.l)?, args.layers, args.vacuum);
    spec.validate()?;

    if args.output.exists() && !args.overwrite {
        output::print_skip(&format!(
            "'{}' exists (use --overwrite to replace it)",
            args.output.display()
        ));
        return Ok(());
    }

    let bulk = parsers::parse_structure_file(&args.input)?;
    super::print_structure_summary(&bulk, &args.input);

    let slab = SlabGenerator::new(spec).generate(&bulk)?;
    print_slab_report(&slab);

    let format = args
        .format
        .or_else(|| StructureFormat::from_path(&args.output))
        .unwrap_or(StructureFormat::Cif);
    parsers::write_structure_file(&slab.crystal, &args.output, format)?;
    output::print_conversion(
        &args.input.display().to_string(),
        &format!("{} ({})", args.output.display(), format),
    );

    if let Some(multipliers) = args.view {
        let view_path = args
            .view_output
            .clone()
            .unwrap_or_else(|| default_view_path(&args.output));
        let view = SupercellExpander::new(multipliers)?.apply(&slab.crystal)?;
        parsers::write_structure_file(&view, &view_path, StructureFormat::Xyz)?;
        output::print_success(&format!(
            "View {}x{}x{} ({} atoms) written to '{}'",
            multipliers[0],
            multipliers[1],
            multipliers[2],
            view.len(),
            view_path.display()
        ));
    }

    if let Some(ref session_path) = args.session {
        let mut session = Session::load_or_default(session_path)?;
        session.structures.bulk = Some(bulk);
        session.structures.slab = Some(slab.crystal.clone());
        session.slab_spec = Some(spec);
        if let Some(multipliers) = args.view {
            session.supercell = multipliers;
        }
        session.save(session_path)?;
        output::print_success(&format!("Session updated: '{}'", session_path.display()));
    }

    output::print_done(&format!(
        "{} slab with {} atoms in {} layer(s)",
        spec.miller,
        slab.atom_count,
        spec.layers
    ));
    Ok(())
}

/// 打印切片几何报告
pub(crate) fn print_slab_report(slab: &Slab) {
    let (a, b, c, _, _, gamma) = slab.crystal.lattice.parameters();
    let [u, v, w] = slab.transformation;

    output::print_separator();
    output::print_kv("Miller index", &slab.spec.miller.to_string());
    output::print_kv(
        "In-plane u, v",
        &format!("[{} {} {}], [{} {} {}]", u[0], u[1], u[2], v[0], v[1], v[2]),
    );
    output::print_kv("Stacking w", &format!("[{} {} {}]", w[0], w[1], w[2]));
    output::print_kv("|a'|, |b'| (Å)", &format!("{:.4}, {:.4}", a, b));
    output::print_kv("γ' (°)", &format!("{:.3}", gamma));
    output::print_kv("Area (Å²)", &format!("{:.4}", slab.area));
    output::print_kv("Repeat distance d (Å)", &format!("{:.4}", slab.repeat_distance));
    output::print_kv(
        "Thickness (Å)",
        &format!(
            "{:.4} material + {:.4} vacuum = {:.4}",
            slab.material_thickness(),
            slab.spec.vacuum,
            c
        ),
    );
    output::print_kv("Atomic planes", &slab.plane_count.to_string());
    output::print_kv(
        "Atoms",
        &format!("{} ({})", slab.atom_count, slab.crystal.formula()),
    );
    output::print_separator();
}

/// `slab.cif` -> `slab_view.xyz`
fn default_view_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("slab");
    output.with_file_name(format!("{}_view.xyz", stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_view_path() {
        assert_eq!(
            default_view_path(Path::new("out/Pt_111.cif")),
            PathBuf::from("out/Pt_111_view.xyz")
        );
        assert_eq!(default_view_path(Path::new("POSCAR")), PathBuf::from("POSCAR_view.xyz"));
    }
}
