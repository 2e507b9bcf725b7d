//! # supercell 命令实现
//!
//! 将结构按 nx × ny × nz 复制，用于可视化（默认写出 XYZ）。
//! 超胞只用于显示，不用于输入文件、会话切片或能量计算。
//!
//! ## 依赖关系
//! - 使用 `cli/supercell.rs` 定义的参数
//! - 使用 `builder/supercell.rs`, `parsers/`
//! - 使用 `utils/output.rs`

use crate::builder::SupercellExpander;
use crate::cli::supercell::SupercellArgs;
use crate::error::Result;
use crate::parsers::{self, StructureFormat};
use crate::utils::output;

/// 执行 supercell 命令
pub fn execute(args: SupercellArgs) -> Result<()> {
    output::print_header("Building Display Supercell");

    let expander = SupercellExpander::new([args.nx, args.ny, args.nz])?;
    let crystal = parsers::parse_structure_file(&args.input)?;
    super::print_structure_summary(&crystal, &args.input);

    let supercell = expander.apply(&crystal)?;
    let format = args
        .format
        .or_else(|| StructureFormat::from_path(&args.output))
        .unwrap_or(StructureFormat::Xyz);
    parsers::write_structure_file(&supercell, &args.output, format)?;

    output::print_conversion(
        &args.input.display().to_string(),
        &format!("{} ({})", args.output.display(), format),
    );
    output::print_done(&format!(
        "{}x{}x{} supercell: {} -> {} atoms",
        args.nx,
        args.ny,
        args.nz,
        crystal.len(),
        supercell.len()
    ));
    Ok(())
}
