//! # input 子命令 CLI 定义
//!
//! 生成 pw.x 输入文件，可选复制赝势。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/input.rs`

use super::SystemArg;

use clap::Args;
use std::path::PathBuf;

/// 解析 "El=path" 形式的赝势指定
pub fn parse_pseudo_override(input: &str) -> Result<(String, PathBuf), String> {
    match input.split_once('=') {
        Some((species, path)) if !species.trim().is_empty() && !path.trim().is_empty() => {
            Ok((species.trim().to_string(), PathBuf::from(path.trim())))
        }
        _ => Err(format!(
            "Invalid pseudopotential '{}'. Use SPECIES=PATH (e.g., Pt=./pp/Pt.pbe-n-rrkjus.UPF)",
            input
        )),
    }
}

/// input 子命令参数
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Structure file (.cif, POSCAR, CONTCAR, .vasp)
    #[arg(short, long)]
    pub structure: PathBuf,

    /// Whether the structure is the bulk or the slab calculation
    #[arg(long, value_enum, default_value = "bulk")]
    pub system: SystemArg,

    /// Output pw.x input file
    #[arg(short, long)]
    pub output: PathBuf,

    /// TOML file with calculation parameters (defaults are used otherwise)
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// Directory searched for pseudopotentials
    #[arg(long, env = "QSLAB_PSEUDO_DIR")]
    pub pseudo_search: Option<PathBuf>,

    /// Explicit pseudopotential for a species (repeatable), e.g. 'O=./O.pbe.UPF'
    #[arg(long = "pseudo", value_parser = parse_pseudo_override)]
    pub pseudos: Vec<(String, PathBuf)>,

    /// Copy the pseudopotentials next to the input file (into pseudo_dir)
    #[arg(long, default_value_t = false)]
    pub copy_pseudos: bool,

    /// Use the parameter k-point mesh for slabs instead of 1 1 1
    #[arg(long, default_value_t = false)]
    pub custom_kpoints: bool,

    /// Overwrite an existing input file
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}
