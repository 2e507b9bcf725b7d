//! # supercell 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/supercell.rs`

use crate::parsers::StructureFormat;

use clap::Args;
use std::path::PathBuf;

/// supercell 子命令参数
#[derive(Args, Debug)]
pub struct SupercellArgs {
    /// Input structure file (.cif, POSCAR, CONTCAR, .vasp)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file (XYZ unless another format is given or inferred)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Repetitions along a
    #[arg(long, default_value_t = 1)]
    pub nx: usize,

    /// Repetitions along b
    #[arg(long, default_value_t = 1)]
    pub ny: usize,

    /// Repetitions along c
    #[arg(long, default_value_t = 1)]
    pub nz: usize,

    /// Output format (inferred from the output file name if not specified)
    #[arg(short, long, value_enum)]
    pub format: Option<StructureFormat>,
}
