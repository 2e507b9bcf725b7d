//! # slab / scan 子命令 CLI 定义
//!
//! - `slab`: 单个 Miller 指数的切片构建
//! - `scan`: 一组 Miller 指数的并行切片构建与汇总
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/slab.rs`、`commands/scan.rs`

use super::parse_multipliers;
use crate::parsers::StructureFormat;

use clap::Args;
use std::path::PathBuf;

/// slab 子命令参数
#[derive(Args, Debug)]
pub struct SlabArgs {
    /// Bulk structure file (.cif, POSCAR, CONTCAR, .vasp)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output slab structure file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Miller index h
    #[arg(allow_negative_numbers = true)]
    pub h: i32,

    /// Miller index k
    #[arg(allow_negative_numbers = true)]
    pub k: i32,

    /// Miller index l
    #[arg(allow_negative_numbers = true)]
    pub l: i32,

    /// Number of repeat layers stacked along the surface normal
    #[arg(long, default_value_t = 4)]
    pub layers: usize,

    /// Vacuum thickness in Å
    #[arg(long, default_value_t = 10.0)]
    pub vacuum: f64,

    /// Output format (inferred from the output file name if not specified)
    #[arg(short, long, value_enum)]
    pub format: Option<StructureFormat>,

    /// Also write a replicated view of the slab (e.g., '3,3,1')
    #[arg(long, value_parser = parse_multipliers)]
    pub view: Option<[usize; 3]>,

    /// File for the replicated view (default: <output stem>_view.xyz)
    #[arg(long, requires = "view")]
    pub view_output: Option<PathBuf>,

    /// Record the bulk, slab and parameters in this session file
    #[arg(long)]
    pub session: Option<PathBuf>,

    /// Overwrite existing output files
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}

/// scan 子命令参数
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Bulk structure file (.cif, POSCAR, CONTCAR, .vasp)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Largest |h|, |k|, |l| to include
    #[arg(short, long, default_value_t = 1)]
    pub max_index: i32,

    /// Number of repeat layers per slab
    #[arg(long, default_value_t = 4)]
    pub layers: usize,

    /// Vacuum thickness in Å
    #[arg(long, default_value_t = 10.0)]
    pub vacuum: f64,

    /// Directory to write every slab into (omit to only tabulate)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Structure format of written slabs
    #[arg(short, long, value_enum, default_value = "cif")]
    pub format: StructureFormat,

    /// Write the summary table as CSV
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Overwrite existing output files
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}
