//! # energy 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/energy.rs`

use clap::Args;
use std::path::PathBuf;

/// energy 子命令参数
#[derive(Args, Debug)]
pub struct EnergyArgs {
    /// pw.x output of the bulk calculation
    #[arg(long)]
    pub bulk: PathBuf,

    /// pw.x output of the slab calculation
    #[arg(long)]
    pub slab: PathBuf,

    /// Slab structure; its lateral area |a × b| is used
    #[arg(long, required_unless_present = "area", conflicts_with = "area")]
    pub slab_structure: Option<PathBuf>,

    /// Lateral slab area in Å² (instead of --slab-structure)
    #[arg(long)]
    pub area: Option<f64>,

    /// Bulk structure, used when the bulk output lacks an atom count
    #[arg(long)]
    pub bulk_structure: Option<PathBuf>,

    /// Record the energies and result in this session file
    #[arg(long)]
    pub session: Option<PathBuf>,
}
