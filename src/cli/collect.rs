//! # collect 子命令 CLI 定义
//!
//! 批量解析 pw.x 输出并汇总总能量。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/collect.rs`

use super::SystemArg;

use clap::Args;
use std::path::PathBuf;

/// collect 子命令参数
#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Directory containing pw.x outputs (or a single output file)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Glob pattern for output files (comma-separated for several)
    #[arg(short, long, default_value = "*.out")]
    pub pattern: String,

    /// Recurse into subdirectories
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// Tag attached to every parsed record
    #[arg(long, value_enum, default_value = "bulk")]
    pub system: SystemArg,

    /// Write the energy table as CSV
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,
}
