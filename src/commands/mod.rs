//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑：读取文件、调用核心函数、打印报告、写出结果。
//! 核心计算均在 `builder/`、`analysis/`、`qe/` 中完成，此处只做 I/O 适配。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `parsers/`, `builder/`, `analysis/`, `qe/`, `session.rs`, `utils/`
//! - 子模块: slab, scan, supercell, input, energy, collect, session

pub mod collect;
pub mod energy;
pub mod input;
pub mod scan;
pub mod session;
pub mod slab;
pub mod supercell;

use crate::cli::Commands;
use crate::error::Result;
use crate::models::Crystal;
use crate::utils::output;

use std::path::Path;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Slab(args) => slab::execute(args),
        Commands::Scan(args) => scan::execute(args),
        Commands::Supercell(args) => supercell::execute(args),
        Commands::Input(args) => input::execute(args),
        Commands::Energy(args) => energy::execute(args),
        Commands::Collect(args) => collect::execute(args),
        Commands::Session(args) => session::execute(args),
    }
}

/// 打印结构摘要
pub(crate) fn print_structure_summary(crystal: &Crystal, path: &Path) {
    let (a, b, c, alpha, beta, gamma) = crystal.lattice.parameters();
    output::print_info(&format!(
        "Loaded '{}' from {} ({} atoms)",
        crystal.name,
        path.display(),
        crystal.len()
    ));
    output::print_kv("Formula", &crystal.formula());
    output::print_kv("a, b, c (Å)", &format!("{:.4}, {:.4}, {:.4}", a, b, c));
    output::print_kv(
        "α, β, γ (°)",
        &format!("{:.3}, {:.3}, {:.3}", alpha, beta, gamma),
    );
    output::print_kv("Volume (Å³)", &format!("{:.4}", crystal.volume()));
}
