//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `slab`: 由体相结构构建表面切片
//! - `scan`: 并行扫描一组 Miller 指数
//! - `supercell`: 生成显示用超胞
//! - `input`: 生成 pw.x 输入文件
//! - `energy`: 由 pw.x 输出计算表面能
//! - `collect`: 批量汇总 pw.x 输出能量
//! - `session`: 会话文件操作（嵌套子命令）
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: slab, supercell, input, energy, collect, session

pub mod collect;
pub mod energy;
pub mod input;
pub mod session;
pub mod slab;
pub mod supercell;

use clap::{Parser, Subcommand, ValueEnum};

use crate::models::SystemTag;

/// qslab - Quantum ESPRESSO 表面切片与表面能工具
#[derive(Parser)]
#[command(name = "qslab")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Slab builder and surface-energy toolkit for Quantum ESPRESSO", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Build a surface slab from a bulk structure (CIF/POSCAR)
    Slab(slab::SlabArgs),

    /// Build slabs for every Miller index up to a maximum in parallel
    Scan(slab::ScanArgs),

    /// Replicate a structure into a supercell for display
    Supercell(supercell::SupercellArgs),

    /// Compose a pw.x input deck for a bulk or slab structure
    Input(input::InputArgs),

    /// Compute the surface energy from bulk and slab pw.x outputs
    Energy(energy::EnergyArgs),

    /// Tabulate total energies of many pw.x outputs
    Collect(collect::CollectArgs),

    /// Inspect session documents
    Session(session::SessionArgs),
}

/// 计算体系类型
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum SystemArg {
    /// Periodic bulk crystal
    Bulk,
    /// Surface slab with vacuum
    Slab,
}

impl From<SystemArg> for SystemTag {
    fn from(arg: SystemArg) -> Self {
        match arg {
            SystemArg::Bulk => SystemTag::Bulk,
            SystemArg::Slab => SystemTag::Slab,
        }
    }
}

/// 解析 "NX,NY,NZ" 或 "NXxNYxNZ" 形式的倍数
pub fn parse_multipliers(input: &str) -> Result<[usize; 3], String> {
    let parts: Vec<&str> = input
        .split(|c| c == ',' || c == 'x' || c == 'X')
        .map(|s| s.trim())
        .collect();
    if parts.len() != 3 {
        return Err(format!(
            "Invalid multipliers '{}'. Use NX,NY,NZ (e.g., 2,2,1)",
            input
        ));
    }

    let mut out = [0usize; 3];
    for (slot, part) in out.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|_| format!("Invalid multiplier '{}' in '{}'", part, input))?;
        if *slot == 0 {
            return Err(format!("Multipliers must be >= 1, got '{}'", input));
        }
    }
    Ok(out)
}
