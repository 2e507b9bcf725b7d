//! # qslab - Quantum ESPRESSO 表面切片与表面能工具
//!
//! 由体相结构构建表面切片、生成 pw.x 输入、由 pw.x 输出计算表面能，
//! 统一成单一可执行文件。
//!
//! ## 子命令
//! - `slab`      - 构建单个 Miller 指数的切片
//! - `scan`      - 并行扫描一组 Miller 指数
//! - `supercell` - 生成显示用超胞
//! - `input`     - 生成 pw.x 输入文件
//! - `energy`    - 计算表面能
//! - `collect`   - 批量汇总 pw.x 输出能量
//! - `session`   - 查看会话文件
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── parsers/   (结构文件读写)
//!   │     ├── builder/   (切片与超胞几何)
//!   │     ├── analysis/  (表面能)
//!   │     ├── qe/        (pw.x 输入/输出、赝势)
//!   │     ├── batch/     (并行批处理)
//!   │     ├── session.rs (会话持久化)
//!   │     └── models/    (数据模型)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod analysis;
mod batch;
mod builder;
mod cli;
mod commands;
mod error;
mod models;
mod parsers;
mod qe;
mod session;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            utils::output::print_error(&format!("  caused by: {}", cause));
            source = cause.source();
        }
        std::process::exit(1);
    }
}
