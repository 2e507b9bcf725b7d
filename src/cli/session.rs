//! # session 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/session.rs`

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// session 主命令参数
#[derive(Args, Debug)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommands,
}

/// session 子命令
#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// Summarize the structures, parameters and results of a session file
    Show {
        /// Session JSON file
        path: PathBuf,
    },
}
