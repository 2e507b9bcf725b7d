//! # Quantum ESPRESSO 接口模块
//!
//! pw.x 输入生成与输出解析。
//!
//! ## 依赖关系
//! - 被 `commands/input.rs`、`commands/energy.rs`、`commands/collect.rs` 使用
//! - 使用 `models/`
//! - 子模块: params（参数）、input（输入生成）、output（输出解析）、
//!   pseudo（赝势查找与复制）、masses（原子质量表）

pub mod input;
pub mod masses;
pub mod output;
pub mod params;
pub mod pseudo;

pub use input::compose_input;
pub use output::{parse_pw_output, parse_pw_output_file};
pub use params::QeParameters;
