//! # 分析模块
//!
//! 将体相与切片的总能量归约为表面能。
//!
//! ## 依赖关系
//! - 被 `commands/energy.rs` 使用
//! - 子模块: surface_energy

pub mod surface_energy;

pub use surface_energy::{calculate_surface_energy, lateral_area};
