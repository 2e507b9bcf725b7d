//! # 数据模型模块
//!
//! 定义统一的晶体结构、切片参数和计算结果数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`、`builder/`、`analysis/`、`qe/` 和 `commands/` 使用
//! - 子模块: structure, slab, calculation

pub mod calculation;
pub mod slab;
pub mod structure;

pub use calculation::{
    ConsistencyWarning, EnergyRecord, SurfaceEnergyResult, SystemTag, RY_TO_EV,
};
pub use slab::{MillerIndex, Slab, SlabSpec};
pub use structure::{Atom, Crystal, Lattice};
