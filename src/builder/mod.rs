//! # 几何构建模块
//!
//! 由体相结构构建表面切片与可视化超胞。
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 使用 `models/`、`nalgebra`
//! - 子模块: plane（切面基矢搜索）、slab（切片生成）、supercell（超胞扩展）

pub mod plane;
pub mod slab;
pub mod supercell;

pub use plane::{find_plane_basis, PlaneBasis};
pub use slab::{build_slab, SlabGenerator};
pub use supercell::SupercellExpander;
