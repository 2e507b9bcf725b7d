//! # XYZ 格式写出
//!
//! 写出 extended-XYZ：第二行注释携带晶格与坐标列说明，
//! 可直接被 ASE / OVITO 读取用于可视化。
//!
//! ```text
//! N
//! Lattice="ax ay az bx by bz cx cy cz" Properties=species:S:1:pos:R:3 name=...
//! El x y z
//! ```
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/structure.rs`

use crate::models::Crystal;

/// 将 Crystal 转换为 extended-XYZ 格式字符串（笛卡尔坐标，Å）
pub fn to_xyz_string(crystal: &Crystal) -> String {
    let lattice: Vec<String> = crystal
        .lattice
        .matrix()
        .iter()
        .flatten()
        .map(|x| format!("{:.8}", x))
        .collect();

    let mut result = String::new();
    result.push_str(&format!("{}\n", crystal.atoms.len()));
    result.push_str(&format!(
        "Lattice=\"{}\" Properties=species:S:1:pos:R:3 pbc=\"T T T\" name={}\n",
        lattice.join(" "),
        crystal.name.replace(' ', "_")
    ));

    for (atom, pos) in crystal.atoms.iter().zip(crystal.cartesian_positions()) {
        result.push_str(&format!(
            "{} {:16.10} {:16.10} {:16.10}\n",
            atom.element, pos[0], pos[1], pos[2]
        ));
    }

    result
}
