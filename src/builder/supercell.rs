//! # 超胞扩展
//!
//! 整数倍复制晶胞，仅用于可视化输出（XYZ），不参与输入文件、会话或能量计算。
//!
//! ## 依赖关系
//! - 被 `commands/supercell.rs`、`commands/slab.rs` (`--view`) 调用
//! - 使用 `models/structure.rs`

use crate::error::{QslabError, Result};
use crate::models::{Atom, Crystal, Lattice};

/// 超胞扩展器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupercellExpander {
    multipliers: [usize; 3],
}

impl SupercellExpander {
    /// 创建扩展器，任一倍数 < 1 时报错
    pub fn new(multipliers: [usize; 3]) -> Result<Self> {
        if multipliers.iter().any(|&n| n < 1) {
            return Err(QslabError::InvalidSupercell(multipliers));
        }
        Ok(Self { multipliers })
    }

    /// 复制原子次数
    pub fn factor(&self) -> usize {
        self.multipliers.iter().product()
    }

    /// 生成超胞（原子按 i, j, k 循环顺序排列）
    pub fn apply(&self, crystal: &Crystal) -> Result<Crystal> {
        let [nx, ny, nz] = self.multipliers;
        let n = [nx as f64, ny as f64, nz as f64];

        let mut matrix = crystal.lattice.matrix();
        for (row, scale) in matrix.iter_mut().zip(n) {
            for x in row.iter_mut() {
                *x *= scale;
            }
        }
        let lattice = Lattice::new(matrix)?;

        let mut atoms = Vec::with_capacity(crystal.len() * self.factor());
        for i in 0..nx {
            for j in 0..ny {
                for k in 0..nz {
                    let shift = [i as f64, j as f64, k as f64];
                    for atom in &crystal.atoms {
                        let p = atom.position;
                        atoms.push(Atom {
                            element: atom.element.clone(),
                            position: [
                                (p[0] + shift[0]) / n[0],
                                (p[1] + shift[1]) / n[1],
                                (p[2] + shift[2]) / n[2],
                            ],
                            label: atom.label.clone(),
                        });
                    }
                }
            }
        }

        let name = format!("{}_{}x{}x{}", crystal.name, nx, ny, nz);
        let mut expanded = Crystal::new(name, lattice, atoms);
        expanded.source_format = crystal.source_format.clone();
        Ok(expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Crystal {
        let lattice = Lattice::from_parameters(3.0, 4.0, 5.0, 90.0, 90.0, 90.0).unwrap();
        Crystal::new(
            "AB",
            lattice,
            vec![Atom::new("A", [0.0, 0.0, 0.0]), Atom::new("B", [0.5, 0.5, 0.5])],
        )
    }

    #[test]
    fn test_supercell_counts_and_volume() {
        let crystal = sample();
        let expanded = SupercellExpander::new([2, 3, 1]).unwrap().apply(&crystal).unwrap();

        assert_eq!(expanded.len(), 12);
        assert!((expanded.volume() - 6.0 * crystal.volume()).abs() < 1e-9);
        assert_eq!(expanded.composition()["A"], 6);
        assert_eq!(expanded.name, "AB_2x3x1");
    }

    #[test]
    fn test_supercell_loop_order() {
        let expanded = SupercellExpander::new([2, 1, 2]).unwrap().apply(&sample()).unwrap();
        // (i, j, k) = (0,0,0), (0,0,1), (1,0,0), (1,0,1)
        let firsts: Vec<[f64; 3]> = expanded.atoms.iter().step_by(2).map(|a| a.position).collect();
        assert_eq!(
            firsts,
            vec![[0.0, 0.0, 0.0], [0.0, 0.0, 0.5], [0.5, 0.0, 0.0], [0.5, 0.0, 0.5]]
        );
        assert_eq!(expanded.atoms[1].element, "B");
    }

    #[test]
    fn test_supercell_cartesian_positions_preserved() {
        let crystal = sample();
        let expanded = SupercellExpander::new([1, 1, 1]).unwrap().apply(&crystal).unwrap();
        assert_eq!(expanded.cartesian_positions(), crystal.cartesian_positions());
    }

    #[test]
    fn test_invalid_multiplier() {
        assert!(matches!(
            SupercellExpander::new([1, 0, 2]),
            Err(QslabError::InvalidSupercell([1, 0, 2]))
        ));
    }
}
