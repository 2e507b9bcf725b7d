//! # 表面切片数据模型
//!
//! 定义 Miller 指数、切片参数 (SlabSpec) 与切片结果 (Slab)。
//!
//! ## 依赖关系
//! - 被 `builder/slab.rs`、`session.rs`、`commands/` 使用
//! - 使用 `models/structure.rs`

use crate::error::{QslabError, Result};
use crate::models::Crystal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 整数最大公约数（欧几里得算法）
pub fn gcd(a: i32, b: i32) -> i32 {
    let mut a = a.abs();
    let mut b = b.abs();
    while b != 0 {
        let temp = b;
        b = a % b;
        a = temp;
    }
    a
}

/// Miller 指数分量绝对值上限
pub const MAX_MILLER_INDEX: i32 = 1000;

/// Miller 指数 (h k l)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MillerIndex {
    pub h: i32,
    pub k: i32,
    pub l: i32,
}

impl MillerIndex {
    /// 创建 Miller 指数，拒绝 (0 0 0) 与超出 ±`MAX_MILLER_INDEX` 的分量
    pub fn new(h: i32, k: i32, l: i32) -> Result<Self> {
        let index = MillerIndex { h, k, l };
        index.validate()?;
        Ok(index)
    }

    pub fn validate(&self) -> Result<()> {
        let zero = self.h == 0 && self.k == 0 && self.l == 0;
        let too_large = self
            .as_array()
            .iter()
            .any(|x| x.unsigned_abs() > MAX_MILLER_INDEX.unsigned_abs());
        if zero || too_large {
            return Err(QslabError::InvalidMillerIndex {
                h: self.h,
                k: self.k,
                l: self.l,
            });
        }
        Ok(())
    }

    pub fn as_array(&self) -> [i32; 3] {
        [self.h, self.k, self.l]
    }

    /// 约化为互质形式，如 (2 2 0) -> (1 1 0)
    pub fn reduced(&self) -> MillerIndex {
        let g = gcd(gcd(self.h, self.k), self.l).max(1);
        MillerIndex {
            h: self.h / g,
            k: self.k / g,
            l: self.l / g,
        }
    }

    /// 列出 max |index| <= `max_index` 的全部互质 Miller 指数
    ///
    /// 只保留首个非零分量为正者，(h k l) 与 (-h -k -l) 只出现一次。
    /// 不做对称约化。按 h² + k² + l² 升序，同模长按 (h, k, l) 降序。
    pub fn enumerate(max_index: i32) -> Vec<MillerIndex> {
        let n = max_index.clamp(0, MAX_MILLER_INDEX);
        let mut indices = Vec::new();
        for h in 0..=n {
            for k in -n..=n {
                for l in -n..=n {
                    let leading_positive = h > 0 || (h == 0 && (k > 0 || (k == 0 && l > 0)));
                    if leading_positive && gcd(gcd(h, k), l) == 1 {
                        indices.push(MillerIndex { h, k, l });
                    }
                }
            }
        }
        indices.sort_by_key(|m| {
            let [h, k, l] = m.as_array();
            (h * h + k * k + l * l, std::cmp::Reverse(m.as_array()))
        });
        indices
    }
}

impl fmt::Display for MillerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.h, self.k, self.l)
    }
}

/// 切片参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlabSpec {
    pub miller: MillerIndex,
    /// 重复单元层数 (>= 1)
    pub layers: usize,
    /// 真空层厚度 (Å, >= 0)
    pub vacuum: f64,
}

impl SlabSpec {
    pub fn new(miller: MillerIndex, layers: usize, vacuum: f64) -> Self {
        SlabSpec {
            miller,
            layers,
            vacuum,
        }
    }

    /// 在任何几何计算之前校验参数
    pub fn validate(&self) -> Result<()> {
        self.miller.validate()?;
        if self.layers < 1 {
            return Err(QslabError::InvalidLayerCount(self.layers));
        }
        if !self.vacuum.is_finite() || self.vacuum < 0.0 {
            return Err(QslabError::InvalidVacuum(self.vacuum));
        }
        Ok(())
    }
}

/// 切片结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slab {
    /// 切片晶胞（a', b' 在切面内，c' 沿法向并含真空层）
    pub crystal: Crystal,

    /// 生成参数
    pub spec: SlabSpec,

    /// 原子数 = 每个重复单元原子数 × 层数
    pub atom_count: usize,

    /// 侧向面积 |a' × b'| (Å²)
    pub area: f64,

    /// 沿法向的重复距离 d = V / A (Å)
    pub repeat_distance: f64,

    /// 不同原子平面的数目
    pub plane_count: usize,

    /// 体相晶格坐标下的面内向量 u, v 与堆垛向量 w
    pub transformation: [[i32; 3]; 3],
}

impl Slab {
    /// 材料部分厚度（不含真空）
    pub fn material_thickness(&self) -> f64 {
        self.spec.layers as f64 * self.repeat_distance
    }
}
