//! # 表面切片生成器
//!
//! (体相结构, SlabSpec) -> Slab 的确定性映射。
//!
//! ## 算法概述
//! 1. 校验参数（在任何几何计算之前）
//! 2. 搜索切面整数基矢 (u, v, w)，见 `builder/plane.rs`
//! 3. 将体相原子重新表示到定向晶胞中，沿 w 复制 `layers` 个重复单元
//! 4. 按法向高度聚类原子平面（容差 1e-3 Å）
//! 5. 平移使最低原子平面位于高度 0
//! 6. c' 沿面外方向，长度 = layers · d + vacuum；笛卡尔坐标与真空无关
//! 7. 旋转到标准取向：a' 沿 x，b' 在 xy 平面，c' 沿 z，
//!    与 `Lattice::from_parameters` 一致，CIF 写出后可无损读回
//!
//! 面外方向取 a' × b' 的方向。体相为右手晶胞时即切面法向 n̂，
//! 左手晶胞时为 -n̂，切片晶胞始终是右手系。
//!
//! ## 依赖关系
//! - 被 `commands/slab.rs`、`commands/scan.rs` 调用
//! - 使用 `builder/plane.rs`、`models/`

use crate::builder::plane::{self, PlaneBasis};
use crate::error::{QslabError, Result};
use crate::models::{Atom, Crystal, Lattice, Slab, SlabSpec};
use nalgebra::Vector3;

/// 原子平面聚类容差 (Å)
pub const PLANE_TOLERANCE: f64 = 1e-3;

/// 分数坐标回卷容差
const WRAP_TOLERANCE: f64 = 1e-8;

/// 回卷到 [0, 1)，紧贴 1 的值归零
pub(crate) fn wrap(x: f64) -> f64 {
    let y = x - x.floor();
    if 1.0 - y < WRAP_TOLERANCE {
        0.0
    } else {
        y
    }
}

/// 切片中的一个原子（排序前）
#[derive(Debug, Clone)]
struct SlabSite {
    element: String,
    label: Option<String>,
    replica: usize,
    source: usize,
    cart: Vector3<f64>,
    height: f64,
    plane: usize,
}

/// 表面切片生成器
pub struct SlabGenerator {
    spec: SlabSpec,
}

impl SlabGenerator {
    pub fn new(spec: SlabSpec) -> Self {
        Self { spec }
    }

    /// 生成切片，不修改体相输入
    pub fn generate(&self, bulk: &Crystal) -> Result<Slab> {
        self.spec.validate()?;
        if bulk.is_empty() {
            return Err(QslabError::InvalidArgument(format!(
                "bulk structure '{}' has no atoms",
                bulk.name
            )));
        }

        let basis = plane::find_plane_basis(&bulk.lattice, &self.spec.miller)?;

        let cart_of = |u: &[i32; 3]| {
            Vector3::from(
                bulk.lattice
                    .to_cartesian([u[0] as f64, u[1] as f64, u[2] as f64]),
            )
        };
        let a = cart_of(&basis.u);
        let b = cart_of(&basis.v);
        let c = cart_of(&basis.w);

        // 定向晶胞（体积与体相相同）
        let oriented = Lattice::new(rows(&a, &b, &c))?;
        let normal = Vector3::from(basis.normal);
        let up = if a.cross(&b).dot(&normal) > 0.0 {
            normal
        } else {
            -normal
        };

        let mut sites = self.replicate(bulk, &oriented, &up);
        let plane_count = assign_planes(&mut sites);

        sites.sort_by(|x, y| {
            (x.plane, x.replica, x.source).cmp(&(y.plane, y.replica, y.source))
        });

        // 最低平面移至高度 0
        let z0 = sites
            .iter()
            .map(|s| s.height)
            .fold(f64::INFINITY, f64::min);
        for site in &mut sites {
            site.cart -= up * z0;
            site.height -= z0;
        }

        let c_length = self.spec.layers as f64 * basis.repeat_distance + self.spec.vacuum;
        let e1 = a.normalize();
        let e2 = up.cross(&e1);
        let lattice = Lattice::new([
            [a.norm(), 0.0, 0.0],
            [b.dot(&e1), b.dot(&e2), 0.0],
            [0.0, 0.0, c_length],
        ])?;

        // 面内分数坐标在体相坐标系中求解，与真空厚度无关
        let in_plane = Lattice::new(rows(&a, &b, &up))?;
        let atoms: Vec<Atom> = sites
            .into_iter()
            .map(|site| {
                let f = in_plane.to_fractional([site.cart.x, site.cart.y, site.cart.z]);
                Atom {
                    element: site.element,
                    position: [wrap(f[0]), wrap(f[1]), site.height / c_length],
                    label: site.label,
                }
            })
            .collect();

        Ok(self.assemble(bulk, &basis, lattice, atoms, a.cross(&b).norm(), plane_count))
    }

    /// 将体相原子映射到定向晶胞并沿堆垛方向复制
    fn replicate(&self, bulk: &Crystal, oriented: &Lattice, up: &Vector3<f64>) -> Vec<SlabSite> {
        let base: Vec<[f64; 3]> = bulk
            .atoms
            .iter()
            .map(|atom| {
                let f = oriented.to_fractional(bulk.lattice.to_cartesian(atom.position));
                [wrap(f[0]), wrap(f[1]), wrap(f[2])]
            })
            .collect();

        let mut sites = Vec::with_capacity(base.len() * self.spec.layers);
        for replica in 0..self.spec.layers {
            for (source, (atom, f)) in bulk.atoms.iter().zip(&base).enumerate() {
                let cart = Vector3::from(oriented.to_cartesian([f[0], f[1], f[2] + replica as f64]));
                sites.push(SlabSite {
                    element: atom.element.clone(),
                    label: atom.label.clone(),
                    replica,
                    source,
                    height: cart.dot(up),
                    cart,
                    plane: 0,
                });
            }
        }
        sites
    }

    fn assemble(
        &self,
        bulk: &Crystal,
        basis: &PlaneBasis,
        lattice: Lattice,
        atoms: Vec<Atom>,
        area: f64,
        plane_count: usize,
    ) -> Slab {
        let m = basis.miller;
        let name = format!("{}_{}{}{}_{}L", bulk.name, m.h, m.k, m.l, self.spec.layers);
        let atom_count = atoms.len();
        let mut crystal = Crystal::new(name, lattice, atoms);
        crystal.source_format = Some("slab".to_string());

        Slab {
            crystal,
            spec: self.spec,
            atom_count,
            area,
            repeat_distance: basis.repeat_distance,
            plane_count,
            transformation: [basis.u, basis.v, basis.w],
        }
    }
}

fn rows(a: &Vector3<f64>, b: &Vector3<f64>, c: &Vector3<f64>) -> [[f64; 3]; 3] {
    [[a.x, a.y, a.z], [b.x, b.y, b.z], [c.x, c.y, c.z]]
}

/// 按高度聚类原子平面，返回平面数
fn assign_planes(sites: &mut [SlabSite]) -> usize {
    if sites.is_empty() {
        return 0;
    }

    let mut order: Vec<usize> = (0..sites.len()).collect();
    order.sort_by(|&i, &j| {
        sites[i]
            .height
            .total_cmp(&sites[j].height)
            .then_with(|| (sites[i].replica, sites[i].source).cmp(&(sites[j].replica, sites[j].source)))
    });

    let mut plane = 0;
    let mut plane_start = sites[order[0]].height;
    for &idx in &order {
        if sites[idx].height - plane_start > PLANE_TOLERANCE {
            plane += 1;
            plane_start = sites[idx].height;
        }
        sites[idx].plane = plane;
    }
    plane + 1
}

/// 便捷函数
pub fn build_slab(bulk: &Crystal, spec: SlabSpec) -> Result<Slab> {
    SlabGenerator::new(spec).generate(bulk)
}
