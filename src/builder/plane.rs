//! # 切面整数基矢构造
//!
//! 对给定 Miller 指数，在体相晶格中构造一组幺模整数变换 (u, v, w)：
//! u, v 位于切面内并构成面内二维子格子的原胞基，w 满足 n · w = 1，
//! 因此 det[u, v, w] = 1，新晶胞体积与体相晶胞相同。
//!
//! ## 算法
//! 1. n = 互质化的 (h k l)，法向 G = h b1 + k b2 + l b3
//! 2. 扩展欧几里得构造：g = gcd(h, k) = p·h + q·k，
//!    面内基 (-p·l, -q·l, g) 与 (k/g, -h/g, 0)，其叉积恰为 +n；
//!    由 a·g + b·l = 1 得 w = (a·p, a·q, b)
//! 3. 按笛卡尔度量做 Gauss (Lagrange) 约化，得到最短面内基
//! 4. 在约化基的 i·u + j·v (|i|, |j| <= 2) 组合中选取 u × v = +n 的配对：
//!    (|a'|, |b'|) 字典序最小，再取夹角较小者，最后按整数偏好
//! 5. 用面内格矢平移 w，使其面内分量最小
//!
//! 所有浮点比较都先量化到 1e-6，整数运算使用 i64。
//!
//! ## 依赖关系
//! - 被 `builder/slab.rs` 调用
//! - 使用 `models/structure.rs`、`models/slab.rs`

use crate::error::{QslabError, Result};
use crate::models::{Lattice, MillerIndex};
use nalgebra::Vector3;

/// 约化基附近组合系数范围
const COMBINATION_RANGE: i64 = 2;

/// Gauss 约化最大迭代次数
const MAX_REDUCTION_STEPS: usize = 1000;

/// 浮点量化精度
const QUANTUM: f64 = 1e-6;

type IVec = [i64; 3];

/// 切面基矢结果
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneBasis {
    /// 约化后的 Miller 指数
    pub miller: MillerIndex,
    /// 面内向量（体相晶格坐标）
    pub u: [i32; 3],
    pub v: [i32; 3],
    /// 堆垛向量，n · w = 1
    pub w: [i32; 3],
    /// 单位法向（笛卡尔，与 G 同向）
    pub normal: [f64; 3],
    /// 沿法向的重复距离 d = 1 / |G| (Å)
    pub repeat_distance: f64,
}

#[derive(Debug, Clone)]
struct Candidate {
    int: IVec,
    cart: Vector3<f64>,
    length_key: i64,
}

fn quantize(x: f64) -> i64 {
    (x / QUANTUM).round() as i64
}

/// 整数向量的偏好键：负分量少者优先，其次按分量降序
fn preference(u: &IVec) -> (usize, IVec) {
    let negatives = u.iter().filter(|&&x| x < 0).count();
    (negatives, [-u[0], -u[1], -u[2]])
}

fn dot_i(a: &IVec, b: &IVec) -> i64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross_i(a: &IVec, b: &IVec) -> IVec {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// i·a + j·b
fn combine(i: i64, a: &IVec, j: i64, b: &IVec) -> IVec {
    [
        i * a[0] + j * b[0],
        i * a[1] + j * b[1],
        i * a[2] + j * b[2],
    ]
}

fn to_cart(lattice: &Lattice, u: &IVec) -> Vector3<f64> {
    Vector3::from(lattice.to_cartesian([u[0] as f64, u[1] as f64, u[2] as f64]))
}

/// 扩展欧几里得：返回 (g, x, y)，a·x + b·y = g >= 0
fn ext_gcd(a: i64, b: i64) -> (i64, i64, i64) {
    let (mut r0, mut r1) = (a, b);
    let (mut x0, mut x1) = (1, 0);
    let (mut y0, mut y1) = (0, 1);
    while r1 != 0 {
        let q = r0 / r1;
        (r0, r1) = (r1, r0 - q * r1);
        (x0, x1) = (x1, x0 - q * x1);
        (y0, y1) = (y1, y0 - q * y1);
    }
    if r0 < 0 {
        (-r0, -x0, -y0)
    } else {
        (r0, x0, y0)
    }
}

/// 法向量 G = h b1 + k b2 + l b3（未归一化，笛卡尔）
pub fn plane_normal(lattice: &Lattice, miller: &MillerIndex) -> [f64; 3] {
    let b = lattice.reciprocal();
    let hkl = [miller.h as f64, miller.k as f64, miller.l as f64];
    let mut g = [0.0; 3];
    for (i, coeff) in hkl.iter().enumerate() {
        for x in 0..3 {
            g[x] += coeff * b[i][x];
        }
    }
    g
}

/// 互质 n 的面内原胞基 (u, v)，u × v = +n，以及 n · w = 1 的 w
fn integer_basis(n: &IVec) -> (IVec, IVec, IVec) {
    let [h, k, l] = *n;
    let (g, p, q) = ext_gcd(h, k);
    if g == 0 {
        // n = (0 0 ±1)
        return if l > 0 {
            ([1, 0, 0], [0, 1, 0], [0, 0, 1])
        } else {
            ([0, 1, 0], [1, 0, 0], [0, 0, -1])
        };
    }

    let u = [-p * l, -q * l, g];
    let v = [k / g, -h / g, 0];
    let (_, a, b) = ext_gcd(g, l);
    (u, v, [a * p, a * q, b])
}

/// 按笛卡尔度量做 Gauss 约化，保持 u × v = +n
fn gauss_reduce(lattice: &Lattice, n: &IVec, u: IVec, v: IVec) -> Option<(IVec, IVec)> {
    let (mut u, mut v) = (u, v);
    let mut reduced = false;
    for _ in 0..MAX_REDUCTION_STEPS {
        let (mut cu, mut cv) = (to_cart(lattice, &u), to_cart(lattice, &v));
        if cu.norm_squared() > cv.norm_squared() {
            std::mem::swap(&mut u, &mut v);
            std::mem::swap(&mut cu, &mut cv);
        }
        let m = (cu.dot(&cv) / cu.norm_squared()).round() as i64;
        if m == 0 {
            reduced = true;
            break;
        }
        v = combine(1, &v, -m, &u);
    }
    if !reduced {
        return None;
    }

    if cross_i(&u, &v) == *n {
        Some((u, v))
    } else {
        Some((u, [-v[0], -v[1], -v[2]]))
    }
}

/// 构造切面基矢
pub fn find_plane_basis(lattice: &Lattice, miller: &MillerIndex) -> Result<PlaneBasis> {
    miller.validate()?;
    let reduced = miller.reduced();
    let [h, k, l] = reduced.as_array();
    let n: IVec = [h as i64, k as i64, l as i64];

    let failed = |reason: &str| QslabError::BasisSearchFailed {
        h: miller.h,
        k: miller.k,
        l: miller.l,
        reason: reason.to_string(),
    };

    let g = Vector3::from(plane_normal(lattice, &reduced));
    let g_norm = g.norm();
    if g_norm < 1e-12 {
        return Err(failed("zero plane normal"));
    }
    let normal = g / g_norm;

    // 1. 整数基与约化
    let (u0, v0, w0) = integer_basis(&n);
    let (ur, vr) =
        gauss_reduce(lattice, &n, u0, v0).ok_or_else(|| failed("lattice reduction did not converge"))?;

    // 2. 约化基附近的本原组合
    let mut candidates: Vec<Candidate> = Vec::new();
    for i in -COMBINATION_RANGE..=COMBINATION_RANGE {
        for j in -COMBINATION_RANGE..=COMBINATION_RANGE {
            if ext_gcd(i, j).0 != 1 {
                continue;
            }
            let int = combine(i, &ur, j, &vr);
            let cart = to_cart(lattice, &int);
            candidates.push(Candidate {
                int,
                length_key: quantize(cart.norm()),
                cart,
            });
        }
    }

    // 3. 配对：u × v = +n
    type PairKey = (i64, i64, i64, (usize, IVec), (usize, IVec));
    let mut best: Option<(PairKey, usize, usize)> = None;

    for (i, cu) in candidates.iter().enumerate() {
        for (j, cv) in candidates.iter().enumerate() {
            if i == j || cross_i(&cu.int, &cv.int) != n {
                continue;
            }
            let cos = cu.cart.dot(&cv.cart) / (cu.cart.norm() * cv.cart.norm());
            let angle = cos.clamp(-1.0, 1.0).acos().to_degrees();
            let key = (
                cu.length_key,
                cv.length_key,
                quantize(angle),
                preference(&cu.int),
                preference(&cv.int),
            );
            if best.as_ref().map_or(true, |(k, _, _)| key < *k) {
                best = Some((key, i, j));
            }
        }
    }

    let (_, i, j) = best.ok_or_else(|| failed("no oriented in-plane pair"))?;
    let (u, a_cart) = (candidates[i].int, candidates[i].cart);
    let (v, b_cart) = (candidates[j].int, candidates[j].cart);

    // 4. 堆垛向量
    debug_assert_eq!(dot_i(&n, &w0), 1);
    let w = reduce_stacking(lattice, &w0, &u, &v, &a_cart, &b_cart, &normal);

    let narrow = |x: &IVec| -> Result<[i32; 3]> {
        let mut out = [0i32; 3];
        for (o, &c) in out.iter_mut().zip(x) {
            *o = i32::try_from(c).map_err(|_| failed("basis component out of range"))?;
        }
        Ok(out)
    };

    Ok(PlaneBasis {
        miller: reduced,
        u: narrow(&u)?,
        v: narrow(&v)?,
        w: narrow(&w)?,
        normal: [normal.x, normal.y, normal.z],
        repeat_distance: 1.0 / g_norm,
    })
}

/// 用面内格矢平移 w，使其面内分量（倾斜）最小
fn reduce_stacking(
    lattice: &Lattice,
    w0: &IVec,
    u: &IVec,
    v: &IVec,
    a: &Vector3<f64>,
    b: &Vector3<f64>,
    normal: &Vector3<f64>,
) -> IVec {
    let w_cart = to_cart(lattice, w0);
    let in_plane = w_cart - normal * w_cart.dot(normal);

    // 求解 in_plane = s a + t b
    let (aa, ab, bb) = (a.dot(a), a.dot(b), b.dot(b));
    let (pa, pb) = (in_plane.dot(a), in_plane.dot(b));
    let det = aa * bb - ab * ab;
    let s = (pa * bb - pb * ab) / det;
    let t = (pb * aa - pa * ab) / det;

    let (s0, t0) = (s.floor() as i64, t.floor() as i64);
    let mut best: Option<((i64, (usize, IVec)), IVec)> = None;

    for di in -1..=2 {
        for dj in -1..=2 {
            let (ci, cj) = (s0 + di, t0 + dj);
            let w = [
                w0[0] - ci * u[0] - cj * v[0],
                w0[1] - ci * u[1] - cj * v[1],
                w0[2] - ci * u[2] - cj * v[2],
            ];
            let key = (quantize(to_cart(lattice, &w).norm()), preference(&w));
            if best.as_ref().map_or(true, |(k, _)| key < *k) {
                best = Some((key, w));
            }
        }
    }

    best.map(|(_, w)| w).unwrap_or(*w0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide(x: [i32; 3]) -> IVec {
        [x[0] as i64, x[1] as i64, x[2] as i64]
    }

    fn det_i(u: [i32; 3], v: [i32; 3], w: [i32; 3]) -> i64 {
        dot_i(&cross_i(&wide(u), &wide(v)), &wide(w))
    }

    fn cubic(a: f64) -> Lattice {
        Lattice::from_parameters(a, a, a, 90.0, 90.0, 90.0).unwrap()
    }

    #[test]
    fn test_cubic_100() {
        let basis = find_plane_basis(&cubic(4.0), &MillerIndex::new(1, 0, 0).unwrap()).unwrap();
        assert_eq!(basis.u, [0, 1, 0]);
        assert_eq!(basis.v, [0, 0, 1]);
        assert_eq!(basis.w, [1, 0, 0]);
        assert!((basis.repeat_distance - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_cubic_001() {
        let basis = find_plane_basis(&cubic(3.0), &MillerIndex::new(0, 0, 1).unwrap()).unwrap();
        assert_eq!(basis.u, [1, 0, 0]);
        assert_eq!(basis.v, [0, 1, 0]);
        assert_eq!(basis.w, [0, 0, 1]);
    }

    #[test]
    fn test_cubic_111_prefers_acute_angle() {
        let lattice = cubic(4.0);
        let basis = find_plane_basis(&lattice, &MillerIndex::new(1, 1, 1).unwrap()).unwrap();
        assert_eq!(basis.u, [1, 0, -1]);
        assert_eq!(basis.v, [0, 1, -1]);

        let a = to_cart(&lattice, &wide(basis.u));
        let b = to_cart(&lattice, &wide(basis.v));
        let angle = (a.dot(&b) / (a.norm() * b.norm())).acos().to_degrees();
        assert!((angle - 60.0).abs() < 1e-9);
        assert!((basis.repeat_distance - 4.0 / 3f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_non_coprime_index_is_reduced() {
        let lattice = cubic(4.0);
        let a = find_plane_basis(&lattice, &MillerIndex::new(2, 2, 0).unwrap()).unwrap();
        let b = find_plane_basis(&lattice, &MillerIndex::new(1, 1, 0).unwrap()).unwrap();
        assert_eq!(a.miller, MillerIndex { h: 1, k: 1, l: 0 });
        assert_eq!((a.u, a.v, a.w), (b.u, b.v, b.w));
    }

    #[test]
    fn test_basis_is_unimodular_and_coplanar() {
        let lattice = Lattice::from_parameters(3.2, 4.1, 5.3, 82.0, 97.0, 112.0).unwrap();
        let indices = [
            (1, 0, 0),
            (0, 1, 0),
            (0, 0, 1),
            (1, 1, 0),
            (1, -1, 0),
            (1, 1, 1),
            (2, 1, 0),
            (1, 2, 3),
            (-2, 1, 3),
            (3, 1, 1),
        ];

        for (h, k, l) in indices {
            let miller = MillerIndex::new(h, k, l).unwrap();
            let basis = find_plane_basis(&lattice, &miller).unwrap();
            let n = wide(basis.miller.as_array());

            assert_eq!(dot_i(&n, &wide(basis.u)), 0);
            assert_eq!(dot_i(&n, &wide(basis.v)), 0);
            assert_eq!(dot_i(&n, &wide(basis.w)), 1);
            assert_eq!(det_i(basis.u, basis.v, basis.w), 1);

            let a = to_cart(&lattice, &wide(basis.u));
            let b = to_cart(&lattice, &wide(basis.v));
            let normal = Vector3::from(basis.normal);
            let cross = a.cross(&b).normalize();
            assert!(
                cross.cross(&normal).norm() < 1e-6,
                "in-plane vectors not coplanar for ({} {} {})",
                h,
                k,
                l
            );
            assert!(a.norm() <= b.norm() + 1e-6);
        }
    }

    #[test]
    fn test_hexagonal_0001() {
        let lattice = Lattice::from_parameters(2.5, 2.5, 4.0, 90.0, 90.0, 120.0).unwrap();
        let basis = find_plane_basis(&lattice, &MillerIndex::new(0, 0, 1).unwrap()).unwrap();
        let a = to_cart(&lattice, &wide(basis.u));
        let b = to_cart(&lattice, &wide(basis.v));
        let angle = (a.dot(&b) / (a.norm() * b.norm())).acos().to_degrees();

        assert!((a.norm() - 2.5).abs() < 1e-9);
        assert!((b.norm() - 2.5).abs() < 1e-9);
        assert!((angle - 60.0).abs() < 1e-9);
        assert!((basis.repeat_distance - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_miller_rejected() {
        let err = find_plane_basis(&cubic(4.0), &MillerIndex { h: 0, k: 0, l: 0 }).unwrap_err();
        assert!(matches!(err, QslabError::InvalidMillerIndex { .. }));
    }

    #[test]
    fn test_integer_basis_is_oriented() {
        for n in [[25, 1, 0], [0, 0, 1], [0, 0, -1], [3, -5, 7], [0, 4, -9], [6, 10, 15]] {
            let (u, v, w) = integer_basis(&n);
            assert_eq!(cross_i(&u, &v), n, "{:?}", n);
            assert_eq!(dot_i(&n, &w), 1, "{:?}", n);
        }
        assert_eq!(ext_gcd(-4, 6).0, 2);
    }

    #[test]
    fn test_high_index_cubic_planes() {
        let lattice = cubic(4.0);

        let basis = find_plane_basis(&lattice, &MillerIndex::new(25, 1, 0).unwrap()).unwrap();
        assert_eq!(basis.u, [0, 0, 1]);
        let b = to_cart(&lattice, &wide(basis.v));
        assert!((b.norm() - 4.0 * 626f64.sqrt()).abs() < 1e-9);
        assert_eq!(det_i(basis.u, basis.v, basis.w), 1);

        for (h, k, l) in [(97, -61, 113), (500, 1, 0), (1000, 999, 1)] {
            let basis = find_plane_basis(&lattice, &MillerIndex::new(h, k, l).unwrap()).unwrap();
            let n = wide(basis.miller.as_array());
            assert_eq!(cross_i(&wide(basis.u), &wide(basis.v)), n);
            assert_eq!(dot_i(&n, &wide(basis.w)), 1);
        }
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let miller = MillerIndex {
            h: 1_500_000_000,
            k: 1,
            l: 0,
        };
        let err = find_plane_basis(&cubic(4.0), &miller).unwrap_err();
        assert!(matches!(err, QslabError::InvalidMillerIndex { .. }));
    }
}
