//! Discrete calculus on a triangulated image domain.
//!
//! Values live on vertices ([`Value`], up to three colour channels) and
//! gradients live on triangles ([`VectorValue`]). [`gradient`] is the
//! area-weighted gradient of the piecewise-linear interpolant over a
//! triangle, and [`divergence`] is its negative adjoint:
//!
//! ```text
//! sum_f <grad(u)_f, p_f> = - sum_v <u_v, div(p)_v>
//! ```

use std::ops::{Add, Mul, Sub};

use nalgebra::{Point2, Vector3};
use rayon::prelude::*;

use crate::mesh::{FaceId, HalfEdgeMesh, MeshIndex, VertexId};

/// A scalar or RGB sample. Grayscale values only use channel 0.
pub type Value = Vector3<f64>;

/// A per-channel 2D vector, one per triangle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VectorValue {
    /// Per-channel x component.
    pub x: Value,
    /// Per-channel y component.
    pub y: Value,
}

impl VectorValue {
    /// Create a vector value from its two components.
    pub fn new(x: Value, y: Value) -> Self {
        Self { x, y }
    }

    /// The zero vector.
    pub fn zeros() -> Self {
        Self::default()
    }
}

impl Add for VectorValue {
    type Output = VectorValue;

    fn add(self, rhs: VectorValue) -> VectorValue {
        VectorValue::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for VectorValue {
    type Output = VectorValue;

    fn sub(self, rhs: VectorValue) -> VectorValue {
        VectorValue::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<VectorValue> for f64 {
    type Output = VectorValue;

    fn mul(self, rhs: VectorValue) -> VectorValue {
        VectorValue::new(self * rhs.x, self * rhs.y)
    }
}

/// Whether values carry one channel or three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    /// One channel (channel 0); the others are copies or ignored.
    Grayscale,
    /// Three independent channels.
    Color,
}

impl ColorMode {
    /// Number of channels the operators actually compute.
    #[inline]
    pub fn channels(self) -> usize {
        match self {
            ColorMode::Grayscale => 1,
            ColorMode::Color => 3,
        }
    }
}

/// The norms used to measure values and gradients.
///
/// `power` is the exponent `p` applied to squared magnitudes, so `p = 0.5`
/// gives the usual euclidean norm and smaller values sharpen the penalty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TvNorm {
    /// Channel layout of the values.
    pub mode: ColorMode,
    /// Exponent applied to squared magnitudes.
    pub power: f64,
}

impl TvNorm {
    /// Create a norm for the given colour mode and exponent.
    pub fn new(mode: ColorMode, power: f64) -> Self {
        Self { mode, power }
    }

    /// Norm of a triangle gradient: `sum_c (x_c^2 + y_c^2)^p`.
    ///
    /// Channels are penalised separately and summed.
    pub fn vector_norm(&self, g: &VectorValue) -> f64 {
        (0..self.mode.channels())
            .map(|c| (g.x[c] * g.x[c] + g.y[c] * g.y[c]).powf(self.power))
            .sum()
    }
}

/// Area-weighted gradient of the linear interpolant of `u` over the triangle
/// `(pi, pj, pk)`.
///
/// ```text
/// [ yj-yk  yk-yi  yi-yj ]   [ ui ]
/// [ xk-xj  xi-xk  xj-xi ] * [ uj ] * 0.5
///                           [ uk ]
/// ```
///
/// The result is the exact gradient scaled by the signed area of the
/// triangle. It is meaningless for degenerate triangles: collinear corners
/// only give a zero vector when their values are affine along the line.
pub fn triangle_gradient(
    p: [&Point2<f64>; 3],
    u: [&Value; 3],
    mode: ColorMode,
) -> VectorValue {
    let [pi, pj, pk] = p;
    let [ui, uj, uk] = u;
    let mut g = VectorValue::zeros();
    for m in 0..mode.channels() {
        g.x[m] = ui[m] * (pj.y - pk.y) + uj[m] * (pk.y - pi.y) + uk[m] * (pi.y - pj.y);
        g.y[m] = ui[m] * (pk.x - pj.x) + uj[m] * (pi.x - pk.x) + uk[m] * (pj.x - pi.x);
    }
    0.5 * g
}

/// Gradient of `u` over the triangle of three given vertices.
pub fn vertices_gradient<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    v: [VertexId<I>; 3],
    u: &[Value],
    mode: ColorMode,
) -> VectorValue {
    triangle_gradient(
        [mesh.position(v[0]), mesh.position(v[1]), mesh.position(v[2])],
        [&u[v[0].index()], &u[v[1].index()], &u[v[2].index()]],
        mode,
    )
}

/// Gradient of `u` over face `f`.
pub fn gradient<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    f: FaceId<I>,
    u: &[Value],
    mode: ColorMode,
) -> VectorValue {
    vertices_gradient(mesh, mesh.face_triangle(f), u, mode)
}

/// Gradient of `u` over every face, indexed by face.
pub fn gradient_field<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    u: &[Value],
    mode: ColorMode,
    parallel: bool,
) -> Vec<VectorValue> {
    if parallel {
        (0..mesh.num_faces())
            .into_par_iter()
            .map(|i| gradient(mesh, FaceId::new(i), u, mode))
            .collect()
    } else {
        mesh.face_ids().map(|f| gradient(mesh, f, u, mode)).collect()
    }
}

/// Divergence of a per-face field, indexed by vertex.
///
/// Each face scatters `-0.5 * (opposite edge rotated) . G_f` onto its three
/// vertices, which makes this the negative adjoint of [`gradient`].
pub fn divergence<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    g: &[VectorValue],
    mode: ColorMode,
) -> Vec<Value> {
    let mut s = vec![Value::zeros(); mesh.num_vertices()];
    for f in mesh.face_ids() {
        let v = mesh.face_triangle(f);
        let [pi, pj, pk] = mesh.face_positions(f);
        let gf = &g[f.index()];
        for m in 0..mode.channels() {
            s[v[0].index()][m] -= (pj.y - pk.y) * gf.x[m] + (pk.x - pj.x) * gf.y[m];
            s[v[1].index()][m] -= (pk.y - pi.y) * gf.x[m] + (pi.x - pk.x) * gf.y[m];
            s[v[2].index()][m] -= (pi.y - pj.y) * gf.x[m] + (pj.x - pi.x) * gf.y[m];
        }
    }
    for sv in &mut s {
        *sv *= 0.5;
    }
    s
}

/// Pointwise [`TvNorm::vector_norm`] of a per-face field.
pub fn norm_field(norm: &TvNorm, g: &[VectorValue]) -> Vec<f64> {
    g.iter().map(|gf| norm.vector_norm(gf)).collect()
}
