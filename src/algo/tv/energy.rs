//! Per-triangle TV energy cache.
//!
//! The energy of a face is the gradient norm of the regularized values
//! over it. Energies are cached per face and summed into a running total
//! that the flip optimizer updates incrementally.

use crate::mesh::{FaceId, MeshIndex, VertexId};

use super::calculus::vertices_gradient;
use super::TvTriangulation;

impl<I: MeshIndex> TvTriangulation<I> {
    /// TV energy of the triangle `(v0, v1, v2)` for the current values.
    ///
    /// Nothing is cached; this is used to evaluate candidate triangles.
    pub fn triangle_energy(&self, v: [VertexId<I>; 3]) -> f64 {
        self.norm
            .vector_norm(&vertices_gradient(&self.mesh, v, &self.u, self.norm.mode))
    }

    /// Cached energy of face `f`.
    #[inline]
    pub fn face_energy(&self, f: FaceId<I>) -> f64 {
        self.tv_per_triangle[f.index()]
    }

    /// Recompute and cache the energy of face `f`. The total is left alone.
    pub fn update_face_energy(&mut self, f: FaceId<I>) -> f64 {
        let e = self.triangle_energy(self.mesh.face_triangle(f));
        self.tv_per_triangle[f.index()] = e;
        e
    }

    /// Recompute every face energy and the total.
    pub fn recompute_energy(&mut self) -> f64 {
        self.tv_per_triangle.resize(self.mesh.num_faces(), 0.0);
        let mut total = 0.0;
        for i in 0..self.mesh.num_faces() {
            total += self.update_face_energy(FaceId::new(i));
        }
        self.tv_energy = total;
        total
    }

    /// Current total energy.
    #[inline]
    pub fn energy(&self) -> f64 {
        self.tv_energy
    }

    /// All cached face energies, indexed by face.
    pub fn face_energies(&self) -> &[f64] {
        &self.tv_per_triangle
    }
}

#[cfg(test)]
mod tests {
    use crate::algo::tv::calculus::{ColorMode, Value};
    use crate::algo::tv::{TvOptions, TvTriangulation};
    use crate::io::Raster;
    use crate::mesh::{FaceId, VertexId};

    fn ramp() -> TvTriangulation {
        // u = 10x + 20y on a 3x3 grid
        let mut raster = Raster::new(3, 3, ColorMode::Grayscale);
        for y in 0..3 {
            for x in 0..3 {
                let g = (10 * x + 20 * y) as u8;
                raster.set(x, y, [g, g, g]);
            }
        }
        TvTriangulation::from_raster(&raster, &TvOptions::default()).unwrap()
    }

    #[test]
    fn test_linear_ramp_energy() {
        let tvt = ramp();
        // Each triangle has area 1/2 and gradient norm sqrt(10^2 + 20^2).
        let expected = 0.5 * (500.0f64).sqrt();
        for f in tvt.mesh().face_ids() {
            assert!((tvt.face_energy(f) - expected).abs() < 1e-9);
        }
        assert!((tvt.energy() - 8.0 * expected).abs() < 1e-9);
    }

    #[test]
    fn test_total_is_sum_of_faces() {
        let tvt = ramp();
        let sum: f64 = tvt.face_energies().iter().sum();
        assert!((tvt.energy() - sum).abs() < 1e-9);
    }

    #[test]
    fn test_triangle_energy_matches_face() {
        let tvt = ramp();
        let f = FaceId::new(3);
        let tri = tvt.mesh().face_triangle(f);
        assert_eq!(tvt.triangle_energy(tri), tvt.face_energy(f));
        // Orientation does not matter.
        let reversed = [tri[2], tri[1], tri[0]];
        assert!((tvt.triangle_energy(reversed) - tvt.face_energy(f)).abs() < 1e-9);
    }

    #[test]
    fn test_update_face_energy() {
        let mut tvt = ramp();
        tvt.u[0] = Value::zeros();
        tvt.u[4] = Value::repeat(100.0);
        let f = tvt.mesh().vertex_faces(VertexId::new(4)).next().unwrap();
        let stale = tvt.face_energy(f);
        let fresh = tvt.update_face_energy(f);
        assert!(fresh != stale);
        assert_eq!(tvt.face_energy(f), fresh);

        let total = tvt.recompute_energy();
        let sum: f64 = tvt.face_energies().iter().sum();
        assert!((total - sum).abs() < 1e-9);
    }
}
