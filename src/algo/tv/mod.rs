//! Piecewise-linear total variation on image triangulations.
//!
//! A [`TvTriangulation`] couples a planar triangulation of the pixel grid
//! with per-vertex samples and regularized values. The regularization runs
//! in two independent stages that can be alternated:
//!
//! - [`denoise`]: a primal-dual TV pass that smooths the vertex values while
//!   the triangulation stays fixed.
//! - [`flip`]: a greedy local search over the triangulation that flips
//!   quad diagonals whenever this lowers the total variation of the
//!   piecewise-linear interpolant.
//!
//! [`pipeline::regularize`] chains both stages with an optional
//! [`quantize`] step, the way the `tvmesh` binary does.
//!
//! # Example
//!
//! ```
//! use tvmesh::algo::tv::{TvOptions, TvTriangulation};
//! use tvmesh::algo::tv::flip::FlipOptions;
//! use tvmesh::algo::tv::calculus::ColorMode;
//! use tvmesh::io::Raster;
//!
//! let mut raster = Raster::new(3, 3, ColorMode::Grayscale);
//! raster.set(2, 2, [255, 255, 255]);
//!
//! let mut tvt: TvTriangulation = TvTriangulation::from_raster(&raster, &TvOptions::default()).unwrap();
//! let before = tvt.energy();
//! tvt.optimize(&FlipOptions::default());
//! assert!(tvt.energy() <= before);
//! ```

pub mod calculus;
pub mod denoise;
pub mod energy;
pub mod flip;
pub mod pipeline;
pub mod quantize;

use nalgebra::Point2;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{Result, TvError};
use crate::io::Raster;
use crate::mesh::{FaceId, HalfEdgeId, HalfEdgeMesh, MeshBuilder, MeshIndex};

use calculus::{ColorMode, TvNorm, Value, VectorValue};

/// Options for building a [`TvTriangulation`].
#[derive(Debug, Clone)]
pub struct TvOptions {
    /// Exponent applied to squared gradient magnitudes (0.5 is the
    /// euclidean norm; smaller values favour sharp discontinuities).
    pub power: f64,

    /// Arcs whose two endpoints have every raw channel at or below this
    /// value are never flipped.
    pub fix_dark: f64,

    /// Arcs whose two endpoints have every raw channel at or above this
    /// value are never flipped.
    pub fix_bright: f64,

    /// Seed for the random tie-break. `None` seeds from system entropy.
    pub seed: Option<u64>,
}

impl Default for TvOptions {
    fn default() -> Self {
        Self {
            power: 0.5,
            fix_dark: 0.0,
            fix_bright: 255.0,
            seed: None,
        }
    }
}

impl TvOptions {
    /// Set the norm exponent.
    pub fn with_power(mut self, power: f64) -> Self {
        self.power = power;
        self
    }

    /// Lock dark edges (values at or below `value`).
    pub fn with_fix_dark(mut self, value: f64) -> Self {
        self.fix_dark = value;
        self
    }

    /// Lock bright edges (values at or above `value`).
    pub fn with_fix_bright(mut self, value: f64) -> Self {
        self.fix_bright = value;
        self
    }

    /// Make the random tie-break reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check that the options describe a usable norm.
    pub fn validate(&self) -> Result<()> {
        if self.power <= 0.0 || !self.power.is_finite() {
            return Err(TvError::invalid_param("power", self.power, "must be positive"));
        }
        Ok(())
    }

    fn lock(&self) -> Option<EdgeLock> {
        if self.fix_dark != 0.0 || self.fix_bright != 255.0 {
            Some(EdgeLock {
                dark: self.fix_dark,
                bright: self.fix_bright,
            })
        } else {
            None
        }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Dark and bright thresholds protecting arcs from flips.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct EdgeLock {
    dark: f64,
    bright: f64,
}

impl EdgeLock {
    /// Every channel at or below the dark threshold.
    fn is_dark(&self, v: &Value) -> bool {
        v.iter().all(|&c| c <= self.dark)
    }

    /// Every channel at or above the bright threshold.
    fn is_bright(&self, v: &Value) -> bool {
        v.iter().all(|&c| c >= self.bright)
    }

    /// Whether both values are dark, or both bright.
    fn locks(&self, a: &Value, b: &Value) -> bool {
        (self.is_dark(a) && self.is_dark(b)) || (self.is_bright(a) && self.is_bright(b))
    }
}

/// A triangulated image together with everything the TV regularization
/// needs: raw samples, regularized values, the dual field and the
/// per-triangle energy cache.
///
/// Per-vertex arrays always hold `mesh.num_vertices()` entries and
/// per-face arrays `mesh.num_faces()` entries. The cached face energies
/// are kept equal to the TV of the current values after every mutation,
/// and the running total equals their sum.
#[derive(Debug, Clone)]
pub struct TvTriangulation<I: MeshIndex = u32> {
    mesh: HalfEdgeMesh<I>,
    /// Raw samples.
    image: Vec<Value>,
    /// Regularized values.
    u: Vec<Value>,
    /// Dual field of the denoiser, warm-started across passes.
    p: Vec<VectorValue>,
    tv_per_triangle: Vec<f64>,
    tv_energy: f64,
    /// Vertices that existed before any subdivision.
    nb_initial_vertices: usize,
    norm: TvNorm,
    lock: Option<EdgeLock>,
    /// Arcs to examine on the next pass.
    queue: Vec<HalfEdgeId<I>>,
    /// Arcs whose flip leaves the energy unchanged.
    equal_queue: Vec<HalfEdgeId<I>>,
    rng: StdRng,
    extent: Option<(usize, usize)>,
}

impl<I: MeshIndex> TvTriangulation<I> {
    /// Triangulate a raster: one vertex per pixel, two triangles per cell.
    ///
    /// Cells are split along the `(x, y)-(x+1, y+1)` diagonal, except when
    /// edge locking is active and both ends of the other diagonal are
    /// locked, in which case the locked diagonal is kept.
    pub fn from_raster(raster: &Raster, options: &TvOptions) -> Result<Self> {
        options.validate()?;
        let (width, height) = (raster.width(), raster.height());
        let lock = options.lock();

        let samples: Vec<Value> = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| raster.value(x, y))
            .collect();

        let mut builder =
            MeshBuilder::with_capacity(width * height, 2 * width.saturating_sub(1) * height.saturating_sub(1));
        for y in 0..height {
            for x in 0..width {
                builder.add_vertex(Point2::new(x as f64, y as f64));
            }
        }
        for y in 0..height.saturating_sub(1) {
            for x in 0..width.saturating_sub(1) {
                let v00 = y * width + x;
                let v10 = v00 + 1;
                let v01 = v00 + width;
                let v11 = v01 + 1;
                let keep_anti_diagonal = lock
                    .map(|l| l.locks(&samples[v01], &samples[v10]))
                    .unwrap_or(false);
                if keep_anti_diagonal {
                    builder.add_triangle(v00, v01, v10);
                    builder.add_triangle(v10, v01, v11);
                } else {
                    builder.add_triangle(v00, v01, v11);
                    builder.add_triangle(v00, v11, v10);
                }
            }
        }
        let mesh = builder.build()?;
        log::info!(
            "Built triangulation of {}x{} image: {} vertices, {} faces, {} arcs",
            width,
            height,
            mesh.num_vertices(),
            mesh.num_faces(),
            mesh.num_halfedges()
        );

        let norm = TvNorm::new(raster.mode(), options.power);
        let mut tvt = Self::assemble(mesh, samples, norm, lock, options.rng());
        tvt.extent = Some((width, height));
        Ok(tvt)
    }

    /// Wrap an existing triangulation with one sample per vertex.
    pub fn from_mesh(
        mesh: HalfEdgeMesh<I>,
        samples: Vec<Value>,
        mode: ColorMode,
        options: &TvOptions,
    ) -> Result<Self> {
        options.validate()?;
        if mesh.num_faces() == 0 {
            return Err(TvError::EmptyMesh);
        }
        if samples.len() != mesh.num_vertices() {
            return Err(TvError::SizeMismatch {
                what: "samples",
                expected: mesh.num_vertices(),
                actual: samples.len(),
            });
        }
        let norm = TvNorm::new(mode, options.power);
        Ok(Self::assemble(mesh, samples, norm, options.lock(), options.rng()))
    }

    fn assemble(
        mesh: HalfEdgeMesh<I>,
        samples: Vec<Value>,
        norm: TvNorm,
        lock: Option<EdgeLock>,
        rng: StdRng,
    ) -> Self {
        let nf = mesh.num_faces();
        let mut tvt = Self {
            nb_initial_vertices: mesh.num_vertices(),
            u: samples.clone(),
            image: samples,
            p: vec![VectorValue::zeros(); nf],
            tv_per_triangle: vec![0.0; nf],
            tv_energy: 0.0,
            norm,
            lock,
            queue: Vec::new(),
            equal_queue: Vec::new(),
            rng,
            extent: None,
            mesh,
        };
        tvt.recompute_energy();
        tvt
    }

    // ==================== Accessors ====================

    /// The triangulation.
    pub fn mesh(&self) -> &HalfEdgeMesh<I> {
        &self.mesh
    }

    /// Regularized values, one per vertex.
    pub fn values(&self) -> &[Value] {
        &self.u
    }

    /// Raw samples, one per vertex.
    pub fn samples(&self) -> &[Value] {
        &self.image
    }

    /// Dual field of the denoiser, one per face.
    pub fn dual(&self) -> &[VectorValue] {
        &self.p
    }

    /// The norm used for values and gradients.
    pub fn norm(&self) -> &TvNorm {
        &self.norm
    }

    /// Grayscale or colour.
    pub fn color_mode(&self) -> ColorMode {
        self.norm.mode
    }

    /// Number of vertices before any subdivision.
    pub fn nb_initial_vertices(&self) -> usize {
        self.nb_initial_vertices
    }

    /// Image size when built with [`TvTriangulation::from_raster`].
    pub fn extent(&self) -> Option<(usize, usize)> {
        self.extent
    }

    // ==================== Output ====================

    /// Pack the regularized values of the pixel vertices back into a raster.
    ///
    /// Values are rounded and clamped to `[0, 255]`; grayscale rasters take
    /// channel 0.
    pub fn output_raster(&self) -> Result<Raster> {
        let (width, height) = self.extent.ok_or_else(|| {
            TvError::InvalidState("triangulation was not built from a raster".to_string())
        })?;
        let mode = self.color_mode();
        let mut raster = Raster::new(width, height, mode);
        for y in 0..height {
            for x in 0..width {
                let v = &self.u[y * width + x];
                let byte = |c: usize| v[c].round().clamp(0.0, 255.0) as u8;
                let rgb = match mode {
                    ColorMode::Grayscale => [byte(0); 3],
                    ColorMode::Color => [byte(0), byte(1), byte(2)],
                };
                raster.set(x, y, rgb);
            }
        }
        Ok(raster)
    }

    /// Faces carrying the strongest discontinuities.
    ///
    /// Faces are ranked by `energy * diameter`, largest first, and the
    /// leading faces are returned while their cumulated energy stays below
    /// `fraction` of the total energy.
    pub fn discontinuities(&self, fraction: f64) -> Vec<FaceId<I>> {
        let mut ranked: Vec<(FaceId<I>, f64)> = self
            .mesh
            .face_ids()
            .map(|f| (f, self.tv_per_triangle[f.index()] * self.mesh.face_diameter(f)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let budget = self.tv_energy * fraction;
        let mut cumulated = 0.0;
        ranked
            .into_iter()
            .map(|(f, _)| f)
            .take_while(|&f| {
                cumulated += self.tv_per_triangle[f.index()];
                cumulated < budget
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(width: usize, height: usize, pixels: &[u8]) -> Raster {
        let mut raster = Raster::new(width, height, ColorMode::Grayscale);
        for y in 0..height {
            for x in 0..width {
                let g = pixels[y * width + x];
                raster.set(x, y, [g, g, g]);
            }
        }
        raster
    }

    #[test]
    fn test_from_raster_counts() {
        let raster = gray(4, 3, &[0; 12]);
        let tvt: TvTriangulation = TvTriangulation::from_raster(&raster, &TvOptions::default()).unwrap();

        assert_eq!(tvt.mesh().num_vertices(), 12);
        assert_eq!(tvt.mesh().num_faces(), 12);
        assert_eq!(tvt.values().len(), 12);
        assert_eq!(tvt.dual().len(), 12);
        assert_eq!(tvt.nb_initial_vertices(), 12);
        assert_eq!(tvt.extent(), Some((4, 3)));
        assert!(tvt.mesh().is_valid());
        assert_eq!(tvt.energy(), 0.0);
    }

    #[test]
    fn test_vertex_layout() {
        let raster = gray(3, 2, &[0, 10, 20, 30, 40, 50]);
        let tvt: TvTriangulation = TvTriangulation::from_raster(&raster, &TvOptions::default()).unwrap();
        let v = crate::mesh::VertexId::new(4);
        assert_eq!(*tvt.mesh().position(v), Point2::new(1.0, 1.0));
        assert_eq!(tvt.samples()[4], Value::new(40.0, 40.0, 40.0));
    }

    #[test]
    fn test_single_row_is_empty() {
        let raster = gray(3, 1, &[1, 2, 3]);
        let result = TvTriangulation::<u32>::from_raster(&raster, &TvOptions::default());
        assert!(matches!(result, Err(TvError::EmptyMesh)));
    }

    #[test]
    fn test_invalid_power() {
        let raster = gray(2, 2, &[0; 4]);
        let options = TvOptions::default().with_power(0.0);
        let result = TvTriangulation::<u32>::from_raster(&raster, &options);
        assert!(matches!(result, Err(TvError::InvalidParameter { .. })));
    }

    #[test]
    fn test_locked_cells_keep_anti_diagonal() {
        // v01 and v10 are both black: the cell is split along them.
        let raster = gray(2, 2, &[200, 0, 0, 200]);
        let options = TvOptions::default().with_fix_dark(10.0);
        let tvt: TvTriangulation = TvTriangulation::from_raster(&raster, &options).unwrap();

        let mesh = tvt.mesh();
        let diagonal = mesh.halfedge_ids().find(|&a| !mesh.is_boundary_edge(a)).unwrap();
        let mut ends = [mesh.origin(diagonal).index(), mesh.dest(diagonal).index()];
        ends.sort_unstable();
        assert_eq!(ends, [1, 2]);
    }

    #[test]
    fn test_from_mesh_checks_sizes() {
        let raster = gray(2, 2, &[0; 4]);
        let tvt: TvTriangulation = TvTriangulation::from_raster(&raster, &TvOptions::default()).unwrap();
        let mesh = tvt.mesh().clone();

        let result = TvTriangulation::from_mesh(
            mesh.clone(),
            vec![Value::zeros(); 3],
            ColorMode::Grayscale,
            &TvOptions::default(),
        );
        assert!(matches!(result, Err(TvError::SizeMismatch { expected: 4, actual: 3, .. })));

        let ok = TvTriangulation::from_mesh(mesh, vec![Value::zeros(); 4], ColorMode::Grayscale, &TvOptions::default())
            .unwrap();
        assert_eq!(ok.extent(), None);
        assert!(ok.output_raster().is_err());
    }

    #[test]
    fn test_output_raster_round_trip() {
        let pixels = [0, 64, 128, 255, 3, 77];
        let raster = gray(3, 2, &pixels);
        let tvt: TvTriangulation = TvTriangulation::from_raster(&raster, &TvOptions::default()).unwrap();
        assert_eq!(tvt.output_raster().unwrap(), raster);
    }

    #[test]
    fn test_discontinuities() {
        // A single bright pixel in a dark image.
        let mut pixels = [0u8; 16];
        pixels[5] = 255;
        let raster = gray(4, 4, &pixels);
        let tvt: TvTriangulation = TvTriangulation::from_raster(&raster, &TvOptions::default()).unwrap();

        assert!(tvt.discontinuities(0.0).is_empty());

        let touching = tvt.mesh().vertex_faces(crate::mesh::VertexId::new(5)).count();
        let half = tvt.discontinuities(0.5);
        assert!(!half.is_empty());
        assert!(half.len() < touching);
        for f in &half {
            assert!(tvt.face_energy(*f) > 0.0);
        }

        let ranks: Vec<f64> = half
            .iter()
            .map(|&f| tvt.face_energy(f) * tvt.mesh().face_diameter(f))
            .collect();
        assert!(ranks.windows(2).all(|w| w[0] >= w[1]));
    }
}
