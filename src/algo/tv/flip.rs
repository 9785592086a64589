//! Edge-flip optimization of the triangulation.
//!
//! The optimizer keeps a worklist of arcs. Each arc is the diagonal of the
//! quad formed by its two triangles; if replacing it by the other diagonal
//! strictly lowers the TV energy, the flip is applied at once and the eight
//! arcs bounding the quad are queued for the next pass. Flips that leave the
//! energy unchanged accumulate in a second list until the pass-end
//! [`EqualStrategy`] acts on them; strategies that only act when stuck keep
//! the list across passes with strict improvements.
//!
//! Energies are updated incrementally: a flip overwrites the two cached face
//! energies with the values it was evaluated with, and a subdivision
//! recomputes the four faces around the new vertex.
//!
//! # Example
//!
//! ```
//! use tvmesh::algo::tv::{TvOptions, TvTriangulation};
//! use tvmesh::algo::tv::calculus::ColorMode;
//! use tvmesh::algo::tv::flip::{EqualStrategy, FlipOptions};
//! use tvmesh::io::Raster;
//!
//! let mut raster = Raster::new(2, 2, ColorMode::Grayscale);
//! for (x, y) in [(1, 0), (0, 1), (1, 1)] {
//!     raster.set(x, y, [255, 255, 255]);
//! }
//! let mut tvt: TvTriangulation = TvTriangulation::from_raster(&raster, &TvOptions::default()).unwrap();
//!
//! let options = FlipOptions::default().with_strategy(EqualStrategy::Ignore);
//! let summary = tvt.optimize(&options);
//! assert_eq!(summary.flips, 1);
//! assert!(summary.converged);
//! ```

use nalgebra::Point2;
use rand::Rng;

use crate::algo::Progress;
use crate::error::{Result, TvError};
use crate::mesh::{FaceId, HalfEdgeId, MeshIndex, VertexId};

use super::calculus::{Value, VectorValue};
use super::TvTriangulation;

/// Outcome of examining an arc.
///
/// Only [`ArcStatus::Improved`] modifies the triangulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArcStatus {
    /// One side of the arc has no triangle.
    Boundary,
    /// The opposite arc is the one that handles this quad.
    Duplicate,
    /// The quad is not strictly convex, so the flip would fold a triangle.
    NonConvex,
    /// Both ends of the diagonal are dark and locked.
    LockedDark,
    /// Both ends of the diagonal are bright and locked.
    LockedBright,
    /// Flipping would raise the energy.
    Worse,
    /// Flipping would leave the energy unchanged.
    Equal,
    /// Flipping lowers the energy; the flip has been applied.
    Improved,
}

/// What to do with arcs whose flip leaves the energy unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EqualStrategy {
    /// Leave them alone.
    Ignore,
    /// Subdivide their quad once, around its centroid.
    Subdivide,
    /// Flip all of them.
    FlipAll,
    /// Flip all of them, but only after a pass without strict improvement.
    FlipAllWhenStuck,
    /// Flip each one with probability 1/2, only after a pass without strict
    /// improvement.
    #[default]
    FlipHalfWhenStuck,
    /// As [`EqualStrategy::FlipHalfWhenStuck`]; once nothing moves any more,
    /// subdivide one time before stopping.
    FlipHalfThenSubdivide,
}

impl EqualStrategy {
    /// Strategy from its numeric id (0 to 5), as used on the command line.
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(Self::Ignore),
            1 => Ok(Self::Subdivide),
            2 => Ok(Self::FlipAll),
            3 => Ok(Self::FlipAllWhenStuck),
            4 => Ok(Self::FlipHalfWhenStuck),
            5 => Ok(Self::FlipHalfThenSubdivide),
            _ => Err(TvError::invalid_param("strategy", id, "must be between 0 and 5")),
        }
    }

    /// Numeric id of the strategy.
    pub fn id(self) -> u8 {
        match self {
            Self::Ignore => 0,
            Self::Subdivide => 1,
            Self::FlipAll => 2,
            Self::FlipAllWhenStuck => 3,
            Self::FlipHalfWhenStuck => 4,
            Self::FlipHalfThenSubdivide => 5,
        }
    }
}

/// Options for [`TvTriangulation::optimize`].
#[derive(Debug, Clone)]
pub struct FlipOptions {
    /// Maximum number of passes.
    pub max_iterations: usize,

    /// Tie-break for arcs with unchanged energy.
    pub strategy: EqualStrategy,
}

impl Default for FlipOptions {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            strategy: EqualStrategy::default(),
        }
    }
}

impl FlipOptions {
    /// Default options: 100 passes, [`EqualStrategy::FlipHalfWhenStuck`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of passes.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the tie-break strategy.
    pub fn with_strategy(mut self, strategy: EqualStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Statistics of an [`TvTriangulation::optimize`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlipSummary {
    /// Passes performed.
    pub passes: usize,
    /// Flips that strictly lowered the energy.
    pub flips: usize,
    /// Tie-break flips and subdivisions.
    pub tie_breaks: usize,
    /// Total energy at the end.
    pub energy: f64,
    /// Whether a pass found nothing to do before the pass limit.
    pub converged: bool,
}

/// A flippable quad with its current and flipped energies.
#[derive(Debug, Clone, Copy)]
struct FlipCandidate<I: MeshIndex> {
    quad: [VertexId<I>; 4],
    /// Faces of the arc and of its twin: `(P0, P1, P2)` and `(P0, P2, P3)`.
    faces: [FaceId<I>; 2],
    current: f64,
    /// Energies of `(P1, P2, P3)` and `(P0, P1, P3)`.
    flipped: [f64; 2],
}

impl<I: MeshIndex> FlipCandidate<I> {
    fn status(&self) -> ArcStatus {
        let flipped = self.flipped[0] + self.flipped[1];
        if flipped < self.current {
            ArcStatus::Improved
        } else if flipped == self.current {
            ArcStatus::Equal
        } else {
            ArcStatus::Worse
        }
    }
}

impl<I: MeshIndex> TvTriangulation<I> {
    /// Examine arc `a` and flip it if that strictly lowers the energy.
    pub fn update_arc(&mut self, a: HalfEdgeId<I>) -> ArcStatus {
        match self.evaluate(a) {
            Ok(candidate) => {
                let status = candidate.status();
                if status == ArcStatus::Improved {
                    self.apply_flip(a, &candidate);
                }
                status
            }
            Err(status) => status,
        }
    }

    /// Status [`update_arc`](Self::update_arc) would return, without flipping.
    pub fn arc_status(&self, a: HalfEdgeId<I>) -> ArcStatus {
        match self.evaluate(a) {
            Ok(candidate) => candidate.status(),
            Err(status) => status,
        }
    }

    fn evaluate(&self, a: HalfEdgeId<I>) -> std::result::Result<FlipCandidate<I>, ArcStatus> {
        let quad = self.mesh.vertices_around_arc(a).ok_or(ArcStatus::Boundary)?;
        if quad[0] < quad[2] {
            return Err(ArcStatus::Duplicate);
        }
        if !self.mesh.is_convex_quad(&quad) {
            return Err(ArcStatus::NonConvex);
        }
        if let Some(lock) = &self.lock {
            let head = &self.image[quad[0].index()];
            let tail = &self.image[quad[2].index()];
            if lock.is_dark(head) && lock.is_dark(tail) {
                return Err(ArcStatus::LockedDark);
            }
            if lock.is_bright(head) && lock.is_bright(tail) {
                return Err(ArcStatus::LockedBright);
            }
        }

        let faces = [self.mesh.face_of(a), self.mesh.face_of(self.mesh.twin(a))];
        let current = self.face_energy(faces[0]) + self.face_energy(faces[1]);
        let [p0, p1, p2, p3] = quad;
        let flipped = [
            self.triangle_energy([p1, p2, p3]),
            self.triangle_energy([p0, p1, p3]),
        ];
        Ok(FlipCandidate {
            quad,
            faces,
            current,
            flipped,
        })
    }

    fn apply_flip(&mut self, a: HalfEdgeId<I>, candidate: &FlipCandidate<I>) {
        self.queue_surrounding_arcs(a);
        self.mesh.flip(a);
        let [fa, fb] = candidate.faces;
        self.tv_per_triangle[fa.index()] = candidate.flipped[0];
        self.tv_per_triangle[fb.index()] = candidate.flipped[1];
        self.tv_energy += candidate.flipped[0] + candidate.flipped[1] - candidate.current;
    }

    /// Queue both directions of the four outer edges of the quad around `a`.
    pub fn queue_surrounding_arcs(&mut self, a: HalfEdgeId<I>) {
        let a0 = self.mesh.next(a);
        let a1 = self.mesh.next(a0);
        let a2 = self.mesh.next(self.mesh.twin(a));
        let a3 = self.mesh.next(a2);
        for arc in [a0, a1, a2, a3] {
            self.queue.push(arc);
            self.queue.push(self.mesh.twin(arc));
        }
    }

    /// Arcs waiting for the next pass.
    pub fn pending_arcs(&self) -> &[HalfEdgeId<I>] {
        &self.queue
    }

    /// Drop the worklists so the next pass examines every arc again.
    pub fn reset_queues(&mut self) {
        self.queue.clear();
        self.equal_queue.clear();
    }

    /// Process the pending arcs once, then apply the tie-break to the arcs
    /// found with unchanged energy.
    ///
    /// When nothing is pending, every arc is examined. Ties stay listed
    /// until a pass where the strategy acts on them. Returns the number of
    /// strict improvements and the number of tie-break actions.
    pub fn one_pass(&mut self, strategy: EqualStrategy) -> (usize, usize) {
        let mut pending = std::mem::take(&mut self.queue);
        if pending.is_empty() {
            pending = self.mesh.halfedge_ids().collect();
        }

        let mut nb_flipped = 0;
        for &a in &pending {
            match self.update_arc(a) {
                ArcStatus::Improved => nb_flipped += 1,
                ArcStatus::Equal => self.equal_queue.push(a),
                _ => {}
            }
        }

        let stuck = nb_flipped == 0;
        let fires = match strategy {
            EqualStrategy::Ignore => {
                self.equal_queue.clear();
                false
            }
            EqualStrategy::Subdivide | EqualStrategy::FlipAll => true,
            EqualStrategy::FlipAllWhenStuck
            | EqualStrategy::FlipHalfWhenStuck
            | EqualStrategy::FlipHalfThenSubdivide => stuck,
        };
        if !fires {
            log::info!(
                "TV(u) = {:.6} nbflipped={}/{} nbequal waiting={}",
                self.tv_energy,
                nb_flipped,
                pending.len(),
                self.equal_queue.len()
            );
            return (nb_flipped, 0);
        }

        let equal = self.take_equal_arcs();
        let nb_equal = match strategy {
            EqualStrategy::Ignore => 0,
            EqualStrategy::Subdivide => self.subdivide(&equal),
            EqualStrategy::FlipAll | EqualStrategy::FlipAllWhenStuck => self.flip_equal(&equal),
            EqualStrategy::FlipHalfWhenStuck | EqualStrategy::FlipHalfThenSubdivide => {
                self.flip_equal_with_prob(&equal, 0.5)
            }
        };

        log::info!(
            "TV(u) = {:.6} nbflipped={}/{} nbequal={}/{}",
            self.tv_energy,
            nb_flipped,
            pending.len(),
            nb_equal,
            equal.len()
        );
        (nb_flipped, nb_equal)
    }

    /// Drain the equal list, keeping the first occurrence of each arc.
    ///
    /// An arc found equal in several passes must not be flipped twice, or
    /// the second flip would undo the first.
    fn take_equal_arcs(&mut self) -> Vec<HalfEdgeId<I>> {
        let mut seen = vec![false; self.mesh.num_halfedges()];
        let mut equal = std::mem::take(&mut self.equal_queue);
        equal.retain(|a| !std::mem::replace(&mut seen[a.index()], true));
        equal
    }

    /// Flip every arc of `arcs` that still has unchanged energy.
    ///
    /// Arcs that have become improving are flipped too, but not counted.
    pub fn flip_equal(&mut self, arcs: &[HalfEdgeId<I>]) -> usize {
        let mut nb_flip = 0;
        for &a in arcs {
            let Ok(candidate) = self.evaluate(a) else {
                continue;
            };
            match candidate.status() {
                ArcStatus::Improved => self.apply_flip(a, &candidate),
                ArcStatus::Equal => {
                    self.apply_flip(a, &candidate);
                    nb_flip += 1;
                }
                _ => {}
            }
        }
        nb_flip
    }

    /// Flip each arc of `arcs` with unchanged energy with probability `prob`.
    ///
    /// Every such arc is queued again, in both directions, whether it was
    /// flipped or not.
    pub fn flip_equal_with_prob(&mut self, arcs: &[HalfEdgeId<I>], prob: f64) -> usize {
        let mut nb_flip = 0;
        for &a in arcs {
            let Ok(candidate) = self.evaluate(a) else {
                continue;
            };
            match candidate.status() {
                ArcStatus::Improved => self.apply_flip(a, &candidate),
                ArcStatus::Equal => {
                    self.queue.push(a);
                    self.queue.push(self.mesh.twin(a));
                    if self.rng.gen::<f64>() < prob {
                        self.apply_flip(a, &candidate);
                        nb_flip += 1;
                    }
                }
                _ => {}
            }
        }
        nb_flip
    }

    /// Split the quad of every arc of `arcs` with unchanged energy at its
    /// centroid.
    ///
    /// Quads touching a vertex created by an earlier subdivision are left
    /// alone, so refinement stops after one level. The new vertex gets the
    /// average raw and regularized values of the quad corners.
    pub fn subdivide(&mut self, arcs: &[HalfEdgeId<I>]) -> usize {
        let mut nb_subdivided = 0;
        for &a in arcs {
            let Ok(candidate) = self.evaluate(a) else {
                continue;
            };
            match candidate.status() {
                ArcStatus::Improved => {
                    self.apply_flip(a, &candidate);
                    continue;
                }
                ArcStatus::Equal => {}
                _ => continue,
            }
            if candidate
                .quad
                .iter()
                .any(|v| v.index() >= self.nb_initial_vertices)
            {
                continue;
            }
            if self.split_quad(a, &candidate) {
                nb_subdivided += 1;
            }
        }
        nb_subdivided
    }

    fn split_quad(&mut self, a: HalfEdgeId<I>, candidate: &FlipCandidate<I>) -> bool {
        let quad = candidate.quad;
        let centroid = quad
            .iter()
            .fold(Point2::origin(), |acc, &v| acc + self.mesh.position(v).coords * 0.25);
        let average = |field: &[Value]| -> Value {
            quad.iter().map(|v| field[v.index()]).sum::<Value>() * 0.25
        };
        let u = average(&self.u);
        let sample = average(&self.image);

        self.queue_surrounding_arcs(a);
        let Some(m) = self.mesh.split(a, centroid) else {
            return false;
        };
        self.u.push(u);
        self.image.push(sample);
        self.tv_per_triangle.resize(self.mesh.num_faces(), 0.0);
        self.p.resize(self.mesh.num_faces(), VectorValue::zeros());

        let spokes: Vec<HalfEdgeId<I>> = self.mesh.vertex_halfedges(m).collect();
        for arc in spokes {
            self.queue.push(arc);
            self.queue.push(self.mesh.twin(arc));
        }

        let faces: Vec<FaceId<I>> = self.mesh.vertex_faces(m).collect();
        let after: f64 = faces.into_iter().map(|f| self.update_face_energy(f)).sum();
        self.tv_energy += after - candidate.current;
        true
    }

    /// Run passes until one of them does nothing, or the pass limit is hit.
    pub fn optimize(&mut self, options: &FlipOptions) -> FlipSummary {
        self.optimize_with_progress(options, &Progress::none())
    }

    /// [`optimize`](Self::optimize) with progress reporting per pass.
    pub fn optimize_with_progress(&mut self, options: &FlipOptions, progress: &Progress) -> FlipSummary {
        let mut summary = FlipSummary::default();
        let mut subdivided = false;
        log::info!("TV(u) = {:.6} before flips", self.tv_energy);

        while summary.passes < options.max_iterations {
            progress.report(summary.passes, options.max_iterations, "Flipping edges");
            let (flips, equal) = self.one_pass(options.strategy);
            summary.passes += 1;
            summary.flips += flips;
            summary.tie_breaks += equal;
            if flips > 0 || equal > 0 {
                continue;
            }
            if options.strategy != EqualStrategy::FlipHalfThenSubdivide || subdivided {
                summary.converged = true;
                break;
            }
            if summary.passes >= options.max_iterations {
                break;
            }

            subdivided = true;
            let (flips, equal) = self.one_pass(EqualStrategy::Subdivide);
            summary.passes += 1;
            summary.flips += flips;
            summary.tie_breaks += equal;
            if flips == 0 && equal == 0 {
                summary.converged = true;
                break;
            }
        }

        progress.report(options.max_iterations, options.max_iterations, "Flipping edges");
        summary.energy = self.tv_energy;
        log::info!(
            "Flips done: {} passes, {} flips, {} tie-breaks, TV(u) = {:.6}",
            summary.passes,
            summary.flips,
            summary.tie_breaks,
            summary.energy
        );
        summary
    }
}
