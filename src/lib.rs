//! # tvmesh
//!
//! Piecewise-linear total-variation (TV) regularization of images on
//! adaptive triangulations.
//!
//! An image is triangulated with one vertex per pixel. The vertex values
//! are denoised with a primal-dual TV scheme, then the triangulation is
//! improved by flipping quad diagonals whenever this lowers the total
//! variation of the piecewise-linear interpolant. The result follows the
//! image discontinuities instead of the pixel grid, and can be exported for
//! vector rendering.
//!
//! ## Features
//!
//! - **Half-edge triangulation**: arena storage with type-safe indices,
//!   O(1) flips and splits
//! - **Discrete calculus**: area-weighted gradient and its adjoint divergence
//!   for grayscale and colour values
//! - **TV denoising**: warm-started dual ascent
//! - **Flip optimization**: worklist local search with incremental energy
//!   bookkeeping and configurable tie-breaks
//! - **I/O**: PNG, Netpbm, JPEG and BMP images; PLY triangulations
//!
//! ## Quick Start
//!
//! ```no_run
//! use tvmesh::prelude::*;
//!
//! let raster = tvmesh::io::load("input.ppm").unwrap();
//! let mut tvt: TvTriangulation = TvTriangulation::from_raster(&raster, &TvOptions::default()).unwrap();
//!
//! let summary = tvt.regularize(&RegularizeOptions::default()).unwrap();
//! println!("TV energy: {} -> {}", summary.initial_energy, summary.energy);
//!
//! tvmesh::io::save(&tvt.output_raster().unwrap(), "output-tv.png").unwrap();
//! tvmesh::io::ply::save(&tvt, "output-tv.ply").unwrap();
//! ```
//!
//! ## Step by Step
//!
//! ```
//! use tvmesh::prelude::*;
//!
//! let mut raster = Raster::new(4, 4, ColorMode::Grayscale);
//! for (x, y) in [(3, 0), (2, 1), (3, 1), (1, 2), (2, 2), (3, 2)] {
//!     raster.set(x, y, [255, 255, 255]);
//! }
//!
//! let options = TvOptions::default().with_seed(42);
//! let mut tvt: TvTriangulation = TvTriangulation::from_raster(&raster, &options).unwrap();
//! let initial = tvt.energy();
//!
//! tvt.tv_pass(&DenoiseOptions::default().with_lambda(0.5)).unwrap();
//! let summary = tvt.optimize(&FlipOptions::default());
//! assert!(summary.passes > 0);
//! assert!(tvt.mesh().is_valid());
//! # let _ = initial;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod io;
pub mod mesh;

/// Prelude module for convenient imports.
///
/// ```
/// use tvmesh::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::tv::calculus::{ColorMode, TvNorm, Value, VectorValue};
    pub use crate::algo::tv::denoise::DenoiseOptions;
    pub use crate::algo::tv::flip::{ArcStatus, EqualStrategy, FlipOptions, FlipSummary};
    pub use crate::algo::tv::pipeline::{RegularizeOptions, RegularizeSummary};
    pub use crate::algo::tv::{TvOptions, TvTriangulation};
    pub use crate::algo::Progress;
    pub use crate::error::{Result, TvError};
    pub use crate::io::Raster;
    pub use crate::mesh::{
        build_from_triangles, to_face_vertex, FaceId, HalfEdgeId, HalfEdgeMesh, MeshBuilder, MeshIndex,
        VertexId,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;
