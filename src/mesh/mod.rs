//! Core mesh data structures.
//!
//! This module provides the triangulated planar domain that the TV
//! algorithms work on: an arena-backed half-edge mesh with 2D vertex
//! positions and O(1) adjacency queries, edge flips and edge splits.
//!
//! # Index Types
//!
//! Mesh elements are identified by type-safe index wrappers:
//! - [`VertexId`] - Identifies a vertex
//! - [`HalfEdgeId`] - Identifies an arc (directed half-edge)
//! - [`FaceId`] - Identifies a triangle
//!
//! These indices are generic over the underlying integer type ([`MeshIndex`] trait).
//! Elements are never deleted, so indices stay valid for the lifetime of the mesh.
//!
//! # Construction
//!
//! ```
//! use tvmesh::mesh::{HalfEdgeMesh, build_from_triangles};
//! use nalgebra::Point2;
//!
//! let vertices = vec![
//!     Point2::new(0.0, 0.0),
//!     Point2::new(1.0, 0.0),
//!     Point2::new(1.0, 1.0),
//!     Point2::new(0.0, 1.0),
//! ];
//! let faces = vec![[0, 1, 2], [0, 2, 3]];
//!
//! let mut mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
//! let diagonal = mesh.halfedge_ids().find(|&a| !mesh.is_boundary_edge(a)).unwrap();
//! assert!(mesh.flip(diagonal));
//! ```

mod builder;
mod halfedge;
mod index;

pub use builder::{build_from_triangles, to_face_vertex, MeshBuilder};
pub use halfedge::{Face, HalfEdge, HalfEdgeMesh, Vertex, VertexHalfEdgeIter};
pub use index::{FaceId, HalfEdgeId, MeshIndex, VertexId};
