//! Mesh construction utilities.
//!
//! Triangulations are assembled incrementally with a [`MeshBuilder`]
//! (vertices first, then triangles, then a single [`MeshBuilder::build`]),
//! or in one go from a face-vertex list with [`build_from_triangles`].

use std::collections::HashMap;

use nalgebra::Point2;

use super::halfedge::{Face, HalfEdge, HalfEdgeMesh};
use super::index::{FaceId, HalfEdgeId, MeshIndex, VertexId};
use crate::error::{Result, TvError};

/// Incremental builder for a [`HalfEdgeMesh`].
///
/// # Example
/// ```
/// use tvmesh::mesh::{HalfEdgeMesh, MeshBuilder};
/// use nalgebra::Point2;
///
/// let mut builder = MeshBuilder::new();
/// let a = builder.add_vertex(Point2::new(0.0, 0.0));
/// let b = builder.add_vertex(Point2::new(1.0, 0.0));
/// let c = builder.add_vertex(Point2::new(0.0, 1.0));
/// builder.add_triangle(a, b, c);
///
/// let mesh: HalfEdgeMesh = builder.build().unwrap();
/// assert_eq!(mesh.num_faces(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MeshBuilder {
    vertices: Vec<Point2<f64>>,
    faces: Vec<[usize; 3]>,
}

impl MeshBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with pre-allocated capacity.
    pub fn with_capacity(num_vertices: usize, num_faces: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(num_vertices),
            faces: Vec::with_capacity(num_faces),
        }
    }

    /// Add a vertex and return the index it will have in the built mesh.
    pub fn add_vertex(&mut self, position: Point2<f64>) -> usize {
        self.vertices.push(position);
        self.vertices.len() - 1
    }

    /// Add a triangle. All triangles must share the same winding.
    pub fn add_triangle(&mut self, v0: usize, v1: usize, v2: usize) {
        self.faces.push([v0, v1, v2]);
    }

    /// Number of vertices added so far.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles added so far.
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Link everything into a half-edge mesh.
    pub fn build<I: MeshIndex>(&self) -> Result<HalfEdgeMesh<I>> {
        build_from_triangles(&self.vertices, &self.faces)
    }
}

/// Build a half-edge mesh from vertices and triangle faces.
///
/// # Arguments
/// * `vertices` - List of vertex positions
/// * `faces` - List of triangle faces, each as [v0, v1, v2] indices
///
/// # Returns
/// A half-edge mesh, or an error if the input is invalid or not an
/// orientable manifold.
///
/// # Example
/// ```
/// use tvmesh::mesh::{build_from_triangles, HalfEdgeMesh};
/// use nalgebra::Point2;
///
/// let vertices = vec![
///     Point2::new(0.0, 0.0),
///     Point2::new(1.0, 0.0),
///     Point2::new(0.5, 1.0),
/// ];
/// let faces = vec![[0, 1, 2]];
///
/// let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
/// assert_eq!(mesh.num_vertices(), 3);
/// assert_eq!(mesh.num_faces(), 1);
/// ```
pub fn build_from_triangles<I: MeshIndex>(
    vertices: &[Point2<f64>],
    faces: &[[usize; 3]],
) -> Result<HalfEdgeMesh<I>> {
    if faces.is_empty() {
        return Err(TvError::EmptyMesh);
    }

    for (fi, face) in faces.iter().enumerate() {
        for &vi in face {
            if vi >= vertices.len() {
                return Err(TvError::InvalidVertexIndex { face: fi, vertex: vi });
            }
        }
        if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
            return Err(TvError::DegenerateFace { face: fi });
        }
    }

    // Three arcs per face, plus at most three boundary arcs.
    let elements = vertices.len().max(6 * faces.len());
    if elements > I::capacity() {
        return Err(TvError::IndexOverflow {
            elements,
            capacity: I::capacity(),
        });
    }

    let mut mesh = HalfEdgeMesh::with_capacity(vertices.len(), faces.len());

    let vertex_ids: Vec<VertexId<I>> = vertices.iter().map(|&pos| mesh.add_vertex(pos)).collect();

    // Directed edge (v0, v1) -> arc
    let mut edge_map: HashMap<(usize, usize), HalfEdgeId<I>> = HashMap::new();

    // First pass: one face and three arcs per triangle
    for face in faces {
        let face_id = FaceId::<I>::new(mesh.num_faces());
        mesh.faces.push(Face::default());

        let base = mesh.num_halfedges();
        let hes = [
            HalfEdgeId::<I>::new(base),
            HalfEdgeId::<I>::new(base + 1),
            HalfEdgeId::<I>::new(base + 2),
        ];
        for i in 0..3 {
            let mut he = HalfEdge::new();
            he.origin = vertex_ids[face[i]];
            mesh.halfedges.push(he);
        }
        mesh.link_triangle(face_id, hes);

        for i in 0..3 {
            let (a, b) = (face[i], face[(i + 1) % 3]);
            mesh.vertex_mut(vertex_ids[a]).halfedge = hes[i];
            if edge_map.insert((a, b), hes[i]).is_some() {
                return Err(TvError::NonManifoldEdge { v0: a, v1: b });
            }
        }
    }

    // Second pass: link twins, creating boundary arcs where needed.
    // Sorted so that arc numbering does not depend on hash order.
    let mut directed: Vec<((usize, usize), HalfEdgeId<I>)> =
        edge_map.iter().map(|(&k, &v)| (k, v)).collect();
    directed.sort_unstable_by_key(|&(_, he)| he);

    for ((v0, v1), he) in directed {
        if let Some(&twin) = edge_map.get(&(v1, v0)) {
            mesh.halfedge_mut(he).twin = twin;
        } else {
            let boundary_he = HalfEdgeId::<I>::new(mesh.num_halfedges());
            let mut bhe = HalfEdge::new();
            bhe.origin = vertex_ids[v1];
            bhe.twin = he;
            mesh.halfedges.push(bhe);
            mesh.halfedge_mut(he).twin = boundary_he;
        }
    }

    link_boundary_loops(&mut mesh);
    fix_boundary_vertex_halfedges(&mut mesh);

    Ok(mesh)
}

/// Link boundary arcs into loops.
fn link_boundary_loops<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) {
    let boundary_hes: Vec<HalfEdgeId<I>> = mesh
        .halfedge_ids()
        .filter(|&he| mesh.is_boundary_halfedge(he))
        .collect();

    let mut outgoing: HashMap<usize, HalfEdgeId<I>> = HashMap::new();
    for &he in &boundary_hes {
        outgoing.insert(mesh.origin(he).index(), he);
    }

    for &he in &boundary_hes {
        let dest = mesh.dest(he).index();
        if let Some(&next_he) = outgoing.get(&dest) {
            mesh.halfedge_mut(he).next = next_he;
            mesh.halfedge_mut(next_he).prev = he;
        }
    }
}

/// Ensure boundary vertices point to a boundary arc.
fn fix_boundary_vertex_halfedges<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) {
    for vid in mesh.vertex_ids().collect::<Vec<_>>() {
        let boundary = mesh
            .vertex_halfedges(vid)
            .find(|&he| mesh.is_boundary_halfedge(he));
        if let Some(he) = boundary {
            mesh.vertex_mut(vid).halfedge = he;
        }
    }
}

/// Convert a half-edge mesh back to a face-vertex representation.
///
/// Returns (vertices, faces) tuple.
pub fn to_face_vertex<I: MeshIndex>(mesh: &HalfEdgeMesh<I>) -> (Vec<Point2<f64>>, Vec<[usize; 3]>) {
    let vertices: Vec<Point2<f64>> = mesh.vertex_ids().map(|v| *mesh.position(v)).collect();

    let faces: Vec<[usize; 3]> = mesh
        .face_ids()
        .map(|f| {
            let [v0, v1, v2] = mesh.face_triangle(f);
            [v0.index(), v1.index(), v2.index()]
        })
        .collect();

    (vertices, faces)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize) -> (Vec<Point2<f64>>, Vec<[usize; 3]>) {
        let mut vertices = Vec::new();
        let mut faces = Vec::new();
        for j in 0..=n {
            for i in 0..=n {
                vertices.push(Point2::new(i as f64, j as f64));
            }
        }
        for j in 0..n {
            for i in 0..n {
                let v00 = j * (n + 1) + i;
                let v10 = v00 + 1;
                let v01 = v00 + (n + 1);
                let v11 = v01 + 1;
                faces.push([v00, v10, v11]);
                faces.push([v00, v11, v01]);
            }
        }
        (vertices, faces)
    }

    #[test]
    fn test_build_grid() {
        let (vertices, faces) = grid(3);
        let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();

        assert_eq!(mesh.num_vertices(), 16);
        assert_eq!(mesh.num_faces(), 18);
        // E = 3*3*3 + 2*3 = 33 edges, 12 on the boundary
        assert_eq!(mesh.num_halfedges(), 2 * 33);
        assert!(mesh.is_valid());

        let boundary = mesh
            .halfedge_ids()
            .filter(|&he| mesh.is_boundary_halfedge(he))
            .count();
        assert_eq!(boundary, 12);
    }

    #[test]
    fn test_boundary_vertices() {
        let (vertices, faces) = grid(2);
        let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
        for v in mesh.vertex_ids() {
            assert_eq!(mesh.is_boundary_vertex(v), v.index() != 4);
        }
        assert_eq!(mesh.vertex_faces(VertexId::new(4)).count(), 6);
    }

    #[test]
    fn test_builder_matches_face_list() {
        let (vertices, faces) = grid(1);
        let mut builder = MeshBuilder::with_capacity(4, 2);
        for &p in &vertices {
            builder.add_vertex(p);
        }
        for f in &faces {
            builder.add_triangle(f[0], f[1], f[2]);
        }
        assert_eq!(builder.num_faces(), 2);

        let mesh: HalfEdgeMesh = builder.build().unwrap();
        let (v2, f2) = to_face_vertex(&mesh);
        assert_eq!(v2, vertices);
        assert_eq!(f2, faces);
    }

    #[test]
    fn test_empty_fails() {
        let result = MeshBuilder::new().build::<u32>();
        assert!(matches!(result, Err(TvError::EmptyMesh)));
    }

    #[test]
    fn test_invalid_index_fails() {
        let vertices = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)];
        let result = build_from_triangles::<u32>(&vertices, &[[0, 1, 2]]);
        assert!(matches!(
            result,
            Err(TvError::InvalidVertexIndex { face: 0, vertex: 2 })
        ));
    }

    #[test]
    fn test_degenerate_face_fails() {
        let vertices = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)];
        let result = build_from_triangles::<u32>(&vertices, &[[0, 1, 1]]);
        assert!(matches!(result, Err(TvError::DegenerateFace { face: 0 })));
    }

    #[test]
    fn test_index_capacity_exceeded() {
        let vertices = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)];
        let faces = vec![[0, 1, 2]; 11_000];
        let result = build_from_triangles::<u16>(&vertices, &faces);
        assert!(matches!(result, Err(TvError::IndexOverflow { elements: 66_000, .. })));
    }

    #[test]
    fn test_inconsistent_winding_fails() {
        let vertices = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        // The third face reuses the directed edge 3 -> 0.
        let faces = vec![[0, 1, 2], [0, 2, 3], [3, 0, 2]];
        let result = build_from_triangles::<u32>(&vertices, &faces);
        assert!(matches!(result, Err(TvError::NonManifoldEdge { .. })));
    }
}
