//! Half-edge mesh data structure for planar triangulations.
//!
//! This module provides a half-edge (doubly-connected edge list)
//! representation of a triangulated planar domain. Half-edges are called
//! *arcs* in the rest of the crate: an arc goes from its `origin` (tail) to
//! its `dest` (head), knows its `twin` (opposite arc), the `next`/`prev` arcs
//! around its face and the face itself.
//!
//! # Boundary Handling
//!
//! Boundary arcs have an invalid face ID. Their twins are interior arcs.
//! Boundary loops can be traversed using the `next` pointer on boundary arcs.
//!
//! # Topology Edits
//!
//! Two edits are supported, both O(1) and both only ever *append* to the
//! element arenas:
//!
//! - [`HalfEdgeMesh::flip`] replaces the diagonal of the quad formed by the
//!   two triangles of an interior arc.
//! - [`HalfEdgeMesh::split`] inserts a vertex on an interior arc, turning its
//!   two triangles into four.

use nalgebra::{Point2, Vector2};

use super::index::{FaceId, HalfEdgeId, MeshIndex, VertexId};

/// A vertex in the half-edge mesh.
#[derive(Debug, Clone)]
pub struct Vertex<I: MeshIndex = u32> {
    /// The 2D position of this vertex. Never moved by topology edits.
    pub position: Point2<f64>,

    /// One outgoing arc from this vertex.
    /// For boundary vertices, this is guaranteed to be a boundary arc.
    pub halfedge: HalfEdgeId<I>,
}

impl<I: MeshIndex> Vertex<I> {
    /// Create a new vertex at the given position.
    pub fn new(position: Point2<f64>) -> Self {
        Self {
            position,
            halfedge: HalfEdgeId::invalid(),
        }
    }
}

/// A half-edge (arc) in the mesh.
#[derive(Debug, Clone, Copy)]
pub struct HalfEdge<I: MeshIndex = u32> {
    /// The vertex this arc originates from (its tail).
    pub origin: VertexId<I>,

    /// The opposite arc (pointing in the reverse direction).
    pub twin: HalfEdgeId<I>,

    /// The next arc around the face.
    pub next: HalfEdgeId<I>,

    /// The previous arc around the face.
    pub prev: HalfEdgeId<I>,

    /// The face this arc belongs to.
    /// Invalid for boundary arcs.
    pub face: FaceId<I>,
}

impl<I: MeshIndex> HalfEdge<I> {
    /// Create a new unlinked arc.
    pub fn new() -> Self {
        Self {
            origin: VertexId::invalid(),
            twin: HalfEdgeId::invalid(),
            next: HalfEdgeId::invalid(),
            prev: HalfEdgeId::invalid(),
            face: FaceId::invalid(),
        }
    }

    /// Check if this arc is on the boundary.
    #[inline]
    pub fn is_boundary(&self) -> bool {
        !self.face.is_valid()
    }
}

impl<I: MeshIndex> Default for HalfEdge<I> {
    fn default() -> Self {
        Self::new()
    }
}

/// A triangular face in the half-edge mesh.
#[derive(Debug, Clone, Copy)]
pub struct Face<I: MeshIndex = u32> {
    /// One arc on the boundary of this face.
    pub halfedge: HalfEdgeId<I>,
}

impl<I: MeshIndex> Face<I> {
    /// Create a new face with the given arc.
    pub fn new(halfedge: HalfEdgeId<I>) -> Self {
        Self { halfedge }
    }
}

impl<I: MeshIndex> Default for Face<I> {
    fn default() -> Self {
        Self {
            halfedge: HalfEdgeId::invalid(),
        }
    }
}

/// A half-edge mesh of a triangulated planar domain.
#[derive(Debug, Clone)]
pub struct HalfEdgeMesh<I: MeshIndex = u32> {
    pub(crate) vertices: Vec<Vertex<I>>,
    pub(crate) halfedges: Vec<HalfEdge<I>>,
    pub(crate) faces: Vec<Face<I>>,
}

impl<I: MeshIndex> Default for HalfEdgeMesh<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: MeshIndex> HalfEdgeMesh<I> {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            halfedges: Vec::new(),
            faces: Vec::new(),
        }
    }

    /// Create a mesh with pre-allocated capacity.
    pub fn with_capacity(num_vertices: usize, num_faces: usize) -> Self {
        // Interior edges are shared, boundary edges get one extra arc each.
        let num_halfedges = num_faces * 3 + num_faces / 2;

        Self {
            vertices: Vec::with_capacity(num_vertices),
            halfedges: Vec::with_capacity(num_halfedges),
            faces: Vec::with_capacity(num_faces),
        }
    }

    // ==================== Accessors ====================

    /// Get the number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of arcs, boundary arcs included.
    #[inline]
    pub fn num_halfedges(&self) -> usize {
        self.halfedges.len()
    }

    /// Get the number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Get a vertex by ID.
    #[inline]
    pub fn vertex(&self, id: VertexId<I>) -> &Vertex<I> {
        &self.vertices[id.index()]
    }

    #[inline]
    pub(crate) fn vertex_mut(&mut self, id: VertexId<I>) -> &mut Vertex<I> {
        &mut self.vertices[id.index()]
    }

    /// Get an arc by ID.
    #[inline]
    pub fn halfedge(&self, id: HalfEdgeId<I>) -> &HalfEdge<I> {
        &self.halfedges[id.index()]
    }

    #[inline]
    pub(crate) fn halfedge_mut(&mut self, id: HalfEdgeId<I>) -> &mut HalfEdge<I> {
        &mut self.halfedges[id.index()]
    }

    /// Get a face by ID.
    #[inline]
    pub fn face(&self, id: FaceId<I>) -> &Face<I> {
        &self.faces[id.index()]
    }

    #[inline]
    pub(crate) fn face_mut(&mut self, id: FaceId<I>) -> &mut Face<I> {
        &mut self.faces[id.index()]
    }

    /// Get the position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId<I>) -> &Point2<f64> {
        &self.vertex(v).position
    }

    // ==================== Topology Queries ====================

    /// Get the twin (opposite) arc.
    #[inline]
    pub fn twin(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).twin
    }

    /// Get the next arc around the face.
    #[inline]
    pub fn next(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).next
    }

    /// Get the previous arc around the face.
    #[inline]
    pub fn prev(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).prev
    }

    /// Get the origin (tail) vertex of an arc.
    #[inline]
    pub fn origin(&self, he: HalfEdgeId<I>) -> VertexId<I> {
        self.halfedge(he).origin
    }

    /// Get the destination (head) vertex of an arc.
    #[inline]
    pub fn dest(&self, he: HalfEdgeId<I>) -> VertexId<I> {
        self.origin(self.twin(he))
    }

    /// Get the face of an arc, invalid for boundary arcs.
    #[inline]
    pub fn face_of(&self, he: HalfEdgeId<I>) -> FaceId<I> {
        self.halfedge(he).face
    }

    /// Check if an arc is on the boundary.
    #[inline]
    pub fn is_boundary_halfedge(&self, he: HalfEdgeId<I>) -> bool {
        self.halfedge(he).is_boundary()
    }

    /// Check if an edge (given by either of its arcs) touches the boundary.
    #[inline]
    pub fn is_boundary_edge(&self, he: HalfEdgeId<I>) -> bool {
        self.is_boundary_halfedge(he) || self.is_boundary_halfedge(self.twin(he))
    }

    /// Check if a vertex is on the boundary.
    pub fn is_boundary_vertex(&self, v: VertexId<I>) -> bool {
        self.vertex_halfedges(v)
            .any(|he| self.is_boundary_halfedge(he))
            || !self.vertex(v).halfedge.is_valid()
    }

    /// The four vertices `[P0, P1, P2, P3]` of the quad formed by the two
    /// triangles of `he`, in cyclic order.
    ///
    /// `P0` is the head and `P2` the tail of `he`, so the current diagonal
    /// is `P0-P2`; `P1` is the third vertex of `face_of(he)` and `P3` the
    /// third vertex of `face_of(twin(he))`. Returns `None` when either side
    /// of the arc is a boundary.
    pub fn vertices_around_arc(&self, he: HalfEdgeId<I>) -> Option<[VertexId<I>; 4]> {
        let tw = self.twin(he);
        if self.is_boundary_halfedge(he) || self.is_boundary_halfedge(tw) {
            return None;
        }
        Some([
            self.dest(he),
            self.origin(self.prev(he)),
            self.origin(he),
            self.origin(self.prev(tw)),
        ])
    }

    // ==================== Iteration ====================

    /// Iterate over all vertex IDs.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId<I>> + '_ {
        (0..self.vertices.len()).map(VertexId::new)
    }

    /// Iterate over all arc IDs.
    pub fn halfedge_ids(&self) -> impl Iterator<Item = HalfEdgeId<I>> + '_ {
        (0..self.halfedges.len()).map(HalfEdgeId::new)
    }

    /// Iterate over all face IDs.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId<I>> + '_ {
        (0..self.faces.len()).map(FaceId::new)
    }

    /// Iterate over outgoing arcs around a vertex.
    pub fn vertex_halfedges(&self, v: VertexId<I>) -> VertexHalfEdgeIter<'_, I> {
        VertexHalfEdgeIter::new(self, v)
    }

    /// Iterate over vertices adjacent to a vertex.
    pub fn vertex_neighbors(&self, v: VertexId<I>) -> impl Iterator<Item = VertexId<I>> + '_ {
        self.vertex_halfedges(v).map(|he| self.dest(he))
    }

    /// Iterate over faces incident to a vertex.
    pub fn vertex_faces(&self, v: VertexId<I>) -> impl Iterator<Item = FaceId<I>> + '_ {
        self.vertex_halfedges(v)
            .map(|he| self.face_of(he))
            .filter(|f| f.is_valid())
    }

    /// Get the three vertices of a face, in winding order.
    pub fn face_triangle(&self, f: FaceId<I>) -> [VertexId<I>; 3] {
        let he0 = self.face(f).halfedge;
        let he1 = self.next(he0);
        let he2 = self.next(he1);
        [self.origin(he0), self.origin(he1), self.origin(he2)]
    }

    /// Get the positions of the three vertices of a face.
    pub fn face_positions(&self, f: FaceId<I>) -> [Point2<f64>; 3] {
        let [v0, v1, v2] = self.face_triangle(f);
        [*self.position(v0), *self.position(v1), *self.position(v2)]
    }

    // ==================== Geometry ====================

    /// Signed area of a face; the sign gives the winding of the face.
    pub fn face_signed_area(&self, f: FaceId<I>) -> f64 {
        let [p0, p1, p2] = self.face_positions(f);
        0.5 * cross(&(p1 - p0), &(p2 - p0))
    }

    /// The length of the longest side of a face.
    pub fn face_diameter(&self, f: FaceId<I>) -> f64 {
        let [a, b, c] = self.face_positions(f);
        (b - a).norm().max((c - b).norm()).max((a - c).norm())
    }

    /// The aspect ratio of a face: the largest ratio between a side and the
    /// height through the opposite vertex. The greater, the more elongated.
    pub fn face_aspect_ratio(&self, f: FaceId<I>) -> f64 {
        let [a, b, c] = self.face_positions(f);
        let ab = b - a;
        let bc = c - b;
        let ca = a - c;
        let dab = ab.norm();
        let dbc = bc.norm();
        let dca = ca.norm();
        let ha = (ab - ab.dot(&bc) / (dbc * dbc) * bc).norm();
        let hb = (bc - bc.dot(&ca) / (dca * dca) * ca).norm();
        let hc = (ca - ca.dot(&ab) / (dab * dab) * ab).norm();
        (dab / hc).max(dbc / ha).max(dca / hb)
    }

    /// Check strict convexity of the quad `[P0, P1, P2, P3]`.
    ///
    /// Either winding is accepted; collinear corners are not convex.
    pub fn is_convex_quad(&self, quad: &[VertexId<I>; 4]) -> bool {
        let p = quad.map(|v| *self.position(v));
        let e = [p[1] - p[0], p[2] - p[1], p[3] - p[2], p[0] - p[3]];
        let turns = [
            cross(&e[0], &e[1]),
            cross(&e[1], &e[2]),
            cross(&e[2], &e[3]),
            cross(&e[3], &e[0]),
        ];
        turns.iter().all(|&t| t < 0.0) || turns.iter().all(|&t| t > 0.0)
    }

    /// Compute the bounding box of the mesh.
    pub fn bounding_box(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        let first = self.vertices.first()?.position;
        let mut min = first;
        let mut max = first;

        for v in &self.vertices {
            for i in 0..2 {
                min[i] = min[i].min(v.position[i]);
                max[i] = max[i].max(v.position[i]);
            }
        }

        Some((min, max))
    }

    // ==================== Construction ====================

    /// Add a new isolated vertex and return its ID.
    pub fn add_vertex(&mut self, position: Point2<f64>) -> VertexId<I> {
        let id = VertexId::new(self.vertices.len());
        self.vertices.push(Vertex::new(position));
        id
    }

    fn push_halfedge(&mut self, origin: VertexId<I>) -> HalfEdgeId<I> {
        let id = HalfEdgeId::new(self.halfedges.len());
        let mut he = HalfEdge::new();
        he.origin = origin;
        self.halfedges.push(he);
        id
    }

    /// Link three arcs into the triangle `f`.
    pub(crate) fn link_triangle(&mut self, f: FaceId<I>, hes: [HalfEdgeId<I>; 3]) {
        for i in 0..3 {
            let he = self.halfedge_mut(hes[i]);
            he.next = hes[(i + 1) % 3];
            he.prev = hes[(i + 2) % 3];
            he.face = f;
        }
        self.face_mut(f).halfedge = hes[0];
    }

    fn set_twins(&mut self, a: HalfEdgeId<I>, b: HalfEdgeId<I>) {
        self.halfedge_mut(a).twin = b;
        self.halfedge_mut(b).twin = a;
    }

    // ==================== Topology Edits ====================

    /// Flip the diagonal of the quad around an interior arc.
    ///
    /// With `[P0, P1, P2, P3] = vertices_around_arc(he)`, the diagonal
    /// `P0-P2` is replaced by `P1-P3`. Afterwards `face_of(he)` is the
    /// triangle `(P1, P2, P3)` and `face_of(twin(he))` is `(P0, P1, P3)`;
    /// `he` now goes from `P3` to `P1`. No element is created or destroyed.
    ///
    /// Returns `false` (and leaves the mesh untouched) for boundary arcs.
    /// Convexity is the caller's business.
    pub fn flip(&mut self, he: HalfEdgeId<I>) -> bool {
        let tw = self.twin(he);
        let (fx, fy) = (self.face_of(he), self.face_of(tw));
        if !fx.is_valid() || !fy.is_valid() {
            return false;
        }

        let a_n = self.next(he);
        let a_p = self.prev(he);
        let b_n = self.next(tw);
        let b_p = self.prev(tw);

        let tail = self.origin(he);
        let head = self.origin(tw);
        let p1 = self.origin(a_p);
        let p3 = self.origin(b_p);

        if self.vertex(tail).halfedge == he {
            self.vertex_mut(tail).halfedge = b_n;
        }
        if self.vertex(head).halfedge == tw {
            self.vertex_mut(head).halfedge = a_n;
        }

        self.halfedge_mut(he).origin = p3;
        self.halfedge_mut(tw).origin = p1;

        self.link_triangle(fx, [he, a_p, b_n]);
        self.link_triangle(fy, [tw, b_p, a_n]);
        true
    }

    /// Split an interior arc by inserting a new vertex at `position`.
    ///
    /// With `[P0, P1, P2, P3] = vertices_around_arc(he)` and `m` the new
    /// vertex, the two triangles of the arc become `(P2, m, P1)`,
    /// `(m, P0, P1)`, `(P0, m, P3)` and `(m, P2, P3)`. The two existing
    /// faces are reused and two faces plus six arcs are appended.
    ///
    /// The new vertex is combinatorially on the arc; `position` must lie
    /// strictly inside the quad for the result to be a valid planar
    /// triangulation. Returns `None` for boundary arcs, and when the six new
    /// arcs would not fit in the index type.
    pub fn split(&mut self, he: HalfEdgeId<I>, position: Point2<f64>) -> Option<VertexId<I>> {
        let tw = self.twin(he);
        let (fx, fy) = (self.face_of(he), self.face_of(tw));
        if !fx.is_valid() || !fy.is_valid() {
            return None;
        }
        // Arcs outnumber vertices and faces.
        if self.halfedges.len() + 6 > I::capacity() {
            return None;
        }

        let a_n = self.next(he);
        let a_p = self.prev(he);
        let b_n = self.next(tw);
        let b_p = self.prev(tw);

        let tail = self.origin(he);
        let head = self.origin(tw);
        let c = self.origin(a_p);
        let d = self.origin(b_p);

        let m = self.add_vertex(position);
        let m_tail = self.push_halfedge(m);
        let m_head = self.push_halfedge(m);
        let m_c = self.push_halfedge(m);
        let c_m = self.push_halfedge(c);
        let m_d = self.push_halfedge(m);
        let d_m = self.push_halfedge(d);
        self.vertex_mut(m).halfedge = m_c;

        // `he` now ends at m, `tw` now ends at m.
        self.set_twins(he, m_tail);
        self.set_twins(tw, m_head);
        self.set_twins(m_c, c_m);
        self.set_twins(m_d, d_m);

        let fx2 = FaceId::new(self.faces.len());
        self.faces.push(Face::default());
        let fy2 = FaceId::new(self.faces.len());
        self.faces.push(Face::default());

        self.link_triangle(fx, [he, m_c, a_p]);
        self.link_triangle(fx2, [m_head, a_n, c_m]);
        self.link_triangle(fy, [tw, m_d, b_p]);
        self.link_triangle(fy2, [m_tail, b_n, d_m]);

        debug_assert_eq!(self.dest(he), m);
        debug_assert_eq!(self.origin(m_head), m);
        debug_assert!(self.origin(he) == tail && self.origin(tw) == head);
        Some(m)
    }

    // ==================== Validation ====================

    /// Check if the mesh is valid (all connectivity is consistent).
    pub fn is_valid(&self) -> bool {
        for (i, v) in self.vertices.iter().enumerate() {
            if v.halfedge.is_valid() && self.origin(v.halfedge).index() != i {
                return false;
            }
        }

        for (i, he) in self.halfedges.iter().enumerate() {
            let id = HalfEdgeId::new(i);
            if !he.twin.is_valid() || self.twin(he.twin) != id {
                return false;
            }
            if he.next.is_valid() && self.prev(he.next) != id {
                return false;
            }
            if he.prev.is_valid() && self.next(he.prev) != id {
                return false;
            }
            if he.next.is_valid() && self.origin(he.next) != self.dest(id) {
                return false;
            }
        }

        for (i, f) in self.faces.iter().enumerate() {
            let fid = FaceId::new(i);
            if !f.halfedge.is_valid() {
                return false;
            }
            let he0 = f.halfedge;
            let he1 = self.next(he0);
            let he2 = self.next(he1);
            if self.next(he2) != he0 {
                return false;
            }
            if [he0, he1, he2].iter().any(|&he| self.face_of(he) != fid) {
                return false;
            }
        }

        true
    }
}

/// 2D cross product (z component of the 3D cross product).
#[inline]
pub(crate) fn cross(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Iterator over outgoing arcs around a vertex.
pub struct VertexHalfEdgeIter<'a, I: MeshIndex = u32> {
    mesh: &'a HalfEdgeMesh<I>,
    start: HalfEdgeId<I>,
    current: HalfEdgeId<I>,
    done: bool,
}

impl<'a, I: MeshIndex> VertexHalfEdgeIter<'a, I> {
    fn new(mesh: &'a HalfEdgeMesh<I>, v: VertexId<I>) -> Self {
        let start = mesh.vertex(v).halfedge;
        Self {
            mesh,
            start,
            current: start,
            done: !start.is_valid(),
        }
    }
}

impl<'a, I: MeshIndex> Iterator for VertexHalfEdgeIter<'a, I> {
    type Item = HalfEdgeId<I>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.current;

        // If he goes v -> w, then next(twin(he)) is the next arc leaving v.
        self.current = self.mesh.next(self.mesh.twin(self.current));

        if self.current == self.start || !self.current.is_valid() {
            self.done = true;
        }

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_from_triangles;
    use std::collections::BTreeSet;

    /// Two triangles sharing the diagonal 0-2 of the unit square.
    fn square() -> HalfEdgeMesh {
        let vertices = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        let faces = vec![[0, 1, 2], [0, 2, 3]];
        build_from_triangles(&vertices, &faces).unwrap()
    }

    fn diagonal(mesh: &HalfEdgeMesh) -> HalfEdgeId {
        mesh.halfedge_ids()
            .find(|&he| !mesh.is_boundary_edge(he))
            .unwrap()
    }

    fn triangles(mesh: &HalfEdgeMesh) -> BTreeSet<BTreeSet<usize>> {
        mesh.face_ids()
            .map(|f| mesh.face_triangle(f).iter().map(|v| v.index()).collect())
            .collect()
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = HalfEdgeMesh::<u32>::new();
        assert_eq!(mesh.num_vertices(), 0);
        assert_eq!(mesh.num_faces(), 0);
        assert!(mesh.is_valid());
        assert!(mesh.bounding_box().is_none());
    }

    #[test]
    fn test_vertices_around_arc() {
        let mesh = square();
        let he = diagonal(&mesh);
        let quad = mesh.vertices_around_arc(he).unwrap();

        assert_eq!(quad[0], mesh.dest(he));
        assert_eq!(quad[2], mesh.origin(he));
        let ends: BTreeSet<usize> = [quad[0].index(), quad[2].index()].into();
        assert_eq!(ends, [0, 2].into());
        let sides: BTreeSet<usize> = [quad[1].index(), quad[3].index()].into();
        assert_eq!(sides, [1, 3].into());

        let f = mesh.face_of(he);
        let tri: BTreeSet<VertexId> = mesh.face_triangle(f).into();
        assert_eq!(tri, [quad[0], quad[1], quad[2]].into());
    }

    #[test]
    fn test_boundary_arc_has_no_quad() {
        let mesh = square();
        let boundary = mesh
            .halfedge_ids()
            .find(|&he| mesh.is_boundary_halfedge(he))
            .unwrap();
        assert!(mesh.vertices_around_arc(boundary).is_none());
        assert!(mesh.vertices_around_arc(mesh.twin(boundary)).is_none());
    }

    #[test]
    fn test_flip_square() {
        let mut mesh = square();
        let he = diagonal(&mesh);
        let quad = mesh.vertices_around_arc(he).unwrap();

        assert!(mesh.flip(he));
        assert!(mesh.is_valid());
        assert_eq!(mesh.num_faces(), 2);

        let fx: BTreeSet<VertexId> = mesh.face_triangle(mesh.face_of(he)).into();
        let fy: BTreeSet<VertexId> = mesh.face_triangle(mesh.face_of(mesh.twin(he))).into();
        assert_eq!(fx, [quad[1], quad[2], quad[3]].into());
        assert_eq!(fy, [quad[0], quad[1], quad[3]].into());
        assert_eq!(mesh.origin(he), quad[3]);
        assert_eq!(mesh.dest(he), quad[1]);
    }

    #[test]
    fn test_flip_keeps_winding() {
        let mut mesh = square();
        let he = diagonal(&mesh);
        let signs: Vec<bool> = mesh.face_ids().map(|f| mesh.face_signed_area(f) > 0.0).collect();
        mesh.flip(he);
        for f in mesh.face_ids() {
            assert_eq!(mesh.face_signed_area(f) > 0.0, signs[0]);
            assert!((mesh.face_signed_area(f).abs() - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_flip_twice_restores_triangles() {
        let mut mesh = square();
        let before = triangles(&mesh);
        let he = diagonal(&mesh);
        mesh.flip(he);
        assert_ne!(triangles(&mesh), before);
        mesh.flip(he);
        assert_eq!(triangles(&mesh), before);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_flip_boundary_is_refused() {
        let mut mesh = square();
        let boundary = mesh
            .halfedge_ids()
            .find(|&he| mesh.is_boundary_edge(he))
            .unwrap();
        assert!(!mesh.flip(boundary));
    }

    #[test]
    fn test_split_square() {
        let mut mesh = square();
        let he = diagonal(&mesh);
        let arcs_before = mesh.num_halfedges();

        let m = mesh.split(he, Point2::new(0.5, 0.5)).unwrap();
        assert_eq!(m.index(), 4);
        assert_eq!(mesh.num_vertices(), 5);
        assert_eq!(mesh.num_faces(), 4);
        assert_eq!(mesh.num_halfedges(), arcs_before + 6);
        assert!(mesh.is_valid());

        assert_eq!(mesh.vertex_faces(m).count(), 4);
        let neighbors: BTreeSet<usize> = mesh.vertex_neighbors(m).map(|v| v.index()).collect();
        assert_eq!(neighbors, [0, 1, 2, 3].into());
        let total: f64 = mesh.face_ids().map(|f| mesh.face_signed_area(f).abs()).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_split_stops_at_index_capacity() {
        let vertices = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        let mut mesh: HalfEdgeMesh<u16> = build_from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap();
        let mut he = mesh.halfedge_ids().find(|&he| !mesh.is_boundary_edge(he)).unwrap();

        let mut splits = 0;
        loop {
            let (a, b) = (mesh.position(mesh.origin(he)), mesh.position(mesh.dest(he)));
            let mid = Point2::from((a.coords + b.coords) * 0.5);
            let Some(m) = mesh.split(he, mid) else {
                break;
            };
            splits += 1;
            he = mesh.vertex_halfedges(m).next().unwrap();
        }

        assert!(mesh.num_halfedges() <= u16::capacity());
        assert!(mesh.num_halfedges() + 6 > u16::capacity());
        assert_eq!(mesh.num_vertices(), 4 + splits);
        assert_eq!(mesh.num_faces(), 2 + 2 * splits);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_convexity() {
        let mut mesh = HalfEdgeMesh::<u32>::new();
        let v: Vec<VertexId> = [(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0), (1.5, 0.5)]
            .iter()
            .map(|&(x, y)| mesh.add_vertex(Point2::new(x, y)))
            .collect();

        assert!(mesh.is_convex_quad(&[v[0], v[1], v[2], v[3]]));
        assert!(mesh.is_convex_quad(&[v[3], v[2], v[1], v[0]]));
        // v4 is a reflex corner.
        assert!(!mesh.is_convex_quad(&[v[0], v[1], v[2], v[4]]));

        let mid = mesh.add_vertex(Point2::new(1.0, 0.0));
        assert!(!mesh.is_convex_quad(&[v[0], mid, v[1], v[2]]));
    }

    #[test]
    fn test_face_metrics() {
        let mesh = square();
        let f = FaceId::new(0);
        assert!((mesh.face_diameter(f) - 2.0_f64.sqrt()).abs() < 1e-12);
        // Right isoceles triangle: hypotenuse over its height is 2.
        assert!((mesh.face_aspect_ratio(f) - 2.0).abs() < 1e-12);
    }
}
