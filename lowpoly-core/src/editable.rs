//! Editable mesh store
//!
//! [`EditableMesh`] keeps the face list of a [`TriangleMesh`] together with a
//! vertex-to-face incidence table so that neighborhoods can be queried and
//! edges collapsed in time proportional to the local valence. Removed
//! vertices and faces are tombstoned; their indices stay stable until the
//! mesh is compacted again with [`EditableMesh::to_mesh`].

use crate::error::{Result, TopologyError};
use crate::mesh::{triangle_normal, TriangleMesh, DEGENERATE_AREA_EPSILON};
use crate::point::*;
use std::collections::BTreeSet;

/// Compacted output of an [`EditableMesh`].
#[derive(Debug, Clone)]
pub struct CompactMesh {
    pub mesh: TriangleMesh,
    /// For each output face, its index in the mesh the store was built from
    pub face_origin: Vec<usize>,
    /// For each output vertex, its index in the mesh the store was built from
    pub vertex_origin: Vec<usize>,
}

/// Indexed triangle store with adjacency queries and safe edge collapse.
#[derive(Debug, Clone)]
pub struct EditableMesh {
    positions: Vec<Point3f>,
    normals: Option<Vec<Vector3f>>,
    faces: Vec<[usize; 3]>,
    uvs: Option<Vec<[Point2f; 3]>>,
    materials: Vec<MaterialId>,
    face_alive: Vec<bool>,
    vertex_alive: Vec<bool>,
    vertex_faces: Vec<Vec<usize>>,
    live_vertices: usize,
    live_faces: usize,
    min_normal_dot: f64,
}

impl EditableMesh {
    /// Build the store from a mesh, validating it first.
    pub fn from_mesh(mesh: &TriangleMesh) -> Result<Self> {
        mesh.validate()?;

        let mut vertex_faces = vec![Vec::new(); mesh.vertices.len()];
        for (fi, face) in mesh.faces.iter().enumerate() {
            for &v in face {
                vertex_faces[v].push(fi);
            }
        }

        Ok(Self {
            positions: mesh.vertices.clone(),
            normals: mesh.normals.clone(),
            faces: mesh.faces.clone(),
            uvs: mesh.uvs.clone(),
            materials: mesh.materials.clone(),
            face_alive: vec![true; mesh.faces.len()],
            vertex_alive: vec![true; mesh.vertices.len()],
            vertex_faces,
            live_vertices: mesh.vertices.len(),
            live_faces: mesh.faces.len(),
            min_normal_dot: 0.0,
        })
    }

    /// Smallest allowed cosine between a face normal before and after a
    /// collapse. `0.0` rejects any rotation past 90 degrees.
    pub fn with_min_normal_dot(mut self, min_normal_dot: f64) -> Self {
        self.min_normal_dot = min_normal_dot;
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.live_vertices
    }

    pub fn face_count(&self) -> usize {
        self.live_faces
    }

    /// Number of vertex slots, including removed ones
    pub fn vertex_capacity(&self) -> usize {
        self.positions.len()
    }

    /// Number of face slots, including removed ones
    pub fn face_capacity(&self) -> usize {
        self.faces.len()
    }

    pub fn is_vertex_alive(&self, v: usize) -> bool {
        self.vertex_alive.get(v).copied().unwrap_or(false)
    }

    pub fn is_face_alive(&self, f: usize) -> bool {
        self.face_alive.get(f).copied().unwrap_or(false)
    }

    pub fn position(&self, v: usize) -> Point3f {
        self.positions[v]
    }

    pub fn face(&self, f: usize) -> [usize; 3] {
        self.faces[f]
    }

    pub fn material(&self, f: usize) -> MaterialId {
        self.materials[f]
    }

    pub fn face_uvs(&self, f: usize) -> Option<&[Point2f; 3]> {
        self.uvs.as_ref().map(|uvs| &uvs[f])
    }

    pub fn has_uvs(&self) -> bool {
        self.uvs.is_some()
    }

    /// UV of vertex `v` in face `f`
    pub fn corner_uv(&self, f: usize, v: usize) -> Option<Point2f> {
        let corner = self.faces[f].iter().position(|&x| x == v)?;
        self.face_uvs(f).map(|uvs| uvs[corner])
    }

    /// Live faces incident to `v`
    pub fn adjacent_faces(&self, v: usize) -> &[usize] {
        &self.vertex_faces[v]
    }

    /// Vertices sharing an edge with `v`, ascending
    pub fn adjacent_vertices(&self, v: usize) -> Vec<usize> {
        self.neighbor_set(v).into_iter().collect()
    }

    fn neighbor_set(&self, v: usize) -> BTreeSet<usize> {
        self.vertex_faces[v]
            .iter()
            .flat_map(|&f| self.faces[f])
            .filter(|&x| x != v)
            .collect()
    }

    /// Live faces containing both `a` and `b`
    pub fn edge_faces(&self, a: usize, b: usize) -> Vec<usize> {
        self.vertex_faces[a]
            .iter()
            .copied()
            .filter(|&f| self.faces[f].contains(&b))
            .collect()
    }

    /// An edge used by exactly one face
    pub fn is_boundary_edge(&self, a: usize, b: usize) -> bool {
        self.edge_faces(a, b).len() == 1
    }

    /// A vertex with at least one incident boundary edge
    pub fn is_boundary_vertex(&self, v: usize) -> bool {
        self.neighbor_set(v)
            .into_iter()
            .any(|x| self.is_boundary_edge(v, x))
    }

    /// All live edges as `(min, max)` pairs, ascending
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut edges = BTreeSet::new();
        for (f, face) in self.faces.iter().enumerate() {
            if !self.face_alive[f] {
                continue;
            }
            for i in 0..3 {
                let (a, b) = (face[i], face[(i + 1) % 3]);
                edges.insert((a.min(b), a.max(b)));
            }
        }
        edges.into_iter().collect()
    }

    /// Unit normal of a live face, `None` when it has no area
    pub fn face_normal(&self, f: usize) -> Option<Vector3d> {
        let [a, b, c] = self.faces[f];
        triangle_normal(&self.positions[a], &self.positions[b], &self.positions[c])
            .try_normalize(f64::EPSILON)
    }

    /// Merge `b` into `a`, moving `a` to `target`.
    ///
    /// Faces containing both endpoints are deleted, every other face using
    /// `b` is rewritten to use `a`. Corner UVs of rewritten faces take the
    /// coordinate `a` had in a deleted face on the same side of any seam,
    /// falling back to `a`'s coordinate in a neighboring face.
    /// Returns the number of deleted faces.
    ///
    /// Every check runs before the first write, so an error leaves the
    /// mesh exactly as it was.
    pub fn collapse_edge(
        &mut self,
        a: usize,
        b: usize,
        target: Point3f,
    ) -> std::result::Result<usize, TopologyError> {
        if a == b || !self.is_vertex_alive(a) || !self.is_vertex_alive(b) {
            return Err(TopologyError::NotAnEdge { a, b });
        }
        let shared = self.edge_faces(a, b);
        if shared.is_empty() {
            return Err(TopologyError::NotAnEdge { a, b });
        }

        self.check_link_condition(a, b, &shared)?;
        if shared.len() == 2 && self.is_boundary_vertex(a) && self.is_boundary_vertex(b) {
            return Err(TopologyError::BoundaryPinch { a, b });
        }

        let affected: Vec<usize> = self.vertex_faces[a]
            .iter()
            .chain(self.vertex_faces[b].iter())
            .copied()
            .filter(|f| !shared.contains(f))
            .collect();
        let rewritten: Vec<[usize; 3]> = affected
            .iter()
            .map(|&f| self.faces[f].map(|v| if v == b { a } else { v }))
            .collect();

        Self::check_rewritten(a, &affected, &rewritten)?;
        self.check_orientation(a, target, &affected, &rewritten)?;

        // Apply
        let mut uv_map: Vec<(Point2f, Point2f)> = Vec::new();
        for &f in &shared {
            if let (Some(uv_b), Some(uv_a)) = (self.corner_uv(f, b), self.corner_uv(f, a)) {
                uv_map.push((uv_b, uv_a));
            }
            self.face_alive[f] = false;
            self.live_faces -= 1;
            for v in self.faces[f] {
                self.vertex_faces[v].retain(|&x| x != f);
            }
        }

        let kept = self.vertex_faces[a].clone();
        let moved = std::mem::take(&mut self.vertex_faces[b]);
        for &f in &moved {
            let corner = self.faces[f].iter().position(|&v| v == b);
            if let Some(corner) = corner {
                let uv = self.moved_corner_uv(a, f, corner, &uv_map, &kept);
                self.faces[f][corner] = a;
                if let (Some(uvs), Some(uv)) = (self.uvs.as_mut(), uv) {
                    uvs[f][corner] = uv;
                }
            }
            self.vertex_faces[a].push(f);
        }

        self.vertex_alive[b] = false;
        self.live_vertices -= 1;
        self.positions[a] = target;
        if let Some(normals) = self.normals.as_mut() {
            if let Some(n) = (normals[a] + normals[b]).try_normalize(f32::EPSILON) {
                normals[a] = n;
            }
        }

        Ok(shared.len())
    }

    /// New UV for corner `corner` of face `f`, which is about to move onto `a`.
    ///
    /// A corner on the same side of a seam as one of the deleted faces takes
    /// `a`'s coordinate from that face. Otherwise it takes `a`'s coordinate
    /// from the face of `a`'s fan nearest to `f`.
    fn moved_corner_uv(
        &self,
        a: usize,
        f: usize,
        corner: usize,
        uv_map: &[(Point2f, Point2f)],
        kept: &[usize],
    ) -> Option<Point2f> {
        let old = self.face_uvs(f)?[corner];
        if let Some(&(_, uv_a)) = uv_map.iter().find(|(uv_b, _)| *uv_b == old) {
            return Some(uv_a);
        }
        let shares_vertex =
            |g: usize| self.faces[g].iter().any(|&v| v != a && self.faces[f].contains(&v));
        match kept.iter().copied().find(|&g| shares_vertex(g)).or(kept.first().copied()) {
            Some(g) => self.corner_uv(g, a),
            None => uv_map.first().map(|&(_, uv_a)| uv_a),
        }
    }

    /// The vertices adjacent to both endpoints must be exactly the apices of
    /// the faces on the edge.
    fn check_link_condition(
        &self,
        a: usize,
        b: usize,
        shared: &[usize],
    ) -> std::result::Result<(), TopologyError> {
        let apices: BTreeSet<usize> = shared
            .iter()
            .flat_map(|&f| self.faces[f])
            .filter(|&v| v != a && v != b)
            .collect();
        let na = self.neighbor_set(a);
        let nb = self.neighbor_set(b);
        let common: BTreeSet<usize> = na.intersection(&nb).copied().collect();
        if common != apices {
            return Err(TopologyError::LinkCondition { a, b });
        }
        Ok(())
    }

    /// Faces touched by the collapse may not duplicate each other and no
    /// edge at the surviving vertex may end up with more than two faces.
    fn check_rewritten(
        a: usize,
        affected: &[usize],
        rewritten: &[[usize; 3]],
    ) -> std::result::Result<(), TopologyError> {
        let mut seen = BTreeSet::new();
        for (&f, tri) in affected.iter().zip(rewritten) {
            let mut key = *tri;
            key.sort_unstable();
            if !seen.insert(key) {
                return Err(TopologyError::DuplicateFace { face: f });
            }
        }

        let mut counts: Vec<(usize, usize)> = Vec::new();
        for tri in rewritten {
            for &x in tri.iter().filter(|&&x| x != a) {
                match counts.iter_mut().find(|(v, _)| *v == x) {
                    Some((_, n)) => *n += 1,
                    None => counts.push((x, 1)),
                }
            }
        }
        if let Some(&(x, n)) = counts.iter().find(|(_, n)| *n > 2) {
            return Err(TopologyError::NonManifoldEdge { a, b: x, faces: n });
        }
        Ok(())
    }

    /// No rewritten face may lose its area or turn further than
    /// `min_normal_dot` allows.
    fn check_orientation(
        &self,
        a: usize,
        target: Point3f,
        affected: &[usize],
        rewritten: &[[usize; 3]],
    ) -> std::result::Result<(), TopologyError> {
        let moved = |v: usize| if v == a { target } else { self.positions[v] };
        for (&f, tri) in affected.iter().zip(rewritten) {
            let after = triangle_normal(&moved(tri[0]), &moved(tri[1]), &moved(tri[2]));
            if after.norm() * 0.5 <= DEGENERATE_AREA_EPSILON {
                return Err(TopologyError::FaceFlip { face: f });
            }
            let Some(before) = self.face_normal(f) else {
                continue;
            };
            if before.dot(&after.normalize()) < self.min_normal_dot {
                return Err(TopologyError::FaceFlip { face: f });
            }
        }
        Ok(())
    }

    /// Compact live vertices and faces into a new mesh.
    pub fn to_mesh(&self) -> CompactMesh {
        let mut remap = vec![usize::MAX; self.positions.len()];
        let mut vertex_origin = Vec::with_capacity(self.live_vertices);
        for (v, &alive) in self.vertex_alive.iter().enumerate() {
            if alive {
                remap[v] = vertex_origin.len();
                vertex_origin.push(v);
            }
        }

        let face_origin: Vec<usize> = (0..self.faces.len())
            .filter(|&f| self.face_alive[f])
            .collect();

        let vertices = vertex_origin.iter().map(|&v| self.positions[v]).collect();
        let normals = self
            .normals
            .as_ref()
            .map(|normals| vertex_origin.iter().map(|&v| normals[v]).collect());
        let faces = face_origin
            .iter()
            .map(|&f| self.faces[f].map(|v| remap[v]))
            .collect();
        let uvs = self
            .uvs
            .as_ref()
            .map(|uvs| face_origin.iter().map(|&f| uvs[f]).collect());
        let materials = face_origin.iter().map(|&f| self.materials[f]).collect();

        CompactMesh {
            mesh: TriangleMesh {
                vertices,
                faces,
                normals,
                uvs,
                materials,
            },
            face_origin,
            vertex_origin,
        }
    }
}
