//! Mesh data structures and functionality

use crate::error::{Error, Result};
use crate::point::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Smallest vertex count accepted as simplification input.
pub const MIN_VERTEX_COUNT: usize = 4;

/// Faces with an area at or below this are treated as degenerate.
pub const DEGENERATE_AREA_EPSILON: f64 = 1e-12;

/// A triangle mesh with per-face materials and per-corner texture coordinates.
///
/// UVs are stored per face corner rather than per vertex so that a vertex
/// on a UV seam can carry a different coordinate in each face around it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
    pub normals: Option<Vec<Vector3f>>,
    /// One entry per face, corners in the same order as `faces`
    pub uvs: Option<Vec<[Point2f; 3]>>,
    /// One entry per face
    pub materials: Vec<MaterialId>,
}

/// Area of the triangle spanned by three points, in double precision.
pub fn triangle_area(p0: &Point3f, p1: &Point3f, p2: &Point3f) -> f64 {
    triangle_normal(p0, p1, p2).norm() * 0.5
}

/// Unnormalized normal (twice the area vector) of a triangle.
pub fn triangle_normal(p0: &Point3f, p1: &Point3f, p2: &Point3f) -> Vector3d {
    let (p0, p1, p2) = (to_f64(p0), to_f64(p1), to_f64(p2));
    (p1 - p0).cross(&(p2 - p0))
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            normals: None,
            uvs: None,
            materials: Vec::new(),
        }
    }

    /// Create a mesh from vertices and faces, all faces using material 0
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        let materials = vec![0; faces.len()];
        Self {
            vertices,
            faces,
            normals: None,
            uvs: None,
            materials,
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Every face is a triangle, so this equals [`face_count`](Self::face_count).
    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Add a vertex to the mesh
    pub fn add_vertex(&mut self, vertex: Point3f) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    /// Add a face with the given material. Drops the UV channel, since the
    /// new face has no corner coordinates.
    pub fn add_face(&mut self, face: [usize; 3], material: MaterialId) {
        self.faces.push(face);
        self.materials.push(material);
        self.uvs = None;
    }

    /// Set vertex normals
    pub fn set_normals(&mut self, normals: Vec<Vector3f>) {
        if normals.len() == self.vertices.len() {
            self.normals = Some(normals);
        }
    }

    /// Set per-corner UVs
    pub fn set_uvs(&mut self, uvs: Vec<[Point2f; 3]>) {
        if uvs.len() == self.faces.len() {
            self.uvs = Some(uvs);
        }
    }

    /// Set per-face material ids
    pub fn set_materials(&mut self, materials: Vec<MaterialId>) {
        if materials.len() == self.faces.len() {
            self.materials = materials;
        }
    }

    /// Distinct material ids in ascending order
    pub fn material_ids(&self) -> Vec<MaterialId> {
        let mut ids = self.materials.clone();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Area-weighted vertex normals. Vertices without faces get +Z.
    pub fn compute_vertex_normals(&self) -> Vec<Vector3f> {
        let mut accum = vec![Vector3d::zeros(); self.vertices.len()];
        for face in &self.faces {
            let n = triangle_normal(
                &self.vertices[face[0]],
                &self.vertices[face[1]],
                &self.vertices[face[2]],
            );
            for &v in face {
                accum[v] += n;
            }
        }
        accum
            .into_iter()
            .map(|n| match n.try_normalize(f64::EPSILON) {
                Some(n) => Vector3f::new(n.x as f32, n.y as f32, n.z as f32),
                None => Vector3f::z(),
            })
            .collect()
    }

    /// Every undirected edge `(min, max)` with the number of faces using it.
    pub fn edges(&self) -> BTreeMap<(usize, usize), usize> {
        let mut edges = BTreeMap::new();
        for face in &self.faces {
            for i in 0..3 {
                let (a, b) = (face[i], face[(i + 1) % 3]);
                *edges.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
        edges
    }

    /// An edge used by exactly one face
    pub fn is_boundary_edge(&self, a: usize, b: usize) -> bool {
        let key = (a.min(b), a.max(b));
        self.faces
            .iter()
            .filter(|f| {
                (0..3).any(|i| {
                    let (x, y) = (f[i], f[(i + 1) % 3]);
                    (x.min(y), x.max(y)) == key
                })
            })
            .count()
            == 1
    }

    /// Every edge is shared by exactly two faces
    pub fn is_closed(&self) -> bool {
        !self.faces.is_empty() && self.edges().values().all(|&n| n == 2)
    }

    /// Every edge is shared by one or two faces
    pub fn is_manifold(&self) -> bool {
        self.edges().values().all(|&n| n == 1 || n == 2)
    }

    /// Check that the mesh is acceptable as simplification input.
    ///
    /// Rejects meshes with no faces, fewer than [`MIN_VERTEX_COUNT`]
    /// vertices, out-of-range or repeated indices, zero-area faces,
    /// non-finite positions, attribute channels of the wrong length and
    /// edges shared by more than two faces.
    pub fn validate(&self) -> Result<()> {
        if self.faces.is_empty() {
            return Err(Error::InvalidMesh("mesh has no faces".to_string()));
        }
        if self.vertices.len() < MIN_VERTEX_COUNT {
            return Err(Error::InvalidMesh(format!(
                "mesh has {} vertices, at least {} required",
                self.vertices.len(),
                MIN_VERTEX_COUNT
            )));
        }
        if let Some(i) = self
            .vertices
            .iter()
            .position(|p| !p.coords.iter().all(|c| c.is_finite()))
        {
            return Err(Error::InvalidMesh(format!("vertex {i} has a non-finite position")));
        }
        if self.materials.len() != self.faces.len() {
            return Err(Error::InvalidMesh(format!(
                "{} material ids for {} faces",
                self.materials.len(),
                self.faces.len()
            )));
        }
        if let Some(uvs) = &self.uvs {
            if uvs.len() != self.faces.len() {
                return Err(Error::InvalidMesh(format!(
                    "{} UV triples for {} faces",
                    uvs.len(),
                    self.faces.len()
                )));
            }
        }
        if let Some(normals) = &self.normals {
            if normals.len() != self.vertices.len() {
                return Err(Error::InvalidMesh(format!(
                    "{} normals for {} vertices",
                    normals.len(),
                    self.vertices.len()
                )));
            }
        }

        for (fi, face) in self.faces.iter().enumerate() {
            if let Some(&v) = face.iter().find(|&&v| v >= self.vertices.len()) {
                return Err(Error::InvalidMesh(format!(
                    "face {fi} references invalid vertex index {v}"
                )));
            }
            if face[0] == face[1] || face[1] == face[2] || face[2] == face[0] {
                return Err(Error::InvalidMesh(format!(
                    "face {fi} has duplicate vertex indices"
                )));
            }
            let area = triangle_area(
                &self.vertices[face[0]],
                &self.vertices[face[1]],
                &self.vertices[face[2]],
            );
            if area <= DEGENERATE_AREA_EPSILON {
                return Err(Error::InvalidMesh(format!("face {fi} has zero area")));
            }
        }

        if let Some(((a, b), n)) = self.edges().into_iter().find(|&(_, n)| n > 2) {
            return Err(Error::InvalidMesh(format!(
                "edge ({a}, {b}) is shared by {n} faces"
            )));
        }

        Ok(())
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}
