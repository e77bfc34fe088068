//! Polygon mesh construction
//!
//! Hosts hand over faces as polygons of three or more corners. The builder
//! fan-triangulates them, carrying the polygon's material id and corner UVs
//! onto every triangle it produces.

use crate::error::{Error, Result};
use crate::mesh::TriangleMesh;
use crate::point::*;

/// Incremental builder for [`TriangleMesh`].
///
/// # Example
///
/// ```
/// use lowpoly_core::{MeshBuilder, Point3f};
///
/// let mut builder = MeshBuilder::new();
/// let a = builder.add_vertex(Point3f::new(0.0, 0.0, 0.0));
/// let b = builder.add_vertex(Point3f::new(1.0, 0.0, 0.0));
/// let c = builder.add_vertex(Point3f::new(1.0, 1.0, 0.0));
/// let d = builder.add_vertex(Point3f::new(0.0, 1.0, 0.0));
/// builder.add_polygon(&[a, b, c, d], 0).unwrap();
/// let mesh = builder.build().unwrap();
/// assert_eq!(mesh.face_count(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MeshBuilder {
    vertices: Vec<Point3f>,
    normals: Vec<Vector3f>,
    faces: Vec<[usize; 3]>,
    uvs: Vec<[Point2f; 3]>,
    materials: Vec<MaterialId>,
    faces_without_uvs: usize,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, position: Point3f) -> usize {
        self.vertices.push(position);
        self.vertices.len() - 1
    }

    /// Add a vertex with a normal. Normals are only kept when every vertex has one.
    pub fn add_vertex_with_normal(&mut self, position: Point3f, normal: Vector3f) -> usize {
        self.normals.push(normal);
        self.add_vertex(position)
    }

    /// Add a polygon without texture coordinates.
    pub fn add_polygon(&mut self, corners: &[usize], material: MaterialId) -> Result<&mut Self> {
        self.check_polygon(corners)?;
        for i in 1..corners.len() - 1 {
            self.faces.push([corners[0], corners[i], corners[i + 1]]);
            self.materials.push(material);
            self.faces_without_uvs += 1;
        }
        Ok(self)
    }

    /// Add a polygon with one UV per corner.
    pub fn add_polygon_with_uvs(
        &mut self,
        corners: &[usize],
        uvs: &[Point2f],
        material: MaterialId,
    ) -> Result<&mut Self> {
        self.check_polygon(corners)?;
        if uvs.len() != corners.len() {
            return Err(Error::InvalidMesh(format!(
                "polygon has {} corners but {} UVs",
                corners.len(),
                uvs.len()
            )));
        }
        for i in 1..corners.len() - 1 {
            self.faces.push([corners[0], corners[i], corners[i + 1]]);
            self.uvs.push([uvs[0], uvs[i], uvs[i + 1]]);
            self.materials.push(material);
        }
        Ok(self)
    }

    fn check_polygon(&self, corners: &[usize]) -> Result<()> {
        if corners.len() < 3 {
            return Err(Error::InvalidMesh(format!(
                "polygon needs at least 3 corners, got {}",
                corners.len()
            )));
        }
        if let Some(&v) = corners.iter().find(|&&v| v >= self.vertices.len()) {
            return Err(Error::InvalidMesh(format!(
                "polygon references invalid vertex index {v}"
            )));
        }
        Ok(())
    }

    /// Finish the mesh and validate it.
    pub fn build(self) -> Result<TriangleMesh> {
        if !self.uvs.is_empty() && self.faces_without_uvs > 0 {
            return Err(Error::InvalidMesh(format!(
                "{} faces have UVs but {} do not",
                self.uvs.len(),
                self.faces_without_uvs
            )));
        }
        let normals = (!self.normals.is_empty() && self.normals.len() == self.vertices.len())
            .then_some(self.normals);
        let uvs = (!self.uvs.is_empty()).then_some(self.uvs);

        let mesh = TriangleMesh {
            vertices: self.vertices,
            faces: self.faces,
            normals,
            uvs,
            materials: self.materials,
        };
        mesh.validate()?;
        Ok(mesh)
    }
}
