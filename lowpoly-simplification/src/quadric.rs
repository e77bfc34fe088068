//! Quadric error metrics
//!
//! A quadric is the symmetric 4x4 matrix `Q = sum(p * p^T)` over a set of
//! planes `p = (a, b, c, d)`. `v^T Q v` is the summed squared distance of
//! the homogeneous point `v` to those planes.

use lowpoly_core::{to_f64, EditableMesh, Point3d, Point3f, Vector3d};
use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Relative determinant below which the 3x3 block is treated as singular.
pub const SINGULAR_TOLERANCE: f64 = 1e-8;

/// Symmetric 4x4 error quadric stored as its 10 independent entries.
///
/// ```text
/// | a b c d |
/// | b e f g |
/// | c f h i |
/// | d g i j |
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Quadric {
    data: [f64; 10],
}

impl Quadric {
    pub fn zero() -> Self {
        Self { data: [0.0; 10] }
    }

    /// Fundamental quadric of the plane `n . x + d = 0`; `n` must be unit length.
    pub fn from_plane(n: &Vector3d, d: f64) -> Self {
        let (a, b, c) = (n.x, n.y, n.z);
        Self {
            data: [
                a * a,
                a * b,
                a * c,
                a * d,
                b * b,
                b * c,
                b * d,
                c * c,
                c * d,
                d * d,
            ],
        }
    }

    /// Quadric of a triangle's supporting plane, `None` for a degenerate triangle.
    pub fn from_triangle(p0: &Point3f, p1: &Point3f, p2: &Point3f) -> Option<Self> {
        let (p0, p1, p2) = (to_f64(p0), to_f64(p1), to_f64(p2));
        let n = (p1 - p0).cross(&(p2 - p0)).try_normalize(f64::EPSILON)?;
        let d = -n.dot(&p0.coords);
        Some(Self::from_plane(&n, d))
    }

    /// Evaluate `v^T Q v` for `v = (x, y, z, 1)`.
    pub fn evaluate(&self, p: &Point3d) -> f64 {
        let [a, b, c, d, e, f, g, h, i, j] = self.data;
        let (x, y, z) = (p.x, p.y, p.z);
        a * x * x
            + 2.0 * b * x * y
            + 2.0 * c * x * z
            + 2.0 * d * x
            + e * y * y
            + 2.0 * f * y * z
            + 2.0 * g * y
            + h * z * z
            + 2.0 * i * z
            + j
    }

    /// Position minimising the quadric.
    ///
    /// Solves the top-left 3x3 block against the negated last column. Returns
    /// `None` when that block is singular or too badly conditioned to trust.
    pub fn optimal_position(&self) -> Option<Point3d> {
        let [a, b, c, d, e, f, g, h, i, _] = self.data;
        let m = Matrix3::new(
            a, b, c,
            b, e, f,
            c, f, h,
        );
        let scale = m.norm();
        if scale <= f64::EPSILON || m.determinant().abs() <= SINGULAR_TOLERANCE * scale.powi(3) {
            return None;
        }
        let inv = m.try_inverse()?;
        let v = -(inv * Vector3::new(d, g, i));
        v.iter().all(|x| x.is_finite()).then(|| Point3d::from(v))
    }
}

impl Add for Quadric {
    type Output = Quadric;

    fn add(mut self, other: Quadric) -> Quadric {
        self += other;
        self
    }
}

impl AddAssign for Quadric {
    fn add_assign(&mut self, other: Quadric) {
        for (x, y) in self.data.iter_mut().zip(other.data) {
            *x += y;
        }
    }
}

impl Sum for Quadric {
    fn sum<I: Iterator<Item = Quadric>>(iter: I) -> Quadric {
        iter.fold(Quadric::zero(), Add::add)
    }
}

/// Per-vertex quadrics indexed by vertex id.
///
/// Kept outside the mesh so the mesh carries no algorithm state. The
/// table is built in parallel and then updated on the single reduce thread.
#[derive(Debug, Clone)]
pub struct QuadricTable {
    quadrics: Vec<Quadric>,
}

impl QuadricTable {
    /// Accumulate every live face's plane quadric into its three vertices.
    ///
    /// Face quadrics are computed in parallel, then each vertex gathers its
    /// incident faces in a fixed order so the result is deterministic.
    pub fn build(mesh: &EditableMesh) -> Self {
        let face_quadrics: Vec<Quadric> = (0..mesh.face_capacity())
            .into_par_iter()
            .map(|f| {
                if !mesh.is_face_alive(f) {
                    return Quadric::zero();
                }
                let [a, b, c] = mesh.face(f);
                Quadric::from_triangle(&mesh.position(a), &mesh.position(b), &mesh.position(c))
                    .unwrap_or_default()
            })
            .collect();

        let quadrics = (0..mesh.vertex_capacity())
            .into_par_iter()
            .map(|v| {
                mesh.adjacent_faces(v)
                    .iter()
                    .map(|&f| face_quadrics[f])
                    .sum::<Quadric>()
            })
            .collect();

        Self { quadrics }
    }

    pub fn get(&self, v: usize) -> &Quadric {
        &self.quadrics[v]
    }

    /// Merged quadric of an edge
    pub fn edge(&self, a: usize, b: usize) -> Quadric {
        self.quadrics[a] + self.quadrics[b]
    }

    /// Fold `removed` into `keep` after a collapse.
    pub fn merge(&mut self, keep: usize, removed: usize) {
        let q = std::mem::take(&mut self.quadrics[removed]);
        self.quadrics[keep] += q;
    }

    pub fn len(&self) -> usize {
        self.quadrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quadrics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use lowpoly_core::TriangleMesh;

    fn make_tetrahedron() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.5, 1.0, 0.0),
                Point3f::new(0.5, 0.5, 1.0),
            ],
            vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        )
    }

    #[test]
    fn test_plane_quadric_measures_squared_distance() {
        let q = Quadric::from_plane(&Vector3d::new(0.0, 0.0, 1.0), -2.0);
        assert_relative_eq!(q.evaluate(&Point3d::new(5.0, -3.0, 2.0)), 0.0);
        assert_relative_eq!(q.evaluate(&Point3d::new(0.0, 0.0, 5.0)), 9.0);
    }

    #[test]
    fn test_triangle_quadric_measures_plane_distance() {
        let (p0, p1, p2) = (
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.2, 0.0),
            Point3f::new(0.3, 1.0, 0.5),
        );
        let q = Quadric::from_triangle(&p0, &p1, &p2).unwrap();
        let n = (to_f64(&p1) - to_f64(&p0))
            .cross(&(to_f64(&p2) - to_f64(&p0)))
            .normalize();
        let p = Point3d::new(0.7, -1.2, 2.5);
        let distance = n.dot(&(p - to_f64(&p0)));
        assert_relative_eq!(q.evaluate(&p), distance * distance, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_triangle_has_no_quadric() {
        let p = Point3f::new(1.0, 1.0, 1.0);
        assert!(Quadric::from_triangle(&p, &p, &Point3f::origin()).is_none());
    }

    #[test]
    fn test_three_planes_meet_in_a_point() {
        let q = Quadric::from_plane(&Vector3d::x(), -1.0)
            + Quadric::from_plane(&Vector3d::y(), -2.0)
            + Quadric::from_plane(&Vector3d::z(), -3.0);
        let p = q.optimal_position().unwrap();
        assert_relative_eq!(p, Point3d::new(1.0, 2.0, 3.0), epsilon = 1e-9);
        assert_relative_eq!(q.evaluate(&p), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_planar_quadric_is_singular() {
        let q = Quadric::from_plane(&Vector3d::z(), 0.0) + Quadric::from_plane(&Vector3d::z(), 0.0);
        assert!(q.optimal_position().is_none());
        assert!(Quadric::zero().optimal_position().is_none());
    }

    #[test]
    fn test_table_accumulates_incident_planes() {
        let em = EditableMesh::from_mesh(&make_tetrahedron()).unwrap();
        let table = QuadricTable::build(&em);
        assert_eq!(table.len(), 4);
        // every vertex lies on the planes of its own faces
        for v in 0..4 {
            let p = to_f64(&em.position(v));
            assert_relative_eq!(table.get(v).evaluate(&p), 0.0, epsilon = 1e-9);
        }
        // the apex is off the base plane z = 0 which vertex 0 carries
        let apex = to_f64(&em.position(3));
        assert!(table.get(0).evaluate(&apex) > 0.5);
    }

    #[test]
    fn test_merge_moves_quadric() {
        let em = EditableMesh::from_mesh(&make_tetrahedron()).unwrap();
        let mut table = QuadricTable::build(&em);
        let expected = table.edge(0, 1);
        table.merge(0, 1);
        assert_eq!(*table.get(0), expected);
        assert_eq!(*table.get(1), Quadric::zero());
    }
}
