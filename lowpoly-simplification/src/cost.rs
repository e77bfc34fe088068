//! Collapse cost model
//!
//! The cost of collapsing an edge is the merged quadric error at the chosen
//! position, plus two penalties: a fixed one for collapses that move a UV
//! or material seam, and a length-proportional one for collapses touching
//! a boundary or crease when sharp edges are preserved.

use crate::config::{DecimationConfig, Method};
use crate::quadric::{Quadric, QuadricTable};
use lowpoly_core::{to_f32, to_f64, EditableMesh, Point2f, Point3d, Point3f};

/// A prospective merge of `remove` into `keep`, ending at `position`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollapseCandidate {
    pub keep: usize,
    pub remove: usize,
    pub position: Point3f,
    pub cost: f64,
    /// The seam penalty was applied
    pub crosses_seam: bool,
}

impl Method {
    /// Pick the merged position for an edge whose quadric is `q`.
    ///
    /// Endpoints are tried in order `keep`, `other`, so ties favour `keep`.
    pub fn place(&self, q: &Quadric, keep: &Point3d, other: &Point3d) -> Point3d {
        match self {
            Method::EdgeCollapse => *keep,
            Method::QuadricErrorMetric => q.optimal_position().unwrap_or_else(|| {
                let mid = Point3d::from((keep.coords + other.coords) * 0.5);
                [*keep, *other, mid]
                    .into_iter()
                    .min_by(|x, y| q.evaluate(x).total_cmp(&q.evaluate(y)))
                    .unwrap_or(mid)
            }),
        }
    }
}

/// Evaluates [`CollapseCandidate`]s against the current mesh and quadrics.
#[derive(Debug, Clone)]
pub struct CostModel {
    method: Method,
    preserve_sharp_edges: bool,
    /// Cosine of the crease angle; face pairs below it form a crease
    crease_cos: f64,
    boundary_weight: f64,
    seam_penalty: f64,
}

impl CostModel {
    pub fn new(config: &DecimationConfig) -> Self {
        Self {
            method: config.method,
            preserve_sharp_edges: config.preserve_sharp_edges,
            crease_cos: config.feature_angle_degrees.to_radians().cos(),
            boundary_weight: config.boundary_weight,
            seam_penalty: config.attribute_seam_penalty,
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Cost and placement of collapsing edge `(a, b)`.
    pub fn evaluate(
        &self,
        mesh: &EditableMesh,
        quadrics: &QuadricTable,
        a: usize,
        b: usize,
    ) -> CollapseCandidate {
        let q = quadrics.edge(a, b);
        let pa = to_f64(&mesh.position(a));
        let pb = to_f64(&mesh.position(b));

        let seam_a = is_seam_vertex(mesh, a);
        let seam_b = is_seam_vertex(mesh, b);
        let feature_a = self.preserve_sharp_edges && self.is_feature_vertex(mesh, a);
        let feature_b = self.preserve_sharp_edges && self.is_feature_vertex(mesh, b);

        // An endpoint pinned by a seam or feature survives the collapse;
        // otherwise the endpoint with the lower merged error does.
        let a_first = match (seam_a || feature_a, seam_b || feature_b) {
            (true, false) => true,
            (false, true) => false,
            _ => q.evaluate(&pa) <= q.evaluate(&pb),
        };
        let (keep, remove, pk, pr) = if a_first {
            (a, b, pa, pb)
        } else {
            (b, a, pb, pa)
        };
        let (seam_keep, seam_remove) = if a_first {
            (seam_a, seam_b)
        } else {
            (seam_b, seam_a)
        };

        let position = to_f32(&self.method.place(&q, &pk, &pr));
        let mut cost = q.evaluate(&to_f64(&position)).max(0.0);

        // The seam changes shape only if a seam vertex is dragged off it
        // or moved away from where it sits.
        let seam_moves = seam_remove || (seam_keep && position != mesh.position(keep));
        let crosses_seam = seam_moves && !is_seam_edge(mesh, a, b);
        if crosses_seam {
            cost += self.seam_penalty;
        }
        if feature_a || feature_b {
            cost += self.boundary_weight * (pa - pb).norm();
        }

        CollapseCandidate {
            keep,
            remove,
            position,
            cost,
            crosses_seam,
        }
    }

    /// A boundary edge, or an interior edge whose faces meet at more than
    /// the crease angle.
    pub fn is_feature_edge(&self, mesh: &EditableMesh, a: usize, b: usize) -> bool {
        match mesh.edge_faces(a, b).as_slice() {
            [_] => true,
            [f, g] => match (mesh.face_normal(*f), mesh.face_normal(*g)) {
                (Some(n1), Some(n2)) => n1.dot(&n2) < self.crease_cos,
                _ => false,
            },
            _ => false,
        }
    }

    /// A vertex touching at least one feature edge
    pub fn is_feature_vertex(&self, mesh: &EditableMesh, v: usize) -> bool {
        mesh.adjacent_vertices(v)
            .into_iter()
            .any(|x| self.is_feature_edge(mesh, v, x))
    }
}

/// A vertex where materials meet or where its corners carry different UVs.
pub fn is_seam_vertex(mesh: &EditableMesh, v: usize) -> bool {
    let faces = mesh.adjacent_faces(v);
    let Some(&first) = faces.first() else {
        return false;
    };
    let material = mesh.material(first);
    if faces.iter().any(|&f| mesh.material(f) != material) {
        return true;
    }
    match mesh.corner_uv(first, v) {
        Some(uv) => faces.iter().any(|&f| mesh.corner_uv(f, v) != Some(uv)),
        None => false,
    }
}

/// An interior edge whose two faces differ in material or in the UVs along it.
pub fn is_seam_edge(mesh: &EditableMesh, a: usize, b: usize) -> bool {
    let faces = mesh.edge_faces(a, b);
    let [f, g] = faces.as_slice() else {
        return false;
    };
    if mesh.material(*f) != mesh.material(*g) {
        return true;
    }
    let uv_pair = |face: usize| -> Option<(Point2f, Point2f)> {
        Some((mesh.corner_uv(face, a)?, mesh.corner_uv(face, b)?))
    };
    uv_pair(*f) != uv_pair(*g)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lowpoly_core::TriangleMesh;

    /// `n` x `n` vertex grid in the XY plane.
    fn make_grid(n: usize) -> TriangleMesh {
        let mut vertices = Vec::new();
        for y in 0..n {
            for x in 0..n {
                vertices.push(Point3f::new(x as f32, y as f32, 0.0));
            }
        }
        let mut faces = Vec::new();
        for y in 0..n - 1 {
            for x in 0..n - 1 {
                let tl = y * n + x;
                let tr = tl + 1;
                let bl = tl + n;
                let br = bl + 1;
                faces.push([tl, tr, bl]);
                faces.push([tr, br, bl]);
            }
        }
        TriangleMesh::from_vertices_and_faces(vertices, faces)
    }

    fn setup(mesh: &TriangleMesh) -> (EditableMesh, QuadricTable) {
        let em = EditableMesh::from_mesh(mesh).unwrap();
        let table = QuadricTable::build(&em);
        (em, table)
    }

    #[test]
    fn test_flat_interior_edge_is_free() {
        let (em, table) = setup(&make_grid(4));
        let model = CostModel::new(&DecimationConfig::default());
        // 5 and 6 are interior vertices of a 4x4 grid
        let c = model.evaluate(&em, &table, 5, 6);
        assert!(c.cost.abs() < 1e-9);
        assert!(!c.crosses_seam);
    }

    #[test]
    fn test_boundary_penalty_scales_with_length() {
        let (em, table) = setup(&make_grid(4));
        let model = CostModel::new(&DecimationConfig::default());
        let c = model.evaluate(&em, &table, 0, 1);
        assert!((c.cost - 100.0).abs() < 1e-6);

        let relaxed = CostModel::new(&DecimationConfig::default().with_preserve_sharp_edges(false));
        let c = relaxed.evaluate(&em, &table, 0, 1);
        assert!(c.cost.abs() < 1e-9);
    }

    #[test]
    fn test_boundary_vertex_is_kept() {
        let (em, table) = setup(&make_grid(4));
        let model = CostModel::new(&DecimationConfig::default());
        // 1 is on the border, 5 is interior
        let c = model.evaluate(&em, &table, 5, 1);
        assert_eq!((c.keep, c.remove), (1, 5));
        assert_eq!(c.position, em.position(1));
    }

    #[test]
    fn test_material_seam_penalty() {
        let mut mesh = make_grid(4);
        // left column of cells material 0, the rest material 1
        let materials = mesh
            .faces
            .iter()
            .map(|f| if f.iter().all(|&v| v % 4 <= 1) { 0 } else { 1 })
            .collect();
        mesh.set_materials(materials);
        let (em, table) = setup(&mesh);
        let model = CostModel::new(
            &DecimationConfig::default()
                .with_preserve_sharp_edges(false)
                .with_attribute_seam_penalty(500.0),
        );

        assert!(is_seam_vertex(&em, 5));
        assert!(!is_seam_vertex(&em, 6));
        assert!(is_seam_edge(&em, 5, 9));

        // 6 folds onto 5, which stays put: every face left around 5 keeps
        // its material, so the seam is untouched
        let onto = model.evaluate(&em, &table, 5, 6);
        assert_eq!((onto.keep, onto.remove), (5, 6));
        assert_eq!(onto.position, em.position(5));
        assert!(!onto.crosses_seam);
        assert!(onto.cost < 1e-9);

        // along the seam
        let along = model.evaluate(&em, &table, 5, 9);
        assert!(!along.crosses_seam);
        assert!(along.cost < 1.0);
    }

    #[test]
    fn test_seam_vertex_dragged_off_seam_is_penalized() {
        let mut mesh = make_grid(4);
        // material 1 on the middle column of cells only, so 5 and 6 both
        // sit on a seam while the edge between them does not
        let materials = mesh
            .faces
            .iter()
            .map(|f| if f.iter().all(|&v| matches!(v % 4, 1 | 2)) { 1 } else { 0 })
            .collect();
        mesh.set_materials(materials);
        let (em, table) = setup(&mesh);
        let model = CostModel::new(
            &DecimationConfig::default()
                .with_preserve_sharp_edges(false)
                .with_attribute_seam_penalty(500.0),
        );

        assert!(is_seam_vertex(&em, 5));
        assert!(is_seam_vertex(&em, 6));
        assert!(!is_seam_edge(&em, 5, 6));

        let across = model.evaluate(&em, &table, 5, 6);
        assert!(across.crosses_seam);
        assert!(across.cost >= 500.0);
    }

    #[test]
    fn test_uv_seam_detection() {
        let mut mesh = make_grid(3);
        // split the UV layout between the lower and upper row of cells
        let uvs = mesh
            .faces
            .iter()
            .enumerate()
            .map(|(i, f)| {
                let offset = if i < 4 { 0.0 } else { 10.0 };
                f.map(|v| Point2f::new((v % 3) as f32 + offset, (v / 3) as f32))
            })
            .collect();
        mesh.set_uvs(uvs);
        let (em, _) = setup(&mesh);
        assert!(is_seam_vertex(&em, 4));
        assert!(is_seam_edge(&em, 3, 4));
        assert!(!is_seam_edge(&em, 1, 4));
        assert!(!is_seam_vertex(&em, 1));
    }

    #[test]
    fn test_crease_is_feature() {
        // two faces folded at a right angle along edge (0, 1)
        let mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.5, 1.0, 0.0),
                Point3f::new(0.5, 0.0, -1.0),
            ],
            vec![[0, 1, 2], [1, 0, 3]],
        );
        let (em, _) = setup(&mesh);
        let model = CostModel::new(&DecimationConfig::default());
        assert!(model.is_feature_edge(&em, 0, 1));

        let flat = CostModel::new(&DecimationConfig {
            feature_angle_degrees: 120.0,
            ..DecimationConfig::default()
        });
        assert!(!flat.is_feature_edge(&em, 0, 1));
        // still a boundary
        assert!(flat.is_feature_edge(&em, 1, 2));
    }

    #[test]
    fn test_quadric_placement_uses_optimum() {
        let q = Quadric::from_plane(&lowpoly_core::Vector3d::x(), -1.0)
            + Quadric::from_plane(&lowpoly_core::Vector3d::y(), -2.0)
            + Quadric::from_plane(&lowpoly_core::Vector3d::z(), -3.0);
        let keep = Point3d::origin();
        let other = Point3d::new(2.0, 2.0, 2.0);
        let p = Method::QuadricErrorMetric.place(&q, &keep, &other);
        assert!((p - Point3d::new(1.0, 2.0, 3.0)).norm() < 1e-9);
        assert_eq!(Method::EdgeCollapse.place(&q, &keep, &other), keep);
    }

    #[test]
    fn test_singular_placement_falls_back() {
        // one plane, z = 0: every point on it is optimal
        let q = Quadric::from_plane(&lowpoly_core::Vector3d::z(), 0.0);
        let keep = Point3d::new(0.0, 0.0, 1.0);
        let other = Point3d::new(1.0, 0.0, 0.0);
        // other lies on the plane, keep does not, the midpoint is halfway
        let p = Method::QuadricErrorMetric.place(&q, &keep, &other);
        assert_eq!(p, other);
    }
}
