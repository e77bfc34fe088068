//! Priority-driven edge collapse
//!
//! The engine keeps an externally owned quadric table next to an
//! [`EditableMesh`] and repeatedly collapses the cheapest edge until the
//! vertex budget is met or nothing more can be collapsed safely.
//!
//! Candidates are invalidated lazily: every vertex carries a stamp that is
//! bumped whenever its neighborhood changes, and a popped candidate whose
//! endpoint stamps no longer match is re-costed and pushed back instead of
//! being applied.

use crate::config::DecimationConfig;
use crate::cost::{CollapseCandidate, CostModel};
use crate::quadric::QuadricTable;
use crate::MeshSimplifier;
use lowpoly_core::{EditableMesh, Result, TriangleMesh, MIN_VERTEX_COUNT};
use priority_queue::PriorityQueue;
use rayon::prelude::*;
use std::cmp::Ordering;

/// Unordered edge stored as `(min, max)`
type EdgeKey = (usize, usize);

fn edge_key(a: usize, b: usize) -> EdgeKey {
    (a.min(b), a.max(b))
}

/// Why a simplification run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Ratio of 1: the input was returned untouched
    NoOp,
    /// The vertex budget was met
    ReachedTarget,
    /// Every remaining collapse would break the mesh
    Locked,
    /// The cheapest remaining collapse exceeded `max_error`
    ErrorThreshold,
}

/// Non-fatal annotation for a run that stopped above its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnderTarget {
    pub requested: usize,
    pub achieved: usize,
}

/// Result of a simplification run.
#[derive(Debug, Clone)]
pub struct Simplified {
    pub mesh: TriangleMesh,
    /// For each output face, the input face it descends from
    pub face_origin: Vec<usize>,
    pub source_vertices: usize,
    pub source_faces: usize,
    pub requested_vertices: usize,
    pub collapses: usize,
    /// Collapses refused by the topology checks
    pub rejected: usize,
    pub termination: Termination,
}

impl Simplified {
    pub fn vertex_count(&self) -> usize {
        self.mesh.vertex_count()
    }

    pub fn triangle_count(&self) -> usize {
        self.mesh.triangle_count()
    }

    /// Set when the run ended with more vertices than requested.
    pub fn under_target(&self) -> Option<UnderTarget> {
        let achieved = self.mesh.vertex_count();
        (achieved > self.requested_vertices).then_some(UnderTarget {
            requested: self.requested_vertices,
            achieved,
        })
    }
}

/// Queue entry. Orders so that the cheapest edge pops first and equal
/// costs resolve by edge key, keeping runs reproducible.
#[derive(Debug, Clone, Copy)]
struct Queued {
    candidate: CollapseCandidate,
    key: EdgeKey,
    /// Endpoint stamps at evaluation time, in key order
    stamps: (u32, u32),
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap, so reverse both keys
        other
            .candidate
            .cost
            .total_cmp(&self.candidate.cost)
            .then_with(|| other.key.cmp(&self.key))
    }
}

/// Mutable state of one run.
struct Reduction<'a> {
    mesh: EditableMesh,
    quadrics: QuadricTable,
    model: &'a CostModel,
    queue: PriorityQueue<EdgeKey, Queued>,
    stamps: Vec<u32>,
}

impl Reduction<'_> {
    fn entry(&self, key: EdgeKey, candidate: CollapseCandidate) -> Queued {
        Queued {
            candidate,
            key,
            stamps: (self.stamps[key.0], self.stamps[key.1]),
        }
    }

    fn push(&mut self, key: EdgeKey) {
        let candidate = self.model.evaluate(&self.mesh, &self.quadrics, key.0, key.1);
        let entry = self.entry(key, candidate);
        self.queue.push(key, entry);
    }

    fn is_current(&self, entry: &Queued) -> bool {
        entry.stamps == (self.stamps[entry.key.0], self.stamps[entry.key.1])
    }

    /// Re-cost the neighborhood of `keep` after a collapse into it.
    ///
    /// Edges at `keep` are refreshed right away. Edges elsewhere in the
    /// ring become stale through their stamps, and ring edges missing from
    /// the queue because an earlier attempt was refused get another chance.
    fn refresh_around(&mut self, keep: usize) {
        let ring = self.mesh.adjacent_vertices(keep);
        self.stamps[keep] += 1;
        for &x in &ring {
            self.stamps[x] += 1;
        }
        for &x in &ring {
            self.push(edge_key(keep, x));
        }
        for &x in &ring {
            for y in self.mesh.adjacent_vertices(x) {
                let key = edge_key(x, y);
                if y != keep && self.queue.get(&key).is_none() {
                    self.push(key);
                }
            }
        }
    }
}

/// Iterative edge-collapse simplifier.
///
/// # Example
///
/// ```
/// use lowpoly_core::{Point3f, TriangleMesh};
/// use lowpoly_simplification::{DecimationConfig, Simplifier};
///
/// let mesh = TriangleMesh::from_vertices_and_faces(
///     vec![
///         Point3f::new(-1.0, -1.0, -1.0),
///         Point3f::new(1.0, -1.0, -1.0),
///         Point3f::new(1.0, 1.0, -1.0),
///         Point3f::new(-1.0, 1.0, -1.0),
///         Point3f::new(-1.0, -1.0, 1.0),
///         Point3f::new(1.0, -1.0, 1.0),
///         Point3f::new(1.0, 1.0, 1.0),
///         Point3f::new(-1.0, 1.0, 1.0),
///     ],
///     vec![
///         [0, 2, 1], [0, 3, 2], [4, 5, 6], [4, 6, 7],
///         [0, 1, 5], [0, 5, 4], [1, 2, 6], [1, 6, 5],
///         [2, 3, 7], [2, 7, 6], [3, 0, 4], [3, 4, 7],
///     ],
/// );
/// let simplifier = Simplifier::new(DecimationConfig::default()).unwrap();
/// let result = simplifier.run(&mesh).unwrap();
/// assert!(result.vertex_count() < 8);
/// ```
#[derive(Debug, Clone)]
pub struct Simplifier {
    config: DecimationConfig,
    model: CostModel,
}

impl Simplifier {
    /// Validates `config` before accepting it.
    pub fn new(config: DecimationConfig) -> Result<Self> {
        config.validate()?;
        let model = CostModel::new(&config);
        Ok(Self { config, model })
    }

    pub fn config(&self) -> &DecimationConfig {
        &self.config
    }

    /// `round(vertex_count * ratio)`, never below the smallest valid mesh.
    pub fn target_vertex_count(vertex_count: usize, ratio: f32) -> usize {
        let target = (vertex_count as f64 * ratio as f64).round() as usize;
        target.max(MIN_VERTEX_COUNT)
    }

    /// Simplify with the configured ratio.
    pub fn run(&self, mesh: &TriangleMesh) -> Result<Simplified> {
        self.reduce(mesh, self.config.ratio)
    }

    /// Simplify with an explicit ratio in (0, 1].
    pub fn run_with_ratio(&self, mesh: &TriangleMesh, ratio: f32) -> Result<Simplified> {
        self.config.clone().with_ratio(ratio).validate()?;
        self.reduce(mesh, ratio)
    }

    fn reduce(&self, mesh: &TriangleMesh, ratio: f32) -> Result<Simplified> {
        let editable = EditableMesh::from_mesh(mesh)?.with_min_normal_dot(self.config.min_normal_dot);
        let source_vertices = mesh.vertex_count();
        let source_faces = mesh.face_count();

        if ratio >= 1.0 {
            log::debug!("ratio {ratio} leaves the mesh untouched");
            return Ok(Simplified {
                mesh: mesh.clone(),
                face_origin: (0..source_faces).collect(),
                source_vertices,
                source_faces,
                requested_vertices: source_vertices,
                collapses: 0,
                rejected: 0,
                termination: Termination::NoOp,
            });
        }

        let target = Self::target_vertex_count(source_vertices, ratio);
        log::debug!(
            "simplifying {} vertices / {} faces to {} vertices ({:?})",
            source_vertices,
            source_faces,
            target,
            self.config.method
        );

        let quadrics = QuadricTable::build(&editable);
        let edges = editable.edges();
        let initial: Vec<CollapseCandidate> = edges
            .par_iter()
            .map(|&(a, b)| self.model.evaluate(&editable, &quadrics, a, b))
            .collect();

        let mut state = Reduction {
            stamps: vec![0; editable.vertex_capacity()],
            mesh: editable,
            quadrics,
            model: &self.model,
            queue: PriorityQueue::with_capacity(edges.len()),
        };
        for (key, candidate) in edges.into_iter().zip(initial) {
            let entry = state.entry(key, candidate);
            state.queue.push(key, entry);
        }
        log::debug!("{} collapse candidates queued", state.queue.len());

        let mut collapses = 0;
        let mut rejected = 0;
        let mut termination = Termination::ReachedTarget;

        while state.mesh.vertex_count() > target {
            let Some((key, entry)) = state.queue.pop() else {
                termination = Termination::Locked;
                break;
            };
            let (a, b) = key;
            if !state.mesh.is_vertex_alive(a)
                || !state.mesh.is_vertex_alive(b)
                || state.mesh.edge_faces(a, b).is_empty()
            {
                continue;
            }
            if !state.is_current(&entry) {
                state.push(key);
                continue;
            }

            let candidate = entry.candidate;
            if let Some(max_error) = self.config.max_error {
                if candidate.cost > max_error {
                    termination = Termination::ErrorThreshold;
                    break;
                }
            }

            match state
                .mesh
                .collapse_edge(candidate.keep, candidate.remove, candidate.position)
            {
                Ok(_) => {
                    collapses += 1;
                    state.quadrics.merge(candidate.keep, candidate.remove);
                    state.refresh_around(candidate.keep);
                }
                Err(err) => {
                    rejected += 1;
                    log::trace!("collapse of ({a}, {b}) refused: {err}");
                }
            }
        }

        let compact = state.mesh.to_mesh();
        let mut out = compact.mesh;
        if self.config.smoothing {
            let normals = out.compute_vertex_normals();
            out.set_normals(normals);
        }

        log::debug!(
            "simplified to {} vertices / {} faces after {} collapses, {} refused ({:?})",
            out.vertex_count(),
            out.face_count(),
            collapses,
            rejected,
            termination
        );

        Ok(Simplified {
            mesh: out,
            face_origin: compact.face_origin,
            source_vertices,
            source_faces,
            requested_vertices: target,
            collapses,
            rejected,
            termination,
        })
    }
}

impl MeshSimplifier for Simplifier {
    fn simplify(&self, mesh: &TriangleMesh, ratio: f32) -> Result<TriangleMesh> {
        Ok(self.run_with_ratio(mesh, ratio)?.mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Method;
    use lowpoly_core::{Error, Point3f};

    fn make_cube() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
                Point3f::new(0.0, 0.0, 1.0),
                Point3f::new(1.0, 0.0, 1.0),
                Point3f::new(1.0, 1.0, 1.0),
                Point3f::new(0.0, 1.0, 1.0),
            ],
            vec![
                [0, 2, 1],
                [0, 3, 2],
                [4, 5, 6],
                [4, 6, 7],
                [0, 1, 5],
                [0, 5, 4],
                [1, 2, 6],
                [1, 6, 5],
                [2, 3, 7],
                [2, 7, 6],
                [3, 0, 4],
                [3, 4, 7],
            ],
        )
    }

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

    fn make_curved_surface(size: usize) -> TriangleMesh {
        let mut vertices = Vec::new();
        for y in 0..size {
            for x in 0..size {
                let fx = x as f32 / (size - 1) as f32 * std::f32::consts::PI;
                let fy = y as f32 / (size - 1) as f32 * std::f32::consts::PI;
                vertices.push(Point3f::new(x as f32, y as f32, fx.sin() * fy.sin() * 2.0));
            }
        }
        let mut faces = Vec::new();
        for y in 0..size - 1 {
            for x in 0..size - 1 {
                let tl = y * size + x;
                let tr = tl + 1;
                let bl = tl + size;
                let br = bl + 1;
                faces.push([tl, tr, bl]);
                faces.push([tr, br, bl]);
            }
        }
        TriangleMesh::from_vertices_and_faces(vertices, faces)
    }

    #[test]
    fn test_target_vertex_count() {
        assert_eq!(Simplifier::target_vertex_count(8, 0.5), 4);
        assert_eq!(Simplifier::target_vertex_count(100, 0.25), 25);
        assert_eq!(Simplifier::target_vertex_count(11, 0.5), 6);
        // never below the smallest valid mesh
        assert_eq!(Simplifier::target_vertex_count(10, 0.1), 4);
    }

    #[test]
    fn test_invalid_config_rejected_eagerly() {
        let err = Simplifier::new(DecimationConfig::new().with_ratio(1.5)).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let simplifier = Simplifier::new(DecimationConfig::default()).unwrap();
        let err = simplifier.run_with_ratio(&make_cube(), 0.0).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_empty_mesh_rejected() {
        let simplifier = Simplifier::new(DecimationConfig::default()).unwrap();
        let err = simplifier.run(&TriangleMesh::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidMesh(_)));
    }

    #[test]
    fn test_ratio_one_is_noop() {
        let simplifier = Simplifier::new(DecimationConfig::new().with_ratio(1.0)).unwrap();
        let mesh = make_cube();
        let result = simplifier.run(&mesh).unwrap();
        assert_eq!(result.termination, Termination::NoOp);
        assert_eq!(result.mesh, mesh);
        assert_eq!(result.face_origin, (0..12).collect::<Vec<_>>());
        assert!(result.under_target().is_none());
    }

    #[test]
    fn test_cube_halves() {
        let simplifier = Simplifier::new(DecimationConfig::default()).unwrap();
        let result = simplifier.run(&make_cube()).unwrap();
        assert_eq!(result.requested_vertices, 4);
        assert!(result.vertex_count() < 8);
        assert!(result.triangle_count() <= 6);
        assert!(result.mesh.is_closed());
        assert!(result.mesh.validate().is_ok());
    }

    #[test]
    fn test_tetrahedron_at_floor() {
        // already at the floor: nothing to do, nothing refused
        let simplifier = Simplifier::new(DecimationConfig::default()).unwrap();
        let result = simplifier.run(&make_tetrahedron()).unwrap();
        assert_eq!(result.vertex_count(), 4);
        assert_eq!(result.collapses, 0);
        assert_eq!(result.termination, Termination::ReachedTarget);
    }

    #[test]
    fn test_locked_reports_under_target() {
        // two separate tetrahedra: every collapse would fold one of them flat
        let mut mesh = make_tetrahedron();
        let second = make_tetrahedron();
        mesh.vertices
            .extend(second.vertices.iter().map(|p| Point3f::new(p.x + 3.0, p.y, p.z)));
        for face in &second.faces {
            mesh.add_face(face.map(|v| v + 4), 0);
        }

        let simplifier = Simplifier::new(DecimationConfig::default()).unwrap();
        let result = simplifier.run(&mesh).unwrap();
        assert_eq!(result.termination, Termination::Locked);
        assert_eq!(result.collapses, 0);
        assert!(result.rejected > 0);
        assert_eq!(
            result.under_target(),
            Some(UnderTarget {
                requested: 4,
                achieved: 8
            })
        );
        assert_eq!(result.mesh, mesh);
    }

    #[test]
    fn test_reduces_curved_surface() {
        for method in [Method::EdgeCollapse, Method::QuadricErrorMetric] {
            let config = DecimationConfig::new().with_method(method).with_ratio(0.5);
            let simplifier = Simplifier::new(config).unwrap();
            let mesh = make_curved_surface(10);
            let result = simplifier.run(&mesh).unwrap();
            assert!(result.vertex_count() < mesh.vertex_count());
            assert!(result.vertex_count() >= result.requested_vertices);
            assert!(result.mesh.is_manifold());
            assert!(result.mesh.validate().is_ok());
            assert_eq!(result.face_origin.len(), result.triangle_count());
            assert_eq!(result.collapses, mesh.vertex_count() - result.vertex_count());
        }
    }

    #[test]
    fn test_deterministic() {
        let simplifier = Simplifier::new(DecimationConfig::new().with_ratio(0.3)).unwrap();
        let mesh = make_curved_surface(12);
        let first = simplifier.run(&mesh).unwrap();
        let second = simplifier.run(&mesh).unwrap();
        assert_eq!(first.mesh, second.mesh);
        assert_eq!(first.face_origin, second.face_origin);
    }

    #[test]
    fn test_max_error_stops_early() {
        let config = DecimationConfig::new()
            .with_ratio(0.1)
            .with_preserve_sharp_edges(false)
            .with_max_error(0.0);
        let simplifier = Simplifier::new(config).unwrap();
        let mesh = make_curved_surface(10);
        let result = simplifier.run(&mesh).unwrap();
        assert_eq!(result.termination, Termination::ErrorThreshold);
        let under = result.under_target().unwrap();
        assert_eq!(under.requested, result.requested_vertices);
        assert!(under.achieved > under.requested);
    }

    #[test]
    fn test_smoothing_recomputes_normals() {
        let simplifier =
            Simplifier::new(DecimationConfig::new().with_smoothing(true)).unwrap();
        let result = simplifier.run(&make_curved_surface(8)).unwrap();
        let normals = result.mesh.normals.as_ref().unwrap();
        assert_eq!(normals.len(), result.vertex_count());
        assert!(normals.iter().all(|n| (n.norm() - 1.0).abs() < 1e-4));
    }

    #[test]
    fn test_mesh_simplifier_trait() {
        let simplifier = Simplifier::new(DecimationConfig::default()).unwrap();
        let mesh = make_curved_surface(8);
        let out = simplifier.simplify(&mesh, 0.5).unwrap();
        assert!(out.vertex_count() < mesh.vertex_count());
        assert!(simplifier.simplify(&mesh, 1.5).is_err());
    }

    #[test]
    fn test_queue_order() {
        let candidate = |cost| CollapseCandidate {
            keep: 0,
            remove: 1,
            position: Point3f::origin(),
            cost,
            crosses_seam: false,
        };
        let cheap = Queued {
            candidate: candidate(1.0),
            key: (5, 6),
            stamps: (0, 0),
        };
        let dear = Queued {
            candidate: candidate(2.0),
            key: (0, 1),
            stamps: (0, 0),
        };
        let tie = Queued {
            candidate: candidate(1.0),
            key: (0, 1),
            stamps: (0, 0),
        };
        assert!(cheap > dear);
        assert!(tie > cheap);
    }
}
