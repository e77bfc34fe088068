//! LOD chain construction

use crate::transfer::{transfer_attributes, TransferOptions};
use lowpoly_core::{Result, Transform3D, Transformable, TriangleMesh};
use lowpoly_simplification::{DecimationConfig, Hierarchy, Simplifier, Termination, UnderTarget};
use rayon::prelude::*;

/// Counts recorded while building one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelStats {
    /// Vertices of the mesh this level was simplified from
    pub input_vertices: usize,
    pub input_triangles: usize,
    pub requested_vertices: usize,
    pub collapses: usize,
    pub rejected: usize,
    pub termination: Termination,
}

/// One level of a chain. Immutable once built.
#[derive(Debug, Clone)]
pub struct LodLevel {
    /// 0 is the finest level
    pub index: usize,
    /// Ratio applied to the previous level
    pub ratio: f32,
    /// Uniform scale already applied to `mesh`
    pub scale: f32,
    pub parent: Option<usize>,
    pub mesh: TriangleMesh,
    pub stats: LevelStats,
}

impl LodLevel {
    /// Host-facing name, `LOD1` for the first level
    pub fn name(&self) -> String {
        format!("LOD{}", self.index + 1)
    }

    pub fn vertex_count(&self) -> usize {
        self.mesh.vertex_count()
    }

    pub fn triangle_count(&self) -> usize {
        self.mesh.triangle_count()
    }

    pub fn under_target(&self) -> Option<UnderTarget> {
        let achieved = self.mesh.vertex_count();
        (achieved > self.stats.requested_vertices).then_some(UnderTarget {
            requested: self.stats.requested_vertices,
            achieved,
        })
    }
}

/// Ordered levels, finest first, with an explicit hierarchy.
#[derive(Debug, Clone)]
pub struct LodChain {
    levels: Vec<LodLevel>,
    hierarchy: Hierarchy,
}

impl LodChain {
    pub fn levels(&self) -> &[LodLevel] {
        &self.levels
    }

    pub fn level(&self, index: usize) -> Option<&LodLevel> {
        self.levels.get(index)
    }

    pub fn hierarchy(&self) -> Hierarchy {
        self.hierarchy
    }

    pub fn parent_of(&self, index: usize) -> Option<usize> {
        self.levels.get(index).and_then(|level| level.parent)
    }

    pub fn children_of(&self, index: usize) -> Vec<usize> {
        self.levels
            .iter()
            .filter(|level| level.parent == Some(index))
            .map(|level| level.index)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LodLevel> {
        self.levels.iter()
    }

    pub fn into_levels(self) -> Vec<LodLevel> {
        self.levels
    }
}

impl<'a> IntoIterator for &'a LodChain {
    type Item = &'a LodLevel;
    type IntoIter = std::slice::Iter<'a, LodLevel>;

    fn into_iter(self) -> Self::IntoIter {
        self.levels.iter()
    }
}

fn parent_index(hierarchy: Hierarchy, index: usize, len: usize) -> Option<usize> {
    match hierarchy {
        Hierarchy::FinerIsParent => index.checked_sub(1),
        Hierarchy::CoarserIsParent => (index + 1 < len).then_some(index + 1),
    }
}

/// Builds [`LodChain`]s from a validated configuration.
#[derive(Debug, Clone)]
pub struct LodChainBuilder {
    simplifier: Simplifier,
}

impl LodChainBuilder {
    pub fn new(config: DecimationConfig) -> Result<Self> {
        Ok(Self {
            simplifier: Simplifier::new(config)?,
        })
    }

    pub fn config(&self) -> &DecimationConfig {
        self.simplifier.config()
    }

    /// Build every level from `source`.
    ///
    /// Level k is simplified from level k - 1 before scaling, so scale
    /// factors do not compound and the source itself is never modified.
    pub fn build(&self, source: &TriangleMesh) -> Result<LodChain> {
        let config = self.simplifier.config();
        let options = TransferOptions::from(config);
        let scaling = Transform3D::uniform_scaling(config.level_scale);

        let mut levels: Vec<LodLevel> = Vec::with_capacity(config.levels);
        let mut previous = source.clone();
        for index in 0..config.levels {
            let ratio = config.ratio_for_level(index);
            let simplified = self.simplifier.run_with_ratio(&previous, ratio)?;
            let stats = LevelStats {
                input_vertices: simplified.source_vertices,
                input_triangles: simplified.source_faces,
                requested_vertices: simplified.requested_vertices,
                collapses: simplified.collapses,
                rejected: simplified.rejected,
                termination: simplified.termination,
            };
            let unscaled =
                transfer_attributes(&previous, simplified.mesh, &simplified.face_origin, options)?;

            let mut mesh = unscaled.clone();
            mesh.transform(&scaling);

            log::info!(
                "LOD{}: {} -> {} vertices, {} triangles ({:?})",
                index + 1,
                stats.input_vertices,
                mesh.vertex_count(),
                mesh.triangle_count(),
                stats.termination
            );
            levels.push(LodLevel {
                index,
                ratio,
                scale: config.level_scale,
                parent: parent_index(config.hierarchy, index, config.levels),
                mesh,
                stats,
            });
            previous = unscaled;
        }

        Ok(LodChain {
            levels,
            hierarchy: config.hierarchy,
        })
    }

    /// Build independent chains for several sources in parallel.
    pub fn build_many(&self, sources: &[TriangleMesh]) -> Result<Vec<LodChain>> {
        sources.par_iter().map(|mesh| self.build(mesh)).collect()
    }
}
