//! Mesh simplification by iterative edge collapse
//!
//! This crate reduces the polygon count of a [`TriangleMesh`] while keeping
//! its silhouette, sharp features, UV layout and material regions:
//! - [`quadric`]: per-vertex quadric error accumulation
//! - [`cost`]: collapse cost, placement strategies and seam penalties
//! - [`simplifier`]: the priority-driven collapse engine
//! - [`config`]: the configuration record shared with the LOD builder

pub mod config;
pub mod quadric;
pub mod cost;
pub mod simplifier;

pub use config::*;
pub use quadric::*;
pub use cost::*;
pub use simplifier::*;

use lowpoly_core::{Result, TriangleMesh};

/// Simplify a mesh by reducing the number of faces/vertices
pub trait MeshSimplifier {
    /// Simplify mesh keeping `ratio` of its vertices (1.0 = unchanged)
    fn simplify(&self, mesh: &TriangleMesh, ratio: f32) -> Result<TriangleMesh>;
}
