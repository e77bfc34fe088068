//! Level-of-detail chains for lowpoly
//!
//! A chain is built by simplifying a source mesh once per level, each level
//! starting from the previous level's result, so the reductions compound.
//! Every level owns its mesh, carries its materials and UVs over from the
//! level before it and is uniformly scaled by the configured factor.
//!
//! ```
//! use lowpoly_core::{Point3f, TriangleMesh};
//! use lowpoly_lod::LodChainBuilder;
//! use lowpoly_simplification::DecimationConfig;
//!
//! let mut vertices = Vec::new();
//! for y in 0..6 {
//!     for x in 0..6 {
//!         vertices.push(Point3f::new(x as f32, y as f32, 0.0));
//!     }
//! }
//! let mut faces = Vec::new();
//! for y in 0..5 {
//!     for x in 0..5 {
//!         let tl = y * 6 + x;
//!         faces.push([tl, tl + 1, tl + 6]);
//!         faces.push([tl + 1, tl + 7, tl + 6]);
//!     }
//! }
//! let mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
//!
//! let config = DecimationConfig::new().with_levels(2).with_ratio(0.5);
//! let chain = LodChainBuilder::new(config).unwrap().build(&mesh).unwrap();
//! assert_eq!(chain.len(), 2);
//! assert_eq!(chain.parent_of(1), Some(0));
//! ```

pub mod chain;
pub mod transfer;

pub use chain::*;
pub use transfer::*;
