//! # lowpoly
//!
//! Mesh simplification and level-of-detail chain generation for Rust.
//!
//! This is the umbrella crate that re-exports the individual lowpoly crates.
//! Depend on the individual crates for more granular control over
//! dependencies.
//!
//! ## Features
//!
//! - **Core**: mesh types, validation and the editable collapse store
//! - **Simplification**: quadric error edge-collapse decimation
//! - **LOD**: multi-level chains with per-level scale and hierarchy
//!
//! ## Quick Start
//!
//! ```rust
//! use lowpoly::prelude::*;
//!
//! let mut builder = MeshBuilder::new();
//! let v: Vec<usize> = [
//!     (0.0, 0.0, 0.0),
//!     (1.0, 0.0, 0.0),
//!     (1.0, 1.0, 0.0),
//!     (0.0, 1.0, 0.0),
//!     (0.5, 0.5, 1.0),
//! ]
//! .into_iter()
//! .map(|(x, y, z)| builder.add_vertex(Point3f::new(x, y, z)))
//! .collect();
//! builder.add_polygon(&[v[0], v[3], v[2], v[1]], 0).unwrap();
//! for i in 0..4 {
//!     builder.add_polygon(&[v[i], v[(i + 1) % 4], v[4]], 1).unwrap();
//! }
//! let mesh = builder.build().unwrap();
//!
//! let chain = LodChainBuilder::new(DecimationConfig::new().with_levels(1))
//!     .unwrap()
//!     .build(&mesh)
//!     .unwrap();
//! assert_eq!(chain.len(), 1);
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: enables `simplification` and `lod`
//! - `simplification`: the edge-collapse simplifier
//! - `lod`: LOD chain builder (implies `simplification`)

// Re-export core functionality
pub use lowpoly_core::*;

// Re-export sub-crates
#[cfg(feature = "simplification")]
pub use lowpoly_simplification as simplification;

#[cfg(feature = "lod")]
pub use lowpoly_lod as lod;

/// Convenient imports for common use cases
pub mod prelude {
    pub use lowpoly_core::*;

    #[cfg(feature = "simplification")]
    pub use lowpoly_simplification::{
        DecimationConfig, Hierarchy, MeshSimplifier, Method, Simplified, Simplifier,
        Termination, UnderTarget,
    };

    #[cfg(feature = "lod")]
    pub use lowpoly_lod::{LodChain, LodChainBuilder, LodLevel};
}
