//! Core data structures for lowpoly
//!
//! This crate provides the mesh types the simplification engine works on:
//! the plain [`TriangleMesh`] value exchanged with hosts, the
//! [`EditableMesh`] store that supports adjacency queries and validated
//! edge collapses, and the error types shared by every lowpoly crate.

pub mod point;
pub mod mesh;
pub mod builder;
pub mod editable;
pub mod traits;
pub mod transform;
pub mod error;

pub use point::*;
pub use mesh::*;
pub use builder::*;
pub use editable::*;
pub use traits::*;
pub use transform::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix3, Matrix4, Point2, Point3, Vector3, Vector4};
