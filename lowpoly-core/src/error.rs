//! Error types for lowpoly

use thiserror::Error;

/// Main error type for lowpoly operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Degenerate or malformed input mesh, rejected before any processing.
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// Configuration rejected by eager validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),
}

/// Result type alias for lowpoly operations
pub type Result<T> = std::result::Result<T, Error>;

/// Reason a single edge collapse was refused.
///
/// Every check runs against the pre-collapse adjacency, so a rejected
/// collapse leaves the mesh untouched.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyError {
    #[error("({a}, {b}) is not an edge of the mesh")]
    NotAnEdge { a: usize, b: usize },

    #[error("collapsing ({a}, {b}) violates the link condition")]
    LinkCondition { a: usize, b: usize },

    #[error("collapsing ({a}, {b}) would join two boundary loops through an interior edge")]
    BoundaryPinch { a: usize, b: usize },

    #[error("edge ({a}, {b}) would be shared by {faces} faces")]
    NonManifoldEdge { a: usize, b: usize, faces: usize },

    #[error("face {face} would duplicate another face")]
    DuplicateFace { face: usize },

    #[error("face {face} would flip or degenerate")]
    FaceFlip { face: usize },
}
