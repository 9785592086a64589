//! Error types for tvmesh.
//!
//! This module defines all error types used throughout the library.
//!
//! Rejected edge flips are not errors: they are reported as
//! [`ArcStatus`](crate::algo::tv::flip::ArcStatus) values.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`TvError`].
pub type Result<T> = std::result::Result<T, TvError>;

/// Errors that can occur while building or processing a TV triangulation.
#[derive(Error, Debug)]
pub enum TvError {
    /// The mesh has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A face references an invalid vertex index.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face has duplicate vertex indices (degenerate triangle).
    #[error("face {face} is degenerate (has duplicate vertices)")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// A directed edge is used by more than one face.
    #[error("edge ({v0}, {v1}) has more than two incident faces")]
    NonManifoldEdge {
        /// First vertex of the edge.
        v0: usize,
        /// Second vertex of the edge.
        v1: usize,
    },

    /// A buffer does not hold one entry per element.
    #[error("expected {expected} {what}, got {actual}")]
    SizeMismatch {
        /// What was counted.
        what: &'static str,
        /// Required count.
        expected: usize,
        /// Count found.
        actual: usize,
    },

    /// The mesh is too large for its index type.
    #[error("{elements} elements exceed the index capacity {capacity}")]
    IndexOverflow {
        /// Number of elements required.
        elements: usize,
        /// Largest addressable arena length.
        capacity: usize,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading an image from file.
    #[error("failed to load image from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Error saving an image or mesh to file.
    #[error("failed to save to {path}: {message}")]
    SaveError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },

    /// Invalid state for the requested operation.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl TvError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        TvError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_param_message() {
        let err = TvError::invalid_param("dt", 0.3, "must be lower than 0.25");
        assert_eq!(
            err.to_string(),
            "invalid parameter: dt = 0.3 (must be lower than 0.25)"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: TvError = io.into();
        assert!(matches!(err, TvError::Io(_)));
    }
}
