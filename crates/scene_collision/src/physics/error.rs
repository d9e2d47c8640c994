//! Errors raised while turning scene geometry into colliders

use thiserror::Error;

/// Failures of mesh aggregation and collider construction
///
/// Every variant names the object being processed so a failed build can be
/// logged and skipped without affecting its siblings.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollisionError {
    /// The index buffer length is not a multiple of three
    #[error("malformed index buffer on '{object}': {len} indices is not a multiple of 3")]
    MalformedIndices {
        /// Offending object or node
        object: String,
        /// Index buffer length
        len: usize,
    },

    /// An index points past the end of the vertex buffer
    #[error("index {index} out of range on '{object}' ({vertex_count} vertices)")]
    IndexOutOfRange {
        /// Offending object or node
        object: String,
        /// The bad index
        index: u32,
        /// Vertices available
        vertex_count: usize,
    },

    /// A vertex contains NaN or infinity after transformation
    #[error("non-finite vertex in '{object}'")]
    NonFiniteVertex {
        /// Offending object or node
        object: String,
    },

    /// Part of the subtree is still loading
    #[error("geometry of '{object}' is not finalized yet")]
    GeometryNotReady {
        /// Node that is still streaming
        object: String,
    },

    /// The node key does not exist in the scene graph
    #[error("unknown scene node")]
    UnknownNode,
}

/// Result alias for collision construction
pub type CollisionResult<T> = Result<T, CollisionError>;
