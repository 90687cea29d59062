//! Error types for the physics system

use thiserror::Error;

/// Physics system errors
#[derive(Debug, Error)]
pub enum PhysicsError {
    /// Rigid body not found (removed, or never belonged to this engine)
    #[error("Rigid body not found: {0:?}")]
    BodyNotFound(crate::body::BodyHandle),

    /// Raycast direction has zero length or is not finite
    #[error("Raycast direction must be a finite, non-zero vector")]
    ZeroDirection,

    /// Invalid configuration
    #[error("Invalid physics configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for physics operations
pub type Result<T> = std::result::Result<T, PhysicsError>;
