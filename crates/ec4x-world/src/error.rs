//! Error types for the starmap layer.

use ec4x_types::ids::SystemId;

/// Errors that can occur building or querying the starmap.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A system with this ID already exists.
    #[error("duplicate system: {0}")]
    DuplicateSystem(SystemId),

    /// The referenced system does not exist.
    #[error("system not found: {0}")]
    SystemNotFound(SystemId),

    /// A lane between these systems already exists.
    #[error("duplicate lane: {0} <-> {1}")]
    DuplicateLane(SystemId, SystemId),

    /// A lane endpoint pair is not hex-adjacent.
    #[error("lane endpoints not adjacent: {0} <-> {1}")]
    NotAdjacent(SystemId, SystemId),

    /// Map generation could not satisfy its invariants.
    #[error("map generation failed: {0}")]
    Generation(String),
}
