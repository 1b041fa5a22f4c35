//! Error types for the persistence layer.

/// Errors that can occur in the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The requested game does not exist.
    #[error("game not found: {0}")]
    GameNotFound(uuid::Uuid),

    /// No snapshot exists for the requested game.
    #[error("no snapshot for game {0}")]
    NoSnapshot(uuid::Uuid),

    /// A reloaded state failed its index validation.
    #[error("reloaded state is corrupt: {0}")]
    CorruptState(String),

    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
