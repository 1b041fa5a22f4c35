//! Server error type and process exit codes.

/// Errors surfaced by the authoritative process.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Turn resolution failed an invariant; the game stays on its last
    /// good turn.
    #[error("engine error: {0}")]
    Engine(#[from] ec4x_core::EngineError),

    /// Rules or scenario configuration is unusable.
    #[error("configuration error: {0}")]
    Rules(#[from] ec4x_rules::RulesError),

    /// Persistence failed.
    #[error("database error: {0}")]
    Db(#[from] ec4x_db::DbError),

    /// Transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] ec4x_transport::TransportError),

    /// A required environment variable is missing or malformed.
    #[error("environment error: {0}")]
    Environment(String),
}

impl ServerError {
    /// The process exit code for this error: 1 invariant violation,
    /// 2 bad configuration, 3 transport failure.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Engine(_) => 1,
            Self::Rules(_) | Self::Environment(_) => 2,
            Self::Transport(_) => 3,
            Self::Db(_) => 1,
        }
    }
}
