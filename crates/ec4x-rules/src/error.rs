//! Error types for rule and scenario loading.

/// Errors that can occur when loading rules or scenarios.
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    /// Failed to read a file from disk.
    #[error("failed to read rules file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse rules YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// Failed to serialize the materialized snapshot for hashing.
    #[error("failed to serialize snapshot: {source}")]
    Serialize {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// A table value is out of its legal range.
    #[error("rule value out of range: {what}")]
    OutOfRange {
        /// Which value, and its legal range.
        what: String,
    },
}

impl From<serde_yml::Error> for RulesError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}
