//! Pipeline error types.

use thiserror::Error;

/// Errors raised while building the integrated dataset.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// One of the four source tables could not be fetched or parsed.
    /// No partial dataset is produced when this happens.
    #[error("failed to load {table} table from {source_location}: {reason}")]
    Load {
        table: Table,
        source_location: String,
        reason: String,
    },

    /// The HTTP client used for remote sources could not be built.
    #[error("failed to initialise HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// A pipeline step is mathematically undefined for the given input.
    #[error("degenerate input: {0}")]
    DegenerateInput(String),
}

impl PipelineError {
    pub(crate) fn load(table: Table, source: impl Into<String>, reason: impl ToString) -> Self {
        PipelineError::Load {
            table,
            source_location: source.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true for fetch / parse failures.
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            PipelineError::Load { .. } | PipelineError::HttpClient(_)
        )
    }
}

/// The four source tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Users,
    Friendships,
    Posts,
    Reactions,
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Table::Users => write!(f, "users"),
            Table::Friendships => write!(f, "friendships"),
            Table::Posts => write!(f, "posts"),
            Table::Reactions => write!(f, "reactions"),
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
