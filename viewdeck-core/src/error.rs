use thiserror::Error;

/// Errors surfaced to the caller of a workspace operation.
///
/// Arrangement gestures and malformed persisted records never produce one of
/// these; they are absorbed where they happen.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("No session store is configured; sharing is unavailable")]
    ConfigurationMissing,

    #[error("Session {0} not found")]
    SessionNotFound(String),

    #[error("Unknown panel {0}")]
    UnknownPanel(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Layout is full: at most {0} panels")]
    LayoutFull(usize),

    #[error("No independently navigated URL to sync")]
    NothingToSync,

    #[error("Session store error: {0}")]
    Store(#[from] anyhow::Error),
}

pub type WorkspaceResult<T> = std::result::Result<T, WorkspaceError>;
