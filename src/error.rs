#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Invalid problem record: {0}")]
    InvalidRecord(&'static str),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Notion API error ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Database error")]
    Database(#[from] sqlx::error::Error),

    #[error("Sync relay is gone")]
    RelayClosed,
}

impl SyncError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SyncError::Transport(e) if e.is_timeout())
    }
}
