use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShopError {
    /// Malformed filter model (oversized lists). Never reaches the store.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catalog store or remote query service cannot be reached.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Business-logic storage errors (bad schema, unexpected row shape, etc.)
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Raw database errors from rusqlite
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl ShopError {
    /// Infrastructure faults abort the retrieval loop instead of consuming retries.
    pub fn is_store_fault(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::Transport(_) | Self::Io(_))
    }
}

pub type ShopResult<T> = Result<T, ShopError>;
