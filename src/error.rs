use thiserror::Error;

/// Result type used by the ledger, catalog and import operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Failures of an inventory operation. Every variant leaves the State untouched.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Missing or unparseable quantity, or an empty required field.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The operation would drive a balance below zero while negatives are blocked.
    #[error("operation refused: {0}")]
    PolicyViolation(String),

    /// The import header lacks required columns; nothing was imported.
    #[error("missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("unknown ingredient: {0}")]
    UnknownIngredient(String),

    #[error("ingredient already exists: {0}")]
    DuplicateIngredient(String),

    #[error("export failed: {0}")]
    Export(String),

    /// The persistence layer failed. In-memory changes were not made durable.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

impl LedgerError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn policy(msg: impl Into<String>) -> Self {
        Self::PolicyViolation(msg.into())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("state document is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store connection lock poisoned")]
    Poisoned,

    #[error("seed unavailable: {0}")]
    Seed(#[from] std::io::Error),
}
