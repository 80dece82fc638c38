use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Invalid asset type: {0}")]
    InvalidAssetType(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Malformed cursor: {0}")]
    MalformedCursor(String),

    #[error("firstEvaluatedKey and lastEvaluatedKey cannot be used together")]
    ConflictingCursor,

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl QueryError {
    /// Client errors are never retried by the service.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            QueryError::InvalidAssetType(_)
                | QueryError::InvalidDate(_)
                | QueryError::MalformedCursor(_)
                | QueryError::ConflictingCursor
                | QueryError::InvalidParams(_)
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::InvalidAssetType(_) => "InvalidAssetType",
            QueryError::InvalidDate(_) => "InvalidDate",
            QueryError::MalformedCursor(_) => "MalformedCursor",
            QueryError::ConflictingCursor => "ConflictingCursor",
            QueryError::InvalidParams(_) => "InvalidParams",
            QueryError::Unavailable(_) => "Unavailable",
            QueryError::Storage(_) => "Storage",
        }
    }
}

// Store errors are plain strings, they pass through unchanged.
impl From<String> for QueryError {
    fn from(msg: String) -> Self {
        QueryError::Storage(msg)
    }
}

pub type QueryResult<T> = Result<T, QueryError>;
