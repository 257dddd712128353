use thiserror::Error;

#[derive(Debug, Error)]
pub enum CohortError {
    /// A required column or key is missing or mistyped. Always fatal.
    #[error("schema violation in {table}: {message}")]
    Schema { table: String, message: String },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Message(String),
}

impl CohortError {
    pub fn schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            table: table.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CohortError>;
