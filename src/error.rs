use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlugError {
    /// A source field carries a validation error, or nothing usable could be
    /// gathered from the record.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("missing required parameter `{0}`")]
    MissingParameter(&'static str),

    /// Raised while building a configuration; never produced per call.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type SlugResult<T> = Result<T, SlugError>;
