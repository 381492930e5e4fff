use thiserror::Error;

#[derive(Error, Debug)]
pub enum RatingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("failed to fetch infrastructure records: {0}")]
    StoreFetch(String),
    #[error("weight vector sums to zero")]
    EmptyWeights,
}

pub type Result<T> = std::result::Result<T, RatingError>;
