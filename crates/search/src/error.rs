use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Core error: {0}")]
    CoreError(#[from] prospect_core::CoreError),

    #[error("Rank error: {0}")]
    RankError(#[from] prospect_rank::RankError),

    #[error("Fetch failure: {0}")]
    FetchFailure(String),

    #[error("Invalid run state: {0}")]
    InvalidState(String),

    #[error("{0}")]
    Other(String),
}
