use thiserror::Error;

pub type Result<T> = std::result::Result<T, RankError>;

#[derive(Error, Debug)]
pub enum RankError {
    #[error("Core error: {0}")]
    CoreError(#[from] prospect_core::CoreError),

    #[error("Scorer failure: {0}")]
    ScoreFailure(String),

    #[error("{0}")]
    Other(String),
}
