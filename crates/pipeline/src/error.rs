use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Core error: {0}")]
    CoreError(#[from] prospect_core::CoreError),

    #[error("Invalid phase: {0}")]
    InvalidPhase(String),

    #[error("{0}")]
    Other(String),
}
