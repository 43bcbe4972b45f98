use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid shape: {0}")]
    InvalidShape(String),
    #[error("invalid bounds: {0}")]
    InvalidBounds(String),
    #[error(
        "solver produced non-finite parameter weights; the input data may contain large values and need to be preprocessed"
    )]
    NonFiniteParameters,
    #[error("model is not fitted yet; call `fit` first")]
    NotFitted,
}

pub type Result<T> = std::result::Result<T, Error>;
