//! Language errors definition.

use thiserror::Error;
use vf_engine::AnalysisError;

pub type LangResult<T> = Result<T, LangError>;

#[derive(Debug, Error)]
pub enum LangError {
    #[error("function already defined: {0}")]
    DuplicateFunction(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("function {function} has an empty body")]
    EmptyBody { function: String },

    #[error("branch target {target} out of range in function {function}")]
    TargetOutOfRange { function: String, target: usize },

    #[error("control falls off the end of function {function}")]
    FallsOffEnd { function: String },
}

impl From<LangError> for AnalysisError {
    fn from(err: LangError) -> Self {
        AnalysisError::Program(err.to_string())
    }
}
