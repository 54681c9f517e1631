//! Analysis errors definition.

use crate::context::ContextId;
use thiserror::Error;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("internal error: {0}")]
    Internal(String),

    #[error("method has no analysable body: {0}")]
    NoBody(String),

    #[error("context X{0} has been reclaimed and no longer stores per-node values")]
    FreedContext(ContextId),

    #[error("program error: {0}")]
    Program(String),
}
