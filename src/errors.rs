//! Umbrella error definitions for the facade crate.

use thiserror::Error;
use vf_engine::AnalysisError;
use vf_lang::LangError;

pub type VfResult<T> = Result<T, VfError>;

#[derive(Debug, Error)]
pub enum VfError {
    #[error("analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("language error: {0}")]
    Lang(#[from] LangError),
}
