//! Crate-level error type
//!
//! Each pipeline stage has its own error (`ValidationError`,
//! `PenaltyConflictError`, `ConfigError`). `EngineError` wraps them for
//! callers that drive the whole pipeline through `AssessmentSession`.

use thiserror::Error;

use crate::baseline::{BaselineId, ValidationError};
use crate::config::ConfigError;
use crate::penalty::PenaltyConflictError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid environmental input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Penalty conflict: {0}")]
    PenaltyConflict(#[from] PenaltyConflictError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("No baseline has been frozen for this session")]
    NoBaseline,

    #[error("Stale baseline: session holds {expected}, request references {found}")]
    StaleBaseline {
        expected: BaselineId,
        found: BaselineId,
    },
}

pub type Result<T> = std::result::Result<T, EngineError>;
