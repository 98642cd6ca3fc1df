//! Failure kinds observed by the pipeline stages.
//!
//! None of these ever reach the caller of [`crate::core::pipeline::Pipeline::run`]
//! as an `Err`. Each stage degrades locally and records the reason in its
//! outcome instead.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EtlError {
    #[error("network failure: {0}")]
    Network(String),

    #[error("exchange rate file not found at {}", .0.display())]
    RateFileMissing(PathBuf),

    #[error("failed to read exchange rate file {}: {reason}", path.display())]
    RateFileMalformed { path: PathBuf, reason: String },

    #[error("{0} column not found in quote table")]
    MissingBaseColumn(String),

    #[error("empty table")]
    EmptyInput,

    #[error("persistence failure: {0}")]
    Persistence(String),
}
