use std::time::Duration;

use thiserror::Error;

/// Errors that terminate an analysis run.
///
/// Per-query failures are not errors at this level; they are collected into
/// the outcome's failure list so partial batches still score.
#[derive(Debug, Error)]
pub enum IntelError {
    #[error("no probe queries generated for company '{0}'")]
    NoQueries(String),

    #[error("analysis run timed out after {0:?}")]
    RunTimeout(Duration),

    #[error("analysis run cancelled")]
    Cancelled,

    #[error("every query in the batch failed; nothing to score")]
    AllQueriesFailed,
}
