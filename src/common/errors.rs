use thiserror::Error;

use crate::common::file_operations::FileOperationError;
use crate::common::{AccessMethodId, ParamId};
use crate::executor::ExecFlags;

/// The library's error enum.
///
/// `ContractViolation`, `UnsupportedExecutionMode` and `InvalidPlan` signal a broken
/// planner/executor invariant. They terminate the enclosing query and are never retried.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// A node was driven in a way its callers promised never to do.
    #[error("Contract violation: '{0}'")]
    ContractViolation(String),

    /// Init requested backward scan or mark/restore support.
    #[error("Unsupported execution mode: {0:?}")]
    UnsupportedExecutionMode(ExecFlags),

    /// The plan shape can't be executed by this node.
    #[error("Invalid plan: '{0}'")]
    InvalidPlan(String),

    #[error("Index not found: '{0}'")]
    IndexNotFound(String),

    #[error("Index already exists: '{0}'")]
    DuplicateIndex(String),

    #[error("Index '{index}' ({access_method}) can't serve a {expected} scan")]
    IndexKindMismatch { index: String, access_method: AccessMethodId, expected: &'static str },

    #[error("Parameter ${0} is not bound")]
    ParamNotBound(ParamId),

    #[error("Vector dimension mismatch, expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("'{0:?}'")]
    FileOperationError(#[from] FileOperationError),

    #[error("Logger error: '{0}'")]
    LoggerError(String),
}

impl From<log::SetLoggerError> for ExecutorError {
    fn from(error: log::SetLoggerError) -> Self {
        ExecutorError::LoggerError(error.to_string())
    }
}

impl From<log4rs::config::runtime::ConfigErrors> for ExecutorError {
    fn from(errors: log4rs::config::runtime::ConfigErrors) -> Self {
        ExecutorError::LoggerError(errors.to_string())
    }
}
