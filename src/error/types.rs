//! Error types
//!
//! Defines domain-specific error types for each module of the storage manager.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Failure classes surfaced to callers, independent of the detailed variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DuplicateName,
    NoSuchFile,
    InvalidExtension,
    InvalidDelete,
    Oversize,
    UnsupportedOperation,
    InvalidName,
    InvalidQuery,
    TransferFailed,
    Internal,
}

/// Storage module errors
///
/// Raised by the directory tree and the constraint checks it runs before a
/// mutation commits. A failed operation never leaves a partial change behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("Name already exists: {0}")]
    DuplicateName(String),

    #[error("No such file or directory: {0}")]
    NoSuchFile(String),

    #[error("Extension '{extension}' is not allowed in {directory}")]
    InvalidExtension { extension: String, directory: String },

    #[error("The root directory cannot be deleted, renamed or moved")]
    RootProtected,

    #[error("Directory is not empty: {0}")]
    DirectoryNotEmpty(String),

    #[error("Cannot move {path} into its own subtree {destination}")]
    CycleDetected { path: String, destination: String },

    #[error("Directory {path} is full ({capacity} entries)")]
    CapacityExceeded { path: String, capacity: usize },

    #[error("Quota exceeded for {scope}: {requested} bytes requested, {available} bytes available")]
    QuotaExceeded {
        scope: String,
        requested: u64,
        available: u64,
    },

    #[error("Invalid name: '{0}'")]
    InvalidName(String),
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::DuplicateName(_) => ErrorKind::DuplicateName,
            StorageError::NoSuchFile(_) => ErrorKind::NoSuchFile,
            StorageError::InvalidExtension { .. } => ErrorKind::InvalidExtension,
            StorageError::RootProtected
            | StorageError::DirectoryNotEmpty(_)
            | StorageError::CycleDetected { .. } => ErrorKind::InvalidDelete,
            StorageError::CapacityExceeded { .. } | StorageError::QuotaExceeded { .. } => {
                ErrorKind::Oversize
            }
            StorageError::InvalidName(_) => ErrorKind::InvalidName,
        }
    }
}

/// Query module errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Unknown sort order: {0}")]
    UnknownOrder(String),

    #[error("Unknown sort criterion: {0}")]
    UnknownCriterion(String),

    #[error("Invalid time period: {0}")]
    InvalidPeriod(String),

    #[error("Unknown filter modification: {0}")]
    UnknownModification(String),

    #[error("No previous query result")]
    NoResult,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::Storage(e) => e.kind(),
            _ => ErrorKind::InvalidQuery,
        }
    }
}

/// Transfer module errors
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("{operation} is not supported by the {backend} backend")]
    Unsupported {
        backend: String,
        operation: &'static str,
    },

    #[error("Backend rejected transfer of {0}")]
    Rejected(String),

    #[error("Transfer of {path} failed: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Transfer timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transfer task failed: {0}")]
    TaskFailed(String),

    #[error("Transfer aborted at {path}: {reason}")]
    Aborted {
        path: String,
        reason: Box<TransferError>,
    },
}

impl TransferError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::Unsupported { .. } | TransferError::Aborted { .. } => {
                ErrorKind::UnsupportedOperation
            }
            _ => ErrorKind::TransferFailed,
        }
    }
}

/// General service error that encompasses all error types
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Storage(e) => e.kind(),
            ServiceError::Query(e) => e.kind(),
            ServiceError::Transfer(e) => e.kind(),
            ServiceError::Protocol(_) => ErrorKind::InvalidQuery,
            ServiceError::Config(_) | ServiceError::Io(_) => ErrorKind::Internal,
        }
    }
}
