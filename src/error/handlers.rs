//! Error handlers
//!
//! Maps errors onto protocol reply codes and logs them.

use crate::error::types::{ErrorKind, ServiceError};
use log::{error, warn};

/// Log a service error at a level matching its severity
pub fn handle_error(err: &ServiceError) {
    match err.kind() {
        ErrorKind::Internal | ErrorKind::TransferFailed => error!("Storage service error: {}", err),
        _ => warn!("Rejected operation: {}", err),
    }
}

/// Convert an error kind to a protocol reply code
pub fn kind_to_reply_code(kind: ErrorKind) -> u16 {
    match kind {
        ErrorKind::NoSuchFile => 550,
        ErrorKind::DuplicateName => 553,
        ErrorKind::InvalidExtension => 553,
        ErrorKind::InvalidName => 553,
        ErrorKind::InvalidDelete => 550,
        ErrorKind::Oversize => 552,
        ErrorKind::UnsupportedOperation => 504,
        ErrorKind::InvalidQuery => 501,
        ErrorKind::TransferFailed => 451,
        ErrorKind::Internal => 451,
    }
}

/// Convert an error to a protocol reply code
pub fn error_to_reply_code(err: &ServiceError) -> u16 {
    kind_to_reply_code(err.kind())
}
