//! Transfer gateway boundary
//!
//! The only place bytes move. The storage decides whether a transfer is
//! allowed and which paths are involved; a gateway carries it out against a
//! concrete backend.

use std::path::{Path, PathBuf};

use crate::error::TransferError;
use crate::storage::ContentHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    Download,
    Upload,
}

impl TransferDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferDirection::Download => "download",
            TransferDirection::Upload => "upload",
        }
    }
}

/// One file to move between the backend and the local side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Absolute virtual path of the file in the storage tree.
    pub virtual_path: String,
    pub name: String,
    pub size: u64,
    pub content: Option<ContentHandle>,
    /// Local target for downloads; the gateway's default location when `None`.
    pub destination: Option<PathBuf>,
}

impl TransferRequest {
    /// Backend key of the file: its content handle, or its virtual path
    /// without the leading slash.
    pub fn backend_key(&self) -> &str {
        match &self.content {
            Some(handle) => handle.as_str(),
            None => self.virtual_path.trim_start_matches('/'),
        }
    }
}

pub trait TransferGateway: Send + Sync {
    /// Short backend name used in messages.
    fn backend_name(&self) -> &str;

    fn download(&self, request: &TransferRequest) -> Result<bool, TransferError>;

    fn upload(&self, request: &TransferRequest) -> Result<bool, TransferError>;

    /// Create a local directory as part of a directory download.
    fn prepare_directory(&self, path: &Path) -> Result<(), TransferError> {
        let _ = path;
        Err(TransferError::Unsupported {
            backend: self.backend_name().to_string(),
            operation: "directory download",
        })
    }
}
