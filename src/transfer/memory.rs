//! In-memory gateway
//!
//! Moves no bytes. Records every request it receives and answers according to
//! its capability flags, which makes it the gateway of choice in tests and
//! for backends that only support part of the transfer surface.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};

use crate::error::TransferError;
use crate::transfer::gateway::{TransferDirection, TransferGateway, TransferRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedTransfer {
    File(TransferDirection, TransferRequest),
    Directory(PathBuf),
}

#[derive(Debug)]
pub struct MemoryGateway {
    name: String,
    can_download: bool,
    can_upload: bool,
    can_prepare_directories: bool,
    fail_on: Option<String>,
    recorded: Mutex<Vec<RecordedTransfer>>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self {
            name: "memory".to_string(),
            can_download: true,
            can_upload: true,
            can_prepare_directories: true,
            fail_on: None,
            recorded: Mutex::new(Vec::new()),
        }
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway that refuses every operation.
    pub fn unsupported() -> Self {
        Self::default()
            .with_download(false)
            .with_upload(false)
            .with_directories(false)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_download(mut self, enabled: bool) -> Self {
        self.can_download = enabled;
        self
    }

    pub fn with_upload(mut self, enabled: bool) -> Self {
        self.can_upload = enabled;
        self
    }

    pub fn with_directories(mut self, enabled: bool) -> Self {
        self.can_prepare_directories = enabled;
        self
    }

    /// Answer `false` for the file at this virtual path.
    pub fn failing_on(mut self, virtual_path: impl Into<String>) -> Self {
        self.fail_on = Some(virtual_path.into());
        self
    }

    pub fn recorded(&self) -> Vec<RecordedTransfer> {
        self.recorded.lock().clone()
    }

    /// Virtual paths of recorded file transfers in the given direction.
    pub fn transferred(&self, direction: TransferDirection) -> Vec<String> {
        self.recorded
            .lock()
            .iter()
            .filter_map(|r| match r {
                RecordedTransfer::File(d, req) if *d == direction => Some(req.virtual_path.clone()),
                _ => None,
            })
            .collect()
    }

    fn transfer(
        &self,
        direction: TransferDirection,
        enabled: bool,
        request: &TransferRequest,
    ) -> Result<bool, TransferError> {
        if !enabled {
            return Err(TransferError::Unsupported {
                backend: self.name.clone(),
                operation: direction.as_str(),
            });
        }
        if self.fail_on.as_deref() == Some(request.virtual_path.as_str()) {
            return Ok(false);
        }
        self.recorded
            .lock()
            .push(RecordedTransfer::File(direction, request.clone()));
        Ok(true)
    }
}

impl TransferGateway for MemoryGateway {
    fn backend_name(&self) -> &str {
        &self.name
    }

    fn download(&self, request: &TransferRequest) -> Result<bool, TransferError> {
        self.transfer(TransferDirection::Download, self.can_download, request)
    }

    fn upload(&self, request: &TransferRequest) -> Result<bool, TransferError> {
        self.transfer(TransferDirection::Upload, self.can_upload, request)
    }

    fn prepare_directory(&self, path: &Path) -> Result<(), TransferError> {
        if !self.can_prepare_directories {
            return Err(TransferError::Unsupported {
                backend: self.name.clone(),
                operation: "directory download",
            });
        }
        self.recorded
            .lock()
            .push(RecordedTransfer::Directory(path.to_path_buf()));
        Ok(())
    }
}
