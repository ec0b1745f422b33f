//! Module `file_ops`
//!
//! Local filesystem gateway. The backend is a directory on disk that mirrors
//! the virtual tree; downloads copy out of it, uploads copy into it. Every
//! copy goes through a temporary file that is renamed into place only once
//! all bytes are written and flushed.

use log::{error, info, warn};
use std::fs::{self, File, remove_file, rename};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::error::TransferError;
use crate::transfer::gateway::{TransferGateway, TransferRequest};

const DEFAULT_MAX_RETRIES: usize = 3;
const DEFAULT_BUFFER_SIZE: usize = 8192;

#[derive(Debug, Clone)]
pub struct LocalGateway {
    backend_root: PathBuf,
    download_dir: PathBuf,
    upload_dir: PathBuf,
    buffer_size: usize,
    max_retries: usize,
}

impl LocalGateway {
    pub fn new(
        backend_root: impl Into<PathBuf>,
        download_dir: impl Into<PathBuf>,
        upload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            backend_root: backend_root.into(),
            download_dir: download_dir.into(),
            upload_dir: upload_dir.into(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn backend_root(&self) -> &Path {
        &self.backend_root
    }

    fn backend_path(&self, request: &TransferRequest) -> PathBuf {
        self.backend_root.join(request.backend_key())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> TransferError {
    TransferError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Copy `source` to `target` through a temporary file, retrying transient
/// read and write failures.
fn copy_atomic(
    source: &Path,
    target: &Path,
    buffer_size: usize,
    max_retries: usize,
) -> Result<u64, TransferError> {
    let mut input = File::open(source).map_err(|e| io_error(source, e))?;

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }

    let temp = temp_path_for(target);
    let mut output = File::create(&temp).map_err(|e| io_error(&temp, e))?;

    let mut buffer = vec![0; buffer_size];
    let mut total_bytes = 0u64;

    loop {
        let mut retries = 0;
        let n = loop {
            match input.read(&mut buffer) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted || retries < max_retries => {
                    retries += 1;
                    warn!(
                        "Transient read error on {} (attempt {}/{}): {}. Retrying...",
                        source.display(),
                        retries,
                        max_retries,
                        e
                    );
                    thread::sleep(Duration::from_millis(100 * retries as u64));
                }
                Err(e) => {
                    error!("Read failure on {} after {max_retries} retries: {e}", source.display());
                    let _ = remove_file(&temp);
                    return Err(io_error(source, e));
                }
            }
        };

        if n == 0 {
            break;
        }

        if let Err(e) = output.write_all(&buffer[..n]) {
            error!("Failed to write to temporary file {}: {e}", temp.display());
            let _ = remove_file(&temp);
            return Err(io_error(&temp, e));
        }
        total_bytes += n as u64;
    }

    if let Err(e) = output.flush() {
        error!("Failed to flush temporary file {}: {e}", temp.display());
        let _ = remove_file(&temp);
        return Err(io_error(&temp, e));
    }
    drop(output);

    if let Err(e) = rename(&temp, target) {
        error!("Failed to rename {} to {}: {e}", temp.display(), target.display());
        let _ = remove_file(&temp);
        return Err(io_error(target, e));
    }

    Ok(total_bytes)
}

impl TransferGateway for LocalGateway {
    fn backend_name(&self) -> &str {
        "local"
    }

    fn download(&self, request: &TransferRequest) -> Result<bool, TransferError> {
        let source = self.backend_path(request);
        let target = request
            .destination
            .clone()
            .unwrap_or_else(|| self.download_dir.join(&request.name));

        info!("Starting download: {} -> {}", source.display(), target.display());
        let bytes = copy_atomic(&source, &target, self.buffer_size, self.max_retries)?;
        info!("Download completed: {} ({bytes} bytes)", target.display());
        Ok(true)
    }

    fn upload(&self, request: &TransferRequest) -> Result<bool, TransferError> {
        let source = self.upload_dir.join(&request.name);
        let target = self.backend_path(request);

        info!("Starting upload: {} -> {}", source.display(), target.display());
        let bytes = copy_atomic(&source, &target, self.buffer_size, self.max_retries)?;
        info!("Upload completed: {} ({bytes} bytes)", target.display());
        Ok(true)
    }

    fn prepare_directory(&self, path: &Path) -> Result<(), TransferError> {
        fs::create_dir_all(path).map_err(|e| io_error(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, LocalGateway) {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("backend/docs")).unwrap();
        fs::create_dir_all(root.join("outbox")).unwrap();
        let gateway = LocalGateway::new(
            root.join("backend"),
            root.join("downloads"),
            root.join("outbox"),
        )
        .with_buffer_size(4);
        (temp_dir, gateway)
    }

    fn request(path: &str, name: &str) -> TransferRequest {
        TransferRequest {
            virtual_path: path.to_string(),
            name: name.to_string(),
            size: 0,
            content: None,
            destination: None,
        }
    }

    #[test]
    fn test_download_copies_into_download_dir() {
        let (temp_dir, gateway) = setup();
        fs::write(temp_dir.path().join("backend/docs/a.txt"), b"hello world").unwrap();

        assert!(gateway.download(&request("/docs/a.txt", "a.txt")).unwrap());

        let copied = fs::read(temp_dir.path().join("downloads/a.txt")).unwrap();
        assert_eq!(copied, b"hello world");
        assert!(!temp_dir.path().join("downloads/a.txt.tmp").exists());
    }

    #[test]
    fn test_download_honours_explicit_destination() {
        let (temp_dir, gateway) = setup();
        fs::write(temp_dir.path().join("backend/docs/a.txt"), b"x").unwrap();

        let mut req = request("/docs/a.txt", "a.txt");
        req.destination = Some(temp_dir.path().join("mirror/docs/a.txt"));
        gateway.download(&req).unwrap();

        assert!(temp_dir.path().join("mirror/docs/a.txt").exists());
    }

    #[test]
    fn test_upload_copies_into_backend() {
        let (temp_dir, gateway) = setup();
        fs::write(temp_dir.path().join("outbox/b.txt"), b"payload").unwrap();

        assert!(gateway.upload(&request("/docs/b.txt", "b.txt")).unwrap());
        let stored = fs::read(temp_dir.path().join("backend/docs/b.txt")).unwrap();
        assert_eq!(stored, b"payload");
    }

    #[test]
    fn test_missing_source_is_io_error() {
        let (_temp_dir, gateway) = setup();
        let err = gateway.download(&request("/docs/none.txt", "none.txt")).unwrap_err();
        assert!(matches!(err, TransferError::Io { .. }));
    }

    #[test]
    fn test_content_handle_overrides_virtual_path() {
        let (temp_dir, gateway) = setup();
        fs::write(temp_dir.path().join("backend/blob-42"), b"blob").unwrap();

        let mut req = request("/docs/renamed.txt", "renamed.txt");
        req.content = Some(crate::storage::ContentHandle::new("blob-42"));
        gateway.download(&req).unwrap();

        assert_eq!(fs::read(temp_dir.path().join("downloads/renamed.txt")).unwrap(), b"blob");
    }
}
