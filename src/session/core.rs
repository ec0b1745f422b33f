//! Session facade
//!
//! A session is one user's view of a shared storage: its own navigation
//! cursor, the most recent query result and the gateway used for transfers.
//! Names passed to a session are resolved against its current directory
//! unless they start with `/`.

use std::path::Path;
use std::sync::Arc;

use log::{debug, info};

use crate::error::{QueryError, ServiceError, StorageError, TransferError};
use crate::navigate::NavigationCursor;
use crate::query::{self, InfoFilter, Listing, parse_sort, sort_entries};
use crate::storage::node::{DirectoryOptions, NodeId, NodeSpec, NodeType};
use crate::storage::resolver::{self, path_of};
use crate::storage::{ContentHandle, DirectoryTree, SharedStorage};
use crate::transfer::{
    TransferDirection, TransferGateway, TransferPlan, TransferReport, TransferRequest,
    TransferStep, execute_plan,
};

pub struct Session {
    storage: SharedStorage,
    gateway: Arc<dyn TransferGateway>,
    cursor: NavigationCursor,
    last_result: Option<Listing>,
}

fn transfer_request(
    tree: &DirectoryTree,
    id: NodeId,
    destination: Option<&Path>,
) -> Option<TransferRequest> {
    let node = tree.get(id)?;
    let file = node.as_file()?;
    Some(TransferRequest {
        virtual_path: path_of(tree, id),
        name: node.name().to_string(),
        size: file.size,
        content: file.content.clone(),
        destination: destination.map(Path::to_path_buf),
    })
}

impl Session {
    pub fn new(storage: SharedStorage, gateway: Arc<dyn TransferGateway>) -> Self {
        Self {
            storage,
            gateway,
            cursor: NavigationCursor::new(),
            last_result: None,
        }
    }

    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }

    pub fn gateway(&self) -> Arc<dyn TransferGateway> {
        Arc::clone(&self.gateway)
    }

    /// Absolute path of `name` seen from the current directory.
    pub fn absolute(&self, name: &str) -> String {
        resolver::normalize(self.cursor.current(), name)
    }

    /// Parent directory and leaf name for a node about to be created. The
    /// leaf is checked before normalization so `""`, `.` and `..` cannot
    /// collapse onto an existing directory.
    fn parent_and_name(&self, name: &str) -> Result<(String, String), StorageError> {
        let leaf = name.rsplit('/').next().unwrap_or_default();
        if matches!(leaf, "" | "." | "..") {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(resolver::split_parent(&self.absolute(name)))
    }

    fn directory_or_current(&self, path: Option<&str>) -> String {
        match path {
            Some(path) => self.absolute(path),
            None => self.cursor.current().to_string(),
        }
    }

    fn remember(&mut self, listing: Listing) -> Vec<String> {
        let names = listing.names();
        self.last_result = Some(listing);
        names
    }

    // --------------------
    // Files
    // --------------------

    pub fn create_file(&mut self, name: &str) -> Result<(), StorageError> {
        self.create_with(name, NodeSpec::empty_file())
    }

    /// Create a file of `size` bytes, optionally bound to backend content.
    pub fn create_file_with(
        &mut self,
        name: &str,
        size: u64,
        content: Option<ContentHandle>,
    ) -> Result<(), StorageError> {
        self.create_with(name, NodeSpec::File { size, content })
    }

    pub fn delete_file(&mut self, name: &str) -> Result<(), StorageError> {
        self.delete_typed(name, NodeType::File)
    }

    pub fn rename_file(&mut self, name: &str, new_name: &str) -> Result<(), StorageError> {
        self.rename_typed(name, new_name, NodeType::File)
    }

    /// Move a file into the directory `new_dir`.
    pub fn move_file(&mut self, name: &str, new_dir: &str) -> Result<(), StorageError> {
        let path = self.absolute(name);
        let destination = self.absolute(new_dir);
        let mut storage = self.storage.write();
        resolver::resolve_file(storage.tree(), &path)?;
        storage.move_node(&path, &destination)
    }

    /// Path of the first file named `name` anywhere in the storage.
    pub fn get_file_path(&self, name: &str) -> Result<String, StorageError> {
        self.storage.read().find_path(name, NodeType::File)
    }

    pub fn download_file(&self, name: &str) -> Result<bool, ServiceError> {
        let plan = self.plan_download(name)?;
        self.run_single(plan)
    }

    pub fn upload_file(&self, name: &str) -> Result<bool, ServiceError> {
        let plan = self.plan_upload(name)?;
        self.run_single(plan)
    }

    fn run_single(&self, plan: TransferPlan) -> Result<bool, ServiceError> {
        let Some(TransferStep::File(request)) = plan.steps.first() else {
            return Err(ServiceError::Transfer(TransferError::TaskFailed(
                "empty transfer plan".to_string(),
            )));
        };
        let transferred = match plan.direction {
            TransferDirection::Download => self.gateway.download(request)?,
            TransferDirection::Upload => self.gateway.upload(request)?,
        };
        info!(
            "{} of {} via {}: {}",
            plan.direction.as_str(),
            request.virtual_path,
            self.gateway.backend_name(),
            if transferred { "done" } else { "rejected" }
        );
        Ok(transferred)
    }

    // --------------------
    // Directories
    // --------------------

    /// Create a directory. Only the first capacity value is used.
    pub fn create_directory(&mut self, name: &str, capacities: &[usize]) -> Result<(), StorageError> {
        self.create_with(
            name,
            NodeSpec::Directory(DirectoryOptions::from_capacities(capacities)),
        )
    }

    pub fn create_directory_with(
        &mut self,
        name: &str,
        options: DirectoryOptions,
    ) -> Result<(), StorageError> {
        self.create_with(name, NodeSpec::Directory(options))
    }

    pub fn delete_directory(&mut self, name: &str) -> Result<(), StorageError> {
        self.delete_typed(name, NodeType::Directory)
    }

    pub fn rename_directory(&mut self, name: &str, new_name: &str) -> Result<(), StorageError> {
        self.rename_typed(name, new_name, NodeType::Directory)
    }

    /// Replace the restricted extensions of the current directory.
    pub fn set_unsupported_extensions<S: AsRef<str>>(
        &mut self,
        extensions: &[S],
    ) -> Result<(), StorageError> {
        let current = self.cursor.current().to_string();
        self.storage
            .write()
            .set_unsupported_extensions(&current, extensions)
    }

    /// Path of the first directory named `name` anywhere in the storage.
    pub fn get_directory_path(&self, name: &str) -> Result<String, StorageError> {
        self.storage.read().find_path(name, NodeType::Directory)
    }

    /// Download the subtree at `source` into the local directory `destination`.
    pub fn download_directory(
        &self,
        source: &str,
        destination: &Path,
    ) -> Result<TransferReport, ServiceError> {
        let plan = self.plan_directory_download(source, destination)?;
        Ok(execute_plan(self.gateway.as_ref(), &plan)?)
    }

    fn create_with(&mut self, name: &str, spec: NodeSpec) -> Result<(), StorageError> {
        let (parent, leaf) = self.parent_and_name(name)?;
        self.storage.write().insert(&parent, &leaf, spec).map(|_| ())
    }

    fn delete_typed(&mut self, name: &str, node_type: NodeType) -> Result<(), StorageError> {
        let path = self.absolute(name);
        let mut storage = self.storage.write();
        resolver::resolve_typed(storage.tree(), &path, node_type)?;
        storage.remove(&path)
    }

    fn rename_typed(
        &mut self,
        name: &str,
        new_name: &str,
        node_type: NodeType,
    ) -> Result<(), StorageError> {
        let path = self.absolute(name);
        let mut storage = self.storage.write();
        if path != resolver::ROOT_PATH {
            resolver::resolve_typed(storage.tree(), &path, node_type)?;
        }
        storage.rename(&path, new_name)
    }

    // --------------------
    // Queries
    // --------------------

    pub fn list_all(&mut self, path: Option<&str>) -> Result<Vec<String>, StorageError> {
        let dir = self.directory_or_current(path);
        let listing = query::list_all(&self.storage.read(), &dir)?;
        Ok(self.remember(listing))
    }

    pub fn list_full(&mut self, path: Option<&str>) -> Result<Vec<String>, StorageError> {
        let dir = self.directory_or_current(path);
        let listing = query::list_full(&self.storage.read(), &dir)?;
        Ok(self.remember(listing))
    }

    pub fn list_ext<S: AsRef<str>>(&mut self, extensions: &[S]) -> Result<Vec<String>, StorageError> {
        let dir = self.cursor.current().to_string();
        let listing = query::list_ext(&self.storage.read(), &dir, extensions)?;
        Ok(self.remember(listing))
    }

    pub fn list_files_with(&mut self, substring: &str) -> Result<Vec<String>, StorageError> {
        let dir = self.cursor.current().to_string();
        let listing = query::list_files_with(&self.storage.read(), &dir, substring)?;
        Ok(self.remember(listing))
    }

    pub fn list_contains<S: AsRef<str>>(&self, path: &str, names: &[S]) -> Result<bool, StorageError> {
        let dir = self.absolute(path);
        query::list_contains(&self.storage.read(), &dir, names)
    }

    pub fn find_directory(&self, file_name: &str) -> Result<String, StorageError> {
        self.storage.read().find_directory(file_name)
    }

    /// Re-sort the most recent result in place and return its names.
    pub fn sort<S: AsRef<str>>(&mut self, order: &str, criteria: &[S]) -> Result<Vec<String>, QueryError> {
        let (order, keys) = parse_sort(order, criteria)?;
        let listing = self.last_result.as_mut().ok_or(QueryError::NoResult)?;
        sort_entries(&mut listing.entries, order, &keys);
        debug!("Sorted {} entries by {:?} {:?}", listing.len(), keys, order);
        Ok(listing.names())
    }

    pub fn files_from_period(
        &mut self,
        path: Option<&str>,
        token: &str,
    ) -> Result<Vec<String>, QueryError> {
        let dir = self.directory_or_current(path);
        let listing = {
            let storage = self.storage.read();
            query::files_from_period(&storage, &dir, token, storage.now())?
        };
        Ok(self.remember(listing))
    }

    /// Render the most recent result through the given modifications.
    pub fn file_info_filter<S: AsRef<str>>(&self, modifications: &[S]) -> Result<Vec<String>, QueryError> {
        let filter = InfoFilter::parse(modifications)?;
        let listing = self.last_result.as_ref().ok_or(QueryError::NoResult)?;
        Ok(filter.apply(listing))
    }

    pub fn last_result(&self) -> Option<&Listing> {
        self.last_result.as_ref()
    }

    // --------------------
    // Navigation
    // --------------------

    pub fn forward(&mut self, name: &str) -> bool {
        let storage = self.storage.read();
        self.cursor.forward(&storage, name)
    }

    pub fn backwards(&mut self) -> bool {
        self.cursor.backwards()
    }

    /// Backend location the storage was initialized with.
    pub fn get_root(&self) -> String {
        self.storage.read().root_path().to_string()
    }

    pub fn current_dir(&self) -> &str {
        self.cursor.current()
    }

    pub fn cursor(&self) -> &NavigationCursor {
        &self.cursor
    }

    // --------------------
    // Transfer plans
    // --------------------

    pub fn plan_download(&self, name: &str) -> Result<TransferPlan, StorageError> {
        self.plan_file(name, TransferDirection::Download)
    }

    pub fn plan_upload(&self, name: &str) -> Result<TransferPlan, StorageError> {
        self.plan_file(name, TransferDirection::Upload)
    }

    fn plan_file(&self, name: &str, direction: TransferDirection) -> Result<TransferPlan, StorageError> {
        let path = self.absolute(name);
        let storage = self.storage.read();
        let tree = storage.tree();
        let id = resolver::resolve_file(tree, &path)?;
        let request =
            transfer_request(tree, id, None).ok_or_else(|| StorageError::NoSuchFile(path.clone()))?;
        Ok(TransferPlan::single(direction, request))
    }

    /// Directory skeleton first along each branch, then one download per
    /// file, in pre-order.
    pub fn plan_directory_download(
        &self,
        source: &str,
        destination: &Path,
    ) -> Result<TransferPlan, StorageError> {
        let source_path = self.absolute(source);
        let storage = self.storage.read();
        let tree = storage.tree();
        let root = resolver::resolve_directory(tree, &source_path)?;

        let mut plan = TransferPlan::new(TransferDirection::Download);
        plan.push_directory(destination.to_path_buf());

        for id in tree.descendants(root) {
            let Some(node) = tree.get(id) else { continue };
            let full = path_of(tree, id);
            let relative = full
                .strip_prefix(source_path.as_str())
                .unwrap_or(&full)
                .trim_start_matches('/');
            let local = destination.join(relative);

            if node.is_directory() {
                plan.push_directory(local);
            } else if let Some(request) = transfer_request(tree, id, Some(&local)) {
                plan.push_file(request);
            }
        }

        debug!(
            "Planned download of {} to {}: {} files, {} bytes",
            source_path,
            destination.display(),
            plan.file_count(),
            plan.total_bytes()
        );
        Ok(plan)
    }
}
