//! Query operations
//!
//! Read-only listings over a storage. Callers pass absolute directory paths;
//! sessions substitute their current directory when none is given.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use log::debug;

use crate::error::{QueryError, StorageError};
use crate::query::listing::Listing;
use crate::query::period::parse_period;
use crate::storage::node::normalize_extensions;
use crate::storage::resolver;
use crate::storage::Storage;

/// Direct children of `dir_path`, files and directories, in insertion order.
pub fn list_all(storage: &Storage, dir_path: &str) -> Result<Listing, StorageError> {
    let tree = storage.tree();
    let dir = resolver::resolve_directory(tree, dir_path)?;
    let listing = Listing::collect(tree, tree.children(dir).iter().copied());

    debug!("Listed {} ({} entries)", dir_path, listing.len());
    Ok(listing)
}

/// Every file below `dir_path`, depth first, in insertion order.
pub fn list_full(storage: &Storage, dir_path: &str) -> Result<Listing, StorageError> {
    let tree = storage.tree();
    let dir = resolver::resolve_directory(tree, dir_path)?;
    let listing = Listing::collect_files(tree, tree.descendants(dir));

    debug!("Listed {} recursively ({} files)", dir_path, listing.len());
    Ok(listing)
}

/// Files below `dir_path` whose extension is one of `extensions`, compared
/// exactly.
pub fn list_ext<S: AsRef<str>>(
    storage: &Storage,
    dir_path: &str,
    extensions: &[S],
) -> Result<Listing, StorageError> {
    let wanted: BTreeSet<String> = normalize_extensions(extensions);
    let mut listing = list_full(storage, dir_path)?;
    listing.entries.retain(|entry| {
        entry
            .extension
            .as_ref()
            .is_some_and(|ext| wanted.contains(ext))
    });
    Ok(listing)
}

/// Files below `dir_path` whose name starts with, contains or ends with
/// `substring`.
pub fn list_files_with(
    storage: &Storage,
    dir_path: &str,
    substring: &str,
) -> Result<Listing, StorageError> {
    let mut listing = list_full(storage, dir_path)?;
    listing.entries.retain(|entry| {
        entry.name.starts_with(substring)
            || entry.name.contains(substring)
            || entry.name.ends_with(substring)
    });
    Ok(listing)
}

/// True when every name is a direct child of `dir_path`.
pub fn list_contains<S: AsRef<str>>(
    storage: &Storage,
    dir_path: &str,
    names: &[S],
) -> Result<bool, StorageError> {
    let tree = storage.tree();
    let dir = resolver::resolve_directory(tree, dir_path)?;
    Ok(names
        .iter()
        .all(|name| tree.child_named(dir, name.as_ref()).is_some()))
}

/// Files below `dir_path` created inside the period named by `token`.
pub fn files_from_period(
    storage: &Storage,
    dir_path: &str,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Listing, QueryError> {
    let period = parse_period(token, now)?;
    let mut listing = list_full(storage, dir_path)?;
    listing.entries.retain(|entry| period.contains(entry.created));

    debug!(
        "Period '{}' under {} matched {} files",
        token,
        dir_path,
        listing.len()
    );
    Ok(listing)
}
