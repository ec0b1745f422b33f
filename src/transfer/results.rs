//! Transfer plan and report types
//!
//! A plan is built under the storage read lock and executed after the lock is
//! released, so the tree is never held while bytes move.

use std::path::PathBuf;

use crate::transfer::gateway::{TransferDirection, TransferRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStep {
    /// Create a local directory.
    Directory(PathBuf),
    /// Move one file.
    File(TransferRequest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    pub direction: TransferDirection,
    pub steps: Vec<TransferStep>,
}

impl TransferPlan {
    pub fn new(direction: TransferDirection) -> Self {
        Self {
            direction,
            steps: Vec::new(),
        }
    }

    pub fn single(direction: TransferDirection, request: TransferRequest) -> Self {
        Self {
            direction,
            steps: vec![TransferStep::File(request)],
        }
    }

    pub fn push_directory(&mut self, path: PathBuf) {
        self.steps.push(TransferStep::Directory(path));
    }

    pub fn push_file(&mut self, request: TransferRequest) {
        self.steps.push(TransferStep::File(request));
    }

    pub fn file_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s, TransferStep::File(_)))
            .count()
    }

    pub fn total_bytes(&self) -> u64 {
        self.steps
            .iter()
            .map(|s| match s {
                TransferStep::File(r) => r.size,
                TransferStep::Directory(_) => 0,
            })
            .sum()
    }
}

/// Outcome of a completed plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferReport {
    pub files: usize,
    pub directories: usize,
    pub bytes: u64,
}
