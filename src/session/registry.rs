//! Session registry
//!
//! Tracks the connections that currently hold a session and enforces the
//! session limit.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub connected_at: DateTime<Utc>,
    pub commands: u64,
}

/// Registry for tracking active sessions
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SocketAddr, SessionEntry>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `addr` unless `limit` sessions are already active.
    pub fn try_register(&mut self, addr: SocketAddr, limit: usize) -> bool {
        if self.sessions.len() >= limit && !self.sessions.contains_key(&addr) {
            return false;
        }
        self.sessions.insert(
            addr,
            SessionEntry {
                connected_at: Utc::now(),
                commands: 0,
            },
        );
        true
    }

    pub fn remove(&mut self, addr: &SocketAddr) -> Option<SessionEntry> {
        self.sessions.remove(addr)
    }

    pub fn get(&self, addr: &SocketAddr) -> Option<&SessionEntry> {
        self.sessions.get(addr)
    }

    pub fn record_command(&mut self, addr: &SocketAddr) {
        if let Some(entry) = self.sessions.get_mut(addr) {
            entry.commands += 1;
        }
    }

    pub fn contains(&self, addr: &SocketAddr) -> bool {
        self.sessions.contains_key(addr)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
