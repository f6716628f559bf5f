//! Time-bounded message store with snapshot persistence
//!
//! A keyed container mapping message id to message, with a per-entry
//! expiration timestamp. Expired entries are dropped lazily on read and
//! actively by a periodic sweeper; both paths compare against the same
//! `expires_at` recorded at insertion.
//!
//! Every successful insert rewrites the full snapshot file before the
//! caller sees the result, so a confirmed message survives a restart.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::Message;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Message not found")]
    NotFound,

    #[error("Snapshot IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot format error: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    message: Message,
    /// Expiration instant; `None` never expires
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Concurrent store of captured messages, guarded by one coarse lock
#[derive(Debug)]
pub struct MessageStore {
    entries: Mutex<HashMap<String, Entry>>,
    snapshot_path: PathBuf,
}

impl MessageStore {
    /// Create an empty store that snapshots to the given path
    pub fn new(snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            snapshot_path: snapshot_path.into(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store or replace the entry under `message.id` with expiration
    /// now + ttl (`None` means the entry never expires).
    ///
    /// The snapshot write happens synchronously before returning; on
    /// failure the entry stays in memory but the error is surfaced so
    /// the session does not confirm the message to the client.
    pub fn insert(&self, message: Message, ttl: Option<Duration>) -> Result<(), StoreError> {
        let expires_at = ttl
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));

        let mut entries = self.lock();
        entries.insert(message.id.clone(), Entry { message, expires_at });
        Self::write_snapshot(&self.snapshot_path, &entries)
    }

    /// Return the message only if present and not yet expired. An
    /// expired entry is removed on the spot and reported absent.
    pub fn get(&self, id: &str) -> Option<Message> {
        let now = Utc::now();
        let mut entries = self.lock();
        match entries.get(id) {
            Some(entry) if entry.expired(now) => {
                entries.remove(id);
                None
            }
            Some(entry) => Some(entry.message.clone()),
            None => None,
        }
    }

    /// Point-in-time copy of all non-expired messages
    pub fn list(&self) -> Vec<Message> {
        let now = Utc::now();
        self.lock()
            .values()
            .filter(|entry| !entry.expired(now))
            .map(|entry| entry.message.clone())
            .collect()
    }

    /// Remove all entries immediately. The snapshot is rewritten so a
    /// flush also survives a restart.
    pub fn flush(&self) {
        let mut entries = self.lock();
        entries.clear();
        if let Err(e) = Self::write_snapshot(&self.snapshot_path, &entries) {
            warn!("could not persist flushed snapshot: {e}");
        }
    }

    /// Number of currently non-expired entries
    pub fn count(&self) -> usize {
        let now = Utc::now();
        self.lock().values().filter(|entry| !entry.expired(now)).count()
    }

    /// Remove expired entries; returns how many were dropped
    pub fn sweep(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.expired(now));
        let dropped = before - entries.len();
        if dropped > 0 {
            debug!("sweeper dropped {dropped} expired message(s)");
        }
        dropped
    }

    /// Run `sweep` forever at the given interval on a background thread
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> thread::JoinHandle<()> {
        let store = Arc::clone(self);
        thread::spawn(move || {
            loop {
                thread::sleep(interval);
                store.sweep();
            }
        })
    }

    /// Serialize every entry (including expirations) to `path`
    pub fn save_to(&self, path: &Path) -> Result<(), StoreError> {
        Self::write_snapshot(path, &self.lock())
    }

    /// Load entries from a snapshot file, replacing the current
    /// contents. A missing file is a no-op; an unreadable one is an
    /// error and the store is left empty.
    pub fn load_from(&self, path: &Path) -> Result<usize, StoreError> {
        if !path.exists() {
            return Ok(0);
        }
        let raw = fs::read(path)?;
        let loaded: Vec<Entry> = serde_json::from_slice(&raw)?;

        let mut entries = self.lock();
        entries.clear();
        for entry in loaded {
            entries.insert(entry.message.id.clone(), entry);
        }
        Ok(entries.len())
    }

    /// Load from the configured snapshot path
    pub fn load(&self) -> Result<usize, StoreError> {
        let path = self.snapshot_path.clone();
        self.load_from(&path)
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    // Write to a temp file first so a crash mid-write cannot corrupt
    // the snapshot that a restart will load.
    fn write_snapshot(path: &Path, entries: &HashMap<String, Entry>) -> Result<(), StoreError> {
        let all: Vec<&Entry> = entries.values().collect();
        let raw = serde_json::to_vec(&all)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}
