//! Room metadata blob store

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::debug;

/// Top-level metadata mapping shared by every plugin in the room
pub type Metadata = Map<String, Value>;

/// Result of a conditional write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    Applied,
    Conflict,
    Unsupported,
}

/// Key-value blob storage scoped to the room, last writer wins
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the whole mapping
    async fn get(&self) -> anyhow::Result<Metadata>;

    /// Shallow-merge `patch` into the stored mapping
    async fn set(&self, patch: Metadata) -> anyhow::Result<()>;

    /// Change notifications carrying the full new mapping
    fn subscribe(&self) -> broadcast::Receiver<Metadata>;

    /// Fetch with a version token when the store has one
    async fn get_versioned(&self) -> anyhow::Result<(Metadata, Option<u64>)> {
        Ok((self.get().await?, None))
    }

    /// Write only if the stored version still equals `version`
    async fn compare_and_set(&self, _version: u64, _patch: Metadata) -> anyhow::Result<CasOutcome> {
        Ok(CasOutcome::Unsupported)
    }
}

#[derive(Debug, Default)]
struct Versioned {
    data: Metadata,
    version: u64,
}

/// In-process blob store; clone the `Arc` to share one room between clients
#[derive(Debug)]
pub struct MemoryBlobStore {
    inner: Mutex<Versioned>,
    versioned: bool,
    fail_writes: AtomicBool,
    change_tx: broadcast::Sender<Metadata>,
}

impl MemoryBlobStore {
    /// Store that hands out version tokens and honours conditional writes
    pub fn new() -> Self {
        Self::build(true)
    }

    /// Store without version tokens, like a plain host metadata API
    pub fn last_writer_wins() -> Self {
        Self::build(false)
    }

    fn build(versioned: bool) -> Self {
        let (change_tx, _) = broadcast::channel(64);
        Self {
            inner: Mutex::new(Versioned::default()),
            versioned,
            fail_writes: AtomicBool::new(false),
            change_tx,
        }
    }

    /// Make every following write fail until switched back
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn version(&self) -> u64 {
        self.inner.lock().map(|inner| inner.version).unwrap_or(0)
    }

    fn apply(&self, expected: Option<u64>, patch: Metadata) -> anyhow::Result<CasOutcome> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("metadata write rejected"));
        }

        let snapshot = {
            let mut inner = self
                .inner
                .lock()
                .map_err(|e| anyhow!("Failed to lock metadata: {}", e))?;
            if let Some(expected) = expected {
                if inner.version != expected {
                    return Ok(CasOutcome::Conflict);
                }
            }
            for (key, value) in patch {
                inner.data.insert(key, value);
            }
            inner.version += 1;
            debug!("Metadata now at version {}", inner.version);
            inner.data.clone()
        };

        // Nobody listening is fine
        let _ = self.change_tx.send(snapshot);
        Ok(CasOutcome::Applied)
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self) -> anyhow::Result<Metadata> {
        self.inner
            .lock()
            .map(|inner| inner.data.clone())
            .map_err(|e| anyhow!("Failed to lock metadata: {}", e))
    }

    async fn set(&self, patch: Metadata) -> anyhow::Result<()> {
        self.apply(None, patch).map(|_| ())
    }

    fn subscribe(&self) -> broadcast::Receiver<Metadata> {
        self.change_tx.subscribe()
    }

    async fn get_versioned(&self) -> anyhow::Result<(Metadata, Option<u64>)> {
        let inner = self
            .inner
            .lock()
            .map_err(|e| anyhow!("Failed to lock metadata: {}", e))?;
        let version = self.versioned.then_some(inner.version);
        Ok((inner.data.clone(), version))
    }

    async fn compare_and_set(&self, version: u64, patch: Metadata) -> anyhow::Result<CasOutcome> {
        if !self.versioned {
            return Ok(CasOutcome::Unsupported);
        }
        self.apply(Some(version), patch)
    }
}
