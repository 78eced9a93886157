//! Persistence store for serialized opening graphs.
//!
//! Graphs are opaque byte blobs keyed by owner id. The Postgres backend
//! lives in `db::opening_graphs`; the in-memory one serves tests and
//! database-less runs.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::AppError;

/// Byte-blob store keyed by owner id.
///
/// Methods return `impl Future + Send` so that handlers generic over the
/// store stay `Send`.
pub trait GraphStore: Clone + Send + Sync + 'static {
    fn get(&self, owner: &str) -> impl Future<Output = Result<Option<Vec<u8>>, AppError>> + Send;
    fn put(&self, owner: &str, bytes: &[u8]) -> impl Future<Output = Result<(), AppError>> + Send;
}

#[derive(Clone, Default)]
pub struct MemoryGraphStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GraphStore for MemoryGraphStore {
    async fn get(&self, owner: &str) -> Result<Option<Vec<u8>>, AppError> {
        Ok(self.blobs.read().await.get(owner).cloned())
    }

    async fn put(&self, owner: &str, bytes: &[u8]) -> Result<(), AppError> {
        self.blobs.write().await.insert(owner.to_string(), bytes.to_vec());
        Ok(())
    }
}
