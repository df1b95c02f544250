// src/cache/mod.rs - Dedup cache contract

use anyhow::Result;
use async_trait::async_trait;

pub mod memory;

pub use memory::MemoryCache;

/// "Have I replied to this id already" store.
///
/// The pipeline only needs one operation: an atomic check-and-set keyed by
/// the Reddit fullname. Marking happens in the same call as the check so
/// that a crash after the call results in a missed reply, never a
/// duplicate one.
#[async_trait]
pub trait ReplyCache: Send + Sync {
    /// Return whether the id was already marked, marking it if not.
    /// The check and the mark happen atomically.
    async fn exists_and_mark(&self, thing_id: &str) -> Result<bool>;

    /// Drop markers older than the retention window. Called by the
    /// housekeeping task, not by the matching pipeline.
    async fn prune(&self) -> Result<usize>;
}
