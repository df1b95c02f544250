// src/cache/memory.rs - FIFO in-memory dedup cache

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use std::collections::{HashSet, VecDeque};
use tokio::sync::Mutex;

use crate::cache::ReplyCache;

struct Inner {
    /// Insertion order with timestamps; oldest at the front.
    queue: VecDeque<(String, DateTime<Utc>)>,
    members: HashSet<String>,
}

/// Process-memory dedup cache with FIFO eviction and TTL pruning.
pub struct MemoryCache {
    inner: Mutex<Inner>,
    capacity: usize,
    ttl: Duration,
}

impl MemoryCache {
    pub fn new(capacity: usize, ttl_days: i64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                members: HashSet::new(),
            }),
            capacity,
            ttl: Duration::days(ttl_days),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.members.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(10_000, 5)
    }
}

#[async_trait]
impl ReplyCache for MemoryCache {
    async fn exists_and_mark(&self, thing_id: &str) -> Result<bool> {
        let mut inner = self.inner.lock().await;

        if inner.members.contains(thing_id) {
            return Ok(true);
        }

        inner.members.insert(thing_id.to_string());
        inner.queue.push_back((thing_id.to_string(), Utc::now()));

        while inner.queue.len() > self.capacity {
            if let Some((evicted, _)) = inner.queue.pop_front() {
                inner.members.remove(&evicted);
            }
        }

        Ok(false)
    }

    async fn prune(&self) -> Result<usize> {
        let cutoff = Utc::now() - self.ttl;
        let mut inner = self.inner.lock().await;

        let mut pruned = 0;
        while let Some((_, added)) = inner.queue.front() {
            if *added >= cutoff {
                break;
            }
            if let Some((expired, _)) = inner.queue.pop_front() {
                inner.members.remove(&expired);
                pruned += 1;
            }
        }

        if pruned > 0 {
            debug!("Pruned {pruned} expired ids from the reply cache");
        }
        Ok(pruned)
    }
}
