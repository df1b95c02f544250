// src/store/mod.rs - Query contract the matching pipeline needs

use anyhow::Result;
use async_trait::async_trait;

use crate::bot::text::processed_hero_name;
use crate::types::{HeroId, HeroMatch, ResponseInfo};

pub mod memory;

pub use memory::MemoryStore;

/// Read-side contract of the response store.
///
/// The resolution pipeline must not depend on a specific query engine, so
/// everything it needs is expressed here; backends only have to answer
/// these lookups.
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Find a response for the processed text.
    ///
    /// With a hero id the filter is exact (no fuzzy fallback) and at most
    /// one row can remain, since (link, hero) pairs are unique by
    /// construction. Without one, a uniformly random entry among all
    /// matching rows is returned.
    async fn lookup(
        &self,
        processed_text: &str,
        hero_id: Option<HeroId>,
    ) -> Result<Option<ResponseInfo>>;

    /// Hero id for an exact display-name match.
    async fn hero_id_by_exact_name(&self, hero_name: &str) -> Result<Option<HeroId>>;

    /// All hero ids sharing the given processed name.
    async fn hero_ids_by_processed_name(&self, processed_name: &str) -> Result<Vec<HeroId>>;

    /// Hero id mapped to a subreddit flair CSS class, if any.
    async fn hero_id_by_flair(&self, flair_css: &str) -> Result<Option<HeroId>>;

    /// Display name for a hero id.
    async fn hero_name(&self, hero_id: HeroId) -> Result<Option<String>>;

    /// Resolve a free-text hero name: exact display-name match first, then
    /// the processed form against `processed_name`.
    async fn hero_id_by_loose_name(&self, hero_name: &str) -> Result<HeroMatch> {
        if let Some(id) = self.hero_id_by_exact_name(hero_name).await? {
            return Ok(HeroMatch::One(id));
        }

        let mut ids = self
            .hero_ids_by_processed_name(&processed_hero_name(hero_name))
            .await?;
        Ok(match ids.len() {
            0 => HeroMatch::None,
            1 => HeroMatch::One(ids.remove(0)),
            _ => HeroMatch::Many(ids),
        })
    }
}
