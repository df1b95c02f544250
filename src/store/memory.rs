// src/store/memory.rs - In-memory response store backend

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tokio::sync::RwLock;

use crate::bot::text::{normalize, processed_hero_name};
use crate::store::ResponseStore;
use crate::types::{Hero, HeroId, ResponseEntry, ResponseInfo};

/// Seed file format produced by the offline wiki scrape job.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoreSeed {
    pub heroes: Vec<HeroSeed>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HeroSeed {
    pub hero_name: String,
    #[serde(default)]
    pub flair_css: Option<String>,
    /// (original text, audio link) pairs; the processed matching key is
    /// derived at load time.
    pub responses: Vec<(String, String)>,
}

#[derive(Default)]
struct Inner {
    heroes: Vec<Hero>,
    responses: Vec<ResponseEntry>,
    /// Links are unique per entry; used to skip duplicates at ingestion.
    known_links: HashSet<String>,
    by_text: HashMap<String, Vec<usize>>,
    next_hero_id: HeroId,
}

/// Response store backed by process memory, populated from the scrape
/// seed file at startup.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from the JSON seed produced by the ingestion job.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read response seed {}", path.display()))?;
        let seed: StoreSeed = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse response seed {}", path.display()))?;

        let store = Self::new();
        for hero in seed.heroes {
            store
                .add_hero_and_responses(&hero.hero_name, hero.flair_css.as_deref(), &hero.responses)
                .await?;
        }

        {
            let inner = store.inner.read().await;
            info!(
                "Loaded {} responses for {} heroes from {}",
                inner.responses.len(),
                inner.heroes.len(),
                path.display()
            );
        }
        Ok(store)
    }

    /// Add a hero together with its (original text, link) response pairs.
    /// Responses whose link is already stored are skipped; the same clip
    /// is never stored twice.
    pub async fn add_hero_and_responses(
        &self,
        hero_name: &str,
        flair_css: Option<&str>,
        responses: &[(String, String)],
    ) -> Result<HeroId> {
        let mut inner = self.inner.write().await;

        let hero_id = inner.next_hero_id;
        inner.next_hero_id += 1;
        inner.heroes.push(Hero {
            id: hero_id,
            hero_name: hero_name.to_string(),
            processed_name: processed_hero_name(hero_name),
            flair_css: flair_css.map(str::to_string),
        });

        for (original_text, link) in responses {
            if !inner.known_links.insert(link.clone()) {
                debug!("Link already stored, skipping: {link}");
                continue;
            }

            let processed_text = normalize(original_text);
            let index = inner.responses.len();
            inner.responses.push(ResponseEntry {
                original_text: original_text.clone(),
                processed_text: processed_text.clone(),
                response_link: link.clone(),
                hero_id,
            });
            inner.by_text.entry(processed_text).or_default().push(index);
        }

        Ok(hero_id)
    }

    /// Attach or replace the flair CSS class of an existing hero. Used by
    /// the flair population job when subreddit stylesheet data changes.
    pub async fn update_hero_flair(&self, hero_name: &str, flair_css: Option<&str>) -> Result<()> {
        let mut inner = self.inner.write().await;
        let hero = inner
            .heroes
            .iter_mut()
            .find(|h| h.hero_name == hero_name)
            .with_context(|| format!("unknown hero: {hero_name}"))?;
        hero.flair_css = flair_css.map(str::to_string);
        Ok(())
    }
}

#[async_trait]
impl ResponseStore for MemoryStore {
    async fn lookup(
        &self,
        processed_text: &str,
        hero_id: Option<HeroId>,
    ) -> Result<Option<ResponseInfo>> {
        let inner = self.inner.read().await;
        let Some(indices) = inner.by_text.get(processed_text) else {
            return Ok(None);
        };

        let candidates: Vec<&ResponseEntry> = indices
            .iter()
            .map(|&i| &inner.responses[i])
            .filter(|entry| hero_id.map_or(true, |id| entry.hero_id == id))
            .collect();

        let chosen = match hero_id {
            // Exact hero filter leaves at most one row by construction.
            Some(_) => candidates.first().copied(),
            None => candidates.choose(&mut rand::rng()).copied(),
        };

        Ok(chosen.map(|entry| ResponseInfo {
            hero_id: entry.hero_id,
            link: entry.response_link.clone(),
        }))
    }

    async fn hero_id_by_exact_name(&self, hero_name: &str) -> Result<Option<HeroId>> {
        let inner = self.inner.read().await;
        Ok(inner
            .heroes
            .iter()
            .find(|h| h.hero_name == hero_name)
            .map(|h| h.id))
    }

    async fn hero_ids_by_processed_name(&self, processed_name: &str) -> Result<Vec<HeroId>> {
        let inner = self.inner.read().await;
        Ok(inner
            .heroes
            .iter()
            .filter(|h| h.processed_name == processed_name)
            .map(|h| h.id)
            .collect())
    }

    async fn hero_id_by_flair(&self, flair_css: &str) -> Result<Option<HeroId>> {
        let inner = self.inner.read().await;
        Ok(inner
            .heroes
            .iter()
            .find(|h| h.flair_css.as_deref() == Some(flair_css))
            .map(|h| h.id))
    }

    async fn hero_name(&self, hero_id: HeroId) -> Result<Option<String>> {
        let inner = self.inner.read().await;
        Ok(inner
            .heroes
            .iter()
            .find(|h| h.id == hero_id)
            .map(|h| h.hero_name.clone()))
    }
}
