//! # Dota 2 Responses Reddit Bot
//!
//! Watches a subreddit's comment and submission streams, detects text
//! matching a known Dota 2 in-game voice response, and replies with a
//! link to the matching audio clip.
//!
//! The interesting part is the matching pipeline: normalization, quote
//! and `hero::text` extraction, exclusion filtering, flair scoping, and
//! "try <hero>" update requests that edit a prior reply in place. The
//! Reddit transport, response store and dedup cache sit behind traits so
//! the pipeline never depends on a specific backend.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dotaresponses::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = BotConfig::from_env()?;
//!     let rules = RulesConfig::load_or_create(&config.rules_path).await?;
//!
//!     let store = Arc::new(MemoryStore::load_json(&config.responses_path).await?);
//!     let cache = Arc::new(MemoryCache::new(config.cache_capacity, config.cache_ttl_days));
//!     let resolver = Arc::new(ReplyResolver::new(
//!         store,
//!         cache.clone(),
//!         rules,
//!         config.username.clone(),
//!     ));
//!
//!     let transport = RedditConnection::new(config.clone())?;
//!     let mut bot = ResponseBot::new(Box::new(transport), resolver, cache, config.backoff_seconds);
//!     bot.run().await
//! }
//! ```

pub mod bot;
pub mod cache;
pub mod config;
pub mod platforms;
pub mod store;
pub mod types;

// Re-export commonly used items
pub mod prelude {
    pub use crate::bot::resolver::ReplyResolver;
    pub use crate::bot::ResponseBot;
    pub use crate::cache::{MemoryCache, ReplyCache};
    pub use crate::config::{BotConfig, RulesConfig};
    pub use crate::platforms::{reddit::RedditConnection, RedditTransport, Replyable};
    pub use crate::store::{MemoryStore, ResponseStore};
    pub use crate::types::{Hero, HeroId, HeroMatch, ReplyAction, ResponseEntry, ResponseInfo};
    pub use anyhow::Result;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
