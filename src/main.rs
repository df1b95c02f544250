// src/main.rs - Bot entry point

use anyhow::Result;
use log::info;
use std::sync::Arc;

use dotaresponses::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables and initialize logging
    dotenv::dotenv().ok();
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Starting dotaresponses v{}", env!("CARGO_PKG_VERSION"));

    let config = BotConfig::from_env()?;
    let rules = RulesConfig::load_or_create(&config.rules_path).await?;

    let store = Arc::new(MemoryStore::load_json(&config.responses_path).await?);
    let cache = Arc::new(MemoryCache::new(
        config.cache_capacity,
        config.cache_ttl_days,
    ));

    let resolver = Arc::new(ReplyResolver::new(
        store,
        Arc::clone(&cache) as Arc<dyn ReplyCache>,
        rules,
        config.username.clone(),
    ));

    let transport = RedditConnection::new(config.clone())?;
    let mut bot = ResponseBot::new(
        Box::new(transport),
        resolver,
        cache,
        config.backoff_seconds,
    );

    bot.run().await
}
