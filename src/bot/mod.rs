// src/bot/mod.rs - Bot engine: single-worker loop over the reply streams

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tokio::time::Duration;

use crate::cache::ReplyCache;
use crate::platforms::{RedditTransport, Replyable};

pub mod exclusion;
pub mod formatter;
pub mod resolver;
pub mod text;
pub mod update;

#[cfg(test)]
pub mod testutil;

use resolver::ReplyResolver;

/// Interval between cache housekeeping passes.
const PRUNE_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

/// Core engine consuming the comment and submission streams.
///
/// One cooperative loop processes items strictly one at a time; the only
/// suspension points are transport calls. Transport failures never reach
/// the resolver: the pollers back off internally, and when the streams
/// close the loop reconnects after a fixed backoff.
pub struct ResponseBot {
    transport: Box<dyn RedditTransport>,
    resolver: Arc<ReplyResolver>,
    cache: Arc<dyn ReplyCache>,
    backoff: Duration,
    shutdown: watch::Sender<bool>,
}

impl ResponseBot {
    pub fn new(
        transport: Box<dyn RedditTransport>,
        resolver: Arc<ReplyResolver>,
        cache: Arc<dyn ReplyCache>,
        backoff_seconds: u64,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            transport,
            resolver,
            cache,
            backoff: Duration::from_secs(backoff_seconds),
            shutdown,
        }
    }

    /// Request a clean stop. The in-flight item completes, then the
    /// streams are released.
    pub fn trigger_shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Handle for triggering shutdown from another task.
    pub fn shutdown_handle(&self) -> watch::Sender<bool> {
        self.shutdown.clone()
    }

    /// Run until shutdown is requested.
    pub async fn run(&mut self) -> Result<()> {
        let mut shutdown_rx = self.shutdown.subscribe();

        // Ctrl+C requests the same clean stop as trigger_shutdown.
        let shutdown_tx = self.shutdown.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl+C, initiating shutdown...");
                let _ = shutdown_tx.send(true);
            }
        });

        let prune_handle = self.spawn_housekeeping();

        self.transport
            .connect()
            .await
            .context("initial transport connection failed")?;

        'outer: loop {
            let Some(mut comments) = self.transport.comment_stream() else {
                anyhow::bail!("transport provided no comment stream");
            };
            let Some(mut submissions) = self.transport.submission_stream() else {
                anyhow::bail!("transport provided no submission stream");
            };

            let mut comments_open = true;
            let mut submissions_open = true;

            while comments_open || submissions_open {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        info!("Shutdown requested, stopping worker loop");
                        break 'outer;
                    }
                    item = comments.recv(), if comments_open => match item {
                        Some(item) => self.process(item.as_ref()).await,
                        None => comments_open = false,
                    },
                    item = submissions.recv(), if submissions_open => match item {
                        Some(item) => self.process(item.as_ref()).await,
                        None => submissions_open = false,
                    },
                }
            }

            warn!("Reply streams closed, reconnecting in {:?}", self.backoff);
            self.transport.disconnect().await.ok();

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        info!("Shutdown requested during reconnect");
                        break 'outer;
                    }
                    _ = tokio::time::sleep(self.backoff) => {}
                }

                match self.transport.connect().await {
                    Ok(()) => break,
                    Err(e) => error!("Reconnect failed: {e:#}"),
                }
            }
        }

        prune_handle.abort();
        self.transport.disconnect().await?;
        info!("Bot stopped");
        Ok(())
    }

    /// Resolve a single item. Errors are confined to the item: it stays
    /// unmarked when the cache or store was unreachable, so it is safe to
    /// reprocess on the next pass.
    async fn process(&self, item: &dyn Replyable) {
        match self.resolver.resolve(item).await {
            Ok(Some(action)) => debug!("Action for {}: {action:?}", item.fullname()),
            Ok(None) => {}
            Err(e) => {
                error!("Failed to process {}: {e:#}", item.fullname());
                tokio::time::sleep(self.backoff).await;
            }
        }
    }

    fn spawn_housekeeping(&self) -> tokio::task::JoinHandle<()> {
        let cache = Arc::clone(&self.cache);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(PRUNE_INTERVAL);
            interval.tick().await; // immediate first tick
            loop {
                interval.tick().await;
                match cache.prune().await {
                    Ok(pruned) => debug!("Cache housekeeping pruned {pruned} markers"),
                    Err(e) => error!("Cache housekeeping failed: {e:#}"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::testutil::MockReplyable;
    use crate::cache::MemoryCache;
    use crate::config::RulesConfig;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    struct MockTransport {
        comments: Mutex<Vec<MockReplyable>>,
        comment_rx: Option<mpsc::Receiver<Box<dyn Replyable>>>,
        submission_rx: Option<mpsc::Receiver<Box<dyn Replyable>>>,
    }

    impl MockTransport {
        fn new(comments: Vec<MockReplyable>) -> Self {
            Self {
                comments: Mutex::new(comments),
                comment_rx: None,
                submission_rx: None,
            }
        }
    }

    #[async_trait]
    impl RedditTransport for MockTransport {
        async fn connect(&mut self) -> Result<()> {
            let (comment_tx, comment_rx) = mpsc::channel(100);
            let (_submission_tx, submission_rx) = mpsc::channel(100);

            for item in self.comments.lock().unwrap().drain(..) {
                comment_tx
                    .try_send(Box::new(item) as Box<dyn Replyable>)
                    .unwrap();
            }

            self.comment_rx = Some(comment_rx);
            self.submission_rx = Some(submission_rx);
            Ok(())
        }

        fn comment_stream(&mut self) -> Option<mpsc::Receiver<Box<dyn Replyable>>> {
            self.comment_rx.take()
        }

        fn submission_stream(&mut self) -> Option<mpsc::Receiver<Box<dyn Replyable>>> {
            self.submission_rx.take()
        }

        async fn is_connected(&self) -> bool {
            true
        }

        async fn disconnect(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_engine_processes_stream_items() {
        let store = MemoryStore::new();
        store
            .add_hero_and_responses(
                "Pudge",
                None,
                &[("Fresh meat!".to_string(), "https://a/meat.mp3".to_string())],
            )
            .await
            .unwrap();

        let resolver = Arc::new(ReplyResolver::new(
            Arc::new(store),
            Arc::new(MemoryCache::default()),
            RulesConfig::default(),
            "response-bot".to_string(),
        ));

        let comment = MockReplyable::comment("t1_a", "user", "Fresh meat!");
        let transport = MockTransport::new(vec![comment.clone()]);

        let mut bot = ResponseBot::new(
            Box::new(transport),
            resolver,
            Arc::new(MemoryCache::default()),
            1,
        );

        let shutdown = bot.shutdown_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let _ = shutdown.send(true);
        });

        bot.run().await.unwrap();
        assert_eq!(comment.replies().len(), 1);
    }
}
