// src/platforms/mod.rs - Transport traits the pipeline consumes

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

pub mod reddit;

/// Transport-level failures the worker loop recovers from with backoff.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("rate limited by reddit")]
    RateLimited,
    #[error("reddit api returned status {0}")]
    Api(u16),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// A comment or submission eligible to receive a bot reply.
#[async_trait]
pub trait Replyable: Send + Sync {
    /// Stable Reddit identifier ("fullname", e.g. `t1_abc123`).
    fn fullname(&self) -> String;

    /// Author account name.
    fn author(&self) -> String;

    /// Comment body, or submission title for submissions.
    fn body(&self) -> String;

    /// CSS class of the author's subreddit flair, if flaired.
    fn author_flair_css_class(&self) -> Option<String>;

    /// Comments can carry update requests; submissions cannot.
    fn is_comment(&self) -> bool;

    /// The immediate parent in the comment tree, or `None` at the
    /// submission root.
    async fn parent(&self) -> Result<Option<Box<dyn Replyable>>>;

    /// Post a reply under this item.
    async fn reply(&self, text: &str) -> Result<()>;

    /// Edit this item in place. Only valid on bot-authored items.
    async fn edit(&self, text: &str) -> Result<()>;
}

/// Connection to Reddit delivering two ordered streams of replyables.
///
/// Streams are conceptually infinite and restartable: when the receivers
/// close, the worker loop backs off, reconnects and takes fresh ones.
#[async_trait]
pub trait RedditTransport: Send + Sync {
    /// Establish the connection and start the streams.
    async fn connect(&mut self) -> Result<()>;

    /// Take the stream of newly observed comments. Yields `None` after
    /// `connect` has been consumed once; reconnect to get a fresh stream.
    fn comment_stream(&mut self) -> Option<mpsc::Receiver<Box<dyn Replyable>>>;

    /// Take the stream of newly observed submissions.
    fn submission_stream(&mut self) -> Option<mpsc::Receiver<Box<dyn Replyable>>>;

    /// Check if the connection is healthy.
    async fn is_connected(&self) -> bool;

    /// Release the stream connections.
    async fn disconnect(&mut self) -> Result<()>;
}
