// src/platforms/reddit.rs - Reddit OAuth client and polling streams

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, error, info, warn};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, RwLock};

use crate::config::BotConfig;
use crate::platforms::{RedditTransport, Replyable, TransportError};

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";

/// Capacity of the per-stream channels between the pollers and the
/// worker loop.
const STREAM_BUFFER: usize = 1000;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct Token {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
struct CommentData {
    name: String,
    author: String,
    body: String,
    #[serde(default)]
    author_flair_css_class: Option<String>,
    parent_id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SubmissionData {
    name: String,
    author: String,
    title: String,
    #[serde(default)]
    author_flair_css_class: Option<String>,
}

/// Authenticated Reddit API client using the password OAuth grant.
pub struct RedditClient {
    http: reqwest::Client,
    config: BotConfig,
    token: RwLock<Option<Token>>,
}

impl RedditClient {
    pub fn new(config: BotConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            config,
            token: RwLock::new(None),
        })
    }

    /// Current access token, refreshed through the password grant when
    /// missing or about to expire.
    async fn bearer(&self) -> Result<String, TransportError> {
        {
            let token = self.token.read().await;
            if let Some(token) = token.as_ref() {
                if token.expires_at > Utc::now() + Duration::seconds(60) {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let response = self
            .http
            .post(TOKEN_URL)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", self.config.username.as_str()),
                ("password", self.config.password.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TransportError::Auth(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let parsed: TokenResponse = response.json().await?;
        let access_token = parsed.access_token.clone();
        *self.token.write().await = Some(Token {
            access_token: parsed.access_token,
            expires_at: Utc::now() + Duration::seconds(parsed.expires_in),
        });

        debug!("Refreshed Reddit access token");
        Ok(access_token)
    }

    fn check_status(status: reqwest::StatusCode) -> Result<(), TransportError> {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(TransportError::RateLimited);
        }
        if !status.is_success() {
            return Err(TransportError::Api(status.as_u16()));
        }
        Ok(())
    }

    async fn get_json(&self, path: &str) -> Result<serde_json::Value, TransportError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .get(format!("{API_BASE}{path}"))
            .bearer_auth(token)
            .send()
            .await?;
        Self::check_status(response.status())?;
        Ok(response.json().await?)
    }

    async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Result<(), TransportError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .post(format!("{API_BASE}{path}"))
            .bearer_auth(token)
            .form(form)
            .send()
            .await?;
        Self::check_status(response.status())
    }

    fn parse_listing<T: serde::de::DeserializeOwned>(
        listing: serde_json::Value,
        expected_kind: &str,
    ) -> Vec<T> {
        let Some(children) = listing
            .get("data")
            .and_then(|d| d.get("children"))
            .and_then(|c| c.as_array())
        else {
            return Vec::new();
        };

        children
            .iter()
            .filter(|child| child.get("kind").and_then(|k| k.as_str()) == Some(expected_kind))
            .filter_map(|child| child.get("data").cloned())
            .filter_map(|data| serde_json::from_value(data).ok())
            .collect()
    }

    async fn newest_comments(self: &Arc<Self>) -> Result<Vec<RedditComment>, TransportError> {
        let listing = self
            .get_json(&format!("/r/{}/comments?limit=100", self.config.subreddit))
            .await?;
        Ok(Self::parse_listing::<CommentData>(listing, "t1")
            .into_iter()
            .map(|data| RedditComment {
                api: Arc::clone(self),
                data,
            })
            .collect())
    }

    async fn newest_submissions(self: &Arc<Self>) -> Result<Vec<RedditSubmission>, TransportError> {
        let listing = self
            .get_json(&format!("/r/{}/new?limit=100", self.config.subreddit))
            .await?;
        Ok(Self::parse_listing::<SubmissionData>(listing, "t3")
            .into_iter()
            .map(|data| RedditSubmission {
                api: Arc::clone(self),
                data,
            })
            .collect())
    }

    /// Fetch a single thing (comment or submission) by fullname.
    async fn thing_by_fullname(
        self: &Arc<Self>,
        fullname: &str,
    ) -> Result<Option<Box<dyn Replyable>>, TransportError> {
        let listing = self.get_json(&format!("/api/info?id={fullname}")).await?;

        if fullname.starts_with("t1_") {
            let mut comments = Self::parse_listing::<CommentData>(listing, "t1");
            return Ok(comments.pop().map(|data| {
                Box::new(RedditComment {
                    api: Arc::clone(self),
                    data,
                }) as Box<dyn Replyable>
            }));
        }

        let mut submissions = Self::parse_listing::<SubmissionData>(listing, "t3");
        Ok(submissions.pop().map(|data| {
            Box::new(RedditSubmission {
                api: Arc::clone(self),
                data,
            }) as Box<dyn Replyable>
        }))
    }

    async fn post_reply(&self, parent_fullname: &str, text: &str) -> Result<(), TransportError> {
        self.post_form(
            "/api/comment",
            &[
                ("api_type", "json"),
                ("thing_id", parent_fullname),
                ("text", text),
            ],
        )
        .await
    }

    async fn edit_text(&self, fullname: &str, text: &str) -> Result<(), TransportError> {
        self.post_form(
            "/api/editusertext",
            &[("api_type", "json"), ("thing_id", fullname), ("text", text)],
        )
        .await
    }
}

/// A live comment pulled from the subreddit stream.
pub struct RedditComment {
    api: Arc<RedditClient>,
    data: CommentData,
}

#[async_trait]
impl Replyable for RedditComment {
    fn fullname(&self) -> String {
        self.data.name.clone()
    }

    fn author(&self) -> String {
        self.data.author.clone()
    }

    fn body(&self) -> String {
        self.data.body.clone()
    }

    fn author_flair_css_class(&self) -> Option<String> {
        self.data.author_flair_css_class.clone()
    }

    fn is_comment(&self) -> bool {
        true
    }

    async fn parent(&self) -> Result<Option<Box<dyn Replyable>>> {
        Ok(self.api.thing_by_fullname(&self.data.parent_id).await?)
    }

    async fn reply(&self, text: &str) -> Result<()> {
        Ok(self.api.post_reply(&self.data.name, text).await?)
    }

    async fn edit(&self, text: &str) -> Result<()> {
        Ok(self.api.edit_text(&self.data.name, text).await?)
    }
}

/// A live submission; the title is the text evaluated by the pipeline.
pub struct RedditSubmission {
    api: Arc<RedditClient>,
    data: SubmissionData,
}

#[async_trait]
impl Replyable for RedditSubmission {
    fn fullname(&self) -> String {
        self.data.name.clone()
    }

    fn author(&self) -> String {
        self.data.author.clone()
    }

    fn body(&self) -> String {
        self.data.title.clone()
    }

    fn author_flair_css_class(&self) -> Option<String> {
        self.data.author_flair_css_class.clone()
    }

    fn is_comment(&self) -> bool {
        false
    }

    async fn parent(&self) -> Result<Option<Box<dyn Replyable>>> {
        Ok(None)
    }

    async fn reply(&self, text: &str) -> Result<()> {
        Ok(self.api.post_reply(&self.data.name, text).await?)
    }

    async fn edit(&self, text: &str) -> Result<()> {
        Ok(self.api.edit_text(&self.data.name, text).await?)
    }
}

/// Polling-based Reddit connection feeding the two replyable streams.
///
/// Each poller refetches the newest listing on an interval and pushes
/// every item downstream; the dedup cache in the resolver makes repeated
/// delivery harmless.
pub struct RedditConnection {
    client: Arc<RedditClient>,
    poll_interval_seconds: u64,
    backoff_seconds: u64,
    comment_rx: Option<mpsc::Receiver<Box<dyn Replyable>>>,
    submission_rx: Option<mpsc::Receiver<Box<dyn Replyable>>>,
    stop_tx: Option<watch::Sender<bool>>,
    is_connected: Arc<RwLock<bool>>,
}

impl RedditConnection {
    pub fn new(config: BotConfig) -> Result<Self> {
        let poll_interval_seconds = config.poll_interval_seconds;
        let backoff_seconds = config.backoff_seconds;
        Ok(Self {
            client: Arc::new(RedditClient::new(config)?),
            poll_interval_seconds,
            backoff_seconds,
            comment_rx: None,
            submission_rx: None,
            stop_tx: None,
            is_connected: Arc::new(RwLock::new(false)),
        })
    }

    fn spawn_poller<F, Fut, T>(
        &self,
        label: &'static str,
        tx: mpsc::Sender<Box<dyn Replyable>>,
        mut stop_rx: watch::Receiver<bool>,
        fetch: F,
    ) where
        F: Fn(Arc<RedditClient>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<Vec<T>, TransportError>> + Send,
        T: Replyable + 'static,
    {
        let client = Arc::clone(&self.client);
        let is_connected = Arc::clone(&self.is_connected);
        let poll_interval = tokio::time::Duration::from_secs(self.poll_interval_seconds);
        let backoff = tokio::time::Duration::from_secs(self.backoff_seconds);

        tokio::spawn(async move {
            info!("Reddit {label} poller started");
            loop {
                match fetch(Arc::clone(&client)).await {
                    Ok(items) => {
                        debug!("Fetched {} {label}s", items.len());
                        for item in items {
                            if tx.send(Box::new(item)).await.is_err() {
                                warn!("{label} stream receiver dropped, stopping poller");
                                return;
                            }
                        }
                    }
                    Err(TransportError::RateLimited) => {
                        warn!("Rate limited while polling {label}s, backing off");
                        tokio::time::sleep(backoff).await;
                    }
                    Err(e) => {
                        error!("Failed to poll {label}s: {e}");
                        tokio::time::sleep(backoff).await;
                    }
                }

                tokio::select! {
                    _ = tokio::time::sleep(poll_interval) => {}
                    _ = stop_rx.changed() => {
                        info!("Reddit {label} poller stopping");
                        *is_connected.write().await = false;
                        return;
                    }
                }
            }
        });
    }
}

#[async_trait]
impl RedditTransport for RedditConnection {
    async fn connect(&mut self) -> Result<()> {
        info!("Connecting to Reddit...");

        // Validate credentials before starting the pollers.
        self.client.bearer().await?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let (comment_tx, comment_rx) = mpsc::channel(STREAM_BUFFER);
        let (submission_tx, submission_rx) = mpsc::channel(STREAM_BUFFER);

        self.spawn_poller("comment", comment_tx, stop_rx.clone(), |client| async move {
            client.newest_comments().await
        });
        self.spawn_poller("submission", submission_tx, stop_rx, |client| async move {
            client.newest_submissions().await
        });

        self.comment_rx = Some(comment_rx);
        self.submission_rx = Some(submission_rx);
        self.stop_tx = Some(stop_tx);
        *self.is_connected.write().await = true;

        info!("Connected to Reddit");
        Ok(())
    }

    fn comment_stream(&mut self) -> Option<mpsc::Receiver<Box<dyn Replyable>>> {
        self.comment_rx.take()
    }

    fn submission_stream(&mut self) -> Option<mpsc::Receiver<Box<dyn Replyable>>> {
        self.submission_rx.take()
    }

    async fn is_connected(&self) -> bool {
        *self.is_connected.read().await
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        self.comment_rx = None;
        self.submission_rx = None;
        *self.is_connected.write().await = false;
        info!("Disconnected from Reddit");
        Ok(())
    }
}
