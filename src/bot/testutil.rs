// src/bot/testutil.rs - Replyable test double for pipeline tests

use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::platforms::Replyable;

struct MockNode {
    fullname: String,
    author: String,
    body: String,
    flair: Option<String>,
    is_comment: bool,
    parent: Option<Arc<MockNode>>,
    replies: Mutex<Vec<String>>,
    edits: Mutex<Vec<String>>,
}

/// In-memory comment/submission standing in for the Reddit transport.
/// Parent chains are shared, so edits recorded through a child's
/// `parent()` handle are visible on the original.
#[derive(Clone)]
pub struct MockReplyable(Arc<MockNode>);

impl MockReplyable {
    pub fn comment(fullname: &str, author: &str, body: &str) -> Self {
        Self::node(fullname, author, body, true, None)
    }

    pub fn submission(fullname: &str, author: &str, title: &str) -> Self {
        Self::node(fullname, author, title, false, None)
    }

    /// A comment replying to this one.
    pub fn child(&self, fullname: &str, author: &str, body: &str) -> Self {
        Self::node(fullname, author, body, true, Some(Arc::clone(&self.0)))
    }

    pub fn with_flair(self, css: &str) -> Self {
        let node = MockNode {
            flair: Some(css.to_string()),
            fullname: self.0.fullname.clone(),
            author: self.0.author.clone(),
            body: self.0.body.clone(),
            is_comment: self.0.is_comment,
            parent: self.0.parent.clone(),
            replies: Mutex::new(Vec::new()),
            edits: Mutex::new(Vec::new()),
        };
        Self(Arc::new(node))
    }

    pub fn replies(&self) -> Vec<String> {
        self.0.replies.lock().unwrap().clone()
    }

    pub fn edits(&self) -> Vec<String> {
        self.0.edits.lock().unwrap().clone()
    }

    fn node(
        fullname: &str,
        author: &str,
        body: &str,
        is_comment: bool,
        parent: Option<Arc<MockNode>>,
    ) -> Self {
        Self(Arc::new(MockNode {
            fullname: fullname.to_string(),
            author: author.to_string(),
            body: body.to_string(),
            flair: None,
            is_comment,
            parent,
            replies: Mutex::new(Vec::new()),
            edits: Mutex::new(Vec::new()),
        }))
    }
}

#[async_trait]
impl Replyable for MockReplyable {
    fn fullname(&self) -> String {
        self.0.fullname.clone()
    }

    fn author(&self) -> String {
        self.0.author.clone()
    }

    fn body(&self) -> String {
        self.0.body.clone()
    }

    fn author_flair_css_class(&self) -> Option<String> {
        self.0.flair.clone()
    }

    fn is_comment(&self) -> bool {
        self.0.is_comment
    }

    async fn parent(&self) -> Result<Option<Box<dyn Replyable>>> {
        Ok(self
            .0
            .parent
            .clone()
            .map(|node| Box::new(MockReplyable(node)) as Box<dyn Replyable>))
    }

    async fn reply(&self, text: &str) -> Result<()> {
        self.0.replies.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn edit(&self, text: &str) -> Result<()> {
        self.0.edits.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
