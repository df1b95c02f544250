// src/bot/resolver.rs - Reply resolution state machine

use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::HashSet;
use std::sync::Arc;

use crate::bot::exclusion::is_excluded;
use crate::bot::formatter::format_reply;
use crate::bot::text::{display_text, extract};
use crate::bot::update::{UpdateValidator, ValidatedUpdate};
use crate::cache::ReplyCache;
use crate::config::RulesConfig;
use crate::platforms::Replyable;
use crate::store::ResponseStore;
use crate::types::{HeroMatch, ReplyAction, ResponseInfo};

/// Turns one observed replyable into at most one reply or edit.
///
/// States are evaluated in strict priority order and the first match
/// wins: already processed, self-authored, excluded, custom canned
/// response, hero-tagged response, flair-scoped response, update request,
/// generic response. A replyable is marked processed before anything else
/// so a crash mid-item results in a missed reply rather than a duplicate.
pub struct ReplyResolver {
    store: Arc<dyn ResponseStore>,
    cache: Arc<dyn ReplyCache>,
    rules: RulesConfig,
    denylist: HashSet<String>,
    bot_username: String,
    update_validator: UpdateValidator,
}

impl ReplyResolver {
    pub fn new(
        store: Arc<dyn ResponseStore>,
        cache: Arc<dyn ReplyCache>,
        rules: RulesConfig,
        bot_username: String,
    ) -> Self {
        let denylist = rules.denylist();
        let update_validator = UpdateValidator::new(Arc::clone(&store), bot_username.clone());
        Self {
            store,
            cache,
            rules,
            denylist,
            bot_username,
            update_validator,
        }
    }

    /// Evaluate one replyable and perform the resulting action, if any.
    pub async fn resolve(&self, item: &dyn Replyable) -> Result<Option<ReplyAction>> {
        let fullname = item.fullname();

        if self.cache.exists_and_mark(&fullname).await? {
            return Ok(None);
        }

        if item.author() == self.bot_username {
            return Ok(None);
        }

        let raw = item.body();
        let (hero_hint, processed) = extract(&raw);

        if is_excluded(&processed, &self.denylist) {
            debug!("Excluded text from {fullname}: '{processed}'");
            return Ok(None);
        }

        if let Some(custom) = self.matching_custom_response(&processed) {
            let text = custom.render(&display_text(&raw), &self.rules.comment_footer);
            item.reply(&text).await?;
            info!("Added custom response to {fullname}");
            return Ok(Some(ReplyAction::Posted { text }));
        }

        if let Some(hint) = hero_hint {
            if let Some(info) = self.hero_tagged_response(&hint, &processed).await? {
                return self.post(item, &raw, info).await.map(Some);
            }
        }

        if let Some(info) = self.flair_scoped_response(item, &processed).await? {
            return self.post(item, &raw, info).await.map(Some);
        }

        let trigger = format!("{} ", self.rules.update_trigger);
        if let Some(requested) = processed.strip_prefix(&trigger) {
            if let Some(update) = self.update_validator.validate(item, requested).await? {
                return self.apply_update(update).await.map(Some);
            }
        }

        if let Some(info) = self.store.lookup(&processed, None).await? {
            return self.post(item, &raw, info).await.map(Some);
        }

        Ok(None)
    }

    fn matching_custom_response(&self, processed: &str) -> Option<&crate::config::CustomResponse> {
        self.rules
            .custom_responses
            .iter()
            .find(|custom| custom.triggers.iter().any(|t| t == processed))
    }

    /// Resolve an explicit `hero::text` reference. Ambiguity is never
    /// guessed away: with several loose candidates, exactly one must have
    /// a response for the text.
    async fn hero_tagged_response(
        &self,
        hint: &str,
        processed: &str,
    ) -> Result<Option<ResponseInfo>> {
        let candidates = match self.store.hero_id_by_loose_name(hint).await? {
            HeroMatch::None => {
                debug!("Hero hint matched nothing: {hint}");
                return Ok(None);
            }
            HeroMatch::One(id) => vec![id],
            HeroMatch::Many(ids) => ids,
        };

        let mut found: Vec<ResponseInfo> = Vec::new();
        for id in candidates {
            if let Some(info) = self.store.lookup(processed, Some(id)).await? {
                found.push(info);
            }
        }

        match found.len() {
            1 => Ok(found.pop()),
            0 => Ok(None),
            n => {
                debug!("Ambiguous hero hint '{hint}' for '{processed}': {n} candidates");
                Ok(None)
            }
        }
    }

    /// Scope the lookup to the commenter's flaired hero, when the flair
    /// CSS class maps to one.
    async fn flair_scoped_response(
        &self,
        item: &dyn Replyable,
        processed: &str,
    ) -> Result<Option<ResponseInfo>> {
        let Some(css) = item.author_flair_css_class() else {
            return Ok(None);
        };
        let Some(hero_id) = self.store.hero_id_by_flair(&css).await? else {
            return Ok(None);
        };
        self.store.lookup(processed, Some(hero_id)).await
    }

    async fn post(
        &self,
        item: &dyn Replyable,
        raw: &str,
        info: ResponseInfo,
    ) -> Result<ReplyAction> {
        let hero_name = self
            .store
            .hero_name(info.hero_id)
            .await?
            .context("response references an unknown hero")?;

        let text = format_reply(
            &display_text(raw),
            &info.link,
            &hero_name,
            &self.rules.comment_footer,
        );
        item.reply(&text).await?;
        info!("Added response to {}: {} ({})", item.fullname(), info.link, hero_name);

        Ok(ReplyAction::Posted { text })
    }

    async fn apply_update(&self, update: ValidatedUpdate) -> Result<ReplyAction> {
        let text = format_reply(
            &display_text(&update.grandparent_raw),
            &update.link,
            &update.hero_name,
            &self.rules.comment_footer,
        );
        update.parent.edit(&text).await?;

        let target = update.parent.fullname();
        info!("Edited reply {target} to credit {}", update.hero_name);
        Ok(ReplyAction::Edited { target, text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::formatter::parse_sound_warning;
    use crate::bot::testutil::MockReplyable;
    use crate::cache::MemoryCache;
    use crate::store::MemoryStore;

    const BOT: &str = "response-bot";

    async fn store_with_lines() -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        store
            .add_hero_and_responses(
                "Axe",
                Some("flair-axe"),
                &[
                    ("EZ game!".to_string(), "https://a/axe_ez.mp3".to_string()),
                    ("Shitty wizard!".to_string(), "https://a/axe_wiz.mp3".to_string()),
                ],
            )
            .await
            .unwrap();
        store
            .add_hero_and_responses(
                "Sven",
                Some("flair-sven"),
                &[("EZ game!".to_string(), "https://a/sven_ez.mp3".to_string())],
            )
            .await
            .unwrap();
        store
            .add_hero_and_responses(
                "Pudge",
                None,
                &[("Fresh meat!".to_string(), "https://a/pudge_meat.mp3".to_string())],
            )
            .await
            .unwrap();
        Arc::new(store)
    }

    async fn resolver() -> ReplyResolver {
        let store = store_with_lines().await;
        ReplyResolver::new(
            store,
            Arc::new(MemoryCache::default()),
            RulesConfig::default(),
            BOT.to_string(),
        )
    }

    #[tokio::test]
    async fn test_generic_response_posted() {
        let resolver = resolver().await;
        let comment = MockReplyable::comment("t1_a", "user", "Fresh meat!");

        let action = resolver.resolve(&comment).await.unwrap().unwrap();
        match action {
            ReplyAction::Posted { text } => {
                assert!(text.starts_with("[Fresh meat!](https://a/pudge_meat.mp3)"));
                assert_eq!(parse_sound_warning(&text).as_deref(), Some("Pudge"));
            }
            other => panic!("expected Posted, got {other:?}"),
        }
        assert_eq!(comment.replies().len(), 1);
    }

    #[tokio::test]
    async fn test_dedup_suppresses_second_pass() {
        let resolver = resolver().await;
        let comment = MockReplyable::comment("t1_a", "user", "Fresh meat!");

        assert!(resolver.resolve(&comment).await.unwrap().is_some());
        // Same fullname again, as after a restart.
        assert!(resolver.resolve(&comment).await.unwrap().is_none());
        assert_eq!(comment.replies().len(), 1);
    }

    #[tokio::test]
    async fn test_self_authored_is_skipped() {
        let resolver = resolver().await;
        let comment = MockReplyable::comment("t1_a", BOT, "Fresh meat!");
        assert!(resolver.resolve(&comment).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_single_word_and_denylist_are_skipped() {
        let resolver = resolver().await;

        let single = MockReplyable::comment("t1_a", "user", "EZ!!!");
        assert!(resolver.resolve(&single).await.unwrap().is_none());

        let denied = MockReplyable::comment("t1_b", "user", "Blink Dagger");
        assert!(resolver.resolve(&denied).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_custom_response_is_terminal() {
        let resolver = resolver().await;
        let comment = MockReplyable::comment("t1_a", "user", "one of my favourites");

        let action = resolver.resolve(&comment).await.unwrap().unwrap();
        match action {
            ReplyAction::Posted { text } => {
                assert_eq!(parse_sound_warning(&text).as_deref(), Some("Invoker"));
            }
            other => panic!("expected Posted, got {other:?}"),
        }
        assert_eq!(comment.replies().len(), 1);
    }

    #[tokio::test]
    async fn test_hero_tagged_scopes_to_named_hero() {
        let resolver = resolver().await;
        // Both Axe and Sven have the line; the tag must pin it to Axe.
        for i in 0..20 {
            let comment =
                MockReplyable::comment(&format!("t1_{i}"), "user", "axe::EZ game!");
            let action = resolver.resolve(&comment).await.unwrap().unwrap();
            match action {
                ReplyAction::Posted { text } => {
                    assert_eq!(parse_sound_warning(&text).as_deref(), Some("Axe"));
                    assert!(text.contains("https://a/axe_ez.mp3"));
                }
                other => panic!("expected Posted, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_flair_takes_priority_over_generic() {
        let resolver = resolver().await;
        for i in 0..20 {
            let comment = MockReplyable::comment(&format!("t1_{i}"), "user", "EZ game!")
                .with_flair("flair-sven");
            let action = resolver.resolve(&comment).await.unwrap().unwrap();
            match action {
                ReplyAction::Posted { text } => {
                    assert_eq!(parse_sound_warning(&text).as_deref(), Some("Sven"));
                }
                other => panic!("expected Posted, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_generic_tie_break_randomness() {
        let resolver = resolver().await;
        let mut seen = std::collections::HashSet::new();

        for i in 0..200 {
            let comment = MockReplyable::comment(&format!("t1_{i}"), "user", "EZ game!");
            let action = resolver.resolve(&comment).await.unwrap().unwrap();
            let ReplyAction::Posted { text } = action else {
                panic!("expected Posted");
            };
            let hero = parse_sound_warning(&text).unwrap();
            assert!(hero == "Axe" || hero == "Sven", "unexpected hero {hero}");
            seen.insert(hero);
        }
        assert_eq!(seen.len(), 2, "both heroes should appear over many trials");
    }

    #[tokio::test]
    async fn test_submission_title_is_matched() {
        let resolver = resolver().await;
        let submission = MockReplyable::submission("t3_a", "user", "Fresh meat!");
        assert!(resolver.resolve(&submission).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_request_edits_prior_reply() {
        let resolver = resolver().await;

        let root = MockReplyable::comment("t1_root", "op", "EZ game!");
        let bot_reply = root.child(
            "t1_bot",
            BOT,
            "[EZ game!](https://a/axe_ez.mp3) (sound warning: Axe)",
        );
        let request = bot_reply.child("t1_req", "op", "try Sven");

        let action = resolver.resolve(&request).await.unwrap().unwrap();
        match action {
            ReplyAction::Edited { target, text } => {
                assert_eq!(target, "t1_bot");
                assert_eq!(parse_sound_warning(&text).as_deref(), Some("Sven"));
                assert!(text.contains("https://a/sven_ez.mp3"));
                assert!(text.starts_with("[EZ game!]"));
            }
            other => panic!("expected Edited, got {other:?}"),
        }
        assert_eq!(bot_reply.edits().len(), 1);
    }

    #[tokio::test]
    async fn test_update_request_rejected_for_stranger() {
        let resolver = resolver().await;

        let root = MockReplyable::comment("t1_root", "op", "EZ game!");
        let bot_reply = root.child(
            "t1_bot",
            BOT,
            "[EZ game!](https://a/axe_ez.mp3) (sound warning: Axe)",
        );
        let request = bot_reply.child("t1_req", "someone-else", "try Sven");

        assert!(resolver.resolve(&request).await.unwrap().is_none());
        assert!(bot_reply.edits().is_empty());
    }

    #[tokio::test]
    async fn test_update_request_same_hero_is_noop() {
        let resolver = resolver().await;

        let root = MockReplyable::comment("t1_root", "op", "EZ game!");
        let bot_reply = root.child(
            "t1_bot",
            BOT,
            "[EZ game!](https://a/axe_ez.mp3) (sound warning: Axe)",
        );
        let request = bot_reply.child("t1_req", "op", "try Axe");

        assert!(resolver.resolve(&request).await.unwrap().is_none());
        assert!(bot_reply.edits().is_empty());
    }

    #[tokio::test]
    async fn test_update_request_rejected_for_tagged_original() {
        let resolver = resolver().await;

        // The original explicitly asked for Axe; it must not be reassigned.
        let root = MockReplyable::comment("t1_root", "op", "axe::EZ game!");
        let bot_reply = root.child(
            "t1_bot",
            BOT,
            "[EZ game!](https://a/axe_ez.mp3) (sound warning: Axe)",
        );
        let request = bot_reply.child("t1_req", "op", "try Sven");

        assert!(resolver.resolve(&request).await.unwrap().is_none());
        assert!(bot_reply.edits().is_empty());
    }

    #[tokio::test]
    async fn test_update_request_requires_known_line() {
        let resolver = resolver().await;

        // Sven has no "fresh meat" response, so the request falls through
        // and the generic state finds nothing new to say on "try sven".
        let root = MockReplyable::comment("t1_root", "op", "Fresh meat!");
        let bot_reply = root.child(
            "t1_bot",
            BOT,
            "[Fresh meat!](https://a/pudge_meat.mp3) (sound warning: Pudge)",
        );
        let request = bot_reply.child("t1_req", "op", "try Sven");

        assert!(resolver.resolve(&request).await.unwrap().is_none());
        assert!(bot_reply.edits().is_empty());
    }
}
