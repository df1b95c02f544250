// src/bot/update.rs - "try <hero>" update-request validation

use anyhow::{Context, Result};
use log::debug;
use std::sync::Arc;

use crate::bot::formatter::parse_sound_warning;
use crate::bot::text::extract;
use crate::platforms::Replyable;
use crate::store::ResponseStore;
use crate::types::{HeroId, HeroMatch, ResponseInfo};

/// A validated update request, ready for the resolver to apply.
pub struct ValidatedUpdate {
    /// The bot's prior reply, to be edited in place.
    pub parent: Box<dyn Replyable>,
    pub hero_id: HeroId,
    pub hero_name: String,
    pub link: String,
    /// Raw text of the comment the prior reply was made to; the new reply
    /// text is re-derived from it.
    pub grandparent_raw: String,
}

/// Validates the comment-tree shape and hero delta of an update request.
///
/// An update request lets the original poster re-target the bot's reply
/// at a different hero's version of the same line. Every precondition
/// must hold; any failure means "no update" and the resolver falls
/// through to its next state.
pub struct UpdateValidator {
    store: Arc<dyn ResponseStore>,
    bot_username: String,
}

impl UpdateValidator {
    pub fn new(store: Arc<dyn ResponseStore>, bot_username: String) -> Self {
        Self { store, bot_username }
    }

    /// Check an update request where `requested` is the normalized text
    /// after trigger-keyword removal.
    pub async fn validate(
        &self,
        item: &dyn Replyable,
        requested: &str,
    ) -> Result<Option<ValidatedUpdate>> {
        // The request must come from a reply in a comment tree, never a
        // submission root.
        if !item.is_comment() {
            return Ok(None);
        }

        let candidates = match self.store.hero_id_by_loose_name(requested).await? {
            HeroMatch::None => {
                debug!("Update request names no known hero: {requested}");
                return Ok(None);
            }
            HeroMatch::One(id) => vec![id],
            HeroMatch::Many(ids) => ids,
        };

        // The immediate parent must be a bot-authored reply, not a
        // submission.
        let Some(parent) = item.parent().await? else {
            return Ok(None);
        };
        if !parent.is_comment() || parent.author() != self.bot_username {
            return Ok(None);
        }

        // The root of the three-level chain must belong to the requester,
        // so strangers cannot hijack someone else's thread.
        let Some(grandparent) = parent.parent().await? else {
            return Ok(None);
        };
        if grandparent.author() != item.author() {
            debug!(
                "Update request by {} rejected: thread belongs to {}",
                item.author(),
                grandparent.author()
            );
            return Ok(None);
        }

        // An explicitly hero-tagged original reply is never silently
        // reassigned.
        let grandparent_raw = grandparent.body();
        let (original_hint, original_processed) = extract(&grandparent_raw);
        if let Some(hint) = original_hint {
            if self.hint_resolves(&hint, &original_processed).await? {
                debug!("Update request rejected: original was explicitly hero-tagged");
                return Ok(None);
            }
        }

        // Exactly one requested candidate may have a response for the
        // original line; anything else is ambiguous and rejected.
        let mut resolved: Vec<ResponseInfo> = Vec::new();
        for id in candidates {
            if let Some(info) = self.store.lookup(&original_processed, Some(id)).await? {
                resolved.push(info);
            }
        }
        if resolved.len() != 1 {
            debug!(
                "Update request for '{requested}' matched {} responses for '{original_processed}'",
                resolved.len()
            );
            return Ok(None);
        }
        let info = resolved.remove(0);

        let hero_name = self
            .store
            .hero_name(info.hero_id)
            .await?
            .context("resolved update response references an unknown hero")?;

        // A request for the hero already credited in the reply is a no-op.
        if parse_sound_warning(&parent.body()).as_deref() == Some(hero_name.as_str()) {
            debug!("Update request rejected: reply already credits {hero_name}");
            return Ok(None);
        }

        Ok(Some(ValidatedUpdate {
            parent,
            hero_id: info.hero_id,
            hero_name,
            link: info.link,
            grandparent_raw,
        }))
    }

    /// Whether a `hero::` hint resolves to at least one hero that has a
    /// response for the given normalized text.
    async fn hint_resolves(&self, hint: &str, processed_text: &str) -> Result<bool> {
        let candidates = match self.store.hero_id_by_loose_name(hint).await? {
            HeroMatch::None => return Ok(false),
            HeroMatch::One(id) => vec![id],
            HeroMatch::Many(ids) => ids,
        };

        for id in candidates {
            if self.store.lookup(processed_text, Some(id)).await?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
