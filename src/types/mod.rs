// src/types/mod.rs - Core data types for the response matching pipeline

use serde::{Deserialize, Serialize};

/// Identifier for a hero, announcer pack or special voice-line grouping.
pub type HeroId = i64;

/// A character, announcer pack or voice-line grouping that owns responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hero {
    pub id: HeroId,
    /// Canonical display name, unique.
    pub hero_name: String,
    /// Normalized form of `hero_name` used for loose name matching
    /// (filler words like "announcer" stripped).
    pub processed_name: String,
    /// Subreddit CSS flair class mapped to this hero, if any.
    /// At most one hero per flair class.
    pub flair_css: Option<String>,
}

/// One (spoken line, audio link) fact scraped from the wiki.
///
/// `processed_text` is the matching key and is not unique across heroes;
/// `response_link` is unique (the same clip is never stored twice).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEntry {
    /// The line as it appeared on the wiki. Kept for traceability only,
    /// never matched against.
    pub original_text: String,
    pub processed_text: String,
    pub response_link: String,
    pub hero_id: HeroId,
}

/// The resolved (hero, link) pair for one input text. Transient, built and
/// discarded within a single processing step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseInfo {
    pub hero_id: HeroId,
    pub link: String,
}

/// Result of loose hero-name resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeroMatch {
    /// No hero matched the name.
    None,
    /// Exactly one hero matched.
    One(HeroId),
    /// Several heroes share the processed name; the caller must
    /// disambiguate against the body text.
    Many(Vec<HeroId>),
}

/// The single action the resolver took for one replyable, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyAction {
    /// A new reply was posted under the replyable.
    Posted { text: String },
    /// An existing bot reply (identified by fullname) was edited in place.
    Edited { target: String, text: String },
}
