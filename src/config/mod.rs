// src/config/mod.rs - Runtime configuration and curated matching rules

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::Path;

/// Attribution block appended to every reply.
const DEFAULT_FOOTER: &str = "\n\n---\nBleep bloop, I am a robot.\n\n\
[*^(Source)*](https://github.com/notarikon-nz/dotaresponses) *^(|)* \
[*^(Suggestions/Issues)*](https://github.com/notarikon-nz/dotaresponses/issues)";

/// Runtime settings loaded from the environment.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
    pub subreddit: String,
    /// Seconds between poll passes over the comment/submission listings.
    pub poll_interval_seconds: u64,
    /// Fixed sleep after a transport failure before re-establishing streams.
    pub backoff_seconds: u64,
    pub cache_capacity: usize,
    pub cache_ttl_days: i64,
    /// Path of the JSON seed produced by the offline scrape job.
    pub responses_path: String,
    /// Path of the YAML rules file (denylist, custom responses, footer).
    pub rules_path: String,
}

impl BotConfig {
    /// Load bot configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let client_id = env::var("REDDIT_CLIENT_ID")
            .context("REDDIT_CLIENT_ID environment variable not set")?;
        let client_secret = env::var("REDDIT_CLIENT_SECRET")
            .context("REDDIT_CLIENT_SECRET environment variable not set")?;
        let username = env::var("REDDIT_USERNAME")
            .context("REDDIT_USERNAME environment variable not set")?;
        let password = env::var("REDDIT_PASSWORD")
            .context("REDDIT_PASSWORD environment variable not set")?;

        let subreddit = env::var("SUBREDDIT").unwrap_or_else(|_| "dota2".to_string());
        let user_agent = env::var("USER_AGENT").unwrap_or_else(|_| {
            format!("dotaresponses/{} (hero response reply bot)", env!("CARGO_PKG_VERSION"))
        });

        let config = Self {
            client_id,
            client_secret,
            username,
            password,
            user_agent,
            subreddit,
            poll_interval_seconds: env_parsed("POLL_INTERVAL_SECONDS", 15)?,
            backoff_seconds: env_parsed("BACKOFF_SECONDS", 60)?,
            cache_capacity: env_parsed("CACHE_CAPACITY", 10_000)?,
            cache_ttl_days: env_parsed("CACHE_TTL_DAYS", 5)?,
            responses_path: env::var("RESPONSES_PATH")
                .unwrap_or_else(|_| "config/responses.json".to_string()),
            rules_path: env::var("RULES_PATH").unwrap_or_else(|_| "config/rules.yaml".to_string()),
        };

        info!(
            "Loaded bot config for u/{} on r/{}",
            config.username, config.subreddit
        );
        Ok(config)
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{name} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

/// A canned reply fired when the normalized text exactly matches one of
/// its triggers. The template may reference `{original_text}` and
/// `{footer}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomResponse {
    pub triggers: Vec<String>,
    pub template: String,
}

impl CustomResponse {
    pub fn render(&self, original_text: &str, footer: &str) -> String {
        self.template
            .replace("{original_text}", original_text)
            .replace("{footer}", footer)
    }
}

/// Curated matching rules: denylist, custom responses, trigger keyword and
/// reply footer. Shipped with defaults and overridable via a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Keyword starting an update request, without the trailing space.
    pub update_trigger: String,
    pub comment_footer: String,
    pub excluded_responses: Vec<String>,
    pub custom_responses: Vec<CustomResponse>,
}

impl RulesConfig {
    /// Load rules from a YAML file, writing the defaults there first when
    /// the file does not exist yet.
    pub async fn load_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            warn!("Rules file {} missing, writing defaults", path.display());
            let defaults = Self::default();
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            let rendered =
                serde_yaml::to_string(&defaults).context("failed to serialize default rules")?;
            tokio::fs::write(path, rendered)
                .await
                .with_context(|| format!("failed to write default rules to {}", path.display()))?;
            return Ok(defaults);
        }

        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read rules file {}", path.display()))?;
        let rules: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse rules file {}", path.display()))?;
        info!(
            "Loaded {} denylist entries and {} custom responses from {}",
            rules.excluded_responses.len(),
            rules.custom_responses.len(),
            path.display()
        );
        Ok(rules)
    }

    /// Denylist as a set for exclusion checks.
    pub fn denylist(&self) -> HashSet<String> {
        self.excluded_responses.iter().cloned().collect()
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            update_trigger: "try".to_string(),
            comment_footer: DEFAULT_FOOTER.to_string(),
            excluded_responses: DEFAULT_EXCLUDED_RESPONSES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            custom_responses: vec![CustomResponse {
                triggers: vec![
                    "one of my favourites".to_string(),
                    "one of my favorites".to_string(),
                ],
                template: "[One of my favorites!]\
                           (https://static.wikia.nocookie.net/dota2_gamepedia/images/b/b6/Invo_ability_invoke_01.mp3) \
                           (sound warning: Invoker){footer}"
                    .to_string(),
            }],
        }
    }
}

/// Phrases that collide with ordinary conversation: item and hero names,
/// common English phrases, and previously reported false positives.
/// Stored in normalized form.
const DEFAULT_EXCLUDED_RESPONSES: &[&str] = &[
    "thank you", "why not", "glimmer cape", "hood of defiance",
    "mask of madness", "force staff", "armlet of mordiggian",
    "helm of the dominator", "veil of discord", "shadow blade", "blade mail",
    "urn of shadows", "skull basher", "battle fury", "crimson guard",
    "eul s scepter", "eul s scepter of divinity", "scepter of divinity",
    "ethereal blade", "black king bar", "diffusal blade", "lotus orb",
    "silver edge", "solar crest", "medallion of courage", "rod of atos",
    "shiva s guard", "heaven s halberd", "sange and yasha", "monkey king bar",
    "orchid malevolence", "drum of endurance", "aghanim s scepter",
    "manta style", "eye of skadi", "hand of midas", "vladimir s offering",
    "refresher orb", "linken s sphere", "assault cuirass", "divine rapier",
    "scythe of vyse", "sheep stick", "pipe of insight", "boots of travel",
    "blink dagger", "moon shard", "guardian greaves", "octarine core",
    "heart of tarrasque", "abyssal blade", "abyssal underlord",
    "ancient apparition", "anti mage", "bounty hunter", "centaur warrunner",
    "chaos knight", "crystal maiden", "dark seer", "death prophet",
    "dragon knight", "drow ranger", "earth spirit", "earth shaker",
    "elder titan", "ember spirit", "faceless void", "keeper of the light",
    "legion commander", "lone druid", "naga siren", "nature s prophet",
    "night stalker", "nyx assassin", "ogre magi",
    "outworld destroyer", "phantom assassin", "phantom lancer", "queen of pain",
    "sand king", "shadow demon", "shadow fiend", "skywrath mage",
    "skeleton king", "spirit breaker", "storm spirit", "templar assassin",
    "treant protector", "troll warlord", "vengeful spirit", "winter wyvern",
    "witch doctor", "wraith king", "i agree", "my bad", "ha ha",
    "fair enough", "no way", "you re welcome", "very nice", "of course",
    "well deserved", "try again", "it worked", "nice try", "seems fair",
    "that s right", "thank god", "thank you so much", "well said", "holy shit",
    "so beautiful", "try harder", "go outside", "arc warden", "he he he",
    "pit lord", "shut up", "how so", "hey now", "much appreciated",
    "i don t think so", "i know right", "it begins", "too soon", "well done",
    "i like it", "are you okay", "ah nice", "about time", "very good",
    "are you kidding me", "at last", "got it", "what happened", "oh boy",
    "nice one", "i am", "exactly so", "aphotic shield", "ghost scepter",
    "outworld devourer", "shadow shaman",
];

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_rules_contents() {
        let rules = RulesConfig::default();
        assert_eq!(rules.update_trigger, "try");
        assert!(rules.denylist().contains("blink dagger"));
        assert!(!rules.custom_responses.is_empty());
    }

    #[test]
    fn test_custom_response_render() {
        let custom = CustomResponse {
            triggers: vec!["shitty wizard".to_string()],
            template: "[{original_text}](link) (sound warning: Razor){footer}".to_string(),
        };
        assert_eq!(
            custom.render("Shitty wizard!", "\n\nfooter"),
            "[Shitty wizard!](link) (sound warning: Razor)\n\nfooter"
        );
    }

    #[tokio::test]
    async fn test_load_or_create_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rules.yaml");

        // First load writes the defaults.
        let created = RulesConfig::load_or_create(&path).await.unwrap();
        assert!(path.exists());

        // Second load parses them back identically.
        let loaded = RulesConfig::load_or_create(&path).await.unwrap();
        assert_eq!(loaded.update_trigger, created.update_trigger);
        assert_eq!(loaded.excluded_responses, created.excluded_responses);
        assert_eq!(loaded.comment_footer, created.comment_footer);
    }
}
