// src/bot/formatter.rs - Reply text construction and parse-back

use regex::Regex;
use std::sync::OnceLock;

/// Build the literal reply body for a resolved response.
///
/// The `[text](link) (sound warning: hero)` shape is load-bearing: the
/// update-request validator parses the credited hero back out of prior
/// replies with [`parse_sound_warning`], so the marker must stay a literal
/// substring of every posted reply.
pub fn format_reply(original_text: &str, link: &str, hero_name: &str, footer: &str) -> String {
    format!("[{original_text}]({link}) (sound warning: {hero_name}){footer}")
}

/// Extract the hero name credited in a previously posted reply, if the
/// text carries the `(sound warning: X)` marker.
pub fn parse_sound_warning(reply_text: &str) -> Option<String> {
    static SOUND_WARNING: OnceLock<Regex> = OnceLock::new();
    let re = SOUND_WARNING
        .get_or_init(|| Regex::new(r"\(sound warning: (.+?)\)").expect("valid regex"));

    re.captures(reply_text)
        .map(|caps| caps[1].to_string())
}
