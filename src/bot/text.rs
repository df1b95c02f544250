// src/bot/text.rs - Text normalization and quote/directive extraction

/// Separator between an explicit hero hint and the quoted line,
/// e.g. "axe::ez mid".
pub const HERO_SEPARATOR: &str = "::";

/// Filler words stripped when deriving a hero's processed name. Order
/// matters: longer phrases first so "announcer pack" is removed before
/// "announcer" would leave "pack" behind.
const HERO_FILLER_WORDS: &[&str] = &[
    "announcer pack",
    "announcer",
    "mega kills",
    "voice of",
    "bundle",
];

/// Canonicalize raw text into the matching key.
///
/// Every character that is neither alphanumeric nor a space becomes a
/// space (this folds punctuation and all whitespace variants uniformly),
/// runs of spaces collapse into one, the result is trimmed and lowercased.
/// Pure and deterministic; empty or punctuation-only input yields the
/// empty string, which callers must treat as not matchable.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_space = true;

    for c in raw.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }

    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Pull the quoted paragraph and the optional `hero::` hint out of raw
/// text, returning `(hero_hint, normalized_body)`.
///
/// If any paragraph (split on blank lines) starts with a Markdown
/// blockquote marker `>`, the first such paragraph replaces the whole text
/// as the body to evaluate. A `::` in the body splits off an explicit hero
/// name hint on its first occurrence.
pub fn extract(raw: &str) -> (Option<String>, String) {
    let body = quoted_body(raw).unwrap_or(raw);

    match body.split_once(HERO_SEPARATOR) {
        Some((hint, rest)) => {
            let hint = hint.trim();
            let hint = (!hint.is_empty()).then(|| hint.to_string());
            (hint, normalize(rest))
        }
        None => (None, normalize(body)),
    }
}

/// The text quoted back at the user in a reply: the same quote selection
/// and `hero::` prefix stripping as `extract`, without normalization.
pub fn display_text(raw: &str) -> String {
    let body = quoted_body(raw).unwrap_or(raw);

    match body.split_once(HERO_SEPARATOR) {
        Some((_, rest)) => rest.trim().to_string(),
        None => body.trim().to_string(),
    }
}

/// First blockquoted paragraph of the text, with the leading `>` stripped,
/// or `None` when no paragraph is quoted.
fn quoted_body(raw: &str) -> Option<&str> {
    raw.split("\n\n")
        .map(str::trim)
        .find_map(|paragraph| paragraph.strip_prefix('>'))
        .map(str::trim)
}

/// Derive the loose-matching form of a hero name: normalized, with filler
/// words like "announcer" and "bundle" removed. Used both when storing
/// `Hero::processed_name` and when resolving free-text hero references.
pub fn processed_hero_name(name: &str) -> String {
    let mut processed = normalize(name);
    for filler in HERO_FILLER_WORDS {
        if let Some(pos) = processed.find(filler) {
            processed.replace_range(pos..pos + filler.len(), " ");
        }
    }
    normalize(&processed)
}
