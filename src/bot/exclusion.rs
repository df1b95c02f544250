// src/bot/exclusion.rs - Pre-lookup exclusion filter

use std::collections::HashSet;

/// Check whether normalized text should be rejected before any store
/// lookup is attempted.
///
/// Single-word utterances are overwhelmingly false positives ("no",
/// "yes", "lol"), so anything without a space is excluded. The denylist
/// holds curated phrases (item names, common English phrases, reported
/// false positives) and is matched after normalization so case and
/// punctuation variants are caught uniformly.
pub fn is_excluded(normalized: &str, denylist: &HashSet<String>) -> bool {
    normalized.is_empty() || !normalized.contains(' ') || denylist.contains(normalized)
}
