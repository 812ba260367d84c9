//! Free-text metric identification.
//!
//! Maps a question such as "what was the gross margin?" to canonical ids by
//! phrase lookup over ids and aliases. Phrases match on whole words only.

use crate::domain::registry::MetricRegistry;

const PERCENT_WORDS: [&str; 3] = ["percent", "percentage", "%"];

fn normalize_text(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| *c != '\'')
        .map(|c| if ".,;:?!".contains(c) { ' ' } else { c })
        .collect();
    let spaced = cleaned.replace('%', " % ");
    format!(" {} ", spaced.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn phrase(name: &str) -> String {
    format!(" {} ", name.replace('_', " "))
}

/// Canonical ids mentioned in `text`: id matches in registration order, then
/// alias matches. No duplicates, no fuzzy matching.
pub fn identify_metrics(registry: &MetricRegistry, text: &str) -> Vec<String> {
    let text = normalize_text(text);
    let wants_percent = PERCENT_WORDS.iter().any(|w| text.contains(&format!(" {w} ")));

    let mentions = |name: &str| {
        if text.contains(&phrase(name)) {
            return true;
        }
        wants_percent
            && name
                .strip_suffix("_pct")
                .is_some_and(|base| text.contains(&phrase(base)))
    };

    let mut found: Vec<String> = Vec::new();
    for def in registry.all() {
        if mentions(&def.id) {
            found.push(def.id.clone());
        }
    }
    for (alias, canonical) in registry.aliases() {
        if mentions(&alias.to_lowercase()) && !found.iter().any(|f| f == canonical) {
            found.push(canonical.to_string());
        }
    }
    found
}
