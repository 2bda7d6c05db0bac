use std::collections::HashSet;

use crate::model::ContentItem;

/// Most items a snapshot will ever hold.
pub const MAX_RESULTS: usize = 25;
/// Characters of normalized title used to detect near-duplicates.
pub const DEDUP_KEY_LEN: usize = 40;

/// Lower-case the title, drop everything that isn't a letter or digit and
/// keep the first `DEDUP_KEY_LEN` characters.
///
/// Letters and digits from any script are kept, not just ASCII, so titles in
/// Malayalam or Hindi still produce distinct keys instead of collapsing to an
/// empty one.
pub fn dedup_key(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .take(DEDUP_KEY_LEN)
        .collect()
}

/// Drop near-duplicates (first seen wins), order newest first and cap the list.
///
/// The sort is stable, so items with equal timestamps keep their arrival order.
pub fn dedup_and_rank(items: Vec<ContentItem>) -> Vec<ContentItem> {
    let mut seen = HashSet::new();
    let mut ranked: Vec<ContentItem> = items
        .into_iter()
        .filter(|item| seen.insert(dedup_key(&item.title)))
        .collect();

    ranked.sort_by(|a, b| b.date.cmp(&a.date));
    ranked.truncate(MAX_RESULTS);
    ranked
}
