use std::collections::HashMap;

/// How many genres the collection overview reports.
pub const FAVOURITE_GENRE_LIMIT: usize = 3;

/// Tallies comma-separated genre tags and returns the `limit` most frequent.
///
/// Tags are kept verbatim (no trimming or case folding). Ties keep the order in
/// which tags were first seen. `None` and empty segments contribute nothing.
pub fn top_genres<'a>(tags: impl IntoIterator<Item = Option<&'a str>>, limit: usize) -> Vec<String> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for tag in tags.into_iter().flatten().flat_map(|g| g.split(',')) {
        if tag.is_empty() {
            continue;
        }
        let count = counts.entry(tag).or_insert(0);
        if *count == 0 {
            order.push(tag);
        }
        *count += 1;
    }

    // sort_by is stable, so equal counts stay in first-seen order.
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order.into_iter().take(limit).map(str::to_string).collect()
}
