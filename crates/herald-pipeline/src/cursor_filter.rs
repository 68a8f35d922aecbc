use herald_core::ActivityEntry;

/// Keeps the entries newer than `last_seen` and returns them oldest first.
///
/// `entries` is newest first as the feed publishes it. Scanning stops at the
/// entry whose id equals `last_seen`; that entry and everything older are
/// dropped. An empty or absent cursor, or one that fell out of the fetched
/// window, treats every entry as new.
pub fn filter_new_activities(
    entries: Vec<ActivityEntry>,
    last_seen: Option<&str>,
) -> Vec<ActivityEntry> {
    let last_seen = last_seen.filter(|id| !id.is_empty());
    let mut unseen = entries
        .into_iter()
        .take_while(|entry| Some(entry.id.as_str()) != last_seen)
        .collect::<Vec<_>>();
    unseen.reverse();
    unseen
}
