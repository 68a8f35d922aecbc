//! Atom activity-stream decoding into [`ActivityEntry`] values.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use herald_core::{ActivityEntry, Author};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: AtomText,
    #[serde(default)]
    updated: Option<String>,
    // Jira repeats these elements on some entries (one object per attached
    // file); the first one describes the entry.
    #[serde(rename = "author", default)]
    authors: Vec<AtomPerson>,
    #[serde(rename = "activity:target", alias = "target", default)]
    targets: Vec<AtomActivityObject>,
    #[serde(rename = "activity:object", alias = "object", default)]
    objects: Vec<AtomActivityObject>,
}

#[derive(Debug, Default, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    body: String,
}

#[derive(Debug, Default, Deserialize)]
struct AtomPerson {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(rename = "usr:username", alias = "username", default)]
    username: Option<String>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@rel", default)]
    rel: String,
    #[serde(rename = "@href", default)]
    href: String,
    #[serde(rename = "@media:height", alias = "@height", default)]
    height: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct AtomActivityObject {
    #[serde(default)]
    title: AtomText,
}

impl AtomPerson {
    fn into_author(self) -> Author {
        let photo_url = self
            .links
            .iter()
            .filter(|link| link.rel == "photo" && !link.href.trim().is_empty())
            .max_by_key(|link| link.height.unwrap_or(0))
            .map(|link| link.href.trim().to_string());
        let display_name = self.name.trim().to_string();
        let username = self
            .username
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| display_name.clone());
        Author {
            display_name,
            username,
            email: self
                .email
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            photo_url,
        }
    }
}

impl AtomEntry {
    fn into_activity(self) -> ActivityEntry {
        ActivityEntry {
            id: self.id.trim().to_string(),
            title: self.title.body,
            updated: self.updated.as_deref().and_then(parse_atom_timestamp),
            author: self
                .authors
                .into_iter()
                .next()
                .unwrap_or_default()
                .into_author(),
            target_title: first_title(self.targets),
            object_title: first_title(self.objects),
        }
    }
}

fn first_title(objects: Vec<AtomActivityObject>) -> Option<String> {
    objects
        .into_iter()
        .next()
        .map(|object| object.title.body.trim().to_string())
}

fn parse_atom_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|value| value.with_timezone(&Utc))
}

/// Decodes an Atom activity feed, newest entry first as published.
pub fn parse_activity_feed(xml: &str) -> Result<Vec<ActivityEntry>> {
    let feed: AtomFeed =
        quick_xml::de::from_str(xml).context("failed to decode jira activity feed")?;
    Ok(feed
        .entries
        .into_iter()
        .map(AtomEntry::into_activity)
        .filter(|entry| !entry.id.is_empty())
        .collect())
}
