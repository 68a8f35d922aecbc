//! One relay pass: fetch, filter, enrich, resolve avatars, match, post, and
//! advance the cursor.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use herald_config::{CompiledTrigger, LoadedConfig, SlackUserOverride};
use herald_core::{BlobStore, ChatTransport, FeedReader, IssueLookup, StateStore};
use serde::Serialize;
use tracing::{info, info_span, Span};

use crate::{
    filter_new_activities, AvatarResolver, IssueEnricher, TextNormalizer, TriggerMatcher,
};

/// External systems a relay pass talks to.
#[derive(Clone)]
pub struct RelayCollaborators {
    pub feed: Arc<dyn FeedReader>,
    pub issues: Arc<dyn IssueLookup>,
    pub chat: Arc<dyn ChatTransport>,
    pub blobs: Arc<dyn BlobStore>,
    pub state: Arc<dyn StateStore>,
}

#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub max_activity_lookup: usize,
    pub concurrent_issue_lookups: usize,
    pub triggers: Vec<CompiledTrigger>,
    pub sender_overrides: BTreeMap<String, SlackUserOverride>,
}

impl From<&LoadedConfig> for RelaySettings {
    fn from(config: &LoadedConfig) -> Self {
        Self {
            max_activity_lookup: config.document.atlassian.max_activity_lookup,
            concurrent_issue_lookups: config.document.atlassian.concurrent_issue_lookups,
            triggers: config.triggers.clone(),
            sender_overrides: config.document.slack.users.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Counters for one relay pass.
pub struct RelayReport {
    pub fetched: usize,
    pub new_activities: usize,
    pub enriched: usize,
    pub avatars_resolved: usize,
    pub messages_posted: usize,
    /// Cursor after the pass; unchanged from the stored value when nothing
    /// new was found.
    pub cursor: Option<String>,
}

pub struct ActivityRelay {
    collaborators: RelayCollaborators,
    settings: RelaySettings,
    normalizer: TextNormalizer,
    span: Span,
}

impl ActivityRelay {
    pub fn new(
        collaborators: RelayCollaborators,
        settings: RelaySettings,
        span: Span,
    ) -> Result<Self> {
        let normalizer = TextNormalizer::new().context("failed to compile title normalizer")?;
        Ok(Self {
            collaborators,
            settings,
            normalizer,
            span,
        })
    }

    /// Runs one pass. Feed, chat and cursor failures abort the pass before the
    /// cursor moves, so undelivered activity is retried next run. Issue and
    /// avatar failures only drop the affected items.
    pub async fn run_once(&self) -> Result<RelayReport> {
        let run_span = info_span!(parent: &self.span, "relay_run");
        let collaborators = &self.collaborators;

        let last_seen = collaborators
            .state
            .get_cursor()
            .await
            .context("failed to read relay cursor")?;
        let entries = collaborators
            .feed
            .fetch_new_entries(self.settings.max_activity_lookup)
            .await
            .context("failed to fetch activity feed")?;
        let fetched = entries.len();

        let activities = filter_new_activities(entries, last_seen.as_deref());
        info!(
            parent: &run_span,
            fetched,
            new_activities = activities.len(),
            last_seen = last_seen.as_deref().unwrap_or(""),
            "found new activities since last cursor"
        );
        let Some(newest_id) = activities.last().map(|entry| entry.id.clone()) else {
            return Ok(RelayReport {
                fetched,
                cursor: last_seen,
                ..RelayReport::default()
            });
        };

        let enricher = IssueEnricher::new(
            Arc::clone(&collaborators.issues),
            self.settings.concurrent_issue_lookups,
            run_span.clone(),
        );
        let mut enriched = enricher.enrich(&activities).await;
        enriched.sort_by_key(|item| item.sequence);

        let resolver = AvatarResolver::new(
            Arc::clone(&collaborators.issues),
            Arc::clone(&collaborators.blobs),
            Arc::clone(&collaborators.state),
            run_span.clone(),
        );
        let avatars = resolver.resolve(&enriched).await;

        let matcher = TriggerMatcher::new(
            &self.settings.triggers,
            &self.settings.sender_overrides,
            &self.normalizer,
            run_span.clone(),
        );
        let messages = matcher.match_messages(&enriched, &avatars);

        info!(parent: &run_span, messages = messages.len(), "posting messages");
        for message in &messages {
            collaborators
                .chat
                .post_message(&message.channel, &message.sender, &message.text)
                .await
                .with_context(|| format!("failed to post message to {}", message.channel))?;
        }

        collaborators
            .state
            .set_cursor(&newest_id)
            .await
            .with_context(|| format!("failed to record relay cursor {newest_id}"))?;
        info!(parent: &run_span, cursor = %newest_id, "recorded relay cursor");

        Ok(RelayReport {
            fetched,
            new_activities: activities.len(),
            enriched: enriched.len(),
            avatars_resolved: avatars.len(),
            messages_posted: messages.len(),
            cursor: Some(newest_id),
        })
    }
}
