//! Evaluates compiled triggers against enriched activities.

use std::collections::BTreeMap;

use herald_config::{CompiledTrigger, SlackUserOverride};
use herald_core::{ActivityIssue, Message, SenderIdentity};
use tracing::{debug, warn, Span};

use crate::{resolve_trigger_field, AvatarMap, FieldTypeError, TextNormalizer};

pub struct TriggerMatcher<'a> {
    triggers: &'a [CompiledTrigger],
    sender_overrides: &'a BTreeMap<String, SlackUserOverride>,
    normalizer: &'a TextNormalizer,
    span: Span,
}

impl<'a> TriggerMatcher<'a> {
    pub fn new(
        triggers: &'a [CompiledTrigger],
        sender_overrides: &'a BTreeMap<String, SlackUserOverride>,
        normalizer: &'a TextNormalizer,
        span: Span,
    ) -> Self {
        Self {
            triggers,
            sender_overrides,
            normalizer,
            span,
        }
    }

    /// Builds one message per (item, firing trigger), items outermost.
    pub fn match_messages(&self, items: &[ActivityIssue], avatars: &AvatarMap) -> Vec<Message> {
        let mut messages = Vec::new();
        for item in items {
            for trigger in self.triggers {
                match trigger_fires(trigger, item) {
                    Ok(true) => messages.push(self.build_message(trigger, item, avatars)),
                    Ok(false) => {}
                    Err(error) => {
                        warn!(
                            parent: &self.span,
                            activity_id = %item.activity.id,
                            issue_key = %item.issue.key,
                            trigger_index = trigger.index,
                            field = %error.field,
                            error = %error,
                            "trigger field has an unexpected shape"
                        );
                    }
                }
            }
        }
        debug!(parent: &self.span, messages = messages.len(), "matched triggers");
        messages
    }

    fn build_message(
        &self,
        trigger: &CompiledTrigger,
        item: &ActivityIssue,
        avatars: &AvatarMap,
    ) -> Message {
        let author = &item.activity.author;
        let mut sender = SenderIdentity {
            name: author.display_name.clone(),
            icon_url: avatars.get(&author.username).unwrap_or_default().to_string(),
            icon_emoji: None,
        };
        if let Some(sender_override) = self.sender_overrides.get(&author.username) {
            apply_sender_override(&mut sender, sender_override);
        }
        Message {
            channel: trigger.channel.clone(),
            sender,
            text: self.normalizer.normalize(&item.activity.title),
        }
    }
}

/// True when every matcher of `trigger` matches, checked in document order.
/// The first absent, non-matching or mistyped field ends the evaluation.
pub fn trigger_fires(
    trigger: &CompiledTrigger,
    item: &ActivityIssue,
) -> Result<bool, FieldTypeError> {
    for matcher in &trigger.matchers {
        let Some(text) = resolve_trigger_field(trigger, &matcher.field, &item.issue)? else {
            return Ok(false);
        };
        if !matcher.pattern.is_match(&text) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn apply_sender_override(sender: &mut SenderIdentity, sender_override: &SlackUserOverride) {
    if !sender_override.name.trim().is_empty() {
        sender.name = sender_override.name.clone();
    }
    if !sender_override.icon_url.trim().is_empty() {
        sender.icon_url = sender_override.icon_url.clone();
    }
    if !sender_override.icon_emoji.trim().is_empty() {
        sender.icon_emoji = Some(sender_override.icon_emoji.clone());
    }
}
