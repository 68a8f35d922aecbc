use regex::Regex;

use crate::{ConfigError, CustomJiraFieldConfig, TriggerConfig};

#[derive(Debug, Clone)]
pub struct FieldMatcher {
    pub field: String,
    pub pattern: Regex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Maps a trigger field name onto an underlying tracker field key.
pub struct FieldAlias {
    pub name: String,
    pub field_key: String,
}

#[derive(Debug, Clone)]
/// A routing rule with its patterns compiled once at load time.
pub struct CompiledTrigger {
    pub index: usize,
    pub channel: String,
    /// In document order; matching short-circuits on the first failure.
    pub matchers: Vec<FieldMatcher>,
    /// In precedence order: trigger-local aliases first, then global ones.
    pub aliases: Vec<FieldAlias>,
}

impl CompiledTrigger {
    /// Underlying field keys to try, in order, before the name itself.
    pub fn alias_keys<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.aliases
            .iter()
            .filter(move |alias| alias.name == name)
            .map(|alias| alias.field_key.as_str())
    }
}

pub fn compile_triggers(
    triggers: &[TriggerConfig],
    custom_fields: &[CustomJiraFieldConfig],
) -> Result<Vec<CompiledTrigger>, ConfigError> {
    let global_aliases = custom_fields
        .iter()
        .map(|custom| FieldAlias {
            name: custom.name.trim().to_string(),
            field_key: custom.jira_field.trim().to_string(),
        })
        .collect::<Vec<_>>();

    triggers
        .iter()
        .enumerate()
        .map(|(index, trigger)| {
            let matchers = trigger
                .match_fields
                .iter()
                .map(|(field, pattern)| {
                    Regex::new(pattern)
                        .map(|compiled| FieldMatcher {
                            field: field.clone(),
                            pattern: compiled,
                        })
                        .map_err(|source| ConfigError::InvalidRegex {
                            trigger_index: index,
                            field: field.clone(),
                            pattern: pattern.clone(),
                            source,
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;

            let mut aliases = trigger
                .custom_fields
                .iter()
                .map(|(name, field_key)| FieldAlias {
                    name: name.trim().to_string(),
                    field_key: field_key.trim().to_string(),
                })
                .collect::<Vec<_>>();
            aliases.extend(global_aliases.iter().cloned());

            Ok(CompiledTrigger {
                index,
                channel: trigger.slack_channel.trim().to_string(),
                matchers,
                aliases,
            })
        })
        .collect()
}
