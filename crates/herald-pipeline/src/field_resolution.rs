//! Text resolution for trigger fields against polymorphic issue values.

use herald_config::CompiledTrigger;
use herald_core::{FieldValue, Issue};

use crate::FieldTypeError;

const STRUCTURED_TEXT_KEYS: [&str; 2] = ["value", "name"];

/// Resolves trigger field `name` on `issue` to matchable text.
///
/// Alias keys are tried first in precedence order, then `name` itself. Only an
/// absent result falls through to the next candidate; a type error stops the
/// lookup. `Ok(None)` means the field is absent everywhere.
pub fn resolve_trigger_field(
    trigger: &CompiledTrigger,
    name: &str,
    issue: &Issue,
) -> Result<Option<String>, FieldTypeError> {
    for field_key in trigger.alias_keys(name) {
        if let Some(text) = coerce_field_value(field_key, issue.fields.get(field_key))? {
            return Ok(Some(text));
        }
    }
    coerce_field_value(name, issue.fields.get(name))
}

/// Coerces one field value by shape.
pub fn coerce_field_value(
    field: &str,
    value: Option<&FieldValue>,
) -> Result<Option<String>, FieldTypeError> {
    match value {
        None | Some(FieldValue::Null) => Ok(None),
        Some(FieldValue::Text(text)) => Ok(Some(text.clone())),
        Some(FieldValue::Object(entries)) => {
            let Some((key, inner)) = STRUCTURED_TEXT_KEYS
                .iter()
                .find_map(|key| entries.get(*key).map(|inner| (*key, inner)))
            else {
                return Ok(None);
            };
            match inner {
                FieldValue::Text(text) => Ok(Some(text.clone())),
                other => Err(FieldTypeError {
                    field: format!("{field}.{key}"),
                    found: other.kind(),
                }),
            }
        }
        Some(FieldValue::List(items)) => Ok(Some(
            items.iter().map(list_item_text).collect::<Vec<_>>().join(","),
        )),
        Some(other @ (FieldValue::Number(_) | FieldValue::Bool(_))) => Err(FieldTypeError {
            field: field.to_string(),
            found: other.kind(),
        }),
    }
}

fn list_item_text(item: &FieldValue) -> String {
    match item {
        FieldValue::Null => String::new(),
        FieldValue::Text(text) => text.clone(),
        FieldValue::Number(number) => number.to_string(),
        FieldValue::Bool(flag) => flag.to_string(),
        FieldValue::Object(entries) => STRUCTURED_TEXT_KEYS
            .iter()
            .find_map(|key| match entries.get(*key) {
                Some(FieldValue::Text(text)) => Some(text.clone()),
                _ => None,
            })
            .unwrap_or_else(|| item.to_json().to_string()),
        FieldValue::List(items) => items.iter().map(list_item_text).collect::<Vec<_>>().join(","),
    }
}
