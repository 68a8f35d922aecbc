//! The herald relay pipeline.
//!
//! A pass reads the tracker timeline newest first, keeps the entries past the
//! stored cursor, enriches them with their issues on a bounded worker pool,
//! resolves author avatars through the cache, matches the compiled triggers,
//! posts the resulting chat messages in timeline order and only then records
//! the newest processed activity as the cursor.

mod avatar_resolver;
mod cursor_filter;
mod error;
mod field_resolution;
mod issue_enricher;
mod relay;
mod text_normalizer;
mod trigger_matcher;

pub use avatar_resolver::{avatar_blob_path, AvatarMap, AvatarResolver};
pub use cursor_filter::filter_new_activities;
pub use error::FieldTypeError;
pub use field_resolution::{coerce_field_value, resolve_trigger_field};
pub use issue_enricher::IssueEnricher;
pub use relay::{ActivityRelay, RelayCollaborators, RelayReport, RelaySettings};
pub use text_normalizer::TextNormalizer;
pub use trigger_matcher::{trigger_fires, TriggerMatcher};

#[cfg(test)]
mod test_support;
