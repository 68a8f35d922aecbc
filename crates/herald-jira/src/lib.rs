//! Jira collaborator for the herald relay.
//!
//! [`JiraClient`] reads the Atom activity stream, resolves issues through the
//! REST API and downloads author avatars, implementing the `FeedReader` and
//! `IssueLookup` contracts from `herald-core`.

mod activity_feed;
mod jira_api_client;

pub use activity_feed::parse_activity_feed;
pub use jira_api_client::{JiraClient, JiraClientSettings};
