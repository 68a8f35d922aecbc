//! Slack Web API chat transport for the herald relay.

mod slack_api_client;

pub use slack_api_client::{SlackClient, SlackClientSettings};
