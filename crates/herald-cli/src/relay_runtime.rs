use std::sync::Arc;

use anyhow::{Context, Result};
use herald_config::{load_config, LoadedConfig};
use herald_jira::{JiraClient, JiraClientSettings};
use herald_pipeline::{ActivityRelay, RelayCollaborators, RelayReport, RelaySettings};
use herald_slack::{SlackClient, SlackClientSettings};
use herald_state::FileStateStore;
use herald_storage::build_blob_store;
use tracing::{info, info_span};

use crate::cli_args::Cli;

pub(crate) async fn run_cli(cli: Cli) -> Result<()> {
    let config_path = cli.config.unwrap_or_default();
    let config = load_config(&config_path)?;
    let relay = build_relay(&config)?;
    let report = relay.run_once().await?;
    log_report(&report);
    Ok(())
}

fn build_relay(config: &LoadedConfig) -> Result<ActivityRelay> {
    let document = &config.document;
    let jira = Arc::new(JiraClient::new(JiraClientSettings::from(&document.atlassian))?);
    let slack = SlackClient::new(SlackClientSettings::from(&document.slack))?;
    let state = FileStateStore::load(document.state.path.clone())
        .context("failed to open relay state")?;
    let blobs = build_blob_store(&document.resource_storage)?;

    let collaborators = RelayCollaborators {
        feed: jira.clone(),
        issues: jira,
        chat: Arc::new(slack),
        blobs,
        state: Arc::new(state),
    };
    ActivityRelay::new(
        collaborators,
        RelaySettings::from(config),
        info_span!("herald", host = %document.atlassian.host),
    )
}

fn log_report(report: &RelayReport) {
    info!(
        fetched = report.fetched,
        new_activities = report.new_activities,
        enriched = report.enriched,
        avatars_resolved = report.avatars_resolved,
        messages_posted = report.messages_posted,
        cursor = report.cursor.as_deref().unwrap_or(""),
        "relay pass finished"
    );
}
