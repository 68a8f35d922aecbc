//! Bounded worker pool that pairs activities with their issues.

use std::sync::Arc;

use herald_core::{ActivityEntry, ActivityIssue, IssueLookup};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, info, info_span, warn, Instrument, Span};

type WorkQueue = Arc<Mutex<mpsc::Receiver<(usize, ActivityEntry)>>>;

pub struct IssueEnricher {
    lookup: Arc<dyn IssueLookup>,
    concurrency: usize,
    span: Span,
}

impl IssueEnricher {
    pub fn new(lookup: Arc<dyn IssueLookup>, concurrency: usize, span: Span) -> Self {
        Self {
            lookup,
            concurrency: concurrency.max(1),
            span,
        }
    }

    /// Looks up the issue behind every activity with at most `concurrency`
    /// lookups in flight.
    ///
    /// Returns once every worker has drained the queue. The output holds only
    /// the activities whose key extraction and lookup both succeeded, in
    /// completion order; `sequence` carries each item's input position.
    pub async fn enrich(&self, activities: &[ActivityEntry]) -> Vec<ActivityIssue> {
        if activities.is_empty() {
            return Vec::new();
        }

        let (sender, receiver) = mpsc::channel(activities.len());
        for (sequence, activity) in activities.iter().enumerate() {
            if sender.send((sequence, activity.clone())).await.is_err() {
                break;
            }
        }
        drop(sender);

        let queue: WorkQueue = Arc::new(Mutex::new(receiver));
        let worker_count = self.concurrency.min(activities.len());
        let mut workers = JoinSet::new();
        for worker in 0..worker_count {
            let queue = Arc::clone(&queue);
            let lookup = Arc::clone(&self.lookup);
            let worker_span = info_span!(parent: &self.span, "issue_worker", worker);
            workers.spawn(drain_queue(queue, lookup).instrument(worker_span));
        }

        let mut enriched = Vec::with_capacity(activities.len());
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(items) => enriched.extend(items),
                Err(error) => {
                    warn!(parent: &self.span, %error, "issue worker terminated abnormally");
                }
            }
        }

        info!(
            parent: &self.span,
            requested = activities.len(),
            enriched = enriched.len(),
            workers = worker_count,
            "issue enrichment finished"
        );
        enriched
    }
}

async fn drain_queue(queue: WorkQueue, lookup: Arc<dyn IssueLookup>) -> Vec<ActivityIssue> {
    let mut enriched = Vec::new();
    loop {
        let next = queue.lock().await.recv().await;
        let Some((sequence, activity)) = next else {
            break;
        };

        let Some(issue_key) = activity.issue_key().map(str::to_string) else {
            warn!(activity_id = %activity.id, "could not extract issue key from activity");
            continue;
        };

        match lookup.get_issue(&issue_key).await {
            Ok(issue) => {
                debug!(activity_id = %activity.id, issue_key, "resolved issue");
                enriched.push(ActivityIssue {
                    sequence,
                    activity,
                    issue,
                });
            }
            Err(error) if error.is_not_found() => {
                warn!(activity_id = %activity.id, issue_key, "issue not found, skipping activity");
            }
            Err(error) => {
                warn!(
                    activity_id = %activity.id,
                    issue_key,
                    error = %error,
                    "could not look up issue, skipping activity"
                );
            }
        }
    }
    enriched
}
