//! Review session: fetch, group, toggle, apply, reconcile

use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use trellis_core::{
    build_batch, reconcile, rollback, ApplyKind, DiffId, DiffRecord, DiffSet, DiffSummary,
    ElementKind, OntologySnapshot, PriorIntent, ToggleError, WireFailure,
};

use crate::api::WorkspaceApi;

/// One reviewer's live view of a workspace's pending changes.
///
/// The session owns the diff set and is the only writer to it. Every refresh
/// and every applied batch rebuilds the set whole; selections survive those
/// rebuilds by record id.
pub struct ReviewSession {
    api: Box<dyn WorkspaceApi>,
    workspace: String,
    ontology: OntologySnapshot,
    set: DiffSet,
    last_refreshed: Option<DateTime<Utc>>,
}

/// Outcome of applying a publish or undo batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    pub sent: usize,
    pub applied: usize,
    pub failures: Vec<FailureNotice>,
}

/// One record the server refused, with enough context to display.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureNotice {
    pub id: Option<DiffId>,
    pub title: String,
    pub message: String,
}

impl ReviewSession {
    /// Open a session: take the ontology snapshot, then load and group the
    /// workspace's pending changes.
    pub async fn connect(api: Box<dyn WorkspaceApi>, workspace: impl Into<String>) -> Result<Self> {
        let workspace = workspace.into();
        let ontology = api.fetch_ontology().await.context("loading ontology")?;
        let mut session = ReviewSession {
            api,
            workspace,
            ontology,
            set: DiffSet::default(),
            last_refreshed: None,
        };
        session.refresh().await?;
        Ok(session)
    }

    /// Re-ingest the server's diff feed, carrying current selections by id.
    pub async fn refresh(&mut self) -> Result<()> {
        let changes = self
            .api
            .fetch_diffs(&self.workspace)
            .await
            .context("fetching workspace diffs")?;
        let records = changes.into_iter().map(DiffRecord::new).collect();
        let prior = self.set.intent_snapshot();
        self.rebuild(records, &prior);
        self.decorate().await;
        self.last_refreshed = Some(Utc::now());
        debug!(
            workspace = %self.workspace,
            records = self.set.len(),
            "refreshed diff set"
        );
        Ok(())
    }

    /// Build and submit the current selection, then fold the server verdict
    /// back in.
    ///
    /// On a transport failure nothing advances: in-flight marks are rolled
    /// back, selections restored, and the error surfaced once.
    pub async fn apply(&mut self, kind: ApplyKind) -> Result<ApplyReport> {
        let batch = build_batch(&mut self.set, kind);
        if batch.is_empty() {
            return Ok(ApplyReport::default());
        }
        let sent = batch.len();
        let response = match self.api.apply_batch(&self.workspace, kind, &batch).await {
            Ok(response) => response,
            Err(err) => {
                rollback(&mut self.set, kind);
                return Err(err).context("applying workspace batch");
            }
        };

        let failures = self.notices(&response.failures);
        // Failure entries that match nothing in the batch surface as notices
        // only; the applied count tracks batched records.
        let rejected = failures
            .iter()
            .filter_map(|notice| notice.id.as_ref())
            .filter(|id| self.set.record(id).is_some_and(|record| record.applying))
            .collect::<HashSet<_>>()
            .len();
        // take() leaves a default set behind; restore its policy before the
        // rebuild carries it forward.
        let policy = self.set.in_flight_policy();
        let survivors = reconcile(std::mem::take(&mut self.set), kind, &response.failures);
        self.set.set_in_flight_policy(policy);
        self.rebuild(survivors, &PriorIntent::default());
        self.decorate().await;
        info!(
            workspace = %self.workspace,
            kind = kind.as_str(),
            sent,
            failed = failures.len(),
            "applied workspace batch"
        );
        Ok(ApplyReport {
            sent,
            applied: sent - rejected,
            failures,
        })
    }

    pub fn diffs(&self) -> &DiffSet {
        &self.set
    }

    pub fn diffs_mut(&mut self) -> &mut DiffSet {
        &mut self.set
    }

    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    pub fn summary(&self) -> DiffSummary {
        self.set.summary()
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.last_refreshed
    }

    pub fn set_publish(&mut self, id: &DiffId, on: bool) -> Result<Vec<DiffId>, ToggleError> {
        self.set.mark_publish(id, Some(on))
    }

    pub fn toggle_publish(&mut self, id: &DiffId) -> Result<Vec<DiffId>, ToggleError> {
        self.set.mark_publish(id, None)
    }

    pub fn set_undo(&mut self, id: &DiffId, on: bool) -> Result<Vec<DiffId>, ToggleError> {
        self.set.mark_undo(id, Some(on))
    }

    pub fn toggle_undo(&mut self, id: &DiffId) -> Result<Vec<DiffId>, ToggleError> {
        self.set.mark_undo(id, None)
    }

    pub fn select_all(&mut self, kind: ApplyKind) -> Vec<DiffId> {
        self.set.select_all(kind)
    }

    pub fn deselect_all(&mut self) {
        self.set.deselect_all()
    }

    /// Rebuild the set in place, keeping the configured in-flight policy.
    fn rebuild(&mut self, records: Vec<DiffRecord>, prior: &PriorIntent) {
        let policy = self.set.in_flight_policy();
        self.set = DiffSet::build(records, prior, &self.ontology);
        self.set.set_in_flight_policy(policy);
    }

    /// Fetch display titles for every element row. Fetch misses degrade to
    /// placeholder titles, never to errors.
    async fn decorate(&mut self) {
        for kind in [ElementKind::Vertex, ElementKind::Edge] {
            let ids = self.set.element_ids(kind);
            if ids.is_empty() {
                continue;
            }
            let fetched = match kind {
                ElementKind::Vertex => self.api.fetch_vertices(&ids).await,
                ElementKind::Edge => self.api.fetch_edges(&ids).await,
            };
            match fetched {
                Ok(summaries) => self.set.decorate_titles(&summaries),
                Err(err) => debug!("element title fetch failed: {err:#}"),
            }
        }
    }

    fn notices(&self, failures: &[WireFailure]) -> Vec<FailureNotice> {
        failures
            .iter()
            .map(|failure| {
                let id = failure.record_id();
                let title = id
                    .as_ref()
                    .and_then(|id| self.set.record(id))
                    .map(|record| record.change.element_id())
                    .and_then(|element_id| self.set.element(&element_id))
                    .map(|element| element.title.clone())
                    .unwrap_or_default();
                FailureNotice {
                    id,
                    title,
                    message: failure.error_message.clone(),
                }
            })
            .collect()
    }
}
