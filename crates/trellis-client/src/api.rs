//! Workspace server operations the review session depends on

use anyhow::Result;
use async_trait::async_trait;

use trellis_core::{ApplyKind, BatchResponse, Change, DiffId, ElementSummary, OntologySnapshot, WireDiff};

/// The narrow server surface behind a review session.
///
/// Implemented over HTTP by [`crate::HttpWorkspaceClient`]; tests swap in
/// canned implementations.
#[async_trait]
pub trait WorkspaceApi: Send + Sync {
    /// Ontology snapshot taken once per session.
    async fn fetch_ontology(&self) -> Result<OntologySnapshot>;

    /// Every pending change of the workspace, flat and ungrouped.
    async fn fetch_diffs(&self, workspace: &str) -> Result<Vec<Change>>;

    /// Titles for the given vertices. Ids the server does not know may be
    /// silently absent from the result.
    async fn fetch_vertices(&self, ids: &[DiffId]) -> Result<Vec<ElementSummary>>;

    /// Titles for the given edges.
    async fn fetch_edges(&self, ids: &[DiffId]) -> Result<Vec<ElementSummary>>;

    /// Submit a publish or undo batch and return the per-record verdict.
    async fn apply_batch(
        &self,
        workspace: &str,
        kind: ApplyKind,
        batch: &[WireDiff],
    ) -> Result<BatchResponse>;
}
