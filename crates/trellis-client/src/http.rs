//! HTTP implementation of the workspace API

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use trellis_core::{
    ApplyKind, BatchResponse, Change, DiffId, ElementSummary, OntologyDefinitions,
    OntologySnapshot, WireDiff,
};

use crate::api::WorkspaceApi;

/// REST client for a trellis workspace server.
pub struct HttpWorkspaceClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DiffEnvelope {
    #[serde(default)]
    diffs: Vec<Change>,
}

#[derive(Debug, Serialize)]
struct ElementIdsRequest<'a> {
    ids: &'a [DiffId],
}

#[derive(Debug, Deserialize)]
struct ElementsEnvelope {
    #[serde(default)]
    elements: Vec<ElementSummary>,
}

impl HttpWorkspaceClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        HttpWorkspaceClient {
            client: reqwest::Client::new(),
            base_url,
            token,
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorize(self.client.get(format!("{}{}", self.base_url, path)))
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorize(self.client.post(format!("{}{}", self.base_url, path)))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("workspace server error ({status}): {body}");
        }
        Ok(response)
    }

    async fn fetch_elements(&self, path: &str, ids: &[DiffId]) -> Result<Vec<ElementSummary>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let response = self
            .post(path)
            .json(&ElementIdsRequest { ids })
            .send()
            .await
            .with_context(|| format!("requesting {path}"))?;
        let envelope: ElementsEnvelope = Self::check(response)
            .await?
            .json()
            .await
            .with_context(|| format!("parsing {path} response"))?;
        Ok(envelope.elements)
    }
}

#[async_trait]
impl WorkspaceApi for HttpWorkspaceClient {
    async fn fetch_ontology(&self) -> Result<OntologySnapshot> {
        let response = self
            .get("/ontology")
            .send()
            .await
            .context("requesting ontology")?;
        let definitions: OntologyDefinitions = Self::check(response)
            .await?
            .json()
            .await
            .context("parsing ontology response")?;
        Ok(OntologySnapshot::from_definitions(definitions))
    }

    async fn fetch_diffs(&self, workspace: &str) -> Result<Vec<Change>> {
        let response = self
            .get(&format!("/workspace/{workspace}/diff"))
            .send()
            .await
            .context("requesting workspace diffs")?;
        let envelope: DiffEnvelope = Self::check(response)
            .await?
            .json()
            .await
            .context("parsing workspace diff response")?;
        Ok(envelope.diffs)
    }

    async fn fetch_vertices(&self, ids: &[DiffId]) -> Result<Vec<ElementSummary>> {
        self.fetch_elements("/vertex/multiple", ids).await
    }

    async fn fetch_edges(&self, ids: &[DiffId]) -> Result<Vec<ElementSummary>> {
        self.fetch_elements("/edge/multiple", ids).await
    }

    async fn apply_batch(
        &self,
        workspace: &str,
        kind: ApplyKind,
        batch: &[WireDiff],
    ) -> Result<BatchResponse> {
        let response = self
            .post(&format!("/workspace/{workspace}/{}", kind.as_str()))
            .json(&batch)
            .send()
            .await
            .with_context(|| format!("submitting {} batch", kind.as_str()))?;
        let verdict: BatchResponse = Self::check(response)
            .await?
            .json()
            .await
            .with_context(|| format!("parsing {} response", kind.as_str()))?;
        Ok(verdict)
    }
}
