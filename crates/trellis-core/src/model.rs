//! Core data model for pending workspace changes

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Title shown for an element until a fetch resolves the real one.
pub const PLACEHOLDER_TITLE: &str = "(untitled)";

/// Stable identifier for a diff record.
///
/// Vertex and edge records share their element's id. Property records use a
/// composite id so the same logical change keeps its identity across
/// rebuilds of the diff set.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiffId(pub String);

impl DiffId {
    pub fn new(id: impl Into<String>) -> Self {
        DiffId(id.into())
    }

    /// Composite id for a property record: `element#name#key`.
    pub fn property(element_id: &str, name: &str, key: &str) -> Self {
        DiffId(format!("{element_id}#{name}#{key}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DiffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DiffId {
    fn from(id: &str) -> Self {
        DiffId(id.to_string())
    }
}

/// Whether a record belongs to a vertex or an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Vertex,
    Edge,
}

/// Visibility of an element or property relative to the shared graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SandboxStatus {
    /// Exists only inside this workspace.
    #[default]
    Private,
    /// Shared element carrying workspace-local modifications.
    PublicChanged,
    /// Visible to every workspace.
    Public,
}

/// What applying a record does to the shared graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffAction {
    Create,
    Update,
    Delete,
}

/// Which intent a batch or bulk selection acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyKind {
    Publish,
    Undo,
}

impl ApplyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyKind::Publish => "publish",
            ApplyKind::Undo => "undo",
        }
    }
}

/// A raw change as served by the workspace diff feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Change {
    Vertex(VertexChange),
    Edge(EdgeChange),
    Property(PropertyChange),
}

/// A pending vertex creation or deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexChange {
    pub vertex_id: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub concept_type: String,
    #[serde(default)]
    pub visibility_json: Value,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub sandbox_status: SandboxStatus,
}

/// A pending edge creation or deletion.
///
/// `out_vertex_id` is the source of the relationship and `in_vertex_id` the
/// destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeChange {
    pub edge_id: String,
    #[serde(default)]
    pub deleted: bool,
    pub label: String,
    pub in_vertex_id: String,
    pub out_vertex_id: String,
    #[serde(default)]
    pub visibility_json: Value,
    #[serde(default)]
    pub sandbox_status: SandboxStatus,
}

/// A pending property change on a vertex or edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyChange {
    pub element_id: String,
    #[serde(rename = "elementType")]
    pub element_kind: ElementKind,
    pub name: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub old: Option<Value>,
    #[serde(default)]
    pub new: Option<Value>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub sandbox_status: SandboxStatus,
    /// Original property name, set on records folded into a compound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependent_name: Option<String>,
    /// Constituent payloads of a folded compound property.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constituents: Vec<PropertyChange>,
}

impl Change {
    /// Derive the stable record id for this change.
    pub fn derive_id(&self) -> DiffId {
        match self {
            Change::Vertex(v) => DiffId::new(&v.vertex_id),
            Change::Edge(e) => DiffId::new(&e.edge_id),
            Change::Property(p) => DiffId::property(&p.element_id, &p.name, &p.key),
        }
    }

    /// Id of the vertex or edge this change belongs to.
    pub fn element_id(&self) -> DiffId {
        match self {
            Change::Vertex(v) => DiffId::new(&v.vertex_id),
            Change::Edge(e) => DiffId::new(&e.edge_id),
            Change::Property(p) => DiffId::new(&p.element_id),
        }
    }

    pub fn element_kind(&self) -> ElementKind {
        match self {
            Change::Vertex(_) => ElementKind::Vertex,
            Change::Edge(_) => ElementKind::Edge,
            Change::Property(p) => p.element_kind,
        }
    }

    pub fn deleted(&self) -> bool {
        match self {
            Change::Vertex(v) => v.deleted,
            Change::Edge(e) => e.deleted,
            Change::Property(p) => p.deleted,
        }
    }

    pub fn sandbox_status(&self) -> SandboxStatus {
        match self {
            Change::Vertex(v) => v.sandbox_status,
            Change::Edge(e) => e.sandbox_status,
            Change::Property(p) => p.sandbox_status,
        }
    }
}

/// One pending change plus the reviewer's intent flags.
///
/// `publish` and `undo` are mutually exclusive and only ever written through
/// the propagation engine. `applying` is transient: it marks records that are
/// part of an in-flight batch and is cleared by reconciliation or rollback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffRecord {
    pub id: DiffId,
    pub publish: bool,
    pub undo: bool,
    pub applying: bool,
    #[serde(flatten)]
    pub change: Change,
}

impl DiffRecord {
    /// Wrap a raw change, deriving its id. Intent flags start cleared.
    pub fn new(change: Change) -> Self {
        DiffRecord {
            id: change.derive_id(),
            publish: false,
            undo: false,
            applying: false,
            change,
        }
    }

    /// Set the publish flag; turning it on clears undo.
    pub fn set_publish(&mut self, on: bool) {
        self.publish = on;
        if on {
            self.undo = false;
        }
    }

    /// Set the undo flag; turning it on clears publish.
    pub fn set_undo(&mut self, on: bool) {
        self.undo = on;
        if on {
            self.publish = false;
        }
    }
}

/// Publish/undo selection for one record, carried across rebuilds by id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub publish: bool,
    pub undo: bool,
}

/// Selection state keyed by record id, re-applied after a rebuild.
pub type PriorIntent = HashMap<DiffId, Intent>;

/// All pending changes grouped under one vertex or edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDiff {
    pub element_id: DiffId,
    pub kind: ElementKind,
    /// Display title; a placeholder until decorated from an element fetch.
    pub title: String,
    /// `Update` when only properties changed, otherwise the element's own
    /// create or delete.
    pub action: DiffAction,
    /// The element's own vertex or edge record, if the element itself changed.
    pub change: Option<DiffId>,
    /// Property records owned by this element, in arrival order.
    pub properties: Vec<DiffId>,
    /// True while any record of this element sits in an in-flight batch.
    pub applying: bool,
}

/// Title decoration fetched for a referenced element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSummary {
    pub id: DiffId,
    pub title: String,
}

/// Counts of pending changes, for status lines and logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub vertices: usize,
    pub edges: usize,
    pub properties: usize,
    pub publishable: usize,
    pub undoable: usize,
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} vertices, {} edges, {} properties pending ({} to publish, {} to undo)",
            self.vertices, self.edges, self.properties, self.publishable, self.undoable
        )
    }
}
