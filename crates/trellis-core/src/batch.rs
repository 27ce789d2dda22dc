//! Wire batches for publish/undo requests and server-verdict reconciliation

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::builder::DiffSet;
use crate::model::{ApplyKind, Change, DiffAction, DiffId, DiffRecord, ElementKind, SandboxStatus};

/// One record of a publish or undo request, as sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WireDiff {
    #[serde(rename = "vertex", rename_all = "camelCase")]
    Vertex {
        vertex_id: String,
        action: DiffAction,
        status: SandboxStatus,
    },
    #[serde(rename = "relationship", rename_all = "camelCase")]
    Relationship {
        edge_id: String,
        source_id: String,
        dest_id: String,
        action: DiffAction,
        status: SandboxStatus,
    },
    #[serde(rename = "property", rename_all = "camelCase")]
    Property {
        #[serde(skip_serializing_if = "Option::is_none")]
        vertex_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        edge_id: Option<String>,
        name: String,
        key: String,
        action: DiffAction,
        status: SandboxStatus,
    },
}

/// Server verdict for a submitted batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub success: Vec<String>,
    #[serde(default)]
    pub failures: Vec<WireFailure>,
}

/// One record the server refused to apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireFailure {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertex_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub error_message: String,
}

impl WireFailure {
    /// Map a failure back to the record id its wire diff was built from.
    /// `None` when the failure does not describe an identifiable record.
    pub fn record_id(&self) -> Option<DiffId> {
        match self.kind.as_str() {
            "vertex" => self.vertex_id.as_deref().map(DiffId::new),
            "relationship" => self.edge_id.as_deref().map(DiffId::new),
            "property" => {
                let element = self.vertex_id.as_deref().or(self.edge_id.as_deref())?;
                Some(DiffId::property(
                    element,
                    self.name.as_deref()?,
                    self.key.as_deref().unwrap_or(""),
                ))
            }
            _ => None,
        }
    }
}

/// Collect every record whose intent matches `kind` into a wire batch.
///
/// Each collected record and its owning element row get the applying mark;
/// this is the only place that mark is set.
pub fn build_batch(set: &mut DiffSet, kind: ApplyKind) -> Vec<WireDiff> {
    let mut batch = Vec::new();
    for slot in 0..set.elements.len() {
        let ids: Vec<DiffId> = {
            let element = &set.elements[slot];
            element
                .change
                .iter()
                .chain(element.properties.iter())
                .cloned()
                .collect()
        };
        let mut row_applying = false;
        for id in ids {
            let Some(record) = set.records.get_mut(&id) else {
                continue;
            };
            let selected = match kind {
                ApplyKind::Publish => record.publish,
                ApplyKind::Undo => record.undo,
            };
            if !selected {
                continue;
            }
            batch.push(wire_diff(record));
            record.applying = true;
            row_applying = true;
        }
        if row_applying {
            set.elements[slot].applying = true;
        }
    }
    debug!(records = batch.len(), kind = kind.as_str(), "built wire batch");
    batch
}

fn wire_diff(record: &DiffRecord) -> WireDiff {
    match &record.change {
        Change::Vertex(v) => WireDiff::Vertex {
            vertex_id: v.vertex_id.clone(),
            action: if v.deleted {
                DiffAction::Delete
            } else {
                DiffAction::Create
            },
            status: v.sandbox_status,
        },
        Change::Edge(e) => WireDiff::Relationship {
            edge_id: e.edge_id.clone(),
            source_id: e.out_vertex_id.clone(),
            dest_id: e.in_vertex_id.clone(),
            action: if e.deleted {
                DiffAction::Delete
            } else {
                DiffAction::Create
            },
            status: e.sandbox_status,
        },
        Change::Property(p) => WireDiff::Property {
            vertex_id: (p.element_kind == ElementKind::Vertex).then(|| p.element_id.clone()),
            edge_id: (p.element_kind == ElementKind::Edge).then(|| p.element_id.clone()),
            name: p.name.clone(),
            key: p.key.clone(),
            action: if p.deleted {
                DiffAction::Delete
            } else {
                DiffAction::Update
            },
            status: p.sandbox_status,
        },
    }
}

/// Fold a batch verdict back into the record set.
///
/// Consumes the set and returns the surviving records in deterministic order,
/// ready for the next grouping pass. In-flight records absent from `failures`
/// were applied and disappear; failed ones survive with the reviewer's intent
/// restored and the applying mark cleared; records outside the batch pass
/// through untouched.
pub fn reconcile(set: DiffSet, kind: ApplyKind, failures: &[WireFailure]) -> Vec<DiffRecord> {
    let failed: HashSet<DiffId> = failures.iter().filter_map(WireFailure::record_id).collect();
    let DiffSet {
        mut records,
        elements,
        ..
    } = set;

    let mut survivors = Vec::with_capacity(records.len());
    let mut dropped = 0usize;
    for id in elements
        .iter()
        .flat_map(|element| element.change.iter().chain(element.properties.iter()))
    {
        let Some(mut record) = records.remove(id) else {
            continue;
        };
        if record.applying {
            if failed.contains(&record.id) {
                record.applying = false;
                match kind {
                    ApplyKind::Publish => record.set_publish(true),
                    ApplyKind::Undo => record.set_undo(true),
                }
                survivors.push(record);
            } else {
                dropped += 1;
            }
        } else {
            survivors.push(record);
        }
    }
    debug!(
        dropped,
        kept = survivors.len(),
        kind = kind.as_str(),
        "reconciled batch verdict"
    );
    survivors
}

/// Transport-level failure: the request never took effect on the server.
///
/// Restores the matching intent on every in-flight record and clears all
/// applying marks. No record is dropped and none advances.
pub fn rollback(set: &mut DiffSet, kind: ApplyKind) {
    let mut restored = 0usize;
    for record in set.records.values_mut() {
        if record.applying {
            record.applying = false;
            match kind {
                ApplyKind::Publish => record.set_publish(true),
                ApplyKind::Undo => record.set_undo(true),
            }
            restored += 1;
        }
    }
    for element in &mut set.elements {
        element.applying = false;
    }
    debug!(restored, kind = kind.as_str(), "rolled back wire batch");
}
