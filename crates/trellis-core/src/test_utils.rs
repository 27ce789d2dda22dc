//! Shared fixtures for diff-set tests

use serde_json::json;

use crate::model::{
    Change, DiffRecord, EdgeChange, ElementKind, PropertyChange, SandboxStatus, VertexChange,
};
use crate::ontology::{OntologyProperty, OntologyRelationship, OntologySnapshot};

/// Ontology with plain, hidden, and compound properties plus one visible and
/// one hidden relationship.
pub fn test_ontology() -> OntologySnapshot {
    OntologySnapshot::new(
        vec![
            ontology_property("title", "Title", true, &[]),
            ontology_property("comment", "Comment", true, &[]),
            ontology_property("score", "Score", false, &[]),
            ontology_property("fullName", "Full Name", true, &["firstName", "lastName"]),
            ontology_property("firstName", "First Name", false, &[]),
            ontology_property("lastName", "Last Name", false, &[]),
        ],
        vec![
            ontology_relationship("knows", "Knows", true),
            ontology_relationship("hiddenTie", "Hidden Tie", false),
        ],
    )
}

pub fn ontology_property(
    name: &str,
    display_name: &str,
    user_visible: bool,
    dependents: &[&str],
) -> OntologyProperty {
    OntologyProperty {
        name: name.to_string(),
        display_name: display_name.to_string(),
        user_visible,
        dependent_property_iris: dependents.iter().map(|d| d.to_string()).collect(),
    }
}

pub fn ontology_relationship(
    label: &str,
    display_name: &str,
    user_visible: bool,
) -> OntologyRelationship {
    OntologyRelationship {
        label: label.to_string(),
        display_name: display_name.to_string(),
        user_visible,
    }
}

pub fn vertex(id: &str, deleted: bool) -> DiffRecord {
    DiffRecord::new(Change::Vertex(VertexChange {
        vertex_id: id.to_string(),
        deleted,
        concept_type: "thing".to_string(),
        visibility_json: json!({}),
        title: Some(format!("Vertex {id}")),
        sandbox_status: SandboxStatus::Private,
    }))
}

pub fn edge(id: &str, out_vertex: &str, in_vertex: &str, deleted: bool) -> DiffRecord {
    DiffRecord::new(Change::Edge(EdgeChange {
        edge_id: id.to_string(),
        deleted,
        label: "knows".to_string(),
        in_vertex_id: in_vertex.to_string(),
        out_vertex_id: out_vertex.to_string(),
        visibility_json: json!({}),
        sandbox_status: SandboxStatus::Private,
    }))
}

pub fn vertex_property(element_id: &str, name: &str, key: &str) -> DiffRecord {
    property(element_id, ElementKind::Vertex, name, key, false)
}

pub fn property(
    element_id: &str,
    kind: ElementKind,
    name: &str,
    key: &str,
    deleted: bool,
) -> DiffRecord {
    DiffRecord::new(Change::Property(PropertyChange {
        element_id: element_id.to_string(),
        element_kind: kind,
        name: name.to_string(),
        key: key.to_string(),
        old: None,
        new: Some(json!(format!("{name} value"))),
        deleted,
        sandbox_status: SandboxStatus::Private,
        dependent_name: None,
        constituents: Vec::new(),
    }))
}
