//! Ontology snapshot used for visibility filtering and compound folding

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One property definition from the workspace ontology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OntologyProperty {
    pub name: String,
    pub display_name: String,
    #[serde(default = "default_visible")]
    pub user_visible: bool,
    /// IRIs of the dependent properties this compound folds together; they
    /// match raw record names. Empty for ordinary properties.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependent_property_iris: Vec<String>,
}

impl OntologyProperty {
    pub fn is_compound(&self) -> bool {
        !self.dependent_property_iris.is_empty()
    }
}

/// One relationship definition from the workspace ontology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OntologyRelationship {
    pub label: String,
    pub display_name: String,
    #[serde(default = "default_visible")]
    pub user_visible: bool,
}

/// Wire shape of `GET /ontology`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OntologyDefinitions {
    #[serde(default)]
    pub properties: Vec<OntologyProperty>,
    #[serde(default)]
    pub relationships: Vec<OntologyRelationship>,
}

/// Immutable ontology view taken once per session.
///
/// An empty snapshot is legitimate: grouping then filters every property and
/// edge record out, leaving vertex diffs only.
#[derive(Debug, Clone, Default)]
pub struct OntologySnapshot {
    properties: HashMap<String, OntologyProperty>,
    relationships: HashMap<String, OntologyRelationship>,
    compound_by_dependent: HashMap<String, String>,
}

impl OntologySnapshot {
    pub fn new(
        properties: Vec<OntologyProperty>,
        relationships: Vec<OntologyRelationship>,
    ) -> Self {
        let mut compound_by_dependent = HashMap::new();
        for property in &properties {
            for dependent in &property.dependent_property_iris {
                compound_by_dependent.insert(dependent.clone(), property.name.clone());
            }
        }
        OntologySnapshot {
            properties: properties
                .into_iter()
                .map(|p| (p.name.clone(), p))
                .collect(),
            relationships: relationships
                .into_iter()
                .map(|r| (r.label.clone(), r))
                .collect(),
            compound_by_dependent,
        }
    }

    pub fn from_definitions(definitions: OntologyDefinitions) -> Self {
        OntologySnapshot::new(definitions.properties, definitions.relationships)
    }

    pub fn property_by_name(&self, name: &str) -> Option<&OntologyProperty> {
        self.properties.get(name)
    }

    pub fn relationship_by_label(&self, label: &str) -> Option<&OntologyRelationship> {
        self.relationships.get(label)
    }

    /// The compound property that folds `dependent_name`, if any.
    pub fn compound_for(&self, dependent_name: &str) -> Option<&OntologyProperty> {
        self.compound_by_dependent
            .get(dependent_name)
            .and_then(|name| self.properties.get(name))
    }
}

fn default_visible() -> bool {
    true
}
