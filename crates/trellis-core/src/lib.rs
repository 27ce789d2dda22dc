//! Trellis Core — change-diff model, dependency index, and the publish/undo
//! propagation engine behind workspace review.
//!
//! The flow is always the same: raw changes from the server feed become
//! [`DiffRecord`]s, [`DiffSet::build`] groups them by element and wires the
//! dependency index, `mark_publish`/`mark_undo` cascade reviewer intent, and
//! [`build_batch`]/[`reconcile`] round-trip a selection through the server.

pub mod batch;
pub mod builder;
pub mod deps;
pub mod engine;
pub mod model;
pub mod ontology;

pub use batch::{build_batch, reconcile, rollback, BatchResponse, WireDiff, WireFailure};
pub use builder::{fold_compound_properties, DiffSet};
pub use deps::DependencyIndex;
pub use engine::{InFlightPolicy, ToggleError};
pub use model::{
    ApplyKind, Change, DiffAction, DiffId, DiffRecord, DiffSummary, EdgeChange, ElementDiff,
    ElementKind, ElementSummary, Intent, PriorIntent, PropertyChange, SandboxStatus, VertexChange,
    PLACEHOLDER_TITLE,
};
pub use ontology::{OntologyDefinitions, OntologyProperty, OntologyRelationship, OntologySnapshot};


#[cfg(test)]
pub mod test_utils;
