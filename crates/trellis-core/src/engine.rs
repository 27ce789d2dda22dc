//! Publish/undo intent propagation across dependent records

use std::collections::HashSet;

use thiserror::Error;
use tracing::trace;

use crate::builder::DiffSet;
use crate::model::{ApplyKind, Change, DiffAction, DiffId};

/// How toggles on records already inside an in-flight batch are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InFlightPolicy {
    /// Refuse the toggle until reconciliation clears the applying mark.
    #[default]
    Reject,
    /// Accept it; reconciliation then applies last-writer-wins.
    Allow,
}

/// A publish or undo toggle that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToggleError {
    #[error("no change record with id `{0}`")]
    UnknownRecord(DiffId),
    #[error("record `{0}` is part of an in-flight batch")]
    BatchInFlight(DiffId),
}

/// Shape of a record as seen by the cascade rules.
enum CascadeTarget {
    Vertex { deleted: bool },
    Edge { deleted: bool },
    Property,
}

impl CascadeTarget {
    fn of(change: &Change) -> CascadeTarget {
        match change {
            Change::Vertex(v) => CascadeTarget::Vertex { deleted: v.deleted },
            Change::Edge(e) => CascadeTarget::Edge { deleted: e.deleted },
            Change::Property(_) => CascadeTarget::Property,
        }
    }
}

impl DiffSet {
    /// Set or toggle the publish intent on a record and cascade across its
    /// dependencies.
    ///
    /// `state` of `None` negates the current flag. Returns every record id
    /// whose flags were written, in visit order. Ids the cascade reaches but
    /// cannot act on, because they are unknown or held by an in-flight batch,
    /// are skipped silently; only the requested record itself reports an
    /// error.
    pub fn mark_publish(
        &mut self,
        id: &DiffId,
        state: Option<bool>,
    ) -> Result<Vec<DiffId>, ToggleError> {
        self.check_toggle(id)?;
        let mut visited = HashSet::new();
        let mut touched = Vec::new();
        self.publish_cascade(id, state, &mut visited, &mut touched);
        Ok(touched)
    }

    /// Undo counterpart of [`DiffSet::mark_publish`]. The two flags stay
    /// mutually exclusive: whichever is set last wins.
    pub fn mark_undo(
        &mut self,
        id: &DiffId,
        state: Option<bool>,
    ) -> Result<Vec<DiffId>, ToggleError> {
        self.check_toggle(id)?;
        let mut visited = HashSet::new();
        let mut touched = Vec::new();
        self.undo_cascade(id, state, &mut visited, &mut touched);
        Ok(touched)
    }

    /// Mark every eligible record for `kind`.
    ///
    /// Records owned by update-only elements are skipped: an element row
    /// without its own create or delete has no coherent bulk selection.
    /// Returns the ids written, in element order.
    pub fn select_all(&mut self, kind: ApplyKind) -> Vec<DiffId> {
        let ids: Vec<DiffId> = self
            .elements
            .iter()
            .filter(|element| element.action != DiffAction::Update)
            .flat_map(|element| {
                element
                    .change
                    .clone()
                    .into_iter()
                    .chain(element.properties.iter().cloned())
            })
            .collect();
        let mut touched = Vec::new();
        for id in ids {
            let marked = match kind {
                ApplyKind::Publish => self.mark_publish(&id, Some(true)),
                ApplyKind::Undo => self.mark_undo(&id, Some(true)),
            };
            if let Ok(mut ids) = marked {
                touched.append(&mut ids);
            }
        }
        touched
    }

    /// Clear every selection through the same per-record transitions.
    pub fn deselect_all(&mut self) {
        let ids: Vec<DiffId> = self.records.keys().cloned().collect();
        for id in ids {
            let _ = self.mark_publish(&id, Some(false));
            let _ = self.mark_undo(&id, Some(false));
        }
    }

    fn check_toggle(&self, id: &DiffId) -> Result<(), ToggleError> {
        let Some(record) = self.records.get(id) else {
            return Err(ToggleError::UnknownRecord(id.clone()));
        };
        if record.applying && self.in_flight_policy == InFlightPolicy::Reject {
            return Err(ToggleError::BatchInFlight(id.clone()));
        }
        Ok(())
    }

    /// One step of the publish cascade. Termination holds because every step
    /// inserts into `visited` before recursing and the id space is fixed for
    /// the lifetime of the set.
    fn publish_cascade(
        &mut self,
        id: &DiffId,
        state: Option<bool>,
        visited: &mut HashSet<DiffId>,
        touched: &mut Vec<DiffId>,
    ) {
        if !visited.insert(id.clone()) {
            return;
        }
        let Some(record) = self.records.get_mut(id) else {
            return;
        };
        if record.applying && self.in_flight_policy == InFlightPolicy::Reject {
            return;
        }
        let on = state.unwrap_or(!record.publish);
        record.set_publish(on);
        touched.push(id.clone());
        let target = CascadeTarget::of(&record.change);
        trace!(record = %id, publish = on, "publish cascade");

        match target {
            CascadeTarget::Vertex { deleted } => {
                if on && deleted {
                    // Publishing a vertex deletion keeps only matching edge
                    // deletions in the batch; anything else would republish
                    // content onto a vanishing vertex.
                    for dependent in self.index.dependents(id) {
                        let deleted_edge = matches!(
                            self.records.get(&dependent).map(|r| &r.change),
                            Some(Change::Edge(e)) if e.deleted
                        );
                        self.publish_cascade(&dependent, Some(deleted_edge), visited, touched);
                    }
                } else if !on {
                    for dependent in self.index.dependents(id) {
                        self.publish_cascade(&dependent, Some(false), visited, touched);
                    }
                }
            }
            CascadeTarget::Edge { deleted } => {
                if on && !deleted {
                    // An edge cannot go public before both endpoints exist.
                    for owner in self.index.undo_dependents(id) {
                        self.publish_cascade(&owner, Some(true), visited, touched);
                    }
                } else if !on {
                    for dependent in self.index.dependents(id) {
                        self.publish_cascade(&dependent, Some(false), visited, touched);
                    }
                }
            }
            CascadeTarget::Property => {
                if on {
                    for owner in self.index.undo_dependents(id) {
                        let owner_live = matches!(
                            self.records.get(&owner),
                            Some(r) if !r.change.deleted()
                        );
                        if owner_live {
                            self.publish_cascade(&owner, Some(true), visited, touched);
                        }
                    }
                }
            }
        }
    }

    /// One step of the undo cascade. Deliberately not a mirror image of
    /// publishing: undoing an element discards its dependents, while undoing
    /// a single property leaves the element alone.
    fn undo_cascade(
        &mut self,
        id: &DiffId,
        state: Option<bool>,
        visited: &mut HashSet<DiffId>,
        touched: &mut Vec<DiffId>,
    ) {
        if !visited.insert(id.clone()) {
            return;
        }
        let Some(record) = self.records.get_mut(id) else {
            return;
        };
        if record.applying && self.in_flight_policy == InFlightPolicy::Reject {
            return;
        }
        let on = state.unwrap_or(!record.undo);
        record.set_undo(on);
        touched.push(id.clone());
        let target = CascadeTarget::of(&record.change);
        trace!(record = %id, undo = on, "undo cascade");

        match target {
            CascadeTarget::Vertex { deleted } => {
                if on && !deleted {
                    // Discarding a vertex creation strands everything that
                    // hangs off it.
                    for dependent in self.index.dependents(id) {
                        self.undo_cascade(&dependent, Some(true), visited, touched);
                    }
                }
            }
            CascadeTarget::Edge { deleted } => {
                if on && !deleted {
                    for dependent in self.index.dependents(id) {
                        self.undo_cascade(&dependent, Some(true), visited, touched);
                    }
                } else if on && deleted {
                    // Keeping a deleted edge means its deleted endpoints must
                    // come back too.
                    for owner in self.index.undo_dependents(id) {
                        let deleted_vertex = matches!(
                            self.records.get(&owner).map(|r| &r.change),
                            Some(Change::Vertex(v)) if v.deleted
                        );
                        if deleted_vertex {
                            self.undo_cascade(&owner, Some(true), visited, touched);
                        }
                    }
                } else {
                    for owner in self.index.undo_dependents(id) {
                        self.undo_cascade(&owner, Some(false), visited, touched);
                    }
                }
            }
            CascadeTarget::Property => {
                if !on {
                    for owner in self.index.undo_dependents(id) {
                        let owner_undoing = matches!(
                            self.records.get(&owner),
                            Some(r) if r.undo
                        );
                        if owner_undoing {
                            self.undo_cascade(&owner, Some(false), visited, touched);
                        }
                    }
                }
            }
        }
    }
}
