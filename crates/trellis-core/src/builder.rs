//! Grouping raw change records into a reviewable diff set

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::deps::DependencyIndex;
use crate::engine::InFlightPolicy;
use crate::model::{
    Change, DiffAction, DiffId, DiffRecord, DiffSummary, ElementDiff, ElementKind, ElementSummary,
    Intent, PriorIntent, PropertyChange, PLACEHOLDER_TITLE,
};
use crate::ontology::OntologySnapshot;

/// Every pending change of a workspace, grouped by element and wired into a
/// dependency index.
///
/// A `DiffSet` is always rebuilt whole from a flat record list; nothing
/// mutates its shape incrementally. Intent flags carry across rebuilds by
/// record id.
#[derive(Debug, Default)]
pub struct DiffSet {
    pub(crate) records: HashMap<DiffId, DiffRecord>,
    pub(crate) elements: Vec<ElementDiff>,
    pub(crate) element_index: HashMap<DiffId, usize>,
    pub(crate) index: DependencyIndex,
    pub(crate) in_flight_policy: InFlightPolicy,
}

impl DiffSet {
    /// Group a flat record list into elements and rebuild the dependency
    /// index.
    ///
    /// Records invisible under the ontology are filtered out, dependent
    /// properties fold into their compounds, and `prior` selections are
    /// re-applied by record id. Ids absent from the new records are simply
    /// forgotten.
    pub fn build(
        records: Vec<DiffRecord>,
        prior: &PriorIntent,
        ontology: &OntologySnapshot,
    ) -> DiffSet {
        let records: Vec<DiffRecord> = records
            .into_iter()
            .filter(|record| {
                let keep = keep_visible(record, ontology);
                if !keep {
                    debug!(record = %record.id, "dropping change not visible in ontology");
                }
                keep
            })
            .collect();
        let records = fold_compound_properties(records, ontology);

        let mut set = DiffSet::default();
        for mut record in records {
            if let Some(intent) = prior.get(&record.id) {
                record.publish = intent.publish;
                record.undo = intent.undo && !intent.publish;
            }
            record.applying = false;

            if set.records.contains_key(&record.id) {
                debug!(record = %record.id, "replacing duplicate change record");
                set.records.insert(record.id.clone(), record);
                continue;
            }

            let element_id = record.change.element_id();
            let slot = set.ensure_element(&element_id, record.change.element_kind());
            match &record.change {
                Change::Vertex(v) => {
                    let element = &mut set.elements[slot];
                    element.action = if v.deleted {
                        DiffAction::Delete
                    } else {
                        DiffAction::Create
                    };
                    element.change = Some(record.id.clone());
                    if let Some(title) = &v.title {
                        if !title.is_empty() {
                            element.title = title.clone();
                        }
                    }
                }
                Change::Edge(e) => {
                    let element = &mut set.elements[slot];
                    element.action = if e.deleted {
                        DiffAction::Delete
                    } else {
                        DiffAction::Create
                    };
                    element.change = Some(record.id.clone());
                    element.title = ontology
                        .relationship_by_label(&e.label)
                        .map(|r| r.display_name.clone())
                        .unwrap_or_else(|| e.label.clone());
                    set.index
                        .add_dependency(&DiffId::new(&e.in_vertex_id), &record.id);
                    set.index
                        .add_dependency(&DiffId::new(&e.out_vertex_id), &record.id);
                }
                Change::Property(_) => {
                    set.elements[slot].properties.push(record.id.clone());
                    set.index.add_dependency(&element_id, &record.id);
                }
            }
            set.records.insert(record.id.clone(), record);
        }
        debug_assert!(set.index.is_acyclic(), "dependency index must stay acyclic");
        debug!(
            records = set.records.len(),
            elements = set.elements.len(),
            "grouped change records"
        );
        set
    }

    fn ensure_element(&mut self, element_id: &DiffId, kind: ElementKind) -> usize {
        if let Some(&slot) = self.element_index.get(element_id) {
            return slot;
        }
        self.elements.push(ElementDiff {
            element_id: element_id.clone(),
            kind,
            title: PLACEHOLDER_TITLE.to_string(),
            action: DiffAction::Update,
            change: None,
            properties: Vec::new(),
            applying: false,
        });
        self.element_index
            .insert(element_id.clone(), self.elements.len() - 1);
        self.elements.len() - 1
    }

    /// Grouped element rows, in first-reference order.
    pub fn elements(&self) -> &[ElementDiff] {
        &self.elements
    }

    pub fn element(&self, element_id: &DiffId) -> Option<&ElementDiff> {
        self.element_index
            .get(element_id)
            .map(|&slot| &self.elements[slot])
    }

    pub fn record(&self, id: &DiffId) -> Option<&DiffRecord> {
        self.records.get(id)
    }

    /// Records in deterministic order: element order, own change before
    /// properties.
    pub fn records_ordered(&self) -> impl Iterator<Item = &DiffRecord> {
        self.elements
            .iter()
            .flat_map(|element| element.change.iter().chain(element.properties.iter()))
            .filter_map(move |id| self.records.get(id))
    }

    /// Element ids of the given kind, in element order.
    pub fn element_ids(&self, kind: ElementKind) -> Vec<DiffId> {
        self.elements
            .iter()
            .filter(|element| element.kind == kind)
            .map(|element| element.element_id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn in_flight_policy(&self) -> InFlightPolicy {
        self.in_flight_policy
    }

    pub fn set_in_flight_policy(&mut self, policy: InFlightPolicy) {
        self.in_flight_policy = policy;
    }

    /// Snapshot of the current publish/undo selections, keyed by record id.
    pub fn intent_snapshot(&self) -> PriorIntent {
        self.records
            .values()
            .filter(|record| record.publish || record.undo)
            .map(|record| {
                (
                    record.id.clone(),
                    Intent {
                        publish: record.publish,
                        undo: record.undo,
                    },
                )
            })
            .collect()
    }

    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary::default();
        for element in &self.elements {
            match element.kind {
                ElementKind::Vertex => summary.vertices += 1,
                ElementKind::Edge => summary.edges += 1,
            }
            summary.properties += element.properties.len();
        }
        for record in self.records.values() {
            if record.publish {
                summary.publishable += 1;
            }
            if record.undo {
                summary.undoable += 1;
            }
        }
        summary
    }

    /// Apply fetched titles. Ids without an element row are ignored, and
    /// elements without a fetched title keep their placeholder.
    pub fn decorate_titles(&mut self, summaries: &[ElementSummary]) {
        for summary in summaries {
            if let Some(&slot) = self.element_index.get(&summary.id) {
                if !summary.title.is_empty() {
                    self.elements[slot].title = summary.title.clone();
                }
            }
        }
    }
}

/// Visibility filter applied before grouping.
///
/// Vertex records always pass. Edge and property records must resolve to a
/// user-visible ontology entry; dependents of a compound inherit the
/// compound's visibility.
fn keep_visible(record: &DiffRecord, ontology: &OntologySnapshot) -> bool {
    match &record.change {
        Change::Vertex(_) => true,
        Change::Edge(e) => ontology
            .relationship_by_label(&e.label)
            .map(|rel| rel.user_visible)
            .unwrap_or(false),
        Change::Property(p) => {
            if let Some(compound) = ontology.compound_for(&p.name) {
                return compound.user_visible;
            }
            ontology
                .property_by_name(&p.name)
                .map(|prop| prop.user_visible)
                .unwrap_or(false)
        }
    }
}

/// Fold dependent-property records into single compound records.
///
/// Records sharing an element, compound, and key merge into one synthesized
/// record whose old/new values are arrays ordered like the compound's
/// dependent list. The folded record takes the position of its first
/// constituent and derives its id from the compound name, so it stays stable
/// across rebuilds. Everything else passes through untouched.
pub fn fold_compound_properties(
    records: Vec<DiffRecord>,
    ontology: &OntologySnapshot,
) -> Vec<DiffRecord> {
    let mut out: Vec<DiffRecord> = Vec::with_capacity(records.len());
    let mut slot_by_id: HashMap<DiffId, usize> = HashMap::new();

    for record in records {
        let compound_name = match &record.change {
            Change::Property(p) => ontology.compound_for(&p.name).map(|c| c.name.clone()),
            _ => None,
        };
        let Some(compound_name) = compound_name else {
            out.push(record);
            continue;
        };
        let Change::Property(mut prop) = record.change else {
            continue;
        };
        prop.dependent_name = Some(prop.name.clone());

        let folded_id = DiffId::property(&prop.element_id, &compound_name, &prop.key);
        match slot_by_id.get(&folded_id) {
            Some(&slot) => {
                if let Change::Property(target) = &mut out[slot].change {
                    target.constituents.push(prop);
                }
            }
            None => {
                let shell = PropertyChange {
                    element_id: prop.element_id.clone(),
                    element_kind: prop.element_kind,
                    name: compound_name,
                    key: prop.key.clone(),
                    old: None,
                    new: None,
                    deleted: false,
                    sandbox_status: prop.sandbox_status,
                    dependent_name: None,
                    constituents: vec![prop],
                };
                slot_by_id.insert(folded_id, out.len());
                out.push(DiffRecord::new(Change::Property(shell)));
            }
        }
    }

    for record in &mut out {
        let Change::Property(p) = &mut record.change else {
            continue;
        };
        if p.constituents.is_empty() {
            continue;
        }
        let Some(compound) = ontology.property_by_name(&p.name) else {
            continue;
        };
        let olds = collect_values(&compound.dependent_property_iris, &p.constituents, |c| {
            c.old.clone()
        });
        let news = collect_values(&compound.dependent_property_iris, &p.constituents, |c| {
            c.new.clone()
        });
        p.old = (olds.iter().any(|v| !v.is_null())).then(|| Value::Array(olds));
        p.new = (news.iter().any(|v| !v.is_null())).then(|| Value::Array(news));
        p.deleted = p.constituents.iter().all(|c| c.deleted);
    }
    out
}

fn collect_values(
    order: &[String],
    constituents: &[PropertyChange],
    pick: impl Fn(&PropertyChange) -> Option<Value>,
) -> Vec<Value> {
    order
        .iter()
        .map(|name| {
            constituents
                .iter()
                .find(|c| c.dependent_name.as_deref() == Some(name))
                .and_then(&pick)
                .unwrap_or(Value::Null)
        })
        .collect()
}
