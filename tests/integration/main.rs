//! Integration tests for Trellis
//!
//! Drive the full review pipeline the way the CLI does: raw feed JSON in,
//! grouped diff set, intent cascades, wire batch out, server verdict folded
//! back, regrouped survivors.

use serde_json::json;

use trellis_core::{
    build_batch, reconcile, ApplyKind, Change, DiffAction, DiffId, DiffRecord, DiffSet,
    OntologyDefinitions, OntologySnapshot, PriorIntent, WireFailure,
};

fn ontology() -> OntologySnapshot {
    let definitions: OntologyDefinitions = serde_json::from_value(json!({
        "properties": [
            { "name": "title", "displayName": "Title", "userVisible": true },
            { "name": "secret", "displayName": "Secret", "userVisible": false },
            {
                "name": "fullName",
                "displayName": "Full Name",
                "userVisible": true,
                "dependentPropertyIris": ["firstName", "lastName"]
            },
            { "name": "firstName", "displayName": "First Name", "userVisible": false },
            { "name": "lastName", "displayName": "Last Name", "userVisible": false }
        ],
        "relationships": [
            { "label": "knows", "displayName": "Knows", "userVisible": true }
        ]
    }))
    .unwrap();
    OntologySnapshot::from_definitions(definitions)
}

fn feed() -> Vec<DiffRecord> {
    let changes: Vec<Change> = serde_json::from_value(json!([
        {
            "type": "vertex",
            "vertexId": "v1",
            "title": "Alice",
            "conceptType": "person",
            "sandboxStatus": "PRIVATE"
        },
        {
            "type": "property",
            "elementId": "v1",
            "elementType": "vertex",
            "name": "firstName",
            "key": "k1",
            "new": "Alice",
            "sandboxStatus": "PRIVATE"
        },
        {
            "type": "property",
            "elementId": "v1",
            "elementType": "vertex",
            "name": "lastName",
            "key": "k1",
            "new": "Liddell",
            "sandboxStatus": "PRIVATE"
        },
        {
            "type": "property",
            "elementId": "v1",
            "elementType": "vertex",
            "name": "secret",
            "key": "k1",
            "new": "hidden",
            "sandboxStatus": "PRIVATE"
        },
        {
            "type": "vertex",
            "vertexId": "v2",
            "title": "Bob",
            "conceptType": "person",
            "sandboxStatus": "PRIVATE"
        },
        {
            "type": "edge",
            "edgeId": "e1",
            "label": "knows",
            "outVertexId": "v1",
            "inVertexId": "v2",
            "sandboxStatus": "PRIVATE"
        },
        {
            "type": "property",
            "elementId": "e1",
            "elementType": "edge",
            "name": "title",
            "key": "",
            "new": "since 1865",
            "sandboxStatus": "PRIVATE"
        }
    ]))
    .unwrap();
    changes.into_iter().map(DiffRecord::new).collect()
}

#[test]
fn test_feed_to_publish_batch_and_back() {
    let ontology = ontology();
    let mut set = DiffSet::build(feed(), &PriorIntent::default(), &ontology);

    // The hidden property is filtered and the name parts fold into one
    // compound record.
    assert_eq!(set.len(), 5);
    assert_eq!(set.elements().len(), 3);
    let v1 = set.element(&DiffId::new("v1")).unwrap();
    assert_eq!(v1.action, DiffAction::Create);
    assert_eq!(v1.properties, vec![DiffId::new("v1#fullName#k1")]);
    assert_eq!(set.element(&DiffId::new("e1")).unwrap().title, "Knows");

    // Publishing the edge pulls both endpoint vertices into the selection.
    set.mark_publish(&DiffId::new("e1"), Some(true)).unwrap();
    assert!(set.record(&DiffId::new("v1")).unwrap().publish);
    assert!(set.record(&DiffId::new("v2")).unwrap().publish);

    let batch = build_batch(&mut set, ApplyKind::Publish);
    assert_eq!(
        serde_json::to_value(&batch).unwrap(),
        json!([
            { "type": "vertex", "vertexId": "v1", "action": "create", "status": "PRIVATE" },
            { "type": "vertex", "vertexId": "v2", "action": "create", "status": "PRIVATE" },
            {
                "type": "relationship",
                "edgeId": "e1",
                "sourceId": "v1",
                "destId": "v2",
                "action": "create",
                "status": "PRIVATE"
            }
        ])
    );

    // The server rejects the edge; both vertices go through.
    let failures = vec![WireFailure {
        kind: "relationship".to_string(),
        edge_id: Some("e1".to_string()),
        error_message: "edge visibility conflict".to_string(),
        ..WireFailure::default()
    }];
    let survivors = reconcile(set, ApplyKind::Publish, &failures);
    let rebuilt = DiffSet::build(survivors, &PriorIntent::default(), &ontology);

    assert_eq!(rebuilt.len(), 3);
    assert!(rebuilt.record(&DiffId::new("v1")).is_none());
    let edge = rebuilt.record(&DiffId::new("e1")).unwrap();
    assert!(edge.publish && !edge.applying);
    // The compound property kept its identity and stayed unselected.
    assert!(!rebuilt.record(&DiffId::new("v1#fullName#k1")).unwrap().publish);
}

#[test]
fn test_undo_selection_round_trips_through_rebuilds() {
    let ontology = ontology();
    let mut set = DiffSet::build(feed(), &PriorIntent::default(), &ontology);

    // Discarding the v1 creation discards everything hanging off it.
    set.mark_undo(&DiffId::new("v1"), Some(true)).unwrap();
    assert!(set.record(&DiffId::new("v1#fullName#k1")).unwrap().undo);
    assert!(set.record(&DiffId::new("e1")).unwrap().undo);
    assert!(set.record(&DiffId::new("e1#title#")).unwrap().undo);
    assert!(!set.record(&DiffId::new("v2")).unwrap().undo);

    // A fresh feed with the same ids keeps the selection.
    let prior = set.intent_snapshot();
    let rebuilt = DiffSet::build(feed(), &prior, &ontology);
    assert!(rebuilt.record(&DiffId::new("e1")).unwrap().undo);
    assert_eq!(rebuilt.summary().undoable, 4);

    // Applying the undo batch empties the workspace view.
    let mut set = rebuilt;
    let batch = build_batch(&mut set, ApplyKind::Undo);
    assert_eq!(batch.len(), 4);
    let survivors = reconcile(set, ApplyKind::Undo, &[]);
    let emptied = DiffSet::build(survivors, &PriorIntent::default(), &ontology);
    assert_eq!(emptied.len(), 1);
    assert!(emptied.record(&DiffId::new("v2")).is_some());
}
