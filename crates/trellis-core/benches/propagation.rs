use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use trellis_core::{
    ApplyKind, Change, DiffId, DiffRecord, DiffSet, EdgeChange, ElementKind, OntologyProperty,
    OntologyRelationship, OntologySnapshot, PriorIntent, PropertyChange, SandboxStatus,
    VertexChange,
};

fn bench_ontology() -> OntologySnapshot {
    OntologySnapshot::new(
        vec![OntologyProperty {
            name: "title".to_string(),
            display_name: "Title".to_string(),
            user_visible: true,
            dependent_property_iris: Vec::new(),
        }],
        vec![OntologyRelationship {
            label: "knows".to_string(),
            display_name: "Knows".to_string(),
            user_visible: true,
        }],
    )
}

/// A hub vertex joined to `n` spokes, each spoke carrying three properties.
fn workspace_records(n: usize) -> Vec<DiffRecord> {
    let mut records = Vec::new();
    records.push(vertex("hub"));
    for i in 0..n {
        let id = format!("v{i}");
        records.push(vertex(&id));
        records.push(DiffRecord::new(Change::Edge(EdgeChange {
            edge_id: format!("e{i}"),
            deleted: false,
            label: "knows".to_string(),
            in_vertex_id: id.clone(),
            out_vertex_id: "hub".to_string(),
            visibility_json: json!({}),
            sandbox_status: SandboxStatus::Private,
        })));
        for key in ["k1", "k2", "k3"] {
            records.push(DiffRecord::new(Change::Property(PropertyChange {
                element_id: id.clone(),
                element_kind: ElementKind::Vertex,
                name: "title".to_string(),
                key: key.to_string(),
                old: None,
                new: Some(json!("value")),
                deleted: false,
                sandbox_status: SandboxStatus::Private,
                dependent_name: None,
                constituents: Vec::new(),
            })));
        }
    }
    records
}

fn vertex(id: &str) -> DiffRecord {
    DiffRecord::new(Change::Vertex(VertexChange {
        vertex_id: id.to_string(),
        deleted: false,
        concept_type: "thing".to_string(),
        visibility_json: json!({}),
        title: Some(id.to_string()),
        sandbox_status: SandboxStatus::Private,
    }))
}

fn bench_build(c: &mut Criterion) {
    let ontology = bench_ontology();
    let records = workspace_records(200);
    c.bench_function("build_1001_records", |b| {
        b.iter(|| {
            DiffSet::build(
                black_box(records.clone()),
                &PriorIntent::default(),
                &ontology,
            )
        })
    });
}

fn bench_cascade(c: &mut Criterion) {
    let ontology = bench_ontology();
    let records = workspace_records(200);
    c.bench_function("unpublish_hub_cascade", |b| {
        b.iter_batched(
            || {
                let mut set = DiffSet::build(records.clone(), &PriorIntent::default(), &ontology);
                set.select_all(ApplyKind::Publish);
                set
            },
            |mut set| {
                set.mark_publish(black_box(&DiffId::new("hub")), Some(false))
                    .unwrap();
                set
            },
            criterion::BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_build, bench_cascade);
criterion_main!(benches);
