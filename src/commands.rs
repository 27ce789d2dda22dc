//! CLI command implementations

use anyhow::Result;
use clap::ValueEnum;
use futures_util::{pin_mut, StreamExt};
use serde_json::json;

use trellis_client::{connect_push, push_url, HttpWorkspaceClient, PushMessage, ReviewSession};
use trellis_core::{ApplyKind, Change, DiffAction, DiffId, DiffRecord, ElementKind};

use crate::config::Config;

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

async fn open_session(config: &Config) -> Result<ReviewSession> {
    let api = HttpWorkspaceClient::new(config.server.clone(), config.token.clone());
    ReviewSession::connect(Box::new(api), config.workspace.clone()).await
}

pub async fn diff(config: &Config, format: OutputFormat) -> Result<()> {
    let session = open_session(config).await?;
    match format {
        OutputFormat::Json => {
            let set = session.diffs();
            let view = json!({
                "workspace": config.workspace,
                "elements": set.elements(),
                "records": set.records_ordered().collect::<Vec<_>>(),
                "summary": set.summary(),
            });
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        OutputFormat::Table => print_table(&session),
    }
    Ok(())
}

fn print_table(session: &ReviewSession) {
    let set = session.diffs();
    if set.is_empty() {
        println!("No pending changes.");
        return;
    }
    for element in set.elements() {
        let marker = match element.action {
            DiffAction::Create => '+',
            DiffAction::Delete => '-',
            DiffAction::Update => '~',
        };
        let kind = match element.kind {
            ElementKind::Vertex => "vertex",
            ElementKind::Edge => "edge",
        };
        println!("{marker} {kind} {} ({})", element.title, element.element_id);
        for id in element.change.iter().chain(element.properties.iter()) {
            let Some(record) = set.record(id) else {
                continue;
            };
            let label = match &record.change {
                Change::Vertex(_) | Change::Edge(_) => {
                    if record.change.deleted() {
                        "delete".to_string()
                    } else {
                        "create".to_string()
                    }
                }
                Change::Property(p) => {
                    let verb = if p.deleted { "delete" } else { "set" };
                    format!("{verb} {}", p.name)
                }
            };
            println!("    {label}{} ({id})", flags(record));
        }
    }
    println!("{}", set.summary());
}

fn flags(record: &DiffRecord) -> &'static str {
    if record.applying {
        " [applying]"
    } else if record.publish {
        " [publish]"
    } else if record.undo {
        " [undo]"
    } else {
        ""
    }
}

pub async fn publish(config: &Config, all: bool, ids: Vec<String>) -> Result<()> {
    apply(config, ApplyKind::Publish, all, ids).await
}

pub async fn undo(config: &Config, all: bool, ids: Vec<String>) -> Result<()> {
    apply(config, ApplyKind::Undo, all, ids).await
}

async fn apply(config: &Config, kind: ApplyKind, all: bool, ids: Vec<String>) -> Result<()> {
    if !all && ids.is_empty() {
        anyhow::bail!("nothing selected: pass --all or --id <ID>");
    }
    let mut session = open_session(config).await?;
    if all {
        session.select_all(kind);
    } else {
        for raw in &ids {
            let id = DiffId::new(raw.as_str());
            let marked = match kind {
                ApplyKind::Publish => session.set_publish(&id, true),
                ApplyKind::Undo => session.set_undo(&id, true),
            };
            if let Err(err) = marked {
                anyhow::bail!("cannot select {raw}: {err}");
            }
        }
    }

    let report = session.apply(kind).await?;
    if report.sent == 0 {
        println!("Nothing to {}.", kind.as_str());
        return Ok(());
    }
    println!("Applied {}/{} changes.", report.applied, report.sent);
    for failure in &report.failures {
        println!("  failed: {}: {}", failure.title, failure.message);
    }
    if !report.failures.is_empty() {
        println!("Failed records keep their selection; run the command again to retry.");
    }
    Ok(())
}

pub async fn watch(config: &Config) -> Result<()> {
    let mut session = open_session(config).await?;
    println!("{}", session.summary());

    let url = push_url(&config.server);
    let stream = connect_push(&url).await?;
    pin_mut!(stream);
    println!("Watching workspace {} for changes...", config.workspace);
    while let Some(message) = stream.next().await {
        if let PushMessage::WorkspaceChanged { workspace_id } = message {
            if workspace_id == config.workspace {
                session.refresh().await?;
                println!("{}", session.summary());
            }
        }
    }
    Ok(())
}
