use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, Utc};
use procflow_application::ConversationService;
use std::path::Path;

pub async fn list(service: &ConversationService) {
    let sessions = service.sessions().await;
    if sessions.is_empty() {
        println!("No sessions yet. Start one with `procflow ask <text>`.");
        return;
    }
    let projects = service.projects().await;

    for session in sessions {
        let project = session
            .project_id
            .as_deref()
            .and_then(|id| projects.iter().find(|p| p.id == id))
            .map(|p| format!("  [{}]", p.name))
            .unwrap_or_default();
        println!(
            "{}  {}  {} turns  {}{}",
            session.id,
            local_time(session.updated_at),
            session.turns.len(),
            session.title,
            project
        );
    }
}

pub async fn show(service: &ConversationService, id: &str) -> Result<()> {
    let session = service
        .session(id)
        .await
        .with_context(|| format!("Session not found: {}", id))?;

    println!("{} ({})", session.title, session.id);
    println!("updated {}", local_time(session.updated_at));
    for (position, turn) in session.turns.iter().enumerate() {
        println!();
        println!(
            "#{} turn {}  [{}]  user {}/{}  assistant {}/{}",
            position + 1,
            turn.id,
            turn.status,
            turn.user.active_index().map_or(0, |i| i + 1),
            turn.user.len(),
            turn.assistant.active_index().map_or(0, |i| i + 1),
            turn.assistant.len(),
        );
        println!("> {}", turn.user.active_content().unwrap_or_default());
        if let Some(answer) = turn.assistant.active_content() {
            println!("{}", answer);
        }
    }
    Ok(())
}

pub async fn rename(service: &ConversationService, id: &str, title: &str) -> Result<()> {
    service.rename_session(id, title).await?;
    println!("Renamed {} to \"{}\"", id, title);
    Ok(())
}

pub async fn delete(service: &ConversationService, id: &str) -> Result<()> {
    service.delete_session(id).await?;
    println!("Deleted session {}", id);
    Ok(())
}

pub async fn clear(service: &ConversationService, confirmed: bool) -> Result<()> {
    if !confirmed {
        bail!("Refusing to delete every session without --yes");
    }
    let count = service.sessions().await.len();
    service.delete_all_sessions().await;
    println!("Deleted {} sessions", count);
    Ok(())
}

pub async fn export(service: &ConversationService, id: &str, output: Option<&Path>) -> Result<()> {
    let json = service.export_session(id).await?;
    match output {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Exported {} to {}", id, path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

pub async fn move_to_project(
    service: &ConversationService,
    id: &str,
    project: Option<&str>,
) -> Result<()> {
    service.move_session_to_project(id, project).await?;
    match project {
        Some(project) => println!("Moved {} into project {}", id, project),
        None => println!("Removed {} from its project", id),
    }
    Ok(())
}

pub async fn reorder(service: &ConversationService, ids: &[String]) {
    service.reorder_history(ids).await;
    list(service).await;
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}
