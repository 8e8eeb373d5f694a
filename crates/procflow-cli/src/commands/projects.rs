use anyhow::Result;
use procflow_application::ConversationService;

pub async fn list(service: &ConversationService) {
    let projects = service.projects().await;
    if projects.is_empty() {
        println!("No projects.");
        return;
    }
    let sessions = service.sessions().await;
    for project in projects {
        let count = sessions
            .iter()
            .filter(|s| s.project_id.as_deref() == Some(project.id.as_str()))
            .count();
        println!(
            "{}  {}  {}  {} sessions",
            project.id, project.color, project.name, count
        );
    }
}

pub async fn create(service: &ConversationService, name: &str, color: &str) {
    let project = service.create_project(name, color).await;
    println!("Created project {} ({})", project.name, project.id);
}

pub async fn rename(service: &ConversationService, id: &str, name: &str) -> Result<()> {
    let project = service.rename_project(id, name).await?;
    println!("Renamed {} to \"{}\"", project.id, project.name);
    Ok(())
}

pub async fn delete(service: &ConversationService, id: &str) -> Result<()> {
    let detached = service.delete_project(id).await?;
    println!("Deleted project {}; {} sessions detached", id, detached);
    Ok(())
}
