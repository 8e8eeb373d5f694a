//! In-memory project collection and the weak session references to it.

use procflow_core::conversation::Session;
use procflow_core::error::{ProcflowError, Result};
use procflow_core::project::Project;

/// Projects in creation order.
///
/// Every mutation that can orphan a `Session::project_id` takes the sessions
/// along, so no dangling reference survives a call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectIndex {
    projects: Vec<Project>,
}

impl ProjectIndex {
    pub fn new(projects: Vec<Project>) -> Self {
        Self { projects }
    }

    pub fn list(&self) -> &[Project] {
        &self.projects
    }

    pub fn get(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|project| project.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn create(&mut self, name: impl Into<String>, color: impl Into<String>) -> Project {
        let project = Project::new(name, color);
        self.projects.push(project.clone());
        project
    }

    pub fn rename(&mut self, id: &str, name: impl Into<String>) -> Result<&Project> {
        let project = self
            .projects
            .iter_mut()
            .find(|project| project.id == id)
            .ok_or_else(|| ProcflowError::not_found("Project", id))?;
        project.name = name.into();
        Ok(project)
    }

    /// Removes a project and nulls every session reference to it.
    ///
    /// Returns the removed project and the number of sessions detached.
    pub fn remove(&mut self, id: &str, sessions: &mut [Session]) -> Result<(Project, usize)> {
        let position = self
            .projects
            .iter()
            .position(|project| project.id == id)
            .ok_or_else(|| ProcflowError::not_found("Project", id))?;
        let project = self.projects.remove(position);
        let detached = detach_sessions(id, sessions);
        Ok((project, detached))
    }

    /// Points a session at a project, or detaches it with `None`.
    pub fn assign(&self, session: &mut Session, project_id: Option<&str>) -> Result<()> {
        if let Some(id) = project_id {
            if !self.contains(id) {
                return Err(ProcflowError::not_found("Project", id));
            }
        }
        session.project_id = project_id.map(str::to_string);
        Ok(())
    }

    /// Nulls references to projects that no longer exist.
    pub fn prune_dangling(&self, sessions: &mut [Session]) -> usize {
        let mut pruned = 0;
        for session in sessions.iter_mut() {
            let dangling = session
                .project_id
                .as_deref()
                .is_some_and(|id| !self.contains(id));
            if dangling {
                session.project_id = None;
                pruned += 1;
            }
        }
        pruned
    }
}

/// Nulls `project_id` on every session pointing at `project_id`.
pub(crate) fn detach_sessions(project_id: &str, sessions: &mut [Session]) -> usize {
    let mut detached = 0;
    for session in sessions.iter_mut() {
        if session.project_id.as_deref() == Some(project_id) {
            session.project_id = None;
            detached += 1;
        }
    }
    detached
}
