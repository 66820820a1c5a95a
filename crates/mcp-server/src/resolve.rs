use crate::app::AppState;
use crate::error::AppError;

/// Resolves a tool call's `path`/`project` pair to a normalized tree path
/// (spec.md §6: "Either `path` (absolute) or `project` (registered name)
/// resolves the tree; absence yields an error that lists registered
/// projects").
pub fn resolve_tree(state: &AppState, path: Option<&str>, project: Option<&str>) -> Result<String, AppError> {
    if let Some(path) = path {
        return Ok(eidetic_indexer::normalize_path(path));
    }
    if let Some(project) = project {
        return state.registry.resolve_project(project).ok_or_else(|| {
            AppError::InvalidRequest(format!(
                "no registered project named {project:?}.\n{}",
                registered_projects_blob(state)
            ))
        });
    }
    Err(AppError::InvalidRequest(format!(
        "either `path` or `project` is required.\n{}",
        registered_projects_blob(state)
    )))
}

fn registered_projects_blob(state: &AppState) -> String {
    let projects = state.registry.list_projects();
    if projects.is_empty() {
        return "No projects are registered yet.".to_string();
    }
    let mut lines = vec!["Registered projects:".to_string()];
    for (name, path) in projects {
        lines.push(format!("  {name} -> {path}"));
    }
    lines.join("\n")
}
