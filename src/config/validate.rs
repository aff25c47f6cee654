// src/config/validate.rs

use crate::config::file::{RawWorkspaceFile, WorkspaceFile};
use crate::errors::{Result, RundagError};
use crate::project::{ProjectGraph, ProjectNode};

impl TryFrom<RawWorkspaceFile> for WorkspaceFile {
    type Error = crate::errors::RundagError;

    fn try_from(raw: RawWorkspaceFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_file(&raw)?;

        let mut graph = ProjectGraph::default();
        for (name, project) in &raw.project {
            graph.nodes.insert(
                name.clone(),
                ProjectNode {
                    name: name.clone(),
                    root: project
                        .root
                        .clone()
                        .unwrap_or_else(|| std::path::PathBuf::from(name)),
                    targets: project.targets.clone(),
                },
            );
            graph
                .dependencies
                .insert(name.clone(), project.depends_on.clone());
        }

        Ok(WorkspaceFile::new_unchecked(raw.workspace, graph))
    }
}

fn validate_raw_file(raw: &RawWorkspaceFile) -> Result<()> {
    validate_project_references(raw)?;
    validate_runner_definitions(raw)?;
    Ok(())
}

fn validate_project_references(raw: &RawWorkspaceFile) -> Result<()> {
    for (name, project) in raw.project.iter() {
        for dep in project.depends_on.iter() {
            if !raw.project.contains_key(dep) {
                return Err(RundagError::ConfigError(format!(
                    "project '{name}' has unknown dependency '{dep}' in `depends_on`"
                )));
            }
            if dep == name {
                return Err(RundagError::ConfigError(format!(
                    "project '{name}' cannot depend on itself in `depends_on`"
                )));
            }
        }
    }
    Ok(())
}

fn validate_runner_definitions(raw: &RawWorkspaceFile) -> Result<()> {
    for (name, definition) in raw.workspace.runners.iter() {
        if let Some(module) = &definition.runner
            && module.trim().is_empty()
        {
            return Err(RundagError::ConfigError(format!(
                "runner '{name}' has an empty module reference"
            )));
        }
    }
    Ok(())
}
