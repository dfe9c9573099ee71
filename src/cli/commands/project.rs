//! Project browsing commands.
//!
//! - `eeese projects list [--category C]` - List stored projects
//! - `eeese projects show <id>` - Show project details

use crate::cli::ProjectCommands;
use crate::error::{Error, Result};
use crate::model::Project;
use crate::storage::SqliteStorage;
use crate::validate::{find_similar_ids, normalize_category};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::open_existing;

#[derive(Serialize)]
struct ProjectListOutput {
    projects: Vec<Project>,
    count: usize,
}

/// Execute a project command.
///
/// # Errors
///
/// Returns an error if the database is missing, the category is unknown or
/// the project does not exist.
pub fn execute(command: &ProjectCommands, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_existing(db_path)?;

    match command {
        ProjectCommands::List { category } => execute_list(&storage, category.as_deref(), json),
        ProjectCommands::Show { id } => execute_show(&storage, id, json),
    }
}

fn execute_list(storage: &SqliteStorage, category: Option<&str>, json: bool) -> Result<()> {
    let category = category
        .map(|c| {
            normalize_category(c)
                .map_err(|(input, suggestion)| Error::InvalidCategory { input, suggestion })
        })
        .transpose()?;

    let projects = storage.list_projects(category)?;

    if json {
        let output = ProjectListOutput {
            count: projects.len(),
            projects,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if projects.is_empty() {
        match category {
            Some(c) => println!("No {} projects stored.", c.label()),
            None => println!("No projects stored."),
        }
        println!("\nFetch the catalogue with: eeese sync");
    } else {
        println!("Projects ({}):\n", projects.len());
        for project in &projects {
            println!("  {} [{}]", project.name.bold(), project.category.label());
            println!("    ID:   {}", project.id);
            if let Some(head) = &project.head {
                println!("    Head: {head}");
            }
            println!();
        }
    }

    Ok(())
}

fn execute_show(storage: &SqliteStorage, id: &str, json: bool) -> Result<()> {
    let project = match storage.get_project(id)? {
        Some(project) => project,
        None => {
            let ids: Vec<String> = storage.list_projects(None)?.into_iter().map(|p| p.id).collect();
            return Err(Error::ProjectNotFound {
                id: id.to_string(),
                similar: find_similar_ids(id, &ids, 3),
            });
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&project)?);
    } else {
        println!("Project: {}", project.name.bold());
        println!("  ID:          {}", project.id);
        println!("  Category:    {}", project.category.label());
        println!("  Head:        {}", project.head.as_deref().unwrap_or("-"));
        println!("  Description: {}", project.description.as_deref().unwrap_or("-"));
        if project.prerequisites.is_empty() {
            println!("  Prerequisites: none");
        } else {
            println!("  Prerequisites:");
            for prerequisite in &project.prerequisites {
                println!("    - {prerequisite}");
            }
        }
    }

    Ok(())
}
