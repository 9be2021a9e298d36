//! `validate` and `inspect` commands

use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

use buildlink_core::catalog::{BuildType, Project, RefreshSettings, Registry, LATEST};
use buildlink_core::config::ServiceConfig;
use buildlink_core::service;

/// Table row for schema validation results
#[derive(Tabled)]
struct ValidationRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Project")]
    project: String,
    #[tabled(rename = "Targets")]
    targets: String,
    #[tabled(rename = "Types")]
    types: String,
    #[tabled(rename = "Status")]
    status: String,
}

/// Table row for one type's builds
#[derive(Tabled)]
struct TypeRow {
    #[tabled(rename = "Project")]
    project: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Type")]
    type_id: String,
    #[tabled(rename = "Builds")]
    builds: String,
    #[tabled(rename = "Latest")]
    latest: String,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn type_count(project: &Project) -> usize {
    project.targets().iter().map(|t| t.types().len()).sum()
}

pub fn validate_command(projects_dir: &Path, json_output: bool) -> Result<()> {
    if !projects_dir.is_dir() {
        eprintln!(
            "Error: Projects directory does not exist: {}",
            projects_dir.display()
        );
        std::process::exit(1);
    }

    // Clients are built but never used, so nothing is fetched
    let config = ServiceConfig::default();
    let (registry, report) = Registry::load_dir(
        projects_dir,
        &RefreshSettings::default(),
        &service::connector(&config),
    )?;

    if json_output {
        let mut files: Vec<Value> = report
            .loaded
            .iter()
            .map(|(path, id)| {
                let project = registry.project(id);
                json!({
                    "file": file_name(path),
                    "project": id,
                    "status": "ok",
                    "targets": project.map(|p| p.targets().len()).unwrap_or(0),
                    "types": project.map(type_count).unwrap_or(0),
                })
            })
            .collect();
        files.extend(report.skipped.iter().map(|(path, reason)| {
            json!({
                "file": file_name(path),
                "status": "error",
                "error": reason,
            })
        }));

        let output = json!({
            "projects_dir": projects_dir.display().to_string(),
            "valid": !report.has_failures(),
            "files": files,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if report.loaded.is_empty() && report.skipped.is_empty() {
        println!("No project schemas found in {}", projects_dir.display());
    } else {
        let mut rows: Vec<ValidationRow> = report
            .loaded
            .iter()
            .map(|(path, id)| {
                let project = registry.project(id);
                ValidationRow {
                    file: file_name(path),
                    project: id.clone(),
                    targets: project.map(|p| p.targets().len()).unwrap_or(0).to_string(),
                    types: project.map(type_count).unwrap_or(0).to_string(),
                    status: "ok".to_string(),
                }
            })
            .collect();
        rows.extend(report.skipped.iter().map(|(path, reason)| ValidationRow {
            file: file_name(path),
            project: "-".to_string(),
            targets: "-".to_string(),
            types: "-".to_string(),
            status: format!("error: {reason}"),
        }));

        let table = Table::new(&rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()))
            .to_string();
        println!("{table}");
        println!(
            "\n{} valid, {} invalid",
            report.loaded.len(),
            report.skipped.len()
        );
    }

    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}

pub async fn inspect_command(
    config: ServiceConfig,
    project: Option<&str>,
    json_output: bool,
) -> Result<()> {
    let (registry, _) = service::load_registry(&config)?;
    if let Some(id) = project {
        if registry.project(id).is_none() {
            return Err(anyhow!("Unknown project '{id}'"));
        }
    }
    let registry = Arc::new(registry);
    registry.refresh_all().await;

    let selected: Vec<&Project> = registry
        .projects()
        .filter(|p| project.map_or(true, |id| p.identifier == id))
        .collect();

    if json_output {
        let tree: Vec<Value> = selected.iter().map(|p| project_json(p)).collect();
        let output = json!({"status": "success", "projects": tree});
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let rows: Vec<TypeRow> = selected
        .iter()
        .flat_map(|p| {
            p.targets().iter().flat_map(move |t| {
                t.types().iter().map(move |ty| TypeRow {
                    project: p.identifier.clone(),
                    target: t.identifier.clone(),
                    type_id: ty.identifier.clone(),
                    builds: join_or_dash(ty.build_keys()),
                    latest: latest_versions(ty),
                })
            })
        })
        .collect();

    if rows.is_empty() {
        println!("No types to show.");
        return Ok(());
    }

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();
    println!("{table}");
    Ok(())
}

fn join_or_dash(items: Vec<String>) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

fn latest_versions(ty: &BuildType) -> String {
    match ty.build(LATEST) {
        Some(build) => join_or_dash(
            build
                .versions
                .values()
                .map(|v| format!("{}={}", v.identifier, v.file_name))
                .collect(),
        ),
        None => "-".to_string(),
    }
}

fn project_json(project: &Project) -> Value {
    let targets: Vec<Value> = project
        .targets()
        .iter()
        .map(|t| {
            let types: Vec<Value> = t.types().iter().map(type_json).collect();
            json!({
                "identifier": t.identifier,
                "display_name": t.display_name.as_deref().unwrap_or(&t.identifier),
                "types": types,
            })
        })
        .collect();

    json!({
        "identifier": project.identifier,
        "display_name": project.display_name.as_deref().unwrap_or(&project.identifier),
        "jenkins_base": project.jenkins_base,
        "targets": targets,
    })
}

fn type_json(ty: &BuildType) -> Value {
    let builds: Vec<Value> = ty
        .builds()
        .values()
        .map(|b| {
            let versions: Vec<Value> = b
                .versions
                .values()
                .map(|v| {
                    json!({
                        "identifier": v.identifier,
                        "fileName": v.file_name,
                        "download": v.download_url,
                    })
                })
                .collect();
            json!({
                "identifier": b.identifier,
                "number": b.number,
                "versions": versions,
            })
        })
        .collect();

    json!({
        "identifier": ty.identifier,
        "display_name": ty.display_name.as_deref().unwrap_or(&ty.identifier),
        "description": ty.description.clone().unwrap_or_default(),
        "job_name": ty.job_name,
        "builds": builds,
    })
}
