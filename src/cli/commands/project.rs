//! `cockpit project` command - List and show stored projects

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{escape_csv, format_short_id, open_store, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::EntityId;
use crate::core::store::{ProjectStore, StoreError};
use crate::entities::project::ProjectDocument;

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// List stored projects
    List,

    /// Show one project with its phases and resources
    Show(ShowArgs),
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Project ID (PROJ-...) or exact project name
    pub project: String,
}

pub fn run(cmd: ProjectCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ProjectCommands::List => run_list(global),
        ProjectCommands::Show(args) => run_show(args, global),
    }
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let store = open_store()?;
    let projects = store.list().map_err(|e| miette::miette!("{}", e))?;

    let format = match global.format {
        OutputFormat::Auto => OutputFormat::Tsv,
        f => f,
    };

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&projects).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&projects).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Csv => {
            println!("id,name,phases,tasks,resources,modified");
            for p in &projects {
                println!(
                    "{},{},{},{},{},{}",
                    p.id,
                    escape_csv(&p.name),
                    p.phases,
                    p.tasks,
                    p.resources,
                    p.modified.format("%Y-%m-%dT%H:%M:%SZ")
                );
            }
        }
        OutputFormat::Tsv => {
            println!(
                "{:<16} {:<32} {:<7} {:<6} {:<9}",
                style("ID").bold(),
                style("NAME").bold(),
                style("PHASES").bold(),
                style("TASKS").bold(),
                style("RESOURCES").bold()
            );
            println!("{}", "-".repeat(74));
            for p in &projects {
                println!(
                    "{:<16} {:<32} {:<7} {:<6} {:<9}",
                    format_short_id(&p.id),
                    truncate_str(&p.name, 30),
                    p.phases,
                    p.tasks,
                    p.resources
                );
            }
            if !global.quiet {
                println!();
                println!("{} project(s) found", style(projects.len()).cyan());
            }
        }
        OutputFormat::Id => {
            for p in &projects {
                println!("{}", p.id);
            }
        }
        OutputFormat::Md => {
            let mut builder = Builder::default();
            builder.push_record(["ID", "Name", "Phases", "Tasks", "Resources"]);
            for p in &projects {
                builder.push_record([
                    p.id.to_string(),
                    p.name.clone(),
                    p.phases.to_string(),
                    p.tasks.to_string(),
                    p.resources.to_string(),
                ]);
            }
            println!("{}", builder.build().with(Style::markdown()));
        }
        OutputFormat::Auto => unreachable!(),
    }

    Ok(())
}

fn find_project(store: &dyn ProjectStore, key: &str) -> Result<ProjectDocument> {
    let id = match EntityId::parse(key) {
        Ok(id) => id,
        Err(_) => store
            .find_by_name(key)
            .map_err(|e| miette::miette!("{}", e))?
            .map(|summary| summary.id)
            .ok_or_else(|| miette::miette!("No project named '{}'", key))?,
    };

    match store.load(&id) {
        Ok(doc) => Ok(doc),
        Err(StoreError::NotFound(_)) => Err(miette::miette!("Project not found: {}", key)),
        Err(e) => Err(miette::miette!("{}", e)),
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let store = open_store()?;
    let doc = find_project(&store, &args.project)?;

    let format = match global.format {
        OutputFormat::Auto => OutputFormat::Yaml,
        f => f,
    };

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&doc).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&doc).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Id => println!("{}", doc.id),
        _ => print_plan(&doc),
    }

    Ok(())
}

/// Human-readable plan: phases with tasks and their assignees, then resources
fn print_plan(doc: &ProjectDocument) {
    println!("{} {}", style(&doc.name).bold(), style(&doc.id).dim());
    if let Some((start, end)) = doc.date_range() {
        println!("{} to {}", start, end);
    }
    println!();

    let mut tasks = Builder::default();
    tasks.push_record(["Phase", "Task", "Start", "End", "Assigned"]);
    for phase in &doc.phases {
        for task in &phase.tasks {
            let assigned: Vec<String> = task
                .resource_assignments
                .iter()
                .map(|a| {
                    let name = doc
                        .find_resource(&a.resource_id)
                        .map(|r| r.name.clone())
                        .unwrap_or_else(|| a.resource_id.to_string());
                    format!("{} {}%", name, a.allocation_percentage)
                })
                .collect();
            tasks.push_record([
                phase.name.clone(),
                task.name.clone(),
                task.start_date.to_string(),
                task.end_date.to_string(),
                assigned.join(", "),
            ]);
        }
    }
    println!("{}", tasks.build().with(Style::markdown()));
    println!();

    let mut resources = Builder::default();
    resources.push_record(["Resource", "Designation", "Category", "Man-days"]);
    for r in &doc.resources {
        resources.push_record([
            r.name.clone(),
            r.designation.to_string(),
            r.category.to_string(),
            format!("{}", r.total_days),
        ]);
    }
    println!("{}", resources.build().with(Style::markdown()));
}
