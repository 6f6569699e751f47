//! `cockpit import` command - Import a schedule and resource roster

use console::style;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use miette::{IntoDiagnostic, Result, WrapErr};
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{open_store, print_warnings, split_key_value};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::EntityId;
use crate::core::Config;
use crate::entities::resource::{Category, Designation};
use crate::import::conflict::{
    ConflictDetectionResult, ConflictResolution, ConflictResolver, PresetResolver,
    ResolutionError, Strategy,
};
use crate::import::diagnostics::{ImportDiagnostic, ParseIssue};
use crate::import::resource::{ResourceMapping, UnmappedResource};
use crate::import::session::{
    CommitOutcome, CommitSummary, ImportOrchestrator, ImportSession, ImportStage, ImportTarget,
    SessionOptions,
};

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// Schedule file: phase, task, start date, end date, deliverables
    pub schedule: PathBuf,

    /// Resource file: name, designation, man-days per week
    pub resources: PathBuf,

    /// Append to an existing project (PROJ-...)
    #[arg(long, value_name = "ID", required_unless_present = "new", conflicts_with = "new")]
    pub project: Option<EntityId>,

    /// Create a new project with this name
    #[arg(long = "new", value_name = "NAME")]
    pub new: Option<String>,

    /// Designation for an unrecognised resource row
    #[arg(long = "map", value_name = "ROW=DESIGNATION[:CATEGORY]", value_parser = parse_mapping)]
    pub map: Vec<(usize, ResourceMapping)>,

    /// How to settle name conflicts with the target project
    #[arg(long, value_name = "refresh|merge")]
    pub strategy: Option<Strategy>,

    /// Name to use for a conflicting entity when merging
    #[arg(long = "rename", value_name = "CONFLICT=NAME", value_parser = parse_rename)]
    pub rename: Vec<(String, String)>,

    /// Parse, allocate and check conflicts without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Prompt for missing mappings and conflict resolution
    #[arg(long, short = 'i')]
    pub interactive: bool,
}

fn parse_mapping(s: &str) -> std::result::Result<(usize, ResourceMapping), String> {
    let (row, mapping) = split_key_value(s)?;
    let row: usize = row
        .parse()
        .map_err(|_| format!("row must be a number, got '{}'", row))?;
    Ok((row, mapping.parse()?))
}

fn parse_rename(s: &str) -> std::result::Result<(String, String), String> {
    let (id, name) = split_key_value(s)?;
    Ok((id.to_string(), name.to_string()))
}

pub fn run(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let config = Config::load();
    let mut store = open_store()?;
    let options = SessionOptions {
        delimiter: config.delimiter(),
        date_order: config.date_order(),
        author: config.author(),
    };
    let delimiter = options.delimiter;

    let schedule_text = read_input(&args.schedule)?;
    let resource_text = read_input(&args.resources)?;

    if !global.quiet {
        eprintln!(
            "{} Importing {} and {}{}",
            style("→").blue(),
            style(args.schedule.display()).yellow(),
            style(args.resources.display()).yellow(),
            if args.dry_run {
                style(" (dry run)").dim().to_string()
            } else {
                String::new()
            }
        );
    }

    let mut orchestrator = ImportOrchestrator::new();
    let session = orchestrator.begin(options).map_err(|e| miette::miette!("{}", e))?;

    // Schedule
    let result = session
        .submit_schedule(&schedule_text)
        .map_err(|e| miette::miette!("{}", e))?;
    print_warnings(&result.warnings, global.quiet);
    if !result.success {
        return Err(parse_failure(
            "Schedule has errors",
            &args.schedule,
            &schedule_text,
            delimiter,
            &result.errors,
        ));
    }
    session.advance().map_err(|e| miette::miette!("{}", e))?;

    // Resources
    let result = session
        .submit_resources(&resource_text)
        .map_err(|e| miette::miette!("{}", e))?;
    print_warnings(&result.warnings, global.quiet);
    if !result.success {
        return Err(parse_failure(
            "Resource list has errors",
            &args.resources,
            &resource_text,
            delimiter,
            &result.errors,
        ));
    }

    // Mapping
    if session.advance().map_err(|e| miette::miette!("{}", e))? == ImportStage::Mapping {
        map_resources(session, &args)?;
        session.advance().map_err(|e| miette::miette!("{}", e))?;
    } else if !args.map.is_empty() && !global.quiet {
        eprintln!(
            "{} Every designation was recognised; --map ignored",
            style("!").yellow()
        );
    }

    // Review
    if let Some(candidate) = session.candidate() {
        print_warnings(&candidate.allocation.warnings, global.quiet);
        if !global.quiet {
            eprintln!(
                "{} {} phase(s), {} task(s), {} resource(s), {} assignment(s) ready",
                style("✓").green(),
                candidate.phases.len(),
                candidate.task_count(),
                candidate.resources.len(),
                candidate.assignment_count()
            );
        }
    }

    let target = match (&args.project, &args.new) {
        (Some(id), _) => ImportTarget::Append(id.clone()),
        (None, Some(name)) => ImportTarget::CreateNew(name.clone()),
        (None, None) => return Err(miette::miette!("Choose a target with --project or --new")),
    };
    session
        .set_target(target)
        .map_err(|e| miette::miette!("{}", e))?;

    if args.dry_run {
        let detection = session
            .preview_conflicts(&store)
            .map_err(|e| miette::miette!("{}", e))?;
        if detection.has_conflicts {
            print_conflicts(&detection);
        }
        eprintln!();
        eprintln!(
            "{}",
            style("Dry run complete. No project was written.").yellow()
        );
        orchestrator.close();
        return Ok(());
    }

    let outcome = session
        .commit(&mut store)
        .map_err(|e| miette::miette!("{}", e))?;

    let summary = match outcome {
        CommitOutcome::Committed(summary) => summary,
        CommitOutcome::Conflicts(detection) => {
            print_conflicts(&detection);

            let mut resolver: Box<dyn ConflictResolver> = if args.interactive {
                Box::new(PromptResolver::default())
            } else {
                Box::new(PresetResolver::new(args.strategy.map(|strategy| {
                    ConflictResolution {
                        strategy,
                        custom_names: args.rename.iter().cloned().collect(),
                    }
                })))
            };

            let resolution = match resolver.resolve(&detection) {
                Ok(resolution) => resolution,
                Err(ResolutionError::Cancelled) => {
                    return Err(miette::miette!(
                        help = "Rerun with --strategy merge (optionally --rename ID=NAME), --strategy refresh, or --interactive",
                        "{} conflict(s) with the target project need a resolution",
                        detection.conflicts.len()
                    ));
                }
                Err(e) => return Err(miette::miette!("{}", e)),
            };

            match session
                .resolve(&resolution, &mut store)
                .map_err(|e| miette::miette!("{}", e))?
            {
                CommitOutcome::Committed(summary) => summary,
                CommitOutcome::Conflicts(_) => {
                    return Err(miette::miette!("Conflicts remain after resolution"))
                }
            }
        }
    };

    orchestrator.close();
    print_summary(&summary, global)
}

fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read {}", path.display()))
}

fn parse_failure(
    title: &str,
    path: &Path,
    text: &str,
    delimiter: u8,
    issues: &[ParseIssue],
) -> miette::Report {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    miette::Report::new(ImportDiagnostic::new(
        title, &filename, text, delimiter, issues,
    ))
}

/// Apply `--map` flags, then prompt for whatever is left when interactive
fn map_resources(session: &mut ImportSession, args: &ImportArgs) -> Result<()> {
    for (row, mapping) in &args.map {
        session
            .apply_mapping(*row, *mapping)
            .map_err(|e| miette::miette!("--map {}: {}", row, e))?;
    }

    let remaining: Vec<UnmappedResource> = session
        .roster()
        .map(|roster| {
            roster
                .unmapped_resources
                .iter()
                .filter(|u| !session.mappings().contains_key(&u.row_number))
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    if remaining.is_empty() {
        return Ok(());
    }

    if !args.interactive {
        let mut table = Builder::default();
        table.push_record(["Row", "Name", "Designation", "Suggested category"]);
        for u in &remaining {
            table.push_record([
                u.row_number.to_string(),
                u.name.clone(),
                u.original_designation.clone(),
                u.suggested_category
                    .map(|c| c.to_string())
                    .unwrap_or_default(),
            ]);
        }
        eprintln!("{}", table.build().with(Style::markdown()));
        return Err(miette::miette!(
            help = format!(
                "Map each row with --map ROW=DESIGNATION[:CATEGORY] (designations: {})",
                Designation::all()
                    .iter()
                    .map(|d| d.label())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            "{} resource(s) have an unrecognised designation",
            remaining.len()
        ));
    }

    let theme = ColorfulTheme::default();
    let designations: Vec<&str> = Designation::all().iter().map(|d| d.label()).collect();
    let categories: Vec<&str> = Category::all().iter().map(|c| c.label()).collect();

    for unmapped in remaining {
        let designation = Designation::all()[Select::with_theme(&theme)
            .with_prompt(format!(
                "Row {}: designation for {} ('{}')",
                unmapped.row_number, unmapped.name, unmapped.original_designation
            ))
            .items(&designations)
            .default(0)
            .interact()
            .into_diagnostic()?];

        let default_category = unmapped
            .suggested_category
            .unwrap_or_else(|| designation.category());
        let category_idx = Category::all()
            .iter()
            .position(|c| *c == default_category)
            .unwrap_or(0);
        let category = Category::all()[Select::with_theme(&theme)
            .with_prompt("Category")
            .items(&categories)
            .default(category_idx)
            .interact()
            .into_diagnostic()?];

        session
            .apply_mapping(
                unmapped.row_number,
                ResourceMapping::with_category(designation, category),
            )
            .map_err(|e| miette::miette!("{}", e))?;
    }
    Ok(())
}

/// Asks for a strategy, then a name for each conflict when merging
#[derive(Default)]
struct PromptResolver {
    theme: ColorfulTheme,
}

impl ConflictResolver for PromptResolver {
    fn resolve(
        &mut self,
        detection: &ConflictDetectionResult,
    ) -> std::result::Result<ConflictResolution, ResolutionError> {
        let choices = [
            "Smart merge: rename the imported entities and append them",
            "Total refresh: replace the project's phases and resources",
            "Cancel",
        ];
        let choice = Select::with_theme(&self.theme)
            .with_prompt("How should the conflicts be resolved?")
            .items(&choices)
            .default(0)
            .interact()
            .map_err(|e| ResolutionError::Prompt(e.to_string()))?;

        match choice {
            0 => {
                let mut resolution = ConflictResolution::merge();
                for conflict in &detection.conflicts {
                    let suggestion = conflict.suggested_rename.clone().unwrap_or_default();
                    let name: String = Input::with_theme(&self.theme)
                        .with_prompt(format!(
                            "New name for {} '{}'",
                            conflict.kind, conflict.detail.incoming_name
                        ))
                        .default(suggestion.clone())
                        .interact_text()
                        .map_err(|e| ResolutionError::Prompt(e.to_string()))?;
                    if name.trim() != suggestion {
                        resolution = resolution.with_name(conflict.id.clone(), name);
                    }
                }
                Ok(resolution)
            }
            1 => Ok(ConflictResolution::refresh()),
            _ => Err(ResolutionError::Cancelled),
        }
    }
}

fn print_conflicts(detection: &ConflictDetectionResult) {
    eprintln!(
        "{} {} phase and {} resource name(s) already exist in the target project",
        style("!").yellow(),
        detection.summary.phase_conflicts,
        detection.summary.resource_conflicts
    );
    let mut table = Builder::default();
    table.push_record(["Conflict", "Existing", "Incoming", "Suggested rename"]);
    for conflict in &detection.conflicts {
        table.push_record([
            conflict.id.clone(),
            conflict.detail.existing_name.clone(),
            conflict.detail.incoming_name.clone(),
            conflict.suggested_rename.clone().unwrap_or_default(),
        ]);
    }
    eprintln!("{}", table.build().with(Style::markdown()));
}

fn print_summary(summary: &CommitSummary, global: &GlobalOpts) -> Result<()> {
    match global.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(summary).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(summary).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Id => println!("{}", summary.project_id),
        _ => {
            let verb = if summary.created { "Created" } else { "Updated" };
            let how = match summary.strategy {
                Some(Strategy::Merge) => " (merged)",
                Some(Strategy::Refresh) => " (refreshed)",
                None => "",
            };
            println!(
                "{} {} project {} {}{}",
                style("✓").green(),
                verb,
                style(&summary.project_name).cyan(),
                style(&summary.project_id).dim(),
                how
            );
            if !global.quiet {
                println!(
                    "  {} phase(s), {} task(s), {} resource(s)",
                    summary.phases, summary.tasks, summary.resources
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mapping_flag() {
        let (row, mapping) = parse_mapping("4=senior consultant").unwrap();
        assert_eq!(row, 4);
        assert_eq!(mapping.designation, Designation::SeniorConsultant);
        assert_eq!(mapping.category, Category::Functional);

        let (_, mapping) = parse_mapping("2=tester:technical").unwrap();
        assert_eq!(mapping.category, Category::Technical);

        assert!(parse_mapping("x=manager").is_err());
        assert!(parse_mapping("3=wizard").is_err());
    }

    #[test]
    fn test_parse_rename_flag() {
        assert_eq!(
            parse_rename("phase-1=Discovery (import)").unwrap(),
            ("phase-1".to_string(), "Discovery (import)".to_string())
        );
    }
}
