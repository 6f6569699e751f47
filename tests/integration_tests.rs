//! Integration tests for the Cockpit CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SCHEDULE: &str = "\
Phase\tTask\tStart Date\tEnd Date\tDeliverables
Discovery\tKickoff\t2026-01-05\t2026-01-09\tCharter
\tRequirements\t2026-01-08\t2026-01-23\tRequirements document
Build\tImplementation\t2026-01-26\t2026-02-13\tRelease candidate
";

const RESOURCES: &str = "\
Name\tDesignation\tW1\tW2\tW3
Priya Raman\tManager\t5\t5\t2.5
Tom Okafor\tDeveloper\t2\t5\t5
";

/// Helper to get a cockpit command
fn cockpit() -> Command {
    let mut cmd = Command::cargo_bin("cockpit").unwrap();
    cmd.env_remove("COCKPIT_DATE_ORDER")
        .env_remove("COCKPIT_DELIMITER")
        .env("COCKPIT_AUTHOR", "Test Author");
    cmd
}

/// Helper to create a workspace in a temp directory
fn setup_workspace() -> TempDir {
    let tmp = TempDir::new().unwrap();
    cockpit().current_dir(tmp.path()).arg("init").assert().success();
    tmp
}

fn write_inputs(tmp: &TempDir, schedule: &str, resources: &str) {
    fs::write(tmp.path().join("schedule.tsv"), schedule).unwrap();
    fs::write(tmp.path().join("resources.tsv"), resources).unwrap();
}

fn project_files(root: &Path) -> Vec<String> {
    let dir = root.join("projects");
    if !dir.exists() {
        return Vec::new();
    }
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|n| n.ends_with(".cockpit.yaml"))
        .collect()
}

/// Import into a new project and return its ID
fn import_new(tmp: &TempDir, name: &str) -> String {
    let output = cockpit()
        .current_dir(tmp.path())
        .args([
            "import",
            "schedule.tsv",
            "resources.tsv",
            "--new",
            name,
            "--format",
            "id",
        ])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "import failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

// ============================================================================
// Init Command Tests
// ============================================================================

#[test]
fn test_init_creates_workspace_structure() {
    let tmp = TempDir::new().unwrap();

    cockpit()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized Cockpit workspace"));

    assert!(tmp.path().join(".cockpit").is_dir());
    assert!(tmp.path().join(".cockpit/config.yaml").is_file());
    assert!(tmp.path().join("projects").is_dir());
}

#[test]
fn test_init_twice_warns() {
    let tmp = setup_workspace();

    cockpit()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_commands_outside_workspace_fail() {
    let tmp = TempDir::new().unwrap();

    cockpit()
        .current_dir(tmp.path())
        .args(["project", "list"])
        .assert()
        .failure();
}

// ============================================================================
// Template Command Tests
// ============================================================================

#[test]
fn test_template_schedule_prints_header_and_rows() {
    cockpit()
        .args(["template", "schedule", "--start", "2026-01-05"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "Phase\tTask\tStart Date\tEnd Date\tDeliverables",
        ))
        .stdout(predicate::str::contains("2026-01-05"))
        .stderr(predicate::str::contains("Template generated"));
}

#[test]
fn test_template_resources_has_week_columns() {
    cockpit()
        .args(["template", "resources", "--start", "2026-01-05", "--weeks", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Name\tDesignation"))
        .stdout(predicate::str::contains("2026-01-19"))
        .stdout(predicate::str::contains("Project Manager"));
}

#[test]
fn test_template_rejects_bad_start() {
    cockpit()
        .args(["template", "schedule", "--start", "someday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid start date"));
}

#[test]
fn test_generated_templates_import_cleanly() {
    let tmp = setup_workspace();

    let schedule = cockpit()
        .args(["template", "schedule", "--start", "2026-01-05"])
        .output()
        .unwrap();
    let resources = cockpit()
        .args(["template", "resources", "--start", "2026-01-05"])
        .output()
        .unwrap();
    write_inputs(
        &tmp,
        &String::from_utf8_lossy(&schedule.stdout),
        &String::from_utf8_lossy(&resources.stdout),
    );

    cockpit()
        .current_dir(tmp.path())
        .args(["import", "schedule.tsv", "resources.tsv", "--new", "From Template"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created project"));
}

// ============================================================================
// Import Command Tests
// ============================================================================

#[test]
fn test_import_new_project_writes_file() {
    let tmp = setup_workspace();
    write_inputs(&tmp, SCHEDULE, RESOURCES);

    cockpit()
        .current_dir(tmp.path())
        .args(["import", "schedule.tsv", "resources.tsv", "--new", "Atlas Rollout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created project"))
        .stdout(predicate::str::contains("Atlas Rollout"))
        .stdout(predicate::str::contains("2 phase(s), 3 task(s), 2 resource(s)"));

    let files = project_files(tmp.path());
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("PROJ-"));

    let content = fs::read_to_string(tmp.path().join("projects").join(&files[0])).unwrap();
    assert!(content.contains("name: Atlas Rollout"));
    assert!(content.contains("Kickoff"));
    assert!(content.contains("Priya Raman"));
    assert!(content.contains("allocation_percentage"));
}

#[test]
fn test_import_id_format_prints_project_id() {
    let tmp = setup_workspace();
    write_inputs(&tmp, SCHEDULE, RESOURCES);

    let id = import_new(&tmp, "Atlas Rollout");
    assert!(id.starts_with("PROJ-"));
    assert!(tmp
        .path()
        .join("projects")
        .join(format!("{}.cockpit.yaml", id))
        .exists());
}

#[test]
fn test_import_duplicate_new_name_rejected() {
    let tmp = setup_workspace();
    write_inputs(&tmp, SCHEDULE, RESOURCES);
    import_new(&tmp, "Atlas Rollout");

    cockpit()
        .current_dir(tmp.path())
        .args(["import", "schedule.tsv", "resources.tsv", "--new", "  atlas rollout "])
        .assert()
        .failure();

    assert_eq!(project_files(tmp.path()).len(), 1);
}

#[test]
fn test_import_requires_target() {
    let tmp = setup_workspace();
    write_inputs(&tmp, SCHEDULE, RESOURCES);

    cockpit()
        .current_dir(tmp.path())
        .args(["import", "schedule.tsv", "resources.tsv"])
        .assert()
        .failure();
}

#[test]
fn test_import_bad_date_reports_diagnostic() {
    let tmp = setup_workspace();
    let schedule = "\
Phase\tTask\tStart Date\tEnd Date
Discovery\tKickoff\tnot-a-date\t2026-01-09
";
    write_inputs(&tmp, schedule, RESOURCES);

    cockpit()
        .current_dir(tmp.path())
        .args(["import", "schedule.tsv", "resources.tsv", "--new", "Broken"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Schedule has errors"));

    assert!(project_files(tmp.path()).is_empty());
}

#[test]
fn test_import_end_before_start_fails() {
    let tmp = setup_workspace();
    let schedule = "\
Phase\tTask\tStart Date\tEnd Date
Discovery\tKickoff\t2026-01-09\t2026-01-05
";
    write_inputs(&tmp, schedule, RESOURCES);

    cockpit()
        .current_dir(tmp.path())
        .args(["import", "schedule.tsv", "resources.tsv", "--new", "Backwards"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Schedule has errors"));
}

#[test]
fn test_import_bad_effort_reports_diagnostic() {
    let tmp = setup_workspace();
    let resources = "\
Name\tDesignation\tW1
Priya Raman\tManager\tlots
";
    write_inputs(&tmp, SCHEDULE, resources);

    cockpit()
        .current_dir(tmp.path())
        .args(["import", "schedule.tsv", "resources.tsv", "--new", "Broken"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Resource list has errors"));
}

#[test]
fn test_import_unknown_designation_requires_mapping() {
    let tmp = setup_workspace();
    let resources = "\
Name\tDesignation\tW1\tW2
Priya Raman\tManager\t5\t5
Ana Costa\tQA Lead\t3\t4
";
    write_inputs(&tmp, SCHEDULE, resources);

    cockpit()
        .current_dir(tmp.path())
        .args(["import", "schedule.tsv", "resources.tsv", "--new", "Mapped"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("QA Lead"))
        .stderr(predicate::str::contains("--map"));
    assert!(project_files(tmp.path()).is_empty());

    cockpit()
        .current_dir(tmp.path())
        .args([
            "import",
            "schedule.tsv",
            "resources.tsv",
            "--new",
            "Mapped",
            "--map",
            "3=tester",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 resource(s)"));

    let files = project_files(tmp.path());
    let content = fs::read_to_string(tmp.path().join("projects").join(&files[0])).unwrap();
    assert!(content.contains("designation: tester"));
    assert!(content.contains("category: quality"));
}

#[test]
fn test_import_map_unknown_row_fails() {
    let tmp = setup_workspace();
    let resources = "\
Name\tDesignation\tW1
Ana Costa\tQA Lead\t3
";
    write_inputs(&tmp, SCHEDULE, resources);

    cockpit()
        .current_dir(tmp.path())
        .args([
            "import",
            "schedule.tsv",
            "resources.tsv",
            "--new",
            "Mapped",
            "--map",
            "9=tester",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--map 9"));
}

#[test]
fn test_import_dry_run_writes_nothing() {
    let tmp = setup_workspace();
    write_inputs(&tmp, SCHEDULE, RESOURCES);

    cockpit()
        .current_dir(tmp.path())
        .args([
            "import",
            "schedule.tsv",
            "resources.tsv",
            "--new",
            "Dry",
            "--dry-run",
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("Dry run complete"));

    assert!(project_files(tmp.path()).is_empty());
}

#[test]
fn test_import_into_existing_project_needs_strategy() {
    let tmp = setup_workspace();
    write_inputs(&tmp, SCHEDULE, RESOURCES);
    let id = import_new(&tmp, "Atlas Rollout");
    let path = tmp.path().join("projects").join(format!("{}.cockpit.yaml", id));
    let before = fs::read_to_string(&path).unwrap();

    cockpit()
        .current_dir(tmp.path())
        .args(["import", "schedule.tsv", "resources.tsv", "--project", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("need a resolution"))
        .stderr(predicate::str::contains("phase-1"));

    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn test_import_merge_renames_conflicts() {
    let tmp = setup_workspace();
    write_inputs(&tmp, SCHEDULE, RESOURCES);
    let id = import_new(&tmp, "Atlas Rollout");

    cockpit()
        .current_dir(tmp.path())
        .args([
            "import",
            "schedule.tsv",
            "resources.tsv",
            "--project",
            &id,
            "--strategy",
            "merge",
            "--rename",
            "phase-1=Discovery Again",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated project"))
        .stdout(predicate::str::contains("(merged)"))
        .stdout(predicate::str::contains("4 phase(s), 6 task(s), 4 resource(s)"));

    let content = fs::read_to_string(
        tmp.path()
            .join("projects")
            .join(format!("{}.cockpit.yaml", id)),
    )
    .unwrap();
    assert!(content.contains("Discovery Again"));
    assert!(content.contains("Build (2)"));
    assert!(content.contains("Priya Raman (2)"));
}

#[test]
fn test_import_refresh_replaces_plan() {
    let tmp = setup_workspace();
    write_inputs(&tmp, SCHEDULE, RESOURCES);
    let id = import_new(&tmp, "Atlas Rollout");

    cockpit()
        .current_dir(tmp.path())
        .args([
            "import",
            "schedule.tsv",
            "resources.tsv",
            "--project",
            &id,
            "--strategy",
            "refresh",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("(refreshed)"))
        .stdout(predicate::str::contains("2 phase(s), 3 task(s), 2 resource(s)"));
}

#[test]
fn test_import_unknown_project_fails() {
    let tmp = setup_workspace();
    write_inputs(&tmp, SCHEDULE, RESOURCES);

    cockpit()
        .current_dir(tmp.path())
        .args([
            "import",
            "schedule.tsv",
            "resources.tsv",
            "--project",
            "PROJ-01HQ3K5M7N9P1R3S5T7V9W1X3Y",
        ])
        .assert()
        .failure();
}

// ============================================================================
// Project Command Tests
// ============================================================================

#[test]
fn test_project_list_shows_imported_project() {
    let tmp = setup_workspace();
    write_inputs(&tmp, SCHEDULE, RESOURCES);
    let id = import_new(&tmp, "Atlas Rollout");

    cockpit()
        .current_dir(tmp.path())
        .args(["project", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Atlas Rollout"))
        .stdout(predicate::str::contains("1 project(s) found"));

    cockpit()
        .current_dir(tmp.path())
        .args(["project", "list", "--format", "id"])
        .assert()
        .success()
        .stdout(predicate::str::contains(id.as_str()));
}

#[test]
fn test_project_show_by_name_and_id() {
    let tmp = setup_workspace();
    write_inputs(&tmp, SCHEDULE, RESOURCES);
    let id = import_new(&tmp, "Atlas Rollout");

    cockpit()
        .current_dir(tmp.path())
        .args(["project", "show", "atlas rollout", "--format", "md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Requirements"))
        .stdout(predicate::str::contains("Tom Okafor"));

    cockpit()
        .current_dir(tmp.path())
        .args(["project", "show", &id, "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"phases\""));
}

#[test]
fn test_workspace_default_format_applies_without_flag() {
    let tmp = setup_workspace();
    write_inputs(&tmp, SCHEDULE, RESOURCES);
    let id = import_new(&tmp, "Atlas Rollout");

    let config_path = tmp.path().join(".cockpit/config.yaml");
    let mut config = fs::read_to_string(&config_path).unwrap();
    config.push_str("\ndefault_format: id\n");
    fs::write(&config_path, config).unwrap();

    cockpit()
        .current_dir(tmp.path())
        .args(["project", "list"])
        .assert()
        .success()
        .stdout(predicate::eq(format!("{}\n", id)));

    cockpit()
        .current_dir(tmp.path())
        .args(["project", "list", "--format", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("id,name"));
}

#[test]
fn test_project_show_missing_fails() {
    let tmp = setup_workspace();

    cockpit()
        .current_dir(tmp.path())
        .args(["project", "show", "Nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No project named"));
}

// ============================================================================
// Completions Tests
// ============================================================================

#[test]
fn test_completions_bash() {
    cockpit()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cockpit"));
}

#[test]
fn test_completions_every_supported_shell() {
    for shell in ["elvish", "fish", "powershell", "zsh"] {
        cockpit()
            .args(["completions", shell])
            .assert()
            .success()
            .stdout(predicate::str::contains("cockpit"));
    }

    cockpit().args(["completions", "tcsh"]).assert().failure();
}
