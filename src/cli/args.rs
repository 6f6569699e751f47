//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::commands::{
    completions::CompletionsArgs, import::ImportArgs, init::InitArgs, project::ProjectCommands,
    template::TemplateArgs,
};

#[derive(Parser)]
#[command(name = "cockpit")]
#[command(author, version, about = "Cockpit project planner")]
#[command(
    long_about = "Import tab-separated schedules and resource rosters into project plans, with designation mapping and conflict reconciliation."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging on stderr)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

impl GlobalOpts {
    /// Replace `auto` with the configured `default_format`, if it names a
    /// known format
    pub fn with_default_format(mut self, configured: Option<&str>) -> Self {
        if self.format == OutputFormat::Auto {
            if let Some(format) =
                configured.and_then(|f| OutputFormat::from_str(f.trim(), true).ok())
            {
                self.format = format;
            }
        }
        self
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new Cockpit workspace
    Init(InitArgs),

    /// Print a fill-in schedule or resource template
    Template(TemplateArgs),

    /// Import a schedule and resource roster into a project
    Import(ImportArgs),

    /// Inspect stored projects
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (yaml for show, tsv for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just IDs, one per line
    Id,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(format: OutputFormat) -> GlobalOpts {
        GlobalOpts {
            format,
            quiet: false,
            verbose: false,
        }
    }

    #[test]
    fn test_configured_format_fills_auto() {
        let global = opts(OutputFormat::Auto).with_default_format(Some("JSON"));
        assert_eq!(global.format, OutputFormat::Json);
    }

    #[test]
    fn test_explicit_format_wins_over_config() {
        let global = opts(OutputFormat::Csv).with_default_format(Some("json"));
        assert_eq!(global.format, OutputFormat::Csv);
    }

    #[test]
    fn test_unknown_configured_format_ignored() {
        let global = opts(OutputFormat::Auto).with_default_format(Some("xml"));
        assert_eq!(global.format, OutputFormat::Auto);
        let global = opts(OutputFormat::Auto).with_default_format(None);
        assert_eq!(global.format, OutputFormat::Auto);
    }
}
