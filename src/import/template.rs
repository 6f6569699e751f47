//! Fill-in templates for the schedule and resource inputs

use chrono::{Days, NaiveDate};
use rust_embed::Embed;
use serde::Serialize;
use tera::Tera;
use thiserror::Error;

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template rendering error: {0}")]
    RenderError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Schedule,
    Resources,
}

impl TemplateKind {
    fn file_name(&self) -> &'static str {
        match self {
            TemplateKind::Schedule => "schedule.tsv.tera",
            TemplateKind::Resources => "resources.tsv.tera",
        }
    }
}

impl std::str::FromStr for TemplateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "schedule" => Ok(TemplateKind::Schedule),
            "resources" | "resource" => Ok(TemplateKind::Resources),
            _ => Err(format!("Unknown template: '{}' (valid: schedule, resources)", s)),
        }
    }
}

impl std::fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateKind::Schedule => write!(f, "schedule"),
            TemplateKind::Resources => write!(f, "resources"),
        }
    }
}

/// Dates and layout of a generated template
#[derive(Debug, Clone)]
pub struct TemplateOptions {
    pub start: NaiveDate,
    /// Weeks covered; at least three
    pub weeks: usize,
    pub delimiter: u8,
}

#[derive(Serialize)]
struct ScheduleRow {
    phase: &'static str,
    task: &'static str,
    start: String,
    end: String,
    deliverables: &'static str,
}

#[derive(Serialize)]
struct ResourceRow {
    name: &'static str,
    designation: &'static str,
    days: Vec<&'static str>,
}

pub struct TemplateGenerator {
    tera: Tera,
}

impl TemplateGenerator {
    /// Create a new template generator with embedded templates
    pub fn new() -> Result<Self, TemplateError> {
        let mut tera = Tera::default();

        for file in EmbeddedTemplates::iter() {
            let filename = file.as_ref();
            if let Some(content) = EmbeddedTemplates::get(filename) {
                if let Ok(template_str) = std::str::from_utf8(&content.data) {
                    tera.add_raw_template(filename, template_str)
                        .map_err(|e| TemplateError::RenderError(e.to_string()))?;
                }
            }
        }

        Ok(Self { tera })
    }

    pub fn generate(
        &self,
        kind: TemplateKind,
        options: &TemplateOptions,
    ) -> Result<String, TemplateError> {
        let name = kind.file_name();
        if !self.tera.get_template_names().any(|n| n == name) {
            return Err(TemplateError::NotFound(name.to_string()));
        }

        let weeks = options.weeks.max(3);
        let mut context = tera::Context::new();
        context.insert("sep", &(options.delimiter as char).to_string());
        match kind {
            TemplateKind::Schedule => {
                context.insert("rows", &schedule_rows(options.start, weeks));
            }
            TemplateKind::Resources => {
                let week_starts: Vec<String> = (0..weeks)
                    .map(|w| day(options.start, 7 * w).format("%Y-%m-%d").to_string())
                    .collect();
                context.insert("weeks", &week_starts);
                context.insert("rows", &resource_rows(weeks));
            }
        }

        self.tera
            .render(name, &context)
            .map_err(|e| TemplateError::RenderError(e.to_string()))
    }
}

fn day(start: NaiveDate, offset: usize) -> NaiveDate {
    start
        .checked_add_days(Days::new(offset as u64))
        .unwrap_or(NaiveDate::MAX)
}

/// Discovery in week one, build in the middle weeks, deployment last
fn schedule_rows(start: NaiveDate, weeks: usize) -> Vec<ScheduleRow> {
    let build_end = 7 * (weeks - 1) - 1;
    let last_week = 7 * (weeks - 1);
    let date = |offset: usize| day(start, offset).format("%Y-%m-%d").to_string();

    vec![
        ScheduleRow {
            phase: "Discovery",
            task: "Kickoff",
            start: date(0),
            end: date(2),
            deliverables: "Kickoff deck",
        },
        ScheduleRow {
            phase: "Discovery",
            task: "Requirements",
            start: date(3),
            end: date(6),
            deliverables: "Requirements document",
        },
        ScheduleRow {
            phase: "Build",
            task: "Development",
            start: date(7),
            end: date(build_end - 3),
            deliverables: "",
        },
        ScheduleRow {
            phase: "Build",
            task: "Testing",
            start: date(build_end - 2),
            end: date(build_end),
            deliverables: "Test report",
        },
        ScheduleRow {
            phase: "Deploy",
            task: "Go-live",
            start: date(last_week),
            end: date(last_week + 6),
            deliverables: "Cutover plan",
        },
    ]
}

fn resource_rows(weeks: usize) -> Vec<ResourceRow> {
    let shaped = |first: &'static str, middle: &'static str, last: &'static str| {
        (0..weeks)
            .map(|w| {
                if w == 0 {
                    first
                } else if w == weeks - 1 {
                    last
                } else {
                    middle
                }
            })
            .collect::<Vec<_>>()
    };

    vec![
        ResourceRow {
            name: "Project Manager",
            designation: "Manager",
            days: shaped("5", "5", "5"),
        },
        ResourceRow {
            name: "Business Analyst",
            designation: "Analyst",
            days: shaped("5", "2", "1"),
        },
        ResourceRow {
            name: "Lead Developer",
            designation: "Developer",
            days: shaped("1", "5", "2"),
        },
        ResourceRow {
            name: "Test Engineer",
            designation: "Tester",
            days: shaped("0", "3", "2.5"),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::resource::ResourceParser;
    use crate::import::schedule::ScheduleParser;

    fn options(weeks: usize) -> TemplateOptions {
        TemplateOptions {
            start: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            weeks,
            delimiter: b'\t',
        }
    }

    #[test]
    fn test_generated_templates_parse_cleanly() {
        let generator = TemplateGenerator::new().unwrap();
        for weeks in [1, 3, 8] {
            let schedule_text = generator
                .generate(TemplateKind::Schedule, &options(weeks))
                .unwrap();
            let schedule = ScheduleParser::default()
                .parse_text(&schedule_text, b'\t')
                .unwrap();
            assert!(schedule.success, "{:?}", schedule.errors);
            assert!(schedule.errors.is_empty());
            let schedule = schedule.data.unwrap();
            assert_eq!(schedule.phases().len(), 3);
            assert_eq!(schedule.total_tasks(), 5);
            assert_eq!(schedule.week_count(), weeks.max(3));

            let resource_text = generator
                .generate(TemplateKind::Resources, &options(weeks))
                .unwrap();
            let roster = ResourceParser::default()
                .parse_text(&resource_text, b'\t', &schedule)
                .unwrap();
            assert!(roster.success, "{:?}", roster.errors);
            assert!(!roster.requires_mapping);
            assert_eq!(roster.data.unwrap().resources.len(), 4);
        }
    }

    #[test]
    fn test_delimiter_is_applied() {
        let generator = TemplateGenerator::new().unwrap();
        let text = generator
            .generate(
                TemplateKind::Resources,
                &TemplateOptions {
                    delimiter: b',',
                    ..options(3)
                },
            )
            .unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(header, "Name,Designation,2026-01-05,2026-01-12,2026-01-19");
        assert_eq!(text.lines().count(), 5);
    }

    #[test]
    fn test_template_kind_from_str() {
        assert_eq!("Schedule".parse::<TemplateKind>(), Ok(TemplateKind::Schedule));
        assert_eq!("resource".parse::<TemplateKind>(), Ok(TemplateKind::Resources));
        assert!("budget".parse::<TemplateKind>().is_err());
    }
}
