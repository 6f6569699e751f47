//! Schedule parser: rows of `phase, task, start, end, [deliverables]`
//! into a phase → task tree.

use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

use crate::import::dates::{days_between, parse_date, DateOrder};
use crate::import::diagnostics::ParseIssue;
use crate::import::tabular::{read_rows, RawRow, TabularError};
use crate::import::normalize_name;

/// Column layout of schedule input
pub const SCHEDULE_COLUMNS: &[&str] = &["phase", "task", "start_date", "end_date", "deliverables"];

const COL_PHASE: usize = 0;
const COL_TASK: usize = 1;
const COL_START: usize = 2;
const COL_END: usize = 3;
const COL_DELIVERABLES: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub name: String,
    pub phase_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deliverables: Option<String>,
    pub row_number: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Phase {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub tasks: Vec<Task>,
    pub row_number: usize,
}

/// A validated schedule. Only ever built from an error-free parse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedSchedule {
    phases: Vec<Phase>,
}

impl ParsedSchedule {
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.phases.iter().flat_map(|p| p.tasks.iter())
    }

    pub fn total_tasks(&self) -> usize {
        self.phases.iter().map(|p| p.tasks.len()).sum()
    }

    /// Earliest phase start
    pub fn start_date(&self) -> NaiveDate {
        self.phases
            .iter()
            .map(|p| p.start_date)
            .min()
            .unwrap_or(NaiveDate::MIN)
    }

    /// Latest phase end
    pub fn end_date(&self) -> NaiveDate {
        self.phases
            .iter()
            .map(|p| p.end_date)
            .max()
            .unwrap_or(NaiveDate::MIN)
    }

    /// Calendar days from first phase start to last phase end, inclusive
    pub fn duration_days(&self) -> i64 {
        days_between(self.start_date(), self.end_date()) + 1
    }

    /// Number of 7-day weeks the schedule window spans
    pub fn week_count(&self) -> usize {
        ((self.duration_days().max(0) + 6) / 7) as usize
    }

    /// Start of the `index`-th week of the schedule window
    pub fn week_start(&self, index: usize) -> NaiveDate {
        self.start_date()
            .checked_add_days(Days::new(7 * index as u64))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Number of schedule weeks `task` touches
    pub fn weeks_spanned(&self, task: &Task) -> usize {
        let index = |date: NaiveDate| days_between(self.start_date(), date).max(0) / 7;
        (index(task.end_date) - index(task.start_date) + 1).max(1) as usize
    }

    pub fn find_phase(&self, name: &str) -> Option<&Phase> {
        let key = normalize_name(name);
        self.phases.iter().find(|p| normalize_name(&p.name) == key)
    }
}

/// Outcome of one schedule parse pass
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleParseResult {
    pub success: bool,
    pub data: Option<ParsedSchedule>,
    pub errors: Vec<ParseIssue>,
    pub warnings: Vec<String>,
}

/// Phase under construction
struct PhaseDraft {
    name: String,
    declared: Option<(NaiveDate, NaiveDate)>,
    row_number: usize,
    task_rows: usize,
    tasks: Vec<Task>,
}

/// Parses schedule rows into a [`ParsedSchedule`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleParser {
    date_order: DateOrder,
}

impl ScheduleParser {
    pub fn new(date_order: DateOrder) -> Self {
        Self { date_order }
    }

    /// Read delimited text and parse it
    pub fn parse_text(
        &self,
        text: &str,
        delimiter: u8,
    ) -> Result<ScheduleParseResult, TabularError> {
        let rows = read_rows(text, delimiter)?;
        Ok(self.parse(&rows))
    }

    /// Parse rows, collecting every problem rather than stopping at the first
    pub fn parse(&self, rows: &[RawRow]) -> ScheduleParseResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut drafts: Vec<PhaseDraft> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut current: Option<usize> = None;

        let rows = match rows.first() {
            Some(first) if first.starts_with_labels(&[&["phase"], &["task", "task name"]]) => {
                &rows[1..]
            }
            _ => rows,
        };

        for row in rows {
            let phase_cell = row.cell(COL_PHASE);
            let task_cell = row.cell(COL_TASK);

            if task_cell.is_empty() {
                self.phase_row(row, &mut drafts, &mut index, &mut current, &mut errors);
                continue;
            }

            let mut row_ok = true;

            // Required fields
            for (col, name) in [(COL_START, "start_date"), (COL_END, "end_date")] {
                if row.cell(col).is_empty() {
                    errors.push(
                        ParseIssue::new(
                            row.row_number,
                            name,
                            format!("Missing required field '{}' for task '{}'", name, task_cell),
                        )
                        .at_cell(col),
                    );
                    row_ok = false;
                }
            }

            // Date format and range
            let start = self.date_cell(row, COL_START, "start_date", &mut errors);
            let end = self.date_cell(row, COL_END, "end_date", &mut errors);
            if let (Some(s), Some(e)) = (start, end) {
                if s > e {
                    errors.push(
                        ParseIssue::new(
                            row.row_number,
                            "end_date",
                            format!("Task '{}' ends before it starts ({} > {})", task_cell, s, e),
                        )
                        .at_cell(COL_END),
                    );
                    row_ok = false;
                }
            }

            // Phase continuity
            let phase_idx = if phase_cell.is_empty() {
                if current.is_none() {
                    errors.push(
                        ParseIssue::new(
                            row.row_number,
                            "phase",
                            format!("Task '{}' has no phase on this row or above", task_cell),
                        )
                        .at_cell(COL_PHASE),
                    );
                }
                current
            } else {
                Some(introduce_phase(
                    phase_cell,
                    row.row_number,
                    &mut drafts,
                    &mut index,
                ))
            };
            current = phase_idx.or(current);

            let (Some(idx), Some(start_date), Some(end_date), true) = (phase_idx, start, end, row_ok)
            else {
                if let Some(idx) = phase_idx {
                    drafts[idx].task_rows += 1;
                }
                continue;
            };

            let draft = &mut drafts[idx];
            draft.task_rows += 1;
            if draft
                .tasks
                .iter()
                .any(|t| normalize_name(&t.name) == normalize_name(task_cell))
            {
                warnings.push(format!(
                    "Row {}: task '{}' appears more than once in phase '{}'",
                    row.row_number, task_cell, draft.name
                ));
            }

            let deliverables = row.cell(COL_DELIVERABLES);
            draft.tasks.push(Task {
                name: task_cell.to_string(),
                phase_name: draft.name.clone(),
                start_date,
                end_date,
                deliverables: (!deliverables.is_empty()).then(|| deliverables.to_string()),
                row_number: row.row_number,
            });
        }

        let phases = finish_phases(drafts, &mut errors, &mut warnings);

        if phases.is_empty() && errors.is_empty() {
            errors.push(ParseIssue::new(0, "input", "No schedule rows found"));
        }

        let success = errors.is_empty();
        tracing::debug!(
            phases = phases.len(),
            errors = errors.len(),
            warnings = warnings.len(),
            "parsed schedule"
        );

        ScheduleParseResult {
            success,
            data: success.then_some(ParsedSchedule { phases }),
            errors,
            warnings,
        }
    }

    /// A row with a phase but no task: introduces a phase, optionally with dates
    fn phase_row(
        &self,
        row: &RawRow,
        drafts: &mut Vec<PhaseDraft>,
        index: &mut HashMap<String, usize>,
        current: &mut Option<usize>,
        errors: &mut Vec<ParseIssue>,
    ) {
        let phase_cell = row.cell(COL_PHASE);
        if phase_cell.is_empty() {
            errors.push(
                ParseIssue::new(
                    row.row_number,
                    "task",
                    "Missing required field 'task' (or 'phase' for a phase row)",
                )
                .at_cell(COL_TASK),
            );
            return;
        }

        let idx = introduce_phase(phase_cell, row.row_number, drafts, index);
        *current = Some(idx);

        let has_start = !row.cell(COL_START).is_empty();
        let has_end = !row.cell(COL_END).is_empty();
        if !has_start && !has_end {
            return;
        }
        if has_start != has_end {
            let (col, name) = if has_start {
                (COL_END, "end_date")
            } else {
                (COL_START, "start_date")
            };
            errors.push(
                ParseIssue::new(
                    row.row_number,
                    name,
                    format!(
                        "Missing required field '{}' for phase '{}' (give both dates or neither)",
                        name, phase_cell
                    ),
                )
                .at_cell(col),
            );
            return;
        }

        let start = self.date_cell(row, COL_START, "start_date", errors);
        let end = self.date_cell(row, COL_END, "end_date", errors);
        let (Some(start), Some(end)) = (start, end) else {
            return;
        };
        if start > end {
            errors.push(
                ParseIssue::new(
                    row.row_number,
                    "end_date",
                    format!("Phase '{}' ends before it starts ({} > {})", phase_cell, start, end),
                )
                .at_cell(COL_END),
            );
            return;
        }

        let draft = &mut drafts[idx];
        match draft.declared {
            Some(existing) if existing != (start, end) => errors.push(ParseIssue::new(
                row.row_number,
                "start_date",
                format!(
                    "Phase '{}' was already given dates {} to {}",
                    draft.name, existing.0, existing.1
                ),
            )),
            _ => draft.declared = Some((start, end)),
        }
    }

    fn date_cell(
        &self,
        row: &RawRow,
        col: usize,
        name: &str,
        errors: &mut Vec<ParseIssue>,
    ) -> Option<NaiveDate> {
        let raw = row.cell(col);
        if raw.is_empty() {
            return None;
        }
        let parsed = parse_date(raw, self.date_order);
        if parsed.is_none() {
            errors.push(
                ParseIssue::new(row.row_number, name, format!("Invalid date '{}'", raw))
                    .at_cell(col),
            );
        }
        parsed
    }
}

fn introduce_phase(
    name: &str,
    row_number: usize,
    drafts: &mut Vec<PhaseDraft>,
    index: &mut HashMap<String, usize>,
) -> usize {
    *index.entry(normalize_name(name)).or_insert_with(|| {
        drafts.push(PhaseDraft {
            name: name.trim().to_string(),
            declared: None,
            row_number,
            task_rows: 0,
            tasks: Vec::new(),
        });
        drafts.len() - 1
    })
}

/// Resolve phase bounds and check that tasks sit inside declared phase dates
fn finish_phases(
    drafts: Vec<PhaseDraft>,
    errors: &mut Vec<ParseIssue>,
    warnings: &mut Vec<String>,
) -> Vec<Phase> {
    let mut phases = Vec::with_capacity(drafts.len());

    for draft in drafts {
        if let Some((start, end)) = draft.declared {
            for task in &draft.tasks {
                if task.start_date < start {
                    errors.push(
                        ParseIssue::new(
                            task.row_number,
                            "start_date",
                            format!(
                                "Task '{}' starts {} which falls outside phase '{}' ({} to {})",
                                task.name, task.start_date, draft.name, start, end
                            ),
                        )
                        .at_cell(COL_START),
                    );
                }
                if task.end_date > end {
                    errors.push(
                        ParseIssue::new(
                            task.row_number,
                            "end_date",
                            format!(
                                "Task '{}' ends {} which falls outside phase '{}' ({} to {})",
                                task.name, task.end_date, draft.name, start, end
                            ),
                        )
                        .at_cell(COL_END),
                    );
                }
            }
        }

        let bounds = draft.declared.or_else(|| {
            let start = draft.tasks.iter().map(|t| t.start_date).min()?;
            let end = draft.tasks.iter().map(|t| t.end_date).max()?;
            Some((start, end))
        });

        let Some((start_date, end_date)) = bounds else {
            // Tasks that referenced this phase already reported their own errors
            if draft.task_rows == 0 {
                errors.push(
                    ParseIssue::new(
                        draft.row_number,
                        "phase",
                        format!("Phase '{}' has no tasks and no dates", draft.name),
                    )
                    .at_cell(COL_PHASE),
                );
            }
            continue;
        };

        if draft.tasks.is_empty() && draft.task_rows == 0 {
            warnings.push(format!("Phase '{}' has no tasks", draft.name));
        }

        phases.push(Phase {
            name: draft.name,
            start_date,
            end_date,
            tasks: draft.tasks,
            row_number: draft.row_number,
        });
    }

    phases
}
