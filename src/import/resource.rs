//! Resource parser: rows of `name, designation, week 1, week 2, ...`
//! into a roster of weekly effort vectors.

use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::entities::resource::{Category, DeclaredDesignation, Designation};
use crate::import::dates::{parse_date, DateOrder};
use crate::import::diagnostics::ParseIssue;
use crate::import::normalize_name;
use crate::import::schedule::ParsedSchedule;
use crate::import::tabular::{read_rows, RawRow, TabularError};

/// Man-days in a full working week
pub const WORKING_DAYS_PER_WEEK: f64 = 5.0;

const COL_NAME: usize = 0;
const COL_DESIGNATION: usize = 1;
const FIRST_WEEK_COL: usize = 2;

/// Declared effort for one calendar week
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeeklyEffort {
    pub week_start: NaiveDate,
    /// Man-days, 0 to 5
    pub days: f64,
}

/// A resource whose designation is recognised
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedResource {
    pub name: String,
    pub designation: Designation,
    pub category: Category,
    pub weekly_effort: Vec<WeeklyEffort>,
    pub total_days: f64,
    pub row_number: usize,
}

/// A resource that needs a human to pick its designation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmappedResource {
    pub name: String,
    pub original_designation: String,
    pub suggested_category: Option<Category>,
    pub weekly_effort: Vec<WeeklyEffort>,
    pub total_days: f64,
    pub row_number: usize,
}

/// The designation/category a user assigns to an unmapped row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResourceMapping {
    pub designation: Designation,
    pub category: Category,
}

impl ResourceMapping {
    /// Mapping with the category implied by the designation
    pub fn new(designation: Designation) -> Self {
        Self {
            designation,
            category: designation.category(),
        }
    }

    pub fn with_category(designation: Designation, category: Category) -> Self {
        Self {
            designation,
            category,
        }
    }
}

impl std::str::FromStr for ResourceMapping {
    type Err = String;

    /// `DESIGNATION[:CATEGORY]`, e.g. `manager` or `senior consultant:technical`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((designation, category)) => Ok(Self::with_category(
                designation.parse()?,
                category.parse()?,
            )),
            None => Ok(Self::new(s.parse()?)),
        }
    }
}

/// Everything a successful resource parse produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedRoster {
    pub resources: Vec<ParsedResource>,
    pub unmapped_resources: Vec<UnmappedResource>,
    /// Start date of each week column
    pub week_starts: Vec<NaiveDate>,
    /// Grand total of declared man-days, mapped and unmapped
    pub total_mandays: f64,
}

impl ParsedRoster {
    pub fn requires_mapping(&self) -> bool {
        !self.unmapped_resources.is_empty()
    }

    /// Unmapped rows that `mappings` does not cover yet
    pub fn missing_mappings(&self, mappings: &BTreeMap<usize, ResourceMapping>) -> Vec<usize> {
        self.unmapped_resources
            .iter()
            .map(|u| u.row_number)
            .filter(|row| !mappings.contains_key(row))
            .collect()
    }

    pub fn unmapped_row(&self, row_number: usize) -> Option<&UnmappedResource> {
        self.unmapped_resources
            .iter()
            .find(|u| u.row_number == row_number)
    }

    /// Combine mapped resources with the now-mapped rows, in source order.
    ///
    /// Pure: the roster is left untouched, so applying the same mappings
    /// again yields the same resources.
    pub fn apply_mappings(
        &self,
        mappings: &BTreeMap<usize, ResourceMapping>,
    ) -> Result<Vec<ParsedResource>, MappingError> {
        if let Some(row) = mappings
            .keys()
            .find(|row| self.unmapped_row(**row).is_none())
        {
            return Err(MappingError::UnknownRow(*row));
        }

        let missing = self.missing_mappings(mappings);
        if !missing.is_empty() {
            return Err(MappingError::Missing { rows: missing });
        }

        let mut resolved: Vec<ParsedResource> = self.resources.clone();
        for unmapped in &self.unmapped_resources {
            let mapping = mappings[&unmapped.row_number];
            resolved.push(ParsedResource {
                name: unmapped.name.clone(),
                designation: mapping.designation,
                category: mapping.category,
                weekly_effort: unmapped.weekly_effort.clone(),
                total_days: unmapped.total_days,
                row_number: unmapped.row_number,
            });
        }
        resolved.sort_by_key(|r| r.row_number);
        Ok(resolved)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("Resources on rows {rows:?} still need a designation")]
    Missing { rows: Vec<usize> },

    #[error("Row {0} is not an unmapped resource")]
    UnknownRow(usize),
}

/// Outcome of one resource parse pass
#[derive(Debug, Clone, Serialize)]
pub struct ResourceParseResult {
    pub success: bool,
    pub data: Option<ParsedRoster>,
    pub requires_mapping: bool,
    pub errors: Vec<ParseIssue>,
    pub warnings: Vec<String>,
}

/// Parses resource rows against an already-parsed schedule
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceParser {
    date_order: DateOrder,
}

impl ResourceParser {
    pub fn new(date_order: DateOrder) -> Self {
        Self { date_order }
    }

    pub fn parse_text(
        &self,
        text: &str,
        delimiter: u8,
        schedule: &ParsedSchedule,
    ) -> Result<ResourceParseResult, TabularError> {
        let rows = read_rows(text, delimiter)?;
        Ok(self.parse(&rows, schedule))
    }

    pub fn parse(&self, rows: &[RawRow], schedule: &ParsedSchedule) -> ResourceParseResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let (header, rows) = match rows.first() {
            Some(first)
                if first.starts_with_labels(&[&["name", "resource", "resource name", "role"]]) =>
            {
                (Some(first), &rows[1..])
            }
            _ => (None, rows),
        };

        let week_columns = rows
            .iter()
            .map(|r| r.cells.len().saturating_sub(FIRST_WEEK_COL))
            .max()
            .unwrap_or(0);
        let week_starts = self.week_starts(header, week_columns, schedule, &mut warnings);

        let mut resources = Vec::new();
        let mut unmapped_resources = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for row in rows {
            let mut row_ok = true;
            let name = row.cell(COL_NAME);
            let designation = row.cell(COL_DESIGNATION);

            if name.is_empty() {
                errors.push(
                    ParseIssue::new(row.row_number, "name", "Missing required field 'name'")
                        .at_cell(COL_NAME),
                );
                row_ok = false;
            } else if let Some(first_row) = seen.get(&normalize_name(name)) {
                errors.push(
                    ParseIssue::new(
                        row.row_number,
                        "name",
                        format!(
                            "Duplicate resource '{}' (first seen on row {})",
                            name, first_row
                        ),
                    )
                    .at_cell(COL_NAME),
                );
                row_ok = false;
            } else {
                seen.insert(normalize_name(name), row.row_number);
            }

            if designation.is_empty() {
                errors.push(
                    ParseIssue::new(
                        row.row_number,
                        "designation",
                        format!("Missing required field 'designation' for resource '{}'", name),
                    )
                    .at_cell(COL_DESIGNATION),
                );
                row_ok = false;
            }

            let mut weekly_effort = Vec::new();
            for (week, start) in week_starts.iter().enumerate() {
                let col = FIRST_WEEK_COL + week;
                if col >= row.cells.len() {
                    break;
                }
                match parse_effort(row.cell(col)) {
                    Some(days) => weekly_effort.push(WeeklyEffort {
                        week_start: *start,
                        days,
                    }),
                    None => {
                        errors.push(
                            ParseIssue::new(
                                row.row_number,
                                format!("week {}", week + 1),
                                format!(
                                    "Effort '{}' must be a number of days between 0 and 5",
                                    row.cell(col)
                                ),
                            )
                            .at_cell(col),
                        );
                        row_ok = false;
                    }
                }
            }

            if !row_ok {
                continue;
            }

            let total_days: f64 = weekly_effort.iter().map(|w| w.days).sum();
            if total_days == 0.0 {
                warnings.push(format!(
                    "Row {}: resource '{}' has no effort in any week",
                    row.row_number, name
                ));
            }

            let outside = weekly_effort
                .iter()
                .filter(|w| w.days > 0.0)
                .filter(|w| {
                    w.week_start > schedule.end_date()
                        || week_end(w.week_start) < schedule.start_date()
                })
                .count();
            if outside > 0 {
                warnings.push(format!(
                    "Row {}: {} week(s) of effort for '{}' fall outside the schedule window ({} to {}) and will not be allocated",
                    row.row_number,
                    outside,
                    name,
                    schedule.start_date(),
                    schedule.end_date()
                ));
            }

            match Designation::classify(designation) {
                DeclaredDesignation::Known(designation) => resources.push(ParsedResource {
                    name: name.to_string(),
                    designation,
                    category: designation.category(),
                    weekly_effort,
                    total_days,
                    row_number: row.row_number,
                }),
                DeclaredDesignation::Unknown(original) => {
                    unmapped_resources.push(UnmappedResource {
                        name: name.to_string(),
                        suggested_category: Category::suggest(&original),
                        original_designation: original,
                        weekly_effort,
                        total_days,
                        row_number: row.row_number,
                    })
                }
            }
        }

        if rows.is_empty() {
            errors.push(ParseIssue::new(0, "input", "No resource rows found"));
        }

        let success = errors.is_empty();
        let requires_mapping = success && !unmapped_resources.is_empty();
        tracing::debug!(
            mapped = resources.len(),
            unmapped = unmapped_resources.len(),
            errors = errors.len(),
            "parsed resources"
        );

        let data = success.then(|| {
            let total_mandays = resources.iter().map(|r| r.total_days).sum::<f64>()
                + unmapped_resources.iter().map(|u| u.total_days).sum::<f64>();
            ParsedRoster {
                resources,
                unmapped_resources,
                week_starts,
                total_mandays,
            }
        });

        ResourceParseResult {
            success,
            data,
            requires_mapping,
            errors,
            warnings,
        }
    }

    /// Week start per column: dated header cells when every one parses,
    /// otherwise consecutive weeks from the schedule start
    fn week_starts(
        &self,
        header: Option<&RawRow>,
        columns: usize,
        schedule: &ParsedSchedule,
        warnings: &mut Vec<String>,
    ) -> Vec<NaiveDate> {
        let header_dates: Option<Vec<NaiveDate>> = header.and_then(|h| {
            let cells = h.cells.get(FIRST_WEEK_COL..)?;
            if cells.is_empty() {
                return None;
            }
            let parsed: Vec<Option<NaiveDate>> = cells
                .iter()
                .map(|c| parse_date(c, self.date_order))
                .collect();
            if parsed.iter().all(Option::is_some) {
                Some(parsed.into_iter().flatten().collect())
            } else {
                if parsed.iter().any(Option::is_some) {
                    warnings.push(
                        "Some week headers are not dates; weeks are counted from the schedule start instead"
                            .to_string(),
                    );
                }
                None
            }
        });

        match header_dates {
            Some(dates) => (0..columns)
                .map(|i| match dates.get(i) {
                    Some(d) => *d,
                    None => {
                        let last = dates[dates.len() - 1];
                        let extra = (i + 1 - dates.len()) as u64;
                        last.checked_add_days(Days::new(7 * extra))
                            .unwrap_or(NaiveDate::MAX)
                    }
                })
                .collect(),
            None => (0..columns).map(|i| schedule.week_start(i)).collect(),
        }
    }
}

/// Last day of the 7-day week starting at `start`
pub fn week_end(start: NaiveDate) -> NaiveDate {
    start.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX)
}

/// Effort cell: empty is zero; otherwise days in [0, 5]
fn parse_effort(raw: &str) -> Option<f64> {
    if raw.is_empty() || raw == "-" {
        return Some(0.0);
    }
    let days: f64 = raw.replace(',', ".").parse().ok()?;
    (days.is_finite() && (0.0..=WORKING_DAYS_PER_WEEK).contains(&days)).then_some(days)
}
