//! Row-level import issues and their rendering as diagnostics

use miette::{Diagnostic, NamedSource, SourceSpan};
use serde::Serialize;
use thiserror::Error;

/// A blocking problem found in one row of the input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseIssue {
    /// 1-based source row
    pub row: usize,
    /// Logical column name (e.g. "start_date", "week 3")
    pub column: String,
    pub message: String,
    /// Zero-based cell index, when the issue belongs to a single cell
    #[serde(skip)]
    pub cell: Option<usize>,
}

impl ParseIssue {
    pub fn new(row: usize, column: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            row,
            column: column.into(),
            message: message.into(),
            cell: None,
        }
    }

    /// Point the issue at a specific cell
    pub fn at_cell(mut self, cell: usize) -> Self {
        self.cell = Some(cell);
        self
    }
}

impl std::fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Row {} [{}]: {}", self.row, self.column, self.message)
    }
}

/// Every issue of one parse pass, rendered against the source text
#[derive(Debug, Error, Diagnostic)]
#[error("{title}: {summary}")]
#[diagnostic(code(cockpit::import::invalid_rows))]
pub struct ImportDiagnostic {
    title: String,
    summary: String,

    #[source_code]
    src: NamedSource<String>,

    #[related]
    issues: Vec<RowDiagnostic>,
}

/// A single row issue with its source location
#[derive(Debug, Error, Diagnostic)]
#[error("row {row}: {message}")]
pub struct RowDiagnostic {
    row: usize,
    message: String,

    #[label("{}", self.column)]
    span: SourceSpan,
    column: String,

    #[help]
    help: Option<String>,
}

impl ImportDiagnostic {
    pub fn new(
        title: impl Into<String>,
        filename: &str,
        source: &str,
        delimiter: u8,
        issues: &[ParseIssue],
    ) -> Self {
        let count = issues.len();
        let summary = if count == 1 {
            "1 error".to_string()
        } else {
            format!("{} errors", count)
        };

        let issues = issues
            .iter()
            .map(|issue| RowDiagnostic {
                row: issue.row,
                message: issue.message.clone(),
                span: row_span(source, issue.row, issue.cell, delimiter),
                column: issue.column.clone(),
                help: generate_help(&issue.message),
            })
            .collect();

        Self {
            title: title.into(),
            summary,
            src: NamedSource::new(filename, source.to_string()),
            issues,
        }
    }

    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }
}

/// Span of a row (1-based), narrowed to one cell when known
fn row_span(source: &str, row: usize, cell: Option<usize>, delimiter: u8) -> SourceSpan {
    let line_start = line_to_offset(source, row);
    let line = source[line_start..]
        .split('\n')
        .next()
        .unwrap_or("")
        .trim_end_matches('\r');

    let Some(cell) = cell else {
        return SourceSpan::from(line_start..line_start + line.len());
    };

    let mut offset = line_start;
    for (idx, part) in line.split(delimiter as char).enumerate() {
        if idx == cell {
            return SourceSpan::from(offset..offset + part.len());
        }
        offset += part.len() + 1;
    }
    // Cell missing from a short row: point at the end of the line
    let end = line_start + line.len();
    SourceSpan::from(end..end)
}

/// Byte offset of the start of a 1-based line
fn line_to_offset(source: &str, line: usize) -> usize {
    if line <= 1 {
        return 0;
    }
    source
        .match_indices('\n')
        .nth(line - 2)
        .map(|(idx, _)| idx + 1)
        .unwrap_or(source.len())
}

/// Generate helpful suggestions based on the issue message
fn generate_help(message: &str) -> Option<String> {
    let msg_lower = message.to_lowercase();

    if msg_lower.contains("invalid date") {
        return Some("Use YYYY-MM-DD dates, e.g. 2026-01-05".to_string());
    }

    if msg_lower.contains("ends before it starts") {
        return Some("Swap the start and end dates or correct the typo.".to_string());
    }

    if msg_lower.contains("no phase") {
        return Some("Put the phase name on this row or on a row above it.".to_string());
    }

    if msg_lower.contains("outside phase") {
        return Some("Widen the phase dates or move the task inside them.".to_string());
    }

    if msg_lower.contains("between 0 and 5") {
        return Some("Weekly effort is man-days in a five-day week.".to_string());
    }

    if msg_lower.contains("duplicate resource") {
        return Some("Each resource name can only appear once per import.".to_string());
    }

    None
}
