//! Delimited text reader producing numbered rows of trimmed cells

use csv::ReaderBuilder;
use thiserror::Error;

/// One physical row of pasted/uploaded text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line number in the source text
    pub row_number: usize,
    pub cells: Vec<String>,
}

impl RawRow {
    /// Cell at `idx`, or "" when the row is short
    pub fn cell(&self, idx: usize) -> &str {
        self.cells.get(idx).map(String::as_str).unwrap_or("")
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.is_empty())
    }

    /// True when the leading cells match `labels` (case-insensitive).
    /// An empty label list never matches.
    pub fn starts_with_labels(&self, labels: &[&[&str]]) -> bool {
        !labels.is_empty()
            && labels.iter().enumerate().all(|(idx, accepted)| {
                let cell = self.cell(idx).to_lowercase();
                accepted.iter().any(|a| *a == cell)
            })
    }
}

#[derive(Debug, Error)]
pub enum TabularError {
    #[error("unreadable input near line {line}: {message}")]
    Malformed { line: usize, message: String },
}

/// Split delimited text into rows.
///
/// Blank rows are dropped; numbering still follows the source lines so
/// diagnostics point at what the user pasted.
pub fn read_rows(text: &str, delimiter: u8) -> Result<Vec<RawRow>, TabularError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| TabularError::Malformed {
            line: e
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(idx + 1),
            message: e.to_string(),
        })?;

        let row_number = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 1);
        let row = RawRow {
            row_number,
            cells: record.iter().map(|c| c.trim().to_string()).collect(),
        };
        if !row.is_blank() {
            rows.push(row);
        }
    }

    tracing::debug!(rows = rows.len(), "read tabular input");
    Ok(rows)
}
