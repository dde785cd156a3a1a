//! Non-fatal issue accounting
//!
//! Row- and cell-level problems never abort a run. Each stage records them
//! here so the caller can report counts, offending batches and dates next to
//! an otherwise successful result.

use crate::errors::LoadError;
pub use crate::types::UndefinedReason;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Row dropped because its date cell did not resolve to a date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateParseIssue {
    pub batch: String,
    pub line: usize,
    pub raw: String,
}

/// Cell that could not be read as a number (kept as a missing cell)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueParseIssue {
    pub batch: String,
    pub date: NaiveDate,
    pub column: String,
    pub raw: String,
}

/// Row referring to a specific date of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowIssue {
    pub batch: String,
    pub date: NaiveDate,
}

/// Aligned row whose scaling factor is undefined
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndefinedFactorIssue {
    pub batch: String,
    pub date: NaiveDate,
    pub reason: UndefinedReason,
}

/// Batch skipped by a best-effort run
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedBatch {
    pub label: String,
    pub error: LoadError,
}

/// Accumulated non-fatal issues of a normalization run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    pub date_parse_failures: Vec<DateParseIssue>,
    pub value_parse_failures: Vec<ValueParseIssue>,
    pub duplicate_dates: Vec<RowIssue>,
    /// Rows dropped because the reference series has no row for their date
    pub unaligned_rows: Vec<RowIssue>,
    pub undefined_factors: Vec<UndefinedFactorIssue>,
    pub skipped_batches: Vec<SkippedBatch>,
}

/// Issue counts, cheap to log or serialize
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticCounts {
    pub date_parse_failures: usize,
    pub value_parse_failures: usize,
    pub duplicate_dates: usize,
    pub unaligned_rows: usize,
    pub undefined_factors: usize,
    pub skipped_batches: usize,
}

impl DiagnosticCounts {
    pub fn total(&self) -> usize {
        self.date_parse_failures
            + self.value_parse_failures
            + self.duplicate_dates
            + self.unaligned_rows
            + self.undefined_factors
            + self.skipped_batches
    }
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.counts().total() == 0
    }

    pub fn counts(&self) -> DiagnosticCounts {
        DiagnosticCounts {
            date_parse_failures: self.date_parse_failures.len(),
            value_parse_failures: self.value_parse_failures.len(),
            duplicate_dates: self.duplicate_dates.len(),
            unaligned_rows: self.unaligned_rows.len(),
            undefined_factors: self.undefined_factors.len(),
            skipped_batches: self.skipped_batches.len(),
        }
    }

    /// Fold another stage's issues into this one, preserving order
    pub fn extend(&mut self, other: Diagnostics) {
        self.date_parse_failures.extend(other.date_parse_failures);
        self.value_parse_failures.extend(other.value_parse_failures);
        self.duplicate_dates.extend(other.duplicate_dates);
        self.unaligned_rows.extend(other.unaligned_rows);
        self.undefined_factors.extend(other.undefined_factors);
        self.skipped_batches.extend(other.skipped_batches);
    }

    /// Unaligned rows of one batch
    pub fn unaligned_in(&self, batch: &str) -> usize {
        self.unaligned_rows.iter().filter(|r| r.batch == batch).count()
    }

    /// Undefined-factor rows of one batch
    pub fn undefined_in(&self, batch: &str) -> usize {
        self.undefined_factors
            .iter()
            .filter(|r| r.batch == batch)
            .count()
    }

    /// One human-readable line per issue category, naming batches and dates
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for skipped in &self.skipped_batches {
            warnings.push(format!("skipped batch '{}': {}", skipped.label, skipped.error));
        }

        if !self.date_parse_failures.is_empty() {
            let examples = self
                .date_parse_failures
                .iter()
                .take(MAX_EXAMPLES)
                .map(|i| format!("'{}' line {} ({:?})", i.batch, i.line, i.raw))
                .collect::<Vec<_>>()
                .join(", ");
            warnings.push(format!(
                "{} row(s) dropped with unparseable dates: {examples}{}",
                self.date_parse_failures.len(),
                ellipsis(self.date_parse_failures.len())
            ));
        }

        if !self.value_parse_failures.is_empty() {
            let examples = self
                .value_parse_failures
                .iter()
                .take(MAX_EXAMPLES)
                .map(|i| format!("'{}' {} {} ({:?})", i.batch, i.date, i.column, i.raw))
                .collect::<Vec<_>>()
                .join(", ");
            warnings.push(format!(
                "{} non-numeric cell(s) treated as missing: {examples}{}",
                self.value_parse_failures.len(),
                ellipsis(self.value_parse_failures.len())
            ));
        }

        if !self.duplicate_dates.is_empty() {
            warnings.push(format!(
                "{} duplicate date row(s) dropped (first occurrence kept): {}{}",
                self.duplicate_dates.len(),
                describe_rows(&self.duplicate_dates),
                ellipsis(self.duplicate_dates.len())
            ));
        }

        if !self.unaligned_rows.is_empty() {
            warnings.push(format!(
                "{} row(s) dropped with no matching reference date: {}{}",
                self.unaligned_rows.len(),
                describe_rows(&self.unaligned_rows),
                ellipsis(self.unaligned_rows.len())
            ));
        }

        if !self.undefined_factors.is_empty() {
            let examples = self
                .undefined_factors
                .iter()
                .take(MAX_EXAMPLES)
                .map(|i| format!("'{}' {} ({})", i.batch, i.date, i.reason))
                .collect::<Vec<_>>()
                .join(", ");
            warnings.push(format!(
                "{} row(s) with undefined scaling factor marked undefined: {examples}{}",
                self.undefined_factors.len(),
                ellipsis(self.undefined_factors.len())
            ));
        }

        warnings
    }
}

/// Examples listed per warning line
const MAX_EXAMPLES: usize = 5;

fn describe_rows(rows: &[RowIssue]) -> String {
    rows.iter()
        .take(MAX_EXAMPLES)
        .map(|r| format!("'{}' {}", r.batch, r.date))
        .collect::<Vec<_>>()
        .join(", ")
}

fn ellipsis(count: usize) -> &'static str {
    if count > MAX_EXAMPLES {
        ", ..."
    } else {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::date;

    #[test]
    fn test_empty_diagnostics() {
        let diagnostics = Diagnostics::new();
        assert!(diagnostics.is_empty());
        assert!(diagnostics.warnings().is_empty());
    }

    #[test]
    fn test_counts_and_warnings() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.undefined_factors.push(UndefinedFactorIssue {
            batch: "b2".to_string(),
            date: date("2024-01-01"),
            reason: UndefinedReason::ZeroAnchor,
        });
        diagnostics.unaligned_rows.push(RowIssue {
            batch: "b2".to_string(),
            date: date("2024-01-02"),
        });

        let counts = diagnostics.counts();
        assert_eq!(counts.undefined_factors, 1);
        assert_eq!(counts.unaligned_rows, 1);
        assert_eq!(counts.total(), 2);
        assert_eq!(diagnostics.unaligned_in("b2"), 1);
        assert_eq!(diagnostics.undefined_in("b1"), 0);

        let warnings = diagnostics.warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("'b2' 2024-01-02"));
        assert!(warnings[1].contains("anchor value is zero"));
    }

    #[test]
    fn test_warning_examples_are_capped() {
        let mut diagnostics = Diagnostics::new();
        for line in 0..8 {
            diagnostics.date_parse_failures.push(DateParseIssue {
                batch: "b".to_string(),
                line,
                raw: "??".to_string(),
            });
        }

        let warnings = diagnostics.warnings();
        assert!(warnings[0].starts_with("8 row(s)"));
        assert!(warnings[0].ends_with(", ..."));
    }

    #[test]
    fn test_extend_preserves_order() {
        let mut first = Diagnostics::new();
        first.duplicate_dates.push(RowIssue {
            batch: "a".to_string(),
            date: date("2024-01-01"),
        });
        let mut second = Diagnostics::new();
        second.duplicate_dates.push(RowIssue {
            batch: "b".to_string(),
            date: date("2024-01-01"),
        });

        first.extend(second);
        assert_eq!(first.duplicate_dates[1].batch, "b");
    }
}
