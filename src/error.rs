//! Error types for the conversion pipeline.

use chrono::NaiveDate;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for conversion operations
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Logical column roles a [`FieldMapping`](crate::mapping::FieldMapping) can assign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Date,
    Amount,
    Description,
    TypeHint,
    Debit,
    Credit,
    Time,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Date => "date",
            Role::Amount => "amount",
            Role::Description => "description",
            Role::TypeHint => "type hint",
            Role::Debit => "debit",
            Role::Credit => "credit",
            Role::Time => "time",
        };
        f.write_str(name)
    }
}

/// Failure to normalize a single raw value.
///
/// Carries no row information; the transaction builder attaches it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("invalid amount '{0}'")]
    InvalidAmount(String),

    #[error("invalid date '{0}'")]
    InvalidDate(String),
}

/// Errors that can occur during conversion.
///
/// Row numbers are 0-based data-row indices (the header is not counted).
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Failed to read or write a file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV tokenizing error
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// Input had no header record
    #[error("Input is empty")]
    EmptyInput,

    /// Row field count differs from the header
    #[error("Malformed row {row}: expected {expected} fields, found {found}")]
    MalformedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Invalid amount at row {row}: '{value}'")]
    InvalidAmount { row: usize, value: String },

    #[error("Invalid date at row {row}: '{value}'")]
    InvalidDate { row: usize, value: String },

    /// A required role has no column assigned
    #[error("No column mapped for the {0} field")]
    UnmappedField(Role),

    /// A mapped column does not exist in the header
    #[error("Mapped column '{column}' for the {role} field is not in the input header")]
    UnknownColumn { role: Role, column: String },

    /// Out-of-range date without a decision while in strict mode
    #[error("Row {row}: date {date} is outside the statement period and no decision was given")]
    UnresolvedDateRange { row: usize, date: NaiveDate },

    /// A running total left the range a decimal can represent
    #[error("Balance overflow: totals exceed the representable range")]
    BalanceOverflow,

    #[error("Invalid statement period: start {start} is after end {end}")]
    InvalidPeriod { start: NaiveDate, end: NaiveDate },

    /// Profile file could not be turned into a configuration
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    /// Required document metadata is missing or malformed
    #[error("Cannot serialize OFX document: {0}")]
    Serialization(String),

    /// The output file could not be written
    #[error("Cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Conversion cancelled")]
    Cancelled,

    /// Missing command-line arguments
    #[error("Missing arguments. Usage: csv2ofx <profile.toml> <input.csv> <output.ofx>")]
    MissingArgument,
}

impl ConvertError {
    /// Attaches a row index to a value normalization failure.
    pub fn at_row(row: usize, err: ValueError) -> Self {
        match err {
            ValueError::InvalidAmount(value) => ConvertError::InvalidAmount { row, value },
            ValueError::InvalidDate(value) => ConvertError::InvalidDate { row, value },
        }
    }

    /// Returns `true` for errors that only invalidate a single row.
    ///
    /// These are collected into the result summary unless strict mode is on.
    pub fn is_row_level(&self) -> bool {
        matches!(
            self,
            ConvertError::MalformedRow { .. }
                | ConvertError::InvalidAmount { .. }
                | ConvertError::InvalidDate { .. }
        )
    }

    /// Source row index, for row-level errors.
    pub fn row(&self) -> Option<usize> {
        match self {
            ConvertError::MalformedRow { row, .. }
            | ConvertError::InvalidAmount { row, .. }
            | ConvertError::InvalidDate { row, .. }
            | ConvertError::UnresolvedDateRange { row, .. } => Some(*row),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_error_gets_row_attached() {
        let err = ConvertError::at_row(3, ValueError::InvalidAmount("abc".to_string()));
        assert!(matches!(err, ConvertError::InvalidAmount { row: 3, ref value } if value == "abc"));
        assert_eq!(err.row(), Some(3));
        assert!(err.is_row_level());
    }

    #[test]
    fn test_configuration_errors_are_not_row_level() {
        assert!(!ConvertError::UnmappedField(Role::Date).is_row_level());
        assert!(!ConvertError::EmptyInput.is_row_level());
        assert!(!ConvertError::Cancelled.is_row_level());
    }

    #[test]
    fn test_messages() {
        let err = ConvertError::UnmappedField(Role::Amount);
        assert_eq!(err.to_string(), "No column mapped for the amount field");

        let err = ConvertError::MalformedRow {
            row: 4,
            expected: 3,
            found: 2,
        };
        assert_eq!(err.to_string(), "Malformed row 4: expected 3 fields, found 2");
    }
}
