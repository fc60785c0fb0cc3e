//! Column assignments for the logical fields of a transaction.

use crate::error::{ConvertError, Result, Role};
use serde::{Deserialize, Serialize};

/// Maps logical roles to input column names.
///
/// An unmapped role is `None` (or an empty description list). A
/// transaction needs a date and either an amount column or both
/// debit and credit columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldMapping {
    pub date: Option<String>,
    pub amount: Option<String>,
    /// Columns joined, in this order, into the memo.
    pub description: Vec<String>,
    /// Column holding a credit/debit marker such as `C`/`D`.
    pub type_hint: Option<String>,
    /// Unsigned outflow column, used when there is no signed amount column.
    pub debit: Option<String>,
    /// Unsigned inflow column, used when there is no signed amount column.
    pub credit: Option<String>,
    /// Separate time-of-day column.
    pub time: Option<String>,
}

/// Where a transaction's signed amount comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountSource<'a> {
    Signed(&'a str),
    Split { debit: &'a str, credit: &'a str },
}

impl FieldMapping {
    pub fn date_column(&self) -> Result<&str> {
        self.date
            .as_deref()
            .ok_or(ConvertError::UnmappedField(Role::Date))
    }

    /// Resolves the amount role. A signed column takes precedence over a
    /// debit/credit pair.
    pub fn amount_source(&self) -> Result<AmountSource<'_>> {
        match (&self.amount, &self.debit, &self.credit) {
            (Some(amount), _, _) => Ok(AmountSource::Signed(amount)),
            (None, Some(debit), Some(credit)) => Ok(AmountSource::Split { debit, credit }),
            _ => Err(ConvertError::UnmappedField(Role::Amount)),
        }
    }

    /// Checks that required roles are mapped and every mapped column is
    /// present in `headers`.
    pub fn validate(&self, headers: &[String]) -> Result<()> {
        self.date_column()?;
        self.amount_source()?;

        let singles = [
            (Role::Date, &self.date),
            (Role::Amount, &self.amount),
            (Role::TypeHint, &self.type_hint),
            (Role::Debit, &self.debit),
            (Role::Credit, &self.credit),
            (Role::Time, &self.time),
        ];
        let mapped = singles
            .into_iter()
            .filter_map(|(role, col)| col.as_ref().map(|c| (role, c)))
            .chain(self.description.iter().map(|c| (Role::Description, c)));

        for (role, column) in mapped {
            if !headers.iter().any(|h| h == column) {
                return Err(ConvertError::UnknownColumn {
                    role,
                    column: column.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> Vec<String> {
        ["Date", "Amount", "Payee", "Memo", "Out", "In"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_missing_date_is_unmapped() {
        let mapping = FieldMapping {
            amount: Some("Amount".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            mapping.validate(&headers()),
            Err(ConvertError::UnmappedField(Role::Date))
        ));
    }

    #[test]
    fn test_missing_amount_is_unmapped() {
        let mapping = FieldMapping {
            date: Some("Date".to_string()),
            debit: Some("Out".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            mapping.amount_source(),
            Err(ConvertError::UnmappedField(Role::Amount))
        ));
    }

    #[test]
    fn test_split_columns_satisfy_amount() {
        let mapping = FieldMapping {
            date: Some("Date".to_string()),
            debit: Some("Out".to_string()),
            credit: Some("In".to_string()),
            ..Default::default()
        };
        assert_eq!(
            mapping.amount_source().unwrap(),
            AmountSource::Split {
                debit: "Out",
                credit: "In"
            }
        );
        assert!(mapping.validate(&headers()).is_ok());
    }

    #[test]
    fn test_unknown_description_column() {
        let mapping = FieldMapping {
            date: Some("Date".to_string()),
            amount: Some("Amount".to_string()),
            description: vec!["Payee".to_string(), "Note".to_string()],
            ..Default::default()
        };
        match mapping.validate(&headers()) {
            Err(ConvertError::UnknownColumn { role, column }) => {
                assert_eq!(role, Role::Description);
                assert_eq!(column, "Note");
            }
            other => panic!("Expected UnknownColumn, got {:?}", other),
        }
    }
}
