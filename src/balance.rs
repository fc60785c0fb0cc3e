//! Statement balance aggregation.
//!
//! Maintains the invariant: `final == initial + credits - debits`.

use crate::decimal::Money;
use crate::error::{ConvertError, Result};
use crate::transaction::Transaction;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;

/// Tolerance, in thousandths, allowed between the final balance and its
/// recomputation.
const TOLERANCE_MILLIS: i64 = 5;

/// Balance summary over the included transactions of a statement.
///
/// # Invariants
///
/// - `total_debits` is a magnitude and never negative
/// - `final_balance == initial_balance + total_credits - total_debits`
/// - `transactions` keeps source order and omits excluded rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalancePreview {
    pub initial_balance: Money,

    /// Sum of positive amounts.
    pub total_credits: Money,

    /// Absolute sum of negative amounts.
    pub total_debits: Money,

    pub final_balance: Money,

    pub transactions: Vec<Transaction>,
}

impl BalancePreview {
    /// Verifies the balance equation within half a cent.
    pub fn is_consistent(&self) -> bool {
        let expected = self
            .initial_balance
            .value()
            .checked_add(self.total_credits.value())
            .and_then(|v| v.checked_sub(self.total_debits.value()))
            .and_then(|v| v.checked_sub(self.final_balance.value()));
        match expected {
            Some(diff) => diff.abs() <= Decimal::new(TOLERANCE_MILLIS, 3),
            None => false,
        }
    }

    pub fn credit_count(&self) -> usize {
        self.transactions.iter().filter(|t| !t.amount.is_negative()).count()
    }

    pub fn debit_count(&self) -> usize {
        self.transactions.len() - self.credit_count()
    }
}

/// Aggregates `transactions` into a [`BalancePreview`].
///
/// A transaction is included unless its source index is in `excluded` or
/// its date decision excluded it. Fails with
/// [`ConvertError::BalanceOverflow`] if a total cannot be represented.
pub fn preview(
    transactions: &[Transaction],
    initial_balance: Money,
    excluded: &HashSet<usize>,
) -> Result<BalancePreview> {
    let mut total_credits = Money::ZERO;
    let mut total_debits = Money::ZERO;
    let mut included = Vec::with_capacity(transactions.len());

    for tx in transactions {
        if excluded.contains(&tx.source_index) || !tx.is_included() {
            continue;
        }

        if tx.amount.is_negative() {
            total_debits = total_debits
                .checked_add(tx.amount.abs())
                .ok_or(ConvertError::BalanceOverflow)?;
        } else {
            total_credits = total_credits
                .checked_add(tx.amount)
                .ok_or(ConvertError::BalanceOverflow)?;
        }
        included.push(tx.clone());
    }

    let final_balance = initial_balance
        .checked_add(total_credits)
        .and_then(|v| v.checked_sub(total_debits))
        .ok_or(ConvertError::BalanceOverflow)?;

    let preview = BalancePreview {
        initial_balance,
        total_credits,
        total_debits,
        final_balance,
        transactions: included,
    };
    debug_assert!(preview.is_consistent());
    Ok(preview)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::{DateClassification, DateDecision};
    use crate::transaction::{transaction_id, TxType};
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    fn tx(index: usize, amount: &str) -> Transaction {
        let amount = money(amount);
        let date = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        Transaction {
            date,
            time: None,
            amount,
            description: String::new(),
            tx_type: TxType::from_amount(amount),
            source_index: index,
            id: transaction_id(index, date, amount),
            date_classification: DateClassification::Valid,
            decision: None,
        }
    }

    #[test]
    fn test_credits_and_debits() {
        let txs = vec![tx(0, "50.00"), tx(1, "-20.00")];
        let p = preview(&txs, money("100.00"), &HashSet::new()).unwrap();

        assert_eq!(p.total_credits.to_string(), "50.00");
        assert_eq!(p.total_debits.to_string(), "20.00");
        assert_eq!(p.final_balance.to_string(), "130.00");
        assert_eq!(p.credit_count(), 1);
        assert_eq!(p.debit_count(), 1);
        assert!(p.is_consistent());
    }

    #[test]
    fn test_empty_statement_keeps_initial_balance() {
        let p = preview(&[], money("42.10"), &HashSet::new()).unwrap();
        assert_eq!(p.final_balance.to_string(), "42.10");
        assert!(p.transactions.is_empty());
    }

    #[test]
    fn test_excluded_indices_are_skipped() {
        let txs = vec![tx(0, "10.00"), tx(1, "-5.00"), tx(2, "1.00")];
        let excluded: HashSet<usize> = [1].into_iter().collect();
        let p = preview(&txs, Money::ZERO, &excluded).unwrap();

        assert_eq!(p.total_debits, Money::ZERO);
        assert_eq!(p.final_balance.to_string(), "11.00");
        let order: Vec<usize> = p.transactions.iter().map(|t| t.source_index).collect();
        assert_eq!(order, vec![0, 2]);
    }

    #[test]
    fn test_exclude_decision_is_skipped() {
        let mut dropped = tx(1, "-99.00");
        dropped.date_classification = DateClassification::AfterEnd;
        dropped.decision = Some(DateDecision::Exclude);

        let txs = vec![tx(0, "10.00"), dropped];
        let p = preview(&txs, Money::ZERO, &HashSet::new()).unwrap();

        assert_eq!(p.transactions.len(), 1);
        assert_eq!(p.final_balance.to_string(), "10.00");
    }

    #[test]
    fn test_many_small_amounts_do_not_drift() {
        let txs: Vec<_> = (0..1000).map(|i| tx(i, "0.10")).collect();
        let p = preview(&txs, money("-0.01"), &HashSet::new()).unwrap();

        assert_eq!(p.total_credits.to_string(), "100.00");
        assert_eq!(p.final_balance.to_string(), "99.99");
    }

    #[test]
    fn test_negative_final_balance() {
        let txs = vec![tx(0, "-250.75")];
        let p = preview(&txs, money("100.00"), &HashSet::new()).unwrap();
        assert_eq!(p.final_balance.to_string(), "-150.75");
        assert!(p.is_consistent());
    }

    #[test]
    fn test_overflowing_totals_are_an_error() {
        let huge = Money::from(Decimal::MAX);
        let result = preview(&[tx(0, "1.00")], huge, &HashSet::new());
        assert!(matches!(result, Err(ConvertError::BalanceOverflow)));

        let mut big = tx(0, "1.00");
        big.amount = huge;
        let result = preview(&[big.clone(), big], Money::ZERO, &HashSet::new());
        assert!(matches!(result, Err(ConvertError::BalanceOverflow)));
    }
}
