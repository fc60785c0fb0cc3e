//! Normalized statement transactions built from raw rows.

use crate::decimal::Money;
use crate::error::{ConvertError, Result};
use crate::mapping::{AmountSource, FieldMapping};
use crate::normalize::{parse_amount, parse_date_time, parse_time};
use crate::period::{classify, DateClassification, DateDecision, StatementPeriod};
use crate::reader::TabularRow;
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Longest memo OFX importers accept.
pub const MAX_DESCRIPTION_LEN: usize = 255;

const TRUNCATION_MARKER: &str = "...";

/// Direction of a transaction, derived from the sign of its amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TxType {
    Credit,
    Debit,
}

impl TxType {
    /// Zero counts as a credit.
    pub fn from_amount(amount: Money) -> Self {
        if amount.is_negative() {
            TxType::Debit
        } else {
            TxType::Credit
        }
    }

    /// The OFX `TRNTYPE` keyword.
    pub fn as_ofx(&self) -> &'static str {
        match self {
            TxType::Credit => "CREDIT",
            TxType::Debit => "DEBIT",
        }
    }
}

/// Parsing settings the builder needs besides the mapping.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub decimal_separator: char,
    pub date_formats: Vec<String>,
    pub invert_amounts: bool,
}

/// A normalized transaction.
///
/// # Invariants
///
/// - `tx_type == Credit` iff `amount >= 0`
/// - `description` holds at most [`MAX_DESCRIPTION_LEN`] characters
/// - `id` depends only on the source index, source date and amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    /// Posting date, after any out-of-range decision was applied.
    pub date: NaiveDate,
    /// Time of day, when the source carried one.
    pub time: Option<NaiveTime>,
    pub amount: Money,
    pub description: String,
    pub tx_type: TxType,
    pub source_index: usize,
    /// Deterministic FITID.
    pub id: String,
    /// Classification of the source date, before any adjustment.
    pub date_classification: DateClassification,
    /// Decision applied to an out-of-range date, if any.
    pub decision: Option<DateDecision>,
}

impl Transaction {
    /// Returns `false` if the transaction was excluded by a date decision.
    pub fn is_included(&self) -> bool {
        self.decision != Some(DateDecision::Exclude)
    }

    /// Classifies the date against `period` and applies `decision` if it is
    /// out of range. Consumes the draft so the result is final.
    pub fn resolve(
        mut self,
        period: &StatementPeriod,
        decision: impl FnOnce(DateClassification) -> Result<DateDecision>,
    ) -> Result<Self> {
        let classification = classify(self.date, period);
        self.date_classification = classification;

        if classification.is_out_of_range() {
            let chosen = decision(classification)?;
            if let Some(date) = chosen.apply(self.date, period) {
                self.date = date;
            }
            self.decision = Some(chosen);
        }
        Ok(self)
    }
}

/// Builds a transaction from one row.
///
/// The date classification is left `Valid` until [`Transaction::resolve`]
/// runs against a period.
pub fn build(row: &TabularRow, mapping: &FieldMapping, options: &BuildOptions) -> Result<Transaction> {
    let date_column = mapping.date_column()?;
    let amount_source = mapping.amount_source()?;

    let raw_date = row.get(date_column).unwrap_or_default();
    let (date, mut time) = parse_date_time(raw_date, &options.date_formats)
        .map_err(|e| ConvertError::at_row(row.index, e))?;

    if let Some(raw_time) = mapping.time.as_deref().and_then(|c| row.get(c)) {
        if !raw_time.trim().is_empty() {
            time = Some(parse_time(raw_time).map_err(|e| ConvertError::at_row(row.index, e))?);
        }
    }

    let mut amount = read_amount(row, amount_source, options.decimal_separator)?;

    if let Some(hint) = mapping.type_hint.as_deref().and_then(|c| row.get(c)) {
        match hint_type(hint) {
            Some(TxType::Debit) => amount = -amount.abs(),
            Some(TxType::Credit) => amount = amount.abs(),
            None => {}
        }
    }

    if options.invert_amounts {
        amount = -amount;
    }

    let description = describe(row, &mapping.description);

    Ok(Transaction {
        date,
        time,
        amount,
        description,
        tx_type: TxType::from_amount(amount),
        source_index: row.index,
        id: transaction_id(row.index, date, amount),
        date_classification: DateClassification::Valid,
        decision: None,
    })
}

fn read_amount(row: &TabularRow, source: AmountSource<'_>, separator: char) -> Result<Money> {
    let parse = |column: &str, blank_is_zero: bool| -> Result<Money> {
        let raw = row.get(column).unwrap_or_default();
        if blank_is_zero && raw.trim().is_empty() {
            return Ok(Money::ZERO);
        }
        parse_amount(raw, separator)
            .map(Money::new)
            .map_err(|e| ConvertError::at_row(row.index, e))
    };

    match source {
        AmountSource::Signed(column) => parse(column, false),
        AmountSource::Split { debit, credit } => {
            Ok(parse(credit, true)?.abs() - parse(debit, true)?.abs())
        }
    }
}

/// Interprets a type-hint cell. Unknown markers yield `None`.
fn hint_type(raw: &str) -> Option<TxType> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "D" | "DR" | "DEBIT" | "DBT" | "-" => Some(TxType::Debit),
        "C" | "CR" | "CREDIT" | "CRD" | "+" => Some(TxType::Credit),
        _ => None,
    }
}

/// Joins the description columns into one memo line.
fn describe(row: &TabularRow, columns: &[String]) -> String {
    let joined = columns
        .iter()
        .filter_map(|c| row.get(c))
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");
    truncate_description(joined)
}

/// Cuts `text` to [`MAX_DESCRIPTION_LEN`] characters, ending in `...`.
pub fn truncate_description(text: String) -> String {
    if text.chars().count() <= MAX_DESCRIPTION_LEN {
        return text;
    }
    let keep = MAX_DESCRIPTION_LEN - TRUNCATION_MARKER.len();
    let mut cut: String = text.chars().take(keep).collect();
    cut.push_str(TRUNCATION_MARKER);
    cut
}

/// Derives a FITID that is stable across runs for unchanged input.
pub fn transaction_id(index: usize, date: NaiveDate, amount: Money) -> String {
    let input = format!("{}|{}|{}", index, date.format("%Y-%m-%d"), amount);

    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();

    digest[..16].iter().map(|b| format!("{:02x}", b)).collect()
}
