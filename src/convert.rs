//! End-to-end conversion pipeline.
//!
//! read → build → classify/decide → balance → document → bytes. Rows are
//! processed in source order on the calling thread. Nothing touches the
//! filesystem until the whole document exists in memory, so a failure or a
//! cancellation before that point leaves no output behind.

use crate::balance::{preview, BalancePreview};
use crate::config::ConversionConfig;
use crate::error::{ConvertError, Result};
use crate::ofx::{serialize, write_atomic, OfxDocument};
use crate::period::{adjust_to_boundary, classify, DateClassification, DateDecision};
use crate::reader::read;
use crate::transaction::{build, Transaction};
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// Caller-supplied decisions for out-of-range rows, keyed by row index.
pub type DateDecisions = HashMap<usize, DateDecision>;

/// Counters a UI shows after a conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionStats {
    /// Data rows in the input, malformed ones included.
    pub rows_read: usize,
    pub included: usize,
    pub excluded: usize,
    pub failed: usize,
    pub credits: usize,
    pub debits: usize,
    /// Included rows whose date was moved to a period boundary.
    pub adjusted: usize,
    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,
}

/// Outcome of a successful conversion.
#[derive(Debug)]
pub struct ConversionResult {
    /// Balance over the included transactions, which it also holds.
    pub balance: BalancePreview,
    /// Transactions left out by a decision or by the excluded-row set.
    pub excluded: Vec<Transaction>,
    /// Rows that could not be read or normalized, in row order.
    pub failed_rows: Vec<ConvertError>,
    pub document: OfxDocument,
    /// The serialized document.
    pub ofx: Vec<u8>,
    pub stats: ConversionStats,
}

impl ConversionResult {
    /// Included transactions in source order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.balance.transactions
    }

    /// Writes the serialized document to `path` atomically.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        write_atomic(&self.ofx, path)
    }
}

/// A row whose date falls outside the statement period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutOfRangeRow {
    pub row: usize,
    pub date: NaiveDate,
    pub classification: DateClassification,
    /// The date [`DateDecision::AdjustToBoundary`] would produce.
    pub boundary: NaiveDate,
}

/// Runs the full pipeline in memory.
pub fn convert(config: &ConversionConfig, decisions: &DateDecisions) -> Result<ConversionResult> {
    convert_with_cancel(config, decisions, &AtomicBool::new(false))
}

/// Like [`convert`], checking `cancel` before each row.
pub fn convert_with_cancel(
    config: &ConversionConfig,
    decisions: &DateDecisions,
    cancel: &AtomicBool,
) -> Result<ConversionResult> {
    let processed = process_rows(config, decisions, cancel)?;

    let balance = preview(
        &processed.transactions,
        config.initial_balance,
        &config.excluded_rows,
    )?;
    let excluded: Vec<Transaction> = processed
        .transactions
        .into_iter()
        .filter(|tx| !tx.is_included() || config.excluded_rows.contains(&tx.source_index))
        .collect();

    let document = OfxDocument::new(
        config.account.clone(),
        config.statement_date(),
        config.period,
        &balance,
    );
    let ofx = serialize(&document)?;

    let stats = stats(&balance, &excluded, &processed.failed, processed.rows_read);
    info!(
        "Converted {} of {} rows ({} excluded, {} failed), final balance {}",
        stats.included, stats.rows_read, stats.excluded, stats.failed, balance.final_balance
    );

    Ok(ConversionResult {
        balance,
        excluded,
        failed_rows: processed.failed,
        document,
        ofx,
        stats,
    })
}

/// Converts and writes the document to `path`. The file is only created
/// once conversion has fully succeeded.
pub fn convert_to_file(
    config: &ConversionConfig,
    decisions: &DateDecisions,
    path: &Path,
) -> Result<ConversionResult> {
    let result = convert(config, decisions)?;
    result.write_to(path)?;
    Ok(result)
}

/// Computes only the balance preview, without building a document.
pub fn preview_balance(config: &ConversionConfig, decisions: &DateDecisions) -> Result<BalancePreview> {
    let processed = process_rows(config, decisions, &AtomicBool::new(false))?;
    preview(
        &processed.transactions,
        config.initial_balance,
        &config.excluded_rows,
    )
}

/// Lists the rows that need a date decision. Rows that fail to parse are
/// skipped here; [`convert`] reports them.
pub fn out_of_range_rows(config: &ConversionConfig) -> Result<Vec<OutOfRangeRow>> {
    let data = read(&config.input, config.delimiter, false)?;
    config.mapping.validate(&data.headers)?;
    let options = config.build_options();

    let rows = data
        .rows
        .iter()
        .filter_map(|row| build(row, &config.mapping, &options).ok())
        .filter_map(|tx| {
            let classification = classify(tx.date, &config.period);
            classification.is_out_of_range().then(|| OutOfRangeRow {
                row: tx.source_index,
                date: tx.date,
                classification,
                boundary: adjust_to_boundary(tx.date, &config.period),
            })
        })
        .collect();
    Ok(rows)
}

struct Processed {
    transactions: Vec<Transaction>,
    failed: Vec<ConvertError>,
    rows_read: usize,
}

fn process_rows(
    config: &ConversionConfig,
    decisions: &DateDecisions,
    cancel: &AtomicBool,
) -> Result<Processed> {
    let data = read(&config.input, config.delimiter, config.strict)?;
    config.mapping.validate(&data.headers)?;

    let options = config.build_options();
    let rows_read = data.rows.len() + data.malformed.len();
    let mut failed = data.malformed;
    let mut transactions = Vec::with_capacity(data.rows.len());

    for row in &data.rows {
        if cancel.load(Ordering::Relaxed) {
            debug!("Conversion cancelled before row {}", row.index);
            return Err(ConvertError::Cancelled);
        }

        let draft = match build(row, &config.mapping, &options) {
            Ok(tx) => tx,
            Err(e) if e.is_row_level() && !config.strict => {
                warn!("Skipping row: {}", e);
                failed.push(e);
                continue;
            }
            Err(e) => return Err(e),
        };

        let date = draft.date;
        let tx = draft.resolve(&config.period, |classification| {
            let decision = decide(config, decisions, row.index, date)?;
            debug!(
                "Row {}: {} is {:?}, applying {:?}",
                row.index, date, classification, decision
            );
            Ok(decision)
        })?;

        debug!(
            "Row {}: {} {} on {} ({})",
            row.index,
            tx.tx_type.as_ofx(),
            tx.amount,
            tx.date,
            tx.id
        );
        transactions.push(tx);
    }

    failed.sort_by_key(|e| e.row());

    Ok(Processed {
        transactions,
        failed,
        rows_read,
    })
}

fn decide(
    config: &ConversionConfig,
    decisions: &DateDecisions,
    row: usize,
    date: NaiveDate,
) -> Result<DateDecision> {
    match decisions.get(&row) {
        Some(decision) => Ok(*decision),
        None if config.strict && !config.excluded_rows.contains(&row) => {
            Err(ConvertError::UnresolvedDateRange { row, date })
        }
        None => Ok(config.default_decision),
    }
}

fn stats(
    balance: &BalancePreview,
    excluded: &[Transaction],
    failed: &[ConvertError],
    rows_read: usize,
) -> ConversionStats {
    let included = &balance.transactions;
    ConversionStats {
        rows_read,
        included: included.len(),
        excluded: excluded.len(),
        failed: failed.len(),
        credits: balance.credit_count(),
        debits: balance.debit_count(),
        adjusted: included
            .iter()
            .filter(|tx| tx.decision == Some(DateDecision::AdjustToBoundary))
            .count(),
        earliest: included.iter().map(|tx| tx.date).min(),
        latest: included.iter().map(|tx| tx.date).max(),
    }
}
