//! # csv2ofx
//!
//! Converts bank-statement CSV exports into OFX 1.0.2 (SGML) documents that
//! accounting software can import.
//!
//! ## Design Principles
//!
//! - **Fixed-point arithmetic**: amounts use 2 decimal places via `rust_decimal`
//! - **Explicit locale**: delimiter and decimal separator come from configuration
//! - **Strict invariants**: `final == initial + credits - debits` always holds
//! - **Deterministic output**: identical input renders byte-identical OFX with
//!   stable transaction ids
//! - **No partial files**: output is written only after the document is complete
//!
//! ## Example
//!
//! ```no_run
//! use csv2ofx::{convert, AccountInfo, ConversionConfig, DateDecisions, FieldMapping, StatementPeriod};
//! use chrono::NaiveDate;
//!
//! let csv = "date,amount,memo\n2026-01-15,49.99,Refund\n";
//! let mapping = FieldMapping {
//!     date: Some("date".into()),
//!     amount: Some("amount".into()),
//!     description: vec!["memo".into()],
//!     ..Default::default()
//! };
//! let period = StatementPeriod::new(
//!     NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
//! )
//! .unwrap();
//! let account = AccountInfo {
//!     bank_id: "12345".into(),
//!     account_id: "000111222".into(),
//!     currency: "USD".into(),
//!     account_type: "CHECKING".into(),
//!     org: None,
//!     fid: None,
//! };
//!
//! let config = ConversionConfig::new(csv, mapping, period, account);
//! let result = convert(&config, &DateDecisions::new()).unwrap();
//! result.write_to(std::path::Path::new("statement.ofx")).unwrap();
//! ```

pub mod balance;
pub mod config;
pub mod convert;
pub mod decimal;
pub mod error;
pub mod mapping;
pub mod normalize;
pub mod ofx;
pub mod period;
pub mod reader;
pub mod transaction;

pub use balance::{preview, BalancePreview};
pub use config::{ConversionConfig, Profile};
pub use convert::{
    convert, convert_to_file, convert_with_cancel, out_of_range_rows, preview_balance,
    ConversionResult, ConversionStats, DateDecisions, OutOfRangeRow,
};
pub use decimal::Money;
pub use error::{ConvertError, Result, Role, ValueError};
pub use mapping::FieldMapping;
pub use normalize::{format_amount, parse_amount, parse_date, DEFAULT_DATE_FORMATS};
pub use ofx::{serialize, write_atomic, AccountInfo, OfxDocument};
pub use period::{adjust_to_boundary, classify, DateClassification, DateDecision, StatementPeriod};
pub use reader::{read, TabularData, TabularRow};
pub use transaction::{build, BuildOptions, Transaction, TxType};
