//! Conversion configuration.
//!
//! [`ConversionConfig`] is what the pipeline consumes: complete, validated
//! and read-only. [`Profile`] is its on-disk TOML form, loaded by hosts such
//! as the CLI.

use crate::convert::DateDecisions;
use crate::decimal::Money;
use crate::error::{ConvertError, Result};
use crate::mapping::FieldMapping;
use crate::normalize::DEFAULT_DATE_FORMATS;
use crate::ofx::AccountInfo;
use crate::period::{DateDecision, StatementPeriod};
use crate::transaction::BuildOptions;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

/// Everything one conversion needs. Owned by the caller.
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    /// Raw delimited text, header first.
    pub input: String,
    pub mapping: FieldMapping,
    pub delimiter: u8,
    /// `,` or `.`
    pub decimal_separator: char,
    /// `chrono` formats tried in order.
    pub date_formats: Vec<String>,
    pub invert_amounts: bool,
    pub period: StatementPeriod,
    /// Abort on the first row-level error or unresolved date.
    pub strict: bool,
    pub initial_balance: Money,
    pub account: AccountInfo,
    /// Server and balance date; the period end when not set.
    pub statement_date: Option<NaiveDate>,
    /// Rows left out of the document regardless of their dates.
    pub excluded_rows: HashSet<usize>,
    /// Decision for out-of-range rows the caller did not decide on.
    /// Ignored in strict mode.
    pub default_decision: DateDecision,
}

impl ConversionConfig {
    /// Creates a configuration with `,` delimiter, `.` decimals, the
    /// default date formats and a zero opening balance.
    pub fn new(
        input: impl Into<String>,
        mapping: FieldMapping,
        period: StatementPeriod,
        account: AccountInfo,
    ) -> Self {
        ConversionConfig {
            input: input.into(),
            mapping,
            delimiter: b',',
            decimal_separator: '.',
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|s| s.to_string()).collect(),
            invert_amounts: false,
            period,
            strict: false,
            initial_balance: Money::ZERO,
            account,
            statement_date: None,
            excluded_rows: HashSet::new(),
            default_decision: DateDecision::KeepOriginal,
        }
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            decimal_separator: self.decimal_separator,
            date_formats: self.date_formats.clone(),
            invert_amounts: self.invert_amounts,
        }
    }

    pub fn statement_date(&self) -> NaiveDate {
        self.statement_date.unwrap_or_else(|| self.period.end())
    }
}

/// A reusable conversion profile, as stored in TOML.
///
/// ```toml
/// delimiter = ";"
/// decimal_separator = ","
/// initial_balance = "100.00"
/// out_of_range = "adjust"
///
/// [period]
/// start = "2026-01-01"
/// end = "2026-01-31"
///
/// [account]
/// bank_id = "12345"
/// account_id = "000111222"
/// currency = "EUR"
///
/// [mapping]
/// date = "Date"
/// amount = "Amount"
/// description = ["Payee", "Reference"]
///
/// [decisions]
/// 7 = "exclude"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default = "default_decimal_separator")]
    pub decimal_separator: String,
    #[serde(default)]
    pub date_formats: Vec<String>,
    #[serde(default)]
    pub invert_amounts: bool,
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub initial_balance: Money,
    #[serde(default)]
    pub out_of_range: DateDecision,
    #[serde(default)]
    pub statement_date: Option<NaiveDate>,
    #[serde(default)]
    pub excluded_rows: Vec<usize>,
    pub period: StatementPeriod,
    pub account: AccountInfo,
    pub mapping: FieldMapping,
    /// Per-row decisions keyed by 0-based data row index.
    #[serde(default)]
    pub decisions: BTreeMap<String, DateDecision>,
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_decimal_separator() -> String {
    ".".to_string()
}

impl Profile {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ConvertError::InvalidProfile(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Per-row date decisions with their keys parsed as row indices.
    pub fn decisions(&self) -> Result<DateDecisions> {
        self.decisions
            .iter()
            .map(|(key, decision)| {
                key.trim()
                    .parse::<usize>()
                    .map(|row| (row, *decision))
                    .map_err(|_| {
                        ConvertError::InvalidProfile(format!("decision key '{}' is not a row index", key))
                    })
            })
            .collect()
    }

    /// Validates the profile and binds it to `input`.
    pub fn into_config(self, input: impl Into<String>) -> Result<ConversionConfig> {
        let delimiter = parse_delimiter(&self.delimiter)?;
        let decimal_separator = match self.decimal_separator.as_str() {
            "," => ',',
            "." => '.',
            other => {
                return Err(ConvertError::InvalidProfile(format!(
                    "decimal separator must be ',' or '.', got '{}'",
                    other
                )))
            }
        };
        if delimiter as char == decimal_separator {
            return Err(ConvertError::InvalidProfile(
                "delimiter and decimal separator must differ".to_string(),
            ));
        }

        let mut config = ConversionConfig::new(input, self.mapping, self.period, self.account);
        config.delimiter = delimiter;
        config.decimal_separator = decimal_separator;
        if !self.date_formats.is_empty() {
            config.date_formats = self.date_formats;
        }
        config.invert_amounts = self.invert_amounts;
        config.strict = self.strict;
        config.initial_balance = self.initial_balance;
        config.default_decision = self.out_of_range;
        config.statement_date = self.statement_date;
        config.excluded_rows = self.excluded_rows.into_iter().collect();
        Ok(config)
    }
}

fn parse_delimiter(raw: &str) -> Result<u8> {
    if raw.eq_ignore_ascii_case("tab") {
        return Ok(b'\t');
    }
    match raw.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ => Err(ConvertError::InvalidProfile(format!(
            "delimiter must be a single ASCII character, got '{}'",
            raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"
delimiter = ";"
decimal_separator = ","
initial_balance = "100.00"
out_of_range = "adjust"
excluded_rows = [4]

[period]
start = "2026-01-01"
end = "2026-01-31"

[account]
bank_id = "12345"
account_id = "000111222"
currency = "EUR"

[mapping]
date = "Date"
amount = "Amount"
description = ["Payee", "Reference"]

[decisions]
7 = "exclude"
"9" = "keep_original"
"#;

    #[test]
    fn test_profile_into_config() {
        let profile = Profile::from_toml(PROFILE).unwrap();
        let decisions = profile.decisions().unwrap();
        let config = profile.into_config("Date;Amount\n").unwrap();

        assert_eq!(config.delimiter, b';');
        assert_eq!(config.decimal_separator, ',');
        assert_eq!(config.initial_balance.to_string(), "100.00");
        assert_eq!(config.default_decision, DateDecision::AdjustToBoundary);
        assert_eq!(config.account.account_type, "CHECKING");
        assert_eq!(config.mapping.description, vec!["Payee", "Reference"]);
        assert!(config.excluded_rows.contains(&4));
        assert_eq!(config.date_formats.len(), DEFAULT_DATE_FORMATS.len());
        assert_eq!(config.statement_date(), NaiveDate::from_ymd_opt(2026, 1, 31).unwrap());

        assert_eq!(decisions.get(&7), Some(&DateDecision::Exclude));
        assert_eq!(decisions.get(&9), Some(&DateDecision::KeepOriginal));
    }

    #[test]
    fn test_inverted_period_is_rejected() {
        let text = PROFILE.replace("start = \"2026-01-01\"", "start = \"2026-03-01\"");
        assert!(matches!(
            Profile::from_toml(&text),
            Err(ConvertError::InvalidProfile(_))
        ));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let text = format!("colour = \"blue\"\n{}", PROFILE);
        assert!(Profile::from_toml(&text).is_err());
    }

    #[test]
    fn test_bad_separator_settings() {
        let text = PROFILE.replace("decimal_separator = \",\"", "decimal_separator = \";\"");
        let profile = Profile::from_toml(&text).unwrap();
        assert!(matches!(
            profile.into_config(""),
            Err(ConvertError::InvalidProfile(_))
        ));

        let text = PROFILE.replace("delimiter = \";\"", "delimiter = \",\"");
        let profile = Profile::from_toml(&text).unwrap();
        assert!(profile.into_config("").is_err());
    }

    #[test]
    fn test_tab_delimiter() {
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert_eq!(parse_delimiter("\t").unwrap(), b'\t');
        assert!(parse_delimiter(";;").is_err());
    }

    #[test]
    fn test_bad_decision_key() {
        let text = PROFILE.replace("7 = \"exclude\"", "first = \"exclude\"");
        let profile = Profile::from_toml(&text).unwrap();
        assert!(profile.decisions().is_err());
    }
}
