//! OFX 1.0.2 (SGML) document rendering.
//!
//! The block order, tag nesting and line endings are fixed so that the same
//! statement always renders to the same bytes. Nothing here reads the clock:
//! every timestamp comes from the document.

use crate::balance::BalancePreview;
use crate::decimal::Money;
use crate::error::{ConvertError, Result};
use crate::period::StatementPeriod;
use crate::transaction::Transaction;
use chrono::{NaiveDate, NaiveTime};
use log::debug;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

const EOL: &str = "\r\n";

const HEADER: &[&str] = &[
    "OFXHEADER:100",
    "DATA:OFXSGML",
    "VERSION:102",
    "SECURITY:NONE",
    "ENCODING:UNICODE",
    "CHARSET:NONE",
    "COMPRESSION:NONE",
    "OLDFILEUID:NONE",
    "NEWFILEUID:NONE",
];

/// Identity of the account the statement belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountInfo {
    pub bank_id: String,
    pub account_id: String,
    /// ISO 4217 code, e.g. `EUR`.
    pub currency: String,
    /// OFX `ACCTTYPE`: CHECKING, SAVINGS, MONEYMRKT or CREDITLINE.
    #[serde(default = "default_account_type")]
    pub account_type: String,
    /// Financial institution name for `<FI><ORG>`.
    #[serde(default)]
    pub org: Option<String>,
    /// Financial institution id for `<FI><FID>`.
    #[serde(default)]
    pub fid: Option<String>,
}

fn default_account_type() -> String {
    "CHECKING".to_string()
}

/// Everything needed to render one statement.
#[derive(Debug, Clone, PartialEq)]
pub struct OfxDocument {
    pub account: AccountInfo,
    /// Used for `DTSERVER` and both `DTASOF` values.
    pub statement_date: NaiveDate,
    pub period: StatementPeriod,
    pub ledger_balance: Money,
    pub available_balance: Money,
    pub transactions: Vec<Transaction>,
}

impl OfxDocument {
    /// Assembles a document from a balance preview. Ledger and available
    /// balance are both the preview's final balance.
    pub fn new(
        account: AccountInfo,
        statement_date: NaiveDate,
        period: StatementPeriod,
        balance: &BalancePreview,
    ) -> Self {
        OfxDocument {
            account,
            statement_date,
            period,
            ledger_balance: balance.final_balance,
            available_balance: balance.final_balance,
            transactions: balance.transactions.clone(),
        }
    }

    fn validate(&self) -> Result<()> {
        let required = [
            ("bank id", &self.account.bank_id),
            ("account id", &self.account.account_id),
            ("currency", &self.account.currency),
            ("account type", &self.account.account_type),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConvertError::Serialization(format!("missing {}", name)));
            }
        }

        let currency = self.account.currency.trim();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConvertError::Serialization(format!(
                "currency '{}' is not an ISO 4217 code",
                currency
            )));
        }
        Ok(())
    }
}

/// Renders `document` as OFX 1.0.2 SGML.
pub fn serialize(document: &OfxDocument) -> Result<Vec<u8>> {
    document.validate()?;

    let mut out = SgmlWriter::default();
    for line in HEADER {
        out.line(line);
    }
    out.line("");

    let account = &document.account;
    let server_date = timestamp(document.statement_date, None);

    out.open("OFX");

    out.open("SIGNONMSGSRSV1");
    out.open("SONRS");
    out.status();
    out.field("DTSERVER", &server_date);
    out.field("LANGUAGE", "ENG");
    if account.org.is_some() || account.fid.is_some() {
        out.open("FI");
        if let Some(org) = &account.org {
            out.field("ORG", org);
        }
        if let Some(fid) = &account.fid {
            out.field("FID", fid);
        }
        out.close("FI");
    }
    out.close("SONRS");
    out.close("SIGNONMSGSRSV1");

    out.open("BANKMSGSRSV1");
    out.open("STMTTRNRS");
    out.field("TRNUID", "0");
    out.status();
    out.open("STMTRS");
    out.field("CURDEF", &account.currency.trim().to_ascii_uppercase());

    out.open("BANKACCTFROM");
    out.field("BANKID", &account.bank_id);
    out.field("ACCTID", &account.account_id);
    out.field("ACCTTYPE", &account.account_type);
    out.close("BANKACCTFROM");

    out.open("BANKTRANLIST");
    out.field("DTSTART", &timestamp(document.period.start(), None));
    out.field("DTEND", &timestamp(document.period.end(), None));
    for tx in &document.transactions {
        out.open("STMTTRN");
        out.field("TRNTYPE", tx.tx_type.as_ofx());
        out.field("DTPOSTED", &timestamp(tx.date, tx.time));
        out.field("TRNAMT", &tx.amount.to_string());
        out.field("FITID", &tx.id);
        if !tx.description.is_empty() {
            out.field("MEMO", &tx.description);
        }
        out.close("STMTTRN");
    }
    out.close("BANKTRANLIST");

    out.balance("LEDGERBAL", document.ledger_balance, &server_date);
    out.balance("AVAILBAL", document.available_balance, &server_date);

    out.close("STMTRS");
    out.close("STMTTRNRS");
    out.close("BANKMSGSRSV1");
    out.close("OFX");

    debug!(
        "Serialized OFX document with {} transactions ({} bytes)",
        document.transactions.len(),
        out.buf.len()
    );

    Ok(out.buf.into_bytes())
}

/// Writes `bytes` to `path` so that the destination either receives the
/// complete document or is left untouched.
///
/// The data goes to a temporary file in the same directory which is then
/// renamed over `path`.
pub fn write_atomic(bytes: &[u8], path: &Path) -> Result<()> {
    let write_err = |source: std::io::Error| ConvertError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// `YYYYMMDDHHMMSS`, midnight when no time is known.
fn timestamp(date: NaiveDate, time: Option<NaiveTime>) -> String {
    date.and_time(time.unwrap_or_default())
        .format("%Y%m%d%H%M%S")
        .to_string()
}

/// SGML requires escaping these three characters in element content.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\r' | '\n' => escaped.push(' '),
            c => escaped.push(c),
        }
    }
    escaped
}

#[derive(Default)]
struct SgmlWriter {
    buf: String,
}

impl SgmlWriter {
    fn line(&mut self, text: &str) {
        self.buf.push_str(text);
        self.buf.push_str(EOL);
    }

    fn open(&mut self, tag: &str) {
        self.buf.push('<');
        self.buf.push_str(tag);
        self.buf.push('>');
        self.buf.push_str(EOL);
    }

    fn close(&mut self, tag: &str) {
        self.buf.push_str("</");
        self.buf.push_str(tag);
        self.buf.push('>');
        self.buf.push_str(EOL);
    }

    /// Leaf elements are left unclosed, as OFX 1.x SGML allows.
    fn field(&mut self, tag: &str, value: &str) {
        self.buf.push('<');
        self.buf.push_str(tag);
        self.buf.push('>');
        self.buf.push_str(&escape(value.trim()));
        self.buf.push_str(EOL);
    }

    fn status(&mut self) {
        self.open("STATUS");
        self.field("CODE", "0");
        self.field("SEVERITY", "INFO");
        self.close("STATUS");
    }

    fn balance(&mut self, tag: &str, amount: Money, as_of: &str) {
        self.open(tag);
        self.field("BALAMT", &amount.to_string());
        self.field("DTASOF", as_of);
        self.close(tag);
    }
}
