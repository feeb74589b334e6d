//! Bank statement ingestion and per-label aggregation.
//!
//! Statements are read through the same table readers as rule sources. Bank
//! exports usually carry a preamble (account holder, period, balances) before
//! the real header row, so the header is searched for among the first rows.

use crate::classify::RuleSet;
use crate::error::{FlujoError, Result};
use crate::loader::sources::{read_csv, read_workbook};
use crate::loader::{SourceFormat, Sheet, Table};
use crate::normalize::normalize;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

const HEADER_SCAN_ROWS: usize = 20;

/// Day-first formats first; two-digit years before four-digit ones so that
/// `05/01/24` is not read as year 24.
const DATE_FORMATS: &[&str] = &[
    "%d/%m/%y", "%d-%m-%y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d", "%Y/%m/%d",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub date: Option<NaiveDate>,
    pub description: String,
    pub credit: f64,
    pub debit: f64,
}

impl Transaction {
    /// Credit when one was recorded, otherwise the debit as a negative amount.
    pub fn signed_amount(&self) -> f64 {
        if self.credit > 0.0 {
            self.credit
        } else {
            -self.debit.abs()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LedgerColumn {
    Date,
    Credit,
    Debit,
    Amount,
    Description,
}

impl LedgerColumn {
    const ALL: [LedgerColumn; 5] = [
        LedgerColumn::Date,
        LedgerColumn::Credit,
        LedgerColumn::Debit,
        LedgerColumn::Amount,
        LedgerColumn::Description,
    ];

    fn synonyms(self) -> &'static [&'static str] {
        match self {
            LedgerColumn::Date => &["FECHA", "DATE"],
            LedgerColumn::Credit => &["ABONO", "CREDITO", "CREDIT", "DEPOSITO"],
            LedgerColumn::Debit => &["CARGO", "DEBITO", "DEBIT", "GIRO"],
            LedgerColumn::Amount => &["MONTO", "AMOUNT", "IMPORTE"],
            LedgerColumn::Description => &["DESCRIP", "DETALLE", "DETAIL", "GLOSA", "COMENTARIO", "CONCEPTO"],
        }
    }
}

#[derive(Debug, Default)]
struct LedgerColumns {
    date: Option<usize>,
    credit: Option<usize>,
    debit: Option<usize>,
    amount: Option<usize>,
    description: Option<usize>,
}

impl LedgerColumns {
    fn resolve(headers: &[String]) -> Self {
        let mut columns = Self::default();
        for (idx, header) in headers.iter().enumerate() {
            let header = normalize(header);
            if header.is_empty() {
                continue;
            }
            let role = LedgerColumn::ALL.into_iter().find(|role| {
                columns.slot(*role).is_none()
                    && role.synonyms().iter().any(|s| header.contains(s))
            });
            if let Some(role) = role {
                *columns.slot_mut(role) = Some(idx);
            }
        }
        columns
    }

    fn slot(&self, role: LedgerColumn) -> Option<usize> {
        match role {
            LedgerColumn::Date => self.date,
            LedgerColumn::Credit => self.credit,
            LedgerColumn::Debit => self.debit,
            LedgerColumn::Amount => self.amount,
            LedgerColumn::Description => self.description,
        }
    }

    fn slot_mut(&mut self, role: LedgerColumn) -> &mut Option<usize> {
        match role {
            LedgerColumn::Date => &mut self.date,
            LedgerColumn::Credit => &mut self.credit,
            LedgerColumn::Debit => &mut self.debit,
            LedgerColumn::Amount => &mut self.amount,
            LedgerColumn::Description => &mut self.description,
        }
    }

    fn is_usable(&self) -> bool {
        self.description.is_some() && (self.credit.is_some() || self.amount.is_some())
    }
}

/// Read a bank statement, picking the reader by extension.
pub fn read_ledger<P: AsRef<Path>>(path: P) -> Result<Vec<Transaction>> {
    let path = path.as_ref();
    let table = match SourceFormat::from_path(path) {
        SourceFormat::Workbook => read_workbook(path)?,
        _ => read_csv(path)?,
    };
    ledger_from_table(&table, &path.display().to_string())
}

pub fn read_ledger_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Transaction>> {
    let path = path.as_ref();
    ledger_from_table(&read_csv(path)?, &path.display().to_string())
}

/// Extract transactions from the first sheet that has a recognizable header.
pub fn ledger_from_table(table: &Table, origin: &str) -> Result<Vec<Transaction>> {
    let mut last_missing = "description";
    for sheet in &table.sheets {
        match ledger_from_sheet(sheet) {
            Ok(transactions) => {
                log::info!(
                    "Read {} transactions from {} (sheet '{}')",
                    transactions.len(),
                    origin,
                    sheet.name
                );
                return Ok(transactions);
            }
            Err(missing) => last_missing = missing,
        }
    }

    Err(FlujoError::LedgerColumns {
        origin: origin.to_string(),
        missing: last_missing.to_string(),
    })
}

fn ledger_from_sheet(sheet: &Sheet) -> std::result::Result<Vec<Transaction>, &'static str> {
    let candidates = std::iter::once(&sheet.headers).chain(sheet.rows.iter().take(HEADER_SCAN_ROWS));

    let mut missing = "description";
    for (offset, headers) in candidates.enumerate() {
        let columns = LedgerColumns::resolve(headers);
        if columns.is_usable() {
            log::debug!("Ledger header found at row {} of sheet '{}'", offset, sheet.name);
            return Ok(sheet.rows[offset..]
                .iter()
                .filter_map(|row| parse_row(row, &columns))
                .collect());
        }
        if offset == 0 && columns.description.is_some() {
            missing = "amount";
        }
    }
    Err(missing)
}

fn parse_row(row: &[String], columns: &LedgerColumns) -> Option<Transaction> {
    let cell = |idx: Option<usize>| {
        idx.and_then(|i| row.get(i))
            .map(|s| s.trim())
            .unwrap_or("")
    };

    let description = cell(columns.description).to_string();
    let mut credit = parse_amount(cell(columns.credit)).unwrap_or(0.0).abs();
    let mut debit = parse_amount(cell(columns.debit)).unwrap_or(0.0).abs();

    if let Some(amount) = parse_amount(cell(columns.amount)) {
        if amount > 0.0 {
            credit = amount;
        } else {
            debit = -amount;
        }
    }

    if description.is_empty() && credit == 0.0 && debit == 0.0 {
        return None;
    }

    let raw_date = cell(columns.date);
    let date = parse_date(raw_date);
    if date.is_none() && !raw_date.is_empty() {
        log::debug!("Unrecognized date '{}'", raw_date);
    }

    Some(Transaction {
        date,
        description,
        credit,
        debit,
    })
}

/// Parse a money amount written either way round: `1.234.567`, `1.234,50`,
/// `1,234.50`, `$ -1.500` or `(1.500)`. A lone separator followed by exactly
/// three digits is read as a thousands separator.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let (negative, body) = if let Some(inner) = trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        (true, inner)
    } else if let Some(rest) = trimmed.strip_prefix('-') {
        (true, rest)
    } else {
        (false, trimmed)
    };
    let negative = negative || body.trim_start_matches(&['$', ' '][..]).starts_with('-');

    let digits: String = body
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if !digits.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let canonical = match (digits.rfind('.'), digits.rfind(',')) {
        (Some(dot), Some(comma)) if dot > comma => digits.replace(',', ""),
        (Some(_), Some(_)) => digits.replace('.', "").replace(',', "."),
        (Some(_), None) => thousands_or_decimal(&digits, '.'),
        (None, Some(_)) => thousands_or_decimal(&digits, ','),
        (None, None) => digits,
    };

    let value: f64 = canonical.parse().ok()?;
    Some(if negative { -value } else { value })
}

fn thousands_or_decimal(digits: &str, separator: char) -> String {
    let groups: Vec<&str> = digits.split(separator).collect();
    let grouped = groups.len() > 2 || groups.last().is_some_and(|g| g.len() == 3);
    if grouped {
        groups.concat()
    } else {
        digits.replace(separator, ".")
    }
}

/// Parse a day-first date, ignoring any trailing time component.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let token = raw.split_whitespace().next()?;
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(token, format).ok())
}

/// A transaction with its normalized description and assigned label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedTransaction<'a> {
    pub transaction: &'a Transaction,
    pub text: String,
    pub label: &'a str,
    pub classified: bool,
}

pub fn classify_transaction<'a>(transaction: &'a Transaction, rule_set: &'a RuleSet) -> ClassifiedTransaction<'a> {
    let text = normalize(&transaction.description);
    let outcome = rule_set.evaluate(&text, transaction.signed_amount());
    ClassifiedTransaction {
        transaction,
        label: outcome.label,
        classified: outcome.is_classified(),
        text,
    }
}

pub fn classify_ledger<'a>(transactions: &'a [Transaction], rule_set: &'a RuleSet) -> Vec<ClassifiedTransaction<'a>> {
    transactions
        .iter()
        .map(|tx| classify_transaction(tx, rule_set))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabelTotals {
    pub label: String,
    pub count: usize,
    pub credit: f64,
    pub debit: f64,
}

impl LabelTotals {
    pub fn net(&self) -> f64 {
        self.credit - self.debit
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerSummary {
    /// Per-label totals, sorted by label.
    pub totals: Vec<LabelTotals>,
    /// Positions of transactions that fell through to the default label.
    pub unclassified: Vec<usize>,
    pub total_credit: f64,
    pub total_debit: f64,
}

pub fn summarize(classified: &[ClassifiedTransaction<'_>]) -> LedgerSummary {
    let mut by_label: BTreeMap<&str, LabelTotals> = BTreeMap::new();
    let mut summary = LedgerSummary::default();

    for (position, item) in classified.iter().enumerate() {
        let tx = item.transaction;
        let totals = by_label.entry(item.label).or_insert_with(|| LabelTotals {
            label: item.label.to_string(),
            ..Default::default()
        });
        totals.count += 1;
        totals.credit += tx.credit;
        totals.debit += tx.debit;

        summary.total_credit += tx.credit;
        summary.total_debit += tx.debit;
        if !item.classified {
            summary.unclassified.push(position);
        }
    }

    summary.totals = by_label.into_values().collect();
    summary
}
