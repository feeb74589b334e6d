//! Rule set loading.
//!
//! Rules come either from a structured document (JSON or TOML) or from a
//! tabular source (CSV or a spreadsheet workbook). Both paths go through the
//! same [`RuleCollector`], so validation, priority assignment and diagnostics
//! are identical regardless of the source shape.
//!
//! Loading fails only when the source cannot be read at all
//! ([`FlujoError::SourceUnreadable`]). A readable source that yields no rule
//! produces an empty [`RuleSet`] and a [`LoadStatus::NoUsableRules`] report.

pub mod document;
pub mod sources;
pub mod tabular;

use crate::classify::{MatchMode, Rule, RuleSet, Side, DEFAULT_LABEL};
use crate::error::{FlujoError, Result};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub use document::RuleDocument;
pub use tabular::{split_terms, ColumnMap, ColumnRole, Sheet, Table};

/// Where rows go when a tabular source says nothing about their side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UntypedRows {
    /// Treat every untyped row as a debit rule.
    #[default]
    Debit,
    /// Treat every untyped row as a credit rule.
    Credit,
    /// Drop untyped rows.
    Skip,
}

impl FromStr for UntypedRows {
    type Err = FlujoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "debit" | "cargo" => Ok(UntypedRows::Debit),
            "credit" | "abono" => Ok(UntypedRows::Credit),
            "skip" => Ok(UntypedRows::Skip),
            other => Err(FlujoError::Config(format!(
                "Invalid untyped row policy '{}'. Use 'debit', 'credit' or 'skip'",
                other
            ))),
        }
    }
}

/// Loader policy.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub untyped_rows: UntypedRows,
    /// Overrides any default label found in the source.
    pub default_label: Option<String>,
}

/// Supported rule source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Toml,
    Csv,
    Workbook,
}

impl SourceFormat {
    /// Guess the format from a file extension. Unknown extensions are read
    /// as JSON documents.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "toml" => SourceFormat::Toml,
            "csv" | "tsv" | "txt" => SourceFormat::Csv,
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => SourceFormat::Workbook,
            _ => SourceFormat::Json,
        }
    }
}

/// An in-memory rule source.
#[derive(Debug, Clone)]
pub enum RuleSource<'a> {
    Json(&'a str),
    Toml(&'a str),
    Table(Table),
}

/// Why an entry was left out of the rule set.
#[derive(Debug, Clone, PartialEq)]
pub enum DropReason {
    MissingName,
    NoKeywords,
    UnknownSide(String),
    Untyped,
    Malformed(String),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::MissingName => write!(f, "missing rule name"),
            DropReason::NoKeywords => write!(f, "no usable keyword"),
            DropReason::UnknownSide(value) => write!(f, "unrecognized side '{}'", value),
            DropReason::Untyped => write!(f, "no side given and untyped rows are skipped"),
            DropReason::Malformed(detail) => write!(f, "malformed entry: {}", detail),
        }
    }
}

/// Non-fatal diagnostics collected while loading.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadWarning {
    /// A required column could not be located; the sheet contributed nothing.
    MissingColumn { sheet: String, column: ColumnRole },
    /// A single entry was dropped.
    DroppedEntry {
        section: String,
        position: usize,
        reason: DropReason,
    },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::MissingColumn { sheet, column } => {
                write!(f, "sheet '{}': could not locate the {} column", sheet, column)
            }
            LoadWarning::DroppedEntry { section, position, reason } => {
                write!(f, "{} #{}: {}", section, position, reason)
            }
        }
    }
}

/// Whether a readable source produced any rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Loaded { credit: usize, debit: usize },
    NoUsableRules,
}

/// Result of a successful load.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub origin: String,
    pub rule_set: RuleSet,
    pub warnings: Vec<LoadWarning>,
}

impl LoadReport {
    pub fn status(&self) -> LoadStatus {
        if self.rule_set.is_empty() {
            LoadStatus::NoUsableRules
        } else {
            LoadStatus::Loaded {
                credit: self.rule_set.credit_rules().len(),
                debit: self.rule_set.debit_rules().len(),
            }
        }
    }

    /// Number of entries dropped during the load.
    pub fn dropped(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, LoadWarning::DroppedEntry { .. }))
            .count()
    }

    /// Unwrap the rule set, turning an empty result into an error.
    pub fn require_rules(self) -> Result<RuleSet> {
        match self.status() {
            LoadStatus::NoUsableRules => Err(FlujoError::NoUsableRules { origin: self.origin }),
            LoadStatus::Loaded { .. } => Ok(self.rule_set),
        }
    }
}

/// Candidate rule as read from a source, before validation.
#[derive(Debug, Clone, Default)]
pub(crate) struct RuleEntry {
    pub name: Option<String>,
    pub keywords: Vec<String>,
    pub match_mode: Option<String>,
    pub exclusions: Vec<String>,
    pub priority: Option<i64>,
}

/// Accumulates validated rules per side and the diagnostics for the rest.
#[derive(Debug, Default)]
pub(crate) struct RuleCollector {
    credit: Vec<Rule>,
    debit: Vec<Rule>,
    warnings: Vec<LoadWarning>,
}

impl RuleCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate an entry and append it to its side. Without an explicit
    /// priority the entry gets its position among the rules kept so far.
    pub fn push(&mut self, side: Side, section: &str, position: usize, entry: RuleEntry) {
        let name = entry.name.as_deref().map(str::trim).unwrap_or("");
        if name.is_empty() {
            self.drop_entry(section, position, DropReason::MissingName);
            return;
        }

        let rules = match side {
            Side::Credit => &mut self.credit,
            Side::Debit => &mut self.debit,
        };
        let priority = entry.priority.unwrap_or(rules.len() as i64);
        let match_mode = entry
            .match_mode
            .as_deref()
            .map(MatchMode::parse_lenient)
            .unwrap_or_default();

        match Rule::new(name, &entry.keywords, match_mode, &entry.exclusions, priority) {
            Some(rule) => rules.push(rule),
            None => self.drop_entry(section, position, DropReason::NoKeywords),
        }
    }

    pub fn drop_entry(&mut self, section: &str, position: usize, reason: DropReason) {
        log::debug!("Dropping {} #{}: {}", section, position, reason);
        self.warnings.push(LoadWarning::DroppedEntry {
            section: section.to_string(),
            position,
            reason,
        });
    }

    pub fn warn(&mut self, warning: LoadWarning) {
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn finish(self, origin: &str, default_label: Option<&str>) -> LoadReport {
        let rule_set = RuleSet::new(
            self.credit,
            self.debit,
            default_label.unwrap_or(DEFAULT_LABEL),
        );

        log::info!(
            "Loaded {} credit and {} debit rules from {} ({} dropped)",
            rule_set.credit_rules().len(),
            rule_set.debit_rules().len(),
            origin,
            self.warnings
                .iter()
                .filter(|w| matches!(w, LoadWarning::DroppedEntry { .. }))
                .count()
        );

        LoadReport {
            origin: origin.to_string(),
            rule_set,
            warnings: self.warnings,
        }
    }
}

/// Build a rule set from an in-memory source.
pub fn load(source: RuleSource<'_>, origin: &str, options: &LoadOptions) -> Result<LoadReport> {
    let report = match source {
        RuleSource::Json(text) => document::load_json(text, origin, options)?,
        RuleSource::Toml(text) => document::load_toml(text, origin, options)?,
        RuleSource::Table(table) => tabular::load_table(&table, origin, options),
    };

    if report.status() == LoadStatus::NoUsableRules {
        log::warn!("No usable rules found in {}", origin);
    }

    Ok(report)
}

/// Build a rule set from a file, picking the reader from its extension.
pub fn load_path<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<LoadReport> {
    let path = path.as_ref();
    let origin = path.display().to_string();

    match SourceFormat::from_path(path) {
        SourceFormat::Json => {
            let text = read_text(path)?;
            load(RuleSource::Json(&text), &origin, options)
        }
        SourceFormat::Toml => {
            let text = read_text(path)?;
            load(RuleSource::Toml(&text), &origin, options)
        }
        SourceFormat::Csv => load(RuleSource::Table(sources::read_csv(path)?), &origin, options),
        SourceFormat::Workbook => {
            load(RuleSource::Table(sources::read_workbook(path)?), &origin, options)
        }
    }
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| FlujoError::unreadable(path.display().to_string(), e))
}
