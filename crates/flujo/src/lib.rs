pub mod classify;
pub mod config;
pub mod db;
pub mod discovery;
pub mod error;
pub mod ledger;
pub mod loader;
pub mod normalize;

pub use config::Config;
pub use db::{RuleStore, StoredRule};
pub use error::{FlujoError, Result};
pub use classify::{classify, MatchMode, Rule, RuleMatch, RuleSet, Side, DEFAULT_LABEL};
pub use discovery::{client_name_from_file, client_rule_map, discover_rule_files, find_rules_for_client};
pub use ledger::{
    classify_ledger, classify_transaction, read_ledger, read_ledger_csv, summarize,
    ClassifiedTransaction, LabelTotals, LedgerSummary, Transaction,
};
pub use loader::{
    load, load_path, DropReason, LoadOptions, LoadReport, LoadStatus, LoadWarning, RuleDocument,
    RuleSource, SourceFormat, UntypedRows,
};
pub use normalize::{normalize, normalize_opt};
