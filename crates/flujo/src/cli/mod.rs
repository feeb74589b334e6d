pub mod classify;
pub mod configs;
pub mod rules;

use clap::{Parser, Subcommand};
use console::style;
use flujo_lib::{load_path, Config, LoadOptions, LoadStatus, Result, RuleSet, RuleStore, DEFAULT_LABEL};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "flujo")]
#[command(about = "Keyword-rule classification of bank transactions", long_about = None)]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to the rule store database")]
    pub db: Option<PathBuf>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        default_value = "debit",
        help = "Side for tabular rows without a side column (debit, credit, skip)"
    )]
    pub untyped_rows: String,

    #[arg(long, global = true, help = "Label for transactions no rule matches")]
    pub default_label: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Classify the transactions of a bank statement")]
    Classify {
        #[arg(help = "Bank statement (csv or workbook)")]
        ledger: PathBuf,

        #[command(flatten)]
        source: RuleSourceArgs,

        #[arg(long, help = "Only print the per-label summary")]
        summary: bool,

        #[arg(long, help = "Only list transactions no rule matched")]
        unclassified: bool,

        #[arg(long, short = 'o', help = "Write classified transactions to a CSV file")]
        output: Option<PathBuf>,
    },

    #[command(about = "Manage classification rules")]
    Rules {
        #[command(subcommand)]
        action: rules::RulesSubcommand,
    },

    #[command(about = "List rule files and match them to clients")]
    Configs {
        #[arg(help = "Directory holding per-client rule files")]
        dir: Option<PathBuf>,

        #[arg(long, help = "Client name or bank statement file name")]
        client: Option<String>,
    },
}

/// Where to take the rule set from.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RuleSourceArgs {
    #[arg(long, help = "Rule file (json, toml, csv, xlsx)", conflicts_with = "owner")]
    pub rules: Option<PathBuf>,

    #[arg(long, help = "Use the rules stored for this owner")]
    pub owner: Option<i64>,
}

/// Global flags every command needs.
pub struct Context {
    pub db: Option<PathBuf>,
    pub verbose: bool,
    pub options: LoadOptions,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        Ok(Self {
            db: cli.db.clone(),
            verbose: cli.verbose,
            options: LoadOptions {
                untyped_rows: cli.untyped_rows.parse()?,
                default_label: cli.default_label.clone(),
            },
        })
    }

    pub fn default_label(&self) -> &str {
        self.options.default_label.as_deref().unwrap_or(DEFAULT_LABEL)
    }

    /// Resolve the rule set for a command: an owner's stored rules, an
    /// explicit file, then the configured default file. With none of these
    /// every transaction gets the default label.
    pub fn rule_set(&self, source: &RuleSourceArgs) -> Result<RuleSet> {
        if let Some(owner) = source.owner {
            let store = init_store(self.db.clone())?;
            let rule_set = store.load_rule_set(owner, self.default_label())?;
            if rule_set.is_empty() {
                println!("{} Owner {} has no active rules", style("!").yellow(), owner);
            }
            return Ok(rule_set);
        }

        let config = Config::new(self.db.clone(), source.rules.clone())?;
        match config.rules_path {
            Some(path) => self.load_file(&path),
            None => {
                println!(
                    "{} No rule file configured, every transaction gets '{}'",
                    style("!").yellow(),
                    self.default_label()
                );
                Ok(RuleSet::new(Vec::new(), Vec::new(), self.default_label()))
            }
        }
    }

    pub fn load_file(&self, path: &Path) -> Result<RuleSet> {
        if self.verbose {
            println!("{} Loading rules from {}...", style(">>>").cyan(), path.display());
        }

        let report = load_path(path, &self.options)?;
        for warning in &report.warnings {
            println!("  {} {}", style("·").dim(), style(warning).yellow());
        }

        match report.status() {
            LoadStatus::Loaded { credit, debit } => {
                if self.verbose {
                    println!(
                        "{} Loaded {} credit and {} debit rules",
                        style("✓").green(),
                        style(credit).bold(),
                        style(debit).bold()
                    );
                }
            }
            LoadStatus::NoUsableRules => {
                println!(
                    "{} {} contains no usable rules",
                    style("!").yellow(),
                    path.display()
                );
            }
        }

        Ok(report.rule_set)
    }
}

pub fn init_store(db_path: Option<PathBuf>) -> Result<RuleStore> {
    let config = Config::new(db_path, None)?;
    config.ensure_db_directory()?;

    let mut store = RuleStore::open(&config.db_path)?;
    store.initialize()?;

    Ok(store)
}
