use super::{init_store, Context, RuleSourceArgs};
use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use console::style;
use flujo_lib::{load_path, FlujoError, Result, Rule, Side, StoredRule};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum RulesSubcommand {
    #[command(about = "Show a rule set in evaluation order")]
    Show {
        #[command(flatten)]
        source: RuleSourceArgs,
    },

    #[command(about = "Replace an owner's stored rules with those of a file")]
    Import {
        #[arg(help = "Rule file (json, toml, csv, xlsx)")]
        file: PathBuf,

        #[arg(long, help = "Owner the rules belong to")]
        owner: i64,
    },

    #[command(about = "Export an owner's stored rules as a rule document")]
    Export {
        #[arg(long, help = "Owner whose rules to export")]
        owner: i64,

        #[arg(long, default_value = "toml", help = "Document format (toml, json)")]
        format: String,

        #[arg(long, short = 'o', help = "Output file path")]
        output: Option<PathBuf>,
    },

    #[command(about = "Deactivate a stored rule")]
    Remove {
        #[arg(help = "Rule ID")]
        id: i64,

        #[arg(long, help = "Owner the rule belongs to")]
        owner: i64,
    },
}

pub fn handle_rules_command(ctx: &Context, subcommand: RulesSubcommand) -> Result<()> {
    match subcommand {
        RulesSubcommand::Show { source } => show_rules(ctx, &source),
        RulesSubcommand::Import { file, owner } => import_rules(ctx, file, owner),
        RulesSubcommand::Export { owner, format, output } => export_rules(ctx, owner, &format, output),
        RulesSubcommand::Remove { id, owner } => remove_rule(ctx, id, owner),
    }
}

fn show_rules(ctx: &Context, source: &RuleSourceArgs) -> Result<()> {
    if let Some(owner) = source.owner {
        let store = init_store(ctx.db.clone())?;
        let stored = store.list_rules(owner, None)?;
        if stored.is_empty() {
            println!("{}", style(format!("Owner {} has no active rules", owner)).yellow());
            return Ok(());
        }
        println!("{}", stored_rules_table(&stored));
        return Ok(());
    }

    let rule_set = ctx.rule_set(source)?;
    for side in [Side::Credit, Side::Debit] {
        let rules = rule_set.rules(side);
        println!("{} ({})", style(side_title(side)).bold(), rules.len());
        if rules.is_empty() {
            println!("  {}\n", style("no rules").dim());
        } else {
            println!("{}\n", rules_table(rules));
        }
    }
    println!("Default label: {}", style(rule_set.default_label()).cyan());

    Ok(())
}

fn import_rules(ctx: &Context, file: PathBuf, owner: i64) -> Result<()> {
    let report = load_path(&file, &ctx.options)?;
    for warning in &report.warnings {
        println!("  {} {}", style("·").dim(), style(warning).yellow());
    }

    let rule_set = report.require_rules()?;
    let mut store = init_store(ctx.db.clone())?;
    let stored = store.replace_rule_set(owner, &rule_set)?;

    println!(
        "{} Imported {} rules for owner {} from {}",
        style("✓").green(),
        style(stored).bold(),
        owner,
        file.display()
    );
    Ok(())
}

fn export_rules(ctx: &Context, owner: i64, format: &str, output: Option<PathBuf>) -> Result<()> {
    let store = init_store(ctx.db.clone())?;
    let rule_set = store.load_rule_set(owner, ctx.default_label())?;

    let document = match format.to_lowercase().as_str() {
        "toml" => rule_set.to_toml()?,
        "json" => rule_set.to_json()?,
        _ => {
            return Err(FlujoError::Config(format!(
                "Unsupported export format '{}'. Use 'toml' or 'json'",
                format
            )))
        }
    };

    match output {
        Some(path) => {
            std::fs::write(&path, document)?;
            println!(
                "{} Exported {} rules to {}",
                style("✓").green(),
                rule_set.len(),
                path.display()
            );
        }
        None => println!("{}", document),
    }
    Ok(())
}

fn remove_rule(ctx: &Context, id: i64, owner: i64) -> Result<()> {
    let mut store = init_store(ctx.db.clone())?;
    if !store.deactivate_rule(id, owner)? {
        return Err(FlujoError::RuleNotFound(id));
    }

    println!("{} Rule {} deactivated", style("✓").green(), id);
    Ok(())
}

fn side_title(side: Side) -> &'static str {
    match side {
        Side::Credit => "Abonos",
        Side::Debit => "Cargos",
    }
}

fn header(titles: &[&str]) -> Vec<Cell> {
    titles.iter().map(|t| Cell::new(t).fg(Color::Cyan)).collect()
}

fn rule_cells(rule: &Rule) -> Vec<Cell> {
    vec![
        Cell::new(rule.priority),
        Cell::new(&rule.name),
        Cell::new(rule.keywords.join(", ")),
        Cell::new(rule.match_mode.as_str()),
        Cell::new(rule.exclusions.join(", ")),
    ]
}

fn rules_table(rules: &[Rule]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(header(&["Prioridad", "Nombre", "Palabras clave", "Modo", "Excluir"]));

    for rule in rules {
        table.add_row(rule_cells(rule));
    }
    table
}

fn stored_rules_table(stored: &[StoredRule]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(header(&[
        "ID", "Tipo", "Prioridad", "Nombre", "Palabras clave", "Modo", "Excluir",
    ]));

    for entry in stored {
        let mut row = vec![Cell::new(entry.id), Cell::new(side_title(entry.side))];
        row.extend(rule_cells(&entry.rule));
        table.add_row(row);
    }
    table
}
