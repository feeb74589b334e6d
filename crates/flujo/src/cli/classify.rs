use super::{Context, RuleSourceArgs};
use crate::util::{create_progress_bar, format_amount, format_date};
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use console::style;
use flujo_lib::{
    classify_transaction, read_ledger, summarize, ClassifiedTransaction, FlujoError, LedgerSummary, Result,
};
use std::path::{Path, PathBuf};

pub fn handle_classify_command(
    ctx: &Context,
    ledger: PathBuf,
    source: RuleSourceArgs,
    summary_only: bool,
    unclassified_only: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let rule_set = ctx.rule_set(&source)?;
    let transactions = read_ledger(&ledger)?;

    if transactions.is_empty() {
        println!("{}", style("No transactions found").yellow());
        return Ok(());
    }

    println!(
        "{} Classifying {} transactions from {}",
        style(">>>").cyan(),
        style(transactions.len()).bold(),
        ledger.display()
    );

    let pb = if ctx.verbose {
        None
    } else {
        Some(create_progress_bar(transactions.len() as u64, "Classifying transactions"))
    };

    let mut classified = Vec::with_capacity(transactions.len());
    for tx in &transactions {
        if let Some(pb) = &pb {
            pb.inc(1);
        }

        let item = classify_transaction(tx, &rule_set);
        if ctx.verbose {
            let marker = if item.classified { style("✓").green() } else { style("·").dim() };
            println!("  {}: {} -> {}", marker, item.text, item.label);
        }
        classified.push(item);
    }

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let summary = summarize(&classified);

    if !summary_only {
        let rows: Vec<&ClassifiedTransaction> = if unclassified_only {
            summary.unclassified.iter().map(|&i| &classified[i]).collect()
        } else {
            classified.iter().collect()
        };
        print_transactions(&rows);
    }

    print_summary(&summary);

    if let Some(path) = output {
        write_csv(&path, &classified)?;
        println!("{} Wrote {} rows to {}", style("✓").green(), classified.len(), path.display());
    }

    Ok(())
}

fn print_transactions(rows: &[&ClassifiedTransaction]) {
    if rows.is_empty() {
        println!("{}\n", style("No transactions to show").green());
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Fecha").fg(Color::Cyan),
        Cell::new("Descripción").fg(Color::Cyan),
        Cell::new("Monto").fg(Color::Cyan),
        Cell::new("Clasificación").fg(Color::Cyan),
    ]);

    for item in rows {
        let tx = item.transaction;
        let label = if item.classified {
            Cell::new(item.label)
        } else {
            Cell::new(item.label).fg(Color::Yellow)
        };

        table.add_row(vec![
            Cell::new(format_date(tx.date)),
            Cell::new(&tx.description),
            Cell::new(format_amount(tx.signed_amount())),
            label,
        ]);
    }

    println!("{}\n", table);
}

fn print_summary(summary: &LedgerSummary) {
    println!("{}", style("Summary").bold());
    println!("{}", style("─".repeat(60)).dim());

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Clasificación").fg(Color::Cyan),
        Cell::new("Movimientos").fg(Color::Cyan),
        Cell::new("Abonos").fg(Color::Cyan),
        Cell::new("Cargos").fg(Color::Cyan),
        Cell::new("Neto").fg(Color::Cyan),
    ]);

    for totals in &summary.totals {
        table.add_row(vec![
            Cell::new(&totals.label),
            Cell::new(totals.count),
            Cell::new(format_amount(totals.credit)),
            Cell::new(format_amount(totals.debit)),
            Cell::new(format_amount(totals.net())),
        ]);
    }

    println!("{}\n", table);
    println!("  Total credits: {}", style(format_amount(summary.total_credit)).green());
    println!("  Total debits: {}", style(format_amount(summary.total_debit)).red());
    if summary.unclassified.is_empty() {
        println!("  {}", style("Every transaction was classified").green());
    } else {
        println!("  Unclassified: {}", style(summary.unclassified.len()).yellow());
    }
}

fn write_csv(path: &Path, classified: &[ClassifiedTransaction]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;

    writer
        .write_record(["fecha", "descripcion", "abono", "cargo", "clasificacion"])
        .map_err(|e| csv_error(path, e))?;

    for item in classified {
        let tx = item.transaction;
        writer
            .write_record([
                tx.date.map(|d| d.to_string()).unwrap_or_default(),
                tx.description.clone(),
                tx.credit.to_string(),
                tx.debit.to_string(),
                item.label.to_string(),
            ])
            .map_err(|e| csv_error(path, e))?;
    }

    writer.flush()?;
    Ok(())
}

fn csv_error(path: &Path, err: csv::Error) -> FlujoError {
    FlujoError::Config(format!("Failed to write {}: {}", path.display(), err))
}
