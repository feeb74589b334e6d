use super::Context;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use console::style;
use flujo_lib::{client_name_from_file, client_rule_map, discover_rule_files, find_rules_for_client, Result};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIGS_DIR: &str = "configs";

pub fn handle_configs_command(ctx: &Context, dir: Option<PathBuf>, client: Option<String>) -> Result<()> {
    let configs_dir = dir.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIGS_DIR));
    let files = discover_rule_files(Some(&configs_dir), Some(Path::new(".")))?;

    if files.is_empty() {
        println!(
            "{}",
            style(format!("No rule files found in {} or the current directory", configs_dir.display())).yellow()
        );
        return Ok(());
    }

    if let Some(client) = client {
        return show_client_match(ctx, &client, &files);
    }

    let clients = client_rule_map(&files);
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Cliente").fg(Color::Cyan),
        Cell::new("Archivo").fg(Color::Cyan),
    ]);

    for file in &files {
        let client = clients
            .iter()
            .find(|(_, path)| *path == file)
            .map(|(name, _)| name.as_str())
            .unwrap_or("(general)");
        table.add_row(vec![Cell::new(client), Cell::new(file.display())]);
    }

    println!("{}", table);
    Ok(())
}

fn show_client_match(ctx: &Context, client: &str, files: &[PathBuf]) -> Result<()> {
    // A statement file name is reduced to the client it names.
    let name = if Path::new(client).extension().is_some() {
        match client_name_from_file(client) {
            Some(name) => name,
            None => {
                println!(
                    "{} Could not tell the client from '{}'",
                    style("!").yellow(),
                    client
                );
                return Ok(());
            }
        }
    } else {
        client.to_string()
    };

    if ctx.verbose {
        println!("{} Looking up rules for client '{}'", style(">>>").cyan(), name);
    }

    match find_rules_for_client(&name, files) {
        Some(path) => println!("{} {} -> {}", style("✓").green(), name, path.display()),
        None => println!("{} No rule file for client '{}'", style("!").yellow(), name),
    }
    Ok(())
}
