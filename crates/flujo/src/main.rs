mod cli;
mod util;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let default_filter = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let ctx = cli::Context::from_cli(&cli)?;

    match cli.command {
        cli::Commands::Classify { ledger, source, summary, unclassified, output } => {
            cli::classify::handle_classify_command(&ctx, ledger, source, summary, unclassified, output)?
        }

        cli::Commands::Rules { action } => cli::rules::handle_rules_command(&ctx, action)?,

        cli::Commands::Configs { dir, client } => {
            cli::configs::handle_configs_command(&ctx, dir, client)?
        }
    }

    Ok(())
}
