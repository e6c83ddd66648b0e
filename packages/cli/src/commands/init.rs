use anyhow::Result;
use clap::Args;
use clonup_workspace::{Config, DEFAULT_CONFIG_NAME, TOKEN_ENV};
use colored::Colorize;
use std::fs;
use std::path::Path;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Hosting API base URL
    #[arg(long)]
    pub api_base_url: Option<String>,

    /// Managed root domain (repeatable; the first is canonical)
    #[arg(long = "managed-domain")]
    pub managed_domains: Vec<String>,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &Path) -> Result<()> {
    let config_path = cwd.join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    let mut config = Config::default();
    if let Some(base) = args.api_base_url {
        config.api_base_url = base;
    }
    if !args.managed_domains.is_empty() {
        config.managed_domains = args.managed_domains;
    }

    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;
    // validate what was written
    Config::from_path(&config_path)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("Next steps:");
    println!("  1. export {TOKEN_ENV}=<your API token>");
    println!("  2. Run: clonup fetch <subdomain> -o page.html");
    println!("  3. Run: clonup resave page.html --subdomain <subdomain> --edits edits.json --upload");

    Ok(())
}
