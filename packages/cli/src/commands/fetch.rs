use anyhow::Result;
use clap::Args;
use clonup_workspace::{CloneStats, Config, HostingApi, HttpHostingClient};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Clone subdomain
    pub subdomain: String,

    /// Write the HTML to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn fetch(args: FetchArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let api = HttpHostingClient::new(&config)?;

    let html = api.fetch_clone(&args.subdomain).await?;

    let Some(output) = args.output else {
        print!("{html}");
        return Ok(());
    };
    fs::write(&output, &html)?;

    let stats = CloneStats::load(&api, &args.subdomain).await;
    println!(
        "  {} {} → {} ({} bytes)",
        "✓".green(),
        args.subdomain.bright_white(),
        output.display(),
        html.len()
    );
    println!("  Cloned {} times", stats.clone_count);
    Ok(())
}
