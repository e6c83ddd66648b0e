use anyhow::{anyhow, Context, Result};
use clap::Args;
use clonup_workspace::{Config, EditScript, EditSession, HttpHostingClient, WorkspaceError};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

const SAVE_ATTEMPTS: u32 = 3;

#[derive(Debug, Args)]
pub struct ResaveArgs {
    /// Captured HTML file
    pub input: PathBuf,

    /// Clone subdomain the page is served under
    #[arg(short, long)]
    pub subdomain: String,

    /// JSON edit script to replay before saving
    #[arg(short, long)]
    pub edits: Option<PathBuf>,

    /// Write the clean HTML to a file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Persist through the hosting API
    #[arg(long)]
    pub upload: bool,
}

pub async fn resave(args: ResaveArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let html = fs::read_to_string(&args.input)
        .with_context(|| format!("Cannot read {}", args.input.display()))?;
    let mut session = EditSession::open(&html, &args.subdomain, config.domains_for(&args.subdomain))?;

    if let Some(path) = &args.edits {
        let script = EditScript::load(path)
            .with_context(|| format!("Cannot load edit script {}", path.display()))?;
        let applied = script.apply(&mut session)?;
        println!("  {} Applied {} edit steps", "✓".green(), applied);
    }

    let snapshot = session.render()?;
    let stats = &snapshot.stats;
    println!(
        "  {} Cleaned {} markers, rewrote {} URLs, synced {} attributes",
        "✓".green(),
        stats.stripped,
        stats.urls_rewritten,
        stats.identity_synced + stats.positional_synced
    );

    if let Some(output) = &args.output {
        fs::write(output, &snapshot.html)?;
        println!("  {} Wrote {}", "✓".green(), output.display());
    } else if !args.upload {
        print!("{}", snapshot.html);
    }

    if args.upload {
        let api = HttpHostingClient::new(&config)?;
        let response = save_with_retry(&session, &api).await?;
        let url = response
            .url
            .unwrap_or_else(|| config.domains_for(&args.subdomain).canonical().to_string());
        println!();
        println!("{} {}", "✅ Saved".green().bold(), url);
    }

    Ok(())
}

async fn save_with_retry(
    session: &EditSession,
    api: &HttpHostingClient,
) -> Result<clonup_workspace::SaveResponse> {
    let mut attempt = 1;
    loop {
        match session.save(api).await {
            Ok(response) => return Ok(response),
            Err(err) if err.is_retryable() && attempt < SAVE_ATTEMPTS => {
                let delay = Duration::from_secs(2u64.pow(attempt));
                warn!(attempt, ?delay, "Retrying save");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(user_facing(err)),
        }
    }
}

fn user_facing(err: WorkspaceError) -> anyhow::Error {
    anyhow!("{}", err.user_message())
}
