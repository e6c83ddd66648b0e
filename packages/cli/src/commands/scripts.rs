use anyhow::{Context, Result};
use clap::Args;
use clonup_scripts::{extract, ScriptLocation};
use clonup_workspace::{Config, EditSession};
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ScriptsArgs {
    /// HTML file to inspect
    pub input: PathBuf,

    /// Print the editable text of one location only
    #[arg(short, long, value_parser = parse_location)]
    pub location: Option<ScriptLocation>,

    /// Print entries as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_location(s: &str) -> Result<ScriptLocation, String> {
    match s {
        "head" => Ok(ScriptLocation::Head),
        "body" => Ok(ScriptLocation::Body),
        other => Err(format!("expected head or body, got {other:?}")),
    }
}

pub fn scripts(args: ScriptsArgs) -> Result<()> {
    let html = fs::read_to_string(&args.input)
        .with_context(|| format!("Cannot read {}", args.input.display()))?;
    let session = EditSession::open(&html, "local", Config::default().domains_for("local"))?;

    if let Some(location) = args.location {
        println!("{}", session.script_text(location));
        return Ok(());
    }

    let set = extract(session.surface().borrow().tree());
    if args.json {
        println!("{}", serde_json::to_string_pretty(set.entries())?);
        return Ok(());
    }

    for location in [ScriptLocation::Head, ScriptLocation::Body] {
        println!("{}", format!("{location:?}").bright_blue().bold());
        let mut empty = true;
        for entry in set.at(location) {
            empty = false;
            println!("  {} {}", "•".green(), entry.identity);
        }
        if empty {
            println!("  (none)");
        }
    }
    println!();
    println!("{} editable blocks", set.len());
    Ok(())
}
