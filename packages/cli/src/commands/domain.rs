use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use clonup_workspace::{
    normalize_domain, Config, DnsInstructions, DomainState, DomainWorkflow, HostingApi,
    HttpHostingClient,
};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct DomainArgs {
    /// Clone subdomain
    pub subdomain: String,

    #[command(subcommand)]
    pub command: DomainCommand,
}

#[derive(Debug, Subcommand)]
pub enum DomainCommand {
    /// Register a custom domain and show the DNS records to create
    Add {
        domain: String,

        /// The account has an active subscription
        #[arg(long)]
        subscribed: bool,

        /// Keep polling until the domain verifies (Ctrl-C stops)
        #[arg(short, long)]
        wait: bool,
    },

    /// Check a pending domain once
    Verify { domain: String },
}

pub async fn domain(args: DomainArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let api = Arc::new(HttpHostingClient::new(&config)?);

    match args.command {
        DomainCommand::Add {
            domain,
            subscribed,
            wait,
        } => {
            let mut workflow =
                DomainWorkflow::new(Arc::clone(&api), &args.subdomain, config.poll_interval());
            let instructions = workflow.submit(&domain, subscribed).await?;
            print_instructions(&instructions);

            if wait {
                wait_for_verification(&mut workflow).await?;
            }
        }
        DomainCommand::Verify { domain } => {
            let domain = normalize_domain(&domain)?;
            let status = api.verify_domain(&args.subdomain, &domain).await?;
            if status.verified {
                println!("{} {}", "✅ Verified".green().bold(), domain);
            } else {
                println!("{} {} is not verified yet", "⏳".yellow(), domain);
                if let Some(message) = status.message {
                    println!("   {message}");
                }
                print_instructions(&api.dns_instructions(&args.subdomain, &domain).await?);
            }
        }
    }
    Ok(())
}

async fn wait_for_verification(workflow: &mut DomainWorkflow<HttpHostingClient>) -> Result<()> {
    let mut states = workflow.subscribe();
    workflow.start_polling();
    println!("Waiting for DNS to propagate (Ctrl-C to stop)...");

    tokio::select! {
        changed = states.wait_for(DomainState::is_verified) => {
            if changed.is_err() {
                bail!("Verification stopped unexpectedly");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            workflow.close();
            println!();
            println!("Stopped. Run `clonup domain <subdomain> verify <domain>` later.");
            return Ok(());
        }
    }

    if let Some(domain) = workflow.state().domain() {
        println!("{} {}", "✅ Verified".green().bold(), domain);
    }
    Ok(())
}

fn print_instructions(instructions: &DnsInstructions) {
    println!();
    println!(
        "{} {}",
        "DNS records for".bright_blue().bold(),
        instructions.domain.bright_white()
    );
    for record in &instructions.records {
        let ttl = record
            .ttl
            .map(|ttl| format!(" (ttl {ttl})"))
            .unwrap_or_default();
        println!(
            "  {:<6} {:<24} {}{}",
            record.record_type, record.name, record.value, ttl
        );
    }
    println!();
}
