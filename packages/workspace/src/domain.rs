//! # Custom Domain Workflow
//!
//! ```text
//! Unconfigured ──submit──▶ Pending (DNS instructions) ──verified──▶ Verified
//!                               │   ▲
//!                               └───┘ poll every interval
//! ```
//!
//! State is published on a `watch` channel so a UI (or the CLI) can follow
//! it. Polling runs as a background task which stops on verification and is
//! aborted when the workflow is closed or dropped.

use crate::hosting::{DnsInstructions, HostingApi};
use crate::WorkspaceError;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum DomainState {
    Unconfigured,
    Pending {
        domain: String,
        instructions: DnsInstructions,
    },
    Verified {
        domain: String,
    },
}

impl DomainState {
    pub fn domain(&self) -> Option<&str> {
        match self {
            DomainState::Unconfigured => None,
            DomainState::Pending { domain, .. } | DomainState::Verified { domain } => {
                Some(domain.as_str())
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, DomainState::Pending { .. })
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, DomainState::Verified { .. })
    }
}

pub struct DomainWorkflow<A: HostingApi + 'static> {
    api: Arc<A>,
    subdomain: String,
    interval: Duration,
    state: Arc<watch::Sender<DomainState>>,
    poller: Option<JoinHandle<()>>,
}

impl<A: HostingApi + 'static> DomainWorkflow<A> {
    pub fn new(api: Arc<A>, subdomain: impl Into<String>, interval: Duration) -> Self {
        let (state, _) = watch::channel(DomainState::Unconfigured);
        Self {
            api,
            subdomain: subdomain.into(),
            interval,
            state: Arc::new(state),
            poller: None,
        }
    }

    pub fn state(&self) -> DomainState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DomainState> {
        self.state.subscribe()
    }

    /// Register `domain` with the hosting layer and show its DNS records.
    ///
    /// Custom domains are a paid feature; nothing is sent without an
    /// active subscription.
    pub async fn submit(
        &mut self,
        domain: &str,
        subscription_active: bool,
    ) -> Result<DnsInstructions, WorkspaceError> {
        if !subscription_active {
            return Err(WorkspaceError::SubscriptionRequired);
        }
        let domain = normalize_domain(domain)?;

        self.stop_polling();
        let instructions = self.api.add_domain(&self.subdomain, &domain).await?;
        info!(%domain, records = instructions.records.len(), "Domain submitted");

        self.state.send_replace(DomainState::Pending {
            domain,
            instructions: instructions.clone(),
        });
        Ok(instructions)
    }

    /// Fetch the DNS records of the pending domain again
    pub async fn refresh_instructions(&self) -> Result<DnsInstructions, WorkspaceError> {
        let DomainState::Pending { domain, .. } = self.state() else {
            return Err(WorkspaceError::NoPendingDomain);
        };
        let instructions = self.api.dns_instructions(&self.subdomain, &domain).await?;

        self.state.send_if_modified(|state| match state {
            DomainState::Pending {
                domain: pending,
                instructions: current,
            } if *pending == domain && *current != instructions => {
                *current = instructions.clone();
                true
            }
            _ => false,
        });
        Ok(instructions)
    }

    /// Check once, now
    pub async fn verify_now(&self) -> Result<bool, WorkspaceError> {
        let DomainState::Pending { domain, .. } = self.state() else {
            return Ok(self.state().is_verified());
        };
        let verified = check(&*self.api, &self.subdomain, &domain, &self.state).await?;
        Ok(verified)
    }

    /// Start polling the verify endpoint every interval.
    ///
    /// Returns `false` when there is nothing to poll for or a poller is
    /// already running.
    pub fn start_polling(&mut self) -> bool {
        let DomainState::Pending { domain, .. } = self.state() else {
            return false;
        };
        if self.is_polling() {
            return false;
        }

        let api = Arc::clone(&self.api);
        let state = Arc::clone(&self.state);
        let subdomain = self.subdomain.clone();
        let period = self.interval;

        self.poller = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let still_pending = {
                    let current = state.borrow();
                    current.is_pending() && current.domain() == Some(domain.as_str())
                };
                if !still_pending {
                    debug!("Domain changed, stopping poll");
                    break;
                }
                match check(&*api, &subdomain, &domain, &state).await {
                    Ok(true) => break,
                    Ok(false) => debug!(%domain, "Not verified yet"),
                    Err(err) => warn!(%domain, error = %err, "Verification request failed"),
                }
            }
        }));
        debug!(interval = ?self.interval, "Started verification polling");
        true
    }

    pub fn is_polling(&self) -> bool {
        self.poller
            .as_ref()
            .is_some_and(|poller| !poller.is_finished())
    }

    fn stop_polling(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }

    /// Dialog closed: stop polling, keep the last known state
    pub fn close(&mut self) {
        if self.is_polling() {
            debug!("Cancelled verification polling");
        }
        self.stop_polling();
    }
}

impl<A: HostingApi + 'static> Drop for DomainWorkflow<A> {
    fn drop(&mut self) {
        self.stop_polling();
    }
}

async fn check<A: HostingApi>(
    api: &A,
    subdomain: &str,
    domain: &str,
    state: &watch::Sender<DomainState>,
) -> Result<bool, WorkspaceError> {
    let status = api.verify_domain(subdomain, domain).await?;
    if !status.verified {
        return Ok(false);
    }
    let changed = state.send_if_modified(|current| {
        if current.is_pending() && current.domain() == Some(domain) {
            *current = DomainState::Verified {
                domain: domain.to_string(),
            };
            true
        } else {
            false
        }
    });
    if changed {
        info!(%domain, "Domain verified");
    }
    Ok(true)
}

/// `https://WWW.Example.com/` → `www.example.com`
pub fn normalize_domain(input: &str) -> Result<String, WorkspaceError> {
    let trimmed = input.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    let domain = without_scheme
        .trim_end_matches('/')
        .trim_end_matches('.')
        .to_ascii_lowercase();

    let invalid = || WorkspaceError::InvalidDomain(input.trim().to_string());
    if domain.is_empty() || domain.len() > 253 || !domain.contains('.') {
        return Err(invalid());
    }
    for label in domain.split('.') {
        let valid = !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid {
            return Err(invalid());
        }
    }
    Ok(domain)
}
