//! In-memory hosting layer for driving sessions and the domain workflow

use clonup_workspace::{
    DnsInstructions, DnsRecord, DomainStatus, HostingApi, SaveRequest, SaveResponse,
    WorkspaceError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
pub struct FakeHostingApi {
    pub pages: Mutex<Vec<(String, String)>>,
    pub saved: Mutex<Vec<SaveRequest>>,
    pub fail_saves: Mutex<usize>,
    pub save_delay: Option<Duration>,
    /// Verify calls answered "not yet" before the domain verifies
    pub verify_after: usize,
    pub verify_calls: AtomicUsize,
    pub fail_stats: bool,
}

impl FakeHostingApi {
    pub fn with_page(subdomain: &str, html: &str) -> Self {
        Self {
            pages: Mutex::new(vec![(subdomain.to_string(), html.to_string())]),
            ..Self::default()
        }
    }

    pub fn fail_next_saves(&self, count: usize) {
        *self.fail_saves.lock().unwrap() = count;
    }

    pub fn last_saved(&self) -> Option<String> {
        self.saved.lock().unwrap().last().map(|r| r.html.clone())
    }

    pub fn save_count(&self) -> usize {
        self.saved.lock().unwrap().len()
    }

    pub fn verify_count(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    fn instructions(subdomain: &str, domain: &str) -> DnsInstructions {
        DnsInstructions {
            domain: domain.to_string(),
            records: vec![DnsRecord {
                record_type: "CNAME".to_string(),
                name: domain.split('.').next().unwrap_or_default().to_string(),
                value: format!("{subdomain}.clonup.site"),
                ttl: Some(3600),
            }],
        }
    }
}

impl HostingApi for FakeHostingApi {
    async fn fetch_clone(&self, subdomain: &str) -> Result<String, WorkspaceError> {
        self.pages
            .lock()
            .unwrap()
            .iter()
            .find(|(name, _)| name == subdomain)
            .map(|(_, html)| html.clone())
            .ok_or(WorkspaceError::Api {
                status: 404,
                message: "clone not found".to_string(),
            })
    }

    async fn save(&self, request: &SaveRequest) -> Result<SaveResponse, WorkspaceError> {
        if let Some(delay) = self.save_delay {
            tokio::time::sleep(delay).await;
        }
        {
            let mut failures = self.fail_saves.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(WorkspaceError::Api {
                    status: 503,
                    message: "storage unavailable".to_string(),
                });
            }
        }
        let mut saved = self.saved.lock().unwrap();
        saved.push(request.clone());
        Ok(SaveResponse {
            version: Some(saved.len() as u64),
            url: Some(format!("https://{}.clonup.site/", request.subdomain)),
        })
    }

    async fn add_domain(
        &self,
        subdomain: &str,
        domain: &str,
    ) -> Result<DnsInstructions, WorkspaceError> {
        Ok(Self::instructions(subdomain, domain))
    }

    async fn verify_domain(
        &self,
        _subdomain: &str,
        domain: &str,
    ) -> Result<DomainStatus, WorkspaceError> {
        let call = self.verify_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(DomainStatus {
            domain: domain.to_string(),
            verified: call > self.verify_after,
            message: None,
        })
    }

    async fn dns_instructions(
        &self,
        subdomain: &str,
        domain: &str,
    ) -> Result<DnsInstructions, WorkspaceError> {
        Ok(Self::instructions(subdomain, domain))
    }

    async fn clone_count(&self, _subdomain: &str) -> Result<u64, WorkspaceError> {
        if self.fail_stats {
            return Err(WorkspaceError::Api {
                status: 500,
                message: "stats offline".to_string(),
            });
        }
        Ok(7)
    }
}
