//! Hosting API client.
//!
//! Everything the editor persists or asks the hosting layer goes through
//! [`HostingApi`], so sessions and the domain workflow can be driven by a
//! fake in tests.

use crate::{Config, WorkspaceError};
use chrono::Utc;
use reqwest::{header, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{debug, instrument};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub subdomain: String,
    pub html: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    #[serde(default)]
    pub version: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsRecord {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
}

/// Records the owner has to create at their DNS provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsInstructions {
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub records: Vec<DnsRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainStatus {
    pub domain: String,
    pub verified: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Debug, Serialize)]
struct AddDomainRequest<'a> {
    domain: &'a str,
}

/// Body shared by every domain endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DomainEnvelope {
    #[serde(default = "accepted")]
    success: bool,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    verification: Option<Verification>,
    #[serde(default)]
    dns_instructions: Option<DnsInstructions>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Verification {
    #[serde(default)]
    verified: bool,
}

fn accepted() -> bool {
    true
}

impl DomainEnvelope {
    fn into_result(self) -> Result<Self, WorkspaceError> {
        if self.success {
            return Ok(self);
        }
        Err(WorkspaceError::Rejected(
            self.message
                .unwrap_or_else(|| "The domain request was rejected".to_string()),
        ))
    }

    fn instructions(self, requested: &str) -> DnsInstructions {
        let mut instructions = self.dns_instructions.unwrap_or_default();
        if instructions.domain.is_empty() {
            instructions.domain = self.domain.unwrap_or_else(|| requested.to_string());
        }
        instructions
    }

    fn status(self, requested: &str) -> DomainStatus {
        DomainStatus {
            domain: self.domain.unwrap_or_else(|| requested.to_string()),
            verified: self.verification.unwrap_or_default().verified,
            message: self.message,
        }
    }
}

/// Persistence and domain endpoints of the hosting layer
pub trait HostingApi: Send + Sync {
    /// Current HTML of a clone, bypassing any cache
    fn fetch_clone(
        &self,
        subdomain: &str,
    ) -> impl Future<Output = Result<String, WorkspaceError>> + Send;

    fn save(
        &self,
        request: &SaveRequest,
    ) -> impl Future<Output = Result<SaveResponse, WorkspaceError>> + Send;

    fn add_domain(
        &self,
        subdomain: &str,
        domain: &str,
    ) -> impl Future<Output = Result<DnsInstructions, WorkspaceError>> + Send;

    fn verify_domain(
        &self,
        subdomain: &str,
        domain: &str,
    ) -> impl Future<Output = Result<DomainStatus, WorkspaceError>> + Send;

    fn dns_instructions(
        &self,
        subdomain: &str,
        domain: &str,
    ) -> impl Future<Output = Result<DnsInstructions, WorkspaceError>> + Send;

    /// How many times this clone has itself been cloned
    fn clone_count(&self, subdomain: &str)
        -> impl Future<Output = Result<u64, WorkspaceError>> + Send;
}

/// [`HostingApi`] over HTTPS + JSON
#[derive(Debug, Clone)]
pub struct HttpHostingClient {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl HttpHostingClient {
    pub fn new(config: &Config) -> Result<Self, WorkspaceError> {
        let base = Url::parse(&config.api_base_url)
            .map_err(|e| WorkspaceError::Config(format!("apiBaseUrl: {e}")))?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("clonup/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base,
            token: config.api_token.clone(),
        })
    }

    /// `base` + percent-encoded path segments
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, WorkspaceError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| WorkspaceError::Config(format!("{} cannot be a base URL", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Clone HTML URL with cache-defeating query parameters
    pub fn fetch_url(&self, subdomain: &str) -> Result<Url, WorkspaceError> {
        let mut url = self.endpoint(&["sites", subdomain, "html"])?;
        let now = Utc::now();
        url.query_pairs_mut()
            .append_pair("_ts", &now.timestamp_millis().to_string())
            .append_pair("_nc", &format!("{:x}", now.timestamp_subsec_nanos()));
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, WorkspaceError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(WorkspaceError::Api {
            status: status.as_u16(),
            message: message.trim().to_string(),
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, WorkspaceError> {
        Ok(self.send(request).await?.json::<T>().await?)
    }

    /// `sites/{subdomain}/{action}?domain=...`
    fn domain_url(&self, subdomain: &str, action: &str, domain: &str) -> Result<Url, WorkspaceError> {
        let mut url = self.endpoint(&["sites", subdomain, action])?;
        url.query_pairs_mut().append_pair("domain", domain);
        Ok(url)
    }

    async fn send_domain(&self, request: RequestBuilder) -> Result<DomainEnvelope, WorkspaceError> {
        self.send_json::<DomainEnvelope>(request).await?.into_result()
    }
}

impl HostingApi for HttpHostingClient {
    #[instrument(skip(self))]
    async fn fetch_clone(&self, subdomain: &str) -> Result<String, WorkspaceError> {
        let url = self.fetch_url(subdomain)?;
        let request = self
            .client
            .get(url)
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::PRAGMA, "no-cache");
        let html = self.send(request).await?.text().await?;
        debug!(bytes = html.len(), "Fetched clone");
        Ok(html)
    }

    #[instrument(skip(self, request), fields(subdomain = %request.subdomain, bytes = request.html.len()))]
    async fn save(&self, request: &SaveRequest) -> Result<SaveResponse, WorkspaceError> {
        let url = self.endpoint(&["save"])?;
        let body = self.send(self.client.post(url).json(request)).await?.text().await?;
        // a bare 200 is a success too
        if body.trim().is_empty() {
            return Ok(SaveResponse::default());
        }
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn add_domain(
        &self,
        subdomain: &str,
        domain: &str,
    ) -> Result<DnsInstructions, WorkspaceError> {
        let url = self.endpoint(&["sites", subdomain, "add-domain"])?;
        let body = AddDomainRequest { domain };
        let envelope = self.send_domain(self.client.post(url).json(&body)).await?;
        Ok(envelope.instructions(domain))
    }

    #[instrument(skip(self))]
    async fn verify_domain(
        &self,
        subdomain: &str,
        domain: &str,
    ) -> Result<DomainStatus, WorkspaceError> {
        let url = self.domain_url(subdomain, "verify-domain", domain)?;
        let envelope = self.send_domain(self.client.get(url)).await?;
        Ok(envelope.status(domain))
    }

    #[instrument(skip(self))]
    async fn dns_instructions(
        &self,
        subdomain: &str,
        domain: &str,
    ) -> Result<DnsInstructions, WorkspaceError> {
        let url = self.domain_url(subdomain, "dns-instructions", domain)?;
        let envelope = self.send_domain(self.client.get(url)).await?;
        Ok(envelope.instructions(domain))
    }

    #[instrument(skip(self))]
    async fn clone_count(&self, subdomain: &str) -> Result<u64, WorkspaceError> {
        let url = self.endpoint(&["sites", subdomain, "clone-count"])?;
        let response: CountResponse = self.send_json(self.client.get(url)).await?;
        Ok(response.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> HttpHostingClient {
        let config = Config {
            api_base_url: base.to_string(),
            ..Config::default()
        };
        HttpHostingClient::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let api = client("https://api.example.com/v1/");
        let url = api.endpoint(&["sites", "shop", "my site"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/sites/shop/my%20site");

        let api = client("https://api.example.com/v1");
        let url = api.endpoint(&["save"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/save");
    }

    #[test]
    fn test_domain_url_carries_domain_query() {
        let api = client("https://api.example.com/");
        let url = api
            .domain_url("shop", "verify-domain", "www.example.com")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/sites/shop/verify-domain?domain=www.example.com"
        );
    }

    #[test]
    fn test_fetch_url_defeats_caches() {
        let api = client("https://api.example.com/");
        let url = api.fetch_url("shop").unwrap();
        let keys: Vec<String> = url.query_pairs().map(|(k, _)| k.into_owned()).collect();
        assert_eq!(url.path(), "/sites/shop/html");
        assert_eq!(keys, vec!["_ts", "_nc"]);
    }

    #[test]
    fn test_domain_envelope() {
        let json = r#"{
            "success": true,
            "domain": "www.example.com",
            "verification": { "verified": false },
            "dnsInstructions": {
                "records": [{ "type": "CNAME", "name": "www", "value": "shop.clonup.site" }]
            },
            "message": "Waiting for DNS"
        }"#;
        let envelope: DomainEnvelope = serde_json::from_str(json).unwrap();
        let instructions = envelope.instructions("ignored.com");
        assert_eq!(instructions.domain, "www.example.com");
        assert_eq!(instructions.records[0].record_type, "CNAME");
        assert_eq!(instructions.records[0].ttl, None);

        let envelope: DomainEnvelope = serde_json::from_str(json).unwrap();
        let status = envelope.status("www.example.com");
        assert!(!status.verified);
        assert_eq!(status.message.as_deref(), Some("Waiting for DNS"));
    }

    #[test]
    fn test_rejected_envelope() {
        let envelope: DomainEnvelope =
            serde_json::from_str(r#"{ "success": false, "message": "Domain already in use" }"#)
                .unwrap();
        let err = envelope.into_result().unwrap_err();
        assert!(matches!(err, WorkspaceError::Rejected(ref m) if m == "Domain already in use"));
        assert!(!err.is_retryable());
    }
}
