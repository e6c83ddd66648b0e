//! Managed-domain URL rewriting.
//!
//! A clone is served from `<subdomain>.<root>` (optionally `www.`-prefixed,
//! over http, https or protocol-relative). Absolute URLs pointing at any of
//! those aliases are stored root-relative so the saved page keeps working
//! when it is later served from a custom domain.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Root domain clones are hosted under unless configured otherwise
pub const DEFAULT_MANAGED_ROOT: &str = "clonup.site";

static STYLE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"url\(\s*(?:"([^"]*)"|'([^']*)'|([^'")\s]*))\s*\)"#)
        .expect("style url pattern")
});

/// Every URL prefix that addresses one clone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedDomainSet {
    canonical: String,
    /// Longest first, so `https://www.x` wins over `https://x`
    prefixes: Vec<String>,
}

impl ManagedDomainSet {
    /// Aliases of `subdomain` under each of `roots`; the first root is
    /// canonical.
    pub fn new<S: AsRef<str>>(subdomain: &str, roots: &[S]) -> Self {
        let subdomain = subdomain.trim().to_ascii_lowercase();
        let mut hosts = Vec::new();
        for root in roots {
            let root = root.as_ref().trim().trim_matches('.').to_ascii_lowercase();
            if root.is_empty() {
                continue;
            }
            hosts.push(format!("{subdomain}.{root}"));
            hosts.push(format!("www.{subdomain}.{root}"));
        }
        if hosts.is_empty() {
            hosts.push(format!("{subdomain}.{DEFAULT_MANAGED_ROOT}"));
            hosts.push(format!("www.{subdomain}.{DEFAULT_MANAGED_ROOT}"));
        }

        let canonical = format!("https://{}", hosts[0]);
        let mut set = Self {
            canonical,
            prefixes: Vec::new(),
        };
        for host in hosts {
            set.add_host(&host);
        }
        set
    }

    /// Also treat `host` (a verified custom domain, say) as this clone
    pub fn with_host(mut self, host: &str) -> Self {
        let host = host.trim().trim_end_matches('/').to_ascii_lowercase();
        if !host.is_empty() {
            self.add_host(&host);
        }
        self
    }

    fn add_host(&mut self, host: &str) {
        for scheme in ["https://", "http://", "//"] {
            let prefix = format!("{scheme}{host}");
            if !self.prefixes.contains(&prefix) {
                self.prefixes.push(prefix);
            }
        }
        self.prefixes.sort_by(|a, b| b.len().cmp(&a.len()));
    }

    /// `https://<subdomain>.<root>`
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Root-relative form of `url` when it points at a managed alias
    pub fn strip(&self, url: &str) -> Option<String> {
        let trimmed = url.trim();
        for prefix in &self.prefixes {
            let Some(head) = trimmed.get(..prefix.len()) else {
                continue;
            };
            if !head.eq_ignore_ascii_case(prefix) {
                continue;
            }
            let rest = &trimmed[prefix.len()..];
            // `https://shop.clonup.site.evil.com` is not ours
            return match rest.chars().next() {
                None => Some("/".to_string()),
                Some('/') => Some(rest.to_string()),
                Some('?' | '#') => Some(format!("/{rest}")),
                Some(_) => continue,
            };
        }
        None
    }

    /// `url` with a managed prefix removed, otherwise unchanged
    pub fn rewrite(&self, url: &str) -> String {
        self.strip(url).unwrap_or_else(|| url.to_string())
    }

    /// Absolute form of a root-relative URL on the canonical host
    pub fn prefix(&self, relative: &str) -> String {
        if relative.starts_with('/') && !relative.starts_with("//") {
            format!("{}{}", self.canonical, relative)
        } else {
            relative.to_string()
        }
    }
}

/// Rewrite every `url(...)` inside an inline style or stylesheet.
///
/// Returns the new text and how many references changed.
pub fn rewrite_style_urls(style: &str, domains: &ManagedDomainSet) -> (String, usize) {
    let mut changed = 0;
    let output = STYLE_URL.replace_all(style, |caps: &Captures| {
        let (url, quote) = if let Some(m) = caps.get(1) {
            (m.as_str(), "\"")
        } else if let Some(m) = caps.get(2) {
            (m.as_str(), "'")
        } else {
            (caps.get(3).map(|m| m.as_str()).unwrap_or_default(), "")
        };
        match domains.strip(url) {
            Some(relative) => {
                changed += 1;
                format!("url({quote}{relative}{quote})")
            }
            None => caps[0].to_string(),
        }
    });
    (output.into_owned(), changed)
}

/// Rewrite each candidate URL of a `srcset` list
pub fn rewrite_srcset(srcset: &str, domains: &ManagedDomainSet) -> (String, usize) {
    let mut changed = 0;
    let candidates: Vec<String> = srcset
        .split(',')
        .map(|candidate| {
            let candidate = candidate.trim();
            let (url, descriptor) = match candidate.split_once(char::is_whitespace) {
                Some((url, descriptor)) => (url, Some(descriptor.trim())),
                None => (candidate, None),
            };
            let url = match domains.strip(url) {
                Some(relative) => {
                    changed += 1;
                    relative
                }
                None => url.to_string(),
            };
            match descriptor {
                Some(descriptor) if !descriptor.is_empty() => format!("{url} {descriptor}"),
                _ => url,
            }
        })
        .filter(|candidate| !candidate.is_empty())
        .collect();
    (candidates.join(", "), changed)
}
