//! Content identity of a script block.
//!
//! Two blocks with the same identity are the same script for deduplication
//! purposes, whatever their attributes or surrounding whitespace.

use clonup_dom::{DomTree, NodeId};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum ScriptIdentity {
    /// Normalized host + path of an external script; query ignored
    Source(String),
    /// SHA-256 hex of the tag name and trimmed inline text
    Inline(String),
}

impl fmt::Display for ScriptIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptIdentity::Source(source) => write!(f, "src:{source}"),
            ScriptIdentity::Inline(hash) => write!(f, "inline:{}", &hash[..hash.len().min(12)]),
        }
    }
}

impl ScriptIdentity {
    pub fn of(tree: &DomTree, node: NodeId) -> Self {
        match tree.attr(node, "src").map(str::trim) {
            Some(src) if !src.is_empty() => ScriptIdentity::Source(normalize_source(src)),
            _ => {
                let tag = tree.tag(node).unwrap_or_default();
                ScriptIdentity::Inline(inline_hash(tag, &tree.text_content(node)))
            }
        }
    }
}

/// `https://Cdn.Example.com/a.js?v=2` → `cdn.example.com/a.js`
pub fn normalize_source(src: &str) -> String {
    let absolute = if src.starts_with("//") {
        Url::parse(&format!("https:{src}")).ok()
    } else {
        Url::parse(src).ok()
    };

    match absolute {
        Some(url) if url.has_host() => {
            let host = url.host_str().unwrap_or_default();
            match url.port() {
                Some(port) => format!("{host}:{port}{}", url.path()),
                None => format!("{host}{}", url.path()),
            }
        }
        // relative, or something opaque like `data:`
        _ => src
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

fn inline_hash(tag: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tag.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.trim().as_bytes());
    hex::encode(hasher.finalize())
}
