//! # Element Addressing
//!
//! Opaque, process-local element ids. An id is attached lazily (first
//! selection, drag or insertion) as the [`ADDRESS_ATTR`] marker and is the
//! key used to find "the same" element in a separately parsed copy of the
//! document. Ids are instrumentation, never content: the serializer strips
//! them unconditionally.

use clonup_dom::markers::ADDRESS_ATTR;
use clonup_dom::{DomTree, NodeId};
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Distinguishes addressers created within the same clock tick
static ADDRESSER_COUNT: AtomicU64 = AtomicU64::new(0);

/// Opaque element id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementAddress(String);

impl ElementAddress {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sequential id generator seeded per editing session
#[derive(Debug, Clone)]
pub struct ElementAddresser {
    seed: String,
    count: u64,
}

impl ElementAddresser {
    /// Seed from the clone's subdomain plus the current time
    pub fn new(subdomain: &str) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let instance = ADDRESSER_COUNT.fetch_add(1, Ordering::Relaxed);

        let mut hasher = Hasher::new();
        hasher.update(subdomain.as_bytes());
        hasher.update(&nanos.to_le_bytes());
        hasher.update(&instance.to_le_bytes());
        hasher.update(&std::process::id().to_le_bytes());

        Self::from_seed(format!("{:08x}", hasher.finalize()))
    }

    pub fn from_seed(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            count: 0,
        }
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    fn next_id(&mut self) -> ElementAddress {
        self.count += 1;
        ElementAddress(format!("{}-{}", self.seed, self.count))
    }

    /// Return the element's id, attaching a fresh one if it has none.
    ///
    /// A marker shared with an element earlier in document order (a node
    /// cloned together with its marker) counts as missing, so two elements
    /// never resolve to the same id.
    pub fn ensure_id(&mut self, tree: &mut DomTree, node: NodeId) -> ElementAddress {
        if let Some(existing) = tree.attr(node, ADDRESS_ATTR) {
            let existing = ElementAddress::new(existing);
            match lookup(tree, &existing) {
                Some(owner) if owner == node => return existing,
                None => return existing,
                Some(_) => {}
            }
        }

        loop {
            let id = self.next_id();
            // a previous session with the same seed cannot have used it,
            // but imported markup might
            if lookup(tree, &id).is_none() {
                tree.set_attr(node, ADDRESS_ATTR, id.as_str());
                return id;
            }
        }
    }
}

/// Existing id of an element, if it was ever addressed
pub fn address_of(tree: &DomTree, node: NodeId) -> Option<ElementAddress> {
    tree.attr(node, ADDRESS_ATTR).map(ElementAddress::new)
}

/// Resolve an id to the first attached element carrying it
pub fn lookup(tree: &DomTree, id: &ElementAddress) -> Option<NodeId> {
    tree.find_by_attr(ADDRESS_ATTR, id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clonup_dom::parse_document;

    #[test]
    fn test_ensure_id_is_idempotent() {
        let mut tree = parse_document("<body><p>a</p><p>b</p></body>").unwrap();
        let mut addresser = ElementAddresser::from_seed("seed");
        let p = tree.elements_by_tag("p")[0];

        let first = addresser.ensure_id(&mut tree, p);
        let second = addresser.ensure_id(&mut tree, p);
        assert_eq!(first, second);
        assert_eq!(first.as_str(), "seed-1");
        assert_eq!(lookup(&tree, &first), Some(p));
    }

    #[test]
    fn test_distinct_elements_get_distinct_ids() {
        let mut tree = parse_document("<body><p>a</p><p>b</p></body>").unwrap();
        let mut addresser = ElementAddresser::from_seed("seed");
        let ps = tree.elements_by_tag("p");

        let a = addresser.ensure_id(&mut tree, ps[0]);
        let b = addresser.ensure_id(&mut tree, ps[1]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_cloned_marker_is_reassigned() {
        let mut tree = parse_document("<body><p>a</p></body>").unwrap();
        let mut addresser = ElementAddresser::from_seed("seed");
        let body = tree.body().unwrap();
        let p = tree.elements_by_tag("p")[0];
        let original = addresser.ensure_id(&mut tree, p);

        let copy = tree.deep_clone(p);
        tree.append_child(body, copy);
        let copied = addresser.ensure_id(&mut tree, copy);

        assert_ne!(original, copied);
        assert_eq!(lookup(&tree, &original), Some(p));
        assert_eq!(lookup(&tree, &copied), Some(copy));
    }

    #[test]
    fn test_unaddressed_elements_have_no_id() {
        let tree = parse_document("<body><p>a</p></body>").unwrap();
        let p = tree.elements_by_tag("p")[0];
        assert!(address_of(&tree, p).is_none());
    }

    #[test]
    fn test_fresh_addressers_use_distinct_seeds() {
        let a = ElementAddresser::new("shop");
        let b = ElementAddresser::new("shop");
        assert_ne!(a.seed(), b.seed());
    }
}
