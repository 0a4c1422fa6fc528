//! Page mirror lookups
//!
//! The recorder references targets by mirror id. Resolving an id into an
//! [`Element`] goes through [`PageView`], so the normalizer never touches a
//! live DOM directly and tests can hand it a static snapshot.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::locator::Element;

/// Read access to the page the recorder is observing
pub trait PageView: Send + Sync {
    /// Look up a node by mirror id; `None` when it has been detached
    fn resolve_node(&self, id: u64) -> Option<Element>;

    /// Current document location
    fn location(&self) -> String;

    /// Current document title
    fn title(&self) -> String;
}

/// In-memory page state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub nodes: HashMap<u64, Element>,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            nodes: HashMap::new(),
        }
    }

    pub fn with_node(mut self, id: u64, element: Element) -> Self {
        self.nodes.insert(id, element);
        self
    }

    pub fn insert_node(&mut self, id: u64, element: Element) {
        self.nodes.insert(id, element);
    }

    pub fn remove_node(&mut self, id: u64) -> Option<Element> {
        self.nodes.remove(&id)
    }

    /// Move to a new document; mirror ids of the old one are discarded
    pub fn load(&mut self, url: impl Into<String>, title: impl Into<String>) {
        self.url = url.into();
        self.title = title.into();
        self.nodes.clear();
    }
}

impl PageView for PageSnapshot {
    fn resolve_node(&self, id: u64) -> Option<Element> {
        self.nodes.get(&id).cloned()
    }

    fn location(&self) -> String {
        self.url.clone()
    }

    fn title(&self) -> String {
        self.title.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_resolves_nodes() {
        let mut page = PageSnapshot::new("https://shop.test/", "Shop")
            .with_node(3, Element::new("button").with_id("buy"));

        assert_eq!(page.resolve_node(3).unwrap().id.as_deref(), Some("buy"));
        assert!(page.resolve_node(4).is_none());

        page.remove_node(3);
        assert!(page.resolve_node(3).is_none());
    }

    #[test]
    fn test_load_clears_mirror() {
        let mut page = PageSnapshot::new("https://a.test/", "A").with_node(1, Element::new("a"));
        page.load("https://b.test/", "B");

        assert_eq!(page.location(), "https://b.test/");
        assert_eq!(page.title(), "B");
        assert!(page.resolve_node(1).is_none());
    }
}
