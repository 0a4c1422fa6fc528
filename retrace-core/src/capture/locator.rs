//! Locator strategy
//!
//! Derives a reference string that re-finds "the same" element on a later
//! page load. Three tiers of degrading specificity:
//!
//! | Tier  | Built from          | Example  | Matches          |
//! |-------|---------------------|----------|------------------|
//! | Id    | `id` attribute      | `#go`    | one element      |
//! | Class | joined class list   | `.a.b`   | a set of elements|
//! | Tag   | lowercase tag name  | `button` | many elements    |
//!
//! Class and tag locators are not unique. Replay resolves them to the first
//! match in document order.
//!
//! Locators are emitted as CSS selectors, so identifier characters that are
//! not valid in a bare CSS identifier are escaped.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The capture-side view of a page element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub tag_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_text: Option<String>,
}

impl Element {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.inner_text = Some(text.into());
        self
    }
}

/// Specificity tier of a locator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocatorTier {
    Id,
    Class,
    Tag,
}

/// A stable element reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    selector: String,
    tier: LocatorTier,
}

impl Locator {
    /// Derive a locator for an element, or `None` when nothing stable is left
    pub fn for_element(element: &Element) -> Option<Self> {
        if let Some(id) = element.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
            return Some(Self {
                selector: format!("#{}", escape_ident(id)),
                tier: LocatorTier::Id,
            });
        }

        if let Some(classes) = element.class_name.as_deref() {
            let joined: Vec<String> = classes.split_whitespace().map(escape_ident).collect();
            if !joined.is_empty() {
                return Some(Self {
                    selector: format!(".{}", joined.join(".")),
                    tier: LocatorTier::Class,
                });
            }
        }

        let tag = element.tag_name.trim();
        if tag.is_empty() {
            return None;
        }
        Some(Self {
            selector: tag.to_ascii_lowercase(),
            tier: LocatorTier::Tag,
        })
    }

    /// Interpret a stored locator string
    pub fn parse(selector: &str) -> Option<Self> {
        let selector = selector.trim();
        let tier = match selector.chars().next()? {
            '#' => LocatorTier::Id,
            '.' => LocatorTier::Class,
            _ => LocatorTier::Tag,
        };
        Some(Self {
            selector: selector.to_string(),
            tier,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.selector
    }

    pub fn tier(&self) -> LocatorTier {
        self.tier
    }

    /// Only id locators address exactly one element
    pub fn is_unique(&self) -> bool {
        self.tier == LocatorTier::Id
    }

    pub fn into_string(self) -> String {
        self.selector
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.selector)
    }
}

/// `locate(element) -> string`; `None` only when no element is supplied or
/// the element has neither id, class nor tag
pub fn locate(element: Option<&Element>) -> Option<String> {
    element
        .and_then(Locator::for_element)
        .map(Locator::into_string)
}

fn escape_ident(ident: &str) -> String {
    let mut escaped = String::with_capacity(ident.len());
    for (i, c) in ident.chars().enumerate() {
        if i == 0 && c.is_ascii_digit() {
            // A leading digit must be written as a code point escape
            escaped.push_str(&format!("\\{:x} ", c as u32));
        } else if c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() {
            escaped.push(c);
        } else {
            escaped.push('\\');
            escaped.push(c);
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_wins() {
        let el = Element::new("BUTTON").with_id("go").with_class("a b");
        assert_eq!(locate(Some(&el)), Some("#go".to_string()));
    }

    #[test]
    fn test_class_list_joined() {
        let el = Element::new("div").with_class("a b");
        let locator = Locator::for_element(&el).unwrap();
        assert_eq!(locator.as_str(), ".a.b");
        assert_eq!(locator.tier(), LocatorTier::Class);
        assert!(!locator.is_unique());
    }

    #[test]
    fn test_tag_fallback_is_lowercase() {
        let el = Element::new("SPAN");
        assert_eq!(locate(Some(&el)), Some("span".to_string()));
    }

    #[test]
    fn test_blank_id_and_class_degrade() {
        let el = Element::new("P").with_id("  ").with_class("   ");
        assert_eq!(locate(Some(&el)), Some("p".to_string()));
    }

    #[test]
    fn test_irregular_class_whitespace() {
        let el = Element::new("div").with_class("  card   active ");
        assert_eq!(locate(Some(&el)), Some(".card.active".to_string()));
    }

    #[test]
    fn test_no_element() {
        assert_eq!(locate(None), None);
        assert_eq!(locate(Some(&Element::default())), None);
    }

    #[test]
    fn test_special_characters_escaped() {
        let el = Element::new("input").with_id("user:email");
        assert_eq!(locate(Some(&el)), Some("#user\\:email".to_string()));

        let el = Element::new("div").with_id("1st");
        assert_eq!(locate(Some(&el)), Some("#\\31 st".to_string()));
    }

    #[test]
    fn test_parse_tier() {
        assert_eq!(Locator::parse("#go").unwrap().tier(), LocatorTier::Id);
        assert_eq!(Locator::parse(".a.b").unwrap().tier(), LocatorTier::Class);
        assert_eq!(Locator::parse("button").unwrap().tier(), LocatorTier::Tag);
        assert!(Locator::parse("   ").is_none());
    }
}
