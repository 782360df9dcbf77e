//! Per-section link resolution
//!
//! Outbound links and internal references share the same entry shape in
//! the enriched document; each entry carries the 1-based position of the
//! section it belongs to.

use crate::types::{LinkOut, MISSING_LINK_NAME};
use serde::Deserialize;
use serde_json::Value;

/// A raw link entry as emitted by the enricher.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkEntry {
    /// Target URL
    pub url: String,
    /// Human-readable description; often empty
    #[serde(default)]
    pub description: Option<String>,
    /// 1-based position of the owning section in document order
    pub section_idx: i64,
}

/// Which of the two link arrays an entry came from. The two arrays are
/// disjoint and differ only in how an empty description is defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// External link: empty description becomes a placeholder name
    Outbound,
    /// Wikipedia-internal reference: empty description becomes the URL
    Reference,
}

/// Parse a raw link array from the document tree.
///
/// An absent or malformed array is treated as "no links", never as an
/// error.
pub fn parse_links(node: Option<&Value>) -> Vec<LinkEntry> {
    match node {
        None => Vec::new(),
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_default(),
    }
}

/// Resolve the links belonging to one section.
///
/// Filters on an exact `section_idx` match, keeps source order, and does
/// not deduplicate: duplicate input entries produce duplicate output.
pub fn resolve_links(all: &[LinkEntry], section_counter: usize, kind: LinkKind) -> Vec<LinkOut> {
    all.iter()
        .filter(|entry| entry.section_idx == section_counter as i64)
        .map(|entry| {
            let name = match entry.description.as_deref() {
                Some(desc) if !desc.is_empty() => desc.to_string(),
                _ => match kind {
                    LinkKind::Outbound => MISSING_LINK_NAME.to_string(),
                    LinkKind::Reference => entry.url.clone(),
                },
            };
            LinkOut {
                name,
                url: entry.url.clone(),
            }
        })
        .collect()
}
