//! Section-tree flattening
//!
//! Walks the `sections` array of an enriched page document in order and
//! produces one [`SectionRecord`] per node, enriched with the page-level
//! category list, the resolved ancestor chain, and the links/references
//! belonging to each section.
//!
//! The section array is walked with an explicit bounds check; running
//! off the end of the array is the only termination condition. Link
//! entries address sections by a 1-based running counter, one ahead of
//! the 0-based array position used for ancestor lookups. That offset is
//! part of the input format and is preserved here.

pub mod ancestors;
pub mod links;

use crate::types::SectionRecord;
use serde_json::Value;
use thiserror::Error;

pub use ancestors::resolve_ancestors;
pub use links::{parse_links, resolve_links, LinkEntry, LinkKind};

/// Errors raised while flattening one page document. Both variants are
/// fatal for the page and counted by the driver.
#[derive(Debug, Error)]
pub enum FlattenError {
    /// The document has no `sections` field at all. Distinct from an
    /// empty section array, which is valid and yields no records.
    #[error("sections were expected in the document")]
    MissingSections,

    /// The document is structurally invalid in a way with no safe
    /// default (bad ancestor data, missing section title).
    #[error("malformed document: {0}")]
    Malformed(String),
}

/// Flatten one enriched page document into ordered section records.
pub fn flatten(root: &Value, page_title: &str) -> Result<Vec<SectionRecord>, FlattenError> {
    let sections = match root.get("sections") {
        None => return Err(FlattenError::MissingSections),
        Some(value) => value
            .as_array()
            .ok_or_else(|| FlattenError::Malformed("sections is not an array".to_string()))?,
    };

    let categories = parse_categories(root);
    let links = parse_links(root.get("links"));
    let references = parse_links(root.get("references"));

    let mut records = Vec::with_capacity(sections.len());
    let mut pos = 0;
    while let Some(node) = sections.get(pos) {
        let section_title = node
            .get("title")
            .and_then(Value::as_str)
            .ok_or_else(|| FlattenError::Malformed(format!("section {} has no title", pos)))?;

        // Link entries use a 1-based section counter
        let counter = pos + 1;
        records.push(SectionRecord {
            page_title: page_title.to_string(),
            categories: categories.clone(),
            section_title: section_title.to_string(),
            ancestor_titles: resolve_ancestors(sections, node)?,
            links: resolve_links(&links, counter, LinkKind::Outbound),
            references: resolve_links(&references, counter, LinkKind::Reference),
        });
        pos += 1;
    }

    Ok(records)
}

/// Read the page-level category list. Absent or malformed categories are
/// not an error; every section simply carries an empty list.
fn parse_categories(root: &Value) -> Vec<String> {
    root.get("categories")
        .and_then(|c| c.get("content"))
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}
