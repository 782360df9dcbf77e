//! Ancestor chain resolution
//!
//! A section node carries the array positions of its enclosing sections;
//! this resolves them to the ordered list of ancestor titles.

use super::FlattenError;
use serde_json::Value;

/// Resolve a section node's ancestor indices to trimmed title strings,
/// outermost first.
///
/// A missing or null `ancestors` field means the section has no
/// ancestors. Anything else that fails to resolve (a non-integer index,
/// an index outside the section array, a node without a string title)
/// is a malformed document and aborts the page.
pub fn resolve_ancestors(sections: &[Value], node: &Value) -> Result<Vec<String>, FlattenError> {
    let indices: Vec<usize> = match node.get("ancestors") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone()).map_err(|_| {
            FlattenError::Malformed("ancestors is not an array of section positions".to_string())
        })?,
    };

    let mut titles = Vec::with_capacity(indices.len());
    for idx in indices {
        let ancestor = sections.get(idx).ok_or_else(|| {
            FlattenError::Malformed(format!(
                "ancestor index {} out of bounds ({} sections)",
                idx,
                sections.len()
            ))
        })?;
        let title = ancestor
            .get("title")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                FlattenError::Malformed(format!("ancestor section {} has no title", idx))
            })?;
        titles.push(title.trim().to_string());
    }
    Ok(titles)
}
