//! Core types shared across the pipeline

use serde::{Deserialize, Serialize};

/// Placeholder name for an outbound link with no description.
pub const MISSING_LINK_NAME: &str = "__MISSING__";

/// A link or reference as it is written to a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkOut {
    /// Display name; defaulted when the source description is empty
    pub name: String,
    /// Target URL
    pub url: String,
}

/// The flattened, backend-agnostic representation of one wiki page
/// section, ready for indexing.
///
/// Field names on the wire match the backend schema: one record maps to
/// one write operation in either sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRecord {
    /// Title of the owning page
    #[serde(rename = "wikipedia_page")]
    pub page_title: String,
    /// Page-level category list, repeated on every section of the page
    #[serde(rename = "wikipedia_categories")]
    pub categories: Vec<String>,
    /// Title of this section
    #[serde(rename = "section")]
    pub section_title: String,
    /// Enclosing section titles, outermost first
    #[serde(rename = "ancestors")]
    pub ancestor_titles: Vec<String>,
    /// Outbound links belonging to this section
    pub links: Vec<LinkOut>,
    /// Internal references belonging to this section
    pub references: Vec<LinkOut>,
}

/// Final per-run accounting surfaced to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageReport {
    /// Pages that were flattened and indexed without failure
    pub processed_pages: u64,
    /// Pages skipped after an enrich, flatten, or index failure
    pub error_pages: u64,
}

impl PageReport {
    /// Fold another report into this one.
    pub fn merge(&mut self, other: PageReport) {
        self.processed_pages += other.processed_pages;
        self.error_pages += other.error_pages;
    }

    /// Total pages seen, successful or not.
    pub fn total_pages(&self) -> u64 {
        self.processed_pages + self.error_pages
    }
}

impl std::fmt::Display for PageReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} pages processed, {} pages errored",
            self.processed_pages, self.error_pages
        )
    }
}
