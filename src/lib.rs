//! wikidex: Wikipedia section indexing pipeline
//!
//! Ingests enriched Wikipedia page documents (JSON trees from an
//! external wiki markup enrichment service) and populates search
//! backends with one record per page section, featuring:
//! - Section-tree flattening with ancestor and link resolution
//! - A bulk-write HTTP sink (Elasticsearch-compatible `_bulk` API)
//! - A faceted local index (tantivy) with hierarchical ancestor facets
//! - A multi-worker driver with per-page success/error accounting

pub mod config;
pub mod enrich;
pub mod flatten;
pub mod index;
pub mod pipeline;
pub mod source;
pub mod types;

pub use config::Config;
pub use types::{LinkOut, PageReport, SectionRecord};
