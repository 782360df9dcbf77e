//! Faceted local index sink
//!
//! Stores one document per section record in a local tantivy index with
//! facet fields: the owning page, the section title, the hierarchical
//! ancestor chain, and the joined category string. Tantivy encodes facet
//! paths into its term dictionary, so no separate taxonomy store is
//! needed on disk.

use super::{SectionSink, SinkError, WriteResult};
use crate::config::FacetConfig;
use crate::types::SectionRecord;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tantivy::directory::MmapDirectory;
use tantivy::schema::{Facet, FacetOptions, Field, Schema};
use tantivy::{Index, IndexWriter, TantivyDocument};
use tracing::warn;

/// Section-record sink backed by a local faceted tantivy index.
///
/// Cloning yields another handle over the same index writer; documents
/// are added individually and become visible after [`FacetSink::commit`].
#[derive(Clone)]
pub struct FacetSink {
    index: Index,
    writer: Arc<Mutex<IndexWriter>>,
    fields: FacetFields,
}

/// Schema fields of the faceted index
#[derive(Clone, Copy)]
struct FacetFields {
    page: Field,
    section: Field,
    ancestors: Field,
    categories: Field,
}

fn build_schema() -> (Schema, FacetFields) {
    let mut schema_builder = Schema::builder();

    let page = schema_builder.add_facet_field("wikipedia_page", FacetOptions::default());
    let section = schema_builder.add_facet_field("section", FacetOptions::default());
    let ancestors = schema_builder.add_facet_field("ancestors", FacetOptions::default());
    let categories =
        schema_builder.add_facet_field("wikipedia_categories", FacetOptions::default());

    let schema = schema_builder.build();
    let fields = FacetFields {
        page,
        section,
        ancestors,
        categories,
    };
    (schema, fields)
}

fn index_err(e: tantivy::TantivyError) -> SinkError {
    SinkError::Index(e.to_string())
}

impl FacetSink {
    /// Open (or create) the faceted index in a directory. With `erase`
    /// the previous index is deleted instead of appended to.
    pub fn open(config: &FacetConfig, erase: bool) -> Result<Self, SinkError> {
        if erase && config.index_dir.exists() {
            std::fs::remove_dir_all(&config.index_dir)?;
        }
        std::fs::create_dir_all(&config.index_dir)?;

        let (schema, fields) = build_schema();
        let dir = MmapDirectory::open(&config.index_dir)
            .map_err(|e| SinkError::Index(e.to_string()))?;
        let index = Index::open_or_create(dir, schema).map_err(index_err)?;
        let writer = index.writer(config.writer_heap_bytes).map_err(index_err)?;

        Ok(Self {
            index,
            writer: Arc::new(Mutex::new(writer)),
            fields,
        })
    }

    /// Open the index at a bare path with default writer settings.
    pub fn open_dir(path: impl AsRef<Path>, erase: bool) -> Result<Self, SinkError> {
        let config = FacetConfig {
            index_dir: path.as_ref().to_path_buf(),
            ..FacetConfig::default()
        };
        Self::open(&config, erase)
    }

    /// Create a throwaway in-memory index.
    pub fn new_in_memory() -> Result<Self, SinkError> {
        let (schema, fields) = build_schema();
        let index = Index::create_in_ram(schema);
        let writer = index.writer(15_000_000).map_err(index_err)?;

        Ok(Self {
            index,
            writer: Arc::new(Mutex::new(writer)),
            fields,
        })
    }

    fn build_document(&self, record: &SectionRecord) -> TantivyDocument {
        let mut doc = TantivyDocument::new();
        doc.add_facet(self.fields.page, Facet::from_path([&record.page_title]));
        doc.add_facet(self.fields.section, Facet::from_path([&record.section_title]));

        // Empty facets are omitted rather than indexed as empty paths
        if !record.ancestor_titles.is_empty() {
            doc.add_facet(
                self.fields.ancestors,
                Facet::from_path(record.ancestor_titles.iter()),
            );
        }
        if !record.categories.is_empty() {
            let joined = record.categories.join(" ");
            doc.add_facet(self.fields.categories, Facet::from_path([&joined]));
        }
        doc
    }

    /// Make all pending documents visible to searchers.
    pub fn commit(&self) -> Result<(), SinkError> {
        self.writer.lock().commit().map_err(index_err)?;
        Ok(())
    }

    /// Number of committed documents in the index.
    pub fn num_docs(&self) -> Result<u64, SinkError> {
        let reader = self.index.reader().map_err(index_err)?;
        Ok(reader.searcher().num_docs())
    }
}

impl SectionSink for FacetSink {
    fn write(&self, records: &[SectionRecord], page_title: &str) -> Result<WriteResult, SinkError> {
        let mut result = WriteResult::default();
        let writer = self.writer.lock();
        for record in records {
            let doc = self.build_document(record);
            match writer.add_document(doc) {
                Ok(_) => result.written += 1,
                Err(e) => {
                    // Keep going: one bad section must not drop the rest
                    // of the page, but the failure is surfaced in the
                    // result instead of being swallowed.
                    warn!(
                        page = page_title,
                        section = record.section_title.as_str(),
                        "facet add failed: {}",
                        e
                    );
                    result.failed += 1;
                }
            }
        }
        Ok(result)
    }
}
