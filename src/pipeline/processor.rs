//! Per-page processing
//!
//! One processor per worker thread walks each page through
//! enrich → flatten → index and keeps the page counters. A failure at
//! any stage counts the page as errored and moves on; the pipeline
//! never aborts on a single page.

use crate::enrich::{EnrichError, PageEnricher};
use crate::flatten::{flatten, FlattenError};
use crate::index::{SectionSink, SinkError, WriteResult};
use crate::source::RawPage;
use crate::types::PageReport;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Any fault that fails one page.
#[derive(Debug, Error)]
pub enum PageError {
    #[error(transparent)]
    Enrich(#[from] EnrichError),

    #[error(transparent)]
    Flatten(#[from] FlattenError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Drives one page at a time through the pipeline. Counters are plain
/// integers: a processor belongs to exactly one worker thread.
pub struct PageProcessor<S: SectionSink> {
    enricher: Arc<dyn PageEnricher>,
    sink: S,
    index_whole_pages: bool,
    processed_pages: u64,
    error_pages: u64,
}

impl<S: SectionSink> PageProcessor<S> {
    pub fn new(enricher: Arc<dyn PageEnricher>, sink: S, index_whole_pages: bool) -> Self {
        Self {
            enricher,
            sink,
            index_whole_pages,
            processed_pages: 0,
            error_pages: 0,
        }
    }

    /// Process one page and update the counters. Never fails the run.
    pub fn process_page(&mut self, page: &RawPage) {
        match self.try_process(page) {
            Ok(result) if result.all_ok() => {
                debug!(page = page.title.as_str(), sections = result.written, "indexed");
                self.processed_pages += 1;
            }
            Ok(result) => {
                warn!(
                    page = page.title.as_str(),
                    failed = result.failed,
                    "page indexed with failed sections"
                );
                self.error_pages += 1;
            }
            Err(e) => {
                warn!(page = page.title.as_str(), "page failed: {}", e);
                self.error_pages += 1;
            }
        }
    }

    fn try_process(&self, page: &RawPage) -> Result<WriteResult, PageError> {
        let root = self.enricher.enrich(page)?;
        let records = flatten(&root, &page.title)?;

        if self.index_whole_pages {
            self.sink.write_page(&page.title, &page.content)?;
        }

        Ok(self.sink.write(&records, &page.title)?)
    }

    /// Counters accumulated so far.
    pub fn report(&self) -> PageReport {
        PageReport {
            processed_pages: self.processed_pages,
            error_pages: self.error_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::PreEnriched;
    use crate::pipeline::testing::MemorySink;

    fn page(title: &str, content: &str) -> RawPage {
        RawPage {
            title: title.to_string(),
            content: content.to_string(),
        }
    }

    fn good_page() -> RawPage {
        page(
            "Foo",
            r#"{
                "sections": [
                    {"title": "Intro", "ancestors": []},
                    {"title": "History", "ancestors": [0]}
                ],
                "categories": {"content": ["Country"]}
            }"#,
        )
    }

    #[test]
    fn test_good_page_counts_processed() {
        let sink = MemorySink::new();
        let mut processor = PageProcessor::new(Arc::new(PreEnriched), sink.clone(), false);

        processor.process_page(&good_page());

        let report = processor.report();
        assert_eq!(report.processed_pages, 1);
        assert_eq!(report.error_pages, 0);

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].section_title, "Intro");
        assert_eq!(records[1].ancestor_titles, vec!["Intro".to_string()]);
    }

    #[test]
    fn test_missing_sections_counts_error() {
        let sink = MemorySink::new();
        let mut processor = PageProcessor::new(Arc::new(PreEnriched), sink.clone(), false);

        processor.process_page(&page("Bad", r#"{"categories": {"content": []}}"#));

        let report = processor.report();
        assert_eq!(report.processed_pages, 0);
        assert_eq!(report.error_pages, 1);
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_enrich_failure_counts_error() {
        let sink = MemorySink::new();
        let mut processor = PageProcessor::new(Arc::new(PreEnriched), sink.clone(), false);

        processor.process_page(&page("NotJson", "== wikitext =="));

        assert_eq!(processor.report().error_pages, 1);
    }

    #[test]
    fn test_sink_error_counts_error() {
        let sink = MemorySink::new().failing();
        let mut processor = PageProcessor::new(Arc::new(PreEnriched), sink, false);

        processor.process_page(&good_page());

        assert_eq!(processor.report().error_pages, 1);
    }

    #[test]
    fn test_partial_write_failure_counts_error() {
        let sink = MemorySink::new().dropping(1);
        let mut processor = PageProcessor::new(Arc::new(PreEnriched), sink, false);

        processor.process_page(&good_page());

        let report = processor.report();
        assert_eq!(report.processed_pages, 0);
        assert_eq!(report.error_pages, 1);
    }

    #[test]
    fn test_empty_section_list_is_a_processed_page() {
        let sink = MemorySink::new();
        let mut processor = PageProcessor::new(Arc::new(PreEnriched), sink.clone(), false);

        processor.process_page(&page("Empty", r#"{"sections": []}"#));

        assert_eq!(processor.report().processed_pages, 1);
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_whole_page_indexing_is_opt_in() {
        let sink = MemorySink::new();
        let mut processor = PageProcessor::new(Arc::new(PreEnriched), sink.clone(), true);
        processor.process_page(&good_page());
        assert_eq!(sink.pages(), vec!["Foo".to_string()]);

        let sink2 = MemorySink::new();
        let mut processor = PageProcessor::new(Arc::new(PreEnriched), sink2.clone(), false);
        processor.process_page(&good_page());
        assert!(sink2.pages().is_empty());
    }

    #[test]
    fn test_counters_accumulate_across_pages() {
        let sink = MemorySink::new();
        let mut processor = PageProcessor::new(Arc::new(PreEnriched), sink, false);

        processor.process_page(&good_page());
        processor.process_page(&page("Bad", "{}"));
        processor.process_page(&good_page());

        let report = processor.report();
        assert_eq!(report.processed_pages, 2);
        assert_eq!(report.error_pages, 1);
        assert_eq!(report.total_pages(), 3);
    }
}
