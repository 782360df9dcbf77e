//! Index backends
//!
//! Two independent consumers of the flattened record stream sit behind
//! the [`SectionSink`] capability: a remote bulk-write search engine
//! ([`bulk::BulkSink`]) and a local faceted tantivy index
//! ([`facet::FacetSink`]). The flattener knows nothing about either;
//! the driver picks one per run.

pub mod bulk;
pub mod facet;

use crate::types::SectionRecord;
use thiserror::Error;

pub use bulk::BulkSink;
pub use facet::FacetSink;

/// Outcome of writing one page's records to a backend.
///
/// A failed count of zero means the page indexed cleanly; any failure
/// marks the whole page as errored. There is no field-level partial
/// success reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteResult {
    /// Records accepted by the backend
    pub written: usize,
    /// Records the backend rejected or dropped
    pub failed: usize,
}

impl WriteResult {
    /// True when every record of the page was accepted.
    pub fn all_ok(&self) -> bool {
        self.failed == 0
    }
}

/// Errors raised by a backend sink. Always fatal for the current page,
/// never for the run.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The backend could not be reached or the request timed out
    #[error("backend request failed: {0}")]
    Request(String),

    /// The backend answered but rejected the commit outright
    #[error("backend rejected commit: {0}")]
    Commit(String),

    /// Local index failure (tantivy)
    #[error("index error: {0}")]
    Index(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Capability shared by both backends: write one page's flattened
/// records, blocking until the backend commit completes.
///
/// Implementations are cheap `Clone` handles over shared backend state
/// (one HTTP client, one index writer) so each worker thread can hold
/// its own handle while per-page counters stay confined to the worker.
pub trait SectionSink: Send {
    /// Write all records for one page. Zero records is a trivial
    /// success and must not round-trip to the backend.
    fn write(&self, records: &[SectionRecord], page_title: &str) -> Result<WriteResult, SinkError>;

    /// Index a whole-page document, for backends that support it.
    fn write_page(&self, _title: &str, _content: &str) -> Result<(), SinkError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_result_all_ok() {
        assert!(WriteResult::default().all_ok());
        assert!(WriteResult {
            written: 4,
            failed: 0
        }
        .all_ok());
        assert!(!WriteResult {
            written: 3,
            failed: 1
        }
        .all_ok());
    }
}
