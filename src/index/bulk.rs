//! Bulk-write HTTP sink
//!
//! Talks to an Elasticsearch-compatible search engine through its native
//! REST API: one NDJSON `_bulk` request per page for section records,
//! plus individual whole-page documents in a separate index. The client
//! is shared across worker threads; every request carries the configured
//! timeout so a hung backend fails the page instead of wedging the run.

use super::{SectionSink, SinkError, WriteResult};
use crate::config::BulkConfig;
use crate::types::SectionRecord;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

/// Section-record sink backed by a bulk-write search engine.
#[derive(Clone)]
pub struct BulkSink {
    client: Client,
    endpoint: String,
    section_index: String,
    page_index: String,
}

/// Response shape of a `_bulk` request: a global error flag plus one
/// item per operation.
#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<BulkItem>,
}

#[derive(Debug, Deserialize)]
struct BulkItem {
    index: Option<BulkItemStatus>,
}

#[derive(Debug, Deserialize)]
struct BulkItemStatus {
    status: u16,
}

impl BulkSink {
    /// Build a sink from configuration. Does not touch the network; use
    /// [`BulkSink::bootstrap`] before processing pages.
    pub fn connect(config: &BulkConfig) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SinkError::Request(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            section_index: config.section_index.clone(),
            page_index: config.page_index.clone(),
        })
    }

    /// Prepare the backend indexes: check existence, delete when erasing,
    /// and create each index with its own mapping. The configured mapping
    /// applies to the section index only; the page index always gets the
    /// built-in title/content mapping. Runs once before any page is
    /// processed, never concurrently with indexing.
    pub fn bootstrap(&self, erase: bool, mapping: Option<&str>) -> Result<(), SinkError> {
        let section_body = match mapping {
            Some(raw) => serde_json::from_str::<Value>(raw)
                .map_err(|e| SinkError::Commit(format!("invalid index mapping: {}", e)))?,
            None => default_section_mapping(),
        };

        for (index, body) in [
            (&self.section_index, &section_body),
            (&self.page_index, &default_page_mapping()),
        ] {
            self.create_index(index, body, erase)?;
        }
        Ok(())
    }

    fn create_index(&self, index: &str, body: &Value, erase: bool) -> Result<(), SinkError> {
        let url = format!("{}/{}", self.endpoint, index);

        let exists = self
            .client
            .head(&url)
            .send()
            .map_err(|e| SinkError::Request(e.to_string()))?
            .status()
            .is_success();

        if exists && !erase {
            debug!("index '{}' already exists, appending", index);
            return Ok(());
        }

        if exists {
            info!("erasing index '{}'", index);
            let resp = self
                .client
                .delete(&url)
                .send()
                .map_err(|e| SinkError::Request(e.to_string()))?;
            if !resp.status().is_success() {
                return Err(SinkError::Commit(format!(
                    "could not delete index '{}': HTTP {}",
                    index,
                    resp.status()
                )));
            }
        }

        info!("creating index '{}'", index);
        let resp = self
            .client
            .put(&url)
            .json(body)
            .send()
            .map_err(|e| SinkError::Request(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(SinkError::Commit(format!(
                "could not create index '{}': HTTP {}",
                index,
                resp.status()
            )));
        }
        Ok(())
    }
}

impl SectionSink for BulkSink {
    fn write(&self, records: &[SectionRecord], page_title: &str) -> Result<WriteResult, SinkError> {
        // No records means no round trip
        if records.is_empty() {
            return Ok(WriteResult::default());
        }

        let body = bulk_body(&self.section_index, records)?;
        let url = format!("{}/_bulk", self.endpoint);

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/x-ndjson")
            .body(body)
            .send()
            .map_err(|e| SinkError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Commit(format!(
                "bulk commit for '{}' returned HTTP {}",
                page_title, status
            )));
        }

        let parsed: BulkResponse = response
            .json()
            .map_err(|e| SinkError::Commit(format!("unreadable bulk response: {}", e)))?;

        let failed = count_failures(&parsed).min(records.len());
        if parsed.errors && failed == 0 {
            // The backend flagged failures but the items were not
            // attributable; treat the whole page as failed.
            return Err(SinkError::Commit(format!(
                "bulk commit for '{}' reported unattributable failures",
                page_title
            )));
        }
        debug!(
            page = page_title,
            written = records.len() - failed,
            failed,
            "bulk commit"
        );
        Ok(WriteResult {
            written: records.len() - failed,
            failed,
        })
    }

    fn write_page(&self, title: &str, content: &str) -> Result<(), SinkError> {
        let url = format!("{}/{}/_doc", self.endpoint, self.page_index);
        let doc = json!({"title": title, "content": content});

        let response = self
            .client
            .post(&url)
            .json(&doc)
            .send()
            .map_err(|e| SinkError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SinkError::Commit(format!(
                "page document for '{}' returned HTTP {}",
                title,
                response.status()
            )));
        }
        Ok(())
    }
}

/// Serialize one page's records as an NDJSON `_bulk` body: an action
/// line followed by a document line per record.
fn bulk_body(index: &str, records: &[SectionRecord]) -> Result<String, SinkError> {
    let action = json!({"index": {"_index": index}}).to_string();

    let mut body = String::with_capacity(records.len() * 256);
    for record in records {
        body.push_str(&action);
        body.push('\n');
        let doc = serde_json::to_string(record)
            .map_err(|e| SinkError::Commit(format!("unserializable record: {}", e)))?;
        body.push_str(&doc);
        body.push('\n');
    }
    Ok(body)
}

/// Count failed operations in a bulk response. Items with a non-2xx
/// status, or ones we cannot interpret, count as failures.
fn count_failures(response: &BulkResponse) -> usize {
    if !response.errors {
        return 0;
    }
    response
        .items
        .iter()
        .filter(|item| {
            item.index
                .as_ref()
                .map_or(true, |status| status.status >= 300)
        })
        .count()
}

/// Built-in mapping used when no mapping file is configured: keyword
/// fields for page/category/ancestor names, text for section titles,
/// nested name/url objects for links and references.
fn default_section_mapping() -> Value {
    json!({
        "settings": {
            "analysis": {
                "normalizer": {
                    "lowercase_normalizer": {
                        "type": "custom",
                        "filter": ["lowercase"]
                    }
                }
            }
        },
        "mappings": {
            "properties": {
                "wikipedia_page": {"type": "keyword", "normalizer": "lowercase_normalizer"},
                "wikipedia_categories": {"type": "keyword", "normalizer": "lowercase_normalizer"},
                "section": {"type": "text"},
                "ancestors": {"type": "keyword"},
                "links": {
                    "properties": {
                        "name": {"type": "text"},
                        "url": {"type": "keyword"}
                    }
                },
                "references": {
                    "properties": {
                        "name": {"type": "text"},
                        "url": {"type": "keyword"}
                    }
                }
            }
        }
    })
}

/// Mapping for the whole-page index: one title/content document per page.
fn default_page_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                "title": {"type": "text"},
                "content": {"type": "text"}
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LinkOut;

    fn record(section: &str) -> SectionRecord {
        SectionRecord {
            page_title: "Foo".to_string(),
            categories: vec!["Country".to_string()],
            section_title: section.to_string(),
            ancestor_titles: vec![],
            links: vec![LinkOut {
                name: "__MISSING__".to_string(),
                url: "http://x".to_string(),
            }],
            references: vec![],
        }
    }

    fn test_sink() -> BulkSink {
        BulkSink::connect(&BulkConfig {
            // Unroutable on purpose: these tests must not touch the network
            endpoint: "http://127.0.0.1:1".to_string(),
            ..BulkConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_bulk_body_shape() {
        let records = vec![record("Intro"), record("History")];
        let body = bulk_body("wiki-sections", &records).unwrap();

        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 4);

        let action: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(action["index"]["_index"], "wiki-sections");

        let doc: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(doc["wikipedia_page"], "Foo");
        assert_eq!(doc["section"], "Intro");
        assert_eq!(doc["links"][0]["url"], "http://x");

        let doc2: Value = serde_json::from_str(lines[3]).unwrap();
        assert_eq!(doc2["section"], "History");

        assert!(body.ends_with('\n'));
    }

    #[test]
    fn test_zero_records_skips_commit() {
        // The endpoint is unroutable, so a success here proves no
        // request was issued.
        let sink = test_sink();
        let result = sink.write(&[], "Empty Page").unwrap();
        assert_eq!(result, WriteResult::default());
        assert!(result.all_ok());
    }

    #[test]
    fn test_count_failures_clean_response() {
        let resp: BulkResponse = serde_json::from_str(
            r#"{"took": 3, "errors": false, "items": [
                {"index": {"status": 201}},
                {"index": {"status": 201}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(count_failures(&resp), 0);
    }

    #[test]
    fn test_count_failures_mixed_response() {
        let resp: BulkResponse = serde_json::from_str(
            r#"{"took": 3, "errors": true, "items": [
                {"index": {"status": 201}},
                {"index": {"status": 429, "error": {"type": "es_rejected_execution_exception"}}},
                {"index": {"status": 400, "error": {"type": "mapper_parsing_exception"}}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(count_failures(&resp), 2);
    }

    #[test]
    fn test_default_mapping_covers_record_fields() {
        let mapping = default_section_mapping();
        let props = &mapping["mappings"]["properties"];
        for field in [
            "wikipedia_page",
            "wikipedia_categories",
            "section",
            "ancestors",
            "links",
            "references",
        ] {
            assert!(!props[field].is_null(), "missing mapping for {}", field);
        }
    }

    #[test]
    fn test_section_and_page_mappings_are_distinct() {
        let sections = default_section_mapping();
        let pages = default_page_mapping();

        // Page documents carry only title and content; section fields
        // stay out of the page index and vice versa.
        let page_props = &pages["mappings"]["properties"];
        assert!(!page_props["title"].is_null());
        assert!(!page_props["content"].is_null());
        assert!(page_props["wikipedia_page"].is_null());

        let section_props = &sections["mappings"]["properties"];
        assert!(section_props["title"].is_null());
        assert!(section_props["content"].is_null());
    }
}
