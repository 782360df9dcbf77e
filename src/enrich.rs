//! Wiki markup enrichment boundary
//!
//! The pipeline consumes JSON document trees produced by an external
//! enrichment service; this module is only the seam. [`PreEnriched`]
//! covers dumps whose pages already carry the enriched JSON, and
//! [`RemoteEnricher`] calls out to an enrichment HTTP service for raw
//! wikitext. Either way the enricher is opaque to the pipeline: any
//! failure is fatal for the page and nothing else.

use crate::config::EnricherConfig;
use crate::source::RawPage;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Opaque enrichment failure: malformed markup, unreachable service,
/// unparseable response. Always fatal for the page.
#[derive(Debug, Error)]
#[error("enrichment failed: {0}")]
pub struct EnrichError(pub String);

/// Produces the enriched JSON document tree for one raw page.
pub trait PageEnricher: Send + Sync {
    fn enrich(&self, page: &RawPage) -> Result<Value, EnrichError>;
}

/// Enricher for pages whose content is already the enriched JSON
/// document, e.g. dumps exported by a separate enrichment run.
pub struct PreEnriched;

impl PageEnricher for PreEnriched {
    fn enrich(&self, page: &RawPage) -> Result<Value, EnrichError> {
        serde_json::from_str(&page.content)
            .map_err(|e| EnrichError(format!("page '{}' is not valid JSON: {}", page.title, e)))
    }
}

/// Enricher calling an external enrichment HTTP service with the raw
/// wikitext, expecting the enriched JSON tree back.
pub struct RemoteEnricher {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl RemoteEnricher {
    pub fn connect(config: &EnricherConfig) -> Result<Self, EnrichError> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| EnrichError("no enricher endpoint configured".to_string()))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EnrichError(e.to_string()))?;
        Ok(Self { client, endpoint })
    }
}

impl PageEnricher for RemoteEnricher {
    fn enrich(&self, page: &RawPage) -> Result<Value, EnrichError> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("title", page.title.as_str())])
            .body(page.content.clone())
            .send()
            .map_err(|e| EnrichError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EnrichError(format!(
                "enricher returned HTTP {} for '{}'",
                response.status(),
                page.title
            )));
        }

        response.json().map_err(|e| EnrichError(e.to_string()))
    }
}
