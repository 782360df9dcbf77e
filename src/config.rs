//! Configuration for wikidex

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration, loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Pipeline / worker configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Bulk-write search engine backend
    #[serde(default)]
    pub bulk: BulkConfig,
    /// Faceted local index backend
    #[serde(default)]
    pub facet: FacetConfig,
    /// Enrichment service boundary
    #[serde(default)]
    pub enricher: EnricherConfig,
}

/// Worker and accounting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of worker threads, each with its own processor
    pub workers: usize,
    /// Stop after this many pages (None = whole dump)
    #[serde(default)]
    pub max_pages: Option<usize>,
    /// Also index one whole-page document per page (bulk backend only)
    #[serde(default)]
    pub index_whole_pages: bool,
    /// Suppress the progress display
    #[serde(default)]
    pub quiet: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            max_pages: None,
            index_whole_pages: false,
            quiet: false,
        }
    }
}

/// Bulk-write search engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkConfig {
    /// Base URL of the search engine
    pub endpoint: String,
    /// Index receiving one document per section
    pub section_index: String,
    /// Index receiving one document per page
    pub page_index: String,
    /// Request timeout applied to every commit
    pub timeout_secs: u64,
    /// Optional JSON file with index settings and mappings; a built-in
    /// mapping is used when unset
    #[serde(default)]
    pub mapping_path: Option<PathBuf>,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9200".to_string(),
            section_index: "wiki-sections".to_string(),
            page_index: "wiki-pages".to_string(),
            timeout_secs: 30,
            mapping_path: None,
        }
    }
}

/// Faceted local index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacetConfig {
    /// Directory holding the index files
    pub index_dir: PathBuf,
    /// Writer heap before a segment is flushed
    pub writer_heap_bytes: usize,
}

impl Default for FacetConfig {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from(".wikidex/facet"),
            writer_heap_bytes: 50_000_000,
        }
    }
}

/// Enrichment service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnricherConfig {
    /// HTTP endpoint of the enrichment service; when unset, pages are
    /// expected to already carry enriched JSON
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Request timeout per page
    pub timeout_secs: u64,
}

impl Default for EnricherConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 60,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all fields, collecting every error so the user can fix
    /// them in one pass.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.pipeline.workers == 0 {
            errors.push("pipeline workers must be positive".to_string());
        }
        if self.bulk.endpoint.is_empty() {
            errors.push("bulk endpoint must not be empty".to_string());
        }
        if self.bulk.section_index.is_empty() {
            errors.push("bulk section_index must not be empty".to_string());
        }
        if self.bulk.page_index.is_empty() {
            errors.push("bulk page_index must not be empty".to_string());
        }
        if self.bulk.timeout_secs == 0 {
            errors.push("bulk timeout_secs must be positive".to_string());
        }
        // tantivy refuses writer heaps below 15MB
        if self.facet.writer_heap_bytes < 15_000_000 {
            errors.push("facet writer_heap_bytes must be at least 15000000".to_string());
        }
        if self.enricher.timeout_secs == 0 {
            errors.push("enricher timeout_secs must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("Invalid configuration:\n  - {}", errors.join("\n  - "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(config.pipeline.workers > 0);
        assert_eq!(config.bulk.section_index, "wiki-sections");
        assert!(config.enricher.endpoint.is_none());
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = Config::default();
        config.pipeline.workers = 0;
        config.bulk.endpoint = String::new();
        config.facet.writer_heap_bytes = 1;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("workers"));
        assert!(err.contains("endpoint"));
        assert!(err.contains("writer_heap_bytes"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
[pipeline]
workers = 2

[bulk]
endpoint = "http://es.internal:9200"
section_index = "sections"
page_index = "pages"
timeout_secs = 10
"#,
        )
        .unwrap();

        assert_eq!(config.pipeline.workers, 2);
        assert_eq!(config.bulk.endpoint, "http://es.internal:9200");
        assert_eq!(config.facet.writer_heap_bytes, 50_000_000);
        assert!(config.validate().is_ok());
    }
}
