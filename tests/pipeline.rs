//! End-to-end pipeline tests
//!
//! Drive the full ingest path (dump file, enrichment, flattening,
//! faceted index) and check the per-page accounting and the resulting
//! index contents.

use std::io::Write;
use std::sync::Arc;
use tempfile::TempDir;
use wikidex::{
    config::PipelineConfig,
    enrich::PreEnriched,
    index::FacetSink,
    pipeline,
    source::JsonlSource,
};

const DUMP: &str = r#"{"title": "Germany", "document": {"sections": [{"title": "Intro", "ancestors": []}, {"title": "History", "ancestors": [0]}, {"title": "Middle Ages", "ancestors": [0, 1]}], "categories": {"content": ["Country", "Europe"]}}}
{"title": "Broken", "document": {"no_sections_here": true}}
{"title": "Stub", "document": {"sections": []}}
{"title": "France", "document": {"sections": [{"title": "Intro", "links": [{"url": "http://a", "section_idx": 1}]}]}}
"#;

fn pipeline_config(workers: usize) -> PipelineConfig {
    PipelineConfig {
        workers,
        max_pages: None,
        index_whole_pages: false,
        quiet: true,
    }
}

fn write_dump(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_dump_to_faceted_index() {
    let dir = TempDir::new().unwrap();
    let dump = write_dump(&dir, "dump.jsonl", DUMP);
    let index_dir = dir.path().join("facet");

    let sink = FacetSink::open_dir(&index_dir, false).unwrap();
    let mut source = JsonlSource::open(&dump).unwrap();

    let report = pipeline::run(
        &mut source,
        Arc::new(PreEnriched),
        || Ok(sink.clone()),
        &pipeline_config(2),
    )
    .unwrap();

    // "Broken" has no sections array; the other three pages succeed,
    // including "Stub" whose empty section list is valid.
    assert_eq!(report.processed_pages, 3);
    assert_eq!(report.error_pages, 1);

    sink.commit().unwrap();
    // Three sections from Germany plus one from France
    assert_eq!(sink.num_docs().unwrap(), 4);
}

#[test]
fn test_index_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let dump = write_dump(&dir, "dump.jsonl", DUMP);
    let index_dir = dir.path().join("facet");

    {
        let sink = FacetSink::open_dir(&index_dir, false).unwrap();
        let mut source = JsonlSource::open(&dump).unwrap();
        pipeline::run(
            &mut source,
            Arc::new(PreEnriched),
            || Ok(sink.clone()),
            &pipeline_config(1),
        )
        .unwrap();
        sink.commit().unwrap();
    }

    let reopened = FacetSink::open_dir(&index_dir, false).unwrap();
    assert_eq!(reopened.num_docs().unwrap(), 4);

    let erased = FacetSink::open_dir(&index_dir, true).unwrap();
    assert_eq!(erased.num_docs().unwrap(), 0);
}

#[test]
fn test_compressed_dump_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dump.jsonl.bz2");

    let file = std::fs::File::create(&path).unwrap();
    let mut encoder = bzip2::write::BzEncoder::new(file, bzip2::Compression::default());
    encoder.write_all(DUMP.as_bytes()).unwrap();
    encoder.finish().unwrap();

    let sink = FacetSink::new_in_memory().unwrap();
    let mut source = JsonlSource::open(&path).unwrap();

    let report = pipeline::run(
        &mut source,
        Arc::new(PreEnriched),
        || Ok(sink.clone()),
        &pipeline_config(2),
    )
    .unwrap();

    assert_eq!(report.total_pages(), 4);
    assert_eq!(report.processed_pages, 3);
}

#[test]
fn test_page_limit_stops_early() {
    let dir = TempDir::new().unwrap();
    let dump = write_dump(&dir, "dump.jsonl", DUMP);

    let sink = FacetSink::new_in_memory().unwrap();
    let mut source = JsonlSource::open(&dump).unwrap();

    let mut config = pipeline_config(1);
    config.max_pages = Some(1);

    let report = pipeline::run(
        &mut source,
        Arc::new(PreEnriched),
        || Ok(sink.clone()),
        &config,
    )
    .unwrap();

    assert_eq!(report.total_pages(), 1);
    assert_eq!(report.processed_pages, 1);
}
