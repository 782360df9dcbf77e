//! Page sources
//!
//! A [`PageSource`] yields raw pages for the pipeline. The shipped
//! implementation reads JSON-lines dumps, optionally bzip2-compressed,
//! where each line carries a page title plus either the enriched JSON
//! document or raw wikitext content.

use bzip2::read::BzDecoder;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One raw page as handed to the enricher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    /// Page title
    pub title: String,
    /// Page body: enriched JSON or raw wikitext, depending on the dump
    pub content: String,
}

/// Errors reading pages out of a dump.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid dump line: {0}")]
    Format(String),
}

/// A stream of raw pages. Implementations read sequentially; the driver
/// fans pages out to workers.
pub trait PageSource: Send {
    /// Iterate over the pages in the dump.
    fn iter_pages(&mut self) -> Box<dyn Iterator<Item = Result<RawPage, SourceError>> + '_>;

    /// Source name for display.
    fn source_name(&self) -> &str;
}

/// JSON-lines dump source. Each line is an object with a `title` and
/// either a `document` object (enriched JSON) or a `content` string.
pub struct JsonlSource {
    path: PathBuf,
    lines: LineReader,
}

enum LineReader {
    Plain(Lines<BufReader<File>>),
    Bzip2(Lines<BufReader<BzDecoder<File>>>),
}

impl LineReader {
    fn next_line(&mut self) -> Option<std::io::Result<String>> {
        match self {
            LineReader::Plain(lines) => lines.next(),
            LineReader::Bzip2(lines) => lines.next(),
        }
    }
}

impl JsonlSource {
    /// Open a `.jsonl` or `.jsonl.bz2` dump file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;

        let is_bz2 = path
            .extension()
            .map(|ext| ext == "bz2")
            .unwrap_or(false);

        let lines = if is_bz2 {
            let decoder = BzDecoder::new(file);
            LineReader::Bzip2(BufReader::with_capacity(1024 * 1024, decoder).lines())
        } else {
            LineReader::Plain(BufReader::with_capacity(1024 * 1024, file).lines())
        };

        Ok(Self { path, lines })
    }

    fn parse_line(line: &str) -> Result<RawPage, SourceError> {
        let value: Value = serde_json::from_str(line)?;

        let title = value
            .get("title")
            .and_then(Value::as_str)
            .ok_or_else(|| SourceError::Format("line has no title".to_string()))?
            .to_string();

        let content = if let Some(document) = value.get("document") {
            document.to_string()
        } else if let Some(content) = value.get("content").and_then(Value::as_str) {
            content.to_string()
        } else {
            return Err(SourceError::Format(format!(
                "page '{}' has neither document nor content",
                title
            )));
        };

        Ok(RawPage { title, content })
    }
}

impl PageSource for JsonlSource {
    fn iter_pages(&mut self) -> Box<dyn Iterator<Item = Result<RawPage, SourceError>> + '_> {
        Box::new(JsonlIterator { source: self })
    }

    fn source_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("jsonl dump")
    }
}

struct JsonlIterator<'a> {
    source: &'a mut JsonlSource,
}

impl Iterator for JsonlIterator<'_> {
    type Item = Result<RawPage, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.source.lines.next_line()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(JsonlSource::parse_line(&line));
        }
    }
}
