//! Multi-worker pipeline driver
//!
//! Reads pages sequentially from a source and fans them out over a
//! bounded channel to worker threads, one processor and one sink handle
//! per worker. Pages are processed in no particular order across
//! workers; within a worker, each page's sections are written in
//! document order.

use super::processor::PageProcessor;
use crate::config::PipelineConfig;
use crate::enrich::PageEnricher;
use crate::index::{SectionSink, SinkError};
use crate::source::{PageSource, RawPage};
use crate::types::PageReport;
use crossbeam_channel::bounded;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Run the pipeline to completion over one source.
///
/// `make_sink` is called once per worker; sinks are expected to be
/// cheap handles over shared backend state. Source read errors count as
/// error pages.
pub fn run<S, F>(
    source: &mut dyn PageSource,
    enricher: Arc<dyn PageEnricher>,
    make_sink: F,
    config: &PipelineConfig,
) -> Result<PageReport, SinkError>
where
    S: SectionSink + 'static,
    F: Fn() -> Result<S, SinkError>,
{
    let source_name = source.source_name().to_string();
    info!(
        source = source_name.as_str(),
        workers = config.workers,
        "starting pipeline"
    );

    let progress = PipelineProgress::new(config.quiet);
    let (page_tx, page_rx) = bounded::<RawPage>(config.workers * 4);
    let started = Instant::now();
    let mut read_errors: u64 = 0;

    let mut report = std::thread::scope(|scope| -> Result<PageReport, SinkError> {
        let mut workers = Vec::with_capacity(config.workers);
        for _ in 0..config.workers {
            let rx = page_rx.clone();
            let mut processor =
                PageProcessor::new(enricher.clone(), make_sink()?, config.index_whole_pages);
            let progress = &progress;
            workers.push(scope.spawn(move || {
                for page in rx {
                    processor.process_page(&page);
                    progress.page_done();
                }
                processor.report()
            }));
        }
        drop(page_rx);

        let mut fed: usize = 0;
        for page in source.iter_pages() {
            if let Some(max) = config.max_pages {
                if fed >= max {
                    info!("reached page limit of {}", max);
                    break;
                }
            }
            match page {
                Ok(page) => {
                    if page_tx.send(page).is_err() {
                        // All workers gone; nothing left to feed
                        break;
                    }
                    fed += 1;
                }
                Err(e) => {
                    warn!("failed to read page: {}", e);
                    read_errors += 1;
                    progress.page_done();
                }
            }
        }
        drop(page_tx);

        let mut total = PageReport::default();
        for worker in workers {
            match worker.join() {
                Ok(worker_report) => total.merge(worker_report),
                Err(_) => error!("worker thread panicked"),
            }
        }
        Ok(total)
    })?;

    report.error_pages += read_errors;
    progress.finish();

    let elapsed = started.elapsed().as_secs_f64();
    let rate = if elapsed > 0.0 {
        report.total_pages() as f64 / elapsed
    } else {
        0.0
    };
    info!(
        source = source_name.as_str(),
        processed = report.processed_pages,
        errored = report.error_pages,
        "pipeline finished ({:.1} pages/s)",
        rate
    );

    Ok(report)
}

/// Spinner-based progress display shared by the workers.
struct PipelineProgress {
    bar: Option<ProgressBar>,
    pages: AtomicU64,
    start: Instant,
}

impl PipelineProgress {
    fn new(quiet: bool) -> Self {
        let bar = if quiet {
            None
        } else {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            Some(pb)
        };
        Self {
            bar,
            pages: AtomicU64::new(0),
            start: Instant::now(),
        }
    }

    fn page_done(&self) {
        let done = self.pages.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(ref pb) = self.bar {
            pb.inc(1);
            if done % 100 == 0 {
                let elapsed = self.start.elapsed().as_secs_f64();
                let rate = if elapsed > 0.0 {
                    done as f64 / elapsed
                } else {
                    0.0
                };
                pb.set_message(format!("{} pages | {:.1} pages/s", done, rate));
            }
        }
    }

    fn finish(&self) {
        if let Some(ref pb) = self.bar {
            pb.finish_and_clear();
        }
    }
}
