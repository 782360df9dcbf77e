//! wikidex command line interface

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use wikidex::{
    config::Config,
    enrich::{PageEnricher, PreEnriched, RemoteEnricher},
    index::{BulkSink, FacetSink},
    pipeline,
    source::JsonlSource,
    types::PageReport,
};

#[derive(Parser)]
#[command(name = "wikidex")]
#[command(about = "Populate search indexes with Wikipedia section records")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "wikidex.toml")]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index sections into the bulk-write search engine
    Bulk {
        /// Path to the input dump (.jsonl or .jsonl.bz2)
        #[arg(short, long)]
        input: PathBuf,

        /// Search engine base URL (overrides config)
        #[arg(short, long)]
        endpoint: Option<String>,

        /// Erase the target indexes instead of appending
        #[arg(long)]
        erase: bool,

        /// Also index one whole-page document per page
        #[arg(long)]
        whole_pages: bool,

        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<usize>,

        /// Quiet mode (no progress output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Index sections into the faceted local index
    Facet {
        /// Path to the input dump (.jsonl or .jsonl.bz2)
        #[arg(short, long)]
        input: PathBuf,

        /// Index directory (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Erase the existing index instead of appending
        #[arg(long)]
        erase: bool,

        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<usize>,

        /// Quiet mode (no progress output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Write a default configuration file
    Init {
        /// Output directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::default()
    };

    match cli.command {
        Commands::Bulk {
            input,
            endpoint,
            erase,
            whole_pages,
            max_pages,
            quiet,
        } => {
            if let Some(endpoint) = endpoint {
                config.bulk.endpoint = endpoint;
            }
            if whole_pages {
                config.pipeline.index_whole_pages = true;
            }
            apply_pipeline_overrides(&mut config, max_pages, quiet);
            run_bulk(config, input, erase)
        }
        Commands::Facet {
            input,
            output,
            erase,
            max_pages,
            quiet,
        } => {
            if let Some(output) = output {
                config.facet.index_dir = output;
            }
            apply_pipeline_overrides(&mut config, max_pages, quiet);
            run_facet(config, input, erase)
        }
        Commands::Init { path } => init_config(path),
    }
}

/// Fold CLI flags into the loaded configuration. An absent flag leaves
/// the configured value untouched.
fn apply_pipeline_overrides(config: &mut Config, max_pages: Option<usize>, quiet: bool) {
    if let Some(max) = max_pages {
        config.pipeline.max_pages = Some(max);
    }
    if quiet {
        config.pipeline.quiet = true;
    }
}

fn make_enricher(config: &Config) -> Result<Arc<dyn PageEnricher>> {
    match config.enricher.endpoint {
        Some(_) => {
            let enricher = RemoteEnricher::connect(&config.enricher)?;
            Ok(Arc::new(enricher))
        }
        None => Ok(Arc::new(PreEnriched)),
    }
}

fn run_bulk(config: Config, input: PathBuf, erase: bool) -> Result<()> {
    let sink = BulkSink::connect(&config.bulk)?;

    let mapping = match &config.bulk.mapping_path {
        Some(path) => Some(std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read mapping file '{}': {}", path.display(), e)
        })?),
        None => None,
    };
    sink.bootstrap(erase, mapping.as_deref())?;

    let enricher = make_enricher(&config)?;
    let mut source = JsonlSource::open(&input)?;

    info!("indexing into {}", config.bulk.endpoint);
    let report = pipeline::run(
        &mut source,
        enricher,
        || Ok(sink.clone()),
        &config.pipeline,
    )?;

    print_report(&report);
    Ok(())
}

fn run_facet(config: Config, input: PathBuf, erase: bool) -> Result<()> {
    let sink = FacetSink::open(&config.facet, erase)?;
    let enricher = make_enricher(&config)?;
    let mut source = JsonlSource::open(&input)?;

    info!("indexing into {}", config.facet.index_dir.display());
    let report = pipeline::run(
        &mut source,
        enricher,
        || Ok(sink.clone()),
        &config.pipeline,
    )?;

    // Single commit at the end of the run
    sink.commit()?;

    print_report(&report);
    println!("Documents in index: {}", sink.num_docs()?);
    Ok(())
}

fn init_config(path: PathBuf) -> Result<()> {
    let config_path = path.join("wikidex.toml");
    let content = toml::to_string_pretty(&Config::default())?;
    std::fs::write(&config_path, content)?;
    println!("Created configuration file: {}", config_path.display());
    Ok(())
}

fn print_report(report: &PageReport) {
    println!("\nIngestion complete");
    println!("==================");
    println!("Pages processed: {}", report.processed_pages);
    println!("Pages errored:   {}", report.error_pages);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_flags_keep_configured_values() {
        let mut config = Config::default();
        config.pipeline.max_pages = Some(100);
        config.pipeline.quiet = true;

        apply_pipeline_overrides(&mut config, None, false);

        assert_eq!(config.pipeline.max_pages, Some(100));
        assert!(config.pipeline.quiet);
    }

    #[test]
    fn test_given_flags_override_configured_values() {
        let mut config = Config::default();
        config.pipeline.max_pages = Some(100);

        apply_pipeline_overrides(&mut config, Some(5), true);

        assert_eq!(config.pipeline.max_pages, Some(5));
        assert!(config.pipeline.quiet);
    }
}
