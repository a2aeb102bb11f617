use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use srcx::error::SearchError;
use srcx::index::build::index_tree;
use srcx::index::MemoryIndex;
use srcx::output::{self, DirectHit, PromotedPage, ResultsPage};
use srcx::plugins::{filter_menu_items, Catalog, PluginSet};
use srcx::query::{Query, Rows, SearchRow};
use srcx::utils::EngineConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Exit status for queries the user has to fix
const EXIT_BAD_QUERY: u8 = 2;

#[derive(Parser)]
#[command(name = "srcx")]
#[command(about = "Structured source search with a filter query language")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to the app data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enabled plugins, overriding the config (comma separated)
    #[arg(long, global = true, value_delimiter = ',')]
    plugins: Option<Vec<String>>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a query and print its terms as JSON
    Parse {
        query: String,
    },
    /// Search a source tree or a record dump
    Search {
        query: String,

        /// Source tree to index in memory
        #[arg(short, long, default_value = ".")]
        tree: PathBuf,

        /// JSON record dump to search instead of walking a tree
        #[arg(short, long, conflicts_with = "tree")]
        records: Option<PathBuf>,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Rows per page (capped by the config's max_limit)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Print every line prefixed by its path
        #[arg(long)]
        no_heading: bool,

        /// Skip the direct-result lookup
        #[arg(long)]
        no_direct: bool,
    },
    /// List the filters available to queries
    Filters,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load_from(path)?,
        None => EngineConfig::load()?,
    };
    if let Some(plugins) = &cli.plugins {
        config.enabled_plugins = plugins.clone();
    }
    let color = !cli.no_color;

    let catalog = Catalog::builtin(config.catalog_cache_size);
    let plugins = catalog.plugin_set(&config.enabled_plugins);

    let outcome = match cli.command {
        Commands::Parse { query } => print_terms(&plugins, &query),
        Commands::Filters => output::print_menu(&filter_menu_items(&plugins), color).map_err(CliError::from),
        Commands::Search {
            query,
            tree,
            records,
            offset,
            limit,
            json,
            no_heading,
            no_direct,
        } => {
            let index = match records {
                Some(path) => MemoryIndex::from_json_file(&path)?,
                None => index_tree(&tree, json)
                    .with_context(|| format!("Failed to index {}", tree.display()))?,
            };
            let limit = config.clamp_limit(limit);
            run_search(&index, &query, plugins, &config, offset, limit, !no_direct).and_then(|page| {
                if json {
                    println!("{}", output::to_json(&page).context("Failed to serialize results")?);
                } else {
                    output::print_page(&page, color, !no_heading)?;
                }
                Ok(())
            })
        }
    };

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(CliError::Search(err)) => match err.user_reason() {
            Some(reason) => {
                output::print_warning(reason, color)?;
                Ok(ExitCode::from(EXIT_BAD_QUERY))
            }
            None => Err(anyhow::Error::new(err)),
        },
        Err(CliError::Other(err)) => Err(err),
    }
}

/// Search failures are reported to the user; anything else aborts
enum CliError {
    Search(SearchError),
    Other(anyhow::Error),
}

impl From<SearchError> for CliError {
    fn from(err: SearchError) -> Self {
        CliError::Search(err)
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::Other(err)
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Other(err.into())
    }
}

fn print_terms(plugins: &PluginSet, querystr: &str) -> std::result::Result<(), CliError> {
    let terms = plugins.grammar().parse(querystr).map_err(SearchError::from)?;
    println!("{}", output::to_json(&terms).context("Failed to serialize terms")?);
    Ok(())
}

fn run_search(
    index: &MemoryIndex,
    querystr: &str,
    plugins: Arc<PluginSet>,
    config: &EngineConfig,
    offset: usize,
    limit: usize,
    direct: bool,
) -> std::result::Result<ResultsPage, CliError> {
    let query = Query::new(index, querystr, plugins)?
        .with_parallel_direct_search(config.parallel_direct_search);

    let direct = if direct && offset == 0 {
        query
            .direct_result()?
            .map(|(path, line)| DirectHit { path, line })
    } else {
        None
    };

    let mixed = query.mixed_results(offset, limit, config.promote_limit)?;
    let promoted = match mixed.promoted {
        Some(promoted) => Some(PromotedPage {
            total: promoted.total,
            query: promoted.query,
            rows: collect_rows(promoted.rows)?,
        }),
        None => None,
    };

    Ok(ResultsPage {
        query: querystr.to_string(),
        offset,
        limit,
        total: mixed.total,
        direct,
        promoted,
        rows: collect_rows(mixed.rows)?,
    })
}

fn collect_rows(rows: Rows) -> std::result::Result<Vec<SearchRow>, SearchError> {
    rows.collect()
}
