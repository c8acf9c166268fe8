use anyhow::{bail, Context, Result};
use arxiv_search::config::load_config;
use arxiv_search::utils::RetryPolicy;
use arxiv_search::{
    CancellationToken, Entry, Query, RequestMethod, SearchParams, SortBy, SortOrder,
};
use clap::{Parser, ValueEnum};
use is_terminal::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// arXiv Search - query the arXiv API from the command line
#[derive(Parser, Debug)]
#[command(name = "arxiv-search")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search arXiv with the boolean query language", long_about = None)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv, -vvv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Query in the arXiv query language, e.g. "ti:transformers AND cat:cs.CL"
    #[arg(long)]
    query: Option<String>,

    /// Comma-separated arXiv IDs to fetch
    #[arg(long, value_delimiter = ',')]
    id_list: Vec<String>,

    /// Offset of the first result
    #[arg(long, default_value_t = 0)]
    start: usize,

    /// Page size
    #[arg(long, default_value_t = 10)]
    max_results: usize,

    /// Sort field (relevance, lastUpdatedDate, submittedDate)
    #[arg(long)]
    sort_by: Option<SortBy>,

    /// Sort order (ascending, descending)
    #[arg(long)]
    sort_order: Option<SortOrder>,

    /// Follow pagination lazily instead of fetching one page
    #[arg(long)]
    all: bool,

    /// Maximum number of entries to print with --all
    #[arg(long, default_value_t = 100)]
    limit: usize,

    /// Retry transient failures up to this many additional times
    #[arg(long)]
    retries: Option<u32>,

    /// Minimum spacing between requests in milliseconds (0 disables)
    #[arg(long)]
    rate_limit_ms: Option<u64>,

    /// Send the query as a POST form body
    #[arg(long)]
    post: bool,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, value_enum, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
}

impl Cli {
    fn search_params(&self) -> Result<SearchParams> {
        if self.query.is_none() && self.id_list.is_empty() {
            bail!("either --query or --id-list is required");
        }

        let mut params = SearchParams::default()
            .id_list(self.id_list.iter().cloned())
            .start(self.start)
            .max_results(self.max_results);

        if let Some(query) = &self.query {
            Query::parse(query).with_context(|| format!("Invalid query: {}", query))?;
            params.query = query.clone();
        }
        if let Some(sort_by) = self.sort_by {
            params = params.sort_by(sort_by);
        }
        if let Some(sort_order) = self.sort_order {
            params = params.sort_order(sort_order);
        }

        params.validate()?;
        Ok(params)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("arxiv_search={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(path) = &cli.config {
        tracing::info!("Using config file: {}", path.display());
    }

    let params = cli.search_params()?;

    let mut builder = config.client_builder();
    if let Some(retries) = cli.retries {
        let base = config
            .retry
            .as_ref()
            .map(|retry| retry.to_policy())
            .unwrap_or_default();
        builder = builder.retry(RetryPolicy {
            max_attempts: retries.saturating_add(1),
            ..base
        });
    }
    if let Some(ms) = cli.rate_limit_ms {
        builder = builder.rate_limit(Duration::from_millis(ms));
    }
    if cli.post {
        builder = builder.request_method(RequestMethod::Post);
    }
    let client = builder.build()?;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling search");
            trigger.cancel();
        }
    });

    let entries = if cli.all {
        let mut iter = client.iter_with_cancel(params, cancel);
        let mut entries = Vec::new();
        while entries.len() < cli.limit {
            match iter.next().await {
                Some(entry) => entries.push(entry),
                None => break,
            }
        }
        if let Some(e) = iter.last_error() {
            tracing::error!("Iteration stopped early: {}", e);
        }
        entries
    } else {
        let page = client.search_with_cancel(params, &cancel).await?;
        tracing::info!(
            "Showing {} of {} results starting at {}",
            page.len(),
            page.total_results,
            page.start_index
        );
        page.entries
    };

    output_entries(&entries, cli.output)
}

fn output_entries(entries: &[Entry], format: OutputFormat) -> Result<()> {
    let actual_format = if format == OutputFormat::Auto {
        if std::io::stdout().is_terminal() {
            OutputFormat::Table
        } else {
            OutputFormat::Json
        }
    } else {
        format
    };

    match actual_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(entries)?);
        }
        OutputFormat::Table => {
            use comfy_table::{Attribute, Cell, Table};
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["ID", "Title", "Authors", "Category", "Published"]);

            for entry in entries {
                let published = entry
                    .published
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default();

                table.add_row(vec![
                    Cell::new(entry.arxiv_id()),
                    Cell::new(truncate(&entry.title, 50)).add_attribute(Attribute::Bold),
                    Cell::new(truncate(&entry.author_names(), 30)),
                    Cell::new(
                        entry
                            .primary_category
                            .as_ref()
                            .map(|c| c.term.as_str())
                            .unwrap_or_default(),
                    ),
                    Cell::new(published),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Auto => unreachable!(),
    }
    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
