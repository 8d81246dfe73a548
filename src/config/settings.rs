//! Configuration settings for batchproxy
//!
//! Defines the CLI arguments and the resolved configuration used to
//! drive the proxies against a fixture file.

use crate::error::{ProxyError, Result};
use crate::filter::Filter;
use crate::proxy::ProxyOptions;
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// batchproxy - list and fetch Batch entities through the retrieval proxies
#[derive(Parser, Debug, Clone)]
#[command(name = "batchproxy")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Paginated entity retrieval over Batch, Storage and ARM style sources")]
#[command(long_about = r#"
batchproxy drives the list and get proxies against a JSON fixture file
that stands in for the service.

Examples:
  batchproxy list pools.json --kind pool --select id,state
  batchproxy list tasks.json --kind task --filter "state eq 'completed'" --all
  batchproxy list pools.json --page-size 10 --interactive
  batchproxy get pools.json pool-1 --kind pool
  batchproxy keys
"#)]
pub struct CliArgs {
    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List entities page by page
    #[command(name = "list")]
    List {
        /// Fixture file holding the entities
        fixture: PathBuf,
        /// Entity kind
        #[arg(short, long, value_enum, default_value = "pool")]
        kind: EntityKind,
        /// Comma separated attributes to select
        #[arg(short, long, value_name = "FIELDS")]
        select: Option<String>,
        /// OData filter clause
        #[arg(short, long, value_name = "EXPR")]
        filter: Option<String>,
        /// Entities per page (maxResults)
        #[arg(long, value_name = "NUM")]
        page_size: Option<u64>,
        /// Fetch every page
        #[arg(short, long)]
        all: bool,
        /// Stop after this many pages
        #[arg(long, value_name = "NUM", conflicts_with = "all")]
        max_pages: Option<usize>,
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        output: OutputFormat,
        /// Page with key commands read from stdin
        #[arg(short, long, conflicts_with_all = ["all", "max_pages"])]
        interactive: bool,
    },

    /// Fetch one entity by id
    #[command(name = "get")]
    Get {
        /// Fixture file holding the entities
        fixture: PathBuf,
        /// Entity id
        id: String,
        /// Entity kind
        #[arg(short, long, value_enum, default_value = "pool")]
        kind: EntityKind,
        /// Comma separated attributes to select
        #[arg(short, long, value_name = "FIELDS")]
        select: Option<String>,
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        output: OutputFormat,
    },

    /// Show the interactive pager key bindings
    #[command(name = "keys")]
    Keys,
}

/// Entity kind served by a fixture
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    /// Batch pool
    #[default]
    Pool,
    /// Batch job
    Job,
    /// Batch task
    Task,
    /// ARM storage account
    #[value(name = "storage-account")]
    StorageAccount,
}

impl EntityKind {
    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pool => "pool",
            Self::Job => "job",
            Self::Task => "task",
            Self::StorageAccount => "storage account",
        }
    }

    /// Attributes shown in table output when nothing is selected
    pub fn default_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Pool => &["id", "state", "vmSize", "currentDedicatedNodes"],
            Self::Job => &["id", "state", "priority", "creationTime"],
            Self::Task => &["id", "state", "commandLine"],
            Self::StorageAccount => &["name", "location", "kind"],
        }
    }
}

/// Output format
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Aligned columns
    #[default]
    Table,
    /// One JSON document per entity
    Json,
}

/// How much of a listing to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// First page only
    #[default]
    FirstPage,
    /// Up to a number of pages
    Pages(usize),
    /// Every page
    All,
    /// Driven by key commands
    Interactive,
}

/// What the CLI was asked to do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Paginated listing
    List(FetchMode),
    /// Single entity by id
    Get(String),
}

/// Resolved configuration for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Fixture file
    pub fixture: PathBuf,
    /// Entity kind
    pub kind: EntityKind,
    /// Requested operation
    pub operation: Operation,
    /// Normalized `$select` clause
    pub select: Option<String>,
    /// Validated `$filter` clause
    pub filter: Option<String>,
    /// Entities per page
    pub page_size: Option<u64>,
    /// Output format
    pub output: OutputFormat,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            fixture: PathBuf::new(),
            kind: EntityKind::default(),
            operation: Operation::List(FetchMode::FirstPage),
            select: None,
            filter: None,
            page_size: None,
            output: OutputFormat::default(),
        }
    }
}

/// Normalize a select list: trim names and drop empty entries
pub fn parse_select(select: &str) -> Result<String> {
    let fields: Vec<&str> = select
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();

    if fields.is_empty() {
        return Err(ProxyError::config(format!("Invalid select list: '{}'", select)));
    }
    Ok(fields.join(","))
}

impl ProxyConfig {
    /// Create config from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self> {
        match &args.command {
            Commands::List {
                fixture,
                kind,
                select,
                filter,
                page_size,
                all,
                max_pages,
                output,
                interactive,
            } => {
                let mode = if *interactive {
                    FetchMode::Interactive
                } else if *all {
                    FetchMode::All
                } else {
                    match max_pages {
                        Some(0) => return Err(ProxyError::config("--max-pages must be at least 1")),
                        Some(n) => FetchMode::Pages(*n),
                        None => FetchMode::FirstPage,
                    }
                };

                if *page_size == Some(0) {
                    return Err(ProxyError::config("--page-size must be at least 1"));
                }

                // Reject malformed clauses before touching the source
                let filter = filter.as_deref().map(str::trim).filter(|f| !f.is_empty());
                if let Some(filter) = filter {
                    Filter::parse(filter)?;
                }

                Ok(Self {
                    fixture: fixture.clone(),
                    kind: *kind,
                    operation: Operation::List(mode),
                    select: select.as_deref().map(parse_select).transpose()?,
                    filter: filter.map(str::to_string),
                    page_size: *page_size,
                    output: *output,
                })
            }
            Commands::Get {
                fixture,
                id,
                kind,
                select,
                output,
            } => {
                if id.trim().is_empty() {
                    return Err(ProxyError::config("Entity id required"));
                }

                Ok(Self {
                    fixture: fixture.clone(),
                    kind: *kind,
                    operation: Operation::Get(id.clone()),
                    select: select.as_deref().map(parse_select).transpose()?,
                    output: *output,
                    ..Default::default()
                })
            }
            Commands::Keys => Err(ProxyError::config("'keys' does not read entities")),
        }
    }

    /// Proxy options for this run
    pub fn to_options(&self) -> ProxyOptions {
        let mut attributes = Map::new();
        if let Some(select) = &self.select {
            attributes.insert("select".into(), Value::String(select.clone()));
        }
        if let Some(filter) = &self.filter {
            attributes.insert("filter".into(), Value::String(filter.clone()));
        }
        if let Some(page_size) = self.page_size {
            attributes.insert("maxResults".into(), Value::from(page_size));
        }
        ProxyOptions::new(attributes)
    }

    /// Columns for table output
    pub fn columns(&self) -> Vec<String> {
        match &self.select {
            Some(select) => select.split(',').map(str::to_string).collect(),
            None => self.kind.default_columns().iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("batchproxy").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_select() {
        assert_eq!(parse_select("id, state ,,vmSize").unwrap(), "id,state,vmSize");
        assert!(parse_select(" , ").is_err());
    }

    #[test]
    fn test_list_config() {
        let args = parse(&[
            "list",
            "pools.json",
            "--select",
            "id, state",
            "--filter",
            "state eq 'active'",
            "--page-size",
            "5",
            "--all",
        ]);
        let config = ProxyConfig::from_cli(&args).unwrap();
        assert_eq!(config.kind, EntityKind::Pool);
        assert_eq!(config.operation, Operation::List(FetchMode::All));

        let options = config.to_options();
        assert_eq!(options.select(), Some("id,state"));
        assert_eq!(options.filter(), Some("state eq 'active'"));
        assert_eq!(options.max_results(), Some(5));
        assert_eq!(config.columns(), vec!["id", "state"]);
    }

    #[test]
    fn test_get_config() {
        let args = parse(&["get", "accounts.json", "/subscriptions/s/x", "--kind", "storage-account", "-o", "json"]);
        let config = ProxyConfig::from_cli(&args).unwrap();
        assert_eq!(config.operation, Operation::Get("/subscriptions/s/x".to_string()));
        assert_eq!(config.kind, EntityKind::StorageAccount);
        assert_eq!(config.output, OutputFormat::Json);
        assert!(config.to_options().is_empty());
    }

    #[test]
    fn test_invalid_config() {
        let bad_filter = parse(&["list", "pools.json", "--filter", "state eq"]);
        assert!(matches!(
            ProxyConfig::from_cli(&bad_filter),
            Err(ProxyError::InvalidFilter { .. })
        ));

        let bad_pages = parse(&["list", "pools.json", "--max-pages", "0"]);
        assert!(matches!(ProxyConfig::from_cli(&bad_pages), Err(ProxyError::Config(_))));

        let blank_filter = parse(&["list", "pools.json", "--filter", "  "]);
        let config = ProxyConfig::from_cli(&blank_filter).unwrap();
        assert_eq!(config.filter, None);
        assert_eq!(config.to_options().filter(), None);

        let keys = parse(&["keys"]);
        assert!(ProxyConfig::from_cli(&keys).is_err());

        let conflicting = CliArgs::try_parse_from(["batchproxy", "list", "p.json", "--all", "--interactive"]);
        assert!(conflicting.is_err());
    }

    #[test]
    fn test_config_serializes() {
        let config = ProxyConfig {
            operation: Operation::List(FetchMode::Pages(3)),
            ..Default::default()
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["operation"], serde_json::json!({"list": {"pages": 3}}));
        assert_eq!(json["kind"], "pool");
    }
}
