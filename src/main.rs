//! batchproxy CLI - list and fetch entities through the retrieval proxies

use batchproxy::command::{Command, CommandRegistry, KeyBinding};
use batchproxy::config::{CliArgs, Commands, EntityKind, FetchMode, Operation, OutputFormat, ProxyConfig};
use batchproxy::error::{ProxyError, Result};
use batchproxy::fixture::FixtureSource;
use batchproxy::models::{Job, Pool, StorageAccount, Task};
use batchproxy::proxy::{BasicEntityGetter, EntityGetter, GetSource, ListProxy, ListSource};
use batchproxy::record::Model;
use clap::Parser;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

fn main() {
    // Parse CLI arguments
    let args = CliArgs::parse();

    init_logging(&args);

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(args: &CliArgs) {
    let level = match (args.quiet, args.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("batchproxy={}", level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if args.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(args: CliArgs) -> Result<()> {
    if let Commands::Keys = args.command {
        return cmd_keys();
    }

    let config = ProxyConfig::from_cli(&args)?;
    tracing::info!(kind = config.kind.name(), fixture = %config.fixture.display(), "Starting");

    let source = Arc::new(FixtureSource::load(&config.fixture)?);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| ProxyError::config(format!("Failed to create runtime: {}", e)))?;

    rt.block_on(async {
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });

        match config.kind {
            EntityKind::Pool => execute::<Pool>(&config, source, &cancel).await,
            EntityKind::Job => execute::<Job>(&config, source, &cancel).await,
            EntityKind::Task => execute::<Task>(&config, source, &cancel).await,
            EntityKind::StorageAccount => execute::<StorageAccount>(&config, source, &cancel).await,
        }
    })
}

async fn execute<T: Model>(
    config: &ProxyConfig,
    source: Arc<FixtureSource>,
    cancel: &CancellationToken,
) -> Result<()> {
    match &config.operation {
        Operation::Get(id) => {
            let supply: Arc<dyn GetSource<String>> = source;
            let getter: BasicEntityGetter<T, String> = BasicEntityGetter::new(supply);
            let entity = getter.fetch_with_cancel(id, &config.to_options(), cancel).await?;
            print_entities(config, std::slice::from_ref(&entity))
        }
        Operation::List(mode) => {
            let supply: Arc<dyn ListSource<()>> = source;
            let mut list: ListProxy<T, ()> = ListProxy::new(supply, (), config.to_options());
            match mode {
                FetchMode::Interactive => cmd_pager(config, &mut list, cancel).await,
                FetchMode::All => {
                    let items = list.fetch_all_with_cancel(cancel).await?;
                    print_entities(config, &items)
                }
                FetchMode::FirstPage => fetch_pages(config, &mut list, 1, cancel).await,
                FetchMode::Pages(n) => fetch_pages(config, &mut list, *n, cancel).await,
            }
        }
    }
}

async fn fetch_pages<T: Model>(
    config: &ProxyConfig,
    list: &mut ListProxy<T, ()>,
    pages: usize,
    cancel: &CancellationToken,
) -> Result<()> {
    for _ in 0..pages {
        if !list.has_more() {
            break;
        }
        let page = list.fetch_next_with_cancel(cancel).await?;
        print_entities(config, &page.items)?;
    }

    if list.has_more() {
        tracing::info!(pages = list.pages_fetched(), "More results available");
    }
    Ok(())
}

/// Requested by a pager key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PagerAction {
    Next,
    All,
    Restart,
    Quit,
}

#[derive(Debug, Default)]
struct PagerContext {
    action: Option<PagerAction>,
    has_more: bool,
}

fn pager_commands() -> Result<CommandRegistry<PagerContext>> {
    let mut registry = CommandRegistry::new();

    registry.register(
        Command::new("next-page", |ctx: &mut PagerContext| {
            ctx.action = Some(PagerAction::Next);
            Ok(())
        })
        .with_label("Fetch the next page")
        .with_binding(KeyBinding::parse("n")?)
        .with_binding(KeyBinding::parse("space")?)
        .with_enabled(|ctx: &PagerContext| ctx.has_more),
    )?;
    registry.register(
        Command::new("all-pages", |ctx: &mut PagerContext| {
            ctx.action = Some(PagerAction::All);
            Ok(())
        })
        .with_label("Fetch every remaining page")
        .with_binding(KeyBinding::parse("a")?)
        .with_enabled(|ctx: &PagerContext| ctx.has_more),
    )?;
    registry.register(
        Command::new("restart", |ctx: &mut PagerContext| {
            ctx.action = Some(PagerAction::Restart);
            Ok(())
        })
        .with_label("Start over from the first page")
        .with_binding(KeyBinding::parse("r")?)
        .with_binding(KeyBinding::parse("ctrl+r")?),
    )?;
    registry.register(
        Command::new("quit", |ctx: &mut PagerContext| {
            ctx.action = Some(PagerAction::Quit);
            Ok(())
        })
        .with_label("Quit")
        .with_binding(KeyBinding::parse("q")?)
        .with_binding(KeyBinding::parse("ctrl+c")?),
    )?;

    Ok(registry)
}

fn cmd_keys() -> Result<()> {
    let registry = pager_commands()?;

    println!("=== Pager Keys ===");
    for command in registry.iter() {
        let keys: Vec<String> = command.bindings().iter().map(ToString::to_string).collect();
        println!("  {:<14} {:<30} {}", command.id(), command.label(), keys.join(", "));
    }
    Ok(())
}

async fn cmd_pager<T: Model>(
    config: &ProxyConfig,
    list: &mut ListProxy<T, ()>,
    cancel: &CancellationToken,
) -> Result<()> {
    let registry = pager_commands()?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let first = list.fetch_next_with_cancel(cancel).await?;
    print_entities(config, &first.items)?;

    loop {
        let mut ctx = PagerContext {
            action: None,
            has_more: list.has_more(),
        };
        eprint!("{}> ", if ctx.has_more { "more" } else { "end" });

        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line.map_err(|e| ProxyError::io("<stdin>", e))?,
        };
        let Some(line) = line else { break };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let key = match KeyBinding::parse(input) {
            Ok(key) => key,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };
        if !registry.dispatch_key(&key, &mut ctx)? {
            eprintln!("Nothing bound to '{}' here", key);
            continue;
        }

        match ctx.action {
            Some(PagerAction::Next) => {
                let page = list.fetch_next_with_cancel(cancel).await?;
                print_entities(config, &page.items)?;
            }
            Some(PagerAction::All) => {
                while list.has_more() {
                    let page = list.fetch_next_with_cancel(cancel).await?;
                    print_entities(config, &page.items)?;
                }
            }
            Some(PagerAction::Restart) => {
                list.reset();
                let page = list.fetch_next_with_cancel(cancel).await?;
                print_entities(config, &page.items)?;
            }
            Some(PagerAction::Quit) | None => break,
        }
    }

    Ok(())
}

fn print_entities<T: Model>(config: &ProxyConfig, entities: &[T]) -> Result<()> {
    match config.output {
        OutputFormat::Json => {
            for entity in entities {
                println!("{}", serde_json::to_string(&entity.to_json())?);
            }
        }
        OutputFormat::Table => {
            let columns = config.columns();
            let rows: Vec<Vec<String>> = entities
                .iter()
                .map(|entity| {
                    columns
                        .iter()
                        .map(|c| {
                            entity
                                .record()
                                .get(c)
                                .map(ToString::to_string)
                                .unwrap_or_else(|| "-".to_string())
                        })
                        .collect()
                })
                .collect();

            let widths: Vec<usize> = columns
                .iter()
                .enumerate()
                .map(|(i, c)| rows.iter().map(|r| r[i].len()).chain([c.len()]).max().unwrap_or(0))
                .collect();

            let render = |cells: &[String]| {
                cells
                    .iter()
                    .zip(&widths)
                    .map(|(cell, w)| format!("{:<width$}", cell, width = w))
                    .collect::<Vec<_>>()
                    .join("  ")
            };

            println!("{}", render(&columns));
            for row in &rows {
                println!("{}", render(row));
            }
        }
    }
    Ok(())
}
