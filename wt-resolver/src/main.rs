//! wt-resolver - External dataset resolution tool
//!
//! `tree` resolves one reference into its nested package tree and writes it
//! as JSON. `lookup` resolves many references into flat summary records.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use wt_common::config::{LoggingConfig, TomlConfig};
use wt_resolver::{Resolver, ResolverConfig};

/// Command-line arguments for wt-resolver
#[derive(Parser, Debug)]
#[command(name = "wt-resolver")]
#[command(about = "Resolve DataONE and HTTP dataset references", long_about = None)]
#[command(version)]
struct Args {
    /// Configuration file (overrides WT_RESOLVER_CONFIG)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the package tree of one reference and write it as JSON
    Tree {
        /// Landing page URL, resolve URI, DOI or PID
        reference: String,

        /// Output file (default: wt-package-<timestamp>.json)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Resolve references into summary records printed as JSON
    Lookup {
        /// References to resolve
        #[arg(required = true)]
        references: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&toml_config.logging)?;

    info!(
        "Starting wt-resolver v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = ResolverConfig::from(&toml_config);
    info!(
        index_base = %config.index_base,
        graph_base = %config.graph_base,
        workers = config.max_workers,
        "Resolver configured"
    );

    let resolver = Resolver::from_config(&config).context("Failed to initialize resolver")?;

    match args.command {
        Command::Tree { reference, output } => run_tree(&resolver, &reference, output).await,
        Command::Lookup { references } => run_lookup(&resolver, &references).await,
    }
}

async fn run_tree(resolver: &Resolver, reference: &str, output: Option<PathBuf>) -> Result<()> {
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling resolution");
            ctrl_c.cancel();
        }
    });

    let tree = resolver
        .tree
        .build_tree_cancellable(reference, &cancel)
        .await
        .with_context(|| format!("Failed to resolve '{}'", reference))?;

    let path = output.unwrap_or_else(default_output_path);
    write_json(&path, &tree)?;

    info!(
        path = %path.display(),
        files = tree.file_count(),
        total_size = tree.total_size(),
        "Package tree written"
    );
    Ok(())
}

async fn run_lookup(resolver: &Resolver, references: &[String]) -> Result<()> {
    let report = resolver.batch.resolve_all_with_report(references).await;

    for failure in &report.failures {
        warn!(
            reference = %failure.reference,
            strategy = failure.strategy,
            code = failure.error.code(),
            "No record: {}",
            failure.error
        );
    }

    let json = serde_json::to_string_pretty(&report.records).context("Failed to serialize records")?;
    println!("{}", json);
    Ok(())
}

fn default_output_path() -> PathBuf {
    PathBuf::from(format!(
        "wt-package-{}.json",
        chrono::Local::now().format("%Y%m%d%H%M%S")
    ))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize package tree")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// `RUST_LOG` wins over the configured level; a configured file replaces stderr
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.level.as_str().into());

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}
