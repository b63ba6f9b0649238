//! qsnap CLI
//!
//! Inspects snapshot files and merges several of them into one, applying
//! the same freshness rules a consuming process would.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use qsnap_cache::MemoryQueryCache;
use qsnap_core::constants::DEFAULT_CACHE_TIME_MS;
use qsnap_core::types::{HydrationConfig, ParsedSnapshot, Snapshot, SnapshotRecord};
use qsnap_hydrate::{dehydrate, dehydrate_with, hydrate_json, DehydrateOptions};

/// qsnap - move query caches across process boundaries
#[derive(Parser)]
#[command(name = "qsnap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Default retention both sides agree on, in milliseconds
    #[arg(
        long,
        global = true,
        env = "QSNAP_DEFAULT_CACHE_TIME_MS",
        default_value_t = DEFAULT_CACHE_TIME_MS
    )]
    default_cache_time_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the records of a snapshot file
    Inspect {
        /// Snapshot file (JSON)
        file: PathBuf,
    },

    /// Hydrate snapshot files in order into one cache and dehydrate the result
    Merge {
        /// Snapshot files (JSON), applied left to right
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also export entries that hold no data
        #[arg(long)]
        include_empty: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "qsnap=debug,info"
    } else {
        "qsnap=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = HydrationConfig {
        default_cache_time_ms: cli.default_cache_time_ms,
    };
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Commands::Inspect { file } => cmd_inspect(&file, &config),
        Commands::Merge {
            files,
            output,
            include_empty,
        } => cmd_merge(&files, output.as_deref(), include_empty, &config),
    }
}

/// Print a snapshot file
fn cmd_inspect(path: &Path, config: &HydrationConfig) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    println!("{} {}", "🔍 Inspecting:".cyan().bold(), path.display());

    let value: Value = match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(e) => {
            println!("\n{} {}", "⚠️  Not JSON, nothing to hydrate:".yellow(), e);
            return Ok(());
        }
    };

    let (snapshot, rejected) = match Snapshot::parse(&value) {
        ParsedSnapshot::Valid { snapshot, rejected } => (snapshot, rejected),
        ParsedSnapshot::Malformed(reason) => {
            println!("\n{} {}", "⚠️  Malformed, nothing to hydrate:".yellow(), reason);
            return Ok(());
        }
    };

    println!(
        "\n{} {} record(s)",
        "✅ Snapshot:".green().bold(),
        snapshot.len()
    );
    for record in &snapshot {
        print_record(record, config);
    }

    if rejected > 0 {
        println!(
            "\n{} {} record(s) did not decode and would be skipped",
            "⚠️ ".yellow(),
            rejected
        );
    }

    Ok(())
}

/// Merge snapshot files
fn cmd_merge(
    files: &[PathBuf],
    output: Option<&Path>,
    include_empty: bool,
    config: &HydrationConfig,
) -> Result<()> {
    let cache = MemoryQueryCache::new();

    for path in files {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let report = hydrate_json(&cache, &text, config)
            .with_context(|| format!("Failed to hydrate {}", path.display()))?;

        debug!(file = %path.display(), ?report, "Applied snapshot file");
        eprintln!(
            "{} {}  created {}  updated {}  skipped {}{}",
            "📥".cyan(),
            path.display(),
            report.created,
            report.updated,
            report.skipped,
            if report.malformed {
                "  (malformed)".yellow().to_string()
            } else if report.rejected > 0 {
                format!("  rejected {}", report.rejected).yellow().to_string()
            } else {
                String::new()
            }
        );
    }

    let snapshot = if include_empty {
        dehydrate_with(&cache, config, |_| true)
    } else {
        dehydrate(&cache, &DehydrateOptions::new(config.clone()))
    };
    let json = snapshot.to_json_pretty()?;

    if let Some(path) = output {
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        eprintln!(
            "{} {} record(s) saved to: {}",
            "✅".green(),
            snapshot.len(),
            path.display()
        );
    } else {
        println!("{json}");
    }

    Ok(())
}

fn print_record(record: &SnapshotRecord, config: &HydrationConfig) {
    println!("\n   {} {}", "Key:".yellow(), record.key);
    match &record.data {
        Some(data) => println!("   {} {}", "Data:".dimmed(), preview(data)),
        None => println!("   {} {}", "Data:".dimmed(), "(none)".italic()),
    }
    println!(
        "   {} {} ({})",
        "Updated:".dimmed(),
        record.updated_at,
        format_timestamp(record.updated_at)
    );
    let cache_time_ms = record
        .overrides
        .cache_time_ms
        .unwrap_or(config.default_cache_time_ms);
    let origin = if record.overrides.cache_time_ms.is_some() {
        "override"
    } else {
        "default"
    };
    println!("   {} {} ms ({})", "Cache time:".dimmed(), cache_time_ms, origin);
}

fn preview(data: &Value) -> String {
    let text = data.to_string();
    if text.chars().count() > 60 {
        let head: String = text.chars().take(60).collect();
        format!("{head}...")
    } else {
        text
    }
}

fn format_timestamp(updated_at: u64) -> String {
    if updated_at == 0 {
        return "never".to_string();
    }
    i64::try_from(updated_at)
        .ok()
        .and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_millis)
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| "out of range".to_string())
}
