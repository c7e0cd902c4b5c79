//! `blockgrid` command line: inspect and repack page configs.

use crate::config::{AppConfig, OutputFormat};
use blockgrid_core::registry;
use blockgrid_core::storage::{FileCache, PageCache, StorageError};
use blockgrid_core::{GRID_COLUMNS, PageConfig, allowed_column_starts, normalize_page_config};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// CLI errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Span must be between 1 and 60, got {0}")]
    InvalidSpan(u32),
    #[error("No cached config for page {0}")]
    NotCached(String),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Parser)]
#[command(name = "blockgrid", about = "Inspect and repack grid page configs", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Normalize a page config file and repack its blocks.
    Pack(PackArgs),

    /// Print the legal column starts for a block span.
    Slots { span: u32 },

    /// Print a page config from the local cache.
    Cache(CacheArgs),

    /// List the block library.
    Library,
}

#[derive(Debug, Args)]
pub struct PackArgs {
    /// Page config JSON file.
    pub file: PathBuf,

    /// Print the repacked config as JSON.
    #[arg(long)]
    pub json: bool,

    /// Page id to use when the file does not carry one.
    #[arg(long = "page-id")]
    pub page_id: Option<String>,
}

#[derive(Debug, Args)]
pub struct CacheArgs {
    pub page_id: String,

    /// Cache directory (defaults to the platform data directory).
    #[arg(long)]
    pub dir: Option<PathBuf>,

    #[arg(long)]
    pub json: bool,
}

pub fn run_from_env() -> AppResult<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_env();
    let stdout = std::io::stdout();
    run(cli, &config, &mut stdout.lock())
}

pub fn run(cli: Cli, config: &AppConfig, out: &mut impl Write) -> AppResult<()> {
    match cli.command {
        Commands::Pack(args) => {
            let page = pack_file(&args.file, args.page_id.as_deref())?;
            print_page(&page, output(args.json, config), out)
        }
        Commands::Slots { span } => {
            let slots = slots(span)?;
            let list: Vec<String> = slots.iter().map(u32::to_string).collect();
            writeln!(out, "{}", list.join(" "))?;
            Ok(())
        }
        Commands::Cache(args) => {
            let dir = args.dir.or_else(|| config.cache_dir.clone());
            let page = cached_page(dir, &config.store.cache_key, &args.page_id)?;
            print_page(&page, output(args.json, config), out)
        }
        Commands::Library => {
            for spec in registry::library() {
                writeln!(
                    out,
                    "{:<20} {:<24} span {}",
                    spec.kind.as_str(),
                    spec.label,
                    spec.default_layout.col_span
                )?;
            }
            Ok(())
        }
    }
}

fn output(json_flag: bool, config: &AppConfig) -> OutputFormat {
    if json_flag { OutputFormat::Json } else { config.output }
}

/// Legal column starts for `span` on the page grid.
pub fn slots(span: u32) -> AppResult<Vec<u32>> {
    if !(1..=GRID_COLUMNS).contains(&span) {
        return Err(AppError::InvalidSpan(span));
    }
    Ok(allowed_column_starts(span, GRID_COLUMNS))
}

/// Read, normalize and repack a page config file.
pub fn pack_file(path: &Path, page_id: Option<&str>) -> AppResult<PageConfig> {
    let raw: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    let page_id = page_id
        .map(str::to_string)
        .or_else(|| raw.get("id").and_then(Value::as_str).map(str::to_string))
        .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "page".to_string());
    Ok(pack_value(&raw, &page_id))
}

/// Normalize and repack a raw page config.
pub fn pack_value(raw: &Value, page_id: &str) -> PageConfig {
    if !raw.get("blocks").is_some_and(Value::is_array) {
        log::warn!("{} has no blocks array, starting from an empty page", page_id);
    }
    let mut page = normalize_page_config(Some(raw), &PageConfig::new(page_id));
    page.repack();
    page
}

fn cached_page(dir: Option<PathBuf>, key: &str, page_id: &str) -> AppResult<PageConfig> {
    let cache = match dir {
        Some(dir) => FileCache::new(dir)?,
        None => FileCache::default_location()?,
    };
    log::debug!("reading page cache from {}", cache.base_path().display());
    let raw = PageCache::new(Arc::new(cache), key)
        .read(page_id)
        .ok_or_else(|| AppError::NotCached(page_id.to_string()))?;
    Ok(normalize_page_config(Some(&raw), &PageConfig::new(page_id)))
}

fn print_page(page: &PageConfig, format: OutputFormat, out: &mut impl Write) -> AppResult<()> {
    match format {
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(page)?)?;
        }
        OutputFormat::Table => out.write_all(render_table(page).as_bytes())?,
    }
    Ok(())
}

/// One line per block in reading order: row, column, span, type, id.
pub fn render_table(page: &PageConfig) -> String {
    let mut table = format!("{:>4} {:>4} {:>5}  {:<20} {}\n", "row", "col", "span", "type", "id");
    for block in &page.blocks {
        let cell = |v: Option<u32>| v.map_or_else(|| "-".to_string(), |v| v.to_string());
        table.push_str(&format!(
            "{:>4} {:>4} {:>5}  {:<20} {}\n",
            cell(block.layout.row_start),
            cell(block.layout.col_start),
            block.layout.col_span,
            block.kind().as_str(),
            block.id
        ));
    }
    table
}
