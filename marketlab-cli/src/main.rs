//! MarketLab CLI: symbol lists, price downloads, and cache inspection.
//!
//! Commands:
//! - `symbols`: resolve a market index to its member list
//! - `prices`: fetch historical prices for symbols or a whole index
//! - `cache status`: list cached tables and their sizes

mod export;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use marketlab_core::data::HttpTransport;
use marketlab_core::{
    AssetClass, CacheOptions, DataConfig, FmpClient, Interval, LocalCache, MarketIndex,
    PriceProvider, SymbolListLoader, TiingoClient,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "marketlab",
    about = "MarketLab CLI: index symbol lists and historical prices with local caching"
)]
struct Cli {
    /// TOML config file (cache dir, timeouts, API keys).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProviderArg {
    Tiingo,
    Fmp,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a market index to its member symbols.
    Symbols {
        /// NASDAQ_100, SNP_500, DJI, RUSSELL_1000 (or aliases like SP500, DOW).
        index: String,

        /// Bypass the cache entirely.
        #[arg(long, default_value_t = false)]
        no_cache: bool,

        /// Cache directory. Overrides the config file.
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Cache file name for the symbol table.
        #[arg(long)]
        file_name: Option<String>,
    },
    /// Fetch historical prices for symbols or for every member of an index.
    Prices {
        /// Price provider.
        #[arg(long, value_enum)]
        provider: ProviderArg,

        /// Bar interval: 1min, 5min, 15min, 30min, 1hour, 4hour, daily, weekly, monthly.
        #[arg(long, default_value = "daily")]
        interval: String,

        /// Start date (YYYY-MM-DD), inclusive.
        #[arg(long)]
        start: String,

        /// End date (YYYY-MM-DD), inclusive.
        #[arg(long)]
        end: String,

        /// Take the symbols from this index instead of the command line.
        #[arg(long)]
        index: Option<String>,

        /// Symbols to fetch (e.g., AAPL MSFT BRK-B, or BTCUSD with --crypto).
        symbols: Vec<String>,

        /// Treat the symbols as crypto pairs.
        #[arg(long, default_value_t = false, conflicts_with = "index")]
        crypto: bool,

        /// Bypass the cache entirely.
        #[arg(long, default_value_t = false)]
        no_cache: bool,

        /// Cache directory. Overrides the config file.
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Write one CSV per symbol into this directory.
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached tables and their sizes.
    Status {
        /// Cache directory. Overrides the config file.
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Symbols {
            index,
            no_cache,
            cache_dir,
            file_name,
        } => {
            let options = cache_options(&config, no_cache, cache_dir);
            run_symbols(&config, &index, &options, file_name.as_deref())
        }
        Commands::Prices {
            provider,
            interval,
            start,
            end,
            index,
            symbols,
            crypto,
            no_cache,
            cache_dir,
            export,
        } => {
            let options = cache_options(&config, no_cache, cache_dir);
            let asset = if crypto {
                AssetClass::Crypto
            } else {
                AssetClass::Equity
            };
            run_prices(
                &config,
                provider,
                &interval,
                &start,
                &end,
                index.as_deref(),
                symbols,
                asset,
                &options,
                export.as_deref(),
            )
        }
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => {
                let dir = cache_dir.unwrap_or_else(|| config.cache_dir.clone());
                run_cache_status(&dir)
            }
        },
    }
}

fn load_config(path: Option<&Path>) -> Result<DataConfig> {
    let config = match path {
        Some(path) => DataConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => DataConfig::default(),
    };
    let config = config.with_env_overrides();
    tracing::debug!(
        cache_dir = %config.cache_dir.display(),
        use_cache = config.use_cache,
        "config loaded"
    );
    Ok(config)
}

fn cache_options(config: &DataConfig, no_cache: bool, cache_dir: Option<PathBuf>) -> CacheOptions {
    let mut options = config.cache_options();
    if no_cache {
        options.use_cache = false;
    }
    if let Some(dir) = cache_dir {
        options.cache_dir = dir;
    }
    options
}

fn transport(config: &DataConfig) -> Result<Arc<dyn HttpTransport>> {
    let transport = config
        .build_transport()
        .context("failed to build HTTP client")?;
    Ok(Arc::new(transport))
}

fn parse_index(raw: &str) -> Result<MarketIndex> {
    raw.parse::<MarketIndex>().map_err(anyhow::Error::msg)
}

fn run_symbols(
    config: &DataConfig,
    index: &str,
    options: &CacheOptions,
    file_name: Option<&str>,
) -> Result<()> {
    let index = parse_index(index)?;
    let loader = SymbolListLoader::new(transport(config)?);
    let table = loader.fetch_symbols(index, options, file_name)?;

    println!(
        "{}: {} symbols (fetched {})",
        index.display_name(),
        table.len(),
        table.fetched_at.format("%Y-%m-%d %H:%M")
    );
    println!();
    println!("{:<8} {:<40} {:<28}", "Symbol", "Name", "Sector");
    println!("{}", "-".repeat(78));
    for r in table.records() {
        println!(
            "{:<8} {:<40} {:<28}",
            r.symbol,
            truncate(&r.name, 40),
            truncate(r.sector.as_deref().unwrap_or("-"), 28)
        );
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_prices(
    config: &DataConfig,
    provider: ProviderArg,
    interval: &str,
    start: &str,
    end: &str,
    index: Option<&str>,
    mut symbols: Vec<String>,
    asset: AssetClass,
    options: &CacheOptions,
    export_dir: Option<&Path>,
) -> Result<()> {
    let interval: Interval = interval.parse().map_err(anyhow::Error::msg)?;
    let transport = transport(config)?;

    if let Some(index) = index {
        let index = parse_index(index)?;
        let table = SymbolListLoader::new(transport.clone()).fetch_symbols(index, options, None)?;
        symbols.extend(table.symbols().into_iter().map(String::from));
    }
    if symbols.is_empty() {
        bail!("no symbols given; pass symbols or --index");
    }

    let client: Box<dyn PriceProvider> = match provider {
        ProviderArg::Tiingo => Box::new(TiingoClient::from_config(config, transport)),
        ProviderArg::Fmp => Box::new(FmpClient::from_config(config, transport)),
    };

    let sym_refs: Vec<&str> = symbols.iter().map(|s| s.as_str()).collect();
    let result = client.fetch_multiple_of(asset, &sym_refs, start, end, interval, options)?;

    println!();
    println!("{:<8} {:>8} {:<20} {:<20}", "Symbol", "Bars", "First", "Last");
    println!("{}", "-".repeat(58));
    for (symbol, series) in result.prices.iter() {
        let stamp = |ts: Option<chrono::NaiveDateTime>| {
            ts.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default()
        };
        println!(
            "{:<8} {:>8} {:<20} {:<20}",
            symbol,
            series.len(),
            stamp(series.first_timestamp()),
            stamp(series.last_timestamp())
        );
    }
    for failure in &result.failures {
        eprintln!("Error for {}: {}", failure.symbol, failure.error);
    }

    if let Some(dir) = export_dir {
        let written = export::export_prices(&result.prices, dir)?;
        println!();
        println!("Exported {} file(s) to {}", written.len(), dir.display());
    }

    if result.all_failed() {
        bail!("all {} symbol(s) failed", result.failed());
    }
    Ok(())
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    let cache = LocalCache::new(cache_dir);
    let entries = cache.entries()?;

    if entries.is_empty() {
        println!("No cached tables in {}", cache_dir.display());
        return Ok(());
    }

    let total_size: u64 = entries.iter().map(|e| e.size_bytes).sum();

    println!("Cache: {}", cache_dir.display());
    println!("Tables: {}", entries.len());
    println!("Total size: {}", format_size(total_size));
    println!();
    println!("{:<64} {:>10}", "File", "Size");
    println!("{}", "-".repeat(75));
    for entry in &entries {
        println!("{:<64} {:>10}", entry.file_name, format_size(entry.size_bytes));
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
