use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use sales_rollup::config::{ExportFormat, RollupConfig};
use sales_rollup::export::{
    render_text, standard_charts, write_charts_json, write_csv_dir, write_json,
};
use sales_rollup::ingest::load_csv;
use sales_rollup::processor::query_builder::{
    sales_by_category, standard_reports, standard_reports_parallel,
};
use sales_rollup::processor::report::{GEOGRAPHIC_ANALYSIS, PRODUCT_ANALYSIS};
use sales_rollup::processor::Attribute;

#[cfg(not(target_env = "msvc"))]
use jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// Grouped sales reports from a transactions CSV.
#[derive(Parser)]
#[command(name = "sales-rollup", about)]
struct Cli {
    /// Sales CSV with Date, Sales Person, Geography, Product, Sales and Boxes columns.
    input: Option<PathBuf>,

    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the reports are written to.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    #[arg(short, long, value_enum)]
    format: Option<ExportFormat>,

    /// Rows shown per table in the console summary.
    #[arg(long)]
    top: Option<usize>,

    /// Compute the analyses concurrently.
    #[arg(long)]
    parallel: bool,

    /// Skip rows that fail to parse instead of aborting.
    #[arg(long)]
    skip_malformed: bool,

    /// Logging verbosity level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print version information and exit.
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Command::Version) = &cli.command {
        println!(
            "sales-rollup {} ({}/{})",
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH
        );
        return Ok(());
    }

    let filter = EnvFilter::try_new(&cli.log_level)
        .with_context(|| format!("invalid log level: {}", cli.log_level))?;
    fmt().with_env_filter(filter).with_target(false).init();

    let Some(input) = cli.input.clone() else {
        bail!("an input CSV is required (use --help for usage)");
    };

    let mut cfg = match &cli.config {
        Some(path) => RollupConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => RollupConfig::default(),
    };
    apply_overrides(&mut cfg, &cli);

    run(&input, &cfg)
}

fn apply_overrides(cfg: &mut RollupConfig, cli: &Cli) {
    if let Some(dir) = &cli.output_dir {
        cfg.output_dir = dir.clone();
    }
    if let Some(format) = cli.format {
        cfg.format = format;
    }
    if let Some(top) = cli.top {
        cfg.top = top;
    }
    cfg.parallel |= cli.parallel;
    cfg.ingest.skip_malformed |= cli.skip_malformed;
}

fn run(input: &Path, cfg: &RollupConfig) -> Result<()> {
    let (store, summary) = load_csv(input, &cfg.ingest_options())
        .with_context(|| format!("loading sales data from {}", input.display()))?;
    if !summary.errors.is_empty() {
        println!(
            "Skipped {} malformed row(s) of {}",
            summary.errors.len(),
            summary.rows_processed
        );
    }

    let bundle = if cfg.parallel {
        standard_reports_parallel(&store)
    } else {
        standard_reports(&store)
    }
    .context("building reports")?;

    if matches!(cfg.format, ExportFormat::Csv | ExportFormat::Both) {
        write_csv_dir(&bundle, &cfg.output_dir).context("writing CSV reports")?;
    }
    if matches!(cfg.format, ExportFormat::Json | ExportFormat::Both) {
        write_json(&bundle, &cfg.output_dir.join("reports.json"))
            .context("writing JSON reports")?;
    }
    let charts = standard_charts(&store, &bundle).context("building chart data")?;
    write_charts_json(&charts, &cfg.output_dir.join("charts.json"))
        .context("writing chart data")?;

    info!(output = %cfg.output_dir.display(), "reports written");

    println!(
        "Loaded {} records: total sales {:.2}, total boxes {}",
        store.len(),
        store.total_sales(),
        store.total_boxes()
    );

    if let Some(products) = bundle.get(PRODUCT_ANALYSIS) {
        println!("\nTop {} products by sales:", cfg.top);
        print!("{}", render_text(products, cfg.top));
    }

    let people = sales_by_category(&store, Attribute::SalesPerson)?;
    println!("\nTop {} sales people:", cfg.top);
    print!("{}", render_text(&people, cfg.top));

    if let Some(geo) = bundle.get(GEOGRAPHIC_ANALYSIS) {
        println!("\nSales by geography:");
        print!("{}", render_text(geo, geo.len()));
    }

    Ok(())
}
