use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use sales_rollup::ingest::{IngestOptions, load_csv};
use sales_rollup::processor::query_builder::standard_reports;

#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

fn main() -> Result<()> {
    let _profiler = dhat::Profiler::new_heap();

    let path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/sales_1m.csv"));
    let (store, _) = load_csv(&path, &IngestOptions::default())
        .with_context(|| format!("loading {}", path.display()))?;

    let bundle = standard_reports(&store)?;
    println!("Built {} reports over {} records", bundle.len(), store.len());

    println!("Memory benchmark finished. See dhat-heap.json for details");
    Ok(())
}
