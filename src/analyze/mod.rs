//! Analyze pipeline: scan a table partition, parse each cell value as a JSON
//! record, extract the aggregation field, and count occurrences per key.

pub mod aggregate;
pub mod mapper;
pub mod record;

use metrics::counter;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::analyze::aggregate::CountMap;
use crate::counters::{CounterSnapshot, Counters};
use crate::error::{JobError, Result};
use crate::store::{ColumnSpec, Scan, Table};

pub const DEFAULT_FIELD: &str = "email";

/// Configuration for one analyze run.
#[derive(Debug, Clone)]
pub struct AnalyzeConfig {
    /// Optional `family[:qualifier]` restriction on the scan.
    pub column: Option<ColumnSpec>,
    /// Field whose value becomes the aggregation key.
    pub field: String,
    /// Path the `(key, count)` lines are written to.
    pub output: PathBuf,
    /// Partition workers to scan with.
    pub workers: usize,
    pub delimiter: char,
}

impl AnalyzeConfig {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            column: None,
            field: DEFAULT_FIELD.to_string(),
            output: output.into(),
            workers: 4,
            delimiter: '\t',
        }
    }
}

/// End-of-job report.
#[derive(Debug)]
pub struct AnalyzeSummary {
    pub distinct_keys: usize,
    pub counters: CounterSnapshot,
    pub output: PathBuf,
}

/// Runs the analyze job: split the table into partitions, scan each with an
/// independent worker, merge the partial counts, and write the sink.
///
/// Per-record faults are counted and skipped inside the workers; any error
/// this function returns is infrastructure-level and aborts the run.
#[instrument(skip(table, config), fields(output = %config.output.display()))]
pub async fn run(table: Arc<dyn Table>, config: &AnalyzeConfig) -> Result<AnalyzeSummary> {
    let counters = Arc::new(Counters::new());
    let ranges = table.split(config.workers.max(1)).await?;
    info!(partitions = ranges.len(), field = %config.field, "starting analyze scan");

    let mut handles = Vec::with_capacity(ranges.len());
    for range in ranges {
        let table = table.clone();
        let mut scan = Scan::new().with_range(range);
        if let Some(column) = &config.column {
            scan = scan.with_column(column);
        }
        let field = config.field.clone();
        let counters = counters.clone();
        handles.push(tokio::spawn(async move {
            let mut counts = CountMap::new();
            let mut rows = table.scan(&scan).await?;
            while let Some(row) = rows.next().await? {
                mapper::map_row(&row, &field, &counters, &mut counts);
            }
            Ok::<CountMap, JobError>(counts)
        }));
    }

    // Merge is associative and commutative, so completion order is
    // irrelevant; a failed worker aborts the whole run.
    let mut totals = CountMap::new();
    for handle in handles {
        let partial = handle
            .await
            .map_err(|e| JobError::store(format!("analyze worker panicked: {e}")))??;
        totals.merge(partial);
    }

    let snapshot = counters.snapshot();
    counter!("rowflow_analyze_runs_total").increment(1);
    counter!("rowflow_records_valid_total").increment(snapshot.valid);
    counter!("rowflow_records_error_total").increment(snapshot.error);

    let distinct_keys = totals.len();
    write_counts(&config.output, totals, config.delimiter)?;

    info!(distinct_keys, %snapshot, "analyze run complete");
    Ok(AnalyzeSummary {
        distinct_keys,
        counters: snapshot,
        output: config.output.clone(),
    })
}

/// Writes the final counts, one `key<delimiter>count` line per entry, keys
/// sorted lexicographically.
fn write_counts(path: &Path, counts: CountMap, delimiter: char) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut out = std::io::BufWriter::new(file);
    for (key, count) in counts.into_sorted() {
        writeln!(out, "{}{}{}", key, delimiter, count)?;
    }
    out.flush()?;
    Ok(())
}
