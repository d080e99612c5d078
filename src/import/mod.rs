//! Import pipeline: stream line-delimited records from a file and write each
//! line as one store mutation under a configured column.

pub mod transform;
pub mod writer;

use metrics::counter;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use crate::counters::{CounterSnapshot, Counters};
use crate::error::{JobError, Result};
use crate::import::transform::{RowKeyPolicy, Transformer};
use crate::import::writer::BatchWriter;
use crate::store::{ColumnSpec, Table};

pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Configuration for one import run.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Target `family:qualifier` column for the imported values.
    pub column: ColumnSpec,
    /// Line-delimited input file.
    pub input: PathBuf,
    /// Mutations buffered per store round trip.
    pub batch_size: usize,
    pub row_key: RowKeyPolicy,
    /// Transform/write workers fed round-robin by the reader.
    pub workers: usize,
}

impl ImportConfig {
    pub fn new(column: ColumnSpec, input: impl Into<PathBuf>) -> Self {
        Self {
            column,
            input: input.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            row_key: RowKeyPolicy::ContentHash,
            workers: 4,
        }
    }
}

/// End-of-job report.
#[derive(Debug)]
pub struct ImportSummary {
    pub counters: CounterSnapshot,
}

/// Runs the import job: one reader task streams lines into per-worker
/// channels; each worker transforms its lines and writes batched mutations.
///
/// A line that cannot be decoded as UTF-8 is skipped and counted, mirroring
/// the analyze side's record isolation; I/O and store failures abort the run.
#[instrument(skip(table, config), fields(input = %config.input.display()))]
pub async fn run(table: Arc<dyn Table>, config: &ImportConfig) -> Result<ImportSummary> {
    let counters = Arc::new(Counters::new());
    let workers = config.workers.max(1);
    let transformer = Transformer::new(&config.column, config.row_key.clone());
    info!(column = %config.column, workers, "starting import");

    let mut senders = Vec::with_capacity(workers);
    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let (tx, mut rx) = mpsc::channel::<String>(256);
        senders.push(tx);
        let mut writer = BatchWriter::new(table.clone(), config.batch_size);
        let transformer = transformer.clone();
        let counters = counters.clone();
        handles.push(tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                let mutation = transformer.transform(&line, &counters);
                writer.write(mutation).await?;
            }
            writer.flush().await?;
            Ok::<(), JobError>(())
        }));
    }

    let file = tokio::fs::File::open(&config.input).await?;
    let mut reader = tokio::io::BufReader::new(file);
    let mut buf = Vec::new();
    let mut line_no = 0u64;
    let mut sent = 0usize;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        line_no += 1;
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        match String::from_utf8(std::mem::take(&mut buf)) {
            Ok(line) => {
                if senders[sent % workers].send(line).await.is_err() {
                    // The worker is gone; its join below reports the cause.
                    break;
                }
                sent += 1;
            }
            Err(e) => {
                warn!(line = line_no, "skipping undecodable line: {e}");
                counters.inc_error();
            }
        }
    }
    drop(senders);

    for handle in handles {
        handle
            .await
            .map_err(|e| JobError::store(format!("import worker panicked: {e}")))??;
    }

    let snapshot = counters.snapshot();
    counter!("rowflow_import_runs_total").increment(1);
    counter!("rowflow_lines_imported_total").increment(snapshot.lines);

    info!(%snapshot, "import run complete");
    Ok(ImportSummary { counters: snapshot })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTable;
    use std::io::Write;

    fn input_file(dir: &tempfile::TempDir, lines: &[&str]) -> PathBuf {
        let path = dir.path().join("input.jsonl");
        let mut f = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(f, "{line}").unwrap();
        }
        path
    }

    #[tokio::test]
    async fn imports_one_row_per_line_with_content_hash_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = input_file(
            &dir,
            &[
                r#"{"email":"a@x.com"}"#,
                r#"{"email":"b@x.com"}"#,
                r#"{"email":"c@x.com"}"#,
            ],
        );

        let table = Arc::new(MemoryTable::new());
        let config = ImportConfig::new(ColumnSpec::parse("data:json").unwrap(), path);
        let summary = run(table.clone(), &config).await.unwrap();

        assert_eq!(summary.counters.lines, 3);
        assert_eq!(summary.counters.error, 0);
        assert_eq!(table.row_count(), 3);
    }

    #[tokio::test]
    async fn fixed_row_key_collapses_onto_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = input_file(&dir, &["line one", "line two"]);

        let table = Arc::new(MemoryTable::new());
        let mut config = ImportConfig::new(ColumnSpec::parse("data:json").unwrap(), path);
        config.row_key = RowKeyPolicy::Fixed("rowKey1".to_string());
        let summary = run(table.clone(), &config).await.unwrap();

        assert_eq!(summary.counters.lines, 2);
        assert_eq!(table.row_count(), 1);
    }

    #[tokio::test]
    async fn undecodable_line_is_skipped_and_counted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.jsonl");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"{\"email\":\"a@x.com\"}\n").unwrap();
        f.write_all(&[0xff, 0xfe, b'\n']).unwrap();
        f.write_all(b"{\"email\":\"b@x.com\"}\n").unwrap();
        drop(f);

        let table = Arc::new(MemoryTable::new());
        let config = ImportConfig::new(ColumnSpec::parse("data:json").unwrap(), path);
        let summary = run(table.clone(), &config).await.unwrap();

        assert_eq!(summary.counters.lines, 2);
        assert_eq!(summary.counters.error, 1);
        assert_eq!(table.row_count(), 2);
    }

    #[tokio::test]
    async fn missing_input_is_fatal() {
        let table = Arc::new(MemoryTable::new());
        let config = ImportConfig::new(
            ColumnSpec::parse("data:json").unwrap(),
            "/nonexistent/input.jsonl",
        );
        assert!(matches!(
            run(table, &config).await,
            Err(JobError::Io(_))
        ));
    }
}
