use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use rowflow::analyze::{self, AnalyzeConfig, DEFAULT_FIELD};
use rowflow::import::{self, transform::RowKeyPolicy, ImportConfig, DEFAULT_BATCH_SIZE};
use rowflow::logging;
use rowflow::store::{ColumnSpec, MemoryTable, Table};

#[derive(Parser)]
#[command(name = "rowflow")]
#[command(about = "Batch import and analyze jobs over a column-family key-value store")]
#[command(version = "0.1.0")]
struct Cli {
    /// Directory holding the table snapshots the jobs run against
    #[arg(long, global = true, default_value = "data")]
    store: PathBuf,

    /// Switch on DEBUG log level
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import line-delimited records into a table
    Import {
        /// Table to import into
        #[arg(long, short = 't')]
        table: String,
        /// Column to store row data into (family:qualifier)
        #[arg(long, short = 'c', value_parser = ColumnSpec::parse)]
        column: ColumnSpec,
        /// The file to read from
        #[arg(long, short = 'i')]
        input: PathBuf,
        /// Mutations buffered per store round trip
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        /// Write every line under this fixed row key instead of a content
        /// hash. Lossy: later lines overwrite earlier ones in the column.
        #[arg(long)]
        fixed_row_key: Option<String>,
        /// Transform/write workers
        #[arg(long, default_value_t = 4)]
        workers: usize,
    },
    /// Scan a table, parse stored JSON records, and count per-key occurrences
    Analyze {
        /// Table to read from (must exist)
        #[arg(long, short = 't')]
        table: String,
        /// The file to write the (key, count) lines to
        #[arg(long, short = 'o')]
        output: PathBuf,
        /// Restrict the scan to one column (family[:qualifier])
        #[arg(long, short = 'c', value_parser = ColumnSpec::parse)]
        column: Option<ColumnSpec>,
        /// Field whose value is the aggregation key
        #[arg(long, default_value = DEFAULT_FIELD)]
        field: String,
        /// Scan partition workers
        #[arg(long, default_value_t = 4)]
        workers: usize,
        /// Separator between key and count in the output
        #[arg(long, default_value_t = '\t')]
        delimiter: char,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.debug);

    match cli.command {
        Commands::Import {
            table,
            column,
            input,
            batch_size,
            fixed_row_key,
            workers,
        } => {
            std::fs::create_dir_all(&cli.store)?;
            let snapshot = cli.store.join(format!("{table}.json"));
            let mem = Arc::new(MemoryTable::with_snapshot(&snapshot)?);

            let mut config = ImportConfig::new(column, input);
            config.batch_size = batch_size;
            config.workers = workers;
            if let Some(key) = fixed_row_key {
                config.row_key = RowKeyPolicy::Fixed(key);
            }

            let summary = import::run(mem.clone() as Arc<dyn Table>, &config).await?;
            mem.save()?;

            println!("Import into '{}' complete", table);
            println!("   Counters: {}", summary.counters);
        }
        Commands::Analyze {
            table,
            output,
            column,
            field,
            workers,
            delimiter,
        } => {
            let snapshot = cli.store.join(format!("{table}.json"));
            if !snapshot.exists() {
                bail!("table '{}' not found under {}", table, cli.store.display());
            }
            let mem = Arc::new(MemoryTable::with_snapshot(&snapshot)?);

            let mut config = AnalyzeConfig::new(output);
            config.column = column;
            config.field = field;
            config.workers = workers;
            config.delimiter = delimiter;

            let summary = analyze::run(mem as Arc<dyn Table>, &config).await?;

            println!("Analyze of '{}' complete", table);
            println!("   Distinct keys: {}", summary.distinct_keys);
            println!("   Counters: {}", summary.counters);
            println!("   Output file: {}", summary.output.display());
        }
    }
    Ok(())
}
