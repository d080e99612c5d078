//! Contract for the external key-value store the jobs run against.
//!
//! The store is row-oriented with a two-level column namespace: a column
//! family configured at table creation and a free-form qualifier within it.
//! Jobs only ever touch the store through the [`Table`] trait; the crate
//! ships [`MemoryTable`] for the CLI and tests, and any other backend can be
//! wired in behind the same trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::error::{JobError, Result};

mod memory;

pub use memory::MemoryTable;

/// One (family, qualifier, timestamp) -> value binding within a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub family: String,
    pub qualifier: String,
    /// Milliseconds since the epoch, assigned when the mutation was applied.
    pub timestamp: i64,
    pub value: Vec<u8>,
}

/// A row key plus every cell read for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub key: Vec<u8>,
    pub cells: Vec<Cell>,
}

/// Half-open row-key range; `None` bounds are unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowRange {
    pub start: Option<Vec<u8>>,
    pub end: Option<Vec<u8>>,
}

impl RowRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        if let Some(start) = &self.start {
            if key < start.as_slice() {
                return false;
            }
        }
        if let Some(end) = &self.end {
            if key >= end.as_slice() {
                return false;
            }
        }
        true
    }
}

/// A sequential read over a contiguous row-key range, optionally restricted
/// to one family or one (family, qualifier) column.
#[derive(Debug, Clone, Default)]
pub struct Scan {
    pub range: RowRange,
    pub family: Option<String>,
    pub qualifier: Option<String>,
}

impl Scan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(mut self, range: RowRange) -> Self {
        self.range = range;
        self
    }

    /// Restrict the scan per a parsed `family[:qualifier]` column spec.
    pub fn with_column(mut self, column: &ColumnSpec) -> Self {
        self.family = Some(column.family.clone());
        self.qualifier = column.qualifier.clone();
        self
    }

    fn matches(&self, cell: &Cell) -> bool {
        match (&self.family, &self.qualifier) {
            (Some(f), Some(q)) => cell.family == *f && cell.qualifier == *q,
            (Some(f), None) => cell.family == *f,
            _ => true,
        }
    }

    /// Projects a row down to the scanned columns. `None` when no cell
    /// survives the projection (the row is skipped entirely).
    pub fn project(&self, row: Row) -> Option<Row> {
        if self.family.is_none() {
            return Some(row);
        }
        let cells: Vec<Cell> = row.cells.into_iter().filter(|c| self.matches(c)).collect();
        if cells.is_empty() {
            None
        } else {
            Some(Row { key: row.key, cells })
        }
    }
}

/// One column reference within a [`Get`]: a family, optionally narrowed to a
/// single qualifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub family: String,
    pub qualifier: Option<String>,
}

/// A point read. With `existence_only` set the store reports whether at
/// least one named cell exists without transmitting cell values; naming
/// several qualifiers reports "exists" if any one of them is present.
#[derive(Debug, Clone)]
pub struct Get {
    pub row: Vec<u8>,
    pub columns: Vec<ColumnRef>,
    pub existence_only: bool,
}

impl Get {
    pub fn row(key: impl Into<Vec<u8>>) -> Self {
        Self {
            row: key.into(),
            columns: Vec::new(),
            existence_only: false,
        }
    }

    pub fn add_family(mut self, family: impl Into<String>) -> Self {
        self.columns.push(ColumnRef {
            family: family.into(),
            qualifier: None,
        });
        self
    }

    pub fn add_column(mut self, family: impl Into<String>, qualifier: impl Into<String>) -> Self {
        self.columns.push(ColumnRef {
            family: family.into(),
            qualifier: Some(qualifier.into()),
        });
        self
    }

    pub fn existence_only(mut self) -> Self {
        self.existence_only = true;
        self
    }
}

/// Outcome of a point read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetResult {
    pub exists: bool,
    /// Empty when the read was existence-only.
    pub cells: Vec<Cell>,
}

/// A pending single-row, single-column write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mutation {
    pub row: Vec<u8>,
    pub family: String,
    pub qualifier: String,
    pub value: Vec<u8>,
}

impl Mutation {
    pub fn new(
        row: impl Into<Vec<u8>>,
        family: impl Into<String>,
        qualifier: impl Into<String>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            row: row.into(),
            family: family.into(),
            qualifier: qualifier.into(),
            value: value.into(),
        }
    }
}

/// One rejected mutation within a batch write, by position.
#[derive(Debug, Clone)]
pub struct MutationFailure {
    pub index: usize,
    pub reason: String,
}

/// Lazy forward-only sequence of rows produced by a scan. Restartable by
/// issuing a new scan, never mid-stream; no length bound is assumed.
#[async_trait]
pub trait RowStream: Send {
    async fn next(&mut self) -> Result<Option<Row>>;
}

/// Handle to one table of the external store.
#[async_trait]
pub trait Table: Send + Sync {
    /// Opens a forward-only scan over `scan.range`, projected to the
    /// configured columns.
    async fn scan(&self, scan: &Scan) -> Result<Box<dyn RowStream>>;

    /// Applies a batch of mutations as a unit: either every mutation is
    /// durably applied or the call fails with the per-mutation failure list
    /// and nothing is applied.
    async fn mutate(&self, batch: Vec<Mutation>) -> Result<()>;

    /// Point read; see [`Get`] for existence-only semantics.
    async fn get(&self, get: &Get) -> Result<GetResult>;

    /// Splits the table's key space into at most `partitions` contiguous
    /// ranges that together cover every row.
    async fn split(&self, partitions: usize) -> Result<Vec<RowRange>>;

    /// Single-mutation write.
    async fn put(&self, mutation: Mutation) -> Result<()> {
        self.mutate(vec![mutation]).await
    }

    /// Existence-only point read.
    async fn exists(&self, get: &Get) -> Result<bool> {
        let result = self.get(&get.clone().existence_only()).await?;
        Ok(result.exists)
    }
}

/// A `family[:qualifier]` column reference as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub family: String,
    pub qualifier: Option<String>,
}

impl ColumnSpec {
    /// Splits a column in `family:qualifier` form; the qualifier may be
    /// omitted, the family may not.
    pub fn parse(s: &str) -> Result<Self> {
        let (family, qualifier) = match s.split_once(':') {
            Some((f, q)) => (f, if q.is_empty() { None } else { Some(q.to_string()) }),
            None => (s, None),
        };
        if family.is_empty() {
            return Err(JobError::Config(format!(
                "column '{}' has an empty family",
                s
            )));
        }
        Ok(Self {
            family: family.to_string(),
            qualifier,
        })
    }
}

impl std::str::FromStr for ColumnSpec {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for ColumnSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{}:{}", self.family, q),
            None => write!(f, "{}", self.family),
        }
    }
}

/// Lossy printable form of a row key for logs and diagnostics.
pub fn display_key(key: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(key)
}
