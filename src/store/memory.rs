use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::error::{JobError, Result};
use crate::store::{
    Cell, Get, GetResult, Mutation, MutationFailure, Row, RowRange, RowStream, Scan, Table,
};

/// In-memory table implementation: a `BTreeMap` of rows, each a map from
/// (family, qualifier) to the latest cell. Backs the CLI (optionally
/// persisted as a JSON snapshot) and every test.
pub struct MemoryTable {
    rows: Mutex<BTreeMap<Vec<u8>, BTreeMap<(String, String), Cell>>>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            snapshot_path: None,
        }
    }

    /// Opens a table backed by a JSON snapshot file, loading it if present.
    /// Call [`MemoryTable::save`] to persist mutations back.
    pub fn with_snapshot(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut table = Self::new();
        if path.exists() {
            let bytes = std::fs::read(&path)?;
            let rows: Vec<Row> = serde_json::from_slice(&bytes)?;
            let mut map = table.rows.lock().unwrap();
            for row in rows {
                let entry = map.entry(row.key).or_default();
                for cell in row.cells {
                    entry.insert((cell.family.clone(), cell.qualifier.clone()), cell);
                }
            }
            drop(map);
            debug!(path = %path.display(), "loaded table snapshot");
        }
        table.snapshot_path = Some(path);
        Ok(table)
    }

    /// Writes the current contents to the snapshot path, if one was
    /// configured.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let rows = self.collect_rows(&Scan::new());
        let bytes = serde_json::to_vec(&rows)?;
        std::fs::write(path, bytes)?;
        debug!(path = %path.display(), rows = rows.len(), "saved table snapshot");
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    fn collect_rows(&self, scan: &Scan) -> Vec<Row> {
        let map = self.rows.lock().unwrap();
        let lower = match &scan.range.start {
            Some(s) => Bound::Included(s.clone()),
            None => Bound::Unbounded,
        };
        let upper = match &scan.range.end {
            Some(e) => Bound::Excluded(e.clone()),
            None => Bound::Unbounded,
        };
        map.range((lower, upper))
            .filter_map(|(key, cells)| {
                let row = Row {
                    key: key.clone(),
                    cells: cells.values().cloned().collect(),
                };
                scan.project(row)
            })
            .collect()
    }
}

impl Default for MemoryTable {
    fn default() -> Self {
        Self::new()
    }
}

struct MemoryRowStream {
    rows: std::vec::IntoIter<Row>,
}

#[async_trait]
impl RowStream for MemoryRowStream {
    async fn next(&mut self) -> Result<Option<Row>> {
        Ok(self.rows.next())
    }
}

#[async_trait]
impl Table for MemoryTable {
    async fn scan(&self, scan: &Scan) -> Result<Box<dyn RowStream>> {
        let rows = self.collect_rows(scan);
        Ok(Box::new(MemoryRowStream {
            rows: rows.into_iter(),
        }))
    }

    async fn mutate(&self, batch: Vec<Mutation>) -> Result<()> {
        // Validate the whole batch before touching the table so a rejected
        // batch leaves nothing applied.
        let failures: Vec<MutationFailure> = batch
            .iter()
            .enumerate()
            .filter_map(|(index, m)| {
                if m.row.is_empty() {
                    Some(MutationFailure {
                        index,
                        reason: "empty row key".to_string(),
                    })
                } else if m.family.is_empty() {
                    Some(MutationFailure {
                        index,
                        reason: "empty column family".to_string(),
                    })
                } else {
                    None
                }
            })
            .collect();
        if !failures.is_empty() {
            return Err(JobError::Store {
                message: format!("batch write rejected {} mutation(s)", failures.len()),
                failures,
            });
        }

        let timestamp = chrono::Utc::now().timestamp_millis();
        let mut map = self.rows.lock().unwrap();
        let applied = batch.len();
        for m in batch {
            let entry = map.entry(m.row.clone()).or_default();
            entry.insert(
                (m.family.clone(), m.qualifier.clone()),
                Cell {
                    family: m.family,
                    qualifier: m.qualifier,
                    timestamp,
                    value: m.value,
                },
            );
        }
        debug!(mutations = applied, "applied mutation batch");
        Ok(())
    }

    async fn get(&self, get: &Get) -> Result<GetResult> {
        let map = self.rows.lock().unwrap();
        let Some(cells) = map.get(&get.row) else {
            return Ok(GetResult {
                exists: false,
                cells: Vec::new(),
            });
        };

        let matched: Vec<Cell> = if get.columns.is_empty() {
            cells.values().cloned().collect()
        } else {
            cells
                .values()
                .filter(|cell| {
                    get.columns.iter().any(|col| {
                        cell.family == col.family
                            && col
                                .qualifier
                                .as_ref()
                                .map_or(true, |q| cell.qualifier == *q)
                    })
                })
                .cloned()
                .collect()
        };

        let exists = !matched.is_empty();
        Ok(GetResult {
            exists,
            // Existence-only reads never transmit cell values.
            cells: if get.existence_only { Vec::new() } else { matched },
        })
    }

    async fn split(&self, partitions: usize) -> Result<Vec<RowRange>> {
        let keys: Vec<Vec<u8>> = self.rows.lock().unwrap().keys().cloned().collect();
        if partitions <= 1 || keys.len() <= 1 {
            return Ok(vec![RowRange::all()]);
        }

        // Contiguous, non-overlapping ranges with boundaries drawn from the
        // current key population.
        let mut boundaries: Vec<Vec<u8>> = (1..partitions)
            .map(|i| keys[keys.len() * i / partitions].clone())
            .collect();
        boundaries.dedup();

        let mut ranges = Vec::with_capacity(boundaries.len() + 1);
        let mut start: Option<Vec<u8>> = None;
        for boundary in boundaries {
            ranges.push(RowRange {
                start: start.take(),
                end: Some(boundary.clone()),
            });
            start = Some(boundary);
        }
        ranges.push(RowRange { start, end: None });
        Ok(ranges)
    }
}
