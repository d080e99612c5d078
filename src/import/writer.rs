use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::store::{Mutation, Table};

/// Buffers mutations and hands them to the store in batches.
///
/// Batch size is a throughput knob only; correctness never depends on it.
/// Each batch is applied all-or-nothing by the store, and a rejected batch
/// surfaces as an infrastructure error.
pub struct BatchWriter {
    table: Arc<dyn Table>,
    capacity: usize,
    buffer: Vec<Mutation>,
}

impl BatchWriter {
    pub fn new(table: Arc<dyn Table>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            table,
            capacity,
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub async fn write(&mut self, mutation: Mutation) -> Result<()> {
        self.buffer.push(mutation);
        if self.buffer.len() >= self.capacity {
            self.flush().await?;
        }
        Ok(())
    }

    /// Flushes any buffered mutations. Must be called once more after the
    /// last `write`.
    pub async fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let batch = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.capacity));
        debug!(mutations = batch.len(), "flushing mutation batch");
        self.table.mutate(batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTable;

    fn mutation(n: u8) -> Mutation {
        Mutation::new(vec![n], "data", "json", b"{}".to_vec())
    }

    #[tokio::test]
    async fn flushes_when_capacity_reached() {
        let table = Arc::new(MemoryTable::new());
        let mut writer = BatchWriter::new(table.clone(), 2);

        writer.write(mutation(1)).await.unwrap();
        assert_eq!(table.row_count(), 0);
        writer.write(mutation(2)).await.unwrap();
        assert_eq!(table.row_count(), 2);
    }

    #[tokio::test]
    async fn final_flush_drains_partial_batch() {
        let table = Arc::new(MemoryTable::new());
        let mut writer = BatchWriter::new(table.clone(), 64);

        for n in 0..5 {
            writer.write(mutation(n)).await.unwrap();
        }
        assert_eq!(table.row_count(), 0);
        writer.flush().await.unwrap();
        assert_eq!(table.row_count(), 5);

        // Flushing an empty buffer is a no-op.
        writer.flush().await.unwrap();
        assert_eq!(table.row_count(), 5);
    }

    #[tokio::test]
    async fn batch_size_does_not_change_outcome() {
        for capacity in [1, 3, 64] {
            let table = Arc::new(MemoryTable::new());
            let mut writer = BatchWriter::new(table.clone(), capacity);
            for n in 0..7 {
                writer.write(mutation(n)).await.unwrap();
            }
            writer.flush().await.unwrap();
            assert_eq!(table.row_count(), 7, "capacity {}", capacity);
        }
    }
}
