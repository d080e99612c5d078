use std::sync::atomic::{AtomicU64, Ordering};

/// Job-scoped counters, shared across partition workers via `Arc`.
///
/// Initialized to zero at job start, incremented monotonically during the
/// run, read once the run completes. Never persisted.
#[derive(Debug, Default)]
pub struct Counters {
    rows: AtomicU64,
    cols: AtomicU64,
    valid: AtomicU64,
    error: AtomicU64,
    lines: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_rows(&self) {
        self.rows.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cols(&self) {
        self.cols.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_valid(&self) {
        self.valid.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_error(&self) {
        self.error.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_lines(&self) {
        self.lines.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            rows: self.rows.load(Ordering::Relaxed),
            cols: self.cols.load(Ordering::Relaxed),
            valid: self.valid.load(Ordering::Relaxed),
            error: self.error.load(Ordering::Relaxed),
            lines: self.lines.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters, reported in the end-of-job summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub rows: u64,
    pub cols: u64,
    pub valid: u64,
    pub error: u64,
    pub lines: u64,
}

impl std::fmt::Display for CounterSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rows={} cols={} valid={} error={} lines={}",
            self.rows, self.cols, self.valid, self.error, self.lines
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn counters_start_at_zero() {
        let c = Counters::new();
        let snap = c.snapshot();
        assert_eq!(snap.rows, 0);
        assert_eq!(snap.lines, 0);
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let counters = Arc::new(Counters::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let c = counters.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..1000 {
                    c.inc_valid();
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(counters.snapshot().valid, 8000);
    }
}
