use tracing::{debug, warn};

use crate::analyze::aggregate::CountMap;
use crate::analyze::record;
use crate::counters::Counters;
use crate::store::{display_key, Row};

/// Drives one scanned row through parse + extract for every cell it carries.
///
/// Failure isolation: a malformed cell increments ERROR and is logged with
/// the row key and raw value for diagnosis; it never aborts the row or the
/// job. ROWS/COLS count every record seen, valid or not.
pub fn map_row(row: &Row, field: &str, counters: &Counters, counts: &mut CountMap) {
    counters.inc_rows();
    for cell in &row.cells {
        counters.inc_cols();
        let key = record::parse(&cell.value).and_then(|rec| {
            record::extract(&rec, field).map(str::to_string)
        });
        match key {
            Ok(key) => {
                debug!(%key, "extracted aggregation key");
                counts.add(&key);
                counters.inc_valid();
            }
            Err(e) => {
                warn!(
                    row = %display_key(&row.key),
                    column = format!("{}:{}", cell.family, cell.qualifier),
                    raw = %String::from_utf8_lossy(&cell.value),
                    "skipping record: {e}"
                );
                counters.inc_error();
            }
        }
    }
}
