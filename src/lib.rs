//! rowflow: batch data movement for a row-oriented, column-family key-value
//! store.
//!
//! Two single-pass batch jobs share one data model: [`import`] turns
//! line-delimited records into store mutations, and [`analyze`] scans a
//! table, parses cell values as JSON records, and counts occurrences of a
//! configured field. The store itself sits behind [`store::Table`].

pub mod analyze;
pub mod counters;
pub mod error;
pub mod import;
pub mod logging;
pub mod store;
