//! Q-table persistence.
//!
//! Tables are stored as JSON `{ "states", "actions", "values" }` with values in
//! state-major order. Nothing in the learning loop depends on this module.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::learning::agent::{QTable, QTableSnapshot, TableError};

/// Write `table` to `path`, replacing any existing file.
pub fn save_table(path: &Path, table: &QTable) -> Result<(), TableError> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer(writer, &table.snapshot())?;
    tracing::info!(path = %path.display(), "Saved Q-table");
    Ok(())
}

/// Read a table written by [`save_table`].
pub fn load_table(path: &Path) -> Result<QTable, TableError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let snapshot: QTableSnapshot = serde_json::from_reader(reader)?;
    let table = QTable::from_snapshot(snapshot)?;
    tracing::info!(path = %path.display(), "Loaded Q-table");
    Ok(table)
}
