//! Loading dictionary snapshots from the administration boundary.
//!
//! The administration side owns entry CRUD; the proxy only ever sees a full
//! JSON array of records and turns it into an immutable snapshot.

use std::path::Path;

use tracing::{info, warn};

use crate::dictionary::entry::DictionaryEntry;
use crate::error::{Result, TatkhamError};

/// Read a dictionary file and return validated entries.
///
/// Records with an empty term are dropped; confidences are clamped to
/// `[0, 1]`. Duplicate terms are kept in file order so that the snapshot
/// builder's last-wins rule applies.
pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Vec<DictionaryEntry>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| TatkhamError::dictionary(format!("cannot read {}: {e}", path.display())))?;

    let records: Vec<DictionaryEntry> = serde_json::from_str(&raw)
        .map_err(|e| TatkhamError::dictionary(format!("cannot parse {}: {e}", path.display())))?;

    let total = records.len();
    let mut entries = Vec::with_capacity(total);
    for mut record in records {
        if record.term.trim().is_empty() {
            continue;
        }
        if !record.confidence.is_finite() {
            record.confidence = 1.0;
        }
        record.confidence = record.confidence.clamp(0.0, 1.0);
        entries.push(record);
    }

    let dropped = total - entries.len();
    if dropped > 0 {
        warn!(dropped, "dictionary records with empty terms were dropped");
    }
    info!(
        path = %path.display(),
        entries = entries.len(),
        "dictionary snapshot loaded"
    );

    Ok(entries)
}
