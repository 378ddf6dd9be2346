//! Flat-file backend: two header-less CSV files appended per race.
//!
//! The info file is the commit record. Entrant rows go to the data file
//! first; if the info row cannot be appended, the data file is truncated back
//! to its previous length so the race leaves no trace.

use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::row::{csv_field, entrant_row, race_info_row, Cell};
use super::RaceStore;
use crate::error::CrawlError;
use crate::race_id::RaceId;
use crate::types::{EntrantResult, RaceInfo};

/// CSV-backed race store
pub struct CsvRepository {
    info_path: PathBuf,
    data_path: PathBuf,
    /// Persisted race IDs, loaded from the info file at open
    known: BTreeSet<RaceId>,
}

impl CsvRepository {
    /// Open the store, loading the existing index from the info file
    pub fn open(info_path: &Path, data_path: &Path) -> Result<Self> {
        for path in [info_path, data_path] {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create {}", parent.display()))?;
                }
            }
        }

        let known = load_index(info_path)?;
        debug!("Loaded {} races from {}", known.len(), info_path.display());

        Ok(Self {
            info_path: info_path.to_path_buf(),
            data_path: data_path.to_path_buf(),
            known,
        })
    }

    /// Number of races recorded in the info file
    pub fn len(&self) -> usize {
        self.known.len()
    }
}

fn load_index(path: &Path) -> Result<BTreeSet<RaceId>> {
    let mut known = BTreeSet::new();
    if !path.exists() {
        return Ok(known);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    for record in reader.records() {
        let record = record.with_context(|| format!("Failed to read {}", path.display()))?;
        let Some(id_text) = record.get(0) else {
            continue;
        };
        match id_text.parse::<RaceId>() {
            Ok(race_id) => {
                known.insert(race_id);
            }
            Err(_) => warn!("Ignoring malformed race_id in {}: {}", path.display(), id_text),
        }
    }

    Ok(known)
}

fn unavailable(e: impl std::fmt::Display) -> CrawlError {
    CrawlError::PersistenceUnavailable(e.to_string())
}

/// Serialize rows into CSV bytes
fn encode<I>(rows: I) -> Result<Vec<u8>, CrawlError>
where
    I: IntoIterator<Item = Vec<Cell>>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    for row in rows {
        writer
            .write_record(row.iter().map(csv_field))
            .map_err(unavailable)?;
    }
    writer.into_inner().map_err(unavailable)
}

/// Append bytes to a file, returning its length before the append.
/// A failed write is truncated away.
fn append(path: &Path, bytes: &[u8]) -> io::Result<u64> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let previous_len = file.metadata()?.len();

    if let Err(e) = file.write_all(bytes).and_then(|_| file.flush()) {
        if let Err(te) = file.set_len(previous_len) {
            warn!(
                "Failed to truncate {} back to {} bytes: {}",
                path.display(),
                previous_len,
                te
            );
        }
        return Err(e);
    }
    Ok(previous_len)
}

fn truncate(path: &Path, len: u64) -> io::Result<()> {
    OpenOptions::new().write(true).open(path)?.set_len(len)
}

impl RaceStore for CsvRepository {
    fn existing(&self, start_year: u16, end_year: u16) -> Result<BTreeSet<RaceId>, CrawlError> {
        Ok(self
            .known
            .iter()
            .filter(|id| (start_year..=end_year).contains(&id.year()))
            .copied()
            .collect())
    }

    fn write(&mut self, info: &RaceInfo, entries: &[EntrantResult]) -> Result<(), CrawlError> {
        if self.known.contains(&info.race_id) {
            return Err(CrawlError::PersistenceConflict(info.race_id));
        }

        let info_bytes = encode(std::iter::once(race_info_row(info)))?;
        let data_bytes = encode(entries.iter().map(entrant_row))?;

        let data_len = append(&self.data_path, &data_bytes).map_err(unavailable)?;
        if let Err(e) = append(&self.info_path, &info_bytes) {
            if let Err(te) = truncate(&self.data_path, data_len) {
                warn!(
                    "Failed to roll back {} for race {}: {}",
                    self.data_path.display(),
                    info.race_id,
                    te
                );
            }
            return Err(unavailable(e));
        }

        self.known.insert(info.race_id);
        Ok(())
    }
}
