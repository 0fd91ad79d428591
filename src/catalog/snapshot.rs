//! Offline catalog backed by a JSON snapshot of an ingested library.
//!
//! A snapshot is the newest-first list of [`LibraryRow`]s produced by
//! ingestion. Serving it back through [`CatalogClient`] gives a stable
//! catalog for reproducible runs.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use super::{ArtistObject, AudioFeatures, CatalogClient, Result, SavedItem, SavedPage, TrackObject};
use crate::pipeline::ingest::LibraryRow;

pub struct SnapshotCatalog {
    rows: Vec<LibraryRow>,
    features: HashMap<String, AudioFeatures>,
}

impl SnapshotCatalog {
    pub fn new(rows: Vec<LibraryRow>) -> Self {
        let features = rows
            .iter()
            .filter_map(|row| Some((row.id.clone()?, row.features.clone()?)))
            .collect();
        Self { rows, features }
    }

    /// Load a snapshot written by [`write_snapshot`].
    pub fn open(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let rows: Vec<LibraryRow> = serde_json::from_reader(reader)?;
        log::info!("Loaded {} rows from snapshot {}", rows.len(), path.display());
        Ok(Self::new(rows))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Write ingested rows as a snapshot file.
pub fn write_snapshot(path: &Path, rows: &[LibraryRow]) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, rows)?;
    log::info!("Wrote {} rows to snapshot {}", rows.len(), path.display());
    Ok(())
}

fn to_saved_item(row: &LibraryRow) -> SavedItem {
    // Artists were already flattened at ingestion; one entry re-joins to the same text.
    let artists = if row.artists.is_empty() {
        Vec::new()
    } else {
        vec![ArtistObject { name: Some(row.artists.clone()) }]
    };
    SavedItem {
        added_at: row.added_at.clone(),
        track: TrackObject {
            id: row.id.clone(),
            name: row.name.clone(),
            artists,
            explicit: row.explicit,
            popularity: row.popularity,
            duration_ms: row.duration_ms,
            is_local: row.is_local,
            uri: row.uri.clone(),
        },
    }
}

impl CatalogClient for SnapshotCatalog {
    fn fetch_saved_page(&self, limit: usize, offset: usize) -> Result<SavedPage> {
        let items = self
            .rows
            .iter()
            .skip(offset)
            .take(limit)
            .map(to_saved_item)
            .collect();
        Ok(SavedPage {
            items,
            total: self.rows.len(),
        })
    }

    fn fetch_audio_features(&self, track_ids: &[&str]) -> Result<Vec<Option<AudioFeatures>>> {
        Ok(track_ids
            .iter()
            .map(|id| self.features.get(*id).cloned())
            .collect())
    }
}
