use std::collections::HashMap;

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};

use crate::catalog::{AudioFeatures, CatalogClient, Result, SavedItem};

/// One ingested saved-library entry: trimmed track metadata, the time it was
/// added, and its audio features (absent when the catalog had none).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryRow {
    pub id: Option<String>,
    pub name: Option<String>,
    /// Artist names flattened to "A, B".
    pub artists: String,
    pub explicit: bool,
    pub popularity: u32,
    pub duration_ms: Option<u64>,
    pub is_local: bool,
    pub uri: Option<String>,
    pub added_at: Option<String>,
    pub features: Option<AudioFeatures>,
}

impl LibraryRow {
    fn from_item(item: SavedItem) -> Self {
        let artists = item.track.artist_names();
        let track = item.track;
        Self {
            id: track.id,
            name: track.name,
            artists,
            explicit: track.explicit,
            popularity: track.popularity,
            duration_ms: track.duration_ms,
            is_local: track.is_local,
            uri: track.uri,
            added_at: item.added_at,
            features: None,
        }
    }
}

/// Fetch the whole saved library, newest first, with audio features attached.
///
/// Pages are requested sequentially from offset 0 until an empty page, a short
/// page, or the reported total is reached. Any catalog failure aborts the whole
/// ingestion.
pub fn ingest_library<C: CatalogClient>(
    client: &C,
    page_size: usize,
    feature_batch_size: usize,
) -> Result<Vec<LibraryRow>> {
    let page_size = page_size.max(1);
    let mut rows: Vec<LibraryRow> = Vec::new();
    let mut offset = 0;
    let mut pb: Option<ProgressBar> = None;

    loop {
        let page = client.fetch_saved_page(page_size, offset)?;
        if page.items.is_empty() {
            break;
        }

        let pb = pb.get_or_insert_with(|| progress_bar(page.total));
        let returned = page.items.len();
        log::debug!("Saved tracks page at offset {offset}: {returned} of {} total", page.total);

        let mut page_rows: Vec<LibraryRow> =
            page.items.into_iter().map(LibraryRow::from_item).collect();
        let ids: Vec<Option<&str>> = page_rows.iter().map(|r| r.id.as_deref()).collect();
        let features = fetch_features_batched(client, &ids, feature_batch_size)?;

        for (row, feature) in page_rows.iter_mut().zip(features) {
            row.features = feature;
        }
        rows.append(&mut page_rows);
        pb.set_position(rows.len() as u64);

        offset += page_size;
        if offset >= page.total {
            break;
        }
        if returned < page_size {
            break; // Last page
        }
    }

    if let Some(pb) = pb {
        pb.finish_with_message(format!("Fetched {} tracks", rows.len()));
    }
    Ok(rows)
}

fn progress_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    let style = ProgressStyle::with_template(
        "  [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} tracks {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("##-");
    pb.set_style(style);
    pb
}

/// Look up audio features in sub-batches of `batch_size`, keeping positions.
///
/// Missing or empty identifiers are never sent upstream and yield `None` at
/// their position, as do identifiers the catalog does not know.
pub fn fetch_features_batched<C: CatalogClient>(
    client: &C,
    track_ids: &[Option<&str>],
    batch_size: usize,
) -> Result<Vec<Option<AudioFeatures>>> {
    let batch_size = batch_size.max(1);
    let mut by_position: HashMap<usize, AudioFeatures> = HashMap::new();
    let mut buffer: Vec<(usize, &str)> = Vec::with_capacity(batch_size);

    for (pos, id) in track_ids.iter().enumerate() {
        match id {
            Some(id) if !id.is_empty() => buffer.push((pos, *id)),
            _ => continue,
        }
        if buffer.len() >= batch_size {
            flush_batch(client, &mut buffer, &mut by_position)?;
        }
    }
    flush_batch(client, &mut buffer, &mut by_position)?;

    Ok((0..track_ids.len())
        .map(|pos| by_position.remove(&pos))
        .collect())
}

fn flush_batch<C: CatalogClient>(
    client: &C,
    buffer: &mut Vec<(usize, &str)>,
    by_position: &mut HashMap<usize, AudioFeatures>,
) -> Result<()> {
    if buffer.is_empty() {
        return Ok(());
    }
    let ids: Vec<&str> = buffer.iter().map(|(_, id)| *id).collect();
    let response = client.fetch_audio_features(&ids)?;
    log::debug!("Audio features: {} requested, {} returned", ids.len(), response.len());

    for ((pos, _), feature) in buffer.iter().zip(response) {
        if let Some(feature) = feature {
            by_position.insert(*pos, feature);
        }
    }
    buffer.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fake::FakeCatalog;
    use crate::catalog::CatalogError;

    #[test]
    fn test_ingest_pages_until_total() {
        let catalog = FakeCatalog::with_valences(&vec![0.5; 120]);
        let rows = ingest_library(&catalog, 50, 20).unwrap();

        assert_eq!(rows.len(), 120);
        assert_eq!(*catalog.page_calls.borrow(), vec![(50, 0), (50, 50), (50, 100)]);
        // Newest first, as the catalog returned them.
        assert_eq!(rows[0].id.as_deref(), Some("track00119"));
        assert_eq!(rows[119].id.as_deref(), Some("track00000"));
        assert_eq!(rows[0].artists, "Artist, Guest");
        assert!(rows.iter().all(|r| r.features.is_some()));
    }

    #[test]
    fn test_ingest_feature_batches_of_twenty() {
        let catalog = FakeCatalog::with_valences(&vec![0.5; 50]);
        ingest_library(&catalog, 50, 20).unwrap();

        let sizes: Vec<usize> = catalog.feature_calls.borrow().iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![20, 20, 10]);
    }

    #[test]
    fn test_ingest_stops_on_short_page() {
        let mut catalog = FakeCatalog::with_valences(&vec![0.5; 70]);
        // Catalog over-reports its size; the short second page ends paging.
        catalog.reported_total = Some(500);
        let rows = ingest_library(&catalog, 50, 20).unwrap();
        assert_eq!(rows.len(), 70);
        assert_eq!(catalog.page_calls.borrow().len(), 2);
    }

    #[test]
    fn test_ingest_stops_on_empty_page() {
        let mut catalog = FakeCatalog::with_valences(&vec![0.5; 100]);
        catalog.reported_total = Some(500);
        let rows = ingest_library(&catalog, 50, 20).unwrap();
        assert_eq!(rows.len(), 100);
        assert_eq!(*catalog.page_calls.borrow(), vec![(50, 0), (50, 50), (50, 100)]);
    }

    #[test]
    fn test_ingest_zero_page_size_still_advances() {
        let catalog = FakeCatalog::with_valences(&vec![0.5; 3]);
        let rows = ingest_library(&catalog, 0, 20).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(*catalog.page_calls.borrow(), vec![(1, 0), (1, 1), (1, 2)]);
    }

    #[test]
    fn test_ingest_propagates_page_failure() {
        let mut catalog = FakeCatalog::with_valences(&vec![0.5; 120]);
        catalog.fail_page_call = Some(1);
        let err = ingest_library(&catalog, 50, 20).unwrap_err();
        assert!(matches!(err, CatalogError::RateLimited { .. }));
        assert_eq!(catalog.page_calls.borrow().len(), 2);
    }

    #[test]
    fn test_ingest_empty_library() {
        let catalog = FakeCatalog::default();
        let rows = ingest_library(&catalog, 50, 20).unwrap();
        assert!(rows.is_empty());
        assert!(catalog.feature_calls.borrow().is_empty());
    }

    #[test]
    fn test_ingest_propagates_feature_failure() {
        let mut catalog = FakeCatalog::with_valences(&vec![0.5; 120]);
        catalog.fail_feature_call = Some(4);
        let err = ingest_library(&catalog, 50, 20).unwrap_err();
        assert!(matches!(err, CatalogError::Status { status: 503, .. }));
    }

    #[test]
    fn test_batched_features_keep_positions() {
        let catalog = FakeCatalog::with_valences(&vec![0.5; 60]);
        let mut owned: Vec<String> = (0..60).map(|i| format!("track{i:05}")).collect();
        owned[10] = "not-a-track".into();
        owned[45] = String::new();
        let ids: Vec<Option<&str>> = owned.iter().map(|s| Some(s.as_str())).collect();

        let features = fetch_features_batched(&catalog, &ids, 20).unwrap();

        assert_eq!(features.len(), 60);
        for (pos, feature) in features.iter().enumerate() {
            if pos == 10 || pos == 45 {
                assert!(feature.is_none(), "position {pos} should be absent");
            } else {
                assert!(feature.is_some(), "position {pos} should be present");
            }
        }
        // The empty identifier never reaches the catalog.
        let sent: usize = catalog.feature_calls.borrow().iter().map(|c| c.len()).sum();
        assert_eq!(sent, 59);
        assert!(catalog.feature_calls.borrow().iter().all(|c| c.len() <= 20));
    }

    #[test]
    fn test_batched_features_missing_ids() {
        let catalog = FakeCatalog::with_valences(&[0.1, 0.2, 0.3]);
        let ids = [Some("track00000"), None, Some("track00002")];
        let features = fetch_features_batched(&catalog, &ids, 20).unwrap();
        assert_eq!(features[0].as_ref().unwrap().valence, Some(0.1));
        assert!(features[1].is_none());
        assert_eq!(features[2].as_ref().unwrap().valence, Some(0.3));
    }
}
