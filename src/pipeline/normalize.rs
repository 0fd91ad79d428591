use chrono::{DateTime, Utc};

use super::ingest::LibraryRow;
use super::MoodError;
use crate::catalog::AudioFeatures;
use crate::dates::parse_added_at;

/// An analysis-ready library entry.
#[derive(Debug, Clone)]
pub struct TrackRow {
    /// Chronological index: 0 = oldest saved track.
    pub playlist_place: usize,
    pub id: Option<String>,
    pub name: String,
    pub artists: String,
    /// Explicit flag as 0/1.
    pub explicit: u8,
    /// Popularity rescaled to 0.0–1.0.
    pub popularity: f64,
    pub duration_ms: Option<u64>,
    pub added_at: DateTime<Utc>,
    pub features: AudioFeatures,
}

impl TrackRow {
    pub fn valence(&self) -> Option<f64> {
        self.features.valence
    }

    /// "Name - Artists"
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.name, self.artists)
    }
}

/// Library rows ordered by ascending `playlist_place`; `rows[i].playlist_place == i`.
#[derive(Debug, Clone, Default)]
pub struct LibraryTable {
    rows: Vec<TrackRow>,
}

impl LibraryTable {
    pub fn rows(&self) -> &[TrackRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, place: usize) -> Option<&TrackRow> {
        self.rows.get(place)
    }
}

/// Turn newest-first ingested rows into an oldest-first analysis table.
///
/// Row `i` of `n` gets `playlist_place = n - 1 - i`. The raw uri and local
/// flag are dropped, explicit becomes 0/1 and popularity a fraction.
pub fn normalize(rows: Vec<LibraryRow>) -> Result<LibraryTable, MoodError> {
    let n = rows.len();

    if n > 0 && !rows.iter().any(|r| r.features.as_ref().is_some_and(|f| f.valence.is_some())) {
        return Err(MoodError::MalformedInput(
            "no valence values in ingested library".into(),
        ));
    }

    let mut table = Vec::with_capacity(n);
    for (i, row) in rows.into_iter().enumerate() {
        let place = n - 1 - i;

        let name = row.name.ok_or_else(|| {
            MoodError::MalformedInput(format!("track at position {i} has no name"))
        })?;
        let raw_added = row.added_at.ok_or_else(|| {
            MoodError::MalformedInput(format!("track at position {i} has no added_at"))
        })?;
        let added_at = parse_added_at(&raw_added).ok_or_else(|| {
            MoodError::MalformedInput(format!(
                "track at position {i} has unparseable added_at {raw_added:?}"
            ))
        })?;

        table.push(TrackRow {
            playlist_place: place,
            id: row.id,
            name,
            artists: row.artists,
            explicit: u8::from(row.explicit),
            popularity: f64::from(row.popularity) / 100.0,
            duration_ms: row.duration_ms,
            added_at,
            features: row.features.unwrap_or_default(),
        });
    }

    table.sort_by_key(|r| r.playlist_place);
    Ok(LibraryTable { rows: table })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str, added_at: &str, valence: Option<f64>) -> LibraryRow {
        LibraryRow {
            id: Some(format!("id-{name}")),
            name: Some(name.to_string()),
            artists: "X, Y".into(),
            explicit: true,
            popularity: 73,
            duration_ms: Some(1000),
            is_local: false,
            uri: Some("spotify:track:zzz".into()),
            added_at: Some(added_at.to_string()),
            features: valence.map(|v| AudioFeatures {
                valence: Some(v),
                ..AudioFeatures::default()
            }),
        }
    }

    #[test]
    fn test_places_reverse_row_order() {
        let rows = vec![
            raw("newest", "2023-01-03T00:00:00Z", Some(0.3)),
            raw("middle", "2023-01-02T00:00:00Z", Some(0.2)),
            raw("oldest", "2023-01-01T00:00:00Z", Some(0.1)),
        ];
        let table = normalize(rows).unwrap();

        let names: Vec<&str> = table.rows().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["oldest", "middle", "newest"]);
        for (i, row) in table.rows().iter().enumerate() {
            assert_eq!(row.playlist_place, i);
        }
        assert_eq!(table.get(2).unwrap().valence(), Some(0.3));
    }

    #[test]
    fn test_coerces_explicit_and_popularity() {
        let table = normalize(vec![raw("a", "2023-01-01T00:00:00Z", Some(0.5))]).unwrap();
        let row = &table.rows()[0];
        assert_eq!(row.explicit, 1);
        assert!((row.popularity - 0.73).abs() < 1e-12);
        assert_eq!(row.display_name(), "a - X, Y");
    }

    #[test]
    fn test_absent_features_keep_row() {
        let rows = vec![
            raw("b", "2023-01-02T00:00:00Z", None),
            raw("a", "2023-01-01T00:00:00Z", Some(0.5)),
        ];
        let table = normalize(rows).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1).unwrap().valence(), None);
    }

    #[test]
    fn test_no_valence_is_malformed() {
        let rows = vec![raw("a", "2023-01-01T00:00:00Z", None)];
        assert!(matches!(normalize(rows), Err(MoodError::MalformedInput(_))));
    }

    #[test]
    fn test_bad_timestamp_is_malformed() {
        let rows = vec![raw("a", "not a date", Some(0.5))];
        assert!(matches!(normalize(rows), Err(MoodError::MalformedInput(_))));
    }

    #[test]
    fn test_missing_name_is_malformed() {
        let mut row = raw("a", "2023-01-01T00:00:00Z", Some(0.5));
        row.name = None;
        assert!(matches!(normalize(vec![row]), Err(MoodError::MalformedInput(_))));
    }

    #[test]
    fn test_empty_library() {
        assert!(normalize(Vec::new()).unwrap().is_empty());
    }
}
