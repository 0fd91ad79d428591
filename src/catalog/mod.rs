pub mod snapshot;
pub mod spotify;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use snapshot::SnapshotCatalog;
pub use spotify::SpotifyCatalog;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },
    #[error("{endpoint} is rate limited (HTTP 429)")]
    RateLimited { endpoint: String },
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },
    #[error("failed to decode {endpoint} response: {message}")]
    Decode { endpoint: String, message: String },
    #[error("snapshot IO error: {0}")]
    SnapshotIo(#[from] std::io::Error),
    #[error("snapshot JSON error: {0}")]
    SnapshotJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// One page of the user's saved tracks, newest first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SavedPage {
    #[serde(default)]
    pub items: Vec<SavedItem>,
    /// Library size as reported by the catalog.
    #[serde(default)]
    pub total: usize,
}

/// A saved-library entry: the track plus when the user added it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SavedItem {
    pub added_at: Option<String>,
    pub track: TrackObject,
}

/// Track metadata as returned by the catalog.
///
/// Only the fields the pipeline uses are declared; album, markets, external
/// ids/urls, preview url, href and track/disc numbers are dropped on decode.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TrackObject {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub artists: Vec<ArtistObject>,
    #[serde(default)]
    pub explicit: bool,
    #[serde(default)]
    pub popularity: u32,
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub is_local: bool,
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ArtistObject {
    pub name: Option<String>,
}

impl TrackObject {
    /// Artist names joined for display ("A, B"), skipping unnamed entries.
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .filter_map(|a| a.name.as_deref())
            .filter(|n| !n.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Per-track audio feature scalars.
///
/// Valence is the only one the mood analysis reads; the rest ride along
/// with each row.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AudioFeatures {
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub key: Option<i32>,
    pub loudness: Option<f64>,
    pub mode: Option<i32>,
    pub speechiness: Option<f64>,
    pub acousticness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub liveness: Option<f64>,
    pub valence: Option<f64>,
    pub tempo: Option<f64>,
    pub time_signature: Option<i32>,
}

/// The two catalog capabilities the pipeline consumes.
pub trait CatalogClient {
    /// Fetch `limit` saved tracks starting at `offset`.
    fn fetch_saved_page(&self, limit: usize, offset: usize) -> Result<SavedPage>;

    /// Fetch audio features for `track_ids`. The result has the same length
    /// and order as the input, with `None` for unknown identifiers.
    fn fetch_audio_features(&self, track_ids: &[&str]) -> Result<Vec<Option<AudioFeatures>>>;
}

impl<C: CatalogClient + ?Sized> CatalogClient for &C {
    fn fetch_saved_page(&self, limit: usize, offset: usize) -> Result<SavedPage> {
        (**self).fetch_saved_page(limit, offset)
    }

    fn fetch_audio_features(&self, track_ids: &[&str]) -> Result<Vec<Option<AudioFeatures>>> {
        (**self).fetch_audio_features(track_ids)
    }
}
