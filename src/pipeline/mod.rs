pub mod ingest;
pub mod normalize;
pub mod periods;
pub mod series;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{CatalogClient, CatalogError};
use crate::cycles::{BasinDetector, CycleDetector, CycleFilter, extract_cycles};
use periods::Period;
use series::DateSeries;

#[derive(Error, Debug)]
pub enum MoodError {
    #[error("only {rows} saved tracks, at least {required} are needed to find mood cycles")]
    InsufficientData { rows: usize, required: usize },
    #[error("catalog error: {0}")]
    Upstream(#[from] CatalogError),
    #[error("malformed library data: {0}")]
    MalformedInput(String),
}

pub type Result<T> = std::result::Result<T, MoodError>;

/// Ingestion and smoothing settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Requested rolling window; only honoured for libraries of up to 1000
    /// tracks, and never below 60.
    pub rolling_window: usize,
    /// Saved tracks requested per page.
    pub page_size: usize,
    /// Track ids per audio-features request.
    pub feature_batch_size: usize,
    /// Smallest library the analysis will run on.
    pub min_tracks: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rolling_window: 60,
            page_size: 50,
            feature_batch_size: 20,
            min_tracks: 150,
        }
    }
}

/// Padding, in entries, around a period when slicing its chart.
const CHART_PADDING: usize = 3;

/// Result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodProfile {
    periods: Vec<Period>,
    labels: Vec<String>,
    values: Vec<f64>,
    places: Vec<usize>,
    rolling_window: usize,
}

/// A slice of the labelled series around one period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartWindow<'a> {
    pub labels: &'a [String],
    pub values: &'a [f64],
}

impl MoodProfile {
    fn assemble(periods: Vec<Period>, dated: DateSeries, rolling_window: usize) -> Self {
        Self {
            periods,
            labels: dated.labels,
            values: dated.values,
            places: dated.places,
            rolling_window,
        }
    }

    /// Periods, deepest cycle first (at most the configured maximum).
    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    /// Date labels of the smoothed series, oldest first.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Rolling valence, index-aligned with [`labels`](Self::labels).
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Playlist place of each labelled point.
    pub fn places(&self) -> &[usize] {
        &self.places
    }

    pub fn rolling_window(&self) -> usize {
        self.rolling_window
    }

    /// Labelled points from a period's start track to its end track, padded by
    /// a few entries either side and clamped to the series.
    pub fn period_chart(&self, period: &Period) -> ChartWindow<'_> {
        let lo = period.song_start_index.saturating_sub(CHART_PADDING);
        let hi = period.song_end_index + CHART_PADDING;
        let from = self.places.partition_point(|&p| p < lo);
        let to = self.places.partition_point(|&p| p < hi);
        ChartWindow {
            labels: &self.labels[from..to],
            values: &self.values[from..to],
        }
    }
}

/// Run the full analysis with the built-in cycle detector.
pub fn build_mood_profile<C: CatalogClient>(
    client: &C,
    config: &PipelineConfig,
    filter: &CycleFilter,
) -> Result<MoodProfile> {
    build_mood_profile_with(client, config, filter, &BasinDetector)
}

/// Run the full analysis: ingest, normalize, smooth, detect, enrich, assemble.
///
/// Fails without a profile if the library is too small, the catalog errors,
/// or the ingested data lacks required fields.
pub fn build_mood_profile_with<C: CatalogClient>(
    client: &C,
    config: &PipelineConfig,
    filter: &CycleFilter,
    detector: &dyn CycleDetector,
) -> Result<MoodProfile> {
    let rows = ingest::ingest_library(client, config.page_size, config.feature_batch_size)?;
    let total = rows.len();
    log::info!("Fetched {total} saved tracks");

    if total < config.min_tracks {
        return Err(MoodError::InsufficientData {
            rows: total,
            required: config.min_tracks,
        });
    }

    let window = series::effective_window(total, config.rolling_window);
    log::info!("Using rolling window of {window}");

    let table = normalize::normalize(rows)?;
    let smoothed = series::rolling_valence(&table, window);
    let dated = series::date_series(&table, &smoothed);

    let cycles = extract_cycles(&smoothed, detector, filter);
    let periods = periods::enrich_periods(&cycles, &table)?;

    Ok(MoodProfile::assemble(periods, dated, window))
}
