use super::normalize::LibraryTable;
use crate::dates::format_pretty_date;

/// Libraries larger than this always use [`LARGE_LIBRARY_WINDOW`].
pub const LARGE_LIBRARY_ROWS: usize = 1000;
pub const LARGE_LIBRARY_WINDOW: usize = 100;
/// Smallest window used for libraries up to [`LARGE_LIBRARY_ROWS`].
pub const MIN_WINDOW: usize = 60;

/// Pick the rolling window for a library of `rows` tracks.
pub fn effective_window(rows: usize, requested: usize) -> usize {
    if rows > LARGE_LIBRARY_ROWS {
        LARGE_LIBRARY_WINDOW
    } else {
        requested.max(MIN_WINDOW)
    }
}

/// Rolling-mean valence indexed by playlist place (oldest first).
///
/// `values[place]` is `None` until a full window of defined valences exists.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub values: Vec<Option<f64>>,
}

impl TimeSeries {
    /// Defined points as `(place, value)`, in place order.
    pub fn points(&self) -> Vec<(usize, f64)> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(place, v)| v.map(|v| (place, v)))
            .collect()
    }
}

/// Display series: date labels with the rolling value at that track, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DateSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    /// Playlist place of each labelled point.
    pub places: Vec<usize>,
}

/// Trailing rolling mean of `values` over `window` points.
///
/// Each window is summed afresh. Windows holding the same values in a
/// different order can still differ in the last bits.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let window = window.max(1);
    (0..values.len())
        .map(|end| {
            if end + 1 < window {
                return None;
            }
            let slice = &values[end + 1 - window..=end];
            let mut sum = 0.0;
            for v in slice {
                sum += (*v)?;
            }
            Some(sum / window as f64)
        })
        .collect()
}

pub fn rolling_valence(table: &LibraryTable, window: usize) -> TimeSeries {
    let valences: Vec<Option<f64>> = table.rows().iter().map(|r| r.valence()).collect();
    TimeSeries {
        values: rolling_mean(&valences, window),
    }
}

/// Pair each track's date with its rolling value, dropping warm-up gaps.
///
/// Built over the newest-first view of the library (rows and values both
/// reversed, so they stay aligned), then emitted oldest first.
pub fn date_series(table: &LibraryTable, series: &TimeSeries) -> DateSeries {
    let newest_first_rows = table.rows().iter().rev();
    let newest_first_values = series.values.iter().rev();

    let mut points: Vec<(usize, String, f64)> = newest_first_rows
        .zip(newest_first_values)
        .filter_map(|(row, value)| {
            value.map(|v| (row.playlist_place, format_pretty_date(&row.added_at), v))
        })
        .collect();
    points.reverse();

    let mut out = DateSeries::default();
    for (place, label, value) in points {
        out.places.push(place);
        out.labels.push(label);
        out.values.push(value);
    }
    out
}
