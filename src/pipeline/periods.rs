use serde::Serialize;

use super::normalize::{LibraryTable, TrackRow};
use super::MoodError;
use crate::cycles::Cycle;
use crate::dates::{days_between, format_pretty_date};

/// A ranked cycle resolved to concrete tracks and dates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Period {
    /// 1-based rank (1 = deepest cycle).
    pub number: usize,
    pub start_date: String,
    pub end_date: String,
    pub min_date: String,
    pub duration_days: i64,
    pub duration_entries: usize,
    pub cycle_depth: f64,
    pub song_start_name: String,
    pub song_end_name: String,
    pub song_min_name: String,
    pub song_start_id: Option<String>,
    pub song_end_id: Option<String>,
    pub song_min_id: Option<String>,
    pub song_start_index: usize,
    pub song_end_index: usize,
    pub song_min_index: usize,
}

/// Resolve ranked cycles against the library, in rank order.
pub fn enrich_periods(cycles: &[Cycle], table: &LibraryTable) -> Result<Vec<Period>, MoodError> {
    cycles
        .iter()
        .enumerate()
        .map(|(i, cycle)| -> Result<Period, MoodError> {
            let start = row_at(table, cycle.t_start)?;
            let end = row_at(table, cycle.t_end)?;
            let min = row_at(table, cycle.t_minimum)?;

            Ok(Period {
                number: i + 1,
                start_date: format_pretty_date(&start.added_at),
                end_date: format_pretty_date(&end.added_at),
                min_date: format_pretty_date(&min.added_at),
                duration_days: days_between(&start.added_at, &end.added_at),
                duration_entries: end.playlist_place.abs_diff(start.playlist_place),
                cycle_depth: cycle.doc,
                song_start_name: start.display_name(),
                song_end_name: end.display_name(),
                song_min_name: min.display_name(),
                song_start_id: start.id.clone(),
                song_end_id: end.id.clone(),
                song_min_id: min.id.clone(),
                song_start_index: start.playlist_place,
                song_end_index: end.playlist_place,
                song_min_index: min.playlist_place,
            })
        })
        .collect()
}

fn row_at(table: &LibraryTable, place: usize) -> Result<&TrackRow, MoodError> {
    table.get(place).ok_or_else(|| {
        MoodError::MalformedInput(format!(
            "cycle index {place} outside library of {} rows",
            table.len()
        ))
    })
}
