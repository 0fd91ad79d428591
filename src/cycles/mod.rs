//! Mood-cycle detection and statistical filtering.
//!
//! Raw detection sits behind [`CycleDetector`] (series in, cycles out), so any
//! algorithm with that contract can replace [`BasinDetector`]. Duration cutoffs,
//! outlier removal and ranking by depth happen here, after detection.

pub mod basin;

use serde::{Deserialize, Serialize};

use crate::pipeline::series::TimeSeries;

pub use basin::BasinDetector;

/// A detected rise/fall segment. Indices are series keys (playlist places).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cycle {
    pub t_start: usize,
    pub t_end: usize,
    pub t_minimum: usize,
    /// `t_end - t_start`, in index units.
    pub duration: usize,
    /// Depth of cycle.
    pub doc: f64,
}

/// Finds candidate cycles in a keyed, real-valued series.
pub trait CycleDetector {
    /// `series` is `(key, value)` in ascending key order. With `drop_zero_docs`
    /// set, zero-depth candidates are left out.
    fn detect(&self, series: &[(usize, f64)], drop_zero_docs: bool) -> Vec<Cycle>;
}

/// Thresholds applied to detected cycles, all in index units.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CycleFilter {
    /// Cycles this short or shorter are noise; dropped before any statistics.
    pub duration_lowprecut: usize,
    /// Lower duration cutoff (exclusive) after outlier removal.
    pub duration_lowcut: usize,
    /// Upper duration cutoff (exclusive).
    pub duration_upcut: usize,
    /// Outlier band half-width in standard deviations. The default of 40 is
    /// permissive and only removes extreme artifacts.
    pub n_std: f64,
    /// How many of the deepest cycles to keep.
    pub max_periods: usize,
}

impl Default for CycleFilter {
    fn default() -> Self {
        Self {
            duration_lowprecut: 5,
            duration_lowcut: 20,
            duration_upcut: 10_000,
            n_std: 40.0,
            max_periods: 10,
        }
    }
}

/// Detect, filter and rank cycles in a rolling-valence series.
pub fn extract_cycles(
    series: &TimeSeries,
    detector: &dyn CycleDetector,
    filter: &CycleFilter,
) -> Vec<Cycle> {
    let candidates = detector.detect(&series.points(), true);
    log::info!("Detected {} candidate cycles", candidates.len());

    let kept = filter_cycles(candidates, filter);
    let ranked = rank_cycles(kept, filter.max_periods);
    log::info!("{} cycles survive filtering", ranked.len());
    ranked
}

/// Apply the duration cutoffs and outlier band, in that order.
pub fn filter_cycles(mut cycles: Vec<Cycle>, filter: &CycleFilter) -> Vec<Cycle> {
    cycles.retain(|c| c.duration > filter.duration_lowprecut);
    if cycles.is_empty() {
        return cycles;
    }

    let durations: Vec<f64> = cycles.iter().map(|c| c.duration as f64).collect();
    let (mean, sd) = mean_std(&durations);
    let lo = mean - filter.n_std * sd;
    let hi = mean + filter.n_std * sd;
    cycles.retain(|c| {
        let d = c.duration as f64;
        d >= lo && d <= hi
    });
    log::debug!("Outlier band {lo:.1}..={hi:.1} (mean {mean:.1}, sd {sd:.1})");

    cycles.retain(|c| c.duration > filter.duration_lowcut && c.duration < filter.duration_upcut);
    cycles
}

/// Deepest first, keeping at most `limit`. Equal depths keep detection order.
pub fn rank_cycles(mut cycles: Vec<Cycle>, limit: usize) -> Vec<Cycle> {
    cycles.sort_by(|a, b| b.doc.partial_cmp(&a.doc).unwrap_or(std::cmp::Ordering::Equal));
    cycles.truncate(limit);
    cycles
}

/// Mean and population standard deviation.
fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}
