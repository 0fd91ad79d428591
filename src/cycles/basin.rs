use super::{Cycle, CycleDetector};

/// Depths at or below this are rounding noise from the rolling mean and count as zero.
pub const MIN_DOC: f64 = 1e-9;

/// Basin-based cycle detector.
///
/// Every local minimum of the series seeds one candidate. From the minimum the
/// search extends left and right while values stay above it (equal values
/// continue to the right only, so a flat-bottomed pair of minima yields one
/// basin). The lower of the two flanking peaks sets the cycle's level: the
/// cycle starts at the last point before the minimum at or above that level,
/// ends at the first such point after it, and its depth is level − minimum.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasinDetector;

impl CycleDetector for BasinDetector {
    fn detect(&self, series: &[(usize, f64)], drop_zero_docs: bool) -> Vec<Cycle> {
        let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();

        let mut cycles: Vec<Cycle> = local_minima(&values)
            .into_iter()
            .filter_map(|m| basin_at(&values, m))
            .map(|(start, end, minimum, doc)| {
                let t_start = series[start].0;
                let t_end = series[end].0;
                Cycle {
                    t_start,
                    t_end,
                    t_minimum: series[minimum].0,
                    duration: t_end - t_start,
                    doc,
                }
            })
            .collect();

        if drop_zero_docs {
            cycles.retain(|c| c.doc > MIN_DOC);
        }
        cycles
    }
}

/// Positions of interior local minima. A flat bottom reports its first point.
fn local_minima(values: &[f64]) -> Vec<usize> {
    let n = values.len();
    let mut minima = Vec::new();
    let mut i = 1;
    while i + 1 < n {
        if values[i] < values[i - 1] {
            let mut j = i;
            while j + 1 < n && values[j + 1] == values[i] {
                j += 1;
            }
            if j + 1 < n && values[j + 1] > values[i] {
                minima.push(i);
            }
            i = j + 1;
        } else {
            i += 1;
        }
    }
    minima
}

/// `(start, end, minimum, depth)` positions of the basin around `m`.
fn basin_at(values: &[f64], m: usize) -> Option<(usize, usize, usize, f64)> {
    let v = values[m];

    let mut left_max = f64::NEG_INFINITY;
    let mut left_stop = 0;
    for i in (0..m).rev() {
        if values[i] <= v {
            left_stop = i + 1;
            break;
        }
        left_max = left_max.max(values[i]);
    }

    let mut right_max = f64::NEG_INFINITY;
    let mut right_stop = values.len();
    for (j, &value) in values.iter().enumerate().skip(m + 1) {
        if value < v {
            right_stop = j;
            break;
        }
        right_max = right_max.max(value);
    }

    if !left_max.is_finite() || !right_max.is_finite() {
        return None;
    }

    let level = left_max.min(right_max);
    let start = (left_stop..m).rev().find(|&i| values[i] >= level)?;
    let end = (m + 1..right_stop).find(|&j| values[j] >= level)?;
    Some((start, end, m, level - v))
}
