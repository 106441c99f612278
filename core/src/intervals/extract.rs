use crate::prelude::{CalError, CalResult};
use serde::{Deserialize, Serialize};

/// Maximal run of a target value in a sampled signal.
///
/// Indices point back into the sample array the interval was extracted from.
/// Times may later be truncated or extended by the selection stages; the
/// indices keep their provenance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub start_time: f64,
    pub stop_time: f64,
    pub start_index: usize,
    pub stop_index: usize,
}

impl Interval {
    pub fn duration(&self) -> f64 {
        self.stop_time - self.start_time
    }

    /// Closed-interval membership test.
    pub fn contains(&self, time: f64) -> bool {
        self.start_time <= time && time <= self.stop_time
    }
}

/// Finds the start/stop pairs of every run where `values` equals `target`.
///
/// Runs touching either end of the window are handled as follows:
/// a run that starts at index 0 with length > 1 gets index 0 as its start;
/// a single matching sample at index 0 is discarded;
/// a run that reaches the last index with length > 1 gets the last index as
/// its stop; a single matching sample at the last index is discarded.
/// Interior single-sample runs cannot form an interval and are skipped. Such
/// a pointing run has zero duration and never passes the selector's minimum
/// NPNT duration stage, so only the raw interval tallies see the difference.
pub fn extract_intervals<T: PartialEq>(
    values: &[T],
    times: &[f64],
    target: &T,
) -> CalResult<Vec<Interval>> {
    if values.len() != times.len() {
        return Err(CalError::structural(
            "interval extraction",
            format!(
                "number of data values ({}) not equal to number of data times ({})",
                values.len(),
                times.len()
            ),
        ));
    }
    let n = values.len();
    if n < 2 {
        return Ok(Vec::new());
    }

    let hit = |i: usize| values[i] == *target;
    let mut starts: Vec<usize> = (1..n).filter(|&i| hit(i) && !hit(i - 1)).collect();
    let mut stops: Vec<usize> = (0..n - 1).filter(|&i| hit(i) && !hit(i + 1)).collect();

    if hit(0) && hit(1) {
        starts.insert(0, 0);
    }
    if hit(0) && !hit(1) && !stops.is_empty() {
        stops.remove(0);
    }
    if hit(n - 1) && hit(n - 2) {
        stops.push(n - 1);
    }
    if hit(n - 1) && !hit(n - 2) {
        starts.pop();
    }

    if starts.len() != stops.len() {
        return Err(CalError::structural(
            "interval extraction",
            format!("{} starts vs {} stops", starts.len(), stops.len()),
        ));
    }

    starts
        .into_iter()
        .zip(stops)
        .filter(|(start_index, stop_index)| start_index != stop_index)
        .map(|(start_index, stop_index)| {
            if start_index >= stop_index || times[start_index] >= times[stop_index] {
                return Err(CalError::structural(
                    "interval extraction",
                    format!(
                        "start index {} (t={}) not before stop index {} (t={})",
                        start_index, times[start_index], stop_index, times[stop_index]
                    ),
                ));
            }
            Ok(Interval {
                start_time: times[start_index],
                stop_time: times[stop_index],
                start_index,
                stop_index,
            })
        })
        .collect()
}
