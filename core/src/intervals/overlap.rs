use crate::intervals::extract::Interval;
use serde::{Deserialize, Serialize};

/// Plain time range without sample provenance (exclusion lists, bad times).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: f64,
    pub stop: f64,
}

impl TimeSpan {
    pub const fn new(start: f64, stop: f64) -> Self {
        Self { start, stop }
    }

    pub fn contains(&self, time: f64) -> bool {
        self.start <= time && time <= self.stop
    }

    pub fn encloses(&self, other: &TimeSpan) -> bool {
        self.start <= other.start && other.stop <= self.stop
    }
}

impl From<&Interval> for TimeSpan {
    fn from(interval: &Interval) -> Self {
        TimeSpan::new(interval.start_time, interval.stop_time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapRule {
    /// The exclusion starts or stops inside the window.
    EndpointInside,
    /// As above, or the exclusion encloses the whole window.
    EndpointInsideOrEnclosing,
}

pub fn overlaps(window: &TimeSpan, exclusion: &TimeSpan, rule: OverlapRule) -> bool {
    let endpoint = window.contains(exclusion.start) || window.contains(exclusion.stop);
    match rule {
        OverlapRule::EndpointInside => endpoint,
        OverlapRule::EndpointInsideOrEnclosing => endpoint || exclusion.encloses(window),
    }
}

/// Keeps the candidates whose window (as chosen by `window`) is not
/// overlapped by any exclusion span. Candidate order is preserved.
pub fn exclude_overlapping<C, F>(
    candidates: Vec<C>,
    exclusions: &[TimeSpan],
    window: F,
    rule: OverlapRule,
) -> Vec<C>
where
    F: Fn(&C) -> TimeSpan,
{
    if exclusions.is_empty() {
        return candidates;
    }
    candidates
        .into_iter()
        .filter(|candidate| {
            let span = window(candidate);
            !exclusions
                .iter()
                .any(|exclusion| overlaps(&span, exclusion, rule))
        })
        .collect()
}
