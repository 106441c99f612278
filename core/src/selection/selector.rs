use crate::diagnostics::LogManager;
use crate::intervals::{exclude_overlapping, Interval, OverlapRule, TimeSpan};
use crate::prelude::{CalError, CalResult, PipelineConfig};
use crate::selection::modes::ModeIntervals;
use serde::Serialize;

/// One maneuver with the pointing windows that bracket it.
#[derive(Debug, Clone, PartialEq)]
pub struct ManeuverCandidate {
    pub nman: Interval,
    /// Pointing before the maneuver, trimmed to its last `npnt_min_duration`.
    pub before: TimeSpan,
    /// Pointing after the maneuver, trimmed to its first `npnt_min_duration`.
    pub after: TimeSpan,
    /// Last Kalman convergence start inside `after`.
    pub kalman_start: f64,
}

impl ManeuverCandidate {
    /// Full before/during/after span used for telemetry fetches.
    pub fn window(&self) -> TimeSpan {
        TimeSpan::new(self.before.start, self.after.stop)
    }
}

/// Survivor counts after each selection stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionStats {
    pub nman_raw: usize,
    pub nman_unsegmented: usize,
    pub npnt_raw: usize,
    pub npnt_with_kalman: usize,
    pub npnt_min_duration: usize,
    pub paired: usize,
    pub clear_of_dumps: usize,
    pub clear_of_rwbias: usize,
    pub clear_of_bad_times: usize,
    pub with_kalman_after: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub candidates: Vec<ManeuverCandidate>,
    pub stats: SelectionStats,
}

struct Pairing {
    nman: Interval,
    before: TimeSpan,
    after: TimeSpan,
}

/// Narrows the raw NMAN intervals to maneuvers fit for calibration.
pub struct ManeuverSelector {
    min_duration: f64,
    dump_damping: f64,
    logger: LogManager,
}

impl ManeuverSelector {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            min_duration: config.npnt_min_duration,
            dump_damping: config.dump_damping,
            logger: LogManager::scoped("selector"),
        }
    }

    pub fn select(&self, modes: &ModeIntervals, bad_times: &[TimeSpan]) -> CalResult<Selection> {
        let mut stats = SelectionStats {
            nman_raw: modes.nman.len(),
            npnt_raw: modes.npnt.len(),
            ..Default::default()
        };

        let disa: Vec<TimeSpan> = modes.disa.iter().map(TimeSpan::from).collect();
        let nman = exclude_overlapping(
            modes.nman.clone(),
            &disa,
            |interval| TimeSpan::from(interval),
            OverlapRule::EndpointInside,
        );
        stats.nman_unsegmented = nman.len();
        self.logger
            .record(&format!("NMAN without segmented maneuvers: {}", nman.len()));

        // The first pointing interval may have converged before the window opened.
        let npnt: Vec<Interval> = modes
            .npnt
            .iter()
            .enumerate()
            .filter(|(n, interval)| {
                *n == 0
                    || modes
                        .kalm
                        .iter()
                        .any(|kalm| interval.contains(kalm.start_time))
            })
            .map(|(_, interval)| *interval)
            .collect();
        stats.npnt_with_kalman = npnt.len();
        self.logger
            .record(&format!("NPNT with Kalman convergence: {}", npnt.len()));

        let npnt: Vec<Interval> = npnt
            .into_iter()
            .filter(|interval| interval.duration() >= self.min_duration)
            .collect();
        stats.npnt_min_duration = npnt.len();
        self.logger.record(&format!(
            "NPNT lasting at least {:.1} sec: {}",
            self.min_duration,
            npnt.len()
        ));

        let pairs = self.pair(&nman, &npnt)?;
        stats.paired = pairs.len();
        self.logger
            .record(&format!("NMAN with NPNT before and after: {}", pairs.len()));

        let pairs: Vec<Pairing> = pairs
            .into_iter()
            .map(|pair| Pairing {
                before: TimeSpan::new(pair.before.stop - self.min_duration, pair.before.stop),
                after: TimeSpan::new(pair.after.start, pair.after.start + self.min_duration),
                ..pair
            })
            .collect();

        let span = |pair: &Pairing| TimeSpan::new(pair.before.start, pair.after.stop);

        let dumps: Vec<TimeSpan> = modes
            .grnd
            .iter()
            .map(|dump| TimeSpan::new(dump.start_time, dump.stop_time + self.dump_damping))
            .collect();
        let pairs = exclude_overlapping(pairs, &dumps, span, OverlapRule::EndpointInside);
        stats.clear_of_dumps = pairs.len();
        self.logger
            .record(&format!("clear of momentum dumps: {}", pairs.len()));

        let rwbias: Vec<TimeSpan> = modes.rwbias_disa.iter().map(TimeSpan::from).collect();
        let pairs = exclude_overlapping(pairs, &rwbias, span, OverlapRule::EndpointInside);
        stats.clear_of_rwbias = pairs.len();
        self.logger
            .record(&format!("clear of RW bias disable: {}", pairs.len()));

        let pairs = exclude_overlapping(
            pairs,
            bad_times,
            span,
            OverlapRule::EndpointInsideOrEnclosing,
        );
        stats.clear_of_bad_times = pairs.len();
        self.logger.record(&format!(
            "clear of {} bad time spans: {}",
            bad_times.len(),
            pairs.len()
        ));

        let mut candidates = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let kalman_start = modes
                .kalm
                .iter()
                .map(|kalm| kalm.start_time)
                .filter(|&start| pair.after.contains(start))
                .last();
            match kalman_start {
                Some(kalman_start) => candidates.push(ManeuverCandidate {
                    nman: pair.nman,
                    before: pair.before,
                    after: pair.after,
                    kalman_start,
                }),
                None => self.logger.caution(&format!(
                    "maneuver starting {:.3} has no Kalman convergence after it, dropped",
                    pair.nman.start_time
                )),
            }
        }
        stats.with_kalman_after = candidates.len();
        self.logger
            .record(&format!("maneuvers selected: {}", candidates.len()));

        Ok(Selection { candidates, stats })
    }

    /// Matches each NMAN with the pointing intervals index-adjacent to it.
    fn pair(&self, nman: &[Interval], npnt: &[Interval]) -> CalResult<Vec<Pairing>> {
        let mut pairs = Vec::new();
        for maneuver in nman {
            let before = npnt
                .iter()
                .find(|p| p.stop_index + 1 == maneuver.start_index);
            let after = npnt
                .iter()
                .find(|p| p.start_index == maneuver.stop_index + 1);
            let (Some(before), Some(after)) = (before, after) else {
                self.logger.detail(&format!(
                    "NMAN {:.3}..{:.3} lacks an adjacent pointing interval",
                    maneuver.start_time, maneuver.stop_time
                ));
                continue;
            };
            if !(before.stop_time < maneuver.start_time && maneuver.stop_time < after.start_time) {
                return Err(CalError::structural(
                    "NMAN/NPNT pairing",
                    format!(
                        "NPNT stop {} / NMAN {}..{} / NPNT start {} out of order",
                        before.stop_time, maneuver.start_time, maneuver.stop_time, after.start_time
                    ),
                ));
            }
            pairs.push(Pairing {
                nman: *maneuver,
                before: TimeSpan::from(before),
                after: TimeSpan::from(after),
            });
        }
        Ok(pairs)
    }
}
