use crate::archive::channels::{
    ACA_SEQUENCE, AUTO_TRANSITION, DISA, GRND, KALM, NMAN, NPNT, PCAD_MODE, RW_BIAS, UNLOAD_STATE,
};
use crate::archive::TelemetrySet;
use crate::clock::DateConverter;
use crate::intervals::{extract_intervals, Interval, TimeSpan};
use crate::prelude::{CalError, CalResult};
use std::fs;
use std::path::Path;

/// Every mode interval the maneuver selection works from.
#[derive(Debug, Clone, Default)]
pub struct ModeIntervals {
    pub npnt: Vec<Interval>,
    pub nman: Vec<Interval>,
    pub kalm: Vec<Interval>,
    /// Autonomous transitions disabled, i.e. segmented maneuvers.
    pub disa: Vec<Interval>,
    /// Ground momentum dumps, unextended.
    pub grnd: Vec<Interval>,
    pub rwbias_disa: Vec<Interval>,
}

fn extract_state(set: &TelemetrySet, channel: &str, target: &str) -> CalResult<Vec<Interval>> {
    let (times, values) = set.states(channel)?;
    extract_intervals(values, times, &target.to_string()).map_err(|err| match err {
        CalError::StructuralInconsistency { detail, .. } => {
            CalError::structural(format!("{} intervals from {}", target, channel), detail)
        }
        other => other,
    })
}

impl ModeIntervals {
    pub fn from_telemetry(set: &TelemetrySet) -> CalResult<Self> {
        Ok(Self {
            npnt: extract_state(set, PCAD_MODE, NPNT)?,
            nman: extract_state(set, PCAD_MODE, NMAN)?,
            kalm: extract_state(set, ACA_SEQUENCE, KALM)?,
            disa: extract_state(set, AUTO_TRANSITION, DISA)?,
            grnd: extract_state(set, UNLOAD_STATE, GRND)?,
            rwbias_disa: extract_state(set, RW_BIAS, DISA)?,
        })
    }
}

/// Parses a bad-times listing: one `start stop` date pair per line.
/// Blank lines and `#` comments are skipped.
pub fn parse_bad_times(text: &str, clock: &impl DateConverter) -> CalResult<Vec<TimeSpan>> {
    let mut spans = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields.len() < 2 {
            return Err(CalError::Parse {
                line: number + 1,
                detail: format!("expected start and stop dates, found {:?}", trimmed),
            });
        }
        let to_secs = |date: &str| {
            clock.to_secs(date).map_err(|_| CalError::Parse {
                line: number + 1,
                detail: format!("bad date {:?}", date),
            })
        };
        let start = to_secs(fields[0])?;
        let stop = to_secs(fields[1])?;
        if stop < start {
            return Err(CalError::Parse {
                line: number + 1,
                detail: format!("stop {} precedes start {}", fields[1], fields[0]),
            });
        }
        spans.push(TimeSpan::new(start, stop));
    }
    Ok(spans)
}

pub fn load_bad_times(path: &Path, clock: &impl DateConverter) -> CalResult<Vec<TimeSpan>> {
    let text = fs::read_to_string(path)?;
    parse_bad_times(&text, clock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ChannelSeries;
    use crate::clock::MissionClock;

    #[test]
    fn extracts_each_mode_channel() {
        let times: Vec<f64> = (0..6).map(|i| i as f64 * 100.0).collect();
        let mut set = TelemetrySet::new();
        set.insert(
            PCAD_MODE,
            ChannelSeries::states(times.clone(), ["NPNT", "NPNT", "NMAN", "NMAN", "NPNT", "NPNT"]),
        );
        set.insert(
            ACA_SEQUENCE,
            ChannelSeries::states(times.clone(), ["KALM", "KALM", "GUID", "GUID", "GUID", "KALM"]),
        );
        for channel in [AUTO_TRANSITION, RW_BIAS] {
            set.insert(channel, ChannelSeries::states(times.clone(), ["ENAB"; 6]));
        }
        set.insert(UNLOAD_STATE, ChannelSeries::states(times.clone(), ["MON"; 6]));

        let modes = ModeIntervals::from_telemetry(&set).unwrap();
        assert_eq!(modes.npnt.len(), 2);
        assert_eq!(modes.nman.len(), 1);
        assert_eq!(modes.nman[0].start_index, 2);
        assert_eq!(modes.nman[0].stop_index, 3);
        assert_eq!(modes.kalm.len(), 1);
        assert!(modes.disa.is_empty() && modes.grnd.is_empty() && modes.rwbias_disa.is_empty());
    }

    #[test]
    fn missing_mode_channel_is_an_error() {
        let set = TelemetrySet::new();
        assert!(matches!(
            ModeIntervals::from_telemetry(&set),
            Err(CalError::MissingChannel(_))
        ));
    }

    #[test]
    fn bad_times_parse_with_comments() {
        let text = "# safe mode\n2012:150:03:33:00.000 2012:152:00:00:00.000\n\n2012:200 2012:201\n";
        let spans = parse_bad_times(text, &MissionClock).unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1].stop - spans[1].start, 86_400.0);
    }

    #[test]
    fn bad_times_report_the_offending_line() {
        let err = parse_bad_times("2012:200 2012:201\n2012:202\n", &MissionClock).unwrap_err();
        assert!(matches!(err, CalError::Parse { line: 2, .. }));
        let err = parse_bad_times("2012:202 2012:201\n", &MissionClock).unwrap_err();
        assert!(matches!(err, CalError::Parse { line: 1, .. }));
    }
}
