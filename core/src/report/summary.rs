use crate::clock::DateConverter;
use serde::Serialize;

/// Label/value lines written beside each maneuver table.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub version: String,
    pub start: String,
    pub stop: String,
    pub npnt_min_duration: f64,
    pub kalman_settle_time: f64,
    /// NMAN intervals found before any selection.
    pub input_maneuvers: usize,
    pub output_maneuvers: usize,
    /// Initial attitude time of the first accepted maneuver.
    pub first_initial: Option<f64>,
    /// Final attitude time of the last accepted maneuver.
    pub last_final: Option<f64>,
    pub output_file: String,
}

impl RunSummary {
    pub fn render(&self, clock: &impl DateConverter) -> String {
        let date = |time: Option<f64>| match time {
            Some(t) => clock.to_date(t),
            None => "none".to_string(),
        };
        let mut text = String::new();
        text += &format!("{} version {}\n", env!("CARGO_PKG_NAME"), self.version);
        text += &format!("processing start time = {}\n", self.start);
        text += &format!("processing stop  time = {}\n", self.stop);
        text += &format!("minimum NPNT duration = {:.6} sec\n", self.npnt_min_duration);
        text += &format!("Kalman filter converge time = {:.6} sec\n", self.kalman_settle_time);
        text += &format!("Number of  input maneuvers = {}\n", self.input_maneuvers);
        text += &format!("Number of output maneuvers = {}\n", self.output_maneuvers);
        text += &format!("Initial time of first maneuver = {}\n", date(self.first_initial));
        text += &format!("Final   time of last  maneuver = {}\n", date(self.last_final));
        text += &format!("output file = {}\n", self.output_file);
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MissionClock;

    fn summary() -> RunSummary {
        RunSummary {
            version: "v33c".into(),
            start: "2012:336:00:00:00.000".into(),
            stop: "2013:021:00:00:00.000".into(),
            npnt_min_duration: 1200.0,
            kalman_settle_time: 300.0,
            input_maneuvers: 12,
            output_maneuvers: 3,
            first_initial: Some(86_400.0),
            last_final: Some(172_800.5),
            output_file: "getirudata_i29c_v33c.out".into(),
        }
    }

    #[test]
    fn renders_label_value_lines() {
        let text = summary().render(&MissionClock);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "irucore version v33c");
        assert_eq!(lines[3], "minimum NPNT duration = 1200.000000 sec");
        assert_eq!(lines[5], "Number of  input maneuvers = 12");
        assert_eq!(lines[7], "Initial time of first maneuver = 1998:002:00:00:00.000");
        assert_eq!(lines[8], "Final   time of last  maneuver = 1998:003:00:00:00.500");
        assert_eq!(lines[9], "output file = getirudata_i29c_v33c.out");
    }

    #[test]
    fn empty_run_has_no_maneuver_times() {
        let mut empty = summary();
        empty.output_maneuvers = 0;
        empty.first_initial = None;
        empty.last_final = None;
        assert!(empty
            .render(&MissionClock)
            .contains("Initial time of first maneuver = none\n"));
    }
}
