//! Conversion between day-of-year date strings and mission seconds.

use crate::prelude::{CalError, CalResult};
use chrono::{DateTime, Datelike, NaiveDate, Timelike};

/// Unix timestamp of 1998:001:00:00:00.000, the zero of mission seconds.
pub const MISSION_EPOCH_UNIX: i64 = 883_612_800;

/// Bidirectional date conversion used for configuration and report output.
pub trait DateConverter {
    fn to_secs(&self, date: &str) -> CalResult<f64>;
    fn to_date(&self, secs: f64) -> String;
}

/// `YYYY:DDD[:HH[:MM[:SS[.sss]]]]` on a uniform UTC scale (no leap seconds),
/// millisecond resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct MissionClock;

impl DateConverter for MissionClock {
    fn to_secs(&self, date: &str) -> CalResult<f64> {
        let bad = || CalError::TimeFormat(date.to_string());
        let fields: Vec<&str> = date.trim().split(':').collect();
        if fields.len() < 2 || fields.len() > 5 {
            return Err(bad());
        }
        let year: i32 = fields[0].parse().map_err(|_| bad())?;
        let doy: u32 = fields[1].parse().map_err(|_| bad())?;
        let hour: u32 = fields.get(2).map_or(Ok(0), |f| f.parse::<u32>()).map_err(|_| bad())?;
        let minute: u32 = fields.get(3).map_or(Ok(0), |f| f.parse::<u32>()).map_err(|_| bad())?;
        let second: f64 = fields
            .get(4)
            .map_or(Ok(0.0), |f| f.parse::<f64>())
            .map_err(|_| bad())?;
        if !(0.0..60.0).contains(&second) {
            return Err(bad());
        }

        let day_start = NaiveDate::from_yo_opt(year, doy)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .ok_or_else(bad)?;
        let whole = day_start.and_utc().timestamp() - MISSION_EPOCH_UNIX;
        Ok(whole as f64 + second)
    }

    fn to_date(&self, secs: f64) -> String {
        let millis = (secs * 1000.0).round() as i64;
        let whole = millis.div_euclid(1000);
        let frac = millis.rem_euclid(1000);
        match DateTime::from_timestamp(whole + MISSION_EPOCH_UNIX, 0) {
            Some(dt) => format!(
                "{:04}:{:03}:{:02}:{:02}:{:02}.{:03}",
                dt.year(),
                dt.ordinal(),
                dt.hour(),
                dt.minute(),
                dt.second(),
                frac
            ),
            None => format!("{:.3}", secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_is_zero() {
        assert_eq!(MissionClock.to_secs("1998:001:00:00:00.000").unwrap(), 0.0);
        assert_eq!(MissionClock.to_date(0.0), "1998:001:00:00:00.000");
    }

    #[test]
    fn short_forms_default_to_midnight() {
        let clock = MissionClock;
        assert_eq!(clock.to_secs("1998:002").unwrap(), 86_400.0);
        assert_eq!(clock.to_secs("1998:002:01").unwrap(), 86_400.0 + 3600.0);
    }

    #[test]
    fn calibration_instants_round_trip() {
        let clock = MissionClock;
        for date in [
            "2003:203:00:00:00.000",
            "2003:274:13:19:00.000",
            "2006:352:14:25:00.000",
            "2010:350:22:10:00.000",
            "2011:105:21:20:00.000",
            "2012:062:15:26:00.000",
            "2012:336:12:34:56.789",
        ] {
            let secs = clock.to_secs(date).unwrap();
            assert_eq!(clock.to_date(secs), date);
        }
    }

    #[test]
    fn rejects_malformed_dates() {
        let clock = MissionClock;
        assert!(clock.to_secs("2012").is_err());
        assert!(clock.to_secs("2012:367").is_err());
        assert!(clock.to_secs("2012:100:25:00:00").is_err());
        assert!(clock.to_secs("2012:100:00:00:61.0").is_err());
        assert!(clock.to_secs("yesterday:1").is_err());
    }
}
