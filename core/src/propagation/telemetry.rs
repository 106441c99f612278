use crate::archive::channels::{ATTITUDE, GYRO_BIAS, GYRO_COUNTS, ORBIT_VELOCITY, SOLAR_VELOCITY};
use crate::archive::TelemetrySource;
use crate::intervals::TimeSpan;
use crate::math::{lagrange4, Quaternion};
use crate::prelude::{CalError, CalResult, PipelineConfig};
use log::debug;

/// Per-maneuver telemetry spanning the before/during/after window.
#[derive(Debug, Clone, Default)]
pub struct ManeuverTelemetry {
    pub attitude: Vec<Quaternion>,
    pub gyro_times: Vec<f64>,
    /// Raw 16-bit channel accumulators.
    pub gyro_counts: Vec<[f64; 4]>,
    pub bias_times: Vec<f64>,
    /// On-board estimated 3-axis bias (rad/sec).
    pub pcad_bias: Vec<[f64; 3]>,
}

impl ManeuverTelemetry {
    pub fn fetch(
        source: &dyn TelemetrySource,
        window: TimeSpan,
        config: &PipelineConfig,
    ) -> CalResult<Self> {
        let set = source.fetch(&ATTITUDE, window.start, window.stop, true)?;
        let (times, rows) = set.numeric_columns(ATTITUDE)?;
        let mut attitude: Vec<Quaternion> = times
            .iter()
            .zip(rows)
            .map(|(&time, q)| Quaternion::new(time, q))
            .collect();

        if config.adjust_aberration {
            let padded = TimeSpan::new(window.start - config.ephemeris_pad, window.stop + config.ephemeris_pad);
            let velocity = RelativeVelocity::fetch(source, padded)?;
            let adjusted = velocity.adjust(&mut attitude);
            debug!("aberration adjusted {} of {} attitudes", adjusted, attitude.len());
        }

        let set = source.fetch(&GYRO_COUNTS, window.start, window.stop, true)?;
        let (gyro_times, gyro_counts) = set.numeric_columns(GYRO_COUNTS)?;

        let set = source.fetch(&GYRO_BIAS, window.start, window.stop, true)?;
        let (bias_times, pcad_bias) = set.numeric_columns(GYRO_BIAS)?;

        Ok(Self {
            attitude,
            gyro_times,
            gyro_counts,
            bias_times,
            pcad_bias,
        })
    }
}

/// Spacecraft velocity relative to the sun (km/sec).
#[derive(Debug, Clone, Default)]
pub struct RelativeVelocity {
    pub times: Vec<f64>,
    pub components: [Vec<f64>; 3],
}

impl RelativeVelocity {
    pub fn fetch(source: &dyn TelemetrySource, span: TimeSpan) -> CalResult<Self> {
        let orbit = source.fetch(&ORBIT_VELOCITY, span.start, span.stop, true)?;
        let (times, spacecraft) = orbit.numeric_columns(ORBIT_VELOCITY)?;
        let solar = source.fetch(&SOLAR_VELOCITY, span.start, span.stop, true)?;
        let (solar_times, sun) = solar.numeric_columns(SOLAR_VELOCITY)?;
        if sun.len() != spacecraft.len() {
            return Err(CalError::structural(
                "ephemeris velocity",
                format!("{} orbit samples vs {} solar samples", spacecraft.len(), sun.len()),
            ));
        }
        // the two ephemerides are differenced sample by sample
        if let Some((orbit_time, solar_time)) = times
            .iter()
            .zip(&solar_times)
            .find(|(orbit, solar)| orbit != solar)
        {
            return Err(CalError::structural(
                "ephemeris velocity",
                format!("orbit sample at {} paired with solar sample at {}", orbit_time, solar_time),
            ));
        }
        let components = std::array::from_fn(|axis| {
            spacecraft
                .iter()
                .zip(&sun)
                .map(|(sc, sun)| (sc[axis] - sun[axis]) / 1000.0)
                .collect()
        });
        Ok(Self { times, components })
    }

    pub fn at(&self, time: f64) -> Option<[f64; 3]> {
        Some([
            lagrange4(&self.times, &self.components[0], time)?,
            lagrange4(&self.times, &self.components[1], time)?,
            lagrange4(&self.times, &self.components[2], time)?,
        ])
    }

    /// Adjusts every attitude the ephemeris brackets; others are left as is.
    /// Returns the number adjusted.
    pub fn adjust(&self, attitude: &mut [Quaternion]) -> usize {
        let mut adjusted = 0;
        for quat in attitude.iter_mut() {
            if let Some(velocity) = self.at(quat.time) {
                *quat = quat.aberration_adjust(velocity);
                adjusted += 1;
            }
        }
        adjusted
    }
}
