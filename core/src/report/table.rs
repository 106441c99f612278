use crate::clock::DateConverter;
use crate::pointing::{PointingSample, ARCSEC_PER_RADIAN};
use crate::prelude::{CalResult, PipelineConfig};
use crate::propagation::{ManeuverRecord, PropagationSums};
use crate::report::format::{fixed, sci15};
use std::io::Write;

const QUATERNION_GROUPS: [&str; 4] = ["initquat", "finalquat", "manvrquat", "ini2finquat"];

/// Column layout of the maneuver table. The batch sums and the sign code
/// are optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLayout {
    pub compute_batch: bool,
    pub write_signs: bool,
}

fn labels(stem: &str, count: usize, width: usize) -> String {
    (1..=count)
        .map(|k| format!("{:>width$} ", format!("{}{}", stem, k), width = width))
        .collect()
}

fn quaternion_fields(q: &[f64; 4]) -> String {
    q.iter().map(|c| format!("{} ", fixed(*c, 9, 12))).collect()
}

fn vector_fields(v: &[f64; 3]) -> String {
    v.iter().map(|c| format!("{} ", fixed(*c, 8, 12))).collect()
}

fn sci_fields(values: impl IntoIterator<Item = f64>) -> String {
    values.into_iter().map(|v| format!("{} ", sci15(v))).collect()
}

impl TableLayout {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            compute_batch: config.compute_batch,
            write_signs: config.write_signs,
        }
    }

    pub fn header(&self) -> String {
        let mut line = String::from(" num            start_time             stop_time ");
        line += &labels(QUATERNION_GROUPS[0], 4, 12);
        line += &labels(QUATERNION_GROUPS[1], 4, 12);
        line += &labels(QUATERNION_GROUPS[2], 4, 12);
        line += &labels("intratebody", 3, 12);
        line += &labels("diffchancnt", 4, 12);
        line += &labels(QUATERNION_GROUPS[3], 4, 12);
        line += &labels("ini2finvect", 3, 12);
        line += &labels("finpropquat", 4, 12);
        line += &labels("deltaquat", 4, 12);
        line += "  ini2fintim     ini2finang ";
        if self.compute_batch {
            for row in 1..=3 {
                for col in 1..=3 {
                    line += &format!("{:>15} ", format!("sumprop[{},{}]", row, col));
                }
            }
            for row in 1..=3 {
                for col in 1..=9 {
                    line += &format!("sumproprot[{},{}] ", row, col);
                }
            }
        }
        line += &labels("pcadbias_start", 3, 15);
        line += &labels("cntratebiasbef", 4, 15);
        line += &labels("cntratebiasaft", 4, 15);
        // the last column carries no trailing separator
        line.pop();
        if self.write_signs {
            line += " signcode";
        }
        line.push('\n');
        line
    }

    /// One accepted maneuver; `number` counts from zero in output order.
    pub fn row(&self, number: usize, record: &ManeuverRecord, clock: &impl DateConverter) -> String {
        let mut line = format!(
            "{:4} {:>21} {:>21} ",
            number,
            clock.to_date(record.initial.time),
            clock.to_date(record.final_attitude.time)
        );
        line += &quaternion_fields(&record.initial.q);
        line += &quaternion_fields(&record.final_attitude.q);
        line += &quaternion_fields(&record.maneuver_rotation.q);
        line += &vector_fields(&record.integrated_rate.v);
        line += &record
            .count_difference
            .iter()
            .map(|c| format!("{:12} ", c))
            .collect::<String>();
        line += &quaternion_fields(&record.observed_rotation.q);
        line += &vector_fields(&record.observed_vector.v);
        line += &quaternion_fields(&record.propagated_final.q);
        line += &quaternion_fields(&record.residual.q);
        line += &format!("{} ", fixed(record.observed_vector.time, 6, 12));
        line += &format!("{} ", fixed(record.rotation_angle().to_degrees(), 6, 15));
        if self.compute_batch {
            let zeros = PropagationSums::zeros();
            let sums = record.sums.as_ref().unwrap_or(&zeros);
            line += &sci_fields(sums.sumprop.iter().copied());
            line += &sci_fields(sums.sumproprot.iter().copied());
        }
        line += &sci_fields(record.pcad_bias);
        line += &sci_fields(record.bias_before.mean);
        line += &sci_fields(record.bias_after.mean);
        line.pop();
        if self.write_signs {
            line += &format!(" {:2}", record.sign_code);
        }
        line.push('\n');
        line
    }

    pub fn write<W: Write>(
        &self,
        out: &mut W,
        records: &[&ManeuverRecord],
        clock: &impl DateConverter,
    ) -> CalResult<()> {
        out.write_all(self.header().as_bytes())?;
        for (number, record) in records.iter().enumerate() {
            out.write_all(self.row(number, record, clock).as_bytes())?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Retained pointing samples with errors in arcsec.
pub fn write_pointing_table<W: Write>(
    out: &mut W,
    samples: &[PointingSample],
    clock: &impl DateConverter,
) -> CalResult<()> {
    writeln!(
        out,
        "{:>21} {:>12} {:>12} {:>12} {:>12}",
        "time", "roll_err", "pitch_err", "yaw_err", "yz_err"
    )?;
    for sample in samples {
        writeln!(
            out,
            "{:>21} {} {} {} {}",
            clock.to_date(sample.time),
            fixed(sample.roll * ARCSEC_PER_RADIAN, 4, 12),
            fixed(sample.pitch * ARCSEC_PER_RADIAN, 4, 12),
            fixed(sample.yaw * ARCSEC_PER_RADIAN, 4, 12),
            fixed(sample.yz * ARCSEC_PER_RADIAN, 4, 12)
        )?;
    }
    out.flush()?;
    Ok(())
}
