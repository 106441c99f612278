use crate::prelude::{CalError, CalResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sample values of one channel: categorical states or numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelValues {
    Numeric(Vec<f64>),
    States(Vec<String>),
}

impl ChannelValues {
    pub fn len(&self) -> usize {
        match self {
            ChannelValues::Numeric(v) => v.len(),
            ChannelValues::States(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn select(&self, keep: &[usize]) -> ChannelValues {
        match self {
            ChannelValues::Numeric(v) => ChannelValues::Numeric(keep.iter().map(|&i| v[i]).collect()),
            ChannelValues::States(v) => {
                ChannelValues::States(keep.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }
}

/// Time-ordered samples of one channel with optional per-sample bad flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSeries {
    pub times: Vec<f64>,
    pub values: ChannelValues,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bad: Option<Vec<bool>>,
}

impl ChannelSeries {
    pub fn numeric(times: Vec<f64>, values: Vec<f64>) -> Self {
        Self {
            times,
            values: ChannelValues::Numeric(values),
            bad: None,
        }
    }

    pub fn states<S: Into<String>>(times: Vec<f64>, values: impl IntoIterator<Item = S>) -> Self {
        Self {
            times,
            values: ChannelValues::States(values.into_iter().map(Into::into).collect()),
            bad: None,
        }
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn validate(&self, name: &str) -> CalResult<()> {
        if self.values.len() != self.times.len() {
            return Err(CalError::structural(
                format!("channel {}", name),
                format!(
                    "{} values for {} times",
                    self.values.len(),
                    self.times.len()
                ),
            ));
        }
        if let Some(bad) = &self.bad {
            if bad.len() != self.times.len() {
                return Err(CalError::structural(
                    format!("channel {}", name),
                    format!("{} bad flags for {} times", bad.len(), self.times.len()),
                ));
            }
        }
        Ok(())
    }

    /// Samples with `start <= t <= stop`, dropping flagged samples when requested.
    pub fn window(&self, start: f64, stop: f64, filter_bad: bool) -> ChannelSeries {
        let keep: Vec<usize> = (0..self.times.len())
            .filter(|&i| start <= self.times[i] && self.times[i] <= stop)
            .filter(|&i| {
                !filter_bad
                    || !self
                        .bad
                        .as_ref()
                        .and_then(|flags| flags.get(i).copied())
                        .unwrap_or(false)
            })
            .collect();
        ChannelSeries {
            times: keep.iter().map(|&i| self.times[i]).collect(),
            values: self.values.select(&keep),
            bad: None,
        }
    }
}

/// Result of one fetch: channel name to series.
#[derive(Debug, Clone, Default)]
pub struct TelemetrySet {
    channels: HashMap<String, ChannelSeries>,
}

impl TelemetrySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, series: ChannelSeries) {
        self.channels.insert(name.into(), series);
    }

    pub fn get(&self, name: &str) -> CalResult<&ChannelSeries> {
        self.channels
            .get(name)
            .ok_or_else(|| CalError::MissingChannel(name.to_string()))
    }

    pub fn states(&self, name: &str) -> CalResult<(&[f64], &[String])> {
        let series = self.get(name)?;
        match &series.values {
            ChannelValues::States(values) => Ok((&series.times, values)),
            ChannelValues::Numeric(values) if values.is_empty() => Ok((&series.times, &[])),
            ChannelValues::Numeric(_) => Err(CalError::ChannelKind {
                channel: name.to_string(),
                expected: "state",
            }),
        }
    }

    pub fn numeric(&self, name: &str) -> CalResult<(&[f64], &[f64])> {
        let series = self.get(name)?;
        match &series.values {
            ChannelValues::Numeric(values) => Ok((&series.times, values)),
            ChannelValues::States(_) => Err(CalError::ChannelKind {
                channel: name.to_string(),
                expected: "numeric",
            }),
        }
    }

    /// Gathers `N` numeric channels sampled together into per-sample rows,
    /// using the first channel's timestamps.
    pub fn numeric_columns<const N: usize>(
        &self,
        names: [&str; N],
    ) -> CalResult<(Vec<f64>, Vec<[f64; N]>)> {
        let mut columns: Vec<&[f64]> = Vec::with_capacity(N);
        let mut times: &[f64] = &[];
        for (k, name) in names.iter().enumerate() {
            let (t, v) = self.numeric(name)?;
            if k == 0 {
                times = t;
            } else if v.len() != times.len() {
                return Err(CalError::structural(
                    format!("channel set {}", names.join(",")),
                    format!("{} has {} samples, {} has {}", names[0], times.len(), name, v.len()),
                ));
            }
            columns.push(v);
        }
        let rows = (0..times.len())
            .map(|i| std::array::from_fn(|k| columns[k][i]))
            .collect();
        Ok((times.to_vec(), rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_inclusive_and_filters_bad() {
        let mut series = ChannelSeries::numeric(vec![0.0, 1.0, 2.0, 3.0], vec![5.0, 6.0, 7.0, 8.0]);
        series.bad = Some(vec![false, true, false, false]);
        let kept = series.window(1.0, 3.0, true);
        assert_eq!(kept.times, vec![2.0, 3.0]);
        assert_eq!(kept.values, ChannelValues::Numeric(vec![7.0, 8.0]));
        let all = series.window(1.0, 3.0, false);
        assert_eq!(all.times, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn columns_require_matching_lengths() {
        let mut set = TelemetrySet::new();
        set.insert("A", ChannelSeries::numeric(vec![0.0, 1.0], vec![1.0, 2.0]));
        set.insert("B", ChannelSeries::numeric(vec![0.0, 1.0], vec![3.0, 4.0]));
        set.insert("C", ChannelSeries::numeric(vec![0.0], vec![3.0]));
        let (times, rows) = set.numeric_columns(["A", "B"]).unwrap();
        assert_eq!(times, vec![0.0, 1.0]);
        assert_eq!(rows, vec![[1.0, 3.0], [2.0, 4.0]]);
        assert!(matches!(
            set.numeric_columns(["A", "C"]),
            Err(CalError::StructuralInconsistency { .. })
        ));
    }

    #[test]
    fn kind_mismatch_is_reported() {
        let mut set = TelemetrySet::new();
        set.insert("MODE", ChannelSeries::states(vec![0.0], ["NPNT"]));
        assert!(matches!(set.numeric("MODE"), Err(CalError::ChannelKind { .. })));
        assert!(matches!(set.states("NOPE"), Err(CalError::MissingChannel(_))));
    }

    #[test]
    fn json_values_pick_their_kind() {
        let states: ChannelSeries =
            serde_json::from_str(r#"{"times":[0.0,1.0],"values":["NPNT","NMAN"]}"#).unwrap();
        assert!(matches!(states.values, ChannelValues::States(_)));
        let numbers: ChannelSeries =
            serde_json::from_str(r#"{"times":[0.0],"values":[1.5],"bad":[true]}"#).unwrap();
        assert!(matches!(numbers.values, ChannelValues::Numeric(_)));
        assert_eq!(numbers.bad, Some(vec![true]));
    }
}
