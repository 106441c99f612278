use crate::archive::series::{ChannelSeries, TelemetrySet};
use crate::prelude::CalResult;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Time-series retrieval contract used by every pipeline stage.
pub trait TelemetrySource {
    /// Returns each requested channel restricted to `start <= t <= stop`.
    /// With `filter_bad` set, samples flagged bad are removed.
    fn fetch(&self, channels: &[&str], start: f64, stop: f64, filter_bad: bool)
        -> CalResult<TelemetrySet>;
}

/// Archive held fully in memory; persisted as one JSON object keyed by
/// channel name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryArchive {
    channels: BTreeMap<String, ChannelSeries>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, series: ChannelSeries) {
        self.channels.insert(name.into(), series);
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    /// Loads and validates a JSON archive file.
    pub fn load_json(path: &Path) -> CalResult<Self> {
        let text = fs::read_to_string(path)?;
        let archive: MemoryArchive = serde_json::from_str(&text)?;
        for (name, series) in &archive.channels {
            series.validate(name)?;
        }
        debug!(
            "loaded {} channels from {}",
            archive.channels.len(),
            path.display()
        );
        Ok(archive)
    }

    pub fn save_json(&self, path: &Path) -> CalResult<()> {
        let text = serde_json::to_string(self)?;
        fs::write(path, text)?;
        Ok(())
    }
}

impl TelemetrySource for MemoryArchive {
    fn fetch(
        &self,
        channels: &[&str],
        start: f64,
        stop: f64,
        filter_bad: bool,
    ) -> CalResult<TelemetrySet> {
        let mut set = TelemetrySet::new();
        for &name in channels {
            let Some(series) = self.channels.get(name) else {
                debug!("channel {} absent from archive", name);
                continue;
            };
            series.validate(name)?;
            set.insert(name, series.window(start, stop, filter_bad));
        }
        Ok(set)
    }
}
