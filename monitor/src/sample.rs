//! Per-tick measurements and the series collected over a run

use serde::{Deserialize, Serialize};

use crate::snapshot::RawSnapshot;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Convert a byte count to MB (`bytes / 1024 / 1024`).
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// One measurement of the monitored process tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds since monitoring began
    pub elapsed_seconds: f64,

    /// Unique set size summed over the tree, in MB
    pub memory_mb: f64,

    /// CPU usage over the interval since the previous sample; may exceed 100
    pub cpu_percent: f64,

    /// Cumulative bytes read since process start, in MB
    pub io_read_mb: f64,

    /// Cumulative bytes written since process start, in MB
    pub io_write_mb: f64,
}

impl Sample {
    /// Build a sample from an aggregated snapshot and an already derived CPU rate.
    pub fn from_snapshot(elapsed_seconds: f64, cpu_percent: f64, snapshot: &RawSnapshot) -> Self {
        Self {
            elapsed_seconds,
            memory_mb: bytes_to_mb(snapshot.memory_bytes),
            cpu_percent,
            io_read_mb: bytes_to_mb(snapshot.io.read_bytes),
            io_write_mb: bytes_to_mb(snapshot.io.write_bytes),
        }
    }
}

/// Append-only ordered samples of a single run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleSeries {
    samples: Vec<Sample>,
}

impl SampleSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Elapsed time of the last sample, 0 for an empty series
    pub fn duration_seconds(&self) -> f64 {
        self.last().map(|s| s.elapsed_seconds).unwrap_or(0.0)
    }

    /// Highest memory reading of the run
    pub fn peak_memory_mb(&self) -> f64 {
        self.samples.iter().map(|s| s.memory_mb).fold(0.0, f64::max)
    }

    /// Highest CPU reading of the run
    pub fn peak_cpu_percent(&self) -> f64 {
        self.samples.iter().map(|s| s.cpu_percent).fold(0.0, f64::max)
    }
}

impl<'a> IntoIterator for &'a SampleSeries {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

impl From<Vec<Sample>> for SampleSeries {
    fn from(samples: Vec<Sample>) -> Self {
        Self { samples }
    }
}
