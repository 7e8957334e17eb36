use serde::{Deserialize, Serialize};

/// Number of samples retained per utilization channel.
pub const METRIC_WINDOW: usize = 20;

/// One utilization reading, each channel a percentage in `0..=100`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MetricSample {
    pub cpu: f64,
    pub gpu: f64,
    pub ram: f64,
}

impl MetricSample {
    pub fn new(cpu: f64, gpu: f64, ram: f64) -> Self {
        Self { cpu, gpu, ram }
    }

    /// Name of the first channel that is not a finite percentage, if any.
    pub fn out_of_range_channel(&self) -> Option<&'static str> {
        [("cpu", self.cpu), ("gpu", self.gpu), ("ram", self.ram)]
            .into_iter()
            .find(|(_, v)| !v.is_finite() || !(0.0..=100.0).contains(v))
            .map(|(name, _)| name)
    }
}

/// Sliding window of recent utilization samples, oldest first.
///
/// The three channels are always appended together, so they share one length.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MetricHistory {
    #[serde(rename = "cpu_history", default)]
    pub cpu: Vec<f64>,
    #[serde(rename = "gpu_history", default)]
    pub gpu: Vec<f64>,
    #[serde(rename = "ram_history", default)]
    pub ram: Vec<f64>,
}

impl MetricHistory {
    /// Append a sample to every channel, evicting from the front past [`METRIC_WINDOW`].
    pub fn record(&mut self, sample: MetricSample) {
        self.record_with_capacity(sample, METRIC_WINDOW);
    }

    pub fn record_with_capacity(&mut self, sample: MetricSample, capacity: usize) {
        push_bounded(&mut self.cpu, sample.cpu, capacity);
        push_bounded(&mut self.gpu, sample.gpu, capacity);
        push_bounded(&mut self.ram, sample.ram, capacity);
    }

    /// Number of samples held (length of the CPU channel).
    pub fn len(&self) -> usize {
        self.cpu.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cpu.is_empty()
    }
}

fn push_bounded(window: &mut Vec<f64>, value: f64, capacity: usize) {
    window.push(value);
    // Single eviction in practice; loops only if a stored window was oversized.
    while window.len() > capacity {
        window.remove(0);
    }
}
