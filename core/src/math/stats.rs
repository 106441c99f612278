pub struct StatsHelper;

impl StatsHelper {
    pub fn rms(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = samples.iter().map(|&v| v * v).sum();
        (sum_sq / samples.len() as f64).sqrt()
    }

    pub fn mean(samples: &[f64]) -> Option<f64> {
        if samples.is_empty() {
            return None;
        }
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }

    /// Population standard deviation.
    pub fn std_dev(samples: &[f64]) -> Option<f64> {
        let mean = Self::mean(samples)?;
        let var = samples.iter().map(|&v| (v - mean) * (v - mean)).sum::<f64>()
            / samples.len() as f64;
        Some(var.sqrt())
    }

    pub fn max(samples: &[f64]) -> Option<f64> {
        samples.iter().copied().reduce(f64::max)
    }
}
