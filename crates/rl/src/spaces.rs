use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    F32,
    U8,
}

/// Continuous box with the same bounds on every component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxSpace {
    pub low: f32,
    pub high: f32,
    pub shape: Vec<usize>,
    pub dtype: DType,
}

impl BoxSpace {
    #[must_use]
    pub fn new(low: f32, high: f32, shape: &[usize], dtype: DType) -> Self {
        Self { low, high, shape: shape.to_vec(), dtype }
    }

    /// Number of scalar components.
    #[must_use]
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    #[must_use]
    pub fn contains(&self, values: &[f32]) -> bool {
        values.len() == self.size() && values.iter().all(|v| (self.low..=self.high).contains(v))
    }

    #[must_use]
    pub fn clip(&self, values: &[f32]) -> Vec<f32> {
        values.iter().map(|v| v.clamp(self.low, self.high)).collect()
    }

    /// Uniform sample from the box.
    pub fn sample(&self, rng: &mut fastrand::Rng) -> Vec<f32> {
        let span = self.high - self.low;
        (0..self.size()).map(|_| self.low + rng.f32() * span).collect()
    }

    /// Log-density of the uniform distribution over the box.
    #[must_use]
    pub fn uniform_log_prob(&self) -> f32 {
        -(self.size() as f32) * (self.high - self.low).ln()
    }
}
