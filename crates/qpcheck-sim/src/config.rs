use std::path::Path;
use std::time::Duration;

use qpcheck_types::{QpCheckError, Result};
use serde::{Deserialize, Serialize};

use crate::checker::DEFAULT_TOLERANCE;

/// Sweep configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Outer repeat count; each repetition runs one trial per cost scale
    pub repetitions: usize,

    /// Cost magnitude scales, one trial each per repetition
    pub cost_scales: Vec<f64>,

    /// Absolute per-coordinate tolerance between the two solutions
    pub tolerance: f64,

    /// Generator seed; drawn from OS entropy when absent
    pub seed: Option<u64>,

    /// Per-solve time limit in milliseconds
    pub solve_timeout_ms: Option<u64>,

    /// Solve with both backends concurrently within a trial
    pub parallel_solves: bool,

    /// Forward solver progress output
    pub show_progress: bool,

    /// Probability that an instance carries the sum-to-zero equality
    pub equality_probability: f64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            repetitions: 50,
            cost_scales: vec![100.0, 500.0, 1000.0],
            tolerance: DEFAULT_TOLERANCE,
            seed: None,
            solve_timeout_ms: None,
            parallel_solves: false,
            show_progress: false,
            equality_probability: 0.5,
        }
    }
}

impl SweepConfig {
    /// Load a JSON config file; missing fields keep their defaults
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| QpCheckError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: SweepConfig = serde_json::from_str(text)
            .map_err(|e| QpCheckError::Config(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cost_scales.is_empty() {
            return Err(QpCheckError::Config("cost_scales must not be empty".to_string()));
        }
        if let Some(bad) = self.cost_scales.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            return Err(QpCheckError::Config(format!(
                "cost scales must be positive and finite, got {}",
                bad
            )));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(QpCheckError::Config(format!(
                "tolerance must be non-negative and finite, got {}",
                self.tolerance
            )));
        }
        if !(0.0..=1.0).contains(&self.equality_probability) {
            return Err(QpCheckError::Config(format!(
                "equality_probability must be in [0, 1], got {}",
                self.equality_probability
            )));
        }
        if self.solve_timeout_ms == Some(0) {
            return Err(QpCheckError::Config("solve_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    /// Number of trials one sweep performs
    pub fn total_trials(&self) -> usize {
        self.repetitions * self.cost_scales.len()
    }

    pub fn solve_timeout(&self) -> Option<Duration> {
        self.solve_timeout_ms.map(Duration::from_millis)
    }
}
