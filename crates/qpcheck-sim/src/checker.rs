use serde::{Deserialize, Serialize};

/// Default absolute tolerance between reference and candidate coordinates.
/// The sweep warns while a value this loose is in effect; tighten through
/// `SweepConfig::tolerance`.
pub const DEFAULT_TOLERANCE: f64 = 1.0;

/// Result of comparing two solution vectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Comparison {
    Equivalent,
    DimensionMismatch { reference: usize, candidate: usize },
    Mismatch { index: usize, difference: f64 },
}

impl Comparison {
    pub fn is_equivalent(&self) -> bool {
        matches!(self, Comparison::Equivalent)
    }
}

/// Element-wise absolute-tolerance comparison
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquivalenceChecker {
    tolerance: f64,
}

impl EquivalenceChecker {
    pub fn new(tolerance: f64) -> Self {
        EquivalenceChecker { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Compare two vectors, stopping at the first coordinate out of tolerance.
    /// NaN coordinates never pass.
    pub fn check(&self, reference: &[f64], candidate: &[f64]) -> Comparison {
        if reference.len() != candidate.len() {
            return Comparison::DimensionMismatch {
                reference: reference.len(),
                candidate: candidate.len(),
            };
        }

        reference
            .iter()
            .zip(candidate)
            .enumerate()
            .map(|(index, (r, c))| (index, (r - c).abs()))
            .find(|(_, difference)| !(*difference <= self.tolerance))
            .map_or(Comparison::Equivalent, |(index, difference)| {
                Comparison::Mismatch { index, difference }
            })
    }

    pub fn compare(&self, reference: &[f64], candidate: &[f64]) -> bool {
        self.check(reference, candidate).is_equivalent()
    }
}

impl Default for EquivalenceChecker {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}
