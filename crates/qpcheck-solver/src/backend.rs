use qpcheck_types::{QpInstance, Result};
use serde::{Deserialize, Serialize};

/// QP solver status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QpStatus {
    Optimal,
    PrimalInfeasible,
    DualInfeasible,
    MaxIterations,
    NumericalError,
    Unsolved,
}

/// Solution from QP solver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QpSolution {
    pub x: Vec<f64>,
    pub status: QpStatus,
    pub objective: f64,
    pub iterations: usize,
}

impl QpSolution {
    pub fn is_optimal(&self) -> bool {
        self.status == QpStatus::Optimal
    }
}

/// Per-call solver options.
///
/// `show_progress` toggles solver trace output. `tolerance` and
/// `max_iterations` are tuning slots; `None` leaves the solver's own
/// settings in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveOptions {
    pub show_progress: bool,
    pub tolerance: Option<f64>,
    pub max_iterations: Option<u32>,
}

impl SolveOptions {
    pub fn quiet() -> Self {
        Self::default()
    }

    pub fn with_progress(show_progress: bool) -> Self {
        SolveOptions {
            show_progress,
            ..Self::default()
        }
    }
}

/// Trait for QP solver backends
pub trait QpSolver: Send + Sync {
    /// Short identifier used in logs and reports
    fn name(&self) -> &str;

    /// Solve a QP problem: minimize 0.5 * x^T P x + q^T x
    /// subject to A x <= b and A_eq x = b_eq
    fn solve(&self, instance: &QpInstance, options: &SolveOptions) -> Result<QpSolution>;
}
