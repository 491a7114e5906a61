use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use qpcheck_types::{QpCheckError, QpInstance, Result};
use tracing::warn;

use crate::backend::{QpSolution, QpSolver, SolveOptions};

/// Runs the wrapped solver on a worker thread and gives up after `limit`.
///
/// An expired solve leaves its worker running to completion in the
/// background; its result is discarded.
pub struct TimedSolver {
    inner: Arc<dyn QpSolver>,
    limit: Duration,
}

impl TimedSolver {
    pub fn new(inner: Arc<dyn QpSolver>, limit: Duration) -> Self {
        TimedSolver { inner, limit }
    }
}

impl QpSolver for TimedSolver {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn solve(&self, instance: &QpInstance, options: &SolveOptions) -> Result<QpSolution> {
        let (tx, rx) = mpsc::channel();
        let solver = Arc::clone(&self.inner);
        let instance = instance.clone();
        let options = options.clone();

        thread::Builder::new()
            .name(format!("solve-{}", self.inner.name()))
            .spawn(move || {
                // The receiver is gone once the deadline has passed.
                let _ = tx.send(solver.solve(&instance, &options));
            })?;

        match rx.recv_timeout(self.limit) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(solver = self.name(), limit_ms = self.limit.as_millis() as u64, "solve timed out");
                Err(QpCheckError::Timeout {
                    solver: self.name().to_string(),
                    millis: self.limit.as_millis() as u64,
                })
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(QpCheckError::solver_failure(
                self.name(),
                "solver thread terminated without a result",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QpStatus;
    use nalgebra::{DMatrix, DVector};

    struct SlowSolver {
        delay: Duration,
    }

    impl QpSolver for SlowSolver {
        fn name(&self) -> &str {
            "slow"
        }

        fn solve(&self, instance: &QpInstance, _options: &SolveOptions) -> Result<QpSolution> {
            thread::sleep(self.delay);
            Ok(QpSolution {
                x: vec![0.0; instance.num_vars()],
                status: QpStatus::Optimal,
                objective: 0.0,
                iterations: 0,
            })
        }
    }

    struct PanickingSolver;

    impl QpSolver for PanickingSolver {
        fn name(&self) -> &str {
            "panics"
        }

        fn solve(&self, _instance: &QpInstance, _options: &SolveOptions) -> Result<QpSolution> {
            panic!("solver blew up");
        }
    }

    fn instance() -> QpInstance {
        QpInstance::new(DMatrix::identity(2, 2), DVector::zeros(2), None, None)
    }

    #[test]
    fn test_fast_solve_passes_through() {
        let solver = TimedSolver::new(
            Arc::new(SlowSolver { delay: Duration::from_millis(0) }),
            Duration::from_secs(5),
        );
        let sol = solver.solve(&instance(), &SolveOptions::quiet()).unwrap();
        assert_eq!(sol.x, vec![0.0, 0.0]);
        assert_eq!(solver.name(), "slow");
    }

    #[test]
    fn test_slow_solve_times_out() {
        let solver = TimedSolver::new(
            Arc::new(SlowSolver { delay: Duration::from_millis(500) }),
            Duration::from_millis(10),
        );
        let result = solver.solve(&instance(), &SolveOptions::quiet());
        assert!(matches!(result, Err(QpCheckError::Timeout { millis: 10, .. })));
    }

    #[test]
    fn test_panicking_solver_is_a_failure() {
        let solver = TimedSolver::new(Arc::new(PanickingSolver), Duration::from_secs(5));
        let result = solver.solve(&instance(), &SolveOptions::quiet());
        assert!(matches!(result, Err(QpCheckError::SolverFailure { .. })));
    }
}
