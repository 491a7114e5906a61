use std::fmt;
use std::sync::Arc;
use std::thread;

use qpcheck_report::{Reporter, TrialReport, Verdict};
use qpcheck_solver::{ClarabelSolver, InteriorPointSolver, QpSolution, QpSolver, SolveOptions, TimedSolver};
use qpcheck_types::{QpCheckError, QpInstance, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::checker::{Comparison, EquivalenceChecker, DEFAULT_TOLERANCE};
use crate::config::SweepConfig;
use crate::generator::InstanceGenerator;

/// Which side of the comparison a solver plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverRole {
    Reference,
    Candidate,
}

impl fmt::Display for SolverRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverRole::Reference => write!(f, "reference"),
            SolverRole::Candidate => write!(f, "candidate"),
        }
    }
}

/// Outcome of a single trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrialOutcome {
    Passed,
    EquivalenceMismatch { index: usize, difference: f64 },
    DimensionMismatch { reference: usize, candidate: usize },
    SolverFailure { role: SolverRole, reason: String },
}

impl TrialOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, TrialOutcome::Passed)
    }

    pub fn describe(&self) -> String {
        match self {
            TrialOutcome::Passed => "passed".to_string(),
            TrialOutcome::EquivalenceMismatch { index, difference } => {
                format!("x[{}] differs by {:.6e}", index, difference)
            }
            TrialOutcome::DimensionMismatch { reference, candidate } => format!(
                "dimension mismatch: reference has {} entries, candidate has {}",
                reference, candidate
            ),
            TrialOutcome::SolverFailure { role, reason } => {
                format!("{} solver failed: {}", role, reason)
            }
        }
    }
}

impl From<Comparison> for TrialOutcome {
    fn from(cmp: Comparison) -> Self {
        match cmp {
            Comparison::Equivalent => TrialOutcome::Passed,
            Comparison::Mismatch { index, difference } => {
                TrialOutcome::EquivalenceMismatch { index, difference }
            }
            Comparison::DimensionMismatch { reference, candidate } => {
                TrialOutcome::DimensionMismatch { reference, candidate }
            }
        }
    }
}

/// Result of one generate-solve-solve-compare cycle
#[derive(Debug, Clone)]
pub struct TrialResult {
    pub index: usize,
    pub cost_scale: f64,
    pub instance: QpInstance,
    pub reference: Option<QpSolution>,
    pub candidate: Option<QpSolution>,
    pub outcome: TrialOutcome,
}

impl TrialResult {
    pub fn passed(&self) -> bool {
        self.outcome.passed()
    }

    pub fn to_report(&self) -> Result<TrialReport> {
        let inputs = self.instance.to_json()?;
        let outputs = serde_json::json!({
            "reference": self.reference.as_ref().map(|s| &s.x),
            "candidate": self.candidate.as_ref().map(|s| &s.x),
            "outcome": &self.outcome,
        });
        let verdict = if self.passed() {
            Verdict::Passed
        } else {
            Verdict::Failed(self.outcome.describe())
        };
        TrialReport::new(self.index, self.cost_scale, inputs, outputs, verdict)
    }
}

/// Process exit verdict of a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitStatus {
    Success,
    Failure { failed: usize },
}

impl ExitStatus {
    pub fn code(&self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure { .. } => 1,
        }
    }
}

/// Accumulated pass/fail accounting for one sweep
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_trials: usize,
    pub failed_trials: usize,
    pub solver_failures: usize,
    pub dimension_mismatches: usize,
    pub equivalence_mismatches: usize,
    pub seed: Option<u64>,
}

impl RunSummary {
    pub fn new(seed: u64) -> Self {
        RunSummary {
            seed: Some(seed),
            ..Self::default()
        }
    }

    pub fn record(&mut self, result: &TrialResult) {
        self.total_trials += 1;
        match &result.outcome {
            TrialOutcome::Passed => return,
            TrialOutcome::EquivalenceMismatch { .. } => self.equivalence_mismatches += 1,
            TrialOutcome::DimensionMismatch { .. } => self.dimension_mismatches += 1,
            TrialOutcome::SolverFailure { .. } => self.solver_failures += 1,
        }
        self.failed_trials += 1;
    }

    pub fn passed(&self) -> bool {
        self.failed_trials == 0
    }

    pub fn exit_status(&self) -> ExitStatus {
        if self.passed() {
            ExitStatus::Success
        } else {
            ExitStatus::Failure {
                failed: self.failed_trials,
            }
        }
    }
}

/// Progress of a sweep through its schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepState {
    Running { completed: usize },
    Done,
}

impl SweepState {
    pub fn start(total: usize) -> Self {
        Self::after(0, total)
    }

    pub fn advance(self, total: usize) -> Self {
        match self {
            SweepState::Running { completed } => Self::after(completed + 1, total),
            SweepState::Done => SweepState::Done,
        }
    }

    fn after(completed: usize, total: usize) -> Self {
        if completed >= total {
            SweepState::Done
        } else {
            SweepState::Running { completed }
        }
    }
}

/// Differential sweep runner: reference vs candidate on generated instances
pub struct SweepRunner {
    reference: Arc<dyn QpSolver>,
    candidate: Arc<dyn QpSolver>,
    checker: EquivalenceChecker,
    options: SolveOptions,
    config: SweepConfig,
}

impl SweepRunner {
    pub fn new(
        reference: Arc<dyn QpSolver>,
        candidate: Arc<dyn QpSolver>,
        config: SweepConfig,
    ) -> Result<Self> {
        config.validate()?;

        let (reference, candidate) = match config.solve_timeout() {
            Some(limit) => (
                Arc::new(TimedSolver::new(reference, limit)) as Arc<dyn QpSolver>,
                Arc::new(TimedSolver::new(candidate, limit)) as Arc<dyn QpSolver>,
            ),
            None => (reference, candidate),
        };

        Ok(SweepRunner {
            reference,
            candidate,
            checker: EquivalenceChecker::new(config.tolerance),
            options: SolveOptions::with_progress(config.show_progress),
            config,
        })
    }

    /// Clarabel as reference, the interior-point solver as candidate
    pub fn with_default_solvers(config: SweepConfig) -> Result<Self> {
        Self::new(
            Arc::new(ClarabelSolver::new()),
            Arc::new(InteriorPointSolver::new()),
            config,
        )
    }

    /// Cost scale of every trial, in execution order
    pub fn schedule(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.config.repetitions).flat_map(move |_| self.config.cost_scales.iter().copied())
    }

    pub fn generator(&self) -> InstanceGenerator {
        let generator = match self.config.seed {
            Some(seed) => InstanceGenerator::with_seed(seed),
            None => InstanceGenerator::from_entropy(),
        };
        generator.with_equality_probability(self.config.equality_probability)
    }

    /// Run the whole schedule. Failing trials are recorded, not fatal.
    pub fn run_sweep(&self, reporter: &mut dyn Reporter) -> Result<RunSummary> {
        let mut generator = self.generator();
        let total = self.config.total_trials();

        info!(
            seed = generator.seed(),
            trials = total,
            reference = self.reference.name(),
            candidate = self.candidate.name(),
            tolerance = self.checker.tolerance(),
            "starting differential sweep"
        );
        if self.checker.tolerance() >= DEFAULT_TOLERANCE {
            warn!(
                tolerance = self.checker.tolerance(),
                "absolute tolerance is loose and may hide small regressions"
            );
        }

        let mut summary = RunSummary::new(generator.seed());
        let mut state = SweepState::start(total);

        for (index, cost_scale) in self.schedule().enumerate() {
            let result = self.run_trial(&mut generator, index, cost_scale)?;

            if !result.passed() {
                warn!(
                    trial = index,
                    cost_scale,
                    reason = %result.outcome.describe(),
                    "trial failed"
                );
            }

            reporter.publish(&result.to_report()?)?;
            summary.record(&result);
            state = state.advance(total);
        }

        debug_assert_eq!(state, SweepState::Done);
        reporter.finish(summary.total_trials, summary.failed_trials)?;

        info!(
            total = summary.total_trials,
            failed = summary.failed_trials,
            solver_failures = summary.solver_failures,
            dimension_mismatches = summary.dimension_mismatches,
            equivalence_mismatches = summary.equivalence_mismatches,
            "sweep finished"
        );

        Ok(summary)
    }

    pub fn run_trial(
        &self,
        generator: &mut InstanceGenerator,
        index: usize,
        cost_scale: f64,
    ) -> Result<TrialResult> {
        let instance = generator.generate(cost_scale)?;
        Ok(self.evaluate(index, cost_scale, instance))
    }

    /// Solve one instance with both backends and compare
    pub fn evaluate(&self, index: usize, cost_scale: f64, instance: QpInstance) -> TrialResult {
        let (reference, candidate) = self.solve_both(&instance);
        debug!(trial = index, cost_scale, "both solvers returned");

        let outcome = match (&reference, &candidate) {
            (Err(e), _) => solver_failure(SolverRole::Reference, e),
            (_, Err(e)) => solver_failure(SolverRole::Candidate, e),
            (Ok(r), _) if !r.is_optimal() => unsolved(SolverRole::Reference, r),
            (_, Ok(c)) if !c.is_optimal() => unsolved(SolverRole::Candidate, c),
            (Ok(r), Ok(c)) => self.checker.check(&r.x, &c.x).into(),
        };

        TrialResult {
            index,
            cost_scale,
            instance,
            reference: reference.ok(),
            candidate: candidate.ok(),
            outcome,
        }
    }

    fn solve_both(&self, instance: &QpInstance) -> (Result<QpSolution>, Result<QpSolution>) {
        if !self.config.parallel_solves {
            let reference = self.reference.solve(instance, &self.options);
            let candidate = self.candidate.solve(instance, &self.options);
            return (reference, candidate);
        }

        thread::scope(|scope| {
            let reference = scope.spawn(|| self.reference.solve(instance, &self.options));
            let candidate = scope.spawn(|| self.candidate.solve(instance, &self.options));
            (
                join_solve(reference.join(), self.reference.name()),
                join_solve(candidate.join(), self.candidate.name()),
            )
        })
    }
}

fn join_solve(joined: thread::Result<Result<QpSolution>>, name: &str) -> Result<QpSolution> {
    joined.unwrap_or_else(|_| Err(QpCheckError::solver_failure(name, "solver thread panicked")))
}

fn solver_failure(role: SolverRole, err: &QpCheckError) -> TrialOutcome {
    TrialOutcome::SolverFailure {
        role,
        reason: err.to_string(),
    }
}

fn unsolved(role: SolverRole, solution: &QpSolution) -> TrialOutcome {
    TrialOutcome::SolverFailure {
        role,
        reason: format!(
            "status {:?} after {} iterations",
            solution.status, solution.iterations
        ),
    }
}
