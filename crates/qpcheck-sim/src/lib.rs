mod config;
mod generator;
mod checker;
mod runner;

pub use config::SweepConfig;
pub use generator::{
    fixed_inequalities, is_positive_definite, min_eigenvalue, sum_to_zero_equality,
    InstanceGenerator,
};
pub use checker::{Comparison, EquivalenceChecker, DEFAULT_TOLERANCE};
pub use runner::{
    ExitStatus, RunSummary, SolverRole, SweepRunner, SweepState, TrialOutcome, TrialResult,
};
