mod backend;
mod clarabel_backend;
mod interior_point;
mod timeout;

pub use backend::{QpSolution, QpSolver, QpStatus, SolveOptions};
pub use clarabel_backend::ClarabelSolver;
pub use interior_point::{InteriorPointSettings, InteriorPointSolver};
pub use timeout::TimedSolver;

#[cfg(test)]
mod tests;
