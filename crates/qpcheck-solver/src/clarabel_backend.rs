use clarabel::algebra::CscMatrix;
use clarabel::solver::{DefaultSettings, DefaultSolver, IPSolver, SolverStatus, SupportedConeT};
use nalgebra::{DMatrix, DVector};
use qpcheck_types::{QpInstance, Result};
use tracing::debug;

use crate::{QpSolution, QpSolver, QpStatus, SolveOptions};

/// Clarabel-based QP solver, used as the trusted reference.
///
/// Only `show_progress` is read from [`SolveOptions`]; iteration and gap
/// settings are fixed per instance of the solver.
pub struct ClarabelSolver {
    max_iter: u32,
    tol_gap_abs: f64,
    tol_gap_rel: f64,
}

impl ClarabelSolver {
    /// Create a new Clarabel solver with default settings
    pub fn new() -> Self {
        ClarabelSolver {
            max_iter: 200,
            tol_gap_abs: 1e-8,
            tol_gap_rel: 1e-8,
        }
    }
}

impl Default for ClarabelSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl QpSolver for ClarabelSolver {
    fn name(&self) -> &str {
        "clarabel"
    }

    fn solve(&self, instance: &QpInstance, options: &SolveOptions) -> Result<QpSolution> {
        instance.validate()?;

        let n = instance.num_vars();
        let p_csc = to_clarabel_csc_upper(&instance.p);

        // Clarabel format: Ax + s = b with s in a cone.
        // Zero cone rows encode A_eq x = b_eq, nonnegative rows encode A x <= b.
        let (a_stacked, b_stacked, cones) = stack_constraints(instance, n);
        let a_csc = to_clarabel_csc(&a_stacked);

        let mut settings = DefaultSettings::default();
        settings.verbose = options.show_progress;
        settings.max_iter = self.max_iter;
        settings.tol_gap_abs = self.tol_gap_abs;
        settings.tol_gap_rel = self.tol_gap_rel;

        let mut solver = DefaultSolver::new(
            &p_csc,
            instance.q.as_slice(),
            &a_csc,
            b_stacked.as_slice(),
            &cones,
            settings,
        );

        solver.solve();

        let status = match solver.solution.status {
            SolverStatus::Solved => QpStatus::Optimal,
            SolverStatus::PrimalInfeasible => QpStatus::PrimalInfeasible,
            SolverStatus::DualInfeasible => QpStatus::DualInfeasible,
            SolverStatus::MaxIterations => QpStatus::MaxIterations,
            SolverStatus::NumericalError | SolverStatus::InsufficientProgress => {
                QpStatus::NumericalError
            }
            _ => QpStatus::Unsolved,
        };

        debug!(
            solver = self.name(),
            ?status,
            iterations = solver.info.iterations,
            "reference solve finished"
        );

        Ok(QpSolution {
            x: solver.solution.x.clone(),
            objective: solver.solution.obj_val,
            status,
            iterations: solver.info.iterations as usize,
        })
    }
}

/// Stack equality rows above inequality rows and build the matching cones
fn stack_constraints(
    instance: &QpInstance,
    n: usize,
) -> (DMatrix<f64>, DVector<f64>, Vec<SupportedConeT<f64>>) {
    let p_eq = instance.num_equalities();
    let m_in = instance.num_inequalities();

    let mut a = DMatrix::zeros(p_eq + m_in, n);
    let mut b = DVector::zeros(p_eq + m_in);
    let mut cones = Vec::new();

    if let Some(block) = &instance.equality {
        a.view_mut((0, 0), (p_eq, n)).copy_from(&block.matrix);
        b.rows_mut(0, p_eq).copy_from(&block.rhs);
        cones.push(SupportedConeT::ZeroConeT(p_eq));
    }
    if let Some(block) = &instance.inequality {
        a.view_mut((p_eq, 0), (m_in, n)).copy_from(&block.matrix);
        b.rows_mut(p_eq, m_in).copy_from(&block.rhs);
        cones.push(SupportedConeT::NonnegativeConeT(m_in));
    }

    (a, b, cones)
}

/// Convert DMatrix to Clarabel CSC format (upper triangle only for P)
fn to_clarabel_csc_upper(mat: &DMatrix<f64>) -> CscMatrix<f64> {
    let mut colptr = vec![0];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();

    for col in 0..mat.ncols() {
        for row in 0..=col {
            let val = mat[(row, col)];
            if val != 0.0 {
                rowval.push(row);
                nzval.push(val);
            }
        }
        colptr.push(nzval.len());
    }

    CscMatrix {
        m: mat.nrows(),
        n: mat.ncols(),
        colptr,
        rowval,
        nzval,
    }
}

/// Convert DMatrix to Clarabel CSC format (full matrix)
fn to_clarabel_csc(mat: &DMatrix<f64>) -> CscMatrix<f64> {
    let mut colptr = vec![0];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();

    for col in 0..mat.ncols() {
        for row in 0..mat.nrows() {
            let val = mat[(row, col)];
            if val != 0.0 {
                rowval.push(row);
                nzval.push(val);
            }
        }
        colptr.push(nzval.len());
    }

    CscMatrix {
        m: mat.nrows(),
        n: mat.ncols(),
        colptr,
        rowval,
        nzval,
    }
}
