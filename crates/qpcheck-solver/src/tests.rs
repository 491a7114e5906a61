// Cross-backend tests: both solvers on the same instances

#[cfg(test)]
mod tests {
    use crate::*;
    use nalgebra::{DMatrix, DVector};
    use qpcheck_types::{ConstraintBlock, QpInstance};

    fn fixed_polytope() -> ConstraintBlock {
        ConstraintBlock::new(
            DMatrix::from_row_slice(3, 2, &[1.0, 1.0, -1.0, 2.0, 2.0, 1.0]),
            DVector::from_vec(vec![2.0, 2.0, 3.0]),
        )
    }

    fn sum_to_zero() -> ConstraintBlock {
        ConstraintBlock::new(
            DMatrix::from_row_slice(1, 2, &[1.0, 1.0]),
            DVector::from_vec(vec![0.0]),
        )
    }

    fn solve_both(instance: &QpInstance) -> (QpSolution, QpSolution) {
        let options = SolveOptions::quiet();
        let reference = ClarabelSolver::new().solve(instance, &options).unwrap();
        let candidate = InteriorPointSolver::new().solve(instance, &options).unwrap();
        (reference, candidate)
    }

    fn assert_close(a: &[f64], b: &[f64], tol: f64) {
        assert_eq!(a.len(), b.len());
        for (i, (ai, bi)) in a.iter().zip(b.iter()).enumerate() {
            assert!((ai - bi).abs() < tol, "x[{}]: {} vs {}", i, ai, bi);
        }
    }

    #[test]
    fn test_interior_optimum() {
        // P = I, q = 0: unconstrained minimum at the origin lies inside the polytope
        let instance = QpInstance::new(
            DMatrix::identity(2, 2),
            DVector::zeros(2),
            Some(fixed_polytope()),
            None,
        );
        let (reference, candidate) = solve_both(&instance);

        assert_eq!(reference.status, QpStatus::Optimal);
        assert_eq!(candidate.status, QpStatus::Optimal);
        assert_close(&reference.x, &[0.0, 0.0], 1e-5);
        assert_close(&candidate.x, &[0.0, 0.0], 1e-5);
    }

    #[test]
    fn test_equality_with_active_inequality() {
        // On x1 + x2 = 0 the objective is t^2 - 40t, bounded by 2 x1 + x2 <= 3 at t = 3
        let instance = QpInstance::new(
            DMatrix::identity(2, 2),
            DVector::from_vec(vec![-50.0, -10.0]),
            Some(fixed_polytope()),
            Some(sum_to_zero()),
        );
        let (reference, candidate) = solve_both(&instance);

        assert_eq!(reference.status, QpStatus::Optimal);
        assert_eq!(candidate.status, QpStatus::Optimal);
        assert_close(&reference.x, &[3.0, -3.0], 1e-4);
        assert_close(&candidate.x, &[3.0, -3.0], 1e-4);
        assert!((candidate.x[0] + candidate.x[1]).abs() < 1e-6);
        assert!((reference.objective - candidate.objective).abs() < 1e-3);
    }

    #[test]
    fn test_large_scale_costs_agree() {
        // Magnitudes comparable to the harness' largest cost scale
        let v = DMatrix::from_row_slice(2, 2, &[0.8, 0.3, 0.1, 0.9]);
        let p = (&v * v.transpose()) * 1000.0;
        let instance = QpInstance::new(
            p,
            DVector::from_vec(vec![420.0, 870.0]),
            Some(fixed_polytope()),
            None,
        );
        let (reference, candidate) = solve_both(&instance);

        assert_eq!(reference.status, QpStatus::Optimal);
        assert_eq!(candidate.status, QpStatus::Optimal);
        assert_close(&reference.x, &candidate.x, 1e-4);
    }

    #[test]
    fn test_equality_only_agrees() {
        let instance = QpInstance::new(
            DMatrix::from_row_slice(2, 2, &[3.0, 1.0, 1.0, 2.0]),
            DVector::from_vec(vec![1.0, -4.0]),
            None,
            Some(sum_to_zero()),
        );
        let (reference, candidate) = solve_both(&instance);

        assert_eq!(reference.status, QpStatus::Optimal);
        assert_eq!(candidate.status, QpStatus::Optimal);
        assert_close(&reference.x, &candidate.x, 1e-5);
    }

    #[test]
    fn test_progress_output_does_not_change_solution() {
        let instance = QpInstance::new(
            DMatrix::from_row_slice(2, 2, &[2.0, 0.5, 0.5, 1.0]),
            DVector::from_vec(vec![3.0, 1.0]),
            Some(fixed_polytope()),
            Some(sum_to_zero()),
        );
        let solver = InteriorPointSolver::new();
        let quiet = solver.solve(&instance, &SolveOptions::quiet()).unwrap();
        let verbose = solver.solve(&instance, &SolveOptions::with_progress(true)).unwrap();

        assert_eq!(quiet.x, verbose.x);
        assert_eq!(quiet.iterations, verbose.iterations);
    }

    #[test]
    fn test_invalid_instance_rejected_by_both() {
        let instance = QpInstance::new(DMatrix::identity(3, 3), DVector::zeros(2), None, None);
        let options = SolveOptions::quiet();
        assert!(ClarabelSolver::new().solve(&instance, &options).is_err());
        assert!(InteriorPointSolver::new().solve(&instance, &options).is_err());
    }
}
