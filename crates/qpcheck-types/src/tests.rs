#[cfg(test)]
mod tests {
    use crate::*;
    use nalgebra::{DMatrix, DVector};
    use proptest::prelude::*;

    fn identity_instance() -> QpInstance {
        QpInstance::new(
            DMatrix::identity(2, 2),
            DVector::from_vec(vec![0.0, 0.0]),
            Some(ConstraintBlock::new(
                DMatrix::from_row_slice(3, 2, &[1.0, 1.0, -1.0, 2.0, 2.0, 1.0]),
                DVector::from_vec(vec![2.0, 2.0, 3.0]),
            )),
            None,
        )
    }

    #[test]
    fn test_instance_validation() {
        let instance = identity_instance();
        assert!(instance.validate().is_ok());
        assert_eq!(instance.num_vars(), 2);
        assert_eq!(instance.num_inequalities(), 3);
        assert_eq!(instance.num_equalities(), 0);
    }

    #[test]
    fn test_invalid_cost_dimensions() {
        let mut instance = identity_instance();
        instance.p = DMatrix::identity(3, 3);
        assert!(matches!(instance.validate(), Err(QpCheckError::InvalidInstance(_))));
    }

    #[test]
    fn test_invalid_block_dimensions() {
        let mut instance = identity_instance();
        instance.equality = Some(ConstraintBlock::new(
            DMatrix::from_row_slice(1, 3, &[1.0, 1.0, 1.0]),
            DVector::from_vec(vec![0.0]),
        ));
        assert!(instance.validate().is_err());
    }

    #[test]
    fn test_non_finite_entries_rejected() {
        let mut instance = identity_instance();
        instance.q[1] = f64::NAN;
        assert!(instance.validate().is_err());
    }

    #[test]
    fn test_from_parts_jointly_absent() {
        let instance = QpInstance::from_parts(
            DMatrix::identity(2, 2),
            DVector::zeros(2),
            None,
            None,
            None,
            None,
        )
        .unwrap();
        assert!(instance.inequality.is_none());
        assert!(instance.equality.is_none());
    }

    #[test]
    fn test_from_parts_partial_pair_rejected() {
        let result = QpInstance::from_parts(
            DMatrix::identity(2, 2),
            DVector::zeros(2),
            None,
            None,
            Some(DMatrix::from_row_slice(1, 2, &[1.0, 1.0])),
            None,
        );
        assert!(matches!(result, Err(QpCheckError::InvalidInstance(_))));
    }

    #[test]
    fn test_view_is_row_major() {
        let view = identity_instance().view();
        let a = view.a.unwrap();
        assert_eq!(a[1], vec![-1.0, 2.0]);
        assert_eq!(view.b.unwrap(), vec![2.0, 2.0, 3.0]);
        assert!(view.a_eq.is_none());
    }

    #[test]
    fn test_json_field_names() {
        let json = identity_instance().to_json().unwrap();
        assert!(json.get("P").is_some());
        assert!(json.get("A_eq").unwrap().is_null());
    }

    #[test]
    fn test_objective() {
        let instance = identity_instance();
        let x = DVector::from_vec(vec![1.0, 2.0]);
        assert!((instance.objective(&x) - 2.5).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_objective_of_identity_is_half_norm(x0 in -100.0f64..100.0, x1 in -100.0f64..100.0) {
            let instance = identity_instance();
            let x = DVector::from_vec(vec![x0, x1]);
            let expected = 0.5 * (x0 * x0 + x1 * x1);
            prop_assert!((instance.objective(&x) - expected).abs() <= 1e-9 * (1.0 + expected));
        }
    }
}
