use nalgebra::{DMatrix, DVector};
use qpcheck_types::{ConstraintBlock, QpCheckError, QpInstance, Result};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use tracing::debug;

/// Number of decision variables in generated instances
const NUM_VARS: usize = 2;

/// Cost matrix redraws before generation gives up. A draw is rejected only
/// when V is numerically rank deficient, so exhausting the cap is not expected
/// in practice; when it happens the sweep aborts with a generation error.
const MAX_COST_DRAWS: usize = 16;

/// Smallest accepted eigenvalue relative to the largest one
const MIN_RELATIVE_EIGENVALUE: f64 = 1e-12;

/// Random convex QP generator with a fixed constraint topology.
///
/// P = scale * V V^T with V uniform in [0, 1), q uniform in [0, scale),
/// the fixed inequality polytope from [`fixed_inequalities`] and, on a coin
/// flip, the equality from [`sum_to_zero_equality`].
pub struct InstanceGenerator {
    rng: Xoshiro256StarStar,
    seed: u64,
    equality_probability: f64,
}

impl InstanceGenerator {
    pub fn with_seed(seed: u64) -> Self {
        InstanceGenerator {
            rng: Xoshiro256StarStar::seed_from_u64(seed),
            seed,
            equality_probability: 0.5,
        }
    }

    /// Seed from OS entropy; [`seed`](Self::seed) still reports it for replay
    pub fn from_entropy() -> Self {
        Self::with_seed(rand::random())
    }

    pub fn with_equality_probability(mut self, probability: f64) -> Self {
        self.equality_probability = probability.clamp(0.0, 1.0);
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generate one instance at the given cost magnitude
    pub fn generate(&mut self, cost_scale: f64) -> Result<QpInstance> {
        if !(cost_scale.is_finite() && cost_scale > 0.0) {
            return Err(QpCheckError::Generation(format!(
                "cost scale must be positive and finite, got {}",
                cost_scale
            )));
        }

        let p = self.cost_matrix(cost_scale)?;
        let q = DVector::from_fn(NUM_VARS, |_, _| self.rng.gen::<f64>() * cost_scale);

        let equality = if self.rng.gen::<f64>() < self.equality_probability {
            Some(sum_to_zero_equality())
        } else {
            None
        };

        debug!(cost_scale, with_equality = equality.is_some(), "generated instance");

        Ok(QpInstance::new(p, q, Some(fixed_inequalities()), equality))
    }

    fn cost_matrix(&mut self, cost_scale: f64) -> Result<DMatrix<f64>> {
        for _ in 0..MAX_COST_DRAWS {
            let v = DMatrix::from_fn(NUM_VARS, NUM_VARS, |_, _| self.rng.gen::<f64>());
            let vvt = &v * v.transpose();
            let p = (&vvt + vvt.transpose()) * (0.5 * cost_scale);

            let eigenvalues = p.clone().symmetric_eigen().eigenvalues;
            let largest = eigenvalues.amax();
            if eigenvalues.min() > MIN_RELATIVE_EIGENVALUE * largest {
                return Ok(p);
            }
            debug!("discarding near-singular cost matrix draw");
        }

        Err(QpCheckError::Generation(format!(
            "no positive-definite cost matrix after {} draws",
            MAX_COST_DRAWS
        )))
    }
}

/// Fixed inequality block: x1 + x2 <= 2, -x1 + 2 x2 <= 2, 2 x1 + x2 <= 3.
/// The origin is strictly inside.
pub fn fixed_inequalities() -> ConstraintBlock {
    ConstraintBlock::new(
        DMatrix::from_row_slice(3, 2, &[1.0, 1.0, -1.0, 2.0, 2.0, 1.0]),
        DVector::from_vec(vec![2.0, 2.0, 3.0]),
    )
}

/// Equality block x1 + x2 = 0
pub fn sum_to_zero_equality() -> ConstraintBlock {
    ConstraintBlock::new(
        DMatrix::from_row_slice(1, 2, &[1.0, 1.0]),
        DVector::from_vec(vec![0.0]),
    )
}

/// Smallest eigenvalue of a symmetric matrix
pub fn min_eigenvalue(p: &DMatrix<f64>) -> f64 {
    p.clone().symmetric_eigen().eigenvalues.min()
}

/// Square, symmetric and with all eigenvalues strictly positive
pub fn is_positive_definite(p: &DMatrix<f64>) -> bool {
    if !p.is_square() || p.nrows() == 0 {
        return false;
    }
    let scale = p.amax().max(1.0);
    let symmetric = (p - p.transpose()).amax() <= 1e-12 * scale;
    symmetric && min_eigenvalue(p) > 0.0
}
