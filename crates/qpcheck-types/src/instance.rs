use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{QpCheckError, Result};

/// A linear constraint block `matrix * x (<= | =) rhs`.
///
/// The matrix and its right-hand side always travel together, so a block is
/// either fully present or absent from an instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintBlock {
    pub matrix: DMatrix<f64>,
    pub rhs: DVector<f64>,
}

impl ConstraintBlock {
    pub fn new(matrix: DMatrix<f64>, rhs: DVector<f64>) -> Self {
        ConstraintBlock { matrix, rhs }
    }

    /// Number of constraint rows
    pub fn num_rows(&self) -> usize {
        self.rhs.len()
    }

    fn validate(&self, label: &str, n: usize) -> Result<()> {
        let rows = self.num_rows();
        if self.matrix.nrows() != rows || self.matrix.ncols() != n {
            return Err(QpCheckError::InvalidInstance(format!(
                "{} must be {}x{}, got {}x{}",
                label,
                rows,
                n,
                self.matrix.nrows(),
                self.matrix.ncols()
            )));
        }
        if !all_finite(self.matrix.iter()) || !all_finite(self.rhs.iter()) {
            return Err(QpCheckError::InvalidInstance(format!(
                "{} contains non-finite entries",
                label
            )));
        }
        Ok(())
    }
}

/// QP instance:
/// minimize 0.5 * x^T P x + q^T x
/// subject to A x <= b (inequality) and A_eq x = b_eq (equality)
#[derive(Debug, Clone, PartialEq)]
pub struct QpInstance {
    /// Cost matrix P (symmetric positive-definite for generated instances)
    pub p: DMatrix<f64>,
    /// Linear cost term q
    pub q: DVector<f64>,
    /// Inequality block (A, b)
    pub inequality: Option<ConstraintBlock>,
    /// Equality block (A_eq, b_eq)
    pub equality: Option<ConstraintBlock>,
}

impl QpInstance {
    pub fn new(
        p: DMatrix<f64>,
        q: DVector<f64>,
        inequality: Option<ConstraintBlock>,
        equality: Option<ConstraintBlock>,
    ) -> Self {
        QpInstance { p, q, inequality, equality }
    }

    /// Build an instance from nullable matrix/vector pairs.
    ///
    /// A pair that is jointly absent means "no such block". A matrix without
    /// its right-hand side (or the reverse) is rejected.
    pub fn from_parts(
        p: DMatrix<f64>,
        q: DVector<f64>,
        a: Option<DMatrix<f64>>,
        b: Option<DVector<f64>>,
        a_eq: Option<DMatrix<f64>>,
        b_eq: Option<DVector<f64>>,
    ) -> Result<Self> {
        let inequality = pair_to_block("A/b", a, b)?;
        let equality = pair_to_block("A_eq/b_eq", a_eq, b_eq)?;
        let instance = QpInstance::new(p, q, inequality, equality);
        instance.validate()?;
        Ok(instance)
    }

    /// Get number of variables
    pub fn num_vars(&self) -> usize {
        self.q.len()
    }

    pub fn num_inequalities(&self) -> usize {
        self.inequality.as_ref().map_or(0, ConstraintBlock::num_rows)
    }

    pub fn num_equalities(&self) -> usize {
        self.equality.as_ref().map_or(0, ConstraintBlock::num_rows)
    }

    /// Validate instance dimensions and entries
    pub fn validate(&self) -> Result<()> {
        let n = self.num_vars();
        if n == 0 {
            return Err(QpCheckError::InvalidInstance(
                "instance has no variables".to_string(),
            ));
        }

        if self.p.nrows() != n || self.p.ncols() != n {
            return Err(QpCheckError::InvalidInstance(format!(
                "P must be {}x{}, got {}x{}",
                n,
                n,
                self.p.nrows(),
                self.p.ncols()
            )));
        }

        if !all_finite(self.p.iter()) || !all_finite(self.q.iter()) {
            return Err(QpCheckError::InvalidInstance(
                "cost terms contain non-finite entries".to_string(),
            ));
        }

        if let Some(block) = &self.inequality {
            block.validate("A", n)?;
        }
        if let Some(block) = &self.equality {
            block.validate("A_eq", n)?;
        }

        Ok(())
    }

    /// Objective value 0.5 * x^T P x + q^T x
    pub fn objective(&self, x: &DVector<f64>) -> f64 {
        0.5 * x.dot(&(&self.p * x)) + self.q.dot(x)
    }

    /// Row-major view of the instance for reports and logs
    pub fn view(&self) -> InstanceView {
        InstanceView {
            p: rows_of(&self.p),
            q: self.q.iter().copied().collect(),
            a: self.inequality.as_ref().map(|blk| rows_of(&blk.matrix)),
            b: self.inequality.as_ref().map(|blk| blk.rhs.iter().copied().collect()),
            a_eq: self.equality.as_ref().map(|blk| rows_of(&blk.matrix)),
            b_eq: self.equality.as_ref().map(|blk| blk.rhs.iter().copied().collect()),
        }
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self.view())?)
    }
}

/// Serializable, row-major representation of a [`QpInstance`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceView {
    #[serde(rename = "P")]
    pub p: Vec<Vec<f64>>,
    pub q: Vec<f64>,
    #[serde(rename = "A")]
    pub a: Option<Vec<Vec<f64>>>,
    pub b: Option<Vec<f64>>,
    #[serde(rename = "A_eq")]
    pub a_eq: Option<Vec<Vec<f64>>>,
    pub b_eq: Option<Vec<f64>>,
}

fn pair_to_block(
    label: &str,
    matrix: Option<DMatrix<f64>>,
    rhs: Option<DVector<f64>>,
) -> Result<Option<ConstraintBlock>> {
    match (matrix, rhs) {
        (Some(matrix), Some(rhs)) => Ok(Some(ConstraintBlock::new(matrix, rhs))),
        (None, None) => Ok(None),
        _ => Err(QpCheckError::InvalidInstance(format!(
            "{} must be both present or both absent",
            label
        ))),
    }
}

fn rows_of(mat: &DMatrix<f64>) -> Vec<Vec<f64>> {
    mat.row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}

fn all_finite<'a>(mut values: impl Iterator<Item = &'a f64>) -> bool {
    values.all(|v| v.is_finite())
}
