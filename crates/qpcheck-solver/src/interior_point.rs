use nalgebra::{DMatrix, DVector};
use qpcheck_types::{QpCheckError, QpInstance, Result};
use tracing::debug;

use crate::backend::{QpSolution, QpSolver, QpStatus, SolveOptions};

/// Required merit reduction per unit step length
const SUFFICIENT_DECREASE: f64 = 0.01;

/// Centering parameter bounds for the safeguarded step
const MIN_CENTERING: f64 = 0.1;
const MAX_CENTERING: f64 = 0.5;

/// Steps shorter than this count as a stall
const MIN_STEP: f64 = 1e-14;

/// Settings for [`InteriorPointSolver`]
#[derive(Debug, Clone, PartialEq)]
pub struct InteriorPointSettings {
    pub max_iterations: u32,
    /// Scaled residual and gap tolerance
    pub tolerance: f64,
    /// Start from a shifted least-squares point instead of the origin
    pub infeasible_start: bool,
    /// Fraction of the distance to the orthant boundary taken per step
    pub step_fraction: f64,
}

impl Default for InteriorPointSettings {
    fn default() -> Self {
        InteriorPointSettings {
            max_iterations: 100,
            tolerance: 1e-8,
            infeasible_start: true,
            step_fraction: 0.99,
        }
    }
}

/// Dense primal-dual interior-point QP solver (Mehrotra predictor-corrector).
///
/// Works on the slack form `G x + s = h, s >= 0`, `A x = b` with duals
/// `z >= 0` and `y`. Each iteration reduces the Newton system to
///
/// ```text
///     [ P + G' diag(z/s) G   A' ] [dx]   [rhs_x]
///     [ A                    0  ] [dy] = [rhs_y]
/// ```
///
/// and factorizes it by LU.
pub struct InteriorPointSolver {
    settings: InteriorPointSettings,
}

impl InteriorPointSolver {
    pub fn new() -> Self {
        InteriorPointSolver {
            settings: InteriorPointSettings::default(),
        }
    }

    pub fn with_settings(settings: InteriorPointSettings) -> Self {
        InteriorPointSolver { settings }
    }

    fn failure(&self, reason: impl Into<String>) -> QpCheckError {
        QpCheckError::solver_failure(self.name(), reason)
    }

    /// Least-squares start shifted into the positive orthant
    fn infeasible_start_point(&self, sys: &KktSystem) -> Result<Iterate> {
        let m = sys.num_inequalities();

        // minimize 0.5 x'Px + q'x + 0.5 ||s||^2  s.t.  Gx + s = h, Ax = b
        let ones = DVector::from_element(m, 1.0);
        let rhs_x = -&sys.q + sys.g.transpose() * &sys.h;
        let (x, y) = sys
            .solve_reduced(&ones, &rhs_x, &sys.b)
            .ok_or_else(|| self.failure("singular KKT system at initial point"))?;

        let s0 = &sys.h - &sys.g * &x;
        let z0 = -&s0;

        Ok(Iterate {
            s: shift_positive(s0),
            z: shift_positive(z0),
            x,
            y,
        })
    }

    /// Origin start, which must be strictly feasible
    fn origin_start_point(&self, sys: &KktSystem) -> Result<Iterate> {
        let n = sys.num_vars();
        let m = sys.num_inequalities();
        let p = sys.num_equalities();

        if sys.h.iter().any(|&hi| hi <= 0.0) {
            return Err(self.failure("origin violates an inequality and infeasible start is disabled"));
        }
        if inf_norm(&sys.b) > 0.0 {
            return Err(self.failure("origin violates an equality and infeasible start is disabled"));
        }

        Ok(Iterate {
            x: DVector::zeros(n),
            s: sys.h.clone(),
            z: DVector::from_element(m, 1.0),
            y: DVector::zeros(p),
        })
    }

    /// Newton direction for complementarity target `r_c`
    fn direction(
        &self,
        sys: &KktSystem,
        it: &Iterate,
        res: &Residuals,
        r_c: &DVector<f64>,
    ) -> Option<Direction> {
        let d = it.z.component_div(&it.s);
        let w = (it.z.component_mul(&res.ineq) - r_c).component_div(&it.s);

        let rhs_x = -&res.dual - sys.g.transpose() * &w;
        let rhs_y = -&res.eq;
        let (dx, dy) = sys.solve_reduced(&d, &rhs_x, &rhs_y)?;

        let g_dx = &sys.g * &dx;
        let dz = d.component_mul(&g_dx) + w;
        let ds = -&res.ineq - g_dx;

        Some(Direction { dx, ds, dz, dy })
    }

    fn step_length(&self, it: &Iterate, dir: &Direction) -> f64 {
        (self.settings.step_fraction * dir.boundary_step(it)).min(1.0)
    }
}

impl Default for InteriorPointSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl QpSolver for InteriorPointSolver {
    fn name(&self) -> &str {
        "interior-point"
    }

    fn solve(&self, instance: &QpInstance, options: &SolveOptions) -> Result<QpSolution> {
        instance.validate()?;

        let max_iterations = options.max_iterations.unwrap_or(self.settings.max_iterations);
        let tol = options.tolerance.unwrap_or(self.settings.tolerance);
        if !(tol.is_finite() && tol > 0.0) {
            return Err(self.failure(format!("tolerance must be positive, got {}", tol)));
        }

        let sys = KktSystem::from_instance(instance);
        let m = sys.num_inequalities();

        let mut it = if self.settings.infeasible_start {
            self.infeasible_start_point(&sys)?
        } else {
            self.origin_start_point(&sys)?
        };

        if options.show_progress {
            println!(
                "{:>4} {:>14} {:>10} {:>10} {:>10} {:>8}",
                "iter", "pobj", "pres", "dres", "gap", "step"
            );
        }

        let mut iterations = 0u32;
        let mut last_step = 0.0;

        loop {
            let res = sys.residuals(&it);
            let objective = instance.objective(&it.x);
            let gap = it.s.dot(&it.z);

            if options.show_progress {
                println!(
                    "{:>4} {:>14.6e} {:>10.2e} {:>10.2e} {:>10.2e} {:>8.4}",
                    iterations,
                    objective,
                    res.primal_inf_norm(),
                    inf_norm(&res.dual),
                    gap,
                    last_step
                );
            }
            debug!(
                iteration = iterations,
                objective,
                primal = res.primal_inf_norm(),
                dual = inf_norm(&res.dual),
                gap,
                "interior point iterate"
            );

            if sys.converged(&it, &res, objective, tol) {
                return Ok(it.into_solution(QpStatus::Optimal, objective, iterations));
            }
            if iterations >= max_iterations {
                return Ok(it.into_solution(QpStatus::MaxIterations, objective, iterations));
            }

            let mu = if m > 0 { gap / m as f64 } else { 0.0 };

            // Predictor
            let r_aff = it.s.component_mul(&it.z);
            let affine = self
                .direction(&sys, &it, &res, &r_aff)
                .ok_or_else(|| self.failure(format!("singular KKT system at iteration {}", iterations)))?;

            let step = if m == 0 {
                it.advance(&affine, 1.0);
                1.0
            } else {
                let alpha_aff = affine.boundary_step(&it).min(1.0);
                let s_aff = &it.s + &affine.ds * alpha_aff;
                let z_aff = &it.z + &affine.dz * alpha_aff;
                let mu_aff = s_aff.dot(&z_aff) / m as f64;
                let sigma = if mu > 0.0 {
                    (mu_aff / mu).powi(3).clamp(0.0, 1.0)
                } else {
                    0.0
                };

                // Corrector
                let r_c = &r_aff + affine.ds.component_mul(&affine.dz)
                    - DVector::from_element(m, sigma * mu);
                let mut dir = self
                    .direction(&sys, &it, &res, &r_c)
                    .ok_or_else(|| self.failure(format!("singular KKT system at iteration {}", iterations)))?;
                let mut alpha = self.step_length(&it, &dir);

                // Without sufficient merit decrease take a damped centering step instead
                let merit = res.merit(gap);
                if !sys.decreases_merit(&it, &dir, alpha, merit) {
                    let sigma = sigma.clamp(MIN_CENTERING, MAX_CENTERING);
                    let r_c = &r_aff - DVector::from_element(m, sigma * mu);
                    dir = self
                        .direction(&sys, &it, &res, &r_c)
                        .ok_or_else(|| self.failure(format!("singular KKT system at iteration {}", iterations)))?;
                    alpha = self.step_length(&it, &dir);
                    while alpha >= MIN_STEP && !sys.decreases_merit(&it, &dir, alpha, merit) {
                        alpha *= 0.5;
                    }
                    debug!(iteration = iterations, sigma, alpha, "safeguarded centering step");
                }

                if alpha < MIN_STEP {
                    return Ok(it.into_solution(QpStatus::NumericalError, objective, iterations));
                }
                it.advance(&dir, alpha);
                alpha
            };

            last_step = step;
            iterations += 1;
        }
    }
}

/// Dense problem data in slack form
struct KktSystem {
    p: DMatrix<f64>,
    q: DVector<f64>,
    g: DMatrix<f64>,
    h: DVector<f64>,
    a: DMatrix<f64>,
    b: DVector<f64>,
}

impl KktSystem {
    fn from_instance(instance: &QpInstance) -> Self {
        let n = instance.num_vars();
        let (g, h) = match &instance.inequality {
            Some(block) => (block.matrix.clone(), block.rhs.clone()),
            None => (DMatrix::zeros(0, n), DVector::zeros(0)),
        };
        let (a, b) = match &instance.equality {
            Some(block) => (block.matrix.clone(), block.rhs.clone()),
            None => (DMatrix::zeros(0, n), DVector::zeros(0)),
        };

        KktSystem {
            p: instance.p.clone(),
            q: instance.q.clone(),
            g,
            h,
            a,
            b,
        }
    }

    fn num_vars(&self) -> usize {
        self.q.len()
    }

    fn num_inequalities(&self) -> usize {
        self.h.len()
    }

    fn num_equalities(&self) -> usize {
        self.b.len()
    }

    /// Solve the reduced KKT system with inequality weights `d`
    fn solve_reduced(
        &self,
        d: &DVector<f64>,
        rhs_x: &DVector<f64>,
        rhs_y: &DVector<f64>,
    ) -> Option<(DVector<f64>, DVector<f64>)> {
        let n = self.num_vars();
        let p = self.num_equalities();

        let g_scaled = DMatrix::from_fn(self.g.nrows(), n, |i, j| d[i] * self.g[(i, j)]);
        let hessian = &self.p + self.g.transpose() * g_scaled;

        let mut kkt = DMatrix::zeros(n + p, n + p);
        kkt.view_mut((0, 0), (n, n)).copy_from(&hessian);
        let mut rhs = DVector::zeros(n + p);
        rhs.rows_mut(0, n).copy_from(rhs_x);
        if p > 0 {
            kkt.view_mut((0, n), (n, p)).copy_from(&self.a.transpose());
            kkt.view_mut((n, 0), (p, n)).copy_from(&self.a);
            rhs.rows_mut(n, p).copy_from(rhs_y);
        }

        let sol = kkt.lu().solve(&rhs)?;
        if sol.iter().any(|v| !v.is_finite()) {
            return None;
        }
        Some((sol.rows(0, n).into_owned(), sol.rows(n, p).into_owned()))
    }

    fn residuals(&self, it: &Iterate) -> Residuals {
        Residuals {
            dual: &self.p * &it.x + &self.q + self.g.transpose() * &it.z + self.a.transpose() * &it.y,
            eq: &self.a * &it.x - &self.b,
            ineq: &self.g * &it.x + &it.s - &self.h,
        }
    }

    /// Whether stepping `alpha` along `dir` cuts the merit sufficiently
    fn decreases_merit(&self, it: &Iterate, dir: &Direction, alpha: f64, merit: f64) -> bool {
        let mut trial = it.clone();
        trial.advance(dir, alpha);
        let res = self.residuals(&trial);
        res.merit(trial.s.dot(&trial.z)) <= (1.0 - SUFFICIENT_DECREASE * alpha) * merit
    }

    fn converged(&self, it: &Iterate, res: &Residuals, objective: f64, tol: f64) -> bool {
        let primal_scale = 1.0 + inf_norm(&self.b).max(inf_norm(&self.h));
        let dual_scale = 1.0 + inf_norm(&self.q).max(inf_norm(&(&self.p * &it.x)));

        res.primal_inf_norm() <= tol * primal_scale
            && inf_norm(&res.dual) <= tol * dual_scale
            && it.s.dot(&it.z) <= tol * (1.0 + objective.abs())
    }
}

#[derive(Clone)]
struct Iterate {
    x: DVector<f64>,
    s: DVector<f64>,
    z: DVector<f64>,
    y: DVector<f64>,
}

impl Iterate {
    fn advance(&mut self, dir: &Direction, alpha: f64) {
        self.x += &dir.dx * alpha;
        self.s += &dir.ds * alpha;
        self.z += &dir.dz * alpha;
        self.y += &dir.dy * alpha;
    }

    fn into_solution(self, status: QpStatus, objective: f64, iterations: u32) -> QpSolution {
        QpSolution {
            x: self.x.as_slice().to_vec(),
            status,
            objective,
            iterations: iterations as usize,
        }
    }
}

struct Direction {
    dx: DVector<f64>,
    ds: DVector<f64>,
    dz: DVector<f64>,
    dy: DVector<f64>,
}

impl Direction {
    /// Largest step keeping both s and z nonnegative (may exceed 1)
    fn boundary_step(&self, it: &Iterate) -> f64 {
        step_to_boundary(&it.s, &self.ds).min(step_to_boundary(&it.z, &self.dz))
    }
}

struct Residuals {
    dual: DVector<f64>,
    eq: DVector<f64>,
    ineq: DVector<f64>,
}

impl Residuals {
    fn primal_inf_norm(&self) -> f64 {
        inf_norm(&self.eq).max(inf_norm(&self.ineq))
    }

    /// Infeasibility plus complementarity gap
    fn merit(&self, gap: f64) -> f64 {
        self.primal_inf_norm() + inf_norm(&self.dual) + gap
    }
}

fn step_to_boundary(v: &DVector<f64>, dv: &DVector<f64>) -> f64 {
    v.iter()
        .zip(dv.iter())
        .filter(|(_, &d)| d < 0.0)
        .map(|(&vi, &di)| -vi / di)
        .fold(f64::INFINITY, f64::min)
}

/// Shift a vector so its smallest entry is at least 1 when it is not already positive
fn shift_positive(v: DVector<f64>) -> DVector<f64> {
    let min = v.iter().copied().fold(f64::INFINITY, f64::min);
    if v.is_empty() || min > 0.0 {
        v
    } else {
        v.add_scalar(1.0 - min)
    }
}

fn inf_norm(v: &DVector<f64>) -> f64 {
    v.iter().fold(0.0, |acc: f64, x| acc.max(x.abs()))
}
