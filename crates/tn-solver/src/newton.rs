//! Damped Newton iteration on an equilibrated linear system.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use crate::error::{SolverError, SolverResult};

/// Pivots below this, after equilibration, mark the Jacobian as singular.
const SINGULAR_PIVOT: f64 = 1e-12;

/// Steps damped below this, or that fail to lower the merit, make no progress.
const STALL_DAMPING: f64 = 1e-3;

/// Consecutive steps without progress before the iteration gives up.
const STALL_LIMIT: usize = 5;

/// Newton solver configuration.
#[derive(Debug, Clone)]
pub struct NewtonConfig {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Convergence threshold on max |residual|
    pub tolerance: f64,
    /// Line search backtracking factor
    pub line_search_beta: f64,
    /// Maximum line search iterations
    pub max_line_search_iters: usize,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-6,
            line_search_beta: 0.5,
            max_line_search_iters: 20,
        }
    }
}

/// Newton iteration result.
#[derive(Debug, Clone)]
pub struct NewtonResult {
    /// Last accepted iterate
    pub x: DVector<f64>,
    /// Residuals at `x`
    pub residual: DVector<f64>,
    /// Max |residual| at `x`
    pub max_residual: f64,
    /// Number of Newton steps taken
    pub iterations: usize,
    /// Max |residual| before every step, then at the final iterate
    pub history: Vec<f64>,
    /// Converged flag
    pub converged: bool,
    /// The iteration stopped early because steps made no progress
    pub stalled: bool,
}

/// Where a Jacobian lost rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Singularity {
    /// Equation with no dependence on any unknown
    EmptyRow(usize),
    /// Unknown no equation depends on
    EmptyColumn(usize),
    /// Near-zero pivot in the elimination of this unknown
    Pivot(usize),
    /// Non-finite derivative in this equation
    NonFinite(usize),
}

/// A square nonlinear system `F(x) = 0`.
pub trait NewtonProblem {
    fn residuals(&self, x: &DVector<f64>) -> SolverResult<DVector<f64>>;

    fn jacobian(&self, x: &DVector<f64>) -> SolverResult<DMatrix<f64>>;

    /// Whether a trial point may be evaluated at all.
    fn admissible(&self, _x: &DVector<f64>) -> bool {
        true
    }

    /// Human-readable location of a rank loss.
    fn describe(&self, singularity: Singularity) -> String {
        match singularity {
            Singularity::EmptyRow(i) => format!("equation {i} depends on no unknown"),
            Singularity::EmptyColumn(j) => format!("unknown {j} appears in no equation"),
            Singularity::Pivot(j) => format!("unknown {j} is not independently determined"),
            Singularity::NonFinite(i) => format!("non-finite derivative in equation {i}"),
        }
    }
}

fn max_abs(v: &DVector<f64>) -> f64 {
    v.iter().fold(0.0_f64, |acc, r| acc.max(r.abs()))
}

fn scaled_norm(r: &DVector<f64>, scale: &DVector<f64>) -> f64 {
    r.component_mul(scale).norm()
}

/// Solve `J · dx = rhs` after row and column equilibration.
///
/// Returns the step and the row scale factors, which also weigh the line
/// search merit function.
pub fn solve_equilibrated(
    mut jac: DMatrix<f64>,
    rhs: &DVector<f64>,
) -> Result<(DVector<f64>, DVector<f64>), Singularity> {
    let (rows, cols) = jac.shape();

    let mut row_scale = DVector::zeros(rows);
    for i in 0..rows {
        let mut largest = 0.0_f64;
        for value in jac.row(i).iter() {
            if !value.is_finite() {
                return Err(Singularity::NonFinite(i));
            }
            largest = largest.max(value.abs());
        }
        if largest == 0.0 {
            return Err(Singularity::EmptyRow(i));
        }
        row_scale[i] = 1.0 / largest;
        jac.row_mut(i).scale_mut(row_scale[i]);
    }

    let mut col_scale = DVector::zeros(cols);
    for j in 0..cols {
        let largest = jac.column(j).amax();
        if largest == 0.0 {
            return Err(Singularity::EmptyColumn(j));
        }
        col_scale[j] = 1.0 / largest;
        jac.column_mut(j).scale_mut(col_scale[j]);
    }

    let lu = jac.lu();
    let u = lu.u();
    if let Some(j) = (0..rows.min(cols)).find(|&k| u[(k, k)].abs() < SINGULAR_PIVOT) {
        return Err(Singularity::Pivot(j));
    }
    let y = lu
        .solve(&rhs.component_mul(&row_scale))
        .ok_or(Singularity::Pivot(cols.saturating_sub(1)))?;
    Ok((y.component_mul(&col_scale), row_scale))
}

/// Newton solver with backtracking line search.
///
/// Trial points that are inadmissible or fail to evaluate are backtracked
/// like points that do not decrease the merit `‖D·F‖₂`, where `D` holds the
/// row equilibration factors of the current Jacobian. Evaluation failures at
/// the starting point or while building a Jacobian abort the iteration.
///
/// When no trial lowers the merit, the shortest admissible one is taken. After
/// several such steps in a row, or steps damped to almost nothing, the
/// iteration stops with [`NewtonResult::stalled`] set.
pub fn newton_solve<P: NewtonProblem>(
    problem: &P,
    x0: DVector<f64>,
    config: &NewtonConfig,
) -> SolverResult<NewtonResult> {
    let mut x = x0;
    let mut r = problem.residuals(&x)?;
    let mut history = Vec::with_capacity(config.max_iterations + 1);
    let mut stalled_steps = 0;

    for iter in 0..config.max_iterations {
        let r_max = max_abs(&r);
        history.push(r_max);
        if r_max < config.tolerance {
            return Ok(NewtonResult {
                x,
                residual: r,
                max_residual: r_max,
                iterations: iter,
                history,
                converged: true,
                stalled: false,
            });
        }

        let jac = problem.jacobian(&x)?;
        let (dx, row_scale) =
            solve_equilibrated(jac, &(-&r)).map_err(|s| SolverError::SingularJacobian {
                what: problem.describe(s),
            })?;

        let merit = scaled_norm(&r, &row_scale);
        let mut alpha = 1.0;
        let mut accepted = None;
        let mut fallback = None;
        let mut last_error = None;
        for _ in 0..=config.max_line_search_iters {
            let trial = &x + alpha * &dx;
            if problem.admissible(&trial) {
                match problem.residuals(&trial) {
                    Ok(r_trial) if r_trial.iter().all(|v| v.is_finite()) => {
                        if scaled_norm(&r_trial, &row_scale) < merit {
                            accepted = Some((trial, r_trial, alpha));
                            break;
                        }
                        fallback = Some((trial, r_trial, alpha));
                    }
                    Ok(_) => {}
                    Err(err) => last_error = Some(err),
                }
            }
            alpha *= config.line_search_beta;
        }

        let progress = accepted.is_some();
        let (x_new, r_new, damping) = match (accepted, fallback, last_error) {
            (Some(step), _, _) | (None, Some(step), _) => step,
            (None, None, Some(err)) => return Err(err),
            (None, None, None) => {
                return Err(SolverError::NonConvergence {
                    iterations: iter,
                    residual: r_max,
                });
            }
        };
        debug!(iteration = iter, residual = r_max, damping, "newton step");
        x = x_new;
        r = r_new;

        if progress && damping >= STALL_DAMPING {
            stalled_steps = 0;
        } else {
            stalled_steps += 1;
        }
        if stalled_steps >= STALL_LIMIT {
            let r_max = max_abs(&r);
            history.push(r_max);
            warn!(iteration = iter, residual = r_max, "newton iteration stalled");
            return Ok(NewtonResult {
                converged: r_max < config.tolerance,
                x,
                residual: r,
                max_residual: r_max,
                iterations: iter + 1,
                history,
                stalled: true,
            });
        }
    }

    let r_max = max_abs(&r);
    history.push(r_max);
    Ok(NewtonResult {
        converged: r_max < config.tolerance,
        x,
        residual: r,
        max_residual: r_max,
        iterations: config.max_iterations,
        history,
        stalled: false,
    })
}
