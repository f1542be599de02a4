//! Finite difference Jacobian computation.

use nalgebra::{DMatrix, DVector};

use crate::error::SolverResult;

/// Compute Jacobian using forward finite differences.
///
/// For each column j, perturbs x[j] by `epsilon · max(|x[j]|, 1)` and computes
/// (f(x+e) - f(x))/e.
pub fn finite_difference_jacobian<F>(
    x: &DVector<f64>,
    f: F,
    epsilon: f64,
) -> SolverResult<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    let columns: Vec<usize> = (0..x.len()).collect();
    finite_difference_columns(x, &columns, |_, v| epsilon * v.abs().max(1.0), f)
}

/// Forward differences of `f` with respect to the listed columns of `x` only.
///
/// Column `k` of the result belongs to `x[columns[k]]`; `step(j, x_j)` gives
/// the increment for column `j`.
pub fn finite_difference_columns<F, S>(
    x: &DVector<f64>,
    columns: &[usize],
    step: S,
    f: F,
) -> SolverResult<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
    S: Fn(usize, f64) -> f64,
{
    let f_x = f(x)?;
    let mut jac = DMatrix::zeros(f_x.len(), columns.len());
    let mut x_perturbed = x.clone();

    for (k, &j) in columns.iter().enumerate() {
        let dx = step(j, x[j]);
        x_perturbed[j] = x[j] + dx;
        let f_perturbed = f(&x_perturbed)?;
        x_perturbed[j] = x[j];
        jac.set_column(k, &((f_perturbed - &f_x) / dx));
    }

    Ok(jac)
}
