//! Boundary components and the cycle closer.

use nalgebra::DMatrix;

use crate::common::column;
use crate::error::ComponentResult;
use crate::params::ActiveParams;
use crate::traits::{ComponentModel, EvalContext, StreamState};

/// Network inflow boundary. All outlet variables come from stream specifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct Source;

impl ComponentModel for Source {
    fn kind(&self) -> &'static str {
        "source"
    }

    fn ports(&self) -> (usize, usize) {
        (0, 1)
    }

    fn structural_equation_count(&self, _nf: usize) -> usize {
        0
    }

    fn structural_residuals(
        &self,
        _ctx: &EvalContext<'_>,
        _ports: &[StreamState],
        _params: &ActiveParams,
        _out: &mut Vec<f64>,
    ) -> ComponentResult<()> {
        Ok(())
    }

    fn structural_jacobian(
        &self,
        nf: usize,
        _ports: &[StreamState],
        _params: &ActiveParams,
    ) -> Option<DMatrix<f64>> {
        Some(DMatrix::zeros(0, StreamState::width(nf)))
    }
}

/// Network outflow boundary.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sink;

impl ComponentModel for Sink {
    fn kind(&self) -> &'static str {
        "sink"
    }

    fn ports(&self) -> (usize, usize) {
        (1, 0)
    }

    fn structural_equation_count(&self, _nf: usize) -> usize {
        0
    }

    fn structural_residuals(
        &self,
        _ctx: &EvalContext<'_>,
        _ports: &[StreamState],
        _params: &ActiveParams,
        _out: &mut Vec<f64>,
    ) -> ComponentResult<()> {
        Ok(())
    }

    fn structural_jacobian(
        &self,
        nf: usize,
        _ports: &[StreamState],
        _params: &ActiveParams,
    ) -> Option<DMatrix<f64>> {
        Some(DMatrix::zeros(0, StreamState::width(nf)))
    }
}

/// Closes a cycle by equating pressure and enthalpy.
///
/// Mass flow and composition are not equated; the rest of the loop fixes them.
/// Their mismatch is reported as derived quantities.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleCloser;

impl ComponentModel for CycleCloser {
    fn kind(&self) -> &'static str {
        "cycle closer"
    }

    fn ports(&self) -> (usize, usize) {
        (1, 1)
    }

    fn structural_equation_count(&self, _nf: usize) -> usize {
        2
    }

    fn structural_residuals(
        &self,
        _ctx: &EvalContext<'_>,
        ports: &[StreamState],
        _params: &ActiveParams,
        out: &mut Vec<f64>,
    ) -> ComponentResult<()> {
        let (inlet, outlet) = (&ports[0], &ports[1]);
        out.push(inlet.p - outlet.p);
        out.push(inlet.h - outlet.h);
        Ok(())
    }

    fn structural_jacobian(
        &self,
        nf: usize,
        _ports: &[StreamState],
        _params: &ActiveParams,
    ) -> Option<DMatrix<f64>> {
        let mut jac = DMatrix::zeros(2, 2 * StreamState::width(nf));
        for (row, var) in [StreamState::P, StreamState::H].into_iter().enumerate() {
            jac[(row, column(nf, 0, var))] = 1.0;
            jac[(row, column(nf, 1, var))] = -1.0;
        }
        Some(jac)
    }

    fn derived_names(&self) -> &'static [&'static str] {
        &["mass_deviation", "fluid_deviation"]
    }

    fn derived_quantities(
        &self,
        _ctx: &EvalContext<'_>,
        ports: &[StreamState],
        _params: &ActiveParams,
    ) -> ComponentResult<Vec<(&'static str, f64)>> {
        let (inlet, outlet) = (&ports[0], &ports[1]);
        let fluid_deviation = inlet
            .x
            .iter()
            .zip(&outlet.x)
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt();
        Ok(vec![
            ("mass_deviation", inlet.m - outlet.m),
            ("fluid_deviation", fluid_deviation),
        ])
    }

    fn passthrough(&self) -> &'static [(usize, usize)] {
        &[(0, 0)]
    }
}
