//! Throttling valve.

use nalgebra::DMatrix;

use crate::common::{column, passthrough_rows, push_fluid_equality, zeta_residual, zeta_value};
use crate::error::{ComponentError, ComponentResult};
use crate::params::{ActiveParams, ParamDef};
use crate::traits::{ComponentModel, EvalContext, StreamState};

/// Isenthalpic valve.
///
/// Equations: mass balance, fluid balance and `h_in = h_out`. The pressure
/// drop is set by `pr` (`p_out = pr · p_in`) or by the loss coefficient `zeta`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Valve;

const PARAMS: &[ParamDef] = &[ParamDef::equation("pr"), ParamDef::equation("zeta")];

impl ComponentModel for Valve {
    fn kind(&self) -> &'static str {
        "valve"
    }

    fn ports(&self) -> (usize, usize) {
        (1, 1)
    }

    fn param_defs(&self) -> &'static [ParamDef] {
        PARAMS
    }

    fn structural_equation_count(&self, nf: usize) -> usize {
        nf + 2
    }

    fn structural_residuals(
        &self,
        _ctx: &EvalContext<'_>,
        ports: &[StreamState],
        _params: &ActiveParams,
        out: &mut Vec<f64>,
    ) -> ComponentResult<()> {
        let (inlet, outlet) = (&ports[0], &ports[1]);
        out.push(inlet.m - outlet.m);
        push_fluid_equality(inlet, outlet, out);
        out.push(inlet.h - outlet.h);
        Ok(())
    }

    fn structural_jacobian(
        &self,
        nf: usize,
        _ports: &[StreamState],
        _params: &ActiveParams,
    ) -> Option<DMatrix<f64>> {
        let mut jac = DMatrix::zeros(nf + 2, 2 * StreamState::width(nf));
        let row = passthrough_rows(&mut jac, 0, nf, 0, 1);
        jac[(row, column(nf, 0, StreamState::H))] = 1.0;
        jac[(row, column(nf, 1, StreamState::H))] = -1.0;
        Some(jac)
    }

    fn param_residual(
        &self,
        name: &str,
        ctx: &EvalContext<'_>,
        ports: &[StreamState],
        params: &ActiveParams,
    ) -> ComponentResult<f64> {
        let (inlet, outlet) = (&ports[0], &ports[1]);
        match (name, params.value(name)) {
            ("pr", Some(pr)) => Ok(outlet.p - pr * inlet.p),
            ("zeta", Some(zeta)) => zeta_residual(ctx, inlet, outlet, zeta),
            _ => Err(ComponentError::UnknownParameter {
                component: ctx.component.to_string(),
                name: name.to_string(),
            }),
        }
    }

    fn derived_names(&self) -> &'static [&'static str] {
        &["pr", "zeta", "dp"]
    }

    fn derived_quantities(
        &self,
        ctx: &EvalContext<'_>,
        ports: &[StreamState],
        _params: &ActiveParams,
    ) -> ComponentResult<Vec<(&'static str, f64)>> {
        let (inlet, outlet) = (&ports[0], &ports[1]);
        let mut values = vec![("pr", outlet.p / inlet.p), ("dp", inlet.p - outlet.p)];
        if let Some(zeta) = zeta_value(ctx, inlet, outlet)? {
            values.push(("zeta", zeta));
        }
        Ok(values)
    }

    fn passthrough(&self) -> &'static [(usize, usize)] {
        &[(0, 0)]
    }
}
