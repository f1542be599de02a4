//! Pumps, compressors and turbines.

use nalgebra::DMatrix;

use crate::characteristic::Characteristic;
use crate::common::{passthrough_rows, push_fluid_equality};
use crate::error::{ComponentError, ComponentResult};
use crate::params::{ActiveParams, ParamDef};
use crate::traits::{ComponentModel, EvalContext, GuessHint, Port, StreamState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Machine {
    Pump,
    Compressor,
    Turbine,
}

/// Adiabatic single-stream machine.
///
/// ## Model
///
/// Mandatory equations are the mass and fluid balances. Optional parameters:
///
/// ```text
/// P:          m · (h_out - h_in) = P
/// pr:         p_out = pr · p_in
/// eta_s:      compression  h_s - h_in = eta_s · (h_out - h_in)
///             expansion    h_out - h_in = eta_s · (h_s - h_in)
/// eta_s_char: eta_s = eta_s,design · f(load)
/// ```
///
/// `h_s` is the outlet-pressure enthalpy at inlet entropy. The load is the
/// volumetric-flow ratio for pumps and the mass-flow ratio otherwise.
///
/// ## Sign Conventions
///
/// `P` is positive when the fluid gains power (pumps, compressors) and
/// negative for turbines.
#[derive(Debug, Clone, Copy)]
pub struct Turbomachine {
    machine: Machine,
}

/// Enthalpy changes [J/kg] below this leave the efficiency undefined.
const DH_EPS: f64 = 1e-6;

const PARAMS: &[ParamDef] = &[
    ParamDef::equation("P"),
    ParamDef::equation("pr"),
    ParamDef::equation("eta_s"),
    ParamDef::curve("eta_s_char"),
];

impl Turbomachine {
    pub fn new(machine: Machine) -> Self {
        Self { machine }
    }

    pub fn pump() -> Self {
        Self::new(Machine::Pump)
    }

    pub fn compressor() -> Self {
        Self::new(Machine::Compressor)
    }

    pub fn turbine() -> Self {
        Self::new(Machine::Turbine)
    }

    pub fn machine(&self) -> Machine {
        self.machine
    }

    fn expands(&self) -> bool {
        self.machine == Machine::Turbine
    }

    fn isentropic_enthalpy(
        &self,
        ctx: &EvalContext<'_>,
        inlet: &StreamState,
        outlet: &StreamState,
    ) -> ComponentResult<f64> {
        let s_in = ctx.entropy(inlet)?;
        let mix = ctx.mixture(inlet)?;
        Ok(ctx.evaluator.h_ps(outlet.p, s_in, &mix)?)
    }

    fn eta_residual(
        &self,
        ctx: &EvalContext<'_>,
        inlet: &StreamState,
        outlet: &StreamState,
        eta: f64,
    ) -> ComponentResult<f64> {
        let dh = outlet.h - inlet.h;
        let dh_s = self.isentropic_enthalpy(ctx, inlet, outlet)? - inlet.h;
        Ok(if self.expands() {
            eta * dh_s - dh
        } else {
            dh_s - eta * dh
        })
    }

    /// Load measure for the efficiency characteristic.
    fn load(&self, ctx: &EvalContext<'_>, inlet: &StreamState) -> ComponentResult<f64> {
        match self.machine {
            Machine::Pump => ctx.load_ratio("v_dot", inlet.m * ctx.volume(inlet)?),
            _ => ctx.load_ratio("m", inlet.m),
        }
    }
}

impl ComponentModel for Turbomachine {
    fn kind(&self) -> &'static str {
        match self.machine {
            Machine::Pump => "pump",
            Machine::Compressor => "compressor",
            Machine::Turbine => "turbine",
        }
    }

    fn ports(&self) -> (usize, usize) {
        (1, 1)
    }

    fn param_defs(&self) -> &'static [ParamDef] {
        PARAMS
    }

    fn default_curve(&self, name: &str) -> Option<Characteristic> {
        if name != "eta_s_char" {
            return None;
        }
        let line = match self.machine {
            Machine::Pump => Characteristic::from_points(
                &[0.2, 0.5, 0.8, 1.0, 1.2, 1.5],
                &[0.70, 0.88, 0.98, 1.0, 0.98, 0.88],
            ),
            Machine::Compressor => Characteristic::from_points(
                &[0.4, 0.7, 0.9, 1.0, 1.1, 1.3],
                &[0.85, 0.95, 0.99, 1.0, 0.99, 0.95],
            ),
            Machine::Turbine => Characteristic::from_points(
                &[0.3, 0.6, 0.9, 1.0, 1.1, 1.3],
                &[0.86, 0.95, 0.995, 1.0, 0.995, 0.98],
            ),
        };
        line.ok()
    }

    fn structural_equation_count(&self, nf: usize) -> usize {
        nf + 1
    }

    fn structural_residuals(
        &self,
        _ctx: &EvalContext<'_>,
        ports: &[StreamState],
        _params: &ActiveParams,
        out: &mut Vec<f64>,
    ) -> ComponentResult<()> {
        out.push(ports[0].m - ports[1].m);
        push_fluid_equality(&ports[0], &ports[1], out);
        Ok(())
    }

    fn structural_jacobian(
        &self,
        nf: usize,
        _ports: &[StreamState],
        _params: &ActiveParams,
    ) -> Option<DMatrix<f64>> {
        let mut jac = DMatrix::zeros(nf + 1, 2 * StreamState::width(nf));
        passthrough_rows(&mut jac, 0, nf, 0, 1);
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
        match name {
            "P" => {
                if let Some(power) = params.value("P") {
                    return Ok(inlet.m * (outlet.h - inlet.h) - power);
                }
            }
            "pr" => {
                if let Some(pr) = params.value("pr") {
                    return Ok(outlet.p - pr * inlet.p);
                }
            }
            "eta_s" => {
                if let Some(eta) = params.value("eta_s") {
                    return self.eta_residual(ctx, inlet, outlet, eta);
                }
            }
            "eta_s_char" => {
                if let Some(curve) = params.curve("eta_s_char") {
                    let eta = ctx.design_value("eta_s")? * curve.eval(self.load(ctx, inlet)?);
                    return self.eta_residual(ctx, inlet, outlet, eta);
                }
            }
            _ => {}
        }
        Err(ComponentError::UnknownParameter {
            component: ctx.component.to_string(),
            name: name.to_string(),
        })
    }

    fn derived_names(&self) -> &'static [&'static str] {
        &["P", "pr", "eta_s", "m", "v_dot"]
    }

    fn derived_quantities(
        &self,
        ctx: &EvalContext<'_>,
        ports: &[StreamState],
        _params: &ActiveParams,
    ) -> ComponentResult<Vec<(&'static str, f64)>> {
        let (inlet, outlet) = (&ports[0], &ports[1]);
        let dh = outlet.h - inlet.h;
        let mut values = vec![
            ("P", inlet.m * dh),
            ("pr", outlet.p / inlet.p),
            ("m", inlet.m),
            ("v_dot", inlet.m * ctx.volume(inlet)?),
        ];
        let dh_s = self.isentropic_enthalpy(ctx, inlet, outlet)? - inlet.h;
        let eta = if self.expands() { dh / dh_s } else { dh_s / dh };
        if dh.abs() > DH_EPS && dh_s.abs() > DH_EPS {
            values.push(("eta_s", eta));
        }
        Ok(values)
    }

    fn default_bus_quantity(&self) -> Option<&'static str> {
        Some("P")
    }

    fn passthrough(&self) -> &'static [(usize, usize)] {
        &[(0, 0)]
    }

    fn initial_hint(&self, port: Port) -> Option<GuessHint> {
        match (port, self.machine) {
            (Port::Outlet(0), Machine::Pump) => Some(GuessHint::EnthalpyRise(1e3)),
            (Port::Outlet(0), Machine::Compressor) => Some(GuessHint::EnthalpyRise(1e5)),
            (Port::Outlet(0), Machine::Turbine) => Some(GuessHint::EnthalpyRise(-1e5)),
            _ => None,
        }
    }
}
