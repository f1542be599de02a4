//! Heat exchangers: one-sided (heat to or from the surroundings),
//! counter-current two-stream, and condensers.

use nalgebra::DMatrix;

use crate::characteristic::Characteristic;
use crate::common::{
    column, lmtd, passthrough_rows, push_fluid_equality, zeta_residual, zeta_value,
};
use crate::error::{ComponentError, ComponentResult};
use crate::params::{ActiveParams, ParamDef};
use crate::traits::{ComponentModel, EvalContext, GuessHint, Port, StreamState};

/// Built-in kA characteristic over the mass-flow ratio, `f ≈ (m/m_design)^0.8`.
fn default_ka_char() -> Option<Characteristic> {
    Characteristic::from_points(
        &[0.0, 0.25, 0.5, 0.75, 1.0, 1.25, 1.5, 2.0],
        &[0.0, 0.330, 0.574, 0.794, 1.0, 1.195, 1.383, 1.741],
    )
    .ok()
}

fn unknown(ctx: &EvalContext<'_>, name: &str) -> ComponentError {
    ComponentError::UnknownParameter {
        component: ctx.component.to_string(),
        name: name.to_string(),
    }
}

/// Single stream exchanging heat with its surroundings.
///
/// `Q = m · (h_out - h_in)` is positive when the stream is heated. With an
/// ambient temperature `Tamb`, the heat transfer coefficient relates duty to
/// the log-mean difference against ambient: `Q + kA · LMTD = 0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeatExchangerSimple;

const SIMPLE_PARAMS: &[ParamDef] = &[
    ParamDef::equation("Q"),
    ParamDef::equation("pr"),
    ParamDef::equation("zeta"),
    ParamDef::equation("kA"),
    ParamDef::curve("kA_char"),
    ParamDef::input("Tamb"),
];

impl HeatExchangerSimple {
    fn ambient_lmtd(
        ctx: &EvalContext<'_>,
        ports: &[StreamState],
        params: &ActiveParams,
    ) -> ComponentResult<f64> {
        let t_amb = params.value("Tamb").ok_or_else(|| ComponentError::Setup {
            what: format!("{}: kA needs the ambient temperature Tamb", ctx.component),
        })?;
        let t_in = ctx.temperature(&ports[0])?;
        let t_out = ctx.temperature(&ports[1])?;
        lmtd(t_in - t_amb, t_out - t_amb)
    }
}

impl ComponentModel for HeatExchangerSimple {
    fn kind(&self) -> &'static str {
        "heat exchanger simple"
    }

    fn ports(&self) -> (usize, usize) {
        (1, 1)
    }

    fn param_defs(&self) -> &'static [ParamDef] {
        SIMPLE_PARAMS
    }

    fn default_curve(&self, name: &str) -> Option<Characteristic> {
        (name == "kA_char").then(default_ka_char).flatten()
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
        let duty = inlet.m * (outlet.h - inlet.h);
        match name {
            "Q" => params.value("Q").map(|q| duty - q).ok_or_else(|| unknown(ctx, name)),
            "pr" => params
                .value("pr")
                .map(|pr| outlet.p - pr * inlet.p)
                .ok_or_else(|| unknown(ctx, name)),
            "zeta" => match params.value("zeta") {
                Some(zeta) => zeta_residual(ctx, inlet, outlet, zeta),
                None => Err(unknown(ctx, name)),
            },
            "kA" => match params.value("kA") {
                Some(ka) => Ok(duty + ka * Self::ambient_lmtd(ctx, ports, params)?),
                None => Err(unknown(ctx, name)),
            },
            "kA_char" => match params.curve("kA_char") {
                Some(curve) => {
                    let ratio = ctx.load_ratio("m", inlet.m)?;
                    let ka = ctx.design_value("kA")? * curve.eval(ratio);
                    Ok(duty + ka * Self::ambient_lmtd(ctx, ports, params)?)
                }
                None => Err(unknown(ctx, name)),
            },
            _ => Err(unknown(ctx, name)),
        }
    }

    fn derived_names(&self) -> &'static [&'static str] {
        &["Q", "pr", "zeta", "kA", "m"]
    }

    fn derived_quantities(
        &self,
        ctx: &EvalContext<'_>,
        ports: &[StreamState],
        params: &ActiveParams,
    ) -> ComponentResult<Vec<(&'static str, f64)>> {
        let (inlet, outlet) = (&ports[0], &ports[1]);
        let duty = inlet.m * (outlet.h - inlet.h);
        let mut values = vec![("Q", duty), ("pr", outlet.p / inlet.p), ("m", inlet.m)];
        if let Some(zeta) = zeta_value(ctx, inlet, outlet)? {
            values.push(("zeta", zeta));
        }
        if params.value("Tamb").is_some()
            && let Ok(dt) = Self::ambient_lmtd(ctx, ports, params)
        {
            values.push(("kA", -duty / dt));
        }
        Ok(values)
    }

    fn default_bus_quantity(&self) -> Option<&'static str> {
        Some("Q")
    }

    fn passthrough(&self) -> &'static [(usize, usize)] {
        &[(0, 0)]
    }
}

/// Counter-current heat exchanger.
///
/// Side 1 (`in1` → `out1`) is the hot side, side 2 (`in2` → `out2`) the cold
/// side. `Q = m1 · (h_out1 - h_in1)` is negative in normal operation.
/// Terminal differences are `ttd_u = T_in1 - T_out2` and
/// `ttd_l = T_out1 - T_in2`.
///
/// Off-design, `kA_char` scales the design kA with
/// `fkA = 2 / (1/f1(m1/m1_design) + 1/f2(m2/m2_design))`, where `f1` is
/// `kA_char` and `f2` is `kA_char2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeatExchanger;

const HX_PARAMS: &[ParamDef] = &[
    ParamDef::equation("Q"),
    ParamDef::equation("kA"),
    ParamDef::curve("kA_char"),
    ParamDef::curve_input("kA_char2"),
    ParamDef::equation("ttd_u"),
    ParamDef::equation("ttd_l"),
    ParamDef::equation("pr1"),
    ParamDef::equation("pr2"),
    ParamDef::equation("zeta1"),
    ParamDef::equation("zeta2"),
];

const IN1: usize = 0;
const IN2: usize = 1;
const OUT1: usize = 2;
const OUT2: usize = 3;

struct Terminals {
    upper: f64,
    lower: f64,
}

impl HeatExchanger {
    fn terminals(ctx: &EvalContext<'_>, ports: &[StreamState]) -> ComponentResult<Terminals> {
        Ok(Terminals {
            upper: ctx.temperature(&ports[IN1])? - ctx.temperature(&ports[OUT2])?,
            lower: ctx.temperature(&ports[OUT1])? - ctx.temperature(&ports[IN2])?,
        })
    }

    fn duty(ports: &[StreamState]) -> f64 {
        ports[IN1].m * (ports[OUT1].h - ports[IN1].h)
    }

    /// Mass, fluid and energy balances shared by both two-stream exchangers.
    fn push_balances(ports: &[StreamState], out: &mut Vec<f64>) {
        out.push(ports[IN1].m - ports[OUT1].m);
        push_fluid_equality(&ports[IN1], &ports[OUT1], out);
        out.push(ports[IN2].m - ports[OUT2].m);
        push_fluid_equality(&ports[IN2], &ports[OUT2], out);
        out.push(
            ports[IN1].m * (ports[OUT1].h - ports[IN1].h)
                + ports[IN2].m * (ports[OUT2].h - ports[IN2].h),
        );
    }

    /// Parameter rows, with the terminal differences supplied by the caller.
    fn residual(
        name: &str,
        ctx: &EvalContext<'_>,
        ports: &[StreamState],
        params: &ActiveParams,
        terminals: impl Fn() -> ComponentResult<Terminals>,
    ) -> ComponentResult<f64> {
        let ka_residual = |ka: f64| -> ComponentResult<f64> {
            let t = terminals()?;
            Ok(Self::duty(ports) + ka * lmtd(t.upper, t.lower)?)
        };
        match (name, params.value(name)) {
            ("Q", Some(q)) => Ok(Self::duty(ports) - q),
            ("kA", Some(ka)) => ka_residual(ka),
            ("kA_char", _) => {
                let (Some(f1), Some(f2)) = (params.curve("kA_char"), params.curve("kA_char2"))
                else {
                    return Err(unknown(ctx, name));
                };
                let f1 = f1.eval(ctx.load_ratio("m1", ports[IN1].m)?);
                let f2 = f2.eval(ctx.load_ratio("m2", ports[IN2].m)?);
                let fka = 2.0 / (1.0 / f1 + 1.0 / f2);
                ka_residual(ctx.design_value("kA")? * fka)
            }
            ("ttd_u", Some(ttd)) => Ok(terminals()?.upper - ttd),
            ("ttd_l", Some(ttd)) => Ok(terminals()?.lower - ttd),
            ("pr1", Some(pr)) => Ok(ports[OUT1].p - pr * ports[IN1].p),
            ("pr2", Some(pr)) => Ok(ports[OUT2].p - pr * ports[IN2].p),
            ("zeta1", Some(zeta)) => zeta_residual(ctx, &ports[IN1], &ports[OUT1], zeta),
            ("zeta2", Some(zeta)) => zeta_residual(ctx, &ports[IN2], &ports[OUT2], zeta),
            _ => Err(unknown(ctx, name)),
        }
    }

    fn derived(
        ctx: &EvalContext<'_>,
        ports: &[StreamState],
        t: Terminals,
    ) -> ComponentResult<Vec<(&'static str, f64)>> {
        let duty = Self::duty(ports);
        let mut values = vec![
            ("Q", duty),
            ("ttd_u", t.upper),
            ("ttd_l", t.lower),
            ("pr1", ports[OUT1].p / ports[IN1].p),
            ("pr2", ports[OUT2].p / ports[IN2].p),
            ("m1", ports[IN1].m),
            ("m2", ports[IN2].m),
        ];
        if let Ok(dt) = lmtd(t.upper, t.lower) {
            values.push(("kA", -duty / dt));
        }
        if let Some(zeta) = zeta_value(ctx, &ports[IN1], &ports[OUT1])? {
            values.push(("zeta1", zeta));
        }
        if let Some(zeta) = zeta_value(ctx, &ports[IN2], &ports[OUT2])? {
            values.push(("zeta2", zeta));
        }
        Ok(values)
    }
}

impl ComponentModel for HeatExchanger {
    fn kind(&self) -> &'static str {
        "heat exchanger"
    }

    fn ports(&self) -> (usize, usize) {
        (2, 2)
    }

    fn param_defs(&self) -> &'static [ParamDef] {
        HX_PARAMS
    }

    fn default_curve(&self, name: &str) -> Option<Characteristic> {
        matches!(name, "kA_char" | "kA_char2")
            .then(default_ka_char)
            .flatten()
    }

    fn structural_equation_count(&self, nf: usize) -> usize {
        2 * nf + 3
    }

    fn structural_residuals(
        &self,
        _ctx: &EvalContext<'_>,
        ports: &[StreamState],
        _params: &ActiveParams,
        out: &mut Vec<f64>,
    ) -> ComponentResult<()> {
        Self::push_balances(ports, out);
        Ok(())
    }

    fn structural_jacobian(
        &self,
        nf: usize,
        ports: &[StreamState],
        _params: &ActiveParams,
    ) -> Option<DMatrix<f64>> {
        let mut jac = DMatrix::zeros(2 * nf + 3, 4 * StreamState::width(nf));
        let row = passthrough_rows(&mut jac, 0, nf, IN1, OUT1);
        let row = passthrough_rows(&mut jac, row, nf, IN2, OUT2);
        for (inlet, outlet) in [(IN1, OUT1), (IN2, OUT2)] {
            let m = ports[inlet].m;
            jac[(row, column(nf, inlet, StreamState::M))] = ports[outlet].h - ports[inlet].h;
            jac[(row, column(nf, inlet, StreamState::H))] = -m;
            jac[(row, column(nf, outlet, StreamState::H))] = m;
        }
        Some(jac)
    }

    fn param_residual(
        &self,
        name: &str,
        ctx: &EvalContext<'_>,
        ports: &[StreamState],
        params: &ActiveParams,
    ) -> ComponentResult<f64> {
        Self::residual(name, ctx, ports, params, || Self::terminals(ctx, ports))
    }

    fn derived_names(&self) -> &'static [&'static str] {
        &[
            "Q", "kA", "ttd_u", "ttd_l", "pr1", "pr2", "zeta1", "zeta2", "m1", "m2",
        ]
    }

    fn derived_quantities(
        &self,
        ctx: &EvalContext<'_>,
        ports: &[StreamState],
        _params: &ActiveParams,
    ) -> ComponentResult<Vec<(&'static str, f64)>> {
        Self::derived(ctx, ports, Self::terminals(ctx, ports)?)
    }

    fn default_bus_quantity(&self) -> Option<&'static str> {
        Some("Q")
    }

    fn passthrough(&self) -> &'static [(usize, usize)] {
        &[(0, 0), (1, 1)]
    }
}

/// Condenser: a [`HeatExchanger`] whose hot side leaves as saturated liquid.
///
/// The upper terminal difference is taken against the saturation temperature
/// at the hot inlet pressure, `ttd_u = T_sat(p_in1) - T_out2`, and the same
/// saturation temperature enters the log-mean difference behind kA. The hot
/// side must be a single species.
#[derive(Debug, Clone, Copy, Default)]
pub struct Condenser;

impl Condenser {
    fn terminals(ctx: &EvalContext<'_>, ports: &[StreamState]) -> ComponentResult<Terminals> {
        Ok(Terminals {
            upper: ctx.saturation_temperature(&ports[IN1])? - ctx.temperature(&ports[OUT2])?,
            lower: ctx.temperature(&ports[OUT1])? - ctx.temperature(&ports[IN2])?,
        })
    }
}

impl ComponentModel for Condenser {
    fn kind(&self) -> &'static str {
        "condenser"
    }

    fn ports(&self) -> (usize, usize) {
        (2, 2)
    }

    fn param_defs(&self) -> &'static [ParamDef] {
        HX_PARAMS
    }

    fn default_curve(&self, name: &str) -> Option<Characteristic> {
        HeatExchanger.default_curve(name)
    }

    fn structural_equation_count(&self, nf: usize) -> usize {
        2 * nf + 4
    }

    fn structural_residuals(
        &self,
        ctx: &EvalContext<'_>,
        ports: &[StreamState],
        _params: &ActiveParams,
        out: &mut Vec<f64>,
    ) -> ComponentResult<()> {
        HeatExchanger::push_balances(ports, out);
        let condensate = &ports[OUT1];
        let saturated = ctx
            .evaluator
            .h_saturated(condensate.p, 0.0, &ctx.mixture(condensate)?)?;
        out.push(condensate.h - saturated);
        Ok(())
    }

    fn param_residual(
        &self,
        name: &str,
        ctx: &EvalContext<'_>,
        ports: &[StreamState],
        params: &ActiveParams,
    ) -> ComponentResult<f64> {
        HeatExchanger::residual(name, ctx, ports, params, || Self::terminals(ctx, ports))
    }

    fn derived_names(&self) -> &'static [&'static str] {
        HeatExchanger.derived_names()
    }

    fn derived_quantities(
        &self,
        ctx: &EvalContext<'_>,
        ports: &[StreamState],
        _params: &ActiveParams,
    ) -> ComponentResult<Vec<(&'static str, f64)>> {
        HeatExchanger::derived(ctx, ports, Self::terminals(ctx, ports)?)
    }

    fn default_bus_quantity(&self) -> Option<&'static str> {
        Some("Q")
    }

    fn passthrough(&self) -> &'static [(usize, usize)] {
        &[(0, 0), (1, 1)]
    }

    fn initial_hint(&self, port: Port) -> Option<GuessHint> {
        match port {
            Port::Outlet(0) => Some(GuessHint::Quality(0.0)),
            _ => None,
        }
    }
}
