//! Combustion engine with two cooling loops.

use tn_fluids::FluidSet;

use crate::characteristic::Characteristic;
use crate::combustion::{Chemistry, Reaction, push_reaction_balance, sensible_flow};
use crate::common::{increasing_root, push_fluid_equality, zeta_residual, zeta_value};
use crate::error::{ComponentError, ComponentResult};
use crate::params::{ActiveParams, Mode, ParamDef};
use crate::traits::{ComponentModel, EvalContext, FlowGuess, GuessHint, Port, StreamState};

/// Reciprocating engine burning fuel (`in4`) with air (`in3`) into flue gas
/// (`out3`) while heating two cooling water loops `in1 -> out1` and
/// `in2 -> out2`.
///
/// Power output follows from the thermal input through the characteristic
/// `tiP_char`: `TI = P · tiP(P / P_design)`. The cooling loops pick up
/// `Q1 = P · Q1_char(load)` and `Q2 = P · Q2_char(load)`, and
/// `P · Qloss_char(load)` is lost to the surroundings. The flue gas carries the
/// rest. In design mode the load ratio is one.
///
/// The default characteristics keep `TI`, `Q1`, `Q2`, `Q` and the total loss
/// `TI - Q - P` rising with the power, so a bus on any of them has one
/// operating point.
#[derive(Debug, Clone, Copy, Default)]
pub struct CombustionEngine;

const IN1: usize = 0;
const IN2: usize = 1;
const IN3: usize = 2;
const IN4: usize = 3;
const OUT1: usize = 4;
const OUT2: usize = 5;
const OUT3: usize = 6;

const LOAD_POINTS: [f64; 5] = [0.50, 0.75, 0.90, 1.00, 1.05];

const PARAMS: &[ParamDef] = &[
    ParamDef::equation("P"),
    ParamDef::equation("ti"),
    ParamDef::equation("Q1"),
    ParamDef::equation("Q2"),
    ParamDef::equation("Q"),
    ParamDef::equation("Qloss"),
    ParamDef::equation("pr1"),
    ParamDef::equation("pr2"),
    ParamDef::equation("zeta1"),
    ParamDef::equation("zeta2"),
    ParamDef::equation("lamb"),
    ParamDef::curve_input("tiP_char"),
    ParamDef::curve_input("Q1_char"),
    ParamDef::curve_input("Q2_char"),
    ParamDef::curve_input("Qloss_char"),
];

/// Operating point derived from the current port states.
struct Operation {
    reaction: Reaction,
    power: f64,
    load: f64,
    q1: f64,
    q2: f64,
}

impl Operation {
    fn heat_loss(&self) -> f64 {
        self.reaction.ti - self.q1 - self.q2 - self.power
    }
}

fn curve<'p>(
    ctx: &EvalContext<'_>,
    params: &'p ActiveParams,
    name: &str,
) -> ComponentResult<&'p Characteristic> {
    params.curve(name).ok_or_else(|| ComponentError::Setup {
        what: format!("{}: no characteristic for '{name}'", ctx.component),
    })
}

impl CombustionEngine {
    fn operate(
        ctx: &EvalContext<'_>,
        ports: &[StreamState],
        params: &ActiveParams,
    ) -> ComponentResult<Operation> {
        let chemistry = Chemistry::new(ctx.component, ctx.fluids)?;
        let reaction = chemistry.react([
            (ports[IN3].m, ports[IN3].x.as_slice()),
            (ports[IN4].m, ports[IN4].x.as_slice()),
        ]);

        let ti_p = curve(ctx, params, "tiP_char")?;
        let ti = reaction.ti;
        let (power, load) = match ctx.mode {
            Mode::Design => (ti / ti_p.eval(1.0), 1.0),
            Mode::Offdesign => {
                let design_power = ctx.design_value("P")?;
                let power = match ti_p.invert_product(ti / design_power) {
                    Some(load) if design_power > 0.0 => load * design_power,
                    _ => increasing_root(
                        |p| p * ti_p.eval(p / design_power) - ti,
                        ti / ti_p.eval(1.0),
                        "engine power from thermal input",
                    )?,
                };
                (power, power / design_power)
            }
        };

        Ok(Operation {
            reaction,
            power,
            load,
            q1: ports[IN1].m * (ports[OUT1].h - ports[IN1].h),
            q2: ports[IN2].m * (ports[OUT2].h - ports[IN2].h),
        })
    }
}

impl ComponentModel for CombustionEngine {
    fn kind(&self) -> &'static str {
        "combustion engine"
    }

    fn ports(&self) -> (usize, usize) {
        (4, 3)
    }

    fn param_defs(&self) -> &'static [ParamDef] {
        PARAMS
    }

    fn default_curve(&self, name: &str) -> Option<Characteristic> {
        let y: [f64; 5] = match name {
            "tiP_char" => [2.60, 2.45, 2.37, 2.33, 2.32],
            "Q1_char" | "Q2_char" => [0.58, 0.55, 0.53, 0.52, 0.52],
            "Qloss_char" => [0.14, 0.12, 0.11, 0.10, 0.10],
            _ => return None,
        };
        Characteristic::from_points(&LOAD_POINTS, &y).ok()
    }

    fn check_fluids(&self, fluids: &FluidSet) -> ComponentResult<()> {
        Chemistry::new(self.kind(), fluids).map(|_| ())
    }

    fn structural_equation_count(&self, nf: usize) -> usize {
        3 * nf + 8
    }

    fn structural_residuals(
        &self,
        ctx: &EvalContext<'_>,
        ports: &[StreamState],
        params: &ActiveParams,
        out: &mut Vec<f64>,
    ) -> ComponentResult<()> {
        let (air, fuel, flue) = (&ports[IN3], &ports[IN4], &ports[OUT3]);
        let op = Self::operate(ctx, ports, params)?;

        out.push(ports[IN1].m - ports[OUT1].m);
        out.push(ports[IN2].m - ports[OUT2].m);
        out.push(air.m + fuel.m - flue.m);
        push_fluid_equality(&ports[IN1], &ports[OUT1], out);
        push_fluid_equality(&ports[IN2], &ports[OUT2], out);
        push_reaction_balance(&[air, fuel], flue, &op.reaction, out);

        out.push(air.p - flue.p);
        out.push(fuel.p - flue.p);

        let radiated = op.power * curve(ctx, params, "Qloss_char")?.eval(op.load);
        out.push(
            sensible_flow(ctx, air)? + sensible_flow(ctx, fuel)? - sensible_flow(ctx, flue)?
                + op.reaction.heat_release()
                - op.power
                - op.q1
                - op.q2
                - radiated,
        );
        out.push(op.q1 - op.power * curve(ctx, params, "Q1_char")?.eval(op.load));
        out.push(op.q2 - op.power * curve(ctx, params, "Q2_char")?.eval(op.load));
        Ok(())
    }

    fn param_residual(
        &self,
        name: &str,
        ctx: &EvalContext<'_>,
        ports: &[StreamState],
        params: &ActiveParams,
    ) -> ComponentResult<f64> {
        let unknown = || ComponentError::UnknownParameter {
            component: ctx.component.to_string(),
            name: name.to_string(),
        };
        let value = params.value(name).ok_or_else(unknown)?;
        match name {
            "pr1" => return Ok(ports[OUT1].p - value * ports[IN1].p),
            "pr2" => return Ok(ports[OUT2].p - value * ports[IN2].p),
            "zeta1" => return zeta_residual(ctx, &ports[IN1], &ports[OUT1], value),
            "zeta2" => return zeta_residual(ctx, &ports[IN2], &ports[OUT2], value),
            _ => {}
        }

        let op = Self::operate(ctx, ports, params)?;
        match name {
            "P" => Ok(op.power - value),
            "ti" => Ok(op.reaction.ti - value),
            "Q1" => Ok(op.q1 - value),
            "Q2" => Ok(op.q2 - value),
            "Q" => Ok(op.q1 + op.q2 - value),
            "Qloss" => Ok(op.heat_loss() - value),
            "lamb" => Ok(op.reaction.n_o2 - value * op.reaction.n_stoich),
            _ => Err(unknown()),
        }
    }

    fn derived_names(&self) -> &'static [&'static str] {
        &[
            "TI", "P", "Q1", "Q2", "Q", "Qloss", "lamb", "pr1", "pr2", "zeta1", "zeta2",
        ]
    }

    fn derived_quantities(
        &self,
        ctx: &EvalContext<'_>,
        ports: &[StreamState],
        params: &ActiveParams,
    ) -> ComponentResult<Vec<(&'static str, f64)>> {
        let op = Self::operate(ctx, ports, params)?;
        let mut values = vec![
            ("TI", op.reaction.ti),
            ("P", op.power),
            ("Q1", op.q1),
            ("Q2", op.q2),
            ("Q", op.q1 + op.q2),
            ("Qloss", op.heat_loss()),
            ("lamb", op.reaction.lambda()),
            ("pr1", ports[OUT1].p / ports[IN1].p),
            ("pr2", ports[OUT2].p / ports[IN2].p),
        ];
        if let Some(zeta) = zeta_value(ctx, &ports[IN1], &ports[OUT1])? {
            values.push(("zeta1", zeta));
        }
        if let Some(zeta) = zeta_value(ctx, &ports[IN2], &ports[OUT2])? {
            values.push(("zeta2", zeta));
        }
        Ok(values)
    }

    fn default_bus_quantity(&self) -> Option<&'static str> {
        Some("P")
    }

    fn passthrough(&self) -> &'static [(usize, usize)] {
        &[(0, 0), (1, 1)]
    }

    fn outlet_guess(
        &self,
        fluids: &FluidSet,
        inlets: &[Option<FlowGuess>],
        outlet: usize,
    ) -> Option<FlowGuess> {
        // only the flue gas outlet mixes streams
        if outlet != OUT3 - OUT1 || inlets.len() < 4 {
            return None;
        }
        Chemistry::new(self.kind(), fluids)
            .ok()?
            .outlet_guess(&inlets[IN3..=IN4])
    }

    fn initial_hint(&self, port: Port) -> Option<GuessHint> {
        match port {
            Port::Outlet(0) | Port::Outlet(1) => Some(GuessHint::EnthalpyRise(1e4)),
            Port::Outlet(2) => Some(GuessHint::Temperature(700.0)),
            _ => None,
        }
    }
}
