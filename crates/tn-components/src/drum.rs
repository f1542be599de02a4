//! Steam drum: phase separator between an evaporator loop and its feed.

use tn_fluids::FluidSet;

use crate::common::push_fluid_equality;
use crate::error::ComponentResult;
use crate::params::ActiveParams;
use crate::traits::{ComponentModel, EvalContext, FlowGuess, GuessHint, Port, StreamState};

/// Drum with feed `in1`, evaporator return `in2`, saturated liquid `out1`
/// and saturated vapour `out2`.
///
/// All ports share one pressure. Both outlets carry the feed composition and
/// must be single-species streams so their saturation states exist.
#[derive(Debug, Clone, Copy, Default)]
pub struct Drum;

const IN1: usize = 0;
const IN2: usize = 1;
const OUT1: usize = 2;
const OUT2: usize = 3;

impl ComponentModel for Drum {
    fn kind(&self) -> &'static str {
        "drum"
    }

    fn ports(&self) -> (usize, usize) {
        (2, 2)
    }

    fn structural_equation_count(&self, nf: usize) -> usize {
        2 * nf + 7
    }

    fn structural_residuals(
        &self,
        ctx: &EvalContext<'_>,
        ports: &[StreamState],
        _params: &ActiveParams,
        out: &mut Vec<f64>,
    ) -> ComponentResult<()> {
        let (in1, in2, out1, out2) = (&ports[IN1], &ports[IN2], &ports[OUT1], &ports[OUT2]);

        out.push(in1.m + in2.m - out1.m - out2.m);
        push_fluid_equality(in1, out1, out);
        push_fluid_equality(in1, out2, out);

        out.push(in1.p - in2.p);
        out.push(in1.p - out1.p);
        out.push(in1.p - out2.p);

        out.push(in1.m * in1.h + in2.m * in2.h - out1.m * out1.h - out2.m * out2.h);

        let liquid = ctx
            .evaluator
            .h_saturated(out1.p, 0.0, &ctx.mixture(out1)?)?;
        let vapour = ctx
            .evaluator
            .h_saturated(out2.p, 1.0, &ctx.mixture(out2)?)?;
        out.push(out1.h - liquid);
        out.push(out2.h - vapour);
        Ok(())
    }

    fn derived_names(&self) -> &'static [&'static str] {
        &["p", "T"]
    }

    fn derived_quantities(
        &self,
        ctx: &EvalContext<'_>,
        ports: &[StreamState],
        _params: &ActiveParams,
    ) -> ComponentResult<Vec<(&'static str, f64)>> {
        Ok(vec![
            ("p", ports[IN1].p),
            ("T", ctx.temperature(&ports[OUT1])?),
        ])
    }

    fn outlet_guess(
        &self,
        _fluids: &FluidSet,
        inlets: &[Option<FlowGuess>],
        _outlet: usize,
    ) -> Option<FlowGuess> {
        let feed = inlets.first()?.as_ref()?;
        Some(FlowGuess {
            m: feed.m,
            x: feed.x.clone(),
        })
    }

    fn initial_hint(&self, port: Port) -> Option<GuessHint> {
        match port {
            Port::Inlet(1) => Some(GuessHint::Quality(0.5)),
            Port::Outlet(0) => Some(GuessHint::Quality(0.0)),
            Port::Outlet(1) => Some(GuessHint::Quality(1.0)),
            _ => None,
        }
    }
}
