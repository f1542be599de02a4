//! Shared equation building blocks.

use std::f64::consts::PI;

use nalgebra::DMatrix;
use tn_core::numeric::ensure_finite;

use crate::error::{ComponentError, ComponentResult};
use crate::traits::{EvalContext, StreamState};

/// Small epsilon for mass flow rate (kg/s)
pub const EPSILON_MDOT: f64 = 1e-9;

/// Ensure a value is finite, returning ComponentError if not.
pub fn check_finite(value: f64, what: &'static str) -> ComponentResult<f64> {
    ensure_finite(value, what).map_err(|_| ComponentError::NonPhysical { what })
}

/// Push `x_a - x_b` for every fluid.
pub fn push_fluid_equality(a: &StreamState, b: &StreamState, out: &mut Vec<f64>) {
    out.extend(a.x.iter().zip(&b.x).map(|(xa, xb)| xa - xb));
}

/// Log-mean temperature difference of two terminal differences with equal sign.
pub fn lmtd(dt_a: f64, dt_b: f64) -> ComponentResult<f64> {
    if dt_a * dt_b <= 0.0 {
        return Err(ComponentError::NonPhysical {
            what: "terminal temperature differences cross zero",
        });
    }
    if ((dt_a - dt_b) / dt_a).abs() < 1e-9 {
        return Ok(0.5 * (dt_a + dt_b));
    }
    check_finite((dt_a - dt_b) / (dt_a / dt_b).ln(), "log-mean temperature difference")
}

/// Mean specific volume of two streams.
pub fn mean_volume(
    ctx: &EvalContext<'_>,
    inlet: &StreamState,
    outlet: &StreamState,
) -> ComponentResult<f64> {
    Ok(0.5 * (ctx.volume(inlet)? + ctx.volume(outlet)?))
}

/// Friction residual `ζ · 8 · m|m| · v̄ - Δp · π²`.
///
/// `zeta` is the loss coefficient divided by the fourth power of the
/// hydraulic diameter [1/m⁴].
pub fn zeta_residual(
    ctx: &EvalContext<'_>,
    inlet: &StreamState,
    outlet: &StreamState,
    zeta: f64,
) -> ComponentResult<f64> {
    let v = mean_volume(ctx, inlet, outlet)?;
    Ok(zeta * 8.0 * inlet.m * inlet.m.abs() * v - (inlet.p - outlet.p) * PI * PI)
}

/// Loss coefficient realized by two solved streams.
pub fn zeta_value(
    ctx: &EvalContext<'_>,
    inlet: &StreamState,
    outlet: &StreamState,
) -> ComponentResult<Option<f64>> {
    if inlet.m.abs() < EPSILON_MDOT {
        return Ok(None);
    }
    let v = mean_volume(ctx, inlet, outlet)?;
    Ok(Some(
        (inlet.p - outlet.p) * PI * PI / (8.0 * inlet.m * inlet.m.abs() * v),
    ))
}

/// Column index of variable `var` of port `port`.
pub fn column(nf: usize, port: usize, var: usize) -> usize {
    port * StreamState::width(nf) + var
}

/// Analytic rows for `m_in - m_out` and `x_in - x_out` over one passthrough pair.
pub fn passthrough_rows(
    jac: &mut DMatrix<f64>,
    row: usize,
    nf: usize,
    inlet: usize,
    outlet: usize,
) -> usize {
    jac[(row, column(nf, inlet, StreamState::M))] = 1.0;
    jac[(row, column(nf, outlet, StreamState::M))] = -1.0;
    for i in 0..nf {
        let var = StreamState::X0 + i;
        jac[(row + 1 + i, column(nf, inlet, var))] = 1.0;
        jac[(row + 1 + i, column(nf, outlet, var))] = -1.0;
    }
    row + 1 + nf
}

/// Root of an increasing function, bracketed outward from `[-scale, scale]`
/// and refined by regula falsi with the Illinois modification.
pub fn increasing_root(
    f: impl Fn(f64) -> f64,
    scale: f64,
    what: &'static str,
) -> ComponentResult<f64> {
    const MAX_ITER: usize = 100;
    let scale = scale.abs().max(1.0);
    let (mut a, mut b) = (-scale, scale);
    let (mut fa, mut fb) = (f(a), f(b));
    for _ in 0..MAX_ITER {
        if fa <= 0.0 && fb >= 0.0 {
            break;
        }
        let width = b - a;
        if fa > 0.0 {
            a -= width;
            fa = f(a);
        }
        if fb < 0.0 {
            b += width;
            fb = f(b);
        }
    }
    if !(fa <= 0.0 && fb >= 0.0) {
        return Err(ComponentError::NonPhysical { what });
    }

    let tol = 1e-13 * fa.abs().max(fb.abs());
    let mut side = 0i8;
    for _ in 0..MAX_ITER {
        let c = if fb > fa { (a * fb - b * fa) / (fb - fa) } else { 0.5 * (a + b) };
        let fc = f(c);
        if fc.abs() <= tol || (b - a).abs() <= 1e-14 * c.abs().max(1.0) {
            return Ok(c);
        }
        if fc < 0.0 {
            (a, fa) = (c, fc);
            if side == -1 {
                fb *= 0.5;
            }
            side = -1;
        } else {
            (b, fb) = (c, fc);
            if side == 1 {
                fa *= 0.5;
            }
            side = 1;
        }
    }
    Err(ComponentError::NonPhysical { what })
}
