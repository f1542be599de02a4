//! Core traits for component equation models.

use std::fmt;
use std::str::FromStr;

use nalgebra::DMatrix;
use tn_fluids::{FluidSet, Mixture, MixtureEvaluator};

use crate::characteristic::Characteristic;
use crate::error::{ComponentError, ComponentResult};
use crate::params::{ActiveParams, DesignPoint, Mode, ParamDef};

/// Primary variables of one stream, in solver order.
///
/// The flat layout is `[m, p, h, x_0, .., x_{nf-1}]`.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamState {
    /// Mass flow [kg/s]
    pub m: f64,
    /// Pressure [Pa]
    pub p: f64,
    /// Specific enthalpy [J/kg], relative to the evaluator's reference state
    pub h: f64,
    /// Mass fractions, indexed like the network fluid set
    pub x: Vec<f64>,
}

impl StreamState {
    pub const M: usize = 0;
    pub const P: usize = 1;
    pub const H: usize = 2;
    pub const X0: usize = 3;

    /// Number of primary variables per stream for `nf` fluids.
    pub fn width(nf: usize) -> usize {
        Self::X0 + nf
    }

    pub fn get(&self, var: usize) -> f64 {
        match var {
            Self::M => self.m,
            Self::P => self.p,
            Self::H => self.h,
            _ => self.x[var - Self::X0],
        }
    }

    pub fn set(&mut self, var: usize, value: f64) {
        match var {
            Self::M => self.m = value,
            Self::P => self.p = value,
            Self::H => self.h = value,
            _ => self.x[var - Self::X0] = value,
        }
    }
}

/// Component port: inlets and outlets are numbered from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Port {
    Inlet(usize),
    Outlet(usize),
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Port::Inlet(i) => write!(f, "in{}", i + 1),
            Port::Outlet(i) => write!(f, "out{}", i + 1),
        }
    }
}

impl FromStr for Port {
    type Err = ComponentError;

    /// Parses `in1`, `out2`, ... (one-based).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = ComponentError::InvalidArg {
            what: "port names look like 'in1' or 'out1'",
        };
        let (ctor, digits): (fn(usize) -> Port, &str) = if let Some(d) = s.strip_prefix("out") {
            (Port::Outlet, d)
        } else if let Some(d) = s.strip_prefix("in") {
            (Port::Inlet, d)
        } else {
            return Err(invalid);
        };
        match digits.parse::<usize>() {
            Ok(n) if n >= 1 => Ok(ctor(n - 1)),
            _ => Err(invalid),
        }
    }
}

/// Everything a component needs to evaluate its equations.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub component: &'a str,
    pub evaluator: &'a MixtureEvaluator,
    pub fluids: &'a FluidSet,
    pub mode: Mode,
    pub design: Option<&'a DesignPoint>,
}

impl<'a> EvalContext<'a> {
    pub fn mixture<'s>(&self, stream: &'s StreamState) -> ComponentResult<Mixture<'s>>
    where
        'a: 's,
    {
        Ok(Mixture::new(self.fluids, &stream.x)?)
    }

    /// Temperature [K] of a stream.
    pub fn temperature(&self, stream: &StreamState) -> ComponentResult<f64> {
        let mix = self.mixture(stream)?;
        Ok(self.evaluator.t_ph(stream.p, stream.h, &mix)?)
    }

    /// Saturation temperature [K] at the pressure of a single-species stream.
    pub fn saturation_temperature(&self, stream: &StreamState) -> ComponentResult<f64> {
        let mix = self.mixture(stream)?;
        let h = self.evaluator.h_saturated(stream.p, 1.0, &mix)?;
        Ok(self.evaluator.t_ph(stream.p, h, &mix)?)
    }

    /// Specific entropy [J/(kg·K)] of a stream.
    pub fn entropy(&self, stream: &StreamState) -> ComponentResult<f64> {
        let mix = self.mixture(stream)?;
        let t = self.evaluator.t_ph(stream.p, stream.h, &mix)?;
        Ok(self.evaluator.s_pt(stream.p, t, &mix)?)
    }

    /// Specific volume [m³/kg] of a stream.
    pub fn volume(&self, stream: &StreamState) -> ComponentResult<f64> {
        let mix = self.mixture(stream)?;
        let t = self.evaluator.t_ph(stream.p, stream.h, &mix)?;
        Ok(self.evaluator.v_pt(stream.p, t, &mix)?)
    }

    /// Value stored in the component's design point.
    pub fn design_value(&self, name: &str) -> ComponentResult<f64> {
        self.design
            .and_then(|point| point.get(name))
            .copied()
            .ok_or_else(|| ComponentError::MissingDesignValue {
                component: self.component.to_string(),
                name: name.to_string(),
            })
    }

    /// Ratio of `current` to its design value; one in design mode.
    pub fn load_ratio(&self, name: &str, current: f64) -> ComponentResult<f64> {
        match self.mode {
            Mode::Design => Ok(1.0),
            Mode::Offdesign => Ok(current / self.design_value(name)?),
        }
    }
}

/// Initial-guess hint for one port.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GuessHint {
    /// Temperature [K]
    Temperature(f64),
    /// Vapour quality on the saturation line of a pure stream
    Quality(f64),
    /// Enthalpy offset [J/kg] from the matching inlet
    EnthalpyRise(f64),
}

/// Mass flow and composition guess for an outlet.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowGuess {
    pub m: f64,
    pub x: Vec<f64>,
}

/// Equation model of one component kind.
///
/// Ports are passed as one slice: inlets first, then outlets. Parameter
/// equations are evaluated through [`param_residual`](Self::param_residual),
/// once per active equation parameter.
pub trait ComponentModel: Send + Sync + fmt::Debug {
    /// Kind name, e.g. `"valve"`.
    fn kind(&self) -> &'static str;

    /// Number of (inlets, outlets).
    fn ports(&self) -> (usize, usize);

    fn param_defs(&self) -> &'static [ParamDef] {
        &[]
    }

    /// Built-in characteristic for a curve parameter left unspecified off-design.
    fn default_curve(&self, _name: &str) -> Option<Characteristic> {
        None
    }

    /// Check that the network fluid set supports this component.
    fn check_fluids(&self, _fluids: &FluidSet) -> ComponentResult<()> {
        Ok(())
    }

    /// Number of mandatory equations for `nf` fluids.
    fn structural_equation_count(&self, nf: usize) -> usize;

    /// Append the mandatory residuals to `out`.
    fn structural_residuals(
        &self,
        ctx: &EvalContext<'_>,
        ports: &[StreamState],
        params: &ActiveParams,
        out: &mut Vec<f64>,
    ) -> ComponentResult<()>;

    /// Analytic derivatives of the mandatory residuals, if the kind has them.
    ///
    /// Rows follow [`structural_residuals`](Self::structural_residuals);
    /// columns are the flattened port variables.
    fn structural_jacobian(
        &self,
        _nf: usize,
        _ports: &[StreamState],
        _params: &ActiveParams,
    ) -> Option<DMatrix<f64>> {
        None
    }

    /// Residual of the equation contributed by parameter `name`.
    fn param_residual(
        &self,
        name: &str,
        _ctx: &EvalContext<'_>,
        _ports: &[StreamState],
        _params: &ActiveParams,
    ) -> ComponentResult<f64> {
        Err(ComponentError::UnknownParameter {
            component: self.kind().to_string(),
            name: name.to_string(),
        })
    }

    /// Names of the quantities [`derived_quantities`](Self::derived_quantities) reports.
    fn derived_names(&self) -> &'static [&'static str] {
        &[]
    }

    /// Quantities computed from solved streams.
    fn derived_quantities(
        &self,
        _ctx: &EvalContext<'_>,
        _ports: &[StreamState],
        _params: &ActiveParams,
    ) -> ComponentResult<Vec<(&'static str, f64)>> {
        Ok(Vec::new())
    }

    /// Quantity a bus reads when none is named.
    fn default_bus_quantity(&self) -> Option<&'static str> {
        None
    }

    /// (inlet, outlet) pairs that share mass flow and composition.
    fn passthrough(&self) -> &'static [(usize, usize)] {
        &[]
    }

    /// Outlet flow guess from inlet guesses, for outlets not covered by
    /// [`passthrough`](Self::passthrough).
    fn outlet_guess(
        &self,
        _fluids: &FluidSet,
        _inlets: &[Option<FlowGuess>],
        _outlet: usize,
    ) -> Option<FlowGuess> {
        None
    }

    fn initial_hint(&self, _port: Port) -> Option<GuessHint> {
        None
    }
}
