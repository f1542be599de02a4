//! A named component instance: model, parameter table and mode lists.

use std::collections::BTreeMap;

use nalgebra::DMatrix;
use tn_fluids::FluidSet;

use crate::error::{ComponentError, ComponentResult};
use crate::params::{self, ActiveParams, DesignPoint, Mode, ParamDef, ParamSpec};
use crate::traits::{ComponentModel, EvalContext, StreamState};

/// Finite-difference scale floor per variable class (m, p, h, x).
const FD_SCALE: [f64; 4] = [1.0, 1e5, 1e5, 1.0];

#[derive(Debug)]
pub struct Component {
    name: String,
    model: Box<dyn ComponentModel>,
    specs: BTreeMap<&'static str, ParamSpec>,
    design: Vec<&'static str>,
    offdesign: Vec<&'static str>,
}

impl Component {
    pub fn new(name: impl Into<String>, model: impl ComponentModel + 'static) -> Self {
        Self {
            name: name.into(),
            model: Box::new(model),
            specs: BTreeMap::new(),
            design: Vec::new(),
            offdesign: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &'static str {
        self.model.kind()
    }

    pub fn model(&self) -> &dyn ComponentModel {
        self.model.as_ref()
    }

    pub fn ports(&self) -> (usize, usize) {
        self.model.ports()
    }

    fn def(&self, name: &str) -> ComponentResult<&'static ParamDef> {
        self.model
            .param_defs()
            .iter()
            .find(|def| def.name == name)
            .ok_or_else(|| ComponentError::UnknownParameter {
                component: self.name.clone(),
                name: name.to_string(),
            })
    }

    /// Set or unset (`ParamSpec::Unspecified`, `None`) a parameter.
    pub fn set(&mut self, name: &str, spec: impl Into<ParamSpec>) -> ComponentResult<()> {
        let def = self.def(name)?;
        let spec = spec.into();
        if let ParamSpec::Fixed(value) = spec
            && !value.is_finite()
        {
            return Err(ComponentError::NonPhysical {
                what: "parameter value must be finite",
            });
        }
        if spec.is_set() {
            self.specs.insert(def.name, spec);
        } else {
            self.specs.remove(def.name);
        }
        Ok(())
    }

    pub fn with(mut self, name: &str, spec: impl Into<ParamSpec>) -> ComponentResult<Self> {
        self.set(name, spec)?;
        Ok(self)
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.specs.get(name)
    }

    /// Parameters dropped when solving off-design.
    pub fn set_design(&mut self, names: &[&str]) -> ComponentResult<()> {
        self.design = self.lookup_all(names)?;
        Ok(())
    }

    /// Parameters activated from the design point when solving off-design.
    pub fn set_offdesign(&mut self, names: &[&str]) -> ComponentResult<()> {
        self.offdesign = self.lookup_all(names)?;
        Ok(())
    }

    pub fn design_list(&self) -> &[&'static str] {
        &self.design
    }

    pub fn offdesign_list(&self) -> &[&'static str] {
        &self.offdesign
    }

    fn lookup_all(&self, names: &[&str]) -> ComponentResult<Vec<&'static str>> {
        names
            .iter()
            .map(|name| self.def(name).map(|def| def.name))
            .collect()
    }

    pub fn check_fluids(&self, fluids: &FluidSet) -> ComponentResult<()> {
        self.model.check_fluids(fluids)
    }

    /// Active parameters for `mode`.
    pub fn resolve(&self, mode: Mode, design: Option<&DesignPoint>) -> ComponentResult<ActiveParams> {
        params::resolve(
            &self.name,
            self.model.param_defs(),
            &self.specs,
            &self.design,
            &self.offdesign,
            mode,
            design,
            |name| self.model.default_curve(name),
        )
    }

    pub fn equation_count(&self, nf: usize, active: &ActiveParams) -> usize {
        self.model.structural_equation_count(nf) + active.equations().len()
    }

    /// All residuals: mandatory equations first, then one per active parameter.
    pub fn residuals(
        &self,
        ctx: &EvalContext<'_>,
        ports: &[StreamState],
        active: &ActiveParams,
    ) -> ComponentResult<Vec<f64>> {
        let mut out = Vec::with_capacity(self.equation_count(ctx.fluids.len(), active));
        self.model
            .structural_residuals(ctx, ports, active, &mut out)?;
        debug_assert_eq!(out.len(), self.model.structural_equation_count(ctx.fluids.len()));
        self.push_param_residuals(ctx, ports, active, &mut out)?;
        Ok(out)
    }

    fn push_param_residuals(
        &self,
        ctx: &EvalContext<'_>,
        ports: &[StreamState],
        active: &ActiveParams,
        out: &mut Vec<f64>,
    ) -> ComponentResult<()> {
        for name in active.equations() {
            out.push(self.model.param_residual(name, ctx, ports, active)?);
        }
        Ok(())
    }

    /// Local Jacobian over the flattened port variables.
    ///
    /// Analytic rows are used where the model provides them; the remaining
    /// rows are forward differences over the columns marked `free`.
    pub fn jacobian(
        &self,
        ctx: &EvalContext<'_>,
        ports: &[StreamState],
        active: &ActiveParams,
        free: &[bool],
        fd_step: f64,
    ) -> ComponentResult<DMatrix<f64>> {
        let nf = ctx.fluids.len();
        let width = StreamState::width(nf);
        let rows = self.equation_count(nf, active);
        let mut jac = DMatrix::zeros(rows, ports.len() * width);

        let analytic = self.model.structural_jacobian(nf, ports, active);
        let first_fd_row = match &analytic {
            Some(block) => {
                jac.rows_mut(0, block.nrows()).copy_from(block);
                block.nrows()
            }
            None => 0,
        };
        if first_fd_row == rows {
            return Ok(jac);
        }

        let evaluate = |ports: &[StreamState]| -> ComponentResult<Vec<f64>> {
            if analytic.is_some() {
                let mut out = Vec::with_capacity(rows - first_fd_row);
                self.push_param_residuals(ctx, ports, active, &mut out)?;
                Ok(out)
            } else {
                self.residuals(ctx, ports, active)
            }
        };

        let base = evaluate(ports)?;
        let mut perturbed = ports.to_vec();
        for (col, _) in free.iter().enumerate().filter(|(_, f)| **f) {
            let (port, var) = (col / width, col % width);
            let value = ports[port].get(var);
            let step = fd_step * value.abs().max(FD_SCALE[var.min(StreamState::X0)]);
            perturbed[port].set(var, value + step);
            let shifted = evaluate(&perturbed)?;
            perturbed[port].set(var, value);
            for (i, (r1, r0)) in shifted.iter().zip(&base).enumerate() {
                jac[(first_fd_row + i, col)] = (r1 - r0) / step;
            }
        }
        Ok(jac)
    }

    /// Derived quantities at the given port states.
    pub fn derived_quantities(
        &self,
        ctx: &EvalContext<'_>,
        ports: &[StreamState],
        active: &ActiveParams,
    ) -> ComponentResult<BTreeMap<&'static str, f64>> {
        Ok(self
            .model
            .derived_quantities(ctx, ports, active)?
            .into_iter()
            .filter(|(_, v)| v.is_finite())
            .collect())
    }

    /// One derived quantity by name.
    pub fn derived(
        &self,
        ctx: &EvalContext<'_>,
        ports: &[StreamState],
        active: &ActiveParams,
        name: &str,
    ) -> ComponentResult<f64> {
        self.check_quantity(name)?;
        self.derived_quantities(ctx, ports, active)?
            .get(name)
            .copied()
            .ok_or_else(|| ComponentError::UnknownQuantity {
                component: self.name.clone(),
                name: name.to_string(),
            })
    }

    /// Fail unless `name` is one of the model's derived quantities.
    pub fn check_quantity(&self, name: &str) -> ComponentResult<&'static str> {
        self.model
            .derived_names()
            .iter()
            .find(|n| **n == name)
            .copied()
            .ok_or_else(|| ComponentError::UnknownQuantity {
                component: self.name.clone(),
                name: name.to_string(),
            })
    }
}
