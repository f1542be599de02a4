//! CoolProp-based property source.

use crate::error::{FluidError, FluidResult};
use crate::source::{PropertySource, PureProperty, validation};
use crate::species::Species;
use rfluids::prelude::*;

/// CoolProp backend for pure-substance properties.
///
/// Thread-safe: rfluids Fluid instances are created per call and never shared.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoolPropSource;

impl CoolPropSource {
    pub fn new() -> Self {
        Self
    }

    /// Create a Fluid instance at given P,T state.
    fn fluid_at_pt(&self, species: Species, p_pa: f64, t_k: f64) -> FluidResult<Fluid> {
        Fluid::from(species.rfluids_pure())
            .in_state(FluidInput::pressure(p_pa), FluidInput::temperature(t_k))
            .map_err(|e| FluidError::Backend {
                message: format!("rfluids error for {species} at P={p_pa} Pa, T={t_k} K: {e}"),
            })
    }
}

impl PropertySource for CoolPropSource {
    fn name(&self) -> &str {
        "CoolProp"
    }

    fn supports(&self, _species: Species) -> bool {
        true
    }

    /// Bounds used for temperature inversion; CoolProp still extrapolates
    /// moderately past its published maxima for the permanent gases.
    fn temperature_range(&self, species: Species) -> (f64, f64) {
        match species {
            Species::H2O => (273.16, 2000.0),
            Species::CO2 => (216.6, 2500.0),
            Species::Ammonia => (195.5, 700.0),
            Species::CH4 => (90.7, 625.0),
            Species::Ethane => (90.4, 675.0),
            Species::Propane => (85.5, 650.0),
            Species::H2 => (14.0, 1000.0),
            Species::He => (2.2, 2000.0),
            Species::CO => (68.2, 500.0),
            Species::O2 => (54.4, 2500.0),
            Species::N2 => (63.2, 2500.0),
            Species::Ar => (83.8, 2500.0),
            Species::Air => (60.0, 2500.0),
        }
    }

    fn property(&self, species: Species, kind: PureProperty, p: f64, t: f64) -> FluidResult<f64> {
        validation::validate_pressure(p)?;
        validation::validate_temperature(t)?;

        let mut fluid = self.fluid_at_pt(species, p, t)?;
        let value = match kind {
            PureProperty::Enthalpy => fluid.enthalpy(),
            PureProperty::Entropy => fluid.entropy(),
            PureProperty::Density => fluid.density(),
            PureProperty::Viscosity => fluid.dynamic_viscosity(),
        }
        .map_err(|e| FluidError::Backend {
            message: format!(
                "rfluids error getting {} of {species} at P={p} Pa, T={t} K: {e}",
                kind.name()
            ),
        })?;

        validation::validate_result(kind, value, p, t)
    }

    fn saturated_enthalpy(&self, species: Species, p: f64, quality: f64) -> FluidResult<f64> {
        validation::validate_pressure(p)?;
        if !(0.0..=1.0).contains(&quality) {
            return Err(FluidError::InvalidArg {
                what: "vapour quality must lie in [0, 1]",
            });
        }

        let mut fluid = Fluid::from(species.rfluids_pure())
            .in_state(FluidInput::pressure(p), FluidInput::quality(quality))
            .map_err(|e| FluidError::Backend {
                message: format!("rfluids error for saturated {species} at P={p} Pa: {e}"),
            })?;
        let h = fluid.enthalpy().map_err(|e| FluidError::Backend {
            message: format!("rfluids error getting saturated enthalpy: {e}"),
        })?;
        validation::validate_result(PureProperty::Enthalpy, h, p, f64::NAN)
    }

    fn saturation_pressure(&self, species: Species, t: f64) -> FluidResult<Option<f64>> {
        validation::validate_temperature(t)?;
        let (t_triple, _) = self.temperature_range(species);
        if species == Species::Air || t <= t_triple || t >= species.critical_temperature() {
            return Ok(None);
        }

        let mut fluid = Fluid::from(species.rfluids_pure())
            .in_state(FluidInput::temperature(t), FluidInput::quality(1.0))
            .map_err(|e| FluidError::Backend {
                message: format!("rfluids error for saturated {species} at T={t} K: {e}"),
            })?;
        let p = fluid.pressure().map_err(|e| FluidError::Backend {
            message: format!("rfluids error getting saturation pressure: {e}"),
        })?;
        validation::validate_pressure(p)?;
        Ok(Some(p))
    }
}
