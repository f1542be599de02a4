//! Pure-substance property source trait and validation helpers.

use crate::error::{FluidError, FluidResult};
use crate::species::Species;

/// Pure-substance properties a source can evaluate at (p, T).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PureProperty {
    /// Specific enthalpy [J/kg]
    Enthalpy,
    /// Specific entropy [J/(kg·K)]
    Entropy,
    /// Density [kg/m³]
    Density,
    /// Dynamic viscosity [Pa·s]
    Viscosity,
}

impl PureProperty {
    pub fn name(&self) -> &'static str {
        match self {
            PureProperty::Enthalpy => "enthalpy",
            PureProperty::Entropy => "entropy",
            PureProperty::Density => "density",
            PureProperty::Viscosity => "viscosity",
        }
    }
}

/// External thermophysical property source for pure substances.
///
/// Implementations must be thread-safe (Send + Sync) so the mixture evaluator can
/// be shared across parallel stream evaluations. Absolute enthalpy and entropy
/// datums are source-specific; callers only ever use differences.
pub trait PropertySource: Send + Sync {
    /// Source name (for debugging/logging).
    fn name(&self) -> &str;

    /// Check if this source can evaluate the given species.
    fn supports(&self, species: Species) -> bool;

    /// Temperature interval [K] over which the source is trusted for `species`.
    fn temperature_range(&self, species: Species) -> (f64, f64);

    /// Evaluate one property of a pure species at pressure `p` [Pa] and temperature `t` [K].
    fn property(&self, species: Species, kind: PureProperty, p: f64, t: f64) -> FluidResult<f64>;

    /// Specific enthalpy [J/kg] on the saturation line at pressure `p`.
    ///
    /// `quality` is 0 for saturated liquid and 1 for saturated vapour.
    fn saturated_enthalpy(&self, species: Species, p: f64, quality: f64) -> FluidResult<f64> {
        let _ = (p, quality);
        Err(FluidError::NotSupported {
            what: format!("saturation states of {species} in {}", self.name()),
        })
    }

    /// Saturation pressure [Pa] of `species` at temperature `t`.
    ///
    /// `None` when the source does not model condensation of the species or
    /// `t` lies outside the two-phase region.
    fn saturation_pressure(&self, species: Species, t: f64) -> FluidResult<Option<f64>> {
        let _ = (species, t);
        Ok(None)
    }
}

/// Validation helpers for property inputs and results.
pub(crate) mod validation {
    use super::*;

    /// Ensure pressure is positive and finite.
    pub fn validate_pressure(p: f64) -> FluidResult<()> {
        if !p.is_finite() || p <= 0.0 {
            return Err(FluidError::NonPhysical {
                what: "pressure must be positive and finite",
            });
        }
        Ok(())
    }

    /// Ensure temperature is positive and finite.
    pub fn validate_temperature(t: f64) -> FluidResult<()> {
        if !t.is_finite() || t <= 0.0 {
            return Err(FluidError::NonPhysical {
                what: "temperature must be positive and finite",
            });
        }
        Ok(())
    }

    /// Ensure a backend result is usable for the requested property.
    pub fn validate_result(kind: PureProperty, value: f64, p: f64, t: f64) -> FluidResult<f64> {
        let positive = matches!(kind, PureProperty::Density | PureProperty::Viscosity);
        if !value.is_finite() || (positive && value <= 0.0) {
            return Err(FluidError::OutOfDomain {
                what: kind.name(),
                p,
                t,
            });
        }
        Ok(value)
    }
}
