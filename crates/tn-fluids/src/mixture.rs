//! Mixture property evaluation.
//!
//! Mixtures are ideal mixtures of their pure components: every species present
//! is evaluated at its partial pressure and the mixture temperature, then
//! combined with the rules below.
//!
//! | property | rule |
//! |---|---|
//! | enthalpy, entropy | mass-weighted sum |
//! | specific volume | inverse of the summed partial densities |
//! | viscosity | Herning-Zipperer, `Σ xᵢ ηᵢ √Mᵢ / Σ xᵢ √Mᵢ` |
//!
//! Condensation inside gas mixtures is not modelled: in a stream with more than
//! one species present, a species whose partial pressure exceeds its
//! saturation pressure is evaluated as saturated vapour.
//!
//! Enthalpy and entropy are returned relative to the session's
//! [`ReferenceState`], evaluated for the same composition. Species below
//! [`FRACTION_EPS`](crate::composition::FRACTION_EPS) are ignored and the
//! remaining mass fractions are used as given.

use std::sync::Arc;

use tn_core::units::constants::{P_STANDARD, T_STANDARD};

use crate::cache::{CacheKey, CachedQuantity, PropertyCache};
use crate::composition::Mixture;
use crate::error::{FluidError, FluidResult};
use crate::source::{PropertySource, PureProperty};
use crate::species::Species;

/// Mixture properties at (p, T).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MixtureProperty {
    /// Specific enthalpy [J/kg], relative to the reference state
    Enthalpy,
    /// Specific entropy [J/(kg·K)], relative to the reference state
    Entropy,
    /// Specific volume [m³/kg]
    Volume,
    /// Dynamic viscosity [Pa·s]
    Viscosity,
}

impl MixtureProperty {
    pub fn name(&self) -> &'static str {
        match self {
            MixtureProperty::Enthalpy => "mixture enthalpy",
            MixtureProperty::Entropy => "mixture entropy",
            MixtureProperty::Volume => "mixture specific volume",
            MixtureProperty::Viscosity => "mixture viscosity",
        }
    }
}

/// State at which relative enthalpy and entropy vanish.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceState {
    /// Pressure [Pa]
    pub p: f64,
    /// Temperature [K]
    pub t: f64,
}

impl Default for ReferenceState {
    fn default() -> Self {
        Self {
            p: P_STANDARD,
            t: T_STANDARD,
        }
    }
}

/// Relative step below which temperature inversions stop.
const INVERSION_TOL: f64 = 1e-12;
const INVERSION_MAX_ITER: usize = 60;
/// Keeps capped partial pressures on the vapour side of the saturation line.
const SATURATED_VAPOUR: f64 = 1.0 - 1e-6;

/// Cached mixture property evaluator for one solve session.
#[derive(Clone)]
pub struct MixtureEvaluator {
    source: Arc<dyn PropertySource>,
    cache: Arc<PropertyCache>,
    reference: ReferenceState,
}

impl std::fmt::Debug for MixtureEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MixtureEvaluator")
            .field("source", &self.source.name())
            .field("reference", &self.reference)
            .field("cache", &self.cache.stats())
            .finish()
    }
}

impl MixtureEvaluator {
    /// Evaluator with a fresh cache and the standard reference state.
    pub fn new(source: Arc<dyn PropertySource>) -> Self {
        Self::with_cache(source, Arc::new(PropertyCache::new()))
    }

    /// Evaluator sharing an existing cache.
    ///
    /// The cache stores absolute values only, so evaluators with different
    /// reference states may share it.
    pub fn with_cache(source: Arc<dyn PropertySource>, cache: Arc<PropertyCache>) -> Self {
        Self {
            source,
            cache,
            reference: ReferenceState::default(),
        }
    }

    pub fn with_reference(mut self, reference: ReferenceState) -> Self {
        self.reference = reference;
        self
    }

    pub fn source(&self) -> &dyn PropertySource {
        self.source.as_ref()
    }

    pub fn cache(&self) -> &Arc<PropertyCache> {
        &self.cache
    }

    pub fn reference(&self) -> ReferenceState {
        self.reference
    }

    /// Pure-species property through the cache.
    pub fn lookup(
        &self,
        species: Species,
        kind: PureProperty,
        p: f64,
        t: f64,
    ) -> FluidResult<f64> {
        self.cache.lookup(self.source(), species, kind, p, t)
    }

    /// Mixture property at (p, T); enthalpy and entropy relative to the reference.
    pub fn mixture_property(
        &self,
        kind: MixtureProperty,
        p: f64,
        t: f64,
        mix: &Mixture<'_>,
    ) -> FluidResult<f64> {
        let value = self.absolute(kind, p, t, mix)?;
        match kind {
            MixtureProperty::Enthalpy | MixtureProperty::Entropy => {
                let datum = self.absolute(kind, self.reference.p, self.reference.t, mix)?;
                Ok(value - datum)
            }
            MixtureProperty::Volume | MixtureProperty::Viscosity => Ok(value),
        }
    }

    pub fn h_pt(&self, p: f64, t: f64, mix: &Mixture<'_>) -> FluidResult<f64> {
        self.mixture_property(MixtureProperty::Enthalpy, p, t, mix)
    }

    pub fn s_pt(&self, p: f64, t: f64, mix: &Mixture<'_>) -> FluidResult<f64> {
        self.mixture_property(MixtureProperty::Entropy, p, t, mix)
    }

    pub fn v_pt(&self, p: f64, t: f64, mix: &Mixture<'_>) -> FluidResult<f64> {
        self.mixture_property(MixtureProperty::Volume, p, t, mix)
    }

    pub fn visc_pt(&self, p: f64, t: f64, mix: &Mixture<'_>) -> FluidResult<f64> {
        self.mixture_property(MixtureProperty::Viscosity, p, t, mix)
    }

    /// Temperature at which the mixture has enthalpy `h` (relative) at pressure `p`.
    pub fn t_ph(&self, p: f64, h: f64, mix: &Mixture<'_>) -> FluidResult<f64> {
        let key = CacheKey::new(CachedQuantity::TemperatureFromEnthalpy, mix.key(), p, h);
        self.cache.get_or_compute(key, || {
            self.invert(MixtureProperty::Enthalpy, "temperature from enthalpy", p, h, mix)
        })
    }

    /// Temperature at which the mixture has entropy `s` (relative) at pressure `p`.
    pub fn t_ps(&self, p: f64, s: f64, mix: &Mixture<'_>) -> FluidResult<f64> {
        let key = CacheKey::new(CachedQuantity::TemperatureFromEntropy, mix.key(), p, s);
        self.cache.get_or_compute(key, || {
            self.invert(MixtureProperty::Entropy, "temperature from entropy", p, s, mix)
        })
    }

    /// Enthalpy at pressure `p` and entropy `s`; used for isentropic end states.
    pub fn h_ps(&self, p: f64, s: f64, mix: &Mixture<'_>) -> FluidResult<f64> {
        let t = self.t_ps(p, s, mix)?;
        self.h_pt(p, t, mix)
    }

    /// Enthalpy on the saturation line of a single-species stream.
    pub fn h_saturated(&self, p: f64, quality: f64, mix: &Mixture<'_>) -> FluidResult<f64> {
        let species = mix.single_species().ok_or_else(|| FluidError::NotSupported {
            what: "saturation states of multi-species streams".into(),
        })?;
        let key = CacheKey::new(CachedQuantity::SaturatedEnthalpy, mix.key(), p, quality);
        let h = self.cache.get_or_compute(key, || {
            self.source.saturated_enthalpy(species, p, quality)
        })?;
        let datum = self.absolute(
            MixtureProperty::Enthalpy,
            self.reference.p,
            self.reference.t,
            mix,
        )?;
        Ok(h - datum)
    }

    /// Temperature interval shared by every species present.
    pub fn temperature_bracket(&self, mix: &Mixture<'_>) -> FluidResult<(f64, f64)> {
        let mut lo = f64::NEG_INFINITY;
        let mut hi = f64::INFINITY;
        for (species, _) in mix.present() {
            let (t_min, t_max) = self.source.temperature_range(species);
            lo = lo.max(t_min);
            hi = hi.min(t_max);
        }
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(FluidError::NotSupported {
                what: "no common temperature range for the species present".into(),
            });
        }
        Ok((lo, hi))
    }

    fn absolute(
        &self,
        kind: MixtureProperty,
        p: f64,
        t: f64,
        mix: &Mixture<'_>,
    ) -> FluidResult<f64> {
        let key = CacheKey::new(CachedQuantity::Mixture(kind), mix.key(), p, t);
        self.cache
            .get_or_compute(key, || self.combine(kind, p, t, mix))
    }

    fn combine(&self, kind: MixtureProperty, p: f64, t: f64, mix: &Mixture<'_>) -> FluidResult<f64> {
        let moles = mix.mole_fractions();
        if moles.is_empty() {
            return Err(FluidError::InvalidArg {
                what: "mixture without any species present",
            });
        }

        match kind {
            MixtureProperty::Enthalpy | MixtureProperty::Entropy => {
                let pure = if kind == MixtureProperty::Enthalpy {
                    PureProperty::Enthalpy
                } else {
                    PureProperty::Entropy
                };
                let mut sum = 0.0;
                for ((species, w), (_, x)) in mix.present().zip(&moles) {
                    let pp = self.partial_pressure(species, p * x, t, moles.len())?;
                    sum += w * self.lookup(species, pure, pp, t)?;
                }
                Ok(sum)
            }
            MixtureProperty::Volume => {
                let mut density = 0.0;
                for (species, x) in &moles {
                    let pp = self.partial_pressure(*species, p * x, t, moles.len())?;
                    // capped species scale with the gas law up to their partial pressure
                    density += self.lookup(*species, PureProperty::Density, pp, t)? * p * x / pp;
                }
                Ok(1.0 / density)
            }
            MixtureProperty::Viscosity => {
                let mut num = 0.0;
                let mut den = 0.0;
                for (species, x) in &moles {
                    let weight = x * species.molar_mass().sqrt();
                    let pp = self.partial_pressure(*species, p * x, t, moles.len())?;
                    num += weight * self.lookup(*species, PureProperty::Viscosity, pp, t)?;
                    den += weight;
                }
                Ok(num / den)
            }
        }
    }

    /// Pressure at which a species of a gas mixture is evaluated.
    fn partial_pressure(&self, species: Species, pp: f64, t: f64, present: usize) -> FluidResult<f64> {
        if present < 2 {
            return Ok(pp);
        }
        match self.source.saturation_pressure(species, t)? {
            Some(p_sat) if pp > SATURATED_VAPOUR * p_sat => Ok(SATURATED_VAPOUR * p_sat),
            _ => Ok(pp),
        }
    }

    /// Safeguarded secant inversion of a property that increases with temperature.
    fn invert(
        &self,
        kind: MixtureProperty,
        what: &'static str,
        p: f64,
        target: f64,
        mix: &Mixture<'_>,
    ) -> FluidResult<f64> {
        if !target.is_finite() {
            return Err(FluidError::NonPhysical { what });
        }
        let residual = |t: f64| -> FluidResult<f64> {
            Ok(self.mixture_property(kind, p, t, mix)? - target)
        };

        let (mut lo, mut hi) = self.temperature_bracket(mix)?;
        let f_lo = residual(lo)?;
        if f_lo > 0.0 {
            return Err(FluidError::OutOfDomain { what, p, t: lo });
        }
        let f_hi = residual(hi)?;
        if f_hi < 0.0 {
            return Err(FluidError::OutOfDomain { what, p, t: hi });
        }
        if f_lo == 0.0 {
            return Ok(lo);
        }
        if f_hi == 0.0 {
            return Ok(hi);
        }

        let (mut t_prev, mut f_prev) = (lo, f_lo);
        let mut t = lo - f_lo * (hi - lo) / (f_hi - f_lo);
        for _ in 0..INVERSION_MAX_ITER {
            let f = residual(t)?;
            if f == 0.0 {
                return Ok(t);
            }
            if f < 0.0 {
                lo = t;
            } else {
                hi = t;
            }

            let mut next = t - f * (t - t_prev) / (f - f_prev);
            if !next.is_finite() || next <= lo || next >= hi {
                next = 0.5 * (lo + hi);
            }
            if (next - t).abs() <= INVERSION_TOL * t || hi - lo <= INVERSION_TOL * t {
                return Ok(next);
            }
            (t_prev, f_prev) = (t, f);
            t = next;
        }
        Err(FluidError::ConvergenceFailed { what, p })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::FluidSet;
    use crate::ideal_gas::IdealGasSource;

    fn evaluator() -> MixtureEvaluator {
        MixtureEvaluator::new(Arc::new(IdealGasSource::new()))
    }

    fn air_set() -> FluidSet {
        FluidSet::new([Species::N2, Species::O2, Species::Ar]).unwrap()
    }

    const AIR: [f64; 3] = [0.7556, 0.2315, 0.0129];

    #[test]
    fn relative_properties_vanish_at_reference() {
        let eval = evaluator();
        let fluids = air_set();
        let mix = Mixture::new(&fluids, &AIR).unwrap();
        let r = eval.reference();
        assert!(eval.h_pt(r.p, r.t, &mix).unwrap().abs() < 1e-9);
        assert!(eval.s_pt(r.p, r.t, &mix).unwrap().abs() < 1e-9);
        assert!(eval.h_pt(r.p, 400.0, &mix).unwrap() > 0.0);
    }

    #[test]
    fn pure_stream_equals_pure_lookup() {
        let eval = evaluator();
        let fluids = air_set();
        let fractions = [1.0, 0.0, 0.0];
        let mix = Mixture::new(&fluids, &fractions).unwrap();
        let h_mix = eval.h_pt(2e5, 600.0, &mix).unwrap();
        let h = eval
            .lookup(Species::N2, PureProperty::Enthalpy, 2e5, 600.0)
            .unwrap()
            - eval
                .lookup(Species::N2, PureProperty::Enthalpy, 1e5, 298.15)
                .unwrap();
        assert!((h_mix - h).abs() < 1e-9);
    }

    #[test]
    fn ideal_gas_volume_matches_gas_law() {
        let eval = evaluator();
        let fluids = air_set();
        let mix = Mixture::new(&fluids, &AIR).unwrap();
        let v = eval.v_pt(1e5, 300.0, &mix).unwrap();
        let m = 1.0 / AIR.iter().zip(fluids.species()).map(|(w, s)| w / s.molar_mass()).sum::<f64>();
        let expected = 8314.462618 * 300.0 / (m * 1e5);
        assert!((v - expected).abs() < 1e-9 * expected);
    }

    #[test]
    fn viscosity_lies_between_components() {
        let eval = evaluator();
        let fluids = air_set();
        let mix = Mixture::new(&fluids, &AIR).unwrap();
        let mu = eval.visc_pt(1e5, 400.0, &mix).unwrap();
        let mu_n2 = eval.lookup(Species::N2, PureProperty::Viscosity, 1e5, 400.0).unwrap();
        let mu_ar = eval.lookup(Species::Ar, PureProperty::Viscosity, 1e5, 400.0).unwrap();
        assert!(mu > mu_n2 && mu < mu_ar, "{mu_n2} < {mu} < {mu_ar}");
    }

    #[test]
    fn temperature_inversions_recover_state() {
        let eval = evaluator();
        let fluids = FluidSet::new([Species::N2, Species::CO2, Species::H2O, Species::O2]).unwrap();
        let fractions = [0.72, 0.08, 0.06, 0.14];
        let mix = Mixture::new(&fluids, &fractions).unwrap();
        for t in [250.0, 800.0, 1200.0, 1700.0, 3000.0] {
            let h = eval.h_pt(3e5, t, &mix).unwrap();
            let s = eval.s_pt(3e5, t, &mix).unwrap();
            let t_h = eval.t_ph(3e5, h, &mix).unwrap();
            let t_s = eval.t_ps(3e5, s, &mix).unwrap();
            assert!((t_h - t).abs() < 1e-6, "t_ph({t}) = {t_h}");
            assert!((t_s - t).abs() < 1e-6, "t_ps({t}) = {t_s}");
        }
    }

    #[test]
    fn isentropic_compression_heats_the_gas() {
        let eval = evaluator();
        let fluids = air_set();
        let mix = Mixture::new(&fluids, &AIR).unwrap();
        let s1 = eval.s_pt(1e5, 300.0, &mix).unwrap();
        let h2s = eval.h_ps(1e6, s1, &mix).unwrap();
        let t2s = eval.t_ph(1e6, h2s, &mix).unwrap();
        // about 300 · 10^(0.4/1.4) K for a diatomic gas
        assert!(t2s > 570.0 && t2s < 590.0, "t2s = {t2s}");
    }

    #[test]
    fn enthalpy_beyond_source_range_is_out_of_domain() {
        let eval = evaluator();
        let fluids = air_set();
        let mix = Mixture::new(&fluids, &AIR).unwrap();
        let err = eval.t_ph(1e5, 1e9, &mix).unwrap_err();
        assert!(matches!(err, FluidError::OutOfDomain { t, .. } if t == 3500.0));
    }

    #[test]
    fn saturation_needs_a_single_species() {
        let eval = evaluator();
        let fluids = air_set();
        let mix = Mixture::new(&fluids, &AIR).unwrap();
        assert!(matches!(
            eval.h_saturated(1e5, 0.0, &mix),
            Err(FluidError::NotSupported { .. })
        ));
    }

    #[test]
    fn repeated_queries_hit_the_cache() {
        let eval = evaluator();
        let fluids = air_set();
        let mix = Mixture::new(&fluids, &AIR).unwrap();
        eval.h_pt(5e5, 700.0, &mix).unwrap();
        let before = eval.cache().stats();
        eval.h_pt(5e5, 700.0, &mix).unwrap();
        let after = eval.cache().stats();
        assert_eq!(after.entries, before.entries);
        assert_eq!(after.hits, before.hits + 2);
    }

    #[test]
    fn reference_changes_do_not_poison_shared_cache() {
        let source: Arc<dyn PropertySource> = Arc::new(IdealGasSource::new());
        let cache = Arc::new(PropertyCache::new());
        let a = MixtureEvaluator::with_cache(Arc::clone(&source), Arc::clone(&cache));
        let b = MixtureEvaluator::with_cache(source, cache)
            .with_reference(ReferenceState { p: 1e5, t: 500.0 });
        let fluids = air_set();
        let mix = Mixture::new(&fluids, &AIR).unwrap();
        let ha = a.h_pt(1e5, 500.0, &mix).unwrap();
        let hb = b.h_pt(1e5, 500.0, &mix).unwrap();
        assert!(ha > 2.0e5 && ha < 2.1e5, "ha = {ha}");
        assert!(hb.abs() < 1e-9);
    }
}
